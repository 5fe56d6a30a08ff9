use crate::{cli::OutputFormat, error::Result};
use channels_parser::media::{MediaItem, MediaStream};
#[cfg(feature = "colored-output")]
use colored::*;
use std::borrow::Cow;
use std::io::Write;
#[cfg(feature = "table-output")]
use tabled::{Table, Tabled, settings::Style};

pub struct OutputManager {
    #[cfg_attr(not(feature = "colored-output"), allow(dead_code))]
    colored: bool,
}

impl OutputManager {
    pub fn new(colored: bool) -> Self {
        Self { colored }
    }

    /// Formats a folder listing.
    pub fn format_items(&self, items: &[MediaItem], format: &OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Pretty => Ok(self.format_items_pretty(items)),
            OutputFormat::Json => Ok(serde_json::to_string_pretty(items)?),
            OutputFormat::JsonCompact => Ok(serde_json::to_string(items)?),
            #[cfg(feature = "table-output")]
            OutputFormat::Table => Ok(Self::format_items_table(items)),
            #[cfg(not(feature = "table-output"))]
            OutputFormat::Table => {
                // Fallback to pretty format when table feature is disabled
                Ok(self.format_items_pretty(items))
            }
            OutputFormat::Csv => Ok(Self::format_items_csv(items)),
        }
    }

    /// Formats a resolved item with its selected stream.
    pub fn format_resolved(
        &self,
        item: &MediaItem,
        stream: Option<&MediaStream>,
        format: &OutputFormat,
    ) -> Result<String> {
        match format {
            OutputFormat::Pretty => Ok(self.format_resolved_pretty(item, stream)),
            OutputFormat::Json => self.format_resolved_json(item, stream, true),
            OutputFormat::JsonCompact => self.format_resolved_json(item, stream, false),
            #[cfg(feature = "table-output")]
            OutputFormat::Table => Ok(Self::format_resolved_table(item, stream)),
            #[cfg(not(feature = "table-output"))]
            OutputFormat::Table => Ok(self.format_resolved_pretty(item, stream)),
            OutputFormat::Csv => Ok(Self::format_resolved_csv(item, stream)),
        }
    }

    fn format_items_pretty(&self, items: &[MediaItem]) -> String {
        let mut output = String::new();
        output.push_str(&self.colorize(
            &format!("{} items:", items.len()),
            &Color::Green,
            true,
        ));
        output.push('\n');

        for (index, item) in items.iter().enumerate() {
            let kind = if item.is_folder() { "+" } else { ">" };
            let mut flags = String::new();
            if item.is_live {
                flags.push_str(" [live]");
            }
            if item.is_geo_locked {
                flags.push_str(" [geo]");
            }

            output.push_str(&format!(
                "  {:>3} {} {}{}\n",
                index + 1,
                kind,
                self.colorize(&item.name, &Color::Cyan, item.is_folder()),
                self.colorize(&flags, &Color::Yellow, false)
            ));

            if !item.url.starts_with('#') {
                output.push_str(&format!(
                    "        {}\n",
                    self.colorize(&item.url, &Color::Blue, false)
                ));
            }
            if let Some(date) = item.broadcast_date {
                output.push_str(&format!("        {}\n", date.format("%Y-%m-%d %H:%M")));
            }
        }

        output
    }

    fn format_resolved_pretty(&self, item: &MediaItem, stream: Option<&MediaStream>) -> String {
        let mut output = String::new();

        output.push_str(&self.colorize("Media Information:", &Color::Green, true));
        output.push('\n');
        self.push_field(&mut output, "Title", &item.name, &Color::Cyan);
        self.push_field(&mut output, "Type", item.media_type.as_str(), &Color::Cyan);
        self.push_field(&mut output, "Live", &item.is_live.to_string(), &Color::Cyan);
        self.push_field(
            &mut output,
            "Geo locked",
            &item.is_geo_locked.to_string(),
            &Color::Cyan,
        );
        if let Some(description) = &item.description {
            self.push_field(&mut output, "Description", description, &Color::Cyan);
        }
        if let Some(thumb) = &item.thumb {
            self.push_field(&mut output, "Thumbnail", thumb, &Color::Blue);
        }
        if let (Some(season), Some(episode)) = (item.season, item.episode) {
            self.push_field(
                &mut output,
                "Episode",
                &format!("S{season:02}E{episode:02}"),
                &Color::Cyan,
            );
        }
        if let Some(expires) = item.expires {
            self.push_field(
                &mut output,
                "Expires",
                &expires.format("%Y-%m-%d %H:%M").to_string(),
                &Color::Cyan,
            );
        }
        if let Some(subtitle) = &item.subtitle {
            self.push_field(
                &mut output,
                "Subtitle",
                &format!("{} ({})", subtitle.url, subtitle.format),
                &Color::Blue,
            );
        }

        if let Some(stream) = stream {
            output.push('\n');
            output.push_str(&self.colorize("Selected Stream Details:", &Color::Green, true));
            output.push('\n');
            self.push_field(
                &mut output,
                "Format",
                stream.stream_format.as_str(),
                &Color::Cyan,
            );
            if let Some(quality) = &stream.quality {
                self.push_field(&mut output, "Quality", quality, &Color::Cyan);
            }
            self.push_field(&mut output, "URL", &stream.url, &Color::Blue);
            self.push_field(
                &mut output,
                "Bitrate",
                &stream.bitrate.to_string(),
                &Color::Cyan,
            );
            if !stream.codec.is_empty() {
                self.push_field(&mut output, "Codec", &stream.codec, &Color::Cyan);
            }
            for (key, value) in &stream.properties {
                self.push_field(&mut output, key, value, &Color::Cyan);
            }
        }

        output
    }

    fn push_field(&self, output: &mut String, label: &str, value: &str, color: &Color) {
        output.push_str(&format!(
            "  {}: {}\n",
            self.colorize(label, &Color::Yellow, false),
            self.colorize(value, color, false)
        ));
    }

    fn format_resolved_json(
        &self,
        item: &MediaItem,
        stream: Option<&MediaStream>,
        pretty: bool,
    ) -> Result<String> {
        let output = serde_json::json!({
            "media": item,
            "stream": stream,
        });

        let result = if pretty {
            serde_json::to_string_pretty(&output)?
        } else {
            serde_json::to_string(&output)?
        };

        Ok(result)
    }

    #[cfg(feature = "table-output")]
    fn format_items_table(items: &[MediaItem]) -> String {
        #[derive(Tabled)]
        struct ItemRow<'a> {
            #[tabled(rename = "#")]
            index: usize,
            name: &'a str,
            #[tabled(rename = "type")]
            kind: &'a str,
            url: &'a str,
        }

        let rows = items.iter().enumerate().map(|(index, item)| ItemRow {
            index: index + 1,
            name: &item.name,
            kind: item.media_type.as_str(),
            url: &item.url,
        });

        Table::new(rows).with(Style::modern()).to_string()
    }

    #[cfg(feature = "table-output")]
    fn format_resolved_table(item: &MediaItem, stream: Option<&MediaStream>) -> String {
        #[derive(Tabled)]
        struct TableRow<'a> {
            property: &'a str,
            value: Cow<'a, str>,
        }

        let mut rows = vec![
            TableRow {
                property: "Title",
                value: Cow::Borrowed(&item.name),
            },
            TableRow {
                property: "Live",
                value: Cow::Owned(item.is_live.to_string()),
            },
        ];

        if let Some(stream) = stream {
            rows.push(TableRow {
                property: "Stream Format",
                value: Cow::Borrowed(stream.stream_format.as_str()),
            });
            rows.push(TableRow {
                property: "Stream URL",
                value: Cow::Borrowed(&stream.url),
            });
            rows.push(TableRow {
                property: "Bitrate",
                value: Cow::Owned(stream.bitrate.to_string()),
            });
            if let Some(quality) = &stream.quality {
                rows.push(TableRow {
                    property: "Quality",
                    value: Cow::Borrowed(quality),
                });
            }
        }

        Table::new(rows).with(Style::modern()).to_string()
    }

    fn format_items_csv(items: &[MediaItem]) -> String {
        let mut output = String::new();
        output.push_str("index,name,type,url\n");
        for (index, item) in items.iter().enumerate() {
            output.push_str(&format!(
                "{},\"{}\",{},\"{}\"\n",
                index + 1,
                Self::escape_csv(&item.name),
                item.media_type.as_str(),
                Self::escape_csv(&item.url)
            ));
        }
        output
    }

    fn format_resolved_csv(item: &MediaItem, stream: Option<&MediaStream>) -> String {
        let mut output = String::new();
        output.push_str("property,value\n");
        output.push_str(&format!("title,\"{}\"\n", Self::escape_csv(&item.name)));
        output.push_str(&format!("is_live,{}\n", item.is_live));

        if let Some(stream) = stream {
            output.push_str(&format!("stream_format,\"{}\"\n", stream.stream_format));
            output.push_str(&format!("url,\"{}\"\n", Self::escape_csv(&stream.url)));
            output.push_str(&format!("bitrate,{}\n", stream.bitrate));
            if let Some(quality) = &stream.quality {
                output.push_str(&format!("quality,\"{}\"\n", Self::escape_csv(quality)));
            }
        }

        output
    }

    // Helper method to avoid unnecessary allocations when escaping CSV
    fn escape_csv(s: &str) -> Cow<'_, str> {
        if s.contains('"') {
            Cow::Owned(s.replace('"', "\"\""))
        } else {
            Cow::Borrowed(s)
        }
    }

    fn colorize(&self, text: &str, color: &Color, bold: bool) -> String {
        #[cfg(feature = "colored-output")]
        {
            if self.colored {
                let colored_text = match color {
                    Color::Green => text.green(),
                    Color::Yellow => text.yellow(),
                    Color::Blue => text.blue(),
                    Color::Cyan => text.cyan(),
                };
                if bold {
                    colored_text.bold().to_string()
                } else {
                    colored_text.to_string()
                }
            } else {
                text.to_string()
            }
        }

        #[cfg(not(feature = "colored-output"))]
        {
            let _ = (color, bold);
            text.to_string()
        }
    }
}

enum Color {
    Green,
    Yellow,
    Blue,
    Cyan,
}

pub fn write_output(content: &str, output_file: Option<&std::path::Path>) -> Result<()> {
    match output_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, content)?;
        }
        None => {
            print!("{content}");
            std::io::stdout().flush()?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use channels_parser::media::{ContentType, StreamFormat};

    fn items() -> Vec<MediaItem> {
        let folder = MediaItem::folder("Drama", "#genre_item", ContentType::TvShows);
        let mut video = MediaItem::video("Bron \"del 1\"", "https://www.svtplay.se/video/1");
        video.is_geo_locked = true;
        vec![folder, video]
    }

    #[test]
    fn test_items_csv_escapes_quotes() {
        let output = OutputManager::new(false)
            .format_items(&items(), &OutputFormat::Csv)
            .unwrap();
        assert_eq!(
            output,
            "index,name,type,url\n1,\"Drama\",folder,\"#genre_item\"\n2,\"Bron \"\"del 1\"\"\",video,\"https://www.svtplay.se/video/1\"\n"
        );
    }

    #[test]
    fn test_items_pretty_hides_pseudo_urls() {
        let output = OutputManager::new(false)
            .format_items(&items(), &OutputFormat::Pretty)
            .unwrap();
        assert!(output.starts_with("2 items:\n"));
        assert!(output.contains("  1 + Drama\n"));
        assert!(!output.contains("#genre_item"));
        assert!(output.contains("[geo]"));
    }

    #[test]
    fn test_resolved_json() {
        let mut item = MediaItem::video("Rapport", "https://api.svt.se/video/1");
        let stream = item.add_stream("https://svt.example/master.m3u8", 0).clone();
        let output = OutputManager::new(false)
            .format_resolved(&item, Some(&stream), &OutputFormat::JsonCompact)
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["media"]["name"], "Rapport");
        assert_eq!(value["stream"]["url"], "https://svt.example/master.m3u8");
        assert_eq!(stream.stream_format, StreamFormat::Hls);
    }
}
