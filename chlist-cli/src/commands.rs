use crate::{
    cli::{OutputFormat, parse_item_path},
    config::AppConfig,
    error::{CliError, Result},
    output::{OutputManager, write_output},
};
use channels_parser::{
    channel::{
        ProxyConfig,
        factory::ChannelFactory,
        factory_with_proxy,
        listing::SEARCH_SITE_URL,
        site_channel::SiteChannel,
    },
    media::{ContentType, MediaItem, MediaStream},
};
#[cfg(feature = "colored-output")]
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
#[cfg(feature = "regex-filters")]
use regex::Regex;
use std::{future::Future, path::Path, time::Duration};
use tokio::time::{sleep, timeout};
use tracing::debug;

pub struct CommandExecutor {
    config: AppConfig,
    channel_factory: ChannelFactory,
}

impl CommandExecutor {
    /// Builds the channel factory from the configuration, `proxy` and the
    /// `--adaptive` flag.
    pub fn new(config: AppConfig, proxy: Option<ProxyConfig>, adaptive: bool) -> Result<Self> {
        let mut settings = config.channels.clone();
        settings.use_adaptive_stream |= adaptive;

        let channel_factory = factory_with_proxy(proxy, settings)?;
        Ok(Self {
            config,
            channel_factory,
        })
    }

    fn create_channel(&self, code: &str) -> Result<Box<dyn SiteChannel>> {
        Ok(self
            .channel_factory
            .create_channel(code, self.config.cookies.clone())?)
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn list_folder(
        &self,
        channel_code: &str,
        path: Option<&str>,
        url: Option<&str>,
        output_format: OutputFormat,
        output_file: Option<&Path>,
        timeout_duration: Duration,
    ) -> Result<()> {
        let channel = self.create_channel(channel_code)?;
        let pb = self.create_progress_bar(&format!("Listing {}...", channel.info().name));

        let result = async {
            if let Some(url) = url {
                let folder = MediaItem::folder(url, url, ContentType::Videos);
                return with_timeout(timeout_duration, channel.process_folder_list(Some(&folder)))
                    .await;
            }

            let indices = path
                .map(parse_item_path)
                .transpose()
                .map_err(CliError::invalid_input)?
                .unwrap_or_default();

            let mut items = with_timeout(timeout_duration, channel.process_folder_list(None)).await?;
            for index in indices {
                let folder = items.get(index).cloned().ok_or_else(|| {
                    CliError::invalid_input(format!(
                        "item {} does not exist, the listing has {} items",
                        index + 1,
                        items.len()
                    ))
                })?;

                if folder.url == SEARCH_SITE_URL {
                    return Err(CliError::invalid_input(
                        "use the search command to search this channel",
                    ));
                }
                if !folder.is_folder() {
                    return Err(CliError::invalid_input(format!(
                        "'{}' is not a folder, use the resolve command to play it",
                        folder.name
                    )));
                }

                debug!("Opening folder {} ({})", folder.name, folder.url);
                items =
                    with_timeout(timeout_duration, channel.process_folder_list(Some(&folder)))
                        .await?;
            }
            Ok(items)
        }
        .await;
        pb.finish_and_clear();

        let output_manager = OutputManager::new(self.config.colored_output);
        let output = output_manager.format_items(&result?, &output_format)?;
        write_output(&output, output_file)
    }

    pub async fn search(
        &self,
        channel_code: &str,
        query: &str,
        output_format: OutputFormat,
        output_file: Option<&Path>,
        timeout_duration: Duration,
    ) -> Result<()> {
        if query.trim().is_empty() {
            return Err(CliError::invalid_input("the search term is empty"));
        }

        let channel = self.create_channel(channel_code)?;
        let pb = self.create_progress_bar(&format!("Searching {}...", channel.info().name));
        let result = with_timeout(timeout_duration, channel.search_site(query)).await;
        pb.finish_and_clear();

        let output_manager = OutputManager::new(self.config.colored_output);
        let output = output_manager.format_items(&result?, &output_format)?;
        write_output(&output, output_file)
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn resolve(
        &self,
        url: &str,
        channel_code: Option<&str>,
        cookies: Option<&str>,
        output_file: Option<&Path>,
        quality: Option<&str>,
        format: Option<&str>,
        auto_select: bool,
        output_format: OutputFormat,
        timeout_duration: Duration,
        retries: u32,
    ) -> Result<()> {
        let cookies = cookies
            .map(String::from)
            .or_else(|| self.config.cookies.clone());
        let channel = match channel_code {
            Some(code) => self.channel_factory.create_channel(code, cookies)?,
            None => self.channel_factory.channel_for_url(url, cookies)?,
        };

        let pb = self.create_progress_bar("Resolving streams...");
        let result = self
            .resolve_with_retry(channel.as_ref(), url, timeout_duration, retries)
            .await;
        pb.finish_and_clear();

        match result {
            Ok(mut item) => {
                let streams = self.apply_filters(std::mem::take(&mut item.streams), quality, format)?;
                let selected_stream = if streams.is_empty() {
                    return Err(CliError::no_matching_stream());
                } else if auto_select || self.config.auto_select || streams.len() == 1 {
                    self.auto_select_stream(streams)?
                } else {
                    self.interactive_select_stream(streams)?
                };

                let output_manager = OutputManager::new(self.config.colored_output);
                let output = output_manager.format_resolved(
                    &item,
                    Some(&selected_stream),
                    &output_format,
                )?;

                write_output(&output, output_file)?;
                Ok(())
            }
            Err(e) => {
                #[cfg(feature = "colored-output")]
                {
                    eprintln!("{}", e.to_string().red());
                }
                #[cfg(not(feature = "colored-output"))]
                {
                    eprintln!("{}", e);
                }
                Err(e)
            }
        }
    }

    pub async fn list_channels(&self, detailed: bool, output_format: &OutputFormat) -> Result<()> {
        let channels = ChannelFactory::supported_channels()
            .into_iter()
            .map(|code| self.create_channel(code))
            .collect::<Result<Vec<_>>>()?;

        match output_format {
            OutputFormat::Json | OutputFormat::JsonCompact => {
                let infos: Vec<_> = channels.iter().map(|c| c.info()).collect();
                let output = if matches!(output_format, OutputFormat::Json) {
                    serde_json::to_string_pretty(&infos)?
                } else {
                    serde_json::to_string(&infos)?
                };

                println!("{output}");
            }
            _ => {
                #[cfg(feature = "colored-output")]
                let title = if self.config.colored_output {
                    "Supported Channels:".green().bold().to_string()
                } else {
                    "Supported Channels:".to_string()
                };

                #[cfg(not(feature = "colored-output"))]
                let title = "Supported Channels:".to_string();

                println!("{title}");

                for channel in &channels {
                    let info = channel.info();
                    #[cfg(feature = "colored-output")]
                    {
                        if self.config.colored_output {
                            println!("  {} - {}", info.code.cyan().bold(), info.name.blue());
                        } else {
                            println!("  {} - {}", info.code, info.name);
                        }
                    }

                    #[cfg(not(feature = "colored-output"))]
                    {
                        println!("  {} - {}", info.code, info.name);
                    }

                    if detailed {
                        println!("      {} [{}]", info.description, info.language);
                    }
                }
            }
        }

        Ok(())
    }

    fn create_progress_bar(&self, message: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        pb.enable_steady_tick(Duration::from_millis(500));
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            pb.set_style(style.tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ "));
        }
        pb.set_message(message.to_string());
        pb
    }

    async fn resolve_with_retry(
        &self,
        channel: &dyn SiteChannel,
        url: &str,
        timeout_duration: Duration,
        retries: u32,
    ) -> Result<MediaItem> {
        let mut last_error = None;

        for attempt in 0..=retries {
            let item = channel.create_item_for_url(url);
            match timeout(timeout_duration, channel.process_video_item(item)).await {
                Ok(Ok(item)) if item.has_streams() => return Ok(item),
                // a page without streams will not get any by asking again
                Ok(Ok(_)) => return Err(CliError::no_streams_found()),
                Ok(Err(e)) => {
                    last_error = Some(CliError::from(e));
                    if attempt < retries {
                        let delay = Duration::from_millis(1000 * (1 << attempt));
                        sleep(delay).await;
                    }
                }
                Err(_) => {
                    last_error = Some(CliError::timeout());
                    if attempt < retries {
                        let delay = Duration::from_millis(1000 * (1 << attempt));
                        sleep(delay).await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(CliError::timeout))
    }

    fn auto_select_stream(&self, mut streams: Vec<MediaStream>) -> Result<MediaStream> {
        // Find the index of the stream with max bitrate
        let index = streams
            .iter()
            .enumerate()
            .max_by_key(|(_, s)| s.bitrate)
            .map(|(index, _)| index)
            .ok_or_else(CliError::no_streams_found)?;

        Ok(streams.swap_remove(index))
    }

    fn interactive_select_stream(&self, streams: Vec<MediaStream>) -> Result<MediaStream> {
        if streams.is_empty() {
            return Err(CliError::no_streams_found());
        }

        #[cfg(feature = "interactive")]
        {
            let options: Vec<String> = streams
                .iter()
                .enumerate()
                .map(|(i, stream)| format!("{}: {} - {}", i + 1, stream, stream.url))
                .collect();

            let selection = inquire::Select::new("Select a stream:", options)
                .prompt()
                .map_err(|_| CliError::user_cancelled())?;

            let index = selection
                .split(':')
                .next()
                .and_then(|s| s.parse::<usize>().ok())
                .and_then(|i| i.checked_sub(1))
                .ok_or_else(|| CliError::invalid_input("Invalid selection"))?;

            streams
                .into_iter()
                .nth(index)
                .ok_or_else(|| CliError::invalid_input("Invalid stream index"))
        }

        #[cfg(not(feature = "interactive"))]
        {
            // Fallback: auto-select when the interactive feature is disabled
            self.auto_select_stream(streams)
        }
    }

    /// Keeps the streams whose quality label and format match the filters.
    fn apply_filters(
        &self,
        streams: Vec<MediaStream>,
        quality: Option<&str>,
        format: Option<&str>,
    ) -> Result<Vec<MediaStream>> {
        let quality_filter = quality.map(StreamFilter::new).transpose()?;
        let format_filter = format.map(StreamFilter::new).transpose()?;

        Ok(streams
            .into_iter()
            .filter(|stream| {
                quality_filter
                    .as_ref()
                    .is_none_or(|f| f.matches(stream.quality.as_deref().unwrap_or_default()))
            })
            .filter(|stream| {
                format_filter
                    .as_ref()
                    .is_none_or(|f| f.matches(stream.stream_format.as_str()))
            })
            .collect())
    }
}

/// A regex filter, or a substring filter without the regex feature.
struct StreamFilter {
    #[cfg(feature = "regex-filters")]
    regex: Regex,
    #[cfg(not(feature = "regex-filters"))]
    needle: String,
}

impl StreamFilter {
    fn new(pattern: &str) -> Result<Self> {
        #[cfg(feature = "regex-filters")]
        {
            let regex = Regex::new(pattern)
                .map_err(|e| CliError::invalid_filter(format!("Invalid filter regex: {e}")))?;
            Ok(Self { regex })
        }

        #[cfg(not(feature = "regex-filters"))]
        {
            Ok(Self {
                needle: pattern.to_string(),
            })
        }
    }

    fn matches(&self, value: &str) -> bool {
        #[cfg(feature = "regex-filters")]
        {
            self.regex.is_match(value)
        }

        #[cfg(not(feature = "regex-filters"))]
        {
            value.contains(&self.needle)
        }
    }
}

async fn with_timeout<T, F>(duration: Duration, future: F) -> Result<T>
where
    F: Future<Output = std::result::Result<T, channels_parser::channel::error::ChannelError>>,
{
    match timeout(duration, future).await {
        Ok(result) => Ok(result?),
        Err(_) => Err(CliError::timeout()),
    }
}
