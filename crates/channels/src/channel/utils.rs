use scraper::Html;

/// Converts an HTML fragment into its plain text, e.g. search hits with
/// `<em>` highlighting.
pub fn html_to_text(fragment: &str) -> String {
    if !fragment.contains('<') && !fragment.contains('&') {
        return fragment.to_string();
    }

    Html::parse_fragment(fragment)
        .root_element()
        .text()
        .collect::<String>()
        .trim()
        .to_string()
}
