use crate::options::REFRESH_RATES;

const INDEX_TEMPLATE: &str = include_str!("index.html");
const TITLE_TOKEN: &str = "{{title}}";
const CACHE_BUST_TOKEN: &str = "{{cache_bust}}";
const REFRESH_OPTIONS_TOKEN: &str = "{{refresh_options}}";

pub fn render_index(title: &str, cache_bust: &str, selected_refresh_ms: u32) -> String {
    let refresh_options = REFRESH_RATES
        .iter()
        .map(|(ms, label)| {
            let selected = if *ms == selected_refresh_ms { " selected" } else { "" };
            format!(
                "                <option value=\"{}\"{}>{}</option>",
                ms, selected, label
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    INDEX_TEMPLATE
        .replace(TITLE_TOKEN, &escape_html(title))
        .replace(CACHE_BUST_TOKEN, cache_bust)
        .replace(REFRESH_OPTIONS_TOKEN, &refresh_options)
}

pub fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
