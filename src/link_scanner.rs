use scraper::{Html, Selector};
use std::collections::HashSet;

const HREF_SIGNALS: &[&str] = &["unsubscribe", "optout", "opt-out", "remove"];
// "remove" is needed for plain "remove me" anchors whose href carries no signal
const TEXT_SIGNALS: &[&str] = &["unsubscribe", "opt out", "opt-out", "remove"];

/// Collect candidate unsubscribe links from an HTML body.
///
/// Every `<a href>` is checked; a link qualifies when either its href or its
/// visible text carries an unsubscribe signal. Results keep document order
/// and drop exact duplicates.
pub fn scan_unsubscribe_links(html: &str) -> Vec<String> {
    let mut links = Vec::new();

    if html.trim().is_empty() {
        return links;
    }

    let selector = match Selector::parse("a[href]") {
        Ok(selector) => selector,
        Err(_) => return links,
    };

    let document = Html::parse_document(html);
    let mut seen = HashSet::new();

    for anchor in document.select(&selector) {
        let href = match anchor.value().attr("href") {
            Some(href) => href,
            None => continue,
        };
        let text = anchor.text().collect::<String>();

        if is_unsubscribe_link(href, &text) && seen.insert(href.to_string()) {
            links.push(href.to_string());
        }
    }

    links
}

fn is_unsubscribe_link(href: &str, text: &str) -> bool {
    if href.trim().is_empty() {
        return false;
    }

    let href_lower = href.to_lowercase();
    let text_lower = text.to_lowercase();

    HREF_SIGNALS.iter().any(|s| href_lower.contains(s))
        || TEXT_SIGNALS.iter().any(|s| text_lower.contains(s))
}
