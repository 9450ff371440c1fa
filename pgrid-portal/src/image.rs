use std::collections::HashMap;

use base64::{engine::general_purpose::STANDARD as base64_engine, Engine as _};
use reqwest::Url;
use scraper::{Html, Node};

use pgrid_util::select;

/// Remote images referenced by an HTML fragment.
///
/// Returns each distinct `src` together with the url it resolves to against
/// `base`. Sources that are already `data:` URIs are skipped.
pub fn remote_images(html: &str, base: &Url) -> Vec<(String, Url)> {
    let fragment = Html::parse_fragment(html);
    let mut images: Vec<(String, Url)> = Vec::new();
    for img in fragment.select(select!("img[src]")) {
        let src = img.value().attr("src").unwrap_or_default().trim();
        if src.is_empty() || src.starts_with("data:") || images.iter().any(|(s, _)| s == src) {
            continue;
        }
        if let Ok(url) = base.join(src) {
            images.push((src.to_owned(), url));
        }
    }
    images
}

/// Replaces the `src` of every image found in `data_uris`.
pub fn inline_images(html: &str, data_uris: &HashMap<String, String>) -> String {
    if data_uris.is_empty() {
        return html.to_owned();
    }
    let mut fragment = Html::parse_fragment(html);
    let ids = fragment
        .select(select!("img[src]"))
        .map(|img| img.id())
        .collect::<Vec<_>>();
    for id in ids {
        let mut node = match fragment.tree.get_mut(id) {
            Some(node) => node,
            None => continue,
        };
        if let Node::Element(elem) = node.value() {
            for (name, value) in elem.attrs.iter_mut() {
                if &*name.local != "src" {
                    continue;
                }
                if let Some(uri) = data_uris.get(value.trim()) {
                    *value = uri.as_str().into();
                }
            }
        }
    }
    fragment.root_element().inner_html()
}

pub fn to_data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime, base64_engine.encode(bytes))
}

/// Mime type of an image from its file extension, for responses without one.
pub fn guess_mime(url: &Url) -> &'static str {
    let ext = url
        .path()
        .rsplit('.')
        .next()
        .unwrap_or_default()
        .to_lowercase();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}
