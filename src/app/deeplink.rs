//! Deep links: `?id=<trackId>` in, share links out.

use reqwest::Url;

/// Base used to resolve a bare `?id=...` query.
const QUERY_ONLY_BASE: &str = "http://localhost/";

/// Extract the track id from a link such as `https://host/player.html?id=abc`,
/// a bare `?id=abc` or `id=abc`.
pub fn parse_track_id(link: &str) -> Option<String> {
    let link = link.trim();
    if link.is_empty() {
        return None;
    }

    let url = match Url::parse(link) {
        Ok(url) => url,
        Err(_) => {
            let query = link.trim_start_matches('?');
            Url::parse(&format!("{QUERY_ONLY_BASE}?{query}")).ok()?
        }
    };

    url.query_pairs()
        .find(|(key, _)| key == "id")
        .map(|(_, value)| value.trim().to_string())
        .filter(|id| !id.is_empty())
}

/// `origin + path + ?id=<track_id>`; any query or fragment on `base` is dropped.
pub fn share_link(base: &str, track_id: &str) -> Result<String, String> {
    let mut url = Url::parse(base.trim()).map_err(|e| format!("{base}: {e}"))?;
    if url.cannot_be_a_base() {
        return Err(format!("{base}: not a page URL"));
    }
    url.set_fragment(None);
    url.set_query(None);
    url.query_pairs_mut().append_pair("id", track_id);
    Ok(url.into())
}
