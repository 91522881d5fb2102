use crate::Target;
use std::time::Duration;
use url::Url;

/// URL a probe requests for `target`: the target itself when it already has
/// a scheme, otherwise `https://<target>`.
pub fn target_url(target: &Target) -> String {
    let raw = target.as_str().trim();
    if raw.contains("://") {
        raw.to_string()
    } else {
        format!("https://{raw}")
    }
}

/// Host (without port) that `target` resolves to.
pub fn target_host(target: &Target) -> Option<String> {
    host_of(&target_url(target))
}

pub fn host_of(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_ascii_lowercase()))
}

/// Whether `host` belongs to the site at `site_host`, subdomains included.
pub fn is_same_site(host: &str, site_host: &str) -> bool {
    let host = host.trim_start_matches("www.").to_ascii_lowercase();
    let site = site_host.trim_start_matches("www.").to_ascii_lowercase();
    host == site || host.ends_with(&format!(".{site}"))
}

/// Filesystem-safe token derived from a URL: every non-alphanumeric byte becomes `_`.
pub fn sanitize_url_token(url: &str) -> String {
    url.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

pub fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.as_secs();
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    let millis = duration.subsec_millis();

    if hours > 0 {
        format!("{hours}h {minutes}m {seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else if seconds > 0 {
        format!("{}.{}s", seconds, millis / 100)
    } else {
        format!("{millis}ms")
    }
}

/// Round to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
