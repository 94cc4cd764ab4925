//! Backend URL handling
//!
//! Base URLs come from user settings or `OLLAMA_HOST`, so they arrive with
//! or without a scheme and with stray trailing slashes.

/// Strip trailing slashes so endpoints can be appended safely.
///
/// ```
/// use newhorizon::utils::url::normalize_base_url;
///
/// assert_eq!(normalize_base_url("http://localhost:11434/"), "http://localhost:11434");
/// ```
pub fn normalize_base_url(base_url: &str) -> String {
    base_url.trim().trim_end_matches('/').to_string()
}

/// Join a base URL and an endpoint path with exactly one slash.
///
/// ```
/// use newhorizon::utils::url::construct_api_url;
///
/// assert_eq!(
///     construct_api_url("http://localhost:11434/", "/api/chat"),
///     "http://localhost:11434/api/chat"
/// );
/// ```
pub fn construct_api_url(base_url: &str, endpoint: &str) -> String {
    let normalized_base = normalize_base_url(base_url);
    let endpoint = endpoint.trim_start_matches('/');
    format!("{normalized_base}/{endpoint}")
}

/// Turn an `OLLAMA_HOST` style value (`0.0.0.0:11434`, `localhost`) into a
/// base URL. Values that already carry a scheme are only normalized.
pub fn base_url_from_host(host: &str) -> String {
    let host = host.trim();
    if host.contains("://") {
        normalize_base_url(host)
    } else {
        normalize_base_url(&format!("http://{host}"))
    }
}
