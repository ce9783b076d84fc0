use url::Url;

/// Build the WebSocket URL for `path` on the backend at `api_base`.
///
/// `http` becomes `ws` and `https` becomes `wss`. A bare `host:port` base is
/// treated as plain `ws://`.
pub fn websocket_url(api_base: &str, path: &str) -> String {
    let joined = format!("{}{path}", api_base.trim_end_matches('/'));
    if let Ok(mut url) = Url::parse(&joined) {
        let scheme = match url.scheme() {
            "http" | "ws" => Some("ws"),
            "https" | "wss" => Some("wss"),
            _ => None,
        };
        if let Some(scheme) = scheme
            && url.set_scheme(scheme).is_ok()
        {
            return url.to_string();
        }
    }
    match joined.strip_prefix("http") {
        Some(rest) => format!("ws{rest}"),
        None => format!("ws://{joined}"),
    }
}

/// Plain HTTP health endpoint used to probe the backend before upgrading.
pub fn health_url(api_base: &str) -> String {
    format!("{}/health", api_base.trim_end_matches('/'))
}
