//! Refresh endpoint derivation.

use url::Url;

const REFRESH_PATH: &str = "/auth/refresh";

/// Ordered, de-duplicated refresh URLs for an API base.
///
/// The configured base is tried first, with and without the `/api` segment.
/// When the base points at a local host, the same forms are repeated for
/// each alternate port so a dev backend on another port still answers.
pub fn refresh_candidates(base_url: &str, alternate_local_ports: &[u16]) -> Vec<String> {
    let base = base_url.trim().trim_end_matches('/');
    if base.is_empty() {
        return Vec::new();
    }

    let mut roots = vec![base.to_string()];
    if let Ok(parsed) = Url::parse(base) {
        if is_local_host(parsed.host_str()) {
            for port in alternate_local_ports {
                let mut alt = parsed.clone();
                if alt.set_port(Some(*port)).is_ok() {
                    roots.push(alt.as_str().trim_end_matches('/').to_string());
                }
            }
        }
    }

    let mut candidates: Vec<String> = Vec::new();
    for root in roots {
        let forms = match root.strip_suffix("/api") {
            Some(without_api) => [
                format!("{root}{REFRESH_PATH}"),
                format!("{without_api}{REFRESH_PATH}"),
            ],
            None => [
                format!("{root}/api{REFRESH_PATH}"),
                format!("{root}{REFRESH_PATH}"),
            ],
        };
        for url in forms {
            if !candidates.contains(&url) {
                candidates.push(url);
            }
        }
    }
    candidates
}

fn is_local_host(host: Option<&str>) -> bool {
    matches!(host, Some("localhost") | Some("127.0.0.1") | Some("[::1]"))
}
