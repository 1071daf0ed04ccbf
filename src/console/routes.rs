//! Route matching.
//!
//! Matching is a pure function over the request path against the
//! console's endpoints rooted at [`BASE_PATH`]. A request that resolves
//! to `None` is not the console's concern and must be left for other
//! handlers.

use crate::assets::StaticFiles;
use crate::http::HttpRequest;

use super::config::BASE_PATH;

/// A resolved console endpoint, consumed by the verb dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// `GET {base}/system-info`
    SystemInfo,
    /// `GET {base}/events`
    Events,
    /// `GET {base}/logs`
    Logs,
    /// `GET|PATCH {base}/config`
    Config,
    /// `DELETE {base}/service/{name}` — carries the component name.
    Service(String),
    /// `GET {base}{ui_path}` — the dashboard root document.
    Ui,
    /// `GET {base}/{file}` — a bundled static asset.
    Asset(String),
}

impl Route {
    /// Stable label for metrics.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::SystemInfo => "system-info",
            Self::Events => "events",
            Self::Logs => "logs",
            Self::Config => "config",
            Self::Service(_) => "service",
            Self::Ui => "ui",
            Self::Asset(_) => "asset",
        }
    }
}

/// Matches `request` against the console's routes.
///
/// `live_services` is the list of currently registered, non-excluded
/// component names: a `service/{name}` path only matches while its
/// target is alive, so an unknown name falls through to the host's 404.
#[must_use]
pub fn match_route(
    request: &HttpRequest,
    ui_path: &str,
    assets: &StaticFiles,
    live_services: &[String],
) -> Option<Route> {
    let path = request.path.split('?').next().unwrap_or(&request.path);
    let rest = path.strip_prefix(BASE_PATH)?;
    // Reject siblings like /dev-console-extra.
    if !rest.is_empty() && !rest.starts_with('/') {
        return None;
    }
    let rest = normalize(rest);

    match rest {
        "/system-info" => Some(Route::SystemInfo),
        "/events" => Some(Route::Events),
        "/logs" => Some(Route::Logs),
        "/config" => Some(Route::Config),
        _ => {
            if let Some(name) = rest.strip_prefix("/service/") {
                if !name.is_empty()
                    && !name.contains('/')
                    && live_services.iter().any(|s| s == name)
                {
                    return Some(Route::Service(name.to_string()));
                }
                return None;
            }
            if rest == normalize(ui_path) {
                return Some(Route::Ui);
            }
            if let Some(file) = rest.strip_prefix('/') {
                if !file.contains('/') && assets.contains(file) {
                    return Some(Route::Asset(file.to_string()));
                }
            }
            None
        }
    }
}

/// Drops a single trailing slash so `/events/` matches `/events`.
fn normalize(path: &str) -> &str {
    match path.strip_suffix('/') {
        Some(stripped) if !stripped.is_empty() => stripped,
        _ => path,
    }
}
