//! Origin validation for the browser-facing HTTP transports.
//!
//! When enabled, requests must carry an `Origin` header whose host appears
//! in the allow-list (`*` matches any host). Disabled by default, matching
//! the configuration default.

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::warn;

/// The origin allow-list policy shared by the middleware instances.
#[derive(Debug, Clone)]
pub struct OriginPolicy {
    enabled: bool,
    allowed: Vec<String>,
}

impl OriginPolicy {
    /// Creates a policy from configuration.
    #[must_use]
    pub const fn new(enabled: bool, allowed: Vec<String>) -> Self {
        Self { enabled, allowed }
    }

    /// Checks an `Origin` header value against the policy.
    ///
    /// # Errors
    ///
    /// Returns a static description of the rejection reason.
    pub fn check(&self, origin: Option<&str>) -> Result<(), &'static str> {
        if !self.enabled {
            return Ok(());
        }

        let Some(origin) = origin else {
            return Err("missing Origin header");
        };

        let Some(host) = origin_host(origin) else {
            return Err("invalid Origin header");
        };

        if self
            .allowed
            .iter()
            .any(|allowed| allowed == "*" || allowed == host)
        {
            Ok(())
        } else {
            Err("origin not allowed")
        }
    }
}

/// Extracts the host part of an origin value like `https://example.com:8443`.
fn origin_host(origin: &str) -> Option<&str> {
    let rest = origin.split_once("://").map_or(origin, |(_, rest)| rest);
    let host = rest.split('/').next()?.split(':').next()?;
    if host.is_empty() {
        None
    } else {
        Some(host)
    }
}

/// Axum middleware enforcing the origin policy.
pub async fn check_origin(
    State(policy): State<OriginPolicy>,
    request: Request,
    next: Next,
) -> Response {
    let origin = request
        .headers()
        .get("origin")
        .and_then(|v| v.to_str().ok());

    match policy.check(origin) {
        Ok(()) => next.run(request).await,
        Err(reason) => {
            warn!(origin = ?origin, reason, "Rejecting request failing origin check");
            (StatusCode::FORBIDDEN, format!("Forbidden: {reason}")).into_response()
        }
    }
}
