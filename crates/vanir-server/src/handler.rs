//! HTTP resolution handler for vanity import paths.
//!
//! Turns an inbound request into a health-probe acknowledgment, an
//! HTTPS-upgrade redirect, a documentation redirect, or a rendered
//! meta-tag page, with one bounded backend resolution per request.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    Router,
    extract::{Query, Request, State},
    http::{Method, StatusCode, header},
    response::{Html, IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use thiserror::Error;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::error;
use vanir::{Backend, BackendError, Entry};

use crate::metrics::Metrics;

const LB_PROBE_USER_AGENT: &str = "GoogleHC/1.0";
const X_FORWARDED_HOST: &str = "x-forwarded-host";
const X_FORWARDED_PROTO: &str = "x-forwarded-proto";

/// Shared state of the resolution handler, fixed at construction.
pub struct VanityState {
    pub backend: Arc<dyn Backend>,
    pub doc_base_url: String,
    pub call_deadline: Duration,
    pub metrics: Arc<Metrics>,
}

#[derive(Debug, Deserialize)]
struct ResolveParams {
    #[serde(rename = "go-get")]
    go_get: Option<String>,
}

/// Build the resolution router; every path is answered by the resolver.
pub fn router(state: Arc<VanityState>) -> Router {
    Router::new()
        .fallback(resolve)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

async fn resolve(
    State(state): State<Arc<VanityState>>,
    Query(params): Query<ResolveParams>,
    request: Request,
) -> Response {
    // tell the load balancer everything is fine
    if user_agent(&request) == Some(LB_PROBE_USER_AGENT) {
        return StatusCode::OK.into_response();
    }

    if !is_https(&request) {
        let path_and_query = request
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        let target = format!("https://{}{}", host(&request), path_and_query);
        return (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, target)]).into_response();
    }

    if request.method() != Method::GET {
        return StatusCode::METHOD_NOT_ALLOWED.into_response();
    }

    let import_path = format!("{}{}", host(&request), request.uri().path());

    let started = Instant::now();
    let resolved = resolve_entry(&state, &import_path).await;
    state.metrics.observe_backend(started.elapsed());

    let (entry, suffix) = match resolved {
        Ok(found) => {
            state.metrics.inc_calls();
            found
        }
        Err(BackendError::NotFound) => {
            state.metrics.inc_not_found();
            return StatusCode::NOT_FOUND.into_response();
        }
        Err(err) => {
            error!("unable to resolve {import_path}: {err}");
            state.metrics.inc_errors();
            return (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response();
        }
    };

    if params.go_get.as_deref() != Some("1") {
        state.metrics.inc_doc_redirects();
        let target = format!("{}{}", state.doc_base_url, import_path);
        return Redirect::temporary(&target).into_response();
    }

    let vcs_root = format!("{}{}", entry.vcs_root, suffix);
    match render_meta(&import_path, &entry.vcs, &vcs_root) {
        Ok(body) => (
            StatusCode::OK,
            [(header::CACHE_CONTROL, "public, max-age=300")],
            Html(body),
        )
            .into_response(),
        Err(err) => {
            error!("unable to render meta tags for {import_path}: {err}");
            state.metrics.inc_template_errors();
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
        }
    }
}

/// Resolve `import_path` to its registered entry under one deadline window.
async fn resolve_entry(state: &VanityState, import_path: &str) -> vanir::Result<(Entry, String)> {
    match tokio::time::timeout(
        state.call_deadline,
        lookup_prefixes(state.backend.as_ref(), import_path),
    )
    .await
    {
        Ok(result) => result,
        Err(_) => Err(BackendError::Cancelled),
    }
}

/// Look up `import_path`, trimming trailing path segments until a
/// registered entry matches. The returned suffix is the request path
/// portion beyond the matched import path.
async fn lookup_prefixes(backend: &dyn Backend, import_path: &str) -> vanir::Result<(Entry, String)> {
    let mut prefix = import_path;
    loop {
        match backend.get(prefix).await {
            Ok(entry) => {
                let suffix = import_path[prefix.len()..].to_string();
                return Ok((entry, suffix));
            }
            Err(BackendError::NotFound) => match prefix.rfind('/') {
                Some(cut) => prefix = &prefix[..cut],
                None => return Err(BackendError::NotFound),
            },
            Err(err) => return Err(err),
        }
    }
}

fn user_agent(request: &Request) -> Option<&str> {
    header_str(request, header::USER_AGENT.as_str())
}

/// Effective host of the request; a forwarding proxy's header wins over
/// the raw host.
fn host(request: &Request) -> String {
    if let Some(forwarded) = header_str(request, X_FORWARDED_HOST) {
        return forwarded.to_string();
    }
    if let Some(host) = header_str(request, header::HOST.as_str()) {
        return host.to_string();
    }
    request
        .uri()
        .authority()
        .map(|authority| authority.to_string())
        .unwrap_or_default()
}

/// HTTPS detection. An absolute request URI scheme is authoritative;
/// otherwise `X-Forwarded-Proto` decides; otherwise the request counts as
/// insecure. TLS connection state is never consulted, the server sits
/// behind a TLS-terminating ingress.
fn is_https(request: &Request) -> bool {
    if let Some(scheme) = request.uri().scheme_str() {
        return scheme.eq_ignore_ascii_case("https");
    }
    header_str(request, X_FORWARDED_PROTO)
        .is_some_and(|proto| proto.eq_ignore_ascii_case("https"))
}

fn header_str<'r>(request: &'r Request, name: &str) -> Option<&'r str> {
    request
        .headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
}

/// Meta-tag rendering failures.
///
/// Counted apart from backend failures: a field that would corrupt the
/// space-delimited meta content indicates a malformed stored entry, a
/// local defect rather than a storage problem.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("{field} is empty")]
    Empty { field: &'static str },

    #[error("{field} contains whitespace: {value:?}")]
    Whitespace { field: &'static str, value: String },
}

/// Render the meta-tag page consumed by package tooling.
fn render_meta(
    import_path: &str,
    vcs: &str,
    vcs_root: &str,
) -> std::result::Result<String, RenderError> {
    for (field, value) in [
        ("import path", import_path),
        ("vcs", vcs),
        ("vcs root", vcs_root),
    ] {
        if value.is_empty() {
            return Err(RenderError::Empty { field });
        }
        if value.chars().any(char::is_whitespace) {
            return Err(RenderError::Whitespace {
                field,
                value: value.to_string(),
            });
        }
    }

    Ok(format!(
        "<!DOCTYPE html><html><head>\n\
         <meta http-equiv=\"Content-Type\" content=\"text/html; charset=utf-8\"/>\n\
         <meta name=\"go-import\" content=\"{import_path} {vcs} {vcs_root}\">\n\
         <meta name=\"go-source\" content=\"{import_path} {vcs_root} {vcs_root}/tree/master{{/dir}} {vcs_root}/blob/master{{/dir}}/{{file}}#L{{line}}\">\n\
         </head></html>\n"
    ))
}
