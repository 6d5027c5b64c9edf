//! Static routing tables: which paths need which credentials, and which backend
//! service owns which path prefix.

pub mod access;
pub mod router;

pub use access::{Access, AccessRule, PathPattern, RoutePolicy};
pub use router::{RouteMatch, ServiceRoute, ServiceRouter, ServiceRouterBuilder};

/// True if `path` is `prefix` itself or lies below it on a segment boundary
pub(crate) fn matches_prefix(path: &str, prefix: &str) -> bool {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        return true;
    }

    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// True if any segment of `path` is `.` or `..`, percent-encoded or not
///
/// Such paths could resolve to a different route on the backend than the one
/// the gateway authorized.
pub(crate) fn has_dot_segment(path: &str) -> bool {
    path.split('/').any(|segment| {
        let decoded = segment.replace("%2e", ".").replace("%2E", ".");
        decoded == "." || decoded == ".."
    })
}
