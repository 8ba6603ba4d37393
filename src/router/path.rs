//! Route path helpers.

use axum::Router;

/// Collapse repeated `/`, force a leading `/` and drop a trailing one.
pub fn normalize(path: &str) -> String {
    let segments: Vec<&str> = path
        .trim()
        .split('/')
        .filter(|segment| !segment.is_empty())
        .collect();
    format!("/{}", segments.join("/"))
}

pub fn join<I, S>(segments: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let joined: Vec<String> = segments
        .into_iter()
        .map(|segment| segment.as_ref().to_string())
        .collect();
    normalize(&joined.join("/"))
}

pub fn is_root(path: &str) -> bool {
    normalize(path) == "/"
}

/// Translate `:name` and `*name` segments to the router's `{name}` and
/// `{*name}` captures. A bare `*` becomes `{*wildcard}`.
pub fn to_axum(path: &str) -> String {
    let segments: Vec<String> = normalize(path)
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            if let Some(name) = segment.strip_prefix(':') {
                format!("{{{}}}", name.trim_end_matches('?'))
            } else if let Some(name) = segment.strip_prefix('*') {
                let name = if name.is_empty() { "wildcard" } else { name };
                format!("{{*{}}}", name)
            } else {
                segment.to_string()
            }
        })
        .collect();
    format!("/{}", segments.join("/"))
}

/// Every route an Express-style path with optional `:name?` segments stands
/// for, longest first.
///
/// Each optional segment may be present or absent. Variants whose shape an
/// earlier, longer variant already covers are dropped, so `/a/:b?/:c?`
/// yields `/a/{b}/{c}`, `/a/{b}` and `/a`.
pub fn to_axum_routes(path: &str) -> Vec<String> {
    let normalized = normalize(path);
    let segments: Vec<&str> = normalized
        .split('/')
        .filter(|segment| !segment.is_empty())
        .collect();
    let optional: Vec<usize> = segments
        .iter()
        .enumerate()
        .filter(|(_, segment)| segment.starts_with(':') && segment.ends_with('?'))
        .map(|(index, _)| index)
        .collect();

    // Masks with more optional segments kept come first.
    let mut masks: Vec<u32> = (0..1u32 << optional.len()).collect();
    masks.sort_by_key(|mask| std::cmp::Reverse(mask.count_ones()));

    let mut routes: Vec<String> = Vec::new();
    let mut shapes: Vec<String> = Vec::new();
    for mask in masks {
        let kept: Vec<&str> = segments
            .iter()
            .enumerate()
            .filter(|(index, _)| match optional.iter().position(|slot| slot == index) {
                Some(bit) => mask & (1 << bit) != 0,
                None => true,
            })
            .map(|(_, segment)| *segment)
            .collect();
        let route = to_axum(&kept.join("/"));
        let route_shape = shape(&route);
        if !shapes.contains(&route_shape) {
            shapes.push(route_shape);
            routes.push(route);
        }
    }
    routes
}

/// The path with capture names erased, two paths with the same shape cannot
/// both be routed.
pub(crate) fn shape(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            if segment.starts_with("{*") {
                "{*}"
            } else if segment.starts_with('{') {
                "{}"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Whether a static mount shadows the api prefix.
pub fn overlaps(static_path: &str, api_prefix: &str) -> bool {
    let prefix = normalize(api_prefix);
    if prefix == "/" {
        return false;
    }
    let static_path = normalize(static_path);
    static_path == prefix || static_path.starts_with(&format!("{prefix}/"))
}

/// The part of `path` below `mount`, if `path` is below it.
pub fn strip_mount(path: &str, mount: &str) -> Option<String> {
    if mount == "/" {
        return Some(path.to_string());
    }
    match path.strip_prefix(mount) {
        Some("") => Some("/".to_string()),
        Some(rest) if rest.starts_with('/') => Some(rest.to_string()),
        _ => None,
    }
}

/// Nest `router` at `path`, or merge it when `path` is the root.
pub(crate) fn mount_at(target: Router, path: &str, router: Router) -> Router {
    if is_root(path) {
        target.merge(router)
    } else {
        target.nest(&normalize(path), router)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(""), "/");
        assert_eq!(normalize("/"), "/");
        assert_eq!(normalize("api"), "/api");
        assert_eq!(normalize("//api///v1/"), "/api/v1");
        assert_eq!(normalize(" /assets "), "/assets");
    }

    #[test]
    fn test_join_accumulates_directory_prefixes() {
        assert_eq!(join(["/api", "admin", "/users/"]), "/api/admin/users");
        assert_eq!(join(["/", "", "/"]), "/");
    }

    #[test]
    fn test_to_axum_translates_captures() {
        assert_eq!(to_axum("/:id"), "/{id}");
        assert_eq!(to_axum("users/:id/posts/:post?"), "/users/{id}/posts/{post}");
        assert_eq!(to_axum("/files/*rest"), "/files/{*rest}");
        assert_eq!(to_axum("*"), "/{*wildcard}");
        assert_eq!(to_axum(""), "/");
    }

    #[test]
    fn test_optional_segments_expand_to_every_route() {
        assert_eq!(
            to_axum_routes("users/:id/posts/:post?"),
            vec!["/users/{id}/posts/{post}", "/users/{id}/posts"]
        );
        assert_eq!(to_axum_routes("/:lang?"), vec!["/{lang}", "/"]);
        assert_eq!(
            to_axum_routes("/a/:b?/:c?"),
            vec!["/a/{b}/{c}", "/a/{b}", "/a"]
        );
        assert_eq!(to_axum_routes("/a/:b?/c"), vec!["/a/{b}/c", "/a/c"]);
        assert_eq!(to_axum_routes("/users/:id"), vec!["/users/{id}"]);
    }

    #[test]
    fn test_shape_ignores_capture_names() {
        assert_eq!(shape("/users/{id}"), shape("/users/{name}"));
        assert_ne!(shape("/users/{id}"), shape("/users/{*id}"));
    }

    #[test]
    fn test_overlaps() {
        assert!(overlaps("/api", "/api"));
        assert!(overlaps("/api/assets", "/api"));
        assert!(overlaps("api/assets/", "/api/"));
        assert!(!overlaps("/apidocs", "/api"));
        assert!(!overlaps("/", "/api"));
        assert!(!overlaps("/api", "/"));
    }

    #[test]
    fn test_strip_mount() {
        assert_eq!(strip_mount("/assets/app.js", "/assets").as_deref(), Some("/app.js"));
        assert_eq!(strip_mount("/assets", "/assets").as_deref(), Some("/"));
        assert_eq!(strip_mount("/assetsx", "/assets"), None);
        assert_eq!(strip_mount("/index.html", "/").as_deref(), Some("/index.html"));
    }
}
