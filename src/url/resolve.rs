//! Reference resolution (RFC 3986, Section 5.2.2)

use super::normalize::remove_dot_segments;
use super::CanonicalUrl;

/// Resolves `reference` against `base`
///
/// The fragment always comes from the reference. The result is assembled
/// through [`CanonicalUrl::from_parts`], which re-applies the default-port
/// and empty-path rules.
pub fn resolve(base: &CanonicalUrl, reference: &CanonicalUrl) -> CanonicalUrl {
    let fragment = reference.fragment.clone();

    if reference.scheme.is_some() {
        return CanonicalUrl::from_parts(
            reference.scheme.clone(),
            reference.userinfo.clone(),
            reference.host.clone(),
            reference.port,
            remove_dot_segments(&reference.path),
            reference.query.clone(),
            fragment,
        );
    }

    if reference.host.is_some() {
        return CanonicalUrl::from_parts(
            base.scheme.clone(),
            reference.userinfo.clone(),
            reference.host.clone(),
            reference.port,
            remove_dot_segments(&reference.path),
            reference.query.clone(),
            fragment,
        );
    }

    let (path, query) = if reference.path.is_empty() {
        (
            base.path.clone(),
            reference.query.clone().or_else(|| base.query.clone()),
        )
    } else if reference.path.starts_with('/') {
        (remove_dot_segments(&reference.path), reference.query.clone())
    } else {
        (
            remove_dot_segments(&merge_paths(base, &reference.path)),
            reference.query.clone(),
        )
    };

    CanonicalUrl::from_parts(
        base.scheme.clone(),
        base.userinfo.clone(),
        base.host.clone(),
        base.port,
        path,
        query,
        fragment,
    )
}

/// Appends a relative path to the directory part of the base path
fn merge_paths(base: &CanonicalUrl, relative: &str) -> String {
    if base.host.is_some() && (base.path.is_empty() || base.path == "/") {
        return format!("/{relative}");
    }

    match base.path.rfind('/') {
        Some(pos) => format!("{}{}", &base.path[..=pos], relative),
        None => relative.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(text: &str) -> CanonicalUrl {
        CanonicalUrl::parse(text).unwrap()
    }

    fn resolved(base: &str, reference: &str) -> String {
        resolve(&url(base), &url(reference)).to_string()
    }

    #[test]
    fn test_parent_reference() {
        assert_eq!(
            resolved("http://a.com/base/index.html", "../x"),
            "http://a.com/x"
        );
    }

    #[test]
    fn test_sibling_reference() {
        assert_eq!(resolved("http://a.com/base/", "y"), "http://a.com/base/y");
    }

    #[test]
    fn test_relative_to_root_base() {
        assert_eq!(resolved("http://a.com", "y"), "http://a.com/y");
        assert_eq!(resolved("http://a.com/", "./y"), "http://a.com/y");
    }

    #[test]
    fn test_current_directory_reference() {
        assert_eq!(
            resolved("http://example.com/a/b/isto.html", "./isso.html"),
            "http://example.com/a/b/isso.html"
        );
    }

    #[test]
    fn test_absolute_path_reference() {
        assert_eq!(
            resolved("http://example.com/a/b/c?q", "/p4/../p5"),
            "http://example.com/p5"
        );
    }

    #[test]
    fn test_network_path_reference_takes_base_scheme() {
        assert_eq!(
            resolved("http://example.com/a", "//Other.net:80/x/../y"),
            "http://other.net/y"
        );
    }

    #[test]
    fn test_network_path_keeps_custom_port() {
        assert_eq!(
            resolved("http://example.com/a", "//other.net:8080/"),
            "http://other.net:8080/"
        );
    }

    #[test]
    fn test_empty_reference_keeps_base_query() {
        assert_eq!(
            resolved("http://example.com/a/b?x=1#top", ""),
            "http://example.com/a/b?x=1"
        );
    }

    #[test]
    fn test_query_only_reference_replaces_query() {
        assert_eq!(
            resolved("http://example.com/a/b?x=1", "?y=2"),
            "http://example.com/a/b?y=2"
        );
    }

    #[test]
    fn test_fragment_comes_from_reference() {
        assert_eq!(
            resolved("http://example.com/a/b#old", "#new"),
            "http://example.com/a/b#new"
        );
        assert_eq!(
            resolved("http://example.com/a#old", "c"),
            "http://example.com/c"
        );
    }

    #[test]
    fn test_absolute_reference_ignores_base() {
        assert_eq!(
            resolved("http://example.com/a/b", "http://Other.net/./z"),
            "http://other.net/z"
        );
    }

    #[test]
    fn test_parent_above_root_is_clamped() {
        assert_eq!(
            resolved("http://example.com/a", "../../../x"),
            "http://example.com/x"
        );
    }
}
