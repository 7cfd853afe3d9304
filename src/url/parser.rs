//! Left-to-right reader for the five URI components
//!
//! ```text
//!      foo://example.com:8042/over/there?name=ferret#nose
//!      \_/   \______________/\_________/ \_________/ \__/
//!       |           |            |            |        |
//!    scheme     authority       path        query   fragment
//! ```
//!
//! Every rule leaves the cursor positioned for the next one. A rule that
//! does not match returns `None`; the authority rule additionally rolls the
//! cursor back, so malformed authority text is re-read as path.

use crate::url::normalize::{is_sub_delim, is_unreserved};

/// Default port for the only scheme we crawl
pub const HTTP_DEFAULT_PORT: u16 = 80;

/// Components of an authority (`[ userinfo "@" ] host [ ":" port ]`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authority {
    pub userinfo: Option<String>,
    pub host: String,
    pub port: Option<u16>,
}

impl Authority {
    /// Parses the text between `//` and the next `/`, `?` or `#`
    ///
    /// Returns `None` when the text does not look like an authority.
    fn parse(raw: &str, scheme: Option<&str>) -> Option<Self> {
        let (userinfo, hostport) = match raw.rfind('@') {
            Some(at) => (Some(&raw[..at]), &raw[at + 1..]),
            None => (None, raw),
        };

        if let Some(info) = userinfo {
            if !info.bytes().all(is_userinfo_byte) {
                return None;
            }
        }

        let (host, port) = split_host_port(hostport)?;
        let host = normalize_host(host)?;
        let port = match port {
            None | Some("") => None,
            Some(digits) => {
                if !digits.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                let number: u16 = digits.parse().ok()?;
                drop_default_port(scheme, Some(number))
            }
        };

        Some(Self {
            userinfo: userinfo.map(str::to_string),
            host,
            port,
        })
    }
}

/// Returns `None` when `port` is the default port of `scheme`
pub fn drop_default_port(scheme: Option<&str>, port: Option<u16>) -> Option<u16> {
    match (scheme, port) {
        (Some("http"), Some(HTTP_DEFAULT_PORT)) => None,
        _ => port,
    }
}

fn is_userinfo_byte(b: u8) -> bool {
    is_unreserved(b) || is_sub_delim(b) || b == b':' || b == b'%'
}

fn split_host_port(hostport: &str) -> Option<(&str, Option<&str>)> {
    if hostport.starts_with('[') {
        let close = hostport.find(']')?;
        let (host, after) = hostport.split_at(close + 1);
        if after.is_empty() {
            Some((host, None))
        } else {
            Some((host, Some(after.strip_prefix(':')?)))
        }
    } else {
        match hostport.split_once(':') {
            Some((host, port)) => Some((host, Some(port))),
            None => Some((hostport, None)),
        }
    }
}

/// Lowercases the host and strips a single trailing dot
///
/// A host still ending in `.` after that (`a.com..`) is malformed.
fn normalize_host(host: &str) -> Option<String> {
    let host = host.strip_suffix('.').unwrap_or(host);
    if host.is_empty() || host.ends_with('.') {
        return None;
    }

    let valid = match host.strip_prefix('[').and_then(|h| h.strip_suffix(']')) {
        Some(literal) => {
            !literal.is_empty()
                && literal
                    .bytes()
                    .all(|b| b.is_ascii_hexdigit() || matches!(b, b':' | b'.'))
        }
        None => host
            .bytes()
            .all(|b| is_unreserved(b) || is_sub_delim(b) || b == b'%'),
    };

    valid.then(|| host.to_ascii_lowercase())
}

/// Cursor over the URL text
pub struct UrlParser<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> UrlParser<'a> {
    pub fn new(text: &'a str) -> Self {
        Self { text, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.text[self.pos..]
    }

    /// Reads `ALPHA *( ALPHA / DIGIT / "+" / "-" / "." ) ":"`
    ///
    /// The scheme is returned lowercased. Text that does not form a scheme
    /// leaves the cursor untouched.
    pub fn read_scheme(&mut self) -> Option<String> {
        let rest = self.rest();
        let mut chars = rest.char_indices();

        match chars.next() {
            Some((_, c)) if c.is_ascii_alphabetic() => {}
            _ => return None,
        }

        for (i, c) in chars {
            if c == ':' {
                self.pos += i + 1;
                return Some(rest[..i].to_ascii_lowercase());
            }
            if !(c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')) {
                return None;
            }
        }

        None
    }

    /// Reads an authority if one is present and well formed
    ///
    /// On failure the cursor is restored to where it was before the call.
    pub fn try_read_authority(&mut self, scheme: Option<&str>) -> Option<Authority> {
        let start = self.pos;
        let authority = self.read_authority(scheme);
        if authority.is_none() {
            self.pos = start;
        }
        authority
    }

    fn read_authority(&mut self, scheme: Option<&str>) -> Option<Authority> {
        let rest = self.rest();
        if !rest.starts_with("//") {
            return None;
        }
        self.pos += 2;
        let raw = self.read_until(&['/', '?', '#']);
        Authority::parse(raw, scheme)
    }

    /// Returns everything up to (not including) the first delimiter
    pub fn read_until(&mut self, delimiters: &[char]) -> &'a str {
        let rest = self.rest();
        let end = rest.find(delimiters).unwrap_or(rest.len());
        self.pos += end;
        &rest[..end]
    }

    /// Reads a component introduced by `marker` and ending at `terminators`
    ///
    /// Returns `None` when the marker is absent; `Some("")` when the marker
    /// is present but the component is empty.
    pub fn read_component(&mut self, marker: char, terminators: &[char]) -> Option<String> {
        if !self.rest().starts_with(marker) {
            return None;
        }
        self.pos += marker.len_utf8();
        Some(self.read_until(terminators).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_scheme_lowercases() {
        let mut parser = UrlParser::new("HTTP://example.com");
        assert_eq!(parser.read_scheme(), Some("http".to_string()));
        assert_eq!(parser.rest(), "//example.com");
    }

    #[test]
    fn test_read_scheme_absent() {
        let mut parser = UrlParser::new("/path:with/colon");
        assert_eq!(parser.read_scheme(), None);
        assert_eq!(parser.rest(), "/path:with/colon");

        let mut parser = UrlParser::new("file.html");
        assert_eq!(parser.read_scheme(), None);
    }

    #[test]
    fn test_read_authority_full() {
        let mut parser = UrlParser::new("//user:pass@Exemple.com.:80/f");
        let authority = parser.try_read_authority(Some("http")).unwrap();
        assert_eq!(authority.userinfo.as_deref(), Some("user:pass"));
        assert_eq!(authority.host, "exemple.com");
        assert_eq!(authority.port, None);
        assert_eq!(parser.rest(), "/f");
    }

    #[test]
    fn test_non_default_port_kept() {
        let mut parser = UrlParser::new("//example.com:8080");
        let authority = parser.try_read_authority(Some("http")).unwrap();
        assert_eq!(authority.port, Some(8080));
    }

    #[test]
    fn test_leading_zero_default_port_dropped() {
        let mut parser = UrlParser::new("//example.com:080/");
        let authority = parser.try_read_authority(Some("http")).unwrap();
        assert_eq!(authority.port, None);
    }

    #[test]
    fn test_default_port_kept_without_scheme() {
        let mut parser = UrlParser::new("//example.com:80/");
        let authority = parser.try_read_authority(None).unwrap();
        assert_eq!(authority.port, Some(80));
    }

    #[test]
    fn test_malformed_authority_rolls_back() {
        let mut parser = UrlParser::new("// invalid.url:80/");
        assert!(parser.try_read_authority(Some("http")).is_none());
        assert_eq!(parser.rest(), "// invalid.url:80/");
    }

    #[test]
    fn test_non_ascii_host_rolls_back() {
        let mut parser = UrlParser::new("//www.ficções.net/biblioteca/");
        assert!(parser.try_read_authority(Some("http")).is_none());
    }

    #[test]
    fn test_bad_port_rolls_back() {
        let mut parser = UrlParser::new("//example.com:http/");
        assert!(parser.try_read_authority(Some("http")).is_none());

        let mut parser = UrlParser::new("//example.com:99999/");
        assert!(parser.try_read_authority(Some("http")).is_none());
    }

    #[test]
    fn test_ipv6_literal() {
        let mut parser = UrlParser::new("//[::1]:8080/x");
        let authority = parser.try_read_authority(Some("http")).unwrap();
        assert_eq!(authority.host, "[::1]");
        assert_eq!(authority.port, Some(8080));
    }

    #[test]
    fn test_read_component_empty_vs_absent() {
        let mut parser = UrlParser::new("?#");
        assert_eq!(parser.read_component('?', &['#']), Some(String::new()));
        assert_eq!(parser.read_component('#', &[]), Some(String::new()));

        let mut parser = UrlParser::new("");
        assert_eq!(parser.read_component('?', &['#']), None);
    }
}
