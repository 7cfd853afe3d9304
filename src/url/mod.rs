//! URL canonicalization for Spinneret
//!
//! Every URL the crawler sees is reduced to a [`CanonicalUrl`]: a normalized
//! seven-component value (scheme, userinfo, host, port, path, query,
//! fragment). Two differently written URLs that name the same resource
//! compare equal, which is what the per-host dedup sets rely on.

mod normalize;
mod parser;
mod resolve;

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use crate::{UrlError, UrlResult};

pub use normalize::{normalize_percent_encoding, remove_dot_segments};
pub use resolve::resolve;

use parser::{drop_default_port, UrlParser};

/// The only scheme the crawler accepts
pub const HTTP_SCHEME: &str = "http";

/// A parsed and normalized URL or relative reference
///
/// Values are immutable once built; equality and hashing are structural
/// over all seven components.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalUrl {
    scheme: Option<String>,
    userinfo: Option<String>,
    host: Option<String>,
    port: Option<u16>,
    path: String,
    query: Option<String>,
    fragment: Option<String>,
}

impl CanonicalUrl {
    /// Parses and normalizes a URL or relative reference
    ///
    /// # Arguments
    ///
    /// * `text` - The URL text, absolute or relative
    ///
    /// # Returns
    ///
    /// * `Ok(CanonicalUrl)` - The normalized URL
    /// * `Err(UrlError::UnsupportedScheme)` - A scheme other than `http`
    /// * `Err(UrlError::Invalid)` - An `http` URL without a usable host
    ///
    /// # Examples
    ///
    /// ```
    /// use spinneret::url::CanonicalUrl;
    ///
    /// let a = CanonicalUrl::parse("http://Example.com:80/a/./b/../c").unwrap();
    /// let b = CanonicalUrl::parse("http://example.com/a/c").unwrap();
    /// assert_eq!(a, b);
    /// ```
    pub fn parse(text: &str) -> UrlResult<Self> {
        let text = strip_tab_and_newline(text);
        let mut parser = UrlParser::new(&text);

        let scheme = parser.read_scheme();
        if let Some(name) = &scheme {
            if name != HTTP_SCHEME {
                return Err(UrlError::UnsupportedScheme(name.clone()));
            }
        }

        let authority = parser.try_read_authority(scheme.as_deref());
        let raw_path = parser.read_until(&['?', '#']);
        let path = normalize::normalize_path(raw_path, authority.is_some());
        let query = parser.read_component('?', &['#']);
        let fragment = parser.read_component('#', &[]);

        let Some(authority) = authority else {
            if scheme.is_some() {
                return Err(UrlError::Invalid(format!("missing host in {text}")));
            }
            return Ok(Self {
                scheme: None,
                userinfo: None,
                host: None,
                port: None,
                path,
                query,
                fragment,
            });
        };

        Ok(Self {
            scheme,
            userinfo: authority.userinfo,
            host: Some(authority.host),
            port: authority.port,
            path,
            query,
            fragment,
        })
    }

    /// Assembles a URL from already-normalized components
    pub(crate) fn from_parts(
        scheme: Option<String>,
        userinfo: Option<String>,
        host: Option<String>,
        port: Option<u16>,
        path: String,
        query: Option<String>,
        fragment: Option<String>,
    ) -> Self {
        let port = drop_default_port(scheme.as_deref(), port);
        let path = if host.is_some() && path.is_empty() {
            "/".to_string()
        } else {
            path
        };

        Self {
            scheme,
            userinfo,
            host,
            port,
            path,
            query,
            fragment,
        }
    }

    /// Resolves `reference` using `self` as the base URL
    pub fn resolve(&self, reference: &CanonicalUrl) -> CanonicalUrl {
        resolve(self, reference)
    }

    /// Parses `reference` and resolves it against `self`
    ///
    /// # Examples
    ///
    /// ```
    /// use spinneret::url::CanonicalUrl;
    ///
    /// let base = CanonicalUrl::parse("http://a.com/base/index.html").unwrap();
    /// assert_eq!(base.join("../x").unwrap().to_string(), "http://a.com/x");
    /// ```
    pub fn join(&self, reference: &str) -> UrlResult<CanonicalUrl> {
        let reference = Self::parse(reference)?;
        Ok(self.resolve(&reference))
    }

    /// Returns a copy of this URL with the fragment removed
    pub fn without_fragment(&self) -> CanonicalUrl {
        Self {
            fragment: None,
            ..self.clone()
        }
    }

    /// Returns true if the URL carries no scheme
    pub fn is_relative(&self) -> bool {
        self.scheme.is_none()
    }

    /// Returns true if a `?` delimiter was present, even with an empty query
    pub fn has_query(&self) -> bool {
        self.query.is_some()
    }

    /// Returns true if the URL carries userinfo
    pub fn needs_authentication(&self) -> bool {
        self.userinfo.is_some()
    }

    /// Returns true for an absolute `http` URL with a host
    pub fn is_crawlable(&self) -> bool {
        self.scheme.as_deref() == Some(HTTP_SCHEME) && self.host.is_some()
    }

    pub fn scheme(&self) -> Option<&str> {
        self.scheme.as_deref()
    }

    pub fn userinfo(&self) -> Option<&str> {
        self.userinfo.as_deref()
    }

    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    pub fn fragment(&self) -> Option<&str> {
        self.fragment.as_deref()
    }
}

/// Removes ASCII tab, CR and LF anywhere in the input, as browsers do
fn strip_tab_and_newline(text: &str) -> Cow<'_, str> {
    if text.contains(['\t', '\r', '\n']) {
        Cow::Owned(
            text.chars()
                .filter(|&c| !matches!(c, '\t' | '\r' | '\n'))
                .collect(),
        )
    } else {
        Cow::Borrowed(text)
    }
}

/// Recomposes the components (RFC 3986, Section 5.3)
impl fmt::Display for CanonicalUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(scheme) = &self.scheme {
            write!(f, "{scheme}:")?;
        }
        // A colon in the first segment of a relative path would read as a
        // scheme (RFC 3986, Section 4.2)
        if self.scheme.is_none() && self.host.is_none() {
            let first = self.path.split('/').next().unwrap_or_default();
            if first.contains(':') {
                f.write_str("./")?;
            }
        }
        if let Some(host) = &self.host {
            f.write_str("//")?;
            if let Some(userinfo) = &self.userinfo {
                write!(f, "{userinfo}@")?;
            }
            f.write_str(host)?;
            if let Some(port) = self.port {
                write!(f, ":{port}")?;
            }
        }
        f.write_str(&self.path)?;
        if let Some(query) = &self.query {
            write!(f, "?{query}")?;
        }
        if let Some(fragment) = &self.fragment {
            write!(f, "#{fragment}")?;
        }
        Ok(())
    }
}

impl FromStr for CanonicalUrl {
    type Err = UrlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
