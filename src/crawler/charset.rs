//! Text encoding detection for fetched pages
//!
//! Candidates are tried in order and the first one that decodes the bytes
//! wins:
//! 1. transport hints (the `charset` of the Content-Type header)
//! 2. a byte order mark
//! 3. a declaration in the first 1024 bytes (`<?xml encoding>`, `<meta charset>`)
//! 4. UTF-8
//! 5. ISO-8859-1, which accepts any byte sequence

/// How far into the document an encoding declaration is looked for
const DECLARATION_WINDOW: usize = 1024;

/// Encodings the crawler can decode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Charset {
    Utf8,
    Utf16Le,
    Utf16Be,
    Latin1,
}

impl Charset {
    /// Looks up an encoding label, case-insensitively
    ///
    /// Returns `None` for labels we cannot decode.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Some(Self::Utf8),
            "utf-16" | "utf-16le" => Some(Self::Utf16Le),
            "utf-16be" => Some(Self::Utf16Be),
            "iso-8859-1" | "iso8859-1" | "iso_8859-1" | "latin1" | "latin-1" | "l1"
            | "us-ascii" | "ascii" => Some(Self::Latin1),
            _ => None,
        }
    }

    /// Canonical name, as written to page metadata
    pub fn name(&self) -> &'static str {
        match self {
            Self::Utf8 => "utf-8",
            Self::Utf16Le => "utf-16le",
            Self::Utf16Be => "utf-16be",
            Self::Latin1 => "iso-8859-1",
        }
    }

    /// Decodes `bytes`, or returns `None` if they are not valid in this encoding
    ///
    /// A leading byte order mark is dropped from the text.
    pub fn decode(&self, bytes: &[u8]) -> Option<String> {
        match self {
            Self::Utf8 => {
                let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
                std::str::from_utf8(bytes).ok().map(str::to_string)
            }
            Self::Utf16Le => decode_utf16(bytes, u16::from_le_bytes),
            Self::Utf16Be => decode_utf16(bytes, u16::from_be_bytes),
            Self::Latin1 => Some(bytes.iter().map(|&b| char::from(b)).collect()),
        }
    }
}

fn decode_utf16(bytes: &[u8], unit: fn([u8; 2]) -> u16) -> Option<String> {
    if bytes.len() % 2 != 0 {
        return None;
    }
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| unit([pair[0], pair[1]]))
        .collect();
    let text = String::from_utf16(&units).ok()?;
    Some(text.strip_prefix('\u{FEFF}').map(str::to_string).unwrap_or(text))
}

/// A decoded document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    pub charset: Charset,
    pub text: String,
}

/// Detects the encoding of `bytes` and decodes them
///
/// # Arguments
///
/// * `bytes` - The raw document
/// * `hints` - Encoding labels supplied by the transport, most trusted first
pub fn detect(bytes: &[u8], hints: &[String]) -> Decoded {
    let candidates = hints
        .iter()
        .filter_map(|hint| Charset::from_label(hint))
        .chain(bom_charset(bytes))
        .chain(declared_charset(bytes).as_deref().and_then(Charset::from_label))
        .chain([Charset::Utf8]);

    for charset in candidates {
        if let Some(text) = charset.decode(bytes) {
            return Decoded { charset, text };
        }
    }

    Decoded {
        charset: Charset::Latin1,
        text: bytes.iter().map(|&b| char::from(b)).collect(),
    }
}

fn bom_charset(bytes: &[u8]) -> Option<Charset> {
    if bytes.starts_with(b"\xEF\xBB\xBF") {
        Some(Charset::Utf8)
    } else if bytes.starts_with(b"\xFF\xFE") {
        Some(Charset::Utf16Le)
    } else if bytes.starts_with(b"\xFE\xFF") {
        Some(Charset::Utf16Be)
    } else {
        None
    }
}

/// Extracts the `charset` parameter of a Content-Type header value
///
/// # Examples
///
/// ```
/// use spinneret::crawler::charset_from_content_type;
///
/// assert_eq!(
///     charset_from_content_type("text/html; Charset=\"ISO-8859-1\""),
///     Some("iso-8859-1".to_string())
/// );
/// assert_eq!(charset_from_content_type("text/html"), None);
/// ```
pub fn charset_from_content_type(content_type: &str) -> Option<String> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        if !key.trim().eq_ignore_ascii_case("charset") {
            return None;
        }
        let value = value.trim().trim_matches(|c| c == '"' || c == '\'');
        (!value.is_empty()).then(|| value.to_ascii_lowercase())
    })
}

/// Finds an encoding declared near the start of the document
fn declared_charset(bytes: &[u8]) -> Option<String> {
    let window = &bytes[..bytes.len().min(DECLARATION_WINDOW)];
    let head = String::from_utf8_lossy(window).to_ascii_lowercase();

    if let Some(start) = head.find("<?xml") {
        let decl = &head[start..];
        let decl = &decl[..decl.find("?>").unwrap_or(decl.len())];
        if let Some(encoding) = attribute_value(decl, "encoding") {
            return Some(encoding);
        }
    }

    let mut rest = head.as_str();
    while let Some(start) = rest.find("<meta") {
        let tag = &rest[start..];
        let end = tag.find('>').unwrap_or(tag.len());
        if let Some(charset) = attribute_value(&tag[..end], "charset") {
            return Some(charset);
        }
        rest = &tag[end..];
    }

    None
}

/// Reads `key = value` inside a tag; the value may be quoted
///
/// Also matches `charset=x` inside a `content="text/html; charset=x"` value.
fn attribute_value(tag: &str, key: &str) -> Option<String> {
    let mut search = tag;
    while let Some(pos) = search.find(key) {
        let after = search[pos + key.len()..].trim_start();
        search = &search[pos + key.len()..];

        let Some(value) = after.strip_prefix('=') else {
            continue;
        };
        let value = value.trim_start();
        let value = match value.chars().next() {
            Some(quote @ ('"' | '\'')) => {
                let inner = &value[1..];
                &inner[..inner.find(quote).unwrap_or(inner.len())]
            }
            _ => {
                let end = value
                    .find(|c: char| c.is_whitespace() || matches!(c, '"' | '\'' | ';' | '>' | '/' | '?'))
                    .unwrap_or(value.len());
                &value[..end]
            }
        };
        if !value.is_empty() {
            return Some(value.to_string());
        }
    }
    None
}
