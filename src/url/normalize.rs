//! Path normalization rules
//!
//! Percent-encoding normalization (RFC 3986, Sections 2.1 and 6.2.2.2) and
//! dot-segment removal (RFC 3986, Section 5.2.4).

const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";

/// Returns true for `ALPHA / DIGIT / "-" / "." / "_" / "~"`
pub fn is_unreserved(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~')
}

/// Returns true for `gen-delims / sub-delims`
pub fn is_reserved(b: u8) -> bool {
    is_gen_delim(b) || is_sub_delim(b)
}

pub fn is_gen_delim(b: u8) -> bool {
    matches!(b, b':' | b'/' | b'?' | b'#' | b'[' | b']' | b'@')
}

pub fn is_sub_delim(b: u8) -> bool {
    matches!(
        b,
        b'!' | b'$' | b'&' | b'\'' | b'(' | b')' | b'*' | b'+' | b',' | b';' | b'='
    )
}

/// Normalizes a raw path component
///
/// Percent-encoding is fixed first so that an encoded dot segment such as
/// `%2E%2E` is removed like a literal one. Dot segments are only removed
/// from paths that can stand on their own: paths following an authority
/// and absolute paths. A relative-path reference keeps its dot segments
/// until it is merged with a base.
///
/// A URL with an authority always ends up with at least `/` as its path.
pub fn normalize_path(raw: &str, has_authority: bool) -> String {
    let encoded = normalize_percent_encoding(raw);

    let path = if has_authority || encoded.starts_with('/') {
        remove_dot_segments(&encoded)
    } else {
        encoded
    };

    if has_authority && path.is_empty() {
        "/".to_string()
    } else {
        path
    }
}

/// Rewrites percent-encoding into its canonical form
///
/// - a valid `%XX` triplet whose octet is unreserved is decoded
/// - any other valid triplet is kept, with uppercase hex digits
/// - a `%` that does not start a valid triplet is encoded as `%25`
/// - reserved and unreserved characters pass through untouched
/// - every other byte (space, controls, non-ASCII UTF-8 bytes, ...) is encoded
///
/// # Examples
///
/// ```
/// use spinneret::url::normalize_percent_encoding;
///
/// assert_eq!(
///     normalize_percent_encoding("%41%42%43%61%62%63%25 é%e9%23%3F"),
///     "ABCabc%25%20%C3%A9%E9%23%3F"
/// );
/// ```
pub fn normalize_percent_encoding(path: &str) -> String {
    let bytes = path.as_bytes();
    let mut fixed = String::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        if b == b'%' {
            match decode_triplet(bytes, i) {
                Some(octet) if is_unreserved(octet) => fixed.push(octet as char),
                Some(octet) => push_encoded(&mut fixed, octet),
                None => {
                    push_encoded(&mut fixed, b'%');
                    i += 1;
                    continue;
                }
            }
            i += 3;
        } else {
            if is_unreserved(b) || is_reserved(b) {
                fixed.push(b as char);
            } else {
                push_encoded(&mut fixed, b);
            }
            i += 1;
        }
    }

    fixed
}

fn decode_triplet(bytes: &[u8], at: usize) -> Option<u8> {
    let hi = hex_value(*bytes.get(at + 1)?)?;
    let lo = hex_value(*bytes.get(at + 2)?)?;
    Some((hi << 4) | lo)
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

fn push_encoded(out: &mut String, octet: u8) {
    out.push('%');
    out.push(HEX_DIGITS[(octet >> 4) as usize] as char);
    out.push(HEX_DIGITS[(octet & 0x0F) as usize] as char);
}

/// Removes `.` and `..` segments from a path
///
/// This is the buffer algorithm of RFC 3986, Section 5.2.4 with one extra
/// rule placed between rules D and E: a leading `//` in the input buffer is
/// collapsed into `/`, so runs of slashes never produce empty segments.
///
/// # Examples
///
/// ```
/// use spinneret::url::remove_dot_segments;
///
/// assert_eq!(remove_dot_segments("/a/b/c/./../../g"), "/a/g");
/// assert_eq!(remove_dot_segments("mid/content=5/../6"), "mid/6");
/// assert_eq!(remove_dot_segments("mid/content=5////../6"), "mid/6");
/// ```
pub fn remove_dot_segments(path: &str) -> String {
    let mut input = path;
    let mut output = String::with_capacity(path.len());

    while !input.is_empty() {
        // A
        if let Some(rest) = input.strip_prefix("../") {
            input = rest;
        } else if let Some(rest) = input.strip_prefix("./") {
            input = rest;
        }
        // B
        else if input.starts_with("/./") {
            input = &input[2..];
        } else if input == "/." {
            input = "/";
        }
        // C
        else if input.starts_with("/../") {
            input = &input[3..];
            pop_last_segment(&mut output);
        } else if input == "/.." {
            input = "/";
            pop_last_segment(&mut output);
        }
        // D
        else if input == "." || input == ".." {
            input = "";
        }
        // D-E: s#^//#/#
        else if input.starts_with("//") {
            input = &input[1..];
        }
        // E
        else {
            let skip = usize::from(input.starts_with('/'));
            let end = input[skip..]
                .find('/')
                .map_or(input.len(), |pos| pos + skip);
            output.push_str(&input[..end]);
            input = &input[end..];
        }
    }

    output
}

/// Removes the last segment and its preceding `/` (if any) from `output`
fn pop_last_segment(output: &mut String) {
    match output.rfind('/') {
        Some(pos) => output.truncate(pos),
        None => output.clear(),
    }
}
