//! URI parsing, resolution and relativization.
//!
//! The splitter follows the RFC 3986 grammar but is deliberately tolerant:
//! malformed percent escapes are preserved as literal bytes so that values
//! survive a read/write round trip unchanged.

use memchr::memchr;
use std::fmt::Write as _;

/// A URI split into its five RFC 3986 components, borrowing the input.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct UriParts<'a> {
    pub scheme: Option<&'a str>,
    pub authority: Option<&'a str>,
    pub path: &'a str,
    pub query: Option<&'a str>,
    pub fragment: Option<&'a str>,
}

impl<'a> UriParts<'a> {
    /// True when the URI can serve as a resolution base.
    #[inline]
    pub fn is_absolute(&self) -> bool {
        self.scheme.is_some()
    }
}

/// Splits `uri` by the RFC 3986 grammar. Never fails: anything that does
/// not look like `scheme:` starts the path.
pub fn parse_uri(uri: &str) -> UriParts<'_> {
    let mut parts = UriParts::default();
    let mut rest = uri;

    if let Some(end) = rest.find(':') {
        let candidate = &rest[..end];
        let valid = candidate
            .as_bytes()
            .first()
            .is_some_and(|b| b.is_ascii_alphabetic())
            && candidate[1..]
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'+' | b'-' | b'.'));
        if valid {
            parts.scheme = Some(candidate);
            rest = &rest[end + 1..];
        }
    }

    if let Some(after) = rest.strip_prefix("//") {
        let end = after
            .find(|c| matches!(c, '/' | '?' | '#'))
            .unwrap_or(after.len());
        parts.authority = Some(&after[..end]);
        rest = &after[end..];
    }

    if let Some(i) = rest.find('#') {
        parts.fragment = Some(&rest[i + 1..]);
        rest = &rest[..i];
    }
    if let Some(i) = rest.find('?') {
        parts.query = Some(&rest[i + 1..]);
        rest = &rest[..i];
    }
    parts.path = rest;
    parts
}

fn recompose(parts: &UriParts<'_>) -> String {
    let mut out = String::new();
    if let Some(scheme) = parts.scheme {
        out.push_str(scheme);
        out.push(':');
    }
    if let Some(authority) = parts.authority {
        out.push_str("//");
        out.push_str(authority);
    }
    out.push_str(parts.path);
    if let Some(query) = parts.query {
        out.push('?');
        out.push_str(query);
    }
    if let Some(fragment) = parts.fragment {
        out.push('#');
        out.push_str(fragment);
    }
    out
}

/// RFC 3986 §5.2.4 remove_dot_segments.
fn remove_dot_segments(path: &str) -> String {
    let mut input = path;
    let mut output = String::with_capacity(path.len());
    while !input.is_empty() {
        if let Some(rest) = input.strip_prefix("../") {
            input = rest;
        } else if let Some(rest) = input.strip_prefix("./") {
            input = rest;
        } else if input.starts_with("/./") {
            // "/./x" shortens to "/x"
            input = &input[2..];
        } else if input == "/." {
            input = "/";
        } else if input.starts_with("/../") {
            input = &input[3..];
            pop_segment(&mut output);
        } else if input == "/.." {
            input = "/";
            pop_segment(&mut output);
        } else if input == "." || input == ".." {
            input = "";
        } else {
            let start = usize::from(input.starts_with('/'));
            let end = input[start..]
                .find('/')
                .map_or(input.len(), |i| i + start);
            output.push_str(&input[..end]);
            input = &input[end..];
        }
    }
    output
}

fn pop_segment(output: &mut String) {
    if let Some(i) = output.rfind('/') {
        output.truncate(i);
    } else {
        output.clear();
    }
}

fn merge_paths(base: &UriParts<'_>, reference_path: &str) -> String {
    if base.authority.is_some() && base.path.is_empty() {
        return format!("/{reference_path}");
    }
    match base.path.rfind('/') {
        Some(i) => format!("{}{}", &base.path[..=i], reference_path),
        None => reference_path.to_owned(),
    }
}

/// Resolves `reference` against `base` per RFC 3986 §5.2, returning `None`
/// when `base` has no scheme.
pub fn resolve(reference: &str, base: &str) -> Option<String> {
    let b = parse_uri(base);
    b.scheme?;
    let r = parse_uri(reference);

    if r.scheme.is_some() {
        let path = remove_dot_segments(r.path);
        return Some(recompose(&UriParts { path: &path, ..r }));
    }
    let target = if r.authority.is_some() {
        let path = remove_dot_segments(r.path);
        recompose(&UriParts {
            scheme: b.scheme,
            authority: r.authority,
            path: &path,
            query: r.query,
            fragment: r.fragment,
        })
    } else if r.path.is_empty() {
        recompose(&UriParts {
            scheme: b.scheme,
            authority: b.authority,
            path: b.path,
            query: r.query.or(b.query),
            fragment: r.fragment,
        })
    } else {
        let merged = if r.path.starts_with('/') {
            remove_dot_segments(r.path)
        } else {
            remove_dot_segments(&merge_paths(&b, r.path))
        };
        recompose(&UriParts {
            scheme: b.scheme,
            authority: b.authority,
            path: &merged,
            query: r.query,
            fragment: r.fragment,
        })
    };
    Some(target)
}

/// The directory of a path: everything up to and including the last `/`.
fn path_directory(path: &str) -> &str {
    match path.rfind('/') {
        Some(i) => &path[..=i],
        None => "",
    }
}

/// Returns the shortest reference that resolves back to `uri` against
/// `base`. When `root` is given the result never ascends above the root's
/// directory: if it would, the absolute form is returned instead.
pub fn relativize(uri: &str, base: &str, root: Option<&str>) -> String {
    let u = parse_uri(uri);
    let b = parse_uri(base);
    if u.scheme != b.scheme || u.authority != b.authority || u.scheme.is_none() {
        return uri.to_owned();
    }

    if let Some(root) = root {
        let r = parse_uri(root);
        if u.scheme != r.scheme
            || u.authority != r.authority
            || !u.path.starts_with(path_directory(r.path))
        {
            return uri.to_owned();
        }
    }

    let base_dir = path_directory(b.path);

    // Longest common prefix of whole segments
    let mut common = 0;
    for (i, (a, c)) in u.path.bytes().zip(base_dir.bytes()).enumerate() {
        if a != c {
            break;
        }
        if a == b'/' {
            common = i + 1;
        }
    }
    if base_dir.len() <= u.path.len() && u.path.starts_with(base_dir) {
        common = base_dir.len();
    }

    let up = base_dir[common..].bytes().filter(|b| *b == b'/').count();
    let mut out = String::new();
    for _ in 0..up {
        out.push_str("../");
    }
    out.push_str(&u.path[common..]);
    if let Some(query) = u.query {
        out.push('?');
        out.push_str(query);
    }
    if let Some(fragment) = u.fragment {
        out.push('#');
        out.push_str(fragment);
    }
    out
}

fn is_uri_unreserved(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'.' | b'_' | b'~' | b'/' | b':')
}

fn is_windows_path(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 2
        && bytes[0].is_ascii_alphabetic()
        && bytes[1] == b':'
        && (bytes.len() == 2 || matches!(bytes[2], b'/' | b'\\'))
}

/// Encodes a filesystem path (and optional hostname) as a file URI.
///
/// Backslashes become `/` and drive letters are kept as `C:`. A relative
/// path with no hostname stays scheme-less: only the escaping is applied.
pub fn file_uri_encode(path: &str, hostname: Option<&str>) -> String {
    let windows = is_windows_path(path);
    let mut out = String::with_capacity(path.len() + 16);
    if hostname.is_some() || path.starts_with('/') || windows {
        out.push_str("file://");
        if let Some(hostname) = hostname {
            out.push_str(hostname);
        }
        if !path.starts_with('/') {
            out.push('/');
        }
    }
    for byte in path.bytes() {
        match byte {
            b'%' => out.push_str("%%"),
            b'\\' => out.push('/'),
            b if is_uri_unreserved(b) => out.push(char::from(b)),
            b => {
                let _ = write!(out, "%{b:02X}");
            }
        }
    }
    out
}

/// Decodes a file URI into `(path, hostname)`.
///
/// `%%` decodes to `%`; malformed or truncated escapes pass through
/// unchanged. A scheme-less input is treated as a bare escaped path.
pub fn file_uri_decode(uri: &str) -> (String, Option<String>) {
    let (hostname, escaped) = match uri.strip_prefix("file://") {
        Some(rest) => {
            let end = rest.find('/').unwrap_or(rest.len());
            let host = &rest[..end];
            (
                (!host.is_empty()).then(|| host.to_owned()),
                &rest[end..],
            )
        }
        None => (None, uri),
    };

    // A drive letter keeps its leading slash only in the URI form
    let escaped = match escaped.as_bytes() {
        [b'/', drive, b':', ..] if drive.is_ascii_alphabetic() => &escaped[1..],
        _ => escaped,
    };

    let bytes = escaped.as_bytes();
    if memchr(b'%', bytes).is_none() {
        return (escaped.to_owned(), hostname);
    }
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            if bytes.get(i + 1) == Some(&b'%') {
                out.push(b'%');
                i += 2;
                continue;
            }
            if let (Some(hi), Some(lo)) = (
                bytes.get(i + 1).copied().and_then(hex_value),
                bytes.get(i + 2).copied().and_then(hex_value),
            ) {
                out.push(hi << 4 | lo);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    (String::from_utf8_lossy(&out).into_owned(), hostname)
}

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        _ => None,
    }
}
