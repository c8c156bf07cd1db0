//! Plain-text codecs shared by the node constructors and the grammar:
//! decimal parsing and base64.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

/// Column at which wrapped base64 bodies break, as in RFC 2045.
const BLOB_WRAP_WIDTH: usize = 76;

/// Parses a double from the beginning of `input`, returning the value and
/// the number of bytes consumed.
///
/// Leading ASCII whitespace is skipped. An optional sign, decimal digits,
/// fraction and exponent are accepted, as are the special tokens `NaN`,
/// `Inf` and `-Inf` (case-insensitive, `INFINITY` included). When nothing
/// parses the result is `(0.0, 0)`.
pub fn strtod(input: &str) -> (f64, usize) {
    let bytes = input.as_bytes();
    let mut i = 0;
    while i < bytes.len() && matches!(bytes[i], b' ' | b'\t' | b'\r' | b'\n') {
        i += 1;
    }

    let mut sign = 1.0;
    if i < bytes.len() && matches!(bytes[i], b'+' | b'-') {
        if bytes[i] == b'-' {
            sign = -1.0;
        }
        i += 1;
    }

    let rest = &input[i..];
    if rest.len() >= 3 && rest[..3].eq_ignore_ascii_case("nan") {
        return (f64::NAN, i + 3);
    }
    if rest.len() >= 8 && rest[..8].eq_ignore_ascii_case("infinity") {
        return (sign * f64::INFINITY, i + 8);
    }
    if rest.len() >= 3 && rest[..3].eq_ignore_ascii_case("inf") {
        return (sign * f64::INFINITY, i + 3);
    }

    let mut value = 0.0_f64;
    let mut has_digits = false;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        value = value * 10.0 + f64::from(bytes[i] - b'0');
        has_digits = true;
        i += 1;
    }
    if i < bytes.len() && bytes[i] == b'.' {
        let mut scale = 0.1_f64;
        i += 1;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            value += f64::from(bytes[i] - b'0') * scale;
            scale /= 10.0;
            has_digits = true;
            i += 1;
        }
    }
    if !has_digits {
        return (0.0, 0);
    }

    if i < bytes.len() && matches!(bytes[i], b'e' | b'E') {
        let mut j = i + 1;
        let mut exp_sign = 1_i32;
        if j < bytes.len() && matches!(bytes[j], b'+' | b'-') {
            if bytes[j] == b'-' {
                exp_sign = -1;
            }
            j += 1;
        }
        let mut exponent = 0_i32;
        let mut has_exp = false;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            exponent = exponent.saturating_mul(10) + i32::from(bytes[j] - b'0');
            has_exp = true;
            j += 1;
        }
        // A bare 'e' with no digits is not part of the number
        if has_exp {
            value *= 10.0_f64.powi(exp_sign * exponent);
            i = j;
        }
    }

    (sign * value, i)
}

/// Encodes `data` as base64, breaking into 76-byte lines when `wrap_lines`
/// is set.
pub fn base64_encode(data: &[u8], wrap_lines: bool) -> String {
    let encoded = STANDARD.encode(data);
    if !wrap_lines || encoded.len() <= BLOB_WRAP_WIDTH {
        return encoded;
    }
    let mut out = String::with_capacity(encoded.len() + encoded.len() / BLOB_WRAP_WIDTH + 1);
    for (i, chunk) in encoded.as_bytes().chunks(BLOB_WRAP_WIDTH).enumerate() {
        if i > 0 {
            out.push('\n');
        }
        // Chunks of an ASCII string are valid UTF-8
        out.push_str(std::str::from_utf8(chunk).unwrap_or_default());
    }
    out
}

/// An upper bound on the size of the buffer `base64_decode` needs for an
/// input of `len` bytes.
pub fn base64_decoded_size(len: usize) -> usize {
    (len * 3) / 4 + 2
}

/// Decodes base64 `text`, ignoring any embedded ASCII whitespace
/// (wrapped bodies decode transparently). Returns `None` on corrupt input.
pub fn base64_decode(text: &str) -> Option<Vec<u8>> {
    let stripped: Vec<u8> = text
        .bytes()
        .filter(|b| !matches!(b, b' ' | b'\t' | b'\r' | b'\n'))
        .collect();
    STANDARD.decode(stripped).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strtod_round_trips_formatted_values() {
        for dbl in [0.5, 42.0, 16.25, 1000000.015625] {
            let formatted = format!("{dbl:.6}");
            let (value, end) = strtod(&formatted);
            assert!((value - dbl).abs() <= 1e-6);
            assert_eq!(end, formatted.len());
        }
    }

    #[test]
    fn strtod_special_tokens() {
        let (value, end) = strtod("NaN");
        assert!(value.is_nan());
        assert_eq!(end, 3);

        assert_eq!(strtod("INF"), (f64::INFINITY, 3));
        assert_eq!(strtod("-INF"), (f64::NEG_INFINITY, 4));
    }

    #[test]
    fn strtod_exponents() {
        let cases: [(&str, f64); 8] = [
            ("02e18", 2.0e18),
            ("-5e019", -5e19),
            ("+8e20", 8e20),
            ("2E+24", 2e24),
            ("-5E-5", -5e-5),
            ("8E0", 8e0),
            ("9e-0", 9e-0),
            (" 2e+0", 2e0),
        ];
        for (input, expected) in cases {
            let (value, end) = strtod(input);
            assert!((value - expected).abs() <= f64::EPSILON * expected.abs());
            assert_eq!(end, input.len());
        }
    }

    #[test]
    fn strtod_rejects_garbage() {
        assert_eq!(strtod("hello"), (0.0, 0));
        assert_eq!(strtod(""), (0.0, 0));
        assert_eq!(strtod("."), (0.0, 0));
    }

    #[test]
    fn strtod_stops_at_trailing_text() {
        let (value, end) = strtod("1.5abc");
        assert_eq!(value, 1.5);
        assert_eq!(end, 3);

        // A bare exponent marker is not consumed
        let (value, end) = strtod("2e");
        assert_eq!(value, 2.0);
        assert_eq!(end, 1);
    }

    #[test]
    fn base64_round_trip() {
        for size in [1_usize, 3, 57, 58, 100, 255] {
            let data: Vec<u8> = (0..size).map(|i| (i * 37 % 256) as u8).collect();
            for wrap in [false, true] {
                let encoded = base64_encode(&data, wrap);
                let decoded = base64_decode(&encoded).unwrap();
                assert_eq!(decoded, data);
                assert!(base64_decoded_size(encoded.len()) >= decoded.len());
            }
        }
    }

    #[test]
    fn base64_wrapping_breaks_lines() {
        let data = vec![0_u8; 100];
        let encoded = base64_encode(&data, true);
        let mut lines = encoded.lines();
        assert_eq!(lines.next().map(str::len), Some(76));
        assert!(encoded.contains('\n'));
        assert!(!base64_encode(&data, false).contains('\n'));
    }

    #[test]
    fn base64_decode_rejects_corrupt_input() {
        assert!(base64_decode("not base64!").is_none());
    }
}
