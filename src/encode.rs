use std::fmt;

use encoding_rs::{EncoderResult, Encoding, UTF_8};
use percent_encoding::percent_encode_byte;

use crate::error::ConfigError;

/// Escapes restored to their literal form after form-encoding a parameter
/// value. `+` (an encoded space) is rewritten to `%20` in the same pass.
const RESTORED: [(&str, &str); 7] = [
    ("%2C", ","),
    ("+", "%20"),
    ("%21", "!"),
    ("%27", "'"),
    ("%28", "("),
    ("%29", ")"),
    ("%7E", "~"),
];

/// Byte written for a character the charset cannot represent.
const UNMAPPABLE: u8 = b'?';

/// Character encoding applied before percent-encoding.
///
/// ASCII, ISO-8859-1 and the UTF-16 family are handled directly so that the
/// bytes match the charset that was asked for. Every other label is resolved
/// through `encoding_rs`; labels whose encoder would write a different
/// encoding are rejected.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Charset(Kind);

#[derive(Clone, Copy, PartialEq, Eq)]
enum Kind {
    Ascii,
    Latin1,
    Utf16 { big_endian: bool, bom: bool },
    Other(&'static Encoding),
}

impl Charset {
    pub fn for_label(label: &str) -> Result<Self, ConfigError> {
        if label.is_empty() {
            return Err(ConfigError::EmptyEncoding);
        }

        let kind = match label.to_ascii_lowercase().as_str() {
            "us-ascii" | "ascii" | "iso646-us" => Kind::Ascii,
            "iso-8859-1" | "iso8859-1" | "iso8859_1" | "iso_8859_1" | "iso_8859-1" | "latin1"
            | "l1" => Kind::Latin1,
            "utf-16" | "utf16" => Kind::Utf16 {
                big_endian: true,
                bom: true,
            },
            "utf-16be" | "utf_16be" => Kind::Utf16 {
                big_endian: true,
                bom: false,
            },
            "utf-16le" | "utf_16le" => Kind::Utf16 {
                big_endian: false,
                bom: false,
            },
            _ => match Encoding::for_label(label.as_bytes()) {
                Some(enc) if enc.output_encoding() == enc => Kind::Other(enc),
                _ => return Err(ConfigError::UnsupportedEncoding(label.to_string())),
            },
        };
        Ok(Charset(kind))
    }

    pub fn name(&self) -> &'static str {
        match self.0 {
            Kind::Ascii => "US-ASCII",
            Kind::Latin1 => "ISO-8859-1",
            Kind::Utf16 { bom: true, .. } => "UTF-16",
            Kind::Utf16 {
                big_endian: true, ..
            } => "UTF-16BE",
            Kind::Utf16 { .. } => "UTF-16LE",
            Kind::Other(enc) => enc.name(),
        }
    }

    /// Converts `s` to bytes in this charset. Characters without a mapping
    /// become `?`.
    pub fn encode(&self, s: &str) -> Vec<u8> {
        match self.0 {
            Kind::Ascii => single_byte(s, 0x80),
            Kind::Latin1 => single_byte(s, 0x100),
            Kind::Utf16 { big_endian, bom } => {
                let mut out = Vec::with_capacity(s.len() * 2 + 2);
                if bom {
                    out.extend_from_slice(&[0xFE, 0xFF]);
                }
                for unit in s.encode_utf16() {
                    let bytes = if big_endian {
                        unit.to_be_bytes()
                    } else {
                        unit.to_le_bytes()
                    };
                    out.extend_from_slice(&bytes);
                }
                out
            }
            Kind::Other(enc) => encode_replacing(enc, s),
        }
    }

    /// Form-encodes `s` after converting it to this charset.
    ///
    /// `A-Z a-z 0-9 * - . _` pass through and a space becomes `+`. Each run
    /// of other characters is converted to bytes as a unit and written as
    /// `%XX` with uppercase hex digits, so a byte order mark precedes every
    /// run in UTF-16.
    pub fn form_encode(&self, s: &str) -> String {
        let mut out = String::with_capacity(s.len());
        let mut run_start = None;
        for (idx, ch) in s.char_indices() {
            if ch == ' ' || is_unreserved(ch) {
                if let Some(start) = run_start.take() {
                    self.escape_into(&s[start..idx], &mut out);
                }
                out.push(if ch == ' ' { '+' } else { ch });
            } else if run_start.is_none() {
                run_start = Some(idx);
            }
        }
        if let Some(start) = run_start {
            self.escape_into(&s[start..], &mut out);
        }
        out
    }

    fn escape_into(&self, run: &str, out: &mut String) {
        for byte in self.encode(run) {
            out.push_str(percent_encode_byte(byte));
        }
    }
}

impl Default for Charset {
    fn default() -> Self {
        Charset(Kind::Other(UTF_8))
    }
}

impl fmt::Debug for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Charset").field(&self.name()).finish()
    }
}

fn is_unreserved(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, '*' | '-' | '.' | '_')
}

fn single_byte(s: &str, limit: u32) -> Vec<u8> {
    s.chars()
        .map(|ch| if (ch as u32) < limit { ch as u8 } else { UNMAPPABLE })
        .collect()
}

fn encode_replacing(enc: &'static Encoding, s: &str) -> Vec<u8> {
    let mut encoder = enc.new_encoder();
    let mut out = Vec::with_capacity(s.len());
    let mut rest = s;
    loop {
        let needed = encoder
            .max_buffer_length_from_utf8_without_replacement(rest.len())
            .unwrap_or(rest.len());
        out.reserve(needed.max(16));
        let (result, read) =
            encoder.encode_from_utf8_to_vec_without_replacement(rest, &mut out, true);
        rest = &rest[read..];
        match result {
            EncoderResult::InputEmpty => return out,
            EncoderResult::Unmappable(_) => out.push(UNMAPPABLE),
            EncoderResult::OutputFull => {}
        }
    }
}

/// Encodes an image or query parameter value.
pub fn encode_param_component(s: &str, charset: Charset) -> String {
    let mut encoded = charset.form_encode(s);
    for (from, to) in RESTORED {
        if encoded.contains(from) {
            encoded = encoded.replace(from, to);
        }
    }
    encoded
}

/// Encodes an absolute image URL so it fits in a single path segment.
pub fn encode_path_component(s: &str, charset: Charset) -> String {
    charset.form_encode(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn charset(label: &str) -> Charset {
        Charset::for_label(label).expect("charset")
    }

    #[test]
    fn restores_sub_delims() {
        let encoded = encode_param_component("w320,h200 (a!b'c~d)", Charset::default());
        assert_eq!(encoded, "w320,h200%20(a!b'c~d)");
    }

    #[test]
    fn keeps_form_unreserved_and_escapes_the_rest() {
        let encoded = encode_param_component("a*b-c.d_e+f/g", Charset::default());
        assert_eq!(encoded, "a*b-c.d_e%2Bf%2Fg");
    }

    #[test]
    fn charset_changes_escaped_bytes() {
        assert_eq!(
            encode_param_component("öäü", Charset::default()),
            "%C3%B6%C3%A4%C3%BC"
        );
        assert_eq!(encode_param_component("öäü", charset("ISO-8859-1")), "%F6%E4%FC");
    }

    #[test]
    fn latin1_is_not_windows_1252() {
        let latin1 = charset("ISO-8859-1");
        assert_eq!(latin1.name(), "ISO-8859-1");
        assert_eq!(latin1.form_encode("\u{80}"), "%80");
        assert_eq!(latin1.form_encode("€"), "%3F");

        let cp1252 = charset("windows-1252");
        assert_eq!(cp1252.name(), "windows-1252");
        assert_eq!(cp1252.form_encode("€"), "%80");
    }

    #[test]
    fn ascii_replaces_non_ascii_with_question_mark() {
        let ascii = charset("US-ASCII");
        assert_eq!(ascii.name(), "US-ASCII");
        assert_eq!(ascii.form_encode("é"), "%3F");
        assert_eq!(ascii.form_encode("a/é"), "a%2F%3F");
    }

    #[test]
    fn unmappable_characters_become_question_marks() {
        assert_eq!(charset("windows-1252").form_encode("ā"), "%3F");
        assert_eq!(charset("windows-1252").form_encode("ÿā"), "%FF%3F");
    }

    #[test]
    fn utf16_writes_a_byte_order_mark_per_run() {
        let utf16 = charset("UTF-16");
        assert_eq!(utf16.name(), "UTF-16");
        assert_eq!(utf16.form_encode("ö"), "%FE%FF%00%F6");
        assert_eq!(utf16.form_encode("öa ä"), "%FE%FF%00%F6a+%FE%FF%00%E4");
        assert_eq!(utf16.form_encode("€"), "%FE%FF%20%AC");

        assert_eq!(charset("UTF-16BE").form_encode("ö"), "%00%F6");
        assert_eq!(charset("utf-16le").form_encode("ö"), "%F6%00");
    }

    #[test]
    fn path_component_is_not_selectively_decoded() {
        let encoded = encode_path_component("http://foobar.com/a b(1).png", Charset::default());
        assert_eq!(encoded, "http%3A%2F%2Ffoobar.com%2Fa+b%281%29.png");
    }

    #[test]
    fn rejects_unknown_and_empty_labels() {
        assert_eq!(
            Charset::for_label("foobar+#+"),
            Err(ConfigError::UnsupportedEncoding("foobar+#+".to_string()))
        );
        assert_eq!(Charset::for_label(""), Err(ConfigError::EmptyEncoding));
    }

    #[test]
    fn rejects_labels_that_encode_as_another_charset() {
        assert_eq!(
            Charset::for_label("iso-2022-kr"),
            Err(ConfigError::UnsupportedEncoding("iso-2022-kr".to_string()))
        );
    }

    #[test]
    fn labels_are_case_insensitive() {
        let charset = charset("utf-8");
        assert_eq!(charset, Charset::default());
        assert_eq!(charset.name(), "UTF-8");
    }
}
