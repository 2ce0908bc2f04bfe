//! Byte decoding for imported files.
//!
//! Files arrive from spreadsheet apps, chat attachments and older Windows
//! tools, so the encoding is a guess. UTF-8 is tried first; legacy CJK
//! (GB18030, a superset of GBK) is the fallback when UTF-8 looks garbled.
//! Decoding never fails: the worst case is a lossy UTF-8 rendering.

use encoding_rs::{Encoding, GB18030, UTF_8, UTF_16BE, UTF_16LE};
use tracing::{debug, warn};

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Leading sequences left behind by BOMs that went through the wrong decoder.
const BOM_ARTIFACTS: &[&str] = &[
    "\u{FEFF}",
    "\u{FFFE}",
    "ï»¿",
    "þÿ",
    "ÿþ",
    "锘\u{FFFD}",
    "锘",
];

/// Decoded text plus the encoding that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedText {
    pub text: String,
    pub encoding: &'static str,
}

/// Decode raw file bytes to text with every leading BOM removed.
///
/// Zero, one or two UTF-8 BOMs in front of the same content yield identical
/// text.
#[must_use]
pub fn decode(bytes: &[u8]) -> DecodedText {
    let mut body = bytes;
    while let Some(rest) = body.strip_prefix(UTF8_BOM) {
        body = rest;
    }

    if let Some((encoding, bom_len)) = Encoding::for_bom(body) {
        if encoding == UTF_16LE || encoding == UTF_16BE {
            let (text, _) = encoding.decode_without_bom_handling(&body[bom_len..]);
            return finish(&text, encoding);
        }
    }

    let (utf8, _) = UTF_8.decode_without_bom_handling(body);
    if !looks_garbled(&utf8) {
        return finish(&utf8, UTF_8);
    }

    let (legacy, _) = GB18030.decode_without_bom_handling(body);
    if !looks_garbled(&legacy) {
        debug!("UTF-8 decode looked garbled, using {}", GB18030.name());
        return finish(&legacy, GB18030);
    }

    warn!("Could not detect file encoding, decoding as lossy UTF-8");
    finish(&utf8, UTF_8)
}

/// Replacement characters or stray control characters mean the guess was wrong.
fn looks_garbled(text: &str) -> bool {
    text.chars()
        .any(|c| c == '\u{FFFD}' || (c.is_control() && !matches!(c, '\t' | '\n' | '\r')))
}

fn finish(text: &str, encoding: &'static Encoding) -> DecodedText {
    DecodedText {
        text: strip_bom_artifacts(text).to_string(),
        encoding: encoding.name(),
    }
}

/// Remove BOM characters and their mis-decoded forms from the start of text.
#[must_use]
pub fn strip_bom_artifacts(mut text: &str) -> &str {
    loop {
        let before = text.len();
        for artifact in BOM_ARTIFACTS {
            if let Some(rest) = text.strip_prefix(artifact) {
                text = rest;
            }
        }
        if text.len() == before {
            return text;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONTENT: &str = "日期,身高(cm),体重(kg)\n2024-03-15 10:05,100.5,15.6\n";

    fn with_boms(count: usize) -> Vec<u8> {
        let mut bytes = UTF8_BOM.repeat(count);
        bytes.extend_from_slice(CONTENT.as_bytes());
        bytes
    }

    #[test]
    fn test_bom_count_does_not_matter() {
        let plain = decode(&with_boms(0));
        assert_eq!(plain.text, CONTENT);
        assert_eq!(decode(&with_boms(1)), plain);
        assert_eq!(decode(&with_boms(2)), plain);
    }

    #[test]
    fn test_gbk_fallback() {
        let (bytes, _, had_errors) = encoding_rs::GBK.encode(CONTENT);
        assert!(!had_errors);

        let decoded = decode(&bytes);
        assert_eq!(decoded.text, CONTENT);
        assert_eq!(decoded.encoding, "gb18030");
    }

    #[test]
    fn test_utf16_with_bom() {
        let mut bytes = vec![0xFF, 0xFE];
        for unit in CONTENT.encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        assert_eq!(decode(&bytes).text, CONTENT);
    }

    #[test]
    fn test_strips_misdecoded_bom() {
        assert_eq!(strip_bom_artifacts("ï»¿ï»¿日期"), "日期");
        assert_eq!(strip_bom_artifacts("\u{FEFF}date"), "date");
        assert_eq!(strip_bom_artifacts("date"), "date");
    }

    #[test]
    fn test_undecodable_bytes_are_lossy_not_fatal() {
        let decoded = decode(&[0x64, 0x61, 0x74, 0x65, 0x0A, 0xFF, 0xFF, 0x00]);
        assert!(decoded.text.starts_with("date\n"));
    }
}
