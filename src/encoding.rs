//! Character encoding lookup and detection for the text files the tool reads.

use anyhow::{bail, Result};
use encoding_rs::Encoding;
use lazy_static::lazy_static;
use regex::bytes::Regex;

/// Codec names accepted in configuration files that are not WHATWG labels.
const ALIASES: &[(&str, &str)] = &[
    ("cp932", "shift_jis"),
    ("ms932", "shift_jis"),
    ("mskanji", "shift_jis"),
    ("utf-8-sig", "utf-8"),
    ("utf8-sig", "utf-8"),
    ("iso2022_jp", "iso-2022-jp"),
    ("cp936", "gbk"),
    ("cp949", "euc-kr"),
    ("cp950", "big5"),
];

/// Looks up an encoding by label, accepting the usual codec spellings
/// (`cp932`, `euc_jp`, `utf-8-sig`) as well as WHATWG labels.
pub fn lookup(label: &str) -> Option<&'static Encoding> {
    let label = label.trim().to_lowercase();
    if let Some(enc) = Encoding::for_label(label.as_bytes()) {
        return Some(enc);
    }
    if let Some((_, canonical)) = ALIASES.iter().find(|(alias, _)| *alias == label) {
        return Encoding::for_label(canonical.as_bytes());
    }
    Encoding::for_label(label.replace('_', "-").as_bytes())
}

/// Detects the encoding declared by a byte order mark, or by a
/// `coding: <label>` comment in either of the first two lines.
pub fn detect(bytes: &[u8]) -> Option<&'static Encoding> {
    lazy_static! {
        static ref CODING_RX: Regex =
            Regex::new(r"(?i)^\s*[#;].*coding[:=]\s*([\w\-]+)").unwrap();
    }
    if let Some((enc, _)) = Encoding::for_bom(bytes) {
        return Some(enc);
    }
    bytes.split(|b| *b == b'\n').take(2).find_map(|line| {
        let captures = CODING_RX.captures(line)?;
        let label = std::str::from_utf8(&captures[1]).ok()?;
        lookup(label)
    })
}

/// Decodes `bytes` with `explicit`, else the detected encoding, else UTF-8.
/// A byte order mark is always honoured and stripped.
pub fn decode(bytes: &[u8], explicit: Option<&'static Encoding>) -> Result<String> {
    let enc = explicit
        .or_else(|| detect(bytes))
        .unwrap_or(encoding_rs::UTF_8);
    let (text, used, had_errors) = enc.decode(bytes);
    if had_errors {
        bail!("text is not valid {}", used.name());
    }
    Ok(text.into_owned())
}
