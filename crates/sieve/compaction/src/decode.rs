//! Markup stripping and bounded de-obfuscation.
//!
//! Nothing here executes or renders content. Each layer that actually
//! changes the text is recorded in the decode chain, in application order.

use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use base64::Engine as _;
use percent_encoding::percent_decode_str;

use crate::patterns;

pub const STEP_STRIP_MARKUP: &str = "strip_markup";
pub const STEP_HTML_UNESCAPE: &str = "html_unescape";
pub const STEP_PERCENT_DECODE: &str = "percent_decode";
pub const STEP_BASE64_DECODE: &str = "base64_decode";

/// Minimum share of printable characters for a base64 decode to be kept.
const MIN_PRINTABLE_RATIO: f64 = 0.9;

/// Decoded text plus the layers that were removed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Decoded {
    pub text: String,
    pub chain: Vec<String>,
}

/// Remove tags, dropping `script`, `style` and `noscript` bodies and comments.
pub fn strip_markup(html: &str) -> String {
    let without_hidden = patterns::hidden_blocks().replace_all(html, " ");
    let with_breaks = patterns::block_breaks().replace_all(&without_hidden, "\n");
    let text = patterns::any_tag().replace_all(&with_breaks, " ");
    normalize_whitespace(&text)
}

/// Collapse runs of inline whitespace and drop blank lines.
pub fn normalize_whitespace(text: &str) -> String {
    text.lines()
        .map(|line| patterns::inline_space().replace_all(line, " ").trim().to_string())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn named_entity(name: &str) -> Option<&'static str> {
    Some(match name {
        "amp" => "&",
        "lt" => "<",
        "gt" => ">",
        "quot" => "\"",
        "apos" => "'",
        "nbsp" => " ",
        "ensp" | "emsp" | "thinsp" => " ",
        "zwnj" | "zwj" | "shy" => "",
        "ndash" => "-",
        "mdash" => "-",
        "hellip" => "...",
        "lsquo" | "rsquo" => "'",
        "ldquo" | "rdquo" => "\"",
        "copy" => "(c)",
        "reg" => "(r)",
        "trade" => "(tm)",
        "euro" => "EUR",
        _ => return None,
    })
}

/// Decode HTML character references. Unknown names are left as-is.
pub fn decode_entities(text: &str) -> String {
    patterns::html_entity()
        .replace_all(text, |caps: &regex::Captures<'_>| {
            let body = &caps[1];
            let decoded = if let Some(hex) = body.strip_prefix("#x").or_else(|| body.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32).map(String::from)
            } else if let Some(dec) = body.strip_prefix('#') {
                dec.parse::<u32>().ok().and_then(char::from_u32).map(String::from)
            } else {
                named_entity(body).map(String::from)
            };
            decoded.unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

pub fn percent_decode(text: &str) -> String {
    percent_decode_str(text).decode_utf8_lossy().into_owned()
}

fn printable_ratio(text: &str) -> f64 {
    let total = text.chars().count();
    if total == 0 {
        return 0.0;
    }
    let printable = text
        .chars()
        .filter(|c| !c.is_control() || matches!(c, '\n' | '\t' | '\r'))
        .count();
    printable as f64 / total as f64
}

/// Decode one base64 / base64url token into text, if it is text.
pub fn decode_base64_text(token: &str) -> Option<String> {
    let trimmed = token.trim_end_matches('=');
    if trimmed.len() < 16 {
        return None;
    }
    let bytes = if trimmed.contains(['-', '_']) {
        if trimmed.contains(['+', '/']) {
            return None;
        }
        URL_SAFE_NO_PAD.decode(trimmed).ok()?
    } else {
        STANDARD_NO_PAD.decode(trimmed).ok()?
    };
    let text = String::from_utf8(bytes).ok()?;
    if text.trim().chars().count() < 4 || printable_ratio(&text) < MIN_PRINTABLE_RATIO {
        return None;
    }
    Some(text)
}

/// Replace every base64 token that decodes to printable text.
fn base64_pass(text: &str) -> Option<String> {
    let mut changed = false;
    let out = patterns::base64_token().replace_all(text, |caps: &regex::Captures<'_>| {
        match decode_base64_text(&caps[0]) {
            Some(decoded) => {
                changed = true;
                decoded
            }
            None => caps[0].to_string(),
        }
    });
    changed.then(|| out.into_owned())
}

fn bound(text: String, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text
    } else {
        text.chars().take(max_chars).collect()
    }
}

/// Peel entity, percent and base64 layers under the given bounds.
///
/// Percent decoding repeats up to `max_rounds` times while `%XX` sequences
/// remain. Base64 runs up to `max_base64_depth` passes over the text.
pub fn decode_layers(text: &str, max_rounds: usize, max_base64_depth: usize, max_chars: usize) -> Decoded {
    let mut current = text.to_string();
    let mut chain = Vec::new();

    if patterns::html_entity().is_match(&current) {
        let decoded = decode_entities(&current);
        if decoded != current {
            chain.push(STEP_HTML_UNESCAPE.to_string());
            current = bound(decoded, max_chars);
        }
    }

    for _ in 0..max_rounds {
        if !patterns::percent_sequence().is_match(&current) {
            break;
        }
        let decoded = percent_decode(&current);
        if decoded == current {
            break;
        }
        chain.push(STEP_PERCENT_DECODE.to_string());
        current = bound(decoded, max_chars);
    }

    for _ in 0..max_base64_depth {
        match base64_pass(&current) {
            Some(decoded) if decoded != current => {
                chain.push(STEP_BASE64_DECODE.to_string());
                current = bound(decoded, max_chars);
            }
            _ => break,
        }
    }

    Decoded {
        text: current,
        chain,
    }
}
