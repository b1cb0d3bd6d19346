//! Compiled text patterns.

use std::sync::OnceLock;

use regex::Regex;

macro_rules! pattern {
    ($name:ident, $re:expr) => {
        pub(crate) fn $name() -> &'static Regex {
            static CELL: OnceLock<Regex> = OnceLock::new();
            CELL.get_or_init(|| Regex::new($re).expect("literal pattern compiles"))
        }
    };
}

pattern!(
    hidden_blocks,
    r"(?is)<script\b.*?</script\s*>|<style\b.*?</style\s*>|<noscript\b.*?</noscript\s*>|<!--.*?-->"
);
pattern!(
    block_breaks,
    r"(?i)<(?:br|hr)\b[^>]*>|</(?:p|div|li|tr|td|h[1-6]|table|section|article|blockquote)\s*>"
);
pattern!(any_tag, r"(?s)<[^>]*>");
pattern!(
    html_entity,
    r"&(#[0-9]{1,7}|#[xX][0-9A-Fa-f]{1,6}|[A-Za-z]{2,32});"
);
pattern!(percent_sequence, r"%[0-9A-Fa-f]{2}");
pattern!(base64_token, r"[A-Za-z0-9+/_-]{16,}={0,2}");
pattern!(url, r#"(?i)\b(?:https?://|www\.)[^\s<>"']+"#);
pattern!(
    email,
    r"(?i)\b([a-z0-9._%+-]{1,64})@([a-z0-9.-]+\.[a-z]{2,})\b"
);
pattern!(long_token, r"\b[A-Za-z0-9_-]{30,}\b");
pattern!(sentence_end, r"[.!?]+\s+");
pattern!(inline_space, r"[ \t\u{a0}]+");
