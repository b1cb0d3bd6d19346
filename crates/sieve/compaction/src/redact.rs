//! Privacy and token-safe redaction.
//!
//! Applied to every string that leaves the deterministic core: artifact
//! text, signal summaries, URLs.

use url::Url;

use crate::patterns;

pub const REDACTED_TOKEN: &str = "<redacted-token>";

/// Query values longer than this are redacted regardless of key.
const MAX_QUERY_VALUE_CHARS: usize = 24;

const SECRET_KEYS: [&str; 15] = [
    "token",
    "code",
    "auth",
    "authorization",
    "session",
    "sessionid",
    "key",
    "apikey",
    "access_token",
    "id_token",
    "refresh_token",
    "cookie",
    "sig",
    "signature",
    "password",
];

fn is_secret_key(key: &str) -> bool {
    let lowered = key.to_ascii_lowercase();
    SECRET_KEYS.contains(&lowered.as_str())
}

fn short_hash(value: &str) -> String {
    let hex = blake3::hash(value.as_bytes()).to_hex();
    hex[..12].to_string()
}

/// Mask e-mail local parts, keeping the first two characters and the domain.
pub fn mask_emails(text: &str) -> String {
    patterns::email()
        .replace_all(text, |caps: &regex::Captures<'_>| {
            let local: String = caps[1].chars().take(2).collect();
            format!("{local}***@{}", &caps[2])
        })
        .into_owned()
}

/// Strip secret-looking query values and the fragment from one URL.
///
/// Strings that do not parse as absolute URLs are only e-mail masked.
pub fn redact_url(raw: &str) -> String {
    let candidate = if raw.to_ascii_lowercase().starts_with("www.") {
        format!("http://{raw}")
    } else {
        raw.to_string()
    };
    let Ok(mut parsed) = Url::parse(&candidate) else {
        return mask_emails(raw);
    };
    if parsed.host_str().is_none() {
        return mask_emails(raw);
    }

    let pairs: Vec<(String, String)> = parsed
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    let redacted: Vec<(String, String)> = pairs
        .into_iter()
        .map(|(key, value)| {
            if value.is_empty() || value.starts_with("redacted-") {
                (key, value)
            } else if is_secret_key(&key) || value.chars().count() > MAX_QUERY_VALUE_CHARS {
                let masked = format!("redacted-{}", short_hash(&value));
                (key, masked)
            } else {
                (key, value)
            }
        })
        .collect();

    if redacted.is_empty() {
        parsed.set_query(None);
    } else {
        parsed.query_pairs_mut().clear().extend_pairs(redacted.iter());
    }
    parsed.set_fragment(None);

    let mut out = parsed.to_string();
    if candidate.len() != raw.len() {
        out = out.trim_start_matches("http://").to_string();
    }
    mask_emails(&out)
}

/// Full redaction of free text: URLs, e-mail addresses, long tokens.
///
/// Idempotent: redacting already-redacted text returns it unchanged.
pub fn redact_text(text: &str) -> String {
    let with_urls = patterns::url()
        .replace_all(text, |caps: &regex::Captures<'_>| redact_url(&caps[0]))
        .into_owned();
    let masked = mask_emails(&with_urls);
    patterns::long_token()
        .replace_all(&masked, REDACTED_TOKEN)
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_email_local_part() {
        assert_eq!(
            mask_emails("contact alice.smith@example.com now"),
            "contact al***@example.com now"
        );
    }

    #[test]
    fn redacts_long_tokens() {
        let text = "bearer abcdefghijklmnopqrstuvwxyz0123456789 end";
        assert_eq!(redact_text(text), format!("bearer {REDACTED_TOKEN} end"));
    }

    #[test]
    fn strips_secret_query_values() {
        let url = "https://login.example.com/cb?token=abc&lang=en#frag";
        let redacted = redact_url(url);
        assert!(redacted.starts_with("https://login.example.com/cb?"));
        assert!(!redacted.contains("token=abc"));
        assert!(redacted.contains("token=redacted-"));
        assert!(redacted.contains("lang=en"));
        assert!(!redacted.contains("frag"));
    }

    #[test]
    fn long_query_values_are_redacted() {
        let url = "https://t.example/r?u=aHR0cHM6Ly9ldmlsLmV4YW1wbGUvbG9naW4";
        let redacted = redact_url(url);
        assert!(!redacted.contains("aHR0cHM6"));
    }

    #[test]
    fn url_in_text_is_redacted() {
        let text = "Go to https://portal.example/reset?session=s3cr3t today";
        let out = redact_text(text);
        assert!(!out.contains("s3cr3t"));
        assert!(out.starts_with("Go to https://portal.example/reset?session=redacted-"));
        assert!(out.ends_with(" today"));
    }

    #[test]
    fn non_url_is_only_email_masked() {
        assert_eq!(redact_url("not a url bob@example.org"), "not a url bo***@example.org");
    }

    #[test]
    fn redaction_is_idempotent() {
        let text = "mail bob@example.org, open https://x.example/?code=123456&a=b and \
                    key abcdefghijklmnopqrstuvwxyz0123456789";
        let once = redact_text(text);
        assert_eq!(redact_text(&once), once);
    }
}
