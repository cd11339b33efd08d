//! API credential handling.
//!
//! Users frequently copy-paste API keys with trailing newlines, spaces,
//! smart quotes, or zero-width characters. Sanitization normalizes the
//! value so the HMAC signature is computed on the correct bytes; a
//! corrupted credential must fail loudly at the exchange, never sign
//! silently with the wrong key material.

use std::fmt;
use zeroize::ZeroizeOnDrop;

/// Quote pairs stripped when they surround the whole value.
const QUOTE_PAIRS: &[(char, char)] = &[
    ('"', '"'),
    ('\'', '\''),
    ('\u{201c}', '\u{201d}'), // smart double quotes
    ('\u{2018}', '\u{2019}'), // smart single quotes
];

/// Invisible characters that survive a copy-paste.
const INVISIBLE: &[char] = &[
    '\u{200b}', // zero-width space
    '\u{200c}', // zero-width non-joiner
    '\u{200d}', // zero-width joiner
    '\u{feff}', // BOM / zero-width no-break space
    '\u{00a0}', // no-break space
];

/// Sanitized API key/secret pair, zeroized on drop.
#[derive(Clone, ZeroizeOnDrop)]
pub struct ApiCredentials {
    api_key: String,
    api_secret: String,
}

impl ApiCredentials {
    /// Sanitize and store a key/secret pair.
    pub fn new(api_key: &str, api_secret: &str) -> Self {
        Self {
            api_key: sanitize(api_key),
            api_secret: sanitize(api_secret),
        }
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn expose_secret(&self) -> &str {
        &self.api_secret
    }

    pub fn is_empty(&self) -> bool {
        self.api_key.is_empty() || self.api_secret.is_empty()
    }

    /// Masked key for logging: first and last four characters only.
    pub fn masked_key(&self) -> String {
        let n = self.api_key.chars().count();
        if n < 8 {
            return "****".to_string();
        }
        let head: String = self.api_key.chars().take(4).collect();
        let tail: String = self.api_key.chars().skip(n - 4).collect();
        format!("{head}****{tail}")
    }
}

impl fmt::Debug for ApiCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiCredentials")
            .field("api_key", &self.masked_key())
            .field("api_secret", &"****")
            .finish()
    }
}

/// Strip whitespace, surrounding quotes, and invisible characters.
fn sanitize(raw: &str) -> String {
    let mut value: String = raw.trim().to_string();

    for &(open, close) in QUOTE_PAIRS {
        if value.starts_with(open) && value.ends_with(close) && value.chars().count() >= 2 {
            value = value[open.len_utf8()..value.len() - close.len_utf8()].to_string();
        }
    }

    value.retain(|c| !INVISIBLE.contains(&c));
    value.trim().to_string()
}
