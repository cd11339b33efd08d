//! HMAC-SHA256 request signing.
//!
//! Every private call signs `api_key + url_without_query + body + nonce`
//! where the nonce is the current Unix time in milliseconds as a decimal
//! string. Headers carry the raw key, the nonce, and the hex signature.

use crate::credentials::ApiCredentials;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Time source for nonce generation, injectable for deterministic tests.
pub trait Clock: Send + Sync {
    /// Current Unix time in milliseconds.
    fn now_ms(&self) -> i64;
}

/// Production clock backed by the system time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Signed header set for one request.
#[derive(Debug, Clone)]
pub struct SignedHeaders {
    pub api_key: String,
    pub nonce: String,
    pub signature: String,
}

/// Compute the lowercase hex HMAC-SHA256 of `message` with `secret`.
pub fn sign_message(secret: &str, message: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(message.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Strip the query string from a URL before signing.
pub fn strip_query(url: &str) -> &str {
    match url.find('?') {
        Some(idx) => &url[..idx],
        None => url,
    }
}

/// Build the signed headers for one request.
///
/// `body` is the compact JSON body for POST requests and empty for GET.
pub fn sign_request(
    credentials: &ApiCredentials,
    url: &str,
    body: &str,
    nonce_ms: i64,
) -> SignedHeaders {
    let nonce = nonce_ms.to_string();
    let message = format!(
        "{}{}{}{}",
        credentials.api_key(),
        strip_query(url),
        body,
        nonce
    );
    SignedHeaders {
        api_key: credentials.api_key().to_string(),
        nonce,
        signature: sign_message(credentials.expose_secret(), &message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_known_vector() {
        // Published HMAC-SHA256 test vector (Binance API documentation).
        let secret = "NhqPtmdSJYdKjVHjA7PZj4Mge3R5YNiP1e3UZjInClVN65XAbvqqM6A7H5fATj0j";
        let message = "symbol=LTCBTC&side=BUY&type=LIMIT&timeInForce=GTC&quantity=1&price=0.1&recvWindow=5000&timestamp=1499827319559";
        assert_eq!(
            sign_message(secret, message),
            "c8db56825ae71d6d79447849e617115f4a920fa2acdcab2b053c4b2838bd6b71"
        );
    }

    #[test]
    fn test_signature_is_lowercase_hex() {
        let sig = sign_message("secret", "message");
        assert_eq!(sig.len(), 64);
        assert!(sig.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_strip_query() {
        assert_eq!(
            strip_query("https://api.example.com/balances?limit=5"),
            "https://api.example.com/balances"
        );
        assert_eq!(
            strip_query("https://api.example.com/balances"),
            "https://api.example.com/balances"
        );
    }

    #[test]
    fn test_query_string_excluded_from_signature() {
        let creds = ApiCredentials::new("key", "secret");
        let with_query = sign_request(&creds, "https://x.io/orders?symbol=AB_CD", "", 1000);
        let without = sign_request(&creds, "https://x.io/orders", "", 1000);
        assert_eq!(with_query.signature, without.signature);
    }

    #[test]
    fn test_nonce_changes_signature() {
        let creds = ApiCredentials::new("key", "secret");
        let a = sign_request(&creds, "https://x.io/orders", "", 1000);
        let b = sign_request(&creds, "https://x.io/orders", "", 1001);
        assert_ne!(a.signature, b.signature);
        assert_eq!(a.nonce, "1000");
        assert_eq!(b.nonce, "1001");
    }

    #[test]
    fn test_body_included_in_signature() {
        let creds = ApiCredentials::new("key", "secret");
        let a = sign_request(&creds, "https://x.io/createorder", r#"{"side":"buy"}"#, 1000);
        let b = sign_request(&creds, "https://x.io/createorder", r#"{"side":"sell"}"#, 1000);
        assert_ne!(a.signature, b.signature);
    }

    #[test]
    fn test_sanitized_credentials_sign_identically() {
        // Quoted/padded credentials must produce the same signature as
        // clean ones; this is the failure mode sanitization exists for.
        let clean = ApiCredentials::new("key", "secret");
        let pasted = ApiCredentials::new(" \"key\"\n", "\u{feff}secret ");
        let a = sign_request(&clean, "https://x.io/balances", "", 1000);
        let b = sign_request(&pasted, "https://x.io/balances", "", 1000);
        assert_eq!(a.signature, b.signature);
    }
}
