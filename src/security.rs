use hmac::{Hmac, Mac};
use rand::{distributions::Alphanumeric, Rng};
use sha2::{Digest, Sha256};

use crate::constants::{API_KEY_PREFIX, API_KEY_RANDOM_LEN};

type HmacSha256 = Hmac<Sha256>;

// =============================================================================
// API Keys
// =============================================================================

/// Hex SHA-256 of a plaintext API key
///
/// This is the only form in which keys are persisted. Lookup hashes the
/// presented key and matches on the digest.
pub fn hash_api_key(key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    hex::encode(hasher.finalize())
}

/// Generate a fresh plaintext key: `hsb_` followed by 32 alphanumeric characters
pub fn generate_api_key() -> String {
    let random: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(API_KEY_RANDOM_LEN)
        .map(char::from)
        .collect();
    format!("{API_KEY_PREFIX}{random}")
}

// =============================================================================
// Signatures
// =============================================================================

fn keyed_mac(secret: &str) -> Option<HmacSha256> {
    HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| tracing::error!(error = %e, "Rejected HMAC key"))
        .ok()
}

/// Check `signature` (lowercase or uppercase hex) as the HMAC-SHA256 of `data`
pub fn verify_hmac(data: &[u8], signature: &str, secret: &str) -> bool {
    let Ok(expected) = hex::decode(signature) else {
        tracing::debug!("Signature is not hex");
        return false;
    };
    let Some(mut mac) = keyed_mac(secret) else {
        return false;
    };
    mac.update(data);
    mac.verify_slice(&expected).is_ok()
}

/// True when `timestamp` lies within `window_secs` of the current time
pub fn within_window(timestamp: i64, window_secs: i64) -> bool {
    let skew = chrono::Utc::now().timestamp().abs_diff(timestamp);
    if skew <= window_secs.unsigned_abs() {
        return true;
    }
    tracing::warn!(skew, window_secs, "Signed timestamp outside tolerance");
    false
}

/// Verify a `Stripe-Signature` header against the raw request body
///
/// The header has the form `t=<unix>,v1=<hex>[,v1=<hex>...]`. The signed
/// payload is `"<t>.<body>"`. Any matching `v1` entry is accepted, provided
/// the timestamp is within `tolerance_secs` of now.
pub fn verify_stripe_signature(
    body: &[u8],
    header: &str,
    secret: &str,
    tolerance_secs: i64,
) -> bool {
    let mut timestamp: Option<&str> = None;
    let mut signatures: Vec<&str> = Vec::new();

    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = Some(value),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }

    let Some(timestamp) = timestamp else {
        tracing::warn!("Missing timestamp in Stripe signature header");
        return false;
    };
    if signatures.is_empty() {
        tracing::warn!("Missing v1 signature in Stripe signature header");
        return false;
    }

    let Ok(ts) = timestamp.parse::<i64>() else {
        tracing::warn!("Non-numeric timestamp in Stripe signature header");
        return false;
    };
    if !within_window(ts, tolerance_secs) {
        return false;
    }

    let mut signed = Vec::with_capacity(timestamp.len() + 1 + body.len());
    signed.extend_from_slice(timestamp.as_bytes());
    signed.push(b'.');
    signed.extend_from_slice(body);

    signatures
        .iter()
        .any(|signature| verify_hmac(&signed, signature, secret))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign_stripe_payload(body: &[u8], secret: &str, timestamp: i64) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(format!("{timestamp}.").as_bytes());
        mac.update(body);
        format!("t={timestamp},v1={}", hex::encode(mac.finalize().into_bytes()))
    }

    // =========================================================================
    // API Key Tests
    // =========================================================================

    #[test]
    fn test_generate_api_key_format() {
        let key = generate_api_key();

        assert!(key.starts_with("hsb_"));
        assert_eq!(key.len(), 4 + 32);
        assert!(key[4..].chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_generate_api_key_unique() {
        assert_ne!(generate_api_key(), generate_api_key());
    }

    #[test]
    fn test_hash_api_key_known_value() {
        // SHA256("abc")
        assert_eq!(
            hash_api_key("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_hash_api_key_deterministic() {
        let key = generate_api_key();
        let first = hash_api_key(&key);

        assert_eq!(first, hash_api_key(&key));
        assert_eq!(first.len(), 64);
        assert_ne!(first, key);
    }

    // =========================================================================
    // Signature Primitive Tests
    // =========================================================================

    #[test]
    fn test_verify_hmac_matches_fresh_mac() {
        let mut mac = HmacSha256::new_from_slice(b"k3y").unwrap();
        mac.update(b"payload");
        let hex_sig = hex::encode(mac.finalize().into_bytes());

        assert!(verify_hmac(b"payload", &hex_sig, "k3y"));
        assert!(verify_hmac(b"payload", &hex_sig.to_uppercase(), "k3y"));
        assert!(!verify_hmac(b"payload2", &hex_sig, "k3y"));
    }

    #[test]
    fn test_verify_hmac_rejects_garbage() {
        assert!(!verify_hmac(b"payload", &"ab".repeat(32), "k3y"));
        assert!(!verify_hmac(b"payload", "zz", "k3y"));
        assert!(!verify_hmac(b"payload", "", "k3y"));
    }

    #[test]
    fn test_within_window() {
        let now = chrono::Utc::now().timestamp();

        assert!(within_window(now, 60));
        assert!(within_window(now - 30, 60));
        assert!(within_window(now + 30, 60));
        assert!(!within_window(now - 3600, 60));
        assert!(!within_window(now + 3600, 60));
        assert!(!within_window(i64::MIN, 300));
        assert!(!within_window(i64::MAX, 300));
    }

    // =========================================================================
    // Stripe Signature Tests
    // =========================================================================

    #[test]
    fn test_stripe_signature_round_trip() {
        let body = br#"{"type":"customer.subscription.deleted"}"#;
        let now = chrono::Utc::now().timestamp();
        let header = sign_stripe_payload(body, "whsec_test", now);

        assert!(verify_stripe_signature(body, &header, "whsec_test", 300));
    }

    #[test]
    fn test_stripe_signature_rejects_tampered_body() {
        let now = chrono::Utc::now().timestamp();
        let header = sign_stripe_payload(b"original", "whsec_test", now);

        assert!(!verify_stripe_signature(b"tampered", &header, "whsec_test", 300));
    }

    #[test]
    fn test_stripe_signature_rejects_wrong_secret() {
        let now = chrono::Utc::now().timestamp();
        let header = sign_stripe_payload(b"body", "whsec_test", now);

        assert!(!verify_stripe_signature(b"body", &header, "whsec_other", 300));
    }

    #[test]
    fn test_stripe_signature_rejects_stale_timestamp() {
        let stale = chrono::Utc::now().timestamp() - 600;
        let header = sign_stripe_payload(b"body", "whsec_test", stale);

        assert!(!verify_stripe_signature(b"body", &header, "whsec_test", 300));
    }

    #[test]
    fn test_stripe_signature_accepts_any_v1() {
        let now = chrono::Utc::now().timestamp();
        let valid = sign_stripe_payload(b"body", "whsec_test", now);
        let v1 = valid.split("v1=").nth(1).unwrap();
        let header = format!("t={now},v1={},v1={v1},v0=legacy", "0".repeat(64));

        assert!(verify_stripe_signature(b"body", &header, "whsec_test", 300));
    }

    #[test]
    fn test_stripe_signature_malformed_headers() {
        assert!(!verify_stripe_signature(b"body", "", "whsec_test", 300));
        assert!(!verify_stripe_signature(b"body", "v1=abcd", "whsec_test", 300));
        assert!(!verify_stripe_signature(b"body", "t=123", "whsec_test", 300));
        assert!(!verify_stripe_signature(b"body", "t=abc,v1=abcd", "whsec_test", 300));
    }

    #[test]
    fn test_stripe_signature_extreme_timestamps() {
        let header = format!("t={},v1=00", i64::MIN);
        assert!(!verify_stripe_signature(b"body", &header, "whsec_test", 300));

        let header = format!("t={},v1=00", i64::MAX);
        assert!(!verify_stripe_signature(b"body", &header, "whsec_test", 300));
    }
}
