//! `Stripe-Signature` header parsing and HMAC-SHA256 verification.
//!
//! The header format is `t=<unix>,v1=<hex>[,v1=<hex>...][,v0=<hex>]`. The
//! signed payload is `"{t}.{raw body}"`, keyed with the webhook secret.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use super::PaymentError;

type HmacSha256 = Hmac<Sha256>;

/// Maximum age of a delivery before it is treated as a replay.
pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

/// Allowed clock skew for timestamps in the future.
const MAX_FUTURE_SKEW_SECS: i64 = 60;

/// Parsed `Stripe-Signature` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    /// Unix time the provider signed the delivery.
    pub timestamp: i64,
    /// Every `v1` signature present (secret rotation sends several).
    pub v1_signatures: Vec<Vec<u8>>,
}

impl SignatureHeader {
    /// Parses the header value.
    ///
    /// Unknown keys (including legacy `v0`), elements without `=` and
    /// non-hex `v1` values are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::InvalidWebhook`] if the timestamp is missing
    /// or malformed, or no usable `v1` entry remains.
    pub fn parse(header: &str) -> Result<Self, PaymentError> {
        if header.trim().is_empty() {
            return Err(PaymentError::invalid_webhook("empty signature header"));
        }

        let mut timestamp = None;
        let mut v1_signatures = Vec::new();

        for part in header.split(',') {
            let Some((key, value)) = part.split_once('=') else {
                continue;
            };
            match key.trim() {
                "t" => {
                    let parsed = value.trim().parse::<i64>().map_err(|_| {
                        PaymentError::invalid_webhook("invalid signature timestamp")
                    })?;
                    timestamp = Some(parsed);
                }
                "v1" => {
                    if let Ok(bytes) = hex::decode(value.trim()) {
                        v1_signatures.push(bytes);
                    }
                }
                _ => {}
            }
        }

        let timestamp =
            timestamp.ok_or_else(|| PaymentError::invalid_webhook("missing signature timestamp"))?;
        if v1_signatures.is_empty() {
            return Err(PaymentError::invalid_webhook("missing v1 signature"));
        }

        Ok(Self {
            timestamp,
            v1_signatures,
        })
    }
}

/// Computes the hex-encoded `v1` signature of `payload` signed at
/// `timestamp`.
///
/// # Errors
///
/// Returns [`PaymentError::InvalidWebhook`] if the secret cannot key HMAC.
pub fn compute_signature(secret: &str, timestamp: i64, payload: &[u8]) -> Result<String, PaymentError> {
    Ok(hex::encode(signature_bytes(secret, timestamp, payload)?))
}

fn signature_bytes(secret: &str, timestamp: i64, payload: &[u8]) -> Result<Vec<u8>, PaymentError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| PaymentError::invalid_webhook(format!("unusable webhook secret: {e}")))?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Verifies `header` against `payload` at time `now`.
///
/// # Errors
///
/// Returns [`PaymentError::InvalidWebhook`] if the header is malformed, the
/// timestamp falls outside the tolerance window, or no `v1` signature
/// matches.
pub fn verify(
    payload: &[u8],
    header: &str,
    secret: &str,
    now: i64,
    tolerance_secs: i64,
) -> Result<SignatureHeader, PaymentError> {
    let parsed = SignatureHeader::parse(header)?;

    let age = now.saturating_sub(parsed.timestamp);
    if age > tolerance_secs {
        tracing::warn!(timestamp = parsed.timestamp, age_secs = age, "webhook too old");
        return Err(PaymentError::invalid_webhook("timestamp outside tolerance"));
    }
    if age < -MAX_FUTURE_SKEW_SECS {
        tracing::warn!(timestamp = parsed.timestamp, "webhook timestamp in future");
        return Err(PaymentError::invalid_webhook("timestamp in future"));
    }

    let expected = signature_bytes(secret, parsed.timestamp, payload)?;
    let matched = parsed
        .v1_signatures
        .iter()
        .any(|candidate| bool::from(expected.as_slice().ct_eq(candidate.as_slice())));
    if !matched {
        return Err(PaymentError::invalid_webhook("invalid signature"));
    }

    Ok(parsed)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test_secret";
    const NOW: i64 = 1_700_000_000;

    fn header_for(payload: &[u8], timestamp: i64, secret: &str) -> String {
        let Ok(sig) = compute_signature(secret, timestamp, payload) else {
            panic!("signing failed");
        };
        format!("t={timestamp},v1={sig}")
    }

    #[test]
    fn parses_multiple_v1_and_ignores_v0() {
        let Ok(h) = SignatureHeader::parse("t=12,v1=abcd,v0=ffff,v1=0102") else {
            panic!("header should parse");
        };
        assert_eq!(h.timestamp, 12);
        assert_eq!(h.v1_signatures, vec![vec![0xab, 0xcd], vec![0x01, 0x02]]);
    }

    #[test]
    fn rejects_malformed_headers() {
        assert!(SignatureHeader::parse("").is_err());
        assert!(SignatureHeader::parse("garbage").is_err());
        assert!(SignatureHeader::parse("v1=abcd").is_err());
        assert!(SignatureHeader::parse("t=123").is_err());
        assert!(SignatureHeader::parse("t=abc,v1=abcd").is_err());
        assert!(SignatureHeader::parse("t=123,v1=zz").is_err());
    }

    #[test]
    fn skips_unusable_elements() {
        let Ok(h) = SignatureHeader::parse("t=12,stray,v1=zz,v1=0102, ") else {
            panic!("header should parse");
        };
        assert_eq!(h.v1_signatures, vec![vec![0x01, 0x02]]);

        let result = SignatureHeader::parse("t=12,v1=zz,junk");
        assert_eq!(
            result.err(),
            Some(PaymentError::invalid_webhook("missing v1 signature"))
        );
    }

    #[test]
    fn garbage_entries_do_not_hide_valid_signature() {
        let payload = br#"{"id":"evt_3"}"#;
        let Ok(good) = compute_signature(SECRET, NOW, payload) else {
            panic!("signing failed");
        };
        let header = format!("t={NOW},v1=not-hex,extension,v1={good}");
        assert!(verify(payload, &header, SECRET, NOW, DEFAULT_TOLERANCE_SECS).is_ok());
    }

    #[test]
    fn accepts_valid_signature() {
        let payload = br#"{"id":"evt_1"}"#;
        let header = header_for(payload, NOW, SECRET);
        assert!(verify(payload, &header, SECRET, NOW + 10, DEFAULT_TOLERANCE_SECS).is_ok());
    }

    #[test]
    fn rejects_wrong_secret() {
        let payload = br#"{"id":"evt_1"}"#;
        let header = header_for(payload, NOW, "whsec_other");
        let result = verify(payload, &header, SECRET, NOW, DEFAULT_TOLERANCE_SECS);
        assert_eq!(
            result.err(),
            Some(PaymentError::invalid_webhook("invalid signature"))
        );
    }

    #[test]
    fn rejects_tampered_payload() {
        let header = header_for(br#"{"amount":100}"#, NOW, SECRET);
        let result = verify(br#"{"amount":999}"#, &header, SECRET, NOW, DEFAULT_TOLERANCE_SECS);
        assert!(result.is_err());
    }

    #[test]
    fn rejects_stale_and_future_timestamps() {
        let payload = b"{}";
        let stale = header_for(payload, NOW - DEFAULT_TOLERANCE_SECS - 1, SECRET);
        assert!(verify(payload, &stale, SECRET, NOW, DEFAULT_TOLERANCE_SECS).is_err());

        let future = header_for(payload, NOW + 120, SECRET);
        assert!(verify(payload, &future, SECRET, NOW, DEFAULT_TOLERANCE_SECS).is_err());

        let small_skew = header_for(payload, NOW + 30, SECRET);
        assert!(verify(payload, &small_skew, SECRET, NOW, DEFAULT_TOLERANCE_SECS).is_ok());
    }

    #[test]
    fn any_matching_v1_is_enough() {
        let payload = b"{}";
        let Ok(good) = compute_signature(SECRET, NOW, payload) else {
            panic!("signing failed");
        };
        let header = format!("t={NOW},v1={},v1={good}", "00".repeat(32));
        assert!(verify(payload, &header, SECRET, NOW, DEFAULT_TOLERANCE_SECS).is_ok());
    }
}
