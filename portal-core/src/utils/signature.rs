use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Compute the hex-encoded HMAC-SHA256 of a raw payload.
///
/// Webhook providers sign the exact request body bytes, so callers must pass
/// the body untouched, before any JSON parsing.
pub fn sign_payload(secret: &str, payload: &[u8]) -> Result<String, anyhow::Error> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| anyhow::anyhow!("Invalid key length: {}", e))?;
    mac.update(payload);
    let result = mac.finalize();
    Ok(hex::encode(result.into_bytes()))
}

/// Verify a hex-encoded HMAC-SHA256 signature using constant-time comparison.
pub fn verify_payload(
    secret: &str,
    payload: &[u8],
    signature: &str,
) -> Result<bool, anyhow::Error> {
    let expected = sign_payload(secret, payload)?;

    let expected_bytes = expected.as_bytes();
    let signature_bytes = signature.as_bytes();

    if expected_bytes.len() != signature_bytes.len() {
        return Ok(false);
    }

    Ok(expected_bytes.ct_eq(signature_bytes).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_and_verify_round_trip() {
        let secret = "whsec_test_secret";
        let body = br#"{"event":"payment.captured"}"#;

        let signature = sign_payload(secret, body).unwrap();
        assert!(!signature.is_empty());

        assert!(verify_payload(secret, body, &signature).unwrap());
    }

    #[test]
    fn rejects_wrong_signature() {
        let secret = "whsec_test_secret";
        let body = br#"{"event":"payment.captured"}"#;

        let signature = sign_payload(secret, body).unwrap();
        let flipped = format!("a{}", &signature[1..]);

        assert!(!verify_payload(secret, body, &flipped).unwrap());
    }

    #[test]
    fn rejects_tampered_body() {
        let secret = "whsec_test_secret";
        let body = br#"{"event":"payment.captured","amount":100}"#;
        let tampered = br#"{"event":"payment.captured","amount":900}"#;

        let signature = sign_payload(secret, body).unwrap();

        assert!(!verify_payload(secret, tampered, &signature).unwrap());
    }

    #[test]
    fn rejects_wrong_length_signature() {
        let secret = "whsec_test_secret";
        let body = br#"{}"#;

        assert!(!verify_payload(secret, body, "deadbeef").unwrap());
    }
}
