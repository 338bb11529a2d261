//! HMAC-SHA256 delivery verification.
//!
//! The platform signs every delivery with an HMAC-SHA256 over the exact raw
//! request body, sent as `sha256=<hex>` in the `x-hub-signature-256` header.
//! Verification compares in constant time to prevent timing probes.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::error::RelayError;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the delivery signature.
pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";

/// Scheme label prefixed to the hex digest.
const SCHEME_PREFIX: &str = "sha256=";

/// Compute the expected header value for a body.
pub fn expected_signature(app_secret: &str, body: &[u8]) -> Result<String, RelayError> {
    let mut mac = HmacSha256::new_from_slice(app_secret.as_bytes())
        .map_err(|e| RelayError::Internal(format!("HMAC init failed: {}", e)))?;
    mac.update(body);
    Ok(format!(
        "{}{}",
        SCHEME_PREFIX,
        hex::encode(mac.finalize().into_bytes())
    ))
}

/// Verify that an inbound delivery is authentic.
///
/// Rejects when the header is absent or the signature does not match the
/// body; either way no further processing happens.
pub fn verify_signature(
    app_secret: &str,
    body: &[u8],
    header: Option<&str>,
) -> Result<(), RelayError> {
    let provided = header.ok_or_else(|| {
        RelayError::SignatureInvalid(format!("missing {} header", SIGNATURE_HEADER))
    })?;

    let expected = expected_signature(app_secret, body)?;
    let expected_bytes = expected.as_bytes();
    let provided_bytes = provided.as_bytes();

    if expected_bytes.len() != provided_bytes.len()
        || expected_bytes.ct_eq(provided_bytes).unwrap_u8() != 1
    {
        return Err(RelayError::SignatureInvalid(
            "signature mismatch".to_string(),
        ));
    }

    Ok(())
}
