//! HMAC-SHA256 signing for the two providers.
//!
//! - E-file status requests carry `X-Signature = base64url-no-pad(HMAC(secret, api_key + timestamp))`.
//! - Accounting webhooks carry `x-provider-signature = base64(HMAC(webhook_key, raw_body))`.

use anyhow::{Context, Result};
use base64::{engine::general_purpose, Engine as _};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

fn mac(key: &[u8], parts: &[&[u8]]) -> Result<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(key).context("Invalid signing key")?;
    for part in parts {
        mac.update(part);
    }
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Signature for a status request at `timestamp` (Unix seconds).
pub fn sign_status_request(api_key: &str, api_secret: &str, timestamp: i64) -> Result<String> {
    let ts = timestamp.to_string();
    let digest = mac(api_secret.as_bytes(), &[api_key.as_bytes(), ts.as_bytes()])?;
    Ok(general_purpose::URL_SAFE_NO_PAD.encode(digest))
}

/// Base64 signature of a raw webhook body.
pub fn sign_webhook_body(secret: &str, body: &[u8]) -> Result<String> {
    Ok(general_purpose::STANDARD.encode(mac(secret.as_bytes(), &[body])?))
}

/// Constant-time check of a webhook signature header against the raw body.
pub fn verify_webhook_signature(secret: &str, body: &[u8], signature: &str) -> bool {
    match sign_webhook_body(secret, body) {
        Ok(expected) => expected.as_bytes().ct_eq(signature.trim().as_bytes()).into(),
        Err(_) => false,
    }
}
