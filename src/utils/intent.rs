use base64::{prelude::BASE64_URL_SAFE_NO_PAD, Engine};
use hmac::{Hmac, Mac};
use rand_core::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

use crate::models::signup::SignupIntent;

type HmacSha256 = Hmac<Sha256>;

/// How long a signed state stays redeemable.
pub const INTENT_MAX_AGE_SECONDS: i64 = 60 * 60;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IntentError {
    #[error("malformed state parameter")]
    Malformed,
    #[error("state signature mismatch")]
    BadSignature,
    #[error("state nonce does not match cookie")]
    NonceMismatch,
    #[error("state parameter expired")]
    Expired,
}

#[derive(Debug, Serialize, Deserialize)]
struct StatePayload {
    nonce: String,
    issued_at: i64,
    #[serde(flatten)]
    intent: SignupIntent,
}

pub fn generate_nonce() -> String {
    let mut bytes = [0u8; 32]; // 256-bit nonce
    rand_core::OsRng.fill_bytes(&mut bytes);
    BASE64_URL_SAFE_NO_PAD.encode(bytes)
}

fn signature(secret: &[u8], payload: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC can take key of any size");
    mac.update(payload.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Packs the intent into an opaque `state` value: `base64url(json).hex(hmac)`.
pub fn sign_intent(secret: &[u8], nonce: &str, intent: &SignupIntent, issued_at: i64) -> String {
    let payload = StatePayload {
        nonce: nonce.to_string(),
        issued_at,
        intent: intent.clone(),
    };
    // Serializing a struct of strings and integers cannot fail.
    let json = serde_json::to_vec(&payload).unwrap_or_default();
    let encoded = BASE64_URL_SAFE_NO_PAD.encode(json);
    let sig = signature(secret, &encoded);
    format!("{encoded}.{sig}")
}

pub fn verify_intent(
    secret: &[u8],
    state: &str,
    expected_nonce: &str,
    now: i64,
) -> Result<SignupIntent, IntentError> {
    let (encoded, provided) = state.split_once('.').ok_or(IntentError::Malformed)?;

    let expected = signature(secret, encoded);
    if subtle::ConstantTimeEq::ct_eq(expected.as_bytes(), provided.as_bytes()).unwrap_u8() == 0u8 {
        return Err(IntentError::BadSignature);
    }

    let json = BASE64_URL_SAFE_NO_PAD
        .decode(encoded.as_bytes())
        .map_err(|_| IntentError::Malformed)?;
    let payload: StatePayload =
        serde_json::from_slice(&json).map_err(|_| IntentError::Malformed)?;

    if subtle::ConstantTimeEq::ct_eq(payload.nonce.as_bytes(), expected_nonce.as_bytes())
        .unwrap_u8()
        == 0u8
    {
        return Err(IntentError::NonceMismatch);
    }

    if now - payload.issued_at > INTENT_MAX_AGE_SECONDS || payload.issued_at > now + 60 {
        return Err(IntentError::Expired);
    }

    Ok(payload.intent)
}
