//! Token wire format.
//!
//! A token is `<payload>.<signature>` where `payload` is the base64url
//! encoding of a small JSON document and `signature` is the base64url
//! encoding of an HMAC-SHA256 over the payload segment.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Duration, SecondsFormat, SubsecRound, Utc};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use uuid::Uuid;

use crate::token::TokenError;

type HmacSha256 = Hmac<Sha256>;

pub const SEPARATOR: char = '.';

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Payload {
    pub username: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub nonce: String,
}

impl Payload {
    pub fn new(username: &str, issued_at: DateTime<Utc>, ttl: Duration) -> Self {
        // the encoded form carries microseconds; keep the in-memory copy identical
        let issued_at = issued_at.trunc_subsecs(6);

        Self {
            username: username.to_owned(),
            issued_at,
            expires_at: issued_at
                .checked_add_signed(ttl)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
            nonce: Uuid::new_v4().simple().to_string(),
        }
    }

    fn to_json(&self) -> String {
        // object keys are sorted, so equal payloads always serialize identically
        serde_json::json!({
            "username": self.username,
            "issued_at": self.issued_at.to_rfc3339_opts(SecondsFormat::Micros, true),
            "expires_at": self.expires_at.to_rfc3339_opts(SecondsFormat::Micros, true),
            "nonce": self.nonce,
        })
        .to_string()
    }
}

#[derive(Clone)]
pub struct TokenSigner {
    mac: HmacSha256,
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner").finish_non_exhaustive()
    }
}

impl TokenSigner {
    pub fn new(secret: &str) -> Result<Self, hmac::digest::InvalidLength> {
        Ok(Self {
            mac: HmacSha256::new_from_slice(secret.as_bytes())?,
        })
    }

    pub fn encode(&self, payload: &Payload) -> String {
        let payload_b64 = URL_SAFE_NO_PAD.encode(payload.to_json().as_bytes());
        let signature = self.sign(&payload_b64);

        format!("{payload_b64}{SEPARATOR}{signature}")
    }

    /// Checks the signature before looking at anything inside the payload.
    pub fn decode(&self, token: &str) -> Result<Payload, TokenError> {
        let (payload_b64, signature) = token
            .rsplit_once(SEPARATOR)
            .ok_or(TokenError::Malformed)?;

        self.verify(payload_b64, signature)?;

        let raw = URL_SAFE_NO_PAD
            .decode(payload_b64.as_bytes())
            .map_err(|_| TokenError::Malformed)?;

        serde_json::from_slice(&raw).map_err(|_| TokenError::Malformed)
    }

    fn sign(&self, payload_b64: &str) -> String {
        let mut mac = self.mac.clone();
        mac.update(payload_b64.as_bytes());
        URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes())
    }

    fn verify(&self, payload_b64: &str, signature: &str) -> Result<(), TokenError> {
        let signature = URL_SAFE_NO_PAD
            .decode(signature.as_bytes())
            .map_err(|_| TokenError::BadSignature)?;

        let mut mac = self.mac.clone();
        mac.update(payload_b64.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| TokenError::BadSignature)
    }
}
