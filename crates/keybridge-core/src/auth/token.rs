/*
[INPUT]:  Session claims, token-signing key, current time
[OUTPUT]: Signed compact bearer tokens (EdDSA JWT) and their storable hashes
[POS]:    Auth layer - bearer token codec
[UPDATE]: When adding claims or changing the token encoding
*/

use base64::{
    Engine as _,
    engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD},
};
use chrono::{DateTime, Duration, Utc};
use ed25519_dalek::Signature;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::TokenSigner;
use crate::error::{KeybridgeError, Result};

const TOKEN_ALG: &str = "EdDSA";
const TOKEN_TYP: &str = "JWT";

#[derive(Debug, Serialize, Deserialize)]
struct TokenHeader {
    alg: String,
    typ: String,
    kid: String,
}

/// Claims embedded in every bearer token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Account id
    pub sub: String,
    pub wallet: String,
    pub iat: i64,
    pub exp: i64,
    /// Unique per token, so two tokens issued in the same second never share a hash
    pub jti: String,
}

impl TokenClaims {
    pub fn new(account_id: &str, wallet: &str, issued_at: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            sub: account_id.to_string(),
            wallet: wallet.to_string(),
            iat: issued_at.timestamp(),
            exp: (issued_at + ttl).timestamp(),
            jti: Uuid::new_v4().to_string(),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.exp
    }
}

/// Sign `claims` into `header.payload.signature`
pub fn encode_token(signer: &TokenSigner, claims: &TokenClaims) -> Result<String> {
    let header = TokenHeader {
        alg: TOKEN_ALG.to_string(),
        typ: TOKEN_TYP.to_string(),
        kid: signer.key_id(),
    };
    let header_b64 = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&header)?);
    let payload_b64 = URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims)?);
    let signing_input = format!("{header_b64}.{payload_b64}");

    let signature = signer.sign(signing_input.as_bytes());
    let signature_b64 = URL_SAFE_NO_PAD.encode(signature.to_bytes());

    Ok(format!("{signing_input}.{signature_b64}"))
}

/// Verify signature and embedded expiry, returning the claims
pub fn decode_token(signer: &TokenSigner, token: &str, now: DateTime<Utc>) -> Result<TokenClaims> {
    let token = token.trim();
    let mut parts = token.split('.');
    let (Some(header_b64), Some(payload_b64), Some(signature_b64), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(KeybridgeError::InvalidToken);
    };

    let header: TokenHeader =
        serde_json::from_slice(&decode_segment(header_b64)?).map_err(|_| KeybridgeError::InvalidToken)?;
    if header.alg != TOKEN_ALG || header.kid != signer.key_id() {
        return Err(KeybridgeError::InvalidToken);
    }

    let signature_bytes: [u8; 64] = decode_segment(signature_b64)?
        .try_into()
        .map_err(|_| KeybridgeError::InvalidToken)?;
    let signature = Signature::from_bytes(&signature_bytes);
    let signing_input = format!("{header_b64}.{payload_b64}");
    if !signer.verify(signing_input.as_bytes(), &signature) {
        return Err(KeybridgeError::InvalidToken);
    }

    let claims: TokenClaims = serde_json::from_slice(&decode_segment(payload_b64)?)
        .map_err(|_| KeybridgeError::InvalidToken)?;
    if claims.is_expired(now) {
        return Err(KeybridgeError::SessionExpired);
    }
    Ok(claims)
}

/// Lower-case hex SHA-256 of the raw token; the only form that is persisted
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

fn decode_segment(segment: &str) -> Result<Vec<u8>> {
    URL_SAFE_NO_PAD
        .decode(segment)
        .or_else(|_| URL_SAFE.decode(segment))
        .map_err(|_| KeybridgeError::InvalidToken)
}
