use base64::{engine::general_purpose, Engine as _};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

#[derive(Error, Debug)]
pub enum PseudonymError {
    #[error("invalid key")]
    InvalidKey,
}

/// Derives the pseudonymous respondent id stored with each response.
///
/// `HMAC-SHA256(key, user_id | survey_id)`: deterministic per (user, survey)
/// so the one-response-per-respondent guard still holds, while the raw user
/// id never reaches the response store. Different surveys yield unrelated
/// pseudonyms, so responses cannot be joined across surveys by respondent.
#[derive(Clone)]
pub struct Pseudonymizer {
    mac: HmacSha256,
}

impl Pseudonymizer {
    pub fn from_env() -> Result<Self, PseudonymError> {
        let key_b64 = std::env::var("PSEUDONYM_KEY").map_err(|_| PseudonymError::InvalidKey)?;
        let key = general_purpose::STANDARD
            .decode(key_b64)
            .map_err(|_| PseudonymError::InvalidKey)?;
        Self::from_key_bytes(key)
    }

    pub fn from_key_bytes(key: Vec<u8>) -> Result<Self, PseudonymError> {
        if key.len() < 32 {
            return Err(PseudonymError::InvalidKey);
        }
        let mac = HmacSha256::new_from_slice(&key).map_err(|_| PseudonymError::InvalidKey)?;
        Ok(Self { mac })
    }

    pub fn respondent_id(&self, user_id: Uuid, survey_id: Uuid) -> String {
        let mut mac = self.mac.clone();
        mac.update(user_id.as_bytes());
        mac.update(survey_id.as_bytes());
        general_purpose::STANDARD.encode(mac.finalize().into_bytes())
    }
}
