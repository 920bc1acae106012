use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use color_eyre::eyre::{eyre, Result, WrapErr};
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};

/// Argon2id password hashing. `insecure` swaps in minimal parameters for dev and test runs.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PasswordHashing {
    insecure: bool,
}

impl PasswordHashing {
    pub fn new(insecure: bool) -> Self {
        Self { insecure }
    }

    fn argon2(self) -> Result<Argon2<'static>> {
        if !self.insecure {
            return Ok(Argon2::default());
        }

        let params = Params::new(1024, 1, 1, None)
            .map_err(|e| eyre!("Invalid argon2 parameters: {e}"))?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }

    pub fn hash(self, password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2()?
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| eyre!("Failed to hash password: {e}"))?;

        Ok(hash.to_string())
    }

    /// [`PasswordHashing::hash`] off the async runtime.
    pub async fn hash_blocking(self, password: String) -> Result<String> {
        tokio::task::spawn_blocking(move || self.hash(&password))
            .await
            .wrap_err("Password hashing task failed")?
    }
}

/// The parameters are read from the PHC string, so hashes made with either cost verify.
pub(crate) fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed_hash) = PasswordHash::new(hash) else {
        return false;
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

pub(crate) async fn verify_password_blocking(password: String, hash: String) -> Result<bool> {
    tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .wrap_err("Password verification task failed")
}

pub(crate) fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Only this digest is stored, never the token itself.
pub(crate) fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}
