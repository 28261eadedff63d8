use argon2::{
    password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use lazy_static::lazy_static;
use rand::rngs::OsRng;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("argon2 hash failed: {0}")]
    Hash(password_hash::Error),

    #[error("stored hash is malformed: {0}")]
    Malformed(password_hash::Error),

    #[error("argon2 verify failed: {0}")]
    Verify(password_hash::Error),

    #[error("password task failed: {0}")]
    Task(tokio::task::JoinError),
}

lazy_static! {
    // Verified against when the account does not exist, so both login failures cost the same.
    static ref DUMMY_HASH: Option<String> = hash_password("usersvc-timing-equalizer").ok();
}

/// Salted Argon2id hash in PHC string form.
pub fn hash_password(plain: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            PasswordError::Hash(e)
        })
}

/// `Ok(false)` on mismatch; `Err` only when the stored hash cannot be used.
pub fn verify_password(plain: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed = PasswordHash::new(hash).map_err(PasswordError::Malformed)?;
    match Argon2::default().verify_password(plain.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::Verify(e)),
    }
}

pub fn verify_against_dummy(plain: &str) {
    if let Some(hash) = DUMMY_HASH.as_deref() {
        let _ = verify_password(plain, hash);
    }
}

// Argon2 is CPU-bound; handlers go through these so the async workers stay free.

pub async fn hash_in_background(plain: String) -> Result<String, PasswordError> {
    tokio::task::spawn_blocking(move || hash_password(&plain))
        .await
        .map_err(PasswordError::Task)?
}

pub async fn verify_in_background(plain: String, hash: String) -> Result<bool, PasswordError> {
    tokio::task::spawn_blocking(move || verify_password(&plain, &hash))
        .await
        .map_err(PasswordError::Task)?
}

pub async fn verify_against_dummy_in_background(plain: String) {
    let _ = tokio::task::spawn_blocking(move || verify_against_dummy(&plain)).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_roundtrip() {
        let password = "pw123";
        let hash = hash_password(password).expect("hashing should succeed");
        assert!(hash.starts_with("$argon2id$"));
        assert!(!hash.contains(password));
        assert!(verify_password(password, &hash).expect("verify should succeed"));
    }

    #[test]
    fn verify_rejects_wrong_password() {
        let hash = hash_password("correct-horse").expect("hashing should succeed");
        assert!(!verify_password("wrong-horse", &hash).expect("verify should not error"));
    }

    #[test]
    fn same_password_gets_distinct_salts() {
        let a = hash_password("same").unwrap();
        let b = hash_password("same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn verify_errors_on_malformed_hash() {
        let err = verify_password("anything", "not-a-valid-hash").unwrap_err();
        assert!(matches!(err, PasswordError::Malformed(_)));
    }

    #[test]
    fn dummy_verification_never_panics() {
        verify_against_dummy("whatever");
        assert!(DUMMY_HASH.is_some());
    }

    #[tokio::test]
    async fn background_hash_and_verify_agree() {
        let hash = hash_in_background("pw123".to_string()).await.unwrap();
        assert!(verify_in_background("pw123".to_string(), hash.clone())
            .await
            .unwrap());
        assert!(!verify_in_background("nope".to_string(), hash).await.unwrap());
        verify_against_dummy_in_background("pw123".to_string()).await;
    }

    #[tokio::test]
    async fn background_verify_reports_malformed_hash() {
        let err = verify_in_background("pw".to_string(), "garbage".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, PasswordError::Malformed(_)));
    }
}
