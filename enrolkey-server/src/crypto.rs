//! Password hashing and session tokens

use enrolkey_core::Error;

/// Default bcrypt cost factor
pub const BCRYPT_COST: u32 = 12;

/// Hash a password with bcrypt
pub fn hash_password(password: &str) -> Result<String, Error> {
    bcrypt::hash(password, BCRYPT_COST).map_err(|e| Error::Store(e.to_string()))
}

/// Verify a password against a bcrypt hash
pub fn verify_password(password: &str, hash: &str) -> Result<bool, Error> {
    bcrypt::verify(password, hash).map_err(|e| Error::Store(e.to_string()))
}

/// Generate a random token for session ids and CSRF tokens
pub fn generate_token() -> String {
    uuid::Uuid::new_v4().to_string()
}
