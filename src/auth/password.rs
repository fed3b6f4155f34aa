// 🔑 Password Verifier - bcrypt hashing and comparison

use super::AuthError;
use tracing::warn;

/// Cost bounds accepted by bcrypt
pub const MIN_BCRYPT_COST: u32 = 4;
pub const MAX_BCRYPT_COST: u32 = 31;

/// Plaintext used to build the placeholder hash for unknown users
const DUMMY_PASSWORD: &str = "carvault-placeholder-password";

/// bcrypt hashing with a fixed cost.
///
/// Holds a placeholder hash of the same cost so a login for an unknown
/// user does the same amount of work as one with a wrong password.
#[derive(Debug, Clone)]
pub struct PasswordHasher {
    cost: u32,
    dummy_hash: String,
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Result<Self, AuthError> {
        let dummy_hash = bcrypt::hash(DUMMY_PASSWORD, cost)?;
        Ok(PasswordHasher { cost, dummy_hash })
    }

    pub fn hash(&self, password: &str) -> Result<String, AuthError> {
        Ok(bcrypt::hash(password, self.cost)?)
    }

    /// True iff `submitted` matches `stored_hash`. A malformed hash is a mismatch.
    pub fn verify(&self, stored_hash: &str, submitted: &str) -> bool {
        match bcrypt::verify(submitted, stored_hash) {
            Ok(matches) => matches,
            Err(e) => {
                warn!(error = %e, "Stored password hash could not be parsed");
                false
            }
        }
    }

    /// Burn one verification against the placeholder hash. Always false.
    pub fn verify_dummy(&self, submitted: &str) -> bool {
        let _ = bcrypt::verify(submitted, &self.dummy_hash);
        false
    }
}
