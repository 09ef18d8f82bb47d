use crate::error::{StoreError, StoreResult};

pub const DEFAULT_BCRYPT_COST: u32 = bcrypt::DEFAULT_COST;
// Range bcrypt accepts.
pub const MIN_BCRYPT_COST: u32 = 4;
pub const MAX_BCRYPT_COST: u32 = 31;

/// Hashing seam for stored passwords. The store only ever sees the output of
/// `hash`.
pub trait CredentialHasher {
    fn hash(&self, plain: &str) -> StoreResult<String>;
    fn verify(&self, plain: &str, hashed: &str) -> bool;
}

#[derive(Debug, Clone, Copy)]
pub struct BcryptHasher {
    cost: u32,
}

impl BcryptHasher {
    pub fn new(cost: u32) -> Self {
        Self {
            cost: cost.clamp(MIN_BCRYPT_COST, MAX_BCRYPT_COST),
        }
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }
}

impl Default for BcryptHasher {
    fn default() -> Self {
        Self::new(DEFAULT_BCRYPT_COST)
    }
}

impl CredentialHasher for BcryptHasher {
    fn hash(&self, plain: &str) -> StoreResult<String> {
        bcrypt::hash(plain, self.cost).map_err(|e| StoreError::Credential(e.to_string()))
    }

    fn verify(&self, plain: &str, hashed: &str) -> bool {
        // A malformed stored hash is a failed login, not an error.
        bcrypt::verify(plain, hashed).unwrap_or(false)
    }
}
