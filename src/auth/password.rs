use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use lazy_static::lazy_static;
use rand::rngs::OsRng;
use tracing::{error, warn};

/// Argon2 PHC string. Only [`hash_password`] builds one, so a stored
/// password attribute can never hold plaintext.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordDigest(String);

impl PasswordDigest {
    /// Wrap a digest read back from storage.
    pub(crate) fn from_stored(phc: String) -> Self {
        Self(phc)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for PasswordDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PasswordDigest(..)")
    }
}

pub fn hash_password(plain: &str) -> anyhow::Result<PasswordDigest> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            anyhow::anyhow!(e.to_string())
        })?
        .to_string();
    Ok(PasswordDigest(hash))
}

/// Constant-time check through the Argon2 verifier. A malformed digest is a non-match.
pub fn verify_password(plain: &str, digest: &PasswordDigest) -> bool {
    let parsed = match PasswordHash::new(digest.as_str()) {
        Ok(p) => p,
        Err(e) => {
            warn!(error = %e, "stored password hash is malformed");
            return false;
        }
    };
    Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok()
}

lazy_static! {
    /// Stand-in digest for logins that match no account.
    static ref PLACEHOLDER_DIGEST: Option<PasswordDigest> =
        hash_password("placeholder-for-unknown-accounts").ok();
}

/// Runs one Argon2 verification against a fixed digest and always answers
/// false, so an unknown account costs the same as a wrong password.
pub fn verify_against_placeholder(plain: &str) -> bool {
    match PLACEHOLDER_DIGEST.as_ref() {
        Some(digest) => {
            let _ = verify_password(plain, digest);
        }
        None => error!("placeholder password digest unavailable"),
    }
    false
}
