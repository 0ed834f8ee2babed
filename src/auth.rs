//! Credential store operations: registration with argon2id password
//! hashing, and login by username or email. Users are immutable once
//! created; there is no update or delete path.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use crate::db::Database;
use crate::error::AuthError;
use crate::model::{RegisterUser, User};

pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Store(anyhow::anyhow!("password hashing failed: {e}")))
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .and_then(|parsed| Argon2::default().verify_password(password.as_bytes(), &parsed))
        .is_ok()
}

/// Creates a user, enforcing username/email uniqueness at the storage
/// layer. A UNIQUE violation comes back as `DuplicateField` naming the
/// offending column.
pub async fn create_user(db: &Database, req: RegisterUser) -> Result<User, AuthError> {
    let password_hash = hash_password(&req.password)?;

    match db
        .create_user(&req.name, &req.username, &req.email, &password_hash)
        .await
    {
        Ok(user) => Ok(user),
        Err(e) => {
            let msg = e.to_string();
            if msg.contains("users.username") {
                Err(AuthError::DuplicateField("username"))
            } else if msg.contains("users.email") {
                Err(AuthError::DuplicateField("email"))
            } else {
                Err(AuthError::Store(e))
            }
        }
    }
}

/// Unknown identifier and wrong password are indistinguishable to the
/// caller.
pub async fn verify_login(db: &Database, login: &str, password: &str) -> Result<User, AuthError> {
    let user = db
        .find_user_by_identifier(login)
        .await
        .map_err(AuthError::Store)?;

    match user {
        Some(user) if verify_password(password, &user.password_hash) => Ok(user),
        _ => Err(AuthError::InvalidCredentials),
    }
}
