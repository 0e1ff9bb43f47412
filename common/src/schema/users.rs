use anyhow::anyhow;
use argon2::password_hash::{SaltString, rand_core::OsRng};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use chrono::NaiveDateTime;
use fancy_regex::Regex;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

pub const ROLE_DONOR: &str = "donatur";
pub const ROLE_VOLUNTEER: &str = "relawan";
pub const ROLE_NGO: &str = "ngo";
pub const ROLE_ADMIN: &str = "admin";

/// Roles that may be chosen at registration. Admins are created through the CLI.
pub const REGISTRABLE_ROLES: [&str; 3] = [ROLE_DONOR, ROLE_VOLUNTEER, ROLE_NGO];

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub phone: Option<String>,
    pub birth_date: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub province: Option<String>,
    pub role: String,
    pub wallet_address: Option<String>,
    pub level: i64,
    pub xp: i64,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

/// JWT claims carried in the access/refresh cookies.
#[derive(
    Debug, Clone, Serialize, Deserialize, actix_jwt_auth_middleware::FromRequest,
)]
pub struct AuthUser {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: String,
}

impl User {
    pub fn new(
        name: &str,
        email: &str,
        password: &str,
        phone: Option<&str>,
        role: &str,
        wallet_address: Option<String>,
    ) -> anyhow::Result<Self> {
        if name.trim().is_empty() {
            return Err(anyhow!("Name must not be empty."));
        }

        if !validate_email(email)? {
            return Err(anyhow!("Invalid email address."));
        }

        if !validate_password(password)? {
            return Err(anyhow!(
                "Password must be at least 8 characters long and include at least one lowercase letter, one uppercase letter, and one number."
            ));
        }

        let password_hash = hash_password(password)?;

        Ok(User {
            id: 0, //set by DB
            name: name.to_string(),
            email: email.to_string(),
            password_hash,
            phone: phone.map(str::to_string),
            birth_date: None,
            address: None,
            city: None,
            province: None,
            role: role.to_string(),
            wallet_address,
            level: 1,
            xp: 0,
            created_at: None, //set by DB
            updated_at: None, //set by DB
        })
    }

    pub fn verify_password(&self, password: &str) -> anyhow::Result<()> {
        let hash = PasswordHash::new(&self.password_hash)
            .map_err(|e| anyhow!("Failed to parse password hash: {}", e))?;
        Argon2::default()
            .verify_password(password.as_bytes(), &hash)
            .map_err(|e| anyhow!("Password not match: {}", e))
    }

    pub fn claims(&self) -> AuthUser {
        AuthUser {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role.clone(),
        }
    }
}

pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow!("Failed to hash password: {e}"))?
        .to_string())
}

fn validate_email(email: &str) -> anyhow::Result<bool> {
    static RE: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"^[^@]+@[^@]+\.[^@]+$").ok());
    match &*RE {
        Some(re) => re
            .is_match(email)
            .map_err(|e| anyhow!("Regex error for email: {e}")),
        None => Err(anyhow!(
            "Email regex failed to compile. Rejecting all emails."
        )),
    }
}

fn validate_password(password: &str) -> anyhow::Result<bool> {
    static RE: Lazy<Option<Regex>> =
        Lazy::new(|| Regex::new(r"^(?=.*[a-z])(?=.*[A-Z])(?=.*\d).{8,}$").ok());
    match &*RE {
        Some(re) => re
            .is_match(password)
            .map_err(|e| anyhow!("Regex error for password: {e}")),
        None => Err(anyhow!(
            "Password regex failed to compile. Rejecting all passwords."
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_user_hashes_and_verifies_password() {
        let user = User::new(
            "Donatur Satu",
            "donatur1@gmail.com",
            "Password123",
            Some("0811111111"),
            ROLE_DONOR,
            None,
        )
        .unwrap();
        assert_ne!(user.password_hash, "Password123");
        assert!(user.verify_password("Password123").is_ok());
        assert!(user.verify_password("wrong-password").is_err());
    }

    #[test]
    fn rejects_invalid_email_and_weak_password() {
        assert!(User::new("A", "not-an-email", "Password123", None, ROLE_DONOR, None).is_err());
        assert!(User::new("A", "a@b.co", "short", None, ROLE_DONOR, None).is_err());
        assert!(User::new("A", "a@b.co", "alllowercase1", None, ROLE_DONOR, None).is_err());
    }
}
