//! User accounts: registration, authentication, profile updates.

use chrono::{DateTime, Utc};

use crate::domain::credentials::{generate_token_key, hash_password, verify_password};
use crate::domain::error::{FieldError, PortfolioError};
use crate::ports::store_port::PortfolioStore;

pub const MAX_EMAIL_LEN: usize = 255;
pub const MAX_USER_NAME_LEN: usize = 255;
pub const MIN_PASSWORD_LEN: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub date_joined: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Regular,
    Superuser,
}

/// A user row about to be inserted. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub is_staff: bool,
    pub is_superuser: bool,
}

/// Column updates; `None` leaves a column as it is.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub email: Option<String>,
    pub name: Option<String>,
    pub password_hash: Option<String>,
}

/// Profile fields as submitted by a client.
#[derive(Debug, Clone, Default)]
pub struct ProfilePatch {
    pub email: Option<String>,
    pub name: Option<String>,
    pub password: Option<String>,
}

/// Trims the address and lower-cases its domain part.
pub fn normalize_email(raw: &str) -> Result<String, FieldError> {
    let email = raw.trim();
    if email.is_empty() {
        return Err(FieldError::new("email", "This field may not be blank."));
    }
    if email.len() > MAX_EMAIL_LEN {
        return Err(FieldError::new(
            "email",
            format!("Ensure this field has no more than {MAX_EMAIL_LEN} characters."),
        ));
    }
    let invalid = || FieldError::new("email", "Enter a valid email address.");
    let (local, domain) = email.rsplit_once('@').ok_or_else(invalid)?;
    if local.is_empty()
        || domain.is_empty()
        || !domain.contains('.')
        || domain.starts_with('.')
        || domain.ends_with('.')
        || email.chars().any(char::is_whitespace)
    {
        return Err(invalid());
    }
    Ok(format!("{local}@{}", domain.to_lowercase()))
}

pub fn validate_password(raw: &str) -> Result<(), FieldError> {
    if raw.chars().count() < MIN_PASSWORD_LEN {
        return Err(FieldError::new(
            "password",
            format!("Ensure this field has at least {MIN_PASSWORD_LEN} characters."),
        ));
    }
    Ok(())
}

fn validate_user_name(raw: &str) -> Result<String, FieldError> {
    let name = raw.trim();
    if name.chars().count() > MAX_USER_NAME_LEN {
        return Err(FieldError::new(
            "name",
            format!("Ensure this field has no more than {MAX_USER_NAME_LEN} characters."),
        ));
    }
    Ok(name.to_string())
}

/// Validates, hashes and stores a new account.
pub fn register(
    store: &dyn PortfolioStore,
    email: &str,
    password: &str,
    name: &str,
    role: Role,
) -> Result<User, PortfolioError> {
    let (email, name) = match (
        normalize_email(email),
        validate_user_name(name),
        validate_password(password),
    ) {
        (Ok(email), Ok(name), Ok(())) => (email, name),
        (email, name, password) => {
            let errors = [email.err(), name.err(), password.err()]
                .into_iter()
                .flatten()
                .collect();
            return Err(PortfolioError::Validation(errors));
        }
    };

    let superuser = role == Role::Superuser;
    let user = store.create_user(&NewUser {
        email,
        name,
        password_hash: hash_password(password)?,
        is_staff: superuser,
        is_superuser: superuser,
    })?;
    tracing::info!(user_id = user.id, superuser, "registered user");
    Ok(user)
}

/// Looks up an active user by email and checks the password.
pub fn authenticate(
    store: &dyn PortfolioStore,
    email: &str,
    password: &str,
) -> Result<User, PortfolioError> {
    let email = normalize_email(email).map_err(|_| PortfolioError::InvalidCredentials)?;
    match store.find_user_by_email(&email)? {
        Some(user) if user.is_active && verify_password(&user.password_hash, password) => Ok(user),
        _ => Err(PortfolioError::InvalidCredentials),
    }
}

/// Authenticates and returns the user's API token, creating it on first use.
pub fn issue_token(
    store: &dyn PortfolioStore,
    email: &str,
    password: &str,
) -> Result<String, PortfolioError> {
    let user = authenticate(store, email, password)?;
    store.token_for_user(user.id, &generate_token_key())
}

/// Applies a profile update. With `partial` false, email and password are
/// required.
pub fn update_profile(
    store: &dyn PortfolioStore,
    user: &User,
    patch: ProfilePatch,
    partial: bool,
) -> Result<User, PortfolioError> {
    let mut errors = Vec::new();
    if !partial {
        if patch.email.is_none() {
            errors.push(FieldError::new("email", "This field is required."));
        }
        if patch.password.is_none() {
            errors.push(FieldError::new("password", "This field is required."));
        }
    }

    let email = match patch.email.as_deref().map(normalize_email) {
        Some(Ok(email)) => Some(email),
        Some(Err(e)) => {
            errors.push(e);
            None
        }
        None => None,
    };
    let name = match patch.name.as_deref().map(validate_user_name) {
        Some(Ok(name)) => Some(name),
        Some(Err(e)) => {
            errors.push(e);
            None
        }
        None => None,
    };
    if let Some(Err(e)) = patch.password.as_deref().map(validate_password) {
        errors.push(e);
    }
    if !errors.is_empty() {
        return Err(PortfolioError::Validation(errors));
    }

    let password_hash = match patch.password.as_deref() {
        Some(password) => Some(hash_password(password)?),
        None => None,
    };
    store.update_user(
        user.id,
        &UserChanges {
            email,
            name,
            password_hash,
        },
    )
}
