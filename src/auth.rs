//! Login and logout, plus the field validators shared with registration.
//! Login resolves the username to an email first; an empty lookup is the
//! distinct "user not found" case and no auth call is made for it.

use actix_web::{web, HttpRequest, HttpResponse};
use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;

use crate::config::{MIN_PASSWORD_LENGTH, MIN_USERNAME_LENGTH};
use crate::core::backend::{self, AuthApi, Backend};
use crate::core::errors::ApiError;
use crate::core::helpers::redirect;
use crate::core::query_params::{get_bool_flag, parse_query_params};
use crate::core::session::{self, SessionStore};
use crate::templates;

#[derive(Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

/// Per-field messages rendered inline next to the inputs, plus a
/// page-level notice for backend failures.
#[derive(Default, Clone)]
pub struct LoginErrors {
    pub username: String,
    pub password: String,
    pub notice: String,
}

fn username_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"^[a-zA-Z0-9_]+$").expect("Regex should compile"))
}

fn email_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("Regex should compile"))
}

pub fn validate_username(username: &str) -> Result<(), String> {
    if username.is_empty() {
        return Err("Username is required".to_string());
    }
    if username.len() < MIN_USERNAME_LENGTH {
        return Err("Username must be at least 3 characters".to_string());
    }
    if !username_regex().is_match(username) {
        return Err("Username can only contain letters, numbers, and underscores".to_string());
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), String> {
    if password.is_empty() {
        return Err("Password is required".to_string());
    }
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err("Password must be at least 6 characters".to_string());
    }
    Ok(())
}

/// Registration additionally requires all three character classes.
pub fn validate_registration_password(password: &str) -> Result<(), String> {
    validate_password(password)?;

    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    if !(has_upper && has_lower && has_digit) {
        return Err("Password must contain uppercase, lowercase, and numbers".to_string());
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("Email is required".to_string());
    }
    if !email_regex().is_match(email) {
        return Err("Please enter a valid email".to_string());
    }
    Ok(())
}

pub async fn login_page(
    sessions: web::Data<SessionStore>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    if session::current_user(&req, &sessions).is_some() {
        return Ok(redirect("/"));
    }

    let params = parse_query_params(&req.uri().to_string());
    let mut errors = LoginErrors::default();
    if get_bool_flag(&params, "registered") {
        errors.notice = "Registration successful! You can now login with your credentials.".to_string();
    }
    templates::render_login_page("", &errors)
}

pub async fn login_user<B: Backend + 'static>(
    db: web::Data<B>,
    sessions: web::Data<SessionStore>,
    form: web::Form<LoginForm>,
) -> Result<HttpResponse, ApiError> {
    let username = form.username.trim().to_string();
    let password = form.password.clone();

    let mut errors = LoginErrors::default();
    if let Err(message) = validate_username(&username) {
        errors.username = message;
    }
    if let Err(message) = validate_password(&password) {
        errors.password = message;
    }
    if !errors.username.is_empty() || !errors.password.is_empty() {
        return templates::render_login_page(&username, &errors);
    }

    // Resolve the username to an email before touching the auth subsystem.
    let email = match backend::lookup_email_by_username(db.get_ref(), &username).await {
        Ok(Some(email)) => email,
        Ok(None) => {
            errors.username = "User not found".to_string();
            return templates::render_login_page(&username, &errors);
        }
        Err(err) => {
            errors.notice = err.message;
            return templates::render_login_page(&username, &errors);
        }
    };

    let auth_user = match db.sign_in_with_password(&email, &password).await {
        Ok(auth_user) => auth_user,
        Err(err) => {
            if err.message.contains("Invalid login credentials") {
                errors.password = "Invalid username or password".to_string();
            } else if err.message.contains("Email not confirmed") {
                errors.notice =
                    "Please verify your email first. Check your email for a verification link."
                        .to_string();
            } else {
                errors.notice = err.message;
            }
            return templates::render_login_page(&username, &errors);
        }
    };

    let profile = match backend::fetch_user_by_id(db.get_ref(), &auth_user.id).await {
        Ok(Some(profile)) => profile,
        Ok(None) => {
            errors.notice = "Profile not found".to_string();
            return templates::render_login_page(&username, &errors);
        }
        Err(err) => {
            errors.notice = err.message;
            return templates::render_login_page(&username, &errors);
        }
    };

    let token = sessions.create(&profile);
    log::info!("user {} logged in", profile.username);

    let mut response = redirect("/");
    response
        .add_cookie(&session::session_cookie(&token))
        .map_err(|err| ApiError::Internal(err.to_string()))?;
    Ok(response)
}

pub async fn logout_user<B: Backend + 'static>(
    db: web::Data<B>,
    sessions: web::Data<SessionStore>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    if let Err(err) = db.sign_out().await {
        log::debug!("sign-out against auth subsystem failed: {err}");
    }

    if let Some(token) = session::session_token(&req) {
        sessions.remove(&token);
    }

    let mut response = redirect("/login");
    response
        .add_cookie(&session::removal_cookie())
        .map_err(|err| ApiError::Internal(err.to_string()))?;
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn username_rules() {
        assert!(validate_username("alice_1").is_ok());
        assert!(validate_username("a_b").is_ok());
        assert!(validate_username("ABC123_xyz").is_ok());

        assert_eq!(
            validate_username("").unwrap_err(),
            "Username is required"
        );
        assert_eq!(
            validate_username("ab").unwrap_err(),
            "Username must be at least 3 characters"
        );
        assert_eq!(
            validate_username("bad name").unwrap_err(),
            "Username can only contain letters, numbers, and underscores"
        );
        assert!(validate_username("dash-ed").is_err());
        assert!(validate_username("dot.ted").is_err());
    }

    #[test]
    fn login_password_rules() {
        assert!(validate_password("abcdef").is_ok());
        assert_eq!(validate_password("").unwrap_err(), "Password is required");
        assert_eq!(
            validate_password("abc").unwrap_err(),
            "Password must be at least 6 characters"
        );
    }

    #[test]
    fn registration_password_needs_all_classes() {
        assert!(validate_registration_password("Abcdef1").is_ok());

        assert!(validate_registration_password("abcdef1").is_err());
        assert!(validate_registration_password("ABCDEF1").is_err());
        assert!(validate_registration_password("Abcdefg").is_err());
        assert_eq!(
            validate_registration_password("abcdefg").unwrap_err(),
            "Password must contain uppercase, lowercase, and numbers"
        );
        assert_eq!(
            validate_registration_password("Ab1").unwrap_err(),
            "Password must be at least 6 characters"
        );
    }

    #[test]
    fn email_shape() {
        assert!(validate_email("a@x.com").is_ok());
        assert_eq!(validate_email("").unwrap_err(), "Email is required");
        assert!(validate_email("not-an-email").is_err());
        assert!(validate_email("a b@x.com").is_err());
        assert!(validate_email("a@x").is_err());
    }
}
