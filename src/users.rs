//! Registration and profile management. Registration is the two-step flow
//! against the backend: create the auth identity, then insert the profile
//! row. A username-uniqueness check runs before the identity is created so
//! the common duplicate-username failure cannot orphan an identity; a
//! failure between the two steps is logged and surfaced, not hidden.

use actix_web::{web, HttpRequest, HttpResponse};
use chrono::Utc;
use serde::Deserialize;

use crate::auth::{
    validate_email, validate_registration_password, validate_username,
};
use crate::config::MAX_BIO_LENGTH;
use crate::core::backend::{self, AuthApi, Backend};
use crate::core::errors::ApiError;
use crate::core::helpers::{placeholder_avatar, redirect, sanitize_text};
use crate::core::session::{self, SessionStore};
use crate::models::models::{ProfileUpdate, User};
use crate::templates;

#[derive(Deserialize, Default, Clone)]
pub struct RegisterForm {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

#[derive(Default, Clone)]
pub struct RegisterErrors {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub notice: String,
}

impl RegisterErrors {
    fn any(&self) -> bool {
        !(self.username.is_empty()
            && self.email.is_empty()
            && self.password.is_empty()
            && self.confirm_password.is_empty())
    }
}

#[derive(Deserialize)]
pub struct EditProfileForm {
    pub full_name: String,
    pub username: String,
    pub bio: String,
    pub avatar_url: String,
}

pub async fn register_page(
    sessions: web::Data<SessionStore>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    if session::current_user(&req, &sessions).is_some() {
        return Ok(redirect("/"));
    }
    templates::render_register_page(&RegisterForm::default(), &RegisterErrors::default())
}

pub async fn create_user<B: Backend + 'static>(
    db: web::Data<B>,
    form: web::Form<RegisterForm>,
) -> Result<HttpResponse, ApiError> {
    let mut form = form.into_inner();
    form.username = form.username.trim().to_string();
    form.email = form.email.trim().to_string();

    let mut errors = RegisterErrors::default();
    if let Err(message) = validate_username(&form.username) {
        errors.username = message;
    }
    if let Err(message) = validate_email(&form.email) {
        errors.email = message;
    }
    if let Err(message) = validate_registration_password(&form.password) {
        errors.password = message;
    }
    if form.confirm_password.is_empty() {
        errors.confirm_password = "Please confirm your password".to_string();
    } else if form.password != form.confirm_password {
        errors.confirm_password = "Passwords do not match".to_string();
    }
    if errors.any() {
        return templates::render_register_page(&form, &errors);
    }

    // Checked before sign-up so a taken username cannot strand a fresh
    // auth identity without a profile row.
    match backend::find_user_by_username(db.get_ref(), &form.username).await {
        Ok(Some(_)) => {
            errors.username = "Username is already taken".to_string();
            return templates::render_register_page(&form, &errors);
        }
        Ok(None) => {}
        Err(err) => {
            errors.notice = err.message;
            return templates::render_register_page(&form, &errors);
        }
    }

    let auth_user = match db.sign_up(&form.email, &form.password).await {
        Ok(auth_user) => auth_user,
        Err(err) => {
            errors.notice = if err.message.contains("rate") {
                "Too many registration attempts. Please wait a few minutes and try again."
                    .to_string()
            } else if err.message.contains("already") {
                "Email already registered. Please use a different email or login.".to_string()
            } else {
                err.message
            };
            return templates::render_register_page(&form, &errors);
        }
    };

    let profile = User {
        id: auth_user.id,
        username: form.username.clone(),
        email: form.email.clone(),
        full_name: form.username.clone(),
        avatar_url: placeholder_avatar(&form.username),
        bio: Some("Welcome to my profile!".to_string()),
        followers: 0,
        following: 0,
        created_at: Some(Utc::now()),
    };

    if let Err(err) = backend::insert_profile(db.get_ref(), &profile).await {
        // The identity now exists without a profile row; the anon
        // credential cannot delete it, so all we can do is report.
        log::error!(
            "profile insert failed after sign-up for {}: {}",
            form.email,
            err
        );
        errors.notice = err.message;
        return templates::render_register_page(&form, &errors);
    }

    log::info!("registered user {}", profile.username);
    Ok(redirect("/login?registered=1"))
}

pub async fn edit_profile_page(
    sessions: web::Data<SessionStore>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let Some(user) = session::current_user(&req, &sessions) else {
        return Ok(redirect("/login"));
    };
    templates::render_edit_profile_page(&user, "")
}

pub async fn update_profile<B: Backend + 'static>(
    db: web::Data<B>,
    sessions: web::Data<SessionStore>,
    req: HttpRequest,
    form: web::Form<EditProfileForm>,
) -> Result<HttpResponse, ApiError> {
    let Some(mut user) = session::current_user(&req, &sessions) else {
        return Ok(redirect("/login"));
    };

    let full_name = form.full_name.trim().to_string();
    let username = form.username.trim().to_string();
    let bio = form.bio.trim();
    let avatar_url = form.avatar_url.trim().to_string();

    if full_name.is_empty() || username.is_empty() {
        return templates::render_edit_profile_page(&user, "Please fill in all required fields");
    }
    if let Err(message) = validate_username(&username) {
        return templates::render_edit_profile_page(&user, &message);
    }
    if bio.len() > MAX_BIO_LENGTH {
        return templates::render_edit_profile_page(&user, "Bio too long (max 500 chars)");
    }

    let updates = ProfileUpdate {
        full_name,
        username,
        bio: sanitize_text(bio),
        avatar_url,
    };

    if let Err(err) = backend::update_profile(db.get_ref(), &user.id, &updates).await {
        return templates::render_edit_profile_page(&user, &err.message);
    }

    // Keep the session snapshot in step with the row.
    user.full_name = updates.full_name;
    user.username = updates.username;
    user.bio = if updates.bio.is_empty() { None } else { Some(updates.bio) };
    user.avatar_url = updates.avatar_url;
    if let Some(token) = session::session_token(&req) {
        sessions.write(&token, &user);
    }

    Ok(redirect("/profile"))
}

/// Case-insensitive substring match over username and full name.
pub fn search_users<'a>(users: &'a [User], query: &str) -> Vec<&'a User> {
    let query = query.to_lowercase();
    users
        .iter()
        .filter(|u| {
            u.username.to_lowercase().contains(&query)
                || u.full_name.to_lowercase().contains(&query)
        })
        .collect()
}
