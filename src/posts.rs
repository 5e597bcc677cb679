//! Post, like, and comment mutations. Creating or deleting a post answers
//! with a redirect back to the feed; the like and comment endpoints
//! re-query only the affected count so the page can patch one element in
//! place.

use actix_web::{web, HttpRequest, HttpResponse};
use ammonia::Builder;
use html_escape::encode_double_quoted_attribute;
use regex::Regex;
use serde::Deserialize;
use serde_json::json;
use std::sync::OnceLock;

use crate::config::MAX_POST_LENGTH;
use crate::core::backend::{self, Backend};
use crate::core::errors::ApiError;
use crate::core::helpers::{redirect, sanitize_text};
use crate::core::session::{self, SessionStore};
use crate::templates;

#[derive(Deserialize)]
pub struct PostForm {
    pub content: String,
}

#[derive(Deserialize)]
pub struct CommentForm {
    pub content: String,
}

fn url_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"https?://[^\s]+").expect("Regex should compile"))
}

/// Sanitize post text and turn bare URLs into links.
fn filter_post_content(content: &str) -> String {
    let clean = Builder::default()
        .link_rel(Some("noopener noreferrer"))
        .clean(content)
        .to_string();

    url_regex()
        .replace_all(&clean, |caps: &regex::Captures| {
            let url = &caps[0];
            let escaped_url = encode_double_quoted_attribute(url);
            format!(r#"<a href="{}" target="_blank">{}</a>"#, escaped_url, url)
        })
        .to_string()
}

pub async fn create_post<B: Backend + 'static>(
    db: web::Data<B>,
    sessions: web::Data<SessionStore>,
    req: HttpRequest,
    form: web::Form<PostForm>,
) -> Result<HttpResponse, ApiError> {
    let Some(user) = session::current_user(&req, &sessions) else {
        return Ok(redirect("/login"));
    };

    let content = form.content.trim();
    if content.is_empty() || content.chars().count() > MAX_POST_LENGTH {
        return Err(ApiError::BadRequest("Invalid content".to_string()));
    }

    backend::insert_post(db.get_ref(), &user.id, &filter_post_content(content)).await?;

    Ok(redirect("/"))
}

// Ownership is gated in the rendered page (no delete control on foreign
// posts); the row-level rule itself belongs to the backend.
pub async fn delete_post<B: Backend + 'static>(
    db: web::Data<B>,
    sessions: web::Data<SessionStore>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    if session::current_user(&req, &sessions).is_none() {
        return Ok(redirect("/login"));
    }

    backend::delete_post(db.get_ref(), &path.into_inner()).await?;

    Ok(redirect("/"))
}

/// Like toggle: delete the row if present, insert it otherwise, then
/// re-query that one post's count for the in-place patch.
pub async fn toggle_like<B: Backend + 'static>(
    db: web::Data<B>,
    sessions: web::Data<SessionStore>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let Some(user) = session::current_user(&req, &sessions) else {
        return Err(ApiError::Unauthorized);
    };
    let post_id = path.into_inner();

    let existing = backend::find_like(db.get_ref(), &post_id, &user.id).await?;
    if existing {
        backend::delete_like(db.get_ref(), &post_id, &user.id).await?;
    } else {
        backend::insert_like(db.get_ref(), &post_id, &user.id).await?;
    }

    let count = backend::like_count(db.get_ref(), &post_id).await?;

    Ok(HttpResponse::Ok().json(json!({ "count": count, "liked": !existing })))
}

pub async fn list_comments<B: Backend + 'static>(
    db: web::Data<B>,
    sessions: web::Data<SessionStore>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    if session::current_user(&req, &sessions).is_none() {
        return Err(ApiError::Unauthorized);
    }

    let comments = backend::fetch_comments(db.get_ref(), &path.into_inner()).await?;

    Ok(HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(templates::render_comment_panel(&comments)))
}

pub async fn add_comment<B: Backend + 'static>(
    db: web::Data<B>,
    sessions: web::Data<SessionStore>,
    req: HttpRequest,
    path: web::Path<String>,
    body: web::Json<CommentForm>,
) -> Result<HttpResponse, ApiError> {
    let Some(user) = session::current_user(&req, &sessions) else {
        return Err(ApiError::Unauthorized);
    };
    let post_id = path.into_inner();

    let content = body.content.trim();
    if content.is_empty() {
        return Err(ApiError::BadRequest("Invalid content".to_string()));
    }

    backend::insert_comment(db.get_ref(), &post_id, &user.id, &sanitize_text(content)).await?;

    let count = backend::comment_count(db.get_ref(), &post_id).await?;

    Ok(HttpResponse::Ok().json(json!({ "count": count })))
}
