//! Page rendering: embedded HTML shells with placeholder substitution, and
//! typed fragment renderers keyed by entity id. Names and handles are
//! escaped here; post/comment/bio text is already sanitized at input time
//! and is embedded as-is.

use actix_web::{web, HttpRequest, HttpResponse};
use chrono::{DateTime, Utc};
use html_escape::{encode_double_quoted_attribute, encode_text};
use rust_embed::RustEmbed;

use crate::config::{SUGGESTED_USERS_LIMIT, TRENDING_USERS_LIMIT};
use crate::core::backend::{self, Backend};
use crate::core::errors::ApiError;
use crate::core::helpers::{redirect, time_ago};
use crate::core::query_params::{get_string, parse_query_params};
use crate::core::session::{self, SessionStore};
use crate::feed;
use crate::models::models::{Comment, Post, User};
use crate::users::{RegisterErrors, RegisterForm};

#[derive(RustEmbed)]
#[folder = "static"]
struct Pages;

fn shell(name: &str) -> Result<String, ApiError> {
    let file = Pages::get(name)
        .ok_or_else(|| ApiError::Internal(format!("missing template {name}")))?;
    String::from_utf8(file.data.to_vec()).map_err(|err| ApiError::Internal(err.to_string()))
}

fn html_response(body: String) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(body)
}

fn field_error(message: &str) -> String {
    if message.is_empty() {
        String::new()
    } else {
        format!(r#"<div class="field-error">{}</div>"#, encode_text(message))
    }
}

fn notice_html(message: &str) -> String {
    if message.is_empty() {
        String::new()
    } else {
        format!(r#"<div class="notice">{}</div>"#, encode_text(message))
    }
}

// === entity fragments ===

/// One post card. Skipped entirely when no author can be resolved.
pub fn render_post(post: &Post, current: &User, now: DateTime<Utc>) -> Option<String> {
    let (username, full_name, avatar_url) = match &post.author {
        Some(author) => (
            author.username.clone(),
            author.full_name.clone(),
            author.avatar_url.clone(),
        ),
        None if post.user_id == current.id => (
            current.username.clone(),
            current.full_name.clone(),
            current.avatar_url.clone(),
        ),
        None => return None,
    };

    let delete_control = if post.user_id == current.id {
        format!(
            r#"<form method="post" action="/posts/{id}/delete" class="delete-post-form"><button type="submit" class="post-delete-btn">Delete</button></form>"#,
            id = encode_double_quoted_attribute(&post.id),
        )
    } else {
        String::new()
    };

    Some(format!(
        r#"<div class="post" id="post-{id}">
  <div class="post-header">
    <a class="post-author" href="/profile?user={handle_link}">
      <img src="{avatar}" alt="{name}" class="post-author-avatar">
      <div class="post-author-info">
        <h4>{name}</h4>
        <p>@{handle} &middot; {when}</p>
      </div>
    </a>
    {delete_control}
  </div>
  <div class="post-content">{content}</div>
  <div class="post-actions">
    <button class="action-btn like-btn" data-post="{id}">&#129293; <span class="like-count" id="like-count-{id}">{likes}</span></button>
    <button class="action-btn comment-btn" data-post="{id}">&#128172; <span class="comment-count" id="comment-count-{id}">{comments}</span></button>
  </div>
</div>"#,
        id = encode_double_quoted_attribute(&post.id),
        handle_link = urlencoding::encode(&username),
        avatar = encode_double_quoted_attribute(&avatar_url),
        name = encode_text(&full_name),
        handle = encode_text(&username),
        when = time_ago(post.created_at, now),
        content = post.content,
        likes = post.like_count,
        comments = post.comment_count,
    ))
}

pub fn render_post_list<'a>(
    posts: impl IntoIterator<Item = &'a Post>,
    current: &User,
    now: DateTime<Utc>,
) -> String {
    let cards: Vec<String> = posts
        .into_iter()
        .filter_map(|post| render_post(post, current, now))
        .collect();
    if cards.is_empty() {
        return r#"<div class="empty-state"><p>No posts yet. Be the first to post!</p></div>"#
            .to_string();
    }
    cards.join("\n")
}

fn render_comment(comment: &Comment, now: DateTime<Utc>) -> String {
    let (username, full_name, avatar_url) = match &comment.author {
        Some(author) => (
            author.username.as_str(),
            author.full_name.as_str(),
            author.avatar_url.as_str(),
        ),
        None => ("unknown", "Unknown", ""),
    };

    format!(
        r#"<div class="comment" id="comment-{id}">
  <div class="comment-author">
    <img src="{avatar}" alt="{name}">
    <div><span class="comment-name">{name}</span> <span class="comment-handle">@{handle} &middot; {when}</span></div>
  </div>
  <div class="comment-content">{content}</div>
</div>"#,
        id = encode_double_quoted_attribute(&comment.id),
        avatar = encode_double_quoted_attribute(avatar_url),
        name = encode_text(full_name),
        handle = encode_text(username),
        when = time_ago(comment.created_at, now),
        content = comment.content,
    )
}

/// The comment-detail panel body: every comment for the post, oldest
/// first, exactly as the query returned them.
pub fn render_comment_panel(comments: &[Comment]) -> String {
    if comments.is_empty() {
        return r#"<p class="empty-note">No comments yet. Be the first!</p>"#.to_string();
    }
    let now = Utc::now();
    comments
        .iter()
        .map(|comment| render_comment(comment, now))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_user_card(user: &User) -> String {
    format!(
        r#"<div class="user-card" id="user-{id}">
  <img src="{avatar}" alt="{name}">
  <h3>{name}</h3>
  <p>@{handle}</p>
  <a class="btn" href="/profile?user={handle_link}">View Profile</a>
</div>"#,
        id = encode_double_quoted_attribute(&user.id),
        avatar = encode_double_quoted_attribute(&user.avatar_url),
        name = encode_text(&user.full_name),
        handle = encode_text(&user.username),
        handle_link = urlencoding::encode(&user.username),
    )
}

pub fn render_user_cards(users: &[&User]) -> String {
    if users.is_empty() {
        return r#"<p class="empty-note">No users found</p>"#.to_string();
    }
    users
        .iter()
        .map(|user| render_user_card(user))
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_sidebar(user: &User) -> String {
    format!(
        r#"<div class="sidebar-card">
  <img src="{avatar}" alt="{name}" id="sidebar-avatar">
  <h4 id="sidebar-name">{name}</h4>
  <p id="sidebar-handle">@{handle}</p>
</div>"#,
        avatar = encode_double_quoted_attribute(&user.avatar_url),
        name = encode_text(&user.full_name),
        handle = encode_text(&user.username),
    )
}

fn bio_html(user: &User) -> String {
    match user.bio.as_deref().filter(|bio| !bio.is_empty()) {
        Some(bio) => bio.to_string(),
        None => "No bio yet".to_string(),
    }
}

// === pages ===

pub async fn feed_page<B: Backend + 'static>(
    db: web::Data<B>,
    sessions: web::Data<SessionStore>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let Some(user) = session::current_user(&req, &sessions) else {
        return Ok(redirect("/login"));
    };

    let data = match feed::load_feed_data(db.get_ref()).await {
        Ok(data) => data,
        Err(err) => {
            log::error!("feed load failed: {err}");
            return render_error_page(&err.message);
        }
    };

    let now = Utc::now();
    let html = shell("feed.html")?
        .replace("SIDEBAR_CARD", &render_sidebar(&user))
        .replace("FEED_POSTS", &render_post_list(data.feed(), &user, now))
        .replace(
            "SUGGESTED_USERS",
            &render_user_cards(&data.others(&user.id, SUGGESTED_USERS_LIMIT)),
        );
    Ok(html_response(html))
}

pub async fn profile_page<B: Backend + 'static>(
    db: web::Data<B>,
    sessions: web::Data<SessionStore>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let Some(user) = session::current_user(&req, &sessions) else {
        return Ok(redirect("/login"));
    };

    let data = match feed::load_feed_data(db.get_ref()).await {
        Ok(data) => data,
        Err(err) => {
            log::error!("profile load failed: {err}");
            return render_error_page(&err.message);
        }
    };

    let params = parse_query_params(&req.uri().to_string());
    let viewing = match get_string(&params, "user", None) {
        Some(username) => match data.find_user_by_username(username.trim()) {
            Some(viewing) => viewing.clone(),
            None => return render_not_found_page("User not found"),
        },
        None => user.clone(),
    };

    let is_self = viewing.id == user.id;
    // Follow state defaults to "not following" if the lookup fails.
    let following = if is_self {
        false
    } else {
        backend::is_following(db.get_ref(), &user.id, &viewing.id)
            .await
            .unwrap_or(false)
    };

    let posts = data.posts_by(&viewing.id);
    let now = Utc::now();
    let html = shell("profile.html")?
        .replace(
            "PROFILE_AVATAR",
            &encode_double_quoted_attribute(&viewing.avatar_url).to_string(),
        )
        .replace("PROFILE_NAME", &encode_text(&viewing.full_name).to_string())
        .replace("PROFILE_HANDLE", &encode_text(&viewing.username).to_string())
        .replace("PROFILE_BIO", &bio_html(&viewing))
        .replace("PROFILE_POSTS_COUNT", &posts.len().to_string())
        .replace("PROFILE_FOLLOWERS_COUNT", &viewing.followers.to_string())
        .replace("PROFILE_FOLLOWING_COUNT", &viewing.following.to_string())
        .replace("PROFILE_ACTION", &profile_action(&viewing, is_self, following))
        .replace("PROFILE_POST_LIST", &render_post_list(posts, &user, now));
    Ok(html_response(html))
}

fn profile_action(viewing: &User, is_self: bool, following: bool) -> String {
    if is_self {
        return r#"<a class="btn" href="/profile/edit">Edit Profile</a>"#.to_string();
    }
    let label = if following { "Unfollow" } else { "Follow" };
    format!(
        r#"<form method="post" action="/users/{id}/follow"><button type="submit" class="btn follow-btn">{label}</button></form>"#,
        id = encode_double_quoted_attribute(&viewing.id),
    )
}

pub async fn search_page<B: Backend + 'static>(
    db: web::Data<B>,
    sessions: web::Data<SessionStore>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    if session::current_user(&req, &sessions).is_none() {
        return Ok(redirect("/login"));
    }

    let params = parse_query_params(&req.uri().to_string());
    let query = get_string(&params, "q", None).unwrap_or_default();
    let query = query.trim();

    let results = if query.is_empty() {
        r#"<p class="empty-note">Type a name to search for people.</p>"#.to_string()
    } else {
        match backend::fetch_all_users(db.get_ref()).await {
            Ok(users) => render_user_cards(&crate::users::search_users(&users, query)),
            Err(err) => {
                log::error!("user search failed: {err}");
                return render_error_page(&err.message);
            }
        }
    };

    let html = shell("search.html")?
        .replace(
            "SEARCH_QUERY",
            &encode_double_quoted_attribute(query).to_string(),
        )
        .replace("SEARCH_RESULTS", &results);
    Ok(html_response(html))
}

pub async fn explore_page<B: Backend + 'static>(
    db: web::Data<B>,
    sessions: web::Data<SessionStore>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let Some(user) = session::current_user(&req, &sessions) else {
        return Ok(redirect("/login"));
    };

    let users = match backend::fetch_all_users(db.get_ref()).await {
        Ok(users) => users,
        Err(err) => {
            log::error!("explore load failed: {err}");
            return render_error_page(&err.message);
        }
    };

    let trending: Vec<&User> = users
        .iter()
        .filter(|u| u.id != user.id)
        .take(TRENDING_USERS_LIMIT)
        .collect();

    let html = shell("explore.html")?.replace("TRENDING_USERS", &render_user_cards(&trending));
    Ok(html_response(html))
}

// === form pages ===

pub fn render_login_page(
    username_value: &str,
    errors: &crate::auth::LoginErrors,
) -> Result<HttpResponse, ApiError> {
    let html = shell("login.html")?
        .replace("NOTICE_SLOT", &notice_html(&errors.notice))
        .replace(
            "USERNAME_VALUE",
            &encode_double_quoted_attribute(username_value).to_string(),
        )
        .replace("USERNAME_ERROR", &field_error(&errors.username))
        .replace("PASSWORD_ERROR", &field_error(&errors.password));
    Ok(html_response(html))
}

pub fn render_register_page(
    form: &RegisterForm,
    errors: &RegisterErrors,
) -> Result<HttpResponse, ApiError> {
    let html = shell("register.html")?
        .replace("NOTICE_SLOT", &notice_html(&errors.notice))
        .replace(
            "USERNAME_VALUE",
            &encode_double_quoted_attribute(&form.username).to_string(),
        )
        .replace(
            "EMAIL_VALUE",
            &encode_double_quoted_attribute(&form.email).to_string(),
        )
        .replace("USERNAME_ERROR", &field_error(&errors.username))
        .replace("EMAIL_ERROR", &field_error(&errors.email))
        .replace("PASSWORD_ERROR", &field_error(&errors.password))
        .replace("CONFIRM_ERROR", &field_error(&errors.confirm_password));
    Ok(html_response(html))
}

pub fn render_edit_profile_page(user: &User, notice: &str) -> Result<HttpResponse, ApiError> {
    let html = shell("edit_profile.html")?
        .replace("NOTICE_SLOT", &notice_html(notice))
        .replace(
            "EDIT_FULL_NAME",
            &encode_double_quoted_attribute(&user.full_name).to_string(),
        )
        .replace(
            "EDIT_USERNAME",
            &encode_double_quoted_attribute(&user.username).to_string(),
        )
        .replace("EDIT_BIO", user.bio.as_deref().unwrap_or(""))
        .replace(
            "EDIT_AVATAR",
            &encode_double_quoted_attribute(&user.avatar_url).to_string(),
        );
    Ok(html_response(html))
}

// === error pages ===

fn render_error_page(message: &str) -> Result<HttpResponse, ApiError> {
    let html = shell("error.html")?.replace("ERROR_MESSAGE", &encode_text(message).to_string());
    Ok(HttpResponse::BadGateway()
        .content_type("text/html; charset=utf-8")
        .body(html))
}

fn render_not_found_page(message: &str) -> Result<HttpResponse, ApiError> {
    let html = shell("error.html")?.replace("ERROR_MESSAGE", &encode_text(message).to_string());
    Ok(HttpResponse::NotFound()
        .content_type("text/html; charset=utf-8")
        .body(html))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::models::PostAuthor;

    fn user(id: &str, username: &str) -> User {
        User {
            id: id.to_string(),
            username: username.to_string(),
            email: format!("{username}@example.com"),
            full_name: username.to_string(),
            avatar_url: "https://example.com/a.png".to_string(),
            bio: None,
            followers: 0,
            following: 0,
            created_at: None,
        }
    }

    fn post(id: &str, user_id: &str, username: &str) -> Post {
        Post {
            id: id.to_string(),
            user_id: user_id.to_string(),
            content: "hello".to_string(),
            created_at: Some(Utc::now()),
            author: Some(PostAuthor {
                id: user_id.to_string(),
                username: username.to_string(),
                avatar_url: String::new(),
                full_name: username.to_string(),
            }),
            like_count: 2,
            comment_count: 1,
        }
    }

    #[test]
    fn delete_control_only_on_own_posts() {
        let me = user("u1", "me");
        let now = Utc::now();

        let own = render_post(&post("p1", "u1", "me"), &me, now).unwrap();
        assert!(own.contains("/posts/p1/delete"));

        let foreign = render_post(&post("p2", "u2", "other"), &me, now).unwrap();
        assert!(!foreign.contains("/delete"));
    }

    #[test]
    fn author_names_are_escaped() {
        let me = user("u1", "me");
        let mut p = post("p1", "u2", "other");
        p.author.as_mut().unwrap().full_name = "<img onerror=x>".to_string();
        let html = render_post(&p, &me, Utc::now()).unwrap();
        assert!(!html.contains("<img onerror"));
        assert!(html.contains("&lt;img onerror=x&gt;"));
    }

    #[test]
    fn authorless_foreign_post_is_skipped() {
        let me = user("u1", "me");
        let mut p = post("p1", "u2", "other");
        p.author = None;
        assert!(render_post(&p, &me, Utc::now()).is_none());
    }

    #[test]
    fn empty_feed_renders_empty_state() {
        let me = user("u1", "me");
        let none: Vec<&Post> = Vec::new();
        let html = render_post_list(none, &me, Utc::now());
        assert!(html.contains("No posts yet"));
    }

    #[test]
    fn comment_panel_keeps_given_order() {
        let comments = vec![
            Comment {
                id: "c1".to_string(),
                post_id: "p1".to_string(),
                user_id: "u1".to_string(),
                content: "first".to_string(),
                created_at: Some(Utc::now()),
                author: None,
            },
            Comment {
                id: "c2".to_string(),
                post_id: "p1".to_string(),
                user_id: "u2".to_string(),
                content: "second".to_string(),
                created_at: Some(Utc::now()),
                author: None,
            },
        ];
        let html = render_comment_panel(&comments);
        let first = html.find("comment-c1").unwrap();
        let second = html.find("comment-c2").unwrap();
        assert!(first < second);

        assert!(render_comment_panel(&[]).contains("No comments yet"));
    }

    #[test]
    fn user_card_links_to_profile() {
        let html = render_user_card(&user("u2", "jane_doe"));
        assert!(html.contains("/profile?user=jane_doe"));
    }

    #[test]
    fn profile_action_flips_with_follow_state() {
        let other = user("u2", "other");
        assert!(profile_action(&other, false, false).contains(">Follow<"));
        assert!(profile_action(&other, false, true).contains(">Unfollow<"));
        assert!(profile_action(&other, true, false).contains("Edit Profile"));
    }
}
