use std::env;

// Tables owned by the hosted backend.
pub const USERS_TABLE: &str = "users";
pub const POSTS_TABLE: &str = "posts";
pub const LIKES_TABLE: &str = "likes";
pub const COMMENTS_TABLE: &str = "comments";
pub const FOLLOWS_TABLE: &str = "follows";

pub const MAX_POST_LENGTH: usize = 500;
pub const MAX_BIO_LENGTH: usize = 500;
pub const MIN_USERNAME_LENGTH: usize = 3;
pub const MIN_PASSWORD_LENGTH: usize = 6;
pub const SUGGESTED_USERS_LIMIT: usize = 5;
pub const TRENDING_USERS_LIMIT: usize = 10;

pub const SESSION_COOKIE: &str = "chirp_session";

pub fn backend_url() -> String {
    env::var("CHIRP_BACKEND_URL").unwrap_or_else(|_| "http://127.0.0.1:54321".to_string())
}

pub fn backend_anon_key() -> String {
    env::var("CHIRP_BACKEND_ANON_KEY").unwrap_or_default()
}

pub fn bind_address() -> String {
    env::var("CHIRP_BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".to_string())
}
