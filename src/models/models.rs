use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct User {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub avatar_url: String,
    #[serde(default)]
    pub bio: Option<String>,
    // Denormalized counters owned by the backend; never written by the
    // follow/unfollow flow, so they may lag the follows table.
    #[serde(default)]
    pub followers: i64,
    #[serde(default)]
    pub following: i64,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Author fields embedded by the `users(...)` join on posts and comments.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct PostAuthor {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub avatar_url: String,
    #[serde(default)]
    pub full_name: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Post {
    pub id: String,
    pub user_id: String,
    pub content: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "users", default)]
    pub author: Option<PostAuthor>,
    // Computed from the likes/comments tables on every load, never persisted.
    #[serde(default)]
    pub like_count: u64,
    #[serde(default)]
    pub comment_count: u64,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Comment {
    pub id: String,
    pub post_id: String,
    pub user_id: String,
    pub content: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "users", default)]
    pub author: Option<PostAuthor>,
}

/// Identity record returned by the auth subsystem.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: String,
}

/// Fields a user may change from the profile edit form.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ProfileUpdate {
    pub full_name: String,
    pub username: String,
    pub bio: String,
    pub avatar_url: String,
}
