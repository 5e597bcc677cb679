//! Access layer for the hosted backend: the row-store and auth contracts,
//! plus one typed wrapper per entity operation. Every wrapper call is a
//! single network round trip; errors carry the backend's message verbatim
//! and are never retried here.

use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::fmt;

use crate::config::{COMMENTS_TABLE, FOLLOWS_TABLE, LIKES_TABLE, POSTS_TABLE, USERS_TABLE};
use crate::core::helpers::now_iso;
use crate::models::models::{AuthUser, Comment, Post, ProfileUpdate, User};

#[derive(Debug, Clone)]
pub struct DbError {
    pub message: String,
}

impl DbError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

impl fmt::Display for DbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for DbError {}

pub type DbResult<T> = Result<T, DbError>;

/// Equality filter on a single column, the only predicate the client uses.
#[derive(Debug, Clone)]
pub struct Filter {
    pub column: &'static str,
    pub value: String,
}

impl Filter {
    pub fn eq(column: &'static str, value: impl Into<String>) -> Self {
        Self { column, value: value.into() }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Order {
    Asc(&'static str),
    Desc(&'static str),
}

/// Row-oriented store behind the hosted backend's REST surface.
#[allow(async_fn_in_trait)]
pub trait RowStore {
    async fn select(
        &self,
        table: &str,
        columns: &str,
        filters: &[Filter],
        order: Option<Order>,
    ) -> DbResult<Vec<Value>>;

    async fn count(&self, table: &str, filters: &[Filter]) -> DbResult<u64>;

    async fn insert(&self, table: &str, row: Value) -> DbResult<()>;

    async fn update(&self, table: &str, fields: Value, filters: &[Filter]) -> DbResult<()>;

    async fn delete(&self, table: &str, filters: &[Filter]) -> DbResult<()>;
}

/// The backend's separate authentication subsystem.
#[allow(async_fn_in_trait)]
pub trait AuthApi {
    async fn sign_up(&self, email: &str, password: &str) -> DbResult<AuthUser>;

    async fn sign_in_with_password(&self, email: &str, password: &str) -> DbResult<AuthUser>;

    async fn sign_out(&self) -> DbResult<()>;
}

pub trait Backend: RowStore + AuthApi {}

impl<T: RowStore + AuthApi> Backend for T {}

/// Columns for the embedded author join on posts and comments.
pub const AUTHOR_EMBED: &str = "*, users(id, username, avatar_url, full_name)";

fn decode<T: DeserializeOwned>(rows: Vec<Value>) -> DbResult<Vec<T>> {
    serde_json::from_value(Value::Array(rows))
        .map_err(|err| DbError::new(format!("unexpected row shape: {err}")))
}

// === users ===

pub async fn fetch_all_users<B: RowStore>(db: &B) -> DbResult<Vec<User>> {
    decode(db.select(USERS_TABLE, "*", &[], None).await?)
}

pub async fn lookup_email_by_username<B: RowStore>(
    db: &B,
    username: &str,
) -> DbResult<Option<String>> {
    let rows = db
        .select(USERS_TABLE, "email", &[Filter::eq("username", username)], None)
        .await?;
    Ok(rows
        .into_iter()
        .next()
        .and_then(|row| row.get("email").and_then(Value::as_str).map(str::to_string)))
}

pub async fn find_user_by_username<B: RowStore>(db: &B, username: &str) -> DbResult<Option<User>> {
    let rows = db
        .select(USERS_TABLE, "*", &[Filter::eq("username", username)], None)
        .await?;
    Ok(decode::<User>(rows)?.into_iter().next())
}

pub async fn fetch_user_by_id<B: RowStore>(db: &B, user_id: &str) -> DbResult<Option<User>> {
    let rows = db
        .select(USERS_TABLE, "*", &[Filter::eq("id", user_id)], None)
        .await?;
    Ok(decode::<User>(rows)?.into_iter().next())
}

pub async fn insert_profile<B: RowStore>(db: &B, profile: &User) -> DbResult<()> {
    let row = serde_json::to_value(profile).map_err(|err| DbError::new(err.to_string()))?;
    db.insert(USERS_TABLE, row).await
}

pub async fn update_profile<B: RowStore>(
    db: &B,
    user_id: &str,
    updates: &ProfileUpdate,
) -> DbResult<()> {
    let fields = serde_json::to_value(updates).map_err(|err| DbError::new(err.to_string()))?;
    db.update(USERS_TABLE, fields, &[Filter::eq("id", user_id)]).await
}

// === posts ===

pub async fn fetch_posts<B: RowStore>(db: &B) -> DbResult<Vec<Post>> {
    decode(
        db.select(POSTS_TABLE, AUTHOR_EMBED, &[], Some(Order::Desc("created_at")))
            .await?,
    )
}

pub async fn insert_post<B: RowStore>(db: &B, user_id: &str, content: &str) -> DbResult<()> {
    db.insert(
        POSTS_TABLE,
        json!({ "user_id": user_id, "content": content, "created_at": now_iso() }),
    )
    .await
}

pub async fn delete_post<B: RowStore>(db: &B, post_id: &str) -> DbResult<()> {
    db.delete(POSTS_TABLE, &[Filter::eq("id", post_id)]).await
}

// === likes ===

pub async fn like_count<B: RowStore>(db: &B, post_id: &str) -> DbResult<u64> {
    db.count(LIKES_TABLE, &[Filter::eq("post_id", post_id)]).await
}

pub async fn find_like<B: RowStore>(db: &B, post_id: &str, user_id: &str) -> DbResult<bool> {
    let rows = db
        .select(
            LIKES_TABLE,
            "id",
            &[Filter::eq("post_id", post_id), Filter::eq("user_id", user_id)],
            None,
        )
        .await?;
    Ok(!rows.is_empty())
}

pub async fn insert_like<B: RowStore>(db: &B, post_id: &str, user_id: &str) -> DbResult<()> {
    db.insert(LIKES_TABLE, json!({ "post_id": post_id, "user_id": user_id }))
        .await
}

pub async fn delete_like<B: RowStore>(db: &B, post_id: &str, user_id: &str) -> DbResult<()> {
    db.delete(
        LIKES_TABLE,
        &[Filter::eq("post_id", post_id), Filter::eq("user_id", user_id)],
    )
    .await
}

// === comments ===

pub async fn comment_count<B: RowStore>(db: &B, post_id: &str) -> DbResult<u64> {
    db.count(COMMENTS_TABLE, &[Filter::eq("post_id", post_id)]).await
}

pub async fn fetch_comments<B: RowStore>(db: &B, post_id: &str) -> DbResult<Vec<Comment>> {
    decode(
        db.select(
            COMMENTS_TABLE,
            AUTHOR_EMBED,
            &[Filter::eq("post_id", post_id)],
            Some(Order::Asc("created_at")),
        )
        .await?,
    )
}

pub async fn insert_comment<B: RowStore>(
    db: &B,
    post_id: &str,
    user_id: &str,
    content: &str,
) -> DbResult<()> {
    db.insert(
        COMMENTS_TABLE,
        json!({
            "post_id": post_id,
            "user_id": user_id,
            "content": content,
            "created_at": now_iso(),
        }),
    )
    .await
}

// === follows ===

pub async fn is_following<B: RowStore>(
    db: &B,
    follower_id: &str,
    following_id: &str,
) -> DbResult<bool> {
    let rows = db
        .select(
            FOLLOWS_TABLE,
            "id",
            &[
                Filter::eq("follower_id", follower_id),
                Filter::eq("following_id", following_id),
            ],
            None,
        )
        .await?;
    Ok(!rows.is_empty())
}

pub async fn insert_follow<B: RowStore>(
    db: &B,
    follower_id: &str,
    following_id: &str,
) -> DbResult<()> {
    db.insert(
        FOLLOWS_TABLE,
        json!({ "follower_id": follower_id, "following_id": following_id }),
    )
    .await
}

pub async fn delete_follow<B: RowStore>(
    db: &B,
    follower_id: &str,
    following_id: &str,
) -> DbResult<()> {
    db.delete(
        FOLLOWS_TABLE,
        &[
            Filter::eq("follower_id", follower_id),
            Filter::eq("following_id", following_id),
        ],
    )
    .await
}
