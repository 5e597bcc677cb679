//! Load-and-aggregate cycle for the feed: all users and all posts fetched
//! concurrently, then two count queries per post fanned out against the
//! likes and comments tables. The result is held in [`FeedData`], a
//! normalized store keyed by id and mutated only through its update
//! functions.

use futures::future::join_all;
use std::collections::HashMap;

use crate::core::backend::{self, DbResult, RowStore};
use crate::models::models::{Post, User};

#[derive(Debug)]
pub struct FeedData {
    users: HashMap<String, User>,
    user_order: Vec<String>,
    posts: HashMap<String, Post>,
    post_order: Vec<String>,
}

impl FeedData {
    pub fn new(users: Vec<User>, posts: Vec<Post>) -> Self {
        let user_order = users.iter().map(|u| u.id.clone()).collect();
        let post_order = posts.iter().map(|p| p.id.clone()).collect();
        Self {
            users: users.into_iter().map(|u| (u.id.clone(), u)).collect(),
            user_order,
            posts: posts.into_iter().map(|p| (p.id.clone(), p)).collect(),
            post_order,
        }
    }

    /// Posts in the order the backend returned them (newest first); the
    /// client never re-sorts.
    pub fn feed(&self) -> impl Iterator<Item = &Post> {
        self.post_order.iter().filter_map(|id| self.posts.get(id))
    }

    pub fn post_ids(&self) -> Vec<String> {
        self.post_order.clone()
    }

    pub fn find_user_by_username(&self, username: &str) -> Option<&User> {
        self.user_order
            .iter()
            .filter_map(|id| self.users.get(id))
            .find(|u| u.username == username)
    }

    pub fn set_like_count(&mut self, post_id: &str, count: u64) {
        if let Some(post) = self.posts.get_mut(post_id) {
            post.like_count = count;
        }
    }

    pub fn set_comment_count(&mut self, post_id: &str, count: u64) {
        if let Some(post) = self.posts.get_mut(post_id) {
            post.comment_count = count;
        }
    }

    pub fn remove_post(&mut self, post_id: &str) {
        self.posts.remove(post_id);
        self.post_order.retain(|id| id != post_id);
    }

    pub fn posts_by(&self, user_id: &str) -> Vec<&Post> {
        self.feed().filter(|p| p.user_id == user_id).collect()
    }

    /// Everyone except the given user, in load order.
    pub fn others(&self, user_id: &str, limit: usize) -> Vec<&User> {
        self.user_order
            .iter()
            .filter_map(|id| self.users.get(id))
            .filter(|u| u.id != user_id)
            .take(limit)
            .collect()
    }
}

/// Two concurrent queries for the base data, then a count fan-out. Either
/// base query failing aborts the whole load; nothing partial is rendered.
/// Total round trips: 2 + 2 x posts.
pub async fn load_feed_data<B: RowStore>(db: &B) -> DbResult<FeedData> {
    let (users, posts) = tokio::try_join!(backend::fetch_all_users(db), backend::fetch_posts(db))?;

    let mut data = FeedData::new(users, posts);
    let ids = data.post_ids();
    let counts = join_all(ids.iter().map(|id| post_counts(db, id))).await;
    for (id, (likes, comments)) in ids.iter().zip(counts) {
        data.set_like_count(id, likes);
        data.set_comment_count(id, comments);
    }
    Ok(data)
}

// A failed count renders as zero for that post rather than failing the
// page; only the two base queries are load-fatal.
async fn post_counts<B: RowStore>(db: &B, post_id: &str) -> (u64, u64) {
    let likes = backend::like_count(db, post_id).await.unwrap_or(0);
    let comments = backend::comment_count(db, post_id).await.unwrap_or(0);
    (likes, comments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::backend::{DbError, Filter, Order};
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingStore {
        calls: AtomicUsize,
        fail_users: bool,
        fail_counts: bool,
    }

    impl CountingStore {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_users: false,
                fail_counts: false,
            }
        }

        fn post(id: &str, stamp: &str) -> Value {
            json!({
                "id": id,
                "user_id": "u1",
                "content": format!("post {id}"),
                "created_at": stamp,
                "users": {"id": "u1", "username": "ada", "avatar_url": "", "full_name": "Ada"},
            })
        }
    }

    impl RowStore for CountingStore {
        async fn select(
            &self,
            table: &str,
            _columns: &str,
            _filters: &[Filter],
            _order: Option<Order>,
        ) -> crate::core::backend::DbResult<Vec<Value>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match table {
                "users" => {
                    if self.fail_users {
                        return Err(DbError::new("users table unavailable"));
                    }
                    Ok(vec![json!({
                        "id": "u1",
                        "username": "ada",
                        "email": "ada@example.com",
                        "full_name": "Ada",
                        "avatar_url": "",
                        "bio": "hi",
                        "followers": 0,
                        "following": 0,
                        "created_at": "2026-01-01T00:00:00Z",
                    })])
                }
                "posts" => Ok(vec![
                    Self::post("p3", "2026-01-03T00:00:00Z"),
                    Self::post("p2", "2026-01-02T00:00:00Z"),
                    Self::post("p1", "2026-01-01T00:00:00Z"),
                ]),
                other => panic!("unexpected select on {other}"),
            }
        }

        async fn count(
            &self,
            _table: &str,
            _filters: &[Filter],
        ) -> crate::core::backend::DbResult<u64> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_counts {
                return Err(DbError::new("count unavailable"));
            }
            Ok(7)
        }

        async fn insert(&self, _table: &str, _row: Value) -> crate::core::backend::DbResult<()> {
            unreachable!("load never inserts")
        }

        async fn update(
            &self,
            _table: &str,
            _fields: Value,
            _filters: &[Filter],
        ) -> crate::core::backend::DbResult<()> {
            unreachable!("load never updates")
        }

        async fn delete(
            &self,
            _table: &str,
            _filters: &[Filter],
        ) -> crate::core::backend::DbResult<()> {
            unreachable!("load never deletes")
        }
    }

    #[tokio::test]
    async fn load_costs_two_plus_two_per_post() {
        let store = CountingStore::new();
        let data = load_feed_data(&store).await.unwrap();
        let posts = data.feed().count();
        assert_eq!(posts, 3);
        assert_eq!(store.calls.load(Ordering::SeqCst), 2 + 2 * posts);
    }

    #[tokio::test]
    async fn feed_preserves_backend_order() {
        let store = CountingStore::new();
        let data = load_feed_data(&store).await.unwrap();
        let ids: Vec<&str> = data.feed().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["p3", "p2", "p1"]);
    }

    #[tokio::test]
    async fn base_query_failure_aborts_load() {
        let store = CountingStore {
            fail_users: true,
            ..CountingStore::new()
        };
        let err = load_feed_data(&store).await.unwrap_err();
        assert_eq!(err.message, "users table unavailable");
    }

    #[tokio::test]
    async fn failed_counts_degrade_to_zero() {
        let store = CountingStore {
            fail_counts: true,
            ..CountingStore::new()
        };
        let data = load_feed_data(&store).await.unwrap();
        assert!(data.feed().all(|p| p.like_count == 0 && p.comment_count == 0));
    }

    #[tokio::test]
    async fn counts_attach_to_posts() {
        let store = CountingStore::new();
        let data = load_feed_data(&store).await.unwrap();
        assert!(data.feed().all(|p| p.like_count == 7 && p.comment_count == 7));
    }

    #[test]
    fn remove_post_drops_id_from_order() {
        let mut data = FeedData::new(vec![], vec![]);
        data.remove_post("missing");
        assert_eq!(data.feed().count(), 0);
    }
}
