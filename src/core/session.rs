//! Client-local session records: an opaque token in a cookie, mapped to the
//! serialized profile snapshot of the signed-in user. Read on every page
//! request to gate access, written at login and profile edit, cleared at
//! logout.

use actix_web::cookie::Cookie;
use actix_web::HttpRequest;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use crate::config::SESSION_COOKIE;
use crate::models::models::User;

#[derive(Default)]
pub struct SessionStore {
    records: Mutex<HashMap<String, String>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, user: &User) -> String {
        let token = Uuid::new_v4().to_string();
        self.write(&token, user);
        token
    }

    pub fn write(&self, token: &str, user: &User) {
        if let Ok(snapshot) = serde_json::to_string(user) {
            self.records
                .lock()
                .expect("session store lock")
                .insert(token.to_string(), snapshot);
        }
    }

    pub fn get(&self, token: &str) -> Option<User> {
        let records = self.records.lock().expect("session store lock");
        let snapshot = records.get(token)?;
        serde_json::from_str(snapshot).ok()
    }

    pub fn remove(&self, token: &str) {
        self.records
            .lock()
            .expect("session store lock")
            .remove(token);
    }
}

pub fn current_user(req: &HttpRequest, sessions: &SessionStore) -> Option<User> {
    let cookie = req.cookie(SESSION_COOKIE)?;
    sessions.get(cookie.value())
}

pub fn session_token(req: &HttpRequest) -> Option<String> {
    req.cookie(SESSION_COOKIE).map(|c| c.value().to_string())
}

pub fn session_cookie(token: &str) -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE, token.to_string())
        .path("/")
        .http_only(true)
        .finish()
}

pub fn removal_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::build(SESSION_COOKIE, "")
        .path("/")
        .http_only(true)
        .finish();
    cookie.make_removal();
    cookie
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str) -> User {
        User {
            id: id.to_string(),
            username: "tester".to_string(),
            email: "t@example.com".to_string(),
            full_name: "tester".to_string(),
            avatar_url: String::new(),
            bio: None,
            followers: 0,
            following: 0,
            created_at: None,
        }
    }

    #[test]
    fn round_trips_profile_snapshots() {
        let store = SessionStore::new();
        let token = store.create(&user("u1"));
        assert_eq!(store.get(&token).map(|u| u.id), Some("u1".to_string()));

        store.remove(&token);
        assert!(store.get(&token).is_none());
    }

    #[test]
    fn write_overwrites_existing_snapshot() {
        let store = SessionStore::new();
        let token = store.create(&user("u1"));
        let mut updated = user("u1");
        updated.full_name = "renamed".to_string();
        store.write(&token, &updated);
        assert_eq!(
            store.get(&token).map(|u| u.full_name),
            Some("renamed".to_string())
        );
    }
}
