//! HTTP implementation of the backend contracts against the hosted
//! service: `/rest/v1/{table}` for rows, `/auth/v1/*` for identities.

use reqwest::Method;
use serde_json::{json, Value};

use crate::config;
use crate::core::backend::{AuthApi, DbError, DbResult, Filter, Order, RowStore};
use crate::models::models::AuthUser;

pub struct RemoteBackend {
    base_url: String,
    anon_key: String,
    client: reqwest::Client,
}

impl RemoteBackend {
    pub fn from_env() -> Self {
        Self::new(config::backend_url(), config::backend_anon_key())
    }

    pub fn new(base_url: String, anon_key: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key,
            client: reqwest::Client::new(),
        }
    }

    fn rest_url(
        &self,
        table: &str,
        columns: Option<&str>,
        filters: &[Filter],
        order: Option<Order>,
    ) -> String {
        let mut url = format!("{}/rest/v1/{}", self.base_url, table);
        let query = rest_query(columns, filters, order);
        if !query.is_empty() {
            url.push('?');
            url.push_str(&query);
        }
        url
    }

    fn request(&self, method: Method, url: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {}", self.anon_key))
    }
}

fn net_err(err: reqwest::Error) -> DbError {
    DbError::new(err.to_string())
}

async fn check(resp: reqwest::Response) -> DbResult<reqwest::Response> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    Err(DbError::new(backend_message(&body, status)))
}

/// Build the query string for a row request: selected columns, equality
/// filters, then ordering.
fn rest_query(columns: Option<&str>, filters: &[Filter], order: Option<Order>) -> String {
    let mut parts = Vec::new();
    if let Some(columns) = columns {
        parts.push(format!("select={}", urlencoding::encode(columns)));
    }
    for filter in filters {
        parts.push(format!(
            "{}=eq.{}",
            filter.column,
            urlencoding::encode(&filter.value)
        ));
    }
    match order {
        Some(Order::Asc(column)) => parts.push(format!("order={column}.asc")),
        Some(Order::Desc(column)) => parts.push(format!("order={column}.desc")),
        None => {}
    }
    parts.join("&")
}

/// Pull the human-readable message out of a backend error body. The rest
/// and auth subsystems use different keys, so the first match wins.
fn backend_message(body: &str, status: u16) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        for key in ["message", "msg", "error_description", "error"] {
            if let Some(message) = value.get(key).and_then(Value::as_str) {
                return message.to_string();
            }
        }
    }
    if body.trim().is_empty() {
        format!("backend returned status {status}")
    } else {
        body.trim().to_string()
    }
}

/// Total from a `Content-Range` header such as `0-24/57` or `*/0`.
fn content_range_total(header: Option<&str>) -> Option<u64> {
    header?.rsplit('/').next()?.trim().parse().ok()
}

impl RowStore for RemoteBackend {
    async fn select(
        &self,
        table: &str,
        columns: &str,
        filters: &[Filter],
        order: Option<Order>,
    ) -> DbResult<Vec<Value>> {
        let url = self.rest_url(table, Some(columns), filters, order);
        let resp = self.request(Method::GET, &url).send().await.map_err(net_err)?;
        let resp = check(resp).await?;
        resp.json().await.map_err(net_err)
    }

    async fn count(&self, table: &str, filters: &[Filter]) -> DbResult<u64> {
        let url = self.rest_url(table, Some("*"), filters, None);
        let resp = self
            .request(Method::HEAD, &url)
            .header("Prefer", "count=exact")
            .send()
            .await
            .map_err(net_err)?;
        let resp = check(resp).await?;
        let total = resp
            .headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| content_range_total(Some(v)));
        Ok(total.unwrap_or(0))
    }

    async fn insert(&self, table: &str, row: Value) -> DbResult<()> {
        let url = self.rest_url(table, None, &[], None);
        let resp = self
            .request(Method::POST, &url)
            .header("Prefer", "return=minimal")
            .json(&row)
            .send()
            .await
            .map_err(net_err)?;
        check(resp).await?;
        Ok(())
    }

    async fn update(&self, table: &str, fields: Value, filters: &[Filter]) -> DbResult<()> {
        let url = self.rest_url(table, None, filters, None);
        let resp = self
            .request(Method::PATCH, &url)
            .header("Prefer", "return=minimal")
            .json(&fields)
            .send()
            .await
            .map_err(net_err)?;
        check(resp).await?;
        Ok(())
    }

    async fn delete(&self, table: &str, filters: &[Filter]) -> DbResult<()> {
        let url = self.rest_url(table, None, filters, None);
        let resp = self
            .request(Method::DELETE, &url)
            .send()
            .await
            .map_err(net_err)?;
        check(resp).await?;
        Ok(())
    }
}

fn auth_user_from(value: Value) -> DbResult<AuthUser> {
    // Sign-in nests the identity under "user"; sign-up may return it bare.
    let user = value.get("user").cloned().unwrap_or(value);
    serde_json::from_value(user).map_err(|err| DbError::new(format!("unexpected auth payload: {err}")))
}

impl AuthApi for RemoteBackend {
    async fn sign_up(&self, email: &str, password: &str) -> DbResult<AuthUser> {
        let url = format!("{}/auth/v1/signup", self.base_url);
        let resp = self
            .request(Method::POST, &url)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(net_err)?;
        let resp = check(resp).await?;
        auth_user_from(resp.json().await.map_err(net_err)?)
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> DbResult<AuthUser> {
        let url = format!("{}/auth/v1/token?grant_type=password", self.base_url);
        let resp = self
            .request(Method::POST, &url)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(net_err)?;
        let resp = check(resp).await?;
        auth_user_from(resp.json().await.map_err(net_err)?)
    }

    async fn sign_out(&self) -> DbResult<()> {
        let url = format!("{}/auth/v1/logout", self.base_url);
        let resp = self
            .request(Method::POST, &url)
            .send()
            .await
            .map_err(net_err)?;
        check(resp).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_string_covers_columns_filters_and_order() {
        let filters = [Filter::eq("post_id", "p1"), Filter::eq("user_id", "u 1")];
        let query = rest_query(Some("id"), &filters, Some(Order::Asc("created_at")));
        assert_eq!(
            query,
            "select=id&post_id=eq.p1&user_id=eq.u%201&order=created_at.asc"
        );
    }

    #[test]
    fn query_string_empty_without_parts() {
        assert_eq!(rest_query(None, &[], None), "");
    }

    #[test]
    fn embedded_join_select_is_encoded() {
        let query = rest_query(Some("*, users(id, username)"), &[], None);
        assert!(query.starts_with("select=%2A%2C%20users%28id%2C%20username%29"));
    }

    #[test]
    fn error_message_extraction_prefers_known_keys() {
        assert_eq!(
            backend_message(r#"{"message":"duplicate key value"}"#, 409),
            "duplicate key value"
        );
        assert_eq!(
            backend_message(r#"{"error_description":"Invalid login credentials"}"#, 400),
            "Invalid login credentials"
        );
        assert_eq!(backend_message("", 503), "backend returned status 503");
        assert_eq!(backend_message("plain failure", 500), "plain failure");
    }

    #[test]
    fn content_range_totals() {
        assert_eq!(content_range_total(Some("0-24/57")), Some(57));
        assert_eq!(content_range_total(Some("*/0")), Some(0));
        assert_eq!(content_range_total(Some("garbage")), None);
        assert_eq!(content_range_total(None), None);
    }
}
