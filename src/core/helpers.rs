use actix_web::http::header;
use actix_web::HttpResponse;
use ammonia::Builder;
use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;

pub fn now_iso() -> String {
    chrono::Utc::now().to_rfc3339()
}

pub fn redirect(location: &str) -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header((header::LOCATION, location))
        .finish()
}

/// Strip all HTML from user text at input time; the result is safe to embed
/// in rendered markup without further escaping.
pub fn sanitize_text(text: &str) -> String {
    Builder::default()
        .tags(std::collections::HashSet::new())
        .clean(text)
        .to_string()
}

const AVATAR_COLORS: [&str; 5] = ["3b82f6", "22c55e", "f59e0b", "ec4899", "8b5cf6"];

/// Placeholder avatar with a random color pair and the user's initials.
pub fn placeholder_avatar(username: &str) -> String {
    let mut rng = rand::thread_rng();
    let bg = AVATAR_COLORS.choose(&mut rng).unwrap_or(&AVATAR_COLORS[0]);
    let fg = AVATAR_COLORS.choose(&mut rng).unwrap_or(&AVATAR_COLORS[1]);
    let initials: String = username.chars().take(2).collect::<String>().to_uppercase();
    format!(
        "https://via.placeholder.com/100/{bg}/{fg}?text={}",
        urlencoding::encode(&initials)
    )
}

/// Relative timestamp for post and comment headers. `now` is passed in so
/// the buckets are testable.
pub fn time_ago(timestamp: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(ts) = timestamp else {
        return "unknown".to_string();
    };

    let delta = now.signed_duration_since(ts);
    if delta.num_milliseconds() < 0 {
        return "just now".to_string();
    }

    let secs = delta.num_seconds();
    let mins = delta.num_minutes();
    let hours = delta.num_hours();
    let days = delta.num_days();

    if secs < 30 {
        "just now".to_string()
    } else if mins < 1 {
        format!("{secs}s ago")
    } else if mins < 60 {
        format!("{mins}m ago")
    } else if hours < 24 {
        format!("{hours}h ago")
    } else if days < 7 {
        format!("{days}d ago")
    } else {
        ts.format("%-d %b %Y").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn time_ago_buckets() {
        let now = Utc::now();
        assert_eq!(time_ago(None, now), "unknown");
        assert_eq!(time_ago(Some(now), now), "just now");
        assert_eq!(time_ago(Some(now + Duration::seconds(10)), now), "just now");
        assert_eq!(time_ago(Some(now - Duration::seconds(45)), now), "45s ago");
        assert_eq!(time_ago(Some(now - Duration::minutes(5)), now), "5m ago");
        assert_eq!(time_ago(Some(now - Duration::hours(3)), now), "3h ago");
        assert_eq!(time_ago(Some(now - Duration::days(2)), now), "2d ago");
        assert!(time_ago(Some(now - Duration::days(30)), now).contains("20"));
    }

    #[test]
    fn sanitize_strips_markup() {
        assert_eq!(sanitize_text("hello <script>alert(1)</script>"), "hello ");
        assert_eq!(sanitize_text("<b>bold</b> move"), "bold move");
    }

    #[test]
    fn placeholder_avatar_uses_initials() {
        let url = placeholder_avatar("alice_1");
        assert!(url.contains("text=AL"), "unexpected avatar url: {url}");
    }
}
