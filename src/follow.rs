//! Follow toggle: presence of a `follows` row is the whole relationship.
//! The denormalized follower counters on user rows are left alone; the
//! profile re-render after the redirect reads whatever the backend holds.

use actix_web::{web, HttpRequest, HttpResponse};

use crate::core::backend::{self, Backend};
use crate::core::errors::ApiError;
use crate::core::helpers::redirect;
use crate::core::session::{self, SessionStore};

pub async fn toggle_follow<B: Backend + 'static>(
    db: web::Data<B>,
    sessions: web::Data<SessionStore>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let Some(user) = session::current_user(&req, &sessions) else {
        return Ok(redirect("/login"));
    };
    let target_id = path.into_inner();

    if target_id.is_empty() || target_id == user.id {
        return Err(ApiError::BadRequest("Invalid target user".to_string()));
    }

    // Verify target user exists
    let Some(target) = backend::fetch_user_by_id(db.get_ref(), &target_id).await? else {
        return Err(ApiError::NotFound("Target user not found".to_string()));
    };

    let following = backend::is_following(db.get_ref(), &user.id, &target_id).await?;
    if following {
        backend::delete_follow(db.get_ref(), &user.id, &target_id).await?;
    } else {
        backend::insert_follow(db.get_ref(), &user.id, &target_id).await?;
    }

    Ok(redirect(&format!(
        "/profile?user={}",
        urlencoding::encode(&target.username)
    )))
}
