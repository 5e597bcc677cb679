pub mod auth;
pub mod config;
pub mod core;
pub mod feed;
pub mod follow;
pub mod models;
pub mod posts;
pub mod templates;
pub mod users;

use actix_web::web;

use crate::core::backend::Backend;

/// Route table, generic over the backend so tests can swap in a fake.
pub fn configure<B: Backend + 'static>(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(templates::feed_page::<B>))
        .route("/login", web::get().to(auth::login_page))
        .route("/login", web::post().to(auth::login_user::<B>))
        .route("/logout", web::post().to(auth::logout_user::<B>))
        .route("/register", web::get().to(users::register_page))
        .route("/register", web::post().to(users::create_user::<B>))
        .route("/profile", web::get().to(templates::profile_page::<B>))
        .route("/profile/edit", web::get().to(users::edit_profile_page))
        .route("/profile/edit", web::post().to(users::update_profile::<B>))
        .route("/search", web::get().to(templates::search_page::<B>))
        .route("/explore", web::get().to(templates::explore_page::<B>))
        .route("/posts", web::post().to(posts::create_post::<B>))
        .route("/posts/{id}/delete", web::post().to(posts::delete_post::<B>))
        .route("/posts/{id}/like", web::post().to(posts::toggle_like::<B>))
        .route("/posts/{id}/comments", web::get().to(posts::list_comments::<B>))
        .route("/posts/{id}/comments", web::post().to(posts::add_comment::<B>))
        .route("/users/{id}/follow", web::post().to(follow::toggle_follow::<B>))
        .route("/static/{path:.*}", web::get().to(core::static_server::serve_static));
}
