use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};

use chirp::core::remote::RemoteBackend;
use chirp::core::session::SessionStore;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let bind = chirp::config::bind_address();
    let backend = web::Data::new(RemoteBackend::from_env());
    let sessions = web::Data::new(SessionStore::new());

    log::info!(
        "serving on http://{bind}, backend at {}",
        chirp::config::backend_url()
    );

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(backend.clone())
            .app_data(sessions.clone())
            .configure(chirp::configure::<RemoteBackend>)
    })
    .bind(&bind)?
    .run()
    .await?;

    Ok(())
}
