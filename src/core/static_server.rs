use actix_web::{web, HttpResponse};
use mime_guess::from_path;
use rust_embed::RustEmbed;

#[derive(RustEmbed)]
#[folder = "static"]
struct Assets;

pub async fn serve_static(path: web::Path<String>) -> HttpResponse {
    let file_path = path.into_inner();

    match Assets::get(&file_path) {
        Some(file) => HttpResponse::Ok()
            .content_type(from_path(&file_path).first_or_octet_stream().as_ref())
            .body(file.data.to_vec()),
        None => HttpResponse::NotFound().body("Not found"),
    }
}
