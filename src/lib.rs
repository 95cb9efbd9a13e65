pub mod config;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod notify;
pub mod store;
pub mod utils;

use actix_web::web;

/// Registers the webhook route and the JSON fallbacks for other methods and paths.
pub fn configure(cfg: &mut web::ServiceConfig, webhook_path: &str) {
    cfg.service(
        web::resource(webhook_path)
            .route(web::post().to(handlers::webhook::handle_upload))
            .default_service(web::to(handlers::webhook::method_not_allowed)),
    )
    .default_service(web::to(handlers::webhook::not_found));
}
