use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};
use dotenv::dotenv;
use log::{error, info, warn};
use std::io;
use std::sync::Arc;

use upload_webhook::config::{Config, StoreBackend};
use upload_webhook::db;
use upload_webhook::notify::{LogNotifier, Notifier, SmtpNotifier};
use upload_webhook::store::{MemoryTableStore, PgTableStore, TableStore};

fn startup_error<E>(context: &str, err: E) -> io::Error
where
    E: Into<Box<dyn std::error::Error + Send + Sync>> + std::fmt::Display,
{
    error!("{}: {}", context, err);
    io::Error::new(io::ErrorKind::Other, err)
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_env().map_err(|err| startup_error("Invalid configuration", err))?;

    let store: Arc<dyn TableStore> = match &config.store {
        StoreBackend::Postgres { database_url } => {
            let pool = db::create_pool(database_url)
                .await
                .map_err(|err| startup_error("Failed to connect to the database", err))?;
            Arc::new(PgTableStore::new(pool, config.sheet_id.clone()))
        }
        StoreBackend::Memory => {
            warn!("Using the in-memory table store; rows are lost on exit");
            Arc::new(MemoryTableStore::new())
        }
    };

    let notifier: Arc<dyn Notifier> = match &config.smtp {
        Some(smtp) => Arc::new(
            SmtpNotifier::from_config(smtp).map_err(|err| startup_error("Failed to set up SMTP", err))?,
        ),
        None => {
            warn!("SMTP_HOST not set; notifications will only be logged");
            Arc::new(LogNotifier)
        }
    };

    let bind_addr = config.bind_addr.clone();
    info!(
        "Starting upload webhook at {}{} (tab '{}.{}')",
        bind_addr, config.webhook_path, config.sheet_id, config.sheet_tab
    );

    let config = web::Data::new(config);
    let store: web::Data<dyn TableStore> = web::Data::from(store);
    let notifier: web::Data<dyn Notifier> = web::Data::from(notifier);

    HttpServer::new(move || {
        let webhook_path = config.webhook_path.clone();
        App::new()
            .wrap(Logger::default())
            .app_data(config.clone())
            .app_data(store.clone())
            .app_data(notifier.clone())
            .configure(|cfg| upload_webhook::configure(cfg, &webhook_path))
    })
    .bind(bind_addr)?
    .run()
    .await
}
