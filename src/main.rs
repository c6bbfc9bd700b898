mod config;
mod error;
mod helpers;
mod middleware;
mod models;
mod pages;
mod routes;
mod rules;
mod schema;
mod services;

use diesel_async::pooled_connection::deadpool::Pool;
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use tracing::*;

use config::AppCfg;
use pages::Pages;
use services::{migrate, MemoryStore, PgStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    config::tracing::init();

    let cfg = AppCfg::load()?;
    let pages = Pages::load()?;

    let app = match cfg.database_url.clone() {
        Some(database_url) => {
            if cfg.run_migrations {
                migrate::run(database_url.clone()).await?;
            }

            // create a new connection pool with the configured size
            let mgr = AsyncDieselConnectionManager::<diesel_async::AsyncPgConnection>::new(
                database_url,
            );

            info!("Starting DB pool");
            let pool = Pool::builder(mgr).max_size(cfg.db_pool_size).build()?;
            routes::app(PgStore::new(pool), pages)
        }
        None => {
            warn!("no database_url configured, everything is kept in memory");
            routes::app(MemoryStore::new(), pages)
        }
    };

    let listener = tokio::net::TcpListener::bind(&cfg.listen_addr).await?;
    info!("starting listening at {}", cfg.listen_addr);
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}
