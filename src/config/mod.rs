pub mod tracing;

use figment::providers::{Env, Format, Json, Serialized};
use figment::Figment;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppCfg {
    pub listen_addr: String,
    /// Postgres URL. Without one the site runs on the in-memory store.
    pub database_url: Option<String>,
    pub db_pool_size: usize,
    pub run_migrations: bool,
}

impl Default for AppCfg {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:3000".into(),
            database_url: None,
            db_pool_size: 10,
            run_migrations: true,
        }
    }
}

impl AppCfg {
    /// Defaults, then `appsettings.json` if present, then `APP_*` variables.
    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(AppCfg::default()))
            .merge(Json::file("appsettings.json"))
            .merge(Env::prefixed("APP_"))
    }

    pub fn load() -> Result<Self, figment::Error> {
        Self::figment().extract()
    }
}
