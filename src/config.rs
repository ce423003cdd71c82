//! Server configuration.
//!
//! Loaded from, in increasing priority:
//! - built-in defaults
//! - `config/default.toml` and `config/local.toml` (both optional)
//! - environment variables prefixed with `KB__`, e.g. `KB__MONGODB__URI`

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub mongodb: MongoConfig,
    pub s3: S3Config,
    /// Enables demo login and seeds demo data at startup.
    pub demo_mode: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Socket address to bind, e.g. `127.0.0.1:3000`.
    pub addr: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MongoConfig {
    pub uri: String,
    pub database: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct S3Config {
    pub bucket: String,
    /// Custom endpoint for MinIO / LocalStack.
    #[serde(default)]
    pub endpoint: Option<String>,
    pub region: String,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        Self::builder()?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::with_prefix("KB")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Defaults only, without files or environment.
    pub fn defaults() -> Result<Self, ConfigError> {
        Self::builder()?.build()?.try_deserialize()
    }

    fn builder() -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        Config::builder()
            .set_default("server.addr", "127.0.0.1:3000")?
            .set_default("mongodb.uri", "mongodb://localhost:27017")?
            .set_default("mongodb.database", "deptkb")?
            .set_default("s3.bucket", "deptkb-files")?
            .set_default("s3.region", "us-east-1")?
            .set_default("demo_mode", false)
    }
}
