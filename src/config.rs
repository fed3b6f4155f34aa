// ⚙️ Server configuration - flags with environment fallbacks

use crate::auth::password::{MAX_BCRYPT_COST, MIN_BCRYPT_COST};
use crate::logging::LogFormat;
use clap::Parser;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("session secret must be provided (--session-secret or CARVAULT_SESSION_SECRET)")]
    MissingSessionSecret,

    #[error("bcrypt cost {0} is outside 4..=31")]
    InvalidBcryptCost(u32),
}

/// CarVault web server
#[derive(Clone, Parser)]
#[command(name = "carvault-server", version, about)]
pub struct ServerArgs {
    /// HTTP listen address
    #[arg(long, env = "CARVAULT_ADDR", default_value = "0.0.0.0:8080")]
    pub addr: String,

    /// SQLite database path
    #[arg(long = "db", env = "CARVAULT_DB", default_value = "./data/carvault.db")]
    pub database: PathBuf,

    /// Secret used to sign session tokens
    #[arg(long, env = "CARVAULT_SESSION_SECRET", hide_env_values = true)]
    pub session_secret: Option<String>,

    /// Mark the session cookie Secure (serve over HTTPS)
    #[arg(long, env = "CARVAULT_SECURE_COOKIES")]
    pub secure_cookies: bool,

    /// bcrypt cost for hashing and for the placeholder hash
    #[arg(long, env = "CARVAULT_BCRYPT_COST", default_value_t = bcrypt::DEFAULT_COST)]
    pub bcrypt_cost: u32,

    /// Log filter (e.g. info, carvault=debug)
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,

    /// Log output format
    #[arg(long, env = "CARVAULT_LOG_FORMAT", value_enum, default_value_t = LogFormat::Json)]
    pub log_format: LogFormat,
}

/// Validated server settings
#[derive(Clone)]
pub struct ServerConfig {
    pub addr: String,
    pub database: PathBuf,
    pub session_secret: String,
    pub secure_cookies: bool,
    pub bcrypt_cost: u32,
    pub log_level: String,
    pub log_format: LogFormat,
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("addr", &self.addr)
            .field("database", &self.database)
            .field("session_secret", &"<redacted>")
            .field("secure_cookies", &self.secure_cookies)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .field("log_level", &self.log_level)
            .field("log_format", &self.log_format)
            .finish()
    }
}

impl ServerConfig {
    pub fn from_args(args: ServerArgs) -> Result<Self, ConfigError> {
        let session_secret = args
            .session_secret
            .filter(|s| !s.trim().is_empty())
            .ok_or(ConfigError::MissingSessionSecret)?;

        if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&args.bcrypt_cost) {
            return Err(ConfigError::InvalidBcryptCost(args.bcrypt_cost));
        }

        Ok(ServerConfig {
            addr: args.addr,
            database: args.database,
            session_secret,
            secure_cookies: args.secure_cookies,
            bcrypt_cost: args.bcrypt_cost,
            log_level: args.log_level,
            log_format: args.log_format,
        })
    }
}
