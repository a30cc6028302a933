use std::fmt;
use std::net::{IpAddr, SocketAddr};

use binge_core::providers::tmdb::TMDB_API_BASE;
use clap::Args as ClapArgs;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("TMDB access token is required (set TMDB_ACCESS_TOKEN)")]
    MissingTmdbToken,

    #[error("invalid server host '{0}'")]
    InvalidHost(String),

    #[error("DB_MAX_CONNECTIONS must be at least 1")]
    InvalidPoolSize,
}

/// Flags shared by `serve` and `db migrate`, each with an environment
/// fallback.
#[derive(ClapArgs, Clone)]
pub struct ServeArgs {
    /// Server host
    #[arg(long, env = "SERVER_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Server port
    #[arg(short, long, env = "SERVER_PORT", default_value_t = 8080)]
    pub port: u16,

    /// PostgreSQL connection string
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: String,

    /// Connection pool size
    #[arg(long, env = "DB_MAX_CONNECTIONS", default_value_t = 10)]
    pub db_max_connections: u32,

    /// TMDB v4 read access token
    #[arg(long, env = "TMDB_ACCESS_TOKEN", hide_env_values = true)]
    pub tmdb_access_token: Option<String>,

    /// TMDB API base URL
    #[arg(long, env = "TMDB_API_BASE", default_value = TMDB_API_BASE)]
    pub tmdb_api_base: String,

    /// Do not apply migrations on startup
    #[arg(long, env = "SKIP_MIGRATIONS", default_value_t = false)]
    pub skip_migrations: bool,
}

impl fmt::Debug for ServeArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServeArgs")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("db_max_connections", &self.db_max_connections)
            .field("tmdb_api_base", &self.tmdb_api_base)
            .field("skip_migrations", &self.skip_migrations)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &"<redacted>")
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct TmdbConfig {
    pub access_token: String,
    pub api_base: String,
}

impl fmt::Debug for TmdbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TmdbConfig")
            .field("access_token", &"<redacted>")
            .field("api_base", &self.api_base)
            .finish()
    }
}

/// Validated runtime configuration for the `serve` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub tmdb: TmdbConfig,
    pub run_migrations: bool,
}

impl Config {
    pub fn from_args(args: ServeArgs) -> Result<Self, ConfigError> {
        let access_token = args
            .tmdb_access_token
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty())
            .ok_or(ConfigError::MissingTmdbToken)?;

        if args.db_max_connections == 0 {
            return Err(ConfigError::InvalidPoolSize);
        }

        let config = Self {
            server: ServerConfig {
                host: args.host,
                port: args.port,
            },
            database: DatabaseConfig {
                url: args.database_url,
                max_connections: args.db_max_connections,
            },
            tmdb: TmdbConfig {
                access_token,
                api_base: args.tmdb_api_base,
            },
            run_migrations: !args.skip_migrations,
        };

        config.bind_addr()?;
        Ok(config)
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = self
            .server
            .host
            .parse()
            .map_err(|_| ConfigError::InvalidHost(self.server.host.clone()))?;
        Ok(SocketAddr::new(ip, self.server.port))
    }
}
