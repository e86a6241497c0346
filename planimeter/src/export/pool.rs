//! Pool de connexions PostgreSQL

use anyhow::{Context, Result};
use deadpool_postgres::{Config, Pool, PoolConfig, Runtime, Timeouts};
use std::time::Duration;
use tokio_postgres::NoTls;
use tokio_postgres_rustls::MakeRustlsConnect;
use tracing::debug;

/// Chiffrement de la connexion PostgreSQL
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SslMode {
    #[default]
    Disable,
    /// TLS si le serveur l'accepte
    Prefer,
    Require,
}

impl SslMode {
    fn uses_tls(self) -> bool {
        !matches!(self, Self::Disable)
    }
}

impl std::fmt::Display for SslMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Disable => "disable",
            Self::Prefer => "prefer",
            Self::Require => "require",
        })
    }
}

impl std::str::FromStr for SslMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "disable" | "off" | "false" | "no" => Ok(Self::Disable),
            "prefer" => Ok(Self::Prefer),
            "require" | "on" | "true" | "yes" => Ok(Self::Require),
            other => anyhow::bail!("Unknown SSL mode '{}' (expected disable, prefer or require)", other),
        }
    }
}

/// Paramètres de connexion à la base cible
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub dbname: String,
    pub user: String,
    pub password: Option<String>,
    /// Un lot est écrit à la fois, deux connexions suffisent
    pub pool_size: usize,
    pub connect_timeout: Duration,
    pub ssl_mode: SslMode,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 5432,
            dbname: "postgres".into(),
            user: "postgres".into(),
            password: None,
            pool_size: 2,
            connect_timeout: Duration::from_secs(10),
            ssl_mode: SslMode::Disable,
        }
    }
}

fn env_parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

impl DatabaseConfig {
    /// Variables libpq (`PGHOST`, `PGPORT`, ...) puis `PLANIMETER_POOL_SIZE`
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(host) = std::env::var("PGHOST") {
            config.host = host;
        }
        if let Ok(dbname) = std::env::var("PGDATABASE") {
            config.dbname = dbname;
        }
        if let Ok(user) = std::env::var("PGUSER") {
            config.user = user;
        }
        config.password = std::env::var("PGPASSWORD").ok();
        config.port = env_parsed("PGPORT").unwrap_or(config.port);
        config.pool_size = env_parsed("PLANIMETER_POOL_SIZE").unwrap_or(config.pool_size);
        if let Some(secs) = env_parsed::<u64>("PGCONNECT_TIMEOUT") {
            config.connect_timeout = Duration::from_secs(secs);
        }
        config.ssl_mode = env_parsed("PGSSLMODE").unwrap_or_default();
        config
    }

    /// Applique les options de ligne de commande
    pub fn apply_overrides(&mut self, overrides: DatabaseOverrides) -> Result<()> {
        let DatabaseOverrides {
            host,
            database,
            user,
            password,
            port,
            ssl,
        } = overrides;
        self.host = host.unwrap_or(std::mem::take(&mut self.host));
        self.dbname = database.unwrap_or(std::mem::take(&mut self.dbname));
        self.user = user.unwrap_or(std::mem::take(&mut self.user));
        self.password = password.or(self.password.take());
        self.port = port.unwrap_or(self.port);
        if let Some(ssl) = ssl {
            self.ssl_mode = ssl.parse()?;
        }
        Ok(())
    }
}

/// Options de connexion passées en ligne de commande
#[derive(Debug, Clone, Default)]
pub struct DatabaseOverrides {
    pub host: Option<String>,
    pub database: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub port: Option<u16>,
    pub ssl: Option<String>,
}

fn tls_connector() -> MakeRustlsConnect {
    let roots = rustls::RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    MakeRustlsConnect::new(
        rustls::ClientConfig::builder()
            .with_root_certificates(roots)
            .with_no_client_auth(),
    )
}

/// Pool vers la base cible, TLS selon `ssl_mode`
pub async fn create_pool(config: &DatabaseConfig) -> Result<Pool> {
    let mut cfg = Config::new();
    cfg.host = Some(config.host.clone());
    cfg.port = Some(config.port);
    cfg.dbname = Some(config.dbname.clone());
    cfg.user = Some(config.user.clone());
    cfg.password = config.password.clone();
    cfg.application_name = Some("planimeter".into());
    cfg.connect_timeout = Some(config.connect_timeout);
    cfg.pool = Some(PoolConfig {
        max_size: config.pool_size.max(1),
        timeouts: Timeouts {
            wait: Some(Duration::from_secs(30)),
            create: Some(config.connect_timeout),
            recycle: Some(Duration::from_secs(30)),
        },
        ..Default::default()
    });

    let pool = if config.ssl_mode.uses_tls() {
        cfg.create_pool(Some(Runtime::Tokio1), tls_connector())
    } else {
        cfg.create_pool(Some(Runtime::Tokio1), NoTls)
    };
    pool.with_context(|| format!("Failed to create database pool (ssl: {})", config.ssl_mode))
}

/// Vérifie qu'une connexion peut être obtenue et utilisée
pub async fn test_connection(pool: &Pool) -> Result<()> {
    let client = pool
        .get()
        .await
        .context("Failed to get connection from pool")?;
    let version: String = client
        .query_one("SHOW server_version", &[])
        .await
        .context("Connection test failed")?
        .get(0);
    debug!(server_version = %version, "Connected to PostgreSQL");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ssl_mode_parsing() {
        assert_eq!("require".parse::<SslMode>().unwrap(), SslMode::Require);
        assert_eq!("OFF".parse::<SslMode>().unwrap(), SslMode::Disable);
        assert_eq!("prefer".parse::<SslMode>().unwrap(), SslMode::Prefer);
        assert!("verify-full".parse::<SslMode>().is_err());
        assert_eq!(SslMode::Prefer.to_string(), "prefer");
    }

    #[test]
    fn test_overrides() {
        let mut config = DatabaseConfig::default();
        config
            .apply_overrides(DatabaseOverrides {
                host: Some("db.local".into()),
                port: Some(6543),
                ssl: Some("require".into()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(config.host, "db.local");
        assert_eq!(config.port, 6543);
        assert_eq!(config.ssl_mode, SslMode::Require);
        assert_eq!(config.user, "postgres");
        assert_eq!(config.dbname, "postgres");

        let err = config.apply_overrides(DatabaseOverrides {
            ssl: Some("maybe".into()),
            ..Default::default()
        });
        assert!(err.is_err());
    }
}
