use anyhow::{Context, Result};
use std::env;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Dev,
    Staging,
    Prod,
}

impl Environment {
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "prod" | "production" => Self::Prod,
            "staging" => Self::Staging,
            _ => Self::Dev,
        }
    }

    pub fn is_dev(&self) -> bool {
        matches!(self, Self::Dev)
    }

    pub fn is_prod(&self) -> bool {
        matches!(self, Self::Prod)
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub env: Environment,
    pub server_addr: String,
    pub max_body_bytes: usize,

    // Database (campaigns). Unset runs on the built-in fixtures.
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub database_run_migrations: bool,

    // Redis (estimates, training progress). Unset keeps them in memory.
    pub redis_url: Option<String>,

    // Estimates
    pub estimate_validity_days: u32,

    // CORS
    pub cors_allow_origins: Vec<String>,

    // Auth
    pub jwt_secret: String,
    pub jwt_issuer: Option<String>,
    pub jwt_audience: String,
}

fn optional(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn parsed<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        let env = Environment::from_str(&env::var("ENV").unwrap_or_else(|_| "dev".to_string()));
        let server_addr = env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
        let max_body_bytes = parsed("MAX_BODY_BYTES", 1024 * 1024);

        // Database
        let database_url = optional("DATABASE_URL");
        let database_max_connections = parsed("DATABASE_MAX_CONNECTIONS", 10);
        let database_run_migrations = parsed("DATABASE_RUN_MIGRATIONS", false);

        // Redis
        let redis_url = optional("REDIS_URL");

        // Estimates
        let estimate_validity_days = parsed("ESTIMATE_VALIDITY_DAYS", 30);

        // CORS
        let cors_allow_origins = env::var("CORS_ALLOW_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        // Auth
        let jwt_secret = optional("JWT_SECRET").context("JWT_SECRET must be set")?;
        let jwt_issuer = optional("JWT_ISSUER");
        let jwt_audience =
            env::var("JWT_AUDIENCE").unwrap_or_else(|_| "authenticated".to_string());

        Ok(Settings {
            env,
            server_addr,
            max_body_bytes,
            database_url,
            database_max_connections,
            database_run_migrations,
            redis_url,
            estimate_validity_days,
            cors_allow_origins,
            jwt_secret,
            jwt_issuer,
            jwt_audience,
        })
    }
}

#[cfg(test)]
impl Settings {
    /// In-memory settings for router tests
    pub fn for_tests(jwt_secret: &str) -> Self {
        Settings {
            env: Environment::Dev,
            server_addr: "127.0.0.1:0".to_string(),
            max_body_bytes: 1024 * 1024,
            database_url: None,
            database_max_connections: 1,
            database_run_migrations: false,
            redis_url: None,
            estimate_validity_days: 30,
            cors_allow_origins: vec!["http://localhost:3000".to_string()],
            jwt_secret: jwt_secret.to_string(),
            jwt_issuer: None,
            jwt_audience: "authenticated".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environment_names() {
        assert_eq!(Environment::from_str("production"), Environment::Prod);
        assert_eq!(Environment::from_str("STAGING"), Environment::Staging);
        assert_eq!(Environment::from_str("anything"), Environment::Dev);
        assert!(Environment::Prod.is_prod());
    }
}
