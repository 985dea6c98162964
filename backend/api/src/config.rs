//! Application configuration loaded from environment variables.

use crate::errors::{ApiError, Result};

#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite database URL (e.g. `sqlite:./crowdfund.db`)
    pub database_url: String,
    /// Connection pool size
    pub database_max_connections: u32,
    /// Port for the REST API server
    pub api_port: u16,
    /// HMAC secret used to sign and verify bearer tokens
    pub jwt_secret: String,
    /// Lifetime of an issued token, in seconds
    pub token_ttl_secs: i64,
    /// Origin allowed by CORS
    pub frontend_url: String,
    /// Where proof documents are written
    pub proof_storage: ProofStorageConfig,
    /// Prefix of the public URL returned for each stored proof
    pub proof_public_base_url: String,
    /// Request body limit for proof uploads
    pub max_upload_bytes: usize,
    /// Card payment gateway settings
    pub payment: PaymentConfig,
    /// Super-admin seeded at start-up when not yet present
    pub bootstrap_superadmin: Option<BootstrapAdmin>,
}

#[derive(Debug, Clone)]
pub enum ProofStorageConfig {
    /// Process-local store; contents vanish on restart.
    Memory,
    S3 {
        endpoint: String,
        bucket: String,
        region: String,
        access_key_id: String,
        secret_access_key: String,
    },
}

#[derive(Debug, Clone)]
pub struct PaymentConfig {
    pub api_url: String,
    pub secret_key: Option<String>,
    pub currency: String,
}

#[derive(Debug, Clone)]
pub struct BootstrapAdmin {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Config {
            database_url: env_var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:./crowdfund.db".to_string()),
            database_max_connections: parse_var("DATABASE_MAX_CONNECTIONS", "5")?,
            api_port: parse_var("API_PORT", "5000")?,
            jwt_secret: env_var("JWT_SECRET").map_err(|_| {
                ApiError::Config("JWT_SECRET environment variable is required".to_string())
            })?,
            token_ttl_secs: parse_var("TOKEN_TTL_SECS", "86400")?,
            frontend_url: env_var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            proof_storage: proof_storage_from_env()?,
            proof_public_base_url: env_var("PROOF_PUBLIC_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:5000/proofs".to_string()),
            max_upload_bytes: parse_var("MAX_UPLOAD_BYTES", "10485760")?,
            payment: PaymentConfig {
                api_url: env_var("PAYMENT_API_URL")
                    .unwrap_or_else(|_| "https://api.stripe.com".to_string()),
                secret_key: env_var("PAYMENT_SECRET_KEY").ok(),
                currency: env_var("PAYMENT_CURRENCY").unwrap_or_else(|_| "usd".to_string()),
            },
            bootstrap_superadmin: bootstrap_from_env(),
        })
    }
}

fn proof_storage_from_env() -> Result<ProofStorageConfig> {
    let kind = env_var("PROOF_STORAGE").unwrap_or_else(|_| "memory".to_string());
    match kind.as_str() {
        "memory" => Ok(ProofStorageConfig::Memory),
        "s3" => Ok(ProofStorageConfig::S3 {
            endpoint: env_var("OBJECT_STORAGE_ENDPOINT")?,
            bucket: env_var("OBJECT_STORAGE_BUCKET")?,
            region: env_var("OBJECT_STORAGE_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
            access_key_id: env_var("OBJECT_STORAGE_ACCESS_KEY_ID")?,
            secret_access_key: env_var("OBJECT_STORAGE_SECRET_ACCESS_KEY")?,
        }),
        other => Err(ApiError::Config(format!(
            "Invalid PROOF_STORAGE {other:?} (expected \"memory\" or \"s3\")"
        ))),
    }
}

fn bootstrap_from_env() -> Option<BootstrapAdmin> {
    Some(BootstrapAdmin {
        email: env_var("SUPERADMIN_EMAIL").ok()?,
        password: env_var("SUPERADMIN_PASSWORD").ok()?,
        name: env_var("SUPERADMIN_NAME").unwrap_or_else(|_| "Super Admin".to_string()),
    })
}

fn parse_var<T: std::str::FromStr>(key: &str, default: &str) -> Result<T> {
    env_var(key)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .map_err(|_| ApiError::Config(format!("Invalid {key}")))
}

fn env_var(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| ApiError::Config(format!("Missing env var: {key}")))
}
