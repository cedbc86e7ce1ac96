//! CLI argument parsing, validation, and startup helpers.

use crate::ServerConfig;
use crate::db::{Database, NewUser};
use crate::password;
use clap::Parser;
use std::net::IpAddr;
use tracing::{error, info};

const MIN_JWT_SECRET_LENGTH: usize = 32;

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

/// Header a trusted reverse proxy uses to pass on the client address.
#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClientIpHeader {
    /// `X-Forwarded-For`; the last entry is the one the proxy appended.
    XForwardedFor,
    /// `X-Real-IP`
    XRealIp,
    /// `CF-Connecting-IP`
    CfConnectingIp,
}

impl ClientIpHeader {
    pub fn header_name(&self) -> &'static str {
        match self {
            ClientIpHeader::XForwardedFor => "x-forwarded-for",
            ClientIpHeader::XRealIp => "x-real-ip",
            ClientIpHeader::CfConnectingIp => "cf-connecting-ip",
        }
    }

    /// Parse the client IP out of a header value.
    pub fn extract(&self, value: &str) -> Result<String, &'static str> {
        let candidate = match self {
            ClientIpHeader::XForwardedFor => value.rsplit(',').next().unwrap_or_default(),
            ClientIpHeader::XRealIp | ClientIpHeader::CfConnectingIp => value,
        };
        candidate
            .trim()
            .parse::<IpAddr>()
            .map(|ip| ip.to_string())
            .map_err(|_| "IP header does not contain a valid address")
    }
}

#[derive(Parser, Debug, Clone)]
#[command(name = "tollgate", about = "Stateless JWT access and refresh token service")]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "8090")]
    pub port: u16,

    /// Path to SQLite database file
    #[arg(short, long, default_value = "tollgate.db")]
    pub database: String,

    /// Issuer and audience written into access tokens
    #[arg(long, env = "TOLLGATE_DOMAIN", default_value = "example.com")]
    pub domain: String,

    /// Domain attribute of the refresh token cookie
    #[arg(long, default_value = "localhost")]
    pub cookie_domain: String,

    /// Path to file containing JWT secret. Prefer using JWT_SECRET env var instead
    #[arg(long)]
    pub jwt_secret_file: Option<String>,

    /// Enforce the early-refresh window on cookie refreshes as well as form refreshes
    #[arg(long)]
    pub strict_cookie_refresh: bool,

    /// Read the client IP for rate limiting from this header. Only set this
    /// behind a reverse proxy that overwrites it; otherwise the socket address is used
    #[arg(long, value_enum)]
    pub ip_header: Option<ClientIpHeader>,

    /// Create an admin user with this email on startup (password from ADMIN_PASSWORD)
    #[arg(long, value_name = "EMAIL")]
    pub create_admin: Option<String>,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,
}

/// Initialize logging based on the specified format.
pub fn init_logging(format: &LogFormat) {
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt::init(),
        LogFormat::Json => tracing_subscriber::fmt().json().init(),
        LogFormat::Compact => tracing_subscriber::fmt().compact().init(),
    }
}

/// Load JWT secret from environment variable or file.
/// Returns None and logs an error if the secret cannot be loaded.
pub fn load_jwt_secret(jwt_secret_file: Option<&str>) -> Option<String> {
    let secret = if let Ok(secret) = std::env::var("JWT_SECRET") {
        // SAFETY: called from main before the runtime spawns any other thread
        // that could read the environment.
        unsafe { std::env::remove_var("JWT_SECRET") };
        secret
    } else if let Some(path) = jwt_secret_file {
        match std::fs::read_to_string(path) {
            Ok(content) => content.trim().to_string(),
            Err(e) => {
                error!(path = %path, error = %e, "Failed to read JWT secret file");
                return None;
            }
        }
    } else {
        error!(
            "JWT secret is required. Set JWT_SECRET environment variable (recommended) or use --jwt-secret-file"
        );
        return None;
    };

    validate_jwt_secret(&secret).then_some(secret)
}

fn validate_jwt_secret(secret: &str) -> bool {
    if secret.len() < MIN_JWT_SECRET_LENGTH {
        error!(
            "JWT secret is shorter than {} characters. Use a longer secret",
            MIN_JWT_SECRET_LENGTH
        );
        return false;
    }
    true
}

/// Build ServerConfig from validated arguments.
pub fn build_config(
    db: Database,
    jwt_secret: String,
    domain: String,
    cookie_domain: String,
    strict_cookie_refresh: bool,
    ip_header: Option<ClientIpHeader>,
) -> ServerConfig {
    ServerConfig {
        db,
        jwt_secret: jwt_secret.into_bytes(),
        domain,
        cookie_domain,
        strict_cookie_refresh,
        ip_header,
    }
}

/// Open the database, logging errors if it fails.
pub async fn open_database(path: &str) -> Option<Database> {
    match Database::open(path).await {
        Ok(db) => {
            info!(path = %path, "Database opened");
            Some(db)
        }
        Err(e) => {
            error!(path = %path, error = %e, "Failed to open database");
            None
        }
    }
}

/// Handle the --create-admin flag. Does nothing if the email is already registered.
pub async fn handle_create_admin(db: &Database, email: &str) -> Result<(), String> {
    match db.users().get_by_email(email).await {
        Ok(Some(existing)) => {
            info!(user_id = existing.id, "Admin user already exists");
            return Ok(());
        }
        Ok(None) => {}
        Err(e) => return Err(format!("Failed to check for existing admin: {}", e)),
    }

    let plaintext = std::env::var("ADMIN_PASSWORD")
        .map_err(|_| "ADMIN_PASSWORD is required with --create-admin".to_string())?;
    if plaintext.is_empty() {
        return Err("ADMIN_PASSWORD cannot be empty".to_string());
    }

    let password_hash =
        password::hash(&plaintext).map_err(|e| format!("Failed to hash password: {}", e))?;

    let id = db
        .users()
        .create(&NewUser {
            email: email.to_string(),
            first_name: "Admin".to_string(),
            last_name: "User".to_string(),
            password_hash,
            is_admin: true,
        })
        .await
        .map_err(|e| format!("Failed to create admin user: {}", e))?;

    info!(user_id = id, email = %email, "Admin user created");
    Ok(())
}
