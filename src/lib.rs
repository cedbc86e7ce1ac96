pub mod api;
pub mod auth;
pub mod cli;
pub mod db;
pub mod jwt;
pub mod password;
pub mod rate_limit;

use api::create_api_router;
use auth::AuthSettings;
use cli::ClientIpHeader;
use axum::Router;
use db::Database;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

pub struct ServerConfig {
    /// Database connection (cloneable, uses connection pool internally)
    pub db: Database,
    /// JWT secret for signing tokens
    pub jwt_secret: Vec<u8>,
    /// Issuer and audience of access tokens
    pub domain: String,
    /// Domain attribute of the refresh cookie
    pub cookie_domain: String,
    /// Apply the early-refresh window to the cookie refresh path too
    pub strict_cookie_refresh: bool,
    /// Trusted proxy header carrying the client IP. None uses the socket address.
    pub ip_header: Option<ClientIpHeader>,
}

impl ServerConfig {
    /// Immutable authentication settings derived from this configuration.
    pub fn auth_settings(&self) -> AuthSettings {
        AuthSettings::new(&self.jwt_secret, &self.domain, &self.cookie_domain)
            .with_strict_cookie_refresh(self.strict_cookie_refresh)
    }
}

/// Create the application router with the given configuration.
pub fn create_app(config: &ServerConfig) -> Router {
    let auth = Arc::new(config.auth_settings());
    create_api_router(config.db.clone(), auth, config.ip_header)
}

/// Run the server on the given listener. This function blocks until the server exits.
pub async fn run_server(config: ServerConfig, listener: TcpListener) -> Result<(), std::io::Error> {
    let app = create_app(&config);
    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, make_service).await
}

/// Start the server on the given port in a background task. Use port 0 to let the OS choose a random port.
/// Returns the actual address the server is listening on.
pub async fn start_server(
    config: ServerConfig,
    port: u16,
) -> std::io::Result<(tokio::task::JoinHandle<()>, SocketAddr)> {
    let addr = format!("127.0.0.1:{}", port);
    let listener = TcpListener::bind(&addr).await?;
    let local_addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = run_server(config, listener).await {
            tracing::error!(error = %e, "Server error");
        }
    });

    Ok((handle, local_addr))
}
