//! Process configuration from environment variables.

use axum::http::HeaderValue;
use tower_http::cors::{Any, CorsLayer};

pub const DEFAULT_PORT: u16 = 3001;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    /// Allowed CORS origins; empty means allow any origin
    pub client_urls: Vec<String>,
}

impl ServerConfig {
    /// Read `PORT` and `CLIENT_URL` (comma-separated origin allow-list).
    pub fn from_env() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(DEFAULT_PORT);

        let client_urls: Vec<String> = std::env::var("CLIENT_URL")
            .ok()
            .map(|s| {
                s.split(',')
                    .map(|url| url.trim().to_string())
                    .filter(|url| !url.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        if client_urls.is_empty() {
            tracing::warn!("CLIENT_URL not set, allowing any origin");
        }

        Self { port, client_urls }
    }

    pub fn cors_layer(&self) -> CorsLayer {
        if self.client_urls.is_empty() {
            return CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any);
        }
        let origins: Vec<HeaderValue> = self
            .client_urls
            .iter()
            .filter_map(|url| match url.parse::<HeaderValue>() {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!("Ignoring unparseable CLIENT_URL entry: {}", url);
                    None
                }
            })
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
