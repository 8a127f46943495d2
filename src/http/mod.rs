//! HTTP surface: health, status and whitelist JSON, and the inbound chat webhook.

pub mod error;
pub mod handlers;
pub mod router;

use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;

use crate::discord::BotPresence;
use crate::status::StatusSource;
use crate::whitelist::WhitelistStore;

pub use error::ApiError;
pub use router::build_router;

/// Shared state for all handlers.
#[derive(Clone)]
pub struct AppState {
    pub whitelist: Arc<WhitelistStore>,
    pub status: Arc<dyn StatusSource>,
    pub presence: Arc<BotPresence>,
    /// Required in `X-Webhook-Secret` on `POST /chat` when set.
    pub webhook_secret: Option<String>,
}

/// Bind `0.0.0.0:port` and serve until `shutdown` resolves.
pub async fn serve(
    state: AppState,
    port: u16,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    info!("HTTP server listening on port {}", port);

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}
