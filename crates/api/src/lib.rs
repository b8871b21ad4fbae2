//! REST facade over the conversational agent
//!
//! | Method | Path | |
//! |---|---|---|
//! | GET | `/` | liveness, always 200 |
//! | GET | `/health` | 503 until the agent is ready |
//! | POST | `/chat` | one turn |
//! | GET / DELETE | `/conversation/:thread_id` | history / clear |
//! | GET | `/tools` | tool catalog |

use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

pub mod error;
pub mod http;
pub mod schemas;
pub mod state;

pub use error::ApiError;
pub use state::AppState;

/// Routes plus permissive CORS and request tracing
pub fn router(state: AppState) -> Router {
    http::routes()
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve until Ctrl-C
pub async fn serve(listener: TcpListener, state: AppState) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!("Listening on http://{}", addr);
    }

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await
}
