//! Expert panel HTTP server binary.
//!
//! # Environment Variables
//!
//! Read from the process and from a `.env` file in the working directory or
//! a parent; process values win.
//!
//! - `PORT` - HTTP port (default: 8080)
//! - `LLM_MODEL` - Default model (default: `anthropic/claude-3-5-haiku-latest`)
//! - `ANTHROPIC_API_KEY` / `OPENAI_API_KEY` - Provider credentials
//! - `PANEL_*` - Panel settings, see `expert_panel::config`
//! - `RUST_LOG` - Tracing filter (default: "info,expert_panel=debug")
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin server
//! ```

use anyhow::Context;
use expert_panel::config::load_env_file;
use expert_panel::server::{app_router, AppState};
use expert_panel::{ExpertPanel, PanelConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_file = load_env_file(None).context("failed to read .env file")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,expert_panel=debug".into()),
        )
        .init();

    if let Some(path) = &env_file {
        tracing::info!("Loaded environment from {}", path.display());
    }

    let port = std::env::var("PORT").unwrap_or_else(|_| "8080".to_string());
    let bind_addr = format!("0.0.0.0:{}", port);

    let config = PanelConfig::from_env().context("invalid panel configuration")?;
    let panel = ExpertPanel::from_config(config).context("failed to initialize expert panel")?;
    let app = app_router(AppState::new(panel));

    tracing::info!("expert-panel server starting on {}", bind_addr);
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health      - liveness probe");
    tracing::info!("  GET  /specialists - available specialists");
    tracing::info!("  POST /panel       - answer a message");

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    axum::serve(listener, app).await.context("server failed")?;
    Ok(())
}
