//! HTTP server for the expert panel.
//!
//! # Endpoints
//!
//! - `GET  /health`      - Liveness probe
//! - `GET  /specialists` - Available specialists
//! - `POST /panel`       - Answer a message with a dynamically assembled panel

pub mod routes;

pub use routes::{app_router, status_for, AppState, PanelRequest, SpecialistSummary};
