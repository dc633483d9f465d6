//! HTTP ingest and query service for environmental readings.
//!
//! This crate provides a service that:
//! - Accepts readings from sensor clients over HTTP
//! - Stores them in SQLite or a JSON-lines log
//! - Serves the latest reading, raw history, a five-day summary grid,
//!   filtered history and CSV/XLSX exports
//! - Optionally requires a shared API key for writes
//!
//! # REST API Endpoints
//!
//! - `GET /` - Plain-text banner
//! - `GET /health` - Service health check
//! - `GET /data` - Latest reading (404 `{"status": "no_data"}` when empty)
//! - `POST /data` - Ingest a reading
//! - `GET /history?count=N` - Last N stored readings, oldest first
//! - `GET /grid?zone=Z` - Five-day by 2-hour summary grid
//! - `GET /history/filtered?zone&month&date&hour&count` - Filtered rows
//! - `GET /export?zone&month&format=csv|xlsx` - File download
//!
//! # Configuration
//!
//! The service reads configuration from `~/.config/envlog/server.toml`:
//!
//! ```toml
//! [server]
//! bind = "127.0.0.1:8080"
//!
//! [storage]
//! backend = "sqlite"   # or "jsonl"
//! path = "~/.local/share/envlog/data.db"
//!
//! [time]
//! timezone = "America/Santiago"
//! ```
//!
//! # Security
//!
//! ```toml
//! [security]
//! # Require X-API-Key on POST /data; reads stay open
//! api_key = "shared-secret"
//! ```
//!
//! `ENVLOG_TIMEZONE` and `ENVLOG_API_KEY` override the file.

pub mod api;
pub mod config;
pub mod middleware;
pub mod state;

pub use api::{AppError, app};
pub use config::{
    Config, ConfigError, QueryConfig, SecurityConfig, ServerConfig, StorageConfig, TimeConfig,
};
pub use state::AppState;
