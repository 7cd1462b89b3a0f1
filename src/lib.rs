//! # Opticon - Market Dashboard Client
//!
//! Client-side core for the Opticon market dashboard: a typed HTTP access
//! layer for the Opticon backend and a single state manager that
//! presentation code observes.
//!
//! ## Architecture
//!
//! - **API**: One typed call per remote endpoint, cookie session handling
//! - **State**: Domain models, the reducer and the [`Store`] manager
//! - **Config**: Layered configuration (defaults, TOML file, environment)
//! - **Error**: Crate-level error type

pub mod api;
pub mod config;
pub mod error;
pub mod state;

pub use api::{Api, ApiClient, ApiError};
pub use config::Config;
pub use error::{Error, Result};
pub use state::{AppState, Store};
