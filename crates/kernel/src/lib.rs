//! Folio Kernel Library
//!
//! This library exposes the page controller, its collaborators and the
//! router for integration testing. The main entry point for running the
//! server is the `folio` binary.

pub mod auth;
pub mod config;
pub mod content;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod schema;
pub mod state;
pub mod store;
pub mod theme;

pub use config::Config;
pub use routes::app;
pub use state::AppState;
