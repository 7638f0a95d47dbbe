//! Terminal front end for the knowledge-base client.
pub mod app;
pub mod config;
pub mod effects;
pub mod intake;
pub mod render;

pub use app::UploadApp;
pub use config::{ClientConfig, ConfigError};
