pub mod api;
pub mod config;
pub mod libs;
pub mod services;

pub use api::{AppState, router};
pub use config::Config;
