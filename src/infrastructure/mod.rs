// Infrastructure module - External dependencies and adapters
pub mod config;
pub mod history;
pub mod http;
pub mod logging;
pub mod tcp;
