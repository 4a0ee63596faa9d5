//! HexLink Library
//!
//! Single-session TCP client for devices driven by short hex commands,
//! with repeat-send orchestration, a bounded activity log and thin
//! console and HTTP front ends.

pub mod cli;
pub mod core;
pub mod domain;
pub mod infrastructure;

pub use domain::error::{HexLinkError, HexLinkResult};
pub use domain::config::{Endpoint, HexLinkConfig};
pub use core::codec;
pub use core::session::{SendResult, SessionManager, StatusSnapshot, TcpSession};
pub use core::transport::HexTransport;
