// Core module - Hex codec, activity log and TCP session management
pub mod codec;
pub mod log;
pub mod session;
pub mod transport;
