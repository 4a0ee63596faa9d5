// Session module - TCP session and its manager
pub mod manager;
pub mod session;
pub mod state;

pub use manager::{SendResult, SessionManager, MAX_REPEAT_COUNT};
pub use session::TcpSession;
pub use state::{SessionState, StatusSnapshot};
