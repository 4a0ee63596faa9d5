// TCP module - Local echo server for bench testing
pub mod server;

pub use server::EchoServer;
