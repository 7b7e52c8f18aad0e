//! Client-facing HTTP/WebSocket API.

pub mod server;
