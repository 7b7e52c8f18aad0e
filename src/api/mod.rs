//! HTTP surface: static file hosting, the ICE credential endpoint, and the
//! WebSocket signaling upgrade.

pub mod client;

pub use client::server::{run, AppContext};
