//! Integration tests driving the `Room` actor the way
//! `signalling::peer_session::PeerSession` drives it, through a fake
//! member standing in for the real WebSocket-backed actor.

mod signalling;
