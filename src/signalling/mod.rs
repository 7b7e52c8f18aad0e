//! Signaling: the Room Registry, the per-room actor, and the per-connection
//! Peer Session actor that drives one peer's WebSocket.

pub mod peer_session;
pub mod room;
pub mod room_repo;

pub use peer_session::PeerSession;
pub use room_repo::RoomsRepository;
