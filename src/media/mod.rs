//! The audio track relay and the WebRTC session capability interface it
//! forwards frames through.

pub mod peer_connection;
pub mod track;

pub use peer_connection::{InboundTrack, MediaError, PeerConnection};
pub use track::{AudioSource, Sink, TrackId};
