//! Client API protocol implementation for the Aviary media server.
//!
//! Every message on the wire is a JSON object with a `type` tag, carried
//! over a single WebSocket connection per peer (see `api::client::server`
//! in the `aviary` crate for the transport).

use derive_more::{Display, From};
use serde::{Deserialize, Serialize};

/// Per-process-unique identifier of a `PeerSession`, assigned monotonically
/// at construction (see the "polling admission gate" / "`id()` as peer
/// identifier" design notes: object identity is not portable, so every
/// `PeerSession` gets one of these instead).
#[derive(
    Clone, Copy, Debug, Display, Eq, From, Hash, Ord, PartialEq, PartialOrd,
)]
#[derive(Deserialize, Serialize)]
pub struct PeerId(pub u64);

impl PeerId {
    /// Returns `self + 1`.
    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

/// Role a `PeerSession` is authenticated with, fixed for its lifetime.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

/// [RTCIceCandidateInit][1] as carried on the wire, used identically in
/// both directions (client trickle and server trickle).
///
/// [1]: https://www.w3.org/TR/webrtc/#dom-rtcicecandidateinit
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub struct IceCandidate {
    pub candidate: String,
    #[serde(rename = "sdpMid", skip_serializing_if = "Option::is_none")]
    pub sdp_mid: Option<String>,
    #[serde(
        rename = "sdpMLineIndex",
        skip_serializing_if = "Option::is_none"
    )]
    pub sdp_m_line_index: Option<u16>,
}

/// Message sent by a Web Client to the media server.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMsg {
    /// Initial or renegotiation SDP offer.
    #[serde(rename = "offer")]
    Offer { sdp: String },

    /// Trickled ICE candidate.
    #[serde(rename = "ice")]
    Ice { candidate: IceCandidate },

    /// Chat message, broadcast to the whole room (echoed back to sender).
    #[serde(rename = "chat")]
    Chat { from: String, text: String },

    /// Admin-only: admit a waiting peer.
    #[serde(rename = "admit")]
    Admit { peer_id: PeerId },

    /// Admin-only: arbitrary event broadcast to the room (slide change,
    /// mute-all, etc.) — the payload is opaque to the server.
    #[serde(rename = "material_event")]
    MaterialEvent {
        event: String,
        #[serde(default)]
        payload: serde_json::Value,
    },
}

/// Message sent by the media server to a Web Client.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum ServerMsg {
    /// Peer has been queued and is awaiting admin approval.
    #[serde(rename = "waiting")]
    Waiting,

    /// Notifies admins that a new user is waiting.
    #[serde(rename = "new_waiting")]
    NewWaiting { peer_id: PeerId },

    /// Peer has been admitted into the room.
    #[serde(rename = "admitted")]
    Admitted { peer_id: PeerId },

    /// Peer may now send its SDP offer.
    #[serde(rename = "ready_for_offer")]
    ReadyForOffer,

    /// Server's SDP answer to a peer's offer.
    #[serde(rename = "answer")]
    Answer { sdp: String },

    /// Trickled ICE candidate from the server side.
    #[serde(rename = "ice")]
    Ice { candidate: IceCandidate },

    /// Broadcast chat message.
    #[serde(rename = "chat")]
    Chat { from: String, text: String },

    /// Admin-originated broadcast event.
    #[serde(rename = "material_event")]
    MaterialEvent {
        event: String,
        payload: serde_json::Value,
    },
}
