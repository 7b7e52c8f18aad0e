//! The audio track handle and its subscription sinks.
//!
//! A [`AudioSource`] is the live audio coming from one admitted peer.
//! Subscribing to it is idempotent with respect to the *source* — every
//! call yields an independent [`Sink`], never a shared reference count —
//! and each sink exhibits latest-frame-wins semantics: a slow reader
//! drops everything but the newest frame instead of queueing, which is
//! exactly what `tokio::sync::watch` already guarantees, so we build on
//! it rather than hand-rolling a bounded ring buffer.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use aviary_client_api_proto::PeerId;
use tokio::sync::watch;
use webrtc::rtp::packet::Packet;

/// Per-process-unique identifier of a live audio source.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct TrackId(u64);

static NEXT_TRACK_ID: AtomicU64 = AtomicU64::new(1);

impl TrackId {
    fn next() -> Self {
        Self(NEXT_TRACK_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// One live audio source flowing from `origin` into the room. Held in
/// `Room::live_tracks` for exactly as long as `origin` stays admitted.
#[derive(Clone)]
pub struct AudioSource {
    id: TrackId,
    origin: PeerId,
    tx: Arc<watch::Sender<Option<Packet>>>,
}

impl AudioSource {
    /// Creates a new source with no frames delivered yet.
    #[must_use]
    pub fn new(origin: PeerId) -> Self {
        let (tx, _rx) = watch::channel(None);
        Self {
            id: TrackId::next(),
            origin,
            tx: Arc::new(tx),
        }
    }

    #[must_use]
    pub fn id(&self) -> TrackId {
        self.id
    }

    #[must_use]
    pub fn origin(&self) -> PeerId {
        self.origin
    }

    /// Publishes a newly received RTP packet. Readers that haven't
    /// caught up on the previous frame simply never see it — no queue,
    /// no backlog.
    pub fn publish(&self, packet: Packet) {
        // A send error means every `Sink` has been dropped; nothing to do.
        let _ = self.tx.send(Some(packet));
    }

    /// Marks the source as ended. Every outstanding [`Sink`] yields
    /// `None` from its next [`Sink::next`] call after the current value.
    pub fn end(&self) {
        drop(self.tx.send(None));
    }

    /// Creates a fresh, independent subscription. Subscribing twice to
    /// the same source yields two sinks with no shared state beyond the
    /// underlying broadcast of frames.
    #[must_use]
    pub fn subscribe(&self) -> Sink {
        Sink {
            track_id: self.id,
            rx: self.tx.subscribe(),
        }
    }
}

/// A single consumer's view of an [`AudioSource`]. Owned by exactly one
/// outbound sender on a recipient's `PeerConnection`.
pub struct Sink {
    track_id: TrackId,
    rx: watch::Receiver<Option<Packet>>,
}

impl Sink {
    #[must_use]
    pub fn track_id(&self) -> TrackId {
        self.track_id
    }

    /// Awaits the next distinct frame. Returns `None` once the source
    /// has ended and no further frame follows.
    pub async fn next(&mut self) -> Option<Packet> {
        if self.rx.changed().await.is_err() {
            return None;
        }
        self.rx.borrow().clone()
    }
}
