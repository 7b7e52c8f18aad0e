//! Test doubles standing in for `signalling::peer_session::PeerSession`
//! and the `webrtc`-backed `PeerConnection`, so these tests drive
//! `Room` through the same actor messages a real `PeerSession` would
//! send/receive without needing a live WebSocket transport or a real
//! WebRTC stack — the same substitution
//! `tests/integration/signalling/three_pubs.rs`'s `TestMember` makes
//! for a real `jason` client.

use std::sync::{Arc, Mutex};

use actix::{Actor, Context, Handler, ResponseFuture};
use async_trait::async_trait;
use aviary::{
    media::{MediaError, PeerConnection, Sink},
    signalling::room::{BeginAdmission, Deliver},
};
use aviary_client_api_proto::{IceCandidate, PeerId, ServerMsg};

/// Records how many outbound sinks it has been handed; never actually
/// reads frames off of them.
#[derive(Default)]
pub struct MockPeerConnection {
    pub outbound_sinks: Mutex<usize>,
    pub closed: Mutex<bool>,
}

#[async_trait]
impl PeerConnection for MockPeerConnection {
    async fn set_remote_description(
        &self,
        _sdp: String,
    ) -> Result<(), MediaError> {
        Ok(())
    }

    async fn create_and_set_local_answer(&self) -> Result<String, MediaError> {
        Ok("v=0\r\n".to_owned())
    }

    async fn add_ice_candidate(
        &self,
        _candidate: IceCandidate,
    ) -> Result<(), MediaError> {
        Ok(())
    }

    async fn add_outbound_sink(&self, _sink: Sink) -> Result<(), MediaError> {
        *self.outbound_sinks.lock().unwrap() += 1;
        Ok(())
    }

    async fn stop_outbound_senders(&self) -> Result<(), MediaError> {
        Ok(())
    }

    async fn close(&self) -> Result<(), MediaError> {
        *self.closed.lock().unwrap() = true;
        Ok(())
    }
}

/// A member actor standing in for `PeerSession`: records every
/// `ServerMsg` delivered to it by `Room`, and on `BeginAdmission`
/// reproduces the same observable contract the real `PeerSession`
/// fulfills — subscribing to every already-live track, then announcing
/// `admitted` before `ready_for_offer` — before handing back its
/// `MockPeerConnection`.
pub struct FakeMember {
    peer_id: PeerId,
    received: Arc<Mutex<Vec<ServerMsg>>>,
    pc: Arc<MockPeerConnection>,
}

impl FakeMember {
    #[must_use]
    pub fn spawn(
        peer_id: PeerId,
    ) -> (
        actix::Addr<Self>,
        Arc<Mutex<Vec<ServerMsg>>>,
        Arc<MockPeerConnection>,
    ) {
        let received = Arc::new(Mutex::new(Vec::new()));
        let pc = Arc::new(MockPeerConnection::default());
        let addr = Self {
            peer_id,
            received: received.clone(),
            pc: pc.clone(),
        }
        .start();
        (addr, received, pc)
    }
}

impl Actor for FakeMember {
    type Context = Context<Self>;
}

impl Handler<Deliver> for FakeMember {
    type Result = ();

    fn handle(&mut self, msg: Deliver, _ctx: &mut Self::Context) {
        self.received.lock().unwrap().push(msg.0);
    }
}

impl Handler<BeginAdmission> for FakeMember {
    type Result = ResponseFuture<Result<Arc<dyn PeerConnection>, ()>>;

    fn handle(
        &mut self,
        msg: BeginAdmission,
        _ctx: &mut Self::Context,
    ) -> Self::Result {
        let pc = self.pc.clone();
        let received = self.received.clone();
        let peer_id = self.peer_id;

        Box::pin(async move {
            for track in &msg.live_tracks {
                drop(pc.add_outbound_sink(track.subscribe()).await);
            }
            received.lock().unwrap().push(ServerMsg::Admitted { peer_id });
            received.lock().unwrap().push(ServerMsg::ReadyForOffer);
            Ok(pc as Arc<dyn PeerConnection>)
        })
    }
}
