//! `PeerSession`: the per-connection actor that drives one peer through
//! authenticate → register → (wait) → admit → negotiate → trickle ICE →
//! steady-state → teardown.
//!
//! Built the way `mock/control-api/src/api/ws.rs`'s `WsSession` is built —
//! a `ws::WebsocketContext` actor with a single `StreamHandler` for the
//! reader side and `ctx.text(...)` as the one writer — generalized from a
//! broadcast relay into the full negotiation state machine described
//! below, with the waiting peer blocking on actix's own mailbox instead
//! of polling its own membership state.

use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

use actix::{
    Actor, ActorContext, ActorFutureExt, Addr, AsyncContext, AtomicResponse,
    Handler, StreamHandler, WrapFuture,
};
use actix_web_actors::ws;
use aviary_client_api_proto::{ClientMsg, PeerId, Role, ServerMsg};
use tokio::sync::mpsc;

use crate::{
    ice::IceCredentialProvider,
    media::{
        peer_connection::WebrtcPeerConnection, AudioSource, InboundTrack,
        PeerConnection,
    },
    sdp,
    signalling::room::{
        Admit, BeginAdmission, Broadcast, BroadcastScope, Deliver, Join,
        JoinOutcome, Leave, Room, TrackStarted,
    },
};

static NEXT_PEER_ID: AtomicU64 = AtomicU64::new(1);

/// Assigns the next process-unique `PeerId`, portable across restarts
/// and address spaces, unlike keying peers by object identity.
pub fn next_peer_id() -> PeerId {
    PeerId(NEXT_PEER_ID.fetch_add(1, Ordering::Relaxed))
}

#[derive(Clone, Copy, Eq, PartialEq, Debug)]
enum PeerState {
    Authenticating,
    RegisteredAdmin,
    Waiting,
    Admitted,
    Negotiating,
    Live,
    Closing,
    Closed,
}

pub struct PeerSession {
    id: PeerId,
    role: Role,
    room: Addr<Room>,
    ice_provider: Arc<dyn IceCredentialProvider>,
    ping_interval: Duration,
    idle_timeout: Duration,

    state: PeerState,
    pc: Option<Arc<dyn PeerConnection>>,
    pending_ice: Vec<aviary_client_api_proto::IceCandidate>,
    remote_description_set: bool,
    last_ping_num: u32,
    last_pong_at: Instant,
}

impl PeerSession {
    #[must_use]
    pub fn new(
        role: Role,
        room: Addr<Room>,
        ice_provider: Arc<dyn IceCredentialProvider>,
        ping_interval: Duration,
        idle_timeout: Duration,
    ) -> Self {
        Self {
            id: next_peer_id(),
            role,
            room,
            ice_provider,
            ping_interval,
            idle_timeout,
            state: PeerState::Authenticating,
            pc: None,
            pending_ice: Vec::new(),
            remote_description_set: false,
            last_ping_num: 0,
            last_pong_at: Instant::now(),
        }
    }

    fn is_admitted(&self) -> bool {
        self.pc.is_some()
    }

    fn send(&self, ctx: &mut ws::WebsocketContext<Self>, msg: &ServerMsg) {
        if let Ok(json) = serde_json::to_string(msg) {
            ctx.text(json);
        }
    }

    fn dispatch(&mut self, msg: ClientMsg, ctx: &mut ws::WebsocketContext<Self>) {
        match msg {
            ClientMsg::Offer { sdp } => self.on_offer(sdp, ctx),
            ClientMsg::Ice { candidate } => self.on_ice(candidate, ctx),
            ClientMsg::Chat { from, text } => {
                if self.is_admitted() {
                    self.room.do_send(Broadcast {
                        message: ServerMsg::Chat { from, text },
                        scope: BroadcastScope::AllAdmitted,
                    });
                }
            }
            ClientMsg::Admit { peer_id } => {
                // Admin-only; non-admin senders are silently dropped,
                // no error, no response.
                if self.role == Role::Admin && self.is_admitted() {
                    self.room.do_send(Admit {
                        target: peer_id,
                        by: self.id,
                    });
                }
            }
            ClientMsg::MaterialEvent { event, payload } => {
                if self.role == Role::Admin && self.is_admitted() {
                    self.room.do_send(Broadcast {
                        message: ServerMsg::MaterialEvent { event, payload },
                        scope: BroadcastScope::AllAdmitted,
                    });
                }
            }
        }
    }

    fn on_offer(&mut self, sdp: String, ctx: &mut ws::WebsocketContext<Self>) {
        let pc = match self.pc.clone() {
            Some(pc) => pc,
            // An offer from a peer that isn't admitted yet has nothing to
            // negotiate against; drop it.
            None => return,
        };
        self.state = PeerState::Negotiating;
        let queued = std::mem::take(&mut self.pending_ice);

        let fut = async move {
            pc.set_remote_description(sdp).await?;
            for candidate in queued {
                // Failures to apply a trickled candidate are swallowed;
                // the transport may already be closing.
                drop(pc.add_ice_candidate(candidate).await);
            }
            pc.create_and_set_local_answer().await
        };

        ctx.spawn(fut.into_actor(self).map(|res, act, ctx| {
            if let Ok(answer_sdp) = res {
                act.remote_description_set = true;
                act.state = PeerState::Live;
                let patched = sdp::patch_audio_answer(&answer_sdp);
                act.send(ctx, &ServerMsg::Answer { sdp: patched });
            }
            // A negotiation failure is swallowed; the peer simply never
            // receives an `answer` and may retry.
        }));
    }

    fn on_ice(
        &mut self,
        candidate: aviary_client_api_proto::IceCandidate,
        _ctx: &mut ws::WebsocketContext<Self>,
    ) {
        let pc = match self.pc.clone() {
            Some(pc) => pc,
            None => return,
        };
        if self.remote_description_set {
            tokio::spawn(async move {
                drop(pc.add_ice_candidate(candidate).await);
            });
        } else {
            self.pending_ice.push(candidate);
        }
    }

    /// Teardown order: leave the room's membership sets, stop outbound
    /// senders, close the WebRTC handle, close the channel (the channel
    /// close is handled by the `ws` actor itself once this actor stops).
    fn teardown(&mut self) {
        if self.state == PeerState::Closed {
            return;
        }
        self.state = PeerState::Closed;
        self.room.do_send(Leave { peer_id: self.id });
        if let Some(pc) = self.pc.take() {
            tokio::spawn(async move {
                drop(pc.stop_outbound_senders().await);
                drop(pc.close().await);
            });
        }
    }
}

impl Actor for PeerSession {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        let deliver = ctx.address().recipient();
        let begin_admission = ctx.address().recipient();
        let room = self.room.clone();
        let role = self.role;
        let peer_id = self.id;

        let fut = async move {
            room.send(Join {
                peer_id,
                role,
                deliver,
                begin_admission,
            })
            .await
        };

        ctx.wait(fut.into_actor(self).map(|res, act, ctx| {
            match res {
                Ok(Ok(JoinOutcome::RegisteredAdmin)) => {
                    act.state = PeerState::RegisteredAdmin;
                    // An admin is admitted as a full, media-producing
                    // peer immediately, via self-admission.
                    act.room.do_send(Admit {
                        target: act.id,
                        by: act.id,
                    });
                }
                Ok(Ok(JoinOutcome::Waiting)) => {
                    act.state = PeerState::Waiting;
                }
                _ => ctx.stop(),
            }
        }));

        // Protocol-level WebSocket ping/pong, answered transparently by
        // any standard client library with no application code — unlike
        // an app-level keepalive message, which would require every
        // client to opt in. Only an admitted peer's idle time is ever
        // checked: a peer still waiting for admin approval has no
        // server-side timeout and must never be disconnected for it.
        ctx.run_interval(self.ping_interval, |act, ctx| {
            act.last_ping_num += 1;
            ctx.ping(&act.last_ping_num.to_be_bytes());
            if act.is_admitted()
                && Instant::now().duration_since(act.last_pong_at)
                    > act.idle_timeout
            {
                ctx.stop();
            }
        });
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        self.teardown();
    }
}

impl Handler<Deliver> for PeerSession {
    type Result = ();

    fn handle(&mut self, msg: Deliver, ctx: &mut Self::Context) {
        self.send(ctx, &msg.0);
    }
}

impl Handler<BeginAdmission> for PeerSession {
    type Result = AtomicResponse<Self, Result<Arc<dyn PeerConnection>, ()>>;

    fn handle(
        &mut self,
        msg: BeginAdmission,
        _ctx: &mut Self::Context,
    ) -> Self::Result {
        let ice_provider = Arc::clone(&self.ice_provider);
        let live_tracks = msg.live_tracks;

        let fut = async move {
            let ice_servers =
                ice_provider.fetch().await.map_err(|_| ())?;
            let (tx, rx) = mpsc::unbounded_channel();
            let pc = WebrtcPeerConnection::new(&ice_servers, tx)
                .await
                .map_err(|_| ())?;
            let pc: Arc<dyn PeerConnection> = Arc::new(pc);

            // Before `ready_for_offer` is sent, every currently-live
            // source is attached as an outbound sender, so the peer's
            // first SDP offer already covers reception of all of them.
            for track in &live_tracks {
                drop(pc.add_outbound_sink(track.subscribe()).await);
            }

            Ok::<_, ()>((pc, rx))
        };

        AtomicResponse::new(Box::pin(fut.into_actor(self).map(
            move |res, act, ctx| match res {
                Ok((pc, rx)) => {
                    act.pc = Some(Arc::clone(&pc));
                    act.state = PeerState::Admitted;
                    act.last_pong_at = Instant::now();
                    spawn_track_forwarder(
                        act.room.clone(),
                        act.id,
                        rx,
                    );
                    // `admitted` is always delivered before
                    // `ready_for_offer`; no `ice` is sent before
                    // `ready_for_offer` either, since the server never
                    // initiates trickle in this design, only the client
                    // does.
                    act.send(ctx, &ServerMsg::Admitted { peer_id: act.id });
                    act.send(ctx, &ServerMsg::ReadyForOffer);
                    Ok(pc)
                }
                Err(()) => Err(()),
            },
        )))
    }
}

/// Forwards every inbound audio track this peer produces into the room as
/// a new [`AudioSource`], and every RTP packet on that track into the
/// source's publish side, until the remote track ends.
fn spawn_track_forwarder(
    room: Addr<Room>,
    origin: PeerId,
    mut rx: mpsc::UnboundedReceiver<InboundTrack>,
) {
    tokio::spawn(async move {
        while let Some(InboundTrack { remote }) = rx.recv().await {
            let source = AudioSource::new(origin);
            room.do_send(TrackStarted {
                origin,
                track: source.clone(),
            });

            let source_for_reader = source.clone();
            tokio::spawn(async move {
                loop {
                    match remote.read_rtp().await {
                        Ok((packet, _attrs)) => source_for_reader.publish(packet),
                        Err(_) => break,
                    }
                }
                source_for_reader.end();
            });
        }
    });
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for PeerSession {
    fn handle(
        &mut self,
        item: Result<ws::Message, ws::ProtocolError>,
        ctx: &mut Self::Context,
    ) {
        let msg = match item {
            Ok(msg) => msg,
            // Transport error: swallowed, triggers teardown.
            Err(_) => {
                ctx.stop();
                return;
            }
        };

        match msg {
            ws::Message::Ping(bytes) => ctx.pong(&bytes),
            ws::Message::Pong(_) => self.last_pong_at = Instant::now(),
            ws::Message::Text(text) => {
                match serde_json::from_str::<ClientMsg>(&text) {
                    Ok(client_msg) => self.dispatch(client_msg, ctx),
                    // Unknown type or malformed payload: drop the
                    // message, keep the loop running.
                    Err(_) => {}
                }
            }
            ws::Message::Close(reason) => {
                ctx.close(reason);
                ctx.stop();
            }
            _ => {}
        }
    }
}
