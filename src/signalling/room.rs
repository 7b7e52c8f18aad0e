//! The `Room` actor.
//!
//! All mutation of `admins`/`waiting`/`admitted`/`live_tracks` happens
//! inside this actor's message handlers. Actix already guarantees an
//! actor processes one message at a time; handlers that must await
//! another actor (the admission handshake with the target's own
//! `PeerSession`) use [`actix::AtomicResponse`] so the whole operation —
//! not just its synchronous prefix — is the unit of serialization,
//! without reaching for a bare `Mutex` the way a less actor-native
//! design would.

use std::{collections::HashMap, sync::Arc};

use actix::{
    Actor, ActorFutureExt, AtomicResponse, Context, Handler, Message,
    Recipient, WrapFuture,
};
use aviary_client_api_proto::{PeerId, Role, ServerMsg};

use crate::media::{AudioSource, PeerConnection};

/// One admin/waiting/admitted member of a room, as seen from the Room's
/// point of view. Every member can be delivered a [`Deliver`] message and
/// asked to [`BeginAdmission`]; only admitted members additionally carry
/// a WebRTC session handle. Both recipients are handles into the same
/// underlying `signalling::peer_session::PeerSession` actor — Room only
/// depends on the message types, never the concrete actor, the same way
/// `media::PeerConnection` is a trait object rather than a concrete
/// WebRTC type.
struct Member {
    deliver: Recipient<Deliver>,
    begin_admission: Recipient<BeginAdmission>,
    pc: Option<Arc<dyn PeerConnection>>,
}

/// A single audio conferencing room. Created lazily by
/// [`super::room_repo::RoomsRepository`] and never torn down while the
/// process runs — there is no cross-process sharding or persistence to
/// reconcile it against.
pub struct Room {
    id: String,
    admins: std::collections::HashSet<PeerId>,
    waiting: std::collections::HashSet<PeerId>,
    members: HashMap<PeerId, Member>,
    live_tracks: Vec<AudioSource>,
}

impl Room {
    #[must_use]
    pub fn new(id: String) -> Self {
        Self {
            id,
            admins: Default::default(),
            waiting: Default::default(),
            members: HashMap::new(),
            live_tracks: Vec::new(),
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    fn admitted_ids(&self) -> impl Iterator<Item = PeerId> + '_ {
        self.members.iter().filter_map(|(id, m)| {
            if m.pc.is_some() {
                Some(*id)
            } else {
                None
            }
        })
    }

    fn deliver_to(&self, id: PeerId, msg: ServerMsg) {
        if let Some(member) = self.members.get(&id) {
            // Best-effort send: a closed mailbox is simply dropped,
            // never propagated as a Room-level error.
            drop(member.deliver.do_send(Deliver(msg)));
        }
    }

    fn broadcast(&self, msg: ServerMsg, scope: BroadcastScope) {
        for id in self.admitted_ids() {
            let include = match scope {
                BroadcastScope::AllAdmitted => true,
                BroadcastScope::AdminsOnly => self.admins.contains(&id),
            };
            if include {
                self.deliver_to(id, msg.clone());
            }
        }
    }
}

impl Actor for Room {
    type Context = Context<Self>;
}

#[derive(Clone, Copy)]
pub enum BroadcastScope {
    AllAdmitted,
    AdminsOnly,
}

/// Delivered to a member's own actor address; `PeerSession` turns this
/// into `ctx.text(...)`.
#[derive(Message, Clone)]
#[rtype(result = "()")]
pub struct Deliver(pub ServerMsg);

/// Registers a new member. Admins enter `admins` and become eligible for
/// immediate self-admission; users enter `waiting`.
#[derive(Message)]
#[rtype(result = "Result<JoinOutcome, RoomError>")]
pub struct Join {
    pub peer_id: PeerId,
    pub role: Role,
    pub deliver: Recipient<Deliver>,
    pub begin_admission: Recipient<BeginAdmission>,
}

pub enum JoinOutcome {
    RegisteredAdmin,
    Waiting,
}

#[derive(Debug, Eq, PartialEq)]
pub enum RoomError {
    /// Reserved for a room being torn down. The in-memory, single-process
    /// design never actually tears a room down mid-process, but the
    /// error path exists for symmetry with designs that do.
    Closing,
}

impl Handler<Join> for Room {
    type Result = Result<JoinOutcome, RoomError>;

    fn handle(&mut self, msg: Join, _ctx: &mut Self::Context) -> Self::Result {
        self.members.insert(
            msg.peer_id,
            Member {
                deliver: msg.deliver,
                begin_admission: msg.begin_admission,
                pc: None,
            },
        );

        match msg.role {
            Role::Admin => {
                self.admins.insert(msg.peer_id);
                // A newly-joining admin must be told about every user
                // already queued, not just future ones (original_source/
                // server.py's `authenticate` loop over `state["waiting"]`
                // right after registering an admin).
                for waiting in self.waiting.clone() {
                    self.deliver_to(
                        msg.peer_id,
                        ServerMsg::NewWaiting { peer_id: waiting },
                    );
                }
                Ok(JoinOutcome::RegisteredAdmin)
            }
            Role::User => {
                self.waiting.insert(msg.peer_id);
                self.deliver_to(msg.peer_id, ServerMsg::Waiting);
                for admin in self.admins.clone() {
                    self.deliver_to(
                        admin,
                        ServerMsg::NewWaiting {
                            peer_id: msg.peer_id,
                        },
                    );
                }
                Ok(JoinOutcome::Waiting)
            }
        }
    }
}

/// Begins admission of `target`: `by` must be an admin, or `by == target`
/// for an admin's own self-admission. A no-op, not an error, if `target`
/// isn't currently waiting/eligible — idempotent with respect to
/// repeated `admit` calls.
#[derive(Message)]
#[rtype(result = "()")]
pub struct Admit {
    pub target: PeerId,
    pub by: PeerId,
}

/// Sent to the target's own `PeerSession` to have it construct its
/// WebRTC handle, subscribe to every currently-live track, and announce
/// itself (`{admitted}` then `{ready_for_offer}`) — ownership of the
/// handle stays with the `PeerSession` throughout; no other session ever
/// touches it.
#[derive(Message)]
#[rtype(result = "Result<Arc<dyn PeerConnection>, ()>")]
pub struct BeginAdmission {
    pub peer_id: PeerId,
    pub live_tracks: Vec<AudioSource>,
}

impl Handler<Admit> for Room {
    type Result = AtomicResponse<Self, ()>;

    fn handle(&mut self, msg: Admit, _ctx: &mut Self::Context) -> Self::Result {
        let authorized =
            self.admins.contains(&msg.by) || msg.by == msg.target;
        let already_admitted = self
            .members
            .get(&msg.target)
            .map_or(false, |m| m.pc.is_some());
        let eligible = !already_admitted
            && (self.waiting.contains(&msg.target)
                || (msg.by == msg.target && self.admins.contains(&msg.target)));

        if !authorized || !eligible {
            return AtomicResponse::new(Box::pin(
                actix::fut::ready(()).into_actor(self),
            ));
        }

        let begin_admission = match self.members.get(&msg.target) {
            Some(m) => m.begin_admission.clone(),
            None => {
                return AtomicResponse::new(Box::pin(
                    actix::fut::ready(()).into_actor(self),
                ))
            }
        };
        let live_tracks = self.live_tracks.clone();
        let target = msg.target;

        let fut = async move {
            begin_admission
                .send(BeginAdmission {
                    peer_id: target,
                    live_tracks,
                })
                .await
        };

        AtomicResponse::new(Box::pin(fut.into_actor(self).map(
            move |res, act, _ctx| {
                if let Ok(Ok(pc)) = res {
                    act.waiting.remove(&target);
                    if let Some(member) = act.members.get_mut(&target) {
                        member.pc = Some(pc);
                    }
                }
            },
        )))
    }
}

/// Removes `session` from whichever set it occupies; if admitted, its
/// audio source (if any) is ended and detached from every sink.
/// Idempotent — a `leave` for a non-member is a no-op.
#[derive(Message)]
#[rtype(result = "()")]
pub struct Leave {
    pub peer_id: PeerId,
}

impl Handler<Leave> for Room {
    type Result = ();

    fn handle(&mut self, msg: Leave, _ctx: &mut Self::Context) {
        self.admins.remove(&msg.peer_id);
        self.waiting.remove(&msg.peer_id);
        self.members.remove(&msg.peer_id);
        for track in &self.live_tracks {
            if track.origin() == msg.peer_id {
                track.end();
            }
        }
        self.live_tracks.retain(|t| t.origin() != msg.peer_id);
    }
}

/// A new audio source has started flowing from `origin`. Attaches a
/// fresh subscription sink to every other currently-admitted peer.
#[derive(Message)]
#[rtype(result = "()")]
pub struct TrackStarted {
    pub origin: PeerId,
    pub track: AudioSource,
}

impl Handler<TrackStarted> for Room {
    type Result = ();

    fn handle(&mut self, msg: TrackStarted, _ctx: &mut Self::Context) {
        self.live_tracks.push(msg.track.clone());
        for (id, member) in &self.members {
            if *id == msg.origin {
                continue;
            }
            if let Some(pc) = member.pc.clone() {
                let sink = msg.track.subscribe();
                tokio::spawn(async move {
                    drop(pc.add_outbound_sink(sink).await);
                });
            }
        }
    }
}

/// Broadcasts `message` to every admitted peer matching `scope`.
/// Sender-inclusive broadcasts (chat) are modeled by simply listing the
/// sender among the recipients, not by a special case here.
#[derive(Message)]
#[rtype(result = "()")]
pub struct Broadcast {
    pub message: ServerMsg,
    pub scope: BroadcastScope,
}

impl Handler<Broadcast> for Room {
    type Result = ();

    fn handle(&mut self, msg: Broadcast, _ctx: &mut Self::Context) {
        self.broadcast(msg.message, msg.scope);
    }
}
