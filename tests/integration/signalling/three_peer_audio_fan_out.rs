//! Admin A admits users U1 and U2; when U1's audio track arrives, A and
//! U2 each acquire exactly one new outbound sender for it, symmetrically
//! for U2.

use std::time::Duration;

use actix::Actor;
use aviary::{
    media::AudioSource,
    signalling::room::{Admit, Join, Room, TrackStarted},
};
use aviary_client_api_proto::{PeerId, Role};

use super::common::FakeMember;

#[actix_rt::test]
async fn three_peer_audio_fan_out() {
    let room = Room::new("r1".to_owned()).start();

    let (admin_addr, _admin_log, admin_pc) = FakeMember::spawn(PeerId(1));
    room.send(Join {
        peer_id: PeerId(1),
        role: Role::Admin,
        deliver: admin_addr.clone().recipient(),
        begin_admission: admin_addr.clone().recipient(),
    })
    .await
    .unwrap()
    .unwrap();
    room.send(Admit {
        target: PeerId(1),
        by: PeerId(1),
    })
    .await
    .unwrap();

    let (u1_addr, _u1_log, u1_pc) = FakeMember::spawn(PeerId(2));
    room.send(Join {
        peer_id: PeerId(2),
        role: Role::User,
        deliver: u1_addr.clone().recipient(),
        begin_admission: u1_addr.clone().recipient(),
    })
    .await
    .unwrap()
    .unwrap();
    room.send(Admit {
        target: PeerId(2),
        by: PeerId(1),
    })
    .await
    .unwrap();

    let (u2_addr, _u2_log, u2_pc) = FakeMember::spawn(PeerId(3));
    room.send(Join {
        peer_id: PeerId(3),
        role: Role::User,
        deliver: u2_addr.clone().recipient(),
        begin_admission: u2_addr.clone().recipient(),
    })
    .await
    .unwrap()
    .unwrap();
    room.send(Admit {
        target: PeerId(3),
        by: PeerId(1),
    })
    .await
    .unwrap();

    // U1's audio track starts flowing: A and U2 each get one new
    // outbound sender; U1 itself (the origin) gets none.
    room.send(TrackStarted {
        origin: PeerId(2),
        track: AudioSource::new(PeerId(2)),
    })
    .await
    .unwrap();
    // `TrackStarted`'s sink attachment is fire-and-forget (`tokio::spawn`
    // inside the handler); give it a beat to land.
    actix_rt::time::sleep(Duration::from_millis(20)).await;

    assert_eq!(*admin_pc.outbound_sinks.lock().unwrap(), 1);
    assert_eq!(*u2_pc.outbound_sinks.lock().unwrap(), 1);
    assert_eq!(*u1_pc.outbound_sinks.lock().unwrap(), 0);

    // Symmetric for U2's track: A and U1 each get one more.
    room.send(TrackStarted {
        origin: PeerId(3),
        track: AudioSource::new(PeerId(3)),
    })
    .await
    .unwrap();
    actix_rt::time::sleep(Duration::from_millis(20)).await;

    assert_eq!(*admin_pc.outbound_sinks.lock().unwrap(), 2);
    assert_eq!(*u1_pc.outbound_sinks.lock().unwrap(), 1);
    assert_eq!(*u2_pc.outbound_sinks.lock().unwrap(), 1);
}

#[actix_rt::test]
async fn late_joiner_subscribes_to_every_already_live_track() {
    let room = Room::new("r1".to_owned()).start();

    let (admin_addr, _admin_log, _admin_pc) = FakeMember::spawn(PeerId(1));
    room.send(Join {
        peer_id: PeerId(1),
        role: Role::Admin,
        deliver: admin_addr.clone().recipient(),
        begin_admission: admin_addr.clone().recipient(),
    })
    .await
    .unwrap()
    .unwrap();
    room.send(Admit {
        target: PeerId(1),
        by: PeerId(1),
    })
    .await
    .unwrap();

    let (u1_addr, _u1_log, _u1_pc) = FakeMember::spawn(PeerId(2));
    room.send(Join {
        peer_id: PeerId(2),
        role: Role::User,
        deliver: u1_addr.clone().recipient(),
        begin_admission: u1_addr.clone().recipient(),
    })
    .await
    .unwrap()
    .unwrap();
    room.send(Admit {
        target: PeerId(2),
        by: PeerId(1),
    })
    .await
    .unwrap();

    room.send(TrackStarted {
        origin: PeerId(2),
        track: AudioSource::new(PeerId(2)),
    })
    .await
    .unwrap();
    actix_rt::time::sleep(Duration::from_millis(20)).await;

    // A late-joining U2 is admitted only after U1's track is already
    // live: its very first `BeginAdmission` must already carry one
    // outbound sink for it.
    let (u2_addr, _u2_log, u2_pc) = FakeMember::spawn(PeerId(3));
    room.send(Join {
        peer_id: PeerId(3),
        role: Role::User,
        deliver: u2_addr.clone().recipient(),
        begin_admission: u2_addr.clone().recipient(),
    })
    .await
    .unwrap()
    .unwrap();
    room.send(Admit {
        target: PeerId(3),
        by: PeerId(1),
    })
    .await
    .unwrap();
    actix_rt::time::sleep(Duration::from_millis(20)).await;

    assert_eq!(*u2_pc.outbound_sinks.lock().unwrap(), 1);
}
