//! Spec.md §8 quantified invariants around admission: `admitted` before
//! `ready_for_offer`, and idempotence of repeated `admit` calls.

use std::time::Duration;

use actix::Actor;
use aviary::signalling::room::{Admit, Join, Room};
use aviary_client_api_proto::{PeerId, Role, ServerMsg};

use super::common::FakeMember;

#[actix_rt::test]
async fn admitted_is_delivered_before_ready_for_offer() {
    let room = Room::new("r1".to_owned()).start();

    let (admin_addr, admin_log, _pc) = FakeMember::spawn(PeerId(1));
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
    actix_rt::time::sleep(Duration::from_millis(10)).await;

    let received = admin_log.lock().unwrap();
    let admitted_at = received
        .iter()
        .position(|m| matches!(m, ServerMsg::Admitted { .. }))
        .expect("admitted was never delivered");
    let ready_at = received
        .iter()
        .position(|m| matches!(m, ServerMsg::ReadyForOffer))
        .expect("ready_for_offer was never delivered");
    assert!(admitted_at < ready_at);
}

#[actix_rt::test]
async fn admitting_an_already_admitted_peer_twice_is_idempotent() {
    let room = Room::new("r1".to_owned()).start();

    let (admin_addr, admin_log, _pc) = FakeMember::spawn(PeerId(1));
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
    actix_rt::time::sleep(Duration::from_millis(10)).await;
    let after_first = admin_log.lock().unwrap().len();

    // A second `admit` on the same, already-admitted target must have
    // the same observable result as calling it once: no further
    // `admitted`/`ready_for_offer` pair delivered.
    room.send(Admit {
        target: PeerId(1),
        by: PeerId(1),
    })
    .await
    .unwrap();
    actix_rt::time::sleep(Duration::from_millis(10)).await;
    let after_second = admin_log.lock().unwrap().len();

    assert_eq!(after_first, after_second);
}
