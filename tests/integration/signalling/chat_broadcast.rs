//! With A, U1, U2 admitted, U1's chat message reaches all three exactly
//! once, sender included.

use std::time::Duration;

use actix::Actor;
use aviary::signalling::room::{Admit, Broadcast, BroadcastScope, Join, Room};
use aviary_client_api_proto::{PeerId, Role, ServerMsg};

use super::common::FakeMember;

#[actix_rt::test]
async fn chat_reaches_every_admitted_peer_exactly_once_including_sender() {
    let room = Room::new("r1".to_owned()).start();

    let (admin_addr, admin_log, _admin_pc) = FakeMember::spawn(PeerId(1));
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

    let (u1_addr, u1_log, _u1_pc) = FakeMember::spawn(PeerId(2));
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

    let (u2_addr, u2_log, _u2_pc) = FakeMember::spawn(PeerId(3));
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

    room.send(Broadcast {
        message: ServerMsg::Chat {
            from: "u1".to_owned(),
            text: "hi".to_owned(),
        },
        scope: BroadcastScope::AllAdmitted,
    })
    .await
    .unwrap();
    actix_rt::time::sleep(Duration::from_millis(10)).await;

    for log in [&admin_log, &u1_log, &u2_log] {
        let received = log.lock().unwrap();
        let count = received
            .iter()
            .filter(|m| {
                matches!(
                    m,
                    ServerMsg::Chat { from, text }
                        if from == "u1" && text == "hi"
                )
            })
            .count();
        assert_eq!(count, 1);
    }
}
