use palaver_core::{ClientSignal, ServerSignal};

use crate::integration::{connect_peer, create_router, init_tracing};

/// The causal pair: A's room-broadcast offer reaches B exactly once,
/// B's directed answer reaches A exactly once.
#[tokio::test]
async fn offer_then_answer_between_two_room_members() {
    init_tracing();
    let router = create_router();
    let mut alice = connect_peer(&router).await;
    let mut bob = connect_peer(&router).await;

    for peer in [alice.conn_id.clone(), bob.conn_id.clone()] {
        router.handle_signal(&peer, ClientSignal::JoinRoom("main".to_string()));
    }
    alice.recv().await.expect("join announcement");

    router.handle_signal(
        &alice.conn_id.clone(),
        ClientSignal::Offer {
            room: Some("main".to_string()),
            offer: "v=0 offer-from-alice".to_string(),
            to: None,
        },
    );

    let signal = bob.recv().await.expect("bob should receive the offer");
    assert_eq!(
        signal,
        ServerSignal::Offer {
            from: alice.conn_id.clone(),
            offer: "v=0 offer-from-alice".to_string(),
        }
    );
    bob.assert_silent();

    router.handle_signal(
        &bob.conn_id.clone(),
        ClientSignal::Answer {
            to: alice.conn_id.clone(),
            answer: "v=0 answer-from-bob".to_string(),
        },
    );

    let signal = alice.recv().await.expect("alice should receive the answer");
    assert_eq!(
        signal,
        ServerSignal::Answer {
            from: bob.conn_id.clone(),
            answer: "v=0 answer-from-bob".to_string(),
        }
    );
    alice.assert_silent();
}

/// The broadcast form without an explicit room falls back to the room the
/// sender joined most recently.
#[tokio::test]
async fn offer_without_room_uses_last_joined_room() {
    init_tracing();
    let router = create_router();
    let mut alice = connect_peer(&router).await;
    let mut bob = connect_peer(&router).await;

    for peer in [alice.conn_id.clone(), bob.conn_id.clone()] {
        router.handle_signal(&peer, ClientSignal::JoinRoom("main".to_string()));
    }
    alice.recv().await.expect("join announcement");

    router.handle_signal(
        &alice.conn_id.clone(),
        ClientSignal::Offer {
            room: None,
            offer: "v=0".to_string(),
            to: None,
        },
    );

    let signal = bob.recv().await.expect("bob should receive the offer");
    assert!(matches!(signal, ServerSignal::Offer { from, .. } if from == alice.conn_id));
}

/// An offer from a connection that never joined a room, with no explicit
/// target, is a no-op rather than an error.
#[tokio::test]
async fn offer_before_any_join_is_a_noop() {
    init_tracing();
    let router = create_router();
    let mut loner = connect_peer(&router).await;
    let mut other = connect_peer(&router).await;

    router.handle_signal(
        &loner.conn_id.clone(),
        ClientSignal::Offer {
            room: None,
            offer: "v=0".to_string(),
            to: None,
        },
    );

    loner.assert_silent();
    other.assert_silent();
}

#[tokio::test]
async fn directed_offer_skips_the_room() {
    init_tracing();
    let router = create_router();
    let mut alice = connect_peer(&router).await;
    let mut bob = connect_peer(&router).await;
    let mut carol = connect_peer(&router).await;

    for peer in [
        alice.conn_id.clone(),
        bob.conn_id.clone(),
        carol.conn_id.clone(),
    ] {
        router.handle_signal(&peer, ClientSignal::JoinRoom("main".to_string()));
    }
    // Drain join announcements (alice hears two, bob hears one).
    alice.recv().await.expect("join announcement");
    alice.recv().await.expect("join announcement");
    bob.recv().await.expect("join announcement");

    router.handle_signal(
        &alice.conn_id.clone(),
        ClientSignal::Offer {
            room: Some("main".to_string()),
            offer: "v=0".to_string(),
            to: Some(bob.conn_id.clone()),
        },
    );

    assert!(matches!(
        bob.recv().await.expect("bob should receive the offer"),
        ServerSignal::Offer { .. }
    ));
    carol.assert_silent();
}
