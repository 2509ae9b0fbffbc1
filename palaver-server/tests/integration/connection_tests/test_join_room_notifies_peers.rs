use palaver_core::{ClientSignal, ServerSignal};

use crate::integration::{connect_peer, create_router, init_tracing};

#[tokio::test]
async fn first_join_announces_to_nobody() {
    init_tracing();
    let router = create_router();
    let mut alice = connect_peer(&router).await;

    router.handle_signal(
        &alice.conn_id.clone(),
        ClientSignal::JoinRoom("main".to_string()),
    );

    alice.assert_silent();
}

#[tokio::test]
async fn later_joins_are_announced_to_the_room() {
    init_tracing();
    let router = create_router();
    let mut alice = connect_peer(&router).await;
    let mut bob = connect_peer(&router).await;

    router.handle_signal(
        &alice.conn_id.clone(),
        ClientSignal::JoinRoom("main".to_string()),
    );
    router.handle_signal(
        &bob.conn_id.clone(),
        ClientSignal::JoinRoom("main".to_string()),
    );

    let signal = alice.recv().await.expect("alice should hear about bob");
    assert_eq!(signal, ServerSignal::UserJoined(bob.conn_id.clone()));

    // The joiner itself hears nothing.
    bob.assert_silent();
}

#[tokio::test]
async fn join_announcement_is_room_scoped() {
    init_tracing();
    let router = create_router();
    let mut alice = connect_peer(&router).await;
    let mut carol = connect_peer(&router).await;
    let mut bob = connect_peer(&router).await;

    router.handle_signal(
        &alice.conn_id.clone(),
        ClientSignal::JoinRoom("main".to_string()),
    );
    router.handle_signal(
        &carol.conn_id.clone(),
        ClientSignal::JoinRoom("side".to_string()),
    );
    router.handle_signal(
        &bob.conn_id.clone(),
        ClientSignal::JoinRoom("main".to_string()),
    );

    assert_eq!(
        alice.recv().await.expect("alice should hear about bob"),
        ServerSignal::UserJoined(bob.conn_id.clone())
    );
    carol.assert_silent();
}

#[tokio::test]
async fn empty_room_name_is_rejected() {
    init_tracing();
    let router = create_router();
    let mut alice = connect_peer(&router).await;
    let mut bob = connect_peer(&router).await;

    router.handle_signal(&alice.conn_id.clone(), ClientSignal::JoinRoom(String::new()));
    router.handle_signal(
        &bob.conn_id.clone(),
        ClientSignal::JoinRoom(String::new()),
    );

    alice.assert_silent();
    bob.assert_silent();
}
