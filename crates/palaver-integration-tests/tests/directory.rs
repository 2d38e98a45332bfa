//! End-to-end tests for connection identity and private routing.

use anyhow::Result;
use palaver_protocol::{ClientEvent, FileRef, Session, UserName};

use palaver_integration_tests::{
    assert_silent, connected_session, next_event, next_notification, spawn_runtime,
};

#[tokio::test]
async fn connect_then_duplicate_name_is_rejected() -> Result<()> {
    let directory = spawn_runtime();
    let (_alice, mut alice_events) = connected_session(&directory, "alice").await?;

    let (impostor, mut impostor_events) = Session::new("alice", directory.clone(), 64);
    impostor.connect().await?;
    assert_eq!(
        next_notification(&mut impostor_events).await?,
        "alice is in use!"
    );

    // The original session is unaffected.
    assert_silent(&mut alice_events).await;
    Ok(())
}

#[tokio::test]
async fn name_is_free_again_after_disconnect() -> Result<()> {
    let directory = spawn_runtime();
    let (alice, mut alice_events) = connected_session(&directory, "alice").await?;

    alice.disconnect().await?;
    match next_event(&mut alice_events).await? {
        ClientEvent::Disconnected { user } => assert_eq!(user, UserName::from("alice")),
        other => panic!("expected Disconnected, got {other:?}"),
    }

    // Reclaim the name from a fresh session.
    let (_alice2, _events) = connected_session(&directory, "alice").await?;
    Ok(())
}

#[tokio::test]
async fn repeated_disconnect_fails_identically() -> Result<()> {
    let directory = spawn_runtime();
    let (alice, mut alice_events) = connected_session(&directory, "alice").await?;

    alice.disconnect().await?;
    next_event(&mut alice_events).await?;

    for _ in 0..2 {
        alice.disconnect().await?;
        assert_eq!(
            next_notification(&mut alice_events).await?,
            "alice is already disconnected!"
        );
    }
    Ok(())
}

#[tokio::test]
async fn private_text_reaches_only_the_target() -> Result<()> {
    let directory = spawn_runtime();
    let (alice, mut alice_events) = connected_session(&directory, "alice").await?;
    let (_bob, mut bob_events) = connected_session(&directory, "bob").await?;
    let (_carol, mut carol_events) = connected_session(&directory, "carol").await?;

    alice.private_text("bob", "hi bob").await?;

    match next_event(&mut bob_events).await? {
        ClientEvent::PrivateText { from, body } => {
            assert_eq!(from, UserName::from("alice"));
            assert_eq!(body, "hi bob");
        }
        other => panic!("expected PrivateText, got {other:?}"),
    }
    assert_silent(&mut alice_events).await;
    assert_silent(&mut carol_events).await;
    Ok(())
}

#[tokio::test]
async fn private_file_carries_name_and_location() -> Result<()> {
    let directory = spawn_runtime();
    let (alice, _alice_events) = connected_session(&directory, "alice").await?;
    let (_bob, mut bob_events) = connected_session(&directory, "bob").await?;

    alice
        .private_file("bob", FileRef::new("notes.txt", "/srv/files/notes.txt"))
        .await?;

    match next_event(&mut bob_events).await? {
        ClientEvent::PrivateFile { from, file } => {
            assert_eq!(from, UserName::from("alice"));
            assert_eq!(file.name, "notes.txt");
            assert_eq!(file.location, "/srv/files/notes.txt");
        }
        other => panic!("expected PrivateFile, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn private_to_unknown_user_notifies_sender() -> Result<()> {
    let directory = spawn_runtime();
    let (alice, mut alice_events) = connected_session(&directory, "alice").await?;

    alice.private_text("bob", "anyone there?").await?;
    assert_eq!(
        next_notification(&mut alice_events).await?,
        "bob does not exist!"
    );
    Ok(())
}

#[tokio::test]
async fn full_endpoint_does_not_stall_the_directory() -> Result<()> {
    let directory = spawn_runtime();
    let (alice, _alice_events) = connected_session(&directory, "alice").await?;

    // Bob's mailbox holds a single event and is never drained; the
    // ConnectAck fills it.
    let (bob, _bob_events) = Session::new("bob", directory.clone(), 1);
    bob.connect().await?;

    // Deliveries to the full mailbox are dropped, not awaited.
    alice.private_text("bob", "one").await?;
    alice.private_text("bob", "two").await?;

    // The directory keeps serving everyone else.
    let (_carol, _carol_events) = connected_session(&directory, "carol").await?;
    Ok(())
}

#[tokio::test]
async fn disconnected_user_is_unroutable() -> Result<()> {
    let directory = spawn_runtime();
    let (alice, mut alice_events) = connected_session(&directory, "alice").await?;
    let (bob, mut bob_events) = connected_session(&directory, "bob").await?;

    bob.disconnect().await?;
    next_event(&mut bob_events).await?;

    alice.private_text("bob", "too late").await?;
    assert_eq!(
        next_notification(&mut alice_events).await?,
        "bob does not exist!"
    );
    Ok(())
}
