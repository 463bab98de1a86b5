use std::sync::Arc;
use std::time::Duration;

use blueprint_core::{Editor, NodeSpec, Position, SlotState};
use blueprint_sync::{
    ConnectionState, MemoryConnector, MemoryServer, Session, SessionHandle, SessionResult,
    SharedEditor, SyncConfig,
};
use blueprint_types::{StaticBundleSource, TypeBundle, TypeRegistry};
use pretty_assertions::assert_eq;
use serde_json::json;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;

struct TestSession {
    handle: SessionHandle,
    server: MemoryServer,
    editor: SharedEditor,
    task: JoinHandle<SessionResult<()>>,
}

fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("blueprint_sync=debug,blueprint_core=debug")
        .with_test_writer()
        .try_init();
}

fn test_registry() -> TypeRegistry {
    let bundle = TypeBundle::from_json(
        r#"{
            "udts": [
                { "name": "A", "items": [ { "name": "out1", "type": "int", "attribute": "o" } ] },
                { "name": "B", "items": [ { "name": "in1", "type": "int", "attribute": "i" } ] }
            ]
        }"#,
    )
    .unwrap();

    let mut registry = TypeRegistry::new();
    registry.register_bundle("flame_foundation.typeinfo", bundle);
    registry
}

fn start_session(source: StaticBundleSource, refuse: bool) -> TestSession {
    init_test_tracing();

    let (connector, server) = MemoryConnector::new();
    server.refuse_connections(refuse);

    let editor: SharedEditor = Arc::new(Mutex::new(Editor::new(test_registry())));
    let (session, handle) = Session::new(
        &SyncConfig::default(),
        Arc::clone(&editor),
        Arc::new(connector),
        Arc::new(source),
    );

    TestSession {
        handle,
        server,
        editor,
        task: tokio::spawn(session.run()),
    }
}

async fn wait_for_state(handle: &SessionHandle, wanted: ConnectionState) {
    let mut states = handle.watch_state();
    while *states.borrow_and_update() != wanted {
        states.changed().await.unwrap();
    }
}

async fn eventually<F>(editor: &SharedEditor, check: F)
where
    F: Fn(&Editor) -> bool,
{
    for _ in 0..200 {
        if check(&*editor.lock().await) {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("Editor never reached the expected state");
}

fn linked_snapshot() -> String {
    json!({
        "nodes": [
            { "udt_name": "A", "id": "n1", "x": 10, "y": 20 },
            { "udt_name": "B", "id": "n2", "x": 30, "y": 40 }
        ],
        "links": [ { "in": "n2.in1", "out": "n1.out1" } ]
    })
    .to_string()
}

#[tokio::test(start_paused = true)]
async fn test_snapshot_is_applied() {
    let mut test = start_session(StaticBundleSource::new(), false);

    let peer = test.server.accept().await.unwrap();
    assert_eq!(peer.url(), "ws://localhost:5566/");
    wait_for_state(&test.handle, ConnectionState::Connected).await;

    assert!(peer.send(linked_snapshot()));

    eventually(&test.editor, |editor| editor.graph().links().count() == 1).await;

    let editor = test.editor.lock().await;
    assert_eq!(editor.graph().len(), 2);
    assert_eq!(editor.pending_links(), 0);
    assert!(editor.graph().links_consistent());
}

#[tokio::test(start_paused = true)]
async fn test_save_sends_positions_without_links() {
    let mut test = start_session(StaticBundleSource::new(), false);

    let mut peer = test.server.accept().await.unwrap();
    peer.send(linked_snapshot());
    eventually(&test.editor, |editor| editor.graph().len() == 2).await;

    assert!(test.handle.save());
    let saved: serde_json::Value = serde_json::from_str(&peer.recv().await.unwrap()).unwrap();

    assert_eq!(
        saved,
        json!({
            "nodes": [
                { "name": "n1", "x": 10.0, "y": 20.0 },
                { "name": "n2", "x": 30.0, "y": 40.0 }
            ],
            "links": []
        })
    );
}

#[tokio::test(start_paused = true)]
async fn test_invalid_snapshot_is_ignored() {
    let mut test = start_session(StaticBundleSource::new(), false);

    let peer = test.server.accept().await.unwrap();
    peer.send("{ nodes: oops");
    peer.send(r#"{ "links": [] }"#);
    peer.send(linked_snapshot());

    eventually(&test.editor, |editor| editor.graph().len() == 2).await;
    assert_eq!(test.handle.state(), ConnectionState::Connected);
}

#[tokio::test(start_paused = true)]
async fn test_remote_type_is_fetched() {
    let remote = TypeBundle::from_json(
        r#"{ "udts": [ { "name": "X", "items": [ { "name": "out", "type": "int", "attribute": "o" } ] } ] }"#,
    )
    .unwrap();
    let mut test = start_session(
        StaticBundleSource::new().with_bundle("remote.typeinfo", remote),
        false,
    );

    let peer = test.server.accept().await.unwrap();
    peer.send(
        json!({
            "nodes": [
                { "udt_name": "remote.dll:X", "id": "n1" },
                { "udt_name": "B", "id": "n2" }
            ],
            "links": [ { "in": "n2.in1", "out": "n1.out" } ]
        })
        .to_string(),
    );

    eventually(&test.editor, |editor| editor.graph().links().count() == 1).await;

    let editor = test.editor.lock().await;
    let n1 = editor.graph().find_node("n1").unwrap();
    assert_eq!(editor.graph().node(n1).unwrap().state(), SlotState::Ready);
    assert!(editor.pending_fetches().is_empty());
    assert!(editor.registry().is_bundle_loaded("remote.typeinfo"));
}

#[tokio::test(start_paused = true)]
async fn test_interactive_remote_node_fetches_its_bundle() {
    let remote = TypeBundle::from_json(
        r#"{ "udts": [ { "name": "X", "items": [ { "name": "out", "type": "int", "attribute": "o" } ] } ] }"#,
    )
    .unwrap();
    let mut test = start_session(
        StaticBundleSource::new().with_bundle("ext.typeinfo", remote),
        false,
    );

    let peer = test.server.accept().await.unwrap();
    wait_for_state(&test.handle, ConnectionState::Connected).await;

    let ui = test
        .handle
        .create_node(NodeSpec::new("ext.dll:X", "ui", Position::new(5.0, 5.0)))
        .await
        .unwrap();
    eventually(&test.editor, |editor| {
        editor.graph().node(ui).map(|node| node.state()) == Some(SlotState::Ready)
    })
    .await;

    peer.send(
        json!({
            "nodes": [
                { "udt_name": "ext.dll:X", "id": "n1" },
                { "udt_name": "B", "id": "n2" }
            ],
            "links": [ { "in": "n2.in1", "out": "n1.out" } ]
        })
        .to_string(),
    );

    eventually(&test.editor, |editor| editor.graph().links().count() == 1).await;

    let editor = test.editor.lock().await;
    assert!(editor.pending_fetches().is_empty());
    assert_eq!(editor.pending_links(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_create_node_while_disconnected() {
    let test = start_session(StaticBundleSource::new(), true);
    wait_for_state(&test.handle, ConnectionState::Disconnected).await;

    let id = test
        .handle
        .create_node(NodeSpec::new("A", "offline", Position::default()))
        .await
        .unwrap();
    assert_eq!(test.editor.lock().await.graph().node(id).unwrap().name(), "offline");

    let err = test
        .handle
        .create_node(NodeSpec::new("Nope", "bad", Position::default()))
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "ERR_EDITOR_UNKNOWN_LOCAL_TYPE");
}

#[tokio::test(start_paused = true)]
async fn test_missing_remote_bundle_leaves_node_without_slots() {
    let mut test = start_session(StaticBundleSource::new(), false);

    let peer = test.server.accept().await.unwrap();
    peer.send(r#"{ "nodes": [ { "udt_name": "gone.dll:X", "id": "n1" } ] }"#);

    eventually(&test.editor, |editor| {
        editor
            .graph()
            .find_node("n1")
            .and_then(|id| editor.graph().node(id))
            .map(|node| node.state() == SlotState::Failed)
            .unwrap_or(false)
    })
    .await;
    assert_eq!(test.handle.state(), ConnectionState::Connected);
}

#[tokio::test(start_paused = true)]
async fn test_reconnects_after_fixed_delay() {
    let mut test = start_session(StaticBundleSource::new(), false);

    let peer = test.server.accept().await.unwrap();
    wait_for_state(&test.handle, ConnectionState::Connected).await;

    drop(peer);
    wait_for_state(&test.handle, ConnectionState::Disconnected).await;
    let lost_at = Instant::now();

    let _peer = test.server.accept().await.unwrap();
    let waited = lost_at.elapsed();

    assert!(waited >= Duration::from_millis(2000), "reconnected after {:?}", waited);
    assert!(waited < Duration::from_millis(2100), "reconnected after {:?}", waited);
    wait_for_state(&test.handle, ConnectionState::Connected).await;
}

#[tokio::test(start_paused = true)]
async fn test_refused_connection_is_retried() {
    let mut test = start_session(StaticBundleSource::new(), true);
    let started = Instant::now();

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(test.handle.state(), ConnectionState::Disconnected);

    // Dropped: there is no connection to save through
    assert!(test.handle.save());

    test.server.refuse_connections(false);
    let mut peer = test.server.accept().await.unwrap();
    assert!(started.elapsed() >= Duration::from_millis(2000));

    wait_for_state(&test.handle, ConnectionState::Connected).await;
    let nothing = tokio::time::timeout(Duration::from_millis(100), peer.recv()).await;
    assert!(nothing.is_err());
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_stops_session() {
    let mut test = start_session(StaticBundleSource::new(), false);
    let _peer = test.server.accept().await.unwrap();
    wait_for_state(&test.handle, ConnectionState::Connected).await;

    assert!(test.handle.shutdown());
    test.task.await.unwrap().unwrap();

    assert_eq!(test.handle.state(), ConnectionState::Disconnected);
    assert!(!test.handle.save());

    let err = test
        .handle
        .create_node(NodeSpec::new("A", "late", Position::default()))
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "ERR_SESSION_STOPPED");
}

#[tokio::test(start_paused = true)]
async fn test_unregistered_local_type_aborts_session() {
    let mut test = start_session(StaticBundleSource::new(), false);
    let peer = test.server.accept().await.unwrap();

    peer.send(r#"{ "nodes": [ { "udt_name": "Nope", "id": "n1" } ] }"#);

    let err = test.task.await.unwrap().unwrap_err();
    assert!(err.is_fatal());
    assert_eq!(err.error_code(), "ERR_EDITOR_UNKNOWN_LOCAL_TYPE");
    assert_eq!(test.handle.state(), ConnectionState::Disconnected);
}
