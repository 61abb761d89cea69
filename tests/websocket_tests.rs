mod common;

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use serde_json::{json, Value};
use tokio_tungstenite::{connect_async, tungstenite};

use common::{recv, send, send_raw, start, wait_for_connections};
use socket_router::kv::KvStore;
use socket_router::{Payload, RequestContext, Router, RouterConfig, Socket, SocketServer};

/// Router with a few routes, wrapped in a server whose listener echoes
/// every packet back as `["seen", route, routed]`.
fn echo_server(config: RouterConfig) -> SocketServer {
    let router: Router<Socket> = Router::new();

    router
        .get("/users/:id/photos/:photo", |req: RequestContext, _socket: &Socket, mut payload: Payload| {
            let crop = req.query("crop").map(Value::from).unwrap_or(Value::Null);
            let args = Value::Array(payload.args().to_vec());
            payload.reply(vec![
                json!(req.param("id")),
                json!(req.param("photo")),
                crop,
                args,
            ]);
            Ok(())
        })
        .unwrap();

    router
        .get("/users/:id", |req: RequestContext, _socket: &Socket, mut payload: Payload| {
            payload.reply(vec![json!({ "user": req.param("id") })]);
            Ok(())
        })
        .unwrap();

    router
        .post("/rooms/:room/messages", |req: RequestContext, socket: &Socket, payload: Payload| {
            let text = payload.arg(0).cloned().unwrap_or(Value::Null);
            socket.emit("message", vec![json!(req.param("room")), text])?;
            Ok(())
        })
        .unwrap();

    router
        .delete("/fail", |_req: RequestContext, _socket: &Socket, _payload: Payload| {
            Err("handler exploded".into())
        })
        .unwrap();

    SocketServer::new(config, Arc::new(router)).on_message(|socket, packet, routed| {
        let route = packet.route().map(Value::from).unwrap_or(Value::Null);
        let _ = socket.emit("seen", vec![route, json!(routed)]);
    })
}

#[tokio::test]
async fn ack_reply_carries_params_query_and_args() {
    let server = start(echo_server(RouterConfig::default())).await;
    let mut client = server.connect().await;

    send(
        &mut client,
        json!({ "ack": 1, "data": ["/users/4/photos/9/read?crop=false", "x", 2] }),
    )
    .await;

    assert_eq!(
        recv(&mut client).await,
        json!({ "ack": 1, "data": ["4", "9", "false", ["x", 2]] })
    );
    assert_eq!(recv(&mut client).await, json!(["seen", "/users/4/photos/9/read?crop=false", true]));
}

#[tokio::test]
async fn handler_can_emit_on_the_socket() {
    let server = start(echo_server(RouterConfig::default())).await;
    let mut client = server.connect().await;

    send(&mut client, json!(["/rooms/lobby/messages/create", "hi"])).await;

    assert_eq!(recv(&mut client).await, json!(["message", "lobby", "hi"]));
    assert_eq!(recv(&mut client).await, json!(["seen", "/rooms/lobby/messages/create", true]));
}

#[tokio::test]
async fn unrouted_traffic_falls_through_to_listener() {
    let server = start(echo_server(RouterConfig::default())).await;
    let mut client = server.connect().await;

    send(&mut client, json!(["chat message", "hello"])).await;
    assert_eq!(recv(&mut client).await, json!(["seen", "chat message", false]));

    // Known resource, unknown verb
    send(&mut client, json!(["/users/4/fetch"])).await;
    assert_eq!(recv(&mut client).await, json!(["seen", "/users/4/fetch", false]));

    // Non-string first element
    send(&mut client, json!([42, "x"])).await;
    assert_eq!(recv(&mut client).await, json!(["seen", null, false]));

    // Malformed frames never reach the listener; the socket stays usable
    send_raw(&mut client, "not json").await;
    send(&mut client, json!(["ping"])).await;
    assert_eq!(recv(&mut client).await, json!(["seen", "ping", false]));
}

#[tokio::test]
async fn handler_error_keeps_connection_open() {
    let server = start(echo_server(RouterConfig::default())).await;
    let mut client = server.connect().await;

    send(&mut client, json!(["/fail/delete"])).await;
    assert_eq!(recv(&mut client).await, json!(["seen", "/fail/delete", true]));

    send(&mut client, json!({ "ack": 2, "data": ["/users/7/get"] })).await;
    assert_eq!(recv(&mut client).await, json!({ "ack": 2, "data": [{ "user": "7" }] }));
}

#[tokio::test]
async fn connection_limit_answers_503() {
    let mut config = RouterConfig::default();
    config.listener.max_connections = 1;
    let server = start(echo_server(config)).await;

    let _first = server.connect().await;
    wait_for_connections(&server.connections, 1).await;

    match connect_async(server.url()).await {
        Err(tungstenite::Error::Http(response)) => assert_eq!(response.status().as_u16(), 503),
        other => panic!("expected 503, got {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
async fn verb_table_reload_applies_to_live_connections() {
    let server = start(echo_server(RouterConfig::default())).await;
    let mut client = server.connect().await;

    send(&mut client, json!(["/users/4/fetch"])).await;
    assert_eq!(recv(&mut client).await, json!(["seen", "/users/4/fetch", false]));

    let mut config = RouterConfig::default();
    config.verbs.get.push("fetch".into());
    server.updates.send(config).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    send(&mut client, json!({ "ack": 3, "data": ["/users/4/fetch"] })).await;
    assert_eq!(recv(&mut client).await, json!({ "ack": 3, "data": [{ "user": "4" }] }));
}

#[tokio::test]
async fn shutdown_closes_sockets_and_stops_server() {
    let server = start(echo_server(RouterConfig::default())).await;
    let mut client = server.connect().await;
    wait_for_connections(&server.connections, 1).await;

    server.shutdown.trigger();

    // Close frame, then end of stream
    let closed = tokio::time::timeout(Duration::from_secs(5), async {
        while let Some(msg) = client.next().await {
            match msg {
                Ok(tungstenite::Message::Close(_)) | Err(_) => break,
                Ok(_) => {}
            }
        }
    })
    .await;
    assert!(closed.is_ok(), "socket was not closed");

    let result = tokio::time::timeout(Duration::from_secs(10), server.handle)
        .await
        .expect("server did not stop")
        .unwrap();
    assert!(result.is_ok());
    assert_eq!(server.connections.active_count(), 0);
}

#[tokio::test]
async fn kv_store_round_trip() {
    let router: Arc<Router<Socket>> = Arc::new(Router::new());
    let store = KvStore::new();
    store.register(&*router).unwrap();
    let server = start(SocketServer::new(RouterConfig::default(), router)).await;
    let mut client = server.connect().await;

    send(&mut client, json!({ "ack": 1, "data": ["/kv/create?key=greeting", "hello"] })).await;
    assert_eq!(recv(&mut client).await, json!({ "ack": 1, "data": [null, "greeting"] }));

    send(&mut client, json!({ "ack": 2, "data": ["/kv/greeting/update", "hi"] })).await;
    assert_eq!(recv(&mut client).await, json!({ "ack": 2, "data": [null, "hello"] }));

    send(&mut client, json!({ "ack": 3, "data": ["/kv/greeting/read"] })).await;
    assert_eq!(recv(&mut client).await, json!({ "ack": 3, "data": [null, "hi"] }));

    send(&mut client, json!({ "ack": 4, "data": ["/kv/greeting/delete"] })).await;
    assert_eq!(recv(&mut client).await, json!({ "ack": 4, "data": [null, "hi"] }));

    send(&mut client, json!({ "ack": 5, "data": ["/kv/greeting/get"] })).await;
    assert_eq!(recv(&mut client).await, json!({ "ack": 5, "data": ["not found"] }));
    assert!(store.is_empty());
}
