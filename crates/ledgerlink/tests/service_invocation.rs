//! Service invocation end to end: consumer correlation and provider
//! listeners against an in-memory node.

mod common;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use ledgerlink::client::ACCOUNT_QUERY_PATH;
use ledgerlink::service::msgs::{MSG_REQUEST_SERVICE, MSG_RESPOND_SERVICE};
use ledgerlink::service::{
    MsgRespondService, Request, RequestContextId, ServiceMsg, ServiceRouter, REQUEST_QUERY_PATH,
};
use ledgerlink::{BaseTx, ClientError, InvocationRequest};
use ledgerlink_core::{AccAddress, Coins, ValidationError};
use ledgerlink_rpc::Tags;
use ledgerlink_testkit::fixtures::{
    address, new_block_event, random_request_context_id, respond_event, respond_tags, tx_event,
    TestFixture, TEST_MSG_TYPE,
};
use serde_json::{json, Value};

use common::{init_tracing, settle, wait_until};

type Outputs = Arc<Mutex<Vec<(RequestContextId, String)>>>;

fn recorder() -> (Outputs, impl Fn(RequestContextId, String) + Send + Sync + 'static) {
    let outputs: Outputs = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&outputs);
    (outputs, move |id, output| sink.lock().unwrap().push((id, output)))
}

fn price_request(provider: AccAddress) -> InvocationRequest {
    InvocationRequest::new("price", vec![provider], r#"{"pair":"a/b"}"#).timeout(50)
}

// ─────────────────────────────────────────────────────────────────────────────
// Consumer
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_single_shot_invocation_fires_once() {
    init_tracing();
    let fixture = TestFixture::new().await;
    let consumer = fixture.client(1);
    let id = random_request_context_id();
    fixture.tag_request_context(id).await;

    let (outputs, callback) = recorder();
    let invocation = consumer
        .invoke_service(price_request(address(2)), &BaseTx::new(), callback)
        .await
        .unwrap();

    assert_eq!(invocation.context.request_context_id, id);
    assert_eq!(invocation.context.consumer, consumer.address());
    assert!(!invocation.context.repeated);
    assert_eq!(
        invocation.subscription.query,
        format!(
            "action = 'respond_service' AND consumer = '{}' AND service-name = 'price' \
             AND tm.event = 'Tx'",
            consumer.address()
        )
    );

    let broadcasts = fixture.node.broadcasts().await;
    assert_eq!(broadcasts.len(), 1);
    assert_eq!(broadcasts[0].msg[0].type_name, MSG_REQUEST_SERVICE);
    assert_eq!(broadcasts[0].msg[0].value["service_name"], "price");

    let delivered = fixture
        .node
        .publish(respond_event(10, &consumer.address(), "price", &id, "42"))
        .await;
    assert_eq!(delivered, 1);

    let subs = consumer.subscriptions();
    let sub = &invocation.subscription;
    wait_until("auto-cancel", || async move { !subs.is_active(sub).await }).await;
    assert_eq!(*outputs.lock().unwrap(), vec![(id, "42".to_string())]);
    settle().await;

    let delivered = fixture
        .node
        .publish(respond_event(11, &consumer.address(), "price", &id, "43"))
        .await;
    assert_eq!(delivered, 0);
    settle().await;
    assert_eq!(outputs.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_repeated_invocation_stays_open() {
    init_tracing();
    let fixture = TestFixture::new().await;
    let consumer = fixture.client(1);
    let id = random_request_context_id();
    fixture.tag_request_context(id).await;

    let (outputs, callback) = recorder();
    let request = price_request(address(2)).repeated(5, 10);
    let invocation = consumer
        .invoke_service(request, &BaseTx::new(), callback)
        .await
        .unwrap();
    assert!(invocation.context.repeated);

    for (height, output) in [(10, "1"), (11, "2")] {
        fixture
            .node
            .publish(respond_event(height, &consumer.address(), "price", &id, output))
            .await;
    }

    let recorded = &outputs;
    wait_until("two responses", || async move { recorded.lock().unwrap().len() == 2 }).await;
    let seen: Vec<String> = outputs.lock().unwrap().iter().map(|(_, o)| o.clone()).collect();
    assert_eq!(seen, vec!["1", "2"]);

    let subs = consumer.subscriptions();
    assert!(subs.is_active(&invocation.subscription).await);

    subs.unsubscribe(&invocation.subscription).await.unwrap();
    assert!(!subs.is_active(&invocation.subscription).await);
    assert_eq!(fixture.node.subscriber_count().await, 0);
}

#[tokio::test]
async fn test_missing_request_context_tag_is_protocol_violation() {
    init_tracing();
    let fixture = TestFixture::new().await;
    let consumer = fixture.client(1);

    let (_, callback) = recorder();
    let result = consumer
        .invoke_service(price_request(address(2)), &BaseTx::new(), callback)
        .await;

    assert!(matches!(result, Err(ClientError::ProtocolViolation(_))));
    assert_eq!(consumer.subscriptions().active_count().await, 0);
}

#[tokio::test]
async fn test_malformed_request_context_tag_is_protocol_violation() {
    init_tracing();
    let fixture = TestFixture::new().await;
    fixture
        .node
        .on_broadcast(|_| Ok(Tags::new().with("request-context-id", "abcd")))
        .await;
    let consumer = fixture.client(1);

    let (_, callback) = recorder();
    let result = consumer
        .invoke_service(price_request(address(2)), &BaseTx::new(), callback)
        .await;
    assert!(matches!(result, Err(ClientError::ProtocolViolation(_))));
}

#[tokio::test]
async fn test_invalid_request_is_never_broadcast() {
    let fixture = TestFixture::new().await;
    let consumer = fixture.client(1);

    let (_, callback) = recorder();
    let request = InvocationRequest::new("price", vec![], "{}");
    let result = consumer.invoke_service(request, &BaseTx::new(), callback).await;

    assert!(matches!(
        result,
        Err(ClientError::Validation(ValidationError::MissingField("providers")))
    ));
    assert!(fixture.node.broadcasts().await.is_empty());
}

#[tokio::test]
async fn test_responses_are_matched_structurally() {
    init_tracing();
    let fixture = TestFixture::new().await;
    let consumer = fixture.client(1);
    let id = random_request_context_id();
    fixture.tag_request_context(id).await;

    let (outputs, callback) = recorder();
    let invocation = consumer
        .invoke_service(price_request(address(2)), &BaseTx::new(), callback)
        .await
        .unwrap();

    // Matching tags but no response operation inside.
    let unrelated = ledgerlink_core::RawMsg::new(TEST_MSG_TYPE, json!({"text": "x"}));
    let delivered = fixture
        .node
        .publish(tx_event(
            10,
            respond_tags(&consumer.address(), "price"),
            vec![unrelated],
        ))
        .await;
    assert_eq!(delivered, 1);

    // Another service's responses are filtered out by the node.
    let delivered = fixture
        .node
        .publish(respond_event(11, &consumer.address(), "weather", &id, "rain"))
        .await;
    assert_eq!(delivered, 0);

    settle().await;
    assert!(outputs.lock().unwrap().is_empty());
    assert!(consumer.subscriptions().is_active(&invocation.subscription).await);
}

#[tokio::test]
async fn test_concurrent_invocations_are_independent() {
    init_tracing();
    let fixture = TestFixture::new().await;
    let consumer = fixture.client(1);
    let id = random_request_context_id();
    fixture.tag_request_context(id).await;

    let (price_outputs, price_cb) = recorder();
    let (weather_outputs, weather_cb) = recorder();
    let price = consumer
        .invoke_service(price_request(address(2)), &BaseTx::new(), price_cb)
        .await
        .unwrap();
    let weather_request = InvocationRequest::new("weather", vec![address(2)], "{}").repeated(1, 5);
    let weather = consumer
        .invoke_service(weather_request, &BaseTx::new(), weather_cb)
        .await
        .unwrap();
    assert_ne!(price.subscription.id, weather.subscription.id);

    fixture
        .node
        .publish(respond_event(10, &consumer.address(), "weather", &id, "sun"))
        .await;
    let recorded = &weather_outputs;
    wait_until("weather response", || async move {
        recorded.lock().unwrap().len() == 1
    })
    .await;

    assert!(price_outputs.lock().unwrap().is_empty());
    assert!(consumer.subscriptions().is_active(&price.subscription).await);
}

#[tokio::test]
async fn test_same_service_invocations_keep_their_own_responses() {
    init_tracing();
    let fixture = TestFixture::new().await;
    let consumer = fixture.client(1);
    let first_id = RequestContextId::from_bytes([0xaa; 32]);
    let second_id = RequestContextId::from_bytes([0xbb; 32]);

    let (first_outputs, first_cb) = recorder();
    let (second_outputs, second_cb) = recorder();
    fixture.tag_request_context(first_id).await;
    let first = consumer
        .invoke_service(price_request(address(2)), &BaseTx::new(), first_cb)
        .await
        .unwrap();
    fixture.tag_request_context(second_id).await;
    let second = consumer
        .invoke_service(price_request(address(2)), &BaseTx::new(), second_cb)
        .await
        .unwrap();
    assert_eq!(first.context.request_context_id, first_id);
    assert_eq!(second.context.request_context_id, second_id);

    // Both subscriptions match the tags; only the second owns the response.
    let delivered = fixture
        .node
        .publish(respond_event(10, &consumer.address(), "price", &second_id, "for-second"))
        .await;
    assert_eq!(delivered, 2);

    let subs = consumer.subscriptions();
    let sub = &second.subscription;
    wait_until("second auto-cancel", || async move { !subs.is_active(sub).await }).await;
    assert_eq!(
        *second_outputs.lock().unwrap(),
        vec![(second_id, "for-second".to_string())]
    );
    settle().await;
    assert!(first_outputs.lock().unwrap().is_empty());
    assert!(subs.is_active(&first.subscription).await);

    let delivered = fixture
        .node
        .publish(respond_event(11, &consumer.address(), "price", &first_id, "for-first"))
        .await;
    assert_eq!(delivered, 1);
    let sub = &first.subscription;
    wait_until("first auto-cancel", || async move { !subs.is_active(sub).await }).await;
    assert_eq!(
        *first_outputs.lock().unwrap(),
        vec![(first_id, "for-first".to_string())]
    );
    assert_eq!(second_outputs.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_request_context_operations() {
    let fixture = TestFixture::new().await;
    let consumer = fixture.client(1);
    let id = RequestContextId::from_bytes([0xab; 32]);

    consumer.pause_request_context(&id, &BaseTx::new()).await.unwrap();
    consumer.start_request_context(&id, &BaseTx::new()).await.unwrap();
    consumer.kill_request_context(&id, &BaseTx::new()).await.unwrap();

    let types: Vec<String> = fixture
        .node
        .broadcasts()
        .await
        .iter()
        .map(|tx| tx.msg[0].type_name.clone())
        .collect();
    assert_eq!(
        types,
        vec![
            "irishub/service/MsgPauseRequestContext",
            "irishub/service/MsgStartRequestContext",
            "irishub/service/MsgKillRequestContext",
        ]
    );

    let broadcasts = fixture.node.broadcasts().await;
    let body = &broadcasts[0].msg[0].value;
    let encoded = body["request_context_id"].as_str().unwrap().to_string();
    assert_eq!(encoded.len(), 44);
    assert_eq!(body["consumer"], consumer.address().to_string());
}

// ─────────────────────────────────────────────────────────────────────────────
// Provider
// ─────────────────────────────────────────────────────────────────────────────

/// Serve `custom/service/request` from a fixed table.
async fn serve_requests(fixture: &TestFixture, requests: Vec<Request>) {
    let table: HashMap<String, Request> =
        requests.into_iter().map(|r| (r.id.clone(), r)).collect();
    fixture
        .node
        .set_query_handler(REQUEST_QUERY_PATH, move |data| {
            let params: Value = serde_json::from_slice(data).map_err(|e| e.to_string())?;
            let id = params["RequestID"].as_str().unwrap_or_default();
            let request = table.get(id).ok_or_else(|| format!("unknown request {id}"))?;
            serde_json::to_vec(request).map_err(|e| e.to_string())
        })
        .await;
}

fn request(id: &str, service_name: &str, provider: AccAddress, input: &str) -> Request {
    Request {
        id: id.to_string(),
        service_name: service_name.to_string(),
        provider,
        consumer: address(1),
        input: input.to_string(),
        service_fee: Coins::empty(),
        super_mode: false,
        request_height: 4,
        expiration_height: 54,
        request_context_id: String::new(),
        request_context_batch_counter: 1,
    }
}

async fn responses(fixture: &TestFixture) -> HashMap<String, MsgRespondService> {
    fixture
        .node
        .broadcasts()
        .await
        .iter()
        .filter_map(|tx| match ServiceMsg::from_raw(&tx.msg[0]) {
            Ok(Some(ServiceMsg::RespondService(msg))) => Some((msg.request_id.clone(), msg)),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_single_listener_answers_own_requests() {
    init_tracing();
    let fixture = TestFixture::new().await;
    let provider = fixture.client(2);
    let me = provider.address();
    serve_requests(
        &fixture,
        vec![
            request("req-mine", "price", me, "a/b"),
            request("req-other", "price", address(3), "a/b"),
            request("req-weather", "weather", me, "paris"),
        ],
    )
    .await;

    let subscription = provider
        .register_single_invocation_listener(
            "price",
            |input: &str| Ok(format!("echo:{input}")),
            BaseTx::new(),
        )
        .await
        .unwrap();
    assert_eq!(subscription.query, "tm.event = 'NewBlock'");

    fixture
        .node
        .publish(new_block_event(
            5,
            &["req-missing", "req-other", "req-mine", "req-weather"],
        ))
        .await;

    let node = &fixture.node;
    wait_until("one response", || async move { !node.broadcasts().await.is_empty() }).await;
    settle().await;

    let sent = responses(&fixture).await;
    assert_eq!(sent.len(), 1);
    let msg = &sent["req-mine"];
    assert_eq!(msg.provider, me);
    assert_eq!(msg.output, "echo:a/b");
    assert!(msg.error.is_empty());
    assert_eq!(fixture.node.broadcasts().await[0].msg[0].type_name, MSG_RESPOND_SERVICE);
}

#[tokio::test]
async fn test_router_listener_answers_every_routed_service() {
    init_tracing();
    let fixture = TestFixture::new().await;
    let provider = fixture.client(2);
    let me = provider.address();
    serve_requests(
        &fixture,
        vec![
            request("req-1", "price", me, "a/b"),
            request("req-2", "weather", me, "paris"),
            request("req-3", "unrouted", me, "?"),
        ],
    )
    .await;

    let router = ServiceRouter::new()
        .route("price", |_: &str| Ok("1.5".to_string()))
        .route("weather", |_: &str| Err("offline".to_string()));
    provider
        .register_invocation_listener(router, BaseTx::new())
        .await
        .unwrap();

    fixture
        .node
        .publish(new_block_event(5, &["req-1", "req-2", "req-3"]))
        .await;
    let node = &fixture.node;
    wait_until("two responses", || async move { node.broadcasts().await.len() == 2 }).await;
    settle().await;

    let sent = responses(&fixture).await;
    assert_eq!(sent.len(), 2);
    assert_eq!(sent["req-1"].output, "1.5");
    assert_eq!(sent["req-2"].error, "offline");
    assert!(sent["req-2"].output.is_empty());
}

#[tokio::test]
async fn test_responses_in_one_block_are_sequenced() {
    init_tracing();
    let fixture = TestFixture::new().await;
    let provider = fixture.client(2);
    let me = provider.address();
    serve_requests(
        &fixture,
        vec![
            request("req-1", "price", me, "1"),
            request("req-2", "price", me, "2"),
            request("req-3", "price", me, "3"),
        ],
    )
    .await;

    // The account sequence advances with every accepted broadcast.
    let accepted = Arc::new(AtomicU64::new(0));
    let counter = Arc::clone(&accepted);
    fixture
        .node
        .on_broadcast(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Tags::new())
        })
        .await;
    let sequence = Arc::clone(&accepted);
    fixture
        .node
        .set_query_handler(ACCOUNT_QUERY_PATH, move |data| {
            let params: Value = serde_json::from_slice(data).map_err(|e| e.to_string())?;
            let account = json!({
                "address": params["Address"],
                "coins": [],
                "account_number": "1",
                "sequence": sequence.load(Ordering::SeqCst).to_string(),
            });
            serde_json::to_vec(&account).map_err(|e| e.to_string())
        })
        .await;

    provider
        .register_single_invocation_listener(
            "price",
            |input: &str| Ok(input.to_string()),
            BaseTx::new(),
        )
        .await
        .unwrap();
    fixture
        .node
        .publish(new_block_event(5, &["req-1", "req-2", "req-3"]))
        .await;

    let node = &fixture.node;
    wait_until("three responses", || async move { node.broadcasts().await.len() == 3 }).await;

    let broadcasts = fixture.node.broadcasts().await;
    let sent: Vec<(String, u64)> = broadcasts
        .iter()
        .map(|tx| {
            let request_id = tx.msg[0].value["request_id"].as_str().unwrap().to_string();
            (request_id, tx.signatures[0].sequence)
        })
        .collect();
    assert_eq!(
        sent,
        vec![
            ("req-1".to_string(), 0),
            ("req-2".to_string(), 1),
            ("req-3".to_string(), 2),
        ]
    );
}

#[tokio::test]
async fn test_panicking_handler_does_not_stop_listener() {
    init_tracing();
    let fixture = TestFixture::new().await;
    let provider = fixture.client(2);
    let me = provider.address();
    serve_requests(
        &fixture,
        vec![
            request("req-boom", "price", me, "boom"),
            request("req-ok", "price", me, "a/b"),
            request("req-later", "price", me, "c/d"),
        ],
    )
    .await;

    let subscription = provider
        .register_single_invocation_listener(
            "price",
            |input: &str| {
                if input == "boom" {
                    panic!("handler exploded");
                }
                Ok(input.to_uppercase())
            },
            BaseTx::new(),
        )
        .await
        .unwrap();

    fixture
        .node
        .publish(new_block_event(5, &["req-boom", "req-ok"]))
        .await;
    fixture.node.publish(new_block_event(6, &["req-later"])).await;

    let node = &fixture.node;
    wait_until("two responses", || async move { node.broadcasts().await.len() == 2 }).await;
    settle().await;

    let sent = responses(&fixture).await;
    assert_eq!(sent.len(), 2);
    assert_eq!(sent["req-ok"].output, "A/B");
    assert_eq!(sent["req-later"].output, "C/D");
    assert!(provider.subscriptions().is_active(&subscription).await);
}

#[tokio::test]
async fn test_failed_response_broadcast_keeps_listening() {
    init_tracing();
    let fixture = TestFixture::new().await;
    let provider = fixture.client(2);
    let me = provider.address();
    serve_requests(&fixture, vec![request("req-1", "price", me, "a/b")]).await;
    fixture
        .node
        .on_broadcast(|_| Err("mempool full".to_string()))
        .await;

    let subscription = provider
        .register_single_invocation_listener("price", |_: &str| Ok("1".into()), BaseTx::new())
        .await
        .unwrap();

    fixture.node.publish(new_block_event(5, &["req-1"])).await;
    settle().await;

    assert!(fixture.node.broadcasts().await.is_empty());
    assert!(provider.subscriptions().is_active(&subscription).await);

    // The response queue survives the failure.
    fixture.node.on_broadcast(|_| Ok(Tags::new())).await;
    fixture.node.publish(new_block_event(6, &["req-1"])).await;
    let node = &fixture.node;
    wait_until("retried response", || async move { node.broadcasts().await.len() == 1 }).await;
}
