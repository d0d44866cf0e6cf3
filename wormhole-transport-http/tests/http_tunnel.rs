/********************************************************************************
 * Copyright (c) 2024 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

use async_trait::async_trait;
use integration_test_utils::{init_logging, InMemoryBus};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinSet;
use uuid::Uuid;
use wormhole_gateway::{
    headers, CriticalErrorAction, Dispatch, EndpointInstance, Envelope, GatewayConfiguration,
    GatewayError, GatewayTransport, Headers, MessageReceiver, MessageType, ReceiveOutcome,
};
use wormhole_transport_http::{HttpTransport, HttpTransportSettings};

fn loopback_settings() -> HttpTransportSettings {
    HttpTransportSettings::default()
        .with_default_host("127.0.0.1")
        .with_bind_address("127.0.0.1:0".parse().expect("valid socket address"))
        .with_circuit_breaker(Duration::from_secs(30), Duration::ZERO)
        .with_request_timeout(Duration::from_secs(10))
}

fn ignore_critical_errors() -> CriticalErrorAction {
    Arc::new(|_: &str, _: &GatewayError| {})
}

async fn transport(queue: &str) -> Arc<HttpTransport> {
    transport_with(queue, loopback_settings()).await
}

async fn transport_with(queue: &str, settings: HttpTransportSettings) -> Arc<HttpTransport> {
    Arc::new(
        HttpTransport::bind(queue, settings)
            .await
            .expect("loopback bind"),
    )
}

/// Records every attempt and answers from a script, accepting once the script runs out.
struct ScriptedReceiver {
    busy_answers: Mutex<u32>,
    attempts: Mutex<Vec<(Envelope, u32)>>,
}

impl ScriptedReceiver {
    fn busy_for(answers: u32) -> Arc<Self> {
        Arc::new(Self {
            busy_answers: Mutex::new(answers),
            attempts: Mutex::new(Vec::new()),
        })
    }

    fn attempts(&self) -> Vec<(Envelope, u32)> {
        self.attempts.lock().expect("attempts lock poisoned").clone()
    }
}

#[async_trait]
impl MessageReceiver for ScriptedReceiver {
    async fn receive(&self, envelope: Envelope, immediate_failures: u32) -> ReceiveOutcome {
        self.attempts
            .lock()
            .expect("attempts lock poisoned")
            .push((envelope, immediate_failures));
        let mut busy_answers = self.busy_answers.lock().expect("script lock poisoned");
        if *busy_answers > 0 {
            *busy_answers -= 1;
            ReceiveOutcome::RetryRequired
        } else {
            ReceiveOutcome::Accepted
        }
    }
}

fn envelope_with_awkward_headers() -> Envelope {
    let mut headers = Headers::new();
    headers.insert(
        headers::ENCLOSED_MESSAGE_TYPES.to_string(),
        "Ns.MyMessage, Asm, Version=1.0.0.0, Culture=neutral".to_string(),
    );
    headers.insert(headers::SOURCE_SITE.to_string(), "SiteA".to_string());
    headers.insert("Custom Header/é".to_string(), "a|b; c=d%20 é\t".to_string());
    Envelope::new(Uuid::new_v4().to_string(), headers, b"\x00binary body\xff".to_vec())
}

#[tokio::test]
async fn envelope_crosses_the_tunnel_unchanged() {
    init_logging();
    let sender = transport("sender").await;
    let receiver_transport = transport("gateway-b").await;
    let receiver = ScriptedReceiver::busy_for(0);
    receiver_transport
        .start(receiver.clone(), ignore_critical_errors())
        .await
        .expect("pump starts");

    let envelope = envelope_with_awkward_headers();
    sender
        .dispatch(&receiver_transport.local_address(), &envelope)
        .await
        .expect("delivered");

    assert_eq!(receiver.attempts(), vec![(envelope, 0)]);
    receiver_transport.stop().await.expect("pump stops");
}

#[tokio::test]
async fn busy_receiver_sees_increasing_failure_counts() {
    init_logging();
    let sender = transport("sender").await;
    let receiver_transport = transport("gateway-b").await;
    let receiver = ScriptedReceiver::busy_for(3);
    receiver_transport
        .start(receiver.clone(), ignore_critical_errors())
        .await
        .expect("pump starts");

    sender
        .dispatch(
            &receiver_transport.local_address(),
            &envelope_with_awkward_headers(),
        )
        .await
        .expect("delivered once the receiver stops asking for retries");

    let counts: Vec<u32> = receiver
        .attempts()
        .into_iter()
        .map(|(_, immediate_failures)| immediate_failures)
        .collect();
    assert_eq!(counts, vec![0, 1, 2, 3]);
    receiver_transport.stop().await.expect("pump stops");
}

#[tokio::test]
async fn wrong_queue_path_fails_the_dispatch() {
    init_logging();
    let sender = transport("sender").await;
    let receiver_transport = transport("gateway-b").await;
    let receiver = ScriptedReceiver::busy_for(0);
    receiver_transport
        .start(receiver.clone(), ignore_critical_errors())
        .await
        .expect("pump starts");

    let wrong_queue = format!("http://{}/gateway-c", receiver_transport.bound_to());
    let mut envelope = envelope_with_awkward_headers();
    envelope.id = "msg-1".to_string();
    let err = sender
        .dispatch(&wrong_queue, &envelope)
        .await
        .expect_err("no such queue");

    assert_eq!(
        err,
        GatewayError::transport(format!(
            "Unexpected status code 404 Not Found when sending to {wrong_queue}/msg-1."
        ))
    );
    assert!(receiver.attempts().is_empty());
    receiver_transport.stop().await.expect("pump stops");
}

struct SlowReceiver {
    started: Notify,
    finished: AtomicBool,
}

#[async_trait]
impl MessageReceiver for SlowReceiver {
    async fn receive(&self, _envelope: Envelope, _immediate_failures: u32) -> ReceiveOutcome {
        self.started.notify_one();
        tokio::time::sleep(Duration::from_millis(200)).await;
        self.finished.store(true, Ordering::SeqCst);
        ReceiveOutcome::Accepted
    }
}

#[tokio::test]
async fn stop_waits_for_in_flight_receives() {
    init_logging();
    let sender = transport("sender").await;
    let receiver_transport = transport("gateway-b").await;
    let receiver = Arc::new(SlowReceiver {
        started: Notify::new(),
        finished: AtomicBool::new(false),
    });
    receiver_transport
        .start(receiver.clone(), ignore_critical_errors())
        .await
        .expect("pump starts");

    let destination = receiver_transport.local_address();
    let in_flight = tokio::spawn({
        let sender = sender.clone();
        let destination = destination.clone();
        async move {
            sender
                .dispatch(&destination, &envelope_with_awkward_headers())
                .await
        }
    });

    receiver.started.notified().await;
    receiver_transport.stop().await.expect("pump stops");
    assert!(receiver.finished.load(Ordering::SeqCst));
    assert_eq!(in_flight.await.expect("dispatch task"), Ok(()));

    assert!(matches!(
        sender
            .dispatch(&destination, &envelope_with_awkward_headers())
            .await,
        Err(GatewayError::Transport(_))
    ));
}

/// Tracks how many receives run at the same time.
#[derive(Default)]
struct OverlapCountingReceiver {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    received: AtomicUsize,
}

#[async_trait]
impl MessageReceiver for OverlapCountingReceiver {
    async fn receive(&self, _envelope: Envelope, _immediate_failures: u32) -> ReceiveOutcome {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.received.fetch_add(1, Ordering::SeqCst);
        ReceiveOutcome::Accepted
    }
}

#[tokio::test]
async fn receives_never_exceed_max_concurrency() {
    init_logging();
    let sender = transport("sender").await;
    let receiver_transport =
        transport_with("gateway-b", loopback_settings().with_max_concurrency(1)).await;
    let receiver = Arc::new(OverlapCountingReceiver::default());
    receiver_transport
        .start(receiver.clone(), ignore_critical_errors())
        .await
        .expect("pump starts");

    let destination = receiver_transport.local_address();
    let mut dispatches = JoinSet::new();
    for _ in 0..4 {
        let sender = sender.clone();
        let destination = destination.clone();
        dispatches.spawn(async move {
            sender
                .dispatch(&destination, &envelope_with_awkward_headers())
                .await
        });
    }
    while let Some(result) = dispatches.join_next().await {
        assert_eq!(result.expect("dispatch task"), Ok(()));
    }

    assert_eq!(receiver.received.load(Ordering::SeqCst), 4);
    assert_eq!(receiver.peak.load(Ordering::SeqCst), 1);
    receiver_transport.stop().await.expect("pump stops");
}

#[tokio::test]
async fn malformed_request_gets_500_and_raises_critical_error() {
    init_logging();
    let raised = Arc::new(Mutex::new(Vec::new()));
    let sink = raised.clone();
    let critical_error: CriticalErrorAction = Arc::new(move |name: &str, err: &GatewayError| {
        sink.lock()
            .expect("raised lock poisoned")
            .push(format!("{name}: {err}"));
    });
    let receiver_transport = transport_with(
        "gateway-b",
        loopback_settings().with_circuit_breaker(Duration::ZERO, Duration::ZERO),
    )
    .await;
    let receiver = ScriptedReceiver::busy_for(0);
    receiver_transport
        .start(receiver.clone(), critical_error)
        .await
        .expect("pump starts");

    let response = reqwest::Client::new()
        .post(format!("{}/msg-1", receiver_transport.local_address()))
        .header("X-NSBHttp-ImmediateFailures", "abc")
        .body("hello")
        .send()
        .await
        .expect("pump answers");

    assert_eq!(response.status(), reqwest::StatusCode::INTERNAL_SERVER_ERROR);
    assert!(receiver.attempts().is_empty());
    assert_eq!(
        *raised.lock().expect("raised lock poisoned"),
        vec!["Receive: Invalid X-NSBHttp-ImmediateFailures header value \"abc\"".to_string()]
    );
    receiver_transport.stop().await.expect("pump stops");
}

#[tokio::test]
async fn restarted_transport_listens_on_the_same_address() {
    init_logging();
    let sender = transport("sender").await;
    let receiver_transport = transport("gateway-b").await;
    let receiver = ScriptedReceiver::busy_for(0);

    receiver_transport
        .start(receiver.clone(), ignore_critical_errors())
        .await
        .expect("pump starts");
    receiver_transport.stop().await.expect("pump stops");
    receiver_transport
        .start(receiver.clone(), ignore_critical_errors())
        .await
        .expect("pump restarts");

    sender
        .dispatch(
            &receiver_transport.local_address(),
            &envelope_with_awkward_headers(),
        )
        .await
        .expect("delivered after restart");
    assert_eq!(receiver.attempts().len(), 1);
    receiver_transport.stop().await.expect("pump stops");
}

#[tokio::test]
async fn instance_addresses_follow_host_and_port_properties() {
    let transport = transport("gateway-b").await;

    let instance = EndpointInstance::new("Receiver")
        .with_discriminator("1")
        .with_property("Host", "box-7")
        .with_property("Port", "9000");

    assert_eq!(
        transport.to_transport_address(&instance),
        Ok("http://box-7:9000/Receiver-1".to_string())
    );
    assert_eq!(
        transport.local_address(),
        format!("http://127.0.0.1:{}/gateway-b", transport.bound_to().port())
    );
}

#[tokio::test]
async fn gateways_bridge_sites_over_http() {
    init_logging();
    let site_a = InMemoryBus::new("site-a");
    let site_b = InMemoryBus::new("site-b");
    let tunnel_a = transport("gateway-a").await;
    let tunnel_b = transport("gateway-b").await;

    let mut config_a = GatewayConfiguration::new("gateway-a", "SiteA");
    config_a.configure_remote_site("SiteB", &tunnel_b.local_address());
    let gateway_a = config_a
        .build(site_a.transport("gateway-a"), tunnel_a.clone())
        .expect("valid configuration");

    let mut config_b = GatewayConfiguration::new("gateway-b", "SiteB");
    config_b
        .configure_remote_site("SiteA", &tunnel_a.local_address())
        .forward_to_endpoint(MessageType::new("Ns", "MyMessage", "Asm"), "Receiver")
        .expect("valid forwarding rule");
    let gateway_b = config_b
        .build(site_b.transport("gateway-b"), tunnel_b.clone())
        .expect("valid configuration");

    gateway_a.start().await.expect("gateway A starts");
    gateway_b.start().await.expect("gateway B starts");

    let envelope = Envelope::new("msg-1", Headers::new(), b"hello".to_vec())
        .with_header(headers::DESTINATION_SITES, "SiteB")
        .with_header(headers::ENCLOSED_MESSAGE_TYPES, "Ns.MyMessage, Asm")
        .with_header(headers::REPLY_TO_ADDRESS, "Sender");
    site_a
        .send("gateway-a", envelope)
        .await
        .expect("accepted by gateway A");

    let delivered = site_b.delivered("Receiver");
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].id, "msg-1");
    assert_eq!(delivered[0].body.as_ref(), b"hello");
    assert_eq!(delivered[0].header(headers::SOURCE_SITE), Some("SiteA"));
    assert_eq!(
        delivered[0].header(headers::ORIGINAL_REPLY_TO_ADDRESS),
        Some("Sender")
    );

    gateway_b.stop().await.expect("gateway B stops");
    gateway_a.stop().await.expect("gateway A stops");
}
