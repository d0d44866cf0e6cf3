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

use futures::future::join_all;
use integration_test_utils::{init_logging, message, InMemoryBus};
use std::sync::Arc;
use wormhole_gateway::{
    headers, EndpointInstance, Envelope, GatewayConfiguration, Headers, MessageType, Route,
    RoutingEntry, WormholeGateway,
};
use wormhole_site_routing::apply_reply_routing;

struct Site {
    bus: Arc<InMemoryBus>,
    gateway: WormholeGateway,
}

fn my_message() -> MessageType {
    MessageType::new("Ns", "MyMessage", "Asm")
}

/// Builds and starts the gateway of `site`, reachable on the tunnel as `gateway-{site}`.
async fn start_site(
    tunnel: &Arc<InMemoryBus>,
    site: &str,
    configure: impl FnOnce(&mut GatewayConfiguration),
) -> Site {
    let queue = format!("gateway-{site}");
    let bus = InMemoryBus::new(site);
    let mut config = GatewayConfiguration::new(&queue, site);
    configure(&mut config);

    let gateway = config
        .build(bus.transport(&queue), tunnel.transport(&queue))
        .expect("valid gateway configuration");
    gateway.start().await.expect("gateway starts");
    Site { bus, gateway }
}

fn with_remote_sites(config: &mut GatewayConfiguration, sites: &[&str]) {
    for site in sites {
        config.configure_remote_site(site, &format!("gateway-{site}"));
    }
}

fn forwarding_my_message(config: &mut GatewayConfiguration) {
    config
        .forward_to_endpoint(my_message(), "Receiver")
        .expect("valid forwarding rule");
}

fn outbound(destination_sites: &str, enclosed_types: &str) -> Envelope {
    message(enclosed_types).with_header(headers::DESTINATION_SITES, destination_sites)
}

#[tokio::test]
async fn message_for_site_b_never_reaches_site_c() {
    init_logging();
    let tunnel = InMemoryBus::new("tunnel");
    let a = start_site(&tunnel, "SiteA", |config| {
        with_remote_sites(config, &["SiteB", "SiteC"])
    })
    .await;
    let b = start_site(&tunnel, "SiteB", forwarding_my_message).await;
    let c = start_site(&tunnel, "SiteC", forwarding_my_message).await;

    a.bus
        .send("gateway-SiteA", outbound("SiteB", "Ns.MyMessage, Asm"))
        .await
        .expect("accepted by gateway A");

    assert_eq!(tunnel.receive_attempts("gateway-SiteB"), 1);
    assert_eq!(tunnel.receive_attempts("gateway-SiteC"), 0);

    let delivered = b.bus.delivered("Receiver");
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].header(headers::SOURCE_SITE), Some("SiteA"));
    assert_eq!(delivered[0].header(headers::DESTINATION_SITES), None);
    assert!(c.bus.delivered("Receiver").is_empty());

    for site in [a, b, c] {
        site.gateway.stop().await.expect("gateway stops");
    }
}

#[tokio::test]
async fn unroutable_tunnel_message_lands_in_poison_after_five_retries() {
    init_logging();
    let tunnel = InMemoryBus::new("tunnel");
    let a = start_site(&tunnel, "SiteA", |config| with_remote_sites(config, &["SiteB"])).await;
    let b = start_site(&tunnel, "SiteB", |_| {}).await;

    a.bus
        .send("gateway-SiteA", outbound("SiteB", "Ns.MyMessage;Asm"))
        .await
        .expect("accepted by gateway A");

    assert_eq!(b.bus.receive_attempts("gateway-SiteB"), 6);
    let poisoned = b.bus.delivered("poison");
    assert_eq!(poisoned.len(), 1);
    assert_eq!(
        poisoned[0].header(headers::FAILURE_REASON),
        Some("No route specified for message type(s) Ns.MyMessage;Asm")
    );
    assert_eq!(poisoned[0].header(headers::SOURCE_SITE), Some("SiteA"));
}

#[tokio::test]
async fn unknown_destination_site_is_poisoned_at_the_sending_gateway() {
    init_logging();
    let tunnel = InMemoryBus::new("tunnel");
    let a = start_site(&tunnel, "SiteA", |config| with_remote_sites(config, &["SiteB"])).await;

    a.bus
        .send("gateway-SiteA", outbound("SiteX", "Ns.MyMessage, Asm"))
        .await
        .expect("accepted by gateway A");

    let poisoned = a.bus.delivered("poison");
    assert_eq!(poisoned.len(), 1);
    assert_eq!(
        poisoned[0].header(headers::FAILURE_REASON),
        Some("Cannot resolve addresses of one or more sites: SiteX.")
    );
    assert_eq!(tunnel.receive_attempts("gateway-SiteB"), 0);
}

#[tokio::test]
async fn reply_retraces_the_tunnel_to_the_original_sender() {
    init_logging();
    let tunnel = InMemoryBus::new("tunnel");
    let a = start_site(&tunnel, "SiteA", |config| with_remote_sites(config, &["SiteB"])).await;
    let b = start_site(&tunnel, "SiteB", |config| {
        with_remote_sites(config, &["SiteA"]);
        forwarding_my_message(config);
    })
    .await;

    let request = outbound("SiteB", "Ns.MyMessage, Asm")
        .with_header(headers::REPLY_TO_ADDRESS, "Sender");
    a.bus
        .send("gateway-SiteA", request)
        .await
        .expect("accepted by gateway A");

    let received = b.bus.delivered("Receiver");
    assert_eq!(received.len(), 1);
    let received = &received[0];
    assert_eq!(received.header(headers::REPLY_TO_ADDRESS), Some("gateway-SiteB"));
    assert_eq!(
        received.header(headers::ORIGINAL_REPLY_TO_ADDRESS),
        Some("Sender")
    );

    let mut reply_headers = Headers::new();
    reply_headers.insert(
        headers::ENCLOSED_MESSAGE_TYPES.to_string(),
        "Ns.MyReply, Asm".to_string(),
    );
    assert!(apply_reply_routing(&received.headers, &mut reply_headers));
    let reply = Envelope::new("reply-1", reply_headers, b"pong".to_vec());

    let reply_to = received
        .header(headers::REPLY_TO_ADDRESS)
        .expect("reply address present");
    b.bus
        .send(reply_to, reply)
        .await
        .expect("accepted by gateway B");

    let replies = a.bus.delivered("Sender");
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].id, "reply-1");
    assert_eq!(replies[0].header(headers::SOURCE_SITE), Some("SiteB"));
    assert_eq!(replies[0].body.as_ref(), b"pong");
}

#[tokio::test]
async fn forwarded_traffic_is_balanced_across_endpoint_instances() {
    init_logging();
    let tunnel = InMemoryBus::new("tunnel");
    let a = start_site(&tunnel, "SiteA", |config| with_remote_sites(config, &["SiteB"])).await;
    let b = start_site(&tunnel, "SiteB", |config| {
        forwarding_my_message(config);
        config.endpoint_instances().add_or_replace_instances(
            "test",
            vec![
                EndpointInstance::new("Receiver").with_discriminator("1"),
                EndpointInstance::new("Receiver").with_discriminator("2"),
            ],
        );
    })
    .await;

    let sends = (0..100).map(|_| {
        a.bus
            .send("gateway-SiteA", outbound("SiteB", "Ns.MyMessage, Asm"))
    });
    for result in join_all(sends).await {
        result.expect("accepted by gateway A");
    }

    assert_eq!(b.bus.delivered("Receiver-1").len(), 50);
    assert_eq!(b.bus.delivered("Receiver-2").len(), 50);
}

#[tokio::test]
async fn routes_registered_at_runtime_take_effect_immediately() {
    init_logging();
    let tunnel = InMemoryBus::new("tunnel");
    let a = start_site(&tunnel, "SiteA", |config| with_remote_sites(config, &["SiteB"])).await;
    let b = start_site(&tunnel, "SiteB", |config| {
        config.immediate_retries(0);
    })
    .await;

    a.bus
        .send("gateway-SiteA", outbound("SiteB", "Ns.MyMessage, Asm"))
        .await
        .expect("accepted by gateway A");
    assert_eq!(b.bus.delivered("poison").len(), 1);

    assert!(b.gateway.routing_table().add_or_replace_routes(
        "discovery",
        vec![RoutingEntry::new(
            my_message(),
            Route::ToPhysicalAddress("Receiver-archive".to_string()),
        )],
    ));

    a.bus
        .send("gateway-SiteA", outbound("SiteB", "Ns.MyMessage, Asm"))
        .await
        .expect("accepted by gateway A");
    assert_eq!(b.bus.delivered("Receiver-archive").len(), 1);
}

#[tokio::test]
async fn stopped_gateway_no_longer_receives() {
    init_logging();
    let tunnel = InMemoryBus::new("tunnel");
    let a = start_site(&tunnel, "SiteA", |config| with_remote_sites(config, &["SiteB"])).await;

    a.gateway.stop().await.expect("gateway stops");
    a.bus
        .send("gateway-SiteA", outbound("SiteB", "Ns.MyMessage, Asm"))
        .await
        .expect("queued while stopped");

    assert_eq!(a.bus.receive_attempts("gateway-SiteA"), 0);
    assert_eq!(a.bus.delivered("gateway-SiteA").len(), 1);
}
