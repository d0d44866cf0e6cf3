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

//! # wormhole-gateway
//!
//! `wormhole-gateway` bridges message-bus sites that cannot address each other directly.
//! Each site runs one [`WormholeGateway`] with two transports: one on the local bus and
//! one on the tunnel shared with the other sites' gateways.
//!
//! - A locally produced envelope carrying a `Wormhole.DestinationSites` header is sent once
//!   to the gateway of every listed site.
//! - An envelope arriving from the tunnel is routed by its first enclosed message type
//!   and delivered onto the local bus. Its reply-to address is swapped for the gateway's
//!   own, so replies cross back the same way.
//!
//! ## Two sites over an in-memory tunnel
//!
//! ```
//! use integration_test_utils::InMemoryBus;
//! use wormhole_gateway::{headers, Envelope, GatewayConfiguration, Headers, MessageType};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let site_a = InMemoryBus::new("site-a");
//! let site_b = InMemoryBus::new("site-b");
//! let tunnel = InMemoryBus::new("tunnel");
//!
//! let mut config_a = GatewayConfiguration::new("gateway-a", "SiteA");
//! config_a.configure_remote_site("SiteB", "gateway-b");
//! let gateway_a = config_a
//!     .build(site_a.transport("gateway-a"), tunnel.transport("gateway-a"))
//!     .unwrap();
//!
//! let mut config_b = GatewayConfiguration::new("gateway-b", "SiteB");
//! config_b
//!     .forward_to_endpoint(MessageType::new("Ns", "MyMessage", "Asm"), "Receiver")
//!     .unwrap();
//! let gateway_b = config_b
//!     .build(site_b.transport("gateway-b"), tunnel.transport("gateway-b"))
//!     .unwrap();
//!
//! gateway_a.start().await.unwrap();
//! gateway_b.start().await.unwrap();
//!
//! let envelope = Envelope::new("msg-1", Headers::new(), b"hello".to_vec())
//!     .with_header(headers::DESTINATION_SITES, "SiteB")
//!     .with_header(headers::ENCLOSED_MESSAGE_TYPES, "Ns.MyMessage, Asm");
//! site_a.send("gateway-a", envelope).await.unwrap();
//!
//! let delivered = site_b.delivered("Receiver");
//! assert_eq!(delivered.len(), 1);
//! assert_eq!(delivered[0].header(headers::SOURCE_SITE), Some("SiteA"));
//!
//! gateway_b.stop().await.unwrap();
//! gateway_a.stop().await.unwrap();
//! # });
//! ```
//!
//! ## Internal architecture map
//!
//! - API facade: [`GatewayConfiguration`] and [`WormholeGateway`]
//! - Control plane: routing table, endpoint instances, distribution policy, site registry
//! - Routing: message-type matching, the message router, TLV packing
//! - Data plane: site fan-out, tunnel delivery, receive pipelines and error policies
//! - Transport seam: [`GatewayTransport`], implemented by `wormhole-transport-http` for the
//!   tunnel and by the hosting bus for the local side
//!
//! ## Observability model
//!
//! The workspace uses `tracing` for logs/events. Library code emits structured events
//! tagged with `event` and `component` fields and never installs a global subscriber;
//! binaries and tests initialize `tracing_subscriber` once at process start.

mod api;
pub use api::configuration::{
    GatewayConfiguration, DEFAULT_IMMEDIATE_RETRIES, DEFAULT_POISON_QUEUE, STATIC_ROUTES_SOURCE,
};
pub use api::gateway::WormholeGateway;

mod control_plane;
pub use control_plane::distribution_policy::{
    DistributionPolicy, DistributionScope, DistributionStrategy, RoundRobinDistributionStrategy,
};
pub use control_plane::endpoint_instances::{EndpointDirectory, EndpointInstance, EndpointInstances};
pub use control_plane::routing_table::RoutingTable;
pub use control_plane::site_registry::SiteRegistry;

mod data_plane;

mod envelope;
pub use envelope::{headers, Envelope, Headers};

mod error;
pub use error::{GatewayError, RoutingError};

#[doc(hidden)]
pub mod observability;

mod routing;
pub use routing::message_router::MessageRouter;
pub use routing::message_type::{MessageType, MessageTypeRange, MessageTypeSpec};
pub use routing::route::{Route, RouteGroup, RoutingEntry};
pub use routing::tlv;

mod transport;
pub use transport::{CriticalErrorAction, Dispatch, GatewayTransport, MessageReceiver, ReceiveOutcome};
