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

use crate::api::gateway::{GatewayParts, WormholeGateway};
use crate::control_plane::distribution_policy::DistributionPolicy;
use crate::control_plane::endpoint_instances::EndpointInstances;
use crate::control_plane::routing_table::RoutingTable;
use crate::control_plane::site_registry::SiteRegistry;
use crate::error::GatewayError;
use crate::routing::message_type::{MessageType, MessageTypeRange, MessageTypeSpec};
use crate::routing::route::{Route, RoutingEntry};
use crate::transport::{CriticalErrorAction, GatewayTransport};
use std::sync::Arc;
use tracing::debug;

const GATEWAY_CONFIGURATION_TAG: &str = "GatewayConfiguration:";
const GATEWAY_CONFIGURATION_FN_FORWARD_TAG: &str = "forward():";
const GATEWAY_CONFIGURATION_FN_BUILD_TAG: &str = "build():";

/// Source key under which forwarding rules from this builder are registered.
pub const STATIC_ROUTES_SOURCE: &str = "StaticConfiguration";
pub const DEFAULT_POISON_QUEUE: &str = "poison";
pub const DEFAULT_IMMEDIATE_RETRIES: u32 = 5;

/// Builder for a [`WormholeGateway`].
///
/// `name` is the queue name of the gateway on both of its transports; `site` is the name
/// other gateways use for this one.
pub struct GatewayConfiguration {
    name: String,
    site: String,
    sites: SiteRegistry,
    forwarding: Vec<RoutingEntry>,
    routing_table: Arc<RoutingTable>,
    endpoint_instances: Arc<EndpointInstances>,
    distribution_policy: Arc<DistributionPolicy>,
    poison_queue: String,
    immediate_retries: u32,
    critical_error: Option<CriticalErrorAction>,
}

impl GatewayConfiguration {
    pub fn new(name: &str, site: &str) -> Self {
        Self {
            name: name.to_string(),
            site: site.to_string(),
            sites: SiteRegistry::new(),
            forwarding: Vec::new(),
            routing_table: Arc::new(RoutingTable::new()),
            endpoint_instances: Arc::new(EndpointInstances::new()),
            distribution_policy: Arc::new(DistributionPolicy::new()),
            poison_queue: DEFAULT_POISON_QUEUE.to_string(),
            immediate_retries: DEFAULT_IMMEDIATE_RETRIES,
            critical_error: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn site(&self) -> &str {
        &self.site
    }

    /// Tunnel address of the gateway serving `site`.
    pub fn configure_remote_site(&mut self, site: &str, tunnel_address: &str) -> &mut Self {
        self.sites.configure_site(site, tunnel_address);
        self
    }

    /// Tunnel messages of exactly `message_type` go to the logical endpoint `destination`.
    pub fn forward_to_endpoint(
        &mut self,
        message_type: MessageType,
        destination: &str,
    ) -> Result<&mut Self, GatewayError> {
        self.forward(message_type.into(), destination)
    }

    /// Every message type of `assembly` goes to `destination`.
    pub fn forward_assembly_to_endpoint(
        &mut self,
        assembly: &str,
        destination: &str,
    ) -> Result<&mut Self, GatewayError> {
        self.forward(MessageTypeRange::assembly(assembly).into(), destination)
    }

    /// Message types of `assembly` in `namespace` or any namespace nested in it go to
    /// `destination`.
    pub fn forward_namespace_to_endpoint(
        &mut self,
        assembly: &str,
        namespace: &str,
        destination: &str,
    ) -> Result<&mut Self, GatewayError> {
        self.forward(
            MessageTypeRange::namespace(assembly, namespace).into(),
            destination,
        )
    }

    pub fn poison_queue(&mut self, queue: &str) -> &mut Self {
        self.poison_queue = queue.to_string();
        self
    }

    /// Immediate retries on the local-facing side before a message is poisoned.
    pub fn immediate_retries(&mut self, retries: u32) -> &mut Self {
        self.immediate_retries = retries;
        self
    }

    pub fn on_critical_error(&mut self, action: CriticalErrorAction) -> &mut Self {
        self.critical_error = Some(action);
        self
    }

    /// Shared with the built gateway; other sources may be registered at runtime.
    pub fn routing_table(&self) -> Arc<RoutingTable> {
        self.routing_table.clone()
    }

    pub fn endpoint_instances(&self) -> Arc<EndpointInstances> {
        self.endpoint_instances.clone()
    }

    pub fn distribution_policy(&self) -> Arc<DistributionPolicy> {
        self.distribution_policy.clone()
    }

    fn forward(
        &mut self,
        type_spec: MessageTypeSpec,
        destination: &str,
    ) -> Result<&mut Self, GatewayError> {
        if destination.is_empty() {
            return Err(GatewayError::configuration(
                "Destination endpoint name cannot be empty",
            ));
        }
        if destination.contains('@') {
            return Err(GatewayError::configuration(format!(
                "Destination '{destination}' looks like a transport address. Forwarding rules take a logical endpoint name."
            )));
        }

        debug!(
            "{}:{}:{} forwarding {:?} to {}",
            self.name,
            GATEWAY_CONFIGURATION_TAG,
            GATEWAY_CONFIGURATION_FN_FORWARD_TAG,
            type_spec,
            destination
        );
        self.forwarding.push(RoutingEntry::new(
            type_spec,
            Route::ToEndpoint(destination.to_string()),
        ));
        Ok(self)
    }

    /// Registers the forwarding rules and wires both gateway sides to their transports.
    pub fn build(
        self,
        local: Arc<dyn GatewayTransport>,
        tunnel: Arc<dyn GatewayTransport>,
    ) -> Result<WormholeGateway, GatewayError> {
        if self.name.is_empty() {
            return Err(GatewayError::configuration("Gateway name cannot be empty"));
        }
        if self.site.is_empty() || self.site.contains(';') {
            return Err(GatewayError::configuration(format!(
                "Invalid site name '{}'. Site names must be non-empty and cannot contain a semicolon.",
                self.site
            )));
        }

        debug!(
            "{}:{}:{} building gateway for site {} with {} remote site(s) and {} forwarding rule(s)",
            self.name,
            GATEWAY_CONFIGURATION_TAG,
            GATEWAY_CONFIGURATION_FN_BUILD_TAG,
            self.site,
            self.sites.len(),
            self.forwarding.len()
        );
        self.routing_table
            .add_or_replace_routes(STATIC_ROUTES_SOURCE, self.forwarding);

        Ok(WormholeGateway::new(GatewayParts {
            name: self.name,
            site: self.site,
            sites: Arc::new(self.sites),
            routing_table: self.routing_table,
            endpoint_instances: self.endpoint_instances,
            distribution_policy: self.distribution_policy,
            poison_queue: self.poison_queue,
            immediate_retries: self.immediate_retries,
            critical_error: self.critical_error,
            local,
            tunnel,
        }))
    }
}
