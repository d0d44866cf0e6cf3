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

//! The running gateway: two transports, two receive pipelines.

use crate::control_plane::distribution_policy::DistributionPolicy;
use crate::control_plane::endpoint_instances::EndpointInstances;
use crate::control_plane::routing_table::RoutingTable;
use crate::control_plane::site_registry::SiteRegistry;
use crate::data_plane::error_policy::{PoisonAfterRetries, RetryForever};
use crate::data_plane::gateway_handlers::{LocalFacingHandler, TunnelFacingHandler};
use crate::data_plane::receive_pipeline::ReceivePipeline;
use crate::data_plane::site_handler::SiteMessageHandler;
use crate::data_plane::tunnel_handler::TunnelMessageHandler;
use crate::error::GatewayError;
use crate::observability::events;
use crate::routing::message_router::MessageRouter;
use crate::transport::{CriticalErrorAction, GatewayTransport};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info};

const COMPONENT: &str = "gateway";

pub(crate) struct GatewayParts {
    pub(crate) name: String,
    pub(crate) site: String,
    pub(crate) sites: Arc<SiteRegistry>,
    pub(crate) routing_table: Arc<RoutingTable>,
    pub(crate) endpoint_instances: Arc<EndpointInstances>,
    pub(crate) distribution_policy: Arc<DistributionPolicy>,
    pub(crate) poison_queue: String,
    pub(crate) immediate_retries: u32,
    pub(crate) critical_error: Option<CriticalErrorAction>,
    pub(crate) local: Arc<dyn GatewayTransport>,
    pub(crate) tunnel: Arc<dyn GatewayTransport>,
}

/// Bridges one site's local bus and the tunnel shared with other sites.
///
/// Built by [`crate::GatewayConfiguration::build`].
pub struct WormholeGateway {
    name: String,
    site: String,
    local: Arc<dyn GatewayTransport>,
    tunnel: Arc<dyn GatewayTransport>,
    local_receiver: Arc<ReceivePipeline>,
    tunnel_receiver: Arc<ReceivePipeline>,
    routing_table: Arc<RoutingTable>,
    endpoint_instances: Arc<EndpointInstances>,
    distribution_policy: Arc<DistributionPolicy>,
    critical_error: CriticalErrorAction,
    running: Mutex<bool>,
}

impl WormholeGateway {
    pub(crate) fn new(parts: GatewayParts) -> Self {
        let router = Arc::new(MessageRouter::new(
            parts.routing_table.clone(),
            parts.endpoint_instances.clone(),
            parts.distribution_policy.clone(),
        ));

        let local_handler = LocalFacingHandler::new(
            SiteMessageHandler::new(&parts.site, parts.sites),
            TunnelMessageHandler::new(router),
            parts.local.clone(),
            parts.tunnel.clone(),
        );
        let local_receiver = Arc::new(ReceivePipeline::new(
            "local",
            Arc::new(local_handler),
            Arc::new(PoisonAfterRetries::new(
                parts.poison_queue,
                parts.immediate_retries,
            )),
            parts.local.clone(),
        ));
        let tunnel_receiver = Arc::new(ReceivePipeline::new(
            "tunnel",
            Arc::new(TunnelFacingHandler::new(parts.local.clone())),
            Arc::new(RetryForever),
            parts.tunnel.clone(),
        ));

        let gateway_name = parts.name.clone();
        let critical_error = parts.critical_error.unwrap_or_else(|| {
            let log_only: CriticalErrorAction = Arc::new(move |breaker: &str, err: &GatewayError| {
                error!(
                    event = events::CRITICAL_ERROR,
                    component = COMPONENT,
                    gateway = gateway_name.as_str(),
                    breaker,
                    err = %err,
                    "gateway receive loop keeps failing"
                );
            });
            log_only
        });

        Self {
            name: parts.name,
            site: parts.site,
            local: parts.local,
            tunnel: parts.tunnel,
            local_receiver,
            tunnel_receiver,
            routing_table: parts.routing_table,
            endpoint_instances: parts.endpoint_instances,
            distribution_policy: parts.distribution_policy,
            critical_error,
            running: Mutex::new(false),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn site(&self) -> &str {
        &self.site
    }

    pub fn routing_table(&self) -> Arc<RoutingTable> {
        self.routing_table.clone()
    }

    pub fn endpoint_instances(&self) -> Arc<EndpointInstances> {
        self.endpoint_instances.clone()
    }

    pub fn distribution_policy(&self) -> Arc<DistributionPolicy> {
        self.distribution_policy.clone()
    }

    pub async fn is_running(&self) -> bool {
        *self.running.lock().await
    }

    /// Starts the local side, then the tunnel side. If the tunnel side cannot start the
    /// local side is stopped again.
    pub async fn start(&self) -> Result<(), GatewayError> {
        let mut running = self.running.lock().await;
        if *running {
            return Err(GatewayError::configuration(format!(
                "Gateway {} is already running",
                self.name
            )));
        }

        info!(
            event = events::GATEWAY_STARTING,
            component = COMPONENT,
            gateway = self.name.as_str(),
            site = self.site.as_str(),
            local_address = %self.local.local_address(),
            tunnel_address = %self.tunnel.local_address(),
            "starting gateway"
        );

        self.local
            .start(self.local_receiver.clone(), self.critical_error.clone())
            .await?;

        if let Err(err) = self
            .tunnel
            .start(self.tunnel_receiver.clone(), self.critical_error.clone())
            .await
        {
            if let Err(stop_err) = self.local.stop().await {
                error!(
                    event = events::GATEWAY_STOPPED,
                    component = COMPONENT,
                    gateway = self.name.as_str(),
                    err = %stop_err,
                    "unable to stop local side after failed start"
                );
            }
            return Err(err);
        }

        *running = true;
        info!(
            event = events::GATEWAY_STARTED,
            component = COMPONENT,
            gateway = self.name.as_str(),
            site = self.site.as_str(),
            "gateway started"
        );
        Ok(())
    }

    /// Stops receiving from the tunnel first, then from the local bus. In-flight messages
    /// on both sides finish before this returns. Stopping a stopped gateway is a no-op.
    pub async fn stop(&self) -> Result<(), GatewayError> {
        let mut running = self.running.lock().await;
        if !*running {
            return Ok(());
        }

        info!(
            event = events::GATEWAY_STOPPING,
            component = COMPONENT,
            gateway = self.name.as_str(),
            "stopping gateway"
        );

        let tunnel_result = self.tunnel.stop().await;
        let local_result = self.local.stop().await;
        *running = false;

        info!(
            event = events::GATEWAY_STOPPED,
            component = COMPONENT,
            gateway = self.name.as_str(),
            "gateway stopped"
        );
        tunnel_result.and(local_result)
    }
}

#[cfg(test)]
mod tests {
    use crate::api::configuration::GatewayConfiguration;
    use crate::data_plane::test_support::RecordingTransport;

    #[tokio::test]
    async fn start_and_stop_toggle_running_state() {
        let gateway = GatewayConfiguration::new("gateway", "SiteA")
            .build(
                RecordingTransport::new("gateway"),
                RecordingTransport::new("SiteA"),
            )
            .expect("valid configuration");

        assert!(!gateway.is_running().await);
        gateway.start().await.expect("starts");
        assert!(gateway.is_running().await);
        assert!(gateway.start().await.is_err());

        gateway.stop().await.expect("stops");
        assert!(!gateway.is_running().await);
        gateway.stop().await.expect("second stop is a no-op");
    }
}
