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

//! Receive callbacks for the two sides of a gateway.

use crate::data_plane::receive_pipeline::MessageHandler;
use crate::data_plane::site_handler::SiteMessageHandler;
use crate::data_plane::tunnel_handler::TunnelMessageHandler;
use crate::envelope::{headers, Envelope};
use crate::error::GatewayError;
use crate::observability::{events, fields};
use crate::transport::GatewayTransport;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

const COMPONENT: &str = "gateway_handlers";

/// Input queue on the local bus. Carries both locally produced messages bound for other
/// sites and tunnel traffic that the tunnel side re-queued here.
pub(crate) struct LocalFacingHandler {
    site_handler: SiteMessageHandler,
    tunnel_handler: TunnelMessageHandler,
    local: Arc<dyn GatewayTransport>,
    tunnel: Arc<dyn GatewayTransport>,
}

impl LocalFacingHandler {
    pub(crate) fn new(
        site_handler: SiteMessageHandler,
        tunnel_handler: TunnelMessageHandler,
        local: Arc<dyn GatewayTransport>,
        tunnel: Arc<dyn GatewayTransport>,
    ) -> Self {
        Self {
            site_handler,
            tunnel_handler,
            local,
            tunnel,
        }
    }
}

#[async_trait]
impl MessageHandler for LocalFacingHandler {
    async fn handle(&self, envelope: Envelope) -> Result<(), GatewayError> {
        if envelope.header(headers::SOURCE_SITE).is_some() {
            self.tunnel_handler
                .handle(envelope, self.local.as_ref())
                .await
        } else {
            self.site_handler
                .handle(envelope, self.tunnel.as_ref())
                .await
        }
    }
}

/// Input queue on the tunnel. Everything arriving here is handed to the local side
/// unchanged, so routing failures surface under the local side's poison policy.
pub(crate) struct TunnelFacingHandler {
    local: Arc<dyn GatewayTransport>,
}

impl TunnelFacingHandler {
    pub(crate) fn new(local: Arc<dyn GatewayTransport>) -> Self {
        Self { local }
    }
}

#[async_trait]
impl MessageHandler for TunnelFacingHandler {
    async fn handle(&self, envelope: Envelope) -> Result<(), GatewayError> {
        let local_address = self.local.local_address();
        debug!(
            event = events::TUNNEL_FORWARD_TO_LOCAL,
            component = COMPONENT,
            msg_id = %fields::format_message_id(&envelope),
            source_site = %fields::format_source_site(&envelope),
            destination = local_address.as_str(),
            "re-queueing tunnel message locally"
        );
        self.local.dispatch(&local_address, &envelope).await
    }
}
