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

//! Inbound path: an envelope that crossed the tunnel is delivered onto the local bus.

use crate::control_plane::distribution_policy::DistributionScope;
use crate::envelope::{headers, Envelope};
use crate::error::{GatewayError, RoutingError};
use crate::observability::{events, fields};
use crate::routing::message_router::MessageRouter;
use crate::routing::message_type::MessageType;
use crate::transport::GatewayTransport;
use std::sync::Arc;
use tracing::{debug, warn};

const COMPONENT: &str = "tunnel_handler";

pub(crate) struct TunnelMessageHandler {
    router: Arc<MessageRouter>,
}

impl TunnelMessageHandler {
    pub(crate) fn new(router: Arc<MessageRouter>) -> Self {
        Self { router }
    }

    pub(crate) async fn handle(
        &self,
        mut envelope: Envelope,
        local: &dyn GatewayTransport,
    ) -> Result<(), GatewayError> {
        let enclosed_types = envelope
            .header(headers::ENCLOSED_MESSAGE_TYPES)
            .ok_or_else(|| {
                GatewayError::protocol(format!(
                    "The message does not contain the {} header",
                    headers::ENCLOSED_MESSAGE_TYPES
                ))
            })?
            .to_string();

        // Replies must come back through this gateway; the original address travels along.
        if let Some(reply_to) = envelope.remove_header(headers::REPLY_TO_ADDRESS) {
            let gateway_address = local.local_address();
            debug!(
                event = events::TUNNEL_REPLY_TO_REWRITTEN,
                component = COMPONENT,
                msg_id = %fields::format_message_id(&envelope),
                reply_to = reply_to.as_str(),
                gateway_address = gateway_address.as_str(),
                "substituted gateway reply address"
            );
            envelope.set_header(headers::ORIGINAL_REPLY_TO_ADDRESS, reply_to);
            envelope.set_header(headers::REPLY_TO_ADDRESS, gateway_address);
        }

        if let Some(destination) = envelope.header(headers::DESTINATION).map(str::to_string) {
            debug!(
                event = events::TUNNEL_DIRECT_DISPATCH,
                component = COMPONENT,
                msg_id = %fields::format_message_id(&envelope),
                source_site = %fields::format_source_site(&envelope),
                destination = destination.as_str(),
                "dispatching to explicit destination"
            );
            return local.dispatch(&destination, &envelope).await;
        }

        let main_type = enclosed_types
            .split(';')
            .find(|qualified_name| !qualified_name.trim().is_empty())
            .ok_or_else(|| {
                GatewayError::protocol(format!(
                    "The {} header is empty",
                    headers::ENCLOSED_MESSAGE_TYPES
                ))
            })?;
        let message_type = MessageType::parse(main_type)?;

        let addresses = self.router.route(&message_type, DistributionScope::Forward, |instance| {
            local.to_transport_address(instance)
        })?;

        if addresses.is_empty() {
            warn!(
                event = events::TUNNEL_NO_ROUTE,
                component = COMPONENT,
                msg_id = %fields::format_message_id(&envelope),
                source_site = %fields::format_source_site(&envelope),
                enclosed_types = enclosed_types.as_str(),
                "no local route for tunnel message"
            );
            return Err(RoutingError::NoRoute {
                types: enclosed_types,
            }
            .into());
        }

        for address in &addresses {
            debug!(
                event = events::TUNNEL_ROUTED_DISPATCH,
                component = COMPONENT,
                msg_id = %fields::format_message_id(&envelope),
                source_site = %fields::format_source_site(&envelope),
                message_type = %message_type,
                destination = address.as_str(),
                "dispatching to routed destination"
            );
            local.dispatch(address, &envelope).await?;
        }

        Ok(())
    }
}
