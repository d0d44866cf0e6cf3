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

//! Outbound path: a locally produced envelope is fanned out to the gateways of its
//! destination sites.

use crate::control_plane::site_registry::SiteRegistry;
use crate::envelope::{headers, Envelope};
use crate::error::GatewayError;
use crate::observability::{events, fields};
use crate::transport::GatewayTransport;
use std::sync::Arc;
use tracing::{debug, warn};

const COMPONENT: &str = "site_handler";

pub(crate) struct SiteMessageHandler {
    this_site: String,
    sites: Arc<SiteRegistry>,
}

impl SiteMessageHandler {
    pub(crate) fn new(this_site: &str, sites: Arc<SiteRegistry>) -> Self {
        Self {
            this_site: this_site.to_string(),
            sites,
        }
    }

    /// Either every destination site resolves and receives one copy, or nothing is sent.
    pub(crate) async fn handle(
        &self,
        mut envelope: Envelope,
        tunnel: &dyn GatewayTransport,
    ) -> Result<(), GatewayError> {
        let destination_sites = envelope
            .header(headers::DESTINATION_SITES)
            .ok_or_else(|| {
                GatewayError::protocol(format!(
                    "Message has no '{}' header.",
                    headers::DESTINATION_SITES
                ))
            })?
            .to_string();

        let site_list = destination_sites
            .split(';')
            .filter(|site| !site.is_empty());

        let addresses = self.sites.resolve_all(site_list).map_err(|err| {
            warn!(
                event = events::SITE_RESOLUTION_FAILED,
                component = COMPONENT,
                msg_id = %fields::format_message_id(&envelope),
                destination_sites = %destination_sites,
                err = %err,
                "unable to resolve destination sites"
            );
            err
        })?;

        envelope.remove_header(headers::DESTINATION_SITES);
        envelope.set_header(headers::SOURCE_SITE, self.this_site.as_str());

        for address in &addresses {
            debug!(
                event = events::SITE_DISPATCH,
                component = COMPONENT,
                msg_id = %fields::format_message_id(&envelope),
                site = self.this_site.as_str(),
                destination = address.as_str(),
                "dispatching to remote site"
            );
            tunnel.dispatch(address, &envelope).await?;
        }

        Ok(())
    }
}
