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

//! # wormhole-site-routing
//!
//! Endpoint-side helpers for sending through a wormhole gateway.
//!
//! An endpoint registers which message types cross to other sites and how to pick the
//! sites for each message. Before sending, [`SiteRouting::enrich`] stamps the
//! `Wormhole.DestinationSites` header, and the message is sent to the local gateway
//! ([`SiteRouting::destination_for`]). When handling a message that came through the
//! tunnel, [`apply_reply_routing`] makes a reply find its way back to the sender.
//!
//! ```
//! use wormhole_gateway::{headers, Headers};
//! use wormhole_site_routing::SiteRouting;
//!
//! struct PlaceOrder {
//!     region: String,
//! }
//!
//! let mut routing = SiteRouting::new("gateway");
//! routing.route_to_site_by::<PlaceOrder, _>(|order| format!("Site{}", order.region));
//!
//! let mut outgoing = Headers::new();
//! let order = PlaceOrder { region: "B".to_string() };
//! assert!(routing.enrich(&order, &mut outgoing).unwrap());
//! assert_eq!(outgoing.get(headers::DESTINATION_SITES).map(String::as_str), Some("SiteB"));
//! assert_eq!(routing.destination_for::<PlaceOrder>(), Some("gateway"));
//! ```

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use tracing::debug;
use wormhole_gateway::{headers, GatewayError, Headers};

const SITE_ROUTING_TAG: &str = "SiteRouting:";
const SITE_ROUTING_FN_ENRICH_TAG: &str = "enrich():";

type SiteSelector = Box<dyn Fn(&dyn Any) -> Vec<String> + Send + Sync>;

struct RoutedType {
    type_name: &'static str,
    select_sites: SiteSelector,
}

/// Message type → site selector registry for one endpoint.
pub struct SiteRouting {
    gateway_address: String,
    routed_types: HashMap<TypeId, RoutedType>,
}

impl SiteRouting {
    /// `gateway_address` is the local-bus address of this site's gateway.
    pub fn new(gateway_address: &str) -> Self {
        Self {
            gateway_address: gateway_address.to_string(),
            routed_types: HashMap::new(),
        }
    }

    pub fn gateway_address(&self) -> &str {
        &self.gateway_address
    }

    /// Every `T` goes to `site`.
    pub fn route_to_site<T: Any>(&mut self, site: &str) -> Result<&mut Self, GatewayError> {
        validate_site(site)?;
        let site = site.to_string();
        Ok(self.route_to_sites_by::<T, _>(move |_| vec![site.clone()]))
    }

    /// Each `T` goes to the site `select` picks for it.
    pub fn route_to_site_by<T, F>(&mut self, select: F) -> &mut Self
    where
        T: Any,
        F: Fn(&T) -> String + Send + Sync + 'static,
    {
        self.route_to_sites_by::<T, _>(move |message| vec![select(message)])
    }

    /// Each `T` goes to every site `select` lists for it.
    pub fn route_to_sites_by<T, F>(&mut self, select: F) -> &mut Self
    where
        T: Any,
        F: Fn(&T) -> Vec<String> + Send + Sync + 'static,
    {
        let select_sites: SiteSelector = Box::new(move |message: &dyn Any| {
            message
                .downcast_ref::<T>()
                .map(&select)
                .unwrap_or_default()
        });
        self.routed_types.insert(
            TypeId::of::<T>(),
            RoutedType {
                type_name: type_name::<T>(),
                select_sites,
            },
        );
        self
    }

    pub fn is_routed<T: Any>(&self) -> bool {
        self.routed_types.contains_key(&TypeId::of::<T>())
    }

    /// The gateway address when `T` is routed to other sites.
    pub fn destination_for<T: Any>(&self) -> Option<&str> {
        self.is_routed::<T>()
            .then_some(self.gateway_address.as_str())
    }

    /// Stamps the destination-sites header for `message`.
    ///
    /// Returns `Ok(false)` and leaves `headers` alone when `T` is not routed to other sites.
    pub fn enrich<T: Any>(
        &self,
        message: &T,
        outgoing: &mut Headers,
    ) -> Result<bool, GatewayError> {
        let Some(routed) = self.routed_types.get(&TypeId::of::<T>()) else {
            return Ok(false);
        };

        let sites = (routed.select_sites)(message);
        if sites.is_empty() {
            return Err(GatewayError::protocol(format!(
                "No destination site selected for message of type {}",
                routed.type_name
            )));
        }
        for site in &sites {
            validate_site(site)?;
        }

        let destination_sites = sites.join(";");
        debug!(
            "{}:{} {} -> {}",
            SITE_ROUTING_TAG, SITE_ROUTING_FN_ENRICH_TAG, routed.type_name, destination_sites
        );
        outgoing.insert(headers::DESTINATION_SITES.to_string(), destination_sites);
        Ok(true)
    }
}

fn validate_site(site: &str) -> Result<(), GatewayError> {
    if site.is_empty() {
        return Err(GatewayError::protocol("Site name cannot be empty."));
    }
    if site.contains(';') {
        return Err(GatewayError::protocol("Site name cannot contain a semicolon."));
    }
    Ok(())
}

/// Routes a reply to a message that arrived through the tunnel back to its sender.
///
/// Sets the destination site to the incoming message's source site and the explicit
/// destination to the sender's original reply-to address. Returns `false` and leaves
/// `outgoing` alone when `incoming` did not come through a gateway.
pub fn apply_reply_routing(incoming: &Headers, outgoing: &mut Headers) -> bool {
    let (Some(source_site), Some(reply_to)) = (
        incoming.get(headers::SOURCE_SITE),
        incoming.get(headers::ORIGINAL_REPLY_TO_ADDRESS),
    ) else {
        return false;
    };

    outgoing.insert(headers::DESTINATION_SITES.to_string(), source_site.clone());
    outgoing.insert(headers::DESTINATION.to_string(), reply_to.clone());
    true
}
