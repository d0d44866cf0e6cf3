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

//! Message type → physical destination addresses.

use crate::control_plane::distribution_policy::{DistributionPolicy, DistributionScope};
use crate::control_plane::endpoint_instances::{EndpointDirectory, EndpointInstance};
use crate::control_plane::routing_table::RoutingTable;
use crate::error::GatewayError;
use crate::observability::{events, fields};
use crate::routing::message_type::MessageType;
use crate::routing::route::Route;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

const COMPONENT: &str = "message_router";

pub struct MessageRouter {
    routing_table: Arc<RoutingTable>,
    directory: Arc<dyn EndpointDirectory>,
    distribution_policy: Arc<DistributionPolicy>,
}

impl MessageRouter {
    pub fn new(
        routing_table: Arc<RoutingTable>,
        directory: Arc<dyn EndpointDirectory>,
        distribution_policy: Arc<DistributionPolicy>,
    ) -> Self {
        Self {
            routing_table,
            directory,
            distribution_policy,
        }
    }

    /// Addresses that should receive one copy of a message of `message_type`.
    ///
    /// Groups without a logical endpoint contribute every address; each named endpoint
    /// contributes exactly one, chosen by its distribution strategy for `scope`. The result
    /// holds no duplicates and keeps first-seen order.
    pub fn route<F>(
        &self,
        message_type: &MessageType,
        scope: DistributionScope,
        resolve_address: F,
    ) -> Result<Vec<String>, GatewayError>
    where
        F: Fn(&EndpointInstance) -> Result<String, GatewayError>,
    {
        let groups = self.routing_table.get_routes_for(message_type);
        let mut addresses = Vec::new();

        for group in groups.iter() {
            let mut candidates = Vec::new();
            for route in &group.routes {
                candidates.extend(self.resolve_route(route, &resolve_address)?);
            }

            match group.endpoint_name.as_deref() {
                None => addresses.extend(candidates),
                Some(endpoint) => {
                    let strategy = self
                        .distribution_policy
                        .get_distribution_strategy(endpoint, scope);
                    match strategy.select_destination(&candidates) {
                        Some(address) => addresses.push(address),
                        None => warn!(
                            event = events::ROUTE_GROUP_NO_CANDIDATES,
                            component = COMPONENT,
                            endpoint,
                            message_type = %message_type,
                            "no candidate addresses for endpoint"
                        ),
                    }
                }
            }
        }

        let mut seen = HashSet::new();
        addresses.retain(|address| seen.insert(address.clone()));

        debug!(
            event = events::ROUTE_RESOLVED,
            component = COMPONENT,
            message_type = %message_type,
            addresses = %fields::format_addresses(&addresses),
            "resolved destinations"
        );
        Ok(addresses)
    }

    fn resolve_route<F>(&self, route: &Route, resolve_address: &F) -> Result<Vec<String>, GatewayError>
    where
        F: Fn(&EndpointInstance) -> Result<String, GatewayError>,
    {
        match route {
            Route::ToInstance(instance) => Ok(vec![resolve_address(instance)?]),
            Route::ToPhysicalAddress(address) => Ok(vec![address.clone()]),
            Route::ToEndpoint(endpoint) => self
                .directory
                .find_instances(endpoint)
                .iter()
                .map(resolve_address)
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::MessageRouter;
    use crate::control_plane::distribution_policy::{DistributionPolicy, DistributionScope};
    use crate::control_plane::endpoint_instances::{EndpointInstance, EndpointInstances};
    use crate::control_plane::routing_table::RoutingTable;
    use crate::error::GatewayError;
    use crate::routing::message_type::{MessageType, MessageTypeRange};
    use crate::routing::route::{Route, RoutingEntry};
    use std::collections::HashMap;
    use std::sync::Arc;

    fn my_message() -> MessageType {
        MessageType::new("Ns", "MyMessage", "Asm")
    }

    fn address_of(instance: &EndpointInstance) -> Result<String, GatewayError> {
        Ok(match &instance.discriminator {
            Some(discriminator) => format!("{}-{}", instance.endpoint, discriminator),
            None => instance.endpoint.clone(),
        })
    }

    fn router(entries: Vec<RoutingEntry>, instances: Vec<EndpointInstance>) -> MessageRouter {
        let table = Arc::new(RoutingTable::new());
        table.add_or_replace_routes("static", entries);
        let directory = Arc::new(EndpointInstances::new());
        directory.add_or_replace_instances("static", instances);
        MessageRouter::new(table, directory, Arc::new(DistributionPolicy::new()))
    }

    #[test]
    fn round_robin_splits_evenly_across_endpoint_instances() {
        let router = router(
            vec![RoutingEntry::new(
                my_message(),
                Route::ToEndpoint("Receiver".to_string()),
            )],
            vec![
                EndpointInstance::new("Receiver").with_discriminator("1"),
                EndpointInstance::new("Receiver").with_discriminator("2"),
            ],
        );

        let mut counts: HashMap<String, usize> = HashMap::new();
        for _ in 0..100 {
            let addresses = router
                .route(&my_message(), DistributionScope::Forward, address_of)
                .expect("routing succeeds");
            assert_eq!(addresses.len(), 1);
            *counts.entry(addresses[0].clone()).or_default() += 1;
        }

        assert_eq!(counts.get("Receiver-1"), Some(&50));
        assert_eq!(counts.get("Receiver-2"), Some(&50));
    }

    #[test]
    fn physical_addresses_are_all_included_and_deduplicated() {
        let router = router(
            vec![
                RoutingEntry::new(my_message(), Route::ToPhysicalAddress("a".to_string())),
                RoutingEntry::new(
                    MessageTypeRange::assembly("Asm"),
                    Route::ToPhysicalAddress("b".to_string()),
                ),
                RoutingEntry::new(
                    MessageTypeRange::namespace("Asm", "Ns"),
                    Route::ToPhysicalAddress("a".to_string()),
                ),
            ],
            Vec::new(),
        );

        let addresses = router
            .route(&my_message(), DistributionScope::Forward, address_of)
            .expect("routing succeeds");

        assert_eq!(addresses, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn each_named_endpoint_receives_exactly_one_copy() {
        let router = router(
            vec![
                RoutingEntry::new(my_message(), Route::ToEndpoint("Billing".to_string())),
                RoutingEntry::new(
                    my_message(),
                    Route::ToInstance(EndpointInstance::new("Shipping").with_discriminator("7")),
                ),
                RoutingEntry::new(
                    my_message(),
                    Route::ToInstance(EndpointInstance::new("Shipping").with_discriminator("8")),
                ),
            ],
            Vec::new(),
        );

        let addresses = router
            .route(&my_message(), DistributionScope::Forward, address_of)
            .expect("routing succeeds");

        assert_eq!(addresses, vec!["Billing".to_string(), "Shipping-7".to_string()]);
    }

    #[test]
    fn unrouted_type_yields_no_addresses() {
        let router = router(
            vec![RoutingEntry::new(
                my_message(),
                Route::ToEndpoint("Receiver".to_string()),
            )],
            Vec::new(),
        );

        let addresses = router
            .route(
                &MessageType::new("Other", "Thing", "Asm"),
                DistributionScope::Forward,
                address_of,
            )
            .expect("routing succeeds");

        assert!(addresses.is_empty());
    }

    #[test]
    fn address_generation_failure_is_propagated() {
        let router = router(
            vec![RoutingEntry::new(
                my_message(),
                Route::ToEndpoint("Receiver".to_string()),
            )],
            Vec::new(),
        );

        let result = router.route(&my_message(), DistributionScope::Forward, |_instance| {
            Err(GatewayError::protocol("bad port"))
        });

        assert_eq!(result, Err(GatewayError::protocol("bad port")));
    }
}
