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

use crate::control_plane::endpoint_instances::EndpointInstance;
use crate::routing::message_type::MessageTypeSpec;

/// Where matching messages go.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Route {
    ToInstance(EndpointInstance),
    ToPhysicalAddress(String),
    ToEndpoint(String),
}

impl Route {
    /// Logical endpoint this route delivers to, if any.
    pub fn endpoint_name(&self) -> Option<&str> {
        match self {
            Route::ToInstance(instance) => Some(instance.endpoint.as_str()),
            Route::ToEndpoint(endpoint) => Some(endpoint.as_str()),
            Route::ToPhysicalAddress(_) => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RoutingEntry {
    pub type_spec: MessageTypeSpec,
    pub route: Route,
}

impl RoutingEntry {
    pub fn new(type_spec: impl Into<MessageTypeSpec>, route: Route) -> Self {
        Self {
            type_spec: type_spec.into(),
            route,
        }
    }
}

/// Routes that matched one concrete message type, sharing a logical endpoint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteGroup {
    pub endpoint_name: Option<String>,
    pub routes: Vec<Route>,
}
