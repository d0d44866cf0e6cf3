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

//! Logical endpoint → physical instance directory.

use crate::observability::events;
use std::collections::BTreeMap;
use std::sync::RwLock;
use tracing::debug;

const COMPONENT: &str = "endpoint_instances";

/// One physical instance of a logical endpoint.
///
/// `properties` carries transport-specific hints (the tunnel transport reads `Host` and `Port`).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct EndpointInstance {
    pub endpoint: String,
    pub discriminator: Option<String>,
    pub properties: BTreeMap<String, String>,
}

impl EndpointInstance {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            discriminator: None,
            properties: BTreeMap::new(),
        }
    }

    pub fn with_discriminator(mut self, discriminator: impl Into<String>) -> Self {
        self.discriminator = Some(discriminator.into());
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }
}

/// Lookup seam used by the router when a route names a logical endpoint.
pub trait EndpointDirectory: Send + Sync {
    fn find_instances(&self, endpoint: &str) -> Vec<EndpointInstance>;
}

/// In-process directory fed by one or more configuration sources.
///
/// Instances are listed in source-key order, then in registration order within a source.
#[derive(Default)]
pub struct EndpointInstances {
    sources: RwLock<BTreeMap<String, Vec<EndpointInstance>>>,
}

impl EndpointInstances {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces every instance previously registered under `source_key`.
    pub fn add_or_replace_instances(&self, source_key: &str, instances: Vec<EndpointInstance>) {
        let count = instances.len();
        let mut sources = match self.sources.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        sources.insert(source_key.to_string(), instances);

        debug!(
            event = events::ENDPOINT_INSTANCES_REPLACED,
            component = COMPONENT,
            source_key,
            instance_count = count,
            "replaced endpoint instances"
        );
    }
}

impl EndpointDirectory for EndpointInstances {
    /// Falls back to a single discriminator-less instance when nothing is registered,
    /// so forwarding to a logical endpoint works without an instance list.
    fn find_instances(&self, endpoint: &str) -> Vec<EndpointInstance> {
        let sources = match self.sources.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let mut found: Vec<EndpointInstance> = Vec::new();
        for instance in sources.values().flatten() {
            if instance.endpoint == endpoint && !found.contains(instance) {
                found.push(instance.clone());
            }
        }

        if found.is_empty() {
            found.push(EndpointInstance::new(endpoint));
        }
        found
    }
}
