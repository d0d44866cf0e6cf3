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

//! Read-only JSON description of one gateway.
//!
//! ```json
//! {
//!     "name": "gateway-b",
//!     "site": "SiteB",
//!     "sites": { "SiteA": "http://gateway-a.example:7777/gateway-a" },
//!     "forwarding": [
//!         { "message_type": "Orders.PlaceOrder, Orders", "endpoint": "Sales" },
//!         { "assembly": "Billing", "endpoint": "Billing" },
//!         { "assembly": "Orders", "namespace": "Orders.Events", "endpoint": "Audit" }
//!     ],
//!     "instances": [{ "endpoint": "Sales", "discriminator": "1" }],
//!     "poison_queue": "poison",
//!     "immediate_retries": 5
//! }
//! ```

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs::{self, canonicalize};
use std::path::{Path, PathBuf};
use tracing::debug;
use wormhole_gateway::{EndpointInstance, GatewayConfiguration, GatewayError, MessageType};

const STATIC_GATEWAY_CONFIG_TAG: &str = "StaticGatewayConfig:";
const STATIC_GATEWAY_CONFIG_FN_FROM_FILE_TAG: &str = "from_file():";
const STATIC_GATEWAY_CONFIG_FN_APPLY_TAG: &str = "apply():";

/// Source key for endpoint instances read from a static file.
pub const STATIC_INSTANCES_SOURCE: &str = "StaticConfiguration";

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct StaticGatewayConfig {
    pub name: String,
    pub site: String,
    /// Remote site name → tunnel address of its gateway.
    #[serde(default)]
    pub sites: BTreeMap<String, String>,
    #[serde(default)]
    pub forwarding: Vec<ForwardingRule>,
    #[serde(default)]
    pub instances: Vec<InstanceEntry>,
    pub poison_queue: Option<String>,
    pub immediate_retries: Option<u32>,
}

/// Either `message_type`, or `assembly` with an optional `namespace`.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ForwardingRule {
    pub message_type: Option<String>,
    pub assembly: Option<String>,
    pub namespace: Option<String>,
    pub endpoint: String,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct InstanceEntry {
    pub endpoint: String,
    pub discriminator: Option<String>,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

impl StaticGatewayConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, GatewayError> {
        let path = PathBuf::from(path.as_ref());
        let canonical = canonicalize(&path).map_err(|error| {
            GatewayError::configuration(format!(
                "Static gateway config {} not found: {error}",
                path.display()
            ))
        })?;
        debug!(
            "{}:{} reading {}",
            STATIC_GATEWAY_CONFIG_TAG,
            STATIC_GATEWAY_CONFIG_FN_FROM_FILE_TAG,
            canonical.display()
        );

        let data = fs::read_to_string(&canonical).map_err(|error| {
            GatewayError::configuration(format!(
                "Unable to read {}: {error}",
                canonical.display()
            ))
        })?;
        Self::from_json(&data)
    }

    pub fn from_json(json: &str) -> Result<Self, GatewayError> {
        serde_json::from_str(json)
            .map_err(|error| GatewayError::configuration(format!("Unable to parse JSON: {error}")))
    }

    /// A builder named and placed after this file, with everything in it applied.
    pub fn gateway_configuration(&self) -> Result<GatewayConfiguration, GatewayError> {
        let mut config = GatewayConfiguration::new(&self.name, &self.site);
        self.apply(&mut config)?;
        Ok(config)
    }

    /// Adds sites, forwarding rules, endpoint instances and error-handling overrides to
    /// `config`. Nothing is applied when any rule is invalid.
    pub fn apply(&self, config: &mut GatewayConfiguration) -> Result<(), GatewayError> {
        let instances = self
            .instances
            .iter()
            .map(InstanceEntry::to_instance)
            .collect::<Result<Vec<_>, _>>()?;
        for (index, rule) in self.forwarding.iter().enumerate() {
            rule.validate()
                .map_err(|error| invalid_rule(index, &error))?;
        }

        debug!(
            "{}:{}:{} {} site(s), {} forwarding rule(s), {} instance(s)",
            config.name(),
            STATIC_GATEWAY_CONFIG_TAG,
            STATIC_GATEWAY_CONFIG_FN_APPLY_TAG,
            self.sites.len(),
            self.forwarding.len(),
            instances.len()
        );

        for (site, address) in &self.sites {
            config.configure_remote_site(site, address);
        }
        for (index, rule) in self.forwarding.iter().enumerate() {
            rule.apply(config)
                .map_err(|error| invalid_rule(index, &error))?;
        }
        if !instances.is_empty() {
            config
                .endpoint_instances()
                .add_or_replace_instances(STATIC_INSTANCES_SOURCE, instances);
        }
        if let Some(poison_queue) = &self.poison_queue {
            config.poison_queue(poison_queue);
        }
        if let Some(immediate_retries) = self.immediate_retries {
            config.immediate_retries(immediate_retries);
        }
        Ok(())
    }
}

impl ForwardingRule {
    fn validate(&self) -> Result<(), GatewayError> {
        if self.endpoint.is_empty() || self.endpoint.contains('@') {
            return Err(GatewayError::configuration(format!(
                "'{}' is not a logical endpoint name",
                self.endpoint
            )));
        }
        match (&self.message_type, &self.assembly, &self.namespace) {
            (Some(message_type), None, None) => MessageType::parse(message_type).map(|_| ()),
            (None, Some(assembly), _) if !assembly.is_empty() => Ok(()),
            (None, None, _) => Err(GatewayError::configuration(
                "Either 'message_type' or 'assembly' is required",
            )),
            (Some(_), _, _) => Err(GatewayError::configuration(
                "'message_type' cannot be combined with 'assembly' or 'namespace'",
            )),
            (None, Some(_), _) => Err(GatewayError::configuration("'assembly' cannot be empty")),
        }
    }

    fn apply(&self, config: &mut GatewayConfiguration) -> Result<(), GatewayError> {
        self.validate()?;
        match (&self.message_type, &self.assembly, &self.namespace) {
            (Some(message_type), _, _) => {
                config.forward_to_endpoint(MessageType::parse(message_type)?, &self.endpoint)?;
            }
            (None, Some(assembly), Some(namespace)) => {
                config.forward_namespace_to_endpoint(assembly, namespace, &self.endpoint)?;
            }
            (None, Some(assembly), None) => {
                config.forward_assembly_to_endpoint(assembly, &self.endpoint)?;
            }
            (None, None, _) => {}
        }
        Ok(())
    }
}

impl InstanceEntry {
    fn to_instance(&self) -> Result<EndpointInstance, GatewayError> {
        if self.endpoint.is_empty() {
            return Err(GatewayError::configuration(
                "Endpoint instance entries need a non-empty 'endpoint'",
            ));
        }
        let mut instance = EndpointInstance::new(self.endpoint.as_str());
        if let Some(discriminator) = &self.discriminator {
            instance = instance.with_discriminator(discriminator.as_str());
        }
        for (key, value) in &self.properties {
            instance = instance.with_property(key.as_str(), value.as_str());
        }
        Ok(instance)
    }
}

fn invalid_rule(index: usize, error: &GatewayError) -> GatewayError {
    GatewayError::configuration(format!("Invalid forwarding rule #{index}: {error}"))
}
