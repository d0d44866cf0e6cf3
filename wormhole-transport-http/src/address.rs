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

//! Tunnel addresses: `http://{host}:{port}/{endpoint}[-{discriminator}][/{qualifier}]`.

use wormhole_gateway::{EndpointInstance, GatewayError};

pub const DEFAULT_PORT: u16 = 7777;

/// Instance property overriding the host of a generated address.
pub const HOST_PROPERTY: &str = "Host";
/// Instance property overriding the port of a generated address.
pub const PORT_PROPERTY: &str = "Port";

const HTTP_SCHEME: &str = "http://";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AddressParser {
    default_host: String,
    default_port: u16,
}

impl AddressParser {
    pub fn new(default_host: impl Into<String>, default_port: u16) -> Self {
        Self {
            default_host: default_host.into(),
            default_port,
        }
    }

    pub fn default_host(&self) -> &str {
        &self.default_host
    }

    pub fn default_port(&self) -> u16 {
        self.default_port
    }

    /// Base URL for `address`: an `http://` address as given minus trailing `/`, anything
    /// else is a queue name on the default host and port.
    pub fn parse_address(&self, address: &str) -> String {
        if address.starts_with(HTTP_SCHEME) {
            address.trim_end_matches('/').to_string()
        } else {
            format!(
                "{HTTP_SCHEME}{}:{}/{}",
                self.default_host, self.default_port, address
            )
        }
    }

    pub fn generate_address(
        &self,
        instance: &EndpointInstance,
        qualifier: Option<&str>,
    ) -> Result<String, GatewayError> {
        let host = instance
            .property(HOST_PROPERTY)
            .unwrap_or(self.default_host.as_str());
        let port = match instance.property(PORT_PROPERTY) {
            Some(port) => parse_port(port)?,
            None => self.default_port,
        };

        let mut address = format!("{HTTP_SCHEME}{host}:{port}/{}", instance.endpoint);
        if let Some(discriminator) = &instance.discriminator {
            address.push('-');
            address.push_str(discriminator);
        }
        if let Some(qualifier) = qualifier {
            address.push('/');
            address.push_str(qualifier);
        }
        Ok(address)
    }
}

/// Path component of a parsed address, `/` when it has none.
pub(crate) fn path_of(parsed_address: &str) -> &str {
    let without_scheme = parsed_address
        .strip_prefix(HTTP_SCHEME)
        .unwrap_or(parsed_address);
    match without_scheme.find('/') {
        Some(start) => &without_scheme[start..],
        None => "/",
    }
}

fn parse_port(value: &str) -> Result<u16, GatewayError> {
    match value.trim().parse::<u16>() {
        Ok(port) if port > 0 => Ok(port),
        _ => Err(GatewayError::configuration(
            "Port number has to be an integer between 1 and 65535",
        )),
    }
}
