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

//! Gateway error taxonomy.

use thiserror::Error;

/// A message could not be mapped to any destination.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RoutingError {
    #[error("No route specified for message type(s) {types}")]
    NoRoute { types: String },

    #[error("Cannot resolve addresses of one or more sites: {}.", .sites.join(","))]
    UnresolvedSites { sites: Vec<String> },
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum GatewayError {
    #[error(transparent)]
    Routing(#[from] RoutingError),

    /// The remote side rejected a delivery or the network failed in a way retries cannot fix.
    #[error("{0}")]
    Transport(String),

    /// Malformed input: missing required header, bad address, undecodable payload.
    #[error("{0}")]
    Protocol(String),

    #[error("{0}")]
    Configuration(String),
}

impl GatewayError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Short stable label used in structured log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::Routing(_) => "routing",
            GatewayError::Transport(_) => "transport",
            GatewayError::Protocol(_) => "protocol",
            GatewayError::Configuration(_) => "configuration",
        }
    }
}
