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

//! The unit of transfer handled by the gateway and its transports.

use bytes::Bytes;
use std::collections::BTreeMap;

pub type Headers = BTreeMap<String, String>;

/// Well-known header names.
///
/// `NServiceBus.*` names belong to the hosting bus and are only read or rewritten here.
/// `Wormhole.*` names are owned by the gateway bridge protocol.
pub mod headers {
    pub const MESSAGE_ID: &str = "NServiceBus.MessageId";
    pub const ENCLOSED_MESSAGE_TYPES: &str = "NServiceBus.EnclosedMessageTypes";
    pub const REPLY_TO_ADDRESS: &str = "NServiceBus.ReplyToAddress";

    /// `;`-joined list of sites an outbound message must reach.
    pub const DESTINATION_SITES: &str = "Wormhole.DestinationSites";
    /// Site that pushed the message into the tunnel.
    pub const SOURCE_SITE: &str = "Wormhole.SourceSite";
    /// Explicit local address to deliver to, bypassing type routing.
    pub const DESTINATION: &str = "Wormhole.Destination";
    /// Reply-to address as set by the sender, before the gateway substituted its own.
    pub const ORIGINAL_REPLY_TO_ADDRESS: &str = "Wormhole.ReplyToAddress";

    pub const FAILURE_REASON: &str = "Wormhole.ExceptionInfo.Message";
    pub const FAILURE_KIND: &str = "Wormhole.ExceptionInfo.Kind";
    pub const FAILED_QUEUE: &str = "Wormhole.FailedQ";
}

/// Message id, headers and opaque body.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Envelope {
    pub id: String,
    pub headers: Headers,
    pub body: Bytes,
}

impl Envelope {
    pub fn new(id: impl Into<String>, headers: Headers, body: impl Into<Bytes>) -> Self {
        Self {
            id: id.into(),
            headers,
            body: body.into(),
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.insert(name.to_string(), value.into());
    }

    pub fn remove_header(&mut self, name: &str) -> Option<String> {
        self.headers.remove(name)
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set_header(name, value);
        self
    }
}
