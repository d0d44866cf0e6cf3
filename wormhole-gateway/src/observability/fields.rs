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

use crate::envelope::{headers, Envelope};

const NONE: &str = "none";

pub fn format_message_id(envelope: &Envelope) -> &str {
    if envelope.id.is_empty() {
        NONE
    } else {
        envelope.id.as_str()
    }
}

pub fn format_enclosed_types(envelope: &Envelope) -> &str {
    envelope
        .header(headers::ENCLOSED_MESSAGE_TYPES)
        .unwrap_or(NONE)
}

pub fn format_source_site(envelope: &Envelope) -> &str {
    envelope.header(headers::SOURCE_SITE).unwrap_or(NONE)
}

pub fn format_addresses(addresses: &[String]) -> String {
    if addresses.is_empty() {
        NONE.to_string()
    } else {
        addresses.join(",")
    }
}
