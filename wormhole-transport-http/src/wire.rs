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

//! Logical headers ↔ HTTP headers.
//!
//! Each logical header travels as `X-NSB-{name}: {value}`, both parts percent-encoded.
//! Uppercase letters in the name are escaped too, since HTTP header names are
//! case-insensitive and arrive lowercased.

use hyper::header::{HeaderMap, HeaderName, HeaderValue};
use std::fmt::Write;
use wormhole_gateway::{GatewayError, Headers};

pub const HEADER_PREFIX: &str = "X-NSB-";
/// Number of busy responses the sender already received for this message.
pub const IMMEDIATE_FAILURES_HEADER: &str = "X-NSBHttp-ImmediateFailures";

pub(crate) fn encode_headers(headers: &Headers) -> Result<HeaderMap, GatewayError> {
    let mut encoded = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let header_name = HeaderName::from_bytes(encode_header_name(name).as_bytes())
            .map_err(|err| GatewayError::protocol(format!("Invalid header name '{name}': {err}")))?;
        let header_value = HeaderValue::from_str(&urlencoding::encode(value)).map_err(|err| {
            GatewayError::protocol(format!("Invalid value for header '{name}': {err}"))
        })?;
        encoded.insert(header_name, header_value);
    }
    Ok(encoded)
}

/// Logical headers carried by `headers`; unrelated HTTP headers are skipped.
pub(crate) fn decode_headers(headers: &HeaderMap) -> Result<Headers, GatewayError> {
    let mut decoded = Headers::new();
    for (name, value) in headers {
        let Some(encoded_name) = strip_prefix_ignore_case(name.as_str(), HEADER_PREFIX) else {
            continue;
        };
        let name = urlencoding::decode(encoded_name)
            .map_err(|err| GatewayError::protocol(format!("Undecodable header name '{encoded_name}': {err}")))?;
        let value = value
            .to_str()
            .map_err(|err| GatewayError::protocol(format!("Invalid value for header '{name}': {err}")))?;
        let value = urlencoding::decode(value)
            .map_err(|err| GatewayError::protocol(format!("Undecodable value for header '{name}': {err}")))?;
        decoded.insert(name.into_owned(), value.into_owned());
    }
    Ok(decoded)
}

pub(crate) fn immediate_failures(headers: &HeaderMap) -> Result<u32, GatewayError> {
    let Some(value) = headers.get(IMMEDIATE_FAILURES_HEADER) else {
        return Ok(0);
    };
    value
        .to_str()
        .ok()
        .and_then(|value| value.trim().parse().ok())
        .ok_or_else(|| {
            GatewayError::protocol(format!(
                "Invalid {IMMEDIATE_FAILURES_HEADER} header value {value:?}"
            ))
        })
}

fn encode_header_name(name: &str) -> String {
    let mut encoded = String::with_capacity(HEADER_PREFIX.len() + name.len());
    encoded.push_str(HEADER_PREFIX);
    for byte in name.bytes() {
        match byte {
            b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => encoded.push(char::from(byte)),
            _ => {
                let _ = write!(encoded, "%{byte:02X}");
            }
        }
    }
    encoded
}

fn strip_prefix_ignore_case<'a>(value: &'a str, prefix: &str) -> Option<&'a str> {
    let head = value.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix)
        .then(|| &value[prefix.len()..])
}
