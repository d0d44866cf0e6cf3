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

//! Type-length-value packing of a string map into a single header-safe string.
//!
//! Layout: `key|len|value` records joined by `|`, where `len` is the byte length of
//! `value`. Values may contain `|`; keys must not.

use crate::error::GatewayError;
use std::collections::BTreeMap;

const SEPARATOR: char = '|';

pub fn encode(values: &BTreeMap<String, String>) -> String {
    values
        .iter()
        .map(|(key, value)| format!("{key}{SEPARATOR}{}{SEPARATOR}{value}", value.len()))
        .collect::<Vec<_>>()
        .join("|")
}

pub fn decode(encoded: &str) -> Result<BTreeMap<String, String>, GatewayError> {
    let mut values = BTreeMap::new();
    let mut rest = encoded;

    while !rest.is_empty() {
        let (key, after_key) = rest
            .split_once(SEPARATOR)
            .ok_or_else(|| GatewayError::protocol("Expected type"))?;

        let (length, after_length) = after_key
            .split_once(SEPARATOR)
            .ok_or_else(|| GatewayError::protocol("Expected length"))?;
        let length: usize = length
            .parse()
            .map_err(|_| GatewayError::protocol("Expected length"))?;

        let value = after_length.get(..length).ok_or_else(|| {
            GatewayError::protocol(format!("Expected content of {length} characters"))
        })?;
        values.insert(key.to_string(), value.to_string());

        rest = &after_length[length..];
        if !rest.is_empty() {
            rest = rest
                .strip_prefix(SEPARATOR)
                .ok_or_else(|| GatewayError::protocol("Expected separator"))?;
        }
    }

    Ok(values)
}
