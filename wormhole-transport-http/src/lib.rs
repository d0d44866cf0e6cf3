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

//! # wormhole-transport-http
//!
//! Tunnel transport for `wormhole-gateway`: gateways talk to each other with plain HTTP
//! request/response.
//!
//! ## Wire protocol
//!
//! - A message is `POST {address}/{message id}` with the raw body. Every logical header
//!   becomes one `X-NSB-{name}: {value}` HTTP header, name and value percent-encoded.
//! - `200` means the receiver took the message. `503` means "busy, send it again": the
//!   sender re-posts immediately with `X-NSBHttp-ImmediateFailures: {n}`, without bound.
//!   Any other status fails the dispatch.
//!
//! Header names are escaped more strictly than plain URL encoding: uppercase letters and
//! every byte outside `[a-z0-9-_.~]` become `%XX`, so a name keeps its case even though
//! HTTP header names are case-insensitive. Peers must use the same escaping. A peer that
//! only URL-encodes names will see them come out lowercased after decoding.
//!
//! ## Addresses
//!
//! `http://{host}:{port}/{endpoint}[-{discriminator}][/{qualifier}]`. A bare queue name
//! resolves against the default host (this machine) and port (`7777`); endpoint instances
//! may override both with the `Host` and `Port` properties.
//!
//! ## Receiving
//!
//! [`HttpTransport::bind`] binds the listener. `start` runs one accept loop; connections are
//! served concurrently up to the configured limit, and `stop` drains them before returning.
//! Repeated listen or receive failures lasting past the circuit-breaker window raise the
//! gateway's critical-error action.

mod address;
pub use address::{AddressParser, DEFAULT_PORT, HOST_PROPERTY, PORT_PROPERTY};

mod circuit_breaker;
mod dispatcher;
mod pump;

mod settings;
pub use settings::{
    HttpTransportSettings, DEFAULT_CIRCUIT_BREAKER_PAUSE, DEFAULT_CIRCUIT_BREAKER_WINDOW,
    DEFAULT_REQUEST_TIMEOUT,
};

mod transport;
pub use transport::HttpTransport;

mod wire;
pub use wire::{HEADER_PREFIX, IMMEDIATE_FAILURES_HEADER};
