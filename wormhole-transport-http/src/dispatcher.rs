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

//! Outbound side of the tunnel: one POST per destination.

use crate::address::AddressParser;
use crate::wire::{self, IMMEDIATE_FAILURES_HEADER};
use hyper::StatusCode;
use std::future::Future;
use tracing::{debug, trace, warn};
use wormhole_gateway::observability::{events, fields};
use wormhole_gateway::{Envelope, GatewayError};

const COMPONENT: &str = "http_dispatcher";

pub(crate) struct Dispatcher {
    client: reqwest::Client,
    addresses: AddressParser,
}

impl Dispatcher {
    pub(crate) fn new(client: reqwest::Client, addresses: AddressParser) -> Self {
        Self { client, addresses }
    }

    /// Posts `envelope` to `destination`, re-posting for as long as the receiver is busy.
    pub(crate) async fn send(&self, destination: &str, envelope: &Envelope) -> Result<(), GatewayError> {
        let url = format!(
            "{}/{}",
            self.addresses.parse_address(destination),
            urlencoding::encode(&envelope.id)
        );
        let headers = wire::encode_headers(&envelope.headers)?;

        trace!(
            event = events::DISPATCH_ATTEMPT,
            component = COMPONENT,
            msg_id = %fields::format_message_id(envelope),
            url = url.as_str(),
            "posting message"
        );

        send_with_retries(&url, |immediate_failures| {
            let mut request = self
                .client
                .post(url.as_str())
                .headers(headers.clone())
                .body(envelope.body.clone());
            if immediate_failures > 0 {
                request = request.header(IMMEDIATE_FAILURES_HEADER, immediate_failures.to_string());
            }
            let url = url.as_str();
            async move {
                request
                    .send()
                    .await
                    .map(|response| response.status())
                    .map_err(|err| GatewayError::transport(format!("Unable to send to {url}: {err}")))
            }
        })
        .await
    }
}

/// `200` completes, `503` asks for another attempt, anything else is fatal.
///
/// `attempt` receives the number of busy responses so far.
pub(crate) async fn send_with_retries<F, Fut>(url: &str, mut attempt: F) -> Result<(), GatewayError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<StatusCode, GatewayError>>,
{
    let mut immediate_failures: u32 = 0;
    loop {
        let status = attempt(immediate_failures).await?;

        if status == StatusCode::OK {
            return Ok(());
        }
        if status == StatusCode::SERVICE_UNAVAILABLE {
            immediate_failures = immediate_failures.saturating_add(1);
            debug!(
                event = events::DISPATCH_BUSY_RETRY,
                component = COMPONENT,
                url,
                immediate_failures,
                "receiver busy, retrying"
            );
            continue;
        }

        warn!(
            event = events::DISPATCH_REJECTED,
            component = COMPONENT,
            url,
            status = status.as_u16(),
            "receiver rejected message"
        );
        return Err(GatewayError::transport(format!(
            "Unexpected status code {status} when sending to {url}."
        )));
    }
}
