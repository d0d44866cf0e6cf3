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

use crate::address::{path_of, AddressParser};
use crate::dispatcher::Dispatcher;
use crate::pump::{MessagePump, PumpSettings};
use crate::settings::HttpTransportSettings;
use async_trait::async_trait;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tracing::debug;
use wormhole_gateway::{
    CriticalErrorAction, Dispatch, EndpointInstance, Envelope, GatewayError, GatewayTransport,
    MessageReceiver,
};

const HTTP_TRANSPORT_TAG: &str = "HttpTransport:";
const HTTP_TRANSPORT_FN_BIND_TAG: &str = "bind():";
const HTTP_TRANSPORT_FN_START_TAG: &str = "start():";

/// Tunnel transport: POSTs messages to other gateways and serves its own input queue.
pub struct HttpTransport {
    queue: String,
    local_address: String,
    addresses: AddressParser,
    bound_to: SocketAddr,
    listener: Mutex<Option<TcpListener>>,
    dispatcher: Dispatcher,
    pump: MessagePump,
}

impl HttpTransport {
    /// Binds the listener for input queue `queue` right away.
    ///
    /// When the bind address asks for port `0` the advertised local address carries the
    /// port the system picked.
    pub async fn bind(queue: &str, settings: HttpTransportSettings) -> Result<Self, GatewayError> {
        if queue.is_empty() || queue.contains('/') {
            return Err(GatewayError::configuration(format!(
                "Invalid queue name '{queue}'. Queue names must be non-empty and cannot contain '/'."
            )));
        }

        let bind_address = settings.resolved_bind_address();
        let listener = TcpListener::bind(bind_address)
            .await
            .map_err(|err| GatewayError::transport(format!("Unable to listen on {bind_address}: {err}")))?;
        let bound_to = listener
            .local_addr()
            .map_err(|err| GatewayError::transport(format!("Listener has no local address: {err}")))?;

        let default_host = settings.resolved_default_host();
        let addresses = AddressParser::new(default_host.clone(), settings.default_port);
        let local_address = AddressParser::new(default_host, bound_to.port())
            .generate_address(&EndpointInstance::new(queue), None)?;

        let client = match settings.client.clone() {
            Some(client) => client,
            None => reqwest::Client::builder()
                .timeout(settings.request_timeout)
                .build()
                .map_err(|err| GatewayError::configuration(format!("Unable to build HTTP client: {err}")))?,
        };

        debug!(
            "{}:{}:{} listening on {} as {}",
            queue, HTTP_TRANSPORT_TAG, HTTP_TRANSPORT_FN_BIND_TAG, bound_to, local_address
        );

        let pump = MessagePump::new(PumpSettings {
            queue_path: path_of(&local_address).to_string(),
            max_concurrency: settings.max_concurrency,
            breaker_window: settings.circuit_breaker_window,
            breaker_pause: settings.circuit_breaker_pause,
        });

        Ok(Self {
            queue: queue.to_string(),
            local_address,
            dispatcher: Dispatcher::new(client, addresses.clone()),
            addresses,
            bound_to,
            listener: Mutex::new(Some(listener)),
            pump,
        })
    }

    pub fn queue(&self) -> &str {
        &self.queue
    }

    /// Socket the input queue listens on.
    pub fn bound_to(&self) -> SocketAddr {
        self.bound_to
    }

    pub fn addresses(&self) -> &AddressParser {
        &self.addresses
    }
}

#[async_trait]
impl Dispatch for HttpTransport {
    async fn dispatch(&self, destination: &str, envelope: &Envelope) -> Result<(), GatewayError> {
        self.dispatcher.send(destination, envelope).await
    }
}

#[async_trait]
impl GatewayTransport for HttpTransport {
    fn local_address(&self) -> String {
        self.local_address.clone()
    }

    fn to_transport_address(&self, instance: &EndpointInstance) -> Result<String, GatewayError> {
        self.addresses.generate_address(instance, None)
    }

    async fn start(
        &self,
        receiver: Arc<dyn MessageReceiver>,
        critical_error: CriticalErrorAction,
    ) -> Result<(), GatewayError> {
        // A restarted transport listens on the socket it was first bound to.
        let listener = match self.listener.lock().await.take() {
            Some(listener) => listener,
            None => {
                debug!(
                    "{}:{}:{} re-binding {}",
                    self.queue, HTTP_TRANSPORT_TAG, HTTP_TRANSPORT_FN_START_TAG, self.bound_to
                );
                TcpListener::bind(self.bound_to).await.map_err(|err| {
                    GatewayError::transport(format!("Unable to listen on {}: {err}", self.bound_to))
                })?
            }
        };
        self.pump.start(listener, receiver, critical_error).await
    }

    async fn stop(&self) -> Result<(), GatewayError> {
        self.pump.stop().await
    }
}
