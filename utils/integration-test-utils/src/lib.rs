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

//! In-memory bus and transport for exercising gateways without a network.
//!
//! Delivery is synchronous: `dispatch` returns once the receiving queue accepted the
//! envelope, re-offering it immediately while the receiver asks for a retry, the same way
//! the HTTP tunnel re-posts on `503`. Queues without a bound receiver record what they get.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, Once};
use tracing::{debug, trace};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;
use wormhole_gateway::{
    headers, CriticalErrorAction, Dispatch, EndpointInstance, Envelope, GatewayError,
    GatewayTransport, Headers, MessageReceiver, ReceiveOutcome,
};

const IN_MEMORY_BUS_TAG: &str = "InMemoryBus:";
const IN_MEMORY_BUS_FN_DELIVER_TAG: &str = "deliver():";

/// Upper bound on immediate redeliveries so a misbehaving test fails instead of hanging.
pub const MAX_IMMEDIATE_REDELIVERIES: u32 = 1_000;

/// Installs a `RUST_LOG`-driven subscriber once per test binary.
pub fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// An envelope with a fresh id and the given enclosed message types.
pub fn message(enclosed_types: &str) -> Envelope {
    Envelope::new(Uuid::new_v4().to_string(), Headers::new(), Vec::new())
        .with_header(headers::ENCLOSED_MESSAGE_TYPES, enclosed_types)
}

pub struct InMemoryBus {
    name: String,
    receivers: Mutex<HashMap<String, Arc<dyn MessageReceiver>>>,
    delivered: Mutex<HashMap<String, Vec<Envelope>>>,
    attempts: Mutex<HashMap<String, usize>>,
}

impl InMemoryBus {
    pub fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            receivers: Mutex::new(HashMap::new()),
            delivered: Mutex::new(HashMap::new()),
            attempts: Mutex::new(HashMap::new()),
        })
    }

    /// A transport whose input queue on this bus is `queue`.
    pub fn transport(self: &Arc<Self>, queue: &str) -> Arc<InMemoryTransport> {
        Arc::new(InMemoryTransport {
            bus: self.clone(),
            queue: queue.to_string(),
        })
    }

    /// Sends as an ordinary endpoint on this bus would.
    pub async fn send(&self, destination: &str, envelope: Envelope) -> Result<(), GatewayError> {
        self.deliver(destination, &envelope).await
    }

    /// Envelopes that reached `queue` while no receiver was bound to it.
    pub fn delivered(&self, queue: &str) -> Vec<Envelope> {
        self.delivered
            .lock()
            .expect("delivered lock poisoned")
            .get(queue)
            .cloned()
            .unwrap_or_default()
    }

    /// Number of times a bound receiver of `queue` was invoked.
    pub fn receive_attempts(&self, queue: &str) -> usize {
        self.attempts
            .lock()
            .expect("attempts lock poisoned")
            .get(queue)
            .copied()
            .unwrap_or_default()
    }

    fn bind(&self, queue: &str, receiver: Arc<dyn MessageReceiver>) {
        self.receivers
            .lock()
            .expect("receivers lock poisoned")
            .insert(queue.to_string(), receiver);
    }

    fn unbind(&self, queue: &str) {
        self.receivers
            .lock()
            .expect("receivers lock poisoned")
            .remove(queue);
    }

    async fn deliver(&self, destination: &str, envelope: &Envelope) -> Result<(), GatewayError> {
        let receiver = self
            .receivers
            .lock()
            .expect("receivers lock poisoned")
            .get(destination)
            .cloned();

        let Some(receiver) = receiver else {
            trace!(
                "{}:{}:{} recording {} for unbound queue {}",
                self.name,
                IN_MEMORY_BUS_TAG,
                IN_MEMORY_BUS_FN_DELIVER_TAG,
                envelope.id,
                destination
            );
            self.delivered
                .lock()
                .expect("delivered lock poisoned")
                .entry(destination.to_string())
                .or_default()
                .push(envelope.clone());
            return Ok(());
        };

        let mut immediate_failures = 0;
        loop {
            *self
                .attempts
                .lock()
                .expect("attempts lock poisoned")
                .entry(destination.to_string())
                .or_default() += 1;

            match receiver.receive(envelope.clone(), immediate_failures).await {
                ReceiveOutcome::Accepted => return Ok(()),
                ReceiveOutcome::RetryRequired => {
                    immediate_failures += 1;
                    debug!(
                        "{}:{}:{} {} asked to retry {} ({} failures)",
                        self.name,
                        IN_MEMORY_BUS_TAG,
                        IN_MEMORY_BUS_FN_DELIVER_TAG,
                        destination,
                        envelope.id,
                        immediate_failures
                    );
                    if immediate_failures > MAX_IMMEDIATE_REDELIVERIES {
                        return Err(GatewayError::transport(format!(
                            "{destination} kept rejecting {} on bus {}",
                            envelope.id, self.name
                        )));
                    }
                }
            }
        }
    }
}

pub struct InMemoryTransport {
    bus: Arc<InMemoryBus>,
    queue: String,
}

#[async_trait]
impl Dispatch for InMemoryTransport {
    async fn dispatch(&self, destination: &str, envelope: &Envelope) -> Result<(), GatewayError> {
        self.bus.deliver(destination, envelope).await
    }
}

#[async_trait]
impl GatewayTransport for InMemoryTransport {
    fn local_address(&self) -> String {
        self.queue.clone()
    }

    fn to_transport_address(&self, instance: &EndpointInstance) -> Result<String, GatewayError> {
        Ok(match &instance.discriminator {
            Some(discriminator) => format!("{}-{}", instance.endpoint, discriminator),
            None => instance.endpoint.clone(),
        })
    }

    async fn start(
        &self,
        receiver: Arc<dyn MessageReceiver>,
        _critical_error: CriticalErrorAction,
    ) -> Result<(), GatewayError> {
        self.bus.bind(&self.queue, receiver);
        Ok(())
    }

    async fn stop(&self) -> Result<(), GatewayError> {
        self.bus.unbind(&self.queue);
        Ok(())
    }
}
