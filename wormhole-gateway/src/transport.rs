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

//! Seams between the gateway and the transports it bridges.
//!
//! A gateway owns two [`GatewayTransport`]s: one facing the local bus and one facing the
//! tunnel. Each transport delivers inbound envelopes to a [`MessageReceiver`] and reports
//! whether the envelope was accepted or must be offered again immediately.

use crate::control_plane::endpoint_instances::EndpointInstance;
use crate::envelope::Envelope;
use crate::error::GatewayError;
use async_trait::async_trait;
use std::sync::Arc;

/// Outbound sink.
#[async_trait]
pub trait Dispatch: Send + Sync {
    /// Delivers one copy of `envelope` to `destination`.
    ///
    /// Transient conditions (a busy receiver) are retried inside the transport; an error
    /// means the delivery cannot succeed by retrying the same call.
    async fn dispatch(&self, destination: &str, envelope: &Envelope) -> Result<(), GatewayError>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReceiveOutcome {
    /// Processed, or moved aside; the sender may forget the envelope.
    Accepted,
    /// Offer the same envelope again, with the failure count incremented.
    RetryRequired,
}

#[async_trait]
pub trait MessageReceiver: Send + Sync {
    /// `immediate_failures` counts previous failed attempts of this same envelope.
    async fn receive(&self, envelope: Envelope, immediate_failures: u32) -> ReceiveOutcome;
}

/// Invoked with a breaker name and the last failure when a receive loop keeps failing.
pub type CriticalErrorAction = Arc<dyn Fn(&str, &GatewayError) + Send + Sync>;

#[async_trait]
pub trait GatewayTransport: Dispatch {
    /// Address other parties use to reach this transport's input queue.
    fn local_address(&self) -> String;

    /// Physical address of an endpoint instance in this transport's address space.
    fn to_transport_address(&self, instance: &EndpointInstance) -> Result<String, GatewayError>;

    /// Starts delivering inbound envelopes to `receiver`.
    async fn start(
        &self,
        receiver: Arc<dyn MessageReceiver>,
        critical_error: CriticalErrorAction,
    ) -> Result<(), GatewayError>;

    /// Stops accepting new envelopes and waits for in-flight ones to finish.
    async fn stop(&self) -> Result<(), GatewayError>;
}
