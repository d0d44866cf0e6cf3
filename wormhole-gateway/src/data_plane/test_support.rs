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

use crate::control_plane::endpoint_instances::EndpointInstance;
use crate::envelope::Envelope;
use crate::error::GatewayError;
use crate::transport::{CriticalErrorAction, Dispatch, GatewayTransport, MessageReceiver};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, Mutex as StdMutex};

/// Records every dispatch; destinations listed in `failing` are rejected.
pub(crate) struct RecordingTransport {
    local_address: String,
    failing: StdMutex<HashSet<String>>,
    dispatched: StdMutex<Vec<(String, Envelope)>>,
}

impl RecordingTransport {
    pub(crate) fn new(local_address: &str) -> Arc<Self> {
        Arc::new(Self {
            local_address: local_address.to_string(),
            failing: StdMutex::new(HashSet::new()),
            dispatched: StdMutex::new(Vec::new()),
        })
    }

    pub(crate) fn fail_dispatch_to(&self, destination: &str) {
        self.failing
            .lock()
            .expect("failing lock poisoned")
            .insert(destination.to_string());
    }

    pub(crate) fn dispatched(&self) -> Vec<(String, Envelope)> {
        self.dispatched
            .lock()
            .expect("dispatched lock poisoned")
            .clone()
    }

    pub(crate) fn destinations(&self) -> Vec<String> {
        self.dispatched()
            .into_iter()
            .map(|(destination, _)| destination)
            .collect()
    }
}

#[async_trait]
impl Dispatch for RecordingTransport {
    async fn dispatch(&self, destination: &str, envelope: &Envelope) -> Result<(), GatewayError> {
        if self
            .failing
            .lock()
            .expect("failing lock poisoned")
            .contains(destination)
        {
            return Err(GatewayError::transport(format!(
                "refused delivery to {destination}"
            )));
        }
        self.dispatched
            .lock()
            .expect("dispatched lock poisoned")
            .push((destination.to_string(), envelope.clone()));
        Ok(())
    }
}

#[async_trait]
impl GatewayTransport for RecordingTransport {
    fn local_address(&self) -> String {
        self.local_address.clone()
    }

    fn to_transport_address(&self, instance: &EndpointInstance) -> Result<String, GatewayError> {
        Ok(match &instance.discriminator {
            Some(discriminator) => format!("{}-{}", instance.endpoint, discriminator),
            None => instance.endpoint.clone(),
        })
    }

    async fn start(
        &self,
        _receiver: Arc<dyn MessageReceiver>,
        _critical_error: CriticalErrorAction,
    ) -> Result<(), GatewayError> {
        Ok(())
    }

    async fn stop(&self) -> Result<(), GatewayError> {
        Ok(())
    }
}
