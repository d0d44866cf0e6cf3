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

//! Handler + error policy, packaged as the receiver a transport delivers to.

use crate::data_plane::error_policy::{ErrorDecision, ErrorPolicy};
use crate::envelope::{headers, Envelope};
use crate::error::GatewayError;
use crate::observability::{events, fields};
use crate::transport::{GatewayTransport, MessageReceiver, ReceiveOutcome};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, error, warn};

const COMPONENT: &str = "receive_pipeline";

#[async_trait]
pub(crate) trait MessageHandler: Send + Sync {
    async fn handle(&self, envelope: Envelope) -> Result<(), GatewayError>;
}

pub(crate) struct ReceivePipeline {
    side: &'static str,
    handler: Arc<dyn MessageHandler>,
    error_policy: Arc<dyn ErrorPolicy>,
    transport: Arc<dyn GatewayTransport>,
}

impl ReceivePipeline {
    /// `transport` is the one the pipeline receives from; poisoned envelopes go out through it.
    pub(crate) fn new(
        side: &'static str,
        handler: Arc<dyn MessageHandler>,
        error_policy: Arc<dyn ErrorPolicy>,
        transport: Arc<dyn GatewayTransport>,
    ) -> Self {
        Self {
            side,
            handler,
            error_policy,
            transport,
        }
    }

    async fn move_to_error_queue(
        &self,
        mut envelope: Envelope,
        error_queue: &str,
        failure: &GatewayError,
    ) -> ReceiveOutcome {
        envelope.set_header(headers::FAILURE_REASON, failure.to_string());
        envelope.set_header(headers::FAILURE_KIND, failure.kind());
        envelope.set_header(headers::FAILED_QUEUE, self.transport.local_address());

        match self.transport.dispatch(error_queue, &envelope).await {
            Ok(()) => {
                error!(
                    event = events::RECEIVE_MOVED_TO_POISON,
                    component = COMPONENT,
                    side = self.side,
                    msg_id = %fields::format_message_id(&envelope),
                    error_queue,
                    err = %failure,
                    "moved message to error queue"
                );
                ReceiveOutcome::Accepted
            }
            Err(dispatch_err) => {
                error!(
                    event = events::RECEIVE_POISON_DISPATCH_FAILED,
                    component = COMPONENT,
                    side = self.side,
                    msg_id = %fields::format_message_id(&envelope),
                    error_queue,
                    err = %dispatch_err,
                    "unable to move message to error queue"
                );
                ReceiveOutcome::RetryRequired
            }
        }
    }
}

#[async_trait]
impl MessageReceiver for ReceivePipeline {
    async fn receive(&self, envelope: Envelope, immediate_failures: u32) -> ReceiveOutcome {
        let failure = match self.handler.handle(envelope.clone()).await {
            Ok(()) => return ReceiveOutcome::Accepted,
            Err(err) => err,
        };

        let failures = immediate_failures.saturating_add(1);
        warn!(
            event = events::RECEIVE_FAILED,
            component = COMPONENT,
            side = self.side,
            msg_id = %fields::format_message_id(&envelope),
            enclosed_types = %fields::format_enclosed_types(&envelope),
            failures,
            err_kind = failure.kind(),
            err = %failure,
            "message processing failed"
        );

        match self.error_policy.on_error(failures) {
            ErrorDecision::RetryRequired => {
                debug!(
                    event = events::RECEIVE_RETRY_REQUIRED,
                    component = COMPONENT,
                    side = self.side,
                    msg_id = %fields::format_message_id(&envelope),
                    failures,
                    "requesting immediate retry"
                );
                ReceiveOutcome::RetryRequired
            }
            ErrorDecision::MoveToErrorQueue(error_queue) => {
                self.move_to_error_queue(envelope, &error_queue, &failure)
                    .await
            }
        }
    }
}
