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

//! What to do with an envelope whose processing failed.

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum ErrorDecision {
    RetryRequired,
    MoveToErrorQueue(String),
}

pub(crate) trait ErrorPolicy: Send + Sync {
    /// `immediate_processing_failures` counts failed attempts so far, including the current one.
    fn on_error(&self, immediate_processing_failures: u32) -> ErrorDecision;
}

/// Local-facing side: a bounded number of immediate retries, then the poison queue.
pub(crate) struct PoisonAfterRetries {
    poison_queue: String,
    immediate_retries: u32,
}

impl PoisonAfterRetries {
    pub(crate) fn new(poison_queue: impl Into<String>, immediate_retries: u32) -> Self {
        Self {
            poison_queue: poison_queue.into(),
            immediate_retries,
        }
    }
}

impl ErrorPolicy for PoisonAfterRetries {
    fn on_error(&self, immediate_processing_failures: u32) -> ErrorDecision {
        if immediate_processing_failures <= self.immediate_retries {
            ErrorDecision::RetryRequired
        } else {
            ErrorDecision::MoveToErrorQueue(self.poison_queue.clone())
        }
    }
}

/// Tunnel-facing side: the only work is re-queueing locally, so every failure is retried.
pub(crate) struct RetryForever;

impl ErrorPolicy for RetryForever {
    fn on_error(&self, _immediate_processing_failures: u32) -> ErrorDecision {
        ErrorDecision::RetryRequired
    }
}
