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

//! Per-endpoint choice of one instance out of several candidates.

use crate::observability::events;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tracing::debug;

const COMPONENT: &str = "distribution_policy";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DistributionScope {
    /// Events fanned out to subscribers.
    Publish,
    /// Traffic the gateway re-injects from the tunnel.
    Forward,
}

pub trait DistributionStrategy: Send + Sync {
    fn endpoint(&self) -> &str;

    fn scope(&self) -> DistributionScope;

    /// Picks one of `candidates`; `None` only when `candidates` is empty.
    fn select_destination(&self, candidates: &[String]) -> Option<String>;
}

/// Cycles through candidates with a cursor shared by every caller.
pub struct RoundRobinDistributionStrategy {
    endpoint: String,
    scope: DistributionScope,
    cursor: AtomicUsize,
}

impl RoundRobinDistributionStrategy {
    pub fn new(endpoint: impl Into<String>, scope: DistributionScope) -> Self {
        Self {
            endpoint: endpoint.into(),
            scope,
            cursor: AtomicUsize::new(0),
        }
    }
}

impl DistributionStrategy for RoundRobinDistributionStrategy {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn scope(&self) -> DistributionScope {
        self.scope
    }

    fn select_destination(&self, candidates: &[String]) -> Option<String> {
        if candidates.is_empty() {
            return None;
        }
        let index = self.cursor.fetch_add(1, Ordering::Relaxed) % candidates.len();
        Some(candidates[index].clone())
    }
}

type StrategyKey = (String, DistributionScope);

#[derive(Default)]
pub struct DistributionPolicy {
    strategies: Mutex<HashMap<StrategyKey, Arc<dyn DistributionStrategy>>>,
}

impl DistributionPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `strategy` for its `(endpoint, scope)`, replacing any earlier one.
    pub fn set_distribution_strategy(&self, strategy: Arc<dyn DistributionStrategy>) {
        let key = (strategy.endpoint().to_string(), strategy.scope());
        debug!(
            event = events::DISTRIBUTION_STRATEGY_REGISTERED,
            component = COMPONENT,
            endpoint = strategy.endpoint(),
            scope = ?strategy.scope(),
            "registered distribution strategy"
        );
        self.lock().insert(key, strategy);
    }

    /// Registered strategy, or a round-robin one created on first use and kept thereafter.
    pub fn get_distribution_strategy(
        &self,
        endpoint: &str,
        scope: DistributionScope,
    ) -> Arc<dyn DistributionStrategy> {
        self.lock()
            .entry((endpoint.to_string(), scope))
            .or_insert_with(|| Arc::new(RoundRobinDistributionStrategy::new(endpoint, scope)))
            .clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<StrategyKey, Arc<dyn DistributionStrategy>>> {
        match self.strategies.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
