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

use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{error, info, warn};
use wormhole_gateway::observability::events;
use wormhole_gateway::{CriticalErrorAction, GatewayError};

const COMPONENT: &str = "circuit_breaker";

#[derive(Default)]
struct BreakerState {
    failing_since: Option<Instant>,
    tripped: bool,
}

/// Raises the critical-error action once failures have gone on, without a success in
/// between, for longer than `window`. Every failure pauses the caller for `pause`.
pub(crate) struct RepeatedFailuresCircuitBreaker {
    name: &'static str,
    window: Duration,
    pause: Duration,
    critical_error: CriticalErrorAction,
    state: Mutex<BreakerState>,
}

impl RepeatedFailuresCircuitBreaker {
    pub(crate) fn new(
        name: &'static str,
        window: Duration,
        pause: Duration,
        critical_error: CriticalErrorAction,
    ) -> Self {
        Self {
            name,
            window,
            pause,
            critical_error,
            state: Mutex::new(BreakerState::default()),
        }
    }

    pub(crate) fn success(&self) {
        let was_failing = {
            let mut state = self.lock_state();
            state.tripped = false;
            state.failing_since.take().is_some()
        };
        if was_failing {
            info!(
                event = events::CIRCUIT_BREAKER_DISARMED,
                component = COMPONENT,
                breaker = self.name,
                "circuit breaker disarmed"
            );
        }
    }

    pub(crate) async fn failure(&self, err: &GatewayError) {
        let now = Instant::now();
        let (armed, trip) = {
            let mut state = self.lock_state();
            let armed = state.failing_since.is_none();
            let failing_since = *state.failing_since.get_or_insert(now);
            let trip = !state.tripped && now.duration_since(failing_since) >= self.window;
            state.tripped |= trip;
            (armed, trip)
        };

        if armed {
            warn!(
                event = events::CIRCUIT_BREAKER_ARMED,
                component = COMPONENT,
                breaker = self.name,
                window_ms = self.window.as_millis() as u64,
                err = %err,
                "circuit breaker armed"
            );
        }
        if trip {
            error!(
                event = events::CIRCUIT_BREAKER_TRIPPED,
                component = COMPONENT,
                breaker = self.name,
                err = %err,
                "failures persisted for the whole window"
            );
            (self.critical_error)(self.name, err);
        }

        tokio::time::sleep(self.pause).await;
    }

    fn lock_state(&self) -> MutexGuard<'_, BreakerState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
