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

use crate::address::DEFAULT_PORT;
use std::net::{Ipv4Addr, SocketAddr};
use std::num::NonZeroUsize;
use std::time::Duration;

pub const DEFAULT_CIRCUIT_BREAKER_WINDOW: Duration = Duration::from_secs(30);
pub const DEFAULT_CIRCUIT_BREAKER_PAUSE: Duration = Duration::from_secs(1);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const FALLBACK_HOST: &str = "localhost";

#[derive(Clone, Debug)]
pub struct HttpTransportSettings {
    /// Host used for queue names without an explicit URL. `None` means this machine's
    /// host name.
    pub default_host: Option<String>,
    pub default_port: u16,
    /// Upper bound on connections served at once.
    pub max_concurrency: usize,
    pub circuit_breaker_window: Duration,
    pub circuit_breaker_pause: Duration,
    /// Applies to the client built by the transport, not to an injected one.
    pub request_timeout: Duration,
    /// Shared client for outgoing requests.
    pub client: Option<reqwest::Client>,
    /// Listen address; defaults to all interfaces on `default_port`.
    pub bind_address: Option<SocketAddr>,
}

impl Default for HttpTransportSettings {
    fn default() -> Self {
        Self {
            default_host: None,
            default_port: DEFAULT_PORT,
            max_concurrency: std::thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1),
            circuit_breaker_window: DEFAULT_CIRCUIT_BREAKER_WINDOW,
            circuit_breaker_pause: DEFAULT_CIRCUIT_BREAKER_PAUSE,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            client: None,
            bind_address: None,
        }
    }
}

impl HttpTransportSettings {
    pub fn with_default_host(mut self, host: impl Into<String>) -> Self {
        self.default_host = Some(host.into());
        self
    }

    pub fn with_default_port(mut self, port: u16) -> Self {
        self.default_port = port;
        self
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }

    pub fn with_circuit_breaker(mut self, window: Duration, pause: Duration) -> Self {
        self.circuit_breaker_window = window;
        self.circuit_breaker_pause = pause;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = Some(client);
        self
    }

    pub fn with_bind_address(mut self, bind_address: SocketAddr) -> Self {
        self.bind_address = Some(bind_address);
        self
    }

    pub(crate) fn resolved_default_host(&self) -> String {
        match &self.default_host {
            Some(host) => host.clone(),
            None => hostname::get()
                .ok()
                .and_then(|name| name.into_string().ok())
                .unwrap_or_else(|| FALLBACK_HOST.to_string()),
        }
    }

    pub(crate) fn resolved_bind_address(&self) -> SocketAddr {
        self.bind_address
            .unwrap_or_else(|| SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.default_port)))
    }
}

#[cfg(test)]
mod tests {
    use super::HttpTransportSettings;
    use std::net::SocketAddr;

    #[test]
    fn binds_all_interfaces_on_default_port_unless_told_otherwise() {
        let settings = HttpTransportSettings::default();
        assert_eq!(
            settings.resolved_bind_address(),
            "0.0.0.0:7777".parse::<SocketAddr>().expect("valid")
        );

        let loopback: SocketAddr = "127.0.0.1:0".parse().expect("valid");
        assert_eq!(
            settings.with_bind_address(loopback).resolved_bind_address(),
            loopback
        );
    }

    #[test]
    fn explicit_host_wins_over_machine_name() {
        let settings = HttpTransportSettings::default().with_default_host("gateway-box");
        assert_eq!(settings.resolved_default_host(), "gateway-box");
        assert!(!HttpTransportSettings::default()
            .resolved_default_host()
            .is_empty());
    }
}
