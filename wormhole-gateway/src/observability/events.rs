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

// Control plane
pub const ROUTE_TABLE_REPLACED: &str = "route_table_replaced";
pub const ROUTE_TABLE_REPLACE_SKIPPED: &str = "route_table_replace_skipped";
pub const ROUTE_TABLE_REBUILT: &str = "route_table_rebuilt";
pub const DISTRIBUTION_STRATEGY_REGISTERED: &str = "distribution_strategy_registered";
pub const ENDPOINT_INSTANCES_REPLACED: &str = "endpoint_instances_replaced";

// Routing
pub const ROUTE_GROUP_NO_CANDIDATES: &str = "route_group_no_candidates";
pub const ROUTE_RESOLVED: &str = "route_resolved";

// Data plane
pub const SITE_DISPATCH: &str = "site_dispatch";
pub const SITE_RESOLUTION_FAILED: &str = "site_resolution_failed";
pub const TUNNEL_REPLY_TO_REWRITTEN: &str = "tunnel_reply_to_rewritten";
pub const TUNNEL_DIRECT_DISPATCH: &str = "tunnel_direct_dispatch";
pub const TUNNEL_ROUTED_DISPATCH: &str = "tunnel_routed_dispatch";
pub const TUNNEL_NO_ROUTE: &str = "tunnel_no_route";
pub const TUNNEL_FORWARD_TO_LOCAL: &str = "tunnel_forward_to_local";
pub const RECEIVE_FAILED: &str = "receive_failed";
pub const RECEIVE_RETRY_REQUIRED: &str = "receive_retry_required";
pub const RECEIVE_MOVED_TO_POISON: &str = "receive_moved_to_poison";
pub const RECEIVE_POISON_DISPATCH_FAILED: &str = "receive_poison_dispatch_failed";

// Lifecycle
pub const GATEWAY_STARTING: &str = "gateway_starting";
pub const GATEWAY_STARTED: &str = "gateway_started";
pub const GATEWAY_STOPPING: &str = "gateway_stopping";
pub const GATEWAY_STOPPED: &str = "gateway_stopped";
pub const CRITICAL_ERROR: &str = "critical_error";

// Tunnel transport
pub const DISPATCH_ATTEMPT: &str = "dispatch_attempt";
pub const DISPATCH_BUSY_RETRY: &str = "dispatch_busy_retry";
pub const DISPATCH_REJECTED: &str = "dispatch_rejected";
pub const PUMP_LISTENING: &str = "pump_listening";
pub const PUMP_ACCEPT_FAILED: &str = "pump_accept_failed";
pub const PUMP_CONNECTION_FAILED: &str = "pump_connection_failed";
pub const PUMP_RECEIVE_FAILED: &str = "pump_receive_failed";
pub const PUMP_REQUEST_OUTSIDE_QUEUE: &str = "pump_request_outside_queue";
pub const PUMP_STOPPING: &str = "pump_stopping";
pub const PUMP_DRAINED: &str = "pump_drained";
pub const CIRCUIT_BREAKER_ARMED: &str = "circuit_breaker_armed";
pub const CIRCUIT_BREAKER_TRIPPED: &str = "circuit_breaker_tripped";
pub const CIRCUIT_BREAKER_DISARMED: &str = "circuit_breaker_disarmed";
