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

//! Control-plane layer.
//!
//! Owns the state that decides where traffic goes: routing entries and their memoized
//! per-type cache, logical endpoint instances, distribution strategies, and the static
//! site → tunnel address registry. Everything here is safe to update while the data plane
//! is running, except the site registry which is fixed when the gateway is built.

pub(crate) mod distribution_policy;
pub(crate) mod endpoint_instances;
pub(crate) mod routing_table;
pub(crate) mod site_registry;
