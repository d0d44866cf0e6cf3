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

//! Data-plane layer.
//!
//! Per-envelope work: the outbound site fan-out, the inbound tunnel delivery, the
//! receive callbacks wired to each gateway side, and the error policies that decide
//! between an immediate retry and the poison queue.

pub(crate) mod error_policy;
pub(crate) mod gateway_handlers;
pub(crate) mod receive_pipeline;
pub(crate) mod site_handler;
pub(crate) mod tunnel_handler;

#[cfg(test)]
pub(crate) mod test_support;
