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

//! Routing layer.
//!
//! Message-type identity and matching, the route vocabulary stored in the routing
//! table, and the router that turns a concrete type into physical addresses.
//! The TLV codec lives here as the packing primitive for routing metadata that has to
//! travel inside a single header.

pub(crate) mod message_router;
pub(crate) mod message_type;
pub(crate) mod route;
pub mod tlv;
