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

//! Source-keyed routing entries plus a memoized concrete-type → route-group cache.
//!
//! Cache hits are a single `ArcSwap` load. Any change to the entries, or the first lookup
//! of a new type, rebuilds the whole cache for every type seen so far and publishes it
//! atomically, so readers always observe one consistent snapshot.

use crate::observability::events;
use crate::routing::message_type::MessageType;
use crate::routing::route::{RouteGroup, RoutingEntry};
use arc_swap::ArcSwap;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

const COMPONENT: &str = "routing_table";

type RouteSnapshot = HashMap<MessageType, Arc<[RouteGroup]>>;
type SourceEntries = HashMap<String, Vec<RoutingEntry>>;

pub struct RoutingTable {
    sources: RwLock<SourceEntries>,
    known_types: Mutex<HashSet<MessageType>>,
    routes: ArcSwap<RouteSnapshot>,
    generation: AtomicU64,
}

impl Default for RoutingTable {
    fn default() -> Self {
        Self {
            sources: RwLock::new(HashMap::new()),
            known_types: Mutex::new(HashSet::new()),
            routes: ArcSwap::from_pointee(HashMap::new()),
            generation: AtomicU64::new(0),
        }
    }
}

impl RoutingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the entries registered under `source_key`.
    ///
    /// Returns `false` and leaves the cache untouched when the new entries equal the
    /// current ones as a set.
    pub fn add_or_replace_routes(&self, source_key: &str, entries: Vec<RoutingEntry>) -> bool {
        {
            let sources = self.read_sources();
            if let Some(existing) = sources.get(source_key) {
                if same_entries(existing, &entries) {
                    debug!(
                        event = events::ROUTE_TABLE_REPLACE_SKIPPED,
                        component = COMPONENT,
                        source_key,
                        entry_count = entries.len(),
                        "routing entries unchanged"
                    );
                    return false;
                }
            }
        }

        let entry_count = entries.len();
        let mut sources = self.write_sources();
        sources.insert(source_key.to_string(), entries);

        let known_types = self.lock_known_types();
        self.publish(build_snapshot(&known_types, &sources));

        debug!(
            event = events::ROUTE_TABLE_REPLACED,
            component = COMPONENT,
            source_key,
            entry_count,
            generation = self.generation(),
            "replaced routing entries"
        );
        true
    }

    /// Route groups for a concrete type, in first-registered order.
    pub fn get_routes_for(&self, message_type: &MessageType) -> Arc<[RouteGroup]> {
        if let Some(groups) = self.routes.load().get(message_type) {
            return groups.clone();
        }

        let sources = self.read_sources();
        let mut known_types = self.lock_known_types();

        if let Some(groups) = self.routes.load().get(message_type) {
            return groups.clone();
        }

        known_types.insert(message_type.clone());
        let snapshot = build_snapshot(&known_types, &sources);
        let groups = snapshot
            .get(message_type)
            .cloned()
            .unwrap_or_else(|| Arc::from(Vec::new()));
        self.publish(snapshot);
        groups
    }

    /// Number of times the derived cache has been rebuilt and republished.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    fn publish(&self, snapshot: RouteSnapshot) {
        let type_count = snapshot.len();
        self.routes.store(Arc::new(snapshot));
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;

        debug!(
            event = events::ROUTE_TABLE_REBUILT,
            component = COMPONENT,
            type_count,
            generation,
            "published route cache"
        );
    }

    fn read_sources(&self) -> RwLockReadGuard<'_, SourceEntries> {
        match self.sources.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write_sources(&self) -> RwLockWriteGuard<'_, SourceEntries> {
        match self.sources.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn lock_known_types(&self) -> MutexGuard<'_, HashSet<MessageType>> {
        match self.known_types.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

fn same_entries(existing: &[RoutingEntry], replacement: &[RoutingEntry]) -> bool {
    let existing: HashSet<&RoutingEntry> = existing.iter().collect();
    let replacement: HashSet<&RoutingEntry> = replacement.iter().collect();
    existing == replacement
}

fn build_snapshot(known_types: &HashSet<MessageType>, sources: &SourceEntries) -> RouteSnapshot {
    let mut source_keys: Vec<&String> = sources.keys().collect();
    source_keys.sort();

    known_types
        .iter()
        .map(|message_type| {
            let groups = group_routes(
                message_type,
                source_keys
                    .iter()
                    .flat_map(|key| sources.get(*key).into_iter().flatten()),
            );
            (message_type.clone(), Arc::from(groups))
        })
        .collect()
}

fn group_routes<'a>(
    message_type: &MessageType,
    entries: impl Iterator<Item = &'a RoutingEntry>,
) -> Vec<RouteGroup> {
    let mut groups: Vec<RouteGroup> = Vec::new();

    for entry in entries.filter(|entry| entry.type_spec.matches(message_type)) {
        let endpoint_name = entry.route.endpoint_name();
        match groups
            .iter_mut()
            .find(|group| group.endpoint_name.as_deref() == endpoint_name)
        {
            Some(group) => {
                if !group.routes.contains(&entry.route) {
                    group.routes.push(entry.route.clone());
                }
            }
            None => groups.push(RouteGroup {
                endpoint_name: endpoint_name.map(str::to_string),
                routes: vec![entry.route.clone()],
            }),
        }
    }

    groups
}
