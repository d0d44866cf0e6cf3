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

//! Message-type identity and the exact/range matching used by routing entries.

use crate::error::GatewayError;
use std::fmt;

/// A concrete message type: `namespace.name` inside `assembly`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageType {
    pub name: String,
    pub namespace: String,
    pub assembly: String,
}

impl MessageType {
    pub fn new(
        namespace: impl Into<String>,
        name: impl Into<String>,
        assembly: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            assembly: assembly.into(),
        }
    }

    /// Parses an assembly-qualified name such as `Ns.Inner.Name, Assembly, Version=1.0.0.0`.
    ///
    /// Only the first two comma-separated parts are significant. The namespace is whatever
    /// precedes the last `.` of the full name; a missing assembly part yields an empty
    /// assembly.
    pub fn parse(qualified_name: &str) -> Result<Self, GatewayError> {
        let mut parts = qualified_name.split(',');
        let full_name = parts.next().unwrap_or_default().trim();
        let assembly = parts.next().unwrap_or_default().trim();

        if full_name.is_empty() {
            return Err(GatewayError::protocol(format!(
                "Message type '{qualified_name}' does not contain a type name"
            )));
        }

        let (namespace, name) = match full_name.rfind('.') {
            Some(split_at) => (&full_name[..split_at], &full_name[split_at + 1..]),
            None => ("", full_name),
        };

        if name.is_empty() {
            return Err(GatewayError::protocol(format!(
                "Message type '{qualified_name}' ends with a namespace separator"
            )));
        }

        Ok(Self::new(namespace, name, assembly))
    }

    pub fn full_name(&self) -> String {
        if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.namespace, self.name)
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.full_name(), self.assembly)
    }
}

/// Every type of an assembly, optionally narrowed to a namespace subtree.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MessageTypeRange {
    pub namespace: Option<String>,
    pub assembly: String,
}

impl MessageTypeRange {
    pub fn assembly(assembly: impl Into<String>) -> Self {
        Self {
            namespace: None,
            assembly: assembly.into(),
        }
    }

    pub fn namespace(assembly: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            assembly: assembly.into(),
        }
    }

    pub fn contains(&self, message_type: &MessageType) -> bool {
        if self.assembly != message_type.assembly {
            return false;
        }
        match self.namespace.as_deref() {
            None | Some("") => true,
            Some(namespace) => namespace_contains(namespace, &message_type.namespace),
        }
    }

    fn overlaps(&self, other: &MessageTypeRange) -> bool {
        if self.assembly != other.assembly {
            return false;
        }
        match (self.namespace.as_deref(), other.namespace.as_deref()) {
            (None, _) | (_, None) | (Some(""), _) | (_, Some("")) => true,
            (Some(left), Some(right)) => {
                namespace_contains(left, right) || namespace_contains(right, left)
            }
        }
    }
}

/// `outer` equals `inner` or is one of its enclosing namespaces.
fn namespace_contains(outer: &str, inner: &str) -> bool {
    match inner.strip_prefix(outer) {
        Some("") => true,
        Some(rest) => rest.starts_with('.'),
        None => false,
    }
}

/// The type selector of a routing entry.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum MessageTypeSpec {
    Exact(MessageType),
    Range(MessageTypeRange),
}

impl MessageTypeSpec {
    /// Symmetric: `a.overlaps(b) == b.overlaps(a)`.
    pub fn overlaps(&self, other: &MessageTypeSpec) -> bool {
        match (self, other) {
            (MessageTypeSpec::Exact(left), MessageTypeSpec::Exact(right)) => left == right,
            (MessageTypeSpec::Exact(exact), MessageTypeSpec::Range(range))
            | (MessageTypeSpec::Range(range), MessageTypeSpec::Exact(exact)) => {
                range.contains(exact)
            }
            (MessageTypeSpec::Range(left), MessageTypeSpec::Range(right)) => left.overlaps(right),
        }
    }

    pub fn matches(&self, message_type: &MessageType) -> bool {
        match self {
            MessageTypeSpec::Exact(exact) => exact == message_type,
            MessageTypeSpec::Range(range) => range.contains(message_type),
        }
    }
}

impl From<MessageType> for MessageTypeSpec {
    fn from(value: MessageType) -> Self {
        MessageTypeSpec::Exact(value)
    }
}

impl From<MessageTypeRange> for MessageTypeSpec {
    fn from(value: MessageTypeRange) -> Self {
        MessageTypeSpec::Range(value)
    }
}
