// Copyright 2026 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Read-only connectivity model consumed by the layout engine.
//!
//! A [`ConnectivityGraph`] is a flat list of bus-interface endpoints, the
//! memory items those endpoints are bound to, and the edges between
//! endpoints. Symbolic expressions have already been evaluated upstream, so
//! address fields hold literal strings (or `"x"` when unknown).
//!
//! # Example
//! ```
//! use memdesign_core::datamodel::ConnectivityGraph;
//!
//! let json = r#"{"memoryItems": [], "interfaces": [], "edges": []}"#;
//! let graph = ConnectivityGraph::from_json(json)?;
//! assert!(graph.interfaces.is_empty());
//! # Ok::<(), memdesign_core::Error>(())
//! ```

#[cfg(feature = "schema")]
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::common::{Error, ErrorCode, ErrorKind, Result, address_or_zero};

// Helper functions for serde skip_serializing_if

fn is_empty_vec<T>(val: &[T]) -> bool {
    val.is_empty()
}

fn is_empty_string(val: &str) -> bool {
    val.is_empty()
}

fn unknown_address() -> String {
    "x".to_owned()
}

/// Bus-interface role.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[serde(rename_all = "camelCase")]
pub enum InterfaceMode {
    #[serde(alias = "initiator")]
    Master,
    #[serde(alias = "target")]
    Slave,
    #[serde(alias = "mirroredTarget")]
    MirroredSlave,
    #[serde(alias = "mirroredInitiator")]
    MirroredMaster,
}

impl InterfaceMode {
    pub fn is_initiator(self) -> bool {
        self == InterfaceMode::Master
    }

    /// Target-like modes may terminate a path at a memory map.
    pub fn is_target(self) -> bool {
        matches!(self, InterfaceMode::Slave | InterfaceMode::MirroredSlave)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[serde(rename_all = "camelCase")]
pub enum MemoryItemKind {
    AddressSpace,
    MemoryMap,
    LocalMemoryMap,
    AddressBlock,
    Register,
    Field,
    Segment,
}

impl MemoryItemKind {
    /// Kinds that get their own block in a layout column.
    pub fn is_placeable(self) -> bool {
        matches!(
            self,
            MemoryItemKind::AddressSpace | MemoryItemKind::MemoryMap | MemoryItemKind::LocalMemoryMap
        )
    }

    pub fn is_memory_map(self) -> bool {
        matches!(self, MemoryItemKind::MemoryMap | MemoryItemKind::LocalMemoryMap)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[serde(rename_all = "camelCase")]
pub struct MemoryItem {
    /// Unique across the whole graph, e.g. `cpu0.spaces.main`.
    pub identifier: String,
    #[serde(skip_serializing_if = "is_empty_string", default)]
    pub name: String,
    pub kind: MemoryItemKind,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub instance: Option<String>,
    #[serde(default)]
    pub base_address: String,
    #[serde(default)]
    pub range: String,
    #[serde(skip_serializing_if = "is_empty_vec", default)]
    pub children: Vec<MemoryItem>,
}

impl MemoryItem {
    pub fn base_address(&self) -> u64 {
        address_or_zero(&self.base_address)
    }

    pub fn range(&self) -> u64 {
        address_or_zero(&self.range)
    }

    /// Last addressable unit; an empty range collapses onto the base.
    pub fn last_address(&self) -> u64 {
        self.base_address()
            .saturating_add(self.range().saturating_sub(1))
    }

    /// The memory map owned directly by this address space, if any.
    pub fn local_memory_map(&self) -> Option<&MemoryItem> {
        if self.kind != MemoryItemKind::AddressSpace {
            return None;
        }
        self.children.iter().find(|child| child.kind.is_memory_map())
    }

    /// Address ranges of the nested items drawn inside this block.
    pub fn child_ranges(&self) -> impl Iterator<Item = (u64, u64)> + '_ {
        self.children
            .iter()
            .filter(|child| !child.kind.is_memory_map())
            .map(|child| (child.base_address(), child.last_address()))
    }

    fn find(&self, identifier: &str) -> Option<&MemoryItem> {
        if self.identifier == identifier {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(identifier))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[serde(rename_all = "camelCase")]
pub struct Interface {
    /// Unique across the whole graph, e.g. `cpu0.ahb_master`.
    pub identifier: String,
    #[serde(skip_serializing_if = "is_empty_string", default)]
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub instance: Option<String>,
    pub mode: InterfaceMode,
    /// Identifier of the bound address space or memory map.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub memory: Option<String>,
    #[serde(default = "unknown_address")]
    pub base_address: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub remap_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub remap_range: Option<String>,
}

impl Interface {
    pub fn base_address(&self) -> u64 {
        address_or_zero(&self.base_address)
    }

    /// Remap window of a mirrored slave, present only when both halves are set.
    pub fn remap(&self) -> Option<(u64, u64)> {
        let address = self.remap_address.as_deref()?;
        let range = self.remap_range.as_deref()?;
        if address.trim().is_empty() || range.trim().is_empty() {
            return None;
        }
        Some((address_or_zero(address), address_or_zero(range)))
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[serde(rename_all = "camelCase")]
pub enum EdgeKind {
    /// Bridge or channel inside a single component instance.
    Internal,
    /// Physical connection between two instances.
    External,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[serde(rename_all = "camelCase")]
pub struct ConnectivityEdge {
    pub from: String,
    pub to: String,
    pub kind: EdgeKind,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[serde(rename_all = "camelCase")]
pub struct ConnectivityGraph {
    #[serde(default)]
    pub memory_items: Vec<MemoryItem>,
    #[serde(default)]
    pub interfaces: Vec<Interface>,
    #[serde(default)]
    pub edges: Vec<ConnectivityEdge>,
}

impl ConnectivityGraph {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|err| {
            Error::new(
                ErrorKind::Import,
                ErrorCode::JsonDeserialization,
                Some(err.to_string()),
            )
        })
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|err| {
            Error::new(
                ErrorKind::Import,
                ErrorCode::JsonSerialization,
                Some(err.to_string()),
            )
        })
    }

    pub fn interface(&self, identifier: &str) -> Option<&Interface> {
        self.interfaces
            .iter()
            .find(|iface| iface.identifier == identifier)
    }

    /// Look up a memory item, descending into children so local memory maps
    /// can be found by identifier.
    pub fn memory_item(&self, identifier: &str) -> Option<&MemoryItem> {
        self.memory_items
            .iter()
            .find_map(|item| item.find(identifier))
    }

    /// Report dangling references and duplicate identifiers. An empty list
    /// means every reference in the graph resolves.
    pub fn validate(&self) -> Vec<Error> {
        let mut errors = Vec::new();
        let mut seen = std::collections::HashSet::new();

        for iface in &self.interfaces {
            if !seen.insert(iface.identifier.as_str()) {
                errors.push(Error::new(
                    ErrorKind::Model,
                    ErrorCode::DuplicateIdentifier,
                    Some(iface.identifier.clone()),
                ));
            }
            if let Some(memory) = &iface.memory {
                if self.memory_item(memory).is_none() {
                    errors.push(Error::new(
                        ErrorKind::Model,
                        ErrorCode::UnknownMemoryItem,
                        Some(format!("{} -> {}", iface.identifier, memory)),
                    ));
                }
            }
        }

        for edge in &self.edges {
            for end in [&edge.from, &edge.to] {
                if self.interface(end).is_none() {
                    errors.push(Error::new(
                        ErrorKind::Model,
                        ErrorCode::UnknownInterface,
                        Some(end.clone()),
                    ));
                }
            }
        }

        errors
    }
}

/// Generate the JSON Schema for [`ConnectivityGraph`].
#[cfg(feature = "schema")]
pub fn generate_schema() -> schemars::Schema {
    schemars::schema_for!(ConnectivityGraph)
}

/// Generate the JSON Schema as a formatted JSON string.
#[cfg(feature = "schema")]
pub fn generate_schema_json() -> Result<String> {
    serde_json::to_string_pretty(&generate_schema()).map_err(|err| {
        Error::new(
            ErrorKind::Import,
            ErrorCode::JsonSerialization,
            Some(err.to_string()),
        )
    })
}
