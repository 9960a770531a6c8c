// Copyright 2026 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Fluent construction of connectivity models.
//!
//! Identifiers follow the `instance.element` convention: the text before
//! the first `.` names the owning component instance.

use crate::datamodel::{
    ConnectivityEdge, ConnectivityGraph, EdgeKind, Interface, InterfaceMode, MemoryItem,
    MemoryItemKind,
};

fn instance_of(identifier: &str) -> Option<String> {
    identifier
        .split_once('.')
        .map(|(instance, _)| instance.to_owned())
}

fn item(identifier: &str, kind: MemoryItemKind, base: &str, range: &str) -> MemoryItem {
    MemoryItem {
        identifier: identifier.to_owned(),
        name: identifier
            .rsplit('.')
            .next()
            .unwrap_or(identifier)
            .to_owned(),
        kind,
        instance: instance_of(identifier),
        base_address: base.to_owned(),
        range: range.to_owned(),
        children: vec![],
    }
}

fn find_mut<'a>(items: &'a mut [MemoryItem], identifier: &str) -> Option<&'a mut MemoryItem> {
    for candidate in items.iter_mut() {
        if candidate.identifier == identifier {
            return Some(candidate);
        }
        if let Some(found) = find_mut(&mut candidate.children, identifier) {
            return Some(found);
        }
    }
    None
}

#[derive(Clone, Debug, Default)]
pub struct ModelBuilder {
    graph: ConnectivityGraph,
}

impl ModelBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn address_space(&mut self, identifier: &str, base: &str, range: &str) -> &mut Self {
        self.graph
            .memory_items
            .push(item(identifier, MemoryItemKind::AddressSpace, base, range));
        self
    }

    pub fn memory_map(&mut self, identifier: &str, base: &str, range: &str) -> &mut Self {
        self.graph
            .memory_items
            .push(item(identifier, MemoryItemKind::MemoryMap, base, range));
        self
    }

    /// Attach a nested item (local memory map, address block, register...)
    /// to an already declared memory item. Unknown parents are ignored.
    pub fn child(
        &mut self,
        parent: &str,
        identifier: &str,
        kind: MemoryItemKind,
        base: &str,
        range: &str,
    ) -> &mut Self {
        if let Some(parent) = find_mut(&mut self.graph.memory_items, parent) {
            parent.children.push(item(identifier, kind, base, range));
        }
        self
    }

    pub fn local_memory_map(
        &mut self,
        space: &str,
        identifier: &str,
        base: &str,
        range: &str,
    ) -> &mut Self {
        self.child(space, identifier, MemoryItemKind::LocalMemoryMap, base, range)
    }

    fn interface(
        &mut self,
        identifier: &str,
        mode: InterfaceMode,
        memory: Option<&str>,
        base: &str,
    ) -> &mut Interface {
        self.graph.interfaces.push(Interface {
            identifier: identifier.to_owned(),
            name: String::new(),
            instance: instance_of(identifier),
            mode,
            memory: memory.map(str::to_owned),
            base_address: base.to_owned(),
            remap_address: None,
            remap_range: None,
        });
        let last = self.graph.interfaces.len() - 1;
        &mut self.graph.interfaces[last]
    }

    pub fn master(&mut self, identifier: &str, space: Option<&str>, base: &str) -> &mut Self {
        self.interface(identifier, InterfaceMode::Master, space, base);
        self
    }

    pub fn slave(&mut self, identifier: &str, map: Option<&str>) -> &mut Self {
        self.interface(identifier, InterfaceMode::Slave, map, "x");
        self
    }

    pub fn mirrored_slave(&mut self, identifier: &str, remap: Option<(&str, &str)>) -> &mut Self {
        let iface = self.interface(identifier, InterfaceMode::MirroredSlave, None, "x");
        if let Some((address, range)) = remap {
            iface.remap_address = Some(address.to_owned());
            iface.remap_range = Some(range.to_owned());
        }
        self
    }

    pub fn mirrored_master(&mut self, identifier: &str) -> &mut Self {
        self.interface(identifier, InterfaceMode::MirroredMaster, None, "x");
        self
    }

    /// Physical connection between two instances.
    pub fn connect(&mut self, from: &str, to: &str) -> &mut Self {
        self.edge(from, to, EdgeKind::External)
    }

    /// Bridge or channel inside one instance.
    pub fn bridge(&mut self, from: &str, to: &str) -> &mut Self {
        self.edge(from, to, EdgeKind::Internal)
    }

    fn edge(&mut self, from: &str, to: &str, kind: EdgeKind) -> &mut Self {
        self.graph.edges.push(ConnectivityEdge {
            from: from.to_owned(),
            to: to.to_owned(),
            kind,
        });
        self
    }

    pub fn build(&self) -> ConnectivityGraph {
        self.graph.clone()
    }
}
