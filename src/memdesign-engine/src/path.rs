// Copyright 2026 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Master-to-slave path enumeration over the interconnect.
//!
//! A path starts at an initiator bound to an address space and alternates
//! edge kinds: a physical (external) hop to another instance, then an
//! internal hop across that instance (a bridge or an interconnect channel),
//! then external again, until it reaches a target bound to a memory map.

use std::collections::{HashMap, HashSet};

use memdesign_core::datamodel::{ConnectivityGraph, EdgeKind, MemoryItem, MemoryItemKind};
use smallvec::SmallVec;
use tracing::debug;

use crate::graph::{InterconnectGraph, InterfaceId};

pub type PathNodes = SmallVec<[InterfaceId; 8]>;

/// An ordered, non-empty interface sequence from an initiator to a target.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Path {
    interfaces: PathNodes,
}

impl Path {
    pub fn new(interfaces: PathNodes) -> Option<Self> {
        if interfaces.is_empty() {
            None
        } else {
            Some(Path { interfaces })
        }
    }

    pub fn interfaces(&self) -> &[InterfaceId] {
        &self.interfaces
    }

    pub fn start(&self) -> InterfaceId {
        self.interfaces[0]
    }

    pub fn end(&self) -> InterfaceId {
        self.interfaces[self.interfaces.len() - 1]
    }

    /// A single-interface path reaches the start space's own memory map.
    pub fn is_local(&self) -> bool {
        self.interfaces.len() == 1
    }

    /// Interfaces strictly between the start and the end.
    pub fn intermediates(&self) -> &[InterfaceId] {
        let len = self.interfaces.len();
        if len <= 2 {
            &[]
        } else {
            &self.interfaces[1..len - 1]
        }
    }

    pub fn len(&self) -> usize {
        self.interfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interfaces.is_empty()
    }
}

pub struct PathFinder<'a> {
    model: &'a ConnectivityGraph,
    graph: &'a InterconnectGraph,
}

impl<'a> PathFinder<'a> {
    pub fn new(model: &'a ConnectivityGraph, graph: &'a InterconnectGraph) -> Self {
        PathFinder { model, graph }
    }

    fn bound_memory(&self, id: InterfaceId) -> Option<&'a MemoryItem> {
        let iface = self.model.interfaces.get(id.0)?;
        let memory = iface.memory.as_deref()?;
        self.model.memory_item(memory)
    }

    fn instance(&self, id: InterfaceId) -> Option<&'a str> {
        self.model
            .interfaces
            .get(id.0)
            .and_then(|iface| iface.instance.as_deref())
    }

    /// Initiator bound to an address space.
    fn is_start(&self, id: InterfaceId) -> bool {
        let Some(iface) = self.model.interfaces.get(id.0) else {
            return false;
        };
        iface.mode.is_initiator()
            && self
                .bound_memory(id)
                .is_some_and(|item| item.kind == MemoryItemKind::AddressSpace)
    }

    /// Target bound to a memory map.
    fn is_terminal(&self, id: InterfaceId) -> bool {
        let Some(iface) = self.model.interfaces.get(id.0) else {
            return false;
        };
        iface.mode.is_target()
            && self
                .bound_memory(id)
                .is_some_and(|item| item.kind.is_memory_map())
    }

    /// Enumerate every simple master-to-slave path, in interface
    /// declaration order.
    pub fn find_master_slave_paths(&self) -> Vec<Path> {
        let mut paths = Vec::new();

        for start in self.graph.nodes() {
            if !self.is_start(*start) {
                continue;
            }

            if self
                .bound_memory(*start)
                .and_then(MemoryItem::local_memory_map)
                .is_some()
            {
                paths.push(Path {
                    interfaces: SmallVec::from_slice(&[*start]),
                });
            }

            if self.graph.degree(start) == 0 {
                continue;
            }

            let mut stack: PathNodes = SmallVec::new();
            stack.push(*start);
            let mut entered: HashSet<&'a str> = HashSet::new();
            if let Some(instance) = self.instance(*start) {
                entered.insert(instance);
            }
            self.extend(&mut stack, &mut entered, &mut paths);
        }

        debug!(count = paths.len(), "found master-slave paths");
        paths
    }

    fn extend(&self, stack: &mut PathNodes, entered: &mut HashSet<&'a str>, paths: &mut Vec<Path>) {
        let current = stack[stack.len() - 1];
        // odd lengths sit on an initiator side and leave the instance
        let kind = if stack.len() % 2 == 1 {
            EdgeKind::External
        } else {
            EdgeKind::Internal
        };

        let next: Vec<InterfaceId> = self
            .graph
            .neighbors_of_kind(&current, kind)
            .copied()
            .collect();

        for neighbor in next {
            if stack.contains(&neighbor) {
                continue;
            }
            let instance = self.instance(neighbor);
            let entering = kind == EdgeKind::External;
            if entering {
                if let Some(instance) = instance {
                    if entered.contains(instance) {
                        continue;
                    }
                }
            }

            stack.push(neighbor);
            if self.is_terminal(neighbor) {
                paths.push(Path {
                    interfaces: stack.clone(),
                });
            } else {
                let newly_entered = entering && instance.is_some_and(|i| entered.insert(i));
                self.extend(stack, entered, paths);
                if newly_entered {
                    if let Some(instance) = instance {
                        entered.remove(instance);
                    }
                }
            }
            stack.pop();
        }
    }
}

/// Identifier of the memory item a path starts from.
pub fn start_memory<'a>(model: &'a ConnectivityGraph, path: &Path) -> Option<&'a str> {
    model.interfaces.get(path.start().0)?.memory.as_deref()
}

/// Identifier of the memory item a path ends at: the bound map of the final
/// interface, or the start space's local map for a single-interface path.
pub fn end_memory<'a>(model: &'a ConnectivityGraph, path: &Path) -> Option<&'a str> {
    if path.is_local() {
        let space = model.memory_item(start_memory(model, path)?)?;
        return space
            .local_memory_map()
            .map(|local| local.identifier.as_str());
    }
    model.interfaces.get(path.end().0)?.memory.as_deref()
}

/// Group paths that share a start or end memory item.
///
/// Sets are ordered by their first path, and paths keep their discovery
/// order inside a set.
pub fn group_into_sets(model: &ConnectivityGraph, paths: Vec<Path>) -> Vec<Vec<Path>> {
    let mut parent: Vec<usize> = (0..paths.len()).collect();

    fn root(parent: &mut [usize], mut i: usize) -> usize {
        while parent[i] != i {
            parent[i] = parent[parent[i]];
            i = parent[i];
        }
        i
    }

    let mut owner: HashMap<&str, usize> = HashMap::new();
    for (i, path) in paths.iter().enumerate() {
        for memory in [start_memory(model, path), end_memory(model, path)]
            .into_iter()
            .flatten()
        {
            match owner.get(memory) {
                Some(&j) => {
                    let (a, b) = (root(&mut parent, i), root(&mut parent, j));
                    if a != b {
                        // keep the earliest path as the representative
                        let (lo, hi) = if a < b { (a, b) } else { (b, a) };
                        parent[hi] = lo;
                    }
                }
                None => {
                    owner.insert(memory, i);
                }
            }
        }
    }

    let mut order: Vec<usize> = Vec::new();
    let mut sets: HashMap<usize, Vec<Path>> = HashMap::new();
    for (i, path) in paths.into_iter().enumerate() {
        let r = root(&mut parent, i);
        if !sets.contains_key(&r) {
            order.push(r);
        }
        sets.entry(r).or_default().push(path);
    }

    order
        .into_iter()
        .filter_map(|r| sets.remove(&r))
        .collect()
}
