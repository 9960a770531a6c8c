// Copyright 2026 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt::{self, Display};
use std::hash::Hash;

use memdesign_core::datamodel::{ConnectivityGraph, EdgeKind};
use memdesign_core::{Error, ErrorCode, ErrorKind};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Index of an interface in `ConnectivityGraph::interfaces`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InterfaceId(pub usize);

impl Display for InterfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "if{}", self.0)
    }
}

/// Trait bound for graph node identifiers.
pub trait NodeId: Hash + Eq + Clone + Ord + Display {}
impl<T: Hash + Eq + Clone + Ord + Display> NodeId for T {}

/// Immutable undirected graph. Use `GraphBuilder` to construct.
///
/// Adjacency is kept in ordered maps so that every traversal visits
/// neighbours in the same order, which keeps path discovery deterministic.
pub struct Graph<N: NodeId> {
    nodes: BTreeSet<N>,
    adj: BTreeMap<N, BTreeSet<(N, EdgeKind)>>,
}

impl<N: NodeId> Graph<N> {
    pub fn nodes(&self) -> impl Iterator<Item = &N> {
        self.nodes.iter()
    }

    /// Neighbours reachable over edges of a single kind.
    pub fn neighbors_of_kind<'a>(
        &'a self,
        node: &'a N,
        kind: EdgeKind,
    ) -> impl Iterator<Item = &'a N> + 'a {
        self.adj
            .get(node)
            .into_iter()
            .flat_map(move |set| set.iter().filter(move |(_, k)| *k == kind).map(|(n, _)| n))
    }

    pub fn degree(&self, node: &N) -> usize {
        self.adj.get(node).map_or(0, |set| set.len())
    }
}

pub struct GraphBuilder<N: NodeId> {
    nodes: BTreeSet<N>,
    adj: BTreeMap<N, BTreeSet<(N, EdgeKind)>>,
}

impl<N: NodeId> Default for GraphBuilder<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N: NodeId> GraphBuilder<N> {
    pub fn new() -> Self {
        GraphBuilder {
            nodes: BTreeSet::new(),
            adj: BTreeMap::new(),
        }
    }

    pub fn add_node(&mut self, node: N) -> &mut Self {
        self.nodes.insert(node);
        self
    }

    /// Add an undirected edge. Self-loops and exact duplicates are ignored.
    pub fn add_edge(&mut self, from: N, to: N, kind: EdgeKind) -> &mut Self {
        if from == to {
            return self;
        }
        self.nodes.insert(from.clone());
        self.nodes.insert(to.clone());

        let inserted = self
            .adj
            .entry(from.clone())
            .or_default()
            .insert((to.clone(), kind));
        if !inserted {
            return self;
        }
        self.adj.entry(to).or_default().insert((from, kind));
        self
    }

    pub fn build(self) -> Graph<N> {
        Graph {
            nodes: self.nodes,
            adj: self.adj,
        }
    }
}

pub type InterconnectGraph = Graph<InterfaceId>;

/// Index the interconnect of a connectivity model.
///
/// Every interface becomes a node, including unconnected ones. Edges whose
/// endpoints do not resolve are dropped and reported; they never abort
/// indexing.
pub fn index_interconnect(model: &ConnectivityGraph) -> (InterconnectGraph, Vec<Error>) {
    let mut diagnostics = Vec::new();
    let mut ids: HashMap<&str, InterfaceId> = HashMap::with_capacity(model.interfaces.len());
    let mut builder = GraphBuilder::new();

    for (i, iface) in model.interfaces.iter().enumerate() {
        let id = InterfaceId(i);
        if ids.contains_key(iface.identifier.as_str()) {
            warn!(interface = %iface.identifier, "duplicate interface identifier");
            diagnostics.push(Error::new(
                ErrorKind::Model,
                ErrorCode::DuplicateIdentifier,
                Some(iface.identifier.clone()),
            ));
        } else {
            ids.insert(iface.identifier.as_str(), id);
        }
        builder.add_node(id);
    }

    for edge in &model.edges {
        match (ids.get(edge.from.as_str()), ids.get(edge.to.as_str())) {
            (Some(&from), Some(&to)) => {
                builder.add_edge(from, to, edge.kind);
            }
            _ => {
                warn!(from = %edge.from, to = %edge.to, "edge references an unknown interface");
                diagnostics.push(Error::new(
                    ErrorKind::Model,
                    ErrorCode::UnknownInterface,
                    Some(format!("{} -> {}", edge.from, edge.to)),
                ));
            }
        }
    }

    (builder.build(), diagnostics)
}
