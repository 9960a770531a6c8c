// Copyright 2026 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Arena of blocks, connections, columns and collisions.
//!
//! Everything refers to everything else through integer handles, so a
//! block can list its connections and a column its blocks without any
//! shared ownership.

use std::collections::{BTreeSet, VecDeque};

use serde::Serialize;

use crate::constants::RANGE_SCALE;

/// Spans closer than this are treated as touching rather than overlapping.
const SPAN_EPSILON: f64 = 1e-6;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct BlockId(pub usize);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ConnectionId(pub usize);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ColumnId(pub usize);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct CollisionId(pub usize);

/// Vertical interval `[top, bottom)`.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct Span {
    pub top: f64,
    pub bottom: f64,
}

impl Span {
    pub fn new(top: f64, bottom: f64) -> Self {
        Span { top, bottom }
    }

    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    pub fn overlaps(&self, other: &Span) -> bool {
        self.top < other.bottom - SPAN_EPSILON && other.top < self.bottom - SPAN_EPSILON
    }

    pub fn union(&self, other: &Span) -> Span {
        Span {
            top: self.top.min(other.top),
            bottom: self.bottom.max(other.bottom),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum BlockKind {
    AddressSpace,
    MemoryMap,
}

/// Continuation of a block drawn past its own range because attached
/// connections reach further.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct Extension {
    pub top: f64,
    pub bottom: f64,
}

#[derive(Clone, Debug, Serialize)]
pub struct LayoutBlock {
    pub id: BlockId,
    /// Identifier of the memory item this block draws.
    pub memory: String,
    pub name: String,
    pub kind: BlockKind,
    pub base_address: u64,
    pub last_address: u64,
    pub column: Option<ColumnId>,
    pub y: f64,
    pub height: f64,
    pub sub_extent: f64,
    pub extension: Option<Extension>,
    pub visible: bool,
    pub placed: bool,
    pub outgoing: Vec<ConnectionId>,
    pub incoming: Vec<ConnectionId>,
    pub collisions: Vec<CollisionId>,
    /// Address ranges of nested items drawn inside the block.
    pub child_ranges: Vec<(u64, u64)>,
}

impl LayoutBlock {
    pub fn own_span(&self) -> Span {
        Span::new(self.y, self.y + self.height + self.sub_extent)
    }

    pub fn is_connected(&self) -> bool {
        !self.outgoing.is_empty() || !self.incoming.is_empty()
    }

    /// Placed, visible and sitting in a column.
    pub fn is_laid_out(&self) -> bool {
        self.placed && self.visible && self.column.is_some()
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ConnectionKind {
    /// Address space to memory map across the interconnect.
    Map,
    /// Address space to its own local memory map.
    LocalMap,
    /// Address space to a chained address space behind a bridge.
    SpaceChain,
}

#[derive(Clone, Debug, Serialize)]
pub struct Connection {
    pub id: ConnectionId,
    pub start: BlockId,
    pub end: BlockId,
    pub kind: ConnectionKind,
    /// Address space whose initiator sees `[base_address, end_address]`.
    /// Differs from `start` when the connection is drawn from a chained
    /// space.
    pub origin: BlockId,
    pub base_address: u64,
    pub end_address: u64,
    /// Offset of the connection top from the start block's top.
    pub y_offset: f64,
    pub height: f64,
    pub has_remap_range: bool,
}

impl Connection {
    pub fn overlapping_range(&self, other: &Connection) -> Option<(u64, u64)> {
        let base = self.base_address.max(other.base_address);
        let end = self.end_address.min(other.end_address);
        if base <= end { Some((base, end)) } else { None }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ColumnKind {
    AddressSpace,
    MemoryMap,
    MapOverlap,
}

impl ColumnKind {
    pub fn accepts(self, kind: BlockKind) -> bool {
        match self {
            ColumnKind::AddressSpace => kind == BlockKind::AddressSpace,
            ColumnKind::MemoryMap | ColumnKind::MapOverlap => kind == BlockKind::MemoryMap,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct Column {
    pub id: ColumnId,
    pub name: String,
    pub kind: ColumnKind,
    pub blocks: Vec<BlockId>,
}

/// Two connections reaching overlapping addresses.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Collision {
    pub id: CollisionId,
    pub first: ConnectionId,
    pub second: ConnectionId,
    /// Block both connections share.
    pub block: BlockId,
    pub base_address: u64,
    pub end_address: u64,
}

#[derive(Clone, Debug, Serialize)]
pub struct Scene {
    pub blocks: Vec<LayoutBlock>,
    pub connections: Vec<Connection>,
    pub columns: Vec<Column>,
    /// Columns from left to right.
    pub column_order: Vec<ColumnId>,
    pub collisions: Vec<Collision>,
    pub space_column: ColumnId,
    pub map_column: ColumnId,
}

impl Scene {
    pub fn new(address_space_column: &str, memory_map_column: &str) -> Self {
        let mut scene = Scene {
            blocks: Vec::new(),
            connections: Vec::new(),
            columns: Vec::new(),
            column_order: Vec::new(),
            collisions: Vec::new(),
            space_column: ColumnId(0),
            map_column: ColumnId(1),
        };
        scene.space_column = scene.push_column(address_space_column, ColumnKind::AddressSpace, false);
        scene.map_column = scene.push_column(memory_map_column, ColumnKind::MemoryMap, false);
        scene
    }

    pub fn block(&self, id: BlockId) -> &LayoutBlock {
        &self.blocks[id.0]
    }

    pub fn block_mut(&mut self, id: BlockId) -> &mut LayoutBlock {
        &mut self.blocks[id.0]
    }

    pub fn connection(&self, id: ConnectionId) -> &Connection {
        &self.connections[id.0]
    }

    pub fn connection_mut(&mut self, id: ConnectionId) -> &mut Connection {
        &mut self.connections[id.0]
    }

    pub fn column(&self, id: ColumnId) -> &Column {
        &self.columns[id.0]
    }

    pub fn add_block(
        &mut self,
        memory: &str,
        name: &str,
        kind: BlockKind,
        (base_address, last_address): (u64, u64),
        height: f64,
        child_ranges: Vec<(u64, u64)>,
    ) -> BlockId {
        let id = BlockId(self.blocks.len());
        self.blocks.push(LayoutBlock {
            id,
            memory: memory.to_owned(),
            name: name.to_owned(),
            kind,
            base_address,
            last_address,
            column: None,
            y: 0.0,
            height,
            sub_extent: 0.0,
            extension: None,
            visible: true,
            placed: false,
            outgoing: Vec::new(),
            incoming: Vec::new(),
            collisions: Vec::new(),
            child_ranges,
        });
        id
    }

    /// Create a column at the far left or far right of the diagram.
    pub fn push_column(&mut self, name: &str, kind: ColumnKind, leftmost: bool) -> ColumnId {
        let id = ColumnId(self.columns.len());
        self.columns.push(Column {
            id,
            name: name.to_owned(),
            kind,
            blocks: Vec::new(),
        });
        if leftmost {
            self.column_order.insert(0, id);
        } else {
            self.column_order.push(id);
        }
        id
    }

    /// Drop empty overflow columns from the column order.
    pub fn remove_empty_overlap_columns(&mut self) {
        let columns = &self.columns;
        self.column_order.retain(|id| {
            let column = &columns[id.0];
            column.kind != ColumnKind::MapOverlap || !column.blocks.is_empty()
        });
    }

    pub fn column_index(&self, id: ColumnId) -> Option<usize> {
        self.column_order.iter().position(|c| *c == id)
    }

    /// Columns able to hold blocks of `kind`, left to right.
    pub fn columns_for(&self, kind: BlockKind) -> Vec<ColumnId> {
        self.column_order
            .iter()
            .copied()
            .filter(|id| self.columns[id.0].kind.accepts(kind))
            .collect()
    }

    pub fn set_column(&mut self, block: BlockId, column: Option<ColumnId>) {
        if let Some(old) = self.blocks[block.0].column {
            self.columns[old.0].blocks.retain(|b| *b != block);
        }
        if let Some(new) = column {
            self.columns[new.0].blocks.push(block);
        }
        self.blocks[block.0].column = column;
    }

    /// Connect `start` to `end`. The range is taken to be in `start`'s own
    /// addresses until `origin` says otherwise.
    pub fn add_connection(
        &mut self,
        start: BlockId,
        end: BlockId,
        kind: ConnectionKind,
        (base_address, end_address): (u64, u64),
        y_offset: f64,
        has_remap_range: bool,
    ) -> ConnectionId {
        let id = ConnectionId(self.connections.len());
        let height = ((end_address - base_address) as f64 + 1.0) * RANGE_SCALE;
        self.connections.push(Connection {
            id,
            start,
            end,
            origin: start,
            kind,
            base_address,
            end_address,
            y_offset,
            height,
            has_remap_range,
        });
        self.blocks[start.0].outgoing.push(id);
        self.blocks[end.0].incoming.push(id);
        id
    }

    pub fn connection_span(&self, id: ConnectionId) -> Span {
        let conn = &self.connections[id.0];
        let top = self.blocks[conn.start.0].y + conn.y_offset;
        Span::new(top, top + conn.height)
    }

    /// The block's own span widened by every attached connection.
    pub fn block_span(&self, id: BlockId) -> Span {
        let block = &self.blocks[id.0];
        block
            .outgoing
            .iter()
            .chain(block.incoming.iter())
            .fold(block.own_span(), |span, conn| {
                span.union(&self.connection_span(*conn))
            })
    }

    /// First laid-out block in `column` whose span overlaps `block`.
    pub fn find_overlap(&self, block: BlockId, column: ColumnId) -> Option<BlockId> {
        let span = self.block_span(block);
        self.columns[column.0]
            .blocks
            .iter()
            .copied()
            .filter(|other| *other != block && self.blocks[other.0].is_laid_out())
            .find(|other| span.overlaps(&self.block_span(*other)))
    }

    pub fn is_free(&self, block: BlockId, column: ColumnId) -> bool {
        self.find_overlap(block, column).is_none()
    }

    /// Every block reachable from `block` through connections, sorted.
    pub fn group(&self, block: BlockId) -> BTreeSet<BlockId> {
        let mut seen = BTreeSet::new();
        let mut queue = VecDeque::from([block]);
        seen.insert(block);
        while let Some(current) = queue.pop_front() {
            let b = &self.blocks[current.0];
            for conn in b.outgoing.iter().chain(b.incoming.iter()) {
                let conn = &self.connections[conn.0];
                for next in [conn.start, conn.end] {
                    if seen.insert(next) {
                        queue.push_back(next);
                    }
                }
            }
        }
        seen
    }

    pub fn move_blocks<'a>(&mut self, blocks: impl IntoIterator<Item = &'a BlockId>, dy: f64) {
        for id in blocks {
            self.blocks[id.0].y += dy;
        }
    }

    /// Lowest bottom edge of the laid-out blocks in a column.
    pub fn lowest_point(&self, column: ColumnId) -> Option<f64> {
        self.columns[column.0]
            .blocks
            .iter()
            .filter(|id| self.blocks[id.0].is_laid_out())
            .map(|id| self.block_span(*id).bottom)
            .reduce(f64::max)
    }

    pub fn find_block(&self, memory: &str) -> Option<&LayoutBlock> {
        self.blocks.iter().find(|block| block.memory == memory)
    }
}
