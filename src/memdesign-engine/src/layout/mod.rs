// Copyright 2026 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Memory layout for a connectivity graph.
//!
//! The pipeline is: index the interconnect, enumerate master-to-slave paths,
//! group them into sets sharing a start or end item, then resolve and place
//! each path in turn. Placement is order dependent, since a later path may
//! push blocks placed by an earlier one. Once every path is placed the scene
//! is compressed, overlaps are resolved by changing columns, loose items are
//! stacked at the bottom and collisions are detected.

pub mod arena;
pub mod compress;
pub mod config;
pub mod placement;

use std::collections::HashMap;

use memdesign_core::datamodel::{ConnectivityGraph, MemoryItemKind};
use memdesign_core::{Error, Result, model_err};
use tracing::{debug, warn};

use crate::address::{AddressResolver, ResolvedConnection};
use crate::collision::{attach_collisions, detect_collisions};
use crate::constants::RANGE_SCALE;
use crate::geometry::{SceneGeometry, project};
use crate::graph::index_interconnect;
use crate::path::{Path, PathFinder, group_into_sets};

use self::arena::{
    BlockId, BlockKind, Collision, Column, ColumnId, Connection, ConnectionKind, LayoutBlock,
    Scene,
};
pub use self::config::{LayoutConfig, LayoutOptions};

/// The outcome of `build_layout`: the placed scene plus everything that
/// went wrong on the way.
#[derive(Clone, Debug)]
pub struct LayoutResult {
    scene: Scene,
    config: LayoutConfig,
    options: LayoutOptions,
    diagnostics: Vec<Error>,
    path_count: usize,
}

impl LayoutResult {
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn connections(&self) -> &[Connection] {
        &self.scene.connections
    }

    pub fn collisions(&self) -> &[Collision] {
        &self.scene.collisions
    }

    pub fn blocks(&self) -> &[LayoutBlock] {
        &self.scene.blocks
    }

    /// Columns in left-to-right order.
    pub fn columns(&self) -> impl Iterator<Item = &Column> {
        self.scene
            .column_order
            .iter()
            .map(|id| self.scene.column(*id))
    }

    /// Block drawing the memory item `memory`, if it has one.
    pub fn block(&self, memory: &str) -> Option<&LayoutBlock> {
        self.scene.find_block(memory)
    }

    /// Number of master-to-slave paths found. A connection count below this
    /// means some paths were skipped; `diagnostics` says why.
    pub fn path_count(&self) -> usize {
        self.path_count
    }

    pub fn diagnostics(&self) -> &[Error] {
        &self.diagnostics
    }

    pub fn options(&self) -> LayoutOptions {
        self.options
    }

    /// Project the scene to drawing coordinates. Only reads resolved
    /// placement, so repeated calls give identical geometry.
    pub fn redraw(&self) -> SceneGeometry {
        project(&self.scene, &self.config)
    }
}

/// Lay out `model` with the default geometry.
pub fn build_layout(
    model: &ConnectivityGraph,
    address_space_column: &str,
    memory_map_column: &str,
    options: LayoutOptions,
) -> LayoutResult {
    build_layout_with_config(
        model,
        address_space_column,
        memory_map_column,
        options,
        LayoutConfig::default(),
    )
}

pub fn build_layout_with_config(
    model: &ConnectivityGraph,
    address_space_column: &str,
    memory_map_column: &str,
    options: LayoutOptions,
    config: LayoutConfig,
) -> LayoutResult {
    let mut engine = LayoutEngine::new(model, &config, options, address_space_column, memory_map_column);
    let path_count = engine.run();

    LayoutResult {
        scene: engine.scene,
        diagnostics: engine.diagnostics,
        config,
        options,
        path_count,
    }
}

/// Single layout session. Owns all mutable placement state.
struct LayoutEngine<'a> {
    model: &'a ConnectivityGraph,
    config: &'a LayoutConfig,
    options: LayoutOptions,
    scene: Scene,
    /// Memory item identifier to its block.
    registry: HashMap<String, BlockId>,
    /// Blocks in the order they were first placed.
    placement_order: Vec<BlockId>,
    /// Top of the next free slot in the address space column.
    cursor: f64,
    diagnostics: Vec<Error>,
}

impl<'a> LayoutEngine<'a> {
    fn new(
        model: &'a ConnectivityGraph,
        config: &'a LayoutConfig,
        options: LayoutOptions,
        address_space_column: &str,
        memory_map_column: &str,
    ) -> Self {
        LayoutEngine {
            model,
            config,
            options,
            scene: Scene::new(address_space_column, memory_map_column),
            registry: HashMap::new(),
            placement_order: Vec::new(),
            cursor: 0.0,
            diagnostics: Vec::new(),
        }
    }

    /// Place every path, then finish the scene. Returns the path count.
    fn run(&mut self) -> usize {
        let (graph, index_diagnostics) = index_interconnect(self.model);
        self.diagnostics.extend(index_diagnostics);

        let paths = PathFinder::new(self.model, &graph).find_master_slave_paths();
        let path_count = paths.len();
        debug!(paths = path_count, "found master-slave paths");

        let resolver = AddressResolver::new(self.model, self.options.filter_address_space_chains);
        for set in group_into_sets(self.model, paths) {
            for path in &set {
                if let Err(err) = self.place_path(&resolver, path) {
                    warn!(start = %path.start(), end = %path.end(), "skipping path: {}", err);
                    self.diagnostics.push(err);
                }
            }
            self.advance_cursor();
        }

        self.finish();
        path_count
    }

    /// Block for the memory item `memory`, created on first use.
    fn ensure_block(&mut self, memory: &str) -> Result<BlockId> {
        if let Some(id) = self.registry.get(memory) {
            return Ok(*id);
        }
        let Some(item) = self.model.memory_item(memory) else {
            return model_err!(UnknownMemoryItem, memory.to_owned());
        };

        let kind = if item.kind == MemoryItemKind::AddressSpace {
            BlockKind::AddressSpace
        } else {
            BlockKind::MemoryMap
        };
        let base = item.base_address();
        let last = item.last_address();
        let height = ((last - base) as f64 + 1.0) * RANGE_SCALE;
        let id = self.scene.add_block(
            &item.identifier,
            &item.name,
            kind,
            (base, last),
            height,
            item.child_ranges().collect(),
        );
        self.registry.insert(item.identifier.clone(), id);
        Ok(id)
    }

    fn default_column(&self, kind: BlockKind) -> ColumnId {
        match kind {
            BlockKind::AddressSpace => self.scene.space_column,
            BlockKind::MemoryMap => self.scene.map_column,
        }
    }

    fn is_placed(&self, block: BlockId) -> bool {
        self.scene.block(block).placed
    }

    fn place(&mut self, block: BlockId, y: f64) {
        let column = self.default_column(self.scene.block(block).kind);
        self.scene.set_column(block, Some(column));
        let b = self.scene.block_mut(block);
        b.y = y;
        b.visible = true;
        if !b.placed {
            b.placed = true;
            self.placement_order.push(block);
        }
        debug!(block = %self.scene.block(block).memory, y, "placed");
    }

    /// Settle the scene around `seeds`. Running out of work-queue steps
    /// still leaves a consistent scene, so it is only noted.
    fn settle(&mut self, seeds: &[BlockId]) {
        let settled = self.scene.settle(
            seeds,
            self.config.item_gap,
            self.config.max_placement_iterations,
        );
        if let Err(err) = settled {
            self.diagnostics.push(err);
        }
    }

    fn has_chain_connection(&self, from: BlockId, to: BlockId) -> bool {
        self.scene.block(from).outgoing.iter().any(|id| {
            let conn = self.scene.connection(*id);
            conn.kind == ConnectionKind::SpaceChain && conn.end == to
        })
    }

    fn place_path(&mut self, resolver: &AddressResolver<'a>, path: &Path) -> Result<()> {
        let resolved = resolver.resolve(path)?;
        let filter = self.options.filter_address_space_chains;

        // every block is resolved before anything moves, so a failing path
        // leaves the scene untouched
        let start = self.ensure_block(&resolved.start)?;
        let end = self.ensure_block(&resolved.end)?;
        let mut hops = Vec::with_capacity(resolved.space_chain.len());
        for link in &resolved.space_chain {
            hops.push(self.ensure_block(&link.space)?);
        }

        let end_is_new = !self.is_placed(end);
        let draws_chain = !filter && !hops.is_empty();

        if !self.is_placed(start) && (end_is_new || draws_chain) {
            let y = self.cursor;
            self.place(start, y);
            self.cursor += self.scene.block(start).height + self.config.item_gap;
            self.settle(&[start]);
        }

        let mut from = start;
        for (link, &hop) in resolved.space_chain.iter().zip(&hops) {
            if filter {
                if !self.is_placed(hop) {
                    self.scene.block_mut(hop).visible = false;
                }
                continue;
            }

            if !self.is_placed(hop) {
                let y = self.scene.block(from).y + link.y_offset;
                self.place(hop, y);
            }
            if !self.has_chain_connection(from, hop) {
                let id = self.scene.add_connection(
                    from,
                    hop,
                    ConnectionKind::SpaceChain,
                    (link.base_address, link.end_address),
                    link.y_offset,
                    false,
                );
                self.scene.connection_mut(id).origin = start;
            }
            self.settle(&[hop]);
            from = hop;
        }

        self.connect_end(&resolved, start, from, end, end_is_new);
        Ok(())
    }

    /// Add the addressed connection of a path. Its range stays in the
    /// addresses of the path's own start space.
    fn add_path_connection(
        &mut self,
        resolved: &ResolvedConnection,
        origin: BlockId,
        from: BlockId,
        end: BlockId,
    ) {
        let kind = if resolved.local {
            ConnectionKind::LocalMap
        } else {
            ConnectionKind::Map
        };
        let id = self.scene.add_connection(
            from,
            end,
            kind,
            (resolved.base_address, resolved.end_address),
            resolved.y_offset,
            resolved.has_remap_range,
        );
        self.scene.connection_mut(id).origin = origin;
    }

    fn connect_end(
        &mut self,
        resolved: &ResolvedConnection,
        origin: BlockId,
        from: BlockId,
        end: BlockId,
        end_is_new: bool,
    ) {
        if end_is_new {
            self.add_path_connection(resolved, origin, from, end);
            let y = self.scene.block(from).y + resolved.y_offset;
            self.place(end, y);
            self.settle(&[end]);
            return;
        }

        if !self.is_placed(from) {
            // converging on a map that is already placed: align with it
            // instead of taking a new slot at the cursor
            let y = self.scene.block(end).y - resolved.y_offset;
            self.place(from, y);
            self.add_path_connection(resolved, origin, from, end);
            self.settle(&[from]);
            return;
        }

        self.add_path_connection(resolved, origin, from, end);
        self.settle(&[from, end]);
    }

    /// Start the next path set below everything placed so far.
    fn advance_cursor(&mut self) {
        let lowest = self
            .scene
            .column_order
            .iter()
            .filter_map(|column| self.scene.lowest_point(*column))
            .fold(f64::NEG_INFINITY, f64::max);
        if lowest.is_finite() {
            self.cursor = self.cursor.max(lowest + self.config.item_gap);
        }
    }

    /// Shrink a loose block when condensing and stack it at the bottom of
    /// its column.
    fn place_unconnected(&mut self, block: BlockId) {
        let condense = self.options.condense_memory_items;
        let min_sub = self.config.min_sub_item_height;
        let min_height = self.config.min_item_height;

        self.scene.set_column(block, None);
        let b = self.scene.block_mut(block);
        b.placed = false;
        let needed = b.child_ranges.len() as f64 * min_sub;
        if condense {
            b.height = min_height.max(needed);
        }
        b.sub_extent = (needed - b.height).max(0.0);
        b.extension = None;
        let kind = b.kind;

        let column = self.default_column(kind);
        self.scene.stack_at_bottom(block, column, self.config.item_gap);
        if !self.placement_order.contains(&block) {
            self.placement_order.push(block);
        }
    }

    fn finish(&mut self) {
        let condense = self.options.condense_memory_items;

        if condense {
            self.scene.compress(self.config.cut_modifier);
        }
        self.scene.update_sub_extents(self.config.min_sub_item_height);
        self.scene.update_extensions();

        let order = self.placement_order.clone();
        let relocated = self.scene.reposition_overlapping(&order);
        if relocated > 0 {
            debug!(relocated, "moved overlapping blocks to other columns");
        }
        if condense {
            let moved = self.scene.reposition_compressed_maps(&order);
            if moved > 0 {
                debug!(moved, "pulled compressed maps out of overlap columns");
            }
        }

        // top-level items no path reached still get drawn
        let model = self.model;
        for item in &model.memory_items {
            if !item.kind.is_placeable() {
                continue;
            }
            if let Err(err) = self.ensure_block(&item.identifier) {
                self.diagnostics.push(err);
            }
        }
        let loose: Vec<BlockId> = self
            .scene
            .blocks
            .iter()
            .filter(|b| b.visible && !b.is_connected())
            .map(|b| b.id)
            .collect();
        for block in loose {
            self.place_unconnected(block);
        }

        self.scene.remove_empty_overlap_columns();
        self.scene.normalize_coordinates(self.config.origin_margin);

        let collisions = detect_collisions(&self.scene);
        if !collisions.is_empty() {
            warn!(count = collisions.len(), "address collisions detected");
        }
        attach_collisions(&mut self.scene, collisions);

        if self.config.debug {
            for column in &self.scene.column_order {
                let column = self.scene.column(*column);
                debug!(column = %column.name, blocks = column.blocks.len(), "final column");
            }
        }
    }
}
