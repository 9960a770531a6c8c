// Copyright 2026 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Vertical compression of a placed scene.
//!
//! Placement works in address units, so a 4 GiB address space would be four
//! billion units tall. Compression keeps every coordinate that matters (block
//! edges, nested item edges, connection edges) and shortens each stretch of
//! empty space between two of them to at most `cut_modifier`. The mapping is
//! monotone, so blocks that did not overlap before still do not.

use std::collections::BTreeSet;

use ordered_float::OrderedFloat;
use tracing::trace;

use super::arena::{Extension, Scene, Span};
use crate::constants::RANGE_SCALE;

/// Piecewise-linear map from uncompressed to compressed coordinates.
pub struct CutMap {
    coordinates: Vec<f64>,
    compressed: Vec<f64>,
}

impl CutMap {
    pub fn new(uncut: &BTreeSet<OrderedFloat<f64>>, cut_modifier: f64) -> Self {
        let coordinates: Vec<f64> = uncut.iter().map(|c| c.into_inner()).collect();
        let mut compressed = Vec::with_capacity(coordinates.len());

        let mut previous: Option<(f64, f64)> = None;
        for &coordinate in &coordinates {
            let mapped = match previous {
                None => coordinate,
                Some((prev, prev_mapped)) => {
                    let gap = coordinate - prev;
                    if gap > cut_modifier {
                        trace!(at = prev, cut = gap - cut_modifier, "cut gap");
                    }
                    prev_mapped + gap.min(cut_modifier)
                }
            };
            compressed.push(mapped);
            previous = Some((coordinate, mapped));
        }

        CutMap {
            coordinates,
            compressed,
        }
    }

    pub fn apply(&self, y: f64) -> f64 {
        let count = self.coordinates.partition_point(|c| *c <= y);
        if count == 0 {
            return y;
        }
        let i = count - 1;
        let shift = self.coordinates[i] - self.compressed[i];
        if i + 1 == self.coordinates.len() {
            return y - shift;
        }

        let (c0, c1) = (self.coordinates[i], self.coordinates[i + 1]);
        let (m0, m1) = (self.compressed[i], self.compressed[i + 1]);
        m0 + (y - c0) / (c1 - c0) * (m1 - m0)
    }

    /// Total space removed above `y`.
    pub fn shift_at(&self, y: f64) -> f64 {
        y - self.apply(y)
    }
}

impl Scene {
    /// Coordinates compression must keep: edges of every laid-out block, of
    /// its nested items, and of every connection between laid-out blocks.
    pub fn uncut_coordinates(&self) -> BTreeSet<OrderedFloat<f64>> {
        let mut coordinates = BTreeSet::new();

        for block in self.blocks.iter().filter(|b| b.is_laid_out()) {
            coordinates.insert(OrderedFloat(block.y));
            coordinates.insert(OrderedFloat(block.y + block.height));

            let bottom = block.y + block.height;
            for &(base, last) in &block.child_ranges {
                let top = block.y + base.saturating_sub(block.base_address) as f64 * RANGE_SCALE;
                let end = block.y
                    + (last.saturating_sub(block.base_address) as f64 + 1.0) * RANGE_SCALE;
                coordinates.insert(OrderedFloat(top.min(bottom)));
                coordinates.insert(OrderedFloat(end.min(bottom)));
            }
        }

        for conn in &self.connections {
            if !self.block(conn.start).is_laid_out() || !self.block(conn.end).is_laid_out() {
                continue;
            }
            let span = self.connection_span(conn.id);
            coordinates.insert(OrderedFloat(span.top));
            coordinates.insert(OrderedFloat(span.bottom));
        }

        coordinates
    }

    /// Cut unused vertical space, rewriting block and connection geometry.
    pub fn compress(&mut self, cut_modifier: f64) -> CutMap {
        let cuts = CutMap::new(&self.uncut_coordinates(), cut_modifier);

        let connection_spans: Vec<(Span, f64)> = self
            .connections
            .iter()
            .map(|conn| (self.connection_span(conn.id), self.block(conn.start).y))
            .collect();

        for block in self.blocks.iter_mut().filter(|b| b.is_laid_out()) {
            let top = cuts.apply(block.y);
            let bottom = cuts.apply(block.y + block.height);
            block.y = top;
            block.height = bottom - top;
        }

        // a connection keeps its place relative to its start block by
        // giving back the space removed between the two tops
        for (conn, (span, start_y)) in self.connections.iter_mut().zip(connection_spans) {
            let top_shift = cuts.shift_at(span.top);
            conn.y_offset += cuts.shift_at(start_y) - top_shift;
            conn.height -= cuts.shift_at(span.bottom) - top_shift;
        }

        cuts
    }

    /// Grow blocks whose nested items need more room than the block has.
    pub fn update_sub_extents(&mut self, min_sub_item_height: f64) {
        for block in &mut self.blocks {
            let needed = block.child_ranges.len() as f64 * min_sub_item_height;
            block.sub_extent = (needed - block.height).max(0.0);
        }
    }

    /// Record where attached connections reach past a block's own range.
    pub fn update_extensions(&mut self) {
        let extensions: Vec<Option<Extension>> = self
            .blocks
            .iter()
            .map(|block| {
                let own = block.own_span();
                let reach = self.block_span(block.id);
                if reach.top < own.top || reach.bottom > own.bottom {
                    Some(Extension {
                        top: reach.top,
                        bottom: reach.bottom,
                    })
                } else {
                    None
                }
            })
            .collect();

        for (block, extension) in self.blocks.iter_mut().zip(extensions) {
            block.extension = extension;
        }
    }
}
