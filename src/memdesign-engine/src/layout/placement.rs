// Copyright 2026 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::collections::{HashSet, VecDeque};

use memdesign_core::{Result, layout_err};
use tracing::{debug, warn};

use super::arena::{BlockId, BlockKind, ColumnId, ColumnKind, Scene};

impl Scene {
    /// Move `block` to the nearest column of its category with room for it,
    /// creating a column when none has. Equally near columns resolve to the
    /// left-most one.
    pub fn relocate(&mut self, block: BlockId) -> ColumnId {
        let kind = self.block(block).kind;
        let current = self.block(block).column;
        let current_index = current.and_then(|c| self.column_index(c));

        let mut candidates = self.columns_for(kind);
        candidates.retain(|c| Some(*c) != current);
        if let Some(from) = current_index {
            candidates.sort_by_key(|c| {
                let index = self.column_index(*c).unwrap_or(usize::MAX);
                (index.abs_diff(from), index)
            });
        }

        for column in candidates {
            if self.is_free(block, column) {
                debug!(block = %self.block(block).memory, column = %self.column(column).name, "relocated");
                self.set_column(block, Some(column));
                return column;
            }
        }

        let column = match kind {
            BlockKind::AddressSpace => {
                let count = self
                    .columns
                    .iter()
                    .filter(|c| c.kind == ColumnKind::AddressSpace)
                    .count();
                let name = format!("{} {}", self.column(self.space_column).name, count + 1);
                self.push_column(&name, ColumnKind::AddressSpace, true)
            }
            BlockKind::MemoryMap => {
                let count = self
                    .columns
                    .iter()
                    .filter(|c| c.kind == ColumnKind::MapOverlap)
                    .count();
                let name = format!("Memory map overlap {}", count + 1);
                self.push_column(&name, ColumnKind::MapOverlap, false)
            }
        };
        debug!(block = %self.block(block).memory, column = %self.column(column).name, "relocated to new column");
        self.set_column(block, Some(column));
        column
    }

    /// Resolve overlaps caused by moving or placing `seeds`.
    ///
    /// Blocks that collide with a block they are connected to cannot be
    /// separated vertically, so they change column. Otherwise the lower of
    /// the two groups is pushed below the upper one, and every block it
    /// carried is rechecked. Returns the number of queue steps taken.
    ///
    /// Once `max_iterations` steps are spent, every block still waiting
    /// that overlaps something is relocated instead, and an
    /// `IterationLimit` error reports the fallback. The scene is free of
    /// overlaps on both paths.
    pub fn settle(&mut self, seeds: &[BlockId], item_gap: f64, max_iterations: usize) -> Result<usize> {
        let mut queue: VecDeque<BlockId> = seeds.iter().copied().collect();
        let mut steps = 0;

        while let Some(block) = queue.pop_front() {
            if !self.block(block).is_laid_out() {
                continue;
            }
            steps += 1;
            if steps > max_iterations {
                warn!(block = %self.block(block).memory, "placement work queue exhausted");
                let memory = self.block(block).memory.clone();
                queue.push_front(block);
                self.relocate_overlapping(queue);
                return layout_err!(
                    IterationLimit,
                    format!("settling {memory} after {max_iterations} steps")
                );
            }

            let Some(column) = self.block(block).column else {
                continue;
            };
            let Some(other) = self.find_overlap(block, column) else {
                continue;
            };

            if self.group(block).contains(&other) {
                self.relocate(block);
                queue.push_back(block);
                continue;
            }

            let block_span = self.block_span(block);
            let other_span = self.block_span(other);
            let (upper, lower, lower_span) = if other_span.top > block_span.top {
                (block_span, other, other_span)
            } else {
                (other_span, block, block_span)
            };

            let dy = upper.bottom + item_gap - lower_span.top;
            let moved = self.group(lower);
            debug!(block = %self.block(lower).memory, dy, "pushed down");
            self.move_blocks(&moved, dy);
            queue.extend(moved);
            if lower != block {
                queue.push_back(block);
            }
        }

        Ok(steps)
    }

    /// Move each of `blocks` that overlaps a neighbour to a column with room.
    fn relocate_overlapping(&mut self, blocks: impl IntoIterator<Item = BlockId>) {
        for block in blocks {
            if !self.block(block).is_laid_out() {
                continue;
            }
            let Some(column) = self.block(block).column else {
                continue;
            };
            if self.find_overlap(block, column).is_some() {
                self.relocate(block);
            }
        }
    }

    /// Relocate any block that overlaps an earlier block of its column.
    /// Blocks are visited in `order` and every move lands in a column with
    /// room, so one pass leaves no column with overlaps.
    pub fn reposition_overlapping(&mut self, order: &[BlockId]) -> usize {
        let mut relocated = 0;
        let mut visited: HashSet<BlockId> = HashSet::new();
        for &block in order {
            if !self.block(block).is_laid_out() {
                continue;
            }
            let Some(column) = self.block(block).column else {
                continue;
            };
            let span = self.block_span(block);
            let collides = self.column(column).blocks.iter().any(|other| {
                visited.contains(other)
                    && self.block(*other).is_laid_out()
                    && span.overlaps(&self.block_span(*other))
            });
            if collides {
                self.relocate(block);
                relocated += 1;
            }
            visited.insert(block);
        }
        relocated
    }

    /// Pull maps out of overflow columns into the nearest free memory map
    /// column to their left, then drop overflow columns left empty.
    pub fn reposition_compressed_maps(&mut self, order: &[BlockId]) -> usize {
        let mut moved = 0;
        for &block in order {
            if !self.block(block).is_laid_out() {
                continue;
            }
            let Some(column) = self.block(block).column else {
                continue;
            };
            if self.column(column).kind != ColumnKind::MapOverlap {
                continue;
            }
            let Some(from) = self.column_index(column) else {
                continue;
            };

            let mut candidates: Vec<ColumnId> = self
                .columns_for(BlockKind::MemoryMap)
                .into_iter()
                .filter(|c| self.column_index(*c).is_some_and(|i| i < from))
                .collect();
            candidates.reverse();

            if let Some(target) = candidates.into_iter().find(|c| self.is_free(block, *c)) {
                self.set_column(block, Some(target));
                moved += 1;
            }
        }
        self.remove_empty_overlap_columns();
        moved
    }

    /// Put `block` below everything already laid out in `column`.
    pub fn stack_at_bottom(&mut self, block: BlockId, column: ColumnId, item_gap: f64) {
        let y = self.lowest_point(column).map_or(item_gap, |bottom| bottom + item_gap);
        self.set_column(block, Some(column));
        let b = self.block_mut(block);
        b.y = y;
        b.placed = true;
        b.visible = true;
    }

    /// Shift every placed block so the topmost extent sits at `margin`.
    pub fn normalize_coordinates(&mut self, margin: f64) {
        let min_y = self
            .blocks
            .iter()
            .filter(|b| b.is_laid_out())
            .map(|b| self.block_span(b.id).top)
            .fold(f64::INFINITY, f64::min);

        if !min_y.is_finite() {
            return;
        }

        let dy = margin - min_y;
        for block in self.blocks.iter_mut().filter(|b| b.placed) {
            block.y += dy;
            if let Some(extension) = &mut block.extension {
                extension.top += dy;
                extension.bottom += dy;
            }
        }
    }
}
