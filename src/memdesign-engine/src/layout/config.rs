// Copyright 2026 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

#[cfg(feature = "schema")]
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::constants::{
    BLOCK_WIDTH, COLUMN_SPACING, COLUMN_WIDTH, CUT_MODIFIER, DIAGRAM_ORIGIN_MARGIN, ITEM_GAP,
    MAX_PLACEMENT_ITERATIONS, MIN_ITEM_HEIGHT, MIN_SUB_ITEM_HEIGHT,
};

/// Behavioural switches for a single `build_layout` call.
///
/// Deserializes from the editor's settings JSON; missing fields keep their
/// defaults.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[serde(rename_all = "camelCase", default)]
pub struct LayoutOptions {
    /// Cut unused vertical space and pull overflow maps back towards the
    /// main memory map column.
    pub condense_memory_items: bool,
    /// Fold chained address spaces into the address arithmetic instead of
    /// drawing each hop as its own block and connection.
    pub filter_address_space_chains: bool,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            condense_memory_items: true,
            filter_address_space_chains: true,
        }
    }
}

/// Geometry and iteration limits for the memory layout.
///
/// All values are in layout units, where one address unit maps to one
/// vertical unit before compression.
#[derive(Clone, Debug)]
pub struct LayoutConfig {
    /// Vertical space between stacked blocks in a column.
    pub item_gap: f64,
    /// Largest vertical gap left between two interesting coordinates after
    /// compression.
    pub cut_modifier: f64,

    // Block dimensions
    pub min_item_height: f64,
    /// Height reserved for each nested item drawn inside a block.
    pub min_sub_item_height: f64,
    pub block_width: f64,

    // Columns
    pub column_width: f64,
    pub column_spacing: f64,

    /// Margin kept between the diagram origin and the topmost block.
    pub origin_margin: f64,

    /// Upper bound on work-queue steps while settling collisions.
    pub max_placement_iterations: usize,

    /// Enable verbose debug logging.
    pub debug: bool,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            item_gap: ITEM_GAP,
            cut_modifier: CUT_MODIFIER,
            min_item_height: MIN_ITEM_HEIGHT,
            min_sub_item_height: MIN_SUB_ITEM_HEIGHT,
            block_width: BLOCK_WIDTH,
            column_width: COLUMN_WIDTH,
            column_spacing: COLUMN_SPACING,
            origin_margin: DIAGRAM_ORIGIN_MARGIN,
            max_placement_iterations: MAX_PLACEMENT_ITERATIONS,
            debug: false,
        }
    }
}
