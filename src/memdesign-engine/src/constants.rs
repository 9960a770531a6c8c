// Copyright 2026 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

/// Vertical layout units per address unit.
pub const RANGE_SCALE: f64 = 1.0;

pub const ITEM_GAP: f64 = 20.0;
pub const CUT_MODIFIER: f64 = 60.0;
pub const MIN_ITEM_HEIGHT: f64 = 40.0;
pub const MIN_SUB_ITEM_HEIGHT: f64 = 20.0;
pub const COLUMN_WIDTH: f64 = 260.0;
pub const COLUMN_SPACING: f64 = 40.0;
pub const BLOCK_WIDTH: f64 = 180.0;
pub const DIAGRAM_ORIGIN_MARGIN: f64 = 20.0;
pub const MAX_PLACEMENT_ITERATIONS: usize = 10_000;
