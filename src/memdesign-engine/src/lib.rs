// Copyright 2026 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

#![forbid(unsafe_code)]

pub use memdesign_core;

pub mod address;
pub mod collision;
pub mod constants;
pub mod geometry;
pub mod graph;
pub mod layout;
pub mod path;

#[cfg(test)]
mod layout_proptest;

pub use self::address::{AddressResolver, ChainLink, ResolvedConnection};
pub use self::collision::detect_collisions;
pub use self::geometry::{Position, Rect, SceneGeometry};
pub use self::graph::{InterconnectGraph, InterfaceId, index_interconnect};
pub use self::layout::arena::{
    BlockId, BlockKind, Collision, Column, ColumnKind, Connection, ConnectionKind, LayoutBlock,
};
pub use self::layout::{
    LayoutConfig, LayoutOptions, LayoutResult, build_layout, build_layout_with_config,
};
pub use self::path::{Path, PathFinder, group_into_sets};
