// Copyright 2026 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Projection of a placed scene into drawing coordinates.
//!
//! Nothing here changes placement. A renderer can call `project` whenever
//! the viewport changes and get the same shapes back.

use std::ops::{Add, Sub};

use float_cmp::approx_eq;
use serde::Serialize;

use crate::layout::arena::{BlockId, BlockKind, ColumnId, ConnectionId, ConnectionKind, Scene};
use crate::layout::config::LayoutConfig;

#[derive(Clone, Copy, PartialEq, Default, Serialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl std::fmt::Debug for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.2}, {:.2})", self.x, self.y)
    }
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl Add for Position {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

impl Sub for Position {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Rect {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn is_empty(&self) -> bool {
        approx_eq!(f64, self.width, 0.0) || approx_eq!(f64, self.height, 0.0)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnGeometry {
    pub column: ColumnId,
    pub name: String,
    pub x: f64,
    pub width: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockGeometry {
    pub block: BlockId,
    pub memory: String,
    pub kind: BlockKind,
    pub column: ColumnId,
    pub rect: Rect,
    /// Continuation drawn past the block's own range, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension: Option<Rect>,
    /// Nested items, top to bottom.
    pub children: Vec<Rect>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionGeometry {
    pub connection: ConnectionId,
    pub kind: ConnectionKind,
    /// Top of the connection on the start block's facing edge.
    pub from: Position,
    /// Top of the connection on the end block's facing edge.
    pub to: Position,
    pub from_height: f64,
    pub to_height: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollisionGeometry {
    pub connections: (ConnectionId, ConnectionId),
    pub rect: Rect,
}

#[derive(Clone, Debug, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneGeometry {
    pub columns: Vec<ColumnGeometry>,
    pub blocks: Vec<BlockGeometry>,
    pub connections: Vec<ConnectionGeometry>,
    pub collisions: Vec<CollisionGeometry>,
    pub view_box: Rect,
}

/// Fraction of `[base, end]` covered up to `address`, clamped to `[0, 1]`.
fn address_fraction(address: u64, base: u64, end: u64) -> f64 {
    let len = (end - base) as f64 + 1.0;
    (address.saturating_sub(base) as f64 / len).clamp(0.0, 1.0)
}

/// Lay the scene out on the page.
pub fn project(scene: &Scene, config: &LayoutConfig) -> SceneGeometry {
    let stride = config.column_width + config.column_spacing;
    let inset = (config.column_width - config.block_width) / 2.0;

    let mut geometry = SceneGeometry::default();
    let mut block_rects: Vec<Option<Rect>> = vec![None; scene.blocks.len()];

    for (index, &column) in scene.column_order.iter().enumerate() {
        let x = config.origin_margin + index as f64 * stride;
        geometry.columns.push(ColumnGeometry {
            column,
            name: scene.column(column).name.clone(),
            x,
            width: config.column_width,
        });

        for &id in &scene.column(column).blocks {
            let block = scene.block(id);
            if !block.is_laid_out() {
                continue;
            }
            let rect = Rect::new(
                x + inset,
                block.y,
                config.block_width,
                block.height + block.sub_extent,
            );
            block_rects[id.0] = Some(rect);

            let children = if block.child_ranges.is_empty() {
                Vec::new()
            } else {
                let slot = rect.height / block.child_ranges.len() as f64;
                let proportional = block.sub_extent <= 0.0;
                block
                    .child_ranges
                    .iter()
                    .enumerate()
                    .map(|(i, &(base, last))| {
                        if proportional {
                            let top = address_fraction(base, block.base_address, block.last_address);
                            let bottom = address_fraction(
                                last.saturating_add(1),
                                block.base_address,
                                block.last_address,
                            );
                            Rect::new(
                                rect.x,
                                rect.y + top * rect.height,
                                rect.width,
                                (bottom - top) * rect.height,
                            )
                        } else {
                            Rect::new(rect.x, rect.y + i as f64 * slot, rect.width, slot)
                        }
                    })
                    .collect()
            };

            geometry.blocks.push(BlockGeometry {
                block: id,
                memory: block.memory.clone(),
                kind: block.kind,
                column,
                rect,
                extension: block.extension.map(|ext| {
                    Rect::new(rect.x, ext.top, rect.width, ext.bottom - ext.top)
                }),
                children,
            });
        }
    }

    for conn in &scene.connections {
        let (Some(start), Some(end)) = (block_rects[conn.start.0], block_rects[conn.end.0]) else {
            continue;
        };
        let (from_x, to_x) = if end.x >= start.x {
            (start.right(), end.x)
        } else {
            (start.x, end.right())
        };
        let to_height = match conn.kind {
            // a chain hop always covers the whole hop block
            ConnectionKind::SpaceChain => end.height,
            ConnectionKind::Map | ConnectionKind::LocalMap => conn.height.min(end.height),
        };
        geometry.connections.push(ConnectionGeometry {
            connection: conn.id,
            kind: conn.kind,
            from: Position::new(from_x, start.y + conn.y_offset),
            to: Position::new(to_x, end.y),
            from_height: conn.height,
            to_height,
        });
    }

    for collision in &scene.collisions {
        let Some(first) = geometry
            .connections
            .iter()
            .find(|c| c.connection == collision.first)
        else {
            continue;
        };
        let conn = scene.connection(collision.first);
        let top = address_fraction(collision.base_address, conn.base_address, conn.end_address);
        let bottom = address_fraction(
            collision.end_address.saturating_add(1),
            conn.base_address,
            conn.end_address,
        );
        let left = first.from.x.min(first.to.x);
        let right = first.from.x.max(first.to.x);
        geometry.collisions.push(CollisionGeometry {
            connections: (collision.first, collision.second),
            rect: Rect::new(
                left,
                first.from.y + top * first.from_height,
                right - left,
                (bottom - top) * first.from_height,
            ),
        });
    }

    let mut extent = Position::default();
    for block in &geometry.blocks {
        extent.x = extent.x.max(block.rect.right());
        extent.y = extent.y.max(block.rect.bottom());
        if let Some(ext) = block.extension {
            extent.y = extent.y.max(ext.bottom());
        }
    }
    for conn in &geometry.connections {
        extent.y = extent
            .y
            .max(conn.from.y + conn.from_height)
            .max(conn.to.y + conn.to_height);
    }
    let margin = Position::new(config.origin_margin, config.origin_margin);
    let corner = extent + margin;
    geometry.view_box = Rect::new(0.0, 0.0, corner.x, corner.y);

    geometry
}
