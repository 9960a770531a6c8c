// Copyright 2026 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Address aliasing between connections.
//!
//! Unlike visual overlap, which placement resolves by moving blocks, a
//! collision means the same addresses are reachable two different ways. It
//! is only ever reported.

use std::collections::BTreeSet;

use tracing::debug;

use crate::layout::arena::{
    BlockId, BlockKind, Collision, CollisionId, ConnectionId, ConnectionKind, Scene,
};

/// Connections that carry addresses; chain hops only position blocks.
fn addressed(scene: &Scene, ids: &[ConnectionId]) -> Vec<ConnectionId> {
    ids.iter()
        .copied()
        .filter(|id| scene.connection(*id).kind != ConnectionKind::SpaceChain)
        .collect()
}

/// Addressed connections whose range is in `space`'s own addresses,
/// wherever they are drawn from.
fn originating(scene: &Scene, space: BlockId) -> Vec<ConnectionId> {
    scene
        .connections
        .iter()
        .filter(|c| c.origin == space && c.kind != ConnectionKind::SpaceChain)
        .map(|c| c.id)
        .collect()
}

/// Find every pair of connections that share a block and reach overlapping
/// address ranges. An address space checks the connections whose ranges are
/// in its own addresses, which are its outgoing ones unless chained spaces
/// are drawn. A memory map checks its incoming ones. Each unordered pair is
/// reported once.
pub fn detect_collisions(scene: &Scene) -> Vec<Collision> {
    let mut seen: BTreeSet<(ConnectionId, ConnectionId)> = BTreeSet::new();
    let mut collisions = Vec::new();

    for block in scene.blocks.iter().filter(|b| b.placed) {
        let connections = match block.kind {
            BlockKind::AddressSpace => originating(scene, block.id),
            BlockKind::MemoryMap => addressed(scene, &block.incoming),
        };

        for (i, &first) in connections.iter().enumerate() {
            for &second in &connections[i + 1..] {
                let pair = (first.min(second), first.max(second));
                if seen.contains(&pair) {
                    continue;
                }
                let Some((base_address, end_address)) = scene
                    .connection(pair.0)
                    .overlapping_range(scene.connection(pair.1))
                else {
                    continue;
                };
                seen.insert(pair);
                debug!(
                    block = %block.memory,
                    "collision at {:#X}..={:#X}",
                    base_address,
                    end_address
                );
                collisions.push(Collision {
                    id: CollisionId(collisions.len()),
                    first: pair.0,
                    second: pair.1,
                    block: block.id,
                    base_address,
                    end_address,
                });
            }
        }
    }

    collisions
}

/// Store detected collisions in the scene and link them to their blocks.
pub fn attach_collisions(scene: &mut Scene, collisions: Vec<Collision>) {
    for block in &mut scene.blocks {
        block.collisions.clear();
    }
    for collision in &collisions {
        let BlockId(index) = collision.block;
        scene.blocks[index].collisions.push(collision.id);
    }
    scene.collisions = collisions;
}
