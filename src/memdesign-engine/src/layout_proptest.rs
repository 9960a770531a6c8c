// Copyright 2026 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Property-based tests for layout using proptest.
//!
//! These tests verify that, for random interconnects:
//! 1. Every resolved range ends at or after its base address
//! 2. No two blocks in one column overlap once layout finishes
//! 3. Redrawing an unchanged layout gives identical geometry
//! 4. Blocks that cannot share a column always end up in new columns
//! 5. Drawing chained spaces never changes which addresses collide

use proptest::prelude::*;

use memdesign_core::ModelBuilder;
use memdesign_core::datamodel::ConnectivityGraph;

use crate::address::AddressResolver;
use crate::graph::index_interconnect;
use crate::layout::arena::{BlockKind, ConnectionId};
use crate::layout::{LayoutOptions, LayoutResult, build_layout};
use crate::path::PathFinder;

#[derive(Clone, Debug)]
struct Topology {
    /// (range, master base) per address space
    spaces: Vec<(u64, u64)>,
    /// range per memory map
    maps: Vec<u64>,
    /// direct space -> map connections
    links: Vec<(usize, usize)>,
    /// space -> bridge -> map, with the bridge master's base
    bridges: Vec<(usize, usize, u64)>,
    /// space -> bridge -> bridge -> map, with both bridge masters' bases
    chains: Vec<(usize, usize, u64, u64)>,
    /// space -> mirrored channel -> map, with the remap address and range
    mirrors: Vec<(usize, usize, u64, u64)>,
    /// spaces that own a local memory map
    locals: Vec<usize>,
}

fn range_strategy() -> impl Strategy<Value = u64> {
    prop_oneof![Just(0x10u64), Just(0x100), Just(0x1000), Just(0x10000), 1u64..0x2000]
}

fn base_strategy() -> impl Strategy<Value = u64> {
    prop_oneof![Just(0u64), (0u64..16).prop_map(|n| n * 0x100), Just(0x8000_0000)]
}

fn topology_strategy() -> impl Strategy<Value = Topology> {
    (1usize..5, 1usize..5)
        .prop_flat_map(|(n_spaces, n_maps)| {
            (
                prop::collection::vec((range_strategy(), base_strategy()), n_spaces),
                prop::collection::vec(range_strategy(), n_maps),
                prop::collection::vec((0..n_spaces, 0..n_maps), 0..8),
                prop::collection::vec((0..n_spaces, 0..n_maps, base_strategy()), 0..3),
                prop::collection::vec(
                    (0..n_spaces, 0..n_maps, base_strategy(), base_strategy()),
                    0..2,
                ),
                prop::collection::vec(
                    (0..n_spaces, 0..n_maps, base_strategy(), 1u64..0x400),
                    0..3,
                ),
                prop::collection::vec(0..n_spaces, 0..2),
            )
        })
        .prop_map(|(spaces, maps, links, bridges, chains, mirrors, locals)| Topology {
            spaces,
            maps,
            links,
            bridges,
            chains,
            mirrors,
            locals,
        })
}

fn options_strategy() -> impl Strategy<Value = LayoutOptions> {
    (any::<bool>(), any::<bool>()).prop_map(|(condense, filter)| LayoutOptions {
        condense_memory_items: condense,
        filter_address_space_chains: filter,
    })
}

fn build_model(topology: &Topology) -> ConnectivityGraph {
    let mut builder = ModelBuilder::new();

    for (i, &(range, base)) in topology.spaces.iter().enumerate() {
        let space = format!("cpu{i}.space");
        builder
            .address_space(&space, "0", &format!("{range:#x}"))
            .master(&format!("cpu{i}.m"), Some(&space), &format!("{base:#x}"));
        if topology.locals.contains(&i) {
            builder.local_memory_map(&space, &format!("cpu{i}.local"), "0x10", "0x40");
        }
    }

    for (j, &range) in topology.maps.iter().enumerate() {
        let map = format!("mem{j}.map");
        builder
            .memory_map(&map, "0", &format!("{range:#x}"))
            .slave(&format!("mem{j}.s"), Some(&map));
    }

    for &(space, map) in &topology.links {
        builder.connect(&format!("cpu{space}.m"), &format!("mem{map}.s"));
    }

    for (k, &(space, map, base)) in topology.bridges.iter().enumerate() {
        let bridge_space = format!("br{k}.space");
        builder
            .address_space(&bridge_space, "0", "0x1000")
            .slave(&format!("br{k}.s"), None)
            .master(&format!("br{k}.m"), Some(&bridge_space), &format!("{base:#x}"))
            .connect(&format!("cpu{space}.m"), &format!("br{k}.s"))
            .bridge(&format!("br{k}.s"), &format!("br{k}.m"))
            .connect(&format!("br{k}.m"), &format!("mem{map}.s"));
    }

    for (k, &(space, map, first, second)) in topology.chains.iter().enumerate() {
        let near = format!("near{k}");
        let far = format!("far{k}");
        builder
            .address_space(&format!("{near}.space"), "0", "0x10000")
            .address_space(&format!("{far}.space"), "0", "0x10000")
            .slave(&format!("{near}.s"), None)
            .master(&format!("{near}.m"), Some(&format!("{near}.space")), &format!("{first:#x}"))
            .slave(&format!("{far}.s"), None)
            .master(&format!("{far}.m"), Some(&format!("{far}.space")), &format!("{second:#x}"))
            .connect(&format!("cpu{space}.m"), &format!("{near}.s"))
            .bridge(&format!("{near}.s"), &format!("{near}.m"))
            .connect(&format!("{near}.m"), &format!("{far}.s"))
            .bridge(&format!("{far}.s"), &format!("{far}.m"))
            .connect(&format!("{far}.m"), &format!("mem{map}.s"));
    }

    for (k, &(space, map, address, range)) in topology.mirrors.iter().enumerate() {
        let address = format!("{address:#x}");
        let range = format!("{range:#x}");
        builder
            .mirrored_slave(&format!("ic{k}.s"), Some((address.as_str(), range.as_str())))
            .mirrored_master(&format!("ic{k}.m"))
            .connect(&format!("cpu{space}.m"), &format!("ic{k}.s"))
            .bridge(&format!("ic{k}.s"), &format!("ic{k}.m"))
            .connect(&format!("ic{k}.m"), &format!("mem{map}.s"));
    }

    builder.build()
}

type Window = (String, String, u64, u64);

/// Collisions named by the memory items involved, so layouts with different
/// connection numbering can be compared.
fn collision_signature(result: &LayoutResult) -> Vec<(String, Window, Window, u64, u64)> {
    let scene = result.scene();
    let window = |id: ConnectionId| -> Window {
        let conn = scene.connection(id);
        (
            scene.block(conn.origin).memory.clone(),
            scene.block(conn.end).memory.clone(),
            conn.base_address,
            conn.end_address,
        )
    };

    let mut signature: Vec<_> = result
        .collisions()
        .iter()
        .map(|c| {
            let (a, b) = (window(c.first), window(c.second));
            let (a, b) = if a <= b { (a, b) } else { (b, a) };
            (scene.block(c.block).memory.clone(), a, b, c.base_address, c.end_address)
        })
        .collect();
    signature.sort();
    signature
}

fn layout(topology: &Topology, options: LayoutOptions) -> (ConnectivityGraph, LayoutResult) {
    let model = build_model(topology);
    let result = build_layout(&model, "Address spaces", "Memory maps", options);
    (model, result)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn resolved_ranges_are_monotone(topology in topology_strategy(), filter in any::<bool>()) {
        let model = build_model(&topology);
        let (graph, _) = index_interconnect(&model);
        let resolver = AddressResolver::new(&model, filter);
        for path in PathFinder::new(&model, &graph).find_master_slave_paths() {
            let resolved = resolver.resolve(&path).unwrap();
            prop_assert!(resolved.end_address >= resolved.base_address);
            for link in &resolved.space_chain {
                prop_assert!(link.end_address >= link.base_address);
            }
        }
    }

    #[test]
    fn columns_never_overlap(topology in topology_strategy(), options in options_strategy()) {
        let (_, result) = layout(&topology, options);
        let scene = result.scene();

        for column in result.columns() {
            let blocks: Vec<_> = column
                .blocks
                .iter()
                .map(|id| scene.block(*id))
                .filter(|b| b.is_laid_out())
                .collect();
            for (i, a) in blocks.iter().enumerate() {
                prop_assert!(column.kind.accepts(a.kind));
                for b in &blocks[i + 1..] {
                    prop_assert!(
                        !a.own_span().overlaps(&b.own_span()),
                        "{} and {} overlap in {}",
                        a.memory,
                        b.memory,
                        column.name
                    );
                }
            }
        }

        for conn in result.connections() {
            prop_assert!(conn.end_address >= conn.base_address);
        }
    }

    #[test]
    fn every_item_is_drawn(topology in topology_strategy(), options in options_strategy()) {
        let (model, result) = layout(&topology, options);

        for item in &model.memory_items {
            let block = result.block(&item.identifier);
            prop_assert!(block.is_some(), "{} has no block", item.identifier);
            let block = block.unwrap();
            if block.visible {
                prop_assert!(block.is_laid_out(), "{} was dropped", item.identifier);
            } else {
                prop_assert!(block.column.is_none());
            }
        }
        prop_assert!(result.diagnostics().is_empty());
    }

    #[test]
    fn redraw_is_idempotent(topology in topology_strategy(), options in options_strategy()) {
        let (_, result) = layout(&topology, options);
        let first = result.redraw();
        let second = result.redraw();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn collisions_ignore_chain_drawing(topology in topology_strategy(), condense in any::<bool>()) {
        let model = build_model(&topology);
        let filtered = build_layout(&model, "Address spaces", "Memory maps", LayoutOptions {
            condense_memory_items: condense,
            filter_address_space_chains: true,
        });
        let drawn = build_layout(&model, "Address spaces", "Memory maps", LayoutOptions {
            condense_memory_items: condense,
            filter_address_space_chains: false,
        });

        prop_assert_eq!(collision_signature(&filtered), collision_signature(&drawn));
    }

    #[test]
    fn overlapping_spaces_get_new_columns(count in 2usize..12, condense in any::<bool>()) {
        let mut builder = ModelBuilder::new();
        builder
            .memory_map("ram.map", "0", "0x100")
            .slave("ram.s", Some("ram.map"));
        for i in 0..count {
            let space = format!("cpu{i}.space");
            builder
                .address_space(&space, "0", "0x1000")
                .master(&format!("cpu{i}.m"), Some(&space), "0")
                .connect(&format!("cpu{i}.m"), "ram.s");
        }
        let model = builder.build();

        let options = LayoutOptions {
            condense_memory_items: condense,
            filter_address_space_chains: true,
        };
        let result = build_layout(&model, "Address spaces", "Memory maps", options);

        prop_assert_eq!(count, result.connections().len());
        let spaces: Vec<_> = result
            .blocks()
            .iter()
            .filter(|b| b.kind == BlockKind::AddressSpace)
            .collect();
        prop_assert_eq!(count, spaces.len());
        prop_assert!(spaces.iter().all(|b| b.is_laid_out()));

        let space_columns = result.scene().columns_for(BlockKind::AddressSpace);
        prop_assert!(space_columns.len() >= count);
    }
}
