// Copyright 2026 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use float_cmp::approx_eq;

use memdesign_engine::layout::arena::ConnectionId;
use memdesign_engine::memdesign_core::datamodel::ConnectivityGraph;
use memdesign_engine::memdesign_core::{ErrorCode, ModelBuilder};
use memdesign_engine::{
    BlockKind, ColumnKind, Connection, ConnectionKind, LayoutOptions, LayoutResult, build_layout,
};

const SOC: &str = include_str!("fixtures/soc.json");

fn load_fixture() -> ConnectivityGraph {
    ConnectivityGraph::from_json(SOC).unwrap_or_else(|e| panic!("failed to parse soc.json: {e}"))
}

fn options(condense: bool, filter: bool) -> LayoutOptions {
    LayoutOptions {
        condense_memory_items: condense,
        filter_address_space_chains: filter,
    }
}

fn layout(model: &ConnectivityGraph, options: LayoutOptions) -> LayoutResult {
    build_layout(model, "Address spaces", "Memory maps", options)
}

/// Connection drawn from the block for `start` to the block for `end`.
fn connection<'a>(result: &'a LayoutResult, start: &str, end: &str) -> &'a Connection {
    let scene = result.scene();
    result
        .connections()
        .iter()
        .find(|c| scene.block(c.start).memory == start && scene.block(c.end).memory == end)
        .unwrap_or_else(|| panic!("no connection {start} -> {end}"))
}

type Window = (String, String, u64, u64);

/// Collisions named by memory items rather than connection ids, which shift
/// when chained spaces get connections of their own.
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

/// Shared verification for all layout results.
fn verify_layout(result: &LayoutResult, label: &str) {
    let scene = result.scene();

    // Every visible block sits in a column that accepts it.
    for block in result.blocks() {
        if !block.visible {
            assert!(
                block.column.is_none(),
                "[{}] hidden block '{}' is in a column",
                label,
                block.memory
            );
            continue;
        }
        assert!(
            block.is_laid_out(),
            "[{}] block '{}' was not placed",
            label,
            block.memory
        );
        let column = block.column.map(|c| scene.column(c)).unwrap();
        assert!(
            column.kind.accepts(block.kind),
            "[{}] block '{}' is in column '{}' of the wrong kind",
            label,
            block.memory,
            column.name
        );
    }

    // No two blocks of a column overlap.
    for column in result.columns() {
        let blocks: Vec<_> = column
            .blocks
            .iter()
            .map(|id| scene.block(*id))
            .filter(|b| b.is_laid_out())
            .collect();
        for (i, a) in blocks.iter().enumerate() {
            for b in &blocks[i + 1..] {
                assert!(
                    !a.own_span().overlaps(&b.own_span()),
                    "[{}] '{}' and '{}' overlap in column '{}'",
                    label,
                    a.memory,
                    b.memory,
                    column.name
                );
            }
        }
    }

    // Connections join laid-out blocks with monotone ranges.
    for conn in result.connections() {
        assert!(
            conn.end_address >= conn.base_address,
            "[{}] connection {:?} has an inverted range",
            label,
            conn.id
        );
        assert!(scene.block(conn.start).is_laid_out(), "[{}] dangling start", label);
        assert!(scene.block(conn.end).is_laid_out(), "[{}] dangling end", label);
    }

    // Without diagnostics every path produced exactly one addressed connection.
    if result.diagnostics().is_empty() {
        let addressed = result
            .connections()
            .iter()
            .filter(|c| c.kind != ConnectionKind::SpaceChain)
            .count();
        assert_eq!(
            result.path_count(),
            addressed,
            "[{}] connection count differs from path count",
            label
        );
    }

    for collision in result.collisions() {
        assert!(collision.base_address <= collision.end_address);
        assert!(
            scene.block(collision.block).collisions.contains(&collision.id),
            "[{}] collision {:?} not attached to its block",
            label,
            collision.id
        );
    }

    // The topmost block sits at the origin margin.
    let top = result
        .blocks()
        .iter()
        .filter(|b| b.is_laid_out())
        .map(|b| scene.block_span(b.id).top)
        .fold(f64::INFINITY, f64::min);
    if top.is_finite() {
        assert!(approx_eq!(f64, 20.0, top, epsilon = 1e-6), "[{}] top at {}", label, top);
    }

    let geometry = result.redraw();
    assert_eq!(geometry, result.redraw(), "[{}] redraw is not repeatable", label);
    if !result.connections().is_empty() {
        assert!(!geometry.view_box.is_empty(), "[{}] empty view box", label);
    }
}

#[test]
fn test_fixture_layout() {
    let model = load_fixture();
    let result = layout(&model, LayoutOptions::default());
    verify_layout(&result, "soc");

    assert_eq!(6, result.path_count());
    assert!(result.diagnostics().is_empty());

    let ram = connection(&result, "cpu.space", "ram.map");
    assert_eq!((0x2000_0000, 0x2000_FFFF), (ram.base_address, ram.end_address));

    let tcm = connection(&result, "cpu.space", "cpu.tcm");
    assert_eq!(ConnectionKind::LocalMap, tcm.kind);
    assert_eq!((0, 0x3FFF), (tcm.base_address, tcm.end_address));

    // the bridge folds the CPU's window into the peripheral bus
    let uart = connection(&result, "cpu.space", "uart.map");
    assert_eq!((0x2001_0000, 0x2001_00FF), (uart.base_address, uart.end_address));
    let direct = connection(&result, "periph.space", "uart.map");
    assert_eq!((0x1_0000, 0x1_00FF), (direct.base_address, direct.end_address));

    // DMA and debug both see RAM at 0..0xFFFF
    assert_eq!(1, result.collisions().len());
    let collision = &result.collisions()[0];
    assert_eq!((0, 0xFFFF), (collision.base_address, collision.end_address));
    assert_eq!("ram.map", result.scene().block(collision.block).memory);
    let pair = [collision.first, collision.second];
    assert!(pair.contains(&connection(&result, "dma.space", "ram.map").id));
    assert!(pair.contains(&connection(&result, "dbg.space", "ram.map").id));

    // nothing reaches the spare map, so it goes to the bottom
    let spare = result.block("spare.map").unwrap();
    assert!(!spare.is_connected());
    for block in result.blocks() {
        if block.id != spare.id && block.column == spare.column && block.is_laid_out() {
            assert!(
                result.scene().block_span(block.id).bottom < spare.y,
                "'{}' is below the spare map",
                block.memory
            );
        }
    }
}

#[test]
fn test_fixture_every_option_combination() {
    let model = load_fixture();
    for condense in [false, true] {
        for filter in [false, true] {
            let result = layout(&model, options(condense, filter));
            verify_layout(&result, &format!("soc condense={condense} filter={filter}"));
        }
    }
}

#[test]
fn test_unfiltered_chain_gets_its_own_connection() {
    let model = load_fixture();
    let result = layout(&model, options(true, false));
    verify_layout(&result, "soc unfiltered");

    let chains: Vec<_> = result
        .connections()
        .iter()
        .filter(|c| c.kind == ConnectionKind::SpaceChain)
        .collect();
    assert_eq!(1, chains.len());
    let chain = connection(&result, "cpu.space", "periph.space");
    assert_eq!((0x2000_0000, 0x2001_FFFF), (chain.base_address, chain.end_address));

    // drawn from the last chained space rather than the CPU
    let uart = connection(&result, "periph.space", "uart.map");
    assert!(uart.base_address == 0x2001_0000 || uart.base_address == 0x1_0000);
    assert_eq!(2, result.block("uart.map").unwrap().incoming.len());

    let cpu = result.block("cpu.space").unwrap();
    let periph = result.block("periph.space").unwrap();
    assert!(periph.visible);
    assert_ne!(cpu.column, periph.column);
}

#[test]
fn test_fixture_collisions_ignore_chain_drawing() {
    let model = load_fixture();
    for condense in [false, true] {
        let filtered = layout(&model, options(condense, true));
        let drawn = layout(&model, options(condense, false));
        assert_eq!(1, filtered.collisions().len());
        assert_eq!(collision_signature(&filtered), collision_signature(&drawn));
    }
}

/// A CPU window reaching two maps through a bridge with two masters. The
/// bridge sees ram at 0 and rom at 0x1000, the CPU sees them at 0x1000 and
/// 0x2000.
fn bridge_with_two_masters() -> ConnectivityGraph {
    ModelBuilder::new()
        .address_space("cpu.space", "0", "0x10000")
        .address_space("br.space", "0", "0x10000")
        .memory_map("ram.map", "0", "0x100")
        .memory_map("rom.map", "0", "0x100")
        .master("cpu.m", Some("cpu.space"), "0x1000")
        .slave("br.s", None)
        .master("br.m", Some("br.space"), "0")
        .master("br.m2", Some("br.space"), "0x1000")
        .slave("ram.s", Some("ram.map"))
        .slave("rom.s", Some("rom.map"))
        .connect("cpu.m", "br.s")
        .bridge("br.s", "br.m")
        .bridge("br.s", "br.m2")
        .connect("br.m", "ram.s")
        .connect("br.m2", "rom.s")
        .build()
}

#[test]
fn test_chained_space_windows_do_not_alias() {
    let model = bridge_with_two_masters();

    for filter in [true, false] {
        let result = layout(&model, options(false, filter));
        let label = format!("two masters filter={filter}");
        verify_layout(&result, &label);
        assert_eq!(4, result.path_count());
        assert!(result.collisions().is_empty(), "[{label}] {:?}", result.collisions());
    }

    // drawn chains put both windows onto ram on the bridge, each still in
    // the addresses of the space it started from
    let result = layout(&model, options(false, false));
    let scene = result.scene();
    let mut onto_ram: Vec<(String, u64)> = result
        .connections()
        .iter()
        .filter(|c| scene.block(c.start).memory == "br.space")
        .filter(|c| scene.block(c.end).memory == "ram.map")
        .map(|c| (scene.block(c.origin).memory.clone(), c.base_address))
        .collect();
    onto_ram.sort();
    assert_eq!(
        vec![("br.space".to_owned(), 0), ("cpu.space".to_owned(), 0x1000)],
        onto_ram
    );
}

#[test]
fn test_new_map_is_pushed_below_taller_map() {
    // cpu0 sees a small remapped window onto a tall map, so the map reaches
    // far below cpu0. cpu1's own map lands inside it and has to move down.
    let model = ModelBuilder::new()
        .address_space("cpu0.space", "0", "0x100")
        .address_space("cpu1.space", "0", "0x100")
        .memory_map("big.map", "0", "0x1000")
        .memory_map("rom.map", "0", "0x100")
        .master("cpu0.m", Some("cpu0.space"), "0")
        .master("cpu1.m", Some("cpu1.space"), "0")
        .slave("rom.s", Some("rom.map"))
        .slave("big.s", Some("big.map"))
        .mirrored_slave("ic.s0", Some(("0x200", "0x10")))
        .mirrored_slave("ic.s1", None)
        .mirrored_master("ic.m")
        .connect("cpu0.m", "ic.s0")
        .connect("cpu1.m", "rom.s")
        .connect("cpu1.m", "ic.s1")
        .bridge("ic.s0", "ic.m")
        .bridge("ic.s1", "ic.m")
        .connect("ic.m", "big.s")
        .build();

    let result = layout(&model, options(false, true));
    verify_layout(&result, "push down");
    assert_eq!(3, result.path_count());

    let cpu0 = result.block("cpu0.space").unwrap();
    let cpu1 = result.block("cpu1.space").unwrap();
    let big = result.block("big.map").unwrap();
    let rom = result.block("rom.map").unwrap();

    // the map placed first keeps its place
    assert!(approx_eq!(f64, 20.0, cpu0.y));
    assert!(approx_eq!(f64, cpu0.y + 0x200 as f64, big.y));
    // the new map moved below it together with its space
    assert!(approx_eq!(f64, cpu1.y, rom.y));
    assert!(approx_eq!(f64, big.y + big.height + 20.0, rom.y));
}

#[test]
fn test_bridge_bases_add() {
    let model = ModelBuilder::new()
        .address_space("cpu.space", "0", "0x10000")
        .address_space("br.space", "0", "0x10000")
        .memory_map("ram.map", "0", "0x100")
        .master("cpu.m", Some("cpu.space"), "0x1000")
        .slave("br.s", None)
        .master("br.m", Some("br.space"), "0x2000")
        .slave("ram.s", Some("ram.map"))
        .connect("cpu.m", "br.s")
        .bridge("br.s", "br.m")
        .connect("br.m", "ram.s")
        .build();

    let result = layout(&model, LayoutOptions::default());
    verify_layout(&result, "bridge");

    let conn = connection(&result, "cpu.space", "ram.map");
    assert_eq!((0x3000, 0x30FF), (conn.base_address, conn.end_address));
    let bridge = result.block("br.space").unwrap();
    assert!(bridge.visible);
}

#[test]
fn test_mirrored_remap_overrides_map_size() {
    let model = ModelBuilder::new()
        .address_space("cpu.space", "0", "0x10000")
        .memory_map("ram.map", "0", "0x1000")
        .master("cpu.m", Some("cpu.space"), "0")
        .mirrored_slave("ic.s", Some(("0x500", "0x100")))
        .mirrored_master("ic.m")
        .slave("ram.s", Some("ram.map"))
        .connect("cpu.m", "ic.s")
        .bridge("ic.s", "ic.m")
        .connect("ic.m", "ram.s")
        .build();

    let result = layout(&model, LayoutOptions::default());
    verify_layout(&result, "mirrored");

    let conn = connection(&result, "cpu.space", "ram.map");
    assert_eq!((0x500, 0x5FF), (conn.base_address, conn.end_address));
    assert!(conn.has_remap_range);
}

#[test]
fn test_local_map_shortcut() {
    let model = ModelBuilder::new()
        .address_space("cpu.space", "0", "0x10000")
        .local_memory_map("cpu.space", "cpu.local", "0", "0x800")
        .master("cpu.m", Some("cpu.space"), "0x4000")
        .build();

    let result = layout(&model, options(false, true));
    verify_layout(&result, "local");

    assert_eq!(1, result.path_count());
    let conn = connection(&result, "cpu.space", "cpu.local");
    assert_eq!(ConnectionKind::LocalMap, conn.kind);
    // the master's own base plays no part
    assert_eq!((0, 0x7FF), (conn.base_address, conn.end_address));

    let space = result.block("cpu.space").unwrap();
    let local = result.block("cpu.local").unwrap();
    assert!(approx_eq!(f64, space.y, local.y));
    assert_eq!(BlockKind::MemoryMap, local.kind);
}

fn two_masters(second_base: &str) -> ConnectivityGraph {
    ModelBuilder::new()
        .address_space("cpu0.space", "0", "0x10000")
        .address_space("cpu1.space", "0", "0x10000")
        .memory_map("ram.map", "0", "0x1000")
        .master("cpu0.m", Some("cpu0.space"), "0")
        .master("cpu1.m", Some("cpu1.space"), second_base)
        .slave("ram.s", Some("ram.map"))
        .connect("cpu0.m", "ram.s")
        .connect("cpu1.m", "ram.s")
        .build()
}

#[test]
fn test_overlapping_windows_collide_once() {
    let model = two_masters("0x400");
    let result = layout(&model, LayoutOptions::default());
    verify_layout(&result, "collision");

    assert_eq!(1, result.collisions().len());
    let collision = &result.collisions()[0];
    let first = connection(&result, "cpu0.space", "ram.map").id;
    let second = connection(&result, "cpu1.space", "ram.map").id;
    assert_eq!((first, second), (collision.first, collision.second));
    assert!(collision.base_address <= 0x400 && 0x400 <= collision.end_address);
    assert_eq!((0x400, 0xFFF), (collision.base_address, collision.end_address));

    let geometry = result.redraw();
    assert_eq!(1, geometry.collisions.len());
}

#[test]
fn test_disjoint_windows_never_collide() {
    let model = two_masters("0x1000");
    let result = layout(&model, LayoutOptions::default());
    verify_layout(&result, "disjoint");
    assert!(result.collisions().is_empty());
}

#[test]
fn test_converging_spaces_open_new_columns() {
    let mut builder = ModelBuilder::new();
    builder
        .memory_map("ram.map", "0", "0x100")
        .slave("ram.s", Some("ram.map"));
    for i in 0..3 {
        let space = format!("cpu{i}.space");
        builder
            .address_space(&space, "0", "0x1000")
            .master(&format!("cpu{i}.m"), Some(&space), "0")
            .connect(&format!("cpu{i}.m"), "ram.s");
    }
    let model = builder.build();

    let result = layout(&model, LayoutOptions::default());
    verify_layout(&result, "converging");

    let names: Vec<&str> = result
        .columns()
        .filter(|c| c.kind == ColumnKind::AddressSpace)
        .map(|c| c.name.as_str())
        .collect();
    // new address space columns open on the far left
    assert_eq!(vec!["Address spaces 3", "Address spaces 2", "Address spaces"], names);

    let ys: Vec<f64> = (0..3)
        .map(|i| result.block(&format!("cpu{i}.space")).unwrap().y)
        .collect();
    assert!(approx_eq!(f64, ys[0], ys[1]));
    assert!(approx_eq!(f64, ys[0], ys[2]));
}

#[test]
fn test_dangling_edge_is_reported() {
    let mut model = two_masters("0x1000");
    model.edges.push(memdesign_engine::memdesign_core::ConnectivityEdge {
        from: "cpu0.m".to_owned(),
        to: "nowhere.s".to_owned(),
        kind: memdesign_engine::memdesign_core::EdgeKind::External,
    });

    let result = layout(&model, LayoutOptions::default());
    verify_layout(&result, "dangling");
    assert_eq!(2, result.connections().len());
    assert_eq!(1, result.diagnostics().len());
    assert_eq!(ErrorCode::UnknownInterface, result.diagnostics()[0].code);
}

#[test]
fn test_geometry_serializes() {
    let model = load_fixture();
    let result = layout(&model, LayoutOptions::default());
    let json = serde_json::to_string(&result.redraw()).unwrap();
    assert!(json.contains("\"viewBox\""));
    assert!(json.contains("\"memory\":\"cpu.space\""));
}
