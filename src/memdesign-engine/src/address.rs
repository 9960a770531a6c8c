// Copyright 2026 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Address folding along a master-to-slave path.
//!
//! Walking a path accumulates three adjustments: the base address of every
//! bridge initiator (chained address spaces), the remap address of any
//! mirrored slave, and the target's own offset. The result is the address
//! window the starting initiator sees, plus the vertical offset used to
//! line the target up with the initiator on screen.

use memdesign_core::datamodel::{ConnectivityGraph, InterfaceMode, MemoryItem, MemoryItemKind};
use memdesign_core::{Result, model_err};
use serde::Serialize;
use tracing::debug;

use crate::constants::RANGE_SCALE;
use crate::graph::InterfaceId;
use crate::path::Path;

/// One chained address space crossed by a path.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChainLink {
    /// Bridge initiator bound to the chained space.
    pub interface: InterfaceId,
    /// Identifier of the chained address space.
    pub space: String,
    /// Sum of every base folded into the chain up to this hop.
    pub cumulative_base: u64,
    pub base_address: u64,
    pub end_address: u64,
    /// Offset from the previous item in the chain.
    pub y_offset: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ResolvedConnection {
    pub start: String,
    pub end: String,
    pub base_address: u64,
    pub end_address: u64,
    /// Offset of the range top from the item the connection is drawn from.
    pub y_offset: f64,
    pub has_remap_range: bool,
    pub local: bool,
    pub space_chain: Vec<ChainLink>,
}

impl ResolvedConnection {
    /// Item the visible connection starts from: the last chained space when
    /// chains are drawn, otherwise the path's own start.
    pub fn drawn_from(&self, filter_chains: bool) -> &str {
        if filter_chains {
            return &self.start;
        }
        self.space_chain
            .last()
            .map(|link| link.space.as_str())
            .unwrap_or(&self.start)
    }
}

pub struct AddressResolver<'a> {
    model: &'a ConnectivityGraph,
    filter_chains: bool,
}

impl<'a> AddressResolver<'a> {
    pub fn new(model: &'a ConnectivityGraph, filter_address_space_chains: bool) -> Self {
        AddressResolver {
            model,
            filter_chains: filter_address_space_chains,
        }
    }

    fn bound_item(&self, id: InterfaceId) -> Result<&'a MemoryItem> {
        let Some(iface) = self.model.interfaces.get(id.0) else {
            return model_err!(UnknownInterface, id.to_string());
        };
        let Some(memory) = iface.memory.as_deref() else {
            return model_err!(UnboundInterface, iface.identifier.clone());
        };
        match self.model.memory_item(memory) {
            Some(item) => Ok(item),
            None => model_err!(UnknownMemoryItem, format!("{} -> {}", iface.identifier, memory)),
        }
    }

    pub fn resolve(&self, path: &Path) -> Result<ResolvedConnection> {
        let start_item = self.bound_item(path.start())?;
        let end_item = if path.is_local() {
            let Some(local) = start_item.local_memory_map() else {
                return model_err!(UnknownMemoryItem, start_item.identifier.clone());
            };
            local
        } else {
            self.bound_item(path.end())?
        };

        let mut base = if path.is_local() {
            0
        } else {
            self.model.interfaces[path.start().0].base_address()
        };
        let mut chain_base: u64 = 0;
        let mut mirrored_delta: u64 = 0;
        let mut remap_end: Option<u64> = None;
        let mut space_chain = Vec::new();

        for &id in path.intermediates() {
            let Some(iface) = self.model.interfaces.get(id.0) else {
                continue;
            };
            match iface.mode {
                InterfaceMode::MirroredSlave => {
                    if let Some((address, range)) = iface.remap() {
                        mirrored_delta = mirrored_delta.saturating_add(address);
                        remap_end = Some(range.saturating_sub(1));
                    }
                }
                InterfaceMode::Master => {
                    chain_base = chain_base.saturating_add(base);
                    let space = iface
                        .memory
                        .as_deref()
                        .and_then(|memory| self.model.memory_item(memory))
                        .filter(|item| item.kind == MemoryItemKind::AddressSpace);
                    if let Some(space) = space {
                        let space_base = space.base_address();
                        let link_base = chain_base.saturating_add(space_base);
                        space_chain.push(ChainLink {
                            interface: id,
                            space: space.identifier.clone(),
                            cumulative_base: chain_base,
                            base_address: link_base,
                            end_address: link_base
                                .saturating_add(space.last_address() - space_base),
                            y_offset: base.saturating_add(space_base) as f64 * RANGE_SCALE,
                        });
                    }
                    base = iface.base_address();
                }
                InterfaceMode::Slave | InterfaceMode::MirroredMaster => {}
            }
        }

        let item_offset = if remap_end.is_some() {
            0
        } else {
            end_item.base_address()
        };
        let size = remap_end.unwrap_or(end_item.last_address() - end_item.base_address());

        let base_address = base
            .saturating_add(chain_base)
            .saturating_add(mirrored_delta)
            .saturating_add(item_offset);
        let end_address = base_address.saturating_add(size);

        let mut y_units = base
            .saturating_add(mirrored_delta)
            .saturating_add(item_offset);
        if self.filter_chains {
            y_units = y_units.saturating_add(chain_base);
        }

        debug!(
            start = %start_item.identifier,
            end = %end_item.identifier,
            "resolved {:#X}..={:#X}",
            base_address,
            end_address
        );

        Ok(ResolvedConnection {
            start: start_item.identifier.clone(),
            end: end_item.identifier.clone(),
            base_address,
            end_address,
            y_offset: y_units as f64 * RANGE_SCALE,
            has_remap_range: remap_end.is_some(),
            local: path.is_local(),
            space_chain,
        })
    }
}
