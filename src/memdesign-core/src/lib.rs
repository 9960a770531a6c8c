// Copyright 2026 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

#![forbid(unsafe_code)]

pub mod builder;
pub mod common;
pub mod datamodel;

pub use builder::ModelBuilder;
pub use common::{Error, ErrorCode, ErrorKind, Result, address_or_zero, parse_address};
pub use datamodel::{
    ConnectivityEdge, ConnectivityGraph, EdgeKind, Interface, InterfaceMode, MemoryItem,
    MemoryItemKind,
};
