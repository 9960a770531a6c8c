// Copyright 2026 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::fmt;
use std::{error, result};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    JsonDeserialization,
    JsonSerialization,
    DuplicateIdentifier,
    UnknownInterface,
    UnknownMemoryItem,
    UnboundInterface, // interface has no memory item
    IterationLimit,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use ErrorCode::*;
        let name = match self {
            JsonDeserialization => "json_deserialization",
            JsonSerialization => "json_serialization",
            DuplicateIdentifier => "duplicate_identifier",
            UnknownInterface => "unknown_interface",
            UnknownMemoryItem => "unknown_memory_item",
            UnboundInterface => "unbound_interface",
            IterationLimit => "iteration_limit",
        };

        write!(f, "{name}")
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Import,
    Model,
    Layout,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    pub kind: ErrorKind,
    pub code: ErrorCode,
    pub details: Option<String>,
}

impl Error {
    pub fn new(kind: ErrorKind, code: ErrorCode, details: Option<String>) -> Self {
        Error {
            kind,
            code,
            details,
        }
    }

    pub fn get_details(&self) -> Option<String> {
        self.details.clone()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let kind = match self.kind {
            ErrorKind::Import => "ImportError",
            ErrorKind::Model => "ModelError",
            ErrorKind::Layout => "LayoutError",
        };
        match self.details {
            Some(ref details) => write!(f, "{}{{{}: {}}}", kind, self.code, details),
            None => write!(f, "{}{{{}}}", kind, self.code),
        }
    }
}

impl error::Error for Error {}

pub type Result<T> = result::Result<T, Error>;

#[macro_export]
macro_rules! model_err(
    ($code:tt, $str:expr) => {{
        use $crate::common::{Error, ErrorCode, ErrorKind};
        Err(Error::new(
            ErrorKind::Model,
            ErrorCode::$code,
            Some($str),
        ))
    }}
);

#[macro_export]
macro_rules! layout_err(
    ($code:tt, $str:expr) => {{
        use $crate::common::{Error, ErrorCode, ErrorKind};
        Err(Error::new(
            ErrorKind::Layout,
            ErrorCode::$code,
            Some($str),
        ))
    }}
);

/// Parse a resolved address or range literal.
///
/// Expression evaluation happens upstream, so by the time a value reaches
/// this engine it is either a plain unsigned integer (decimal, `0x` hex or
/// `0b` binary, optionally with `_` separators) or a placeholder such as
/// `"x"` for an unconnected interface. Anything that is not a literal
/// yields `None`.
pub fn parse_address(value: &str) -> Option<u64> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    let (digits, radix) = if let Some(rest) = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
    {
        (rest, 16)
    } else if let Some(rest) = value
        .strip_prefix("0b")
        .or_else(|| value.strip_prefix("0B"))
    {
        (rest, 2)
    } else {
        (value, 10)
    };

    // from_str_radix takes a leading `+`, addresses never carry a sign
    let digits: String = digits.chars().filter(|c| *c != '_').collect();
    if digits.is_empty() || digits.starts_with(['+', '-']) {
        return None;
    }

    u64::from_str_radix(&digits, radix).ok()
}

/// Numeric value of an address field, with unknown or malformed text read as 0.
pub fn address_or_zero(value: &str) -> u64 {
    parse_address(value).unwrap_or(0)
}

#[test]
fn test_parse_address() {
    let cases: &[(&str, Option<u64>)] = &[
        ("0", Some(0)),
        ("4096", Some(4096)),
        ("0x1000", Some(0x1000)),
        ("0X1f", Some(0x1f)),
        ("0b101", Some(5)),
        ("0x8000_0000", Some(0x8000_0000)),
        ("  256 ", Some(256)),
        ("x", None),
        ("", None),
        ("0x", None),
        ("12abc", None),
        ("-1", None),
        ("+5", None),
        ("0x+5", None),
        ("0b-1", None),
        ("0xFFFFFFFFFFFFFFFFF", None),
    ];

    for (input, expected) in cases {
        assert_eq!(*expected, parse_address(input), "input: {input:?}");
    }
}

#[test]
fn test_address_or_zero() {
    assert_eq!(0, address_or_zero("x"));
    assert_eq!(0, address_or_zero("garbage"));
    assert_eq!(0x2000, address_or_zero("0x2000"));
}

#[test]
fn test_error_display() {
    let err = Error::new(
        ErrorKind::Model,
        ErrorCode::UnknownMemoryItem,
        Some("cpu.spaces.main".to_owned()),
    );
    assert_eq!("ModelError{unknown_memory_item: cpu.spaces.main}", err.to_string());

    let err = Error::new(ErrorKind::Layout, ErrorCode::IterationLimit, None);
    assert_eq!("LayoutError{iteration_limit}", err.to_string());
}

#[test]
fn test_error_macros() {
    fn lookup(found: bool) -> Result<u32> {
        if !found {
            return model_err!(UnknownInterface, "bus.master".to_owned());
        }
        Ok(1)
    }

    let err = lookup(false).unwrap_err();
    assert_eq!(ErrorKind::Model, err.kind);
    assert_eq!(ErrorCode::UnknownInterface, err.code);
    assert_eq!(Some("bus.master".to_owned()), err.get_details());
    assert_eq!(1, lookup(true).unwrap());

    let err: Result<()> = layout_err!(IterationLimit, "placement".to_owned());
    assert_eq!(ErrorKind::Layout, err.unwrap_err().kind);
}
