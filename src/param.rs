// FTABI: Function ABI codec for TVM-family distributed contracts
//
// SPDX-License-Identifier: Apache-2.0
//
// Designed in 2019-2025 by Dr Maxim Orlovsky <orlovsky@ubideco.org>
// Written in 2024-2025 by Dr Maxim Orlovsky <orlovsky@ubideco.org>
//
// Copyright (C) 2019-2024 LNP/BP Standards Association, Switzerland.
// Copyright (C) 2024-2025 Laboratories for Ubiquitous Deterministic Computing (UBIDECO),
//                         Institute for Distributed and Cognitive Systems (InDCS), Switzerland.
// Copyright (C) 2019-2025 Dr Maxim Orlovsky.
// All rights under the above copyrights are reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License"); you may not use this file except
// in compliance with the License. You may obtain a copy of the License at
//
//        http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software distributed under the License
// is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express
// or implied. See the License for the specific language governing permissions and limitations under
// the License.

use std::sync::Arc;

use chrono::Utc;
use ftabi_cell::Cell;
use num_bigint::BigInt;

use crate::{StdAddr, Value, ValueBody};

/// Shared handle to an immutable schema node.
///
/// Parameter trees are freely shared between functions and values; structural equality is defined
/// by the canonical type signature, so no deep cloning is ever needed.
pub type ParamRef = Arc<Param>;

/// Time source used when a `time` header parameter has to be defaulted to the current wall
/// clock. Tests pin it to a fixed value.
pub trait Clock {
    /// Milliseconds since the Unix epoch.
    fn now_ms(&self) -> u64;
}

/// System wall clock.
#[derive(Copy, Clone, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 { Utc::now().timestamp_millis() as u64 }
}

/// Type layer of a schema node.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum ParamKind {
    /// Unsigned integer of the given bit width.
    Uint(usize),
    /// Two's complement signed integer of the given bit width.
    Int(usize),
    Bool,
    /// Product type whose elements are serialized inline, one after another.
    Tuple(Vec<ParamRef>),
    /// Dynamically-sized homogeneous collection.
    Array(ParamRef),
    /// Statically-sized homogeneous collection.
    FixedArray(ParamRef, usize),
    /// Opaque tree of cells, stored as a reference.
    Cell,
    /// Dictionary from a fixed-width key type to an arbitrary value type.
    Map(ParamRef, ParamRef),
    /// Standard address: workchain plus a 256-bit account hash.
    Address,
    /// Byte string of arbitrary length, stored as a chain of chunk cells.
    Bytes,
    /// Byte string of a fixed length.
    FixedBytes(usize),
    /// Currency amount with a 4-bit length prefix.
    Gram,
    /// Message creation time, milliseconds, 64 bits.
    Time,
    /// Message expiration time, seconds, 32 bits.
    Expire,
    /// Optional 256-bit Ed25519 public key.
    PublicKey,
}

impl ParamKind {
    /// Canonical textual form of the type, used for equality checks and for computing function
    /// selectors. Two types are equivalent iff their signatures are byte-equal.
    pub fn type_signature(&self) -> String {
        match self {
            ParamKind::Uint(bits) => format!("uint{bits}"),
            ParamKind::Int(bits) => format!("int{bits}"),
            ParamKind::Bool => s!("bool"),
            ParamKind::Tuple(items) if items.is_empty() => s!("()"),
            ParamKind::Tuple(items) => {
                let inner = items
                    .iter()
                    .map(|item| item.type_signature())
                    .collect::<Vec<_>>()
                    .join(",");
                format!("({inner})")
            }
            ParamKind::Array(item) => format!("{}[]", item.type_signature()),
            ParamKind::FixedArray(item, len) => format!("{}[{len}]", item.type_signature()),
            ParamKind::Cell => s!("cell"),
            ParamKind::Map(key, value) => {
                format!("map({},{})", key.type_signature(), value.type_signature())
            }
            ParamKind::Address => s!("address"),
            ParamKind::Bytes => s!("bytes"),
            ParamKind::FixedBytes(len) => format!("fixedbytes{len}"),
            ParamKind::Gram => s!("gram"),
            ParamKind::Time => s!("time"),
            ParamKind::Expire => s!("expire"),
            ParamKind::PublicKey => s!("pubkey"),
        }
    }

    /// Width of the serialized form, defined for fixed-width primitives only.
    pub fn bit_len(&self) -> Option<usize> {
        match self {
            ParamKind::Uint(bits) | ParamKind::Int(bits) => Some(*bits),
            ParamKind::Bool => Some(1),
            _ => None,
        }
    }
}

/// Named schema node: a function parameter or a nested element of a compound parameter.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct Param {
    pub name: String,
    pub kind: ParamKind,
}

impl Param {
    fn with(name: impl Into<String>, kind: ParamKind) -> ParamRef {
        Arc::new(Param { name: name.into(), kind })
    }

    pub fn uint(name: impl Into<String>, bits: usize) -> ParamRef { Self::with(name, ParamKind::Uint(bits)) }

    pub fn int(name: impl Into<String>, bits: usize) -> ParamRef { Self::with(name, ParamKind::Int(bits)) }

    pub fn boolean(name: impl Into<String>) -> ParamRef { Self::with(name, ParamKind::Bool) }

    pub fn tuple(name: impl Into<String>, items: impl IntoIterator<Item = ParamRef>) -> ParamRef {
        Self::with(name, ParamKind::Tuple(items.into_iter().collect()))
    }

    pub fn array(name: impl Into<String>, item: ParamRef) -> ParamRef {
        Self::with(name, ParamKind::Array(item))
    }

    pub fn fixed_array(name: impl Into<String>, item: ParamRef, len: usize) -> ParamRef {
        Self::with(name, ParamKind::FixedArray(item, len))
    }

    pub fn cell(name: impl Into<String>) -> ParamRef { Self::with(name, ParamKind::Cell) }

    pub fn map(name: impl Into<String>, key: ParamRef, value: ParamRef) -> ParamRef {
        Self::with(name, ParamKind::Map(key, value))
    }

    pub fn address(name: impl Into<String>) -> ParamRef { Self::with(name, ParamKind::Address) }

    pub fn bytes(name: impl Into<String>) -> ParamRef { Self::with(name, ParamKind::Bytes) }

    pub fn fixed_bytes(name: impl Into<String>, len: usize) -> ParamRef {
        Self::with(name, ParamKind::FixedBytes(len))
    }

    pub fn gram(name: impl Into<String>) -> ParamRef { Self::with(name, ParamKind::Gram) }

    pub fn time(name: impl Into<String>) -> ParamRef { Self::with(name, ParamKind::Time) }

    pub fn expire(name: impl Into<String>) -> ParamRef { Self::with(name, ParamKind::Expire) }

    pub fn pubkey(name: impl Into<String>) -> ParamRef { Self::with(name, ParamKind::PublicKey) }

    /// See [`ParamKind::type_signature`].
    pub fn type_signature(&self) -> String { self.kind.type_signature() }

    /// See [`ParamKind::bit_len`].
    pub fn bit_len(&self) -> Option<usize> { self.kind.bit_len() }

    /// Value assumed for an absent header parameter.
    ///
    /// Collection types have no default and must always be provided explicitly; a tuple has a
    /// default iff all of its elements have one.
    pub fn default_value(&self, clock: &dyn Clock) -> Option<Value> {
        let body = match &self.kind {
            ParamKind::Uint(_) | ParamKind::Int(_) => ValueBody::Int(BigInt::default()),
            ParamKind::Bool => ValueBody::Bool(false),
            ParamKind::Tuple(items) => ValueBody::Tuple(
                items
                    .iter()
                    .map(|item| item.default_value(clock))
                    .collect::<Option<Vec<_>>>()?,
            ),
            ParamKind::Cell => ValueBody::Cell(Cell::empty()),
            ParamKind::Address => ValueBody::Address(StdAddr::default()),
            ParamKind::Bytes => ValueBody::Bytes(vec![]),
            ParamKind::FixedBytes(len) => ValueBody::Bytes(vec![0; *len]),
            ParamKind::Gram => ValueBody::Gram(0),
            ParamKind::Time => ValueBody::Time(clock.now_ms()),
            ParamKind::Expire => ValueBody::Expire(u32::MAX),
            ParamKind::PublicKey => ValueBody::PublicKey(None),
            ParamKind::Array(_) | ParamKind::FixedArray(..) | ParamKind::Map(..) => return None,
        };
        Some(Value { param: Arc::new(self.clone()), body })
    }
}

#[cfg(test)]
mod test {
    #![cfg_attr(coverage_nightly, coverage(off))]
    use super::*;

    struct FixedClock(u64);
    impl Clock for FixedClock {
        fn now_ms(&self) -> u64 { self.0 }
    }

    #[test]
    fn primitive_signatures() {
        assert_eq!(Param::uint("a", 32).type_signature(), "uint32");
        assert_eq!(Param::int("a", 256).type_signature(), "int256");
        assert_eq!(Param::boolean("a").type_signature(), "bool");
        assert_eq!(Param::cell("a").type_signature(), "cell");
        assert_eq!(Param::address("a").type_signature(), "address");
        assert_eq!(Param::bytes("a").type_signature(), "bytes");
        assert_eq!(Param::fixed_bytes("a", 16).type_signature(), "fixedbytes16");
        assert_eq!(Param::gram("a").type_signature(), "gram");
        assert_eq!(Param::time("a").type_signature(), "time");
        assert_eq!(Param::expire("a").type_signature(), "expire");
        assert_eq!(Param::pubkey("a").type_signature(), "pubkey");
    }

    #[test]
    fn compound_signatures() {
        assert_eq!(Param::tuple("t", []).type_signature(), "()");
        assert_eq!(
            Param::tuple("t", [Param::uint("x", 8), Param::boolean("y")]).type_signature(),
            "(uint8,bool)"
        );
        assert_eq!(Param::array("a", Param::uint("x", 8)).type_signature(), "uint8[]");
        assert_eq!(Param::fixed_array("a", Param::uint("x", 8), 4).type_signature(), "uint8[4]");
        assert_eq!(
            Param::map("m", Param::uint("k", 32), Param::address("v")).type_signature(),
            "map(uint32,address)"
        );
    }

    #[test]
    fn signatures_ignore_names() {
        let a = Param::tuple("first", [Param::uint("x", 8), Param::boolean("y")]);
        let b = Param::tuple("second", [Param::uint("other", 8), Param::boolean("flag")]);
        assert_eq!(a.type_signature(), b.type_signature());
    }

    #[test]
    fn bit_len_for_fixed_width_primitives() {
        assert_eq!(Param::uint("a", 77).bit_len(), Some(77));
        assert_eq!(Param::int("a", 8).bit_len(), Some(8));
        assert_eq!(Param::boolean("a").bit_len(), Some(1));
        assert_eq!(Param::gram("a").bit_len(), None);
        assert_eq!(Param::bytes("a").bit_len(), None);
        assert_eq!(Param::tuple("a", [Param::uint("x", 8)]).bit_len(), None);
    }

    #[test]
    fn defaults() {
        let clock = FixedClock(1_700_000_000_000);
        assert_eq!(
            Param::time("time").default_value(&clock).unwrap().body,
            ValueBody::Time(1_700_000_000_000)
        );
        assert_eq!(Param::expire("expire").default_value(&clock).unwrap().body, ValueBody::Expire(u32::MAX));
        assert_eq!(Param::pubkey("pubkey").default_value(&clock).unwrap().body, ValueBody::PublicKey(None));
        assert_eq!(Param::uint("x", 8).default_value(&clock).unwrap().body, ValueBody::Int(BigInt::default()));
        assert_eq!(Param::fixed_bytes("x", 4).default_value(&clock).unwrap().body, ValueBody::Bytes(vec![0; 4]));
        assert!(Param::array("x", Param::uint("i", 8)).default_value(&clock).is_none());
        assert!(Param::map("x", Param::uint("k", 8), Param::uint("v", 8))
            .default_value(&clock)
            .is_none());

        let with_default = Param::tuple("t", [Param::uint("x", 8), Param::boolean("y")]);
        assert!(with_default.default_value(&clock).is_some());
        let without = Param::tuple("t", [Param::array("a", Param::uint("x", 8))]);
        assert!(without.default_value(&clock).is_none());
    }
}
