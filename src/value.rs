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

use core::fmt::{self, Display, Formatter};

use amplify::Bytes32;
use ftabi_cell::CellRef;
use num_bigint::BigInt;

use crate::{Param, ParamRef};

/// Serialized width of a standard address: 2 tag bits, 1 anycast bit, 8 workchain bits and a
/// 256-bit account hash.
pub const STD_ADDR_BITS: usize = 267;

/// Standard (`addr_std`) account address.
#[derive(Clone, Eq, PartialEq, Hash, Debug, Default)]
pub struct StdAddr {
    pub workchain: i32,
    pub address: Bytes32,
}

impl StdAddr {
    pub fn new(workchain: i32, address: impl Into<Bytes32>) -> Self {
        StdAddr { workchain, address: address.into() }
    }
}

impl Display for StdAddr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.workchain)?;
        for byte in self.address.to_byte_array() {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// Payload of a typed value; the carried representation must match the kind of the owning
/// parameter.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum ValueBody {
    /// Payload of both signed and unsigned integer parameters.
    Int(BigInt),
    Bool(bool),
    Tuple(Vec<Value>),
    /// Payload of both dynamically- and statically-sized arrays.
    Array(Vec<Value>),
    Cell(CellRef),
    Map(Vec<(Value, Value)>),
    Address(StdAddr),
    /// Payload of both `bytes` and `fixedbytesN` parameters.
    Bytes(Vec<u8>),
    Gram(u128),
    Time(u64),
    Expire(u32),
    PublicKey(Option<Bytes32>),
}

impl ValueBody {
    pub(crate) fn kind_name(&self) -> String {
        match self {
            ValueBody::Int(_) => s!("integer"),
            ValueBody::Bool(_) => s!("bool"),
            ValueBody::Tuple(_) => s!("tuple"),
            ValueBody::Array(_) => s!("array"),
            ValueBody::Cell(_) => s!("cell"),
            ValueBody::Map(_) => s!("map"),
            ValueBody::Address(_) => s!("address"),
            ValueBody::Bytes(_) => s!("bytes"),
            ValueBody::Gram(_) => s!("gram"),
            ValueBody::Time(_) => s!("time"),
            ValueBody::Expire(_) => s!("expire"),
            ValueBody::PublicKey(_) => s!("pubkey"),
        }
    }
}

/// Typed value: a schema node plus a payload matching its kind.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct Value {
    pub param: ParamRef,
    pub body: ValueBody,
}

impl Value {
    pub fn with(param: &ParamRef, body: ValueBody) -> Self { Value { param: param.clone(), body } }

    /// Integer payload for both `uintN` and `intN` parameters.
    pub fn int(param: &ParamRef, value: impl Into<BigInt>) -> Self {
        Self::with(param, ValueBody::Int(value.into()))
    }

    pub fn boolean(param: &ParamRef, value: bool) -> Self { Self::with(param, ValueBody::Bool(value)) }

    pub fn tuple(param: &ParamRef, values: impl IntoIterator<Item = Value>) -> Self {
        Self::with(param, ValueBody::Tuple(values.into_iter().collect()))
    }

    /// Element list for both `T[]` and `T[N]` parameters.
    pub fn array(param: &ParamRef, values: impl IntoIterator<Item = Value>) -> Self {
        Self::with(param, ValueBody::Array(values.into_iter().collect()))
    }

    pub fn cell(param: &ParamRef, cell: CellRef) -> Self { Self::with(param, ValueBody::Cell(cell)) }

    pub fn map(param: &ParamRef, entries: impl IntoIterator<Item = (Value, Value)>) -> Self {
        Self::with(param, ValueBody::Map(entries.into_iter().collect()))
    }

    pub fn address(param: &ParamRef, address: StdAddr) -> Self {
        Self::with(param, ValueBody::Address(address))
    }

    /// Byte payload for both `bytes` and `fixedbytesN` parameters.
    pub fn bytes(param: &ParamRef, data: impl Into<Vec<u8>>) -> Self {
        Self::with(param, ValueBody::Bytes(data.into()))
    }

    pub fn gram(param: &ParamRef, amount: u128) -> Self { Self::with(param, ValueBody::Gram(amount)) }

    pub fn time(param: &ParamRef, ms: u64) -> Self { Self::with(param, ValueBody::Time(ms)) }

    pub fn expire(param: &ParamRef, at: u32) -> Self { Self::with(param, ValueBody::Expire(at)) }

    pub fn pubkey(param: &ParamRef, key: Option<Bytes32>) -> Self {
        Self::with(param, ValueBody::PublicKey(key))
    }

    /// Whether this value can be used where `expected` is declared. Matches canonical type
    /// signatures, so parameter names do not participate.
    pub fn check_type(&self, expected: &Param) -> bool {
        self.param.type_signature() == expected.type_signature()
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.body {
            ValueBody::Int(value) => Display::fmt(value, f),
            ValueBody::Bool(value) => Display::fmt(value, f),
            ValueBody::Tuple(items) => {
                f.write_str("(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    Display::fmt(item, f)?;
                }
                f.write_str(")")
            }
            ValueBody::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    Display::fmt(item, f)?;
                }
                f.write_str("]")
            }
            ValueBody::Cell(cell) => write!(f, "{:x}", cell.repr_hash()),
            ValueBody::Map(entries) => {
                f.write_str("{")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                f.write_str("}")
            }
            ValueBody::Address(addr) => Display::fmt(addr, f),
            ValueBody::Bytes(bytes) => {
                for byte in bytes {
                    write!(f, "{byte:02x}")?;
                }
                Ok(())
            }
            ValueBody::Gram(amount) => Display::fmt(amount, f),
            ValueBody::Time(ms) => Display::fmt(ms, f),
            ValueBody::Expire(at) => Display::fmt(at, f),
            ValueBody::PublicKey(Some(key)) => {
                for byte in key.to_byte_array() {
                    write!(f, "{byte:02x}")?;
                }
                Ok(())
            }
            ValueBody::PublicKey(None) => f.write_str("none"),
        }
    }
}

/// Validates a value list against a parameter list, position by position.
pub fn check_params(values: &[Value], params: &[ParamRef]) -> bool {
    values.len() == params.len()
        && values
            .iter()
            .zip(params)
            .all(|(value, param)| value.check_type(param))
}
