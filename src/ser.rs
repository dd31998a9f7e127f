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

//! Write side of the per-type codec: values become lists of partial cells, which the packer then
//! fuses into a single chain of linked cells.

use ftabi_cell::{dict, Cell, CellBuilder, CellRef, MAX_DATA_BITS, MAX_REFS};
use num_bigint::{BigInt, Sign};

use crate::{AbiError, ParamKind, ParamRef, StdAddr, Value, ValueBody};

/// Fuses an ordered list of partial cells into a single root cell.
///
/// Folds the list right to left: a leaf absorbs the accumulated tail whenever both the 1023-bit
/// and the 4-reference budgets allow, and otherwise links the tail as its last reference. Packing
/// cannot fail for leaves which individually fit into a cell.
pub fn pack_into_chain(builders: Vec<CellBuilder>) -> Result<CellRef, AbiError> {
    let mut acc = CellBuilder::new();
    for mut leaf in builders.into_iter().rev() {
        if acc.is_empty() {
            acc = leaf;
            continue;
        }
        if leaf.bit_len() + acc.bit_len() <= MAX_DATA_BITS
            && leaf.reference_count() + acc.reference_count() <= MAX_REFS
        {
            leaf.append_builder(&acc)?;
        } else {
            leaf.store_ref(acc.finalize_ref())?;
        }
        acc = leaf;
    }
    Ok(acc.finalize_ref())
}

/// Serializes a single typed value into a list of partial cells.
///
/// Only tuples produce more than one partial cell: their elements stay separate so that the
/// packer may chain between them. Every other type serializes into exactly one leaf.
pub fn serialize_value(value: &Value) -> Result<Vec<CellBuilder>, AbiError> {
    let name = || value.param.name.clone();
    match (&value.param.kind, &value.body) {
        (ParamKind::Uint(bits), ValueBody::Int(int)) => {
            if int.sign() == Sign::Minus || int.bits() > *bits as u64 {
                return Err(AbiError::OutOfRange(name()));
            }
            let mut cb = CellBuilder::new();
            cb.store_uint(int.magnitude(), *bits)?;
            Ok(vec![cb])
        }
        (ParamKind::Int(bits), ValueBody::Int(int)) => {
            if !fits_signed(int, *bits) {
                return Err(AbiError::OutOfRange(name()));
            }
            let mut cb = CellBuilder::new();
            cb.store_int(int, *bits)?;
            Ok(vec![cb])
        }
        (ParamKind::Bool, ValueBody::Bool(bit)) => {
            let mut cb = CellBuilder::new();
            cb.push_bit(*bit)?;
            Ok(vec![cb])
        }
        (ParamKind::Tuple(items), ValueBody::Tuple(values)) => {
            if items.len() != values.len() {
                return Err(AbiError::ParamCountMismatch);
            }
            let mut builders = Vec::with_capacity(values.len());
            for (item, element) in items.iter().zip(values) {
                check_value(element, item)?;
                builders.extend(serialize_value(element)?);
            }
            Ok(builders)
        }
        (ParamKind::Array(item), ValueBody::Array(values)) => {
            let mut cb = CellBuilder::new();
            cb.store_long(values.len() as u64, 32)?;
            store_array_dict(&mut cb, item, values)?;
            Ok(vec![cb])
        }
        (ParamKind::FixedArray(item, len), ValueBody::Array(values)) => {
            if values.len() != *len {
                return Err(AbiError::OutOfRange(name()));
            }
            let mut cb = CellBuilder::new();
            store_array_dict(&mut cb, item, values)?;
            Ok(vec![cb])
        }
        (ParamKind::Cell, ValueBody::Cell(cell)) => {
            let mut cb = CellBuilder::new();
            cb.store_ref(cell.clone())?;
            Ok(vec![cb])
        }
        (ParamKind::Map(key_param, value_param), ValueBody::Map(entries)) => {
            let key_len = map_key_len(key_param)?;
            let inline = value_param.bit_len().is_some();
            let mut dict_entries = Vec::with_capacity(entries.len());
            for (key, element) in entries {
                check_value(key, key_param)?;
                check_value(element, value_param)?;
                let mut leaf = CellBuilder::new();
                if inline {
                    for part in serialize_value(element)? {
                        leaf.append_builder(&part)?;
                    }
                } else {
                    leaf.store_ref(pack_into_chain(serialize_value(element)?)?)?;
                }
                dict_entries.push((serialize_map_key(key, key_len)?, leaf));
            }
            let root = dict::build_dict(key_len, dict_entries)?;
            let mut cb = CellBuilder::new();
            cb.push_bit(root.is_some())?;
            if let Some(root) = root {
                cb.store_ref(root)?;
            }
            Ok(vec![cb])
        }
        (ParamKind::Address, ValueBody::Address(addr)) => {
            let mut cb = CellBuilder::new();
            store_address(&mut cb, addr, &value.param.name)?;
            Ok(vec![cb])
        }
        (ParamKind::Bytes, ValueBody::Bytes(bytes)) => {
            let mut cb = CellBuilder::new();
            cb.store_ref(chunk_chain(bytes)?)?;
            Ok(vec![cb])
        }
        (ParamKind::FixedBytes(len), ValueBody::Bytes(bytes)) => {
            if bytes.len() != *len {
                return Err(AbiError::OutOfRange(name()));
            }
            let mut cb = CellBuilder::new();
            cb.store_ref(chunk_chain(bytes)?)?;
            Ok(vec![cb])
        }
        (ParamKind::Gram, ValueBody::Gram(amount)) => {
            let bytes = amount.to_be_bytes();
            let skip = bytes.iter().take_while(|byte| **byte == 0).count();
            if bytes.len() - skip > 15 {
                return Err(AbiError::OutOfRange(name()));
            }
            let mut cb = CellBuilder::new();
            cb.store_long((bytes.len() - skip) as u64, 4)?;
            cb.store_bytes(&bytes[skip..])?;
            Ok(vec![cb])
        }
        (ParamKind::Time, ValueBody::Time(ms)) => {
            let mut cb = CellBuilder::new();
            cb.store_long(*ms, 64)?;
            Ok(vec![cb])
        }
        (ParamKind::Expire, ValueBody::Expire(at)) => {
            let mut cb = CellBuilder::new();
            cb.store_long(*at as u64, 32)?;
            Ok(vec![cb])
        }
        (ParamKind::PublicKey, ValueBody::PublicKey(key)) => {
            let mut cb = CellBuilder::new();
            cb.push_bit(key.is_some())?;
            if let Some(key) = key {
                cb.append_raw(&key.to_byte_array(), 256)?;
            }
            Ok(vec![cb])
        }
        (_, body) => Err(AbiError::TypeMismatch {
            name: name(),
            expected: value.param.type_signature(),
            found: body.kind_name(),
        }),
    }
}

/// Checks that a supplied value matches the declared parameter type.
pub(crate) fn check_value(value: &Value, expected: &ParamRef) -> Result<(), AbiError> {
    if !value.check_type(expected) {
        return Err(AbiError::TypeMismatch {
            name: expected.name.clone(),
            expected: expected.type_signature(),
            found: value.param.type_signature(),
        });
    }
    Ok(())
}

/// Width of the dictionary key produced by a map key type; only types with a fixed serialized
/// width may key a dictionary.
pub(crate) fn map_key_len(param: &ParamRef) -> Result<usize, AbiError> {
    match &param.kind {
        ParamKind::Uint(bits) | ParamKind::Int(bits) => Ok(*bits),
        ParamKind::Address => Ok(crate::STD_ADDR_BITS),
        ParamKind::FixedBytes(len) => Ok(len * 8),
        _ => Err(AbiError::InvalidMapKey(param.type_signature())),
    }
}

/// Big-endian bit form of an array index used as a dictionary key.
pub(crate) fn index_key(index: u32) -> Vec<bool> {
    (0..32).rev().map(|i| index >> i & 1 == 1).collect()
}

pub(crate) fn store_address(cb: &mut CellBuilder, addr: &StdAddr, name: &str) -> Result<(), AbiError> {
    if addr.workchain < i8::MIN as i32 || addr.workchain > i8::MAX as i32 {
        return Err(AbiError::OutOfRange(name.to_owned()));
    }
    // addr_std$10, no anycast
    cb.push_bit(true)?;
    cb.push_bit(false)?;
    cb.push_bit(false)?;
    cb.store_long(addr.workchain as i8 as u8 as u64, 8)?;
    cb.append_raw(&addr.address.to_byte_array(), 256)?;
    Ok(())
}

fn store_array_dict(cb: &mut CellBuilder, item: &ParamRef, values: &[Value]) -> Result<(), AbiError> {
    let mut entries = Vec::with_capacity(values.len());
    for (index, element) in values.iter().enumerate() {
        check_value(element, item)?;
        let mut leaf = CellBuilder::new();
        leaf.store_ref(pack_into_chain(serialize_value(element)?)?)?;
        entries.push((index_key(index as u32), leaf));
    }
    let root = dict::build_dict(32, entries)?;
    cb.push_bit(root.is_some())?;
    if let Some(root) = root {
        cb.store_ref(root)?;
    }
    Ok(())
}

fn serialize_map_key(key: &Value, key_len: usize) -> Result<Vec<bool>, AbiError> {
    let mut cb = CellBuilder::new();
    match (&key.param.kind, &key.body) {
        (ParamKind::Uint(bits), ValueBody::Int(int)) => {
            if int.sign() == Sign::Minus || int.bits() > *bits as u64 {
                return Err(AbiError::OutOfRange(key.param.name.clone()));
            }
            cb.store_uint(int.magnitude(), *bits)?;
        }
        (ParamKind::Int(bits), ValueBody::Int(int)) => {
            if !fits_signed(int, *bits) {
                return Err(AbiError::OutOfRange(key.param.name.clone()));
            }
            cb.store_int(int, *bits)?;
        }
        (ParamKind::Address, ValueBody::Address(addr)) => {
            store_address(&mut cb, addr, &key.param.name)?
        }
        (ParamKind::FixedBytes(len), ValueBody::Bytes(bytes)) => {
            if bytes.len() != *len {
                return Err(AbiError::OutOfRange(key.param.name.clone()));
            }
            cb.store_bytes(bytes)?;
        }
        _ => return Err(AbiError::InvalidMapKey(key.param.type_signature())),
    }
    debug_assert_eq!(cb.bit_len(), key_len);
    Ok(cb.to_bits())
}

/// Splits a byte string into a linear chain of chunk cells, at most 127 bytes each.
pub(crate) fn chunk_chain(bytes: &[u8]) -> Result<CellRef, AbiError> {
    let mut next: Option<CellRef> = None;
    for chunk in bytes.chunks(127).rev() {
        let mut cb = CellBuilder::new();
        cb.store_bytes(chunk)?;
        if let Some(tail) = next {
            cb.store_ref(tail)?;
        }
        next = Some(cb.finalize_ref());
    }
    Ok(next.unwrap_or_else(Cell::empty))
}

pub(crate) fn fits_signed(value: &BigInt, bits: usize) -> bool {
    if bits == 0 {
        return value.sign() == Sign::NoSign;
    }
    let bound = BigInt::from(1u8) << (bits - 1);
    *value < bound && *value >= -bound
}
