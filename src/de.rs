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

//! Read side of the per-type codec, walking the same cell chain the packer produces.
//!
//! Two rules connect consecutive cells of a chain, both mirroring the packer exactly:
//!
//! - a bit read finding the current cell bit-exhausted follows its sole remaining reference;
//! - a reference read finding the cell bit-exhausted with exactly one reference left treats that
//!   reference as the chain continuation, unless the value being read is the last one carrying
//!   any content (`last == true`).

use amplify::Bytes32;
use ftabi_cell::{dict, Cell, CellRef, CellSlice, ParseCell, ReadError};
use num_bigint::{BigInt, Sign};

use crate::ser::{index_key, map_key_len};
use crate::{AbiError, CellBuilder, ParamKind, ParamRef, StdAddr, Value, ValueBody};

/// Reads a single typed value from the cursor, advancing it (possibly into continuation cells).
///
/// `last` must be set when the value is the terminal element of the body being decoded.
pub fn read_value(cursor: &mut CellSlice, param: &ParamRef, last: bool) -> Result<Value, AbiError> {
    let body = match &param.kind {
        ParamKind::Uint(bits) => {
            find_bits(cursor, *bits)?;
            let int = cursor.load_uint(*bits)?;
            ValueBody::Int(BigInt::from_biguint(Sign::Plus, int))
        }
        ParamKind::Int(bits) => {
            find_bits(cursor, *bits)?;
            ValueBody::Int(cursor.load_int(*bits)?)
        }
        ParamKind::Bool => {
            find_bits(cursor, 1)?;
            ValueBody::Bool(cursor.load_bit()?)
        }
        ParamKind::Tuple(items) => {
            let mut values = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                let last = last && items[i + 1..].iter().all(content_free);
                values.push(read_value(cursor, item, last)?);
            }
            ValueBody::Tuple(values)
        }
        ParamKind::Array(item) => {
            find_bits(cursor, 33)?;
            let count = cursor.load_long(32)? as usize;
            ValueBody::Array(read_array_dict(cursor, item, count, last)?)
        }
        ParamKind::FixedArray(item, len) => {
            find_bits(cursor, 1)?;
            ValueBody::Array(read_array_dict(cursor, item, *len, last)?)
        }
        ParamKind::Cell => {
            if last && cursor.is_empty() {
                // tolerate the spliced form: a terminal cell parameter with nothing left to
                // read denotes an empty cell
                ValueBody::Cell(Cell::empty())
            } else {
                ValueBody::Cell(take_ref(cursor, last)?)
            }
        }
        ParamKind::Map(key_param, value_param) => {
            find_bits(cursor, 1)?;
            let mut entries = Vec::new();
            if cursor.load_bit()? {
                let key_len = map_key_len(key_param)?;
                let root = take_ref(cursor, last)?;
                for (key_bits, mut leaf) in dict::parse_dict(root, key_len)? {
                    let key = key_value(&key_bits, key_param)?;
                    let element = if value_param.bit_len().is_some() {
                        read_value(&mut leaf, value_param, true)?
                    } else {
                        let cell = leaf.next_ref()?;
                        read_value(&mut cell.parse(), value_param, true)?
                    };
                    entries.push((key, element));
                }
            }
            ValueBody::Map(entries)
        }
        ParamKind::Address => {
            find_bits(cursor, crate::STD_ADDR_BITS)?;
            ValueBody::Address(read_address(cursor, param)?)
        }
        ParamKind::Bytes => {
            let head = take_ref(cursor, last)?;
            ValueBody::Bytes(collect_chunks(head)?)
        }
        ParamKind::FixedBytes(len) => {
            let head = take_ref(cursor, last)?;
            let bytes = collect_chunks(head)?;
            if bytes.len() != *len {
                return Err(AbiError::OutOfRange(param.name.clone()));
            }
            ValueBody::Bytes(bytes)
        }
        ParamKind::Gram => {
            find_bits(cursor, 4)?;
            let len = cursor.load_long(4)? as usize;
            let mut amount = 0u128;
            for byte in cursor.load_bytes(len)? {
                amount = amount << 8 | byte as u128;
            }
            ValueBody::Gram(amount)
        }
        ParamKind::Time => {
            find_bits(cursor, 64)?;
            ValueBody::Time(cursor.load_long(64)?)
        }
        ParamKind::Expire => {
            find_bits(cursor, 32)?;
            ValueBody::Expire(cursor.load_long(32)? as u32)
        }
        ParamKind::PublicKey => {
            find_bits(cursor, 1)?;
            if cursor.load_bit()? {
                let bytes = cursor.load_bytes(32)?;
                let mut key = [0u8; 32];
                key.copy_from_slice(&bytes);
                ValueBody::PublicKey(Some(Bytes32::from(key)))
            } else {
                ValueBody::PublicKey(None)
            }
        }
    };
    Ok(Value { param: param.clone(), body })
}

/// Positions the cursor on a cell with at least `bits` readable bits, following continuation
/// references of bit-exhausted cells.
pub(crate) fn find_bits(cursor: &mut CellSlice, bits: usize) -> Result<(), AbiError> {
    while bits > 0 && cursor.remaining_bits() == 0 && cursor.remaining_refs() == 1 {
        let next = cursor.next_ref()?;
        *cursor = next.parse();
    }
    if cursor.remaining_bits() < bits {
        return Err(AbiError::Underflow(ReadError::BitsUnderflow {
            wanted: bits,
            left: cursor.remaining_bits(),
        }));
    }
    Ok(())
}

/// Loads a reference belonging to the value being read, distinguishing it from a chain
/// continuation.
///
/// A sole remaining reference of a bit-exhausted cell can only be the continuation when further
/// values follow: their content would otherwise be unreachable. With `last` set it is the
/// value's own reference.
pub(crate) fn take_ref(cursor: &mut CellSlice, last: bool) -> Result<CellRef, AbiError> {
    loop {
        if !last && cursor.remaining_bits() == 0 && cursor.remaining_refs() == 1 {
            let next = cursor.next_ref()?;
            *cursor = next.parse();
        } else {
            return Ok(cursor.next_ref()?);
        }
    }
}

/// Whether a parameter serializes to no bits and no references at all (an empty tuple, possibly
/// nested); such parameters do not count when deciding if a value is the last one of a body.
pub(crate) fn content_free(param: &ParamRef) -> bool {
    matches!(&param.kind, ParamKind::Tuple(items) if items.iter().all(content_free))
}

/// Collects the byte payload of a chunked byte string starting at the chain head.
pub(crate) fn collect_chunks(head: CellRef) -> Result<Vec<u8>, AbiError> {
    let mut bytes = Vec::new();
    let mut cell = head;
    loop {
        if cell.bit_len() % 8 != 0 {
            return Err(AbiError::MisalignedChunk);
        }
        let mut slice = cell.parse();
        bytes.extend(slice.load_bytes(cell.bit_len() / 8)?);
        if slice.remaining_refs() == 0 {
            return Ok(bytes);
        }
        cell = slice.next_ref()?;
    }
}

pub(crate) fn read_address(cursor: &mut CellSlice, param: &ParamRef) -> Result<StdAddr, AbiError> {
    if cursor.load_long(2)? != 0b10 {
        return Err(AbiError::InvalidTag(param.type_signature()));
    }
    if cursor.load_bit()? {
        // anycast addresses are not part of the ABI
        return Err(AbiError::InvalidTag(param.type_signature()));
    }
    let workchain = cursor.load_long(8)? as u8 as i8 as i32;
    let bytes = cursor.load_bytes(32)?;
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&bytes);
    Ok(StdAddr::new(workchain, hash))
}

fn read_array_dict(
    cursor: &mut CellSlice,
    item: &ParamRef,
    count: usize,
    last: bool,
) -> Result<Vec<Value>, AbiError> {
    let mut values = Vec::with_capacity(count);
    if cursor.load_bit()? {
        let root = take_ref(cursor, last)?;
        let leaves = dict::parse_dict(root, 32)?;
        if leaves.len() != count {
            return Err(AbiError::BrokenArray);
        }
        for (index, (key, mut leaf)) in leaves.into_iter().enumerate() {
            if key != index_key(index as u32) {
                return Err(AbiError::BrokenArray);
            }
            let cell = leaf.next_ref()?;
            values.push(read_value(&mut cell.parse(), item, true)?);
        }
    } else if count != 0 {
        return Err(AbiError::BrokenArray);
    }
    Ok(values)
}

fn key_value(bits: &[bool], param: &ParamRef) -> Result<Value, AbiError> {
    let mut cb = CellBuilder::new();
    for &bit in bits {
        cb.push_bit(bit)?;
    }
    let cell = cb.finalize_ref();
    let mut cursor = cell.parse();
    let body = match &param.kind {
        ParamKind::Uint(bits) => {
            ValueBody::Int(BigInt::from_biguint(Sign::Plus, cursor.load_uint(*bits)?))
        }
        ParamKind::Int(bits) => ValueBody::Int(cursor.load_int(*bits)?),
        ParamKind::Address => ValueBody::Address(read_address(&mut cursor, param)?),
        ParamKind::FixedBytes(len) => ValueBody::Bytes(cursor.load_bytes(*len)?),
        _ => return Err(AbiError::InvalidMapKey(param.type_signature())),
    };
    Ok(Value { param: param.clone(), body })
}

#[cfg(test)]
mod test {
    #![cfg_attr(coverage_nightly, coverage(off))]
    use super::*;
    use crate::ser::serialize_value;
    use crate::{pack_into_chain, Param};

    fn roundtrip(value: &Value) {
        let root = pack_into_chain(serialize_value(value).unwrap()).unwrap();
        let mut cursor = root.parse();
        let read = read_value(&mut cursor, &value.param, true).unwrap();
        assert_eq!(&read, value);
        assert!(cursor.is_empty());
    }

    #[test]
    fn integers() {
        roundtrip(&Value::int(&Param::uint("v", 32), 0xDEADBEEFu32));
        roundtrip(&Value::int(&Param::uint("v", 1), 1u8));
        roundtrip(&Value::int(&Param::uint("v", 256), BigInt::from(1u8) << 255));
        roundtrip(&Value::int(&Param::int("v", 8), -128));
        roundtrip(&Value::int(&Param::int("v", 64), i64::MIN));
        let min: BigInt = -(BigInt::from(1u8) << 255i32);
        roundtrip(&Value::int(&Param::int("v", 256), min));
    }

    #[test]
    fn primitives() {
        roundtrip(&Value::boolean(&Param::boolean("v"), true));
        roundtrip(&Value::time(&Param::time("v"), 1_700_000_000_000));
        roundtrip(&Value::expire(&Param::expire("v"), 1_700_000_060));
        roundtrip(&Value::gram(&Param::gram("v"), 0));
        roundtrip(&Value::gram(&Param::gram("v"), 1_000_000_000));
        roundtrip(&Value::gram(&Param::gram("v"), (1u128 << 120) - 1));
        roundtrip(&Value::pubkey(&Param::pubkey("v"), None));
        roundtrip(&Value::pubkey(&Param::pubkey("v"), Some([0x11u8; 32].into())));
    }

    #[test]
    fn addresses() {
        roundtrip(&Value::address(&Param::address("v"), StdAddr::default()));
        roundtrip(&Value::address(&Param::address("v"), StdAddr::new(-1, [0xFF; 32])));
        roundtrip(&Value::address(&Param::address("v"), StdAddr::new(127, [0x5A; 32])));
    }

    #[test]
    fn byte_strings() {
        for len in [0usize, 1, 126, 127, 128, 130, 1024] {
            roundtrip(&Value::bytes(&Param::bytes("v"), vec![0xC3; len]));
        }
        for len in [0usize, 1, 127, 128, 1024] {
            roundtrip(&Value::bytes(&Param::fixed_bytes("v", len), vec![0x7E; len]));
        }
    }

    #[test]
    fn fixed_bytes_length_enforced() {
        let value = Value::bytes(&Param::bytes("v"), vec![1, 2, 3]);
        let root = pack_into_chain(serialize_value(&value).unwrap()).unwrap();
        let wrong = Param::fixed_bytes("v", 4);
        assert!(matches!(
            read_value(&mut root.parse(), &wrong, true),
            Err(AbiError::OutOfRange(_))
        ));
    }

    #[test]
    fn cells() {
        let mut content = CellBuilder::new();
        content.store_long(0xF00D, 16).unwrap();
        roundtrip(&Value::cell(&Param::cell("v"), content.finalize_ref()));
        roundtrip(&Value::cell(&Param::cell("v"), Cell::empty()));
    }

    #[test]
    fn tuples() {
        let empty = Param::tuple("t", []);
        roundtrip(&Value::tuple(&empty, []));

        let single = Param::tuple("t", [Param::uint("a", 8)]);
        roundtrip(&Value::tuple(&single, [Value::int(&Param::uint("a", 8), 5u8)]));

        let items = [
            Param::uint("a", 32),
            Param::boolean("b"),
            Param::bytes("c"),
            Param::gram("d"),
        ];
        let many = Param::tuple("t", items.clone());
        roundtrip(&Value::tuple(&many, [
            Value::int(&items[0], 42u8),
            Value::boolean(&items[1], false),
            Value::bytes(&items[2], vec![9; 200]),
            Value::gram(&items[3], 17),
        ]));
    }

    #[test]
    fn arrays() {
        let item = Param::uint("item", 32);
        let param = Param::array("a", item.clone());
        for len in [0usize, 1, 10, 100] {
            let values = (0..len as u32).map(|i| Value::int(&item, i)).collect::<Vec<_>>();
            roundtrip(&Value::array(&param, values));
        }
        let fixed = Param::fixed_array("a", item.clone(), 4);
        roundtrip(&Value::array(&fixed, (0..4u32).map(|i| Value::int(&item, i))));
    }

    #[test]
    fn large_array() {
        let item = Param::uint("item", 32);
        let param = Param::array("a", item.clone());
        let values = (0..10_000u32).map(|i| Value::int(&item, i)).collect::<Vec<_>>();
        roundtrip(&Value::array(&param, values));
    }

    #[test]
    fn maps() {
        for key_bits in [1usize, 8, 32, 256] {
            let key = Param::uint("k", key_bits);
            let value = Param::uint("v", 32);
            let param = Param::map("m", key.clone(), value.clone());
            let limit = 1u64 << key_bits.min(4) as u64;
            let entries = (0..limit)
                .map(|i| (Value::int(&key, i), Value::int(&value, i * 7)))
                .collect::<Vec<_>>();
            roundtrip(&Value::map(&param, entries));
        }
    }

    #[test]
    fn map_with_signed_keys_and_ref_values() {
        let key = Param::int("k", 8);
        let value = Param::bytes("v");
        let param = Param::map("m", key.clone(), value.clone());
        roundtrip(&Value::map(&param, [
            (Value::int(&key, -1), Value::bytes(&value, vec![1])),
            (Value::int(&key, 0), Value::bytes(&value, vec![2, 2])),
            (Value::int(&key, 1), Value::bytes(&value, vec![3; 300])),
        ]));
    }

    #[test]
    fn map_with_address_keys() {
        let key = Param::address("k");
        let value = Param::boolean("v");
        let param = Param::map("m", key.clone(), value.clone());
        roundtrip(&Value::map(&param, [
            (
                Value::address(&key, StdAddr::new(0, [0x01; 32])),
                Value::boolean(&value, true),
            ),
            (
                Value::address(&key, StdAddr::new(-1, [0x02; 32])),
                Value::boolean(&value, false),
            ),
        ]));
    }

    #[test]
    fn empty_map() {
        let param = Param::map("m", Param::uint("k", 8), Param::uint("v", 8));
        roundtrip(&Value::map(&param, []));
    }

    #[test]
    fn address_tag_is_checked() {
        let mut cb = CellBuilder::new();
        cb.store_zeroes(crate::STD_ADDR_BITS).unwrap();
        let root = cb.finalize_ref();
        assert!(matches!(
            read_value(&mut root.parse(), &Param::address("a"), true),
            Err(AbiError::InvalidTag(_))
        ));
    }

    #[test]
    fn chain_continuation_for_bits() {
        // reference-only leaves fold into a shared cell
        let items = [Param::fixed_bytes("a", 100), Param::fixed_bytes("b", 100)];
        let tuple = Param::tuple("t", items.clone());
        let value = Value::tuple(&tuple, [
            Value::bytes(&items[0], vec![1; 100]),
            Value::bytes(&items[1], vec![2; 100]),
        ]);
        roundtrip(&value);

        let wide = [Param::uint("a", 512), Param::uint("b", 512), Param::uint("c", 512)];
        let tuple = Param::tuple("t", wide.clone());
        let value = Value::tuple(&tuple, [
            Value::int(&wide[0], 1u8),
            Value::int(&wide[1], 2u8),
            Value::int(&wide[2], 3u8),
        ]);
        let root = pack_into_chain(serialize_value(&value).unwrap()).unwrap();
        assert!(root.reference_count() > 0);
        roundtrip(&value);
    }

    #[test]
    fn cell_value_followed_by_bits() {
        // the sole reference belongs to the cell value: the following integer keeps the slice
        // bit-populated, so no continuation is inferred
        let items = [Param::cell("c"), Param::uint("x", 32)];
        let tuple = Param::tuple("t", items.clone());
        let mut content = CellBuilder::new();
        content.store_long(0xBEEF, 16).unwrap();
        roundtrip(&Value::tuple(&tuple, [
            Value::cell(&items[0], content.finalize_ref()),
            Value::int(&items[1], 7u8),
        ]));
    }

    #[test]
    fn ref_values_across_continuations() {
        // a dozen reference-only values overflow the 4-reference budget repeatedly
        let item = Param::bytes("chunk");
        let items = (0..12).map(|_| item.clone()).collect::<Vec<_>>();
        let tuple = Param::tuple("t", items.clone());
        let value = Value::tuple(
            &tuple,
            (0..12u8).map(|i| Value::bytes(&item, vec![i; (i as usize + 1) * 10])),
        );
        roundtrip(&value);
    }

    #[test]
    fn trailing_empty_tuples_carry_no_content() {
        let items = [Param::bytes("b"), Param::tuple("unit", []), Param::tuple("nested", [Param::tuple("u", [])])];
        let tuple = Param::tuple("t", items.clone());
        let value = Value::tuple(&tuple, [
            Value::bytes(&items[0], vec![0xAB; 3]),
            Value::tuple(&items[1], []),
            Value::tuple(&items[2], [Value::tuple(&Param::tuple("u", []), [])]),
        ]);
        roundtrip(&value);
    }

    #[test]
    fn pubkey_bytes_preserved() {
        let key = Bytes32::from([0xEE; 32]);
        let value = Value::pubkey(&Param::pubkey("v"), Some(key));
        let root = pack_into_chain(serialize_value(&value).unwrap()).unwrap();
        let read = read_value(&mut root.parse(), &value.param, true).unwrap();
        match read.body {
            ValueBody::PublicKey(Some(read_key)) => {
                assert_eq!(read_key.to_byte_array(), key.to_byte_array())
            }
            _ => panic!("public key lost"),
        }
    }
}
