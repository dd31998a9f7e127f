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

use num_bigint::{BigInt, BigUint};

use crate::{Cell, CellRef, CellSlice, MAX_DATA_BITS, MAX_REFS};

/// Errors appending data to a [`CellBuilder`].
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Display, Error)]
#[display(doc_comments)]
pub enum BuildError {
    /// the cell data capacity of 1023 bits is exhausted.
    BitsOverflow,

    /// the cell reference capacity of 4 links is exhausted.
    RefsOverflow,

    /// the value requires more bits than the requested field width.
    FieldOverflow,
}

/// Write cursor which accumulates payload bits and references and finalizes them into a [`Cell`].
#[derive(Clone, Default, Debug)]
pub struct CellBuilder {
    data: Vec<u8>,
    bit_len: usize,
    refs: Vec<CellRef>,
}

impl CellBuilder {
    pub fn new() -> Self { Self::default() }

    pub fn bit_len(&self) -> usize { self.bit_len }

    pub fn reference_count(&self) -> usize { self.refs.len() }

    pub fn is_empty(&self) -> bool { self.bit_len == 0 && self.refs.is_empty() }

    pub fn remaining_bits(&self) -> usize { MAX_DATA_BITS - self.bit_len }

    pub fn remaining_refs(&self) -> usize { MAX_REFS - self.refs.len() }

    /// Returns all accumulated payload bits, most significant first.
    pub fn to_bits(&self) -> Vec<bool> { (0..self.bit_len).map(|i| self.bit(i)).collect() }

    fn bit(&self, index: usize) -> bool { self.data[index / 8] & (0x80 >> (index % 8)) != 0 }

    fn push_unchecked(&mut self, bit: bool) {
        if self.bit_len % 8 == 0 {
            self.data.push(0);
        }
        if bit {
            self.data[self.bit_len / 8] |= 0x80 >> (self.bit_len % 8);
        }
        self.bit_len += 1;
    }

    fn ensure_bits(&self, bits: usize) -> Result<(), BuildError> {
        if self.bit_len + bits > MAX_DATA_BITS {
            return Err(BuildError::BitsOverflow);
        }
        Ok(())
    }

    pub fn push_bit(&mut self, bit: bool) -> Result<(), BuildError> {
        self.ensure_bits(1)?;
        self.push_unchecked(bit);
        Ok(())
    }

    pub fn store_zeroes(&mut self, bits: usize) -> Result<(), BuildError> {
        self.ensure_bits(bits)?;
        for _ in 0..bits {
            self.push_unchecked(false);
        }
        Ok(())
    }

    /// Appends the leading `bits` bits of `bytes`, most significant bit of each byte first.
    pub fn append_raw(&mut self, bytes: &[u8], bits: usize) -> Result<(), BuildError> {
        if bytes.len() * 8 < bits {
            return Err(BuildError::FieldOverflow);
        }
        self.ensure_bits(bits)?;
        for i in 0..bits {
            self.push_unchecked(bytes[i / 8] & (0x80 >> (i % 8)) != 0);
        }
        Ok(())
    }

    pub fn store_bytes(&mut self, bytes: &[u8]) -> Result<(), BuildError> {
        self.append_raw(bytes, bytes.len() * 8)
    }

    /// Stores the lowest `bits` bits of `value` in big-endian bit order; `bits` must not
    /// exceed 64.
    pub fn store_long(&mut self, value: u64, bits: usize) -> Result<(), BuildError> {
        debug_assert!(bits <= 64);
        if bits < 64 && value >> bits != 0 {
            return Err(BuildError::FieldOverflow);
        }
        self.ensure_bits(bits)?;
        for i in (0..bits).rev() {
            self.push_unchecked(value >> i & 1 == 1);
        }
        Ok(())
    }

    /// Stores an unsigned big integer as a `bits`-wide big-endian field.
    pub fn store_uint(&mut self, value: &BigUint, bits: usize) -> Result<(), BuildError> {
        if value.bits() > bits as u64 {
            return Err(BuildError::FieldOverflow);
        }
        self.ensure_bits(bits)?;
        for i in (0..bits as u64).rev() {
            self.push_unchecked(value.bit(i));
        }
        Ok(())
    }

    /// Stores a signed big integer as a `bits`-wide two's complement big-endian field.
    pub fn store_int(&mut self, value: &BigInt, bits: usize) -> Result<(), BuildError> {
        use num_bigint::Sign;
        if bits == 0 {
            return match value.sign() {
                Sign::NoSign => Ok(()),
                _ => Err(BuildError::FieldOverflow),
            };
        }
        let bound = BigInt::from(1u8) << (bits - 1);
        if *value >= bound || *value < -&bound {
            return Err(BuildError::FieldOverflow);
        }
        self.ensure_bits(bits)?;
        for i in (0..bits as u64).rev() {
            // num-bigint reports bits of negative numbers in two's complement form
            self.push_unchecked(value.bit(i));
        }
        Ok(())
    }

    pub fn store_ref(&mut self, cell: CellRef) -> Result<(), BuildError> {
        if self.refs.len() >= MAX_REFS {
            return Err(BuildError::RefsOverflow);
        }
        self.refs.push(cell);
        Ok(())
    }

    /// Appends all bits of `other`, followed by all of its references.
    pub fn append_builder(&mut self, other: &CellBuilder) -> Result<(), BuildError> {
        self.ensure_bits(other.bit_len)?;
        if self.refs.len() + other.refs.len() > MAX_REFS {
            return Err(BuildError::RefsOverflow);
        }
        for i in 0..other.bit_len {
            self.push_unchecked(other.bit(i));
        }
        self.refs.extend(other.refs.iter().cloned());
        Ok(())
    }

    /// Appends the unread remainder of a slice: its bits, followed by its references.
    pub fn append_slice(&mut self, slice: &CellSlice) -> Result<(), BuildError> {
        self.ensure_bits(slice.remaining_bits())?;
        if self.refs.len() + slice.remaining_refs() > MAX_REFS {
            return Err(BuildError::RefsOverflow);
        }
        for i in 0..slice.remaining_bits() {
            self.push_unchecked(slice.peek_bit(i));
        }
        for i in 0..slice.remaining_refs() {
            self.refs.push(slice.peek_ref(i));
        }
        Ok(())
    }

    pub fn finalize(self) -> Cell { Cell::with(self.data, self.bit_len, self.refs) }

    pub fn finalize_ref(self) -> CellRef { CellRef::new(self.finalize()) }
}
