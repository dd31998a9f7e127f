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

use num_bigint::{BigInt, BigUint, Sign};

use crate::CellRef;

/// Errors reading data from a [`CellSlice`].
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Display, Error)]
#[display(doc_comments)]
pub enum ReadError {
    /// attempt to read {wanted} bits from a cell slice with only {left} bits remaining.
    BitsUnderflow { wanted: usize, left: usize },

    /// attempt to load a reference from a cell slice with no references left.
    RefsUnderflow,
}

/// Read cursor over the payload bits and references of a single cell.
#[derive(Clone, Debug)]
pub struct CellSlice {
    cell: CellRef,
    bit_pos: usize,
    ref_pos: usize,
}

impl From<CellRef> for CellSlice {
    fn from(cell: CellRef) -> Self { Self::new(cell) }
}

/// Extension opening a read cursor directly on a shared cell handle.
pub trait ParseCell {
    /// Opens a cursor positioned at the first payload bit and the first reference.
    fn parse(&self) -> CellSlice;
}

impl ParseCell for CellRef {
    fn parse(&self) -> CellSlice { CellSlice::new(self.clone()) }
}

impl CellSlice {
    pub fn new(cell: CellRef) -> Self { CellSlice { cell, bit_pos: 0, ref_pos: 0 } }

    /// The cell this cursor reads from.
    pub fn cell(&self) -> &CellRef { &self.cell }

    pub fn remaining_bits(&self) -> usize { self.cell.bit_len() - self.bit_pos }

    pub fn remaining_refs(&self) -> usize { self.cell.reference_count() - self.ref_pos }

    pub fn is_empty(&self) -> bool { self.remaining_bits() == 0 && self.remaining_refs() == 0 }

    pub(crate) fn peek_bit(&self, offset: usize) -> bool {
        let index = self.bit_pos + offset;
        self.cell.raw_data()[index / 8] & (0x80 >> (index % 8)) != 0
    }

    pub(crate) fn peek_ref(&self, offset: usize) -> CellRef { self.cell.raw_ref(self.ref_pos + offset) }

    fn ensure_bits(&self, wanted: usize) -> Result<(), ReadError> {
        let left = self.remaining_bits();
        if left < wanted {
            return Err(ReadError::BitsUnderflow { wanted, left });
        }
        Ok(())
    }

    pub fn load_bit(&mut self) -> Result<bool, ReadError> {
        self.ensure_bits(1)?;
        let bit = self.peek_bit(0);
        self.bit_pos += 1;
        Ok(bit)
    }

    pub fn skip_bits(&mut self, bits: usize) -> Result<(), ReadError> {
        self.ensure_bits(bits)?;
        self.bit_pos += bits;
        Ok(())
    }

    /// Reads `bits` bits (at most 64) as a big-endian unsigned integer.
    pub fn load_long(&mut self, bits: usize) -> Result<u64, ReadError> {
        debug_assert!(bits <= 64);
        self.ensure_bits(bits)?;
        let mut acc = 0u64;
        for i in 0..bits {
            acc = acc << 1 | self.peek_bit(i) as u64;
        }
        self.bit_pos += bits;
        Ok(acc)
    }

    /// Reads `bits` bits as a big-endian unsigned big integer.
    pub fn load_uint(&mut self, bits: usize) -> Result<BigUint, ReadError> {
        self.ensure_bits(bits)?;
        let mut acc = BigUint::default();
        for i in 0..bits {
            acc <<= 1usize;
            if self.peek_bit(i) {
                acc += 1u8;
            }
        }
        self.bit_pos += bits;
        Ok(acc)
    }

    /// Reads `bits` bits as a big-endian two's complement signed big integer.
    pub fn load_int(&mut self, bits: usize) -> Result<BigInt, ReadError> {
        if bits == 0 {
            return Ok(BigInt::default());
        }
        self.ensure_bits(bits)?;
        let negative = self.peek_bit(0);
        let magnitude = self.load_uint(bits)?;
        if negative {
            let wrap = BigInt::from_biguint(Sign::Plus, BigUint::from(1u8) << bits);
            Ok(BigInt::from_biguint(Sign::Plus, magnitude) - wrap)
        } else {
            Ok(BigInt::from_biguint(Sign::Plus, magnitude))
        }
    }

    /// Reads `count` whole bytes; the cursor does not need to be byte-aligned.
    pub fn load_bytes(&mut self, count: usize) -> Result<Vec<u8>, ReadError> {
        self.ensure_bits(count * 8)?;
        let mut bytes = vec![0u8; count];
        for (i, byte) in bytes.iter_mut().enumerate() {
            for j in 0..8 {
                *byte = *byte << 1 | self.peek_bit(i * 8 + j) as u8;
            }
        }
        self.bit_pos += count * 8;
        Ok(bytes)
    }

    pub fn next_ref(&mut self) -> Result<CellRef, ReadError> {
        if self.remaining_refs() == 0 {
            return Err(ReadError::RefsUnderflow);
        }
        let cell = self.peek_ref(0);
        self.ref_pos += 1;
        Ok(cell)
    }
}
