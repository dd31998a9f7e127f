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

use core::hash::{Hash, Hasher};
use std::sync::Arc;

use amplify::Bytes32;
use sha2::{Digest, Sha256};

use crate::CellBuilder;

/// Shared handle to an immutable cell.
pub type CellRef = Arc<Cell>;

/// 256-bit representation hash of a cell: a Merkle-style digest covering the cell descriptor
/// bytes, the padded payload, and the depths and hashes of all referenced children.
#[derive(Wrapper, Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug, Display, From)]
#[wrapper(Deref, BorrowSlice, Hex, Index, RangeOps)]
#[display(LowerHex)]
pub struct CellHash(
    #[from]
    #[from([u8; 32])]
    Bytes32,
);

impl CellHash {
    pub fn to_byte_array(&self) -> [u8; 32] { self.0.to_byte_array() }
}

/// Immutable node of the cell memory model, holding up to 1023 payload bits and up to 4
/// references to child cells.
///
/// Cells are content-addressed: equality, ordering and hashing all go through the representation
/// hash, which is computed once at finalization time.
#[derive(Clone, Debug)]
pub struct Cell {
    data: Box<[u8]>,
    bit_len: usize,
    refs: Vec<CellRef>,
    hash: CellHash,
    depth: u16,
}

impl PartialEq for Cell {
    fn eq(&self, other: &Self) -> bool { self.hash == other.hash }
}
impl Eq for Cell {}
impl Hash for Cell {
    fn hash<H: Hasher>(&self, state: &mut H) { self.hash.hash(state) }
}

impl Cell {
    /// Constructs a cell with no payload and no references.
    pub fn empty() -> CellRef { CellBuilder::new().finalize_ref() }

    pub(crate) fn with(data: Vec<u8>, bit_len: usize, refs: Vec<CellRef>) -> Self {
        let depth = refs.iter().map(|r| r.depth + 1).max().unwrap_or_default();
        let hash = Self::compute_hash(&data, bit_len, &refs);
        Cell {
            data: data.into_boxed_slice(),
            bit_len,
            refs,
            hash,
            depth,
        }
    }

    pub fn bit_len(&self) -> usize { self.bit_len }

    pub fn reference_count(&self) -> usize { self.refs.len() }

    pub fn references(&self) -> &[CellRef] { &self.refs }

    pub fn repr_hash(&self) -> CellHash { self.hash }

    /// Longest chain of references going out of this cell.
    pub fn depth(&self) -> u16 { self.depth }

    pub(crate) fn raw_data(&self) -> &[u8] { &self.data }

    pub(crate) fn raw_ref(&self, index: usize) -> CellRef { self.refs[index].clone() }

    fn compute_hash(data: &[u8], bit_len: usize, refs: &[CellRef]) -> CellHash {
        let full_bytes = bit_len / 8;
        let total_bytes = (bit_len + 7) / 8;

        let mut engine = Sha256::new();
        engine.update([refs.len() as u8, (full_bytes + total_bytes) as u8]);

        let mut payload = data[..total_bytes].to_vec();
        if bit_len % 8 != 0 {
            // completion tag
            payload[full_bytes] |= 0x80 >> (bit_len % 8);
        }
        engine.update(&payload);

        for r in refs {
            engine.update(r.depth.to_be_bytes());
        }
        for r in refs {
            engine.update(r.hash.to_byte_array());
        }
        let digest: [u8; 32] = engine.finalize().into();
        CellHash::from(digest)
    }
}
