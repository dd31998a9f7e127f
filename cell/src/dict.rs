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

//! Hashmap-augmented-binary-tree dictionary over fixed-width bit keys.
//!
//! Each tree edge carries a label in one of three forms, with the writer picking the cheapest:
//!
//! - `hml_short$0`: unary-coded length followed by the label bits;
//! - `hml_long$10`: binary-coded length followed by the label bits;
//! - `hml_same$11`: a single bit and a binary-coded repetition count.
//!
//! Leaves store their payload in the leaf cell itself (inline bits and references); forks store
//! two references to the `0`- and `1`-side subtrees. An absent dictionary is represented by the
//! caller as a single `0` maybe-bit with no root reference.

use crate::{BuildError, CellBuilder, CellRef, CellSlice, ReadError};

/// Errors assembling or walking a dictionary cell tree.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Display, Error, From)]
#[display(doc_comments)]
pub enum DictError {
    /// dictionary key differs in width from the declared key length.
    KeyWidthMismatch,

    /// duplicated dictionary key.
    DuplicateKey,

    /// malformed edge label in a dictionary cell tree.
    MalformedLabel,

    /// dictionary tree construction exceeds cell capacity; {0}
    #[from]
    Build(BuildError),

    /// dictionary tree walk failed reading a cell; {0}
    #[from]
    Read(ReadError),
}

/// Builds a dictionary over `key_len`-bit keys, returning its root cell, or `None` when no
/// entries are given. Leaf payloads are taken from the entry builders verbatim.
pub fn build_dict(
    key_len: usize,
    entries: Vec<(Vec<bool>, CellBuilder)>,
) -> Result<Option<CellRef>, DictError> {
    let mut entries = entries;
    for (key, _) in &entries {
        if key.len() != key_len {
            return Err(DictError::KeyWidthMismatch);
        }
    }
    entries.sort_by(|(a, _), (b, _)| a.cmp(b));
    if entries.windows(2).any(|w| w[0].0 == w[1].0) {
        return Err(DictError::DuplicateKey);
    }
    if entries.is_empty() {
        return Ok(None);
    }
    build_node(&entries, 0, key_len).map(Some)
}

/// Walks a dictionary tree, returning every `(key, leaf)` pair in ascending key order; leaf
/// slices are positioned right after the edge label, at the start of the stored payload.
pub fn parse_dict(root: CellRef, key_len: usize) -> Result<Vec<(Vec<bool>, CellSlice)>, DictError> {
    let mut leaves = Vec::new();
    walk(CellSlice::new(root), Vec::new(), key_len, &mut leaves)?;
    Ok(leaves)
}

fn build_node(
    entries: &[(Vec<bool>, CellBuilder)],
    offset: usize,
    key_len: usize,
) -> Result<CellRef, DictError> {
    let n = key_len - offset;
    let first = &entries[0].0;
    let mut l = 0;
    while l < n && entries.iter().all(|(key, _)| key[offset + l] == first[offset + l]) {
        l += 1;
    }

    let mut cb = CellBuilder::new();
    store_label(&mut cb, &first[offset..offset + l], n)?;
    if l == n {
        cb.append_builder(&entries[0].1)?;
    } else {
        let split = entries.partition_point(|(key, _)| !key[offset + l]);
        cb.store_ref(build_node(&entries[..split], offset + l + 1, key_len)?)?;
        cb.store_ref(build_node(&entries[split..], offset + l + 1, key_len)?)?;
    }
    Ok(cb.finalize_ref())
}

fn walk(
    mut slice: CellSlice,
    prefix: Vec<bool>,
    key_len: usize,
    leaves: &mut Vec<(Vec<bool>, CellSlice)>,
) -> Result<(), DictError> {
    let mut key = prefix;
    key.extend(load_label(&mut slice, key_len - key.len())?);
    if key.len() == key_len {
        leaves.push((key, slice));
        return Ok(());
    }
    let left = slice.next_ref()?;
    let right = slice.next_ref()?;
    let mut left_key = key.clone();
    left_key.push(false);
    walk(CellSlice::new(left), left_key, key_len, leaves)?;
    key.push(true);
    walk(CellSlice::new(right), key, key_len, leaves)
}

fn store_label(cb: &mut CellBuilder, label: &[bool], n: usize) -> Result<(), BuildError> {
    let l = label.len();
    let bl = bits_for(n);
    let short_cost = 2 * l + 2;
    let long_cost = 2 + bl + l;
    let same_cost = 3 + bl;
    let all_same = l > 0 && label.iter().all(|&bit| bit == label[0]);

    if all_same && same_cost < short_cost && same_cost < long_cost {
        cb.push_bit(true)?;
        cb.push_bit(true)?;
        cb.push_bit(label[0])?;
        cb.store_long(l as u64, bl)?;
    } else if short_cost <= long_cost {
        cb.push_bit(false)?;
        for _ in 0..l {
            cb.push_bit(true)?;
        }
        cb.push_bit(false)?;
        for &bit in label {
            cb.push_bit(bit)?;
        }
    } else {
        cb.push_bit(true)?;
        cb.push_bit(false)?;
        cb.store_long(l as u64, bl)?;
        for &bit in label {
            cb.push_bit(bit)?;
        }
    }
    Ok(())
}

fn load_label(slice: &mut CellSlice, n: usize) -> Result<Vec<bool>, DictError> {
    let bl = bits_for(n);
    if !slice.load_bit()? {
        // hml_short
        let mut l = 0;
        while slice.load_bit()? {
            l += 1;
            if l > n {
                return Err(DictError::MalformedLabel);
            }
        }
        load_bits(slice, l)
    } else if !slice.load_bit()? {
        // hml_long
        let l = slice.load_long(bl)? as usize;
        if l > n {
            return Err(DictError::MalformedLabel);
        }
        load_bits(slice, l)
    } else {
        // hml_same
        let bit = slice.load_bit()?;
        let l = slice.load_long(bl)? as usize;
        if l > n {
            return Err(DictError::MalformedLabel);
        }
        Ok(vec![bit; l])
    }
}

fn load_bits(slice: &mut CellSlice, count: usize) -> Result<Vec<bool>, DictError> {
    let mut bits = Vec::with_capacity(count);
    for _ in 0..count {
        bits.push(slice.load_bit()?);
    }
    Ok(bits)
}

fn bits_for(n: usize) -> usize { (usize::BITS - n.leading_zeros()) as usize }

#[cfg(test)]
mod test {
    #![cfg_attr(coverage_nightly, coverage(off))]
    use super::*;

    fn key(value: u64, width: usize) -> Vec<bool> {
        (0..width).rev().map(|i| value >> i & 1 == 1).collect()
    }

    fn leaf(value: u64) -> CellBuilder {
        let mut cb = CellBuilder::new();
        cb.store_long(value, 32).unwrap();
        cb
    }

    fn payload(key: u64) -> u64 { (key ^ 0xA5A5_A5A5) & 0xFFFF_FFFF }

    fn roundtrip(key_len: usize, keys: &[u64]) {
        let entries = keys
            .iter()
            .map(|&k| (key(k, key_len), leaf(payload(k))))
            .collect::<Vec<_>>();
        let root = build_dict(key_len, entries).unwrap().expect("non-empty");
        let leaves = parse_dict(root, key_len).unwrap();
        assert_eq!(leaves.len(), keys.len());

        let mut sorted = keys.to_vec();
        sorted.sort_unstable();
        for ((bits, mut slice), expected) in leaves.into_iter().zip(sorted) {
            assert_eq!(bits, key(expected, key_len));
            assert_eq!(slice.load_long(32).unwrap(), payload(expected));
        }
    }

    #[test]
    fn empty_dict() {
        assert_eq!(build_dict(32, vec![]).unwrap(), None);
    }

    #[test]
    fn single_entry() { roundtrip(32, &[42]) }

    #[test]
    fn sibling_keys() { roundtrip(32, &[0, 1]) }

    #[test]
    fn sparse_keys() { roundtrip(32, &[0, 1, 7, 8, 255, 1024, u32::MAX as u64]) }

    #[test]
    fn narrow_keys() {
        roundtrip(1, &[0, 1]);
        roundtrip(8, &[0, 127, 128, 255]);
    }

    #[test]
    fn wide_keys() {
        // all-zero and all-one 64-bit keys force hml_same labels
        roundtrip(64, &[0, u64::MAX, 1]);
    }

    #[test]
    fn dense_range() { roundtrip(32, &(0..100).collect::<Vec<_>>()) }

    #[test]
    fn duplicate_keys_rejected() {
        let entries = vec![(key(7, 32), leaf(1)), (key(7, 32), leaf(2))];
        assert_eq!(build_dict(32, entries), Err(DictError::DuplicateKey));
    }

    #[test]
    fn key_width_checked() {
        let entries = vec![(key(7, 16), leaf(1))];
        assert_eq!(build_dict(32, entries), Err(DictError::KeyWidthMismatch));
    }
}
