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

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use ftabi_cell::{CellBuilder, CellHash, CellRef, ParseCell};

use crate::AbiError;

/// Width of the reserved signature slot in external message bodies.
pub const SIGNATURE_BITS: usize = 512;

/// Signs a cell representation hash.
pub fn sign_hash(key: &SigningKey, hash: CellHash) -> [u8; 64] {
    key.sign(&hash.to_byte_array()).to_bytes()
}

/// Verifies a detached signature over a cell representation hash.
pub fn verify_hash(key: &VerifyingKey, hash: CellHash, signature: &[u8; 64]) -> Result<(), AbiError> {
    key.verify(&hash.to_byte_array(), &Signature::from_bytes(signature))
        .map_err(AbiError::from)
}

/// Checks the signature carried by an external message body: extracts it, restores the
/// signature slot to its reserved (zeroed) form and verifies against the representation hash of
/// the restored body.
pub fn verify_signed_body(key: &VerifyingKey, body: &CellRef) -> Result<(), AbiError> {
    let mut cursor = body.parse();
    if !cursor.load_bit()? {
        return Err(AbiError::Unsigned);
    }
    let bytes = cursor.load_bytes(SIGNATURE_BITS / 8)?;
    let mut signature = [0u8; 64];
    signature.copy_from_slice(&bytes);

    let mut cleared = CellBuilder::new();
    cleared.push_bit(true)?;
    cleared.store_zeroes(SIGNATURE_BITS)?;
    cleared.append_slice(&cursor)?;
    verify_hash(key, cleared.finalize().repr_hash(), &signature)
}
