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

//! Cell memory model used by TVM-family virtual machines: immutable content-addressed [`Cell`]
//! nodes holding up to 1023 payload bits and up to 4 references, the [`CellBuilder`] write cursor,
//! the [`CellSlice`] read cursor and the hashmap-augmented-binary-tree dictionary used for
//! cell-level maps.

#![deny(
    unsafe_code,
    dead_code,
    unused_variables,
    unused_mut,
    unused_imports,
    non_upper_case_globals,
    non_camel_case_types,
    non_snake_case
)]
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

#[macro_use]
extern crate amplify;

mod cell;
mod builder;
mod slice;
pub mod dict;

pub use builder::{BuildError, CellBuilder};
pub use cell::{Cell, CellHash, CellRef};
pub use slice::{CellSlice, ParseCell, ReadError};

/// Maximum number of payload bits a single cell can hold.
pub const MAX_DATA_BITS: usize = 1023;

/// Maximum number of outgoing references a single cell can hold.
pub const MAX_REFS: usize = 4;
