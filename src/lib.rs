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

//! Function ABI codec for TVM-family distributed contracts.
//!
//! The codec translates between a typed schema (named, structured function parameters) and the
//! compact bit-packed cell trees carried by TVM message bodies:
//!
//! 1. _Describe_ a contract entry point with [`Param`] schema nodes and a [`Function`];
//! 2. _Encode_ a [`FunctionCall`] into a message body cell, optionally signed with Ed25519;
//! 3. _Decode_ message bodies and contract answers back into typed [`Value`]s;
//! 4. _Execute_ read-only `get`-methods against an account snapshot via the [`TvmExecutor`]
//!    seam.

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

pub use ftabi_cell::*;

mod param;
mod value;
mod ser;
mod de;
mod func;
mod id;
mod sign;
mod exec;

pub use de::read_value;
pub use exec::{
    build_c7, run_get_method, stack_item, stack_value, AccountState, AccountStateInfo, CallError, StackItem,
    StateDetails, TvmExecutor, VmRun,
};
pub use func::{
    fill_signature, make_header, Function, FunctionCall, HeaderParams, HeaderValues, InputParams, InputValues,
    OutputParams,
};
pub use id::{compute_function_id, compute_function_signature};
pub use param::{Clock, Param, ParamKind, ParamRef, SystemClock};
pub use ser::{pack_into_chain, serialize_value};
pub use sign::{sign_hash, verify_hash, verify_signed_body, SIGNATURE_BITS};
pub use value::{check_params, StdAddr, Value, ValueBody, STD_ADDR_BITS};

/// Version byte of the ABI wire layout produced and consumed by this crate.
pub const ABI_VERSION: u8 = 2;

/// Errors of the ABI codec.
///
/// Errors are always surfaced to the caller; malformed input never panics and is never retried.
#[derive(Debug, Display, Error, From)]
#[display(doc_comments)]
pub enum AbiError {
    /// value for parameter '{name}' has type '{found}', while type '{expected}' is expected.
    TypeMismatch {
        name: String,
        expected: String,
        found: String,
    },

    /// the number of supplied values does not match the number of declared parameters.
    ParamCountMismatch,

    /// value for parameter '{0}' is out of range for its declared type.
    OutOfRange(String),

    /// type '{0}' cannot be used as a dictionary key.
    InvalidMapKey(String),

    /// a parameter encoding overflows the capacity of a single cell; {0}
    #[from]
    Serialization(BuildError),

    /// unexpected end of the message body; {0}
    #[from]
    Underflow(ReadError),

    /// malformed dictionary in the message body; {0}
    #[from]
    Dictionary(dict::DictError),

    /// malformed encoding tag for a parameter of type '{0}'.
    InvalidTag(String),

    /// a byte-string chunk in the message body is not byte-aligned.
    MisalignedChunk,

    /// array elements in the message body do not form the expected contiguous index range.
    BrokenArray,

    /// function selector {found:#010x} does not match the expected {expected:#010x}.
    SelectorMismatch { expected: u32, found: u32 },

    /// the message body contains unconsumed data after the last parameter.
    IncompleteDeserialization,

    /// no value provided for the header parameter '{0}', which has no default.
    MissingHeaderValue(String),

    /// the message body carries no signature.
    Unsigned,

    /// invalid Ed25519 signature or key; {0}
    #[from]
    Signature(ed25519_dalek::SignatureError),
}
