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

//! Running read-only `get`-methods against an account snapshot.
//!
//! The virtual machine itself is a collaborator hidden behind the [`TvmExecutor`] seam: the
//! runner materializes the code and data cells, converts typed input values into VM stack items,
//! dispatches on the function input selector and converts the resulting stack back into typed
//! output values.

use amplify::Bytes32;
use ftabi_cell::{CellBuilder, CellRef, CellSlice, ParseCell};
use num_bigint::{BigInt, Sign};
use num_traits::ToPrimitive;

use crate::ser::{check_value, store_address};
use crate::{
    de, pack_into_chain, serialize_value, AbiError, Function, FunctionCall, ParamKind, ParamRef, StdAddr,
    Value, ValueBody,
};

/// Last known state of an account.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Display)]
pub enum AccountState {
    #[display("unknown")]
    Empty,
    #[display("account_uninit")]
    Uninit,
    #[display("account_frozen")]
    Frozen,
    #[display("account_active")]
    Active,
    #[display("unknown")]
    Unknown,
}

/// Account-state details needed to materialize a VM instance.
#[derive(Clone, Debug, Default)]
pub struct StateDetails {
    pub code: Option<CellRef>,
    pub data: Option<CellRef>,
}

/// Snapshot of an account at some synchronization point.
#[derive(Clone, Debug)]
pub struct AccountStateInfo {
    pub workchain: i32,
    pub address: Bytes32,
    pub sync_utime: u32,
    pub balance: i64,
    pub state: AccountState,
    pub last_transaction_lt: u64,
    pub last_transaction_hash: Bytes32,
    pub details: StateDetails,
}

/// Item of a TVM value stack.
#[derive(Clone, Debug)]
pub enum StackItem {
    Null,
    Int(BigInt),
    Cell(CellRef),
    Slice(CellSlice),
    Tuple(Vec<StackItem>),
}

/// Outcome of a VM run.
#[derive(Clone, Debug)]
pub struct VmRun {
    pub exit_code: i32,
    /// Result stack, bottom first.
    pub stack: Vec<StackItem>,
}

/// The VM runtime collaborator: instantiated with the contract code and data cells and the `c7`
/// control register tuple, runs the method identified by `selector` over the given stack.
pub trait TvmExecutor {
    fn run(
        &mut self,
        code: CellRef,
        data: CellRef,
        c7: Vec<StackItem>,
        selector: u32,
        stack: Vec<StackItem>,
    ) -> Result<VmRun, CallError>;
}

/// Errors of get-method execution.
#[derive(Debug, Display, Error, From)]
#[display(doc_comments)]
pub enum CallError {
    /// get-methods can only run against an active account, while the account is '{0}'.
    AccountInactive(AccountState),

    /// the virtual machine terminated with non-zero exit code {exit_code}.
    VmError { exit_code: i32 },

    /// a value returned by the virtual machine does not convert into the declared output type
    /// '{0}'.
    OutputTypeMismatch(String),

    /// {0}
    #[from]
    Abi(AbiError),
}

/// Converts a typed value into a VM stack item: integer-like values push as VM integers, cells
/// and byte strings as cells, addresses and collections as slices over their serialized form,
/// and tuples unfold into nested stacks.
pub fn stack_item(value: &Value) -> Result<StackItem, CallError> {
    Ok(match &value.body {
        ValueBody::Int(int) => StackItem::Int(int.clone()),
        ValueBody::Bool(bit) => StackItem::Int(BigInt::from(*bit as u8)),
        ValueBody::Gram(amount) => StackItem::Int(BigInt::from(*amount)),
        ValueBody::Time(ms) => StackItem::Int(BigInt::from(*ms)),
        ValueBody::Expire(at) => StackItem::Int(BigInt::from(*at)),
        ValueBody::PublicKey(Some(key)) => {
            StackItem::Int(BigInt::from_bytes_be(Sign::Plus, &key.to_byte_array()))
        }
        ValueBody::PublicKey(None) => StackItem::Null,
        ValueBody::Cell(cell) => StackItem::Cell(cell.clone()),
        ValueBody::Bytes(_) => {
            let wrapper = pack_into_chain(serialize_value(value)?)?;
            StackItem::Cell(wrapper.parse().next_ref().map_err(AbiError::from)?)
        }
        ValueBody::Tuple(items) => {
            StackItem::Tuple(items.iter().map(stack_item).collect::<Result<_, _>>()?)
        }
        ValueBody::Address(_) | ValueBody::Array(_) | ValueBody::Map(_) => {
            StackItem::Slice(pack_into_chain(serialize_value(value)?)?.parse())
        }
    })
}

/// Converts a VM stack item back into a typed value, mirroring [`stack_item`].
pub fn stack_value(item: &StackItem, param: &ParamRef) -> Result<Value, CallError> {
    let mismatch = || CallError::OutputTypeMismatch(param.type_signature());
    let body = match (&param.kind, item) {
        (ParamKind::Uint(bits), StackItem::Int(int)) => {
            if int.sign() == Sign::Minus || int.bits() > *bits as u64 {
                return Err(mismatch());
            }
            ValueBody::Int(int.clone())
        }
        (ParamKind::Int(bits), StackItem::Int(int)) => {
            if !crate::ser::fits_signed(int, *bits) {
                return Err(mismatch());
            }
            ValueBody::Int(int.clone())
        }
        (ParamKind::Bool, StackItem::Int(int)) => ValueBody::Bool(int.sign() != Sign::NoSign),
        (ParamKind::Gram, StackItem::Int(int)) => {
            ValueBody::Gram(int.to_u128().ok_or_else(mismatch)?)
        }
        (ParamKind::Time, StackItem::Int(int)) => ValueBody::Time(int.to_u64().ok_or_else(mismatch)?),
        (ParamKind::Expire, StackItem::Int(int)) => {
            ValueBody::Expire(int.to_u32().ok_or_else(mismatch)?)
        }
        (ParamKind::PublicKey, StackItem::Null) => ValueBody::PublicKey(None),
        (ParamKind::PublicKey, StackItem::Int(int)) => {
            if int.sign() == Sign::Minus || int.bits() > 256 {
                return Err(mismatch());
            }
            let bytes = int.magnitude().to_bytes_be();
            let mut key = [0u8; 32];
            key[32 - bytes.len()..].copy_from_slice(&bytes);
            ValueBody::PublicKey(Some(Bytes32::from(key)))
        }
        (ParamKind::Cell, StackItem::Cell(cell)) => ValueBody::Cell(cell.clone()),
        (ParamKind::Address, StackItem::Slice(slice)) => {
            ValueBody::Address(de::read_address(&mut slice.clone(), param).map_err(|_| mismatch())?)
        }
        (ParamKind::Bytes | ParamKind::FixedBytes(_), StackItem::Cell(cell)) => {
            let bytes = de::collect_chunks(cell.clone()).map_err(|_| mismatch())?;
            if let ParamKind::FixedBytes(len) = &param.kind {
                if bytes.len() != *len {
                    return Err(mismatch());
                }
            }
            ValueBody::Bytes(bytes)
        }
        (ParamKind::Tuple(items), StackItem::Tuple(stack)) => {
            if items.len() != stack.len() {
                return Err(mismatch());
            }
            ValueBody::Tuple(
                items
                    .iter()
                    .zip(stack)
                    .map(|(item, element)| stack_value(element, item))
                    .collect::<Result<_, _>>()?,
            )
        }
        (ParamKind::Array(_) | ParamKind::FixedArray(..) | ParamKind::Map(..), StackItem::Slice(slice)) => {
            return de::read_value(&mut slice.clone(), param, true).map_err(|_| mismatch());
        }
        _ => return Err(mismatch()),
    };
    Ok(Value { param: param.clone(), body })
}

/// Assembles the `c7` control register tuple from an account snapshot, following the smart
/// contract info layout: magic, actions, messages sent, unixtime, block and transaction logical
/// time, randseed, balance pair and the account address.
pub fn build_c7(account: &AccountStateInfo) -> Result<Vec<StackItem>, AbiError> {
    let mut addr = CellBuilder::new();
    store_address(
        &mut addr,
        &StdAddr { workchain: account.workchain, address: account.address },
        "myself",
    )?;
    Ok(vec![StackItem::Tuple(vec![
        StackItem::Int(BigInt::from(0x076e_f1eau32)),
        StackItem::Int(BigInt::default()),
        StackItem::Int(BigInt::default()),
        StackItem::Int(BigInt::from(account.sync_utime)),
        StackItem::Int(BigInt::from(account.last_transaction_lt)),
        StackItem::Int(BigInt::from(account.last_transaction_lt)),
        StackItem::Int(BigInt::default()),
        StackItem::Tuple(vec![StackItem::Int(BigInt::from(account.balance)), StackItem::Null]),
        StackItem::Slice(addr.finalize_ref().parse()),
    ])])
}

/// Runs a `get`-method against an account snapshot and converts the top of the resulting stack
/// into typed output values.
pub fn run_get_method<V: TvmExecutor>(
    vm: &mut V,
    account: &AccountStateInfo,
    function: &Function,
    call: &FunctionCall,
) -> Result<Vec<Value>, CallError> {
    if account.state != AccountState::Active {
        return Err(CallError::AccountInactive(account.state));
    }
    let (code, data) = match (&account.details.code, &account.details.data) {
        (Some(code), Some(data)) => (code.clone(), data.clone()),
        _ => return Err(CallError::AccountInactive(account.state)),
    };

    if call.inputs.len() != function.inputs().len() {
        return Err(CallError::Abi(AbiError::ParamCountMismatch));
    }
    let mut stack = Vec::with_capacity(call.inputs.len());
    for (param, value) in function.inputs().iter().zip(&call.inputs) {
        check_value(value, param).map_err(CallError::Abi)?;
        stack.push(stack_item(value)?);
    }

    let run = vm.run(code, data, build_c7(account)?, function.input_id(), stack)?;
    if run.exit_code != 0 {
        return Err(CallError::VmError { exit_code: run.exit_code });
    }

    let outputs = function.outputs();
    if run.stack.len() < outputs.len() {
        return Err(CallError::OutputTypeMismatch(outputs[run.stack.len()].type_signature()));
    }
    let top = &run.stack[run.stack.len() - outputs.len()..];
    outputs
        .iter()
        .zip(top)
        .map(|(param, item)| stack_value(item, param))
        .collect()
}
