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

use ed25519_dalek::SigningKey;
use ftabi_cell::{CellBuilder, CellHash, CellRef, CellSlice, ParseCell};
use indexmap::IndexMap;

use crate::ser::check_value;
use crate::sign::SIGNATURE_BITS;
use crate::{
    compute_function_id, compute_function_signature, de, read_value, serialize_value, sign, AbiError, Clock,
    ParamRef, SystemClock, Value,
};

pub type HeaderParams = Vec<ParamRef>;
pub type InputParams = Vec<ParamRef>;
pub type OutputParams = Vec<ParamRef>;

/// Header values are looked up by parameter name; the emission order always follows the
/// function's header declaration, not the map.
pub type HeaderValues = IndexMap<String, Value>;
pub type InputValues = Vec<Value>;

/// Keys header values by the names of their parameters.
pub fn make_header(values: impl IntoIterator<Item = Value>) -> HeaderValues {
    values
        .into_iter()
        .map(|value| (value.param.name.clone(), value))
        .collect()
}

/// One-shot invocation of a contract function: constructed by the caller, consumed by the
/// encoder.
#[derive(Clone, Debug, Default)]
pub struct FunctionCall {
    pub header: HeaderValues,
    pub inputs: InputValues,
    /// Internal (contract-to-contract) calls carry no signing header.
    pub internal: bool,
    pub private_key: Option<SigningKey>,
    /// Wrap the encoded body into a fresh cell referencing it.
    pub body_as_ref: bool,
}

impl FunctionCall {
    pub fn new(inputs: impl IntoIterator<Item = Value>) -> Self {
        Self::with(HeaderValues::new(), inputs, false, None)
    }

    pub fn with_header(header: HeaderValues, inputs: impl IntoIterator<Item = Value>) -> Self {
        Self::with(header, inputs, false, None)
    }

    pub fn with(
        header: HeaderValues,
        inputs: impl IntoIterator<Item = Value>,
        internal: bool,
        private_key: Option<SigningKey>,
    ) -> Self {
        FunctionCall {
            header,
            inputs: inputs.into_iter().collect(),
            internal,
            private_key,
            body_as_ref: false,
        }
    }
}

/// Contract function schema: named parameters of the signing header, inputs and outputs, plus
/// the pair of 32-bit selectors distinguishing calls from answers.
#[derive(Clone, Debug)]
pub struct Function {
    name: String,
    header: HeaderParams,
    inputs: InputParams,
    outputs: OutputParams,
    input_id: u32,
    output_id: u32,
}

impl Function {
    /// Creates a function deriving both selectors from the canonical signature.
    pub fn new(
        name: impl Into<String>,
        header: HeaderParams,
        inputs: InputParams,
        outputs: OutputParams,
    ) -> Self {
        let name = name.into();
        let id = compute_function_id(&compute_function_signature(&name, &inputs, &outputs));
        Self::with_id(name, header, inputs, outputs, id)
    }

    /// Creates a function splitting an explicitly given id into the input/output selector pair.
    pub fn with_id(
        name: impl Into<String>,
        header: HeaderParams,
        inputs: InputParams,
        outputs: OutputParams,
        id: u32,
    ) -> Self {
        Self::with_ids(name, header, inputs, outputs, id & 0x7FFF_FFFF, id | 0x8000_0000)
    }

    pub fn with_ids(
        name: impl Into<String>,
        header: HeaderParams,
        inputs: InputParams,
        outputs: OutputParams,
        input_id: u32,
        output_id: u32,
    ) -> Self {
        Function {
            name: name.into(),
            header,
            inputs,
            outputs,
            input_id,
            output_id,
        }
    }

    pub fn name(&self) -> &str { &self.name }

    pub fn header(&self) -> &[ParamRef] { &self.header }

    pub fn inputs(&self) -> &[ParamRef] { &self.inputs }

    pub fn outputs(&self) -> &[ParamRef] { &self.outputs }

    pub fn has_input(&self) -> bool { !self.inputs.is_empty() }

    pub fn has_output(&self) -> bool { !self.outputs.is_empty() }

    pub fn input_id(&self) -> u32 { self.input_id }

    pub fn output_id(&self) -> u32 { self.output_id }

    /// Encodes a call into a message body cell, signing it when the call carries a private key,
    /// defaulting absent header values against the system clock.
    pub fn encode_input(&self, call: &FunctionCall) -> Result<CellRef, AbiError> {
        self.encode_input_with(call, &SystemClock)
    }

    /// Same as [`Self::encode_input`] with an explicit time source.
    pub fn encode_input_with(&self, call: &FunctionCall, clock: &dyn Clock) -> Result<CellRef, AbiError> {
        let reserve_sign = call.private_key.is_some();
        let (root, hash) =
            self.create_unsigned_call(&call.header, &call.inputs, call.internal, reserve_sign, clock)?;
        let root = match &call.private_key {
            Some(key) if !call.internal => {
                let signature = sign::sign_hash(key, hash);
                fill_signature(Some(&signature), root)?
            }
            _ => root,
        };
        if call.body_as_ref {
            let mut cb = CellBuilder::new();
            cb.store_ref(root)?;
            Ok(cb.finalize_ref())
        } else {
            Ok(root)
        }
    }

    /// Assembles the message body with a zeroed signature slot, returning it together with the
    /// representation hash the caller must sign externally (see [`fill_signature`]).
    pub fn create_unsigned_call(
        &self,
        header: &HeaderValues,
        inputs: &[Value],
        internal: bool,
        reserve_sign: bool,
        clock: &dyn Clock,
    ) -> Result<(CellRef, CellHash), AbiError> {
        let mut cells = self.encode_header(header, internal, reserve_sign, clock)?;
        let mut selector = CellBuilder::new();
        selector.store_long(self.input_id as u64, 32)?;
        cells.push(selector);

        if inputs.len() != self.inputs.len() {
            return Err(AbiError::ParamCountMismatch);
        }
        for (param, value) in self.inputs.iter().zip(inputs) {
            check_value(value, param)?;
            cells.extend(serialize_value(value)?);
        }

        let root = crate::pack_into_chain(cells)?;
        let hash = root.repr_hash();
        Ok((root, hash))
    }

    /// Serializes the signing header: the signature slot followed by header parameters in
    /// declaration order. Internal calls have an empty header.
    pub fn encode_header(
        &self,
        header: &HeaderValues,
        internal: bool,
        reserve_sign: bool,
        clock: &dyn Clock,
    ) -> Result<Vec<CellBuilder>, AbiError> {
        if internal {
            return Ok(vec![]);
        }
        let mut slot = CellBuilder::new();
        if reserve_sign {
            slot.push_bit(true)?;
            slot.store_zeroes(SIGNATURE_BITS)?;
        } else {
            slot.push_bit(false)?;
        }
        let mut cells = vec![slot];
        for param in &self.header {
            let value = match header.get(&param.name) {
                Some(value) => {
                    check_value(value, param)?;
                    value.clone()
                }
                None => param
                    .default_value(clock)
                    .ok_or_else(|| AbiError::MissingHeaderValue(param.name.clone()))?,
            };
            cells.extend(serialize_value(&value)?);
        }
        Ok(cells)
    }

    /// Encodes a contract answer: the output selector followed by output values in order.
    pub fn encode_output(&self, outputs: &[Value]) -> Result<CellRef, AbiError> {
        if outputs.len() != self.outputs.len() {
            return Err(AbiError::ParamCountMismatch);
        }
        let mut selector = CellBuilder::new();
        selector.store_long(self.output_id as u64, 32)?;
        let mut cells = vec![selector];
        for (param, value) in self.outputs.iter().zip(outputs) {
            check_value(value, param)?;
            cells.extend(serialize_value(value)?);
        }
        crate::pack_into_chain(cells)
    }

    /// Decodes a contract answer: validates the output selector and reads output values in
    /// order.
    pub fn decode_output(&self, slice: CellSlice) -> Result<Vec<Value>, AbiError> {
        let mut cursor = slice;
        de::find_bits(&mut cursor, 32)?;
        let found = cursor.load_long(32)? as u32;
        if found != self.output_id {
            return Err(AbiError::SelectorMismatch { expected: self.output_id, found });
        }
        let values = self.read_values(&mut cursor, &self.outputs)?;
        if !cursor.is_empty() {
            return Err(AbiError::IncompleteDeserialization);
        }
        Ok(values)
    }

    /// Decodes a call body back into its header and input values, validating the input
    /// selector. The signature slot is skipped; use [`crate::verify_signed_body`] to check it.
    pub fn decode_params(
        &self,
        slice: CellSlice,
        internal: bool,
    ) -> Result<(Vec<Value>, Vec<Value>), AbiError> {
        let mut cursor = slice;
        let mut header = Vec::new();
        if !internal {
            de::find_bits(&mut cursor, 1)?;
            if cursor.load_bit()? {
                de::find_bits(&mut cursor, SIGNATURE_BITS)?;
                cursor.skip_bits(SIGNATURE_BITS)?;
            }
            for param in &self.header {
                header.push(read_value(&mut cursor, param, false)?);
            }
        }
        de::find_bits(&mut cursor, 32)?;
        let found = cursor.load_long(32)? as u32;
        if found != self.input_id {
            return Err(AbiError::SelectorMismatch { expected: self.input_id, found });
        }
        let inputs = self.read_values(&mut cursor, &self.inputs)?;
        if !cursor.is_empty() {
            return Err(AbiError::IncompleteDeserialization);
        }
        Ok((header, inputs))
    }

    fn read_values(&self, cursor: &mut CellSlice, params: &[ParamRef]) -> Result<Vec<Value>, AbiError> {
        let mut values = Vec::with_capacity(params.len());
        for (i, param) in params.iter().enumerate() {
            let last = params[i + 1..].iter().all(de::content_free);
            values.push(read_value(cursor, param, last)?);
        }
        Ok(values)
    }
}

/// Replaces the signature slot at the head of a message body, producing a new cell; the input
/// cell is never mutated.
///
/// The result starts with a `0` bit (no signature) or a `1` bit followed by the 512 signature
/// bits, and continues with the body content following its original slot, references included.
pub fn fill_signature(signature: Option<&[u8; 64]>, body: CellRef) -> Result<CellRef, AbiError> {
    let mut cursor = body.parse();
    if cursor.load_bit()? {
        cursor.skip_bits(SIGNATURE_BITS)?;
    }
    let mut cb = CellBuilder::new();
    match signature {
        Some(signature) => {
            cb.push_bit(true)?;
            cb.append_raw(signature, SIGNATURE_BITS)?;
        }
        None => cb.push_bit(false)?,
    }
    cb.append_slice(&cursor)?;
    Ok(cb.finalize_ref())
}

#[cfg(test)]
mod test {
    #![cfg_attr(coverage_nightly, coverage(off))]
    use super::*;
    use crate::{Param, StdAddr};

    struct FixedClock(u64);
    impl Clock for FixedClock {
        fn now_ms(&self) -> u64 { self.0 }
    }

    fn transfer() -> Function {
        Function::new(
            "transfer",
            vec![Param::pubkey("pubkey"), Param::time("time"), Param::expire("expire")],
            vec![Param::address("dest"), Param::uint("amount", 128)],
            vec![],
        )
    }

    fn transfer_inputs() -> Vec<Value> {
        vec![
            Value::address(&Param::address("dest"), StdAddr::new(0, [0x11; 32])),
            Value::int(&Param::uint("amount", 128), 1_000_000u64),
        ]
    }

    #[test]
    fn selector_pair() {
        let f = transfer();
        assert_eq!(f.input_id() & 0x8000_0000, 0);
        assert_eq!(f.output_id() & 0x8000_0000, 0x8000_0000);
        assert_eq!(f.input_id() | 0x8000_0000, f.output_id());

        let explicit = Function::with_id("transfer", vec![], vec![], vec![], 0xDEAD_BEEF);
        assert_eq!(explicit.input_id(), 0x5EAD_BEEF);
        assert_eq!(explicit.output_id(), 0xDEAD_BEEF);
    }

    #[test]
    fn empty_internal_call() {
        let ping = Function::new("ping", vec![], vec![], vec![]);
        let call = FunctionCall {
            internal: true,
            ..FunctionCall::new([])
        };
        let body = ping.encode_input(&call).unwrap();
        assert_eq!(body.bit_len(), 32);
        assert_eq!(body.reference_count(), 0);
        assert_eq!(body.parse().load_long(32).unwrap(), ping.input_id() as u64);
        // crc32("ping()()v2") with the top bit cleared
        assert_eq!(ping.input_id(), 0x2AF5_A593);
    }

    #[test]
    fn internal_roundtrip() {
        let f = transfer();
        let call = FunctionCall {
            internal: true,
            ..FunctionCall::new(transfer_inputs())
        };
        let body = f.encode_input(&call).unwrap();
        let (header, inputs) = f.decode_params(body.parse(), true).unwrap();
        assert!(header.is_empty());
        assert_eq!(inputs, transfer_inputs());
    }

    #[test]
    fn external_roundtrip_with_defaults() {
        let f = transfer();
        let clock = FixedClock(1_700_000_000_000);
        let call = FunctionCall::new(transfer_inputs());
        let body = f.encode_input_with(&call, &clock).unwrap();

        let mut cursor = body.parse();
        assert!(!cursor.load_bit().unwrap(), "unsigned body must start with a 0 bit");

        let (header, inputs) = f.decode_params(body.parse(), false).unwrap();
        assert_eq!(inputs, transfer_inputs());
        assert_eq!(header.len(), 3);
        assert_eq!(header[0].body, crate::ValueBody::PublicKey(None));
        assert_eq!(header[1].body, crate::ValueBody::Time(1_700_000_000_000));
        assert_eq!(header[2].body, crate::ValueBody::Expire(u32::MAX));
    }

    #[test]
    fn missing_header_value() {
        let f = Function::new(
            "f",
            vec![Param::array("custom", Param::uint("x", 8))],
            vec![],
            vec![],
        );
        let call = FunctionCall::new([]);
        assert!(matches!(
            f.encode_input_with(&call, &FixedClock(0)),
            Err(AbiError::MissingHeaderValue(_))
        ));
    }

    #[test]
    fn header_values_override_defaults() {
        let f = transfer();
        let clock = FixedClock(1);
        let header = make_header([
            Value::time(&Param::time("time"), 42),
            Value::expire(&Param::expire("expire"), 43),
        ]);
        let call = FunctionCall::with_header(header, transfer_inputs());
        let body = f.encode_input_with(&call, &clock).unwrap();
        let (header, _) = f.decode_params(body.parse(), false).unwrap();
        assert_eq!(header[1].body, crate::ValueBody::Time(42));
        assert_eq!(header[2].body, crate::ValueBody::Expire(43));
    }

    #[test]
    fn output_roundtrip() {
        let f = Function::new(
            "getBalance",
            vec![],
            vec![],
            vec![Param::uint("balance", 128), Param::boolean("locked")],
        );
        let outputs = vec![
            Value::int(&Param::uint("balance", 128), 7_000_000u64),
            Value::boolean(&Param::boolean("locked"), true),
        ];
        let body = f.encode_output(&outputs).unwrap();
        assert_eq!(f.decode_output(body.parse()).unwrap(), outputs);
    }

    #[test]
    fn selector_mismatch() {
        let f = transfer();
        let mut cb = CellBuilder::new();
        cb.store_long(0x1234_5678, 32).unwrap();
        let body = cb.finalize_ref();
        assert!(matches!(
            f.decode_output(body.parse()),
            Err(AbiError::SelectorMismatch { .. })
        ));
        let g = Function::new("other", vec![], vec![], vec![]);
        let call = FunctionCall {
            internal: true,
            ..FunctionCall::new([])
        };
        let body = g.encode_input(&call).unwrap();
        assert!(matches!(
            f.decode_params(body.parse(), true),
            Err(AbiError::SelectorMismatch { .. })
        ));
    }

    #[test]
    fn type_checks_on_encode() {
        let f = transfer();
        let call = FunctionCall {
            internal: true,
            ..FunctionCall::new([
                Value::int(&Param::uint("amount", 128), 1u8),
                Value::address(&Param::address("dest"), StdAddr::default()),
            ])
        };
        assert!(matches!(f.encode_input(&call), Err(AbiError::TypeMismatch { .. })));

        let short = FunctionCall {
            internal: true,
            ..FunctionCall::new(transfer_inputs().into_iter().take(1))
        };
        assert!(matches!(f.encode_input(&short), Err(AbiError::ParamCountMismatch)));
    }

    #[test]
    fn body_as_ref_wraps() {
        let ping = Function::new("ping", vec![], vec![], vec![]);
        let mut call = FunctionCall::new([]);
        call.internal = true;
        call.body_as_ref = true;
        let wrapped = ping.encode_input(&call).unwrap();
        assert_eq!(wrapped.bit_len(), 0);
        assert_eq!(wrapped.reference_count(), 1);
        assert_eq!(wrapped.references()[0].bit_len(), 32);
    }

    #[test]
    fn fill_signature_replaces_slot() {
        let f = transfer();
        let clock = FixedClock(5);
        let (reserved, hash) = f
            .create_unsigned_call(&HeaderValues::new(), &transfer_inputs(), false, true, &clock)
            .unwrap();
        let mut cursor = reserved.parse();
        assert!(cursor.load_bit().unwrap());
        assert!(cursor.load_bytes(64).unwrap().iter().all(|byte| *byte == 0));

        let filled = fill_signature(Some(&[0xCD; 64]), reserved.clone()).unwrap();
        let mut cursor = filled.parse();
        assert!(cursor.load_bit().unwrap());
        assert_eq!(cursor.load_bytes(64).unwrap(), vec![0xCD; 64]);

        // restoring the zeroed slot reproduces the reserved body and its hash
        let cleared = fill_signature(Some(&[0; 64]), filled).unwrap();
        assert_eq!(cleared.repr_hash(), hash);

        // dropping the signature leaves the same content after a 0 bit
        let unsigned = fill_signature(None, reserved).unwrap();
        let mut cursor = unsigned.parse();
        assert!(!cursor.load_bit().unwrap());
    }
}
