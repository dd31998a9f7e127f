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

use crate::{ParamRef, ABI_VERSION};

/// Canonical signature of a function: its name, the comma-joined type signatures of inputs and
/// outputs, and the ABI version. Two functions with equal canonical signatures always derive
/// equal selectors.
pub fn compute_function_signature(name: &str, inputs: &[ParamRef], outputs: &[ParamRef]) -> String {
    let join = |params: &[ParamRef]| {
        params
            .iter()
            .map(|param| param.type_signature())
            .collect::<Vec<_>>()
            .join(",")
    };
    format!("{name}({})({})v{ABI_VERSION}", join(inputs), join(outputs))
}

/// Function id: IEEE 802.3 CRC-32 of the canonical signature.
pub fn compute_function_id(signature: &str) -> u32 { crc32fast::hash(signature.as_bytes()) }

#[cfg(test)]
mod test {
    #![cfg_attr(coverage_nightly, coverage(off))]
    use super::*;
    use crate::Param;

    #[test]
    fn canonical_signatures() {
        assert_eq!(compute_function_signature("ping", &[], &[]), "ping()()v2");
        assert_eq!(
            compute_function_signature(
                "transfer",
                &[Param::address("dest"), Param::uint("amount", 128)],
                &[]
            ),
            "transfer(address,uint128)()v2"
        );
        assert_eq!(
            compute_function_signature("getBalance", &[], &[Param::uint("balance", 128)]),
            "getBalance()(uint128)v2"
        );
    }

    #[test]
    fn crc32_vectors() {
        assert_eq!(compute_function_id("ping()()v2"), 0xAAF5_A593);
        assert_eq!(compute_function_id("transfer(address,uint128)()v2"), 0xB6AE_6F95);
        assert_eq!(compute_function_id("subscribe(uint64)(bool)v2"), 0x3927_4A73);
    }

    #[test]
    fn ids_ignore_parameter_names() {
        let a = compute_function_signature("f", &[Param::uint("amount", 32)], &[]);
        let b = compute_function_signature("f", &[Param::uint("value", 32)], &[]);
        assert_eq!(a, b);
        assert_eq!(compute_function_id(&a), compute_function_id(&b));
    }
}
