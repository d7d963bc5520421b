// Copyright (C) 2013-2020 Blockstack PBC, a public benefit corporation
// Copyright (C) 2020-2024 Stacks Open Internet Foundation
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

use rand::{thread_rng, Rng, RngCore};
use stacks_common::address::{AddressHashMode, StacksAddress};
use stacks_common::codec::StacksMessageCodec;
use stacks_common::util::secp256k1::{Secp256k1PrivateKey, Secp256k1PublicKey};

use crate::errors::SerializationError;
use crate::representations::{ClarityName, ContractName};
use crate::types::{
    PrincipalData, QualifiedContractIdentifier, StandardPrincipalData, TupleData, Value,
};

impl From<&Secp256k1PrivateKey> for StandardPrincipalData {
    fn from(o: &Secp256k1PrivateKey) -> StandardPrincipalData {
        let stacks_addr = StacksAddress::p2pkh(false, &Secp256k1PublicKey::from_private(o));
        StandardPrincipalData::from(stacks_addr)
    }
}

impl From<&Secp256k1PrivateKey> for PrincipalData {
    fn from(o: &Secp256k1PrivateKey) -> PrincipalData {
        PrincipalData::Standard(StandardPrincipalData::from(o))
    }
}

impl From<&Secp256k1PrivateKey> for Value {
    fn from(o: &Secp256k1PrivateKey) -> Value {
        Value::from(StandardPrincipalData::from(o))
    }
}

fn name(s: &str) -> ClarityName {
    ClarityName::try_from(s).unwrap()
}

fn test_principal() -> StandardPrincipalData {
    StandardPrincipalData::new(
        0x00,
        [
            0x11, 0xde, 0xad, 0xbe, 0xef, 0x11, 0xab, 0xab, 0xff, 0xff, 0x11, 0xde, 0xad, 0xbe,
            0xef, 0x11, 0xab, 0xab, 0xff, 0xff,
        ],
    )
    .unwrap()
}

#[test]
fn test_vectors() {
    let tests = [
        ("1010", Err("Bad type prefix".into())),
        ("0000000000000000000000000000000001", Ok(Value::Int(1))),
        ("00ffffffffffffffffffffffffffffffff", Ok(Value::Int(-1))),
        ("0100000000000000000000000000000001", Ok(Value::UInt(1))),
        ("0200000004deadbeef", Ok(Value::buff_from(vec![0xde, 0xad, 0xbe, 0xef]).unwrap())),
        ("03", Ok(Value::Bool(true))),
        ("04", Ok(Value::Bool(false))),
        ("050011deadbeef11ababffff11deadbeef11ababffff", Ok(Value::from(test_principal()))),
        ("060011deadbeef11ababffff11deadbeef11ababffff0461626364", Ok(Value::from(QualifiedContractIdentifier::new(
            test_principal(),
            ContractName::try_from("abcd").unwrap(),
        )))),
        ("0700ffffffffffffffffffffffffffffffff", Ok(Value::okay(Value::Int(-1)).unwrap())),
        ("0800ffffffffffffffffffffffffffffffff", Ok(Value::error(Value::Int(-1)).unwrap())),
        ("09", Ok(Value::none())),
        ("0a00ffffffffffffffffffffffffffffffff", Ok(Value::some(Value::Int(-1)).unwrap())),
        ("0b0000000400000000000000000000000000000000010000000000000000000000000000000002000000000000000000000000000000000300fffffffffffffffffffffffffffffffc",
         Ok(Value::cons_list(vec![Value::Int(1), Value::Int(2), Value::Int(3), Value::Int(-4)]).unwrap())),
        ("0c000000020362617a0906666f6f62617203",
         Ok(Value::from(TupleData::from_data(vec![(name("baz"), Value::none()), (name("foobar"), Value::Bool(true))]).unwrap()))),
        ("0d0000000b68656c6c6f20776f726c64", Ok(Value::string_ascii_from_bytes(b"hello world".to_vec()).unwrap())),
        ("0e00000004f09f8c8e", Ok(Value::string_utf8_from_bytes("\u{1F30E}".as_bytes().to_vec()).unwrap())),
    ];

    for (test, expected) in tests.iter() {
        if let Ok(x) = expected {
            assert_eq!(test, &x.serialize_to_hex());
        }
        assert_eq!(expected, &Value::try_deserialize_hex_untyped(test));
        assert_eq!(
            expected,
            &Value::try_deserialize_hex_untyped(&format!("0x{test}"))
        );
    }
}

#[test]
fn test_principals() {
    let issuer =
        PrincipalData::parse_standard_principal("SM2J6ZY48GV1EZ5V2V5RB9MP66SW86PYKKQVX8X0G")
            .unwrap();
    let standard_p = Value::from(issuer.clone());

    let contract_identifier =
        QualifiedContractIdentifier::new(issuer, ContractName::try_from("foo").unwrap());
    let contract_p = Value::from(PrincipalData::Contract(contract_identifier));

    for value in [standard_p, contract_p] {
        let hex = value.serialize_to_hex();
        assert_eq!(Value::try_deserialize_hex_untyped(&hex).unwrap(), value);
    }
    // version 20 is a mainnet multisig
    assert!(Value::from(
        PrincipalData::parse_standard_principal("SM2J6ZY48GV1EZ5V2V5RB9MP66SW86PYKKQVX8X0G")
            .unwrap()
    )
    .serialize_to_hex()
    .starts_with("0514"));
}

#[test]
fn test_principal_from_key() {
    let key = Secp256k1PrivateKey::new();
    let principal = PrincipalData::from(&key);
    assert_eq!(principal.version(), 26);
    assert!(principal.to_string().starts_with("ST"));

    let address = StacksAddress::from_public_keys(
        26,
        &AddressHashMode::SerializeP2PKH,
        1,
        &[Secp256k1PublicKey::from_private(&key)],
    )
    .unwrap();
    assert_eq!(Value::from(&key), Value::from(PrincipalData::from(address)));
}

fn random_name<R: Rng>(rng: &mut R) -> ClarityName {
    let len = rng.gen_range(1..12);
    let s: String = (0..len)
        .map(|i| {
            if i == 0 {
                rng.gen_range(b'a'..=b'z') as char
            } else {
                *[b'a', b'z', b'0', b'-', b'?', b'!']
                    .get(rng.gen_range(0..6))
                    .unwrap() as char
            }
        })
        .collect();
    ClarityName::try_from(s).unwrap()
}

fn random_value<R: Rng>(rng: &mut R, depth: u8) -> Value {
    let max_kind = if depth >= 4 { 7 } else { 12 };
    match rng.gen_range(0..max_kind) {
        0 => Value::Int(rng.gen()),
        1 => Value::UInt(rng.gen()),
        2 => Value::Bool(rng.gen()),
        3 => {
            let mut data = vec![0u8; rng.gen_range(0..64)];
            rng.fill_bytes(&mut data);
            Value::buff_from(data).unwrap()
        }
        4 => {
            let data: Vec<u8> = (0..rng.gen_range(0..32))
                .map(|_| rng.gen_range(0x20u8..0x7f))
                .collect();
            Value::string_ascii_from_bytes(data).unwrap()
        }
        5 => {
            let data: String = (0..rng.gen_range(0..16))
                .map(|_| {
                    *['a', '\u{e9}', '\u{4e2d}', '\u{1F30E}']
                        .get(rng.gen_range(0..4))
                        .unwrap()
                })
                .collect();
            Value::string_utf8_from_bytes(data.into_bytes()).unwrap()
        }
        6 => {
            let mut bytes = [0u8; 20];
            rng.fill_bytes(&mut bytes);
            let issuer = StandardPrincipalData::new(rng.gen_range(0..32), bytes).unwrap();
            if rng.gen() {
                Value::from(issuer)
            } else {
                Value::from(QualifiedContractIdentifier::new(
                    issuer,
                    ContractName::try_from("contract-1").unwrap(),
                ))
            }
        }
        7 => Value::none(),
        8 => Value::some(random_value(rng, depth + 1)).unwrap(),
        9 => {
            let inner = random_value(rng, depth + 1);
            if rng.gen() {
                Value::okay(inner).unwrap()
            } else {
                Value::error(inner).unwrap()
            }
        }
        10 => {
            let items = (0..rng.gen_range(0..5))
                .map(|_| random_value(rng, depth + 1))
                .collect();
            Value::cons_list(items).unwrap()
        }
        _ => {
            let mut fields = std::collections::BTreeMap::new();
            for _ in 0..rng.gen_range(1..5) {
                fields.insert(random_name(rng), random_value(rng, depth + 1));
            }
            Value::from(TupleData::from_data(fields.into_iter().collect()).unwrap())
        }
    }
}

#[test]
fn test_random_round_trips() {
    let mut rng = thread_rng();
    for _ in 0..500 {
        let value = random_value(&mut rng, 0);
        let bytes = value.serialize_to_vec();
        assert_eq!(bytes.len() as u32, value.serialized_size());
        assert_eq!(Value::deserialize_from_slice_exact(&bytes).unwrap(), value);

        // every strict prefix is an incomplete value
        let cut = rng.gen_range(0..bytes.len());
        assert_eq!(
            Value::deserialize_from_slice(&bytes[..cut]),
            Err(SerializationError::DeserializationError(
                "Unexpected end of input".into()
            ))
        );
    }
}
