// Copyright (C) 2013-2020 Blockstack PBC, a public benefit corporation
// Copyright (C) 2020 Stacks Open Internet Foundation
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

use std::io::Cursor;

use rstest::rstest;

use super::*;
use crate::util::hash::{hex_bytes, to_hex};

#[test]
fn codec_for_bool() {
    let t = true;
    let f = false;
    assert_eq!(&t.serialize_to_vec(), &vec![1u8]);
    assert_eq!(&f.serialize_to_vec(), &vec![0u8]);
    assert_eq!(
        bool::consensus_deserialize(&mut Cursor::new(&t.serialize_to_vec())).unwrap(),
        t
    );
    assert_eq!(
        bool::consensus_deserialize(&mut Cursor::new(&f.serialize_to_vec())).unwrap(),
        f
    );
    assert!(bool::consensus_deserialize(&mut Cursor::new(&vec![2u8])).is_err());
}

#[test]
fn codec_for_option() {
    let t = Some(true);
    let n: Option<bool> = None;
    assert_eq!(&t.serialize_to_vec(), &vec![1u8, 1u8]);
    assert_eq!(&n.serialize_to_vec(), &vec![0u8]);
    assert_eq!(
        Option::<bool>::consensus_deserialize(&mut Cursor::new(&t.serialize_to_vec())).unwrap(),
        t
    );
    assert_eq!(
        Option::<bool>::consensus_deserialize(&mut Cursor::new(&n.serialize_to_vec())).unwrap(),
        n
    );
}

#[test]
fn codec_for_u128() {
    let n: u128 = 0x1234567890abcdef1234567890abcdef;
    assert_eq!(
        &n.serialize_to_vec(),
        &vec![
            0x12, 0x34, 0x56, 0x78, 0x90, 0xab, 0xcd, 0xef, 0x12, 0x34, 0x56, 0x78, 0x90, 0xab,
            0xcd, 0xef
        ]
    );
    assert_eq!(
        u128::consensus_deserialize(&mut Cursor::new(&n.serialize_to_vec())).unwrap(),
        n
    );
}

#[test]
fn codec_for_vec() {
    let v: Vec<u16> = vec![1, 2, 0xffff];
    let bytes = v.serialize_to_vec();
    assert_eq!(to_hex(&bytes), "0000000300010002ffff");
    assert_eq!(read_next::<Vec<u16>, _>(&mut Cursor::new(&bytes)).unwrap(), v);
    assert!(read_next_at_most::<_, u16>(&mut Cursor::new(&bytes), 2).is_err());
    assert!(read_next_exact::<_, u16>(&mut Cursor::new(&bytes), 2).is_err());
    assert_eq!(
        read_next_exact::<_, u16>(&mut Cursor::new(&bytes), 3).unwrap(),
        v
    );
}

#[rstest]
#[case(0, "00")]
#[case(0xfc, "fc")]
#[case(0xfd, "fdfd00")]
#[case(0xffff, "fdffff")]
#[case(0x10000, "fe00000100")]
#[case(0xffffffff, "feffffffff")]
#[case(0x100000000, "ff0000000001000000")]
#[case(u64::MAX, "ffffffffffffffffff")]
fn varuint_vectors(#[case] value: u64, #[case] hex: &str) {
    let v = VarUint(value);
    assert_eq!(to_hex(&v.serialize_to_vec()), hex);
    assert_eq!(v.encoding_length(), hex.len() / 2);
    let (decoded, consumed) = VarUint::decode(&hex_bytes(hex).unwrap()).unwrap();
    assert_eq!(decoded, v);
    assert_eq!(consumed, hex.len() / 2);
}

#[rstest]
#[case("fd0100")]
#[case("fdfc00")]
#[case("feffff0000")]
#[case("ff00000000ff000000")]
fn varuint_rejects_non_minimal(#[case] hex: &str) {
    match VarUint::decode(&hex_bytes(hex).unwrap()) {
        Err(Error::DeserializeError(msg)) => assert!(msg.contains("Non-minimal")),
        x => panic!("expected non-minimal error, got {:?}", x),
    }
}

#[test]
fn varuint_rejects_truncation() {
    for hex in ["", "fd", "fd01", "fe010203", "ff01020304050607"].iter() {
        match VarUint::decode(&hex_bytes(hex).unwrap()) {
            Err(Error::DeserializeError(_)) => {}
            x => panic!("expected truncation error for {}, got {:?}", hex, x),
        }
    }
}

#[test]
fn varuint_decode_ignores_trailing_bytes() {
    let (v, consumed) = VarUint::decode(&[0x05, 0xaa, 0xbb]).unwrap();
    assert_eq!(v, VarUint(5));
    assert_eq!(consumed, 1);
}
