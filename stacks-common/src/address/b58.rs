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

//! Base58 and Base58Check, bitcoin alphabet

use super::Error;
use crate::util::hash::DoubleSha256;

const BASE58_CHARS: &[u8; 58] = b"123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

const fn build_digit_map() -> [Option<u8>; 128] {
    let mut table = [None; 128];
    let mut i = 0;
    while i < BASE58_CHARS.len() {
        table[BASE58_CHARS[i] as usize] = Some(i as u8);
        i += 1;
    }
    table
}

/// ASCII code -> base58 digit
const BASE58_DIGITS: [Option<u8>; 128] = build_digit_map();

/// Decode base58 without a checksum
pub fn from(data: &str) -> Result<Vec<u8>, Error> {
    // 11/15 is just over log_256(58)
    let mut scratch = vec![0u8; 1 + data.len() * 11 / 15];
    for (pos, d58) in data.chars().enumerate() {
        let digit = if d58.is_ascii() {
            BASE58_DIGITS[d58 as usize]
        } else {
            None
        };
        let mut carry = match digit {
            Some(d) => d as u32,
            None => return Err(Error::InvalidBase58(d58, pos)),
        };
        for d256 in scratch.iter_mut().rev() {
            carry += *d256 as u32 * 58;
            *d256 = carry as u8;
            carry /= 256;
        }
        if carry != 0 {
            return Err(Error::InvalidLength(data.len()));
        }
    }

    // leading '1's are leading zero bytes
    let mut ret: Vec<u8> = data
        .bytes()
        .take_while(|&x| x == BASE58_CHARS[0])
        .map(|_| 0)
        .collect();
    ret.extend(scratch.into_iter().skip_while(|&x| x == 0));
    Ok(ret)
}

/// Decode base58check, verifying and stripping the 4-byte checksum
pub fn from_check(data: &str) -> Result<Vec<u8>, Error> {
    let mut ret = from(data)?;
    if ret.len() < 4 {
        return Err(Error::InvalidLength(ret.len()));
    }
    let ck_start = ret.len() - 4;
    let expected = DoubleSha256::from_data(&ret[..ck_start]);
    if expected[0..4] != ret[ck_start..] {
        let computed = u32::from_le_bytes([expected[0], expected[1], expected[2], expected[3]]);
        let actual = u32::from_le_bytes([
            ret[ck_start],
            ret[ck_start + 1],
            ret[ck_start + 2],
            ret[ck_start + 3],
        ]);
        return Err(Error::BadChecksum(computed, actual));
    }

    ret.truncate(ck_start);
    Ok(ret)
}

/// Encode base58 without a checksum
pub fn encode_slice(data: &[u8]) -> String {
    // base58 digits, least significant first
    let mut digits: Vec<u8> = Vec::with_capacity(1 + data.len() * 138 / 100);
    let leading_zero_count = data.iter().take_while(|b| **b == 0).count();

    for d256 in data[leading_zero_count..].iter() {
        let mut carry = *d256 as u32;
        for ch in digits.iter_mut() {
            let new_ch = (*ch as u32) * 256 + carry;
            *ch = (new_ch % 58) as u8;
            carry = new_ch / 58;
        }
        while carry > 0 {
            digits.push((carry % 58) as u8);
            carry /= 58;
        }
    }

    let mut ret = String::with_capacity(leading_zero_count + digits.len());
    for _ in 0..leading_zero_count {
        ret.push(BASE58_CHARS[0] as char);
    }
    for d in digits.iter().rev() {
        ret.push(BASE58_CHARS[*d as usize] as char);
    }
    ret
}

/// Encode base58check, appending `dsha256(data)[0..4]`
pub fn check_encode_slice(data: &[u8]) -> String {
    let checksum = DoubleSha256::from_data(data);
    let mut payload = data.to_vec();
    payload.extend_from_slice(&checksum[0..4]);
    encode_slice(&payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::hash::hex_bytes;

    #[test]
    fn test_base58_encode() {
        assert_eq!(&encode_slice(&[0][..]), "1");
        assert_eq!(&encode_slice(&[1][..]), "2");
        assert_eq!(&encode_slice(&[58][..]), "21");
        assert_eq!(&encode_slice(&[13, 36][..]), "211");
        assert_eq!(&encode_slice(&[0, 13, 36][..]), "1211");
        assert_eq!(&encode_slice(&[0, 0, 0, 0, 13, 36][..]), "1111211");
        assert_eq!(&encode_slice(&[][..]), "");
        assert_eq!(&encode_slice(b"hello world"), "StV1DL6CwTryKyV");
    }

    #[test]
    fn test_base58_decode() {
        assert_eq!(from("1").ok(), Some(vec![0u8]));
        assert_eq!(from("2").ok(), Some(vec![1u8]));
        assert_eq!(from("21").ok(), Some(vec![58u8]));
        assert_eq!(from("211").ok(), Some(vec![13u8, 36]));
        assert_eq!(from("1211").ok(), Some(vec![0u8, 13, 36]));
        assert_eq!(from("111211").ok(), Some(vec![0u8, 0, 0, 13, 36]));
        assert_eq!(from("StV1DL6CwTryKyV").ok(), Some(b"hello world".to_vec()));
        assert_eq!(from("0"), Err(Error::InvalidBase58('0', 0)));
        assert_eq!(from("21l"), Err(Error::InvalidBase58('l', 2)));
        assert_eq!(from("2é"), Err(Error::InvalidBase58('é', 1)));
    }

    #[test]
    fn test_base58_check_roundtrip() {
        let v = hex_bytes("00f8917303bfa8ef24f292e8fa1419b20460ba064d").unwrap();
        let encoded = check_encode_slice(&v);
        assert_eq!(encoded, "1PfJpZsjreyVrqeoAfabrRwwjQyoSQMmHH");
        assert_eq!(from_check(&encoded).unwrap(), v);

        // flip the last character
        let mut corrupt = encoded.clone();
        corrupt.pop();
        corrupt.push('S');
        match from_check(&corrupt) {
            Err(Error::BadChecksum(_, _)) => {}
            x => panic!("expected bad checksum, got {:?}", x),
        }
        assert_eq!(from_check("11"), Err(Error::InvalidLength(2)));
    }
}
