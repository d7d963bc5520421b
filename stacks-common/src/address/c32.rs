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

use super::{address_to_b58, b58_to_address, b58_version_to_c32, c32_version_to_b58, Error};
use crate::util::hash::DoubleSha256;

const C32_CHARACTERS: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

/// Crockford aliases: `O` reads as `0`, `L` and `I` read as `1`
const C32_ALIASES: [(u8, u8); 3] = [(b'O', 0), (b'L', 1), (b'I', 1)];

const fn build_c32_map() -> [Option<u8>; 128] {
    let mut table = [None; 128];
    let mut i = 0;
    while i < C32_CHARACTERS.len() {
        let c = C32_CHARACTERS[i];
        table[c as usize] = Some(i as u8);
        table[c.to_ascii_lowercase() as usize] = Some(i as u8);
        i += 1;
    }
    let mut j = 0;
    while j < C32_ALIASES.len() {
        let (c, v) = C32_ALIASES[j];
        table[c as usize] = Some(v);
        table[c.to_ascii_lowercase() as usize] = Some(v);
        j += 1;
    }
    table
}

/// ASCII code -> c32 digit, case-insensitive, aliases included
const C32_CHARACTERS_MAP: [Option<u8>; 128] = build_c32_map();

pub fn c32_encode(input_bytes: &[u8]) -> String {
    // c32 digits, least significant first
    let mut digits: Vec<u8> = Vec::with_capacity(input_bytes.len() * 8 / 5 + 1);
    let mut carry: u16 = 0;
    let mut carry_bits: u32 = 0;

    for byte in input_bytes.iter().rev() {
        carry |= (*byte as u16) << carry_bits;
        carry_bits += 8;
        while carry_bits >= 5 {
            digits.push((carry & 0x1f) as u8);
            carry >>= 5;
            carry_bits -= 5;
        }
    }
    if carry_bits > 0 {
        digits.push((carry & 0x1f) as u8);
    }

    // drop high-order zero digits, then restore one '0' per leading zero byte
    while digits.last() == Some(&0) {
        digits.pop();
    }
    let leading_zeros = input_bytes.iter().take_while(|b| **b == 0).count();

    let mut out = String::with_capacity(leading_zeros + digits.len());
    for _ in 0..leading_zeros {
        out.push(C32_CHARACTERS[0] as char);
    }
    for d in digits.iter().rev() {
        out.push(C32_CHARACTERS[*d as usize] as char);
    }
    out
}

pub fn c32_decode(input_str: &str) -> Result<Vec<u8>, Error> {
    if !input_str.is_ascii() {
        return Err(Error::InvalidCrockford32);
    }
    c32_decode_ascii(input_str)
}

fn c32_decode_ascii(input_str: &str) -> Result<Vec<u8>, Error> {
    let digits = input_str
        .bytes()
        .map(|c| {
            C32_CHARACTERS_MAP
                .get(c as usize)
                .copied()
                .flatten()
                .ok_or(Error::InvalidCrockford32)
        })
        .collect::<Result<Vec<u8>, Error>>()?;

    // bytes, least significant first
    let mut bytes: Vec<u8> = Vec::with_capacity(digits.len() * 5 / 8 + 1);
    let mut carry: u16 = 0;
    let mut carry_bits: u32 = 0;
    for d in digits.iter().rev() {
        carry |= (*d as u16) << carry_bits;
        carry_bits += 5;
        if carry_bits >= 8 {
            bytes.push((carry & 0xff) as u8);
            carry >>= 8;
            carry_bits -= 8;
        }
    }
    if carry_bits > 0 {
        bytes.push(carry as u8);
    }

    while bytes.last() == Some(&0) {
        bytes.pop();
    }
    let leading_zeros = digits.iter().take_while(|d| **d == 0).count();
    bytes.extend(std::iter::repeat(0).take(leading_zeros));
    bytes.reverse();
    Ok(bytes)
}

fn c32_checksum(version: u8, data: &[u8]) -> [u8; 4] {
    let mut check_data = Vec::with_capacity(data.len() + 1);
    check_data.push(version);
    check_data.extend_from_slice(data);
    let hash = DoubleSha256::from_data(&check_data);
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Version character, then c32 of `data || checksum`
pub fn c32_check_encode(version: u8, data: &[u8]) -> Result<String, Error> {
    if version >= 32 {
        return Err(Error::InvalidVersion(version));
    }

    let mut encoding_data = data.to_vec();
    encoding_data.extend_from_slice(&c32_checksum(version, data));

    let mut out = String::with_capacity(encoding_data.len() * 8 / 5 + 2);
    out.push(C32_CHARACTERS[version as usize] as char);
    out.push_str(&c32_encode(&encoding_data));
    Ok(out)
}

pub fn c32_check_decode(check_data_unsanitized: &str) -> Result<(u8, Vec<u8>), Error> {
    if !check_data_unsanitized.is_ascii() {
        return Err(Error::InvalidCrockford32);
    }
    if check_data_unsanitized.len() < 2 {
        return Err(Error::InvalidCrockford32);
    }

    let (version_str, data) = check_data_unsanitized.split_at(1);
    let version = match c32_decode_ascii(version_str)?.first() {
        Some(v) => *v,
        None => 0,
    };

    let data_sum_bytes = c32_decode_ascii(data)?;
    if data_sum_bytes.len() < 5 {
        return Err(Error::InvalidCrockford32);
    }
    let (data_bytes, expected_sum) = data_sum_bytes.split_at(data_sum_bytes.len() - 4);

    let computed_sum = c32_checksum(version, data_bytes);
    if computed_sum[..] != expected_sum[..] {
        let expected = [expected_sum[0], expected_sum[1], expected_sum[2], expected_sum[3]];
        return Err(Error::BadChecksum(
            u32::from_le_bytes(computed_sum),
            u32::from_le_bytes(expected),
        ));
    }

    Ok((version, data_bytes.to_vec()))
}

pub fn c32_address_decode(c32_address_str: &str) -> Result<(u8, Vec<u8>), Error> {
    if !c32_address_str.is_ascii() || c32_address_str.len() <= 5 {
        return Err(Error::InvalidCrockford32);
    }
    if !c32_address_str.starts_with('S') && !c32_address_str.starts_with('s') {
        return Err(Error::InvalidCrockford32);
    }
    c32_check_decode(&c32_address_str[1..])
}

pub fn c32_address(version: u8, data: &[u8]) -> Result<String, Error> {
    let c32_string = c32_check_encode(version, data)?;
    Ok(format!("S{}", c32_string))
}

/// Re-encode a c32 address as Base58Check, translating the version byte.
/// Versions without a known counterpart are carried over unchanged.
pub fn c32_to_b58(c32_addr: &str) -> Result<String, Error> {
    let (version, bytes) = c32_address_decode(c32_addr)?;
    let b58_version = c32_version_to_b58(version);
    address_to_b58(b58_version, &bytes)
}

/// Re-encode a Base58Check address as c32, translating the version byte.
/// Versions without a known counterpart are carried over unchanged.
pub fn b58_to_c32(b58_addr: &str) -> Result<String, Error> {
    let (version, bytes) = b58_to_address(b58_addr)?;
    let c32_version = b58_version_to_c32(version);
    c32_address(c32_version, bytes.as_bytes())
}
