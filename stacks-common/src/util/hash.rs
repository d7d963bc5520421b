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

use std::fmt::Write;

use hmac::{Hmac, Mac};
use ripemd::Ripemd160;
use sha2::{Digest, Sha256, Sha512, Sha512_256};

use crate::util::HexError;

pub struct Hash160(pub [u8; 20]);
impl_array_newtype!(Hash160, u8, 20);
impl_array_hexstring_fmt!(Hash160);
impl_byte_array_newtype!(Hash160, u8, 20);
impl_byte_array_serde!(Hash160);
pub const HASH160_ENCODED_SIZE: u32 = 20;

pub struct Ripemd160Sum(pub [u8; 20]);
impl_array_newtype!(Ripemd160Sum, u8, 20);
impl_array_hexstring_fmt!(Ripemd160Sum);
impl_byte_array_newtype!(Ripemd160Sum, u8, 20);

pub struct Sha256Sum(pub [u8; 32]);
impl_array_newtype!(Sha256Sum, u8, 32);
impl_array_hexstring_fmt!(Sha256Sum);
impl_byte_array_newtype!(Sha256Sum, u8, 32);
impl_byte_array_serde!(Sha256Sum);

pub struct Sha512Sum(pub [u8; 64]);
impl_array_newtype!(Sha512Sum, u8, 64);
impl_array_hexstring_fmt!(Sha512Sum);
impl_byte_array_newtype!(Sha512Sum, u8, 64);

pub struct Sha512Trunc256Sum(pub [u8; 32]);
impl_array_newtype!(Sha512Trunc256Sum, u8, 32);
impl_array_hexstring_fmt!(Sha512Trunc256Sum);
impl_byte_array_newtype!(Sha512Trunc256Sum, u8, 32);
impl_byte_array_serde!(Sha512Trunc256Sum);

pub struct DoubleSha256(pub [u8; 32]);
impl_array_newtype!(DoubleSha256, u8, 32);
impl_array_hexstring_fmt!(DoubleSha256);
impl_byte_array_newtype!(DoubleSha256, u8, 32);
pub const DOUBLE_SHA256_ENCODED_SIZE: u32 = 32;

impl Hash160 {
    pub fn from_sha256(sha256_hash: &[u8; 32]) -> Hash160 {
        Hash160(Ripemd160::digest(sha256_hash).into())
    }

    /// Create a hash by hashing some data
    /// (borrowed from Andrew Poelstra)
    pub fn from_data(data: &[u8]) -> Hash160 {
        let sha2_result = Sha256::digest(data);
        Hash160(Ripemd160::digest(sha2_result.as_slice()).into())
    }
}

impl Ripemd160Sum {
    pub fn from_data(data: &[u8]) -> Ripemd160Sum {
        Ripemd160Sum(Ripemd160::digest(data).into())
    }
}

impl Sha256Sum {
    pub fn from_data(data: &[u8]) -> Sha256Sum {
        Sha256Sum(Sha256::digest(data).into())
    }

    pub fn from_hasher(hasher: Sha256) -> Sha256Sum {
        Sha256Sum(hasher.finalize().into())
    }

    pub fn zero() -> Sha256Sum {
        Sha256Sum([0u8; 32])
    }
}

impl Default for Sha256Sum {
    fn default() -> Self {
        Sha256Sum::zero()
    }
}

impl Sha512Sum {
    pub fn from_data(data: &[u8]) -> Sha512Sum {
        let mut ret = [0u8; 64];
        ret.copy_from_slice(Sha512::digest(data).as_slice());
        Sha512Sum(ret)
    }
}

impl Sha512Trunc256Sum {
    pub fn from_data(data: &[u8]) -> Sha512Trunc256Sum {
        Sha512Trunc256Sum(Sha512_256::digest(data).into())
    }

    pub fn from_hasher(hasher: Sha512_256) -> Sha512Trunc256Sum {
        Sha512Trunc256Sum(hasher.finalize().into())
    }
}

impl DoubleSha256 {
    pub fn from_data(data: &[u8]) -> DoubleSha256 {
        DoubleSha256(Sha256::digest(Sha256::digest(data)).into())
    }
}

define_named_enum!(HashAlgorithm {
    Sha256("sha256"),
    Sha512("sha512"),
    Sha512Trunc256("sha512-256"),
    Ripemd160("ripemd160"),
});

enum HasherState {
    Sha256(Sha256),
    Sha512(Sha512),
    Sha512Trunc256(Sha512_256),
    Ripemd160(Ripemd160),
}

/// Incremental hasher over one of the supported digest algorithms.
/// Feeding data in any number of `update()` calls yields the same digest as a
/// single one-shot hash over the concatenation.
pub struct Hasher {
    state: HasherState,
}

impl Hasher {
    pub fn new(algorithm: HashAlgorithm) -> Hasher {
        let state = match algorithm {
            HashAlgorithm::Sha256 => HasherState::Sha256(Sha256::new()),
            HashAlgorithm::Sha512 => HasherState::Sha512(Sha512::new()),
            HashAlgorithm::Sha512Trunc256 => HasherState::Sha512Trunc256(Sha512_256::new()),
            HashAlgorithm::Ripemd160 => HasherState::Ripemd160(Ripemd160::new()),
        };
        Hasher { state }
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        match self.state {
            HasherState::Sha256(_) => HashAlgorithm::Sha256,
            HasherState::Sha512(_) => HashAlgorithm::Sha512,
            HasherState::Sha512Trunc256(_) => HashAlgorithm::Sha512Trunc256,
            HasherState::Ripemd160(_) => HashAlgorithm::Ripemd160,
        }
    }

    pub fn update(&mut self, data: &[u8]) -> &mut Hasher {
        match self.state {
            HasherState::Sha256(ref mut h) => h.update(data),
            HasherState::Sha512(ref mut h) => h.update(data),
            HasherState::Sha512Trunc256(ref mut h) => h.update(data),
            HasherState::Ripemd160(ref mut h) => h.update(data),
        }
        self
    }

    pub fn finalize(self) -> Vec<u8> {
        match self.state {
            HasherState::Sha256(h) => h.finalize().to_vec(),
            HasherState::Sha512(h) => h.finalize().to_vec(),
            HasherState::Sha512Trunc256(h) => h.finalize().to_vec(),
            HasherState::Ripemd160(h) => h.finalize().to_vec(),
        }
    }
}

/// One-shot digest of `data` under `algorithm`
pub fn digest(algorithm: HashAlgorithm, data: &[u8]) -> Vec<u8> {
    let mut hasher = Hasher::new(algorithm);
    hasher.update(data);
    hasher.finalize()
}

// HMAC accepts keys of any length, so new_from_slice() cannot fail.
pub fn hmac_sha256(key: &[u8], data: &[u8]) -> [u8; 32] {
    let mut mac = match Hmac::<Sha256>::new_from_slice(key) {
        Ok(mac) => mac,
        Err(_) => unreachable!("HMAC accepts keys of any length"),
    };
    mac.update(data);
    mac.finalize().into_bytes().into()
}

pub fn hmac_sha512(key: &[u8], data: &[u8]) -> [u8; 64] {
    hmac_sha512_parts(key, &[data])
}

/// HMAC-SHA512 over the concatenation of `parts`, without materializing it
pub fn hmac_sha512_parts(key: &[u8], parts: &[&[u8]]) -> [u8; 64] {
    let mut mac = match Hmac::<Sha512>::new_from_slice(key) {
        Ok(mac) => mac,
        Err(_) => unreachable!("HMAC accepts keys of any length"),
    };
    for part in parts.iter() {
        mac.update(part);
    }
    let mut ret = [0u8; 64];
    ret.copy_from_slice(mac.finalize().into_bytes().as_slice());
    ret
}

/// Convert a hexadecimal-encoded string to its corresponding bytes
pub fn hex_bytes(s: &str) -> Result<Vec<u8>, HexError> {
    if s.len() % 2 != 0 {
        return Err(HexError::BadLength(s.len()));
    }
    let mut v = Vec::with_capacity(s.len() / 2);
    let mut chars = s.chars();
    while let Some(hi) = chars.next() {
        let lo = chars.next().ok_or(HexError::BadLength(s.len()))?;
        match (hi.to_digit(16), lo.to_digit(16)) {
            (None, _) => return Err(HexError::BadCharacter(hi)),
            (_, None) => return Err(HexError::BadCharacter(lo)),
            (Some(hi), Some(lo)) => v.push((hi * 0x10 + lo) as u8),
        }
    }
    Ok(v)
}

/// Convert a slice of u8 to a hex string
pub fn to_hex(s: &[u8]) -> String {
    let mut r = String::with_capacity(s.len() * 2);
    for b in s.iter() {
        // writing to a String cannot fail
        let _ = write!(r, "{:02x}", b);
    }
    r
}
