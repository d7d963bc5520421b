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

//! BIP32 hierarchical deterministic keys.

use std::fmt;

use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::elliptic_curve::PrimeField;
use k256::{FieldBytes, ProjectivePoint, PublicKey as K256PublicKey, Scalar};

use crate::address::b58;
use crate::util::hash::{hmac_sha512, hmac_sha512_parts, Hash160};
use crate::util::secp256k1::{Secp256k1PrivateKey, Secp256k1PublicKey};

pub const HARDENED_OFFSET: u32 = 0x8000_0000;
pub const XPRV_VERSION: u32 = 0x0488_ADE4;
pub const XPUB_VERSION: u32 = 0x0488_B21E;
/// version(4) depth(1) fingerprint(4) index(4) chain code(32) key(33)
pub const EXTENDED_KEY_LEN: usize = 78;

const MASTER_HMAC_KEY: &[u8] = b"Bitcoin seed";
const MIN_SEED_LEN: usize = 16;
const MAX_SEED_LEN: usize = 64;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum HdError {
    #[error("seed must be 16 to 64 bytes, got {0}")]
    InvalidSeedLength(usize),
    #[error("seed yields an invalid master key")]
    InvalidMasterKey,
    #[error("child {0} is not a valid key")]
    InvalidChild(u32),
    #[error("cannot derive hardened child {0} from a public key")]
    HardenedFromPublic(u32),
    #[error("maximum depth reached")]
    DepthExceeded,
    #[error("invalid derivation path: {0}")]
    InvalidPath(String),
    #[error("invalid extended key: {0}")]
    InvalidExtendedKey(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtendedKeyMaterial {
    Private(Secp256k1PrivateKey),
    Public(Secp256k1PublicKey),
}

/// A node in a BIP32 key tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtendedKey {
    pub key: ExtendedKeyMaterial,
    pub chain_code: [u8; 32],
    pub depth: u8,
    pub parent_fingerprint: [u8; 4],
    pub child_index: u32,
}

pub fn is_hardened(index: u32) -> bool {
    index >= HARDENED_OFFSET
}

fn scalar_from_bytes(bytes: &[u8]) -> Option<Scalar> {
    Option::from(Scalar::from_repr(FieldBytes::clone_from_slice(bytes)))
}

fn split_hmac(i: &[u8; 64]) -> ([u8; 32], [u8; 32]) {
    let mut il = [0u8; 32];
    let mut ir = [0u8; 32];
    il.copy_from_slice(&i[..32]);
    ir.copy_from_slice(&i[32..]);
    (il, ir)
}

fn compressed_private_key(bytes: &[u8]) -> Option<Secp256k1PrivateKey> {
    let mut key = Secp256k1PrivateKey::from_slice(bytes).ok()?;
    key.set_compress_public(true);
    Some(key)
}

impl ExtendedKey {
    /// The master node for `seed`
    pub fn from_seed(seed: &[u8]) -> Result<ExtendedKey, HdError> {
        if seed.len() < MIN_SEED_LEN || seed.len() > MAX_SEED_LEN {
            return Err(HdError::InvalidSeedLength(seed.len()));
        }
        let (il, chain_code) = split_hmac(&hmac_sha512(MASTER_HMAC_KEY, seed));
        let key = compressed_private_key(&il).ok_or(HdError::InvalidMasterKey)?;
        Ok(ExtendedKey {
            key: ExtendedKeyMaterial::Private(key),
            chain_code,
            depth: 0,
            parent_fingerprint: [0u8; 4],
            child_index: 0,
        })
    }

    pub fn is_private(&self) -> bool {
        matches!(self.key, ExtendedKeyMaterial::Private(_))
    }

    pub fn private_key(&self) -> Option<&Secp256k1PrivateKey> {
        match &self.key {
            ExtendedKeyMaterial::Private(key) => Some(key),
            ExtendedKeyMaterial::Public(_) => None,
        }
    }

    /// Always compressed
    pub fn public_key(&self) -> Secp256k1PublicKey {
        let mut pubkey = match &self.key {
            ExtendedKeyMaterial::Private(key) => key.public_key(),
            ExtendedKeyMaterial::Public(key) => key.clone(),
        };
        pubkey.set_compressed(true);
        pubkey
    }

    /// hash160 of the compressed public key
    pub fn identifier(&self) -> Hash160 {
        Hash160::from_data(&self.public_key().to_bytes_compressed())
    }

    pub fn fingerprint(&self) -> [u8; 4] {
        let mut fp = [0u8; 4];
        fp.copy_from_slice(&self.identifier().as_bytes()[0..4]);
        fp
    }

    pub fn neuter(&self) -> ExtendedKey {
        ExtendedKey {
            key: ExtendedKeyMaterial::Public(self.public_key()),
            ..self.clone()
        }
    }

    pub fn derive_child(&self, index: u32) -> Result<ExtendedKey, HdError> {
        let depth = self.depth.checked_add(1).ok_or(HdError::DepthExceeded)?;
        let index_bytes = index.to_be_bytes();

        let (key, chain_code) = match &self.key {
            ExtendedKeyMaterial::Private(parent) => {
                let parent_bytes = parent.as_slice();
                let i = if is_hardened(index) {
                    hmac_sha512_parts(
                        &self.chain_code,
                        &[&[0u8][..], &parent_bytes[..], &index_bytes[..]],
                    )
                } else {
                    let pubkey = self.public_key().to_bytes_compressed();
                    hmac_sha512_parts(&self.chain_code, &[&pubkey[..], &index_bytes[..]])
                };
                let (il, chain_code) = split_hmac(&i);

                let tweak = scalar_from_bytes(&il).ok_or(HdError::InvalidChild(index))?;
                let parent_scalar =
                    scalar_from_bytes(&parent_bytes).ok_or(HdError::InvalidChild(index))?;
                let child_scalar = tweak + parent_scalar;
                if bool::from(child_scalar.is_zero()) {
                    return Err(HdError::InvalidChild(index));
                }
                let child = compressed_private_key(&child_scalar.to_bytes())
                    .ok_or(HdError::InvalidChild(index))?;
                (ExtendedKeyMaterial::Private(child), chain_code)
            }
            ExtendedKeyMaterial::Public(parent) => {
                if is_hardened(index) {
                    return Err(HdError::HardenedFromPublic(index));
                }
                let parent_bytes = parent.to_bytes_compressed();
                let i = hmac_sha512_parts(&self.chain_code, &[&parent_bytes[..], &index_bytes[..]]);
                let (il, chain_code) = split_hmac(&i);

                let tweak = scalar_from_bytes(&il).ok_or(HdError::InvalidChild(index))?;
                let parent_point = K256PublicKey::from_sec1_bytes(&parent_bytes)
                    .map_err(|_| HdError::InvalidChild(index))?
                    .to_projective();
                let child_point = ProjectivePoint::GENERATOR * tweak + parent_point;
                // the identity has no affine encoding
                let child_key = K256PublicKey::from_affine(child_point.to_affine())
                    .map_err(|_| HdError::InvalidChild(index))?;
                let child = Secp256k1PublicKey::from_slice(
                    child_key.to_encoded_point(true).as_bytes(),
                )
                .map_err(|_| HdError::InvalidChild(index))?;
                (ExtendedKeyMaterial::Public(child), chain_code)
            }
        };

        Ok(ExtendedKey {
            key,
            chain_code,
            depth,
            parent_fingerprint: self.fingerprint(),
            child_index: index,
        })
    }

    /// Derive along a path like `m/44'/5757'/0'/0/0`. Hardened steps may be
    /// marked with `'`, `h` or `H`.
    pub fn derive_path(&self, path: &str) -> Result<ExtendedKey, HdError> {
        parse_path(path)?
            .into_iter()
            .try_fold(self.clone(), |node, index| node.derive_child(index))
    }

    fn serialize(&self) -> [u8; EXTENDED_KEY_LEN] {
        let mut buf = [0u8; EXTENDED_KEY_LEN];
        let (version, key_bytes) = match &self.key {
            ExtendedKeyMaterial::Private(key) => {
                let mut key_bytes = [0u8; 33];
                key_bytes[1..].copy_from_slice(&key.as_slice());
                (XPRV_VERSION, key_bytes)
            }
            ExtendedKeyMaterial::Public(_) => {
                let mut key_bytes = [0u8; 33];
                key_bytes.copy_from_slice(&self.public_key().to_bytes_compressed());
                (XPUB_VERSION, key_bytes)
            }
        };
        buf[0..4].copy_from_slice(&version.to_be_bytes());
        buf[4] = self.depth;
        buf[5..9].copy_from_slice(&self.parent_fingerprint);
        buf[9..13].copy_from_slice(&self.child_index.to_be_bytes());
        buf[13..45].copy_from_slice(&self.chain_code);
        buf[45..78].copy_from_slice(&key_bytes);
        buf
    }

    /// `xprv...` or `xpub...`
    pub fn to_base58(&self) -> String {
        b58::check_encode_slice(&self.serialize())
    }

    pub fn from_base58(encoded: &str) -> Result<ExtendedKey, HdError> {
        let data =
            b58::from_check(encoded).map_err(|e| HdError::InvalidExtendedKey(e.to_string()))?;
        if data.len() != EXTENDED_KEY_LEN {
            return Err(HdError::InvalidExtendedKey(format!(
                "expected {} bytes, got {}",
                EXTENDED_KEY_LEN,
                data.len()
            )));
        }

        let version = u32::from_be_bytes([data[0], data[1], data[2], data[3]]);
        let depth = data[4];
        let mut parent_fingerprint = [0u8; 4];
        parent_fingerprint.copy_from_slice(&data[5..9]);
        let child_index = u32::from_be_bytes([data[9], data[10], data[11], data[12]]);
        let mut chain_code = [0u8; 32];
        chain_code.copy_from_slice(&data[13..45]);
        let key_bytes = &data[45..78];

        if depth == 0 && (parent_fingerprint != [0u8; 4] || child_index != 0) {
            return Err(HdError::InvalidExtendedKey(
                "master key with a parent".into(),
            ));
        }

        let key = match version {
            XPRV_VERSION => {
                if key_bytes[0] != 0x00 {
                    return Err(HdError::InvalidExtendedKey(
                        "private key data must start with 0x00".into(),
                    ));
                }
                let key = compressed_private_key(&key_bytes[1..])
                    .ok_or_else(|| HdError::InvalidExtendedKey("invalid private key".into()))?;
                ExtendedKeyMaterial::Private(key)
            }
            XPUB_VERSION => {
                let key = Secp256k1PublicKey::from_slice(key_bytes)
                    .map_err(|_| HdError::InvalidExtendedKey("invalid public key".into()))?;
                ExtendedKeyMaterial::Public(key)
            }
            other => {
                return Err(HdError::InvalidExtendedKey(format!(
                    "unknown version {other:#010x}"
                )))
            }
        };

        Ok(ExtendedKey {
            key,
            chain_code,
            depth,
            parent_fingerprint,
            child_index,
        })
    }
}

impl fmt::Display for ExtendedKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.to_base58())
    }
}

/// Parse `m/a/b'/...` into child indexes
pub fn parse_path(path: &str) -> Result<Vec<u32>, HdError> {
    let mut components = path.trim().split('/');
    match components.next() {
        Some("m") | Some("M") => {}
        _ => return Err(HdError::InvalidPath(path.to_string())),
    }

    components
        .map(|component| {
            let (number, hardened) = match component
                .strip_suffix('\'')
                .or_else(|| component.strip_suffix('h'))
                .or_else(|| component.strip_suffix('H'))
            {
                Some(number) => (number, true),
                None => (component, false),
            };
            if number.is_empty() || !number.bytes().all(|b| b.is_ascii_digit()) {
                return Err(HdError::InvalidPath(path.to_string()));
            }
            let index: u32 = number
                .parse()
                .map_err(|_| HdError::InvalidPath(path.to_string()))?;
            if is_hardened(index) {
                return Err(HdError::InvalidPath(path.to_string()));
            }
            Ok(if hardened { index + HARDENED_OFFSET } else { index })
        })
        .collect()
}
