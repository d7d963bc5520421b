// Copyright (C) 2013-2020 Blockstack PBC, a public benefit corporation
// Copyright (C) 2020-2025 Stacks Open Internet Foundation
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

use std::hash::{Hash, Hasher};
use std::{error, fmt};

use k256::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use k256::ecdsa::{
    RecoveryId as K256RecoveryId, Signature as K256Signature, SigningKey as K256SigningKey,
    VerifyingKey as K256VerifyingKey,
};
use k256::elliptic_curve::generic_array::GenericArray;
use k256::elliptic_curve::sec1::{FromEncodedPoint, ToEncodedPoint};
use k256::{EncodedPoint, PublicKey as K256PublicKey, SecretKey as K256SecretKey};
use serde::de::{Deserialize, Error as de_Error};
use serde::Serialize;

use crate::util::hash::{hex_bytes, to_hex, Sha256Sum};

pub const MESSAGE_SIGNATURE_ENCODED_SIZE: u32 = 65;

/// Recoverable signature in VRS order: recovery id, then r, then s
pub struct MessageSignature(pub [u8; 65]);
impl_array_newtype!(MessageSignature, u8, 65);
impl_array_hexstring_fmt!(MessageSignature);
impl_byte_array_newtype!(MessageSignature, u8, 65);
impl_byte_array_serde!(MessageSignature);

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Secp256k1Error {
    InvalidKey,
    InvalidSignature,
    InvalidMessage,
    InvalidRecoveryId,
    SigningFailed,
    RecoveryFailed,
}

impl fmt::Display for Secp256k1Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Secp256k1Error::InvalidKey => write!(f, "Invalid key"),
            Secp256k1Error::InvalidSignature => write!(f, "Invalid signature"),
            Secp256k1Error::InvalidMessage => write!(f, "Invalid message"),
            Secp256k1Error::InvalidRecoveryId => write!(f, "Invalid recovery ID"),
            Secp256k1Error::SigningFailed => write!(f, "Signing failed"),
            Secp256k1Error::RecoveryFailed => write!(f, "Recovery failed"),
        }
    }
}

impl error::Error for Secp256k1Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        None
    }
}

pub trait PublicKey: Clone + fmt::Debug + serde::Serialize + serde::de::DeserializeOwned {
    fn to_bytes(&self) -> Vec<u8>;
    fn verify(&self, data_hash: &[u8], sig: &MessageSignature) -> Result<bool, Secp256k1Error>;
}

pub trait PrivateKey: Clone + fmt::Debug + serde::Serialize + serde::de::DeserializeOwned {
    fn to_bytes(&self) -> Vec<u8>;
    fn sign(&self, data_hash: &[u8]) -> Result<MessageSignature, Secp256k1Error>;
}

#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct Secp256k1PublicKey {
    #[serde(
        serialize_with = "secp256k1_pubkey_serialize",
        deserialize_with = "secp256k1_pubkey_deserialize"
    )]
    key: K256VerifyingKey,
    compressed: bool,
}

#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct Secp256k1PrivateKey {
    #[serde(
        serialize_with = "secp256k1_privkey_serialize",
        deserialize_with = "secp256k1_privkey_deserialize"
    )]
    key: K256SigningKey,
    compress_public: bool,
}

impl Hash for Secp256k1PublicKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.to_bytes_compressed().hash(state);
    }
}

fn check_hash_len(data_hash: &[u8]) -> Result<(), Secp256k1Error> {
    if data_hash.len() != 32 {
        return Err(Secp256k1Error::InvalidMessage);
    }
    Ok(())
}

fn parse_verifying_key(data: &[u8]) -> Result<K256VerifyingKey, Secp256k1Error> {
    let encoded_point = EncodedPoint::from_bytes(data).map_err(|_| Secp256k1Error::InvalidKey)?;
    let public_key =
        Option::<K256PublicKey>::from(K256PublicKey::from_encoded_point(&encoded_point))
            .ok_or(Secp256k1Error::InvalidKey)?;
    Ok(K256VerifyingKey::from(public_key))
}

impl MessageSignature {
    /// Creates an "empty" signature (all zeros). Note this is not a valid signature.
    pub fn empty() -> MessageSignature {
        MessageSignature([0u8; 65])
    }

    fn from_parts(signature: &K256Signature, recovery_id: K256RecoveryId) -> MessageSignature {
        let mut ret_bytes = [0u8; 65];
        ret_bytes[0] = recovery_id.to_byte();
        ret_bytes[1..].copy_from_slice(&signature.to_bytes());
        MessageSignature(ret_bytes)
    }

    fn to_parts(&self) -> Result<(K256Signature, K256RecoveryId), Secp256k1Error> {
        let recovery_id =
            K256RecoveryId::from_byte(self.0[0]).ok_or(Secp256k1Error::InvalidRecoveryId)?;
        let signature =
            K256Signature::from_slice(&self.0[1..]).map_err(|_| Secp256k1Error::InvalidSignature)?;
        Ok((signature, recovery_id))
    }

    /// Converts from VRS to RSV.
    pub fn to_rsv(&self) -> Vec<u8> {
        [&self.0[1..], &self.0[0..1]].concat()
    }

    /// Converts from RSV to VRS.
    pub fn from_rsv(rsv: &[u8]) -> Result<MessageSignature, Secp256k1Error> {
        if rsv.len() != 65 {
            return Err(Secp256k1Error::InvalidSignature);
        }
        let mut ret_bytes = [0u8; 65];
        ret_bytes[0] = rsv[64];
        ret_bytes[1..].copy_from_slice(&rsv[..64]);
        Ok(MessageSignature(ret_bytes))
    }

    /// The 64-byte `r || s` half of the signature
    pub fn to_compact(&self) -> [u8; 64] {
        let mut ret = [0u8; 64];
        ret.copy_from_slice(&self.0[1..]);
        ret
    }
}

impl Secp256k1PublicKey {
    /// Creates a Secp256k1PublicKey from a hex string representation.
    pub fn from_hex(hex_string: &str) -> Result<Secp256k1PublicKey, Secp256k1Error> {
        let data = hex_bytes(hex_string).map_err(|_e| Secp256k1Error::InvalidKey)?;
        Secp256k1PublicKey::from_slice(&data[..])
    }

    /// Parses a SEC1 point: 33 bytes with a 02/03 prefix, or 65 bytes with a 04 prefix.
    /// The point must lie on the curve.
    pub fn from_slice(data: &[u8]) -> Result<Secp256k1PublicKey, Secp256k1Error> {
        match (data.len(), data.first().copied()) {
            (33, Some(0x02)) | (33, Some(0x03)) | (65, Some(0x04)) => {}
            _ => return Err(Secp256k1Error::InvalidKey),
        }
        Ok(Secp256k1PublicKey {
            key: parse_verifying_key(data)?,
            compressed: data.len() == 33,
        })
    }

    pub fn from_private(privk: &Secp256k1PrivateKey) -> Secp256k1PublicKey {
        Secp256k1PublicKey {
            key: *privk.key.verifying_key(),
            compressed: privk.compress_public,
        }
    }

    pub fn to_hex(&self) -> String {
        to_hex(&self.to_bytes())
    }

    pub fn to_bytes_compressed(&self) -> Vec<u8> {
        K256PublicKey::from(&self.key)
            .to_encoded_point(true)
            .as_bytes()
            .to_vec()
    }

    pub fn to_bytes_uncompressed(&self) -> Vec<u8> {
        K256PublicKey::from(&self.key)
            .to_encoded_point(false)
            .as_bytes()
            .to_vec()
    }

    pub fn compressed(&self) -> bool {
        self.compressed
    }

    pub fn set_compressed(&mut self, value: bool) {
        self.compressed = value;
    }

    /// Recovers the signer of a 32-byte hash (will be compressed).
    pub fn recover_to_pubkey(
        msg: &[u8],
        sig: &MessageSignature,
    ) -> Result<Secp256k1PublicKey, Secp256k1Error> {
        check_hash_len(msg)?;
        let (signature, recovery_id) = sig.to_parts()?;
        let recovered_key = K256VerifyingKey::recover_from_prehash(msg, &signature, recovery_id)
            .map_err(|_| Secp256k1Error::RecoveryFailed)?;

        Ok(Secp256k1PublicKey {
            key: recovered_key,
            compressed: true,
        })
    }

    /// Verifies a 64-byte `r || s` signature over a 32-byte hash.
    /// Malformed input is an error, a well-formed signature that does not match is `Ok(false)`.
    pub fn verify_compact(&self, data_hash: &[u8], sig: &[u8]) -> Result<bool, Secp256k1Error> {
        check_hash_len(data_hash)?;
        if sig.len() != 64 {
            return Err(Secp256k1Error::InvalidSignature);
        }
        let signature =
            K256Signature::from_slice(sig).map_err(|_| Secp256k1Error::InvalidSignature)?;
        Ok(self.key.verify_prehash(data_hash, &signature).is_ok())
    }

    /// Verifies a DER-encoded signature over a 32-byte hash
    pub fn verify_der(&self, data_hash: &[u8], der: &[u8]) -> Result<bool, Secp256k1Error> {
        let compact = der_to_compact(der)?;
        self.verify_compact(data_hash, &compact)
    }
}

impl PublicKey for Secp256k1PublicKey {
    /// Encodes according to the key's compression flag
    fn to_bytes(&self) -> Vec<u8> {
        K256PublicKey::from(&self.key)
            .to_encoded_point(self.compressed)
            .as_bytes()
            .to_vec()
    }

    fn verify(&self, data_hash: &[u8], sig: &MessageSignature) -> Result<bool, Secp256k1Error> {
        check_hash_len(data_hash)?;
        let (signature, recovery_id) = sig.to_parts()?;
        let recovered_pubkey =
            K256VerifyingKey::recover_from_prehash(data_hash, &signature, recovery_id)
                .map_err(|_| Secp256k1Error::RecoveryFailed)?;

        if recovered_pubkey != self.key {
            test_debug!("{:?} != {:?}", &recovered_pubkey, &self.key);
            return Ok(false);
        }

        // must be low-S
        if signature.normalize_s().is_some() {
            return Err(Secp256k1Error::InvalidSignature);
        }

        Ok(true)
    }
}

impl Secp256k1PrivateKey {
    pub fn random() -> Secp256k1PrivateKey {
        let secret_key = K256SecretKey::random(&mut rand::thread_rng());
        Secp256k1PrivateKey {
            key: K256SigningKey::from(secret_key),
            compress_public: true,
        }
    }

    /// A random key, for tests of downstream crates
    #[cfg(any(test, feature = "testing"))]
    pub fn new() -> Secp256k1PrivateKey {
        Self::random()
    }

    /// Creates a Secp256k1PrivateKey from seed bytes by repeatedly
    ///  SHA256 hashing the seed bytes until a private key is found.
    ///
    /// If `seed` is a valid private key, it will be returned without hashing.
    /// The returned private key's compress_public flag will be `true`.
    pub fn from_seed(seed: &[u8]) -> Secp256k1PrivateKey {
        let mut re_hashed_seed = Vec::from(seed);
        loop {
            if let Ok(mut sk) = Secp256k1PrivateKey::from_slice(&re_hashed_seed[..]) {
                sk.set_compress_public(true);
                return sk;
            }
            re_hashed_seed = Sha256Sum::from_data(&re_hashed_seed[..]).to_bytes().to_vec();
        }
    }

    pub fn from_hex(hex_string: &str) -> Result<Secp256k1PrivateKey, Secp256k1Error> {
        let data = hex_bytes(hex_string).map_err(|_e| Secp256k1Error::InvalidKey)?;
        Secp256k1PrivateKey::from_slice(&data[..])
    }

    /// 32 bytes of scalar, optionally followed by a 0x01 marker meaning the
    /// public key is used in compressed form.
    pub fn from_slice(data: &[u8]) -> Result<Secp256k1PrivateKey, Secp256k1Error> {
        let compress_public = match data.len() {
            32 => false,
            33 if data[32] == 0x01 => true,
            _ => return Err(Secp256k1Error::InvalidKey),
        };

        let mut key_bytes = [0u8; 32];
        key_bytes.copy_from_slice(&data[0..32]);

        let secret_key = K256SecretKey::from_bytes(&GenericArray::from(key_bytes))
            .map_err(|_| Secp256k1Error::InvalidKey)?;

        Ok(Secp256k1PrivateKey {
            key: K256SigningKey::from(secret_key),
            compress_public,
        })
    }

    pub fn compress_public(&self) -> bool {
        self.compress_public
    }

    pub fn set_compress_public(&mut self, value: bool) {
        self.compress_public = value;
    }

    pub fn to_hex(&self) -> String {
        to_hex(&PrivateKey::to_bytes(self))
    }

    /// The raw 32-byte scalar
    pub fn as_slice(&self) -> [u8; 32] {
        self.key.to_bytes().into()
    }

    pub fn public_key(&self) -> Secp256k1PublicKey {
        Secp256k1PublicKey::from_private(self)
    }

    /// Signs a 32-byte hash, producing the 64-byte `r || s` form (low-S).
    pub fn sign_compact(&self, data_hash: &[u8]) -> Result<[u8; 64], Secp256k1Error> {
        check_hash_len(data_hash)?;
        let signature: K256Signature = self
            .key
            .sign_prehash(data_hash)
            .map_err(|_| Secp256k1Error::SigningFailed)?;
        let signature = signature.normalize_s().unwrap_or(signature);
        Ok(signature.to_bytes().into())
    }

    /// Signs a 32-byte hash, producing a DER-encoded signature
    pub fn sign_der(&self, data_hash: &[u8]) -> Result<Vec<u8>, Secp256k1Error> {
        compact_to_der(&self.sign_compact(data_hash)?)
    }
}

#[cfg(any(test, feature = "testing"))]
impl Default for Secp256k1PrivateKey {
    fn default() -> Self {
        Self::new()
    }
}

impl PrivateKey for Secp256k1PrivateKey {
    fn to_bytes(&self) -> Vec<u8> {
        let mut bits = self.key.to_bytes().to_vec();
        if self.compress_public {
            bits.push(0x01);
        }
        bits
    }

    /// Signs a 32-byte hash, producing a recoverable signature.
    fn sign(&self, data_hash: &[u8]) -> Result<MessageSignature, Secp256k1Error> {
        let compact = self.sign_compact(data_hash)?;
        let signature =
            K256Signature::from_slice(&compact).map_err(|_| Secp256k1Error::SigningFailed)?;

        // find the recovery id that yields our own key
        for recovery_id in 0..4 {
            let Some(recovery_id) = K256RecoveryId::from_byte(recovery_id) else {
                continue;
            };
            if let Ok(recovered_key) =
                K256VerifyingKey::recover_from_prehash(data_hash, &signature, recovery_id)
            {
                if recovered_key == *self.key.verifying_key() {
                    return Ok(MessageSignature::from_parts(&signature, recovery_id));
                }
            }
        }

        Err(Secp256k1Error::SigningFailed)
    }
}

/// ECDH: the 32-byte x-coordinate of `privkey * pubkey`
pub fn ecdh_shared_x(privkey: &Secp256k1PrivateKey, pubkey: &Secp256k1PublicKey) -> [u8; 32] {
    let shared = k256::ecdh::diffie_hellman(
        privkey.key.as_nonzero_scalar(),
        K256PublicKey::from(&pubkey.key).as_affine(),
    );
    let mut ret = [0u8; 32];
    ret.copy_from_slice(shared.raw_secret_bytes().as_slice());
    ret
}

/// Converts a 64-byte `r || s` signature to DER
pub fn compact_to_der(compact: &[u8]) -> Result<Vec<u8>, Secp256k1Error> {
    if compact.len() != 64 {
        return Err(Secp256k1Error::InvalidSignature);
    }
    let signature =
        K256Signature::from_slice(compact).map_err(|_| Secp256k1Error::InvalidSignature)?;
    Ok(signature.to_der().as_bytes().to_vec())
}

/// Converts a DER signature to the 64-byte `r || s` form
pub fn der_to_compact(der: &[u8]) -> Result<[u8; 64], Secp256k1Error> {
    let signature = K256Signature::from_der(der).map_err(|_| Secp256k1Error::InvalidSignature)?;
    Ok(signature.to_bytes().into())
}

fn secp256k1_pubkey_serialize<S: serde::Serializer>(
    pubk: &K256VerifyingKey,
    s: S,
) -> Result<S::Ok, S::Error> {
    let encoded_point = K256PublicKey::from(pubk).to_encoded_point(true);
    s.serialize_str(to_hex(encoded_point.as_bytes()).as_str())
}

fn secp256k1_pubkey_deserialize<'de, D: serde::Deserializer<'de>>(
    d: D,
) -> Result<K256VerifyingKey, D::Error> {
    let key_hex = String::deserialize(d)?;
    let key_bytes = hex_bytes(&key_hex).map_err(de_Error::custom)?;
    parse_verifying_key(&key_bytes).map_err(de_Error::custom)
}

fn secp256k1_privkey_serialize<S: serde::Serializer>(
    privk: &K256SigningKey,
    s: S,
) -> Result<S::Ok, S::Error> {
    s.serialize_str(to_hex(privk.to_bytes().as_slice()).as_str())
}

fn secp256k1_privkey_deserialize<'de, D: serde::Deserializer<'de>>(
    d: D,
) -> Result<K256SigningKey, D::Error> {
    let key_hex = String::deserialize(d)?;
    let key_bytes = hex_bytes(&key_hex).map_err(de_Error::custom)?;
    if key_bytes.len() != 32 {
        return Err(de_Error::custom("Private key must be 32 bytes"));
    }
    Secp256k1PrivateKey::from_slice(&key_bytes)
        .map(|sk| sk.key)
        .map_err(de_Error::custom)
}

/// Recovers a public key from a message hash and an RSV signature.
/// The returned public key is in compressed format (33 bytes).
pub fn secp256k1_recover(
    message_arr: &[u8],
    serialized_signature_arr: &[u8],
) -> Result<[u8; 33], Secp256k1Error> {
    check_hash_len(message_arr)?;
    let sig = MessageSignature::from_rsv(serialized_signature_arr)?;
    let recovered = Secp256k1PublicKey::recover_to_pubkey(message_arr, &sig)?;
    let mut result = [0u8; 33];
    result.copy_from_slice(&recovered.to_bytes_compressed());
    Ok(result)
}

/// Verifies a message hash against a 64-byte signature and a public key.
/// High-S signatures are rejected.
pub fn secp256k1_verify(
    message_arr: &[u8],
    serialized_signature_arr: &[u8],
    pubkey_arr: &[u8],
) -> Result<(), Secp256k1Error> {
    check_hash_len(message_arr)?;
    if serialized_signature_arr.len() < 64 {
        return Err(Secp256k1Error::InvalidSignature);
    }
    let verifying_key = parse_verifying_key(pubkey_arr)?;
    let signature = K256Signature::from_slice(&serialized_signature_arr[..64])
        .map_err(|_| Secp256k1Error::InvalidSignature)?;
    if signature.normalize_s().is_some() {
        return Err(Secp256k1Error::InvalidSignature);
    }
    verifying_key
        .verify_prehash(message_arr, &signature)
        .map_err(|_| Secp256k1Error::InvalidSignature)
}
