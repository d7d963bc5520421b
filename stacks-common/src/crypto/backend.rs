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

//! Symmetric cipher and key-derivation backends.
//!
//! Each concern has a trait with two interchangeable implementations: one
//! built on a dedicated mode/KDF crate, and one written directly over the
//! underlying primitive. `backends()` picks one of each, once per process.

use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockCipher, BlockDecrypt, BlockEncrypt, KeyInit};
use aes::{Aes128, Aes256};
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use hmac::{Hmac, Mac};
use sha2::Sha512;

use super::CryptoError;
use crate::config::{BackendPreference, CryptoConfig};

pub const AES_BLOCK_SIZE: usize = 16;

define_named_enum!(CipherAlgorithm {
    Aes256Cbc("aes-256-cbc"),
    Aes128Cbc("aes-128-cbc"),
});

impl CipherAlgorithm {
    pub fn key_len(&self) -> usize {
        match self {
            CipherAlgorithm::Aes256Cbc => 32,
            CipherAlgorithm::Aes128Cbc => 16,
        }
    }

    /// Length of the PKCS#7-padded ciphertext for `plaintext_len` bytes
    pub fn ciphertext_len(plaintext_len: usize) -> usize {
        (plaintext_len / AES_BLOCK_SIZE + 1) * AES_BLOCK_SIZE
    }
}

/// AES-CBC with PKCS#7 padding
pub trait CipherBackend: Send + Sync {
    fn name(&self) -> &'static str;
    fn encrypt(
        &self,
        alg: CipherAlgorithm,
        key: &[u8],
        iv: &[u8],
        plaintext: &[u8],
    ) -> Result<Vec<u8>, CryptoError>;
    fn decrypt(
        &self,
        alg: CipherAlgorithm,
        key: &[u8],
        iv: &[u8],
        ciphertext: &[u8],
    ) -> Result<Vec<u8>, CryptoError>;
}

/// PBKDF2 over HMAC-SHA512
pub trait KdfBackend: Send + Sync {
    fn name(&self) -> &'static str;
    fn pbkdf2_hmac_sha512(
        &self,
        password: &[u8],
        salt: &[u8],
        iterations: u32,
        key_len: usize,
    ) -> Result<Vec<u8>, CryptoError>;
}

fn check_key_iv(alg: CipherAlgorithm, key: &[u8], iv: &[u8]) -> Result<(), CryptoError> {
    if key.len() != alg.key_len() {
        return Err(CryptoError::InvalidKeyLength(key.len()));
    }
    if iv.len() != AES_BLOCK_SIZE {
        return Err(CryptoError::InvalidIvLength(iv.len()));
    }
    Ok(())
}

fn check_ciphertext_len(ciphertext: &[u8]) -> Result<(), CryptoError> {
    if ciphertext.is_empty() || ciphertext.len() % AES_BLOCK_SIZE != 0 {
        return Err(CryptoError::InvalidCiphertextLength(ciphertext.len()));
    }
    Ok(())
}

fn check_kdf_params(iterations: u32, key_len: usize) -> Result<(), CryptoError> {
    if iterations == 0 {
        return Err(CryptoError::InvalidKdfParameters(
            "iteration count must be positive".into(),
        ));
    }
    if key_len == 0 {
        return Err(CryptoError::InvalidKdfParameters(
            "key length must be positive".into(),
        ));
    }
    Ok(())
}

/// CBC mode from the `cbc` crate
#[derive(Debug, Clone, Copy, Default)]
pub struct CbcModeCipher;

impl CbcModeCipher {
    fn encrypt_with<C>(key: &[u8], iv: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, CryptoError>
    where
        C: BlockEncrypt + BlockCipher + KeyInit,
        cbc::Encryptor<C>: KeyIvInit,
    {
        let encryptor = cbc::Encryptor::<C>::new_from_slices(key, iv)
            .map_err(|_| CryptoError::InvalidKeyLength(key.len()))?;
        Ok(encryptor.encrypt_padded_vec_mut::<Pkcs7>(plaintext))
    }

    fn decrypt_with<C>(key: &[u8], iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError>
    where
        C: BlockDecrypt + BlockCipher + KeyInit,
        cbc::Decryptor<C>: KeyIvInit,
    {
        let decryptor = cbc::Decryptor::<C>::new_from_slices(key, iv)
            .map_err(|_| CryptoError::InvalidKeyLength(key.len()))?;
        decryptor
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|_| CryptoError::BadPadding)
    }
}

impl CipherBackend for CbcModeCipher {
    fn name(&self) -> &'static str {
        "cbc"
    }

    fn encrypt(
        &self,
        alg: CipherAlgorithm,
        key: &[u8],
        iv: &[u8],
        plaintext: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        check_key_iv(alg, key, iv)?;
        match alg {
            CipherAlgorithm::Aes256Cbc => Self::encrypt_with::<Aes256>(key, iv, plaintext),
            CipherAlgorithm::Aes128Cbc => Self::encrypt_with::<Aes128>(key, iv, plaintext),
        }
    }

    fn decrypt(
        &self,
        alg: CipherAlgorithm,
        key: &[u8],
        iv: &[u8],
        ciphertext: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        check_key_iv(alg, key, iv)?;
        check_ciphertext_len(ciphertext)?;
        match alg {
            CipherAlgorithm::Aes256Cbc => Self::decrypt_with::<Aes256>(key, iv, ciphertext),
            CipherAlgorithm::Aes128Cbc => Self::decrypt_with::<Aes128>(key, iv, ciphertext),
        }
    }
}

/// CBC chaining and PKCS#7 padding done by hand over the raw AES block cipher
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockChainCipher;

impl BlockChainCipher {
    fn encrypt_with<C: BlockEncrypt + KeyInit>(
        key: &[u8],
        iv: &[u8],
        plaintext: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        let cipher = C::new_from_slice(key).map_err(|_| CryptoError::InvalidKeyLength(key.len()))?;

        let pad = AES_BLOCK_SIZE - plaintext.len() % AES_BLOCK_SIZE;
        let mut data = plaintext.to_vec();
        data.resize(plaintext.len() + pad, pad as u8);

        let mut prev = [0u8; AES_BLOCK_SIZE];
        prev.copy_from_slice(iv);
        for chunk in data.chunks_mut(AES_BLOCK_SIZE) {
            for (b, p) in chunk.iter_mut().zip(prev.iter()) {
                *b ^= p;
            }
            cipher.encrypt_block(GenericArray::from_mut_slice(chunk));
            prev.copy_from_slice(chunk);
        }
        Ok(data)
    }

    fn decrypt_with<C: BlockDecrypt + KeyInit>(
        key: &[u8],
        iv: &[u8],
        ciphertext: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        let cipher = C::new_from_slice(key).map_err(|_| CryptoError::InvalidKeyLength(key.len()))?;

        let mut data = ciphertext.to_vec();
        let mut prev = [0u8; AES_BLOCK_SIZE];
        prev.copy_from_slice(iv);
        for chunk in data.chunks_mut(AES_BLOCK_SIZE) {
            let mut saved = [0u8; AES_BLOCK_SIZE];
            saved.copy_from_slice(chunk);
            cipher.decrypt_block(GenericArray::from_mut_slice(chunk));
            for (b, p) in chunk.iter_mut().zip(prev.iter()) {
                *b ^= p;
            }
            prev = saved;
        }

        let pad = match data.last() {
            Some(&p) if p >= 1 && (p as usize) <= AES_BLOCK_SIZE => p as usize,
            _ => return Err(CryptoError::BadPadding),
        };
        if data[data.len() - pad..].iter().any(|&b| b as usize != pad) {
            return Err(CryptoError::BadPadding);
        }
        data.truncate(data.len() - pad);
        Ok(data)
    }
}

impl CipherBackend for BlockChainCipher {
    fn name(&self) -> &'static str {
        "software"
    }

    fn encrypt(
        &self,
        alg: CipherAlgorithm,
        key: &[u8],
        iv: &[u8],
        plaintext: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        check_key_iv(alg, key, iv)?;
        match alg {
            CipherAlgorithm::Aes256Cbc => Self::encrypt_with::<Aes256>(key, iv, plaintext),
            CipherAlgorithm::Aes128Cbc => Self::encrypt_with::<Aes128>(key, iv, plaintext),
        }
    }

    fn decrypt(
        &self,
        alg: CipherAlgorithm,
        key: &[u8],
        iv: &[u8],
        ciphertext: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        check_key_iv(alg, key, iv)?;
        check_ciphertext_len(ciphertext)?;
        match alg {
            CipherAlgorithm::Aes256Cbc => Self::decrypt_with::<Aes256>(key, iv, ciphertext),
            CipherAlgorithm::Aes128Cbc => Self::decrypt_with::<Aes128>(key, iv, ciphertext),
        }
    }
}

/// PBKDF2 from the `pbkdf2` crate
#[derive(Debug, Clone, Copy, Default)]
pub struct Pbkdf2CrateKdf;

impl KdfBackend for Pbkdf2CrateKdf {
    fn name(&self) -> &'static str {
        "pbkdf2"
    }

    fn pbkdf2_hmac_sha512(
        &self,
        password: &[u8],
        salt: &[u8],
        iterations: u32,
        key_len: usize,
    ) -> Result<Vec<u8>, CryptoError> {
        check_kdf_params(iterations, key_len)?;
        let mut out = vec![0u8; key_len];
        pbkdf2::pbkdf2_hmac::<Sha512>(password, salt, iterations, &mut out);
        Ok(out)
    }
}

/// PBKDF2 (RFC 8018, section 5.2) written as a loop over `hmac`
#[derive(Debug, Clone, Copy, Default)]
pub struct SoftwareKdf;

impl KdfBackend for SoftwareKdf {
    fn name(&self) -> &'static str {
        "software"
    }

    fn pbkdf2_hmac_sha512(
        &self,
        password: &[u8],
        salt: &[u8],
        iterations: u32,
        key_len: usize,
    ) -> Result<Vec<u8>, CryptoError> {
        check_kdf_params(iterations, key_len)?;
        let prf = <Hmac<Sha512> as Mac>::new_from_slice(password)
            .map_err(|_| CryptoError::InvalidKdfParameters("unusable password".into()))?;

        let mut out = Vec::with_capacity(key_len);
        let mut block_index: u32 = 1;
        while out.len() < key_len {
            let mut mac = prf.clone();
            mac.update(salt);
            mac.update(&block_index.to_be_bytes());
            let mut u = mac.finalize().into_bytes();
            let mut t = u;

            for _ in 1..iterations {
                let mut mac = prf.clone();
                mac.update(&u);
                u = mac.finalize().into_bytes();
                for (t_byte, u_byte) in t.iter_mut().zip(u.iter()) {
                    *t_byte ^= u_byte;
                }
            }

            let take = (key_len - out.len()).min(t.len());
            out.extend_from_slice(&t[..take]);
            block_index = block_index.checked_add(1).ok_or_else(|| {
                CryptoError::InvalidKdfParameters("derived key too long".into())
            })?;
        }
        Ok(out)
    }
}

/// The cipher and KDF in use, plus the configured defaults
pub struct CryptoBackends {
    pub cipher: Box<dyn CipherBackend>,
    pub kdf: Box<dyn KdfBackend>,
    pub config: CryptoConfig,
}

const SELF_TEST_KEY: [u8; 32] = [0x2b; 32];
const SELF_TEST_IV: [u8; AES_BLOCK_SIZE] = [0x1f; AES_BLOCK_SIZE];
const SELF_TEST_PLAINTEXT: &[u8] = b"stacks cipher backend self-test";

/// Run the candidate against the hand-written reference and check it round-trips
fn cipher_self_test(candidate: &dyn CipherBackend) -> bool {
    let reference = BlockChainCipher;
    CipherAlgorithm::ALL.iter().all(|alg| {
        let key = &SELF_TEST_KEY[..alg.key_len()];
        let expected = reference.encrypt(*alg, key, &SELF_TEST_IV, SELF_TEST_PLAINTEXT);
        let actual = candidate.encrypt(*alg, key, &SELF_TEST_IV, SELF_TEST_PLAINTEXT);
        match (expected, actual) {
            (Ok(expected), Ok(actual)) if expected == actual => candidate
                .decrypt(*alg, key, &SELF_TEST_IV, &actual)
                .map(|pt| pt == SELF_TEST_PLAINTEXT)
                .unwrap_or(false),
            _ => false,
        }
    })
}

fn kdf_self_test(candidate: &dyn KdfBackend) -> bool {
    let reference = SoftwareKdf.pbkdf2_hmac_sha512(b"password", b"salt", 2, 80);
    let actual = candidate.pbkdf2_hmac_sha512(b"password", b"salt", 2, 80);
    matches!((reference, actual), (Ok(r), Ok(a)) if r == a)
}

fn resolve_cipher(pref: BackendPreference) -> Box<dyn CipherBackend> {
    match pref {
        BackendPreference::Native => Box::new(CbcModeCipher),
        BackendPreference::Software => Box::new(BlockChainCipher),
        BackendPreference::Auto => {
            if cipher_self_test(&CbcModeCipher) {
                Box::new(CbcModeCipher)
            } else {
                warn!("Cipher backend failed self-test, falling back to software";
                      "backend" => CbcModeCipher.name());
                Box::new(BlockChainCipher)
            }
        }
    }
}

fn resolve_kdf(pref: BackendPreference) -> Box<dyn KdfBackend> {
    match pref {
        BackendPreference::Native => Box::new(Pbkdf2CrateKdf),
        BackendPreference::Software => Box::new(SoftwareKdf),
        BackendPreference::Auto => {
            if kdf_self_test(&Pbkdf2CrateKdf) {
                Box::new(Pbkdf2CrateKdf)
            } else {
                warn!("KDF backend failed self-test, falling back to software";
                      "backend" => Pbkdf2CrateKdf.name());
                Box::new(SoftwareKdf)
            }
        }
    }
}

impl CryptoBackends {
    pub fn from_config(config: CryptoConfig) -> CryptoBackends {
        let cipher = resolve_cipher(config.cipher_backend);
        let kdf = resolve_kdf(config.kdf_backend);
        debug!("Resolved crypto backends";
               "cipher" => cipher.name(),
               "kdf" => kdf.name());
        CryptoBackends {
            cipher,
            kdf,
            config,
        }
    }
}

lazy_static! {
    static ref BACKENDS: CryptoBackends =
        CryptoBackends::from_config(CryptoConfig::from_env_or_default());
}

/// The process-wide backends, resolved on first use
pub fn backends() -> &'static CryptoBackends {
    &BACKENDS
}
