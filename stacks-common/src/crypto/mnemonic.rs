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

//! BIP39 mnemonic sentences over the English word list.

use std::collections::HashMap;

use bip39::Language;
use rand::RngCore;

use super::backend::{backends, KdfBackend};
use super::CryptoError;
use crate::util::hash::Sha256Sum;

pub const SEED_ITERATIONS: u32 = 2048;
pub const SEED_LEN: usize = 64;
const SALT_PREFIX: &str = "mnemonic";
const BITS_PER_WORD: usize = 11;

lazy_static! {
    static ref WORD_INDEX: HashMap<&'static str, u16> = Language::English
        .word_list()
        .iter()
        .enumerate()
        .map(|(i, word)| (*word, i as u16))
        .collect();
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MnemonicError {
    /// Entropy must be 16 to 32 bytes, in steps of 4
    #[error("invalid entropy length {0}")]
    InvalidEntropy(usize),
    #[error("invalid word count {0}")]
    InvalidWordCount(usize),
    #[error("unknown word '{0}'")]
    UnknownWord(String),
    #[error("invalid mnemonic checksum")]
    InvalidChecksum,
    #[error(transparent)]
    Kdf(#[from] CryptoError),
}

fn check_entropy_len(len: usize) -> Result<(), MnemonicError> {
    if !(16..=32).contains(&len) || len % 4 != 0 {
        return Err(MnemonicError::InvalidEntropy(len));
    }
    Ok(())
}

fn bit_at(data: &[u8], index: usize) -> bool {
    data[index / 8] & (0x80 >> (index % 8)) != 0
}

pub fn entropy_to_mnemonic(entropy: &[u8]) -> Result<String, MnemonicError> {
    check_entropy_len(entropy.len())?;
    let checksum_bits = entropy.len() / 4;
    let checksum = Sha256Sum::from_data(entropy);

    let mut bits = entropy.to_vec();
    bits.push(checksum.as_bytes()[0]);
    let word_count = (entropy.len() * 8 + checksum_bits) / BITS_PER_WORD;

    let word_list = Language::English.word_list();
    let words: Vec<&str> = (0..word_count)
        .map(|w| {
            let index = (0..BITS_PER_WORD).fold(0usize, |acc, b| {
                (acc << 1) | bit_at(&bits, w * BITS_PER_WORD + b) as usize
            });
            word_list[index]
        })
        .collect();
    Ok(words.join(" "))
}

pub fn mnemonic_to_entropy(mnemonic: &str) -> Result<Vec<u8>, MnemonicError> {
    let words: Vec<&str> = mnemonic.split_whitespace().collect();
    if words.len() < 12 || words.len() > 24 || words.len() % 3 != 0 {
        return Err(MnemonicError::InvalidWordCount(words.len()));
    }

    let total_bits = words.len() * BITS_PER_WORD;
    let checksum_bits = total_bits / 33;
    let entropy_len = (total_bits - checksum_bits) / 8;

    // entropy plus one checksum byte; at most 8 checksum bits
    let mut bits = vec![0u8; entropy_len + 1];
    for (w, word) in words.iter().enumerate() {
        let index = *WORD_INDEX
            .get(*word)
            .ok_or_else(|| MnemonicError::UnknownWord(word.to_string()))?;
        for b in 0..BITS_PER_WORD {
            if index & (1 << (BITS_PER_WORD - 1 - b)) != 0 {
                let pos = w * BITS_PER_WORD + b;
                bits[pos / 8] |= 0x80 >> (pos % 8);
            }
        }
    }

    let entropy = bits[..entropy_len].to_vec();
    let mask = 0xffu8 << (8 - checksum_bits);
    let expected = Sha256Sum::from_data(&entropy).as_bytes()[0] & mask;
    if bits[entropy_len] != expected {
        return Err(MnemonicError::InvalidChecksum);
    }
    Ok(entropy)
}

pub fn validate_mnemonic(mnemonic: &str) -> bool {
    mnemonic_to_entropy(mnemonic).is_ok()
}

/// PBKDF2-HMAC-SHA512 with salt `"mnemonic" + passphrase`, through the
/// process-wide KDF backend. The mnemonic is not validated. Input is used
/// as given, so non-ASCII text must already be NFKD-normalized.
pub fn mnemonic_to_seed(mnemonic: &str, passphrase: &str) -> Result<Vec<u8>, MnemonicError> {
    mnemonic_to_seed_with(mnemonic, passphrase, backends().kdf.as_ref())
}

pub fn mnemonic_to_seed_with(
    mnemonic: &str,
    passphrase: &str,
    kdf: &dyn KdfBackend,
) -> Result<Vec<u8>, MnemonicError> {
    let salt = format!("{SALT_PREFIX}{passphrase}");
    Ok(kdf.pbkdf2_hmac_sha512(mnemonic.as_bytes(), salt.as_bytes(), SEED_ITERATIONS, SEED_LEN)?)
}

/// A fresh mnemonic of `strength_bits` bits of entropy (128 to 256, in steps of 32)
pub fn generate_mnemonic(strength_bits: usize) -> Result<String, MnemonicError> {
    if strength_bits % 8 != 0 {
        return Err(MnemonicError::InvalidEntropy(strength_bits / 8));
    }
    let len = strength_bits / 8;
    check_entropy_len(len)?;
    let mut entropy = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut entropy);
    entropy_to_mnemonic(&entropy)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::crypto::backend::{Pbkdf2CrateKdf, SoftwareKdf};
    use crate::util::hash::{hex_bytes, to_hex};

    #[rstest]
    #[case(
        "00000000000000000000000000000000",
        "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about",
        "c55257c360c07c72029aebc1b53c05ed0362ada38ead3e3e9efa3708e53495531f09a6987599d18264c1e1c92f2cf141630c7a3c4ab7c81b2f001698e7463b04"
    )]
    #[case(
        "7f7f7f7f7f7f7f7f7f7f7f7f7f7f7f7f",
        "legal winner thank year wave sausage worth useful legal winner thank yellow",
        "2e8905819b8723fe2c1d161860e5ee1830318dbf49a83bd451cfb8440c28bd6fa457fe1296106559a3c80937a1c1069be3a3a5bd381ee6260e8d9739fce1f607"
    )]
    #[case(
        "ffffffffffffffffffffffffffffffff",
        "zoo zoo zoo zoo zoo zoo zoo zoo zoo zoo zoo wrong",
        "ac27495480225222079d7be181583751e86f571027b0497b5b5d11218e0a8a13332572917f0f8e5a589620c6f15b11c61dee327651a14c34e18231052e48c069"
    )]
    #[case(
        "0000000000000000000000000000000000000000000000000000000000000000",
        "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon art",
        "bda85446c68413707090a52022edd26a1c9462295029f2e60cd7c4f2bbd3097170af7a4d73245cafa9c3cca8d561a7c3de6f5d4a10be8ed2a5e608d68f92fcc8"
    )]
    fn test_trezor_vectors(#[case] entropy: &str, #[case] mnemonic: &str, #[case] seed: &str) {
        let entropy = hex_bytes(entropy).unwrap();
        assert_eq!(entropy_to_mnemonic(&entropy).unwrap(), mnemonic);
        assert_eq!(mnemonic_to_entropy(mnemonic).unwrap(), entropy);
        assert!(validate_mnemonic(mnemonic));
        assert_eq!(to_hex(&mnemonic_to_seed(mnemonic, "TREZOR").unwrap()), seed);
        assert_eq!(
            to_hex(&mnemonic_to_seed_with(mnemonic, "TREZOR", &SoftwareKdf).unwrap()),
            seed
        );
    }

    #[rstest]
    #[case(
        "80808080808080808080808080808080",
        "letter advice cage absurd amount doctor acoustic avoid letter advice cage above"
    )]
    #[case(
        "ffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffff",
        "zoo zoo zoo zoo zoo zoo zoo zoo zoo zoo zoo zoo zoo zoo zoo zoo zoo zoo zoo zoo zoo zoo zoo vote"
    )]
    fn test_entropy_mnemonic(#[case] entropy: &str, #[case] mnemonic: &str) {
        let entropy = hex_bytes(entropy).unwrap();
        assert_eq!(entropy_to_mnemonic(&entropy).unwrap(), mnemonic);
        assert_eq!(mnemonic_to_entropy(mnemonic).unwrap(), entropy);
    }

    #[rstest]
    #[case(0)]
    #[case(15)]
    #[case(18)]
    #[case(33)]
    fn test_invalid_entropy(#[case] len: usize) {
        assert_eq!(
            entropy_to_mnemonic(&vec![0u8; len]),
            Err(MnemonicError::InvalidEntropy(len))
        );
    }

    #[test]
    fn test_invalid_mnemonics() {
        assert_eq!(
            mnemonic_to_entropy("abandon abandon abandon"),
            Err(MnemonicError::InvalidWordCount(3))
        );
        assert_eq!(
            mnemonic_to_entropy(
                "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon"
            ),
            Err(MnemonicError::InvalidWordCount(11))
        );
        assert_eq!(
            mnemonic_to_entropy(
                "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon stacks"
            ),
            Err(MnemonicError::UnknownWord("stacks".into()))
        );
        assert_eq!(
            mnemonic_to_entropy(
                "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon"
            ),
            Err(MnemonicError::InvalidChecksum)
        );
        assert!(!validate_mnemonic("zoo zoo zoo zoo zoo zoo zoo zoo zoo zoo zoo zoo"));
    }

    #[rstest]
    #[case(128, 12)]
    #[case(160, 15)]
    #[case(192, 18)]
    #[case(224, 21)]
    #[case(256, 24)]
    fn test_generate(#[case] strength: usize, #[case] words: usize) {
        let mnemonic = generate_mnemonic(strength).unwrap();
        assert_eq!(mnemonic.split(' ').count(), words);
        assert!(validate_mnemonic(&mnemonic));
        assert_ne!(mnemonic, generate_mnemonic(strength).unwrap());
    }

    #[test]
    fn test_generate_bad_strength() {
        assert!(generate_mnemonic(100).is_err());
        assert!(generate_mnemonic(64).is_err());
        assert!(generate_mnemonic(288).is_err());
    }

    #[test]
    fn test_seed_feeds_hd() {
        use crate::crypto::hd::ExtendedKey;

        let mnemonic = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";
        let seed = mnemonic_to_seed_with(mnemonic, "", &Pbkdf2CrateKdf).unwrap();
        let root = ExtendedKey::from_seed(&seed).unwrap();
        let account = root.derive_path("m/44'/5757'/0'/0/0").unwrap();
        assert_eq!(account.depth, 5);
        assert!(account.private_key().is_some());
    }
}
