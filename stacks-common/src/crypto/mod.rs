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

//! Cryptographic envelope: pluggable cipher/KDF backends, ECIES, signed
//! tokens, BIP32 key derivation and BIP39 mnemonics.

pub mod backend;
pub mod ecies;
pub mod hd;
pub mod mnemonic;
pub mod token;

/// Errors raised by the cipher and KDF backends
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// The key does not match the cipher's key size
    #[error("invalid key length {0}")]
    InvalidKeyLength(usize),
    /// The IV is not one block long
    #[error("invalid IV length {0}")]
    InvalidIvLength(usize),
    /// Ciphertext is empty or not a whole number of blocks
    #[error("invalid ciphertext length {0}")]
    InvalidCiphertextLength(usize),
    /// PKCS#7 padding did not check out after decryption
    #[error("bad padding")]
    BadPadding,
    #[error("invalid KDF parameters: {0}")]
    InvalidKdfParameters(String),
}
