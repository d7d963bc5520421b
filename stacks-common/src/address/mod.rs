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

use std::cmp::Ordering;
use std::{error, fmt};

use crate::util::hash::{Hash160, Sha256Sum};
use crate::util::secp256k1::{PublicKey, Secp256k1PublicKey};

pub mod b58;
pub mod c32;

pub const C32_ADDRESS_VERSION_MAINNET_SINGLESIG: u8 = 22; // P
pub const C32_ADDRESS_VERSION_MAINNET_MULTISIG: u8 = 20; // M
pub const C32_ADDRESS_VERSION_TESTNET_SINGLESIG: u8 = 26; // T
pub const C32_ADDRESS_VERSION_TESTNET_MULTISIG: u8 = 21; // N

pub const BITCOIN_ADDRESS_VERSION_MAINNET_SINGLESIG: u8 = 0;
pub const BITCOIN_ADDRESS_VERSION_MAINNET_MULTISIG: u8 = 5;
pub const BITCOIN_ADDRESS_VERSION_TESTNET_SINGLESIG: u8 = 111;
pub const BITCOIN_ADDRESS_VERSION_TESTNET_MULTISIG: u8 = 196;

/// Largest number of keys a multisig redeem script may name
pub const MAX_MULTISIG_KEYS: usize = 15;

const OP_0: u8 = 0x00;
const OP_1_BASE: u8 = 0x50;
const OP_CHECKMULTISIG: u8 = 0xae;

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Error {
    InvalidCrockford32,
    InvalidVersion(u8),
    EmptyData,
    /// Expected checksum, actual checksum
    BadChecksum(u32, u32),
    /// Offending character and its position
    InvalidBase58(char, usize),
    InvalidLength(usize),
    InvalidMultisigConfig(String),
    InvalidPublicKey,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::InvalidCrockford32 => write!(f, "Invalid crockford 32 string"),
            Error::InvalidVersion(ref v) => write!(f, "Invalid version {}", v),
            Error::EmptyData => f.write_str("Empty data"),
            Error::BadChecksum(exp, actual) => write!(
                f,
                "base58ck checksum 0x{:x} does not match expected 0x{:x}",
                actual, exp
            ),
            Error::InvalidBase58(c, pos) => {
                write!(f, "invalid base58 character {:?} at position {}", c, pos)
            }
            Error::InvalidLength(len) => write!(f, "invalid length {}", len),
            Error::InvalidMultisigConfig(ref msg) => write!(f, "invalid multisig: {}", msg),
            Error::InvalidPublicKey => f.write_str("invalid public key"),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        None
    }
}

define_u8_enum!(AddressHashMode {
    // serialization modes for public keys to addresses.
    SerializeP2PKH = 0x00,  // hash160(public-key), same as bitcoin's p2pkh
    SerializeP2SH = 0x01,   // hash160(multisig-redeem-script), same as bitcoin's multisig p2sh
    SerializeP2WPKH = 0x02, // hash160(segwit-program-00(p2pkh)), same as bitcoin's p2sh-p2wpkh
    SerializeP2WSH = 0x03   // hash160(segwit-program-00(public-keys)), same as bitcoin's p2sh-p2wsh
});

impl AddressHashMode {
    pub fn is_multisig(&self) -> bool {
        matches!(
            self,
            AddressHashMode::SerializeP2SH | AddressHashMode::SerializeP2WSH
        )
    }

    pub fn is_segwit(&self) -> bool {
        matches!(
            self,
            AddressHashMode::SerializeP2WPKH | AddressHashMode::SerializeP2WSH
        )
    }

    /// The c32 address version this mode uses on the given network
    pub fn to_version(&self, mainnet: bool) -> u8 {
        match (self.is_multisig(), mainnet) {
            (false, true) => C32_ADDRESS_VERSION_MAINNET_SINGLESIG,
            (true, true) => C32_ADDRESS_VERSION_MAINNET_MULTISIG,
            (false, false) => C32_ADDRESS_VERSION_TESTNET_SINGLESIG,
            (true, false) => C32_ADDRESS_VERSION_TESTNET_MULTISIG,
        }
    }
}

pub fn c32_version_to_b58(version: u8) -> u8 {
    match version {
        C32_ADDRESS_VERSION_MAINNET_SINGLESIG => BITCOIN_ADDRESS_VERSION_MAINNET_SINGLESIG,
        C32_ADDRESS_VERSION_MAINNET_MULTISIG => BITCOIN_ADDRESS_VERSION_MAINNET_MULTISIG,
        C32_ADDRESS_VERSION_TESTNET_SINGLESIG => BITCOIN_ADDRESS_VERSION_TESTNET_SINGLESIG,
        C32_ADDRESS_VERSION_TESTNET_MULTISIG => BITCOIN_ADDRESS_VERSION_TESTNET_MULTISIG,
        x => x,
    }
}

pub fn b58_version_to_c32(version: u8) -> u8 {
    match version {
        BITCOIN_ADDRESS_VERSION_MAINNET_SINGLESIG => C32_ADDRESS_VERSION_MAINNET_SINGLESIG,
        BITCOIN_ADDRESS_VERSION_MAINNET_MULTISIG => C32_ADDRESS_VERSION_MAINNET_MULTISIG,
        BITCOIN_ADDRESS_VERSION_TESTNET_SINGLESIG => C32_ADDRESS_VERSION_TESTNET_SINGLESIG,
        BITCOIN_ADDRESS_VERSION_TESTNET_MULTISIG => C32_ADDRESS_VERSION_TESTNET_MULTISIG,
        x => x,
    }
}

/// Base58Check of `version || hash`
pub fn address_to_b58(version: u8, hash: &[u8]) -> Result<String, Error> {
    if hash.len() != 20 {
        return Err(Error::InvalidLength(hash.len()));
    }
    let mut versioned = Vec::with_capacity(21);
    versioned.push(version);
    versioned.extend_from_slice(hash);
    Ok(b58::check_encode_slice(&versioned))
}

pub fn b58_to_address(addr: &str) -> Result<(u8, Hash160), Error> {
    let bytes = b58::from_check(addr)?;
    if bytes.len() != 21 {
        test_debug!("Invalid address: {} bytes", bytes.len());
        return Err(Error::InvalidLength(bytes.len()));
    }
    let hash = Hash160::from_bytes(&bytes[1..]).ok_or(Error::InvalidLength(bytes.len()))?;
    Ok((bytes[0], hash))
}

fn check_multisig(num_sigs: usize, num_keys: usize) -> Result<(), Error> {
    if num_keys > MAX_MULTISIG_KEYS {
        return Err(Error::InvalidMultisigConfig(format!(
            "{} keys exceeds the maximum of {}",
            num_keys, MAX_MULTISIG_KEYS
        )));
    }
    if num_sigs == 0 || num_sigs > num_keys {
        return Err(Error::InvalidMultisigConfig(format!(
            "cannot require {} of {} signatures",
            num_sigs, num_keys
        )));
    }
    Ok(())
}

/// `OP_m <push pk_1> ... <push pk_n> OP_n OP_CHECKMULTISIG`
pub fn multisig_redeem_script(
    num_sigs: usize,
    pubkeys: &[Secp256k1PublicKey],
) -> Result<Vec<u8>, Error> {
    check_multisig(num_sigs, pubkeys.len())?;
    let mut script = Vec::with_capacity(3 + pubkeys.len() * 66);
    script.push(OP_1_BASE + num_sigs as u8);
    for pubk in pubkeys.iter() {
        let bytes = pubk.to_bytes();
        // keys are 33 or 65 bytes, so a single-byte direct push suffices
        script.push(bytes.len() as u8);
        script.extend_from_slice(&bytes);
    }
    script.push(OP_1_BASE + pubkeys.len() as u8);
    script.push(OP_CHECKMULTISIG);
    Ok(script)
}

/// single-sig address (p2pkh)
pub fn hash_p2pkh(pubk: &Secp256k1PublicKey) -> Hash160 {
    Hash160::from_data(&pubk.to_bytes())
}

/// multi-sig address (p2sh)
pub fn hash_p2sh(num_sigs: usize, pubkeys: &[Secp256k1PublicKey]) -> Result<Hash160, Error> {
    let script = multisig_redeem_script(num_sigs, pubkeys)?;
    Ok(Hash160::from_data(&script))
}

/// single-sig segwit address over p2sh (p2sh-p2wpkh)
pub fn hash_p2wpkh(pubk: &Secp256k1PublicKey) -> Hash160 {
    let key_hash = Hash160::from_data(&pubk.to_bytes());
    let mut program = Vec::with_capacity(22);
    program.push(OP_0);
    program.push(20);
    program.extend_from_slice(key_hash.as_bytes());
    Hash160::from_data(&program)
}

/// multisig segwit address over p2sh (p2sh-p2wsh)
pub fn hash_p2wsh(num_sigs: usize, pubkeys: &[Secp256k1PublicKey]) -> Result<Hash160, Error> {
    let script = multisig_redeem_script(num_sigs, pubkeys)?;
    let script_hash = Sha256Sum::from_data(&script);
    let mut program = Vec::with_capacity(34);
    program.push(OP_0);
    program.push(32);
    program.extend_from_slice(script_hash.as_bytes());
    Ok(Hash160::from_data(&program))
}

/// Hash a set of public keys into address bits according to `hash_mode`.
/// Single-key modes require exactly one key and one signature.
/// Segwit modes require every key to be compressed.
pub fn public_keys_to_address_hash(
    hash_mode: &AddressHashMode,
    num_sigs: usize,
    pubkeys: &[Secp256k1PublicKey],
) -> Result<Hash160, Error> {
    if !hash_mode.is_multisig() && (num_sigs != 1 || pubkeys.len() != 1) {
        return Err(Error::InvalidMultisigConfig(format!(
            "{:?} requires exactly one key and one signature",
            hash_mode
        )));
    }
    if hash_mode.is_segwit() && pubkeys.iter().any(|pubk| !pubk.compressed()) {
        return Err(Error::InvalidPublicKey);
    }

    match *hash_mode {
        AddressHashMode::SerializeP2PKH => Ok(hash_p2pkh(&pubkeys[0])),
        AddressHashMode::SerializeP2WPKH => Ok(hash_p2wpkh(&pubkeys[0])),
        AddressHashMode::SerializeP2SH => hash_p2sh(num_sigs, pubkeys),
        AddressHashMode::SerializeP2WSH => hash_p2wsh(num_sigs, pubkeys),
    }
}

/// A versioned 20-byte address hash, displayed as c32
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StacksAddress {
    pub version: u8,
    pub bytes: Hash160,
}

impl_byte_array_message_codec!(Hash160, 20);

impl crate::codec::StacksMessageCodec for StacksAddress {
    fn consensus_serialize<W: std::io::Write>(&self, fd: &mut W) -> Result<(), crate::codec::Error> {
        crate::codec::write_next(fd, &self.version)?;
        crate::codec::write_next(fd, &self.bytes)
    }

    fn consensus_deserialize<R: std::io::Read>(
        fd: &mut R,
    ) -> Result<StacksAddress, crate::codec::Error> {
        let version: u8 = crate::codec::read_next(fd)?;
        if version >= 32 {
            return Err(crate::codec::Error::DeserializeError(format!(
                "Address version byte {} is not c32-encodable",
                version
            )));
        }
        let bytes: Hash160 = crate::codec::read_next(fd)?;
        Ok(StacksAddress { version, bytes })
    }
}

impl PartialOrd for StacksAddress {
    fn partial_cmp(&self, other: &StacksAddress) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for StacksAddress {
    fn cmp(&self, other: &StacksAddress) -> Ordering {
        match self.version.cmp(&other.version) {
            Ordering::Equal => self.bytes.cmp(&other.bytes),
            inequality => inequality,
        }
    }
}

impl StacksAddress {
    pub fn new(version: u8, hash: Hash160) -> Result<StacksAddress, Error> {
        if version >= 32 {
            return Err(Error::InvalidVersion(version));
        }
        Ok(StacksAddress {
            version,
            bytes: hash,
        })
    }

    pub fn is_mainnet(&self) -> bool {
        matches!(
            self.version,
            C32_ADDRESS_VERSION_MAINNET_MULTISIG | C32_ADDRESS_VERSION_MAINNET_SINGLESIG
        )
    }

    pub fn burn_address(mainnet: bool) -> StacksAddress {
        StacksAddress {
            version: AddressHashMode::SerializeP2PKH.to_version(mainnet),
            bytes: Hash160([0u8; 20]),
        }
    }

    pub fn is_burn(&self) -> bool {
        self.bytes == Hash160([0u8; 20])
    }

    /// Generate an address from a given address hash mode, signature threshold, and list of
    /// public keys.
    pub fn from_public_keys(
        version: u8,
        hash_mode: &AddressHashMode,
        num_sigs: usize,
        pubkeys: &[Secp256k1PublicKey],
    ) -> Result<StacksAddress, Error> {
        let hash_bits = public_keys_to_address_hash(hash_mode, num_sigs, pubkeys)?;
        StacksAddress::new(version, hash_bits)
    }

    /// Make a P2PKH StacksAddress
    pub fn p2pkh(mainnet: bool, pubkey: &Secp256k1PublicKey) -> StacksAddress {
        StacksAddress {
            version: AddressHashMode::SerializeP2PKH.to_version(mainnet),
            bytes: hash_p2pkh(pubkey),
        }
    }

    pub fn from_string(s: &str) -> Result<StacksAddress, Error> {
        let (version, bytes) = c32::c32_address_decode(s)?;
        let hash = Hash160::from_bytes(&bytes).ok_or(Error::InvalidLength(bytes.len()))?;
        Ok(StacksAddress {
            version,
            bytes: hash,
        })
    }

    /// Base58Check form, with the version byte translated to its bitcoin counterpart
    pub fn to_b58(&self) -> String {
        let mut versioned = Vec::with_capacity(21);
        versioned.push(c32_version_to_b58(self.version));
        versioned.extend_from_slice(self.bytes.as_bytes());
        b58::check_encode_slice(&versioned)
    }

    pub fn from_b58(addr: &str) -> Result<StacksAddress, Error> {
        let (version, bytes) = b58_to_address(addr)?;
        StacksAddress::new(b58_version_to_c32(version), bytes)
    }
}

impl fmt::Display for StacksAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // version is always < 32 by construction
        match c32::c32_address(self.version, self.bytes.as_bytes()) {
            Ok(s) => fmt::Display::fmt(&s, f),
            Err(_) => Err(fmt::Error),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::codec::StacksMessageCodec;
    use crate::util::hash::hex_bytes;

    struct ScriptPubkeyFixture {
        keys: Vec<Secp256k1PublicKey>,
        num_required: usize,
        hash_mode: AddressHashMode,
        result: &'static str,
    }

    fn pubkey(hex: &str) -> Secp256k1PublicKey {
        Secp256k1PublicKey::from_hex(hex).unwrap()
    }

    #[test]
    fn test_public_keys_to_address_hash() {
        let fixtures = vec![
            ScriptPubkeyFixture {
                keys: vec![pubkey("040fadbbcea0ff3b05f03195b41cd991d7a0af8bd38559943aec99cbdaf0b22cc806b9a4f07579934774cc0c155e781d45c989f94336765e88a66d91cfb9f060b0")],
                num_required: 1,
                hash_mode: AddressHashMode::SerializeP2PKH,
                result: "395f3643cea07ec4eec73b4d9a973dcce56b9bf1",
            },
            ScriptPubkeyFixture {
                keys: vec![
                    pubkey("040fadbbcea0ff3b05f03195b41cd991d7a0af8bd38559943aec99cbdaf0b22cc806b9a4f07579934774cc0c155e781d45c989f94336765e88a66d91cfb9f060b0"),
                    pubkey("04c77f262dda02580d65c9069a8a34c56bd77325bba4110b693b90216f5a3edc0bebc8ce28d61aa86b414aa91ecb29823b11aeed06098fcd97fee4bc73d54b1e96"),
                ],
                num_required: 2,
                hash_mode: AddressHashMode::SerializeP2SH,
                result: "fd3a5e9f5ba311ce6122765f0af8da7488e25d3a",
            },
            ScriptPubkeyFixture {
                keys: vec![pubkey("020fadbbcea0ff3b05f03195b41cd991d7a0af8bd38559943aec99cbdaf0b22cc8")],
                num_required: 1,
                hash_mode: AddressHashMode::SerializeP2WPKH,
                result: "0ac7ad046fe22c794dd923b3be14b2e668e50c42",
            },
            ScriptPubkeyFixture {
                keys: vec![
                    pubkey("020fadbbcea0ff3b05f03195b41cd991d7a0af8bd38559943aec99cbdaf0b22cc8"),
                    pubkey("02c77f262dda02580d65c9069a8a34c56bd77325bba4110b693b90216f5a3edc0b"),
                ],
                num_required: 2,
                hash_mode: AddressHashMode::SerializeP2WSH,
                result: "3e02fa83ac2fae11fd6703b91e7c94ad393052e2",
            },
        ];

        for fixture in fixtures {
            let hash =
                public_keys_to_address_hash(&fixture.hash_mode, fixture.num_required, &fixture.keys)
                    .unwrap();
            assert_eq!(hash.to_hex(), fixture.result);
        }
    }

    #[test]
    fn test_multisig_limits() {
        let keys: Vec<_> = (0..16)
            .map(|_| crate::util::secp256k1::Secp256k1PrivateKey::random().public_key())
            .collect();

        match hash_p2sh(2, &keys) {
            Err(Error::InvalidMultisigConfig(_)) => {}
            x => panic!("expected multisig error, got {:?}", x),
        }
        assert!(hash_p2sh(2, &keys[..15]).is_ok());
        assert!(hash_p2wsh(15, &keys[..15]).is_ok());
        assert!(hash_p2sh(0, &keys[..3]).is_err());
        assert!(hash_p2sh(4, &keys[..3]).is_err());
        assert!(public_keys_to_address_hash(&AddressHashMode::SerializeP2PKH, 1, &keys[..2]).is_err());

        let script = multisig_redeem_script(2, &keys[..3]).unwrap();
        assert_eq!(script[0], 0x52);
        assert_eq!(script[1], 33);
        assert_eq!(script[script.len() - 2], 0x53);
        assert_eq!(script[script.len() - 1], 0xae);
        assert_eq!(script.len(), 3 + 3 * 34);
    }

    #[test]
    fn test_segwit_requires_compressed_keys() {
        let mut pk = pubkey("020fadbbcea0ff3b05f03195b41cd991d7a0af8bd38559943aec99cbdaf0b22cc8");
        pk.set_compressed(false);
        assert_eq!(
            public_keys_to_address_hash(&AddressHashMode::SerializeP2WPKH, 1, &[pk.clone()]),
            Err(Error::InvalidPublicKey)
        );
        assert!(public_keys_to_address_hash(&AddressHashMode::SerializeP2PKH, 1, &[pk]).is_ok());
    }

    #[test]
    fn test_b58_addresses() {
        let fixtures = [
            ("mr6nrMvvh44sR5MiX929mMXP5hqgaTr6fx", 111, "74178497e927ff3ff1428a241be454d393c3c91c"),
            ("1B5xoFjSwAB3DUum7dxXgj3brnYsXibLbc", 0, "6ea17fc39169cdd9f2414a893aa5ce0c4b4c8934"),
            ("2Mxh5a9QxP5jgABfzATLpmFVofbzDeFRJyt", 196, "3bbc6b200412398dc98c6eb49d20c6b01715c2c1"),
            ("35idohuiQNndP1xR3FhNVHXgKF9YYPhWo4", 5, "2c2edf39b098e05cf770e6b5a2fcedb54ee4fe05"),
        ];
        for (addr, version, hash) in fixtures.iter() {
            let (v, h) = b58_to_address(addr).unwrap();
            assert_eq!(v, *version);
            assert_eq!(h.to_hex(), *hash);
            assert_eq!(&address_to_b58(v, h.as_bytes()).unwrap(), addr);
        }

        // too long, bad checksum, too short
        assert!(b58_to_address("1R37rTejZ9zhAhuJcgdpSwnzqGY4AoREGYw").is_err());
        assert!(b58_to_address("1B5xoFjSwAB3DUum7dxXgj3brnYsXibLbd").is_err());
        assert!(b58_to_address("Couv2wqrdtpEqrS1vQZZ9zb7WgUf6Z3e").is_err());
        assert_eq!(address_to_b58(0, &[0u8; 19]), Err(Error::InvalidLength(19)));
    }

    #[test]
    fn test_stacks_address() {
        let addr = StacksAddress::from_string("SP2J6ZY48GV1EZ5V2V5RB9MP66SW86PYKKNRV9EJ7").unwrap();
        assert_eq!(addr.version, C32_ADDRESS_VERSION_MAINNET_SINGLESIG);
        assert_eq!(
            addr.bytes,
            Hash160::from_hex("a46ff88886c2ef9762d970b4d2c63678835bd39d").unwrap()
        );
        assert!(addr.is_mainnet());
        assert_eq!(addr.to_string(), "SP2J6ZY48GV1EZ5V2V5RB9MP66SW86PYKKNRV9EJ7");
        assert_eq!(StacksAddress::from_b58(&addr.to_b58()).unwrap(), addr);

        let bytes = addr.serialize_to_vec();
        assert_eq!(bytes.len(), 21);
        assert_eq!(
            StacksAddress::consensus_deserialize(&mut &bytes[..]).unwrap(),
            addr
        );

        assert_eq!(
            StacksAddress::new(32, Hash160([0u8; 20])),
            Err(Error::InvalidVersion(32))
        );
        assert!(StacksAddress::burn_address(false).is_burn());
        assert_eq!(
            StacksAddress::burn_address(true).to_string(),
            "SP000000000000000000002Q6VF78"
        );

        let pk = pubkey("020fadbbcea0ff3b05f03195b41cd991d7a0af8bd38559943aec99cbdaf0b22cc8");
        let p2pkh = StacksAddress::p2pkh(false, &pk);
        assert_eq!(p2pkh.version, C32_ADDRESS_VERSION_TESTNET_SINGLESIG);
        assert_eq!(
            StacksAddress::from_public_keys(
                C32_ADDRESS_VERSION_TESTNET_SINGLESIG,
                &AddressHashMode::SerializeP2PKH,
                1,
                &[pk]
            )
            .unwrap(),
            p2pkh
        );
        assert_eq!(hex_bytes(&p2pkh.bytes.to_hex()).unwrap().len(), 20);
    }
}
