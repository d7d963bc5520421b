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

//! ECIES over secp256k1: ECDH, SHA-512 key split, AES-CBC, HMAC-SHA256.

use rand::RngCore;
use subtle::ConstantTimeEq;

use super::backend::{backends, CipherAlgorithm, CipherBackend, AES_BLOCK_SIZE};
use super::CryptoError;
use crate::config::CryptoConfig;
use crate::util::encoding::{from_base64, to_base64};
use crate::util::hash::{hex_bytes, hmac_sha256, to_hex, Sha256Sum, Sha512Sum};
use crate::util::secp256k1::{ecdh_shared_x, Secp256k1PrivateKey, Secp256k1PublicKey};

/// hex length of a 16-byte IV
const IV_HEX_LEN: usize = 32;
/// hex length of a compressed public key
const PUBKEY_HEX_LEN: usize = 66;
/// hex length of an HMAC-SHA256 tag
const MAC_HEX_LEN: usize = 64;
/// hex length of the longest DER-encoded secp256k1 signature
const MAX_DER_SIG_HEX_LEN: usize = 144;

define_named_enum!(CipherTextEncoding {
    Hex("hex"),
    Base64("base64"),
});

impl CipherTextEncoding {
    pub fn encode(&self, data: &[u8]) -> String {
        match self {
            CipherTextEncoding::Hex => to_hex(data),
            CipherTextEncoding::Base64 => to_base64(data),
        }
    }

    pub fn decode(&self, data: &str) -> Result<Vec<u8>, EciesError> {
        match self {
            CipherTextEncoding::Hex => hex_bytes(data)
                .map_err(|e| EciesError::InvalidCipherObject(format!("cipherText: {e}"))),
            CipherTextEncoding::Base64 => from_base64(data)
                .map_err(|e| EciesError::InvalidCipherObject(format!("cipherText: {e}"))),
        }
    }

    /// Length of `encode()` for `len` input bytes
    pub fn encoded_len(&self, len: usize) -> usize {
        match self {
            CipherTextEncoding::Hex => len * 2,
            CipherTextEncoding::Base64 => (len + 2) / 3 * 4,
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EciesError {
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),
    #[error("invalid private key")]
    InvalidPrivateKey,
    #[error("invalid cipher object: {0}")]
    InvalidCipherObject(String),
    /// MAC or signature mismatch
    #[error("{0}")]
    Verification(String),
    #[error("signing failed: {0}")]
    Signing(String),
    #[error("decrypted content is not valid UTF-8")]
    InvalidUtf8,
    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

/// The encrypted envelope, as exchanged in JSON
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CipherObject {
    pub iv: String,
    #[serde(rename = "ephemeralPK")]
    pub ephemeral_pk: String,
    #[serde(rename = "cipherText")]
    pub cipher_text: String,
    pub mac: String,
    #[serde(rename = "wasString")]
    pub was_string: bool,
    #[serde(
        rename = "cipherTextEncoding",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub cipher_text_encoding: Option<CipherTextEncoding>,
}

/// A cipher object JSON string with a detached signature over its SHA-256
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SignedCipherObject {
    /// DER, hex-encoded
    pub signature: String,
    #[serde(rename = "publicKey")]
    pub public_key: String,
    #[serde(rename = "cipherText")]
    pub cipher_text: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum EncryptedContent {
    Signed(SignedCipherObject),
    Plain(CipherObject),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecryptedContent {
    Text(String),
    Bytes(Vec<u8>),
}

impl DecryptedContent {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            DecryptedContent::Text(s) => s.as_bytes(),
            DecryptedContent::Bytes(b) => b,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EciesOptions {
    pub cipher: CipherAlgorithm,
    pub cipher_text_encoding: CipherTextEncoding,
}

impl EciesOptions {
    pub fn from_config(config: &CryptoConfig) -> EciesOptions {
        EciesOptions {
            cipher: config.default_cipher,
            cipher_text_encoding: config.default_cipher_text_encoding,
        }
    }
}

impl Default for EciesOptions {
    fn default() -> Self {
        EciesOptions::from_config(&backends().config)
    }
}

#[derive(Debug, Clone, Default)]
pub struct EncryptContentOptions {
    /// Recipient key. Derived from `private_key` when absent.
    pub public_key: Option<String>,
    /// Required when `sign` is set
    pub private_key: Option<String>,
    pub sign: bool,
    pub cipher_text_encoding: Option<CipherTextEncoding>,
    pub was_string: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PredictOptions {
    pub content_length: usize,
    pub was_string: bool,
    pub sign: bool,
    pub cipher_text_encoding: CipherTextEncoding,
}

struct SharedKeys {
    encryption_key: Vec<u8>,
    hmac_key: [u8; 32],
}

fn shared_keys(
    privkey: &Secp256k1PrivateKey,
    pubkey: &Secp256k1PublicKey,
    cipher: CipherAlgorithm,
) -> SharedKeys {
    let hashed = Sha512Sum::from_data(&ecdh_shared_x(privkey, pubkey));
    let mut hmac_key = [0u8; 32];
    hmac_key.copy_from_slice(&hashed.as_bytes()[32..]);
    SharedKeys {
        encryption_key: hashed.as_bytes()[..cipher.key_len()].to_vec(),
        hmac_key,
    }
}

fn compute_mac(hmac_key: &[u8], iv: &[u8], ephemeral_pk: &[u8], cipher_text: &[u8]) -> [u8; 32] {
    let mut mac_data = Vec::with_capacity(iv.len() + ephemeral_pk.len() + cipher_text.len());
    mac_data.extend_from_slice(iv);
    mac_data.extend_from_slice(ephemeral_pk);
    mac_data.extend_from_slice(cipher_text);
    hmac_sha256(hmac_key, &mac_data)
}

fn parse_public_key(public_key_hex: &str) -> Result<Secp256k1PublicKey, EciesError> {
    Secp256k1PublicKey::from_hex(public_key_hex).map_err(|_| {
        debug!("Rejected ECIES public key"; "len" => public_key_hex.len());
        EciesError::InvalidPublicKey(public_key_hex.to_string())
    })
}

fn parse_private_key(private_key_hex: &str) -> Result<Secp256k1PrivateKey, EciesError> {
    Secp256k1PrivateKey::from_hex(private_key_hex).map_err(|_| EciesError::InvalidPrivateKey)
}

fn decode_hex_field(name: &str, value: &str) -> Result<Vec<u8>, EciesError> {
    hex_bytes(value).map_err(|e| EciesError::InvalidCipherObject(format!("{name}: {e}")))
}

/// Encrypt `content` to `public_key_hex` with the process-wide cipher backend
pub fn encrypt_ecies(
    public_key_hex: &str,
    content: &[u8],
    was_string: bool,
    options: &EciesOptions,
) -> Result<CipherObject, EciesError> {
    encrypt_ecies_with(
        public_key_hex,
        content,
        was_string,
        options,
        backends().cipher.as_ref(),
    )
}

pub fn encrypt_ecies_with(
    public_key_hex: &str,
    content: &[u8],
    was_string: bool,
    options: &EciesOptions,
    cipher: &dyn CipherBackend,
) -> Result<CipherObject, EciesError> {
    let recipient = parse_public_key(public_key_hex)?;
    let ephemeral = Secp256k1PrivateKey::random();
    let ephemeral_pk = ephemeral.public_key().to_bytes_compressed();
    let keys = shared_keys(&ephemeral, &recipient, options.cipher);

    let mut iv = [0u8; AES_BLOCK_SIZE];
    rand::thread_rng().fill_bytes(&mut iv);

    let cipher_text = cipher.encrypt(options.cipher, &keys.encryption_key, &iv, content)?;
    let mac = compute_mac(&keys.hmac_key, &iv, &ephemeral_pk, &cipher_text);

    let cipher_text_encoding = match options.cipher_text_encoding {
        CipherTextEncoding::Hex => None,
        other => Some(other),
    };

    Ok(CipherObject {
        iv: to_hex(&iv),
        ephemeral_pk: to_hex(&ephemeral_pk),
        cipher_text: options.cipher_text_encoding.encode(&cipher_text),
        mac: to_hex(&mac),
        was_string,
        cipher_text_encoding,
    })
}

/// Decrypt with the process-wide cipher backend. The cipher object does not
/// name its cipher, so `options.cipher` must match the one it was encrypted
/// with. The cipher text encoding is read off the object itself.
pub fn decrypt_ecies(
    private_key_hex: &str,
    cipher_object: &CipherObject,
    options: &EciesOptions,
) -> Result<DecryptedContent, EciesError> {
    decrypt_ecies_with(
        private_key_hex,
        cipher_object,
        options.cipher,
        backends().cipher.as_ref(),
    )
}

/// The MAC is checked before anything is decrypted.
pub fn decrypt_ecies_with(
    private_key_hex: &str,
    cipher_object: &CipherObject,
    cipher_alg: CipherAlgorithm,
    cipher: &dyn CipherBackend,
) -> Result<DecryptedContent, EciesError> {
    let privkey = parse_private_key(private_key_hex)?;
    let ephemeral = parse_public_key(&cipher_object.ephemeral_pk)?;
    let keys = shared_keys(&privkey, &ephemeral, cipher_alg);

    let iv = decode_hex_field("iv", &cipher_object.iv)?;
    let expected_mac = decode_hex_field("mac", &cipher_object.mac)?;
    let encoding = cipher_object
        .cipher_text_encoding
        .unwrap_or(CipherTextEncoding::Hex);
    let cipher_text = encoding.decode(&cipher_object.cipher_text)?;

    let actual_mac = compute_mac(
        &keys.hmac_key,
        &iv,
        &ephemeral.to_bytes_compressed(),
        &cipher_text,
    );
    if !bool::from(actual_mac.as_slice().ct_eq(expected_mac.as_slice())) {
        debug!("ECIES MAC check failed";
               "cipher_text_len" => cipher_text.len(),
               "encoding" => %encoding);
        return Err(EciesError::Verification("failure in MAC check".into()));
    }

    let plaintext = cipher.decrypt(cipher_alg, &keys.encryption_key, &iv, &cipher_text)?;
    if cipher_object.was_string {
        String::from_utf8(plaintext)
            .map(DecryptedContent::Text)
            .map_err(|_| EciesError::InvalidUtf8)
    } else {
        Ok(DecryptedContent::Bytes(plaintext))
    }
}

/// Sign the JSON text of a cipher object
pub fn sign_ecies(
    private_key_hex: &str,
    cipher_object_json: &str,
) -> Result<SignedCipherObject, EciesError> {
    let privkey = parse_private_key(private_key_hex)?;
    let hash = Sha256Sum::from_data(cipher_object_json.as_bytes());
    let signature = privkey
        .sign_der(hash.as_bytes())
        .map_err(|e| EciesError::Signing(e.to_string()))?;
    Ok(SignedCipherObject {
        signature: to_hex(&signature),
        public_key: to_hex(&privkey.public_key().to_bytes_compressed()),
        cipher_text: cipher_object_json.to_string(),
    })
}

/// `Ok(false)` on a signature mismatch, `Err` on a malformed key or signature
pub fn verify_ecies(signed: &SignedCipherObject) -> Result<bool, EciesError> {
    let pubkey = parse_public_key(&signed.public_key)?;
    let signature = decode_hex_field("signature", &signed.signature)?;
    let hash = Sha256Sum::from_data(signed.cipher_text.as_bytes());
    pubkey
        .verify_der(hash.as_bytes(), &signature)
        .map_err(|e| EciesError::InvalidCipherObject(format!("signature: {e}")))
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, EciesError> {
    serde_json::to_string(value).map_err(|e| EciesError::InvalidCipherObject(e.to_string()))
}

/// Encrypt and serialize to JSON, optionally wrapped in a signed envelope
pub fn encrypt_content(
    content: &[u8],
    options: &EncryptContentOptions,
) -> Result<String, EciesError> {
    let public_key = match (&options.public_key, &options.private_key) {
        (Some(public_key), _) => public_key.clone(),
        (None, Some(private_key)) => {
            to_hex(&parse_private_key(private_key)?.public_key().to_bytes_compressed())
        }
        (None, None) => {
            return Err(EciesError::InvalidPublicKey(
                "either a public or a private key is required".into(),
            ))
        }
    };

    let mut ecies_options = EciesOptions::default();
    if let Some(encoding) = options.cipher_text_encoding {
        ecies_options.cipher_text_encoding = encoding;
    }

    let cipher_object = encrypt_ecies(
        &public_key,
        content,
        options.was_string.unwrap_or(false),
        &ecies_options,
    )?;
    let cipher_object_json = to_json(&cipher_object)?;

    if !options.sign {
        return Ok(cipher_object_json);
    }
    let private_key = options.private_key.as_deref().ok_or_else(|| {
        EciesError::Signing("a private key is required to sign encrypted content".into())
    })?;
    to_json(&sign_ecies(private_key, &cipher_object_json)?)
}

/// Decrypt either a plain or a signed cipher object JSON string
pub fn decrypt_content(json: &str, private_key_hex: &str) -> Result<DecryptedContent, EciesError> {
    let parsed: EncryptedContent = serde_json::from_str(json)
        .map_err(|e| EciesError::InvalidCipherObject(e.to_string()))?;

    let cipher_object = match parsed {
        EncryptedContent::Plain(cipher_object) => cipher_object,
        EncryptedContent::Signed(signed) => {
            if !verify_ecies(&signed)? {
                debug!("Signed cipher object failed signature check";
                       "public_key" => %signed.public_key);
                return Err(EciesError::Verification(
                    "signature does not match the cipher text".into(),
                ));
            }
            serde_json::from_str(&signed.cipher_text)
                .map_err(|e| EciesError::InvalidCipherObject(e.to_string()))?
        }
    };

    decrypt_ecies(private_key_hex, &cipher_object, &EciesOptions::default())
}

/// Length of the JSON `encrypt_content` would produce. Exact for unsigned
/// output. For signed output it assumes the longest DER signature, so real
/// output may be up to a few bytes shorter.
pub fn predict_ciphertext_length(options: &PredictOptions) -> Result<usize, EciesError> {
    let cipher_text_len = options
        .cipher_text_encoding
        .encoded_len(CipherAlgorithm::ciphertext_len(options.content_length));

    let placeholder = CipherObject {
        iv: "0".repeat(IV_HEX_LEN),
        ephemeral_pk: "0".repeat(PUBKEY_HEX_LEN),
        cipher_text: "0".repeat(cipher_text_len),
        mac: "0".repeat(MAC_HEX_LEN),
        was_string: options.was_string,
        cipher_text_encoding: match options.cipher_text_encoding {
            CipherTextEncoding::Hex => None,
            other => Some(other),
        },
    };
    let placeholder_json = to_json(&placeholder)?;
    if !options.sign {
        return Ok(placeholder_json.len());
    }

    let signed_placeholder = SignedCipherObject {
        signature: "0".repeat(MAX_DER_SIG_HEX_LEN),
        public_key: "0".repeat(PUBKEY_HEX_LEN),
        cipher_text: placeholder_json,
    };
    Ok(to_json(&signed_placeholder)?.len())
}
