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

//! JWT-compatible tokens signed with ES256K: `b64url(header).b64url(payload).b64url(r || s)`

use serde::Serialize;
use serde_json::{Map, Value as JsonValue};

use crate::util::encoding::{from_base64_url, to_base64_url};
use crate::util::hash::Sha256Sum;
use crate::util::secp256k1::{Secp256k1PrivateKey, Secp256k1PublicKey};

define_named_enum!(SigningAlgorithm {
    ES256K("ES256K"),
});

const UNSECURED_ALG: &str = "none";

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("unsupported signing algorithm: {0}")]
    UnsupportedAlgorithm(String),
    #[error("invalid private key")]
    InvalidPrivateKey,
    #[error("invalid public key")]
    InvalidPublicKey,
    #[error("malformed token: {0}")]
    MalformedToken(String),
    #[error("JSON error: {0}")]
    Json(String),
    #[error("signing failed: {0}")]
    Signing(String),
}

/// `typ` and `alg` always come first, followed by any custom fields
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TokenHeader {
    pub typ: String,
    pub alg: String,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

impl TokenHeader {
    fn new(alg: &str) -> TokenHeader {
        TokenHeader {
            typ: "JWT".into(),
            alg: alg.into(),
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecodedToken {
    pub header: TokenHeader,
    pub payload: JsonValue,
    /// still base64url-encoded; empty for unsecured tokens
    pub signature: String,
}

/// JSON serialization form of a signed token
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SignedTokenExpanded {
    pub header: Vec<String>,
    /// the payload as a JSON string
    pub payload: String,
    pub signature: Vec<String>,
}

fn encode_segment<T: Serialize>(value: &T) -> Result<String, TokenError> {
    let json = serde_json::to_string(value).map_err(|e| TokenError::Json(e.to_string()))?;
    Ok(to_base64_url(json.as_bytes()))
}

fn decode_segment<T: serde::de::DeserializeOwned>(name: &str, segment: &str) -> Result<T, TokenError> {
    let bytes = from_base64_url(segment)
        .map_err(|e| TokenError::MalformedToken(format!("{name}: {e}")))?;
    serde_json::from_slice(&bytes).map_err(|e| TokenError::MalformedToken(format!("{name}: {e}")))
}

fn split_token(token: &str) -> Result<[&str; 3], TokenError> {
    let parts: Vec<&str> = token.split('.').collect();
    match parts[..] {
        [header, payload, signature] => Ok([header, payload, signature]),
        _ => Err(TokenError::MalformedToken(format!(
            "expected 3 segments, got {}",
            parts.len()
        ))),
    }
}

fn signing_hash(header_segment: &str, payload_segment: &str) -> Sha256Sum {
    Sha256Sum::from_data(format!("{header_segment}.{payload_segment}").as_bytes())
}

pub struct TokenSigner {
    algorithm: SigningAlgorithm,
    private_key: Secp256k1PrivateKey,
}

impl TokenSigner {
    pub fn new(algorithm: SigningAlgorithm, private_key_hex: &str) -> Result<TokenSigner, TokenError> {
        let private_key =
            Secp256k1PrivateKey::from_hex(private_key_hex).map_err(|_| TokenError::InvalidPrivateKey)?;
        Ok(TokenSigner {
            algorithm,
            private_key,
        })
    }

    pub fn header(&self, custom_header: Map<String, JsonValue>) -> TokenHeader {
        let mut header = TokenHeader::new(self.algorithm.get_name_str());
        header.extra = custom_header;
        header
    }

    fn sign_segments<T: Serialize>(
        &self,
        payload: &T,
        custom_header: Map<String, JsonValue>,
    ) -> Result<(String, String, String), TokenError> {
        let header_segment = encode_segment(&self.header(custom_header))?;
        let payload_segment = encode_segment(payload)?;
        let hash = signing_hash(&header_segment, &payload_segment);
        let signature = self
            .private_key
            .sign_compact(hash.as_bytes())
            .map_err(|e| TokenError::Signing(e.to_string()))?;
        Ok((header_segment, payload_segment, to_base64_url(&signature)))
    }

    pub fn sign<T: Serialize>(&self, payload: &T) -> Result<String, TokenError> {
        self.sign_with_header(payload, Map::new())
    }

    pub fn sign_with_header<T: Serialize>(
        &self,
        payload: &T,
        custom_header: Map<String, JsonValue>,
    ) -> Result<String, TokenError> {
        let (header, payload, signature) = self.sign_segments(payload, custom_header)?;
        Ok(format!("{header}.{payload}.{signature}"))
    }

    pub fn sign_expanded<T: Serialize>(&self, payload: &T) -> Result<SignedTokenExpanded, TokenError> {
        let (header, _, signature) = self.sign_segments(payload, Map::new())?;
        let payload = serde_json::to_string(payload).map_err(|e| TokenError::Json(e.to_string()))?;
        Ok(SignedTokenExpanded {
            header: vec![header],
            payload,
            signature: vec![signature],
        })
    }
}

pub struct TokenVerifier {
    algorithm: SigningAlgorithm,
    public_key: Secp256k1PublicKey,
}

impl TokenVerifier {
    pub fn new(algorithm: SigningAlgorithm, public_key_hex: &str) -> Result<TokenVerifier, TokenError> {
        let public_key =
            Secp256k1PublicKey::from_hex(public_key_hex).map_err(|_| TokenError::InvalidPublicKey)?;
        Ok(TokenVerifier {
            algorithm,
            public_key,
        })
    }

    fn check_header(&self, header_segment: &str) -> Result<(), TokenError> {
        let header: TokenHeader = decode_segment("header", header_segment)?;
        if header.alg != self.algorithm.get_name_str() {
            return Err(TokenError::UnsupportedAlgorithm(header.alg));
        }
        Ok(())
    }

    fn verify_segments(
        &self,
        header_segment: &str,
        payload_segment: &str,
        signature_segment: &str,
    ) -> Result<bool, TokenError> {
        self.check_header(header_segment)?;
        let signature = from_base64_url(signature_segment)
            .map_err(|e| TokenError::MalformedToken(format!("signature: {e}")))?;
        let hash = signing_hash(header_segment, payload_segment);
        let verified = self
            .public_key
            .verify_compact(hash.as_bytes(), &signature)
            .map_err(|e| TokenError::MalformedToken(format!("signature: {e}")))?;
        if !verified {
            debug!("Token signature mismatch"; "public_key" => %self.public_key.to_hex());
        }
        Ok(verified)
    }

    /// `Ok(false)` if the signature does not match, `Err` if the token is malformed
    pub fn verify(&self, token: &str) -> Result<bool, TokenError> {
        let [header, payload, signature] = split_token(token)?;
        self.verify_segments(header, payload, signature)
    }

    pub fn verify_expanded(&self, token: &SignedTokenExpanded) -> Result<bool, TokenError> {
        let (header, signature) = match (&token.header[..], &token.signature[..]) {
            ([header], [signature]) => (header, signature),
            _ => {
                return Err(TokenError::MalformedToken(
                    "expanded token needs exactly one header and one signature".into(),
                ))
            }
        };
        let payload = to_base64_url(token.payload.as_bytes());
        self.verify_segments(header, &payload, signature)
    }
}

/// A token with `alg: none` and an empty signature segment
pub fn create_unsecured_token<T: Serialize>(payload: &T) -> Result<String, TokenError> {
    let header = encode_segment(&TokenHeader::new(UNSECURED_ALG))?;
    let payload = encode_segment(payload)?;
    Ok(format!("{header}.{payload}."))
}

/// Decode without checking the signature
pub fn decode_token(token: &str) -> Result<DecodedToken, TokenError> {
    let [header, payload, signature] = split_token(token)?;
    Ok(DecodedToken {
        header: decode_segment("header", header)?,
        payload: decode_segment("payload", payload)?,
        signature: signature.to_string(),
    })
}
