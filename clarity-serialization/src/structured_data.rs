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

//! SIP-018 structured data: hashing, domain tuples, and signatures over
//! consensus-serialized Clarity values.

use stacks_common::codec::StacksMessageCodec;
use stacks_common::util::hash::Sha256Sum;
use stacks_common::util::secp256k1::{
    MessageSignature, PrivateKey, PublicKey, Secp256k1PrivateKey, Secp256k1PublicKey,
};

use crate::errors::{ClarityTypeError, StructuredDataError};
use crate::representations::ClarityName;
use crate::types::{CharType, SequenceData, TupleData, Value};

/// ASCII "SIP018"
pub const STRUCTURED_DATA_PREFIX: [u8; 6] = [0x53, 0x49, 0x50, 0x30, 0x31, 0x38];

const DOMAIN_FIELDS: [&str; 3] = ["chain-id", "name", "version"];

pub fn structured_data_hash(value: &Value) -> Sha256Sum {
    Sha256Sum::from_data(&value.serialize_to_vec())
}

/// `sha256(prefix || domain_hash || message_hash)`
pub fn structured_data_message_hash(message: &Value, domain: &Value) -> Sha256Sum {
    let mut bytes = Vec::with_capacity(STRUCTURED_DATA_PREFIX.len() + 64);
    bytes.extend_from_slice(&STRUCTURED_DATA_PREFIX);
    bytes.extend_from_slice(structured_data_hash(domain).as_bytes());
    bytes.extend_from_slice(structured_data_hash(message).as_bytes());
    Sha256Sum::from_data(&bytes)
}

/// Builds the `{name, version, chain-id}` domain tuple
pub fn make_structured_data_domain(
    name: &str,
    version: &str,
    chain_id: u32,
) -> Result<Value, ClarityTypeError> {
    TupleData::from_data(vec![
        (
            ClarityName::try_from("name")?,
            Value::string_ascii_from_bytes(name.as_bytes().to_vec())?,
        ),
        (
            ClarityName::try_from("version")?,
            Value::string_ascii_from_bytes(version.as_bytes().to_vec())?,
        ),
        (ClarityName::try_from("chain-id")?, Value::UInt(chain_id.into())),
    ])
    .map(Value::from)
}

fn is_ascii_string(value: &Value) -> bool {
    matches!(
        value,
        Value::Sequence(SequenceData::String(CharType::ASCII(_)))
    )
}

/// A domain is a tuple holding exactly `name` and `version` as string-ascii
/// and `chain-id` as a uint
pub fn validate_structured_data_domain(domain: &Value) -> Result<(), StructuredDataError> {
    let Value::Tuple(tuple) = domain else {
        return Err(StructuredDataError::InvalidDomain(format!(
            "expected a tuple, got {domain}"
        )));
    };

    if tuple.len() != DOMAIN_FIELDS.len() as u64
        || !DOMAIN_FIELDS
            .iter()
            .all(|field| tuple.data_map.contains_key(*field))
    {
        return Err(StructuredDataError::InvalidDomain(format!(
            "expected fields {DOMAIN_FIELDS:?}, got {tuple}"
        )));
    }

    for field in ["name", "version"] {
        if !tuple.get(field).map(is_ascii_string).unwrap_or(false) {
            return Err(StructuredDataError::InvalidDomain(format!(
                "'{field}' must be a string-ascii"
            )));
        }
    }
    if !matches!(tuple.get("chain-id"), Ok(Value::UInt(_))) {
        return Err(StructuredDataError::InvalidDomain(
            "'chain-id' must be a uint".into(),
        ));
    }
    Ok(())
}

/// Signs the structured-data hash of `message` under `domain`
pub fn sign_structured_data(
    message: &Value,
    domain: &Value,
    private_key: &Secp256k1PrivateKey,
) -> Result<MessageSignature, StructuredDataError> {
    validate_structured_data_domain(domain)?;
    let hash = structured_data_message_hash(message, domain);
    let signature = private_key.sign(hash.as_bytes())?;
    debug!("Signed structured data"; "hash" => %hash.to_hex());
    Ok(signature)
}

/// False for an invalid domain, a malformed signature, or a signature by another key
pub fn verify_structured_data(
    message: &Value,
    domain: &Value,
    signature: &MessageSignature,
    public_key: &Secp256k1PublicKey,
) -> bool {
    if let Err(e) = validate_structured_data_domain(domain) {
        debug!("Refusing to verify structured data"; "err" => %e);
        return false;
    }
    let hash = structured_data_message_hash(message, domain);
    public_key
        .verify(hash.as_bytes(), signature)
        .unwrap_or(false)
}
