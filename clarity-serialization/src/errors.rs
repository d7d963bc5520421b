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

use std::{error, fmt, io};

use stacks_common::util::secp256k1::Secp256k1Error;

use crate::types::Value;

/// Errors that may occur in serialization or deserialization.
/// IO errors from the underlying reader or writer surface as `IOError`,
///   except for EOF: running out of input mid-value is caught and
///   rethrown as `DeserializationError`.
#[derive(Debug, Clone, PartialEq)]
pub enum SerializationError {
    IOError(String),
    DeserializationError(String),
    SerializationError(String),
    LeftoverBytesInDeserialization,
}

impl fmt::Display for SerializationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SerializationError::IOError(e) => {
                write!(f, "Serialization error caused by IO: {e}")
            }
            SerializationError::DeserializationError(e) => {
                write!(f, "Deserialization error: {e}")
            }
            SerializationError::SerializationError(e) => {
                write!(f, "Serialization error: {e}")
            }
            SerializationError::LeftoverBytesInDeserialization => {
                write!(f, "Deserialization error: bytes left over in buffer")
            }
        }
    }
}

impl error::Error for SerializationError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        None
    }
}

impl From<io::Error> for SerializationError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::UnexpectedEof => {
                SerializationError::DeserializationError("Unexpected end of input".into())
            }
            _ => SerializationError::IOError(err.to_string()),
        }
    }
}

impl From<&str> for SerializationError {
    fn from(e: &str) -> Self {
        SerializationError::DeserializationError(e.into())
    }
}

impl From<ClarityTypeError> for SerializationError {
    fn from(e: ClarityTypeError) -> Self {
        SerializationError::DeserializationError(e.to_string())
    }
}

/// Errors raised while constructing or inspecting Clarity values
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClarityTypeError {
    /// The value exceeds the maximum allowed Clarity value size.
    ValueTooLarge,
    /// The value exceeds the maximum allowed nesting depth.
    TypeSignatureTooDeep,
    /// A byte outside the printable ASCII range was found in an ASCII string.
    InvalidAsciiCharacter(u8),
    InvalidUtf8Encoding,
    /// Buffer was longer than the caller allowed
    ValueOutOfBounds,
    DuplicateTupleField(String),
    NoSuchTupleField(String),
    EmptyTuplesNotAllowed,
    /// The value is not of the expected type.
    /// The `String` names the expected type, the `Box<Value>` wraps the offending value.
    TypeMismatchValue(String, Box<Value>),
    ResponseTypeMismatch {
        expected_ok: bool,
    },
    InvalidContractName(String),
    InvalidClarityName(String),
    InvalidPrincipalVersion(u8),
    InvalidPrincipalLength(usize),
    /// c32 decoding of a principal literal failed
    InvalidPrincipalEncoding(String),
    QualifiedContractMissingDot,
}

impl fmt::Display for ClarityTypeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

impl error::Error for ClarityTypeError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        None
    }
}

/// Errors from hashing and signing SIP-018 structured data
#[derive(Debug, Clone, PartialEq)]
pub enum StructuredDataError {
    /// The domain is not a `{name, version, chain-id}` tuple
    InvalidDomain(String),
    Serialization(SerializationError),
    Signing(Secp256k1Error),
}

impl fmt::Display for StructuredDataError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            StructuredDataError::InvalidDomain(msg) => write!(f, "Invalid domain: {msg}"),
            StructuredDataError::Serialization(e) => fmt::Display::fmt(e, f),
            StructuredDataError::Signing(e) => write!(f, "Failed to sign structured data: {e}"),
        }
    }
}

impl error::Error for StructuredDataError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            StructuredDataError::Serialization(e) => Some(e),
            StructuredDataError::Signing(e) => Some(e),
            _ => None,
        }
    }
}

impl From<SerializationError> for StructuredDataError {
    fn from(e: SerializationError) -> Self {
        StructuredDataError::Serialization(e)
    }
}

impl From<Secp256k1Error> for StructuredDataError {
    fn from(e: Secp256k1Error) -> Self {
        StructuredDataError::Signing(e)
    }
}
