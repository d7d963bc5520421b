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

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::{fmt, str};

use regex::Regex;
use serde_json::{json, Map as JSONMap, Value as JSONValue};
use stacks_common::address::{
    c32, StacksAddress, C32_ADDRESS_VERSION_MAINNET_MULTISIG,
    C32_ADDRESS_VERSION_MAINNET_SINGLESIG, C32_ADDRESS_VERSION_TESTNET_MULTISIG,
};
use stacks_common::util::hash::{to_hex, Hash160};

use crate::errors::ClarityTypeError;
pub use crate::representations::{ClarityName, ContractName};

pub const MAX_VALUE_SIZE: u32 = 1024 * 1024; // 1MB
pub const BOUND_VALUE_SERIALIZATION_BYTES: u32 = MAX_VALUE_SIZE * 2;
/// utf-8 strings are bounded by codepoint count, at up to 4 bytes each
pub const MAX_UTF8_VALUE_SIZE: u32 = MAX_VALUE_SIZE / 4;
/// Deepest nesting a value may have, counting atoms as depth 1. The codec
/// enforces the same bound while deserializing.
pub const MAX_TYPE_DEPTH: u8 = 16;

lazy_static! {
    static ref WRAPPED_CODEPOINT_REGEX: Option<Regex> =
        Regex::new("^\\\\u\\{(?P<value>[[:xdigit:]]+)\\}").ok();
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Int(i128),
    UInt(u128),
    Bool(bool),
    Sequence(SequenceData),
    Principal(PrincipalData),
    Tuple(TupleData),
    Optional(OptionalData),
    Response(ResponseData),
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub enum SequenceData {
    Buffer(BuffData),
    List(ListData),
    String(CharType),
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuffData {
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListData {
    pub data: Vec<Value>,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CharType {
    UTF8(UTF8Data),
    ASCII(ASCIIData),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ASCIIData {
    pub data: Vec<u8>,
}

/// One entry per codepoint, each holding that codepoint's utf-8 bytes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UTF8Data {
    pub data: Vec<Vec<u8>>,
}

/// Tuple fields are kept sorted by name, which is also their wire order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TupleData {
    pub data_map: BTreeMap<ClarityName, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionalData {
    pub data: Option<Box<Value>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseData {
    pub committed: bool,
    pub data: Box<Value>,
}

#[derive(Clone, Eq, PartialEq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct StandardPrincipalData(pub(crate) u8, pub [u8; 20]);

#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct QualifiedContractIdentifier {
    pub issuer: StandardPrincipalData,
    pub name: ContractName,
}

#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum PrincipalData {
    Standard(StandardPrincipalData),
    Contract(QualifiedContractIdentifier),
}

pub const NONE: Value = Value::Optional(OptionalData { data: None });

impl StandardPrincipalData {
    pub fn new(version: u8, bytes: [u8; 20]) -> Result<Self, ClarityTypeError> {
        if version >= 32 {
            return Err(ClarityTypeError::InvalidPrincipalVersion(version));
        }
        Ok(Self(version, bytes))
    }

    /// Skips the version check, for building principals that are only
    /// reachable from the wire.
    #[cfg(any(test, feature = "testing"))]
    pub fn new_unsafe(version: u8, bytes: [u8; 20]) -> Self {
        Self(version, bytes)
    }

    pub fn version(&self) -> u8 {
        self.0
    }

    pub fn to_address(&self) -> String {
        c32::c32_address(self.0, &self.1[..]).unwrap_or_else(|_| "INVALID_C32_ADD".to_string())
    }

    pub fn destruct(self) -> (u8, [u8; 20]) {
        let Self(version, bytes) = self;
        (version, bytes)
    }

    pub fn is_mainnet(&self) -> bool {
        self.0 == C32_ADDRESS_VERSION_MAINNET_MULTISIG
            || self.0 == C32_ADDRESS_VERSION_MAINNET_SINGLESIG
    }

    pub fn is_multisig(&self) -> bool {
        self.0 == C32_ADDRESS_VERSION_MAINNET_MULTISIG
            || self.0 == C32_ADDRESS_VERSION_TESTNET_MULTISIG
    }
}

impl fmt::Display for StandardPrincipalData {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let c32_str = self.to_address();
        write!(f, "{c32_str}")
    }
}

impl fmt::Debug for StandardPrincipalData {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let c32_str = self.to_address();
        write!(f, "StandardPrincipalData({c32_str})")
    }
}

impl QualifiedContractIdentifier {
    pub fn new(issuer: StandardPrincipalData, name: ContractName) -> QualifiedContractIdentifier {
        Self { issuer, name }
    }

    pub fn parse(literal: &str) -> Result<QualifiedContractIdentifier, ClarityTypeError> {
        let split: Vec<_> = literal.splitn(2, '.').collect();
        if split.len() != 2 {
            return Err(ClarityTypeError::QualifiedContractMissingDot);
        }
        let sender = PrincipalData::parse_standard_principal(split[0])?;
        let name = ContractName::try_from(split[1])?;
        Ok(QualifiedContractIdentifier::new(sender, name))
    }
}

impl fmt::Display for QualifiedContractIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}.{}", self.issuer, self.name)
    }
}

impl PrincipalData {
    pub fn version(&self) -> u8 {
        match self {
            PrincipalData::Standard(p) => p.version(),
            PrincipalData::Contract(QualifiedContractIdentifier { issuer, .. }) => {
                issuer.version()
            }
        }
    }

    /// A version is only valid if it fits into 5 bits. Principals read off
    /// the wire are not checked, so this can be false.
    pub fn has_valid_version(&self) -> bool {
        self.version() < 32
    }

    /// Parses `"SP..."` or `"SP....contract-name"`, with an optional leading `'`
    pub fn parse(literal: &str) -> Result<PrincipalData, ClarityTypeError> {
        let literal = literal.strip_prefix('\'').unwrap_or(literal);

        if literal.contains('.') {
            PrincipalData::parse_qualified_contract_principal(literal)
        } else {
            PrincipalData::parse_standard_principal(literal).map(PrincipalData::from)
        }
    }

    pub fn parse_qualified_contract_principal(
        literal: &str,
    ) -> Result<PrincipalData, ClarityTypeError> {
        let contract_id = QualifiedContractIdentifier::parse(literal)?;
        Ok(PrincipalData::Contract(contract_id))
    }

    pub fn parse_standard_principal(
        literal: &str,
    ) -> Result<StandardPrincipalData, ClarityTypeError> {
        let (version, data) = c32::c32_address_decode(literal)
            .map_err(|x| ClarityTypeError::InvalidPrincipalEncoding(x.to_string()))?;
        if data.len() != 20 {
            return Err(ClarityTypeError::InvalidPrincipalLength(data.len()));
        }
        let mut fixed_data = [0; 20];
        fixed_data.copy_from_slice(&data[..20]);
        StandardPrincipalData::new(version, fixed_data)
    }
}

impl fmt::Display for PrincipalData {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PrincipalData::Standard(sender) => write!(f, "{sender}"),
            PrincipalData::Contract(contract_identifier) => write!(f, "{contract_identifier}"),
        }
    }
}

impl TupleData {
    /// Builds a tuple from fields in any order. Names must be unique and
    /// there must be at least one field.
    pub fn from_data(data: Vec<(ClarityName, Value)>) -> Result<TupleData, ClarityTypeError> {
        if data.is_empty() {
            return Err(ClarityTypeError::EmptyTuplesNotAllowed);
        }
        if data.len() > MAX_VALUE_SIZE as usize {
            return Err(ClarityTypeError::ValueTooLarge);
        }
        let mut data_map = BTreeMap::new();
        for (name, value) in data.into_iter() {
            match data_map.entry(name) {
                Entry::Vacant(e) => {
                    e.insert(value);
                }
                Entry::Occupied(e) => {
                    return Err(ClarityTypeError::DuplicateTupleField(e.key().to_string()));
                }
            }
        }
        let tuple = TupleData { data_map };
        if tuple.depth() > MAX_TYPE_DEPTH {
            return Err(ClarityTypeError::TypeSignatureTooDeep);
        }
        Ok(tuple)
    }

    pub fn len(&self) -> u64 {
        self.data_map.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.data_map.is_empty()
    }

    pub fn get(&self, name: &str) -> Result<&Value, ClarityTypeError> {
        self.data_map
            .get(name)
            .ok_or_else(|| ClarityTypeError::NoSuchTupleField(name.to_string()))
    }

    pub fn get_owned(mut self, name: &str) -> Result<Value, ClarityTypeError> {
        self.data_map
            .remove(name)
            .ok_or_else(|| ClarityTypeError::NoSuchTupleField(name.to_string()))
    }

    fn depth(&self) -> u8 {
        self.data_map
            .values()
            .map(Value::depth)
            .max()
            .unwrap_or(0)
            .saturating_add(1)
    }
}

impl fmt::Display for TupleData {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "(tuple")?;
        for (name, value) in self.data_map.iter() {
            write!(f, " ({} {value})", &**name)?;
        }
        write!(f, ")")
    }
}

impl BuffData {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        self.data.as_slice()
    }
}

impl fmt::Display for BuffData {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", to_hex(&self.data))
    }
}

impl fmt::Debug for BuffData {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{self}")
    }
}

impl ListData {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl UTF8Data {
    /// Total utf-8 byte length, which is what goes on the wire
    pub fn byte_len(&self) -> usize {
        self.data.iter().map(|c| c.len()).sum()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.data.concat()
    }

    pub fn as_string(&self) -> String {
        String::from_utf8_lossy(&self.to_bytes()).into_owned()
    }
}

impl fmt::Display for ASCIIData {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut escaped_str = String::new();
        for c in self.data.iter() {
            let escaped_char = format!("{}", std::ascii::escape_default(*c));
            escaped_str.push_str(&escaped_char);
        }
        write!(f, "\"{escaped_str}\"")
    }
}

impl fmt::Display for UTF8Data {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut result = String::new();
        for c in self.data.iter() {
            if c.len() > 1 {
                // extended charset is escaped
                result.push_str(&format!("\\u{{{}}}", to_hex(&c[..])));
            } else if let Some(byte) = c.first() {
                let escaped_char = format!("{}", std::ascii::escape_default(*byte));
                result.push_str(&escaped_char);
            }
        }
        write!(f, "u\"{result}\"")
    }
}

impl fmt::Display for CharType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CharType::ASCII(string) => write!(f, "{string}"),
            CharType::UTF8(string) => write!(f, "{string}"),
        }
    }
}

impl fmt::Debug for CharType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{self}")
    }
}

impl fmt::Display for OptionalData {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.data {
            Some(ref x) => write!(f, "(some {x})"),
            None => write!(f, "none"),
        }
    }
}

impl fmt::Display for ResponseData {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.committed {
            true => write!(f, "(ok {})", self.data),
            false => write!(f, "(err {})", self.data),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Int(int) => write!(f, "{int}"),
            Value::UInt(int) => write!(f, "u{int}"),
            Value::Bool(boolean) => write!(f, "{boolean}"),
            Value::Tuple(data) => write!(f, "{data}"),
            Value::Principal(principal_data) => write!(f, "{principal_data}"),
            Value::Optional(opt_data) => write!(f, "{opt_data}"),
            Value::Response(res_data) => write!(f, "{res_data}"),
            Value::Sequence(SequenceData::Buffer(vec_bytes)) => write!(f, "0x{vec_bytes}"),
            Value::Sequence(SequenceData::String(string)) => write!(f, "{string}"),
            Value::Sequence(SequenceData::List(list_data)) => {
                write!(f, "(")?;
                for (ix, v) in list_data.data.iter().enumerate() {
                    if ix > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{v}")?;
                }
                write!(f, ")")
            }
        }
    }
}

fn check_wrapped_depth(data: &Value) -> Result<(), ClarityTypeError> {
    if data.depth() >= MAX_TYPE_DEPTH {
        return Err(ClarityTypeError::TypeSignatureTooDeep);
    }
    Ok(())
}

impl Value {
    pub fn some(data: Value) -> Result<Value, ClarityTypeError> {
        check_wrapped_depth(&data)?;
        Ok(Value::Optional(OptionalData {
            data: Some(Box::new(data)),
        }))
    }

    pub fn none() -> Value {
        NONE.clone()
    }

    pub fn okay_true() -> Value {
        Value::Response(ResponseData {
            committed: true,
            data: Box::new(Value::Bool(true)),
        })
    }

    pub fn err_uint(ecode: u128) -> Value {
        Value::Response(ResponseData {
            committed: false,
            data: Box::new(Value::UInt(ecode)),
        })
    }

    pub fn err_none() -> Value {
        Value::Response(ResponseData {
            committed: false,
            data: Box::new(NONE.clone()),
        })
    }

    pub fn okay(data: Value) -> Result<Value, ClarityTypeError> {
        check_wrapped_depth(&data)?;
        Ok(Value::Response(ResponseData {
            committed: true,
            data: Box::new(data),
        }))
    }

    pub fn error(data: Value) -> Result<Value, ClarityTypeError> {
        check_wrapped_depth(&data)?;
        Ok(Value::Response(ResponseData {
            committed: false,
            data: Box::new(data),
        }))
    }

    /// Nesting depth; atoms have depth 1
    pub fn depth(&self) -> u8 {
        let inner = match self {
            Value::Optional(OptionalData { data: Some(v) }) => v.depth(),
            Value::Response(ResponseData { data, .. }) => data.depth(),
            Value::Sequence(SequenceData::List(list)) => {
                list.data.iter().map(Value::depth).max().unwrap_or(0)
            }
            Value::Tuple(tuple) => return tuple.depth(),
            _ => 0,
        };
        inner.saturating_add(1)
    }

    /// Lists may hold up to `MAX_VALUE_SIZE` entries of any kind
    pub fn cons_list(list_data: Vec<Value>) -> Result<Value, ClarityTypeError> {
        if list_data.len() > MAX_VALUE_SIZE as usize {
            return Err(ClarityTypeError::ValueTooLarge);
        }
        let list = ListData { data: list_data };
        if list.data.iter().any(|v| v.depth() >= MAX_TYPE_DEPTH) {
            return Err(ClarityTypeError::TypeSignatureTooDeep);
        }
        Ok(Value::Sequence(SequenceData::List(list)))
    }

    /// # Errors
    /// - ClarityTypeError::ValueTooLarge if `buff_data` is too large.
    pub fn buff_from(buff_data: Vec<u8>) -> Result<Value, ClarityTypeError> {
        if buff_data.len() > MAX_VALUE_SIZE as usize {
            return Err(ClarityTypeError::ValueTooLarge);
        }
        Ok(Value::Sequence(SequenceData::Buffer(BuffData {
            data: buff_data,
        })))
    }

    pub fn buff_from_byte(byte: u8) -> Value {
        Value::Sequence(SequenceData::Buffer(BuffData { data: vec![byte] }))
    }

    pub fn string_ascii_from_bytes(bytes: Vec<u8>) -> Result<Value, ClarityTypeError> {
        if bytes.len() > MAX_VALUE_SIZE as usize {
            return Err(ClarityTypeError::ValueTooLarge);
        }

        for b in bytes.iter() {
            if !b.is_ascii_alphanumeric() && !b.is_ascii_punctuation() && !b.is_ascii_whitespace() {
                return Err(ClarityTypeError::InvalidAsciiCharacter(*b));
            }
        }
        Ok(Value::Sequence(SequenceData::String(CharType::ASCII(
            ASCIIData { data: bytes },
        ))))
    }

    /// Parses a Clarity `u"..."` body, where `\u{XXXX}` escapes a codepoint
    pub fn string_utf8_from_string_utf8_literal(
        tokenized_str: String,
    ) -> Result<Value, ClarityTypeError> {
        let wrapped_codepoints_matcher = WRAPPED_CODEPOINT_REGEX
            .as_ref()
            .ok_or(ClarityTypeError::InvalidUtf8Encoding)?;
        let mut window = tokenized_str.as_str();
        let mut cursor = 0;
        let mut data: Vec<Vec<u8>> = vec![];
        while !window.is_empty() {
            if let Some(captures) = wrapped_codepoints_matcher.captures(window) {
                let matched = captures
                    .name("value")
                    .ok_or(ClarityTypeError::InvalidUtf8Encoding)?;
                let scalar_value = &window[matched.start()..matched.end()];
                let u = u32::from_str_radix(scalar_value, 16)
                    .map_err(|_| ClarityTypeError::InvalidUtf8Encoding)?;
                let c = char::from_u32(u).ok_or(ClarityTypeError::InvalidUtf8Encoding)?;
                let mut encoded_char: Vec<u8> = vec![0; c.len_utf8()];
                c.encode_utf8(&mut encoded_char[..]);

                data.push(encoded_char);
                cursor += scalar_value.len() + 4;
            } else {
                let c = window
                    .chars()
                    .next()
                    .ok_or(ClarityTypeError::InvalidUtf8Encoding)?;
                let mut encoded_char: Vec<u8> = vec![0; c.len_utf8()];
                c.encode_utf8(&mut encoded_char[..]);
                cursor += encoded_char.len();
                data.push(encoded_char);
            }
            if data.len() > MAX_UTF8_VALUE_SIZE as usize {
                return Err(ClarityTypeError::ValueTooLarge);
            }

            window = &tokenized_str[cursor..];
        }
        Ok(Value::Sequence(SequenceData::String(CharType::UTF8(
            UTF8Data { data },
        ))))
    }

    pub fn string_utf8_from_bytes(bytes: Vec<u8>) -> Result<Value, ClarityTypeError> {
        let validated_utf8_str =
            str::from_utf8(&bytes).map_err(|_| ClarityTypeError::InvalidUtf8Encoding)?;
        let data = validated_utf8_str
            .chars()
            .map(|char| {
                let mut encoded_char = vec![0u8; char.len_utf8()];
                char.encode_utf8(&mut encoded_char);
                encoded_char
            })
            .collect::<Vec<_>>();
        if data.len() > MAX_UTF8_VALUE_SIZE as usize {
            return Err(ClarityTypeError::ValueTooLarge);
        }

        Ok(Value::Sequence(SequenceData::String(CharType::UTF8(
            UTF8Data { data },
        ))))
    }

    /// The Clarity type of this value, e.g. `(list 2 (optional uint))`.
    /// Types that cannot be inferred from the value, such as the inner type
    /// of `none` or the unused branch of a response, render as `UnknownType`.
    pub fn type_string(&self) -> String {
        match self {
            Value::Int(_) => "int".into(),
            Value::UInt(_) => "uint".into(),
            Value::Bool(_) => "bool".into(),
            Value::Principal(_) => "principal".into(),
            Value::Sequence(SequenceData::Buffer(buff)) => format!("(buff {})", buff.len()),
            Value::Sequence(SequenceData::String(CharType::ASCII(s))) => {
                format!("(string-ascii {})", s.data.len())
            }
            Value::Sequence(SequenceData::String(CharType::UTF8(s))) => {
                format!("(string-utf8 {})", s.byte_len())
            }
            Value::Optional(OptionalData { data: None }) => "(optional UnknownType)".into(),
            Value::Optional(OptionalData { data: Some(v) }) => {
                format!("(optional {})", v.type_string())
            }
            Value::Response(ResponseData {
                committed: true,
                data,
            }) => format!("(response {} UnknownType)", data.type_string()),
            Value::Response(ResponseData {
                committed: false,
                data,
            }) => format!("(response UnknownType {})", data.type_string()),
            Value::Sequence(SequenceData::List(list)) => {
                let entry_type = list
                    .data
                    .first()
                    .map(Value::type_string)
                    .unwrap_or_else(|| "UnknownType".into());
                format!("(list {} {entry_type})", list.len())
            }
            Value::Tuple(tuple) => {
                let fields: Vec<String> = tuple
                    .data_map
                    .iter()
                    .map(|(name, value)| format!("({name} {})", value.type_string()))
                    .collect();
                format!("(tuple {})", fields.join(" "))
            }
        }
    }

    /// `{"type": ..., "value": ...}` rendering. Integers become decimal
    /// strings, buffers `0x`-prefixed hex, and responses carry a `success` flag.
    pub fn to_json(&self) -> JSONValue {
        let type_string = self.type_string();
        match self {
            Value::Int(i) => json!({ "type": type_string, "value": i.to_string() }),
            Value::UInt(u) => json!({ "type": type_string, "value": u.to_string() }),
            Value::Bool(b) => json!({ "type": type_string, "value": b }),
            Value::Principal(p) => json!({ "type": type_string, "value": p.to_string() }),
            Value::Sequence(SequenceData::Buffer(buff)) => {
                json!({ "type": type_string, "value": format!("0x{buff}") })
            }
            Value::Sequence(SequenceData::String(CharType::ASCII(s))) => json!({
                "type": type_string,
                "value": String::from_utf8_lossy(&s.data),
            }),
            Value::Sequence(SequenceData::String(CharType::UTF8(s))) => {
                json!({ "type": type_string, "value": s.as_string() })
            }
            Value::Sequence(SequenceData::List(list)) => {
                let items: Vec<JSONValue> = list.data.iter().map(Value::to_json).collect();
                json!({ "type": type_string, "value": items })
            }
            Value::Tuple(tuple) => {
                let fields: JSONMap<String, JSONValue> = tuple
                    .data_map
                    .iter()
                    .map(|(name, value)| (name.to_string(), value.to_json()))
                    .collect();
                json!({ "type": type_string, "value": fields })
            }
            Value::Optional(OptionalData { data: None }) => {
                json!({ "type": type_string, "value": JSONValue::Null })
            }
            Value::Optional(OptionalData { data: Some(v) }) => {
                json!({ "type": type_string, "value": v.to_json() })
            }
            Value::Response(ResponseData { committed, data }) => json!({
                "type": type_string,
                "value": data.to_json(),
                "success": committed,
            }),
        }
    }

    pub fn expect_ascii(self) -> Result<String, ClarityTypeError> {
        if let Value::Sequence(SequenceData::String(CharType::ASCII(ASCIIData { data }))) = self {
            String::from_utf8(data).map_err(|_| ClarityTypeError::InvalidUtf8Encoding)
        } else {
            error!("Value '{self:?}' is not an ASCII string");
            Err(ClarityTypeError::TypeMismatchValue(
                "string-ascii".into(),
                Box::new(self),
            ))
        }
    }

    pub fn expect_u128(self) -> Result<u128, ClarityTypeError> {
        if let Value::UInt(inner) = self {
            Ok(inner)
        } else {
            error!("Value '{self:?}' is not a u128");
            Err(ClarityTypeError::TypeMismatchValue(
                "uint".into(),
                Box::new(self),
            ))
        }
    }

    pub fn expect_i128(self) -> Result<i128, ClarityTypeError> {
        if let Value::Int(inner) = self {
            Ok(inner)
        } else {
            error!("Value '{self:?}' is not an i128");
            Err(ClarityTypeError::TypeMismatchValue(
                "int".into(),
                Box::new(self),
            ))
        }
    }

    pub fn expect_buff(self, sz: usize) -> Result<Vec<u8>, ClarityTypeError> {
        if let Value::Sequence(SequenceData::Buffer(buffdata)) = self {
            if buffdata.data.len() <= sz {
                Ok(buffdata.data)
            } else {
                error!(
                    "Value buffer has len {}, expected {sz}",
                    buffdata.data.len()
                );
                Err(ClarityTypeError::ValueOutOfBounds)
            }
        } else {
            error!("Value '{self:?}' is not a buff");
            Err(ClarityTypeError::TypeMismatchValue(
                "buff".into(),
                Box::new(self),
            ))
        }
    }

    pub fn expect_buff_padded(self, sz: usize, pad: u8) -> Result<Vec<u8>, ClarityTypeError> {
        let mut data = self.expect_buff(sz)?;
        data.resize(sz, pad);
        Ok(data)
    }

    pub fn expect_list(self) -> Result<Vec<Value>, ClarityTypeError> {
        if let Value::Sequence(SequenceData::List(listdata)) = self {
            Ok(listdata.data)
        } else {
            error!("Value '{self:?}' is not a list");
            Err(ClarityTypeError::TypeMismatchValue(
                "list".into(),
                Box::new(self),
            ))
        }
    }

    pub fn expect_bool(self) -> Result<bool, ClarityTypeError> {
        if let Value::Bool(b) = self {
            Ok(b)
        } else {
            error!("Value '{self:?}' is not a bool");
            Err(ClarityTypeError::TypeMismatchValue(
                "bool".into(),
                Box::new(self),
            ))
        }
    }

    pub fn expect_tuple(self) -> Result<TupleData, ClarityTypeError> {
        if let Value::Tuple(data) = self {
            Ok(data)
        } else {
            error!("Value '{self:?}' is not a tuple");
            Err(ClarityTypeError::TypeMismatchValue(
                "tuple".into(),
                Box::new(self),
            ))
        }
    }

    pub fn expect_optional(self) -> Result<Option<Value>, ClarityTypeError> {
        if let Value::Optional(opt) = self {
            Ok(opt.data.map(|boxed_value| *boxed_value))
        } else {
            error!("Value '{self:?}' is not an optional");
            Err(ClarityTypeError::TypeMismatchValue(
                "optional".into(),
                Box::new(self),
            ))
        }
    }

    pub fn expect_principal(self) -> Result<PrincipalData, ClarityTypeError> {
        if let Value::Principal(p) = self {
            Ok(p)
        } else {
            error!("Value '{self:?}' is not a principal");
            Err(ClarityTypeError::TypeMismatchValue(
                "principal".into(),
                Box::new(self),
            ))
        }
    }

    pub fn expect_result(self) -> Result<Result<Value, Value>, ClarityTypeError> {
        if let Value::Response(res_data) = self {
            if res_data.committed {
                Ok(Ok(*res_data.data))
            } else {
                Ok(Err(*res_data.data))
            }
        } else {
            error!("Value '{self:?}' is not a response");
            Err(ClarityTypeError::TypeMismatchValue(
                "response".into(),
                Box::new(self),
            ))
        }
    }

    pub fn expect_result_ok(self) -> Result<Value, ClarityTypeError> {
        match self.expect_result()? {
            Ok(value) => Ok(value),
            Err(_) => {
                error!("Value is not a (ok ..)");
                Err(ClarityTypeError::ResponseTypeMismatch { expected_ok: true })
            }
        }
    }

    pub fn expect_result_err(self) -> Result<Value, ClarityTypeError> {
        match self.expect_result()? {
            Err(value) => Ok(value),
            Ok(_) => {
                error!("Value is not a (err ..)");
                Err(ClarityTypeError::ResponseTypeMismatch { expected_ok: false })
            }
        }
    }
}

impl From<StacksAddress> for StandardPrincipalData {
    fn from(addr: StacksAddress) -> Self {
        Self(addr.version, addr.bytes.0)
    }
}

impl From<StacksAddress> for PrincipalData {
    fn from(addr: StacksAddress) -> Self {
        PrincipalData::from(StandardPrincipalData::from(addr))
    }
}

impl From<StandardPrincipalData> for StacksAddress {
    fn from(o: StandardPrincipalData) -> StacksAddress {
        StacksAddress {
            version: o.0,
            bytes: Hash160(o.1),
        }
    }
}

impl From<StandardPrincipalData> for Value {
    fn from(principal: StandardPrincipalData) -> Self {
        Value::Principal(PrincipalData::from(principal))
    }
}

impl From<QualifiedContractIdentifier> for Value {
    fn from(principal: QualifiedContractIdentifier) -> Self {
        Value::Principal(PrincipalData::Contract(principal))
    }
}

impl From<PrincipalData> for Value {
    fn from(p: PrincipalData) -> Self {
        Value::Principal(p)
    }
}

impl From<StandardPrincipalData> for PrincipalData {
    fn from(p: StandardPrincipalData) -> Self {
        PrincipalData::Standard(p)
    }
}

impl From<QualifiedContractIdentifier> for PrincipalData {
    fn from(principal: QualifiedContractIdentifier) -> Self {
        PrincipalData::Contract(principal)
    }
}

impl From<TupleData> for Value {
    fn from(t: TupleData) -> Self {
        Value::Tuple(t)
    }
}

impl From<ASCIIData> for Value {
    fn from(ascii: ASCIIData) -> Self {
        Value::Sequence(SequenceData::String(CharType::ASCII(ascii)))
    }
}

#[cfg(test)]
mod test {
    use rstest::rstest;

    use super::*;

    fn ascii(s: &str) -> Value {
        Value::string_ascii_from_bytes(s.as_bytes().to_vec()).unwrap()
    }

    fn utf8(s: &str) -> Value {
        Value::string_utf8_from_bytes(s.as_bytes().to_vec()).unwrap()
    }

    fn tuple(fields: Vec<(&str, Value)>) -> Value {
        Value::from(
            TupleData::from_data(
                fields
                    .into_iter()
                    .map(|(k, v)| (ClarityName::try_from(k).unwrap(), v))
                    .collect(),
            )
            .unwrap(),
        )
    }

    #[test]
    fn test_display() {
        let t = tuple(vec![("b", Value::UInt(2)), ("a", Value::Int(1))]);
        assert_eq!(t.to_string(), "(tuple (a 1) (b u2))");
        assert_eq!(Value::okay(Value::Bool(true)).unwrap().to_string(), "(ok true)");
        assert_eq!(
            Value::some(Value::error(Value::Bool(false)).unwrap())
                .unwrap()
                .to_string(),
            "(some (err false))"
        );
        assert_eq!(Value::none().to_string(), "none");
        assert_eq!(ascii("hello \"world\"").to_string(), "\"hello \\\"world\\\"\"");
        assert_eq!(utf8("hi").to_string(), "u\"hi\"");
        assert_eq!(utf8("\u{1F30E}").to_string(), "u\"\\u{f09f8c8e}\"");
        assert_eq!(
            Value::buff_from(vec![0xde, 0xad, 0xbe, 0xef]).unwrap().to_string(),
            "0xdeadbeef"
        );
        assert_eq!(
            Value::cons_list(vec![Value::Int(1), Value::Int(-2), Value::Int(3)])
                .unwrap()
                .to_string(),
            "(1 -2 3)"
        );
    }

    #[test]
    fn test_principal_display() {
        let addr = "SP2J6ZY48GV1EZ5V2V5RB9MP66SW86PYKKNRV9EJ7";
        let principal = PrincipalData::parse(addr).unwrap();
        assert_eq!(Value::from(principal.clone()).to_string(), addr);
        assert_eq!(principal.version(), 22);
        assert!(principal.has_valid_version());

        let contract = PrincipalData::parse(&format!("{addr}.hello-world")).unwrap();
        assert_eq!(contract.to_string(), format!("{addr}.hello-world"));
        assert_eq!(PrincipalData::parse(&format!("'{addr}")).unwrap(), principal);
    }

    #[test]
    fn test_principal_parse_errors() {
        assert!(matches!(
            PrincipalData::parse("not-an-address"),
            Err(ClarityTypeError::InvalidPrincipalEncoding(_))
        ));
        assert!(matches!(
            PrincipalData::parse("SP2J6ZY48GV1EZ5V2V5RB9MP66SW86PYKKNRV9EJ7.1bad"),
            Err(ClarityTypeError::InvalidContractName(_))
        ));
        assert_eq!(
            StandardPrincipalData::new(32, [0; 20]),
            Err(ClarityTypeError::InvalidPrincipalVersion(32))
        );
    }

    #[test]
    fn test_invalid_principal_version_display() {
        let bad = StandardPrincipalData::new_unsafe(200, [0; 20]);
        assert_eq!(bad.to_address(), "INVALID_C32_ADD");
        assert!(!PrincipalData::from(bad).has_valid_version());
    }

    #[test]
    fn test_stacks_address_conversion() {
        let principal =
            PrincipalData::parse_standard_principal("SP2J6ZY48GV1EZ5V2V5RB9MP66SW86PYKKNRV9EJ7")
                .unwrap();
        let addr = StacksAddress::from(principal.clone());
        assert_eq!(addr.to_string(), "SP2J6ZY48GV1EZ5V2V5RB9MP66SW86PYKKNRV9EJ7");
        assert_eq!(StandardPrincipalData::from(addr), principal);
        assert!(principal.is_mainnet());
        assert!(!principal.is_multisig());
    }

    #[rstest]
    #[case(Value::Int(-1), "int")]
    #[case(Value::UInt(1), "uint")]
    #[case(Value::Bool(true), "bool")]
    #[case(Value::buff_from(vec![1, 2, 3]).unwrap(), "(buff 3)")]
    #[case(ascii("hello"), "(string-ascii 5)")]
    #[case(utf8("h\u{e9}"), "(string-utf8 3)")]
    #[case(Value::none(), "(optional UnknownType)")]
    #[case(Value::some(Value::UInt(1)).unwrap(), "(optional uint)")]
    #[case(Value::okay(Value::Int(1)).unwrap(), "(response int UnknownType)")]
    #[case(Value::error(Value::Bool(false)).unwrap(), "(response UnknownType bool)")]
    #[case(Value::cons_list(vec![]).unwrap(), "(list 0 UnknownType)")]
    #[case(
        Value::cons_list(vec![Value::some(Value::UInt(1)).unwrap(), Value::none()]).unwrap(),
        "(list 2 (optional uint))"
    )]
    #[case(
        tuple(vec![("b", Value::Int(1)), ("a", ascii("x"))]),
        "(tuple (a (string-ascii 1)) (b int))"
    )]
    fn test_type_string(#[case] value: Value, #[case] expected: &str) {
        assert_eq!(value.type_string(), expected);
    }

    #[test]
    fn test_to_json() {
        let value = tuple(vec![
            ("amount", Value::UInt(u128::MAX)),
            ("memo", Value::buff_from(vec![0xab]).unwrap()),
            ("result", Value::error(Value::Int(-3)).unwrap()),
            ("maybe", Value::none()),
        ]);
        let json = value.to_json();
        assert_eq!(
            json["type"],
            "(tuple (amount uint) (maybe (optional UnknownType)) (memo (buff 1)) (result (response UnknownType int)))"
        );
        assert_eq!(
            json["value"]["amount"]["value"],
            "340282366920938463463374607431768211455"
        );
        assert_eq!(json["value"]["memo"]["value"], "0xab");
        assert_eq!(json["value"]["result"]["success"], false);
        assert_eq!(json["value"]["result"]["value"]["value"], "-3");
        assert!(json["value"]["maybe"]["value"].is_null());

        let list = Value::cons_list(vec![Value::Bool(true), Value::Bool(false)]).unwrap();
        assert_eq!(
            list.to_json(),
            json!({
                "type": "(list 2 bool)",
                "value": [{"type": "bool", "value": true}, {"type": "bool", "value": false}]
            })
        );
    }

    #[test]
    fn test_tuple_construction() {
        let a = ClarityName::try_from("a").unwrap();
        assert_eq!(
            TupleData::from_data(vec![(a.clone(), Value::Int(1)), (a.clone(), Value::Int(2))]),
            Err(ClarityTypeError::DuplicateTupleField("a".into()))
        );
        assert_eq!(
            TupleData::from_data(vec![]),
            Err(ClarityTypeError::EmptyTuplesNotAllowed)
        );

        let t = TupleData::from_data(vec![(a, Value::Int(1))]).unwrap();
        assert_eq!(t.get("a").unwrap(), &Value::Int(1));
        assert_eq!(
            t.get("b"),
            Err(ClarityTypeError::NoSuchTupleField("b".into()))
        );
        assert_eq!(t.get_owned("a").unwrap(), Value::Int(1));
    }

    #[test]
    fn test_string_construction() {
        assert_eq!(
            Value::string_ascii_from_bytes(vec![b'a', 0x7f]),
            Err(ClarityTypeError::InvalidAsciiCharacter(0x7f))
        );
        assert_eq!(
            Value::string_ascii_from_bytes(vec![0xc3, 0xa9]),
            Err(ClarityTypeError::InvalidAsciiCharacter(0xc3))
        );
        assert!(Value::string_ascii_from_bytes(b"tab\there\r\n".to_vec()).is_ok());
        assert_eq!(
            Value::string_utf8_from_bytes(vec![0xff, 0xfe]),
            Err(ClarityTypeError::InvalidUtf8Encoding)
        );

        let literal =
            Value::string_utf8_from_string_utf8_literal("hello \\u{1F30E}!".into()).unwrap();
        assert_eq!(literal, utf8("hello \u{1F30E}!"));
        assert_eq!(
            Value::string_utf8_from_string_utf8_literal("\\u{D800}".into()),
            Err(ClarityTypeError::InvalidUtf8Encoding)
        );
    }

    #[test]
    fn test_depth_limit() {
        let mut value = Value::Int(0);
        for _ in 0..(MAX_TYPE_DEPTH - 1) {
            value = Value::some(value).unwrap();
        }
        assert_eq!(value.depth(), MAX_TYPE_DEPTH);
        assert_eq!(
            Value::some(value.clone()),
            Err(ClarityTypeError::TypeSignatureTooDeep)
        );
        assert_eq!(
            Value::cons_list(vec![value.clone()]),
            Err(ClarityTypeError::TypeSignatureTooDeep)
        );
        assert_eq!(
            TupleData::from_data(vec![(ClarityName::try_from("deep").unwrap(), value)]),
            Err(ClarityTypeError::TypeSignatureTooDeep)
        );

        let mut tuple = Value::Int(0);
        for _ in 0..(MAX_TYPE_DEPTH - 1) {
            tuple = Value::from(
                TupleData::from_data(vec![(ClarityName::try_from("t").unwrap(), tuple)])
                    .unwrap(),
            );
        }
        assert_eq!(tuple.depth(), MAX_TYPE_DEPTH);
    }

    #[test]
    fn test_buff_too_large() {
        assert_eq!(
            Value::buff_from(vec![0; MAX_VALUE_SIZE as usize + 1]),
            Err(ClarityTypeError::ValueTooLarge)
        );
        assert!(Value::buff_from(vec![0; MAX_VALUE_SIZE as usize]).is_ok());
    }

    #[test]
    fn test_expect_accessors() {
        assert_eq!(Value::UInt(5).expect_u128().unwrap(), 5);
        assert_eq!(Value::Int(-5).expect_i128().unwrap(), -5);
        assert!(Value::Bool(true).expect_bool().unwrap());
        assert_eq!(ascii("abc").expect_ascii().unwrap(), "abc");
        assert_eq!(
            Value::buff_from(vec![1]).unwrap().expect_buff_padded(3, 0).unwrap(),
            vec![1, 0, 0]
        );
        assert_eq!(
            Value::buff_from(vec![1, 2]).unwrap().expect_buff(1),
            Err(ClarityTypeError::ValueOutOfBounds)
        );
        assert_eq!(Value::none().expect_optional().unwrap(), None);
        assert_eq!(
            Value::okay_true().expect_result_ok().unwrap(),
            Value::Bool(true)
        );
        assert_eq!(Value::err_uint(3).expect_result_err().unwrap(), Value::UInt(3));
        assert_eq!(
            Value::err_none().expect_result_ok(),
            Err(ClarityTypeError::ResponseTypeMismatch { expected_ok: true })
        );
        assert_eq!(
            Value::Int(1).expect_u128(),
            Err(ClarityTypeError::TypeMismatchValue(
                "uint".into(),
                Box::new(Value::Int(1))
            ))
        );
        assert!(Value::Int(1).expect_list().is_err());
        assert!(Value::Int(1).expect_tuple().is_err());
        assert!(Value::Int(1).expect_principal().is_err());
    }
}
