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

//! Consensus serialization of Clarity values: a one-byte type prefix
//! followed by a big-endian payload, recursing into compound values.

use std::io::{Read, Write};

use stacks_common::codec::{Error as codec_error, StacksMessageCodec};
use stacks_common::util::hash::{hex_bytes, to_hex};

use crate::errors::{ClarityTypeError, SerializationError};
use crate::representations::{ClarityName, ContractName, MAX_STRING_LEN};
use crate::types::{
    CharType, OptionalData, PrincipalData, QualifiedContractIdentifier, SequenceData,
    StandardPrincipalData, TupleData, Value, BOUND_VALUE_SERIALIZATION_BYTES, MAX_TYPE_DEPTH,
    MAX_VALUE_SIZE,
};

/// Reader depth at which a value is rejected. A value read at depth `d` has
/// `d` enclosing containers, so this accepts exactly the values the
/// constructors accept.
pub const MAX_DESERIALIZATION_DEPTH: u8 = MAX_TYPE_DEPTH;

lazy_static! {
    pub static ref NONE_SERIALIZATION_LEN: u64 = Value::none().serialized_size() as u64;
}

define_u8_enum!(TypePrefix {
    Int = 0,
    UInt = 1,
    Buffer = 2,
    BoolTrue = 3,
    BoolFalse = 4,
    PrincipalStandard = 5,
    PrincipalContract = 6,
    ResponseOk = 7,
    ResponseErr = 8,
    OptionalNone = 9,
    OptionalSome = 10,
    List = 11,
    Tuple = 12,
    StringASCII = 13,
    StringUTF8 = 14
});

impl From<&PrincipalData> for TypePrefix {
    fn from(v: &PrincipalData) -> TypePrefix {
        match v {
            PrincipalData::Standard(_) => TypePrefix::PrincipalStandard,
            PrincipalData::Contract(_) => TypePrefix::PrincipalContract,
        }
    }
}

impl From<&Value> for TypePrefix {
    fn from(v: &Value) -> TypePrefix {
        use crate::types::SequenceData::*;
        use crate::types::Value::*;

        match v {
            Int(_) => TypePrefix::Int,
            UInt(_) => TypePrefix::UInt,
            Bool(value) => {
                if *value {
                    TypePrefix::BoolTrue
                } else {
                    TypePrefix::BoolFalse
                }
            }
            Principal(p) => TypePrefix::from(p),
            Response(response) => {
                if response.committed {
                    TypePrefix::ResponseOk
                } else {
                    TypePrefix::ResponseErr
                }
            }
            Optional(OptionalData { data: None }) => TypePrefix::OptionalNone,
            Optional(OptionalData { data: Some(_) }) => TypePrefix::OptionalSome,
            Tuple(_) => TypePrefix::Tuple,
            Sequence(Buffer(_)) => TypePrefix::Buffer,
            Sequence(List(_)) => TypePrefix::List,
            Sequence(String(CharType::ASCII(_))) => TypePrefix::StringASCII,
            Sequence(String(CharType::UTF8(_))) => TypePrefix::StringUTF8,
        }
    }
}

/// Not a public trait,
///   this is just used to simplify serializing the pieces that
///   are shared between principals, tuples, and values.
trait ClarityValueSerializable<T: std::marker::Sized> {
    fn serialize_write<W: Write>(&self, w: &mut W) -> std::io::Result<()>;
    fn deserialize_read<R: Read>(r: &mut R) -> Result<T, SerializationError>;
}

impl ClarityValueSerializable<StandardPrincipalData> for StandardPrincipalData {
    fn serialize_write<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        w.write_all(&[self.0])?;
        w.write_all(&self.1)
    }

    /// The version byte is taken as-is
    fn deserialize_read<R: Read>(r: &mut R) -> Result<Self, SerializationError> {
        let mut version = [0; 1];
        let mut data = [0; 20];
        r.read_exact(&mut version)?;
        r.read_exact(&mut data)?;
        Ok(StandardPrincipalData(version[0], data))
    }
}

macro_rules! serialize_guarded_string {
    ($Name:ident) => {
        impl ClarityValueSerializable<$Name> for $Name {
            fn serialize_write<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
                w.write_all(&self.len().to_be_bytes())?;
                // guarded strings are ASCII, so this is exactly len bytes
                w.write_all(self.as_str().as_bytes())
            }

            fn deserialize_read<R: Read>(r: &mut R) -> Result<Self, SerializationError> {
                let mut len = [0; 1];
                r.read_exact(&mut len)?;
                let len = u8::from_be_bytes(len);
                if len > MAX_STRING_LEN {
                    return Err(SerializationError::DeserializationError(
                        "String too long".to_string(),
                    ));
                }

                let mut data = vec![0; len as usize];
                r.read_exact(&mut data)?;

                String::from_utf8(data)
                    .map_err(|_| "Non-UTF8 string data".into())
                    .and_then(|x| $Name::try_from(x).map_err(|_| "Illegal Clarity string".into()))
            }
        }
    };
}

serialize_guarded_string!(ClarityName);
serialize_guarded_string!(ContractName);

/// Reads a big-endian u32 length prefix, rejecting anything over `MAX_VALUE_SIZE`
fn read_len_prefix<R: Read>(r: &mut R, what: &str) -> Result<u32, SerializationError> {
    let mut len = [0; 4];
    r.read_exact(&mut len)?;
    let len = u32::from_be_bytes(len);
    if len > MAX_VALUE_SIZE {
        return Err(SerializationError::DeserializationError(format!(
            "Illegal {what} type"
        )));
    }
    Ok(len)
}

/// Reads exactly `len` bytes, without trusting `len` for the up-front allocation
fn read_exact_bytes<R: Read>(r: &mut R, len: u32) -> Result<Vec<u8>, SerializationError> {
    let mut data = Vec::new();
    let read = r.take(u64::from(len)).read_to_end(&mut data)?;
    if read != len as usize {
        return Err(SerializationError::DeserializationError(
            "Unexpected end of input".into(),
        ));
    }
    Ok(data)
}

fn length_prefix(len: usize) -> std::io::Result<[u8; 4]> {
    u32::try_from(len).map(u32::to_be_bytes).map_err(|_| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "Length does not fit in a u32 prefix",
        )
    })
}

impl PrincipalData {
    fn inner_consensus_serialize<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        w.write_all(&[TypePrefix::from(self) as u8])?;
        match self {
            PrincipalData::Standard(p) => p.serialize_write(w),
            PrincipalData::Contract(contract_identifier) => {
                contract_identifier.issuer.serialize_write(w)?;
                contract_identifier.name.serialize_write(w)
            }
        }
    }

    fn inner_consensus_deserialize<R: Read>(
        r: &mut R,
    ) -> Result<PrincipalData, SerializationError> {
        let mut header = [0];
        r.read_exact(&mut header)?;

        let prefix = TypePrefix::from_u8(header[0]).ok_or("Bad principal prefix")?;

        match prefix {
            TypePrefix::PrincipalStandard => {
                StandardPrincipalData::deserialize_read(r).map(PrincipalData::from)
            }
            TypePrefix::PrincipalContract => {
                let issuer = StandardPrincipalData::deserialize_read(r)?;
                let name = ContractName::deserialize_read(r)?;
                Ok(PrincipalData::from(QualifiedContractIdentifier {
                    issuer,
                    name,
                }))
            }
            _ => Err("Bad principal prefix".into()),
        }
    }
}

impl StacksMessageCodec for PrincipalData {
    fn consensus_serialize<W: Write>(&self, fd: &mut W) -> Result<(), codec_error> {
        self.inner_consensus_serialize(fd)
            .map_err(codec_error::WriteError)
    }

    fn consensus_deserialize<R: Read>(fd: &mut R) -> Result<PrincipalData, codec_error> {
        PrincipalData::inner_consensus_deserialize(fd)
            .map_err(|e| codec_error::DeserializeError(e.to_string()))
    }
}

impl Value {
    pub fn deserialize_read<R: Read>(r: &mut R) -> Result<Value, SerializationError> {
        Self::deserialize_read_count(r).map(|(value, _)| value)
    }

    /// Deserialize just like `deserialize_read` but also
    ///  return the bytes read
    pub fn deserialize_read_count<R: Read>(r: &mut R) -> Result<(Value, u64), SerializationError> {
        let mut bound_reader = BoundReader::from_reader(r, BOUND_VALUE_SERIALIZATION_BYTES as u64);
        let value = Value::inner_deserialize_read(&mut bound_reader, 0)?;
        Ok((value, bound_reader.num_read()))
    }

    fn inner_deserialize_read<R: Read>(r: &mut R, depth: u8) -> Result<Value, SerializationError> {
        use crate::types::Value::*;

        if depth >= MAX_DESERIALIZATION_DEPTH {
            return Err(ClarityTypeError::TypeSignatureTooDeep.into());
        }

        let mut header = [0];
        r.read_exact(&mut header)?;

        let prefix = TypePrefix::from_u8(header[0]).ok_or("Bad type prefix")?;

        match prefix {
            TypePrefix::Int => {
                let mut buffer = [0; 16];
                r.read_exact(&mut buffer)?;
                Ok(Int(i128::from_be_bytes(buffer)))
            }
            TypePrefix::UInt => {
                let mut buffer = [0; 16];
                r.read_exact(&mut buffer)?;
                Ok(UInt(u128::from_be_bytes(buffer)))
            }
            TypePrefix::Buffer => {
                let buffer_len = read_len_prefix(r, "buffer")?;
                let data = read_exact_bytes(r, buffer_len)?;
                Value::buff_from(data).map_err(|_| "Bad buffer".into())
            }
            TypePrefix::BoolTrue => Ok(Bool(true)),
            TypePrefix::BoolFalse => Ok(Bool(false)),
            TypePrefix::PrincipalStandard => {
                StandardPrincipalData::deserialize_read(r).map(Value::from)
            }
            TypePrefix::PrincipalContract => {
                let issuer = StandardPrincipalData::deserialize_read(r)?;
                let name = ContractName::deserialize_read(r)?;
                Ok(Value::from(QualifiedContractIdentifier { issuer, name }))
            }
            TypePrefix::ResponseOk | TypePrefix::ResponseErr => {
                let committed = prefix == TypePrefix::ResponseOk;
                let data = Value::inner_deserialize_read(r, depth + 1)?;
                let value = if committed {
                    Value::okay(data)
                } else {
                    Value::error(data)
                }?;
                Ok(value)
            }
            TypePrefix::OptionalNone => Ok(Value::none()),
            TypePrefix::OptionalSome => {
                let value = Value::some(Value::inner_deserialize_read(r, depth + 1)?)?;
                Ok(value)
            }
            TypePrefix::List => {
                let len = read_len_prefix(r, "list")?;

                let mut items = Vec::new();
                for _i in 0..len {
                    items.push(Value::inner_deserialize_read(r, depth + 1)?);
                }

                Value::cons_list(items).map_err(|_| "Illegal list type".into())
            }
            TypePrefix::Tuple => {
                let len = read_len_prefix(r, "tuple")?;

                let mut items = Vec::new();
                for _i in 0..len {
                    let key = ClarityName::deserialize_read(r)?;
                    let value = Value::inner_deserialize_read(r, depth + 1)?;
                    items.push((key, value))
                }

                // wire order is not checked; the map puts fields back in canonical order
                TupleData::from_data(items)
                    .map_err(|e| match e {
                        ClarityTypeError::DuplicateTupleField(name) => {
                            SerializationError::DeserializationError(format!(
                                "Duplicate tuple field: {name}"
                            ))
                        }
                        _ => "Illegal tuple type".into(),
                    })
                    .map(Value::from)
            }
            TypePrefix::StringASCII => {
                let buffer_len = read_len_prefix(r, "string-ascii")?;
                let data = read_exact_bytes(r, buffer_len)?;
                Value::string_ascii_from_bytes(data).map_err(|_| "Bad string".into())
            }
            TypePrefix::StringUTF8 => {
                let total_len = read_len_prefix(r, "string-utf8")?;
                let data = read_exact_bytes(r, total_len)?;
                Value::string_utf8_from_bytes(data)
                    .map_err(|_| "Illegal string_utf8 type".into())
            }
        }
    }

    pub fn serialize_write<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        use crate::types::CharType::*;
        use crate::types::PrincipalData::*;
        use crate::types::SequenceData::*;
        use crate::types::Value::*;

        w.write_all(&[TypePrefix::from(self) as u8])?;
        match self {
            Int(value) => w.write_all(&value.to_be_bytes())?,
            UInt(value) => w.write_all(&value.to_be_bytes())?,
            Principal(Standard(data)) => data.serialize_write(w)?,
            Principal(Contract(contract_identifier)) => {
                contract_identifier.issuer.serialize_write(w)?;
                contract_identifier.name.serialize_write(w)?;
            }
            Response(response) => response.data.serialize_write(w)?,
            // Bool types don't need any more data.
            Bool(_) => {}
            // None types don't need any more data.
            Optional(OptionalData { data: None }) => {}
            Optional(OptionalData { data: Some(value) }) => {
                value.serialize_write(w)?;
            }
            Sequence(List(data)) => {
                w.write_all(&length_prefix(data.len())?)?;
                for item in data.data.iter() {
                    item.serialize_write(w)?;
                }
            }
            Sequence(Buffer(value)) => {
                w.write_all(&length_prefix(value.len())?)?;
                w.write_all(&value.data)?
            }
            Sequence(SequenceData::String(UTF8(value))) => {
                w.write_all(&length_prefix(value.byte_len())?)?;
                for bytes in value.data.iter() {
                    w.write_all(bytes)?
                }
            }
            Sequence(SequenceData::String(ASCII(value))) => {
                w.write_all(&length_prefix(value.data.len())?)?;
                w.write_all(&value.data)?
            }
            Tuple(data) => {
                w.write_all(&length_prefix(data.data_map.len())?)?;
                for (key, value) in data.data_map.iter() {
                    key.serialize_write(w)?;
                    value.serialize_write(w)?;
                }
            }
        };

        Ok(())
    }

    pub fn serialize_to_hex(&self) -> String {
        to_hex(&self.serialize_to_vec())
    }

    pub fn deserialize_from_slice(bytes: &[u8]) -> Result<Value, SerializationError> {
        let mut reader = bytes;
        Value::deserialize_read(&mut reader)
    }

    /// Like `deserialize_from_slice`, but every byte of `bytes` must be consumed
    pub fn deserialize_from_slice_exact(bytes: &[u8]) -> Result<Value, SerializationError> {
        let mut reader = bytes;
        let (value, read_count) = Value::deserialize_read_count(&mut reader)?;
        if read_count != bytes.len() as u64 {
            Err(SerializationError::LeftoverBytesInDeserialization)
        } else {
            Ok(value)
        }
    }

    /// Accepts hex with or without a leading `0x`
    pub fn try_deserialize_hex_untyped(hex: &str) -> Result<Value, SerializationError> {
        let hex = hex.strip_prefix("0x").unwrap_or(hex);
        let data = hex_bytes(hex).map_err(|_| "Bad hex string")?;
        Value::deserialize_from_slice(&data)
    }

    pub fn serialized_size(&self) -> u32 {
        let mut counter = WriteCounter { count: 0 };
        match self.serialize_write(&mut counter) {
            Ok(()) => counter.count,
            Err(e) => {
                warn!("Failed to count serialization length of Clarity value"; "err" => %e);
                u32::MAX
            }
        }
    }
}

/// A writer that just counts the bytes written
struct WriteCounter {
    count: u32,
}

impl Write for WriteCounter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let input: u32 = buf.len().try_into().map_err(|_e| {
            std::io::Error::new(
                std::io::ErrorKind::Other,
                "Serialization size would overflow u32",
            )
        })?;
        self.count = self.count.checked_add(input).ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::Other,
                "Serialization size would overflow u32",
            )
        })?;
        Ok(input as usize)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// A reader that refuses to read past a fixed number of bytes, and
/// counts how many it has handed out
struct BoundReader<'a, R: Read> {
    reader: &'a mut R,
    num_read: u64,
    max_read: u64,
}

impl<'a, R: Read> BoundReader<'a, R> {
    fn from_reader(reader: &'a mut R, max_read: u64) -> BoundReader<'a, R> {
        BoundReader {
            reader,
            num_read: 0,
            max_read,
        }
    }

    fn num_read(&self) -> u64 {
        self.num_read
    }
}

impl<R: Read> Read for BoundReader<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let remaining = self.max_read.saturating_sub(self.num_read);
        if remaining == 0 && !buf.is_empty() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::Other,
                "Read bound exceeded",
            ));
        }
        let to_read = buf.len().min(usize::try_from(remaining).unwrap_or(usize::MAX));
        let nr = self.reader.read(&mut buf[..to_read])?;
        self.num_read = self.num_read.saturating_add(nr as u64);
        Ok(nr)
    }
}

impl StacksMessageCodec for Value {
    fn consensus_serialize<W: Write>(&self, fd: &mut W) -> Result<(), codec_error> {
        self.serialize_write(fd).map_err(codec_error::WriteError)
    }

    fn consensus_deserialize<R: Read>(fd: &mut R) -> Result<Value, codec_error> {
        Value::deserialize_read(fd).map_err(|e| match e {
            SerializationError::IOError(e) => codec_error::ReadError(std::io::Error::new(
                std::io::ErrorKind::Other,
                e,
            )),
            _ => codec_error::DeserializeError(format!("Failed to decode clarity value: {:?}", &e)),
        })
    }
}

impl std::hash::Hash for Value {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.serialize_to_vec().hash(state);
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use stacks_common::codec::{read_next, write_next};

    use super::*;
    use crate::types::{ListData, TupleData};

    fn test_deser_ser(v: Value) {
        assert_eq!(
            &v,
            &Value::try_deserialize_hex_untyped(&v.serialize_to_hex()).unwrap()
        );
        assert_eq!(
            v.serialized_size(),
            v.serialize_to_hex().len() as u32 / 2,
            "serialized_size() should return the byte length of the serialization (half the length of the hex encoding)",
        );
    }

    #[test]
    fn test_type_prefix_values() {
        for (ix, prefix) in TypePrefix::ALL.iter().enumerate() {
            assert_eq!(prefix.to_u8() as usize, ix);
            assert_eq!(TypePrefix::from_u8(ix as u8), Some(*prefix));
        }
        assert_eq!(TypePrefix::from_u8(15), None);
    }

    #[rstest]
    #[case(Value::Int(0))]
    #[case(Value::Int(i128::MIN))]
    #[case(Value::Int(i128::MAX))]
    #[case(Value::UInt(u128::MAX))]
    #[case(Value::Bool(true))]
    #[case(Value::Bool(false))]
    #[case(Value::none())]
    #[case(Value::some(Value::buff_from(vec![]).unwrap()).unwrap())]
    #[case(Value::okay(Value::UInt(7)).unwrap())]
    #[case(Value::error(Value::none()).unwrap())]
    #[case(Value::buff_from(vec![0xde, 0xad, 0xbe, 0xef]).unwrap())]
    #[case(Value::string_ascii_from_bytes(b"hello world".to_vec()).unwrap())]
    #[case(Value::string_utf8_from_bytes("hello \u{1F30E}".as_bytes().to_vec()).unwrap())]
    #[case(Value::cons_list(vec![]).unwrap())]
    #[case(Value::cons_list(vec![Value::Int(1), Value::Bool(true)]).unwrap())]
    fn test_round_trip(#[case] value: Value) {
        test_deser_ser(value);
    }

    #[test]
    fn test_bools_and_ints() {
        assert_eq!(Value::Bool(true).serialize_to_hex(), "03");
        assert_eq!(Value::Bool(false).serialize_to_hex(), "04");
        assert_eq!(
            Value::Int(-2).serialize_to_hex(),
            "00fffffffffffffffffffffffffffffffe"
        );
        assert_eq!(
            Value::UInt(256).serialize_to_hex(),
            "0100000000000000000000000000000100"
        );
    }

    #[test]
    fn test_utf8_length_counts_bytes() {
        let v = Value::string_utf8_from_bytes("a\u{e9}\u{1F30E}".as_bytes().to_vec()).unwrap();
        // 1 + 2 + 4 bytes
        assert_eq!(v.serialize_to_hex(), "0e0000000761c3a9f09f8c8e");
    }

    #[test]
    fn test_tuple_wire_order() {
        let name = |s: &str| ClarityName::try_from(s).unwrap();
        let t = Value::from(
            TupleData::from_data(vec![
                (name("foobar"), Value::Bool(true)),
                (name("baz"), Value::none()),
            ])
            .unwrap(),
        );
        assert_eq!(t.serialize_to_hex(), "0c000000020362617a0906666f6f62617203");

        // out-of-order fields on the wire are accepted and canonicalized
        let reordered = "0c0000000206666f6f626172030362617a09";
        let decoded = Value::try_deserialize_hex_untyped(reordered).unwrap();
        assert_eq!(decoded, t);
        assert_eq!(decoded.serialize_to_hex(), "0c000000020362617a0906666f6f62617203");
    }

    #[test]
    fn test_duplicate_tuple_field() {
        let dup = "0c000000020362617a090362617a03";
        assert_eq!(
            Value::try_deserialize_hex_untyped(dup),
            Err(SerializationError::DeserializationError(
                "Duplicate tuple field: baz".into()
            ))
        );
    }

    #[test]
    fn test_empty_tuple_rejected() {
        assert_eq!(
            Value::try_deserialize_hex_untyped("0c00000000"),
            Err(SerializationError::DeserializationError(
                "Illegal tuple type".into()
            ))
        );
    }

    #[test]
    fn test_truncation() {
        for hex in [
            "",
            "00ffff",
            "0200000004dead",
            "050011deadbeef",
            "0b000000020300",
            "0c000000010362617a",
            "0a",
        ] {
            assert_eq!(
                Value::try_deserialize_hex_untyped(hex),
                Err(SerializationError::DeserializationError(
                    "Unexpected end of input".into()
                )),
                "input {hex}"
            );
        }
    }

    #[test]
    fn test_declared_length_overrun() {
        // claims a 1MB buffer but carries 2 bytes
        assert_eq!(
            Value::try_deserialize_hex_untyped("0200100000abcd"),
            Err(SerializationError::DeserializationError(
                "Unexpected end of input".into()
            ))
        );
        assert_eq!(
            Value::try_deserialize_hex_untyped("0200100001abcd"),
            Err(SerializationError::DeserializationError(
                "Illegal buffer type".into()
            ))
        );
    }

    #[test]
    fn test_bad_names() {
        // contract name "1bc"
        assert_eq!(
            Value::try_deserialize_hex_untyped(
                "060011deadbeef11ababffff11deadbeef11ababffff03316263"
            ),
            Err(SerializationError::DeserializationError(
                "Illegal Clarity string".into()
            ))
        );
        // tuple key longer than 128 bytes
        assert_eq!(
            Value::try_deserialize_hex_untyped("0c00000001ff"),
            Err(SerializationError::DeserializationError(
                "String too long".into()
            ))
        );
    }

    #[test]
    fn test_bad_strings() {
        assert_eq!(
            Value::try_deserialize_hex_untyped("0d0000000180"),
            Err(SerializationError::DeserializationError("Bad string".into()))
        );
        assert_eq!(
            Value::try_deserialize_hex_untyped("0e00000002c328"),
            Err(SerializationError::DeserializationError(
                "Illegal string_utf8 type".into()
            ))
        );
    }

    #[test]
    fn try_deser_large_list() {
        let buff = vec![
            11, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255,
        ];

        assert_eq!(
            Value::deserialize_from_slice(&buff).unwrap_err(),
            SerializationError::DeserializationError("Illegal list type".to_string())
        );
    }

    #[test]
    fn try_deser_large_tuple() {
        let buff = vec![
            12, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255,
        ];

        assert_eq!(
            Value::deserialize_from_slice(&buff).unwrap_err(),
            SerializationError::DeserializationError("Illegal tuple type".to_string())
        );
    }

    #[test]
    fn try_overflow_stack() {
        let input = "08080808080808080808070707080807080808080808080708080808080708080707080707080807080808080808080708080808080708080707080708070807080808080808080708080808080708080708080808080808080807070807080808080808070808070707080807070808070808080808070808070708070807080808080808080707080708070807080708080808080808070808080808070808070808080808080808080707080708080808080807080807070708080707080807080808080807080807070807080708080808080808070708070808080808080708080707070808070708080807080807070708";
        assert_eq!(
            Err(ClarityTypeError::TypeSignatureTooDeep.into()),
            Value::try_deserialize_hex_untyped(input)
        );
    }

    #[test]
    fn test_depth_boundary() {
        // 15 wrappers around an int is the deepest accepted value
        let mut hex = "0a".repeat(15);
        hex.push_str("0000000000000000000000000000000001");
        let value = Value::try_deserialize_hex_untyped(&hex).unwrap();
        assert_eq!(value.depth(), 16);

        let too_deep = format!("0a{hex}");
        assert_eq!(
            Value::try_deserialize_hex_untyped(&too_deep),
            Err(SerializationError::DeserializationError(
                "TypeSignatureTooDeep".into()
            ))
        );
    }

    #[test]
    fn test_deepest_constructible_values_round_trip() {
        let field = ClarityName::try_from("a").unwrap();
        let wrappers: [fn(Value) -> Value; 4] = [
            |v| Value::some(v).unwrap(),
            |v| Value::okay(v).unwrap(),
            |v| Value::cons_list(vec![v]).unwrap(),
            |v| {
                Value::from(
                    TupleData::from_data(vec![(ClarityName::try_from("a").unwrap(), v)])
                        .unwrap(),
                )
            },
        ];
        for wrap in wrappers {
            let mut value = Value::Int(1);
            for _ in 1..MAX_TYPE_DEPTH {
                value = wrap(value);
            }
            assert_eq!(value.depth(), MAX_TYPE_DEPTH);
            let bytes = value.serialize_to_vec();
            assert_eq!(Value::deserialize_from_slice_exact(&bytes).unwrap(), value);
        }

        let mut value = Value::Int(1);
        for _ in 1..MAX_TYPE_DEPTH {
            value = Value::error(value).unwrap();
        }
        assert_eq!(
            Value::some(value.clone()),
            Err(ClarityTypeError::TypeSignatureTooDeep)
        );
        assert_eq!(
            TupleData::from_data(vec![(field, value)]),
            Err(ClarityTypeError::TypeSignatureTooDeep)
        );
    }

    #[test]
    fn test_exact_deserialization() {
        let bytes = Value::UInt(1).serialize_to_vec();
        assert_eq!(
            Value::deserialize_from_slice_exact(&bytes).unwrap(),
            Value::UInt(1)
        );

        let mut extra = bytes.clone();
        extra.push(0);
        assert_eq!(
            Value::deserialize_from_slice_exact(&extra),
            Err(SerializationError::LeftoverBytesInDeserialization)
        );
        assert_eq!(Value::deserialize_from_slice(&extra).unwrap(), Value::UInt(1));

        let (_, count) = Value::deserialize_read_count(&mut extra.as_slice()).unwrap();
        assert_eq!(count, 17);
    }

    #[test]
    fn test_hex_input() {
        assert_eq!(
            Value::try_deserialize_hex_untyped("zz"),
            Err(SerializationError::DeserializationError(
                "Bad hex string".into()
            ))
        );
        assert_eq!(
            Value::try_deserialize_hex_untyped("0x03").unwrap(),
            Value::Bool(true)
        );
    }

    #[test]
    fn test_unvalidated_principal_version() {
        let hex = "05ff11deadbeef11ababffff11deadbeef11ababffff";
        let value = Value::try_deserialize_hex_untyped(hex).unwrap();
        let principal = value.clone().expect_principal().unwrap();
        assert_eq!(principal.version(), 0xff);
        assert!(!principal.has_valid_version());
        assert_eq!(value.serialize_to_hex(), hex);
    }

    #[test]
    fn test_message_codec() {
        let principal =
            PrincipalData::parse("SP2J6ZY48GV1EZ5V2V5RB9MP66SW86PYKKNRV9EJ7.hello-world").unwrap();
        let mut bytes = vec![];
        write_next(&mut bytes, &principal).unwrap();
        assert_eq!(bytes[0], TypePrefix::PrincipalContract as u8);
        let decoded: PrincipalData = read_next(&mut bytes.as_slice()).unwrap();
        assert_eq!(decoded, principal);
        assert_eq!(
            Value::from(principal.clone()).serialize_to_vec(),
            principal.serialize_to_vec()
        );

        let value = Value::cons_list(vec![Value::from(principal), Value::UInt(1)]).unwrap();
        let mut bytes = vec![];
        write_next(&mut bytes, &value).unwrap();
        let decoded: Value = read_next(&mut bytes.as_slice()).unwrap();
        assert_eq!(decoded, value);

        assert!(matches!(
            read_next::<Value, _>(&mut &[0x10u8][..]),
            Err(codec_error::DeserializeError(_))
        ));
        assert!(matches!(
            read_next::<PrincipalData, _>(&mut &[0x03u8][..]),
            Err(codec_error::DeserializeError(_))
        ));
    }

    #[test]
    fn test_list_of_lists() {
        let inner = Value::Sequence(SequenceData::List(ListData {
            data: vec![Value::UInt(1), Value::UInt(2)],
        }));
        let outer = Value::cons_list(vec![inner.clone(), inner]).unwrap();
        test_deser_ser(outer);
    }

    #[test]
    fn test_none_serialization_len() {
        assert_eq!(*NONE_SERIALIZATION_LEN, 1);
    }
}
