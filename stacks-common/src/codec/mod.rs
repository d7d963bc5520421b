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

use std::io::{Read, Write};
use std::{error, fmt, io, mem};

#[macro_use]
pub mod macros;

#[cfg(test)]
mod tests;

#[derive(Debug)]
pub enum Error {
    /// Failed to encode
    SerializeError(String),
    /// Failed to read
    ReadError(io::Error),
    /// Failed to decode
    DeserializeError(String),
    /// Failed to write
    WriteError(io::Error),
    /// Underflow -- not enough bytes to form the message
    UnderflowError(String),
    /// Overflow -- message too big
    OverflowError(String),
    /// Array is too big
    ArrayTooLong,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::SerializeError(ref s) => fmt::Display::fmt(s, f),
            Error::DeserializeError(ref s) => fmt::Display::fmt(s, f),
            Error::ReadError(ref io) => fmt::Display::fmt(io, f),
            Error::WriteError(ref io) => fmt::Display::fmt(io, f),
            Error::UnderflowError(ref s) => fmt::Display::fmt(s, f),
            Error::OverflowError(ref s) => fmt::Display::fmt(s, f),
            Error::ArrayTooLong => write!(f, "Array too long"),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            Error::ReadError(ref io) => Some(io),
            Error::WriteError(ref io) => Some(io),
            _ => None,
        }
    }
}

/// Helper trait for the primitive types that make up wire messages
pub trait StacksMessageCodec {
    /// serialize implementors _should never_ error unless there is an underlying
    ///   failure in writing to the `fd`
    fn consensus_serialize<W: Write>(&self, fd: &mut W) -> Result<(), Error>
    where
        Self: Sized;
    fn consensus_deserialize<R: Read>(fd: &mut R) -> Result<Self, Error>
    where
        Self: Sized;
    /// Convenience for serialization to a vec.
    ///  this function unwraps any underlying serialization error
    fn serialize_to_vec(&self) -> Vec<u8>
    where
        Self: Sized,
    {
        let mut bytes = vec![];
        self.consensus_serialize(&mut bytes)
            .expect("BUG: serialization to buffer failed.");
        bytes
    }
}

impl_stacks_message_codec_for_int!(u8; [0; 1]);
impl_stacks_message_codec_for_int!(u16; [0; 2]);
impl_stacks_message_codec_for_int!(u32; [0; 4]);
impl_stacks_message_codec_for_int!(u64; [0; 8]);
impl_stacks_message_codec_for_int!(i64; [0; 8]);
impl_stacks_message_codec_for_int!(u128; [0; 16]);
impl_stacks_message_codec_for_int!(i128; [0; 16]);

impl StacksMessageCodec for bool {
    fn consensus_serialize<W: Write>(&self, fd: &mut W) -> Result<(), Error> {
        let byte: u8 = if *self { 1 } else { 0 };
        write_next(fd, &byte)
    }

    fn consensus_deserialize<R: Read>(fd: &mut R) -> Result<bool, Error> {
        match read_next::<u8, _>(fd)? {
            0 => Ok(false),
            1 => Ok(true),
            x => Err(Error::DeserializeError(format!("Invalid bool value {}", x))),
        }
    }
}

impl<T: StacksMessageCodec> StacksMessageCodec for Option<T> {
    fn consensus_serialize<W: Write>(&self, fd: &mut W) -> Result<(), Error> {
        match self {
            None => write_next(fd, &false),
            Some(item) => {
                write_next(fd, &true)?;
                write_next(fd, item)
            }
        }
    }

    fn consensus_deserialize<R: Read>(fd: &mut R) -> Result<Option<T>, Error> {
        if read_next::<bool, _>(fd)? {
            Ok(Some(read_next(fd)?))
        } else {
            Ok(None)
        }
    }
}

impl StacksMessageCodec for [u8; 32] {
    fn consensus_serialize<W: Write>(&self, fd: &mut W) -> Result<(), Error> {
        fd.write_all(self).map_err(Error::WriteError)
    }

    fn consensus_deserialize<R: Read>(fd: &mut R) -> Result<[u8; 32], Error> {
        let mut buf = [0u8; 32];
        fd.read_exact(&mut buf).map_err(Error::ReadError)?;
        Ok(buf)
    }
}

pub fn write_next<T: StacksMessageCodec, W: Write>(fd: &mut W, item: &T) -> Result<(), Error> {
    item.consensus_serialize(fd)
}

pub fn read_next<T: StacksMessageCodec, R: Read>(fd: &mut R) -> Result<T, Error> {
    let item: T = T::consensus_deserialize(fd)?;
    Ok(item)
}

fn read_next_vec<T: StacksMessageCodec + Sized, R: Read>(
    fd: &mut R,
    num_items: u32,
    max_items: u32,
) -> Result<Vec<T>, Error> {
    let len = u32::consensus_deserialize(fd)?;

    if max_items > 0 {
        if len > max_items {
            // too many items
            return Err(Error::DeserializeError(format!(
                "Array has too many items ({} > {}",
                len, max_items
            )));
        }
    } else if len != num_items {
        // inexact item count
        return Err(Error::DeserializeError(format!(
            "Array has incorrect number of items ({} != {})",
            len, num_items
        )));
    }

    if (mem::size_of::<T>() as u128) * (len as u128) > MAX_MESSAGE_LEN as u128 {
        return Err(Error::DeserializeError(format!(
            "Message occupies too many bytes (tried to allocate {}*{}={})",
            mem::size_of::<T>() as u128,
            len,
            (mem::size_of::<T>() as u128) * (len as u128)
        )));
    }

    let mut ret = Vec::with_capacity(len as usize);
    for _i in 0..len {
        let next_item = T::consensus_deserialize(fd)?;
        ret.push(next_item);
    }

    Ok(ret)
}

pub fn read_next_at_most<R: Read, T: StacksMessageCodec + Sized>(
    fd: &mut R,
    max_items: u32,
) -> Result<Vec<T>, Error> {
    read_next_vec::<T, R>(fd, 0, max_items)
}

pub fn read_next_exact<R: Read, T: StacksMessageCodec + Sized>(
    fd: &mut R,
    num_items: u32,
) -> Result<Vec<T>, Error> {
    read_next_vec::<T, R>(fd, num_items, 0)
}

impl<T> StacksMessageCodec for Vec<T>
where
    T: StacksMessageCodec + Sized,
{
    fn consensus_serialize<W: Write>(&self, fd: &mut W) -> Result<(), Error> {
        let len = u32::try_from(self.len()).map_err(|_| Error::ArrayTooLong)?;
        write_next(fd, &len)?;
        for item in self.iter() {
            write_next(fd, item)?;
        }
        Ok(())
    }

    fn consensus_deserialize<R: Read>(fd: &mut R) -> Result<Vec<T>, Error> {
        read_next_at_most::<R, T>(fd, u32::MAX)
    }
}

/// Largest message this codec will allocate for: 16MB plus a small preamble
pub const MAX_MESSAGE_LEN: u32 = 1 + 16 * 1024 * 1024 + 1024;

/// Bitcoin-style variable-length unsigned integer.
///
/// | value range              | encoding               |
/// |--------------------------|------------------------|
/// | `< 0xfd`                 | 1 byte                 |
/// | `<= 0xffff`              | `0xfd` + u16 LE        |
/// | `<= 0xffff_ffff`         | `0xfe` + u32 LE        |
/// | otherwise                | `0xff` + u64 LE        |
///
/// Decoding only accepts the shortest encoding of a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VarUint(pub u64);

impl VarUint {
    pub fn encoding_length(&self) -> usize {
        match self.0 {
            0..=0xfc => 1,
            0xfd..=0xffff => 3,
            0x1_0000..=0xffff_ffff => 5,
            _ => 9,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.encoding_length());
        match self.0 {
            0..=0xfc => out.push(self.0 as u8),
            0xfd..=0xffff => {
                out.push(0xfd);
                out.extend_from_slice(&(self.0 as u16).to_le_bytes());
            }
            0x1_0000..=0xffff_ffff => {
                out.push(0xfe);
                out.extend_from_slice(&(self.0 as u32).to_le_bytes());
            }
            _ => {
                out.push(0xff);
                out.extend_from_slice(&self.0.to_le_bytes());
            }
        }
        out
    }

    /// Decode a varuint from the front of `bytes`, returning it together with
    /// the number of bytes consumed.
    pub fn decode(bytes: &[u8]) -> Result<(VarUint, usize), Error> {
        let mut cursor = io::Cursor::new(bytes);
        let value = VarUint::consensus_deserialize(&mut cursor)?;
        Ok((value, value.encoding_length()))
    }
}

fn read_le<R: Read, const N: usize>(fd: &mut R) -> Result<[u8; N], Error> {
    let mut buf = [0u8; N];
    fd.read_exact(&mut buf).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => {
            Error::DeserializeError("Truncated varuint".to_string())
        }
        _ => Error::ReadError(e),
    })?;
    Ok(buf)
}

impl StacksMessageCodec for VarUint {
    fn consensus_serialize<W: Write>(&self, fd: &mut W) -> Result<(), Error> {
        fd.write_all(&self.encode()).map_err(Error::WriteError)
    }

    fn consensus_deserialize<R: Read>(fd: &mut R) -> Result<VarUint, Error> {
        let [prefix] = read_le::<_, 1>(fd)?;
        let (value, min) = match prefix {
            0xfd => (u16::from_le_bytes(read_le(fd)?) as u64, 0xfd),
            0xfe => (u32::from_le_bytes(read_le(fd)?) as u64, 0x1_0000),
            0xff => (u64::from_le_bytes(read_le(fd)?), 0x1_0000_0000),
            x => return Ok(VarUint(x as u64)),
        };
        if value < min {
            return Err(Error::DeserializeError(format!(
                "Non-minimal varuint encoding of {}",
                value
            )));
        }
        Ok(VarUint(value))
    }
}

impl From<u64> for VarUint {
    fn from(v: u64) -> VarUint {
        VarUint(v)
    }
}

impl From<usize> for VarUint {
    fn from(v: usize) -> VarUint {
        VarUint(v as u64)
    }
}
