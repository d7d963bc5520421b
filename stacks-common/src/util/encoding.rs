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

//! Byte-level encoding helpers: base64, arbitrary-width two's complement,
//! fixed-width integer reads/writes and text <-> byte conversions.

use std::{error, fmt};

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine as _;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodingError {
    InvalidBase64(String),
    /// Value does not fit the requested two's complement width
    TwosOutOfRange(u32),
    /// Zero or otherwise unusable bit/byte width
    InvalidWidth(usize),
    /// Tried to read `len` bytes at `offset` from a buffer of `available` bytes
    OutOfBounds {
        offset: usize,
        len: usize,
        available: usize,
    },
    NonAscii(usize),
    InvalidUtf8(String),
}

impl fmt::Display for EncodingError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EncodingError::InvalidBase64(s) => write!(f, "invalid base64: {}", s),
            EncodingError::TwosOutOfRange(w) => {
                write!(f, "value out of range for {}-bit two's complement", w)
            }
            EncodingError::InvalidWidth(w) => write!(f, "invalid width {}", w),
            EncodingError::OutOfBounds {
                offset,
                len,
                available,
            } => write!(
                f,
                "read of {} bytes at offset {} overruns buffer of {} bytes",
                len, offset, available
            ),
            EncodingError::NonAscii(idx) => write!(f, "non-ASCII character at index {}", idx),
            EncodingError::InvalidUtf8(s) => write!(f, "invalid UTF-8: {}", s),
        }
    }
}

impl error::Error for EncodingError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        None
    }
}

pub fn to_base64(data: &[u8]) -> String {
    STANDARD.encode(data)
}

pub fn from_base64(s: &str) -> Result<Vec<u8>, EncodingError> {
    STANDARD
        .decode(s)
        .map_err(|e| EncodingError::InvalidBase64(e.to_string()))
}

/// URL-safe alphabet, no padding
pub fn to_base64_url(data: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(data)
}

/// Decodes URL-safe base64. Trailing `=` padding is tolerated.
pub fn from_base64_url(s: &str) -> Result<Vec<u8>, EncodingError> {
    URL_SAFE_NO_PAD
        .decode(s.trim_end_matches('='))
        .map_err(|e| EncodingError::InvalidBase64(e.to_string()))
}

/// A signed integer of arbitrary size: a sign and a big-endian magnitude.
/// The magnitude never carries leading zero bytes, and zero is never negative.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BigSigned {
    negative: bool,
    magnitude: Vec<u8>,
}

impl BigSigned {
    pub fn new(negative: bool, magnitude: &[u8]) -> BigSigned {
        let magnitude = strip_leading_zeros(magnitude).to_vec();
        let negative = negative && !magnitude.is_empty();
        BigSigned {
            negative,
            magnitude,
        }
    }

    pub fn zero() -> BigSigned {
        BigSigned::new(false, &[])
    }

    pub fn is_negative(&self) -> bool {
        self.negative
    }

    pub fn is_zero(&self) -> bool {
        self.magnitude.is_empty()
    }

    /// Big-endian magnitude, empty for zero
    pub fn magnitude(&self) -> &[u8] {
        &self.magnitude
    }

    pub fn to_i128(&self) -> Option<i128> {
        if self.magnitude.len() > 16 {
            return None;
        }
        let mut buf = [0u8; 16];
        buf[16 - self.magnitude.len()..].copy_from_slice(&self.magnitude);
        let mag = u128::from_be_bytes(buf);
        if self.negative {
            if mag > (i128::MAX as u128) + 1 {
                None
            } else {
                Some((mag as i128).wrapping_neg())
            }
        } else {
            i128::try_from(mag).ok()
        }
    }
}

impl From<i128> for BigSigned {
    fn from(v: i128) -> BigSigned {
        BigSigned::new(v < 0, &v.unsigned_abs().to_be_bytes())
    }
}

impl From<u128> for BigSigned {
    fn from(v: u128) -> BigSigned {
        BigSigned::new(false, &v.to_be_bytes())
    }
}

impl From<i64> for BigSigned {
    fn from(v: i64) -> BigSigned {
        BigSigned::from(v as i128)
    }
}

impl fmt::Display for BigSigned {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.negative {
            write!(f, "-")?;
        }
        write!(f, "0x{}", crate::util::hash::to_hex(&self.magnitude))
    }
}

fn strip_leading_zeros(bytes: &[u8]) -> &[u8] {
    let first = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    &bytes[first..]
}

fn bit_length(be: &[u8]) -> usize {
    let be = strip_leading_zeros(be);
    match be.first() {
        None => 0,
        Some(top) => (be.len() - 1) * 8 + (8 - top.leading_zeros() as usize),
    }
}

fn is_power_of_two(be: &[u8]) -> bool {
    let be = strip_leading_zeros(be);
    match be.split_first() {
        None => false,
        Some((top, rest)) => top.count_ones() == 1 && rest.iter().all(|b| *b == 0),
    }
}

fn width_bytes(bit_width: u32) -> usize {
    ((bit_width as usize) + 7) / 8
}

/// Left-pad into exactly `len` bytes.  Caller guarantees `be` fits.
fn pad_be(be: &[u8], len: usize) -> Vec<u8> {
    let be = strip_leading_zeros(be);
    let mut out = vec![0u8; len];
    out[len - be.len()..].copy_from_slice(be);
    out
}

/// Replace `buf` with 2^(8*len) - buf
fn negate_in_place(buf: &mut [u8]) {
    let mut carry = true;
    for byte in buf.iter_mut().rev() {
        let inverted = !*byte;
        let (sum, overflow) = inverted.overflowing_add(carry as u8);
        *byte = sum;
        carry = overflow;
    }
}

fn mask_to_width(buf: &mut [u8], bit_width: u32) {
    let spare = buf.len() * 8 - bit_width as usize;
    if spare > 0 {
        if let Some(top) = buf.first_mut() {
            *top &= 0xffu8 >> spare;
        }
    }
}

/// Encode `value` as a `bit_width`-bit two's complement integer, returned as
/// `ceil(bit_width / 8)` big-endian bytes.
pub fn to_twos(value: &BigSigned, bit_width: u32) -> Result<Vec<u8>, EncodingError> {
    if bit_width == 0 {
        return Err(EncodingError::InvalidWidth(0));
    }
    let limit = (bit_width - 1) as usize;
    let bits = bit_length(&value.magnitude);
    let fits = if value.negative {
        bits <= limit || (bits == limit + 1 && is_power_of_two(&value.magnitude))
    } else {
        bits <= limit
    };
    if !fits {
        return Err(EncodingError::TwosOutOfRange(bit_width));
    }

    let mut out = pad_be(&value.magnitude, width_bytes(bit_width));
    if value.negative {
        negate_in_place(&mut out);
        mask_to_width(&mut out, bit_width);
    }
    Ok(out)
}

/// Decode big-endian `bytes` as a `bit_width`-bit two's complement integer.
/// The raw unsigned value must fit in `bit_width` bits.
pub fn from_twos(bytes: &[u8], bit_width: u32) -> Result<BigSigned, EncodingError> {
    if bit_width == 0 {
        return Err(EncodingError::InvalidWidth(0));
    }
    if bit_length(bytes) > bit_width as usize {
        return Err(EncodingError::TwosOutOfRange(bit_width));
    }
    let mut buf = pad_be(bytes, width_bytes(bit_width));
    let sign_bit = (bit_width - 1) as usize;
    let sign_byte = buf.len() - 1 - sign_bit / 8;
    let negative = buf[sign_byte] & (1u8 << (sign_bit % 8)) != 0;
    if negative {
        negate_in_place(&mut buf);
        mask_to_width(&mut buf, bit_width);
    }
    Ok(BigSigned::new(negative, &buf))
}

/// `to_twos` for native integers of up to 128 bits
pub fn to_twos_i128(value: i128, bit_width: u32) -> Result<u128, EncodingError> {
    if bit_width > 128 {
        return Err(EncodingError::InvalidWidth(bit_width as usize));
    }
    let bytes = to_twos(&BigSigned::from(value), bit_width)?;
    let mut buf = [0u8; 16];
    buf[16 - bytes.len()..].copy_from_slice(&bytes);
    Ok(u128::from_be_bytes(buf))
}

/// `from_twos` for native integers of up to 128 bits
pub fn from_twos_u128(raw: u128, bit_width: u32) -> Result<i128, EncodingError> {
    if bit_width > 128 {
        return Err(EncodingError::InvalidWidth(bit_width as usize));
    }
    from_twos(&raw.to_be_bytes(), bit_width)?
        .to_i128()
        .ok_or(EncodingError::TwosOutOfRange(bit_width))
}

fn read_array<const N: usize>(bytes: &[u8], offset: usize) -> Result<[u8; N], EncodingError> {
    let oob = EncodingError::OutOfBounds {
        offset,
        len: N,
        available: bytes.len(),
    };
    let end = offset.checked_add(N).ok_or_else(|| oob.clone())?;
    let slice = bytes.get(offset..end).ok_or(oob)?;
    let mut out = [0u8; N];
    out.copy_from_slice(slice);
    Ok(out)
}

pub fn read_u16_be(bytes: &[u8], offset: usize) -> Result<u16, EncodingError> {
    read_array(bytes, offset).map(u16::from_be_bytes)
}

pub fn read_u16_le(bytes: &[u8], offset: usize) -> Result<u16, EncodingError> {
    read_array(bytes, offset).map(u16::from_le_bytes)
}

pub fn read_u32_be(bytes: &[u8], offset: usize) -> Result<u32, EncodingError> {
    read_array(bytes, offset).map(u32::from_be_bytes)
}

pub fn read_u32_le(bytes: &[u8], offset: usize) -> Result<u32, EncodingError> {
    read_array(bytes, offset).map(u32::from_le_bytes)
}

pub fn read_u64_be(bytes: &[u8], offset: usize) -> Result<u64, EncodingError> {
    read_array(bytes, offset).map(u64::from_be_bytes)
}

pub fn read_u64_le(bytes: &[u8], offset: usize) -> Result<u64, EncodingError> {
    read_array(bytes, offset).map(u64::from_le_bytes)
}

fn check_uint_width(value: u64, width: usize) -> Result<(), EncodingError> {
    if width == 0 || width > 8 {
        return Err(EncodingError::InvalidWidth(width));
    }
    if width < 8 && value >> (width * 8) != 0 {
        return Err(EncodingError::TwosOutOfRange((width * 8) as u32));
    }
    Ok(())
}

/// Write `value` as exactly `width` big-endian bytes (1 to 8)
pub fn write_uint_be(value: u64, width: usize) -> Result<Vec<u8>, EncodingError> {
    check_uint_width(value, width)?;
    Ok(value.to_be_bytes()[8 - width..].to_vec())
}

/// Write `value` as exactly `width` little-endian bytes (1 to 8)
pub fn write_uint_le(value: u64, width: usize) -> Result<Vec<u8>, EncodingError> {
    check_uint_width(value, width)?;
    Ok(value.to_le_bytes()[..width].to_vec())
}

pub fn ascii_to_bytes(s: &str) -> Result<Vec<u8>, EncodingError> {
    match s.char_indices().find(|(_, c)| !c.is_ascii()) {
        Some((idx, _)) => Err(EncodingError::NonAscii(idx)),
        None => Ok(s.as_bytes().to_vec()),
    }
}

pub fn bytes_to_ascii(bytes: &[u8]) -> Result<String, EncodingError> {
    match bytes.iter().position(|b| !b.is_ascii()) {
        Some(idx) => Err(EncodingError::NonAscii(idx)),
        None => Ok(bytes.iter().map(|b| *b as char).collect()),
    }
}

pub fn utf8_to_bytes(s: &str) -> Vec<u8> {
    s.as_bytes().to_vec()
}

pub fn bytes_to_utf8(bytes: &[u8]) -> Result<String, EncodingError> {
    String::from_utf8(bytes.to_vec()).map_err(|e| EncodingError::InvalidUtf8(e.to_string()))
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn test_base64() {
        assert_eq!(to_base64(b"hello?"), "aGVsbG8/");
        assert_eq!(to_base64(b"ab"), "YWI=");
        assert_eq!(from_base64("YWI=").unwrap(), b"ab".to_vec());
        assert_eq!(to_base64_url(&[0xfb, 0xff]), "-_8");
        assert_eq!(from_base64_url("-_8").unwrap(), vec![0xfb, 0xff]);
        assert_eq!(from_base64_url("-_8=").unwrap(), vec![0xfb, 0xff]);
        assert!(from_base64("-_8=").is_err());
        assert!(from_base64_url("a").is_err());
    }

    #[rstest]
    #[case(0x80000000, 32, -2147483648)]
    #[case(0xffffffff, 32, -1)]
    #[case(0x7fffffff, 32, 2147483647)]
    #[case(0x0, 8, 0)]
    #[case(0x80, 8, -128)]
    #[case(0x1f, 5, -1)]
    #[case(0x10, 5, -16)]
    #[case(0x0f, 5, 15)]
    fn test_twos_vectors(#[case] raw: u128, #[case] width: u32, #[case] value: i128) {
        assert_eq!(from_twos_u128(raw, width).unwrap(), value);
        assert_eq!(to_twos_i128(value, width).unwrap(), raw);
    }

    #[test]
    fn test_twos_out_of_range() {
        assert_eq!(
            to_twos_i128(128, 8),
            Err(EncodingError::TwosOutOfRange(8))
        );
        assert_eq!(
            to_twos_i128(-129, 8),
            Err(EncodingError::TwosOutOfRange(8))
        );
        assert_eq!(
            from_twos_u128(0x100, 8),
            Err(EncodingError::TwosOutOfRange(8))
        );
        assert_eq!(to_twos_i128(0, 0), Err(EncodingError::InvalidWidth(0)));
        assert_eq!(to_twos_i128(i128::MIN, 128).unwrap(), 1u128 << 127);
        assert_eq!(from_twos_u128(u128::MAX, 128).unwrap(), -1);
    }

    #[test]
    fn test_twos_wide() {
        // 256-bit -1 is 32 bytes of 0xff
        let minus_one = to_twos(&BigSigned::from(-1i128), 256).unwrap();
        assert_eq!(minus_one, vec![0xff; 32]);
        let decoded = from_twos(&minus_one, 256).unwrap();
        assert_eq!(decoded, BigSigned::from(-1i128));

        // -2^255 round-trips at 256 bits
        let mut min = vec![0u8; 32];
        min[0] = 0x80;
        let decoded = from_twos(&min, 256).unwrap();
        assert!(decoded.is_negative());
        assert_eq!(decoded.magnitude(), &min[..]);
        assert_eq!(to_twos(&decoded, 256).unwrap(), min);
    }

    #[test]
    fn test_fixed_width_ints() {
        let buf = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09];
        assert_eq!(read_u16_be(&buf, 0).unwrap(), 0x0102);
        assert_eq!(read_u16_le(&buf, 1).unwrap(), 0x0302);
        assert_eq!(read_u32_be(&buf, 0).unwrap(), 0x01020304);
        assert_eq!(read_u32_le(&buf, 0).unwrap(), 0x04030201);
        assert_eq!(read_u64_be(&buf, 1).unwrap(), 0x0203040506070809);
        assert_eq!(read_u64_le(&buf, 0).unwrap(), 0x0807060504030201);
        assert_eq!(
            read_u32_be(&buf, 6),
            Err(EncodingError::OutOfBounds {
                offset: 6,
                len: 4,
                available: 9
            })
        );
        assert!(read_u16_le(&buf, usize::MAX).is_err());

        assert_eq!(write_uint_be(0x0102, 4).unwrap(), vec![0, 0, 1, 2]);
        assert_eq!(write_uint_le(0x0102, 3).unwrap(), vec![2, 1, 0]);
        assert!(write_uint_be(0x100, 1).is_err());
        assert!(write_uint_le(1, 9).is_err());
    }

    #[test]
    fn test_text() {
        assert_eq!(ascii_to_bytes("hi!").unwrap(), b"hi!".to_vec());
        assert_eq!(ascii_to_bytes("hé"), Err(EncodingError::NonAscii(1)));
        assert_eq!(bytes_to_ascii(b"ok").unwrap(), "ok");
        assert_eq!(bytes_to_ascii(&[0x41, 0x80]), Err(EncodingError::NonAscii(1)));
        assert_eq!(utf8_to_bytes("é"), vec![0xc3, 0xa9]);
        assert_eq!(bytes_to_utf8(&[0xc3, 0xa9]).unwrap(), "é");
        assert!(bytes_to_utf8(&[0xc3]).is_err());
    }
}
