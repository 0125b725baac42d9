//! Binary encoding helpers
//!
//! Base58 is the text form of addresses and signatures, base64 is the
//! transport form of serialized transactions, and shortvec is the
//! compact-u16 length prefix used by the ledger wire format.

use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// Encoding used when a serialized transaction is handed to the RPC node
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionEncoding {
    Base58,
    #[default]
    Base64,
}

impl TransactionEncoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionEncoding::Base58 => "base58",
            TransactionEncoding::Base64 => "base64",
        }
    }

    pub fn encode(&self, bytes: &[u8]) -> String {
        match self {
            TransactionEncoding::Base58 => encode_base58(bytes),
            TransactionEncoding::Base64 => encode_base64(bytes),
        }
    }

    pub fn decode(&self, text: &str) -> Result<Vec<u8>, ParseError> {
        match self {
            TransactionEncoding::Base58 => decode_base58(text),
            TransactionEncoding::Base64 => base64::engine::general_purpose::STANDARD
                .decode(text)
                .map_err(|e| ParseError::Encoding(e.to_string())),
        }
    }
}

pub fn encode_base58(bytes: &[u8]) -> String {
    bs58::encode(bytes).into_string()
}

pub fn decode_base58(text: &str) -> Result<Vec<u8>, ParseError> {
    bs58::decode(text)
        .into_vec()
        .map_err(|e| ParseError::Encoding(e.to_string()))
}

/// Decode base58 into a fixed-size array, rejecting any other length
pub fn decode_base58_array<const N: usize>(text: &str) -> Result<[u8; N], ParseError> {
    let bytes = decode_base58(text)?;
    let len = bytes.len();
    bytes
        .try_into()
        .map_err(|_| ParseError::Length { expected: N, actual: len })
}

pub fn encode_base64(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

/// Append a compact-u16 length: 7 bits per byte, high bit set while more follow
pub fn write_shortvec_len(out: &mut Vec<u8>, len: usize) -> Result<(), ParseError> {
    let mut rem = u16::try_from(len).map_err(|_| ParseError::ShortVecOverflow(len))?;
    loop {
        let mut byte = (rem & 0x7f) as u8;
        rem >>= 7;
        if rem == 0 {
            out.push(byte);
            return Ok(());
        }
        byte |= 0x80;
        out.push(byte);
    }
}

/// Read a compact-u16 length, returning it with the number of bytes consumed
pub fn read_shortvec_len(bytes: &[u8]) -> Result<(usize, usize), ParseError> {
    let mut value: usize = 0;
    for (i, byte) in bytes.iter().take(3).enumerate() {
        value |= ((byte & 0x7f) as usize) << (7 * i);
        if byte & 0x80 == 0 {
            if value > u16::MAX as usize {
                return Err(ParseError::ShortVecOverflow(value));
            }
            return Ok((value, i + 1));
        }
    }
    Err(ParseError::Truncated)
}
