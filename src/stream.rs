//! Binary encoding of cached values.

use std::io::{Read, Write};

use crate::error::Error;

/// Compression level used for cached payloads.
const COMPRESSION_LEVEL: i32 = 0;

pub trait Serializable {
    fn serialize(&self, stream: &mut SerializeStream);
}

pub trait Deserializable: Sized {
    fn deserialize(stream: &mut DeserializeStream<'_>) -> Result<Self, Error>;
}

#[derive(Debug, Default)]
pub struct SerializeStream {
    bytes: Vec<u8>,
}

impl SerializeStream {
    pub fn new() -> Self {
        Self { bytes: Vec::new() }
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.bytes.extend_from_slice(bytes);
    }

    /// Compresses the stream into `x`.
    pub fn write_encode(&self, x: impl Write) -> std::io::Result<()> {
        zstd::stream::copy_encode(&*self.bytes, x, COMPRESSION_LEVEL)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

#[derive(Debug)]
pub struct DeserializeStream<'a> {
    idx: usize,
    bytes: &'a [u8],
}

impl<'a> DeserializeStream<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { idx: 0, bytes }
    }

    /// Decompresses a payload written by [`SerializeStream::write_encode`].
    pub fn decode(x: impl Read) -> std::io::Result<Vec<u8>> {
        let mut bytes = Vec::new();
        zstd::stream::copy_decode(x, &mut bytes)?;
        Ok(bytes)
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], Error> {
        let bytes = self
            .idx
            .checked_add(len)
            .and_then(|end| self.bytes.get(self.idx..end))
            .ok_or_else(|| Error::Cache(format!("unexpected end of payload at byte {}", self.idx)))?;
        self.idx += len;
        Ok(bytes)
    }

    pub fn is_exhausted(&self) -> bool {
        self.idx == self.bytes.len()
    }
}

macro_rules! impl_ser {
    ($($T:ty, $S:literal);*) => {
        $(
            impl Serializable for $T {
                #[inline]
                fn serialize(&self, stream: &mut SerializeStream) {
                    stream.write_bytes(&self.to_le_bytes());
                }
            }

            impl Deserializable for $T {
                #[inline]
                fn deserialize(stream: &mut DeserializeStream<'_>) -> Result<Self, Error> {
                    let mut bytes = [0; $S];
                    bytes.copy_from_slice(stream.read_bytes($S)?);
                    Ok(<$T>::from_le_bytes(bytes))
                }
            }
        )*
    };
}

impl_ser! {
    u8, 1;
    u32, 4;
    u64, 8;
    i32, 4;
    f64, 8
}

impl Serializable for usize {
    #[inline]
    fn serialize(&self, stream: &mut SerializeStream) {
        (*self as u64).serialize(stream)
    }
}

impl Deserializable for usize {
    #[inline]
    fn deserialize(stream: &mut DeserializeStream<'_>) -> Result<Self, Error> {
        let value = u64::deserialize(stream)?;
        usize::try_from(value).map_err(|_| Error::Cache(format!("length {value} out of range")))
    }
}

impl Serializable for str {
    fn serialize(&self, stream: &mut SerializeStream) {
        self.len().serialize(stream);
        stream.write_bytes(self.as_bytes());
    }
}

impl Serializable for String {
    fn serialize(&self, stream: &mut SerializeStream) {
        self.as_str().serialize(stream)
    }
}

impl Deserializable for String {
    fn deserialize(stream: &mut DeserializeStream<'_>) -> Result<Self, Error> {
        let len = usize::deserialize(stream)?;
        let bytes = stream.read_bytes(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|e| Error::Cache(e.to_string()))
    }
}

impl<T: Serializable> Serializable for [T] {
    fn serialize(&self, stream: &mut SerializeStream) {
        self.len().serialize(stream);
        for x in self {
            x.serialize(stream)
        }
    }
}

impl<T: Serializable> Serializable for Vec<T> {
    fn serialize(&self, stream: &mut SerializeStream) {
        self.as_slice().serialize(stream)
    }
}

impl<T: Deserializable> Deserializable for Vec<T> {
    fn deserialize(stream: &mut DeserializeStream<'_>) -> Result<Self, Error> {
        let len = usize::deserialize(stream)?;
        // Every element takes at least one byte.
        if len > stream.bytes.len() - stream.idx {
            return Err(Error::Cache(format!("vector length {len} exceeds payload")));
        }

        (0..len).map(|_| T::deserialize(stream)).collect()
    }
}
