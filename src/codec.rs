//! # Pluggable Row Payload Serialization
//!
//! The engine never interprets row payloads: everything written to the
//! data, reverse-index, and meta buckets goes through a [`ValueCodec`]
//! chosen when the database is opened and threaded by value through every
//! store handle. Three codecs ship out of the box:
//!
//! | Codec | Format | Character |
//! |---|---|---|
//! | [`JsonCodec`] | JSON | self-describing text |
//! | [`MsgpackCodec`] | MessagePack | compact tag-length-value |
//! | [`BincodeCodec`] | bincode | length-prefixed binary |
//!
//! A database must be reopened with the codec it was created with; the
//! engine has no way to sniff the payload format.

use eyre::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;

pub trait ValueCodec: Clone {
    fn marshal<T: Serialize>(&self, value: &T) -> Result<Vec<u8>>;
    fn unmarshal<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T>;
}

/// Self-describing JSON codec. The default.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl ValueCodec for JsonCodec {
    fn marshal<T: Serialize>(&self, value: &T) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(value)?)
    }

    fn unmarshal<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Compact MessagePack codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct MsgpackCodec;

impl ValueCodec for MsgpackCodec {
    fn marshal<T: Serialize>(&self, value: &T) -> Result<Vec<u8>> {
        Ok(rmp_serde::to_vec(value)?)
    }

    fn unmarshal<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T> {
        Ok(rmp_serde::from_slice(bytes)?)
    }
}

/// Length-prefixed binary codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct BincodeCodec;

impl ValueCodec for BincodeCodec {
    fn marshal<T: Serialize>(&self, value: &T) -> Result<Vec<u8>> {
        Ok(bincode::serialize(value)?)
    }

    fn unmarshal<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T> {
        Ok(bincode::deserialize(bytes)?)
    }
}
