//! Self-framing wire messages
//!
//! Every message starts with a one-byte tag followed by little-endian
//! fields. Ciphertext bundles carry their own `(ciphertext_byte_size,
//! count)` header, and `from_bytes` checks that the payload length matches it
//! exactly before anything is decoded. Callers never pass framing metadata
//! alongside the bytes.
//!
//! ```text
//! query:  [0x51][client_id u64][size u32][count u32][payload]
//! reply:  [0x52][size u32][count u32][payload]
//! keys:   [0x4B][client_id u64][len u64][bincode GaloisKeys]
//! ```

use std::io::{Cursor, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::engine::RlweEngine;
use crate::ks::GaloisKeys;
use crate::rlwe::RlweCiphertext;

use super::error::{pir_err, PirError, Result};

const QUERY_TAG: u8 = 0x51;
const REPLY_TAG: u8 = 0x52;
const KEYS_TAG: u8 = 0x4B;

/// A counted run of fixed-size serialized ciphertexts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CiphertextBundle {
    ciphertext_byte_size: u32,
    count: u32,
    payload: Vec<u8>,
}

impl CiphertextBundle {
    /// Serialize ciphertexts with the engine's fixed layout
    pub fn from_ciphertexts(engine: &RlweEngine, cts: &[RlweCiphertext]) -> Result<Self> {
        let size = engine.ciphertext_byte_size();
        let mut payload = Vec::with_capacity(size * cts.len());
        for ct in cts {
            if ct.is_ntt() {
                let mut ct = ct.clone();
                engine.from_ntt(&mut ct);
                engine.write_ciphertext(&ct, &mut payload)?;
            } else {
                engine.write_ciphertext(ct, &mut payload)?;
            }
        }
        Ok(Self {
            ciphertext_byte_size: to_u32(size)?,
            count: to_u32(cts.len())?,
            payload,
        })
    }

    pub fn ciphertext_byte_size(&self) -> usize {
        self.ciphertext_byte_size as usize
    }

    pub fn count(&self) -> usize {
        self.count as usize
    }

    /// Decode exactly `expected` ciphertexts
    ///
    /// Fails with `DeserializationError` if the declared size differs from
    /// the engine's, the count differs from `expected`, or a coefficient is
    /// not reduced mod q.
    pub fn ciphertexts(&self, engine: &RlweEngine, expected: usize) -> Result<Vec<RlweCiphertext>> {
        if self.ciphertext_byte_size() != engine.ciphertext_byte_size() {
            return Err(pir_err!(
                DeserializationError,
                "ciphertext size {} does not match parameters ({})",
                self.ciphertext_byte_size,
                engine.ciphertext_byte_size()
            ));
        }
        if self.count() != expected {
            return Err(pir_err!(
                DeserializationError,
                "{} ciphertexts, parameters imply {}",
                self.count,
                expected
            ));
        }

        let mut reader = self.payload.as_slice();
        (0..expected)
            .map(|_| engine.read_ciphertext(&mut reader).map_err(PirError::from))
            .collect()
    }

    fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u32::<LittleEndian>(self.ciphertext_byte_size)?;
        writer.write_u32::<LittleEndian>(self.count)?;
        writer.write_all(&self.payload)?;
        Ok(())
    }

    fn read_from(reader: &mut Cursor<&[u8]>) -> Result<Self> {
        let ciphertext_byte_size = reader.read_u32::<LittleEndian>()?;
        let count = reader.read_u32::<LittleEndian>()?;
        let declared = ciphertext_byte_size as u64 * count as u64;

        let remaining = remaining(reader);
        if remaining != declared {
            return Err(pir_err!(
                DeserializationError,
                "payload is {} bytes, header declares {} x {}",
                remaining,
                count,
                ciphertext_byte_size
            ));
        }

        let mut payload = vec![0u8; declared as usize];
        reader.read_exact(&mut payload)?;
        Ok(Self {
            ciphertext_byte_size,
            count,
            payload,
        })
    }
}

/// Compressed query for one index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryMessage {
    pub client_id: u64,
    pub bundle: CiphertextBundle,
}

impl QueryMessage {
    pub fn ciphertext_byte_size(&self) -> usize {
        self.bundle.ciphertext_byte_size()
    }

    pub fn count(&self) -> usize {
        self.bundle.count()
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(17 + self.bundle.payload.len());
        out.write_u8(QUERY_TAG)?;
        out.write_u64::<LittleEndian>(self.client_id)?;
        self.bundle.write_to(&mut out)?;
        Ok(out)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut reader = Cursor::new(bytes);
        expect_tag(&mut reader, QUERY_TAG)?;
        let client_id = reader.read_u64::<LittleEndian>()?;
        let bundle = CiphertextBundle::read_from(&mut reader)?;
        Ok(Self { client_id, bundle })
    }
}

/// Server reply for one query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyMessage {
    pub bundle: CiphertextBundle,
}

impl ReplyMessage {
    pub fn ciphertext_byte_size(&self) -> usize {
        self.bundle.ciphertext_byte_size()
    }

    pub fn count(&self) -> usize {
        self.bundle.count()
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(9 + self.bundle.payload.len());
        out.write_u8(REPLY_TAG)?;
        self.bundle.write_to(&mut out)?;
        Ok(out)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut reader = Cursor::new(bytes);
        expect_tag(&mut reader, REPLY_TAG)?;
        let bundle = CiphertextBundle::read_from(&mut reader)?;
        Ok(Self { bundle })
    }
}

/// A client's Galois keys, sent once per session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GaloisKeyMessage {
    pub client_id: u64,
    keys: Vec<u8>,
}

impl GaloisKeyMessage {
    pub fn new(client_id: u64, keys: &GaloisKeys) -> Result<Self> {
        Ok(Self {
            client_id,
            keys: bincode::serialize(keys)?,
        })
    }

    /// Decode the keys; structural validation is the receiver's job
    pub fn keys(&self) -> Result<GaloisKeys> {
        Ok(bincode::deserialize(&self.keys)?)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(17 + self.keys.len());
        out.write_u8(KEYS_TAG)?;
        out.write_u64::<LittleEndian>(self.client_id)?;
        out.write_u64::<LittleEndian>(self.keys.len() as u64)?;
        out.write_all(&self.keys)?;
        Ok(out)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut reader = Cursor::new(bytes);
        expect_tag(&mut reader, KEYS_TAG)?;
        let client_id = reader.read_u64::<LittleEndian>()?;
        let len = reader.read_u64::<LittleEndian>()?;

        let remaining = remaining(&reader);
        if remaining != len {
            return Err(pir_err!(
                DeserializationError,
                "key payload is {} bytes, header declares {}",
                remaining,
                len
            ));
        }

        let mut keys = vec![0u8; len as usize];
        reader.read_exact(&mut keys)?;
        Ok(Self { client_id, keys })
    }
}

fn expect_tag(reader: &mut Cursor<&[u8]>, tag: u8) -> Result<()> {
    let found = reader.read_u8()?;
    if found != tag {
        return Err(pir_err!(
            DeserializationError,
            "unexpected message tag {:#04x}, wanted {:#04x}",
            found,
            tag
        ));
    }
    Ok(())
}

fn remaining(reader: &Cursor<&[u8]>) -> u64 {
    (reader.get_ref().len() as u64).saturating_sub(reader.position())
}

fn to_u32(value: usize) -> Result<u32> {
    u32::try_from(value).map_err(|_| pir_err!(CapacityExceeded, "{} does not fit a u32 header", value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::GaussianSampler;
    use crate::params::RlweParams;

    fn engine() -> RlweEngine {
        RlweEngine::new(RlweParams::new(256, 12))
    }

    fn sample_query(engine: &RlweEngine, count: usize) -> (Vec<RlweCiphertext>, QueryMessage) {
        let mut sampler = GaussianSampler::with_seed(3.2, 101);
        let sk = engine.generate_secret_key(&mut sampler);
        let cts: Vec<_> = (0..count)
            .map(|i| engine.encrypt(&sk, &[i as u64], &mut sampler))
            .collect();
        let bundle = CiphertextBundle::from_ciphertexts(engine, &cts).unwrap();
        (cts, QueryMessage { client_id: 42, bundle })
    }

    #[test]
    fn test_query_message_roundtrip() {
        let engine = engine();
        let (cts, msg) = sample_query(&engine, 2);
        assert_eq!(msg.count(), 2);
        assert_eq!(msg.ciphertext_byte_size(), 4096);

        let bytes = msg.to_bytes().unwrap();
        assert_eq!(bytes.len(), 17 + 2 * 4096);
        let back = QueryMessage::from_bytes(&bytes).unwrap();
        assert_eq!(back, msg);
        assert_eq!(back.bundle.ciphertexts(&engine, 2).unwrap(), cts);
    }

    #[test]
    fn test_framing_mismatches_rejected() {
        let engine = engine();
        let (_, msg) = sample_query(&engine, 1);
        let bytes = msg.to_bytes().unwrap();

        // Truncated payload
        assert!(matches!(
            QueryMessage::from_bytes(&bytes[..bytes.len() - 8]),
            Err(PirError::DeserializationError(_))
        ));
        // Trailing garbage
        let mut long = bytes.clone();
        long.push(0);
        assert!(QueryMessage::from_bytes(&long).is_err());
        // Header count inflated without payload
        let mut inflated = bytes.clone();
        inflated[13..17].copy_from_slice(&2u32.to_le_bytes());
        assert!(QueryMessage::from_bytes(&inflated).is_err());
        // Wrong tag
        assert!(ReplyMessage::from_bytes(&bytes).is_err());
        assert!(QueryMessage::from_bytes(&[]).is_err());
    }

    #[test]
    fn test_bundle_checks_against_parameters() {
        let engine = engine();
        let (_, msg) = sample_query(&engine, 1);

        assert!(msg.bundle.ciphertexts(&engine, 2).is_err());

        let bigger = RlweEngine::new(RlweParams::new(512, 12));
        assert!(matches!(
            msg.bundle.ciphertexts(&bigger, 1),
            Err(PirError::DeserializationError(_))
        ));

        // Unreduced coefficient inside an otherwise well-framed message
        let mut bytes = msg.to_bytes().unwrap();
        bytes[17..25].copy_from_slice(&u64::MAX.to_le_bytes());
        let tampered = QueryMessage::from_bytes(&bytes).unwrap();
        assert!(matches!(
            tampered.bundle.ciphertexts(&engine, 1),
            Err(PirError::DeserializationError(_))
        ));
    }

    #[test]
    fn test_reply_and_key_messages_roundtrip() {
        let engine = engine();
        let (cts, _) = sample_query(&engine, 3);
        let reply = ReplyMessage {
            bundle: CiphertextBundle::from_ciphertexts(&engine, &cts).unwrap(),
        };
        let back = ReplyMessage::from_bytes(&reply.to_bytes().unwrap()).unwrap();
        assert_eq!(back.count(), 3);

        let mut sampler = GaussianSampler::with_seed(3.2, 102);
        let sk = engine.generate_secret_key(&mut sampler);
        let keys = engine.generate_galois_keys(&sk, &[257, 129], &mut sampler);
        let msg = GaloisKeyMessage::new(5, &keys).unwrap();
        let back = GaloisKeyMessage::from_bytes(&msg.to_bytes().unwrap()).unwrap();
        assert_eq!(back.client_id, 5);
        assert_eq!(back.keys().unwrap(), keys);

        let bytes = msg.to_bytes().unwrap();
        assert!(GaloisKeyMessage::from_bytes(&bytes[..bytes.len() - 1]).is_err());
    }
}
