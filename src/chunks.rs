//! PNG chunk vocabulary and the chunk-level codec.
//!
//! A PNG stream is the 8-byte signature followed by a flat sequence of
//! chunks, each framed as a 4-byte big-endian payload length, a 4-byte type
//! tag, the payload, and a CRC-32 over type and payload.
//! See PNG (Second Edition) § 5.3.

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

#![allow(non_upper_case_globals)]

use crate::{be_u32, Error, ParseOptions, Result};
use fallible_collections::{TryClone, TryVec};
use log::debug;
use std::fmt;

/// The fixed 8-byte magic sequence every PNG stream begins with.
pub const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

/// Check whether `bytes` carries the PNG signature.
///
/// Inputs shorter than 8 bytes are simply not PNG; this never errors.
pub fn is_png(bytes: &[u8]) -> bool {
    bytes.len() >= PNG_SIGNATURE.len() && bytes[..PNG_SIGNATURE.len()] == PNG_SIGNATURE
}

/// Case-sensitive 4-byte chunk type tag.
///
/// The case of each letter is meaningful per PNG § 5.4 (the first letter
/// marks critical vs ancillary) and is preserved as-is, never normalized.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkType(pub [u8; 4]);

/// Image header
pub const IHDR: ChunkType = ChunkType(*b"IHDR");
/// Palette
pub const PLTE: ChunkType = ChunkType(*b"PLTE");
/// Image data
pub const IDAT: ChunkType = ChunkType(*b"IDAT");
/// Image trailer
pub const IEND: ChunkType = ChunkType(*b"IEND");
/// Animation control
pub const acTL: ChunkType = ChunkType(*b"acTL");
/// Frame control
pub const fcTL: ChunkType = ChunkType(*b"fcTL");
/// Frame data
pub const fdAT: ChunkType = ChunkType(*b"fdAT");

impl ChunkType {
    /// True for critical chunks (bit 5 of the first byte clear).
    pub const fn is_critical(self) -> bool {
        self.0[0] & 32 == 0
    }

    /// Chunk types that must precede the image data within a single PNG.
    /// See PNG § 5.6 for the ordering constraints.
    pub fn is_before_idat(self) -> bool {
        matches!(
            &self.0,
            b"cHRM"
                | b"gAMA"
                | b"iCCP"
                | b"sBIT"
                | b"sRGB"
                | b"bKGD"
                | b"hIST"
                | b"tRNS"
                | b"pHYs"
                | b"sPLT"
                | b"tIME"
                | b"PLTE"
        )
    }
}

impl fmt::Display for ChunkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in &self.0 {
            write!(f, "{}", char::from(b))?;
        }
        Ok(())
    }
}

impl fmt::Debug for ChunkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChunkType(")?;
        fmt::Display::fmt(self, f)?;
        write!(f, ")")
    }
}

/// One framed chunk, owned as its exact on-wire bytes.
///
/// Invariant: `raw` is always `length ‖ type ‖ payload ‖ crc` with the
/// length field equal to the payload length. [`Chunk::build`] is the only
/// construction path for synthesized chunks, so chunks it returns always
/// carry a correct CRC.
#[derive(Debug)]
pub struct Chunk {
    kind: ChunkType,
    raw: TryVec<u8>,
}

impl Chunk {
    /// Frame `payload` as a chunk of type `kind`, computing length and CRC-32.
    pub fn build(kind: ChunkType, payload: &[u8]) -> Result<Chunk> {
        let len = u32::try_from(payload.len()).map_err(|_| Error::InvalidData("chunk payload too long"))?;
        let mut raw = TryVec::with_capacity(payload.len() + 12)?;
        raw.extend_from_slice(&len.to_be_bytes())?;
        raw.extend_from_slice(&kind.0)?;
        raw.extend_from_slice(payload)?;
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&kind.0);
        hasher.update(payload);
        raw.extend_from_slice(&hasher.finalize().to_be_bytes())?;
        Ok(Chunk { kind, raw })
    }

    pub fn kind(&self) -> ChunkType {
        self.kind
    }

    /// The payload bytes, excluding length, type and CRC.
    pub fn payload(&self) -> &[u8] {
        &self.raw[8..self.raw.len() - 4]
    }

    /// The declared payload length from the framing header.
    pub fn data_len(&self) -> u32 {
        u32::from_be_bytes([self.raw[0], self.raw[1], self.raw[2], self.raw[3]])
    }

    /// The fully framed bytes as they appear in the stream.
    pub fn as_bytes(&self) -> &[u8] {
        &self.raw
    }

    pub fn try_clone(&self) -> Result<Chunk> {
        Ok(Chunk {
            kind: self.kind,
            raw: self.raw.try_clone()?,
        })
    }

    /// Recompute the CRC-32 over type and payload and compare with the
    /// trailing checksum field.
    fn verify_crc(&self) -> Result<()> {
        let declared = {
            let mut tail = &self.raw[self.raw.len() - 4..];
            be_u32(&mut tail)?
        };
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&self.raw[4..self.raw.len() - 4]);
        if hasher.finalize() != declared {
            return Err(Error::InvalidData("chunk CRC mismatch"));
        }
        Ok(())
    }
}

/// Lazy forward-only iterator over the chunks of a PNG stream.
///
/// Created by [`parse_chunks`], positioned just past the signature. Yields
/// one [`Chunk`] per framing unit in a single left-to-right pass; stops
/// permanently after the first error.
pub struct ChunkIter<'a> {
    src: &'a [u8],
    pos: usize,
    verify_crc: bool,
}

impl ChunkIter<'_> {
    /// Bytes not yet consumed by the iterator.
    pub fn bytes_left(&self) -> usize {
        self.src.len() - self.pos
    }

    fn next_chunk(&mut self) -> Result<Chunk> {
        let header = self
            .src
            .get(self.pos..self.pos + 8)
            .ok_or(Error::InvalidData("truncated chunk header"))?;
        let data_len = {
            let mut src = header;
            be_u32(&mut src)?
        };
        let total = (data_len as usize)
            .checked_add(12)
            .ok_or(Error::InvalidData("chunk length overflow"))?;
        let raw = self
            .src
            .get(self.pos..self.pos + total)
            .ok_or(Error::InvalidData("chunk length overruns buffer"))?;
        let kind = ChunkType([header[4], header[5], header[6], header[7]]);
        debug!("{kind} chunk, {data_len} byte payload");

        let mut owned = TryVec::with_capacity(total)?;
        owned.extend_from_slice(raw)?;
        let chunk = Chunk { kind, raw: owned };
        if self.verify_crc {
            chunk.verify_crc()?;
        }
        self.pos += total;
        Ok(chunk)
    }
}

impl Iterator for ChunkIter<'_> {
    type Item = Result<Chunk>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.src.len() {
            return None;
        }
        let result = self.next_chunk();
        if result.is_err() {
            // Poison the iterator; a framing error leaves no usable resync point.
            self.pos = self.src.len();
        }
        Some(result)
    }
}

/// Verify the signature of `bytes` and return an iterator over its chunks.
pub fn parse_chunks<'a>(bytes: &'a [u8], options: &ParseOptions) -> Result<ChunkIter<'a>> {
    if !is_png(bytes) {
        return Err(Error::InvalidData("missing PNG signature"));
    }
    Ok(ChunkIter {
        src: bytes,
        pos: PNG_SIGNATURE.len(),
        verify_crc: options.verify_crc,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_detection() {
        assert!(is_png(&PNG_SIGNATURE));
        assert!(!is_png(&PNG_SIGNATURE[..7]));
        assert!(!is_png(b""));
        assert!(!is_png(b"GIF89a notpng"));
        let mut long = PNG_SIGNATURE.to_vec();
        long.extend_from_slice(b"trailing");
        assert!(is_png(&long));
    }

    #[test]
    fn build_frames_payload() {
        let chunk = Chunk::build(IDAT, b"hello").unwrap();
        assert_eq!(chunk.kind(), IDAT);
        assert_eq!(chunk.payload(), b"hello");
        assert_eq!(chunk.data_len(), 5);
        assert_eq!(&chunk.as_bytes()[..4], &5u32.to_be_bytes());
        assert_eq!(&chunk.as_bytes()[4..8], b"IDAT");
        chunk.verify_crc().unwrap();
    }

    #[test]
    fn parse_roundtrip() {
        let chunk = Chunk::build(ChunkType(*b"tEXt"), b"comment").unwrap();
        let mut stream = PNG_SIGNATURE.to_vec();
        stream.extend_from_slice(chunk.as_bytes());

        let mut iter = parse_chunks(&stream, &ParseOptions::default()).unwrap();
        let parsed = iter.next().unwrap().unwrap();
        assert_eq!(parsed.kind(), ChunkType(*b"tEXt"));
        assert_eq!(parsed.payload(), b"comment");
        assert!(iter.next().is_none());
    }

    #[test]
    fn length_overrun_rejected() {
        let mut stream = PNG_SIGNATURE.to_vec();
        stream.extend_from_slice(&100u32.to_be_bytes());
        stream.extend_from_slice(b"IDAT");
        stream.extend_from_slice(b"short");

        let mut iter = parse_chunks(&stream, &ParseOptions::default()).unwrap();
        assert!(iter.next().unwrap().is_err());
        assert!(iter.next().is_none());
    }

    #[test]
    fn crc_mismatch_rejected_unless_lenient() {
        let chunk = Chunk::build(IDAT, b"data").unwrap();
        let mut stream = PNG_SIGNATURE.to_vec();
        stream.extend_from_slice(chunk.as_bytes());
        let last = stream.len() - 1;
        stream[last] ^= 0xff;

        let mut strict = parse_chunks(&stream, &ParseOptions::default()).unwrap();
        assert!(strict.next().unwrap().is_err());

        let trusting = ParseOptions { verify_crc: false };
        let mut lenient = parse_chunks(&stream, &trusting).unwrap();
        assert_eq!(lenient.next().unwrap().unwrap().payload(), b"data");
    }

    #[test]
    fn missing_signature_rejected() {
        assert!(parse_chunks(b"not a png", &ParseOptions::default()).is_err());
    }

    #[test]
    fn case_convention() {
        assert!(IHDR.is_critical());
        assert!(!fcTL.is_critical());
        assert!(PLTE.is_before_idat());
        assert!(ChunkType(*b"tRNS").is_before_idat());
        assert!(!ChunkType(*b"tEXt").is_before_idat());
        assert!(!IDAT.is_before_idat());
    }
}
