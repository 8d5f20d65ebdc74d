#![deny(unsafe_code)]
//! Module for reading and writing the APNG container format.
//!
//! An APNG file is a PNG-compatible byte stream that multiplexes several
//! logical images ("frames") plus per-frame timing and placement metadata
//! into one file. APNG-aware viewers play the animation; plain PNG viewers
//! fall back to the first image. This crate implements the chunk-level
//! codec: splitting a byte stream into typed chunks, producing framed
//! chunks with computed checksums, and the bidirectional transform between
//! an ordered collection of single-image PNGs and one interleaved APNG
//! stream with renumbered `fcTL`/`fdAT` sequence identifiers.
//!
//! Pixel data is never decoded; `IDAT` payloads pass through opaque.

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use byteorder::ReadBytesExt;
use fallible_collections::{TryClone, TryReserveError};
use log::{debug, warn};

use std::io::{Read, Write};
use std::path::Path;

pub mod chunks;
use crate::chunks::Chunk;
pub use crate::chunks::{is_png, PNG_SIGNATURE};

#[doc(hidden)]
pub type TryVec<T> = fallible_collections::TryVec<T>;

// To ensure we don't use stdlib allocating types by accident
#[allow(dead_code)]
struct Vec;
#[allow(dead_code)]
struct Box;
#[allow(dead_code)]
struct String;

/// Describes codec failures.
///
/// This enum wraps the standard `io::Error` type, unified with
/// our own parser and assembly error states.
#[derive(Debug)]
pub enum Error {
    /// Parse error caused by corrupt or malformed data.
    InvalidData(&'static str),
    /// Reflect `std::io::ErrorKind::UnexpectedEof` for short data.
    UnexpectedEOF,
    /// Propagate underlying errors from `std::io`.
    Io(std::io::Error),
    /// The external frame encoder failed to produce a PNG stream.
    Conversion(&'static str),
    /// Assembling an animation that holds zero frames.
    NoFrames,
    /// Out of memory
    OutOfMemory,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let msg = match self {
            Self::InvalidData(s) | Self::Conversion(s) => s,
            Self::UnexpectedEOF => "EOF",
            Self::Io(err) => return err.fmt(f),
            Self::NoFrames => "animation holds no frames",
            Self::OutOfMemory => "OOM",
        };
        f.write_str(msg)
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::UnexpectedEof => Self::UnexpectedEOF,
            _ => Self::Io(err),
        }
    }
}

impl From<TryReserveError> for Error {
    fn from(_: TryReserveError) -> Self {
        Self::OutOfMemory
    }
}

/// Result shorthand using our Error enum.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Options for parsing PNG and APNG streams.
#[derive(Debug, Clone, Copy)]
pub struct ParseOptions {
    /// Recompute and check every chunk's CRC-32 during parsing.
    ///
    /// When false, declared lengths and checksums are trusted as given,
    /// matching the historical behavior of most APNG assemblers.
    ///
    /// Default: true (strict validation)
    pub verify_crc: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self { verify_crc: true }
    }
}

/// External image codec capability for non-PNG inputs.
///
/// The container core never probes for codec availability; callers resolve
/// non-PNG inputs at the boundary via [`Png::from_any`], which delegates to
/// this trait and re-checks the signature on the result.
pub trait FrameEncoder {
    /// Re-encode `source` as a single-frame PNG byte stream.
    fn encode_as_single_frame(&self, source: &[u8]) -> Result<std::vec::Vec<u8>>;
}

/// How a frame's region is treated before rendering the next frame.
/// See APNG § `fcTL`, `dispose_op`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum DisposeOp {
    /// Leave the output buffer as-is.
    #[default]
    None = 0,
    /// Clear the frame's region to fully transparent black.
    Background = 1,
    /// Revert the frame's region to the previous contents.
    Previous = 2,
}

impl TryFrom<u8> for DisposeOp {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Self::None),
            1 => Ok(Self::Background),
            2 => Ok(Self::Previous),
            _ => Err(Error::InvalidData("dispose_op must be 0, 1 or 2")),
        }
    }
}

/// How a frame's pixels are composited onto the output buffer.
/// See APNG § `fcTL`, `blend_op`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum BlendOp {
    /// Overwrite the region, alpha included.
    #[default]
    Source = 0,
    /// Alpha-composite over the current contents.
    Over = 1,
}

impl TryFrom<u8> for BlendOp {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Self::Source),
            1 => Ok(Self::Over),
            _ => Err(Error::InvalidData("blend_op must be 0 or 1")),
        }
    }
}

/// Decoded `fcTL` record: per-frame placement, timing and compositing.
///
/// The 4-byte sequence number that prefixes this record on the wire is not
/// part of the value; the container assigns sequence numbers during
/// assembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameControl {
    pub width: u32,
    pub height: u32,
    pub x_offset: u32,
    pub y_offset: u32,
    pub delay_num: u16,
    /// Delay denominator; 0 means 1/100 s units by format convention.
    pub delay_den: u16,
    pub dispose_op: DisposeOp,
    pub blend_op: BlendOp,
}

impl FrameControl {
    /// Encoded size of the record, excluding sequence number and CRC.
    /// An on-wire `fcTL` payload is 26 bytes: a 4-byte sequence number
    /// followed by this record.
    pub const ENCODED_LEN: usize = 22;

    /// Fixed big-endian layout: width(4), height(4), x_offset(4),
    /// y_offset(4), delay_num(2), delay_den(2), dispose_op(1), blend_op(1).
    pub fn to_bytes(&self) -> [u8; Self::ENCODED_LEN] {
        let mut out = [0u8; Self::ENCODED_LEN];
        out[0..4].copy_from_slice(&self.width.to_be_bytes());
        out[4..8].copy_from_slice(&self.height.to_be_bytes());
        out[8..12].copy_from_slice(&self.x_offset.to_be_bytes());
        out[12..16].copy_from_slice(&self.y_offset.to_be_bytes());
        out[16..18].copy_from_slice(&self.delay_num.to_be_bytes());
        out[18..20].copy_from_slice(&self.delay_den.to_be_bytes());
        out[20] = self.dispose_op as u8;
        out[21] = self.blend_op as u8;
        out
    }

    /// Decode a 22-byte record. The caller strips the sequence number and
    /// CRC when extracting this slice from a parsed `fcTL` chunk.
    pub fn from_bytes(bytes: &[u8]) -> Result<FrameControl> {
        if bytes.len() != Self::ENCODED_LEN {
            return Err(Error::InvalidData("fcTL record must be 22 bytes"));
        }
        let mut src = bytes;
        Ok(FrameControl {
            width: be_u32(&mut src)?,
            height: be_u32(&mut src)?,
            x_offset: be_u32(&mut src)?,
            y_offset: be_u32(&mut src)?,
            delay_num: be_u16(&mut src)?,
            delay_den: be_u16(&mut src)?,
            dispose_op: DisposeOp::try_from(src.read_u8()?)?,
            blend_op: BlendOp::try_from(src.read_u8()?)?,
        })
    }
}

/// Configuration accepted by [`Apng::append`], mirroring [`FrameControl`].
///
/// `width` and `height` default to the appended image's derived dimensions;
/// the remaining fields default to `{x_offset: 0, y_offset: 0, delay_num:
/// 100, delay_den: 1000, dispose_op: None, blend_op: Source}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameOptions {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub x_offset: u32,
    pub y_offset: u32,
    pub delay: Option<(u16, u16)>,
    pub dispose_op: DisposeOp,
    pub blend_op: BlendOp,
}

impl FrameOptions {
    /// Set explicit frame dimensions instead of the source image's.
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    /// Set the frame's placement offset within the output buffer.
    pub fn with_offset(mut self, x: u32, y: u32) -> Self {
        self.x_offset = x;
        self.y_offset = y;
        self
    }

    /// Set the frame delay as a numerator/denominator pair in seconds.
    pub fn with_delay(mut self, num: u16, den: u16) -> Self {
        self.delay = Some((num, den));
        self
    }

    pub fn with_dispose_op(mut self, op: DisposeOp) -> Self {
        self.dispose_op = op;
        self
    }

    pub fn with_blend_op(mut self, op: BlendOp) -> Self {
        self.blend_op = op;
        self
    }

    /// Resolve the defaults against the owning image's derived dimensions.
    /// Every control is fully resolved before it is ever serialized.
    fn resolve(&self, image: &Png) -> FrameControl {
        let (delay_num, delay_den) = self.delay.unwrap_or((100, 1000));
        FrameControl {
            width: self.width.unwrap_or_else(|| image.width()),
            height: self.height.unwrap_or_else(|| image.height()),
            x_offset: self.x_offset,
            y_offset: self.y_offset,
            delay_num,
            delay_den,
            dispose_op: self.dispose_op,
            blend_op: self.blend_op,
        }
    }
}

/// One standalone, decodable-as-PNG image: an ordered chunk list plus
/// width/height derived from its `IHDR` chunk.
///
/// Immutable once constructed; regenerating bytes is a pure function of the
/// stored chunk list.
#[derive(Debug)]
pub struct Png {
    chunks: TryVec<Chunk>,
    ihdr: usize,
    iend: Option<usize>,
    width: u32,
    height: u32,
}

impl Png {
    /// Construct from an explicit chunk list.
    ///
    /// The list is stored as given; no reordering happens at this layer.
    /// One scan locates the `IHDR` (to derive width and height) and the
    /// `IEND` (retained for reuse when assembling an animation).
    pub fn from_chunks(list: TryVec<Chunk>) -> Result<Png> {
        let ihdr = list
            .iter()
            .position(|c| c.kind() == chunks::IHDR)
            .ok_or(Error::InvalidData("missing IHDR chunk"))?;
        let iend = list.iter().position(|c| c.kind() == chunks::IEND);

        let payload = list[ihdr].payload();
        if payload.len() < 8 {
            return Err(Error::InvalidData("IHDR payload too short"));
        }
        let mut src = payload;
        let width = be_u32(&mut src)?;
        let height = be_u32(&mut src)?;

        Ok(Png { chunks: list, ihdr, iend, width, height })
    }

    /// Parse a PNG from a byte buffer.
    pub fn from_bytes(bytes: &[u8]) -> Result<Png> {
        Self::from_bytes_with_options(bytes, &ParseOptions::default())
    }

    /// Parse a PNG from a byte buffer with explicit parse options.
    pub fn from_bytes_with_options(bytes: &[u8], options: &ParseOptions) -> Result<Png> {
        let mut parsed = TryVec::new();
        for chunk in chunks::parse_chunks(bytes, options)? {
            parsed.push(chunk?)?;
        }
        Self::from_chunks(parsed)
    }

    /// Parse a PNG from a reader (reads all bytes, then parses).
    pub fn from_reader<R: Read>(reader: &mut R) -> Result<Png> {
        let mut buf = std::vec::Vec::new();
        reader.read_to_end(&mut buf)?;
        Self::from_bytes(&buf)
    }

    /// Open and parse a PNG file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Png> {
        Self::from_bytes(&std::fs::read(path)?)
    }

    /// Resolve a possibly non-PNG input at the boundary.
    ///
    /// Bytes that already carry the PNG signature are parsed directly;
    /// anything else is handed to `encoder`, whose output must carry the
    /// signature or the whole operation fails with [`Error::Conversion`].
    pub fn from_any(bytes: &[u8], encoder: &dyn FrameEncoder) -> Result<Png> {
        if is_png(bytes) {
            return Self::from_bytes(bytes);
        }
        let converted = encoder.encode_as_single_frame(bytes)?;
        if !is_png(&converted) {
            return Err(Error::Conversion("encoder did not produce a PNG stream"));
        }
        Self::from_bytes(&converted)
    }

    /// Width in pixels, from the `IHDR` chunk.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels, from the `IHDR` chunk.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// The stored chunk sequence, in stream order.
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    fn header_chunk(&self) -> &Chunk {
        &self.chunks[self.ihdr]
    }

    /// The image's own `IEND` if it carries one, or a synthesized empty one.
    fn end_chunk(&self) -> Result<Chunk> {
        match self.iend {
            Some(i) => self.chunks[i].try_clone(),
            None => Chunk::build(chunks::IEND, &[]),
        }
    }

    /// Serialize: signature followed by every chunk's framed bytes in
    /// stored order.
    pub fn to_bytes(&self) -> Result<TryVec<u8>> {
        let mut out = TryVec::new();
        out.extend_from_slice(&PNG_SIGNATURE)?;
        for chunk in &self.chunks {
            out.extend_from_slice(chunk.as_bytes())?;
        }
        Ok(out)
    }

    /// Serialize into a writer.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&self.to_bytes()?)?;
        Ok(())
    }

    /// Serialize to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, &self.to_bytes()?)?;
        Ok(())
    }
}

/// One animation frame: an image paired with its resolved control record.
#[derive(Debug)]
pub struct Frame {
    pub image: Png,
    pub control: FrameControl,
}

/// An ordered sequence of frames, in playback order.
///
/// [`Apng::to_bytes`] interleaves the frames into one APNG stream with
/// renumbered `fcTL`/`fdAT` sequence identifiers; the `from_*` constructors
/// reverse the transform, reconstructing each frame as a standalone PNG.
#[derive(Debug, Default)]
pub struct Apng {
    frames: TryVec<Frame>,
    num_plays: u32,
}

impl Apng {
    /// An empty animation that loops forever once frames are appended.
    pub fn new() -> Apng {
        Apng::default()
    }

    /// Number of times to play the animation; 0 means infinite repeat.
    pub fn num_plays(&self) -> u32 {
        self.num_plays
    }

    pub fn set_num_plays(&mut self, num_plays: u32) {
        self.num_plays = num_plays;
    }

    /// The frames in playback order.
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Append one frame, resolving defaulted control fields against the
    /// image's derived dimensions.
    pub fn append(&mut self, image: Png, options: &FrameOptions) -> Result<()> {
        let control = options.resolve(&image);
        self.frames.push(Frame { image, control })?;
        Ok(())
    }

    /// Build an animation from one file per frame, all sharing `options`.
    ///
    /// For per-frame delays, call [`Apng::append`] separately instead.
    pub fn from_files<P, I>(paths: I, options: &FrameOptions) -> Result<Apng>
    where
        P: AsRef<Path>,
        I: IntoIterator<Item = P>,
    {
        let mut apng = Apng::new();
        for path in paths {
            apng.append(Png::open(path)?, options)?;
        }
        Ok(apng)
    }

    /// Parse an APNG (or plain PNG) from a byte buffer.
    ///
    /// A plain PNG yields a single frame whose control carries the image's
    /// dimensions and default timing.
    pub fn from_bytes(bytes: &[u8]) -> Result<Apng> {
        Self::from_bytes_with_options(bytes, &ParseOptions::default())
    }

    /// Parse an APNG from a reader (reads all bytes, then parses).
    pub fn from_reader<R: Read>(reader: &mut R) -> Result<Apng> {
        let mut buf = std::vec::Vec::new();
        reader.read_to_end(&mut buf)?;
        Self::from_bytes(&buf)
    }

    /// Open and parse an APNG file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Apng> {
        Self::from_bytes(&std::fs::read(path)?)
    }

    /// Parse an APNG with explicit parse options, reconstructing one
    /// standalone PNG per frame.
    ///
    /// The stream is processed as one flat chunk sequence. A frame boundary
    /// is an `fcTL` arriving after the current frame has already received
    /// image data; chunks of the pre-data set are buffered and replayed
    /// ahead of the next data chunk, and `fdAT` payloads are rebuilt as
    /// `IDAT` chunks with their sequence numbers stripped.
    pub fn from_bytes_with_options(bytes: &[u8], options: &ParseOptions) -> Result<Apng> {
        let mut iter = chunks::parse_chunks(bytes, options)?;

        // Most recent IHDR payload; sub-frame headers are derived from it.
        let mut base_header: Option<TryVec<u8>> = None;
        // Pre-data chunks seen since the last frame boundary.
        let mut head_chunks: TryVec<Chunk> = TryVec::new();
        let mut current: TryVec<Chunk> = TryVec::new();
        let mut current_has_data = false;
        let mut pending_control: Option<FrameControl> = None;
        let mut frames: TryVec<Frame> = TryVec::new();
        let mut num_plays = 0;
        let mut saw_end = false;

        for chunk in &mut iter {
            let chunk = chunk?;
            let kind = chunk.kind();

            if kind == chunks::IHDR {
                let mut payload = TryVec::new();
                payload.extend_from_slice(chunk.payload())?;
                base_header = Some(payload);
                current.push(chunk)?;
            } else if kind == chunks::acTL {
                // The frame count is implicit in the reconstructed list;
                // only the loop count is kept.
                let mut src = chunk.payload();
                let declared = be_u32(&mut src)?;
                num_plays = be_u32(&mut src)?;
                debug!("acTL declares {declared} frames, {num_plays} plays");
            } else if kind == chunks::fcTL {
                let record = chunk
                    .payload()
                    .get(4..)
                    .ok_or(Error::InvalidData("fcTL payload too short"))?;
                let control = FrameControl::from_bytes(record)?;

                if current_has_data {
                    // Boundary: finalize the frame in progress and start a
                    // new one whose header takes this control's dimensions.
                    current.push(Chunk::build(chunks::IEND, &[])?)?;
                    let done = std::mem::replace(&mut current, TryVec::new());
                    frames.push(Self::finalize_frame(done, pending_control.take())?)?;

                    let base = base_header
                        .as_ref()
                        .ok_or(Error::InvalidData("fcTL before IHDR"))?;
                    if base.len() < 8 {
                        return Err(Error::InvalidData("IHDR payload too short"));
                    }
                    let mut payload = base.try_clone()?;
                    payload[0..4].copy_from_slice(&control.width.to_be_bytes());
                    payload[4..8].copy_from_slice(&control.height.to_be_bytes());
                    current.push(Chunk::build(chunks::IHDR, &payload)?)?;
                    current_has_data = false;
                }
                pending_control = Some(control);
            } else if kind == chunks::IDAT {
                Self::replay_head_chunks(&mut current, &mut head_chunks)?;
                current.push(chunk)?;
                current_has_data = true;
            } else if kind == chunks::fdAT {
                let payload = chunk
                    .payload()
                    .get(4..)
                    .ok_or(Error::InvalidData("fdAT payload too short"))?;
                let rebuilt = Chunk::build(chunks::IDAT, payload)?;
                Self::replay_head_chunks(&mut current, &mut head_chunks)?;
                current.push(rebuilt)?;
                current_has_data = true;
            } else if kind == chunks::IEND {
                current.push(chunk)?;
                let done = std::mem::replace(&mut current, TryVec::new());
                frames.push(Self::finalize_frame(done, pending_control.take())?)?;
                saw_end = true;
                break;
            } else if kind.is_before_idat() {
                head_chunks.push(chunk)?;
            } else {
                current.push(chunk)?;
            }
        }

        if !saw_end {
            return Err(Error::InvalidData("missing IEND chunk"));
        }
        if iter.bytes_left() > 0 {
            warn!("ignoring {} trailing bytes after IEND", iter.bytes_left());
        }

        Ok(Apng { frames, num_plays })
    }

    /// Attach buffered pre-data chunks ahead of an incoming data chunk.
    fn replay_head_chunks(current: &mut TryVec<Chunk>, head_chunks: &mut TryVec<Chunk>) -> Result<()> {
        for chunk in head_chunks.iter() {
            current.push(chunk.try_clone()?)?;
        }
        *head_chunks = TryVec::new();
        Ok(())
    }

    /// Turn a completed chunk list into a frame. A stream with no `fcTL`
    /// (a plain PNG) gets a default control sized to the image.
    fn finalize_frame(list: TryVec<Chunk>, control: Option<FrameControl>) -> Result<Frame> {
        let image = Png::from_chunks(list)?;
        let control = control.unwrap_or_else(|| FrameOptions::default().resolve(&image));
        Ok(Frame { image, control })
    }

    /// Assemble the frames into one interleaved APNG byte stream.
    ///
    /// Emits the first frame's `IHDR`, a synthesized `acTL`, then per frame
    /// an `fcTL` followed by its image data — verbatim `IDAT` for the first
    /// frame, repackaged `fdAT` for the rest. Sequence numbers thread all
    /// `fcTL`/`fdAT` chunks starting at 0 with no gaps or repeats. Ancillary
    /// chunks of later frames that viewers would reject between frame data
    /// are relocated to just before the terminator.
    pub fn to_bytes(&self) -> Result<TryVec<u8>> {
        let first = self.frames.first().ok_or(Error::NoFrames)?;
        let frame_count =
            u32::try_from(self.frames.len()).map_err(|_| Error::InvalidData("frame count exceeds u32"))?;

        let mut out = TryVec::new();
        let mut seq: u32 = 0;
        let mut deferred: TryVec<Chunk> = TryVec::new();

        out.extend_from_slice(&PNG_SIGNATURE)?;
        out.extend_from_slice(first.image.header_chunk().as_bytes())?;

        let mut actl = [0u8; 8];
        actl[0..4].copy_from_slice(&frame_count.to_be_bytes());
        actl[4..8].copy_from_slice(&self.num_plays.to_be_bytes());
        out.extend_from_slice(Chunk::build(chunks::acTL, &actl)?.as_bytes())?;

        Self::push_fctl(&mut out, &mut seq, &first.control)?;

        // First frame: copy everything but IHDR/IEND, holding IDATs back so
        // the pre-data chunks keep their required position.
        let mut idat_bytes: TryVec<u8> = TryVec::new();
        for chunk in first.image.chunks() {
            let kind = chunk.kind();
            if kind == chunks::IHDR || kind == chunks::IEND {
                continue;
            }
            if kind == chunks::IDAT {
                idat_bytes.extend_from_slice(chunk.as_bytes())?;
            } else {
                out.extend_from_slice(chunk.as_bytes())?;
            }
        }
        out.extend_from_slice(&idat_bytes)?;

        for frame in &self.frames[1..] {
            Self::push_fctl(&mut out, &mut seq, &frame.control)?;

            for chunk in frame.image.chunks() {
                let kind = chunk.kind();
                // File-scope chunks are meaningful once; never replayed
                // into the animated region.
                if kind == chunks::IHDR || kind == chunks::IEND || kind.is_before_idat() {
                    continue;
                }
                if kind == chunks::IDAT {
                    let mut payload = TryVec::with_capacity(chunk.payload().len() + 4)?;
                    payload.extend_from_slice(&seq.to_be_bytes())?;
                    payload.extend_from_slice(chunk.payload())?;
                    seq += 1;
                    out.extend_from_slice(Chunk::build(chunks::fdAT, &payload)?.as_bytes())?;
                } else {
                    // Viewers that understand only the minimal animated
                    // subset abort playback on unrecognized chunk types
                    // interleaved with frame data.
                    deferred.push(chunk.try_clone()?)?;
                }
            }
        }

        for chunk in &deferred {
            out.extend_from_slice(chunk.as_bytes())?;
        }
        let last = self.frames.last().ok_or(Error::NoFrames)?;
        out.extend_from_slice(last.image.end_chunk()?.as_bytes())?;

        Ok(out)
    }

    /// Serialize into a writer.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&self.to_bytes()?)?;
        Ok(())
    }

    /// Serialize to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, &self.to_bytes()?)?;
        Ok(())
    }

    /// Emit an `fcTL` chunk carrying the next sequence number.
    fn push_fctl(out: &mut TryVec<u8>, seq: &mut u32, control: &FrameControl) -> Result<()> {
        let mut payload = [0u8; 4 + FrameControl::ENCODED_LEN];
        payload[0..4].copy_from_slice(&seq.to_be_bytes());
        payload[4..].copy_from_slice(&control.to_bytes());
        *seq += 1;
        out.extend_from_slice(Chunk::build(chunks::fcTL, &payload)?.as_bytes())?;
        Ok(())
    }
}

fn be_u16<T: ReadBytesExt>(src: &mut T) -> Result<u16> {
    src.read_u16::<byteorder::BigEndian>().map_err(From::from)
}

pub(crate) fn be_u32<T: ReadBytesExt>(src: &mut T) -> Result<u32> {
    src.read_u32::<byteorder::BigEndian>().map_err(From::from)
}
