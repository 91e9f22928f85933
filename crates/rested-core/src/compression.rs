//! Response compression.
//!
//! [`select_codec`] decides whether a body is compressed, and with which
//! codec, from its size and the request's `Accept-Encoding`. A
//! [`CompressorPool`] keeps reset deflate states around so requests do not
//! allocate a fresh compressor each time; every borrowed state is owned by
//! exactly one request until it is returned.
//!
//! `gzip` output is an RFC 1952 member; `deflate` output is an RFC 1950 zlib
//! stream, as the HTTP `deflate` coding requires.
//!
//! The gzip header and trailer are written here around a raw deflate state
//! because `flate2::write::GzEncoder` cannot be reset for reuse, while a
//! `Compress` can.

use bytes::Bytes;
use flate2::{Compress, Compression, FlushCompress, Status};
use http::HeaderMap;
use http::header::ACCEPT_ENCODING;
use parking_lot::Mutex;

use crate::headers::header_str;

/// Default minimal body length, in bytes, before compression kicks in.
pub const DEFAULT_COMPRESSION_THRESHOLD: usize = 860;

/// Number of idle compressors kept per codec.
const MAX_IDLE: usize = 32;

/// Fixed gzip member header: magic, deflate method, no flags, no mtime, unknown OS.
const GZIP_HEADER: [u8; 10] = [0x1f, 0x8b, 0x08, 0, 0, 0, 0, 0, 0, 0xff];

/// Errors raised while compressing a body.
#[derive(Debug, thiserror::Error)]
pub enum CompressionError {
    /// The deflate engine failed.
    #[error("deflate error: {0}")]
    Deflate(#[from] flate2::CompressError),
}

/// A supported content coding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    /// `gzip`
    Gzip,
    /// `deflate` (zlib framing)
    Deflate,
}

impl Codec {
    /// The `Content-Encoding` token.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gzip => "gzip",
            Self::Deflate => "deflate",
        }
    }
}

impl std::fmt::Display for Codec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Choose the codec for a body of `body_len` bytes.
///
/// Returns `None` when the body is shorter than `threshold` or the client
/// advertises neither `gzip` nor `deflate`. `gzip` wins when both are
/// offered. Codings listed with `q=0` are refused.
#[must_use]
pub fn select_codec(body_len: usize, threshold: usize, headers: &HeaderMap) -> Option<Codec> {
    if body_len == 0 || body_len < threshold {
        return None;
    }
    let raw = header_str(headers, &ACCEPT_ENCODING)?;

    let accepted: Vec<String> = raw
        .split(',')
        .filter_map(|part| {
            let mut segments = part.split(';');
            let token = segments.next()?.trim().to_ascii_lowercase();
            let refused = segments.any(|p| {
                p.split_once('=').is_some_and(|(k, v)| {
                    k.trim() == "q" && v.trim().parse::<f32>().is_ok_and(|q| q <= 0.0)
                })
            });
            (!refused).then_some(token)
        })
        .collect();

    if accepted.iter().any(|t| t == "gzip") {
        Some(Codec::Gzip)
    } else if accepted.iter().any(|t| t == "deflate") {
        Some(Codec::Deflate)
    } else {
        None
    }
}

/// A pool of reusable deflate states, one free list per codec.
#[derive(Debug)]
pub struct CompressorPool {
    level: Compression,
    gzip: Mutex<Vec<Compress>>,
    deflate: Mutex<Vec<Compress>>,
}

impl Default for CompressorPool {
    fn default() -> Self {
        Self::new(Compression::default())
    }
}

impl CompressorPool {
    /// Create an empty pool producing output at `level`.
    #[must_use]
    pub fn new(level: Compression) -> Self {
        Self {
            level,
            gzip: Mutex::new(Vec::new()),
            deflate: Mutex::new(Vec::new()),
        }
    }

    /// Number of idle compressors held for `codec`.
    #[must_use]
    pub fn idle(&self, codec: Codec) -> usize {
        self.slot(codec).lock().len()
    }

    /// Compress `data` with `codec`, fully flushed.
    pub fn compress(&self, codec: Codec, data: &[u8]) -> Result<Bytes, CompressionError> {
        let mut out = Vec::with_capacity(data.len() / 2 + 64);

        self.with_compressor(codec, |compressor| match codec {
            Codec::Gzip => {
                out.extend_from_slice(&GZIP_HEADER);
                deflate_into(compressor, data, &mut out)?;
                out.extend_from_slice(&crc32fast::hash(data).to_le_bytes());
                out.extend_from_slice(&gzip_size(data.len()).to_le_bytes());
                Ok(())
            }
            Codec::Deflate => deflate_into(compressor, data, &mut out),
        })?;

        Ok(Bytes::from(out))
    }

    fn slot(&self, codec: Codec) -> &Mutex<Vec<Compress>> {
        match codec {
            Codec::Gzip => &self.gzip,
            Codec::Deflate => &self.deflate,
        }
    }

    /// Borrow an idle compressor (or create one) for the duration of `f`,
    /// then reset it and return it to the pool.
    fn with_compressor<T>(&self, codec: Codec, f: impl FnOnce(&mut Compress) -> T) -> T {
        let slot = self.slot(codec);
        let mut state = slot.lock().pop().unwrap_or_else(|| {
            // gzip frames raw deflate itself; deflate uses zlib framing.
            Compress::new(self.level, codec == Codec::Deflate)
        });

        let result = f(&mut state);

        state.reset();
        let mut idle = slot.lock();
        if idle.len() < MAX_IDLE {
            idle.push(state);
        }
        result
    }
}

/// Run `input` through `compressor` to the end of the stream, appending to
/// `out`.
fn deflate_into(
    compressor: &mut Compress,
    input: &[u8],
    out: &mut Vec<u8>,
) -> Result<(), CompressionError> {
    let start = compressor.total_in();
    loop {
        let consumed = usize::try_from(compressor.total_in() - start).unwrap_or(input.len());
        let status = compressor.compress_vec(
            &input[consumed.min(input.len())..],
            out,
            FlushCompress::Finish,
        )?;
        match status {
            Status::StreamEnd => return Ok(()),
            Status::Ok | Status::BufError => out.reserve(out.capacity().max(256)),
        }
    }
}

/// The gzip ISIZE field: input length modulo 2^32.
#[allow(clippy::cast_possible_truncation)]
fn gzip_size(len: usize) -> u32 {
    (len as u64 & 0xffff_ffff) as u32
}
