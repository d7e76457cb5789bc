//! Product inflation.
//!
//! Archived Level 3 products arrive as a short WMO/AWIPS text header followed
//! by one or more zlib frames. Plotting expects the header followed by the
//! inflated payload.

use crate::error::{PipelineError, Result};
use flate2::{Decompress, FlushDecompress, Status};

/// Turns the bytes of a downloaded product into the layout the plotting side
/// reads. Implementations must be pure: same input, same output.
pub trait Decoder: Send + Sync {
    fn decode(&self, raw: &[u8]) -> Result<Vec<u8>>;
}

impl<F> Decoder for F
where
    F: Fn(&[u8]) -> Result<Vec<u8>> + Send + Sync,
{
    fn decode(&self, raw: &[u8]) -> Result<Vec<u8>> {
        self(raw)
    }
}

/// How far into a product the first zlib frame may start.
const MAX_HEADER_LEN: usize = 64;
const INFLATE_CHUNK: usize = 16 * 1024;

/// Default decoder: keep the text header, inflate every zlib frame after it.
/// Products without a zlib frame pass through untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZlibFrameDecoder;

impl ZlibFrameDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl Decoder for ZlibFrameDecoder {
    fn decode(&self, raw: &[u8]) -> Result<Vec<u8>> {
        if raw.is_empty() {
            return Err(PipelineError::Decode("empty product".to_string()));
        }

        let Some(start) = find_zlib_frame(raw) else {
            return Ok(raw.to_vec());
        };

        let mut inflated = raw[..start].to_vec();
        let mut rest = &raw[start..];

        while rest.len() >= 2 && is_zlib_header(rest[0], rest[1]) {
            let consumed = inflate_frame(rest, &mut inflated)?;
            rest = &rest[consumed..];
        }

        Ok(inflated)
    }
}

/// Inflate one zlib frame from the front of `input` into `out`, returning the
/// number of input bytes the frame occupied.
fn inflate_frame(input: &[u8], out: &mut Vec<u8>) -> Result<usize> {
    let mut stream = Decompress::new(true);

    loop {
        out.reserve(INFLATE_CHUNK);
        let consumed = stream.total_in() as usize;
        let produced = stream.total_out();

        let status = stream
            .decompress_vec(&input[consumed..], out, FlushDecompress::None)
            .map_err(|e| PipelineError::Decode(format!("corrupt zlib frame: {}", e)))?;

        match status {
            Status::StreamEnd => return Ok(stream.total_in() as usize),
            Status::Ok | Status::BufError => {
                if stream.total_in() as usize == consumed && stream.total_out() == produced {
                    return Err(PipelineError::Decode("truncated zlib frame".to_string()));
                }
            }
        }
    }
}

fn find_zlib_frame(raw: &[u8]) -> Option<usize> {
    let limit = raw.len().min(MAX_HEADER_LEN);
    (0..limit.saturating_sub(1)).find(|&i| is_zlib_header(raw[i], raw[i + 1]))
}

/// CMF/FLG pair of a deflate-method zlib stream (RFC 1950).
fn is_zlib_header(cmf: u8, flg: u8) -> bool {
    cmf == 0x78 && ((u16::from(cmf) << 8) | u16::from(flg)) % 31 == 0
}
