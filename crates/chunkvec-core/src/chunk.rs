//! Fixed-window text chunker.
//!
//! Splits text into windows of `chunk_size` characters (Unicode scalar
//! values, never bytes), each window starting `chunk_size - overlap`
//! characters after the previous one. The final window is clipped to the
//! end of the text.
//!
//! # Algorithm
//!
//! 1. Record the byte offset of every character.
//! 2. Emit `text[start .. start + chunk_size]`, clipped to the text length.
//! 3. Stop if that window reached the end of the text, otherwise advance
//!    `start` by `chunk_size - overlap` and repeat.
//!
//! Parameters are validated once into [`ChunkParams`], so the loop always
//! advances. Dropping the first `overlap` characters of every chunk after
//! the first and concatenating reconstructs the input exactly.
//!
//! # Example
//!
//! ```rust
//! use chunkvec_core::chunk::{chunk_text, ChunkParams};
//!
//! let params = ChunkParams::new(10, 3).unwrap();
//! let chunks = chunk_text("abcdefghijklmno", &params);
//! assert_eq!(chunks, vec!["abcdefghij", "hijklmno"]);
//! ```

use crate::error::{Error, Result};

/// Validated chunking parameters: `chunk_size > 0` and `overlap < chunk_size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkParams {
    chunk_size: usize,
    overlap: usize,
}

impl ChunkParams {
    /// Validate a `(chunk_size, overlap)` pair.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidChunking`] when `chunk_size == 0` or
    /// `overlap >= chunk_size`, since the window could never advance.
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        if chunk_size == 0 || overlap >= chunk_size {
            return Err(Error::InvalidChunking {
                chunk_size,
                overlap,
            });
        }
        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Distance between consecutive window starts. Always `>= 1`.
    pub fn step(&self) -> usize {
        self.chunk_size - self.overlap
    }
}

/// Split `text` into overlapping character windows.
///
/// Text no longer than `chunk_size` characters (including the empty
/// string) yields exactly one chunk holding the whole text.
pub fn chunk_text(text: &str, params: &ChunkParams) -> Vec<String> {
    let offsets: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
    let char_len = offsets.len();
    let byte_at = |pos: usize| offsets.get(pos).copied().unwrap_or(text.len());

    let mut chunks = Vec::with_capacity(expected_chunk_count(char_len, params));
    let mut start = 0usize;
    loop {
        let end = (start + params.chunk_size).min(char_len);
        chunks.push(text[byte_at(start)..byte_at(end)].to_string());
        if end >= char_len {
            break;
        }
        start += params.step();
    }
    chunks
}

/// Number of chunks [`chunk_text`] produces for a text of `char_len`
/// characters: `ceil((len - overlap) / (chunk_size - overlap))` for texts
/// longer than one window, else 1.
pub fn expected_chunk_count(char_len: usize, params: &ChunkParams) -> usize {
    if char_len <= params.chunk_size {
        return 1;
    }
    (char_len - params.overlap).div_ceil(params.step())
}
