//! Overlapping, boundary-aware text chunking.
//!
//! A chunk is cut at the highest-priority separator found inside its window,
//! falling through the list down to a hard character cut. The next chunk then
//! starts exactly `overlap` characters before the previous cut. Lengths are in
//! `char`s, never bytes.

use crate::error::{Error, Result};
use crate::types::Chunk;

/// Paragraph, line, sentence end, clause, word, then anywhere.
pub const SEPARATORS: &[&str] = &["\n\n", "\n", ".", "!", "?", ",", " ", ""];

#[derive(Debug, Clone, Copy)]
pub struct Chunker {
    size: usize,
    overlap: usize,
}

impl Chunker {
    pub fn new(size: usize, overlap: usize) -> Result<Self> {
        if size == 0 || overlap == 0 {
            return Err(Error::Configuration(format!("chunk size ({size}) and overlap ({overlap}) must be > 0")));
        }
        if overlap >= size {
            return Err(Error::Configuration(format!("chunk overlap ({overlap}) must be smaller than chunk size ({size})")));
        }
        Ok(Self { size, overlap })
    }

    pub fn size(&self) -> usize { self.size }
    pub fn overlap(&self) -> usize { self.overlap }

    /// Lazily chunk `text`. Calling again with the same input yields the same sequence.
    pub fn chunks<'a>(&self, record_id: &'a str, text: &'a str) -> Chunks<'a> {
        let mut bounds: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
        bounds.push(text.len());
        Chunks { text, record_id, bounds, size: self.size, overlap: self.overlap, start: 0, index: 0, done: false }
    }

    pub fn split(&self, text: &str) -> Vec<String> {
        self.chunks("", text).map(|c| c.text).collect()
    }
}

pub struct Chunks<'a> {
    text: &'a str,
    record_id: &'a str,
    /// Byte offset of every char, plus `text.len()`.
    bounds: Vec<usize>,
    size: usize,
    overlap: usize,
    start: usize,
    index: usize,
    done: bool,
}

impl<'a> Chunks<'a> {
    fn char_len(&self) -> usize { self.bounds.len() - 1 }

    /// Char index where the chunk starting at `start` ends. Always within
    /// `(start + overlap, start + size]` so every step makes progress.
    fn cut(&self, start: usize) -> usize {
        let limit = start + self.size;
        let min_end = start + self.overlap + 1;
        self.find_cut(start, min_end, limit, SEPARATORS)
    }

    fn find_cut(&self, start: usize, min_end: usize, limit: usize, separators: &[&str]) -> usize {
        let Some((sep, rest)) = separators.split_first() else { return limit };
        if sep.is_empty() { return limit; }
        let window_start = self.bounds[start];
        let window = &self.text[window_start..self.bounds[limit]];
        match window.rfind(sep) {
            Some(pos) if window_start + pos + sep.len() >= self.bounds[min_end] => {
                let end_byte = window_start + pos + sep.len();
                self.bounds.binary_search(&end_byte).unwrap_or_else(|i| i)
            }
            _ => self.find_cut(start, min_end, limit, rest),
        }
    }
}

impl<'a> Iterator for Chunks<'a> {
    type Item = Chunk;

    fn next(&mut self) -> Option<Chunk> {
        let n = self.char_len();
        if self.done || self.start >= n {
            self.done = true;
            return None;
        }
        let end = if n - self.start <= self.size {
            self.done = true;
            n
        } else {
            self.cut(self.start)
        };
        let chunk = Chunk {
            text: self.text[self.bounds[self.start]..self.bounds[end]].to_string(),
            source_record_id: self.record_id.to_string(),
            chunk_index: self.index,
        };
        self.index += 1;
        if !self.done { self.start = end - self.overlap; }
        Some(chunk)
    }
}
