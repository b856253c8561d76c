//! Fixed-size character windows with overlap.

use crate::core::config::ConfigError;

/// A trimmed, non-empty window of a page. `start..end` are char offsets of
/// the untrimmed window in the source text; `index` is the window's position
/// among all windows of the page, blank ones included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextWindow {
    pub index: usize,
    pub start: usize,
    pub end: usize,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunker {
    chunk_size: usize,
    overlap: usize,
}

impl Chunker {
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self, ConfigError> {
        if chunk_size == 0 {
            return Err(ConfigError::invalid(
                "rag.chunk_size",
                "must be greater than zero",
            ));
        }
        if overlap >= chunk_size {
            return Err(ConfigError::invalid(
                "rag.chunk_overlap",
                format!(
                    "overlap ({}) must be smaller than chunk_size ({})",
                    overlap, chunk_size
                ),
            ));
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

    fn step(&self) -> usize {
        self.chunk_size - self.overlap
    }

    /// Untrimmed window ranges covering `len` chars.
    pub fn ranges(&self, len: usize) -> impl Iterator<Item = (usize, usize)> + '_ {
        (0..len)
            .step_by(self.step())
            .map(move |start| (start, (start + self.chunk_size).min(len)))
    }

    /// Splits `text` into windows, dropping those that are blank once trimmed.
    pub fn chunk(&self, text: &str) -> Vec<TextWindow> {
        let chars: Vec<char> = text.chars().collect();

        self.ranges(chars.len())
            .enumerate()
            .filter_map(|(index, (start, end))| {
                let window: String = chars[start..end].iter().collect();
                let trimmed = window.trim();
                (!trimmed.is_empty()).then(|| TextWindow {
                    index,
                    start,
                    end,
                    text: trimmed.to_string(),
                })
            })
            .collect()
    }
}
