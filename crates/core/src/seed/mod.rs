//! Deterministic, string-keyed pseudo-randomness.
//!
//! Everything that looks random in the feed (clip lengths, clip placement,
//! background variants, sample datasets) is drawn from a [`SeededStream`]
//! started from [`hash`] of a stable [`SeedKey`]. Equal keys produce
//! bit-identical draws on every platform, which is what lets the feed show
//! the same clip boundaries after a reload without storing them anywhere.

use std::fmt;

use serde::{Deserialize, Serialize};

const FNV32_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV32_PRIME: u32 = 0x0100_0193;
const MULBERRY_INCREMENT: u32 = 0x6d2b_79f5;
const TWO_POW_32: f64 = 4_294_967_296.0;

/// FNV-1a over the UTF-16 code units of `seed`.
///
/// UTF-16 units are hashed (rather than bytes) so that hashes agree with
/// runtimes whose native strings are UTF-16.
pub fn hash(seed: &str) -> u32 {
    seed.encode_utf16().fold(FNV32_OFFSET_BASIS, |acc, unit| {
        (acc ^ u32::from(unit)).wrapping_mul(FNV32_PRIME)
    })
}

/// Starts a stream from an already computed hash.
pub fn stream_from(hash: u32) -> SeededStream {
    SeededStream::new(hash)
}

/// Shorthand for `stream_from(hash(seed))`.
pub fn stream_for(seed: &str) -> SeededStream {
    SeededStream::new(hash(seed))
}

/// Counter based Mulberry32 generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeededStream {
    state: u32,
}

impl SeededStream {
    pub fn new(hash: u32) -> Self {
        Self { state: hash }
    }

    pub fn next_u32(&mut self) -> u32 {
        self.state = self.state.wrapping_add(MULBERRY_INCREMENT);
        let mut t = self.state;
        t = (t ^ (t >> 15)).wrapping_mul(t | 1);
        t ^= t.wrapping_add((t ^ (t >> 7)).wrapping_mul(t | 61));
        t ^ (t >> 14)
    }

    /// Next draw in `[0, 1)`.
    pub fn next_f64(&mut self) -> f64 {
        f64::from(self.next_u32()) / TWO_POW_32
    }

    /// Uniform draw in `[min, max)`. An inverted range collapses to `min`.
    pub fn range(&mut self, min: f64, max: f64) -> f64 {
        let draw = self.next_f64();
        if max <= min {
            return min;
        }
        min + draw * (max - min)
    }

    /// Uniform integer in `[min, max]` (inclusive).
    pub fn int_range(&mut self, min: u32, max: u32) -> u32 {
        let draw = self.next_f64();
        if max <= min {
            return min;
        }
        let span = f64::from(max - min) + 1.0;
        min + (draw * span).floor() as u32
    }

    /// True with probability `p`.
    pub fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    /// Picks one element, or `None` for an empty slice.
    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        let draw = self.next_f64();
        if items.is_empty() {
            return None;
        }
        let index = ((draw * items.len() as f64).floor() as usize).min(items.len() - 1);
        items.get(index)
    }
}

impl Iterator for SeededStream {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        Some(self.next_f64())
    }
}

/// What a derived value is used for. Part of every [`SeedKey`] so that two
/// derivations for the same snippet never share a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SeedPurpose {
    SnippetLen,
    SnippetStart,
    FullLen,
    Visual,
    Sample,
}

impl SeedPurpose {
    pub fn tag(self) -> &'static str {
        match self {
            SeedPurpose::SnippetLen => "snippetLen",
            SeedPurpose::SnippetStart => "snippetStart",
            SeedPurpose::FullLen => "fullLen",
            SeedPurpose::Visual => "visual",
            SeedPurpose::Sample => "sample",
        }
    }
}

/// Deterministic seed composed from stable identifiers, joined with `:`.
///
/// Never built from wall-clock time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SeedKey(String);

impl SeedKey {
    pub fn new<I, S>(parts: I, purpose: SeedPurpose) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut key = String::new();
        for part in parts {
            key.push_str(part.as_ref());
            key.push(':');
        }
        key.push_str(purpose.tag());
        Self(key)
    }

    /// Key for a recording-level derivation, e.g. `rec-1:fullLen`.
    pub fn recording(recording_id: &str, purpose: SeedPurpose) -> Self {
        Self::new([recording_id], purpose)
    }

    /// Key for a snippet-level derivation, e.g. `rec-1:sn-1:snippetLen`.
    pub fn snippet(recording_id: &str, snippet_id: &str, purpose: SeedPurpose) -> Self {
        Self::new([recording_id, snippet_id], purpose)
    }

    /// Wraps an arbitrary seed string as-is.
    pub fn raw(seed: impl Into<String>) -> Self {
        Self(seed.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn hash(&self) -> u32 {
        hash(&self.0)
    }

    pub fn stream(&self) -> SeededStream {
        stream_for(&self.0)
    }
}

impl fmt::Display for SeedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
