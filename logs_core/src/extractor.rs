// Copyright 2024-2025 Andres Morey
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

const NL: u8 = b'\n';

/// A complete, newline-terminated line found while scanning one page.
///
/// `Page` borrows directly from the page buffer (the common case, zero-copy).
/// `Owned` is used only when a line is assembled by joining the tail of the
/// page to the carried-over suffix from a later (already-processed) page.
#[derive(Debug, PartialEq, Eq)]
pub enum LineSpan<'a> {
    Page(&'a [u8]),
    Owned(Vec<u8>),
}

impl<'a> LineSpan<'a> {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Page(s) => s,
            Self::Owned(v) => v,
        }
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }

    /// Copies (or moves) the line into an owned buffer, independent of the
    /// page buffer it may have borrowed from. Callers must do this before the
    /// next page read overwrites the buffer.
    pub fn into_owned(self) -> Vec<u8> {
        match self {
            Self::Page(s) => s.to_vec(),
            Self::Owned(v) => v,
        }
    }
}

/// Result of one [`extract`] call.
#[derive(Debug)]
pub struct Extraction<'a> {
    /// Complete lines found in `page`, most-recent-first (highest file offset first).
    pub lines: Vec<LineSpan<'a>>,
    /// Bytes preceding the first newline in `page` — not a confirmed line,
    /// carried forward as the suffix for the next (earlier-offset) page.
    pub prefix: Vec<u8>,
    /// True iff a kept line (or the no-newline accumulation) would exceed
    /// `max_line_length`.
    pub overflow: bool,
}

/// Pure function: given the latest page read (at a lower file offset than
/// anything already processed) and the suffix carried from later pages,
/// returns the complete lines found plus a new prefix.
///
/// See spec §4.2 for the full algorithm this implements.
pub fn extract<'a>(max_line_length: usize, page: &'a [u8], suffix: &[u8]) -> Extraction<'a> {
    let newline_positions: Vec<usize> = memchr::memchr_iter(NL, page).collect();

    if newline_positions.is_empty() {
        let total = page.len() + suffix.len();
        if total >= max_line_length {
            return Extraction {
                lines: Vec::new(),
                prefix: Vec::new(),
                overflow: true,
            };
        }
        let mut prefix = Vec::with_capacity(total);
        prefix.extend_from_slice(page);
        prefix.extend_from_slice(suffix);
        return Extraction {
            lines: Vec::new(),
            prefix,
            overflow: false,
        };
    }

    // region_0 ..= region_{k-1}, oldest-to-newest, each inclusive of its
    // terminating newline.
    let mut regions: Vec<LineSpan<'a>> = Vec::with_capacity(newline_positions.len() + 1);
    let mut left = 0usize;
    for &nl_pos in &newline_positions {
        regions.push(LineSpan::Page(&page[left..=nl_pos]));
        left = nl_pos + 1;
    }

    let tail = &page[left..];
    let suffix_ends_in_newline = suffix.last() == Some(&NL);

    if tail.is_empty() {
        if !suffix.is_empty() && suffix_ends_in_newline {
            regions.push(LineSpan::Owned(suffix.to_vec()));
        }
        // else: unterminated trailing bytes at the page's right edge cannot
        // form a line; suffix is discarded.
    } else if suffix_ends_in_newline {
        let mut joined = Vec::with_capacity(tail.len() + suffix.len());
        joined.extend_from_slice(tail);
        joined.extend_from_slice(suffix);
        regions.push(LineSpan::Owned(joined));
    }
    // else: tail has no confirmed terminator yet and suffix doesn't supply
    // one either; both are discarded.

    regions.reverse();
    let prefix = regions
        .pop()
        .expect("at least region_0 is always present when a newline was found")
        .into_owned();

    let overflow = regions.iter().any(|l| l.len() > max_line_length);

    Extraction {
        lines: regions,
        prefix,
        overflow,
    }
}
