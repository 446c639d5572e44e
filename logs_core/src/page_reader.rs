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

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

/// Outcome of a [`PageReader::read_fully`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// The requested number of bytes was read in full.
    Full,
    /// Fewer bytes were available than requested before EOF. Treated as the
    /// "event horizon": the caller ends its stream cleanly, not as an error.
    Short,
}

/// Owns the file handle for one search and fills a caller-supplied buffer
/// from an arbitrary absolute offset, looping over short reads.
pub struct PageReader {
    file: File,
    len: u64,
}

impl PageReader {
    /// Opens `path` read-only and snapshots its length.
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = File::open(path)?;
        let len = file.metadata()?.len();
        Ok(Self { file, len })
    }

    /// Length of the file as observed at open time.
    pub const fn len(&self) -> u64 {
        self.len
    }

    /// Fills `buf` in full from absolute file `position`, looping over short
    /// reads until satisfied. Returns [`ReadOutcome::Short`] on a premature
    /// zero/partial read rather than an error — see spec §4.1.
    pub fn read_fully(&mut self, buf: &mut [u8], position: u64) -> io::Result<ReadOutcome> {
        self.file.seek(SeekFrom::Start(position))?;

        let mut filled = 0;
        while filled < buf.len() {
            match self.file.read(&mut buf[filled..]) {
                Ok(0) => return Ok(ReadOutcome::Short),
                Ok(n) => filled += n,
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(ReadOutcome::Full)
    }
}
