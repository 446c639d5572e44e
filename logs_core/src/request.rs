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

use std::path::{Path, PathBuf};

use crate::error::BuildError;
use crate::predicate::Predicate;

/// Process-wide tuning knobs, immutable once loaded (spec §6).
#[derive(Debug, Clone)]
pub struct Config {
    pub logs_dir: PathBuf,
    pub page_length: usize,
    pub max_line_length: usize,
}

impl Config {
    pub const DEFAULT_PAGE_LENGTH: usize = 1 << 20;
    pub const DEFAULT_MAX_LINE_LENGTH: usize = 1 << 16;

    pub fn new(logs_dir: PathBuf) -> Self {
        Self {
            logs_dir,
            page_length: Self::DEFAULT_PAGE_LENGTH,
            max_line_length: Self::DEFAULT_MAX_LINE_LENGTH,
        }
    }
}

/// One validated search, immutable once constructed (spec §3 `SearchRequest`).
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub file: String,
    pub total: u64,
    pub predicate: Predicate,
}

impl SearchRequest {
    pub fn new(file: impl Into<String>, total: u64, keywords: Vec<Vec<u8>>) -> Self {
        let predicate = if keywords.is_empty() {
            Predicate::always()
        } else {
            Predicate::containing_all(keywords)
        };
        Self {
            file: file.into(),
            total,
            predicate,
        }
    }
}

/// Resolves `request.file` against `logs_dir`, rejecting any path that
/// escapes it. Component-wise comparison of canonicalized paths, not a
/// textual prefix check (spec §9).
pub(crate) fn resolve_path(logs_dir: &Path, file: &str) -> Result<PathBuf, BuildError> {
    if file.is_empty() {
        return Err(BuildError::NotFound(PathBuf::from(file)));
    }

    let joined = logs_dir.join(file);

    let canonical_dir = std::fs::canonicalize(logs_dir).map_err(BuildError::Io)?;
    let canonical_file = std::fs::canonicalize(&joined).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            BuildError::NotFound(joined.clone())
        } else {
            BuildError::Io(e)
        }
    })?;

    let mut dir_components = canonical_dir.components();
    let mut within = true;
    for component in canonical_file.components() {
        match dir_components.next() {
            Some(dir_component) if dir_component == component => continue,
            Some(_) => {
                within = false;
                break;
            }
            None => break,
        }
    }
    // Every component of canonical_dir must have been consumed for the file
    // to be considered inside it.
    if dir_components.next().is_some() {
        within = false;
    }

    if !within {
        return Err(BuildError::PathEscape(canonical_file));
    }

    Ok(canonical_file)
}
