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

use std::path::PathBuf;

/// Rejected at [`crate::finder::LineFinder::build`], before any file is read.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("file not found: {0}")]
    NotFound(PathBuf),

    #[error("path escapes logs directory: {0}")]
    PathEscape(PathBuf),

    #[error("failed to open log file")]
    Io(#[source] std::io::Error),
}

/// Raised mid-stream by a driven [`crate::finder::LineFinder`]. Fatal: the search
/// is abandoned and no further lines are produced.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error("failed to read log file")]
    Io(#[source] std::io::Error),

    #[error("line exceeded maximum length")]
    LineOverflow,
}
