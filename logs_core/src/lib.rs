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

//! Reverse-paged line extraction engine for tailing append-only log files
//! that may exceed available memory. See `SPEC_FULL.md` at the repository
//! root for the full design.

pub mod error;
pub mod extractor;
pub mod finder;
pub mod page_reader;
pub mod predicate;
pub mod request;

pub use error::{BuildError, StreamError};
pub use extractor::{extract, Extraction, LineSpan};
pub use finder::LineFinder;
pub use page_reader::{PageReader, ReadOutcome};
pub use predicate::Predicate;
pub use request::{Config, SearchRequest};
