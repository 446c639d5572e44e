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

use memchr::memmem;

/// The AND-of-substrings predicate a [`crate::finder::LineFinder`] applies to
/// every candidate line. An empty keyword list matches every line.
#[derive(Debug, Clone, Default)]
pub struct Predicate {
    keywords: Vec<Vec<u8>>,
}

impl Predicate {
    /// Matches every line unconditionally.
    pub fn always() -> Self {
        Self::default()
    }

    /// Matches a line iff it contains every keyword as a byte substring.
    pub fn containing_all(keywords: Vec<Vec<u8>>) -> Self {
        Self { keywords }
    }

    pub fn matches(&self, line: &[u8]) -> bool {
        self.keywords
            .iter()
            .all(|kw| memmem::find(line, kw).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_keyword_list_matches_everything() {
        let p = Predicate::always();
        assert!(p.matches(b"anything at all"));
        assert!(p.matches(b""));
    }

    #[test]
    fn single_keyword_requires_substring_match() {
        let p = Predicate::containing_all(vec![b"odd".to_vec()]);
        assert!(p.matches(b"99999999 is odd\n"));
        assert!(!p.matches(b"2 is even\n"));
    }

    #[test]
    fn multiple_keywords_require_all_to_match() {
        let p = Predicate::containing_all(vec![b"odd".to_vec(), b"1".to_vec()]);
        assert!(p.matches(b"99999991 is odd\n"));
        assert!(!p.matches(b"99999993 is odd\n"));
        assert!(!p.matches(b"2 is even\n"));
    }
}
