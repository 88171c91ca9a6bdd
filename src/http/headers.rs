//! Request headers
//!
//! Names are normalized to lowercase on insert and values are trimmed of
//! surrounding spaces and tabs. Each name appears once; a repeated name
//! overwrites the earlier value.

use std::fmt;

/// Normalized header map, in first-seen order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    headers: Vec<(String, String)>,
}

impl Headers {
    pub fn new() -> Self {
        Headers {
            headers: Vec::new(),
        }
    }

    /// Insert a header, replacing any existing value for the same name
    pub fn insert(&mut self, name: &str, value: &str) {
        let name = trim_ws(name).to_ascii_lowercase();
        let value = trim_ws(value).to_string();

        match self.headers.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = value,
            None => self.headers.push((name, value)),
        }
    }

    /// Value for `name` (matched case-insensitively)
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Parse a `name: value` line
    ///
    /// Returns `None` for lines without a colon or with an empty name.
    pub fn parse_header_line(line: &str) -> Option<(&str, &str)> {
        let colon_pos = line.find(':')?;
        let name = trim_ws(&line[..colon_pos]);
        if name.is_empty() {
            return None;
        }
        Some((name, trim_ws(&line[colon_pos + 1..])))
    }
}

/// Trim horizontal whitespace only
fn trim_ws(s: &str) -> &str {
    s.trim_matches(|c| c == ' ' || c == '\t')
}

impl fmt::Display for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in &self.headers {
            writeln!(f, "{}: {}", name, value)?;
        }
        Ok(())
    }
}

impl<'a> FromIterator<(&'a str, &'a str)> for Headers {
    fn from_iter<T: IntoIterator<Item = (&'a str, &'a str)>>(iter: T) -> Self {
        let mut headers = Headers::new();
        for (name, value) in iter {
            headers.insert(name, value);
        }
        headers
    }
}
