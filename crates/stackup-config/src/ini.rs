//! Tolerant INI document model
//!
//! Adjustment routines parse service config templates as INI sections and
//! keys, mutate a handful of values, and re-serialize. Source templates are
//! not under our control, so the parser never fails: lines it cannot make
//! sense of are dropped, and lookups of missing sections or keys return
//! `None` instead of erroring. `set` creates sections on demand.

use std::fmt;

use indexmap::IndexMap;
use nom::{
    bytes::complete::take_till,
    character::complete::{char, one_of},
    combinator::rest,
    sequence::delimited,
    IResult, Parser,
};

/// Section used for keys that appear before any section header
pub const DEFAULT_SECTION: &str = "DEFAULT";

/// An ordered INI document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IniDocument {
    sections: IndexMap<String, IndexMap<String, String>>,
}

fn section_header(line: &str) -> IResult<&str, &str> {
    delimited(char('['), take_till(|c| c == ']'), char(']')).parse(line)
}

fn key_value(line: &str) -> IResult<&str, (&str, &str)> {
    let (line, key) = take_till(|c| c == '=' || c == ':').parse(line)?;
    let (line, _) = one_of("=:").parse(line)?;
    let (line, value) = rest.parse(line)?;
    Ok((line, (key, value)))
}

impl IniDocument {
    /// Parse a document, silently dropping lines that fit no rule
    pub fn parse(input: &str) -> Self {
        let mut doc = Self::default();
        let mut current = DEFAULT_SECTION.to_string();
        for raw in input.lines() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }
            if let Ok((_, name)) = section_header(line) {
                current = name.trim().to_string();
                doc.sections.entry(current.clone()).or_default();
                continue;
            }
            if let Ok((_, (key, value))) = key_value(line) {
                let key = key.trim();
                if key.is_empty() {
                    continue;
                }
                doc.sections
                    .entry(current.clone())
                    .or_default()
                    .insert(key.to_string(), value.trim().to_string());
            }
        }
        doc
    }

    /// Look up a value; missing section or key is `None`, never an error
    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.sections.get(section)?.get(key).map(String::as_str)
    }

    /// Set a value, creating the section if needed
    pub fn set(&mut self, section: &str, key: &str, value: impl ToString) {
        self.sections
            .entry(section.to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());
    }

    /// Remove a key; a no-op when section or key is absent
    pub fn remove(&mut self, section: &str, key: &str) -> Option<String> {
        self.sections.get_mut(section)?.shift_remove(key)
    }

    /// Section names in document order
    pub fn sections(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(String::as_str)
    }

    /// Whether the document has the given section
    pub fn has_section(&self, section: &str) -> bool {
        self.sections.contains_key(section)
    }
}

impl fmt::Display for IniDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (section, entries) in &self.sections {
            if !first {
                writeln!(f)?;
            }
            first = false;
            writeln!(f, "[{section}]")?;
            for (key, value) in entries {
                writeln!(f, "{key} = {value}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
# leading comment
top_level = yes

[server]
bind_host = 0.0.0.0
bind_port: 8080
; another comment style
garbage line without separator

[empty_section]
";

    #[test]
    fn parses_sections_and_both_separators() {
        let doc = IniDocument::parse(SAMPLE);
        assert_eq!(doc.get("server", "bind_host"), Some("0.0.0.0"));
        assert_eq!(doc.get("server", "bind_port"), Some("8080"));
    }

    #[test]
    fn keys_before_headers_land_in_default_section() {
        let doc = IniDocument::parse(SAMPLE);
        assert_eq!(doc.get(DEFAULT_SECTION, "top_level"), Some("yes"));
    }

    #[test]
    fn missing_lookups_are_none() {
        let doc = IniDocument::parse(SAMPLE);
        assert_eq!(doc.get("server", "no_such_key"), None);
        assert_eq!(doc.get("no_such_section", "bind_host"), None);
    }

    #[test]
    fn junk_lines_are_dropped() {
        let doc = IniDocument::parse(SAMPLE);
        assert_eq!(doc.get("server", "garbage line without separator"), None);
    }

    #[test]
    fn set_creates_sections_on_demand() {
        let mut doc = IniDocument::default();
        assert!(!doc.has_section("sql"));
        doc.set("sql", "connection", "mysql://user@host/db");
        assert_eq!(doc.get("sql", "connection"), Some("mysql://user@host/db"));
    }

    #[test]
    fn remove_is_noop_when_absent() {
        let mut doc = IniDocument::parse(SAMPLE);
        assert_eq!(doc.remove("server", "bind_host"), Some("0.0.0.0".to_string()));
        assert_eq!(doc.remove("server", "bind_host"), None);
        assert_eq!(doc.remove("nowhere", "nothing"), None);
    }

    #[test]
    fn round_trip_preserves_order() {
        let doc = IniDocument::parse(SAMPLE);
        let rendered = doc.to_string();
        let reparsed = IniDocument::parse(&rendered);
        assert_eq!(doc, reparsed);
        let sections: Vec<&str> = doc.sections().collect();
        assert_eq!(sections, ["DEFAULT", "server", "empty_section"]);
    }
}
