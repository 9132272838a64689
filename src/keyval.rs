//! Line-oriented `key value` text files.
//!
//! Each line holds one entry: the key starts at the first character and runs
//! to the first space or tab; the value is everything after that run of
//! whitespace up to the end of the line. Empty lines are skipped.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use anyhow::Context;

use crate::error::XvmError;

pub type KeyValMap = BTreeMap<String, String>;

/// One-based number of the first line that broke the format.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IllFormattedLine(pub usize);

pub fn parse(input: &str) -> Result<KeyValMap, IllFormattedLine> {
    let mut entries = KeyValMap::new();

    for (index, line) in input.lines().enumerate() {
        if line.is_empty() {
            continue;
        }
        let (key, value) = split_line(line).ok_or(IllFormattedLine(index + 1))?;
        entries.insert(key.to_string(), value.to_string());
    }

    Ok(entries)
}

fn split_line(line: &str) -> Option<(&str, &str)> {
    if line.starts_with(is_blank) {
        return None;
    }

    let key_end = line.find(is_blank)?;
    let (key, rest) = line.split_at(key_end);
    let value = rest.trim_start_matches(is_blank);
    if value.is_empty() {
        return None;
    }

    Some((key, value))
}

fn is_blank(ch: char) -> bool {
    ch == ' ' || ch == '\t'
}

pub fn render(entries: &KeyValMap) -> String {
    let mut out = String::new();
    for (key, value) in entries {
        out.push_str(key);
        out.push(' ');
        out.push_str(value);
        out.push('\n');
    }
    out
}

/// Reads and parses `path`. A missing file is `Ok(None)`.
pub fn read_file(path: &Path) -> anyhow::Result<Option<KeyValMap>> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => {
            return Err(err).with_context(|| format!("failed to read {}", path.display()));
        }
    };

    parse(&raw)
        .map(Some)
        .map_err(|IllFormattedLine(line)| {
            XvmError::IllFormatted {
                path: path.to_path_buf(),
                line,
            }
            .into()
        })
}

/// Whether `key value` renders to a line that parses back to the same pair.
fn is_writable(key: &str, value: &str) -> bool {
    !key.is_empty()
        && !key.contains(char::is_whitespace)
        && !value.is_empty()
        && !value.starts_with(is_blank)
        && !value.contains(['\n', '\r'])
}

pub fn write_file(path: &Path, entries: &KeyValMap) -> anyhow::Result<()> {
    if let Some((key, _)) = entries.iter().find(|(key, value)| !is_writable(key, value)) {
        return Err(XvmError::UnwritableEntry {
            path: path.to_path_buf(),
            key: key.clone(),
        }
        .into());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }
    fs::write(path, render(entries)).with_context(|| format!("failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn value_keeps_inner_spaces() {
        let parsed = parse("key value with spaces").expect("parse");
        assert_eq!(parsed.get("key").map(String::as_str), Some("value with spaces"));
    }

    #[test]
    fn leading_whitespace_is_ill_formatted() {
        assert_eq!(parse("  leadingspace value"), Err(IllFormattedLine(1)));
        assert_eq!(parse("node 12\n\tgo 1.21\n"), Err(IllFormattedLine(2)));
    }

    #[test]
    fn key_without_value_is_ill_formatted() {
        assert_eq!(parse("node"), Err(IllFormattedLine(1)));
        assert_eq!(parse("node   "), Err(IllFormattedLine(1)));
    }

    #[test]
    fn separator_run_may_mix_tabs_and_spaces() {
        let parsed = parse("node \t 12.4.0\r\ngo\t1.21\n\n").expect("parse");
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed["node"], "12.4.0");
        assert_eq!(parsed["go"], "1.21");
    }

    #[test]
    fn later_lines_override_earlier_keys() {
        let parsed = parse("node 10\nnode 12\n").expect("parse");
        assert_eq!(parsed["node"], "12");
    }

    #[test]
    fn read_file_reports_path_of_bad_file() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("versions");
        std::fs::write(&path, "ok 1\n bad\n").expect("write");

        let err = read_file(&path).expect_err("should fail");
        match err.downcast_ref::<XvmError>() {
            Some(XvmError::IllFormatted { path: bad, line }) => {
                assert_eq!(bad, &path);
                assert_eq!(*line, 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn read_file_missing_is_none() {
        let temp = tempfile::tempdir().expect("tempdir");
        let loaded = read_file(&temp.path().join("absent")).expect("read");
        assert!(loaded.is_none());
    }

    #[test]
    fn write_file_creates_parent_directories() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("scope").join("versions");
        let mut entries = KeyValMap::new();
        entries.insert("node".to_string(), "12".to_string());

        write_file(&path, &entries).expect("write");
        assert_eq!(std::fs::read_to_string(&path).expect("read"), "node 12\n");
    }

    #[test]
    fn write_file_rejects_entries_that_would_not_read_back() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("versions");

        for (key, value) in [
            ("my plugin", "12"),
            ("node\t", "12"),
            ("", "12"),
            ("node", ""),
            ("node", " 12"),
            ("node", "12\ngo 1.21"),
        ] {
            let mut entries = KeyValMap::new();
            entries.insert(key.to_string(), value.to_string());

            let err = write_file(&path, &entries).expect_err("should refuse");
            assert!(
                matches!(
                    err.downcast_ref::<XvmError>(),
                    Some(XvmError::UnwritableEntry { key: bad, .. }) if bad == key
                ),
                "unexpected error for {key:?}: {err}"
            );
            assert!(!path.exists());
        }
    }

    proptest! {
        #[test]
        fn render_then_parse_is_identity(
            entries in proptest::collection::btree_map(
                "[A-Za-z0-9._-]{1,16}",
                "[A-Za-z0-9._-][A-Za-z0-9 ._:/-]{0,32}",
                0..16,
            )
        ) {
            let parsed = parse(&render(&entries)).expect("parse rendered map");
            prop_assert_eq!(parsed, entries);
        }
    }
}
