//! Zero-context line diff
//!
//! Compares two sequences of normalized lines and reports only the lines that differ: no
//! context lines, no hunk headers. Inside each contiguous block of changes every removal is
//! reported before any addition, whatever order the underlying algorithm emits them in.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use similar::{Algorithm, ChangeTag, TextDiff};

/// Which edit-script algorithm computes the diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffAlgorithm {
    #[default]
    Myers,
    Patience,
    Lcs,
}

impl DiffAlgorithm {
    pub const ALL: [DiffAlgorithm; 3] = [
        DiffAlgorithm::Myers,
        DiffAlgorithm::Patience,
        DiffAlgorithm::Lcs,
    ];

    pub fn name(self) -> &'static str {
        match self {
            DiffAlgorithm::Myers => "myers",
            DiffAlgorithm::Patience => "patience",
            DiffAlgorithm::Lcs => "lcs",
        }
    }
}

impl From<DiffAlgorithm> for Algorithm {
    fn from(algorithm: DiffAlgorithm) -> Self {
        match algorithm {
            DiffAlgorithm::Myers => Algorithm::Myers,
            DiffAlgorithm::Patience => Algorithm::Patience,
            DiffAlgorithm::Lcs => Algorithm::Lcs,
        }
    }
}

impl FromStr for DiffAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|algorithm| algorithm.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown diff algorithm '{s}' (expected myers, patience or lcs)"))
    }
}

impl fmt::Display for DiffAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeOp {
    Remove,
    Add,
}

/// Which input a line or an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Before,
    After,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Side::Before => "before",
            Side::After => "after",
        })
    }
}

/// One differing line. Displays as `-text` or `+text`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeRecord {
    pub op: ChangeOp,
    pub text: String,
    pub side: Side,
}

impl ChangeRecord {
    pub fn removed(text: impl Into<String>) -> Self {
        Self {
            op: ChangeOp::Remove,
            text: text.into(),
            side: Side::Before,
        }
    }

    pub fn added(text: impl Into<String>) -> Self {
        Self {
            op: ChangeOp::Add,
            text: text.into(),
            side: Side::After,
        }
    }
}

impl fmt::Display for ChangeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = match self.op {
            ChangeOp::Remove => '-',
            ChangeOp::Add => '+',
        };
        write!(f, "{sign}{}", self.text)
    }
}

/// Diff two line sequences with the default algorithm.
pub fn diff(before: &[String], after: &[String]) -> Vec<ChangeRecord> {
    diff_with(before, after, DiffAlgorithm::default())
}

/// Diff two line sequences. An empty result means the sequences are equal.
pub fn diff_with(before: &[String], after: &[String], algorithm: DiffAlgorithm) -> Vec<ChangeRecord> {
    if before == after {
        return Vec::new();
    }
    let old: Vec<&str> = before.iter().map(String::as_str).collect();
    let new: Vec<&str> = after.iter().map(String::as_str).collect();
    let diff = TextDiff::configure()
        .algorithm(algorithm.into())
        .diff_slices(&old, &new);

    let mut records = Vec::new();
    let mut additions = Vec::new();
    for change in diff.iter_all_changes() {
        match change.tag() {
            ChangeTag::Equal => records.append(&mut additions),
            ChangeTag::Delete => records.push(ChangeRecord::removed(change.value())),
            ChangeTag::Insert => additions.push(ChangeRecord::added(change.value())),
        }
    }
    records.append(&mut additions);
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn lines(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_equal_inputs_have_no_records() {
        let a = lines(&["a", "b"]);
        assert!(diff(&a, &a).is_empty());
        assert!(diff(&[], &[]).is_empty());
    }

    #[rstest]
    #[case(DiffAlgorithm::Myers)]
    #[case(DiffAlgorithm::Patience)]
    #[case(DiffAlgorithm::Lcs)]
    fn test_replaced_line(#[case] algorithm: DiffAlgorithm) {
        let records = diff_with(
            &lines(&["def f(x):", "return x + 1"]),
            &lines(&["def f(x):", "return x + 2"]),
            algorithm,
        );
        assert_eq!(
            records,
            vec![
                ChangeRecord::removed("return x + 1"),
                ChangeRecord::added("return x + 2")
            ]
        );
    }

    #[test]
    fn test_removals_precede_additions_in_each_block() {
        let records = diff(
            &lines(&["a", "b", "c", "d", "e"]),
            &lines(&["x", "b", "c", "y", "z", "e"]),
        );
        let rendered: Vec<String> = records.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, vec!["-a", "+x", "-d", "+y", "+z"]);
    }

    #[test]
    fn test_pure_insertion_and_deletion() {
        assert_eq!(
            diff(&lines(&["a"]), &lines(&["a", "b"])),
            vec![ChangeRecord::added("b")]
        );
        assert_eq!(
            diff(&lines(&["a", "b"]), &lines(&["b"])),
            vec![ChangeRecord::removed("a")]
        );
    }

    #[test]
    fn test_algorithm_names() {
        assert_eq!("Patience".parse::<DiffAlgorithm>(), Ok(DiffAlgorithm::Patience));
        assert!("fast".parse::<DiffAlgorithm>().is_err());
        assert_eq!(DiffAlgorithm::Lcs.to_string(), "lcs");
    }

    #[test]
    fn test_records_serialize() {
        let json = serde_json::to_string(&ChangeRecord::removed("x = 1")).unwrap();
        assert_eq!(json, r#"{"op":"remove","text":"x = 1","side":"before"}"#);
    }
}
