//! Collect report models and mutable report builder.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Serialize, Serializer};

/// File base name -> relative paths (from the source root) where it was found.
pub type TypeResultIndex = BTreeMap<String, BTreeSet<String>>;

/// Aggregate counters, diagnostics and the result index for one `collect_tree` run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReportCollect {
    /// Number of files seen inside processed directories.
    pub cnt_scanned: u64,
    /// Number of scanned files that passed the include/exclude filters.
    pub cnt_matched: u64,
    /// Number of files written to the destination (planned, in dry-run).
    pub cnt_copied: u64,
    /// Number of copied files that received a `_N` suffix.
    pub cnt_renamed: u64,
    /// Number of directories whose files were processed.
    pub cnt_dirs_visited: u64,
    /// Number of subdirectories skipped by the depth limit.
    pub cnt_dirs_pruned: u64,
    /// Non-fatal warnings collected during traversal.
    pub warnings: Vec<String>,
    /// What was found, and where.
    pub files: TypeResultIndex,
}

impl ReportCollect {
    /// Number of collected warnings.
    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    /// Relative paths recorded for `name`, sorted. Empty when never seen.
    pub fn paths_for(&self, name: &str) -> Vec<&str> {
        self.files
            .get(name)
            .map(|set| set.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Machine-readable counters.
    pub fn to_dict(&self) -> BTreeMap<String, u64> {
        let mut dict_counts = BTreeMap::new();
        dict_counts.insert("cnt_scanned".to_string(), self.cnt_scanned);
        dict_counts.insert("cnt_matched".to_string(), self.cnt_matched);
        dict_counts.insert("cnt_copied".to_string(), self.cnt_copied);
        dict_counts.insert("cnt_renamed".to_string(), self.cnt_renamed);
        dict_counts.insert("cnt_dirs_visited".to_string(), self.cnt_dirs_visited);
        dict_counts.insert("cnt_dirs_pruned".to_string(), self.cnt_dirs_pruned);
        dict_counts.insert("cnt_names".to_string(), self.files.len() as u64);
        dict_counts.insert("cnt_warnings".to_string(), self.warning_count() as u64);
        dict_counts
    }

    /// Human-readable one-line summary.
    pub fn format(&self, prefix: &str) -> String {
        let dict_counts = self.to_dict();
        format!(
            "{prefix} scanned={} matched={} copied={} renamed={} names={} dirs={} pruned={} warnings={}",
            dict_counts["cnt_scanned"],
            dict_counts["cnt_matched"],
            dict_counts["cnt_copied"],
            dict_counts["cnt_renamed"],
            dict_counts["cnt_names"],
            dict_counts["cnt_dirs_visited"],
            dict_counts["cnt_dirs_pruned"],
            dict_counts["cnt_warnings"]
        )
    }

    /// Render the result index as text: each name, then its paths indented.
    pub fn format_index(&self) -> String {
        let mut txt = String::new();
        for (name, set_paths) in &self.files {
            txt.push_str(name);
            txt.push('\n');
            for rel_path in set_paths {
                txt.push_str("  ");
                txt.push_str(rel_path);
                txt.push('\n');
            }
        }
        txt
    }
}

impl fmt::Display for ReportCollect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format("[COLLECT]"))
    }
}

#[derive(Serialize)]
struct ReportCollectView<'a> {
    files: &'a TypeResultIndex,
    counts: BTreeMap<String, u64>,
    warnings: &'a [String],
}

impl Serialize for ReportCollect {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        ReportCollectView {
            files: &self.files,
            counts: self.to_dict(),
            warnings: &self.warnings,
        }
        .serialize(serializer)
    }
}

/// Mutable accumulator owned by one traversal.
#[derive(Debug, Default)]
pub struct ReportCollectBuilder {
    report: ReportCollect,
}

impl ReportCollectBuilder {
    pub fn add_scanned(&mut self) {
        self.report.cnt_scanned += 1;
    }

    pub fn add_matched(&mut self) {
        self.report.cnt_matched += 1;
    }

    pub fn add_copied(&mut self) {
        self.report.cnt_copied += 1;
    }

    pub fn add_renamed(&mut self) {
        self.report.cnt_renamed += 1;
    }

    pub fn add_dir_visited(&mut self) {
        self.report.cnt_dirs_visited += 1;
    }

    pub fn add_dir_pruned(&mut self) {
        self.report.cnt_dirs_pruned += 1;
    }

    /// Add warning message.
    pub fn add_warning(&mut self, warning: String) {
        self.report.warnings.push(warning);
    }

    /// Record that a file called `name` was found at `rel_path`.
    pub fn add_found(&mut self, name: &str, rel_path: String) {
        self.report
            .files
            .entry(name.to_string())
            .or_default()
            .insert(rel_path);
    }

    /// Finalize builder into immutable report.
    pub fn build(self) -> ReportCollect {
        self.report
    }
}

#[cfg(test)]
mod tests {
    use super::{ReportCollect, ReportCollectBuilder};

    #[test]
    fn report_collect_to_dict_and_format() {
        let mut builder = ReportCollectBuilder::default();
        builder.add_dir_visited();
        builder.add_dir_visited();
        builder.add_dir_pruned();
        for _ in 0..3 {
            builder.add_scanned();
        }
        builder.add_matched();
        builder.add_matched();
        builder.add_copied();
        builder.add_copied();
        builder.add_renamed();
        builder.add_warning("w".to_string());
        builder.add_found("a.txt", "a.txt".to_string());
        builder.add_found("a.txt", "sub/a.txt".to_string());

        let report = builder.build();
        let dict_counts = report.to_dict();
        assert_eq!(dict_counts["cnt_scanned"], 3);
        assert_eq!(dict_counts["cnt_matched"], 2);
        assert_eq!(dict_counts["cnt_copied"], 2);
        assert_eq!(dict_counts["cnt_renamed"], 1);
        assert_eq!(dict_counts["cnt_names"], 1);
        assert_eq!(dict_counts["cnt_warnings"], 1);

        let txt = report.format("[COLLECT]");
        assert_eq!(
            txt,
            "[COLLECT] scanned=3 matched=2 copied=2 renamed=1 names=1 dirs=2 pruned=1 warnings=1"
        );
        assert_eq!(report.to_string(), txt);
    }

    #[test]
    fn add_found_ignores_exact_duplicates() {
        let mut builder = ReportCollectBuilder::default();
        builder.add_found("x.md", "docs/x.md".to_string());
        builder.add_found("x.md", "docs/x.md".to_string());
        let report = builder.build();
        assert_eq!(report.paths_for("x.md"), vec!["docs/x.md"]);
        assert!(report.paths_for("missing").is_empty());
    }

    #[test]
    fn format_index_is_sorted() {
        let mut builder = ReportCollectBuilder::default();
        builder.add_found("b.txt", "z/b.txt".to_string());
        builder.add_found("a.txt", "sub/a.txt".to_string());
        builder.add_found("a.txt", "a.txt".to_string());
        let report = builder.build();
        assert_eq!(
            report.format_index(),
            "a.txt\n  a.txt\n  sub/a.txt\nb.txt\n  z/b.txt\n"
        );
    }

    #[test]
    fn empty_report_renders_nothing() {
        let report = ReportCollect::default();
        assert_eq!(report.format_index(), "");
        assert_eq!(report.to_dict()["cnt_names"], 0);
    }
}
