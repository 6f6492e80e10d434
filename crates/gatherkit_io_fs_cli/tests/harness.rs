//! Test harness for gather-files integration tests

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use tempfile::TempDir;

/// Scratch area with an `input/` tree and a not-yet-created `output/`.
pub struct TestTree {
    dir: TempDir,
}

impl TestTree {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        fs::create_dir_all(dir.path().join("input")).expect("Failed to create input dir");
        Self { dir }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn input(&self) -> PathBuf {
        self.dir.path().join("input")
    }

    pub fn output(&self) -> PathBuf {
        self.dir.path().join("output")
    }

    pub fn add_file(&self, rel_path: &str, content: &str) -> PathBuf {
        let full_path = self.input().join(rel_path);
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent dirs");
        }
        fs::write(&full_path, content).expect("Failed to write file");
        full_path
    }

    pub fn read_output(&self, rel_path: &str) -> String {
        fs::read_to_string(self.output().join(rel_path)).expect("Failed to read output file")
    }

    /// Relative paths of every file under `output/`, `/`-separated.
    pub fn output_files(&self) -> BTreeSet<String> {
        let mut set_files = BTreeSet::new();
        let root = self.output();
        if !root.exists() {
            return set_files;
        }
        let mut l_pending = vec![root.clone()];
        while let Some(path_dir) = l_pending.pop() {
            for entry in fs::read_dir(&path_dir).expect("Failed to read dir") {
                let path_entry = entry.expect("Failed to read entry").path();
                if path_entry.is_dir() {
                    l_pending.push(path_entry);
                } else {
                    let rel = path_entry.strip_prefix(&root).expect("under output");
                    let parts: Vec<String> = rel
                        .components()
                        .map(|c| c.as_os_str().to_string_lossy().into_owned())
                        .collect();
                    set_files.insert(parts.join("/"));
                }
            }
        }
        set_files
    }

    /// `gather-files input output <args...>`, ready for assertions.
    pub fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::cargo_bin("gather-files").expect("binary built");
        cmd.arg(self.input())
            .arg(self.output())
            .args(args)
            .current_dir(self.root())
            .env_remove("RUST_LOG");
        cmd
    }
}

pub fn set_of(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}
