//! Collect specification models and top-level error types.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

////////////////////////////////////////////////////////////////////////////////
// #region EnumsInit

/// Destination layout policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumCollectStructureMode {
    /// Mirror the relative source directory structure under the destination.
    #[default]
    Preserve,
    /// Place every accepted file directly in the destination root.
    Flatten,
}

/// Pattern matching mode for include/exclude lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumCollectPatternMode {
    /// Shell-like wildcards (`*`, `?`, character classes).
    #[default]
    Glob,
    /// Regular expression pattern.
    Regex,
    /// Substring match.
    Literal,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region StructsAndErrors

/// Input options for `collect_tree`.
#[derive(Debug, Clone, Default)]
pub struct SpecCollectOptions {
    /// Deepest directory (root = 0) whose files are collected. `None` is unbounded.
    pub depth_limit: Option<usize>,
    /// Destination layout.
    pub rule_structure: EnumCollectStructureMode,
    /// Include patterns applied to file basename.
    pub patterns_include_files: Option<Vec<String>>,
    /// Exclude patterns applied to file basename.
    pub patterns_exclude_files: Option<Vec<String>>,
    /// Pattern interpretation mode.
    pub rule_pattern: EnumCollectPatternMode,
    /// Resolve destinations and build the index without writing anything.
    pub if_dry_run: bool,
}

/// Fatal errors of one `collect_tree` run.
///
/// Any of these aborts the run immediately. Files copied before the failure
/// stay in the destination tree.
#[derive(Debug, Error)]
pub enum CollectTreeError {
    /// Invalid include/exclude pattern.
    #[error("Invalid pattern in include/exclude: {0}")]
    InvalidPattern(String),

    /// Source path is missing or not a directory.
    #[error("Source is not a directory: {}", .0.display())]
    SourceNotDirectory(PathBuf),

    /// Source and destination overlap (`src` contains `dst` or vice versa).
    #[error(
        "Source and destination directories overlap: {} <-> {}",
        source_dir.display(),
        destination_dir.display()
    )]
    SourceDestinationOverlap {
        /// Normalized source directory.
        source_dir: PathBuf,
        /// Normalized destination directory.
        destination_dir: PathBuf,
    },

    /// Destination directory initialization failed.
    #[error("Failed to initialize destination {}: {message}", path.display())]
    DestinationInitFailed {
        /// Destination path that failed initialization.
        path: PathBuf,
        /// Underlying error text.
        message: String,
    },

    /// A source directory could not be listed.
    #[error("Failed to read directory {}", path.display())]
    ReadDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A source file could not be read.
    #[error("Failed to read source file {}", path.display())]
    ReadSource {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A destination file or directory could not be created or written.
    #[error("Failed to write destination {}", path.display())]
    WriteDestination {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
