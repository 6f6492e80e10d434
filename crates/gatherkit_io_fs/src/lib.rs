//! `gatherkit_io_fs`:
//! depth-bounded file gathering engine.
//!
//! Modules:
//! - `collect` : traversal and copy orchestration
//! - `spec`    : enums/options/errors
//! - `report`  : run-time report model and result index
//! - `walk`    : directory listing capability
//! - `util`    : depth gate, path/collision resolution, file copy

pub mod collect;
pub mod report;
pub mod spec;
pub mod walk;
mod util;

pub use collect::{collect_tree, collect_tree_with_lister};
pub use report::{ReportCollect, ReportCollectBuilder, TypeResultIndex};
pub use spec::{
    CollectTreeError, EnumCollectPatternMode, EnumCollectStructureMode, SpecCollectOptions,
};
pub use walk::{EnumEntryKind, FsDirectoryLister, ListDirectory, SpecListedEntry};
