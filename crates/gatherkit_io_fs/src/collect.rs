//! Filesystem tree traversal and collect orchestration.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::report::{ReportCollect, ReportCollectBuilder};
use crate::spec::{CollectTreeError, EnumCollectStructureMode, SpecCollectOptions};
use crate::util::{
    EnumCopyFailure, SpecCollectPatterns, SpecCollisionState, absolutize_path,
    calculate_relative_depth, copy_file_with_metadata, decide_depth_gate,
    derive_destination_path, format_relative_path, is_overlap,
};
use crate::walk::{EnumEntryKind, FsDirectoryLister, ListDirectory, SpecListedEntry};

#[derive(Debug, Clone)]
struct SpecDirectoryVisit {
    path_dir_abs: PathBuf,
    path_dir_rel: PathBuf,
    depth: usize,
}

#[derive(Debug, Clone)]
struct SpecFileEntry {
    name_file: OsString,
    path_file_src: PathBuf,
    path_dir_rel: PathBuf,
}

#[derive(Debug)]
struct SpecCollectContext {
    path_dir_src: PathBuf,
    path_dir_dst: PathBuf,
    spec_collect_options: SpecCollectOptions,
    spec_collect_pats: SpecCollectPatterns,
    state_collision: SpecCollisionState,
    builder_collect_report: ReportCollectBuilder,
}

/// Gather files below `dir_source` into `dir_destination`.
///
/// Behavior is controlled by [`SpecCollectOptions`]:
/// - directories deeper than `depth_limit` (root = 0) are neither processed
///   nor listed,
/// - `Preserve` mirrors relative directories, `Flatten` drops them,
/// - a destination that already exists gets a `_1`, `_2`, ... suffix before
///   its extension,
/// - include/exclude patterns filter files by base name,
/// - `if_dry_run` plans everything without writing.
///
/// Within one directory, files are handled before subdirectories and both in
/// byte-wise name order, so collision numbering is reproducible.
///
/// The first read or write failure aborts the run with [`CollectTreeError`];
/// files copied until then remain in place.
pub fn collect_tree<P, Q>(
    dir_source: P,
    dir_destination: Q,
    spec_collect_options: SpecCollectOptions,
) -> Result<ReportCollect, CollectTreeError>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    collect_tree_with_lister(
        dir_source,
        dir_destination,
        spec_collect_options,
        &mut FsDirectoryLister,
    )
}

/// [`collect_tree`] over a caller-supplied directory listing capability.
pub fn collect_tree_with_lister<P, Q, L>(
    dir_source: P,
    dir_destination: Q,
    spec_collect_options: SpecCollectOptions,
    lister: &mut L,
) -> Result<ReportCollect, CollectTreeError>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
    L: ListDirectory + ?Sized,
{
    let path_dir_src_raw = dir_source.as_ref();
    let path_dir_dst_raw = dir_destination.as_ref();

    if !path_dir_src_raw.is_dir() {
        return Err(CollectTreeError::SourceNotDirectory(
            path_dir_src_raw.to_path_buf(),
        ));
    }
    let path_dir_src =
        fs::canonicalize(path_dir_src_raw).map_err(|source| CollectTreeError::ReadDirectory {
            path: path_dir_src_raw.to_path_buf(),
            source,
        })?;

    if is_overlap(&path_dir_src, path_dir_dst_raw) {
        return Err(CollectTreeError::SourceDestinationOverlap {
            source_dir: path_dir_src,
            destination_dir: path_dir_dst_raw.to_path_buf(),
        });
    }
    init_destination_root(path_dir_dst_raw, spec_collect_options.if_dry_run)?;

    let spec_collect_pats = SpecCollectPatterns::from_raw(
        spec_collect_options.patterns_include_files.as_deref(),
        spec_collect_options.patterns_exclude_files.as_deref(),
        spec_collect_options.rule_pattern,
    )?;

    info!(
        source = %path_dir_src.display(),
        destination = %path_dir_dst_raw.display(),
        depth_limit = ?spec_collect_options.depth_limit,
        structure = ?spec_collect_options.rule_structure,
        dry_run = spec_collect_options.if_dry_run,
        "collect started"
    );

    let mut spec_collect_ctx = SpecCollectContext {
        path_dir_src: path_dir_src.clone(),
        path_dir_dst: absolutize_path(path_dir_dst_raw),
        spec_collect_options,
        spec_collect_pats,
        state_collision: SpecCollisionState::default(),
        builder_collect_report: ReportCollectBuilder::default(),
    };

    let visit_root = SpecDirectoryVisit {
        path_dir_abs: path_dir_src,
        path_dir_rel: PathBuf::new(),
        depth: 0,
    };
    walk_directory(visit_root, &mut spec_collect_ctx, lister)?;

    let report = spec_collect_ctx.builder_collect_report.build();
    info!(
        copied = report.cnt_copied,
        renamed = report.cnt_renamed,
        names = report.files.len(),
        warnings = report.warning_count(),
        "collect finished"
    );
    Ok(report)
}

fn init_destination_root(path_dir_dst: &Path, if_dry_run: bool) -> Result<(), CollectTreeError> {
    let map_err_init = |message: String| CollectTreeError::DestinationInitFailed {
        path: path_dir_dst.to_path_buf(),
        message,
    };

    if if_dry_run {
        if path_dir_dst.exists() && !path_dir_dst.is_dir() {
            return Err(map_err_init(
                "Destination exists and is not a directory.".to_string(),
            ));
        }
    } else {
        fs::create_dir_all(path_dir_dst).map_err(|e| map_err_init(e.to_string()))?;
    }

    match fs::symlink_metadata(path_dir_dst) {
        Ok(meta_dir_dst) if meta_dir_dst.file_type().is_symlink() => Err(map_err_init(
            "Destination root path must not be a symbolic link.".to_string(),
        )),
        Ok(_) => Ok(()),
        Err(_) if if_dry_run => Ok(()),
        Err(e) => Err(map_err_init(e.to_string())),
    }
}

fn walk_directory<L>(
    visit: SpecDirectoryVisit,
    spec_collect_ctx: &mut SpecCollectContext,
    lister: &mut L,
) -> Result<(), CollectTreeError>
where
    L: ListDirectory + ?Sized,
{
    let depth_limit = spec_collect_ctx.spec_collect_options.depth_limit;
    if !decide_depth_gate(visit.depth, depth_limit).if_process {
        return Ok(());
    }

    debug!(path = %visit.path_dir_abs.display(), depth = visit.depth, "visit directory");
    spec_collect_ctx.builder_collect_report.add_dir_visited();

    let mut l_entries = lister
        .list_entries(&visit.path_dir_abs)
        .map_err(|source| CollectTreeError::ReadDirectory {
            path: visit.path_dir_abs.clone(),
            source,
        })?;
    l_entries.sort_by(|a, b| a.name.cmp(&b.name));

    let mut l_dirs: Vec<SpecListedEntry> = Vec::new();
    for entry in l_entries {
        match entry.kind {
            EnumEntryKind::File => {
                let spec_file_entry = SpecFileEntry {
                    name_file: entry.name,
                    path_file_src: entry.path,
                    path_dir_rel: visit.path_dir_rel.clone(),
                };
                handle_file_entry(spec_file_entry, spec_collect_ctx)?;
            }
            EnumEntryKind::Dir => l_dirs.push(entry),
            EnumEntryKind::SymlinkDir => {
                let depth_child = visit.depth + 1;
                if !decide_depth_gate(depth_child, depth_limit).if_descend {
                    debug!(path = %entry.path.display(), depth = depth_child, "directory pruned");
                    spec_collect_ctx.builder_collect_report.add_dir_pruned();
                    continue;
                }
                warn!(path = %entry.path.display(), "symlinked directory not followed");
                spec_collect_ctx
                    .builder_collect_report
                    .add_warning(format!("Symlinked directory skipped: {}", entry.path.display()));
            }
            EnumEntryKind::Other => {
                warn!(path = %entry.path.display(), "special file skipped");
                spec_collect_ctx
                    .builder_collect_report
                    .add_warning(format!("Special file skipped: {}", entry.path.display()));
            }
        }
    }

    for entry in l_dirs {
        let Some(depth_child) =
            calculate_relative_depth(&spec_collect_ctx.path_dir_src, &entry.path)
        else {
            spec_collect_ctx.builder_collect_report.add_warning(format!(
                "Directory outside source root skipped: {}",
                entry.path.display()
            ));
            continue;
        };

        if !decide_depth_gate(depth_child, depth_limit).if_descend {
            debug!(path = %entry.path.display(), depth = depth_child, "directory pruned");
            spec_collect_ctx.builder_collect_report.add_dir_pruned();
            continue;
        }

        let visit_child = SpecDirectoryVisit {
            path_dir_rel: visit.path_dir_rel.join(&entry.name),
            path_dir_abs: entry.path,
            depth: depth_child,
        };
        walk_directory(visit_child, spec_collect_ctx, lister)?;
    }

    Ok(())
}

fn handle_file_entry(
    spec_file_entry: SpecFileEntry,
    spec_collect_ctx: &mut SpecCollectContext,
) -> Result<(), CollectTreeError> {
    spec_collect_ctx.builder_collect_report.add_scanned();

    let name_file_txt = spec_file_entry.name_file.to_string_lossy().into_owned();
    if spec_collect_ctx
        .spec_collect_pats
        .should_exclude_file(&name_file_txt)
    {
        return Ok(());
    }
    spec_collect_ctx.builder_collect_report.add_matched();

    let rule_structure = spec_collect_ctx.spec_collect_options.rule_structure;
    let if_dry_run = spec_collect_ctx.spec_collect_options.if_dry_run;
    let path_file_dst_candidate = derive_destination_path(
        &spec_collect_ctx.path_dir_dst,
        &spec_file_entry.path_dir_rel,
        &spec_file_entry.name_file,
        rule_structure,
    );

    if rule_structure == EnumCollectStructureMode::Preserve
        && !if_dry_run
        && let Some(path_parent_dst) = path_file_dst_candidate.parent()
    {
        fs::create_dir_all(path_parent_dst).map_err(|source| {
            CollectTreeError::WriteDestination {
                path: path_parent_dst.to_path_buf(),
                source,
            }
        })?;
    }

    let (path_file_dst, b_renamed) = loop {
        let (path_file_dst, b_renamed) = spec_collect_ctx
            .state_collision
            .resolve(&path_file_dst_candidate)
            .map_err(|source| CollectTreeError::WriteDestination {
                path: path_file_dst_candidate.clone(),
                source,
            })?;

        if if_dry_run {
            break (path_file_dst, b_renamed);
        }

        match copy_file_with_metadata(&spec_file_entry.path_file_src, &path_file_dst) {
            Ok(opt_warning) => {
                if let Some(warning) = opt_warning {
                    spec_collect_ctx.builder_collect_report.add_warning(warning);
                }
                break (path_file_dst, b_renamed);
            }
            Err(EnumCopyFailure::DestinationExists) => {
                spec_collect_ctx.state_collision.claim(path_file_dst);
            }
            Err(EnumCopyFailure::Read(source)) => {
                return Err(CollectTreeError::ReadSource {
                    path: spec_file_entry.path_file_src,
                    source,
                });
            }
            Err(EnumCopyFailure::Write(source)) => {
                return Err(CollectTreeError::WriteDestination {
                    path: path_file_dst,
                    source,
                });
            }
        }
    };

    if b_renamed {
        info!(
            source = %spec_file_entry.path_file_src.display(),
            destination = %path_file_dst.display(),
            "name collision, renamed"
        );
        spec_collect_ctx.builder_collect_report.add_renamed();
    } else {
        debug!(
            source = %spec_file_entry.path_file_src.display(),
            destination = %path_file_dst.display(),
            "copied"
        );
    }
    spec_collect_ctx.state_collision.claim(path_file_dst);
    spec_collect_ctx.builder_collect_report.add_copied();

    let path_file_rel = spec_file_entry
        .path_dir_rel
        .join(&spec_file_entry.name_file);
    spec_collect_ctx
        .builder_collect_report
        .add_found(&name_file_txt, format_relative_path(&path_file_rel));
    Ok(())
}
