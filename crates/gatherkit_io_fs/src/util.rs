use std::collections::HashSet;
use std::ffi::{OsStr, OsString};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Component, Path, PathBuf};

use globset::{Glob, GlobMatcher};
use regex::Regex;

use crate::spec::{CollectTreeError, EnumCollectPatternMode, EnumCollectStructureMode};

const N_COPY_BUFFER_BYTES: usize = 64 * 1024;

////////////////////////////////////////////////////////////////////////////////
// #region PatternMatching

#[derive(Debug, Clone)]
pub(crate) enum TypeCollectPatternSeq {
    Literal(Vec<String>),
    Glob(Vec<GlobMatcher>),
    Regex(Vec<Regex>),
}

impl TypeCollectPatternSeq {
    fn is_match(&self, value: &str) -> bool {
        match self {
            Self::Literal(v) => v.iter().any(|p| value.contains(p.as_str())),
            Self::Glob(v) => v.iter().any(|p| p.is_match(value)),
            Self::Regex(v) => v.iter().any(|p| p.is_match(value)),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct SpecCollectPatterns {
    pub(crate) patterns_include_files: Option<TypeCollectPatternSeq>,
    pub(crate) patterns_exclude_files: Option<TypeCollectPatternSeq>,
}

impl SpecCollectPatterns {
    pub(crate) fn from_raw(
        patterns_include_files: Option<&[String]>,
        patterns_exclude_files: Option<&[String]>,
        rule_pattern: EnumCollectPatternMode,
    ) -> Result<Self, CollectTreeError> {
        Ok(Self {
            patterns_include_files: _compile(patterns_include_files, rule_pattern)?,
            patterns_exclude_files: _compile(patterns_exclude_files, rule_pattern)?,
        })
    }

    /// A file is kept when it matches some include pattern (if any are set)
    /// and no exclude pattern.
    pub(crate) fn should_exclude_file(&self, name_file: &str) -> bool {
        let b_included = self
            .patterns_include_files
            .as_ref()
            .is_none_or(|p| p.is_match(name_file));
        let b_excluded = self
            .patterns_exclude_files
            .as_ref()
            .is_some_and(|p| p.is_match(name_file));
        !b_included || b_excluded
    }
}

fn _compile(
    patterns: Option<&[String]>,
    rule_pattern: EnumCollectPatternMode,
) -> Result<Option<TypeCollectPatternSeq>, CollectTreeError> {
    let Some(patterns) = patterns else {
        return Ok(None);
    };
    if patterns.is_empty() {
        return Ok(None);
    }

    match rule_pattern {
        EnumCollectPatternMode::Literal => {
            Ok(Some(TypeCollectPatternSeq::Literal(patterns.to_vec())))
        }
        EnumCollectPatternMode::Glob => {
            let mut l_glob = Vec::with_capacity(patterns.len());
            for pattern in patterns {
                let matcher = Glob::new(pattern)
                    .map_err(|e| CollectTreeError::InvalidPattern(e.to_string()))?
                    .compile_matcher();
                l_glob.push(matcher);
            }
            Ok(Some(TypeCollectPatternSeq::Glob(l_glob)))
        }
        EnumCollectPatternMode::Regex => {
            let mut l_regex = Vec::with_capacity(patterns.len());
            for pattern in patterns {
                let regex = Regex::new(pattern)
                    .map_err(|e| CollectTreeError::InvalidPattern(e.to_string()))?;
                l_regex.push(regex);
            }
            Ok(Some(TypeCollectPatternSeq::Regex(l_regex)))
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region DepthGate

/// Outcome of the depth gate for one directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SpecDepthDecision {
    pub(crate) if_process: bool,
    pub(crate) if_descend: bool,
}

/// Number of path components between `path_root` and `path_dir`.
///
/// Returns `None` when `path_dir` is not located under `path_root`.
/// Works on components, so trailing separators and `.` segments do not count.
pub(crate) fn calculate_relative_depth(path_root: &Path, path_dir: &Path) -> Option<usize> {
    let path_rel = path_dir.strip_prefix(path_root).ok()?;
    let mut n_depth = 0;
    for part in path_rel.components() {
        match part {
            Component::Normal(_) => n_depth += 1,
            Component::CurDir => {}
            _ => return None,
        }
    }
    Some(n_depth)
}

/// Processing and descent share one boundary: `depth <= depth_limit`.
pub(crate) fn decide_depth_gate(depth_value: usize, depth_limit: Option<usize>) -> SpecDepthDecision {
    let b_within = depth_limit.is_none_or(|limit| depth_value <= limit);
    SpecDepthDecision {
        if_process: b_within,
        if_descend: b_within,
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region PathUtilities

fn _is_relative_to_base(path: &Path, base: &Path) -> bool {
    path.starts_with(base)
}

pub(crate) fn absolutize_path(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Resolve `path` component by component.
///
/// Every prefix that exists is canonicalized, so a `..` after it pops a real
/// directory; a `..` after a missing component pops that name lexically.
fn _normalize_path(path: &Path) -> PathBuf {
    let path_abs = absolutize_path(path);
    let mut path_resolved = PathBuf::new();
    for part in path_abs.components() {
        match part {
            Component::CurDir => {}
            Component::ParentDir => {
                path_resolved.pop();
            }
            Component::Prefix(_) | Component::RootDir => path_resolved.push(part.as_os_str()),
            Component::Normal(name) => {
                path_resolved.push(name);
                if let Ok(resolved) = fs::canonicalize(&path_resolved) {
                    path_resolved = resolved;
                }
            }
        }
    }
    path_resolved
}

pub(crate) fn is_overlap(src: &Path, dst: &Path) -> bool {
    let src_resolved = _normalize_path(src);
    let dst_resolved = _normalize_path(dst);
    _is_relative_to_base(&dst_resolved, &src_resolved)
        || _is_relative_to_base(&src_resolved, &dst_resolved)
}

/// `/`-joined rendering of a relative path, used as the report key.
pub(crate) fn format_relative_path(path_rel: &Path) -> String {
    path_rel
        .components()
        .filter_map(|part| match part {
            Component::Normal(v) => Some(v.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Candidate destination for a file before collision handling.
///
/// # Examples
/// ```ignore
/// use std::ffi::OsStr;
/// use std::path::Path;
///
/// let dst = Path::new("/out");
/// let rel = Path::new("sub/deeper");
/// let name = OsStr::new("a.txt");
///
/// let p = derive_destination_path(dst, rel, name, EnumCollectStructureMode::Preserve);
/// assert_eq!(p, Path::new("/out/sub/deeper/a.txt"));
///
/// let p = derive_destination_path(dst, rel, name, EnumCollectStructureMode::Flatten);
/// assert_eq!(p, Path::new("/out/a.txt"));
/// ```
pub(crate) fn derive_destination_path(
    path_dir_dst: &Path,
    path_dir_rel: &Path,
    name_file: &OsStr,
    rule_structure: EnumCollectStructureMode,
) -> PathBuf {
    match rule_structure {
        EnumCollectStructureMode::Preserve => path_dir_dst.join(path_dir_rel).join(name_file),
        EnumCollectStructureMode::Flatten => path_dir_dst.join(name_file),
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region CollisionResolver

/// `dir/stem.ext` -> `dir/stem_{n}.ext`.
///
/// The extension is whatever follows the last dot, excluding a leading dot,
/// so `archive.tar.gz` becomes `archive.tar_1.gz` and `.bashrc` becomes `.bashrc_1`.
pub(crate) fn derive_collision_candidate(path_candidate: &Path, n_counter: u64) -> PathBuf {
    let mut name_new: OsString = path_candidate.file_stem().map(OsString::from).unwrap_or_default();
    name_new.push(format!("_{n_counter}"));
    if let Some(ext) = path_candidate.extension() {
        name_new.push(".");
        name_new.push(ext);
    }
    match path_candidate.parent() {
        Some(parent) => parent.join(name_new),
        None => PathBuf::from(name_new),
    }
}

/// Destination names already handed out during the current run, plus the next
/// counter to try per candidate path. Dry-run relies on the claimed set since
/// nothing reaches the disk.
#[derive(Debug, Default)]
pub(crate) struct SpecCollisionState {
    set_claimed: HashSet<PathBuf>,
    map_next_counter: std::collections::HashMap<PathBuf, u64>,
}

impl SpecCollisionState {
    pub(crate) fn claim(&mut self, path_dst: PathBuf) {
        self.set_claimed.insert(path_dst);
    }

    fn is_taken(&self, path: &Path) -> io::Result<bool> {
        if self.set_claimed.contains(path) {
            return Ok(true);
        }
        match fs::symlink_metadata(path) {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// First free path among `candidate`, `stem_1.ext`, `stem_2.ext`, ...
    ///
    /// Returns the path and whether it differs from `path_candidate`.
    pub(crate) fn resolve(&mut self, path_candidate: &Path) -> io::Result<(PathBuf, bool)> {
        if !self.is_taken(path_candidate)? {
            return Ok((path_candidate.to_path_buf(), false));
        }
        let mut n_counter = self
            .map_next_counter
            .get(path_candidate)
            .copied()
            .unwrap_or(1);
        loop {
            let path_next = derive_collision_candidate(path_candidate, n_counter);
            if !self.is_taken(&path_next)? {
                self.map_next_counter
                    .insert(path_candidate.to_path_buf(), n_counter + 1);
                return Ok((path_next, true));
            }
            n_counter += 1;
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region FileCopy

#[derive(Debug)]
pub(crate) enum EnumCopyFailure {
    /// Destination appeared between resolution and creation.
    DestinationExists,
    Read(io::Error),
    Write(io::Error),
}

/// Copy bytes into a newly created `path_file_dst`, then carry over metadata.
///
/// The destination is opened with `create_new`, so an existing file is never
/// overwritten. Returns a warning when the permission bits could not be
/// applied; the copy itself still counts.
pub(crate) fn copy_file_with_metadata(
    path_file_src: &Path,
    path_file_dst: &Path,
) -> Result<Option<String>, EnumCopyFailure> {
    let mut file_src = fs::File::open(path_file_src).map_err(EnumCopyFailure::Read)?;
    let stat_src = file_src.metadata().map_err(EnumCopyFailure::Read)?;

    let mut file_dst = match fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path_file_dst)
    {
        Ok(v) => v,
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            return Err(EnumCopyFailure::DestinationExists);
        }
        Err(e) => return Err(EnumCopyFailure::Write(e)),
    };

    let mut buf = vec![0_u8; N_COPY_BUFFER_BYTES];
    loop {
        let n_read = match file_src.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(EnumCopyFailure::Read(e)),
        };
        file_dst
            .write_all(&buf[..n_read])
            .map_err(EnumCopyFailure::Write)?;
    }
    file_dst.flush().map_err(EnumCopyFailure::Write)?;
    drop(file_dst);

    apply_metadata(path_file_src, path_file_dst, &stat_src).map_err(EnumCopyFailure::Write)
}

fn apply_metadata(
    path_file_src: &Path,
    path_file_dst: &Path,
    stat_src: &fs::Metadata,
) -> Result<Option<String>, io::Error> {
    use filetime::{FileTime, set_file_times};

    #[cfg(target_os = "linux")]
    copy_xattrs_linux(path_file_src, path_file_dst);
    #[cfg(not(target_os = "linux"))]
    let _ = path_file_src;

    let file_time_access = FileTime::from_last_access_time(stat_src);
    let file_time_modify = FileTime::from_last_modification_time(stat_src);
    set_file_times(path_file_dst, file_time_access, file_time_modify)?;

    // Last: a read-only mode would block the steps above.
    Ok(apply_permissions_best_effort(
        path_file_dst,
        stat_src.permissions(),
        |p: &Path, perm| fs::set_permissions(p, perm),
    ))
}

/// Apply `permissions` through `fn_set_permissions`; a failure becomes a warning.
pub(crate) fn apply_permissions_best_effort<F>(
    path_file_dst: &Path,
    permissions: fs::Permissions,
    fn_set_permissions: F,
) -> Option<String>
where
    F: FnOnce(&Path, fs::Permissions) -> io::Result<()>,
{
    match fn_set_permissions(path_file_dst, permissions) {
        Ok(()) => None,
        Err(e) => {
            tracing::warn!(
                path = %path_file_dst.display(),
                error = %e,
                "permissions not preserved"
            );
            Some(format!(
                "Permissions not preserved: {} ({e})",
                path_file_dst.display()
            ))
        }
    }
}

#[cfg(target_os = "linux")]
fn copy_xattrs_linux(path_file_src: &Path, path_file_dst: &Path) {
    let iter_xattr_names = match xattr::list(path_file_src) {
        Ok(v) => v,
        Err(_) => return,
    };

    for name in iter_xattr_names {
        let Some(raw_value) = xattr::get(path_file_src, &name).ok().flatten() else {
            continue;
        };
        if let Err(e) = xattr::set(path_file_dst, &name, &raw_value) {
            tracing::debug!(
                path = %path_file_dst.display(),
                xattr = %name.to_string_lossy(),
                error = %e,
                "xattr not preserved"
            );
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
