//! Directory listing capability used by the traversal.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Kind of one listed directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumEntryKind {
    /// Regular file, or a symlink that does not resolve to a directory.
    File,
    /// Real directory.
    Dir,
    /// Symlink resolving to a directory; never descended into.
    SymlinkDir,
    /// Socket, FIFO, device or anything else that is not copied.
    Other,
}

/// One child of a listed directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecListedEntry {
    pub path: PathBuf,
    pub name: OsString,
    pub kind: EnumEntryKind,
}

/// "List directory entries" capability.
///
/// `collect_tree` only learns about the tree through this trait; a directory
/// is listed only after the depth gate admitted it.
pub trait ListDirectory {
    fn list_entries(&mut self, path_dir: &Path) -> io::Result<Vec<SpecListedEntry>>;
}

/// `std::fs::read_dir` backed lister.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsDirectoryLister;

impl ListDirectory for FsDirectoryLister {
    fn list_entries(&mut self, path_dir: &Path) -> io::Result<Vec<SpecListedEntry>> {
        let mut l_entries = Vec::new();
        for entry_res in fs::read_dir(path_dir)? {
            let entry = entry_res?;
            let path_entry = entry.path();
            let cfg_file_type = entry.file_type()?;

            let kind = if cfg_file_type.is_dir() {
                EnumEntryKind::Dir
            } else if cfg_file_type.is_symlink() {
                // Broken links stay `File` so that reading them fails loudly.
                match fs::metadata(&path_entry) {
                    Ok(meta) if meta.is_dir() => EnumEntryKind::SymlinkDir,
                    Ok(meta) if !meta.is_file() => EnumEntryKind::Other,
                    _ => EnumEntryKind::File,
                }
            } else if cfg_file_type.is_file() {
                EnumEntryKind::File
            } else {
                EnumEntryKind::Other
            };

            l_entries.push(SpecListedEntry {
                path: path_entry,
                name: entry.file_name(),
                kind,
            });
        }
        Ok(l_entries)
    }
}

#[cfg(test)]
mod tests {
    use super::{EnumEntryKind, FsDirectoryLister, ListDirectory};

    #[test]
    fn fs_lister_classifies_entries() {
        let tmp = tempfile::tempdir().expect("tempdir");
        std::fs::write(tmp.path().join("a.txt"), "a").expect("write");
        std::fs::create_dir(tmp.path().join("sub")).expect("mkdir");

        let mut l_entries = FsDirectoryLister
            .list_entries(tmp.path())
            .expect("list");
        l_entries.sort_by(|a, b| a.name.cmp(&b.name));

        assert_eq!(l_entries.len(), 2);
        assert_eq!(l_entries[0].name, "a.txt");
        assert_eq!(l_entries[0].kind, EnumEntryKind::File);
        assert_eq!(l_entries[1].name, "sub");
        assert_eq!(l_entries[1].kind, EnumEntryKind::Dir);
    }

    #[cfg(unix)]
    #[test]
    fn fs_lister_classifies_symlinks() {
        use std::os::unix::fs::symlink;

        let tmp = tempfile::tempdir().expect("tempdir");
        std::fs::write(tmp.path().join("target.txt"), "t").expect("write");
        std::fs::create_dir(tmp.path().join("dir")).expect("mkdir");
        symlink(tmp.path().join("target.txt"), tmp.path().join("link_file")).expect("symlink");
        symlink(tmp.path().join("dir"), tmp.path().join("link_dir")).expect("symlink");
        symlink(tmp.path().join("missing"), tmp.path().join("link_broken")).expect("symlink");
        symlink("/dev/null", tmp.path().join("link_dev")).expect("symlink");

        let l_entries = FsDirectoryLister
            .list_entries(tmp.path())
            .expect("list");
        let kind_of = |name: &str| {
            l_entries
                .iter()
                .find(|e| e.name == name)
                .map(|e| e.kind)
                .expect("entry listed")
        };

        assert_eq!(kind_of("link_file"), EnumEntryKind::File);
        assert_eq!(kind_of("link_dir"), EnumEntryKind::SymlinkDir);
        assert_eq!(kind_of("link_broken"), EnumEntryKind::File);
        assert_eq!(kind_of("link_dev"), EnumEntryKind::Other);
    }
}
