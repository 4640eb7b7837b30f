//! Single-file rewrite of zip archives.
//!
//! One edit call extracts the whole archive into a scratch workspace,
//! hands exactly one member to a caller-supplied transform, and repackages
//! the full tree into a fresh archive. Every member other than the edited
//! one survives byte-identical.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::errors::{Error, Result};

/// Ephemeral extraction of one archive. Both the workspace and any
/// half-written output disappear on drop, success or failure.
struct ArchiveWorkspace {
    root: TempDir,
}

impl ArchiveWorkspace {
    /// Validates `archive` as a zip and extracts all of its members.
    fn extract(archive: &Path) -> Result<ArchiveWorkspace> {
        let archive_display = archive.display().to_string();
        let file = File::open(archive)
            .map_err(|e| Error::invalid_file(&archive_display, format!("cannot open: {}", e)))?;
        let mut zip = ZipArchive::new(file)
            .map_err(|e| Error::invalid_file(&archive_display, format!("not a valid zip archive: {}", e)))?;

        let root = TempDir::new()?;
        zip.extract(root.path())
            .map_err(|e| Error::invalid_file(&archive_display, format!("cannot extract: {}", e)))?;

        debug!(archive = %archive_display, members = zip.len(), "Archive extracted to workspace");
        Ok(ArchiveWorkspace { root })
    }

    fn member_path(&self, member: &str) -> PathBuf {
        self.root.path().join(member)
    }

    /// Repackages the whole workspace into a new deflate-compressed zip at
    /// a fresh path. The caller owns the returned file.
    fn repack(&self) -> Result<PathBuf> {
        let out = tempfile::Builder::new()
            .prefix("gtfs_feed_prep_")
            .suffix(".zip")
            .tempfile()?;

        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        let mut writer = ZipWriter::new(out.as_file());
        add_dir(&mut writer, self.root.path(), self.root.path(), options)?;
        writer.finish().map_err(|e| {
            Error::invalid_file(
                self.root.path().display().to_string(),
                format!("cannot repackage: {}", e),
            )
        })?;

        let (_, path) = out.keep().map_err(|e| Error::Io(e.error))?;
        Ok(path)
    }
}

fn add_dir(
    writer: &mut ZipWriter<&File>,
    root: &Path,
    dir: &Path,
    options: SimpleFileOptions,
) -> Result<()> {
    let mut empty = true;
    for entry in std::fs::read_dir(dir)? {
        empty = false;
        let entry = entry?;
        let path = entry.path();
        let name = path
            .strip_prefix(root)
            .map_err(|e| Error::invalid_file(path.display().to_string(), e.to_string()))?
            .to_string_lossy()
            .replace('\\', "/");

        if entry.file_type()?.is_dir() {
            add_dir(writer, root, &path, options)?;
        } else {
            writer
                .start_file(name.as_str(), options)
                .map_err(|e| Error::invalid_file(&name, format!("cannot add to zip: {}", e)))?;
            let mut file = File::open(&path)?;
            io::copy(&mut file, writer)?;
        }
    }

    // Preserve empty directories so the repacked tree matches the workspace.
    if empty && dir != root {
        let name = dir
            .strip_prefix(root)
            .map_err(|e| Error::invalid_file(dir.display().to_string(), e.to_string()))?
            .to_string_lossy()
            .replace('\\', "/");
        writer
            .add_directory(name.as_str(), options)
            .map_err(|e| Error::invalid_file(&name, format!("cannot add to zip: {}", e)))?;
    }

    Ok(())
}

/// Rewrites one member of `archive` through `transform` and returns the
/// path of the repackaged archive.
///
/// The transform receives the path of the extracted member and may read
/// and overwrite that one file in place. All other members are carried
/// into the output unchanged. A failing transform propagates and leaves no
/// partial archive behind; repackaging only starts after the transform
/// returns successfully.
pub fn edit<F>(archive: &Path, member: &str, transform: F) -> Result<PathBuf>
where
    F: FnOnce(&Path) -> Result<()>,
{
    let workspace = ArchiveWorkspace::extract(archive)?;

    let target = workspace.member_path(member);
    if !target.is_file() {
        return Err(Error::invalid_file(
            member,
            format!("not a member of '{}'", archive.display()),
        ));
    }

    transform(&target)?;

    let out = workspace.repack()?;
    debug!(archive = %archive.display(), member, output = %out.display(), "Archive rewritten");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Read, Write};

    /// Builds a zip on disk from `(name, contents)` pairs.
    fn write_fixture(members: &[(&str, &[u8])]) -> tempfile::NamedTempFile {
        let mut buf = Vec::new();
        {
            let mut zip = ZipWriter::new(Cursor::new(&mut buf));
            let options =
                SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
            for (name, contents) in members {
                zip.start_file(*name, options).unwrap();
                zip.write_all(contents).unwrap();
            }
            zip.finish().unwrap();
        }
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(&buf).unwrap();
        tmp
    }

    fn read_member(archive: &Path, member: &str) -> Vec<u8> {
        let file = File::open(archive).unwrap();
        let mut zip = ZipArchive::new(file).unwrap();
        let mut entry = zip.by_name(member).unwrap();
        let mut contents = Vec::new();
        entry.read_to_end(&mut contents).unwrap();
        contents
    }

    #[test]
    fn test_edit_rewrites_only_the_named_member() {
        let fixture = write_fixture(&[("x.txt", b"untouched"), ("y.txt", b"before")]);

        let out = edit(fixture.path(), "y.txt", |path| {
            std::fs::write(path, b"after")?;
            Ok(())
        })
        .unwrap();

        assert_eq!(read_member(&out, "y.txt"), b"after");
        assert_eq!(read_member(&out, "x.txt"), b"untouched");
        std::fs::remove_file(out).unwrap();
    }

    #[test]
    fn test_noop_edit_preserves_extracted_contents() {
        let fixture = write_fixture(&[("a.txt", b"alpha"), ("b.txt", b"beta")]);

        let out = edit(fixture.path(), "a.txt", |_| Ok(())).unwrap();
        let again = edit(&out, "a.txt", |_| Ok(())).unwrap();

        assert_eq!(read_member(&again, "a.txt"), b"alpha");
        assert_eq!(read_member(&again, "b.txt"), b"beta");
        std::fs::remove_file(out).unwrap();
        std::fs::remove_file(again).unwrap();
    }

    #[test]
    fn test_missing_member_fails() {
        let fixture = write_fixture(&[("x.txt", b"data")]);
        let err = edit(fixture.path(), "nope.txt", |_| Ok(())).unwrap_err();
        assert!(err.to_string().contains("nope.txt"));
    }

    #[test]
    fn test_not_a_zip_fails() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"this is not a zip archive").unwrap();
        let err = edit(tmp.path(), "x.txt", |_| Ok(())).unwrap_err();
        assert!(matches!(err, Error::InvalidFile { .. }));
    }

    #[test]
    fn test_failing_transform_propagates_and_writes_nothing() {
        let fixture = write_fixture(&[("x.txt", b"data")]);
        let result = edit(fixture.path(), "x.txt", |_| {
            Err(Error::invalid_file("x.txt", "boom"))
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_member_in_subdirectory() {
        let fixture = write_fixture(&[("nested/inner.txt", b"deep"), ("top.txt", b"flat")]);

        let out = edit(fixture.path(), "nested/inner.txt", |path| {
            std::fs::write(path, b"deeper")?;
            Ok(())
        })
        .unwrap();

        assert_eq!(read_member(&out, "nested/inner.txt"), b"deeper");
        assert_eq!(read_member(&out, "top.txt"), b"flat");
        std::fs::remove_file(out).unwrap();
    }
}
