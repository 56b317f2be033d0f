// ABOUTME: Packs a staging directory into a deflate compressed zip archive
// ABOUTME: Builds into a temp file next to the destination and renames it into place

use crate::error::{ExportError, IoContext, Result};
use std::fs::File;
use std::io::{self, Seek, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Entry name of `path` relative to `root`, `/` separated
pub fn entry_name(root: &Path, path: &Path) -> Result<String> {
    let relative = path.strip_prefix(root).map_err(|_| {
        ExportError::io(
            format!("archiving {}", path.display()),
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("path is outside of {}", root.display()),
            ),
        )
    })?;
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Ok(parts.join("/"))
}

/// Every regular file below `dir`, sorted so archives are reproducible
fn collect_files(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    let mut entries = std::fs::read_dir(dir)
        .io_context(|| format!("reading directory {}", dir.display()))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<io::Result<Vec<_>>>()
        .io_context(|| format!("reading directory {}", dir.display()))?;
    entries.sort();

    for path in entries {
        let file_type = std::fs::symlink_metadata(&path)
            .io_context(|| format!("inspecting {}", path.display()))?
            .file_type();
        if file_type.is_dir() {
            collect_files(&path, files)?;
        } else if file_type.is_file() {
            files.push(path);
        }
    }
    Ok(())
}

fn write_entries<W: Write + Seek>(zip: &mut ZipWriter<W>, root: &Path, files: &[PathBuf]) -> Result<()> {
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
    for path in files {
        let name = entry_name(root, path)?;
        zip.start_file(name.as_str(), options)
            .map_err(|e| ExportError::archive(format!("adding {}", name), e))?;
        let mut source = File::open(path).io_context(|| format!("opening {}", path.display()))?;
        io::copy(&mut source, zip).io_context(|| format!("compressing {}", path.display()))?;
    }
    Ok(())
}

/// Archive every regular file under `source_dir` into `destination`
///
/// The zip is written to a temporary file in the destination's directory
/// and only renamed over `destination` once finalized, so a failed run never
/// leaves a partial archive behind and an existing archive is replaced whole.
/// Returns the number of entries written.
pub fn create_archive(source_dir: &Path, destination: &Path) -> Result<usize> {
    let mut files = Vec::new();
    collect_files(source_dir, &mut files)?;

    let parent = match destination.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&parent)
        .io_context(|| format!("creating directory {}", parent.display()))?;

    let temp = NamedTempFile::new_in(&parent)
        .io_context(|| format!("creating temporary archive in {}", parent.display()))?;
    let mut zip = ZipWriter::new(temp);
    write_entries(&mut zip, source_dir, &files)?;
    let mut temp = zip
        .finish()
        .map_err(|e| ExportError::archive("finalizing archive", e))?;
    temp.as_file_mut()
        .sync_all()
        .io_context(|| "syncing archive")?;

    temp.persist(destination)
        .map_err(|e| ExportError::io(format!("moving archive to {}", destination.display()), e.error))?;

    tracing::debug!(
        "Archived {} file(s) from {} into {}",
        files.len(),
        source_dir.display(),
        destination.display()
    );
    Ok(files.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::tempdir;

    fn read_archive(path: &Path) -> Vec<(String, Vec<u8>)> {
        let mut archive = zip::ZipArchive::new(File::open(path).unwrap()).unwrap();
        let mut entries = Vec::new();
        for i in 0..archive.len() {
            let mut entry = archive.by_index(i).unwrap();
            let mut data = Vec::new();
            entry.read_to_end(&mut data).unwrap();
            entries.push((entry.name().to_string(), data));
        }
        entries
    }

    #[test]
    fn test_entry_names_are_relative() {
        let root = Path::new("/tmp/staging");
        assert_eq!(
            entry_name(root, &root.join("schema.sql")).unwrap(),
            "schema.sql"
        );
        assert_eq!(
            entry_name(root, &root.join("nested").join("t.dmp")).unwrap(),
            "nested/t.dmp"
        );
        assert!(entry_name(root, Path::new("/elsewhere/x")).is_err());
    }

    #[test]
    fn test_archive_reproduces_tree() {
        let staging = tempdir().unwrap();
        std::fs::write(staging.path().join("schema.sql"), "create table t (\n);\n").unwrap();
        std::fs::write(staging.path().join("t.dmp"), "1,'a'\n").unwrap();
        std::fs::create_dir(staging.path().join("nested")).unwrap();
        std::fs::write(staging.path().join("nested").join("deep.dmp"), [0u8, 1, 2]).unwrap();

        let out = tempdir().unwrap();
        let destination = out.path().join("export.zip");
        let count = create_archive(staging.path(), &destination).unwrap();
        assert_eq!(count, 3);

        let entries = read_archive(&destination);
        let names: Vec<&str> = entries.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["nested/deep.dmp", "schema.sql", "t.dmp"]);

        let prefix = staging.path().to_string_lossy().trim_start_matches('/').to_string();
        for (name, data) in &entries {
            assert!(!name.starts_with('/'));
            assert!(!name.contains(&prefix));
            let original = std::fs::read(staging.path().join(name)).unwrap();
            assert_eq!(&original, data);
        }
    }

    #[test]
    fn test_existing_archive_is_replaced() {
        let out = tempdir().unwrap();
        let destination = out.path().join("export.zip");

        let first = tempdir().unwrap();
        std::fs::write(first.path().join("old.dmp"), "1\n").unwrap();
        create_archive(first.path(), &destination).unwrap();

        let second = tempdir().unwrap();
        std::fs::write(second.path().join("new.dmp"), "2\n").unwrap();
        create_archive(second.path(), &destination).unwrap();

        let entries = read_archive(&destination);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].0, "new.dmp");
    }

    #[test]
    fn test_missing_source_leaves_no_file() {
        let out = tempdir().unwrap();
        let destination = out.path().join("export.zip");
        let result = create_archive(&out.path().join("missing"), &destination);

        assert!(result.is_err());
        assert!(!destination.exists());
        assert_eq!(std::fs::read_dir(out.path()).unwrap().count(), 0);
    }
}
