use std::fs::File;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use zip::ZipArchive;

#[derive(Debug, thiserror::Error)]
pub enum FeedAccessError {
    #[error("path does not exist: {0}")]
    MissingPath(PathBuf),
    #[error("not a file or directory: {0}")]
    NotAFile(PathBuf),
    #[error("io error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid zip archive: {0}")]
    InvalidZip(#[source] zip::result::ZipError),
}

/// Abstracts over where feed bytes live: an extracted directory, a zip archive
/// on disk, or a zip archive already held in memory (downloaded feed bytes).
/// Validators never see this distinction — `GtfsFeed::load` is the only
/// consumer.
pub trait FeedSource: Send + Sync {
    /// Returns the bytes of `file_name` (e.g. `"stops.txt"`), or `None` if the
    /// file is absent from the feed.
    fn read_file(&self, file_name: &str) -> Result<Option<Vec<u8>>, FeedAccessError>;

    /// Lists the top-level file names present in the feed, for detecting
    /// unrecognized or misplaced files.
    fn list_files(&self) -> Result<Vec<String>, FeedAccessError>;

    fn display_path(&self) -> String;
}

pub struct DirectoryFeedSource {
    root: PathBuf,
}

impl DirectoryFeedSource {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, FeedAccessError> {
        let root = root.into();
        if !root.exists() {
            return Err(FeedAccessError::MissingPath(root));
        }
        if !root.is_dir() {
            return Err(FeedAccessError::NotAFile(root));
        }
        Ok(Self { root })
    }
}

impl FeedSource for DirectoryFeedSource {
    fn read_file(&self, file_name: &str) -> Result<Option<Vec<u8>>, FeedAccessError> {
        let path = self.root.join(file_name);
        if !path.exists() {
            return Ok(None);
        }
        let mut file = File::open(&path).map_err(|source| FeedAccessError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let mut buf = Vec::new();
        file.read_to_end(&mut buf)
            .map_err(|source| FeedAccessError::Io {
                path: path.display().to_string(),
                source,
            })?;
        Ok(Some(buf))
    }

    fn list_files(&self) -> Result<Vec<String>, FeedAccessError> {
        let mut names = Vec::new();
        let entries = std::fs::read_dir(&self.root).map_err(|source| FeedAccessError::Io {
            path: self.root.display().to_string(),
            source,
        })?;
        for entry in entries {
            let entry = entry.map_err(|source| FeedAccessError::Io {
                path: self.root.display().to_string(),
                source,
            })?;
            if entry.path().is_file() {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
        }
        Ok(names)
    }

    fn display_path(&self) -> String {
        self.root.display().to_string()
    }
}

/// `ZipArchive` requires `&mut` to read an entry, so concurrent validators
/// sharing one feed source serialize through this mutex. Reads happen once
/// per file during the loading prologue, not per-validator, so contention is
/// negligible in practice.
pub struct ZipFeedSource {
    archive: Mutex<ZipArchive<Cursor<Vec<u8>>>>,
    label: String,
}

impl ZipFeedSource {
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self, FeedAccessError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(FeedAccessError::MissingPath(path.to_path_buf()));
        }
        let mut file = File::open(path).map_err(|source| FeedAccessError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)
            .map_err(|source| FeedAccessError::Io {
                path: path.display().to_string(),
                source,
            })?;
        Self::open_bytes(bytes, path.display().to_string())
    }

    pub fn open_bytes(bytes: Vec<u8>, label: impl Into<String>) -> Result<Self, FeedAccessError> {
        let archive =
            ZipArchive::new(Cursor::new(bytes)).map_err(FeedAccessError::InvalidZip)?;
        Ok(Self {
            archive: Mutex::new(archive),
            label: label.into(),
        })
    }
}

impl FeedSource for ZipFeedSource {
    fn read_file(&self, file_name: &str) -> Result<Option<Vec<u8>>, FeedAccessError> {
        let mut archive = self.archive.lock().expect("zip archive lock poisoned");
        match archive.by_name(file_name) {
            Ok(mut entry) => {
                let mut buf = Vec::new();
                entry
                    .read_to_end(&mut buf)
                    .map_err(|source| FeedAccessError::Io {
                        path: file_name.to_string(),
                        source,
                    })?;
                Ok(Some(buf))
            }
            Err(zip::result::ZipError::FileNotFound) => Ok(None),
            Err(other) => Err(FeedAccessError::InvalidZip(other)),
        }
    }

    fn list_files(&self) -> Result<Vec<String>, FeedAccessError> {
        let archive = self.archive.lock().expect("zip archive lock poisoned");
        Ok(archive.file_names().map(|name| name.to_string()).collect())
    }

    fn display_path(&self) -> String {
        self.label.clone()
    }
}

pub fn open_feed_source(path: impl AsRef<Path>) -> Result<Box<dyn FeedSource>, FeedAccessError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(FeedAccessError::MissingPath(path.to_path_buf()));
    }
    if path.is_dir() {
        return Ok(Box::new(DirectoryFeedSource::open(path)?));
    }
    Ok(Box::new(ZipFeedSource::open_path(path)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn directory_source_reads_existing_file_and_misses_absent_one() {
        let dir = std::env::temp_dir().join(format!("gtfs_dir_src_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("agency.txt"), b"agency_name\nTest\n").unwrap();

        let source = DirectoryFeedSource::open(&dir).unwrap();
        assert!(source.read_file("agency.txt").unwrap().is_some());
        assert!(source.read_file("missing.txt").unwrap().is_none());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn zip_source_reads_entry_bytes() {
        let mut bytes = Vec::new();
        {
            let mut writer = zip::ZipWriter::new(Cursor::new(&mut bytes));
            writer
                .start_file::<_, ()>("agency.txt", zip::write::FileOptions::default())
                .unwrap();
            writer.write_all(b"agency_name\nTest\n").unwrap();
            writer.finish().unwrap();
        }

        let source = ZipFeedSource::open_bytes(bytes, "in-memory.zip").unwrap();
        let contents = source.read_file("agency.txt").unwrap().unwrap();
        assert_eq!(contents, b"agency_name\nTest\n");
        assert!(source.read_file("missing.txt").unwrap().is_none());
    }
}
