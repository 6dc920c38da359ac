use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Where a processed file ended up.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SavedArtifact {
    pub file_name: String,
    /// Location on disk, `None` when the browser owns the download.
    pub location: Option<PathBuf>,
    pub size: usize,
}

/// Delivers a processed file to the user under a suggested name.
pub trait SaveSink {
    fn save(&mut self, suggested_name: &str, contents: &[u8]) -> io::Result<SavedArtifact>;
}

/// Writes downloads into a directory, replacing any earlier file of the same name.
#[derive(Clone, Debug)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        DirectorySink { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl SaveSink for DirectorySink {
    fn save(&mut self, suggested_name: &str, contents: &[u8]) -> io::Result<SavedArtifact> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(suggested_name);
        fs::write(&path, contents)?;
        log::info!("Saved {} ({} bytes)", path.display(), contents.len());

        Ok(SavedArtifact {
            file_name: suggested_name.to_string(),
            location: Some(path),
            size: contents.len(),
        })
    }
}
