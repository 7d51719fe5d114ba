// src/track.rs

use std::path::{Path, PathBuf};

/// Immutable descriptor handed to the player by whatever resolved the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub name: String,
    pub id: String,
    pub path: PathBuf,
}

impl Track {
    pub fn new(name: impl Into<String>, id: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
            path: path.into(),
        }
    }

    /// Descriptor for a local file: the stem names it, the full path is its id.
    pub fn from_path(path: &Path) -> Self {
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self::new(name, path.display().to_string(), path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_path_uses_the_file_stem() {
        let t = Track::from_path(Path::new("/music/night drive.flac"));
        assert_eq!(t.name, "night drive");
        assert_eq!(t.id, "/music/night drive.flac");
        assert_eq!(t.path, PathBuf::from("/music/night drive.flac"));
    }
}
