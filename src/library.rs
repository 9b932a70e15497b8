//! Media library
//!
//! Holds the pool of playable files found in the media folder. The pool is
//! built once at startup and only changes through an explicit [`MediaLibrary::rescan`].

use std::path::{Path, PathBuf};

use rand::seq::SliceRandom;
use tracing::{info, warn};

/// File extensions accepted by the library scan
pub const ALLOWED_EXTENSIONS: &[&str] = &["mp3", "wav", "flac"];

/// One playable file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    /// Absolute or media-folder-relative path handed to the streaming subsystem
    pub path: PathBuf,
    /// Display title (file stem)
    pub title: String,
}

impl Track {
    pub fn from_path(path: PathBuf) -> Self {
        let title = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        Self { path, title }
    }
}

/// The pool of playable tracks
///
/// A missing media folder is not an error: the library is simply empty and
/// the scheduler idles until a rescan finds something.
#[derive(Debug)]
pub struct MediaLibrary {
    root: PathBuf,
    tracks: Vec<Track>,
}

impl MediaLibrary {
    /// Scan `root` for playable files and build the library
    pub fn scan(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let tracks = Self::scan_dir(&root);
        info!("Found {} playable files in {}", tracks.len(), root.display());
        Self { root, tracks }
    }

    /// Re-scan the media folder, replacing the current pool
    ///
    /// Returns the number of tracks found.
    pub fn rescan(&mut self) -> usize {
        self.tracks = Self::scan_dir(&self.root);
        info!(
            "Rescanned {}: {} playable files",
            self.root.display(),
            self.tracks.len()
        );
        self.tracks.len()
    }

    fn scan_dir(root: &Path) -> Vec<Track> {
        let entries = match std::fs::read_dir(root) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Media folder {} missing: {}", root.display(), e);
                return Vec::new();
            }
        };

        let mut tracks: Vec<Track> = entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && has_allowed_extension(path))
            .map(Track::from_path)
            .collect();

        // Stable order so the pool is deterministic for a given folder state
        tracks.sort_by(|a, b| a.path.cmp(&b.path));
        tracks
    }

    /// Pick one track uniformly at random
    ///
    /// Immediate repeats are possible and expected.
    pub fn pick_random(&self) -> Option<Track> {
        self.tracks.choose(&mut rand::thread_rng()).cloned()
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }
}

fn has_allowed_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ALLOWED_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(dir: &Path, name: &str) {
        std::fs::write(dir.join(name), b"test").unwrap();
    }

    #[test]
    fn scan_filters_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "a.mp3");
        touch(dir.path(), "b.FLAC");
        touch(dir.path(), "c.wav");
        touch(dir.path(), "notes.txt");
        touch(dir.path(), "cover.jpg");

        let library = MediaLibrary::scan(dir.path());
        assert_eq!(library.len(), 3);

        let titles: Vec<&str> = library.tracks().iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["a", "b", "c"]);
    }

    #[test]
    fn missing_folder_is_empty_not_fatal() {
        let library = MediaLibrary::scan("/definitely/not/a/real/folder");
        assert!(library.is_empty());
        assert!(library.pick_random().is_none());
    }

    #[test]
    fn pick_random_returns_pool_member() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "x.mp3");
        touch(dir.path(), "y.mp3");

        let library = MediaLibrary::scan(dir.path());
        for _ in 0..20 {
            let track = library.pick_random().unwrap();
            assert!(["x", "y"].contains(&track.title.as_str()));
        }
    }

    #[test]
    fn rescan_picks_up_new_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut library = MediaLibrary::scan(dir.path());
        assert!(library.is_empty());

        touch(dir.path(), "late.mp3");
        assert_eq!(library.rescan(), 1);
        assert_eq!(library.pick_random().unwrap().title, "late");
    }
}
