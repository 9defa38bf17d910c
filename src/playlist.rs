use std::path::Path;

use rayon::prelude::*;
use serde::Serialize;

use crate::audio::decoding;
use crate::audio::errors::PlaylistError;
use crate::audio::playback::time::format_time;

pub const UNKNOWN_ARTIST: &str = "Unknown Artist";

#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistEntry {
    pub title: String,
    pub artist: String,
    pub path: String,
    /// 0.0 when the container does not declare a length or cannot be read.
    pub duration_seconds: f64,
}

impl PlaylistEntry {
    /// Builds an entry for an existing file, probing its length.
    pub fn from_path(path: &str) -> Result<Self, PlaylistError> {
        let file_path = Path::new(path);
        if !file_path.is_file() {
            return Err(PlaylistError::FileNotFound {
                path: path.to_string(),
            });
        }

        let title = file_path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        let duration_seconds = match decoding::probe_duration_secs(path) {
            Ok(secs) => secs,
            Err(e) => {
                log::debug!("Playlist: No duration for '{}': {}", path, e);
                0.0
            }
        };

        Ok(PlaylistEntry {
            title,
            artist: UNKNOWN_ARTIST.to_string(),
            path: path.to_string(),
            duration_seconds,
        })
    }

    pub fn duration_label(&self) -> String {
        format_time(self.duration_seconds)
    }
}

/// In-memory track list. Order is insertion order.
#[derive(Debug, Clone, Default)]
pub struct Playlist {
    entries: Vec<PlaylistEntry>,
}

impl Playlist {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&mut self, path: &str) -> Result<&PlaylistEntry, PlaylistError> {
        let entry = PlaylistEntry::from_path(path)
            .inspect_err(|e| log::warn!("Playlist: {}", e))?;
        log::info!(
            "Playlist: Added '{}' ({})",
            entry.title,
            entry.duration_label()
        );
        self.entries.push(entry);
        let index = self.entries.len() - 1;
        Ok(&self.entries[index])
    }

    /// Probes `paths` in parallel and appends the readable ones in the order
    /// given. Returns the errors for the paths that were skipped.
    pub fn add_files<P: AsRef<str> + Sync>(&mut self, paths: &[P]) -> Vec<PlaylistError> {
        let results: Vec<Result<PlaylistEntry, PlaylistError>> = paths
            .par_iter()
            .map(|path| PlaylistEntry::from_path(path.as_ref()))
            .collect();

        let mut errors = Vec::new();
        for result in results {
            match result {
                Ok(entry) => self.entries.push(entry),
                Err(e) => {
                    log::warn!("Playlist: {}", e);
                    errors.push(e);
                }
            }
        }
        log::info!(
            "Playlist: Batch added {} of {} file(s)",
            paths.len() - errors.len(),
            paths.len()
        );
        errors
    }

    pub fn entry(&self, index: usize) -> Option<&PlaylistEntry> {
        self.entries.get(index)
    }

    pub fn entries(&self) -> &[PlaylistEntry] {
        &self.entries
    }

    pub fn remove(&mut self, index: usize) -> Option<PlaylistEntry> {
        (index < self.entries.len()).then(|| self.entries.remove(index))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::decoding::tests::write_constant_wav;

    #[test]
    fn entry_takes_title_from_stem_and_probes_duration() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_constant_wav(dir.path(), "Night Drive.wav", 8_000, 2, 8_000 * 75, 0.1);

        let mut playlist = Playlist::new();
        let entry = playlist.add_file(path.to_str().unwrap()).unwrap();
        assert_eq!(entry.title, "Night Drive");
        assert_eq!(entry.artist, UNKNOWN_ARTIST);
        assert!((entry.duration_seconds - 75.0).abs() < 1e-9);
        assert_eq!(entry.duration_label(), "01:15");
    }

    #[test]
    fn unreadable_file_gets_zero_duration() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cover.jpg");
        std::fs::write(&path, b"not audio").unwrap();

        let mut playlist = Playlist::new();
        let entry = playlist.add_file(path.to_str().unwrap()).unwrap();
        assert_eq!(entry.duration_seconds, 0.0);
        assert_eq!(entry.duration_label(), "00:00");
    }

    #[test]
    fn missing_file_is_rejected() {
        let mut playlist = Playlist::new();
        let err = playlist.add_file("/nowhere/track.mp3").unwrap_err();
        assert!(matches!(err, PlaylistError::FileNotFound { .. }));
        assert!(playlist.is_empty());
    }

    #[test]
    fn batch_add_preserves_order_and_reports_failures() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_constant_wav(dir.path(), "a.wav", 8_000, 1, 800, 0.1);
        let b = write_constant_wav(dir.path(), "b.wav", 8_000, 1, 1_600, 0.1);
        let paths = vec![
            a.to_str().unwrap().to_string(),
            "/missing/x.wav".to_string(),
            b.to_str().unwrap().to_string(),
        ];

        let mut playlist = Playlist::new();
        let errors = playlist.add_files(&paths);
        assert_eq!(errors.len(), 1);
        let titles: Vec<&str> = playlist.entries().iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, ["a", "b"]);
        assert!((playlist.entry(1).unwrap().duration_seconds - 0.2).abs() < 1e-9);
    }

    #[test]
    fn remove_out_of_range_is_none() {
        let mut playlist = Playlist::new();
        assert!(playlist.remove(0).is_none());
    }

    #[test]
    fn entry_serializes_in_camel_case() {
        let entry = PlaylistEntry {
            title: "t".into(),
            artist: UNKNOWN_ARTIST.into(),
            path: "/t.wav".into(),
            duration_seconds: 12.0,
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["durationSeconds"], 12.0);
    }
}
