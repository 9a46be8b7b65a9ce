use std::fs;
use std::path::{Path, PathBuf};

use rand::seq::SliceRandom;
use tracing::warn;

const EXTENSIONS: [&str; 2] = ["mp3", "wav"];

/// Random sound candidates, re-read from disk on every request.
#[derive(Clone, Debug)]
pub struct SoundLibrary {
    dir: PathBuf,
}

fn is_playable(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| EXTENSIONS.iter().any(|x| e.eq_ignore_ascii_case(x)))
}

impl SoundLibrary {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn list(&self) -> Vec<PathBuf> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(why) => {
                warn!(
                    "Random sounds directory is not readable: {} ({why})",
                    self.dir.display()
                );
                return Vec::new();
            }
        };

        let mut files: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .map(|e| e.path())
            .filter(|p| p.is_file() && is_playable(p))
            .collect();

        files.sort();

        if files.is_empty() {
            warn!("No random sound files found in: {}", self.dir.display());
        }

        files
    }

    pub fn pick_random(&self) -> Option<PathBuf> {
        self.list().choose(&mut rand::thread_rng()).cloned()
    }
}
