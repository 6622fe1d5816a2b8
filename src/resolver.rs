//! Orchestrator that resolves a music identifier to a chart blob and runs
//! the note-counting scan over it.
//!
//! Resolution prefers a pre-extracted sidecar file and falls back to the
//! ifs archive, matching `load_iidx_1`'s preference order in the source
//! this crate was ported from.

use std::fs;
use std::path::PathBuf;

use crate::chart::{self, ChartId, MAX_CHART_COUNT};
use crate::error::{NoteCountError, Result};
use crate::ifs;

/// Resolves chart blobs for music identifiers under a configurable
/// filesystem root, then counts notes in them.
///
/// The root is a constructor parameter rather than the process's working
/// directory, so tests can point it at a scratch directory.
pub struct ChartResolver {
    root: PathBuf,
}

impl ChartResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        ChartResolver { root: root.into() }
    }

    fn sidecar_path(&self, music_id: &str) -> PathBuf {
        self.root
            .join("data/sound")
            .join(music_id)
            .join(format!("{music_id}.1"))
    }

    fn ifs_path(&self, music_id: &str) -> PathBuf {
        self.root
            .join("data/sound")
            .join(format!("{music_id}.ifs"))
    }

    /// Loads the raw chart-catalogue blob for `music_id`, trying the
    /// sidecar file first and falling back to the ifs archive.
    fn load_blob(&self, music_id: &str) -> Result<Vec<u8>> {
        let sidecar = self.sidecar_path(music_id);
        if sidecar.is_file() {
            log::debug!("resolving {music_id} via sidecar {}", sidecar.display());
            return Ok(fs::read(&sidecar)?);
        }

        log::debug!("no sidecar for {music_id}, falling back to ifs archive");
        let archive = self.ifs_path(music_id);
        let (manifest, manifest_end) = ifs::extract_manifest(&archive)?;

        let path = format!("imgfs/_{music_id}/_{music_id}_E1");
        let entry = manifest.find_path(&path).ok_or_else(|| {
            log::error!("manifest missing entry path {path} for {music_id}");
            NoteCountError::ManifestParseError
        })?;
        let text = entry.text.as_deref().unwrap_or("");
        let mut fields = text.split_whitespace();
        let entry_offset: u64 = fields
            .next()
            .and_then(|s| s.trim_end_matches('\0').parse().ok())
            .ok_or(NoteCountError::ManifestParseError)?;
        let entry_length: u64 = fields
            .next()
            .and_then(|s| s.trim_end_matches('\0').parse().ok())
            .ok_or(NoteCountError::ManifestParseError)?;

        let start = (manifest_end as u64)
            .checked_add(entry_offset)
            .ok_or(NoteCountError::InvalidFile("entry offset overflow"))?;
        let end = start
            .checked_add(entry_length)
            .ok_or(NoteCountError::InvalidFile("entry length overflow"))?;

        let full = fs::read(&archive)?;
        let slice = full
            .get(start as usize..end as usize)
            .ok_or(NoteCountError::InvalidFile("entry range exceeds archive size"))?;
        Ok(slice.to_vec())
    }

    /// Counts notes for a single chart slot.
    pub fn count_chart(&self, music_id: &str, chart: ChartId) -> Result<i32> {
        let blob = self.load_blob(music_id)?;
        Ok(chart::count_chart(&blob, usize::from(chart)))
    }

    /// Counts notes for all twelve chart slots.
    pub fn count_all_charts(&self, music_id: &str) -> Result<[i32; MAX_CHART_COUNT]> {
        let blob = self.load_blob(music_id)?;
        Ok(chart::count_all_charts(&blob))
    }
}
