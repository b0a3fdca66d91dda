//! WAV implementation of the session's exporter capability.

use crate::error::{ExportError, Result};
use crate::format::wav::{encode_wav_file, WavConfig};
use crate::options::BitDepth;
use reel_core::{ExportCompletion, ExportJob, Exporter};
use std::fs;
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

/// Writes the merged timeline to a WAV file on a background thread.
///
/// The file is encoded next to the output under a staging name and renamed
/// into place only if the export has not been cancelled.
///
/// The encoder setting `bit_depth` (16, 24 or 32) overrides the depth the
/// exporter was built with.
pub struct WavExporter {
    bit_depth: BitDepth,
    workers: Vec<JoinHandle<()>>,
}

impl WavExporter {
    pub fn new(bit_depth: BitDepth) -> Self {
        Self {
            bit_depth,
            workers: Vec::new(),
        }
    }

    pub fn bit_depth(&self) -> BitDepth {
        self.bit_depth
    }

    fn resolve_bit_depth(&self, job: &ExportJob) -> Result<BitDepth> {
        match job.settings.bit_depth() {
            Some(bits) => BitDepth::from_bits(bits),
            None => Ok(self.bit_depth),
        }
    }
}

impl Default for WavExporter {
    fn default() -> Self {
        Self::new(BitDepth::default())
    }
}

impl Exporter for WavExporter {
    fn export(&mut self, job: ExportJob, completion: ExportCompletion) {
        self.workers.retain(|h| !h.is_finished());

        let bit_depth = match self.resolve_bit_depth(&job) {
            Ok(depth) => depth,
            Err(e) => {
                warn!("Export rejected: {}", e);
                completion.complete(Err(e.into()));
                return;
            }
        };

        let handle = thread::Builder::new()
            .name("reel-export".into())
            .spawn(move || {
                let result = run_job(&job, bit_depth, &completion);
                match &result {
                    Ok(()) => info!(
                        "Exported {:?} of audio to {}",
                        job.timeline.duration(),
                        job.output_path.display()
                    ),
                    Err(e) => warn!("Export to {} failed: {}", job.output_path.display(), e),
                }
                completion.complete(result);
            })
            .expect("Failed to spawn export thread");
        self.workers.push(handle);
    }
}

impl Drop for WavExporter {
    fn drop(&mut self) {
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
    }
}

fn run_job(
    job: &ExportJob,
    bit_depth: BitDepth,
    completion: &ExportCompletion,
) -> reel_core::Result<()> {
    if completion.is_cancelled() {
        return Err(reel_core::Error::Export("export cancelled".into()));
    }
    let staged = staging_path(&job.output_path);
    let result = write_job(job, bit_depth, &staged)
        .map_err(reel_core::Error::from)
        .and_then(|()| {
            completion.commit(|| {
                fs::rename(&staged, &job.output_path).map_err(ExportError::from)?;
                Ok(())
            })
        });
    if result.is_err() && staged.exists() {
        if let Err(e) = fs::remove_file(&staged) {
            warn!("Failed to remove staged export {}: {}", staged.display(), e);
        }
    }
    result
}

fn staging_path(output: &Path) -> PathBuf {
    let mut name = output.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    output.with_file_name(name)
}

fn write_job(job: &ExportJob, bit_depth: BitDepth, path: &Path) -> Result<()> {
    let timeline = &job.timeline;
    if !timeline.has_track() {
        return Err(ExportError::InvalidData("empty timeline".into()));
    }
    ensure_parent_dir(path)?;

    let config = WavConfig::new(timeline.spec(), bit_depth);
    debug!(
        "Encoding {} frames ({} bit) to {}",
        timeline.total_frames(),
        bit_depth.bits(),
        path.display()
    );
    encode_wav_file(timeline.samples(), path, &config)
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => Ok(std::fs::create_dir_all(parent)?),
        _ => Ok(()),
    }
}
