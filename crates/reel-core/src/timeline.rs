//! Timeline merge: concatenates closed segments onto a single track.
//!
//! Each merged segment is placed at the current end of the track, so
//! offsets are contiguous with no gaps or overlaps and the exported file
//! plays back as one recording regardless of pause/resume breaks.

use crate::audio::{AudioClip, AudioSpec};
use crate::capture::SegmentArtifact;
use crate::error::MergeError;
use hound::{SampleFormat, WavReader};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Placement of one merged segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimelineEntry {
    /// Segment index
    pub segment: usize,
    /// Insertion offset in frames
    pub offset_frames: u64,
    /// Segment length in frames
    pub frames: u64,
}

impl TimelineEntry {
    /// First frame after this entry.
    pub fn end_frames(&self) -> u64 {
        self.offset_frames + self.frames
    }
}

#[derive(Debug, Clone, Default)]
struct Track {
    samples: Vec<f32>,
}

/// Ordered, gap-free composition of merged segments.
///
/// The backing track is created lazily by the first merge and reused for
/// every later segment. Clones share the track; appending to a shared track
/// copies it first.
#[derive(Debug, Clone)]
pub struct Timeline {
    spec: AudioSpec,
    track: Option<Arc<Track>>,
    entries: Vec<TimelineEntry>,
}

impl Timeline {
    pub fn new(spec: AudioSpec) -> Self {
        Self {
            spec,
            track: None,
            entries: Vec::new(),
        }
    }

    pub fn spec(&self) -> AudioSpec {
        self.spec
    }

    /// Whether any segment has been merged.
    pub fn has_track(&self) -> bool {
        self.track.is_some()
    }

    pub fn entries(&self) -> &[TimelineEntry] {
        &self.entries
    }

    /// Total length in frames.
    pub fn total_frames(&self) -> u64 {
        self.entries.last().map(TimelineEntry::end_frames).unwrap_or(0)
    }

    pub fn duration(&self) -> Duration {
        self.spec.frames_to_duration(self.total_frames())
    }

    /// Interleaved samples of the whole track.
    pub fn samples(&self) -> &[f32] {
        self.track.as_ref().map(|t| t.samples.as_slice()).unwrap_or(&[])
    }

    /// Append a clip at the current end of the track.
    pub fn append(&mut self, segment: usize, clip: AudioClip) -> Result<TimelineEntry, MergeError> {
        if clip.spec.channels == 0 {
            return Err(MergeError::NoAudioTrack { segment });
        }
        if clip.spec != self.spec {
            return Err(MergeError::FormatMismatch {
                segment,
                expected: self.spec.to_string(),
                found: clip.spec.to_string(),
            });
        }
        let channels = self.spec.channels as usize;
        if clip.samples.len() % channels != 0 {
            return Err(MergeError::InvalidRange {
                segment,
                reason: format!(
                    "{} samples is not a whole number of {}-channel frames",
                    clip.samples.len(),
                    channels
                ),
            });
        }
        if let Some(last) = self.entries.last() {
            if segment <= last.segment {
                return Err(MergeError::InvalidRange {
                    segment,
                    reason: format!("segment {} was already merged", last.segment),
                });
            }
        }

        let offset_frames = self.total_frames();
        let frames = clip.frames();
        offset_frames
            .checked_add(frames)
            .ok_or_else(|| MergeError::InvalidRange {
                segment,
                reason: "track length overflow".into(),
            })?;

        let track = self.track.get_or_insert_with(Default::default);
        Arc::make_mut(track).samples.extend_from_slice(&clip.samples);

        let entry = TimelineEntry {
            segment,
            offset_frames,
            frames,
        };
        self.entries.push(entry);
        Ok(entry)
    }
}

/// Read a closed segment's artifact and append it to the timeline.
pub fn merge_segment(
    timeline: &mut Timeline,
    segment: usize,
    artifact: SegmentArtifact,
) -> Result<TimelineEntry, MergeError> {
    let clip = match artifact {
        SegmentArtifact::Buffer(clip) => clip,
        SegmentArtifact::File(path) => read_wav_clip(&path, segment)?,
    };
    let entry = timeline.append(segment, clip)?;
    debug!(
        "Merged segment {} at frame {} ({} frames)",
        entry.segment, entry.offset_frames, entry.frames
    );
    Ok(entry)
}

/// Decode a WAV artifact into normalized `f32` samples.
pub fn read_wav_clip(path: &Path, segment: usize) -> Result<AudioClip, MergeError> {
    let unreadable = |e: hound::Error| MergeError::Unreadable {
        segment,
        reason: e.to_string(),
    };

    let mut reader = WavReader::open(path).map_err(unreadable)?;
    let wav_spec = reader.spec();
    if wav_spec.channels == 0 {
        return Err(MergeError::NoAudioTrack { segment });
    }

    let samples: Vec<f32> = match wav_spec.sample_format {
        SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<_, _>>()
            .map_err(unreadable)?,
        SampleFormat::Int => {
            let scale = int_scale(wav_spec.bits_per_sample);
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()
                .map_err(unreadable)?
        }
    };

    Ok(AudioClip::new(
        AudioSpec::new(wav_spec.sample_rate, wav_spec.channels),
        samples,
    ))
}

#[inline]
fn int_scale(bits: u16) -> f32 {
    match bits {
        8 => 128.0,
        16 => 32768.0,
        24 => 8388608.0,
        _ => 2147483648.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hound::{WavSpec, WavWriter};
    use proptest::prelude::*;

    fn clip(spec: AudioSpec, frames: usize, value: f32) -> AudioClip {
        AudioClip::new(spec, vec![value; frames * spec.channels as usize])
    }

    #[test]
    fn test_track_created_lazily() {
        let mut timeline = Timeline::new(AudioSpec::mono(8000));
        assert!(!timeline.has_track());
        assert!(timeline.samples().is_empty());

        timeline.append(0, clip(AudioSpec::mono(8000), 10, 0.5)).unwrap();
        assert!(timeline.has_track());
        assert_eq!(timeline.samples().len(), 10);
    }

    #[test]
    fn test_clone_shares_track() {
        let spec = AudioSpec::mono(8000);
        let mut timeline = Timeline::new(spec);
        timeline.append(0, clip(spec, 100, 0.5)).unwrap();

        let snapshot = timeline.clone();
        assert!(std::ptr::eq(
            snapshot.samples().as_ptr(),
            timeline.samples().as_ptr()
        ));

        timeline.append(1, clip(spec, 10, -0.5)).unwrap();
        assert_eq!(snapshot.total_frames(), 100);
        assert_eq!(snapshot.samples().len(), 100);
        assert_eq!(timeline.samples().len(), 110);
    }

    #[test]
    fn test_segments_concatenate() {
        let spec = AudioSpec::stereo(8000);
        let mut timeline = Timeline::new(spec);
        let a = timeline.append(0, clip(spec, 100, 0.1)).unwrap();
        let b = timeline.append(1, clip(spec, 50, 0.2)).unwrap();
        let c = timeline.append(2, clip(spec, 25, 0.3)).unwrap();

        assert_eq!(a.offset_frames, 0);
        assert_eq!(b.offset_frames, 100);
        assert_eq!(c.offset_frames, 150);
        assert_eq!(timeline.total_frames(), 175);
        assert_eq!(timeline.samples().len(), 350);
        assert_eq!(timeline.samples()[199], 0.1);
        assert_eq!(timeline.samples()[200], 0.2);
    }

    #[test]
    fn test_empty_segment_keeps_offsets() {
        let spec = AudioSpec::mono(8000);
        let mut timeline = Timeline::new(spec);
        timeline.append(0, clip(spec, 10, 0.0)).unwrap();
        let empty = timeline.append(1, clip(spec, 0, 0.0)).unwrap();
        let next = timeline.append(2, clip(spec, 5, 0.0)).unwrap();
        assert_eq!(empty.offset_frames, 10);
        assert_eq!(empty.frames, 0);
        assert_eq!(next.offset_frames, 10);
    }

    #[test]
    fn test_format_mismatch() {
        let mut timeline = Timeline::new(AudioSpec::mono(8000));
        let err = timeline
            .append(0, clip(AudioSpec::mono(16000), 10, 0.0))
            .unwrap_err();
        assert!(matches!(err, MergeError::FormatMismatch { segment: 0, .. }));
        assert!(!timeline.has_track());
    }

    #[test]
    fn test_no_audio_track() {
        let mut timeline = Timeline::new(AudioSpec::mono(8000));
        let err = timeline
            .append(0, AudioClip::new(AudioSpec::new(8000, 0), vec![]))
            .unwrap_err();
        assert_eq!(err, MergeError::NoAudioTrack { segment: 0 });
    }

    #[test]
    fn test_partial_frame_is_invalid_range() {
        let mut timeline = Timeline::new(AudioSpec::stereo(8000));
        let err = timeline
            .append(0, AudioClip::new(AudioSpec::stereo(8000), vec![0.0; 3]))
            .unwrap_err();
        assert!(matches!(err, MergeError::InvalidRange { .. }));
    }

    #[test]
    fn test_out_of_order_segment_rejected() {
        let spec = AudioSpec::mono(8000);
        let mut timeline = Timeline::new(spec);
        timeline.append(1, clip(spec, 1, 0.0)).unwrap();
        let err = timeline.append(1, clip(spec, 1, 0.0)).unwrap_err();
        assert!(matches!(err, MergeError::InvalidRange { segment: 1, .. }));
    }

    #[test]
    fn test_merge_wav_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("0.wav");
        let spec = WavSpec {
            channels: 1,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(&path, spec).unwrap();
        for _ in 0..80 {
            writer.write_sample(16384i16).unwrap();
        }
        writer.finalize().unwrap();

        let mut timeline = Timeline::new(AudioSpec::mono(8000));
        let entry = merge_segment(&mut timeline, 0, SegmentArtifact::File(path)).unwrap();
        assert_eq!(entry.frames, 80);
        assert_eq!(timeline.samples()[0], 0.5);
        assert_eq!(timeline.duration(), Duration::from_millis(10));
    }

    #[test]
    fn test_merge_float_wav_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("0.wav");
        let spec = WavSpec {
            channels: 2,
            sample_rate: 8000,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        };
        let mut writer = WavWriter::create(&path, spec).unwrap();
        for i in 0..20 {
            writer.write_sample(i as f32 / 100.0).unwrap();
        }
        writer.finalize().unwrap();

        let clip = read_wav_clip(&path, 0).unwrap();
        assert_eq!(clip.spec, AudioSpec::stereo(8000));
        assert_eq!(clip.frames(), 10);
        assert_eq!(clip.samples[19], 0.19);
    }

    #[test]
    fn test_missing_artifact_is_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let mut timeline = Timeline::new(AudioSpec::mono(8000));
        let err = merge_segment(
            &mut timeline,
            4,
            SegmentArtifact::File(dir.path().join("missing.wav")),
        )
        .unwrap_err();
        assert!(matches!(err, MergeError::Unreadable { segment: 4, .. }));
    }

    #[test]
    fn test_garbage_artifact_is_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("0.wav");
        std::fs::write(&path, b"definitely not a wav file").unwrap();
        let err = read_wav_clip(&path, 0).unwrap_err();
        assert!(matches!(err, MergeError::Unreadable { .. }));
    }

    proptest! {
        #[test]
        fn prop_offsets_contiguous(lengths in proptest::collection::vec(0usize..500, 1..12)) {
            let spec = AudioSpec::stereo(8000);
            let mut timeline = Timeline::new(spec);
            for (index, frames) in lengths.iter().enumerate() {
                timeline.append(index, clip(spec, *frames, 0.0)).unwrap();
            }

            let entries = timeline.entries();
            prop_assert_eq!(entries[0].offset_frames, 0);
            for pair in entries.windows(2) {
                prop_assert_eq!(pair[1].offset_frames, pair[0].end_frames());
                prop_assert!(pair[1].segment > pair[0].segment);
            }
            let total: usize = lengths.iter().sum();
            prop_assert_eq!(timeline.total_frames(), total as u64);
            prop_assert_eq!(timeline.samples().len(), total * 2);
        }
    }
}
