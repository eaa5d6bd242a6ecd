//! SamplingPolicy and FrameSampler integration tests.

mod common;

use std::sync::Arc;

use common::{RecordingProgress, SyntheticSource};
use framelabel::{FrameSampler, LabelError, SamplingPolicy, ScratchDirectory, Stage};

fn scratch_in(root: &tempfile::TempDir) -> ScratchDirectory {
    ScratchDirectory::create(Some(root.path())).expect("Failed to create scratch directory")
}

// ── SamplingPolicy ─────────────────────────────────────────────────

#[test]
fn policy_defaults() {
    let policy = SamplingPolicy::default();
    assert_eq!(policy.skip_frames(), 60);
    assert_eq!(policy.max_frames(), 4);
    assert_eq!(policy.start_frame(), 0);
}

#[test]
fn policy_grid_respects_start_frame() {
    let policy = SamplingPolicy::new(5, 10).with_start_frame(3);
    let captured: Vec<u64> = (0..20).filter(|&index| policy.captures(index)).collect();
    assert_eq!(captured, vec![3, 8, 13, 18]);
}

#[test]
fn expected_captures_closed_form() {
    let policy = SamplingPolicy::new(60, 4);
    assert_eq!(policy.expected_captures(130), 3);
    assert_eq!(policy.expected_captures(1), 1);
    assert_eq!(policy.expected_captures(0), 0);
    assert_eq!(policy.expected_captures(10_000), 4);

    let offset = SamplingPolicy::new(10, 100).with_start_frame(25);
    assert_eq!(offset.expected_captures(25), 0);
    assert_eq!(offset.expected_captures(26), 1);
    assert_eq!(offset.expected_captures(36), 2);
}

#[test]
#[should_panic(expected = "skip_frames")]
fn zero_skip_frames_panics() {
    let _ = SamplingPolicy::new(0, 4);
}

#[test]
#[should_panic(expected = "max_frames")]
fn zero_max_frames_panics() {
    let _ = SamplingPolicy::new(60, 0);
}

// ── FrameSampler ───────────────────────────────────────────────────

#[test]
fn stream_of_130_frames_yields_three_captures() {
    let root = tempfile::tempdir().expect("Failed to create temp dir");
    let scratch = scratch_in(&root);
    let mut source = SyntheticSource::new(130);

    let samples = FrameSampler::new(SamplingPolicy::new(60, 4))
        .sample(&mut source, &scratch)
        .expect("Sampling failed");

    let indices: Vec<u64> = samples.iter().map(|sample| sample.index).collect();
    assert_eq!(indices, vec![0, 60, 120]);
    for sample in &samples {
        assert!(sample.path.exists(), "Missing {}", sample.path.display());
        assert!(sample.path.starts_with(scratch.path()));
    }
    assert_eq!(scratch.frame_files().unwrap().len(), 3);
}

#[test]
fn off_grid_frames_are_skipped_without_materialising() {
    let root = tempfile::tempdir().expect("Failed to create temp dir");
    let scratch = scratch_in(&root);
    let mut source = SyntheticSource::new(130);

    FrameSampler::new(SamplingPolicy::new(60, 4).with_start_frame(5))
        .sample(&mut source, &scratch)
        .expect("Sampling failed");

    assert_eq!(source.frames_read(), 130);
    assert_eq!(source.frames_materialised(), 3);
}

#[test]
fn captured_frames_are_decodable_jpegs() {
    let root = tempfile::tempdir().expect("Failed to create temp dir");
    let scratch = scratch_in(&root);
    let mut source = SyntheticSource::new(3);

    let samples = FrameSampler::new(SamplingPolicy::new(1, 1))
        .with_jpeg_quality(75)
        .sample(&mut source, &scratch)
        .expect("Sampling failed");

    let bytes = samples[0].read_bytes().expect("Failed to read frame");
    assert_eq!(&bytes[..2], &[0xFF, 0xD8], "Expected a JPEG SOI marker");

    let decoded = image::open(&samples[0].path).expect("Frame should decode");
    assert_eq!((decoded.width(), decoded.height()), (16, 8));
}

#[test]
fn stops_reading_once_max_frames_reached() {
    let root = tempfile::tempdir().expect("Failed to create temp dir");
    let scratch = scratch_in(&root);
    let mut source = SyntheticSource::new(1_000);

    let samples = FrameSampler::new(SamplingPolicy::new(10, 3))
        .sample(&mut source, &scratch)
        .expect("Sampling failed");

    assert_eq!(samples.len(), 3);
    assert_eq!(samples.last().map(|sample| sample.index), Some(20));
    assert_eq!(source.frames_read(), 21);
}

#[test]
fn start_frame_shifts_the_grid() {
    let root = tempfile::tempdir().expect("Failed to create temp dir");
    let scratch = scratch_in(&root);
    let mut source = SyntheticSource::new(100);

    let samples = FrameSampler::new(SamplingPolicy::new(30, 10).with_start_frame(15))
        .sample(&mut source, &scratch)
        .expect("Sampling failed");

    let indices: Vec<u64> = samples.iter().map(|sample| sample.index).collect();
    assert_eq!(indices, vec![15, 45, 75]);
}

#[test]
fn start_frame_beyond_stream_captures_nothing() {
    let root = tempfile::tempdir().expect("Failed to create temp dir");
    let scratch = scratch_in(&root);
    let mut source = SyntheticSource::new(50);

    let result = FrameSampler::new(SamplingPolicy::new(1, 4).with_start_frame(50))
        .sample(&mut source, &scratch);

    match result {
        Err(LabelError::NoFramesCaptured {
            start_frame,
            frames_read,
        }) => {
            assert_eq!(start_frame, 50);
            assert_eq!(frames_read, 50);
        }
        other => panic!("Expected NoFramesCaptured, got: {other:?}"),
    }
    assert!(scratch.frame_files().unwrap().is_empty());
}

#[test]
fn empty_stream_captures_nothing() {
    let root = tempfile::tempdir().expect("Failed to create temp dir");
    let scratch = scratch_in(&root);
    let mut source = SyntheticSource::new(0);

    let error = FrameSampler::new(SamplingPolicy::default())
        .sample(&mut source, &scratch)
        .unwrap_err();
    assert!(error.yields_empty_report());
    assert!(error.to_string().contains("No frames captured"));
}

#[test]
fn capture_count_matches_closed_form() {
    let root = tempfile::tempdir().expect("Failed to create temp dir");

    for length in [0_u64, 1, 2, 7, 30, 61] {
        for skip in [1_u64, 2, 5, 60] {
            for max in [1_u64, 3, 50] {
                for start in [0_u64, 1, 6, 61] {
                    let policy = SamplingPolicy::new(skip, max).with_start_frame(start);
                    let scratch = scratch_in(&root);
                    let mut source = SyntheticSource::new(length);

                    let captured = match FrameSampler::new(policy).sample(&mut source, &scratch) {
                        Ok(samples) => samples.len() as u64,
                        Err(LabelError::NoFramesCaptured { .. }) => 0,
                        Err(other) => panic!("Unexpected error: {other}"),
                    };

                    assert_eq!(
                        captured,
                        policy.expected_captures(length),
                        "length={length} skip={skip} max={max} start={start}",
                    );
                    scratch.remove().expect("Failed to remove scratch directory");
                }
            }
        }
    }
}

#[test]
fn sampling_reports_progress() {
    let root = tempfile::tempdir().expect("Failed to create temp dir");
    let scratch = scratch_in(&root);
    let recorder = Arc::new(RecordingProgress::default());
    let mut source = SyntheticSource::new(130);

    FrameSampler::new(SamplingPolicy::new(60, 4))
        .with_progress(recorder.clone())
        .sample(&mut source, &scratch)
        .expect("Sampling failed");

    let infos = recorder.infos.lock().unwrap();
    assert_eq!(infos.len(), 3);
    assert!(infos.iter().all(|info| info.stage == Stage::FrameSampling));
    assert_eq!(infos[2].current, 3);
    assert_eq!(infos[2].total, Some(4));
    assert_eq!(infos[2].current_frame, Some(120));
}
