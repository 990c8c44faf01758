//! End-to-end runs through the orchestrator
//!
//! Real discovery, pool, symphonia decoding and PNG rendering over generated WAV
//! trees; each test logs to its own file.

mod helpers;

use helpers::*;
use specgen::audio::{Decoder, SymphoniaDecoder};
use specgen::error::DecodeError;
use specgen::pipeline::SpectrogramPipeline;
use specgen::render::{RenderSettings, SpectrogramRenderer};
use specgen::{FatalError, Orchestrator, Waveform};
use specgen_common::config::ProgressMode;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

#[test]
fn test_empty_root_reports_zero_items() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("tracks");
    std::fs::create_dir(&root).unwrap();
    let log_file = temp_dir.path().join("log/run.log");

    let config = test_config(&root, &log_file);
    let logger = test_logger(&config);
    let summary = Orchestrator::new(config, logger).unwrap().run().unwrap();

    assert_eq!(summary.total, 0);
    assert_eq!(summary.attempted(), 0);
    assert_eq!(summary.exit_code(true), 0);
    assert_eq!(count_log_lines(&log_file, "0 items to process"), 1);
    assert_eq!(count_log_lines(&log_file, "processing complete"), 1);
    assert_eq!(count_log_lines(&log_file, ":ERROR:"), 0);
}

#[test]
fn test_missing_root_is_fatal() {
    let temp_dir = TempDir::new().unwrap();
    let log_file = temp_dir.path().join("run.log");

    let config = test_config(&temp_dir.path().join("does-not-exist"), &log_file);
    let logger = test_logger(&config);
    let result = Orchestrator::new(config, logger).unwrap().run();

    assert!(matches!(result, Err(FatalError::Discovery(_))));
    assert_eq!(count_log_lines(&log_file, ":ERROR:"), 1);
    assert_eq!(count_log_lines(&log_file, "items to process"), 0);
}

#[test]
fn test_corrupt_file_is_skipped() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("tracks");
    let log_file = temp_dir.path().join("run.log");

    generate_test_library(&root, 3, &AudioConfig::default()).unwrap();
    write_corrupt_file(&root.join("artist_1/broken.wav")).unwrap();

    let config = test_config(&root, &log_file);
    let logger = test_logger(&config);
    let summary = Orchestrator::new(config, logger).unwrap().run().unwrap();

    assert_eq!(summary.total, 4);
    assert_eq!(summary.succeeded, 3);
    assert_eq!(summary.failed, vec![root.join("artist_1/broken.wav")]);
    assert_eq!(summary.exit_code(false), 0);
    assert_eq!(summary.exit_code(true), 2);

    let images = files_with_extension(&root, "png");
    assert_eq!(images.len(), 3);
    assert!(!images.contains(Path::new("artist_1/broken.png")));

    assert_eq!(count_log_lines(&log_file, "4 items to process"), 1);
    assert_eq!(count_log_lines(&log_file, "Failed to process"), 1);
    assert_eq!(
        count_log_lines(&log_file, "processing complete: 4 items, 3 succeeded, 1 failed"),
        1
    );
}

#[test]
fn test_worker_count_does_not_change_outputs() {
    let outputs = |workers: usize| {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("tracks");
        let log_file = temp_dir.path().join("run.log");
        generate_test_library(&root, 10, &AudioConfig::default()).unwrap();

        let mut config = test_config(&root, &log_file);
        config.workers.count = workers;
        let logger = test_logger(&config);
        let summary = Orchestrator::new(config, logger).unwrap().run().unwrap();
        assert_eq!(summary.succeeded, 10);

        files_with_extension(&root, "png")
    };

    let single = outputs(1);
    let many = outputs(25);
    assert_eq!(single.len(), 10);
    assert_eq!(single, many);
}

#[test]
fn test_rerun_overwrites_with_identical_pixels() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("tracks");
    let log_file = temp_dir.path().join("run.log");
    let files = generate_test_library(&root, 2, &AudioConfig::default()).unwrap();
    let image_path = files[0].with_extension("png");

    let run = || {
        let config = test_config(&root, &log_file);
        let logger = test_logger(&config);
        Orchestrator::new(config, logger).unwrap().run().unwrap();
        image::open(&image_path).unwrap().to_luma8()
    };

    let first = run();
    let second = run();
    assert_eq!(first.dimensions(), (128, 128));
    assert_eq!(first, second);

    // Log file is appended across runs
    assert_eq!(count_log_lines(&log_file, "2 items to process"), 2);
}

/// Decodes normally but panics on one input and fails on another
struct FlakyDecoder;

impl Decoder for FlakyDecoder {
    fn decode(&self, path: &Path) -> Result<Waveform, DecodeError> {
        let name = path.file_name().unwrap().to_string_lossy();
        if name.contains("003") {
            panic!("decoder crashed on {}", name);
        }
        if name.contains("005") {
            return Err(DecodeError::InvalidAudio {
                path: path.to_path_buf(),
                reason: "injected".to_string(),
            });
        }
        SymphoniaDecoder::new().decode(path)
    }
}

#[test]
fn test_completion_count_matches_discovery_despite_failures() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("tracks");
    let log_file = temp_dir.path().join("run.log");
    generate_test_library(&root, 8, &AudioConfig::default()).unwrap();

    let config = test_config(&root, &log_file);
    let logger = test_logger(&config);
    let renderer = SpectrogramRenderer::new(RenderSettings::default()).unwrap();
    let pipeline = SpectrogramPipeline::new(Arc::new(FlakyDecoder), Arc::new(renderer), "png");

    let summary = Orchestrator::with_pipeline(config, logger, pipeline).run().unwrap();

    assert_eq!(summary.total, 8);
    assert_eq!(summary.attempted(), 8);
    assert_eq!(summary.succeeded, 6);
    assert_eq!(summary.failed_count(), 2);
    assert_eq!(files_with_extension(&root, "png").len(), 6);
    assert_eq!(count_log_lines(&log_file, "Failed to process"), 2);
    assert_eq!(count_log_lines(&log_file, "Worker panicked"), 1);
}

#[test]
fn test_extensions_match_case_insensitively() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("tracks");
    let log_file = temp_dir.path().join("run.log");
    generate_test_wav(&root.join("UPPER.WAV"), &AudioConfig::default()).unwrap();
    generate_test_wav(&root.join("lower.wav"), &AudioConfig::default()).unwrap();
    std::fs::write(root.join("notes.txt"), b"ignored").unwrap();

    let mut config = test_config(&root, &log_file);
    config.extensions = vec![".WAV".to_string()];
    let logger = test_logger(&config);
    let summary = Orchestrator::new(config, logger).unwrap().run().unwrap();

    assert_eq!(summary.total, 2);
    assert_eq!(summary.succeeded, 2);
    assert!(root.join("UPPER.png").exists());
    assert!(root.join("lower.png").exists());
}

#[test]
fn test_inputs_sharing_an_image_path_render_once() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("tracks");
    let log_file = temp_dir.path().join("run.log");
    generate_test_wav(&root.join("song.WAV"), &AudioConfig::default()).unwrap();
    let low_tone = AudioConfig {
        frequency: 220.0,
        ..AudioConfig::default()
    };
    generate_test_wav(&root.join("song.wav"), &low_tone).unwrap();
    generate_test_wav(&root.join("other.wav"), &AudioConfig::default()).unwrap();

    let config = test_config(&root, &log_file);
    let logger = test_logger(&config);
    let summary = Orchestrator::new(config, logger).unwrap().run().unwrap();

    let images = files_with_extension(&root, "png");
    assert_eq!(images.len(), 2);
    assert!(images.contains(Path::new("song.png")));

    assert_eq!(summary.total, 3);
    assert_eq!(summary.succeeded, images.len());
    assert_eq!(summary.failed, vec![root.join("song.wav")]);
    assert_eq!(summary.exit_code(true), 2);

    assert_eq!(count_log_lines(&log_file, "already claimed by"), 1);
    assert_eq!(
        count_log_lines(&log_file, "processing complete: 3 items, 2 succeeded, 1 failed"),
        1
    );

    // No temporary encode files left beside the images
    assert_eq!(files_with_extension(&root, "tmp").len(), 0);
}

#[test]
fn test_bar_mode_run_releases_console_route() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("tracks");
    let log_file = temp_dir.path().join("run.log");
    generate_test_library(&root, 3, &AudioConfig::default()).unwrap();

    let mut config = test_config(&root, &log_file);
    config.progress = ProgressMode::Bar;
    config.logging.console = true;
    let logger = test_logger(&config);
    let orchestrator = Orchestrator::new(config, logger).unwrap();

    let summary = orchestrator.run().unwrap();

    assert_eq!(summary.succeeded, 3);
    assert!(!orchestrator.logger().console_routed());
    assert_eq!(count_log_lines(&log_file, "processing complete: 3 items"), 1);
}
