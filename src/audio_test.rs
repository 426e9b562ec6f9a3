use super::*;
use std::os::unix::fs::PermissionsExt;
use tempfile::TempDir;

/// Write an executable stub standing in for ffmpeg.
fn write_stub_encoder(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("ffmpeg-stub");
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Stub that records each invocation and creates its last argument.
fn counting_encoder(dir: &Path, counter: &Path) -> PathBuf {
    write_stub_encoder(
        dir,
        &format!(
            "echo run >> \"{}\"\nfor last; do :; done\necho data > \"$last\"",
            counter.display()
        ),
    )
}

#[test]
fn test_wav_asset_is_recognizable() {
    let asset = AudioAsset::resolve("/tmp/clip.wav").unwrap();
    assert_eq!(asset.extension(), "wav");
    assert!(asset.is_recognizable());
}

#[test]
fn test_extension_is_lowercased() {
    let asset = AudioAsset::resolve("/tmp/Clip.MP3").unwrap();
    assert_eq!(asset.extension(), "mp3");
    assert!(!asset.is_recognizable());
}

#[tokio::test]
async fn test_wav_fast_path_skips_encoder() {
    let temp = TempDir::new().unwrap();
    let audio = temp.path().join("clip.wav");
    std::fs::write(&audio, b"riff").unwrap();

    // An encoder that cannot exist: the fast path must never look for it.
    let normalizer = Normalizer::with_encoder("/nonexistent/encoder");
    let asset = AudioAsset::resolve(&audio).unwrap();
    let normalized = normalizer.normalize(&asset).await.unwrap();

    assert_eq!(normalized.path(), asset.path());
}

#[tokio::test]
async fn test_cached_conversion_reused_without_encoder() {
    let temp = TempDir::new().unwrap();
    let audio = temp.path().join("clip.mp3");
    std::fs::write(&audio, b"mp3").unwrap();
    std::fs::write(temp.path().join("clip.wav"), b"riff").unwrap();

    let normalizer = Normalizer::with_encoder("/nonexistent/encoder");
    let asset = AudioAsset::resolve(&audio).unwrap();
    let normalized = normalizer.normalize(&asset).await.unwrap();

    assert_eq!(normalized.path(), temp.path().join("clip.wav"));
    assert!(normalized.is_recognizable());
}

#[tokio::test]
async fn test_conversion_runs_encoder_at_most_once() {
    let temp = TempDir::new().unwrap();
    let counter = temp.path().join("counter");
    let encoder = counting_encoder(temp.path(), &counter);
    let audio = temp.path().join("clip.mp3");
    std::fs::write(&audio, b"mp3").unwrap();

    let normalizer = Normalizer::with_encoder(&encoder);
    let asset = AudioAsset::resolve(&audio).unwrap();

    let first = normalizer.normalize(&asset).await.unwrap();
    let second = normalizer.normalize(&asset).await.unwrap();

    assert_eq!(first.path(), second.path());
    let runs = std::fs::read_to_string(&counter).unwrap();
    assert_eq!(runs.lines().count(), 1);
}

#[tokio::test]
async fn test_missing_encoder_detected_before_conversion() {
    let temp = TempDir::new().unwrap();
    let audio = temp.path().join("clip.mp3");
    std::fs::write(&audio, b"mp3").unwrap();

    let normalizer = Normalizer::with_encoder("no-such-encoder-xyz");
    let asset = AudioAsset::resolve(&audio).unwrap();
    let err = normalizer.normalize(&asset).await.unwrap_err();

    assert!(matches!(err, PipelineError::EncoderUnavailable(_)));
    // Nothing was written.
    assert!(!temp.path().join("clip.wav").exists());
}

#[tokio::test]
async fn test_encoder_failure_is_conversion_error() {
    let temp = TempDir::new().unwrap();
    let encoder = write_stub_encoder(temp.path(), "echo 'codec not found' >&2\nexit 1");
    let audio = temp.path().join("clip.mp3");
    std::fs::write(&audio, b"mp3").unwrap();

    let normalizer = Normalizer::with_encoder(&encoder);
    let asset = AudioAsset::resolve(&audio).unwrap();
    let err = normalizer.normalize(&asset).await.unwrap_err();

    match err {
        PipelineError::Conversion { input, detail } => {
            assert_eq!(input, audio);
            assert!(detail.contains("codec not found"));
        }
        other => panic!("expected Conversion, got {other:?}"),
    }
}
