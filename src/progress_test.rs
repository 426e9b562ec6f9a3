use super::*;
use tempfile::TempDir;

fn classifier(temp: &TempDir) -> (StreamClassifier, PathBuf) {
    let weights = temp.path().join("base.pt");
    (StreamClassifier::new(&weights), weights)
}

#[test]
fn test_percent_before_weights_is_download_progress() {
    let temp = TempDir::new().unwrap();
    let (mut classifier, _weights) = classifier(&temp);

    let event = classifier.classify(" 45%|████      | 63M/139M [00:05<00:06]");
    assert_eq!(event, Some(ProgressEvent::Downloading { percent: 45 }));
}

#[test]
fn test_weights_appearing_flips_to_transcribing() {
    let temp = TempDir::new().unwrap();
    let (mut classifier, weights) = classifier(&temp);

    assert_eq!(
        classifier.classify("10%|"),
        Some(ProgressEvent::Downloading { percent: 10 })
    );

    std::fs::write(&weights, b"weights").unwrap();
    assert_eq!(
        classifier.classify("100%|"),
        Some(ProgressEvent::Transcribing)
    );

    // Percentages after the flip are plain log lines.
    assert_eq!(
        classifier.classify("45%| chunk"),
        Some(ProgressEvent::Log("45%| chunk".to_string()))
    );
}

#[test]
fn test_precision_warning_suppressed() {
    let temp = TempDir::new().unwrap();
    let (mut classifier, _weights) = classifier(&temp);

    let event = classifier.classify("FP16 is not supported on CPU; using FP32 instead");
    assert_eq!(event, None);
}

#[test]
fn test_empty_lines_produce_no_event() {
    let temp = TempDir::new().unwrap();
    let (mut classifier, _weights) = classifier(&temp);

    assert_eq!(classifier.classify(""), None);
    assert_eq!(classifier.classify("   "), None);
}

#[test]
fn test_download_progress_is_monotonic() {
    let temp = TempDir::new().unwrap();
    let (mut classifier, _weights) = classifier(&temp);

    assert_eq!(
        classifier.classify("45%|"),
        Some(ProgressEvent::Downloading { percent: 45 })
    );
    // A regressed percentage (tqdm redrawing) is dropped.
    assert_eq!(classifier.classify("30%|"), None);
    assert_eq!(
        classifier.classify("60%|"),
        Some(ProgressEvent::Downloading { percent: 60 })
    );
}

#[test]
fn test_plain_lines_pass_through() {
    let temp = TempDir::new().unwrap();
    let (mut classifier, weights) = classifier(&temp);
    std::fs::write(&weights, b"weights").unwrap();

    classifier.classify("first"); // flips phase
    assert_eq!(
        classifier.classify("Detected language: English"),
        Some(ProgressEvent::Log("Detected language: English".to_string()))
    );
}

#[test]
fn test_recording_sink_captures_events() {
    let sink = RecordingSink::new();
    sink.accept(&ProgressEvent::Converting);
    sink.accept(&ProgressEvent::Finished);

    assert_eq!(
        sink.events(),
        vec![ProgressEvent::Converting, ProgressEvent::Finished]
    );
}

#[test]
fn test_event_display() {
    assert_eq!(
        ProgressEvent::Downloading { percent: 7 }.to_string(),
        "downloading model 7%"
    );
    assert_eq!(ProgressEvent::Transcribing.to_string(), "transcribing");
    assert_eq!(ProgressEvent::Log("raw".into()).to_string(), "raw");
}
