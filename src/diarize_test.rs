use super::*;
use std::os::unix::fs::PermissionsExt;
use tempfile::TempDir;

fn write_stub_interpreter(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("python-stub");
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

#[test]
fn test_diarized_output_path() {
    let path = diarized_output_path(Path::new("/audio/out_small.txt"));
    assert_eq!(path, Path::new("/audio/out_small_spk.txt"));
}

#[test]
fn test_parse_segment_with_speaker() {
    let segment = parse_segment("SPEAKER_00\thello there").unwrap();
    assert_eq!(segment.speaker.as_deref(), Some("SPEAKER_00"));
    assert_eq!(segment.text, "hello there");
}

#[test]
fn test_parse_segment_without_speaker() {
    let segment = parse_segment("\tunattributed words").unwrap();
    assert_eq!(segment.speaker, None);
    assert_eq!(segment.text, "unattributed words");
}

#[test]
fn test_parse_segment_rejects_non_segments() {
    assert_eq!(parse_segment("no separator here"), None);
    assert_eq!(parse_segment("SPEAKER_00\t   "), None);
}

#[test]
fn test_render_segments_in_order() {
    let segments = vec![
        Segment {
            speaker: Some("A".to_string()),
            text: "hi".to_string(),
        },
        Segment {
            speaker: Some("B".to_string()),
            text: "bye".to_string(),
        },
    ];
    assert_eq!(render_segments(&segments), "A: hi\nB: bye\n");
}

#[test]
fn test_render_placeholder_for_missing_speaker() {
    let segments = vec![Segment {
        speaker: None,
        text: "who said this".to_string(),
    }];
    assert_eq!(render_segments(&segments), "UNKNOWN: who said this\n");
}

#[tokio::test]
async fn test_unavailable_dependency_named() {
    let temp = TempDir::new().unwrap();
    let interpreter = write_stub_interpreter(
        temp.path(),
        "echo \"ModuleNotFoundError: No module named 'torch'\" >&2\nexit 1",
    );

    let err = Diarizer::new(&interpreter).check_available().await.unwrap_err();
    match err {
        PipelineError::DiarizationUnavailable { module, detail } => {
            assert_eq!(module, "torch");
            assert!(detail.contains("No module named"));
        }
        other => panic!("expected DiarizationUnavailable, got {other:?}"),
    }
}

#[tokio::test]
async fn test_diarize_writes_labeled_transcript() {
    let temp = TempDir::new().unwrap();
    // Import probes succeed; the diarization run prints two segments, the
    // second without a speaker.
    let body = r#"case "$2" in
import*) exit 0 ;;
esac
printf 'A\thi\n\tbye\n'
"#;
    let interpreter = write_stub_interpreter(temp.path(), body);
    let audio = temp.path().join("clip.wav");
    std::fs::write(&audio, b"riff").unwrap();
    let transcript = temp.path().join("clip_small.txt");
    std::fs::write(&transcript, b"hi bye").unwrap();

    let artifact = Diarizer::new(&interpreter)
        .diarize(&audio, &transcript)
        .await
        .unwrap();

    assert_eq!(artifact.path, temp.path().join("clip_small_spk.txt"));
    let content = std::fs::read_to_string(&artifact.path).unwrap();
    assert_eq!(content, "A: hi\nUNKNOWN: bye\n");
}

#[tokio::test]
async fn test_diarize_failure_carries_stderr() {
    let temp = TempDir::new().unwrap();
    let body = r#"case "$2" in
import*) exit 0 ;;
esac
echo 'pipeline blew up' >&2
exit 1
"#;
    let interpreter = write_stub_interpreter(temp.path(), body);
    let audio = temp.path().join("clip.wav");
    std::fs::write(&audio, b"riff").unwrap();
    let transcript = temp.path().join("clip_small.txt");
    std::fs::write(&transcript, b"text").unwrap();

    let err = Diarizer::new(&interpreter)
        .diarize(&audio, &transcript)
        .await
        .unwrap_err();

    match err {
        PipelineError::ProcessExecution { output, .. } => {
            assert!(output.contains("pipeline blew up"));
        }
        other => panic!("expected ProcessExecution, got {other:?}"),
    }
}
