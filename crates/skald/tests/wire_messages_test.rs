//! Integration tests for the wire protocol payloads
//!
//! Validates that fully-populated session-start payloads survive a
//! serialize/parse round trip without losing any set field, and that the
//! server message stream parses from raw JSON as the service emits it.

use skald::config::{
    AudioEncoding, AudioFormat, DiarizationMode, MaxDelayMode, OperatingPoint,
    PunctuationOverrides, SpeakerDiarizationConfig, TranscriptionConfig, TranslationConfig,
    VocabEntry,
};
use skald::messages::{ClientMessage, ServerMessage};

fn full_config() -> TranscriptionConfig {
    TranscriptionConfig::new("en")
        .with_domain("finance")
        .with_output_locale("en-GB")
        .with_operating_point(OperatingPoint::Enhanced)
        .with_diarization(DiarizationMode::Speaker)
        .with_additional_vocab([
            VocabEntry::new("gnocchi").sounds_like("nyohki"),
            VocabEntry::from("Skald"),
        ])
        .with_punctuation_overrides(PunctuationOverrides {
            permitted_marks: Some(vec![".".to_string(), "?".to_string()]),
            sensitivity: Some(0.5),
        })
        .with_partials()
        .with_entities()
        .with_max_delay(2.0)
        .with_max_delay_mode(MaxDelayMode::Flexible)
        .with_speaker_diarization(SpeakerDiarizationConfig {
            max_speakers: Some(4),
        })
        .with_translation(TranslationConfig::new(["de", "fr"]).with_partials())
}

#[test]
fn test_start_recognition_round_trips_every_set_field() {
    let config = full_config();
    let audio_format = AudioFormat::Raw {
        encoding: AudioEncoding::PcmS16Le,
        sample_rate: 16000,
    };

    let message = ClientMessage::start_recognition(&audio_format, &config);
    let json = serde_json::to_string(&message).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();

    assert_eq!(value["message"], "StartRecognition");

    // Audio format
    assert_eq!(value["audio_format"]["type"], "raw");
    assert_eq!(value["audio_format"]["encoding"], "pcm_s16le");
    assert_eq!(value["audio_format"]["sample_rate"], 16000);

    // The nested transcription config must parse back to the original
    // (translation rides as a sibling, so compare without it)
    let parsed: TranscriptionConfig =
        serde_json::from_value(value["transcription_config"].clone()).unwrap();
    let mut expected = full_config();
    expected.translation_config = None;
    expected.audio_events_config = None;
    assert_eq!(parsed, expected);

    // The sibling translation config round-trips too
    let translation: TranslationConfig =
        serde_json::from_value(value["translation_config"].clone()).unwrap();
    assert_eq!(translation, full_config().translation_config.unwrap());
}

#[test]
fn test_start_recognition_omits_unset_fields() {
    let config = TranscriptionConfig::new("en");
    let message = ClientMessage::start_recognition(&AudioFormat::File, &config);
    let value = serde_json::to_value(&message).unwrap();

    let transcription = value["transcription_config"].as_object().unwrap();
    assert_eq!(transcription.len(), 1, "only language should be set: {transcription:?}");
    assert!(value.get("translation_config").is_none());
    assert!(value.get("audio_events_config").is_none());
}

#[test]
fn test_server_message_stream_parses() {
    // A session's worth of messages as the service emits them
    let stream = [
        r#"{"message": "RecognitionStarted", "id": "272d1dcf", "language_pack_info": {"language_description": "English"}}"#,
        r#"{"message": "AudioAdded", "seq_no": 1}"#,
        r#"{"message": "Info", "type": "recognition_quality", "reason": "Running recognition using a broadcast model"}"#,
        r#"{"message": "AddPartialTranscript", "metadata": {"transcript": "one", "start_time": 0.0, "end_time": 0.5}, "results": []}"#,
        r#"{"message": "AddTranscript", "metadata": {"transcript": "one two. ", "start_time": 0.0, "end_time": 1.4}, "results": [{"type": "word", "start_time": 0.0, "end_time": 0.5, "alternatives": [{"content": "one", "confidence": 0.97}]}]}"#,
        r#"{"message": "AddPartialTranslation", "language": "de", "results": [{"content": "eins", "start_time": 0.0, "end_time": 0.5}]}"#,
        r#"{"message": "AddTranslation", "language": "de", "results": [{"content": "eins zwei. ", "start_time": 0.0, "end_time": 1.4}]}"#,
        r#"{"message": "Warning", "reason": "Audio is ahead of real time"}"#,
        r#"{"message": "EndOfTranscript"}"#,
    ];

    let parsed: Vec<ServerMessage> = stream
        .iter()
        .map(|json| serde_json::from_str(json).unwrap())
        .collect();

    assert_eq!(parsed.len(), 9);
    assert!(parsed[3].is_partial());
    assert!(parsed[4].is_final());
    assert_eq!(parsed[4].transcript(), Some("one two. "));
    assert_eq!(parsed.last(), Some(&ServerMessage::EndOfTranscript));
}

#[test]
fn test_error_message_types_parse() {
    // Error taxonomy as documented for connection close errors
    for error_type in [
        "protocol_error",
        "not_authorised",
        "invalid_model",
        "quota_exceeded",
        "timelimit_exceeded",
        "internal_error",
    ] {
        let json = format!(
            r#"{{"message": "Error", "type": "{error_type}", "reason": "details"}}"#
        );
        let message: ServerMessage = serde_json::from_str(&json).unwrap();
        assert!(message.is_error());
        match message {
            ServerMessage::Error {
                error_type: parsed, ..
            } => assert_eq!(parsed.as_deref(), Some(error_type)),
            _ => unreachable!(),
        }
    }
}
