/// WebSocket message types for the Skald real-time transcription API
///
/// This module defines all control messages exchanged over the real-time
/// channel. Every JSON message carries a `message` field naming its type;
/// audio itself travels as binary WebSocket frames and has no JSON form.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::{AudioEventsConfig, AudioFormat, TranscriptionConfig, TranslationConfig};

// ============================================================================
// Client -> Server Messages
// ============================================================================

/// JSON control messages sent from client to server.
///
/// `AddAudio` is deliberately absent: audio chunks are sent as raw binary
/// frames and are only acknowledged by the server's
/// [`ServerMessage::AudioAdded`].
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "message")]
pub enum ClientMessage {
    /// Initiates the recognition session.
    StartRecognition {
        audio_format: AudioFormat,
        transcription_config: TranscriptionConfig,
        #[serde(skip_serializing_if = "Option::is_none")]
        translation_config: Option<TranslationConfig>,
        #[serde(skip_serializing_if = "Option::is_none")]
        audio_events_config: Option<AudioEventsConfig>,
    },

    /// Replaces the transcription configuration mid-session.
    SetRecognitionConfig {
        transcription_config: TranscriptionConfig,
    },

    /// Signals that no further audio will be sent.
    ///
    /// `last_seq_no` is the number of audio chunks sent so far, so the
    /// server knows when it has processed everything.
    EndOfStream { last_seq_no: u64 },
}

impl ClientMessage {
    /// Build a `StartRecognition` message from a transcription config.
    ///
    /// Translation and audio-events settings live on
    /// [`TranscriptionConfig`] for the caller's convenience but are
    /// siblings of `transcription_config` on the wire, so they are split
    /// out here.
    pub fn start_recognition(audio_format: &AudioFormat, config: &TranscriptionConfig) -> Self {
        ClientMessage::StartRecognition {
            audio_format: audio_format.clone(),
            transcription_config: config.clone(),
            translation_config: config.translation_config.clone(),
            audio_events_config: config.audio_events_config.clone(),
        }
    }

    /// Build a `SetRecognitionConfig` message.
    pub fn set_recognition_config(config: &TranscriptionConfig) -> Self {
        ClientMessage::SetRecognitionConfig {
            transcription_config: config.clone(),
        }
    }

    /// Build an `EndOfStream` message.
    pub fn end_of_stream(last_seq_no: u64) -> Self {
        ClientMessage::EndOfStream { last_seq_no }
    }
}

// ============================================================================
// Server -> Client Messages
// ============================================================================

/// Messages received from the server.
///
/// Uses serde's tagged enum feature to deserialize based on the `message`
/// field. Unknown fields in a payload are ignored so that additive server
/// changes do not break older clients.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "message")]
pub enum ServerMessage {
    /// The server accepted the configuration and recognition has begun.
    RecognitionStarted {
        /// Server-assigned session identifier
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        /// Details of the language pack serving this session
        #[serde(default, skip_serializing_if = "Option::is_none")]
        language_pack_info: Option<Value>,
    },

    /// Acknowledges one binary audio chunk.
    AudioAdded { seq_no: u64 },

    /// Provisional transcript for in-progress audio; may be revised.
    AddPartialTranscript {
        metadata: TranscriptMetadata,
        #[serde(default)]
        results: Vec<RecognitionResult>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        format: Option<String>,
    },

    /// Final transcript; will not be revised.
    AddTranscript {
        metadata: TranscriptMetadata,
        #[serde(default)]
        results: Vec<RecognitionResult>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        format: Option<String>,
    },

    /// Provisional translation of in-progress audio.
    AddPartialTranslation {
        language: String,
        #[serde(default)]
        results: Vec<TranslationResult>,
    },

    /// Final translation.
    AddTranslation {
        language: String,
        #[serde(default)]
        results: Vec<TranslationResult>,
    },

    /// Informational notice, e.g. an unsupported translation pair.
    Info {
        #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
        info_type: Option<String>,
        reason: String,
    },

    /// Non-fatal problem report.
    Warning {
        #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
        warning_type: Option<String>,
        reason: String,
    },

    /// Fatal problem report; the session is over after this.
    Error {
        #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
        error_type: Option<String>,
        reason: String,
    },

    /// All audio has been processed and all transcripts delivered.
    EndOfTranscript,
}

impl ServerMessage {
    /// The field-less kind of this message, used as a registry key.
    pub fn kind(&self) -> ServerMessageKind {
        match self {
            ServerMessage::RecognitionStarted { .. } => ServerMessageKind::RecognitionStarted,
            ServerMessage::AudioAdded { .. } => ServerMessageKind::AudioAdded,
            ServerMessage::AddPartialTranscript { .. } => ServerMessageKind::AddPartialTranscript,
            ServerMessage::AddTranscript { .. } => ServerMessageKind::AddTranscript,
            ServerMessage::AddPartialTranslation { .. } => ServerMessageKind::AddPartialTranslation,
            ServerMessage::AddTranslation { .. } => ServerMessageKind::AddTranslation,
            ServerMessage::Info { .. } => ServerMessageKind::Info,
            ServerMessage::Warning { .. } => ServerMessageKind::Warning,
            ServerMessage::Error { .. } => ServerMessageKind::Error,
            ServerMessage::EndOfTranscript => ServerMessageKind::EndOfTranscript,
        }
    }

    /// Check if this is a partial transcript
    pub fn is_partial(&self) -> bool {
        matches!(self, ServerMessage::AddPartialTranscript { .. })
    }

    /// Check if this is a final transcript
    pub fn is_final(&self) -> bool {
        matches!(self, ServerMessage::AddTranscript { .. })
    }

    /// Check if this is an error
    pub fn is_error(&self) -> bool {
        matches!(self, ServerMessage::Error { .. })
    }

    /// Get the transcript text if this is a transcript message
    pub fn transcript(&self) -> Option<&str> {
        match self {
            ServerMessage::AddPartialTranscript { metadata, .. }
            | ServerMessage::AddTranscript { metadata, .. } => Some(&metadata.transcript),
            _ => None,
        }
    }

    /// Get the reason text if this is an Info, Warning or Error message
    pub fn reason(&self) -> Option<&str> {
        match self {
            ServerMessage::Info { reason, .. }
            | ServerMessage::Warning { reason, .. }
            | ServerMessage::Error { reason, .. } => Some(reason),
            _ => None,
        }
    }
}

/// Field-less mirror of [`ServerMessage`], used to key the event handler
/// registry and to name message types in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServerMessageKind {
    RecognitionStarted,
    AudioAdded,
    AddPartialTranscript,
    AddTranscript,
    AddPartialTranslation,
    AddTranslation,
    Info,
    Warning,
    Error,
    EndOfTranscript,
}

impl ServerMessageKind {
    /// All message kinds, in wire-protocol order.
    pub const ALL: [ServerMessageKind; 10] = [
        ServerMessageKind::RecognitionStarted,
        ServerMessageKind::AudioAdded,
        ServerMessageKind::AddPartialTranscript,
        ServerMessageKind::AddTranscript,
        ServerMessageKind::AddPartialTranslation,
        ServerMessageKind::AddTranslation,
        ServerMessageKind::Info,
        ServerMessageKind::Warning,
        ServerMessageKind::Error,
        ServerMessageKind::EndOfTranscript,
    ];
}

impl std::fmt::Display for ServerMessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

// ============================================================================
// Supporting Types
// ============================================================================

/// Summary metadata attached to every transcript message.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TranscriptMetadata {
    /// Concatenated transcript text for this message
    pub transcript: String,
    /// Start of the covered audio span, in seconds
    pub start_time: f64,
    /// End of the covered audio span, in seconds
    pub end_time: f64,
}

/// A single recognized unit (word or punctuation mark) with alternatives.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RecognitionResult {
    /// Result type ("word", "punctuation" or "entity")
    #[serde(rename = "type")]
    pub result_type: String,

    /// Start time in seconds
    pub start_time: f64,

    /// End time in seconds
    pub end_time: f64,

    /// Whether this result ends a sentence
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_eos: Option<bool>,

    /// Candidate readings, best first
    #[serde(default)]
    pub alternatives: Vec<RecognitionAlternative>,
}

impl RecognitionResult {
    /// The best-confidence content for this result, if any.
    pub fn best(&self) -> Option<&RecognitionAlternative> {
        self.alternatives.first()
    }

    /// Check if this is a punctuation mark
    pub fn is_punctuation(&self) -> bool {
        self.result_type == "punctuation"
    }
}

/// One candidate reading of a recognition result.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RecognitionAlternative {
    /// The recognized text
    pub content: String,

    /// Confidence score (0.0 - 1.0)
    pub confidence: f64,

    /// Detected language, if reported
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    /// Speaker label when diarization is enabled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,
}

/// One translated span within an Add(Partial)Translation message.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TranslationResult {
    /// Translated text
    pub content: String,

    /// Start time in seconds
    pub start_time: f64,

    /// End time in seconds
    pub end_time: f64,

    /// Speaker label when diarization is enabled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AudioEncoding;

    #[test]
    fn test_start_recognition_serialization() {
        let config = TranscriptionConfig::new("en").with_partials();
        let format = AudioFormat::Raw {
            encoding: AudioEncoding::PcmS16Le,
            sample_rate: 16000,
        };

        let msg = ClientMessage::start_recognition(&format, &config);
        let json = serde_json::to_string(&msg).unwrap();

        assert!(json.contains("\"message\":\"StartRecognition\""));
        assert!(json.contains("\"transcription_config\""));
        assert!(json.contains("\"language\":\"en\""));
        assert!(json.contains("\"enable_partials\":true"));
        assert!(json.contains("\"type\":\"raw\""));
        assert!(json.contains("\"encoding\":\"pcm_s16le\""));
        assert!(json.contains("\"sample_rate\":16000"));
        // No translation requested, so the sibling must be omitted
        assert!(!json.contains("translation_config"));
    }

    #[test]
    fn test_start_recognition_splits_translation_config() {
        let config = TranscriptionConfig::new("en")
            .with_translation(TranslationConfig::new(["de", "fr"]));

        let msg = ClientMessage::start_recognition(&AudioFormat::File, &config);
        let value = serde_json::to_value(&msg).unwrap();

        // translation_config is a sibling of transcription_config, not nested
        assert!(value.get("translation_config").is_some());
        assert!(
            value["transcription_config"]
                .get("translation_config")
                .is_none()
        );
        assert_eq!(value["translation_config"]["target_languages"][0], "de");
    }

    #[test]
    fn test_end_of_stream_serialization() {
        let msg = ClientMessage::end_of_stream(42);
        let json = serde_json::to_string(&msg).unwrap();

        assert_eq!(json, "{\"message\":\"EndOfStream\",\"last_seq_no\":42}");
    }

    #[test]
    fn test_set_recognition_config_serialization() {
        let config = TranscriptionConfig::new("en");
        let msg = ClientMessage::set_recognition_config(&config);
        let json = serde_json::to_string(&msg).unwrap();

        assert!(json.contains("\"message\":\"SetRecognitionConfig\""));
        assert!(json.contains("\"language\":\"en\""));
    }

    #[test]
    fn test_server_message_recognition_started() {
        let json = r#"{
            "message": "RecognitionStarted",
            "id": "807670e9-14af-4fa2-9e8f-5d525c22156e"
        }"#;

        let msg: ServerMessage = serde_json::from_str(json).unwrap();

        match &msg {
            ServerMessage::RecognitionStarted { id, .. } => {
                assert_eq!(id.as_deref(), Some("807670e9-14af-4fa2-9e8f-5d525c22156e"));
            }
            _ => panic!("Expected RecognitionStarted"),
        }
        assert_eq!(msg.kind(), ServerMessageKind::RecognitionStarted);
    }

    #[test]
    fn test_server_message_audio_added() {
        let json = r#"{"message": "AudioAdded", "seq_no": 7}"#;
        let msg: ServerMessage = serde_json::from_str(json).unwrap();

        assert_eq!(msg, ServerMessage::AudioAdded { seq_no: 7 });
    }

    #[test]
    fn test_server_message_partial_transcript() {
        let json = r#"{
            "message": "AddPartialTranscript",
            "metadata": {"transcript": "hello wor", "start_time": 0.0, "end_time": 1.2},
            "results": []
        }"#;

        let msg: ServerMessage = serde_json::from_str(json).unwrap();

        assert!(msg.is_partial());
        assert!(!msg.is_final());
        assert_eq!(msg.transcript(), Some("hello wor"));
    }

    #[test]
    fn test_server_message_transcript_with_results() {
        let json = r#"{
            "message": "AddTranscript",
            "metadata": {"transcript": "Hello world. ", "start_time": 0.0, "end_time": 2.0},
            "results": [
                {
                    "type": "word",
                    "start_time": 0.0,
                    "end_time": 0.5,
                    "alternatives": [{"content": "Hello", "confidence": 0.99}]
                },
                {
                    "type": "punctuation",
                    "start_time": 1.9,
                    "end_time": 2.0,
                    "is_eos": true,
                    "alternatives": [{"content": ".", "confidence": 1.0}]
                }
            ]
        }"#;

        let msg: ServerMessage = serde_json::from_str(json).unwrap();

        assert!(msg.is_final());
        match msg {
            ServerMessage::AddTranscript { results, .. } => {
                assert_eq!(results.len(), 2);
                assert_eq!(results[0].best().unwrap().content, "Hello");
                assert!(!results[0].is_punctuation());
                assert!(results[1].is_punctuation());
                assert_eq!(results[1].is_eos, Some(true));
            }
            _ => panic!("Expected AddTranscript"),
        }
    }

    #[test]
    fn test_server_message_translation() {
        let json = r#"{
            "message": "AddTranslation",
            "language": "de",
            "results": [
                {"content": "Hallo Welt.", "start_time": 0.0, "end_time": 2.0}
            ]
        }"#;

        let msg: ServerMessage = serde_json::from_str(json).unwrap();

        match msg {
            ServerMessage::AddTranslation { language, results } => {
                assert_eq!(language, "de");
                assert_eq!(results[0].content, "Hallo Welt.");
            }
            _ => panic!("Expected AddTranslation"),
        }
    }

    #[test]
    fn test_server_message_error() {
        let json = r#"{
            "message": "Error",
            "type": "invalid_model",
            "reason": "Model not found"
        }"#;

        let msg: ServerMessage = serde_json::from_str(json).unwrap();

        assert!(msg.is_error());
        assert_eq!(msg.reason(), Some("Model not found"));
        assert_eq!(msg.kind(), ServerMessageKind::Error);
    }

    #[test]
    fn test_server_message_end_of_transcript() {
        let json = r#"{"message": "EndOfTranscript"}"#;
        let msg: ServerMessage = serde_json::from_str(json).unwrap();

        assert_eq!(msg, ServerMessage::EndOfTranscript);
        assert_eq!(msg.transcript(), None);
    }

    #[test]
    fn test_server_message_ignores_unknown_fields() {
        let json = r#"{
            "message": "AudioAdded",
            "seq_no": 1,
            "some_future_field": {"nested": true}
        }"#;

        let msg: ServerMessage = serde_json::from_str(json).unwrap();
        assert_eq!(msg, ServerMessage::AudioAdded { seq_no: 1 });
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(
            ServerMessageKind::AddPartialTranscript.to_string(),
            "AddPartialTranscript"
        );
        assert_eq!(ServerMessageKind::ALL.len(), 10);
    }
}
