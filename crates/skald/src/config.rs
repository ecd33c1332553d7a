/// Recognition configuration types
///
/// This module defines the declarative configuration values that describe a
/// transcription: language, operating point, diarization, punctuation,
/// translation and the other recognition options. A config is serialized
/// verbatim into the session-start message (real-time) or the job-submission
/// payload (batch) and is frozen for the lifetime of that session or job.
///
/// Optional fields are omitted from the wire format when unset.

use serde::{Deserialize, Serialize};

// ============================================================================
// Transcription Configuration
// ============================================================================

/// Configuration for a real-time transcription session
///
/// Constructed with [`TranscriptionConfig::new`] and refined with the
/// builder methods.
///
/// # Example
/// ```
/// use skald::config::{OperatingPoint, TranscriptionConfig};
///
/// let config = TranscriptionConfig::new("en")
///     .with_partials()
///     .with_operating_point(OperatingPoint::Enhanced)
///     .with_max_delay(2.0);
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct TranscriptionConfig {
    /// ISO language code (e.g. "en", "de")
    pub language: String,

    /// Recognition domain (e.g. "finance")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,

    /// Locale used to spell the output (e.g. "en-GB")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_locale: Option<String>,

    /// Accuracy/latency tradeoff profile
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operating_point: Option<OperatingPoint>,

    /// Speaker attribution mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diarization: Option<DiarizationMode>,

    /// Custom dictionary entries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_vocab: Option<Vec<VocabEntry>>,

    /// Punctuation rules
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub punctuation_overrides: Option<PunctuationOverrides>,

    /// Whether provisional transcripts are delivered
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_partials: Option<bool>,

    /// Whether entities (dates, numbers, ...) are marked up in results
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_entities: Option<bool>,

    /// Upper bound on the delay before a final transcript, in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_delay: Option<f64>,

    /// How strictly `max_delay` is honored around entities
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_delay_mode: Option<MaxDelayMode>,

    /// Speaker diarization tuning
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker_diarization_config: Option<SpeakerDiarizationConfig>,

    /// Translation targets. Not part of the transcription payload itself:
    /// the session client sends it as a sibling of `transcription_config`.
    #[serde(skip)]
    pub translation_config: Option<TranslationConfig>,

    /// Audio event detection. Sent as a sibling, like translation.
    #[serde(skip)]
    pub audio_events_config: Option<AudioEventsConfig>,
}

impl TranscriptionConfig {
    /// Create a configuration for the given language, everything else unset.
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            ..Default::default()
        }
    }

    /// Set the recognition domain
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Set the output locale
    pub fn with_output_locale(mut self, locale: impl Into<String>) -> Self {
        self.output_locale = Some(locale.into());
        self
    }

    /// Set the operating point
    pub fn with_operating_point(mut self, operating_point: OperatingPoint) -> Self {
        self.operating_point = Some(operating_point);
        self
    }

    /// Set the diarization mode
    pub fn with_diarization(mut self, diarization: DiarizationMode) -> Self {
        self.diarization = Some(diarization);
        self
    }

    /// Set custom dictionary entries
    pub fn with_additional_vocab(
        mut self,
        vocab: impl IntoIterator<Item = VocabEntry>,
    ) -> Self {
        self.additional_vocab = Some(vocab.into_iter().collect());
        self
    }

    /// Set punctuation overrides
    pub fn with_punctuation_overrides(mut self, overrides: PunctuationOverrides) -> Self {
        self.punctuation_overrides = Some(overrides);
        self
    }

    /// Enable partial (provisional) transcripts
    pub fn with_partials(mut self) -> Self {
        self.enable_partials = Some(true);
        self
    }

    /// Enable entity markup in results
    pub fn with_entities(mut self) -> Self {
        self.enable_entities = Some(true);
        self
    }

    /// Set the maximum finalization delay in seconds
    pub fn with_max_delay(mut self, seconds: f64) -> Self {
        self.max_delay = Some(seconds);
        self
    }

    /// Set the max-delay mode
    pub fn with_max_delay_mode(mut self, mode: MaxDelayMode) -> Self {
        self.max_delay_mode = Some(mode);
        self
    }

    /// Set speaker diarization tuning
    pub fn with_speaker_diarization(mut self, config: SpeakerDiarizationConfig) -> Self {
        self.speaker_diarization_config = Some(config);
        self
    }

    /// Request translation into the given target languages
    pub fn with_translation(mut self, config: TranslationConfig) -> Self {
        self.translation_config = Some(config);
        self
    }

    /// Request audio event detection
    pub fn with_audio_events(mut self, config: AudioEventsConfig) -> Self {
        self.audio_events_config = Some(config);
        self
    }

    /// Whether the language field is usable.
    ///
    /// A blank or whitespace-only language is rejected by clients before
    /// any network call is made.
    pub fn has_valid_language(&self) -> bool {
        !self.language.trim().is_empty()
    }
}

// ============================================================================
// Batch Job Configuration
// ============================================================================

/// Configuration for a batch transcription job
///
/// This is the full job payload sent as the `config` part of the
/// submission request: the transcription settings plus the batch-only
/// concerns (fetch URL, notifications, summarization, sentiment, topics).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct BatchTranscriptionConfig {
    /// Job type identifier (always "transcription")
    #[serde(rename = "type")]
    pub job_type: String,

    /// Core recognition settings
    pub transcription_config: TranscriptionConfig,

    /// Remote audio to fetch instead of an uploaded file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fetch_data: Option<FetchData>,

    /// Callbacks invoked by the service when the job finishes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification_config: Option<Vec<NotificationConfig>>,

    /// Translation targets
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translation_config: Option<TranslationConfig>,

    /// Summarization of the finished transcript
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summarization_config: Option<SummarizationConfig>,

    /// Sentiment analysis of the finished transcript
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment_analysis_config: Option<SentimentAnalysisConfig>,

    /// Topic detection over the finished transcript
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic_detection_config: Option<TopicDetectionConfig>,

    /// Audio event detection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_events_config: Option<AudioEventsConfig>,
}

impl BatchTranscriptionConfig {
    /// Wrap transcription settings into a job payload.
    pub fn new(transcription_config: TranscriptionConfig) -> Self {
        Self {
            job_type: "transcription".to_string(),
            transcription_config,
            fetch_data: None,
            notification_config: None,
            translation_config: None,
            summarization_config: None,
            sentiment_analysis_config: None,
            topic_detection_config: None,
            audio_events_config: None,
        }
    }

    /// Fetch the audio from a URL instead of uploading a file
    pub fn with_fetch_url(mut self, url: impl Into<String>) -> Self {
        self.fetch_data = Some(FetchData {
            url: url.into(),
            auth_headers: None,
        });
        self
    }

    /// Add a completion notification target
    pub fn with_notification(mut self, notification: NotificationConfig) -> Self {
        self.notification_config
            .get_or_insert_with(Vec::new)
            .push(notification);
        self
    }

    /// Request translation into the given target languages
    pub fn with_translation(mut self, config: TranslationConfig) -> Self {
        self.translation_config = Some(config);
        self
    }

    /// Request a summary of the transcript
    pub fn with_summarization(mut self, config: SummarizationConfig) -> Self {
        self.summarization_config = Some(config);
        self
    }

    /// Request sentiment analysis
    pub fn with_sentiment_analysis(mut self) -> Self {
        self.sentiment_analysis_config = Some(SentimentAnalysisConfig::default());
        self
    }

    /// Request topic detection
    pub fn with_topic_detection(mut self, config: TopicDetectionConfig) -> Self {
        self.topic_detection_config = Some(config);
        self
    }

    /// Request audio event detection
    pub fn with_audio_events(mut self, config: AudioEventsConfig) -> Self {
        self.audio_events_config = Some(config);
        self
    }
}

impl Default for BatchTranscriptionConfig {
    fn default() -> Self {
        Self::new(TranscriptionConfig::default())
    }
}

// ============================================================================
// Audio Description
// ============================================================================

/// Wire description of the audio the client is about to send.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AudioFormat {
    /// A self-describing container (WAV, MP3, ...); the server sniffs it
    #[default]
    File,

    /// Headerless PCM samples
    Raw {
        encoding: AudioEncoding,
        sample_rate: u32,
    },
}

/// Sample encodings accepted for raw audio.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioEncoding {
    /// 32-bit float PCM, little-endian
    #[serde(rename = "pcm_f32le")]
    PcmF32Le,
    /// 16-bit signed integer PCM, little-endian
    #[serde(rename = "pcm_s16le")]
    PcmS16Le,
    /// 8-bit mu-law
    #[serde(rename = "mulaw")]
    Mulaw,
}

impl std::str::FromStr for AudioEncoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pcm_f32le" => Ok(AudioEncoding::PcmF32Le),
            "pcm_s16le" => Ok(AudioEncoding::PcmS16Le),
            "mulaw" => Ok(AudioEncoding::Mulaw),
            other => Err(format!(
                "unknown audio encoding {other:?}, expected pcm_f32le, pcm_s16le or mulaw"
            )),
        }
    }
}

/// How the client reads and frames audio for a real-time session.
///
/// `format` is sent to the server; `chunk_size` only shapes the binary
/// frames the client produces.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioSettings {
    /// Wire description of the audio
    pub format: AudioFormat,

    /// Size of audio chunks to send, in bytes
    pub chunk_size: usize,
}

impl AudioSettings {
    /// Settings for a self-describing audio file.
    pub fn file() -> Self {
        Self::default()
    }

    /// Settings for raw PCM audio.
    pub fn raw(encoding: AudioEncoding, sample_rate: u32) -> Self {
        Self {
            format: AudioFormat::Raw {
                encoding,
                sample_rate,
            },
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Override the chunk size
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }
}

const DEFAULT_CHUNK_SIZE: usize = 1024 * 4;

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            format: AudioFormat::File,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

// ============================================================================
// Option Enums
// ============================================================================

/// Named accuracy/latency tradeoff profile.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OperatingPoint {
    Standard,
    Enhanced,
}

/// Speaker attribution mode.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DiarizationMode {
    None,
    Speaker,
}

/// How strictly the max-delay bound is honored.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MaxDelayMode {
    Fixed,
    Flexible,
}

// ============================================================================
// Nested Configuration Objects
// ============================================================================

/// A custom dictionary entry, optionally with phonetic hints.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct VocabEntry {
    /// The word or phrase to bias towards
    pub content: String,

    /// Phonetically similar spellings
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sounds_like: Vec<String>,
}

impl VocabEntry {
    /// Entry without phonetic hints.
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            sounds_like: Vec::new(),
        }
    }

    /// Add a phonetic hint
    pub fn sounds_like(mut self, hint: impl Into<String>) -> Self {
        self.sounds_like.push(hint.into());
        self
    }
}

impl From<&str> for VocabEntry {
    fn from(content: &str) -> Self {
        VocabEntry::new(content)
    }
}

/// Punctuation rules for the session.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct PunctuationOverrides {
    /// Marks the server may emit; `None` keeps the server default set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permitted_marks: Option<Vec<String>>,

    /// Aggressiveness of punctuation insertion (0.0 - 1.0)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sensitivity: Option<f64>,
}

/// Speaker diarization tuning.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct SpeakerDiarizationConfig {
    /// Cap on the number of distinct speakers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_speakers: Option<u32>,
}

/// Translation targets for a session or job.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TranslationConfig {
    /// ISO codes of the languages to translate into
    pub target_languages: Vec<String>,

    /// Whether provisional translations are delivered (real-time only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_partials: Option<bool>,
}

impl TranslationConfig {
    /// Translate into the given target languages.
    pub fn new<I, S>(target_languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            target_languages: target_languages.into_iter().map(Into::into).collect(),
            enable_partials: None,
        }
    }

    /// Enable partial translations
    pub fn with_partials(mut self) -> Self {
        self.enable_partials = Some(true);
        self
    }
}

/// Audio event detection settings.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct AudioEventsConfig {
    /// Event types to detect; `None` means the server default set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub types: Option<Vec<String>>,
}

/// Remote audio location for a batch job.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FetchData {
    /// URL the service downloads the audio from
    pub url: String,

    /// Headers to send with the fetch request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_headers: Option<Vec<String>>,
}

/// A completion callback for a batch job.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct NotificationConfig {
    /// URL the service calls when the job finishes
    pub url: String,

    /// Artifacts attached to the callback (e.g. "transcript", "jobinfo")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contents: Option<Vec<String>>,

    /// Headers to send with the callback request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_headers: Option<Vec<String>>,
}

impl NotificationConfig {
    /// Notify the given URL on completion.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            contents: None,
            auth_headers: None,
        }
    }
}

/// Transcript summarization settings.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct SummarizationConfig {
    /// "informative" or "conversational"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,

    /// "brief" or "detailed"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary_length: Option<String>,

    /// "paragraphs" or "bullets"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary_type: Option<String>,
}

/// Sentiment analysis settings. Carries no options today; its presence
/// enables the feature.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct SentimentAnalysisConfig {}

/// Topic detection settings.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct TopicDetectionConfig {
    /// Restrict detection to these topics; `None` lets the server choose
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topics: Option<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transcription_config_new() {
        let config = TranscriptionConfig::new("en");

        assert_eq!(config.language, "en");
        assert_eq!(config.operating_point, None);
        assert_eq!(config.enable_partials, None);
        assert!(config.has_valid_language());
    }

    #[test]
    fn test_transcription_config_builder() {
        let config = TranscriptionConfig::new("de")
            .with_output_locale("de-DE")
            .with_operating_point(OperatingPoint::Enhanced)
            .with_diarization(DiarizationMode::Speaker)
            .with_partials()
            .with_entities()
            .with_max_delay(2.5)
            .with_max_delay_mode(MaxDelayMode::Flexible);

        assert_eq!(config.language, "de");
        assert_eq!(config.output_locale.as_deref(), Some("de-DE"));
        assert_eq!(config.operating_point, Some(OperatingPoint::Enhanced));
        assert_eq!(config.diarization, Some(DiarizationMode::Speaker));
        assert_eq!(config.enable_partials, Some(true));
        assert_eq!(config.enable_entities, Some(true));
        assert_eq!(config.max_delay, Some(2.5));
        assert_eq!(config.max_delay_mode, Some(MaxDelayMode::Flexible));
    }

    #[test]
    fn test_unset_fields_are_omitted() {
        let config = TranscriptionConfig::new("en");
        let json = serde_json::to_string(&config).unwrap();

        assert_eq!(json, "{\"language\":\"en\"}");
    }

    #[test]
    fn test_config_round_trip() {
        let config = TranscriptionConfig::new("en")
            .with_operating_point(OperatingPoint::Standard)
            .with_diarization(DiarizationMode::Speaker)
            .with_additional_vocab([
                VocabEntry::new("gnocchi").sounds_like("nyohki"),
                VocabEntry::from("Skald"),
            ])
            .with_punctuation_overrides(PunctuationOverrides {
                permitted_marks: Some(vec![".".to_string(), ",".to_string()]),
                sensitivity: Some(0.4),
            })
            .with_partials()
            .with_max_delay(3.0);

        let json = serde_json::to_string(&config).unwrap();
        let parsed: TranscriptionConfig = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed, config);
    }

    #[test]
    fn test_blank_language_is_invalid() {
        assert!(!TranscriptionConfig::new("").has_valid_language());
        assert!(!TranscriptionConfig::new("   ").has_valid_language());
        assert!(TranscriptionConfig::new("en").has_valid_language());
    }

    #[test]
    fn test_vocab_entry_serialization() {
        let entry = VocabEntry::new("financial crisis");
        let json = serde_json::to_string(&entry).unwrap();
        // Empty sounds_like is omitted
        assert_eq!(json, "{\"content\":\"financial crisis\"}");

        let entry = VocabEntry::new("gnocchi")
            .sounds_like("nyohki")
            .sounds_like("nokey");
        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("\"sounds_like\":[\"nyohki\",\"nokey\"]"));
    }

    #[test]
    fn test_audio_format_serialization() {
        let file = AudioFormat::File;
        assert_eq!(serde_json::to_string(&file).unwrap(), "{\"type\":\"file\"}");

        let raw = AudioFormat::Raw {
            encoding: AudioEncoding::PcmF32Le,
            sample_rate: 44100,
        };
        let json = serde_json::to_string(&raw).unwrap();
        assert!(json.contains("\"type\":\"raw\""));
        assert!(json.contains("\"encoding\":\"pcm_f32le\""));
        assert!(json.contains("\"sample_rate\":44100"));
    }

    #[test]
    fn test_audio_encoding_from_str() {
        assert_eq!(
            "pcm_s16le".parse::<AudioEncoding>().unwrap(),
            AudioEncoding::PcmS16Le
        );
        assert_eq!("mulaw".parse::<AudioEncoding>().unwrap(), AudioEncoding::Mulaw);
        assert!("flac".parse::<AudioEncoding>().is_err());
    }

    #[test]
    fn test_audio_settings_defaults() {
        let settings = AudioSettings::default();
        assert_eq!(settings.format, AudioFormat::File);
        assert_eq!(settings.chunk_size, 4096);

        let settings = AudioSettings::raw(AudioEncoding::PcmS16Le, 16000).with_chunk_size(1024);
        assert_eq!(settings.chunk_size, 1024);
    }

    #[test]
    fn test_batch_config_serialization() {
        let config = BatchTranscriptionConfig::new(TranscriptionConfig::new("en"))
            .with_summarization(SummarizationConfig {
                content_type: Some("informative".to_string()),
                summary_length: Some("brief".to_string()),
                summary_type: None,
            })
            .with_sentiment_analysis()
            .with_topic_detection(TopicDetectionConfig {
                topics: Some(vec!["finance".to_string()]),
            });

        let value = serde_json::to_value(&config).unwrap();

        assert_eq!(value["type"], "transcription");
        assert_eq!(value["transcription_config"]["language"], "en");
        assert_eq!(value["summarization_config"]["summary_length"], "brief");
        assert_eq!(value["sentiment_analysis_config"], serde_json::json!({}));
        assert_eq!(value["topic_detection_config"]["topics"][0], "finance");
        assert!(value.get("fetch_data").is_none());
    }

    #[test]
    fn test_batch_config_fetch_url() {
        let config = BatchTranscriptionConfig::new(TranscriptionConfig::new("en"))
            .with_fetch_url("https://example.com/audio.wav");

        let value = serde_json::to_value(&config).unwrap();
        assert_eq!(value["fetch_data"]["url"], "https://example.com/audio.wav");
    }

    #[test]
    fn test_batch_config_round_trip() {
        let config = BatchTranscriptionConfig::new(
            TranscriptionConfig::new("es").with_operating_point(OperatingPoint::Enhanced),
        )
        .with_translation(TranslationConfig::new(["en"]))
        .with_notification(NotificationConfig::new("https://example.com/callback"));

        let json = serde_json::to_string(&config).unwrap();
        let parsed: BatchTranscriptionConfig = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed, config);
    }

    #[test]
    fn test_translation_config() {
        let config = TranslationConfig::new(["de", "fr"]).with_partials();

        assert_eq!(config.target_languages, vec!["de", "fr"]);
        assert_eq!(config.enable_partials, Some(true));
    }
}
