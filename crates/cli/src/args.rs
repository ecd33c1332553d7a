//! Command-line argument definitions
//!
//! Flags are translated into the library's configuration objects here, so
//! the handlers in `main.rs` only deal in library types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use skald::batch::OutputFormat;
use skald::config::{
    AudioEncoding, DiarizationMode, MaxDelayMode, OperatingPoint, PunctuationOverrides,
    TopicDetectionConfig, TranscriptionConfig, TranslationConfig,
};
use skald::settings::SslMode;

#[derive(Parser, Debug)]
#[command(
    name = "skald",
    version,
    about = "Real-time and batch transcription client for the Skald speech service"
)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(flatten)]
    pub connection: ConnectionArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Connection flags shared by every subcommand.
#[derive(Args, Debug)]
pub struct ConnectionArgs {
    /// Endpoint URL, overriding the profile and the built-in default
    #[arg(long, global = true)]
    pub url: Option<String>,

    /// API auth token
    #[arg(long, global = true, env = "SKALD_AUTH_TOKEN", hide_env_values = true)]
    pub auth_token: Option<String>,

    /// Exchange the token for a short-lived key before connecting
    #[arg(long, global = true)]
    pub generate_temp_token: bool,

    /// TLS behavior
    #[arg(long, global = true, value_enum, default_value = "regular")]
    pub ssl_mode: SslModeArg,

    /// Profile providing stored defaults
    #[arg(long, global = true, default_value = skald::profile::DEFAULT_PROFILE)]
    pub profile: String,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Transcribe audio in real time over a streaming session
    Transcribe(TranscribeArgs),

    /// Submit and manage batch transcription jobs
    #[command(subcommand)]
    Batch(BatchCommand),

    /// Manage stored profile defaults
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Args, Debug)]
pub struct TranscribeArgs {
    /// Audio file to stream, or "-" for stdin
    pub file: String,

    #[command(flatten)]
    pub recognition: RecognitionArgs,

    /// Treat the input as headerless PCM with this encoding
    /// (pcm_f32le, pcm_s16le, mulaw)
    #[arg(long, value_name = "ENCODING", value_parser = parse_encoding)]
    pub raw: Option<AudioEncoding>,

    /// Sample rate of raw audio, in Hz
    #[arg(long, default_value_t = 44100)]
    pub sample_rate: u32,

    /// Size of audio chunks to send, in bytes
    #[arg(long, default_value_t = 4096)]
    pub chunk_size: usize,

    /// Number of unacknowledged chunks that may be in flight
    #[arg(long, default_value_t = 512)]
    pub buffer_size: usize,
}

/// Recognition flags shared by real-time and batch submission.
#[derive(Args, Debug)]
pub struct RecognitionArgs {
    /// Transcription language
    #[arg(long, default_value = "en")]
    pub lang: String,

    /// Locale used to spell the output, e.g. en-GB
    #[arg(long)]
    pub output_locale: Option<String>,

    /// Accuracy/latency profile
    #[arg(long, value_enum)]
    pub operating_point: Option<OperatingPointArg>,

    /// Receive partial (provisional) transcripts
    #[arg(long)]
    pub enable_partials: bool,

    /// Speaker attribution mode
    #[arg(long, value_enum)]
    pub diarization: Option<DiarizationArg>,

    /// Upper bound on transcript delay, in seconds
    #[arg(long)]
    pub max_delay: Option<f64>,

    /// Strictness of the max-delay bound
    #[arg(long, value_enum)]
    pub max_delay_mode: Option<MaxDelayModeArg>,

    /// Mark up entities (dates, numbers, ...) in results
    #[arg(long)]
    pub enable_entities: bool,

    /// Translate into these languages (comma separated)
    #[arg(long = "translation-langs", value_delimiter = ',')]
    pub translation_langs: Vec<String>,

    /// Punctuation marks the server may emit (comma separated)
    #[arg(long, value_delimiter = ',')]
    pub punctuation_permitted_marks: Option<Vec<String>>,

    /// Aggressiveness of punctuation insertion (0.0 - 1.0)
    #[arg(long)]
    pub punctuation_sensitivity: Option<f64>,
}

impl RecognitionArgs {
    /// Fold the flags into a transcription config.
    pub fn to_transcription_config(&self) -> TranscriptionConfig {
        let mut config = TranscriptionConfig::new(self.lang.clone());
        config.output_locale = self.output_locale.clone();
        config.operating_point = self.operating_point.map(Into::into);
        config.diarization = self.diarization.map(Into::into);
        config.max_delay = self.max_delay;
        config.max_delay_mode = self.max_delay_mode.map(Into::into);

        if self.enable_partials {
            config.enable_partials = Some(true);
        }
        if self.enable_entities {
            config.enable_entities = Some(true);
        }

        if !self.translation_langs.is_empty() {
            let mut translation = TranslationConfig::new(self.translation_langs.clone());
            if self.enable_partials {
                translation = translation.with_partials();
            }
            config.translation_config = Some(translation);
        }

        if self.punctuation_permitted_marks.is_some() || self.punctuation_sensitivity.is_some() {
            config.punctuation_overrides = Some(PunctuationOverrides {
                permitted_marks: self.punctuation_permitted_marks.clone(),
                sensitivity: self.punctuation_sensitivity,
            });
        }

        config
    }
}

#[derive(Subcommand, Debug)]
pub enum BatchCommand {
    /// Submit a job and wait for the transcript
    Transcribe(BatchTranscribeArgs),

    /// Submit a job and print its id
    Submit(BatchSubmitArgs),

    /// Print the status of a job
    JobStatus {
        /// ID of a previously submitted job
        #[arg(long)]
        job_id: String,
    },

    /// Fetch the transcript of a completed job
    GetResults {
        /// ID of a previously submitted job
        #[arg(long)]
        job_id: String,

        /// Transcript format: txt, srt or json-v2
        #[arg(long, default_value = "txt", value_parser = parse_output_format)]
        output_format: OutputFormat,
    },

    /// Delete a job and its results
    DeleteJob {
        /// ID of a previously submitted job
        #[arg(long)]
        job_id: String,

        /// Also terminate the job if it is still running
        #[arg(long)]
        force: bool,
    },

    /// List your jobs
    ListJobs,
}

#[derive(Args, Debug)]
pub struct BatchSubmitArgs {
    /// Audio file to upload
    pub file: Option<PathBuf>,

    /// Have the service fetch the audio from this URL instead of uploading
    #[arg(long)]
    pub fetch_url: Option<String>,

    #[command(flatten)]
    pub recognition: RecognitionArgs,

    /// Summarize the transcript when done
    #[arg(long)]
    pub summarize: bool,

    /// Run sentiment analysis over the transcript
    #[arg(long)]
    pub sentiment_analysis: bool,

    /// Detect topics, optionally restricted to a comma-separated list
    #[arg(long, value_delimiter = ',', num_args = 0.., value_name = "TOPICS")]
    pub detect_topics: Option<Vec<String>>,

    /// Notify this URL when the job completes
    #[arg(long)]
    pub notify_url: Option<String>,
}

impl BatchSubmitArgs {
    /// Fold the flags into a batch job config.
    pub fn to_batch_config(&self) -> skald::config::BatchTranscriptionConfig {
        let mut transcription = self.recognition.to_transcription_config();
        // Translation is a job-level concern for batch
        let translation = transcription.translation_config.take();

        let mut config = skald::config::BatchTranscriptionConfig::new(transcription);
        config.translation_config = translation;

        if let Some(url) = &self.fetch_url {
            config = config.with_fetch_url(url.clone());
        }
        if self.summarize {
            config.summarization_config = Some(Default::default());
        }
        if self.sentiment_analysis {
            config = config.with_sentiment_analysis();
        }
        if let Some(topics) = &self.detect_topics {
            config.topic_detection_config = Some(TopicDetectionConfig {
                topics: if topics.is_empty() {
                    None
                } else {
                    Some(topics.clone())
                },
            });
        }
        if let Some(url) = &self.notify_url {
            config = config.with_notification(skald::config::NotificationConfig::new(url.clone()));
        }

        config
    }
}

#[derive(Args, Debug)]
pub struct BatchTranscribeArgs {
    #[command(flatten)]
    pub submit: BatchSubmitArgs,

    /// Transcript format: txt, srt or json-v2
    #[arg(long, default_value = "txt", value_parser = parse_output_format)]
    pub output_format: OutputFormat,

    /// Give up waiting after this many seconds (the job keeps running)
    #[arg(long, default_value_t = 3600)]
    pub timeout: u64,

    /// Seconds between status checks
    #[arg(long, default_value_t = 15)]
    pub poll_interval: u64,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Store defaults in the profile file. Values come from the shared
    /// flags (--auth-token, --generate-temp-token) and the ones below.
    Set(ConfigSetArgs),

    /// Remove stored defaults from the profile file.
    /// Fields: auth-token, realtime-url, batch-url, generate-temp-token
    Unset {
        /// Fields to remove
        #[arg(required = true)]
        fields: Vec<String>,
    },
}

#[derive(Args, Debug)]
pub struct ConfigSetArgs {
    /// Default real-time endpoint URL
    #[arg(long)]
    pub realtime_url: Option<String>,

    /// Default batch endpoint URL
    #[arg(long)]
    pub batch_url: Option<String>,
}

// ============================================================================
// Value enums bridging clap and the library types
// ============================================================================

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SslModeArg {
    Regular,
    Insecure,
    None,
}

impl From<SslModeArg> for SslMode {
    fn from(value: SslModeArg) -> Self {
        match value {
            SslModeArg::Regular => SslMode::Regular,
            SslModeArg::Insecure => SslMode::Insecure,
            SslModeArg::None => SslMode::None,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatingPointArg {
    Standard,
    Enhanced,
}

impl From<OperatingPointArg> for OperatingPoint {
    fn from(value: OperatingPointArg) -> Self {
        match value {
            OperatingPointArg::Standard => OperatingPoint::Standard,
            OperatingPointArg::Enhanced => OperatingPoint::Enhanced,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiarizationArg {
    None,
    Speaker,
}

impl From<DiarizationArg> for DiarizationMode {
    fn from(value: DiarizationArg) -> Self {
        match value {
            DiarizationArg::None => DiarizationMode::None,
            DiarizationArg::Speaker => DiarizationMode::Speaker,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaxDelayModeArg {
    Fixed,
    Flexible,
}

impl From<MaxDelayModeArg> for MaxDelayMode {
    fn from(value: MaxDelayModeArg) -> Self {
        match value {
            MaxDelayModeArg::Fixed => MaxDelayMode::Fixed,
            MaxDelayModeArg::Flexible => MaxDelayMode::Flexible,
        }
    }
}

fn parse_encoding(s: &str) -> Result<AudioEncoding, String> {
    s.parse()
}

fn parse_output_format(s: &str) -> Result<OutputFormat, String> {
    s.parse()
}
