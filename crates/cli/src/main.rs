//! Skald command-line interface
//!
//! Thin shell over the `skald` library: flags become configuration
//! objects, transcripts go to stdout, logs and partials go to stderr.

mod args;

use std::io::Write;
use std::time::Duration;

use anyhow::{Context, bail};
use clap::Parser;
use tokio::io::AsyncRead;
use tracing::warn;

use skald::batch::{AudioSource, BatchClient, OutputFormat, Transcript};
use skald::config::AudioSettings;
use skald::handlers::HandlerOutcome;
use skald::messages::{ServerMessage, ServerMessageKind};
use skald::profile::{Profile, ProfileStore};
use skald::realtime::RealtimeClient;
use skald::settings::{ConnectionSettings, UsageMode};

use args::{
    BatchCommand, BatchSubmitArgs, BatchTranscribeArgs, Cli, Command, ConfigCommand,
    ConnectionArgs, TranscribeArgs,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    skald::utils::logging::init_logging(cli.verbose);

    let store = match ProfileStore::load() {
        Ok(store) => store,
        Err(e) => {
            warn!("Could not load profiles: {e}");
            ProfileStore::default()
        }
    };
    let profile = store.get(&cli.connection.profile).cloned();

    match cli.command {
        Command::Transcribe(transcribe_args) => {
            run_transcribe(&cli.connection, profile.as_ref(), transcribe_args).await
        }
        Command::Batch(batch_command) => {
            run_batch(&cli.connection, profile.as_ref(), batch_command).await
        }
        Command::Config(config_command) => {
            run_config(&cli.connection, store, config_command)
        }
    }
}

/// Build connection settings from flags, profile and built-in defaults.
fn build_settings(
    usage: UsageMode,
    connection: &ConnectionArgs,
    profile: Option<&Profile>,
) -> ConnectionSettings {
    let mut settings =
        ConnectionSettings::with_defaults(usage, connection.auth_token.clone(), profile);
    if let Some(url) = &connection.url {
        settings.url = url.clone();
    }
    settings.ssl_mode = connection.ssl_mode.into();
    if connection.generate_temp_token {
        settings.generate_temp_token = true;
    }
    settings
}

// ============================================================================
// Real-time
// ============================================================================

async fn run_transcribe(
    connection: &ConnectionArgs,
    profile: Option<&Profile>,
    transcribe_args: TranscribeArgs,
) -> anyhow::Result<()> {
    let settings = build_settings(UsageMode::RealTime, connection, profile)
        .with_message_buffer_size(transcribe_args.buffer_size);

    let mut client = RealtimeClient::new(settings);
    add_printing_handlers(&mut client, transcribe_args.recognition.enable_partials);

    let config = transcribe_args.recognition.to_transcription_config();
    let audio_settings = match transcribe_args.raw {
        Some(encoding) => AudioSettings::raw(encoding, transcribe_args.sample_rate),
        None => AudioSettings::file(),
    }
    .with_chunk_size(transcribe_args.chunk_size);

    let audio: Box<dyn AsyncRead + Send + Unpin> = if transcribe_args.file == "-" {
        Box::new(tokio::io::stdin())
    } else {
        let file = tokio::fs::File::open(&transcribe_args.file)
            .await
            .with_context(|| format!("could not open {}", transcribe_args.file))?;
        Box::new(file)
    };

    client
        .run(audio, &config, &audio_settings)
        .await
        .context("transcription session failed")?;
    Ok(())
}

/// Print finals to stdout and, when enabled, partials to stderr.
///
/// Partials overwrite each other on one stderr line; each final clears
/// that line and appends to stdout.
fn add_printing_handlers(client: &mut RealtimeClient, partials: bool) {
    if partials {
        client.add_event_handler(ServerMessageKind::AddPartialTranscript, |message| {
            if let Some(text) = message.transcript() {
                eprint!("\r\x1b[2K{text}");
                let _ = std::io::stderr().flush();
            }
            HandlerOutcome::Continue
        });
    }

    client.add_event_handler(ServerMessageKind::AddTranscript, move |message| {
        if let Some(text) = message.transcript() {
            if partials {
                eprint!("\r\x1b[2K");
            }
            print!("{text}");
            let _ = std::io::stdout().flush();
        }
        HandlerOutcome::Continue
    });

    client.add_event_handler(ServerMessageKind::AddTranslation, |message| {
        if let ServerMessage::AddTranslation { language, results } = message {
            for result in results {
                println!("[{language}] {}", result.content);
            }
        }
        HandlerOutcome::Continue
    });

    client.add_event_handler(ServerMessageKind::EndOfTranscript, |_| {
        println!();
        HandlerOutcome::Continue
    });
}

// ============================================================================
// Batch
// ============================================================================

async fn run_batch(
    connection: &ConnectionArgs,
    profile: Option<&Profile>,
    batch_command: BatchCommand,
) -> anyhow::Result<()> {
    let settings = build_settings(UsageMode::Batch, connection, profile);
    let client = BatchClient::new(settings)?;

    match batch_command {
        BatchCommand::Transcribe(transcribe_args) => {
            batch_transcribe(&client, transcribe_args).await
        }
        BatchCommand::Submit(submit_args) => {
            let job_id = submit(&client, &submit_args).await?;
            println!("{job_id}");
            Ok(())
        }
        BatchCommand::JobStatus { job_id } => {
            let details = client.check_job_status(&job_id).await?;
            println!("{}", serde_json::to_string_pretty(&details)?);
            Ok(())
        }
        BatchCommand::GetResults {
            job_id,
            output_format,
        } => {
            let transcript = client.get_job_result(&job_id, output_format).await?;
            print_transcript(&transcript)?;
            Ok(())
        }
        BatchCommand::DeleteJob { job_id, force } => {
            let details = client.delete_job(&job_id, force).await?;
            println!("{}", serde_json::to_string_pretty(&details)?);
            Ok(())
        }
        BatchCommand::ListJobs => {
            let jobs = client.list_jobs().await?;
            println!("{}", serde_json::to_string_pretty(&jobs)?);
            Ok(())
        }
    }
}

async fn submit(client: &BatchClient, submit_args: &BatchSubmitArgs) -> anyhow::Result<String> {
    if submit_args.file.is_none() && submit_args.fetch_url.is_none() {
        bail!("provide an audio file or --fetch-url");
    }

    let audio = submit_args.file.as_ref().map(AudioSource::file);
    let config = submit_args.to_batch_config();

    let job_id = client.submit_job(audio, &config).await?;
    Ok(job_id)
}

async fn batch_transcribe(
    client: &BatchClient,
    transcribe_args: BatchTranscribeArgs,
) -> anyhow::Result<()> {
    let job_id = submit(client, &transcribe_args.submit).await?;
    eprintln!("submitted as job {job_id}");

    client
        .wait_for_completion(
            &job_id,
            Duration::from_secs(transcribe_args.timeout),
            Duration::from_secs(transcribe_args.poll_interval.max(1)),
        )
        .await?;

    let transcript = client
        .get_job_result(&job_id, transcribe_args.output_format)
        .await?;
    print_transcript(&transcript)?;
    Ok(())
}

fn print_transcript(transcript: &Transcript) -> anyhow::Result<()> {
    match transcript {
        Transcript::Json(value) => println!("{}", serde_json::to_string_pretty(value)?),
        Transcript::Text(text) => print!("{text}"),
    }
    let _ = std::io::stdout().flush();
    Ok(())
}

// ============================================================================
// Config
// ============================================================================

fn run_config(
    connection: &ConnectionArgs,
    mut store: ProfileStore,
    config_command: ConfigCommand,
) -> anyhow::Result<()> {
    let profile_name = connection.profile.as_str();

    match config_command {
        ConfigCommand::Set(set_args) => {
            let profile = store.get_or_create(profile_name);

            if let Some(token) = &connection.auth_token {
                profile.auth_token = Some(token.clone());
            }
            if connection.generate_temp_token {
                profile.generate_temp_token = Some(true);
            }
            if let Some(url) = &set_args.realtime_url {
                profile.realtime_url = Some(url.clone());
            }
            if let Some(url) = &set_args.batch_url {
                profile.batch_url = Some(url.clone());
            }

            if profile.is_empty() {
                bail!(
                    "nothing to store; pass --auth-token, --generate-temp-token, \
                     --realtime-url or --batch-url"
                );
            }

            store.save()?;
            println!(
                "Profile {:?} updated in {}",
                profile_name,
                ProfileStore::default_path()?.display()
            );
            Ok(())
        }
        ConfigCommand::Unset { fields } => {
            let profile = store.get_existing(profile_name)?;

            for field in &fields {
                match field.as_str() {
                    "auth-token" => profile.auth_token = None,
                    "realtime-url" => profile.realtime_url = None,
                    "batch-url" => profile.batch_url = None,
                    "generate-temp-token" => profile.generate_temp_token = None,
                    other => bail!(
                        "unknown field {other:?}; expected auth-token, realtime-url, \
                         batch-url or generate-temp-token"
                    ),
                }
            }

            store.prune(profile_name);
            store.save()?;
            println!("Profile {profile_name:?} updated");
            Ok(())
        }
    }
}
