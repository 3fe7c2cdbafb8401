use std::path::PathBuf;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};

use speech_gateway::client::{GatewayClient, DEFAULT_BACKEND_URL};
use speech_gateway::{AudioFormat, SynthesisRequest};

/// Command-line client for the speech gateway.
#[derive(Parser, Debug)]
#[command(name = "speak", version)]
struct Cli {
    /// Gateway base URL
    #[arg(long, env = "BACKEND_URL", default_value = DEFAULT_BACKEND_URL)]
    backend_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check that the gateway is up
    Health,
    /// List voices grouped by language
    Voices,
    /// List language codes
    Languages,
    /// Synthesize text and write the audio to a file
    Say {
        /// Text to speak
        text: String,
        #[arg(short, long, default_value = "alloy")]
        voice: String,
        #[arg(short, long)]
        language: Option<String>,
        #[arg(short, long, default_value = "wav")]
        format: AudioFormat,
        #[arg(short, long)]
        speed: Option<f32>,
        #[arg(long, default_value = "tts-1")]
        model: String,
        /// Output file; defaults to speech_<language>_<voice>_<timestamp>.<ext>
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let client = GatewayClient::new(cli.backend_url);

    match cli.command {
        Command::Health => {
            let health = client
                .health()
                .await
                .with_context(|| format!("backend not available at {}", client.base_url()))?;
            println!(
                "{}: {} (v{}, engine {})",
                client.base_url(),
                health.status,
                health.version,
                health.engine
            );
        }
        Command::Voices => {
            for (language, voices) in client.voices_by_language().await? {
                println!("{}: {}", language, voices.join(", "));
            }
        }
        Command::Languages => {
            for language in client.languages().await? {
                println!("{}", language);
            }
        }
        Command::Say {
            text,
            voice,
            language,
            format,
            speed,
            model,
            out,
        } => {
            if text.trim().is_empty() {
                bail!("nothing to say");
            }

            let mut request = SynthesisRequest::new(text, voice).with_format(format);
            request.model = model;
            request.language = language;
            request.speed = speed;

            let started = Instant::now();
            let result = client.synthesize(&request).await?;
            let elapsed = started.elapsed();

            let path = match out {
                Some(path) => path,
                None => {
                    let language = match &request.language {
                        Some(language) => language.clone(),
                        None => voice_language(&client, &request.voice).await,
                    };
                    default_file_name(&language, &request.voice, result.format)
                }
            };
            std::fs::write(&path, &result.audio)
                .with_context(|| format!("failed to write {}", path.display()))?;

            println!(
                "Wrote {} bytes of {} to {} in {:.2}s",
                result.audio.len(),
                result.mime_type(),
                path.display(),
                elapsed.as_secs_f64()
            );
        }
    }

    Ok(())
}

async fn voice_language(client: &GatewayClient, voice: &str) -> String {
    client
        .voices()
        .await
        .ok()
        .and_then(|voices| voices.into_iter().find(|v| v.id == voice))
        .map(|v| v.language)
        .unwrap_or_else(|| "unknown".to_string())
}

fn default_file_name(language: &str, voice: &str, format: AudioFormat) -> PathBuf {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    PathBuf::from(format!(
        "speech_{}_{}_{}.{}",
        language,
        voice,
        timestamp,
        format.extension()
    ))
}
