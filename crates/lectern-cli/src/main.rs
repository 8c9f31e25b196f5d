//! lectern CLI — standalone narration engine.
//!
//! ```text
//! lectern serve [--port 2010] [--speech-url ...] [--voice Kore]
//! lectern read notes.md [--from 3]
//! lectern lesson "Photosynthesis" --chapter "Plant Biology" --subject bio
//! lectern play / pause / resume / stop / status [--server ...]
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use std::sync::Arc;

use lectern_lib::content::ContentClient;
use lectern_lib::lectern_core::types::{NarrationConfig, PlaybackState};
use lectern_lib::narrator::Narrator;
use lectern_lib::output::RodioOutput;
use lectern_lib::transport::HttpSpeechTransport;

/// lectern — AI-lesson narration with synced word highlighting
#[derive(Parser)]
#[command(name = "lectern", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the narration control server
    Serve {
        /// Listen port
        #[arg(long, default_value = "2010")]
        port: u16,
        /// Listen host
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        /// Speech synthesis endpoint
        #[arg(long, default_value = "http://localhost:3000/api/generateSpeech")]
        speech_url: String,
        /// Synthesis voice
        #[arg(long, default_value = "Kore")]
        voice: String,
        /// Playback rate
        #[arg(long, default_value = "1.0")]
        rate: f32,
    },
    /// Narrate a local markdown file to completion
    Read {
        /// Markdown file to narrate
        file: PathBuf,
        /// Segment index to start from
        #[arg(long, default_value = "0")]
        from: usize,
        #[arg(long, default_value = "http://localhost:3000/api/generateSpeech")]
        speech_url: String,
        #[arg(long, default_value = "Kore")]
        voice: String,
        #[arg(long, default_value = "1.0")]
        rate: f32,
    },
    /// Generate a lesson for a topic and narrate it
    Lesson {
        /// Topic title
        topic: String,
        #[arg(long)]
        chapter: String,
        #[arg(long)]
        subject: String,
        /// Content generation API base URL
        #[arg(long, default_value = "http://localhost:3000/api")]
        content_url: String,
        #[arg(long, default_value = "http://localhost:3000/api/generateSpeech")]
        speech_url: String,
        #[arg(long, default_value = "Kore")]
        voice: String,
        #[arg(long, default_value = "1.0")]
        rate: f32,
    },
    /// Start playback on a running server
    Play {
        #[arg(long, default_value = "http://localhost:2010")]
        server: String,
        #[arg(long, default_value = "0")]
        from: usize,
    },
    /// Pause playback on a running server
    Pause {
        #[arg(long, default_value = "http://localhost:2010")]
        server: String,
    },
    /// Resume playback on a running server
    Resume {
        #[arg(long, default_value = "http://localhost:2010")]
        server: String,
    },
    /// Stop playback on a running server
    Stop {
        #[arg(long, default_value = "http://localhost:2010")]
        server: String,
    },
    /// Get status from a running server
    Status {
        #[arg(long, default_value = "http://localhost:2010")]
        server: String,
    },
}

fn build_narrator(speech_url: String, voice: String, rate: f32) -> Narrator<HttpSpeechTransport> {
    let config = NarrationConfig {
        speech_url: speech_url.clone(),
        voice,
        rate,
        ..Default::default()
    };
    Narrator::new(
        config,
        HttpSpeechTransport::new(speech_url),
        Arc::new(RodioOutput::spawn()),
    )
}

/// Load text, play from `from`, and echo each segment as it becomes active
/// until the session runs out.
async fn narrate_to_end(narrator: &Narrator<HttpSpeechTransport>, text: &str, from: usize) {
    narrator.load_text(text);
    let segments = narrator.segments();
    if segments.is_empty() {
        eprintln!("nothing to narrate");
        return;
    }
    eprintln!("{} segments", segments.len());

    let mut status_rx = narrator.subscribe_status();
    narrator.play(from);

    let mut last_active: Option<usize> = None;
    loop {
        if status_rx.changed().await.is_err() {
            break;
        }
        let (state, active) = {
            let status = status_rx.borrow();
            (status.state, status.active_segment)
        };
        if active != last_active {
            if let Some(index) = active {
                println!("[{index}] {}", segments[index].text);
            }
            last_active = active;
        }
        if state == PlaybackState::Idle && active.is_none() {
            break;
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve {
            port,
            host,
            speech_url,
            voice,
            rate,
        } => {
            let narrator = build_narrator(speech_url, voice, rate);
            let app = lectern_lib::server::router(narrator);

            let addr = format!("{host}:{port}");
            eprintln!("lectern listening on {addr}");

            let listener = tokio::net::TcpListener::bind(&addr)
                .await
                .expect("failed to bind");

            axum::serve(listener, app).await.expect("server error");
        }

        Command::Read {
            file,
            from,
            speech_url,
            voice,
            rate,
        } => {
            let text = std::fs::read_to_string(&file).unwrap_or_else(|e| {
                eprintln!("cannot read {}: {e}", file.display());
                std::process::exit(1);
            });
            let narrator = build_narrator(speech_url, voice, rate);
            narrate_to_end(&narrator, &text, from).await;
        }

        Command::Lesson {
            topic,
            chapter,
            subject,
            content_url,
            speech_url,
            voice,
            rate,
        } => {
            let content = ContentClient::new(content_url);
            let text = match content.lesson(&topic, &chapter, &subject).await {
                Ok(text) => text,
                Err(e) => {
                    eprintln!("lesson generation failed: {e}");
                    std::process::exit(1);
                }
            };
            let narrator = build_narrator(speech_url, voice, rate);
            narrate_to_end(&narrator, &text, 0).await;
        }

        Command::Play { server, from } => {
            let resp = reqwest::Client::new()
                .post(format!("{server}/play"))
                .json(&serde_json::json!({ "from": from }))
                .send()
                .await
                .expect("request failed");
            println!("{}", resp.text().await.unwrap_or_default());
        }

        Command::Pause { server } => post_simple(&server, "pause").await,
        Command::Resume { server } => post_simple(&server, "resume").await,
        Command::Stop { server } => post_simple(&server, "stop").await,

        Command::Status { server } => {
            let resp = reqwest::Client::new()
                .get(format!("{server}/status"))
                .send()
                .await
                .expect("request failed");
            println!("{}", resp.text().await.unwrap_or_default());
        }
    }
}

async fn post_simple(server: &str, endpoint: &str) {
    let resp = reqwest::Client::new()
        .post(format!("{server}/{endpoint}"))
        .json(&serde_json::json!({}))
        .send()
        .await
        .expect("request failed");
    println!("{}", resp.text().await.unwrap_or_default());
}
