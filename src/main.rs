use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use parley::audio::{AudioCapture, PlaybackController};
use parley::services::{ChatBackend, ChatClient};
use parley::{Client, ClientEvent, Command as ClientCommand, Config};

/// Parley - voice and text chat client for a local assistant backend
#[derive(Parser)]
#[command(name = "parley", version, about)]
struct Cli {
    /// Backend base URL (overrides config file)
    #[arg(short, long, env = "PARLEY_BACKEND_URL")]
    backend: Option<String>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the interactive client (default)
    Run,
    /// Test microphone input
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
    /// Test speaker output
    TestSpeaker,
    /// Test the backend chat round-trip
    TestBackend {
        /// Message to send
        #[arg(default_value = "Hello! This is a connectivity test.")]
        text: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,parley=info",
        1 => "info,parley=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

#[allow(clippy::future_not_send)]
async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load();
    if let Some(backend) = cli.backend {
        config.backend_url = backend.trim_end_matches('/').to_string();
    }
    tracing::debug!(?config, "loaded configuration");

    match cli.command {
        Some(Command::TestMic { duration }) => test_mic(&config, duration).await,
        Some(Command::TestSpeaker) => test_speaker().await,
        Some(Command::TestBackend { text }) => test_backend(&config, &text).await,
        Some(Command::Run) | None => repl(config).await,
    }
}

/// Run the interactive client until EOF or /quit
#[allow(clippy::future_not_send)]
async fn repl(config: Config) -> anyhow::Result<()> {
    tracing::info!(backend = %config.backend_url, "starting parley");

    let client = Client::from_config(&config)?;
    let events = client.subscribe();

    println!("parley - type a message, /mic to toggle recording, /quit to exit");

    let (tx, rx) = mpsc::channel(8);
    std::thread::spawn(move || read_commands(&tx));
    tokio::spawn(print_events(events));

    client.run(rx).await;
    Ok(())
}

/// Translate stdin lines into client commands
///
/// Runs on a dedicated thread because stdin reads block.
fn read_commands(tx: &mpsc::Sender<ClientCommand>) {
    let stdin = std::io::stdin();
    let mut line = String::new();

    loop {
        line.clear();
        let Ok(n) = stdin.read_line(&mut line) else {
            break;
        };
        if n == 0 {
            break;
        }

        let input = line.trim();
        let command = match input {
            "" => continue,
            "/mic" | "/m" => ClientCommand::ToggleMic,
            "/stop" => ClientCommand::DisarmMic,
            "/quit" | "/q" | "/exit" => ClientCommand::Shutdown,
            "/help" => {
                println!("  /mic   toggle recording");
                println!("  /stop  finalize the current recording");
                println!("  /quit  exit");
                println!("  anything else is sent as a chat message");
                continue;
            }
            text => ClientCommand::SubmitText(text.to_string()),
        };

        let quit = matches!(command, ClientCommand::Shutdown);
        if tx.blocking_send(command).is_err() || quit {
            break;
        }
    }

    // EOF: ask the client to wind down
    let _ = tx.blocking_send(ClientCommand::Shutdown);
}

/// Print client events as they arrive
async fn print_events(mut events: tokio::sync::broadcast::Receiver<ClientEvent>) {
    use tokio::sync::broadcast::error::RecvError;

    loop {
        match events.recv().await {
            Ok(ClientEvent::RecordingStateChanged(true)) => {
                println!("[mic] recording, /mic again to send");
            }
            Ok(ClientEvent::RecordingStateChanged(false)) => {
                println!("[mic] stopped");
            }
            Ok(ClientEvent::PartialTranscript(text)) => {
                println!("[...] {text}");
            }
            Ok(ClientEvent::FinalTranscript(text)) => {
                println!("[you] {text}");
            }
            Ok(ClientEvent::ConversationChanged(turns)) => {
                if let Some(turn) = turns.last() {
                    if turn.speaker == parley::Speaker::Assistant && !turn.provisional {
                        println!("[assistant] {}", turn.text);
                    }
                }
            }
            Err(RecvError::Lagged(missed)) => {
                tracing::debug!(missed, "event printer lagged");
            }
            Err(RecvError::Closed) => break,
        }
    }
}

/// Test microphone input
#[allow(clippy::future_not_send)]
async fn test_mic(config: &Config, duration: u64) -> anyhow::Result<()> {
    println!("Testing microphone for {duration} seconds...");
    println!("Speak into your microphone!\n");

    let mut capture = AudioCapture::from_default_device(config.sample_rate);
    capture.arm()?;

    println!("Sample rate: {} Hz", capture.sample_rate());
    println!("---");

    let buffer = capture.buffer_handle();
    for i in 0..duration {
        tokio::time::sleep(Duration::from_secs(1)).await;

        let samples = buffer.lock().map(|b| b.snapshot()).unwrap_or_default();
        let energy = calculate_rms(&samples);
        let peak = samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max);

        // Visual meter
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let meter_len = (energy * 100.0).min(50.0) as usize;
        let meter: String = "█".repeat(meter_len) + &" ".repeat(50 - meter_len);

        println!(
            "[{:2}s] RMS: {:.4} | Peak: {:.4} | [{}]",
            i + 1,
            energy,
            peak,
            meter
        );

        // Meter covers one second at a time
        if let Ok(mut b) = buffer.lock() {
            b.clear();
        }
    }

    capture.disarm();

    println!("\n---");
    println!("If you saw movement in the meter, your mic is working!");
    println!("If RMS stayed near 0, check:");
    println!("  1. Is your mic plugged in?");
    println!("  2. Run: pactl info | grep 'Default Source'");
    println!("  3. Run: arecord -l (to list devices)");
    println!("  4. Try: pavucontrol (to check levels)");

    Ok(())
}

/// Calculate RMS energy
#[allow(clippy::cast_precision_loss)]
fn calculate_rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}

/// Test speaker output with a sine wave
async fn test_speaker() -> anyhow::Result<()> {
    println!("Testing speaker output...");
    println!("You should hear a 440Hz tone for 2 seconds\n");

    let mut playback = PlaybackController::from_default_device();

    // Generate 2 seconds of 440Hz sine wave at the 24kHz playback rate
    let sample_rate = 24000_i32;
    let frequency = 440.0_f32;
    let duration_secs = 2.0_f32;
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    let num_samples = (sample_rate as f32 * duration_secs) as usize;

    #[allow(clippy::cast_precision_loss)]
    let samples: Vec<f32> = (0..num_samples)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            (2.0 * std::f32::consts::PI * frequency * t).sin() * 0.3 // 30% volume
        })
        .collect();

    println!("Playing {} samples at {} Hz...", samples.len(), sample_rate);

    playback.play(samples)?;
    while playback.is_active() {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    playback.stop();

    println!("\n---");
    println!("If you heard the tone, your speakers are working!");
    println!("If you didn't hear anything, check:");
    println!("  1. Run: pactl info | grep 'Default Sink'");
    println!("  2. Run: pactl list sinks short");
    println!("  3. Try: pavucontrol (to check output levels)");

    Ok(())
}

/// Test the backend chat round-trip
async fn test_backend(config: &Config, text: &str) -> anyhow::Result<()> {
    println!("Backend: {}", config.backend_url);
    println!("Sending: \"{text}\"\n");

    let chat = ChatClient::new(&config.backend_url, config.request_timeout)?;

    let started = Instant::now();
    let reply = chat.send(text).await?;
    let elapsed = started.elapsed();

    println!("Reply ({} ms): {reply}", elapsed.as_millis());
    println!("\n---");
    println!("If you got a reply, the backend is reachable and responding.");

    Ok(())
}
