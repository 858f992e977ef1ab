use anyhow::{Context, Result};
use audio_first::feed::catalog;
use audio_first::{
    AudioPost, Config, FeedPlayers, FileMediaProvider, MicrophoneArbiter, PlaybackSession,
    PlaybackState, RecorderBackend, RecordingSession, SimulatedCapabilities, SimulatedMicrophone,
};
use chrono::Utc;
use clap::{Parser, Subcommand};
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "audio-first", about = "Short-form audio feed, simulated audio backend")]
struct Cli {
    /// Config file path (extension optional)
    #[arg(long, default_value = "config/audio-first")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the posts in the feed
    Feed,
    /// Show a user's profile
    Profile { user_id: String },
    /// Play a post's audio
    Play {
        post_id: String,
        /// Pause after this many seconds instead of playing to the end
        #[arg(long)]
        seconds: Option<u64>,
    },
    /// Record a new post
    Record {
        #[arg(long, default_value_t = 5)]
        seconds: u64,
        #[arg(long)]
        caption: Option<String>,
        /// Throw the recording away instead of posting it
        #[arg(long)]
        discard: bool,
        /// Play the recording back from disk before posting
        #[arg(long)]
        replay: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.config)?;

    info!("Audio First v0.1.0");

    match cli.command {
        Command::Feed => show_feed(),
        Command::Profile { user_id } => show_profile(&user_id),
        Command::Play { post_id, seconds } => play_post(&cfg, &post_id, seconds).await,
        Command::Record {
            seconds,
            caption,
            discard,
            replay,
        } => record_post(&cfg, seconds, caption.as_deref(), discard, replay).await,
    }
}

fn print_post(post: &AudioPost) {
    println!(
        "[{}] {}  {}  {}",
        post.id,
        post.handle(),
        post.created_label(),
        post.duration_label()
    );
    if let Some(caption) = &post.caption {
        println!("    {}", caption);
    }
    println!("    ❤️ {}  💬 {}", post.likes, post.comment_count());
}

fn show_feed() -> Result<()> {
    for post in catalog::mock_posts(Utc::now()) {
        print_post(&post);
    }
    Ok(())
}

fn show_profile(user_id: &str) -> Result<()> {
    let profile = catalog::profile(user_id, Utc::now())
        .with_context(|| format!("No profile for user {}", user_id))?;

    println!("({}) {}", profile.user.initial(), profile.user.display_name);
    println!("@{}", profile.user.username);
    println!(
        "{} posts · {} followers · {} following",
        profile.post_count(),
        profile.user.followers,
        profile.user.following
    );
    for post in &profile.posts {
        print_post(post);
    }
    Ok(())
}

/// Print progress until playback completes or `limit` passes
async fn follow_playback(session: &PlaybackSession, limit: Option<Duration>) -> Result<()> {
    let updates = session.updates();
    tokio::pin!(updates);

    let follow = async {
        while let Some(snapshot) = updates.next().await {
            println!(
                "{}  {:>3.0}%",
                snapshot.time_label(),
                snapshot.progress() * 100.0
            );
            if snapshot.state == PlaybackState::Loaded && !snapshot.is_playing {
                break;
            }
        }
    };

    match limit {
        Some(limit) => {
            if tokio::time::timeout(limit, follow).await.is_err() {
                let paused = session.toggle_play_pause().await?;
                println!("Paused at {}", paused.time_label());
            }
        }
        None => follow.await,
    }
    Ok(())
}

async fn play_post(cfg: &Config, post_id: &str, seconds: Option<u64>) -> Result<()> {
    let posts = catalog::mock_posts(Utc::now());
    let post = posts
        .iter()
        .find(|post| post.id == post_id)
        .with_context(|| format!("No post with id {}", post_id))?;

    let provider = Arc::new(catalog::simulated_provider(
        &posts,
        cfg.playback.position_interval(),
    ));
    let mut players = FeedPlayers::new(provider, cfg.playback.clone());

    print_post(post);
    let session = players.player(post);
    session.toggle_play_pause().await?;
    follow_playback(&session, seconds.map(Duration::from_secs)).await?;

    players.dispose_all();
    Ok(())
}

fn render_bars(levels: &[f32]) -> String {
    const BARS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];
    levels
        .iter()
        .map(|level| {
            let index = (level.clamp(0.0, 1.0) * (BARS.len() - 1) as f32).round() as usize;
            BARS[index]
        })
        .collect()
}

async fn record_post(
    cfg: &Config,
    seconds: u64,
    caption: Option<&str>,
    discard: bool,
    replay: bool,
) -> Result<()> {
    let backend = RecorderBackend {
        capabilities: Arc::new(SimulatedCapabilities::granting()),
        microphone: Arc::new(SimulatedMicrophone::new(cfg.recording.recordings_dir())),
        arbiter: MicrophoneArbiter::new(),
    };
    let session = RecordingSession::new(cfg.recording.clone(), cfg.waveform.clone(), backend);

    session.start().await?;
    for _ in 0..seconds {
        tokio::time::sleep(Duration::from_secs(1)).await;
        println!(
            "{:>6}  {}",
            session.time_elapsed(),
            render_bars(&session.waveform_levels())
        );
    }

    let uri = session.stop().await?;
    println!("Recorded {} ({})", uri, session.time_elapsed());

    if replay {
        let provider = Arc::new(FileMediaProvider::new(cfg.playback.position_interval()));
        let player = PlaybackSession::new(
            uri.clone(),
            session.elapsed_seconds() as f64,
            provider,
            cfg.playback.clone(),
        );
        player.toggle_play_pause().await?;
        follow_playback(&player, None).await?;
        player.dispose();
    }

    if discard {
        session.discard()?;
        println!("Recording discarded");
        return Ok(());
    }

    let draft = session.post(caption)?;
    let post = AudioPost::from_draft(draft, &catalog::mock_user(), Utc::now());
    println!("{}", serde_json::to_string_pretty(&post)?);

    session.dispose();
    Ok(())
}
