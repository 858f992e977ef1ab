// Integration tests for post playback
//
// These tests drive a PlaybackSession against the simulated media provider
// on a paused tokio clock. They check lazy loading, play/pause toggling,
// completion and that the media resource is released exactly once.

use anyhow::Result;
use audio_first::config::PlaybackConfig;
use audio_first::{
    AudioUri, PlaybackSession, PlaybackState, SessionError, SimulatedMediaProvider,
};
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;

const TRACK: &str = "https://example.com/audio1.mp3";

fn provider() -> Arc<SimulatedMediaProvider> {
    Arc::new(
        SimulatedMediaProvider::new(PlaybackConfig::default().position_interval())
            .with_track(AudioUri::new(TRACK), 45.0),
    )
}

fn session(provider: &Arc<SimulatedMediaProvider>, uri: &str, duration: f64) -> PlaybackSession {
    PlaybackSession::new(
        AudioUri::new(uri),
        duration,
        provider.clone(),
        PlaybackConfig::default(),
    )
}

#[tokio::test(start_paused = true)]
async fn test_play_to_completion_and_replay() -> Result<()> {
    let provider = provider();
    let player = session(&provider, TRACK, 45.0);

    assert_eq!(player.state(), PlaybackState::Unloaded);
    assert_eq!(player.time_label(), "0:00 / 0:45");

    let snapshot = player.toggle_play_pause().await?;
    assert_eq!(snapshot.state, PlaybackState::Loaded);
    assert!(snapshot.is_playing);

    tokio::time::sleep(Duration::from_secs(10)).await;
    let position = player.position_seconds();
    assert!((9.5..=10.0).contains(&position), "position was {}", position);
    assert_eq!(player.time_label(), format!("0:{:02} / 0:45", position as u64));

    let mut updates = player.subscribe();
    updates.wait_for(|s| !s.is_playing).await?;

    // Completion rewinds in the same update that stops playback
    let finished = player.snapshot();
    assert_eq!(finished.state, PlaybackState::Loaded);
    assert!(!finished.is_playing);
    assert_eq!(finished.position_seconds, 0.0);
    assert_eq!(finished.progress(), 0.0);

    // Replaying reuses the loaded resource
    let snapshot = player.toggle_play_pause().await?;
    assert!(snapshot.is_playing);
    assert_eq!(provider.counters().acquired, 1);

    player.dispose();
    assert_eq!(provider.counters().released, 1);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_toggle_pauses_and_resumes_one_resource() -> Result<()> {
    let provider = provider();
    let player = session(&provider, TRACK, 45.0);

    player.toggle_play_pause().await?;
    tokio::time::sleep(Duration::from_secs(5)).await;

    let paused = player.toggle_play_pause().await?;
    assert!(!paused.is_playing);
    let held = paused.position_seconds;

    // Position holds while paused
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(player.position_seconds(), held);

    let resumed = player.toggle_play_pause().await?;
    assert!(resumed.is_playing);
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert!(player.position_seconds() > held);

    let counters = provider.counters();
    assert_eq!(counters.acquired, 1);
    assert_eq!(counters.released, 0);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_toggle_is_rejected() -> Result<()> {
    let provider = Arc::new(
        SimulatedMediaProvider::new(Duration::from_millis(250))
            .with_track(AudioUri::new(TRACK), 45.0)
            .with_load_delay(Duration::from_secs(1)),
    );
    let player = session(&provider, TRACK, 45.0);

    let (first, second) = tokio::join!(player.toggle_play_pause(), player.toggle_play_pause());

    assert!(first?.is_playing);
    assert_eq!(
        second,
        Err(SessionError::OperationInFlight("toggle play/pause"))
    );
    assert_eq!(provider.counters().acquired, 1);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_load_failure_stays_unloaded() -> Result<()> {
    let provider = provider();
    let player = session(&provider, "https://example.com/missing.mp3", 30.0);

    let result = player.toggle_play_pause().await;
    assert!(matches!(
        result,
        Err(SessionError::ResourceLoadFailed { ref uri, .. }) if uri == "https://example.com/missing.mp3"
    ));
    assert_eq!(player.state(), PlaybackState::Unloaded);
    assert!(!player.is_playing());
    assert_eq!(provider.counters().acquired, 0);

    // The session stays usable for another attempt
    assert!(matches!(
        player.toggle_play_pause().await,
        Err(SessionError::ResourceLoadFailed { .. })
    ));

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_load_times_out() -> Result<()> {
    let provider = Arc::new(
        SimulatedMediaProvider::new(Duration::from_millis(250))
            .with_track(AudioUri::new(TRACK), 45.0)
            .with_load_delay(Duration::from_secs(60)),
    );
    let player = session(&provider, TRACK, 45.0);

    assert!(matches!(
        player.toggle_play_pause().await,
        Err(SessionError::ResourceLoadFailed { ref reason, .. }) if reason.contains("timed out")
    ));
    assert_eq!(player.state(), PlaybackState::Unloaded);
    assert_eq!(provider.counters().acquired, 0);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_dispose_unloaded_touches_nothing() -> Result<()> {
    let provider = provider();
    let player = session(&provider, TRACK, 45.0);

    player.dispose();

    assert!(player.is_disposed());
    assert_eq!(provider.counters().operations, 0);
    assert_eq!(player.toggle_play_pause().await, Err(SessionError::Disposed));

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_dispose_loaded_releases_once() -> Result<()> {
    let provider = provider();
    let player = session(&provider, TRACK, 45.0);

    player.toggle_play_pause().await?;
    player.dispose();
    player.dispose();

    let counters = provider.counters();
    assert_eq!(counters.acquired, 1);
    assert_eq!(counters.released, 1);
    assert_eq!(player.state(), PlaybackState::Unloaded);
    assert!(!player.is_playing());

    // No events are applied after disposal
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(player.position_seconds(), 0.0);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_dispose_while_loading_releases_resource() -> Result<()> {
    let provider = Arc::new(
        SimulatedMediaProvider::new(Duration::from_millis(250))
            .with_track(AudioUri::new(TRACK), 45.0)
            .with_load_delay(Duration::from_secs(2)),
    );
    let player = session(&provider, TRACK, 45.0);

    let pending = tokio::spawn({
        let player = player.clone();
        async move { player.toggle_play_pause().await }
    });

    tokio::time::sleep(Duration::from_millis(500)).await;
    player.dispose();

    assert_eq!(pending.await?, Err(SessionError::Disposed));

    let counters = provider.counters();
    assert_eq!(counters.acquired, 1);
    assert_eq!(counters.released, 1);
    assert!(!player.is_playing());

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_dropping_last_handle_releases_resource() -> Result<()> {
    let provider = provider();
    let player = session(&provider, TRACK, 45.0);

    player.toggle_play_pause().await?;
    drop(player);

    assert_eq!(provider.counters().released, 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_stop_rewinds_without_unloading() -> Result<()> {
    let provider = provider();
    let player = session(&provider, TRACK, 45.0);

    assert!(matches!(
        player.stop().await,
        Err(SessionError::InvalidTransition { operation: "stop", .. })
    ));

    player.toggle_play_pause().await?;
    tokio::time::sleep(Duration::from_secs(5)).await;

    let stopped = player.stop().await?;
    assert_eq!(stopped.state, PlaybackState::Loaded);
    assert!(!stopped.is_playing);
    assert_eq!(stopped.position_seconds, 0.0);

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(player.position_seconds(), 0.0);

    let resumed = player.toggle_play_pause().await?;
    assert!(resumed.is_playing);
    assert_eq!(provider.counters().acquired, 1);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_progress_tracks_position() -> Result<()> {
    let provider = provider();
    let player = session(&provider, TRACK, 45.0);

    assert_eq!(player.progress(), 0.0);

    player.toggle_play_pause().await?;
    tokio::time::sleep(Duration::from_millis(9100)).await;
    let progress = player.progress();
    assert!((0.19..=0.21).contains(&progress), "progress was {}", progress);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_zero_duration_has_no_progress() -> Result<()> {
    let provider = provider();
    let player = session(&provider, TRACK, 0.0);

    assert_eq!(player.duration_seconds(), 0.0);
    assert_eq!(player.progress(), 0.0);

    player.toggle_play_pause().await?;
    tokio::time::sleep(Duration::from_secs(3)).await;

    // Position is clamped to the published duration
    assert_eq!(player.position_seconds(), 0.0);
    assert_eq!(player.progress(), 0.0);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_updates_stream_reports_changes() -> Result<()> {
    let provider = provider();
    let player = session(&provider, TRACK, 45.0);

    player.toggle_play_pause().await?;

    let updates: Vec<_> = player.updates().take(4).collect().await;
    assert_eq!(updates.len(), 4);
    assert!(updates.iter().all(|s| s.is_playing));
    assert!(updates
        .windows(2)
        .all(|pair| pair[0].position_seconds <= pair[1].position_seconds));
    assert!(updates[3].position_seconds > 0.0);

    Ok(())
}
