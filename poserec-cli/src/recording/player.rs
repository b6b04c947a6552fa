//! Playback session - loads a `.pose` file and plays it onto a renderer.

use log::{debug, error, info};
use poserec_core::{PlaybackState, PlaybackStatus, PlaybackTick, Player, PoseRenderer};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::{self, MissedTickBehavior};

use crate::config::PlayerSettings;

use super::file_store::load_track;
use super::SessionError;

/// A player bound to a loaded track file and a tick rate
pub struct PlaybackSession<R> {
    player: Player<R>,
    source: PathBuf,
    period: Duration,
}

impl<R: PoseRenderer> PlaybackSession<R> {
    /// Load the configured source. With `auto_start` set the first pose is
    /// applied right away.
    pub fn open(renderer: R, settings: &PlayerSettings) -> Result<Self, SessionError> {
        let source = settings.require_source()?.to_path_buf();
        let period = settings.tick_period()?;

        let track = load_track(&source)?;
        info!(
            "Loaded {}: {} frames, {:.3}s",
            source.display(),
            track.frame_count(),
            track.duration()
        );

        let mut session = Self {
            player: Player::with_track(renderer, track),
            source,
            period,
        };
        if settings.auto_start {
            session.start()?;
        }
        Ok(session)
    }

    pub fn player(&self) -> &Player<R> {
        &self.player
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn status(&self) -> PlaybackStatus {
        self.player.status()
    }

    /// Start, or restart, from the first frame
    pub fn start(&mut self) -> Result<(), SessionError> {
        self.player.start()?;
        debug!("Playback started: {}", self.source.display());
        Ok(())
    }

    /// Tick until the track finishes or `shutdown` completes. Starts playback
    /// first if it is not already running.
    ///
    /// Every tick advances the playback clock by exactly one tick period.
    pub async fn run<F>(&mut self, shutdown: F) -> Result<PlaybackStatus, SessionError>
    where
        F: Future<Output = ()>,
    {
        if !self.player.is_playing() {
            self.start()?;
        }

        let delta = self.period.as_secs_f64();
        let mut ticker = time::interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    self.player.stop();
                    info!(
                        "Playback stopped at frame {} of {}",
                        self.player.cursor().frame_index + 1,
                        self.player.frame_count()
                    );
                    break;
                }
                _ = ticker.tick() => {
                    match self.player.tick(delta) {
                        Ok(PlaybackTick::Applied { .. }) => {}
                        Ok(PlaybackTick::Finished) => {
                            info!(
                                "Playback finished: {} frames, {:.3}s",
                                self.player.frame_count(),
                                self.player.duration()
                            );
                            break;
                        }
                        Ok(PlaybackTick::Ignored) => break,
                        Err(e) => {
                            error!("{}: {}", self.source.display(), e);
                            return Err(e.into());
                        }
                    }
                }
            }
        }

        Ok(self.player.status())
    }

    /// Consume the session, returning the renderer
    pub fn into_renderer(self) -> R {
        self.player.into_renderer()
    }

    pub fn state(&self) -> PlaybackState {
        self.player.state()
    }
}
