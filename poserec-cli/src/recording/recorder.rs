//! Recording session - samples a motion source on a timer and saves to a file.

use log::{debug, info, warn};
use poserec_core::{
    codec, MotionSource, RecordError, RecordTick, Recorder, RecordingStatus, SaveSummary,
};
use std::future::Future;
use std::time::Duration;
use tokio::time::{self, MissedTickBehavior};

use crate::config::RecorderSettings;

use super::file_store::FileSink;
use super::SessionError;

/// Log progress every this many frames
const PROGRESS_INTERVAL: u32 = 250;

/// A recorder bound to a file destination and a sampling rate
pub struct RecordingSession<S> {
    recorder: Recorder<S, FileSink>,
    period: Duration,
}

impl<S: MotionSource> RecordingSession<S> {
    /// Create a session from settings. Fails if no destination is configured
    /// or the sample rate is invalid.
    pub fn new(source: S, settings: &RecorderSettings) -> Result<Self, SessionError> {
        let destination = settings.require_destination()?;
        let period = settings.sample_period()?;

        let mut recorder = Recorder::with_destination(source, FileSink::new(destination));
        recorder.set_frame_limit(settings.frame_limit);

        Ok(Self { recorder, period })
    }

    pub fn recorder(&self) -> &Recorder<S, FileSink> {
        &self.recorder
    }

    /// Time between two samples
    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn status(&self) -> RecordingStatus {
        self.recorder.status()
    }

    /// Record until the frame limit is reached or `shutdown` completes, then
    /// save. A failed save is retried once.
    ///
    /// Every tick advances the recording clock by exactly one sample period,
    /// regardless of scheduling jitter.
    pub async fn run<F>(&mut self, shutdown: F) -> Result<SaveSummary, SessionError>
    where
        F: Future<Output = ()>,
    {
        self.recorder.start()?;
        info!(
            "Recording to {} at {:.1} Hz{}",
            self.recorder.status().destination.unwrap_or_default(),
            1.0 / self.period.as_secs_f64(),
            match self.recorder.frame_limit() {
                Some(limit) => format!(", stopping after {} frames", limit),
                None => String::new(),
            }
        );

        let delta = self.period.as_secs_f64();
        let mut ticker = time::interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately, the start() sample covers it
        ticker.tick().await;

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Recording stopped after {} frames", self.recorder.frame_count());
                    break;
                }
                _ = ticker.tick() => {
                    match self.recorder.tick(delta) {
                        Ok(RecordTick::Captured { frame, timestamp }) => {
                            if frame % PROGRESS_INTERVAL == 0 {
                                debug!("Captured frame {} at {:.3}s", frame, timestamp);
                            }
                        }
                        Ok(RecordTick::LimitReached(summary)) => {
                            info!("Frame limit reached");
                            return Ok(self.saved(summary));
                        }
                        Ok(RecordTick::Ignored) => break,
                        Err(RecordError::Write { destination, source }) => {
                            warn!("Failed to save recording to {}: {}, retrying", destination, source);
                            return self.stop_once();
                        }
                        Err(e) => return Err(e.into()),
                    }
                }
            }
        }

        self.stop_with_retry()
    }

    fn stop_with_retry(&mut self) -> Result<SaveSummary, SessionError> {
        match self.recorder.stop() {
            Err(RecordError::Write {
                destination,
                source,
            }) => {
                warn!(
                    "Failed to save recording to {}: {}, retrying",
                    destination, source
                );
                self.stop_once()
            }
            other => self.finish(other),
        }
    }

    fn stop_once(&mut self) -> Result<SaveSummary, SessionError> {
        let result = self.recorder.stop();
        self.finish(result)
    }

    fn finish(
        &mut self,
        result: Result<Option<SaveSummary>, RecordError>,
    ) -> Result<SaveSummary, SessionError> {
        match result? {
            Some(summary) => Ok(self.saved(summary)),
            // Already idle, nothing was pending
            None => Ok(SaveSummary {
                frame_count: self.recorder.track().frame_count(),
                duration: self.recorder.track().duration(),
                size_bytes: codec::encoded_len(self.recorder.track()),
            }),
        }
    }

    fn saved(&self, summary: SaveSummary) -> SaveSummary {
        info!(
            "Recording saved: {} frames, {:.3}s, {} bytes to {}",
            summary.frame_count,
            summary.duration,
            summary.size_bytes,
            self.recorder
                .destination()
                .map(|d| d.path().display().to_string())
                .unwrap_or_default()
        );
        summary
    }
}
