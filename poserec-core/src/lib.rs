//! # Poserec Core
//!
//! Platform-independent pose track recording and playback.
//!
//! This crate contains the pose data model, the binary track format and the
//! recording and playback state machines with **zero I/O dependencies**. The
//! motion source, the target skeleton and the storage destination are plugged
//! in through the traits in [`capture`].
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  poserec-core (platform-independent, no tokio/log deps)     │
//! │  ├── pose/      (sample type, interpolation)                │
//! │  ├── track/     (time-keyed pose collection)                │
//! │  ├── codec/     (binary track format)                       │
//! │  ├── recorder/  (tick-driven capture state machine)         │
//! │  ├── player/    (tick-driven playback state machine)        │
//! │  └── capture/   (MotionSource, PoseRenderer, TrackSink)     │
//! └─────────────────────────────────────────────────────────────┘
//!                              ▲
//!                 ┌────────────┴────────────┐
//!                 │  poserec-cli            │
//!                 │  (FileSink, sessions)   │
//!                 └─────────────────────────┘
//! ```
//!
//! Data flows one way:
//!
//! ```text
//! MotionSource → Recorder → PoseTrack → codec → storage
//! storage → codec → PoseTrack → Player → PoseRenderer
//! ```
//!
//! ## Example
//!
//! ```rust
//! use poserec_core::{codec, Player, Pose, Recorder};
//!
//! let mut recorder = Recorder::with_destination(|| Pose::rest(3), Vec::new());
//! recorder.start().unwrap();
//! for _ in 0..10 {
//!     recorder.tick(0.02).unwrap();
//! }
//! recorder.stop().unwrap();
//!
//! let bytes = recorder.destination().unwrap();
//! let track = codec::decode(bytes).unwrap();
//! assert_eq!(track.frame_count(), 10);
//!
//! let mut player = Player::with_track(|_: &Pose| {}, track);
//! player.start().unwrap();
//! while player.is_playing() {
//!     player.tick(0.02).unwrap();
//! }
//! ```

pub mod capture;
pub mod codec;
pub mod error;
pub mod player;
pub mod pose;
pub mod recorder;
pub mod track;

pub use capture::{MotionSource, PoseRenderer, TrackSink};
pub use error::{
    DecodeError, InterpolationError, PlaybackError, ReadError, RecordError, TrackError,
};
pub use player::{PlaybackCursor, PlaybackState, PlaybackStatus, PlaybackTick, Player};
pub use pose::Pose;
pub use recorder::{RecordTick, Recorder, RecordingState, RecordingStatus, SaveSummary};
pub use track::PoseTrack;
