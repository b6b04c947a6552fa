//! # Poserec CLI
//!
//! Record full-body pose tracks to files and play them back.
//!
//! The crate is built on top of [`poserec_core`] for the pose model, the track
//! format and the recording and playback state machines, with [`tokio`]
//! driving the tick loops.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                      poserec-cli                        │
//! │  ┌─────────────┐  ┌──────────────────┐  ┌─────────────┐ │
//! │  │ Cli (clap)  │  │ Settings (json)  │  │ Recording   │ │
//! │  │             │  │ config dir       │  │ Manager     │ │
//! │  └──────┬──────┘  └────────┬─────────┘  └─────────────┘ │
//! │         ▼                  ▼                            │
//! │  ┌─────────────────────────────────────────────────────┐│
//! │  │   RecordingSession / PlaybackSession (tokio)        ││
//! │  │   - fixed-period ticks                              ││
//! │  │   - Ctrl-C stops and saves                          ││
//! │  └─────────────────────────────────────────────────────┘│
//! │         │                                               │
//! │         ▼                                               │
//! │  ┌─────────────────────────────────────────────────────┐│
//! │  │   FileSink / load_track                             ││
//! │  │   - implements poserec_core::TrackSink              ││
//! │  └─────────────────────────────────────────────────────┘│
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Key Components
//!
//! - [`config::Settings`] - Persistent recorder and player settings
//! - [`recording::RecordingSession`] - Samples a motion source on a timer
//! - [`recording::PlaybackSession`] - Plays a track file onto a renderer
//! - [`recording::RecordingManager`] - Lists, names and manages `.pose` files
//! - [`motion::SyntheticSource`] - Procedural motion for headless recording
//!
//! ## Command-Line Interface
//!
//! See [`Cli`] for all available options:
//!
//! - `poserec record [--name walk] [--frames 500]` - record synthetic motion
//! - `poserec play walk-Animation_20240101_120000` - play a recording
//! - `poserec list`, `info`, `rename`, `delete` - manage recordings
//! - `poserec settings [--save]` - show the effective settings
//! - `-v` / `-q` - more or less logging

use clap::{Args, Parser, Subcommand};
use std::num::NonZeroU32;
use std::path::PathBuf;

pub mod config;
pub mod motion;
pub mod recording;

use config::{PlayerSettings, RecorderSettings};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser, Clone, Debug)]
#[command(name = "poserec", version, about)]
pub struct Cli {
    #[clap(flatten)]
    pub verbose: clap_verbosity_flag::Verbosity<clap_verbosity_flag::InfoLevel>,

    /// Settings file, defaults to settings.json in the config directory
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Clone, Debug)]
pub enum Command {
    /// Record synthetic motion until Ctrl-C or the frame limit
    Record(RecordArgs),
    /// Play a recording
    Play(PlayArgs),
    /// List recordings, newest first
    List {
        /// Print JSON instead of a table
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Show details of a recording
    Info {
        /// Recording name or file path
        name: String,
    },
    /// Delete a recording
    Delete {
        name: String,
    },
    /// Rename a recording
    Rename {
        name: String,
        new_name: String,
    },
    /// Print the effective settings
    Settings {
        /// Also write them to the settings file
        #[arg(long, default_value_t = false)]
        save: bool,
    },
}

#[derive(Args, Clone, Debug, Default)]
pub struct RecordArgs {
    /// Output file, overrides the configured destination
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Name for a generated file in the recordings directory
    #[arg(short, long)]
    pub name: Option<String>,

    /// Stop after this many frames
    #[arg(short, long)]
    pub frames: Option<NonZeroU32>,

    /// Samples per second
    #[arg(short, long)]
    pub rate: Option<f64>,

    /// Stop after this many seconds
    #[arg(short, long)]
    pub seconds: Option<f64>,

    /// Joints per pose
    #[arg(short, long, default_value_t = motion::HUMANOID_JOINT_COUNT)]
    pub joints: usize,
}

impl RecordArgs {
    /// Apply the flags on top of the loaded settings
    pub fn apply(&self, settings: &mut RecorderSettings) {
        if let Some(output) = &self.output {
            settings.destination = Some(output.clone());
        }
        if self.frames.is_some() {
            settings.frame_limit = self.frames;
        }
        if let Some(rate) = self.rate {
            settings.sample_rate_hz = rate;
        }
    }
}

#[derive(Args, Clone, Debug, Default)]
pub struct PlayArgs {
    /// Recording name or file path, overrides the configured source
    pub source: Option<String>,

    /// Ticks per second
    #[arg(short, long)]
    pub rate: Option<f64>,
}

impl PlayArgs {
    /// Apply the flags on top of the loaded settings. `resolve` maps a name
    /// or path given on the command line to a file.
    pub fn apply<F>(&self, settings: &mut PlayerSettings, resolve: F)
    where
        F: FnOnce(&str) -> PathBuf,
    {
        if let Some(source) = &self.source {
            settings.source = Some(resolve(source));
        }
        if let Some(rate) = self.rate {
            settings.tick_rate_hz = rate;
        }
    }
}
