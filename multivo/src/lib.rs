// SPDX-FileCopyrightText: 2025 Contributors to the multivo project.
// SPDX-License-Identifier: Apache-2.0

//! # multivo - multiple video outputs
//!
//! Delivers frames rendered by an external engine to one or more byte sinks
//! (encoder pipes, files, sockets), in order and with bounded memory,
//! optionally wrapped in a minimal YUV4MPEG2 (Y4M) container.
//!
//! ## Overview
//!
//! - **Clip**: a finite frame sequence with fixed metadata, implemented by the
//!   engine ([`Clip`], [`ClipInfo`])
//! - **Sink**: a labelled, cloneable handle to a writer; clones alias the same
//!   destination ([`Sink`])
//! - **Backlog**: the number of frames allowed in flight between the render
//!   workers and the writers
//!
//! ### Topologies
//!
//! - [`broadcast`] (SIMO): one clip, every frame written to every slot
//! - [`interleave`] (MIMO): `M` clips rendered round-robin, clip `i` written
//!   to slot `i`; shorter clips are padded so the schedule stays regular
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   render jobs   ┌─────────────┐  in order  ┌──────────────┐
//! │   Clip   │ ◄────────────── │ FrameStream │ ─────────► │ dispatch loop│
//! │ (engine) │  worker threads │  (backlog)  │            └──────┬───────┘
//! └──────────┘                 └─────────────┘                   │
//!                                                      header once per sink,
//!                                                      FRAME + payload + flush
//!                                                      once per slot
//! ```
//!
//! ## Examples
//!
//! ### Writing one clip to two files
//!
//! ```no_run
//! use multivo::{BlankClip, Sink, VideoFormat, broadcast};
//!
//! # fn main() -> Result<(), multivo::Error> {
//! let clip = BlankClip::new(VideoFormat::YUV420P10, 1920, 1080, 240);
//! let sinks = [Some(Sink::create("a.y4m")?), Some(Sink::create("b.y4m")?)];
//! broadcast(&clip, &sinks, true, None)?;
//! for sink in sinks.iter().flatten() {
//!     sink.close()?;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ### Two clips of different lengths, the shorter one written twice to one file
//!
//! ```no_run
//! use multivo::{BlankClip, Clip, Sink, VideoFormat, interleave};
//!
//! # fn main() -> Result<(), multivo::Error> {
//! let main = BlankClip::new(VideoFormat::YUV420P8, 1280, 720, 2000);
//! let preview = BlankClip::new(VideoFormat::YUV420P8, 640, 360, 1000);
//! let shared = Sink::create("preview.y4m")?;
//! let clips: [&dyn Clip; 3] = [&main, &preview, &preview];
//! let sinks = [
//!     Some(Sink::create("main.y4m")?),
//!     Some(shared.clone()),
//!     Some(shared),
//! ];
//! interleave(&clips, &sinks, true, None)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Threading
//!
//! Each call blocks its caller. Rendering runs on scoped worker threads that
//! never outlive the call; delivery to sinks happens on the calling thread,
//! one write at a time, so a slow sink throttles rendering through the
//! backlog. Independent calls may run concurrently on different threads.

mod clip;
mod config;
mod dispatch;
mod error;
mod schedule;
mod sink;
mod source;
mod testsrc;

pub mod y4m;

pub use clip::{Clip, ClipInfo, ColorFamily, FrameData, Rational, RenderError, VideoFormat};
pub use config::{DEFAULT_BACKLOG_PER_DESTINATION, Options};
pub use dispatch::{broadcast, broadcast_with, interleave, interleave_with};
pub use error::{Error, Result};
pub use schedule::{Schedule, Slot};
pub use sink::{Sink, SinkId, distinct};
pub use testsrc::BlankClip;
