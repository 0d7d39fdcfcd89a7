// SPDX-FileCopyrightText: 2025 Contributors to the multivo project.
// SPDX-License-Identifier: Apache-2.0

//! Writes synthetic clips to Y4M outputs.
//!
//! ```text
//! # one clip, two copies
//! cargo run --example y4m_fanout -- simo -o a.y4m -o b.y4m
//! # two clips of different lengths, one file each
//! cargo run --example y4m_fanout -- mimo -l 48 -l 24 -o long.y4m -o short.y4m
//! # pipe into an encoder
//! cargo run --example y4m_fanout -- simo -o - | x265 --y4m -o out.hevc -
//! ```

mod common;

use std::collections::HashMap;

use clap::{Args, Parser, Subcommand};
use multivo::{BlankClip, Clip, Options, Rational, Sink, VideoFormat};
use tracing::info;

#[derive(Parser, Debug)]
#[command(version, about = "Fan out synthetic clips to Y4M sinks", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Frame width in pixels.
    #[arg(long, default_value_t = 320, global = true)]
    width: usize,

    /// Frame height in pixels.
    #[arg(long, default_value_t = 240, global = true)]
    height: usize,

    /// Frame rate as NUM or NUM/DEN.
    #[arg(long, default_value = "24", global = true)]
    fps: String,

    /// Write raw frames without the Y4M header and markers.
    #[arg(long, global = true)]
    raw: bool,

    /// Maximum frames in flight (default: three per distinct output).
    #[arg(long, global = true)]
    backlog: Option<usize>,

    /// Render worker threads.
    #[arg(long, global = true, env = "MULTIVO_THREADS")]
    threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write one clip to every output.
    Simo(SimoArgs),
    /// Interleave several clips, clip N going to output N.
    Mimo(MimoArgs),
}

#[derive(Args, Debug)]
struct SimoArgs {
    /// Number of frames.
    #[arg(short, long, default_value_t = 48)]
    length: usize,

    /// Output path, `-` for stdout. Repeat for more outputs.
    #[arg(short, long = "output", required = true)]
    outputs: Vec<String>,
}

#[derive(Args, Debug)]
struct MimoArgs {
    /// Length of each clip, one per output.
    #[arg(short, long = "length", required = true)]
    lengths: Vec<usize>,

    /// Output path per clip, `-` for stdout, `none` to discard. Repeating a
    /// path makes the clips share that file.
    #[arg(short, long = "output", required = true)]
    outputs: Vec<String>,
}

fn parse_fps(fps: &str) -> Result<Rational, String> {
    let (num, den) = fps.split_once('/').unwrap_or((fps, "1"));
    let num = num.trim().parse().map_err(|e| format!("bad fps \"{fps}\": {e}"))?;
    let den = den.trim().parse().map_err(|e| format!("bad fps \"{fps}\": {e}"))?;
    Ok(Rational::new(num, den))
}

/// Opens each distinct path once so repeated paths alias one sink.
fn open_sinks(paths: &[String]) -> multivo::Result<Vec<Option<Sink>>> {
    let mut opened: HashMap<&str, Sink> = HashMap::new();
    paths
        .iter()
        .map(|path| {
            if path == "none" {
                return Ok(None);
            }
            if let Some(sink) = opened.get(path.as_str()) {
                return Ok(Some(sink.clone()));
            }
            let sink = if path == "-" {
                Sink::stdout()
            } else {
                Sink::create(path)?
            };
            opened.insert(path, sink.clone());
            Ok(Some(sink))
        })
        .collect()
}

fn close_all(sinks: &[Option<Sink>]) -> multivo::Result<()> {
    for sink in multivo::distinct(sinks) {
        sink.close()?;
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    common::setup_logging();
    let cli = Cli::parse();
    let fps = parse_fps(&cli.fps)?;
    let options = Options {
        y4m: !cli.raw,
        backlog: cli.backlog,
        threads: cli.threads,
    };
    let clip = |length| {
        BlankClip::new(VideoFormat::YUV420P8, cli.width, cli.height, length)
            .with_fps(fps)
            .with_frame_numbers()
    };

    match &cli.command {
        Command::Simo(args) => {
            let sinks = open_sinks(&args.outputs)?;
            multivo::broadcast_with(&clip(args.length), &sinks, &options)?;
            close_all(&sinks)?;
            info!("Wrote {} frame(s) to {} output(s)", args.length, sinks.len());
        }
        Command::Mimo(args) => {
            let clips: Vec<BlankClip> = args.lengths.iter().map(|&length| clip(length)).collect();
            let clips: Vec<&dyn Clip> = clips.iter().map(|c| c as &dyn Clip).collect();
            let sinks = open_sinks(&args.outputs)?;
            multivo::interleave_with(&clips, &sinks, &options)?;
            close_all(&sinks)?;
            info!("Interleaved {} clip(s)", clips.len());
        }
    }
    Ok(())
}
