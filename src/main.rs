use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use flowfield::Visualizer;

/// Audio-reactive particle flow field.
#[derive(Parser, Debug)]
#[command(name = "flowfield", version, about)]
struct Cli {
    /// Number of particles
    #[arg(short, long, default_value_t = 6200)]
    particles: usize,

    /// Positions kept per trail
    #[arg(short, long, default_value_t = 120)]
    trail: usize,

    /// Random seed for a reproducible run
    #[arg(short, long)]
    seed: Option<u64>,

    /// Open the default microphone on start
    #[arg(short, long)]
    mic: bool,

    /// Play an audio file on start
    #[arg(short, long, value_name = "PATH", conflicts_with = "mic")]
    audio: Option<PathBuf>,

    /// Window width in logical pixels
    #[arg(long, default_value_t = 1280)]
    width: u32,

    /// Window height in logical pixels
    #[arg(long, default_value_t = 720)]
    height: u32,

    /// Render headless and write a PNG here instead of opening a window
    #[arg(long, value_name = "PATH")]
    export: Option<PathBuf>,

    /// Frames to simulate before exporting
    #[arg(long, default_value_t = 300)]
    frames: u32,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let mut visualizer = Visualizer::new()
        .with_particles(cli.particles)
        .with_trail_length(cli.trail)
        .with_size(cli.width, cli.height)
        .with_microphone(cli.mic);
    if let Some(seed) = cli.seed {
        visualizer = visualizer.with_seed(seed);
    }
    if let Some(path) = cli.audio {
        visualizer = visualizer.with_audio_file(path);
    }

    let result = match cli.export {
        Some(path) => match visualizer.export(&path, cli.frames) {
            Ok(summary) => {
                println!(
                    "wrote {} ({}x{}, {} frames)",
                    summary.path.display(),
                    summary.width,
                    summary.height,
                    summary.frames
                );
                Ok(())
            }
            Err(e) => Err(e.to_string()),
        },
        None => visualizer.run().map_err(|e| e.to_string()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
