use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use depth_point_cloud::io::{object_from_json, write_ply, write_raw_depth};
use depth_point_cloud::source::{ReplaySource, SimulatedSource};
use depth_point_cloud::visualization::write_depth_preview;
use depth_point_cloud::{
    CaptureSession, Channel, ColorFrame, DepthPipeline, DepthSource, FrameSink, GridSize, Output,
    PipelineConfig, RawDepthFrame, ReprojectError, open_source,
};
use indicatif::ProgressBar;
use log::{info, warn};
use parking_lot::Mutex;

#[derive(Parser)]
#[command(version, about, author)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record simulated raw depth frames
    Generate {
        /// Output directory
        #[arg(short, long)]
        output: PathBuf,

        /// Number of frames to record
        #[arg(short, long, default_value = "30")]
        num_frames: u64,

        #[arg(long, default_value = "0")]
        seed: u64,

        #[arg(long, default_value = "640")]
        width: u32,

        #[arg(long, default_value = "480")]
        height: u32,
    },
    /// Replay recorded frames into PLY clouds and depth previews
    Reproject {
        /// Folder of recorded .depth frames
        input: PathBuf,

        /// Pipeline configuration JSON
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output directory, defaults to a timestamped one
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Run a capture session from a configuration and report throughput
    Run {
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Seconds to capture
        #[arg(short, long, default_value = "5")]
        seconds: u64,

        /// Publish triggers per second
        #[arg(long, default_value = "30")]
        publish_rate: u32,
    },
    /// Print the default configuration
    Config,
}

/// Writes every delivered depth frame to `folder`.
struct Recorder {
    folder: PathBuf,
    progress: ProgressBar,
    written: Mutex<u64>,
    failure: Mutex<Option<ReprojectError>>,
}

impl FrameSink for Recorder {
    fn on_depth(&self, frame: &RawDepthFrame) {
        let mut written = self.written.lock();
        let path = self.folder.join(format!("{:06}.depth", *written));
        match write_raw_depth(&path, frame) {
            Ok(()) => {
                *written += 1;
                self.progress.inc(1);
            }
            Err(e) => *self.failure.lock() = Some(e),
        }
    }

    fn on_color(&self, _frame: &ColorFrame) {}
}

fn local_stamp() -> String {
    let now =
        time::OffsetDateTime::now_local().unwrap_or_else(|_| time::OffsetDateTime::now_utc());
    format!(
        "{:04}{:02}{:02}_{:02}{:02}{:02}",
        now.year(),
        u8::from(now.month()),
        now.day(),
        now.hour(),
        now.minute(),
        now.second()
    )
}

fn load_config(path: Option<&Path>) -> Result<PipelineConfig, Box<dyn std::error::Error>> {
    Ok(match path {
        Some(p) => object_from_json(p)?,
        None => PipelineConfig::default(),
    })
}

fn generate(
    output: &Path,
    num_frames: u64,
    seed: u64,
    grid: GridSize,
) -> Result<(), Box<dyn std::error::Error>> {
    std::fs::create_dir_all(output)?;
    let mut source = SimulatedSource::new(grid, seed)?;
    source.max_frames = Some(num_frames);
    let recorder = Recorder {
        folder: output.to_path_buf(),
        progress: ProgressBar::new(num_frames),
        written: Mutex::new(0),
        failure: Mutex::new(None),
    };
    while source.process_events(&recorder)? {
        if let Some(e) = recorder.failure.lock().take() {
            return Err(e.into());
        }
    }
    recorder.progress.finish();
    info!(
        "recorded {} frames to {}",
        *recorder.written.lock(),
        output.display()
    );
    Ok(())
}

fn reproject(
    input: &Path,
    config: PipelineConfig,
    output: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    std::fs::create_dir_all(output)?;
    let mut source = ReplaySource::open(input)?;
    let config = PipelineConfig {
        grid: source.grid(),
        ..config
    };
    let pipeline = DepthPipeline::from_config(&config)?;
    pipeline.set_unique(true);

    let progress = ProgressBar::new(source.len() as u64);
    let mut frame = 0usize;
    let mut failure = None;
    while source.process_events(&pipeline)? {
        let mut sink = |out: Output<'_>| {
            let result = match out {
                Output::Cloud(cloud) => {
                    write_ply(&output.join(format!("{:06}.ply", frame)), cloud).map(|_| ())
                }
                Output::Depth(depth) => {
                    write_depth_preview(&output.join(format!("{:06}.png", frame)), depth)
                }
                Output::Color(_) => Ok(()),
            };
            if let Err(e) = result {
                failure = Some(e);
            }
        };
        pipeline.publish(&mut sink);
        if let Some(e) = failure.take() {
            return Err(e.into());
        }
        frame += 1;
        progress.inc(1);
    }
    progress.finish();
    info!(
        "reprojected {} frames into {} (last pass {:?})",
        frame,
        output.display(),
        pipeline.engine().last_pass_duration()
    );
    Ok(())
}

fn run(
    config: PipelineConfig,
    seconds: u64,
    publish_rate: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    let source = open_source(&config.source, config.grid)?;
    let pipeline = Arc::new(DepthPipeline::from_config(&config)?);
    let mut session = CaptureSession::new(source, pipeline.clone());

    #[cfg(feature = "visualization")]
    let recording = rerun::RecordingStreamBuilder::new("depth-point-cloud").spawn()?;

    session.start()?;
    let period = Duration::from_secs_f64(1.0 / publish_rate.max(1) as f64);
    let started = Instant::now();
    let mut counts = [0u64; 3];
    while started.elapsed() < Duration::from_secs(seconds) && session.is_running() {
        let mut sink = |out: Output<'_>| {
            #[cfg(feature = "visualization")]
            {
                let logged = match &out {
                    Output::Cloud(cloud) => depth_point_cloud::visualization::log_point_cloud(
                        &recording,
                        "/depth",
                        pipeline.engine().frames_processed(),
                        cloud,
                        None,
                    ),
                    Output::Depth(depth) => {
                        depth_point_cloud::visualization::log_depth(&recording, "/depth", depth)
                    }
                    Output::Color(_) => Ok(()),
                };
                if let Err(e) = logged {
                    warn!("rerun logging failed: {}", e);
                }
            }
            counts[match out.channel() {
                Channel::Color => 0,
                Channel::Depth => 1,
                Channel::Cloud => 2,
            }] += 1;
        };
        pipeline.publish(&mut sink);
        std::thread::sleep(period);
    }
    if !session.is_running() {
        warn!("source stopped before {} seconds elapsed", seconds);
    }
    let frames = session.stop()?;
    info!(
        "{} depth frames in {:.2} s; published color {}, depth {}, cloud {}",
        frames,
        started.elapsed().as_secs_f64(),
        counts[0],
        counts[1],
        counts[2]
    );
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    match args.command {
        Commands::Generate {
            output,
            num_frames,
            seed,
            width,
            height,
        } => generate(&output, num_frames, seed, GridSize::new(width, height)?)?,
        Commands::Reproject {
            input,
            config,
            output,
        } => {
            let config = load_config(config.as_deref())?;
            let output =
                output.unwrap_or_else(|| PathBuf::from(format!("reproject_{}", local_stamp())));
            reproject(&input, config, &output)?;
        }
        Commands::Run {
            config,
            seconds,
            publish_rate,
        } => run(load_config(config.as_deref())?, seconds, publish_rate)?,
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&PipelineConfig::default())?);
        }
    }
    Ok(())
}
