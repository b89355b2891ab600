use ai_video_studio::config::{
    AspectRatio, DEFAULT_SCENES, Mode, RunConfig, Voice, default_output_path,
};
use ai_video_studio::generator::run_generation;
use ai_video_studio::init;
use clap::Parser;
use std::path::PathBuf;
use tracing::{Level, error};

#[derive(Parser, Debug)]
#[command(name = "studio-cli")]
#[command(about = "Draft, voice, illustrate and assemble a short AI video from a topic", long_about = None)]
struct Args {
    /// Topic of the video
    #[arg(short, long, default_value = "The history of coffee")]
    topic: String,

    #[arg(short, long, value_enum, default_value_t = Mode::Slideshow)]
    mode: Mode,

    #[arg(short, long, value_enum, default_value_t = AspectRatio::Portrait)]
    aspect: AspectRatio,

    /// Number of scenes (ignored in quick-loop mode)
    #[arg(short, long, default_value_t = DEFAULT_SCENES)]
    scenes: u32,

    #[arg(long, value_enum, default_value_t = Voice::Onyx)]
    voice: Voice,

    /// Background music file to use instead of generating one
    #[arg(long)]
    music: Option<PathBuf>,

    /// Don't burn subtitles into the video
    #[arg(long)]
    no_subtitles: bool,

    /// Output video path (defaults to a timestamped name)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// JSON config with credentials and provider settings
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Leave the per-run scratch directory on disk
    #[arg(long)]
    keep_scratch: bool,

    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::INFO })
        .init();

    let cfg = init::load_config(args.config.as_deref()).await?;

    let run = RunConfig {
        scenes: args.scenes,
        aspect: args.aspect,
        voice: args.voice,
        subtitles: !args.no_subtitles,
        music_upload: args.music,
        keep_scratch: args.keep_scratch,
        ..RunConfig::new(
            args.topic,
            args.mode,
            args.output.unwrap_or_else(default_output_path),
        )
    };

    match run_generation(&cfg, &run).await {
        Ok(path) => {
            println!("{}", path.display());
            Ok(())
        }
        Err(err) => {
            error!("{}", err);
            std::process::exit(1);
        }
    }
}
