use std::path::PathBuf;

use clap::Parser;
use windtrail::app::{App, Scene};
use windtrail::prelude::*;
use windtrail::time::FrameClock;

/// Wind-particle trails over a gridded vector field.
#[derive(Parser, Debug)]
#[command(name = "windtrail", version, about)]
struct Args {
    /// JSON configuration file (missing keys use defaults).
    #[arg(long)]
    config: Option<PathBuf>,

    /// JSON field dataset; a synthetic double gyre is used when omitted.
    #[arg(long)]
    field: Option<PathBuf>,

    /// Particle count, overriding the configuration.
    #[arg(long)]
    particles: Option<u32>,

    /// Image whose first row is used as the colour ramp.
    #[arg(long)]
    ramp: Option<PathBuf>,

    /// Render this many frames offscreen instead of opening a window.
    #[arg(long)]
    headless_frames: Option<u32>,

    /// PNG written by headless rendering.
    #[arg(long, default_value = "windtrail.png")]
    output: PathBuf,

    /// Offscreen width in pixels.
    #[arg(long, default_value_t = 1024)]
    width: u32,

    /// Offscreen height in pixels.
    #[arg(long, default_value_t = 512)]
    height: u32,

    /// Multiplier applied to every frame's time step.
    #[arg(long, default_value_t = 1.0)]
    time_scale: f32,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(err) = run(Args::parse()) {
        log::error!("{err}");
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => WindConfig::from_json_file(path)?,
        None => WindConfig::default(),
    };
    if let Some(count) = args.particles {
        config = config.with_particle_count(count);
        config.validate()?;
    }

    let dataset = match &args.field {
        Some(path) => FieldDataset::from_json_file(path)?,
        None => FieldDataset::double_gyre(128, 64, 4),
    };
    let fields = FieldEncoder::encode_series(&dataset.samples()?)?;

    let ramp = match &args.ramp {
        Some(path) => ColorRamp::from_image(path)?,
        None => ColorRamp::palette(config.palette),
    };

    let mut clock = FrameClock::new();
    clock.set_time_scale(args.time_scale);

    let scene = Scene { fields, config, ramp };
    match args.headless_frames {
        Some(frames) => {
            clock.set_fixed_delta(Some(1.0 / 60.0));
            render_headless(scene, clock, frames, &args)
        }
        None => App::run(scene, clock),
    }
}

fn render_headless(
    scene: Scene,
    mut clock: FrameClock,
    frames: u32,
    args: &Args,
) -> Result<(), Box<dyn std::error::Error>> {
    let ctx = GpuContext::headless()?;
    let target = OffscreenTarget::new(&ctx, args.width, args.height)?;
    let (width, height) = target.size();
    let mut pipeline = WindPipeline::new(
        &ctx,
        scene.fields,
        scene.config,
        &scene.ramp,
        OFFSCREEN_FORMAT,
        width,
        height,
    )?;

    for _ in 0..frames {
        pipeline.advance_and_render(&ctx, clock.tick(), &target.view);
    }

    target.to_image(&ctx)?.save(&args.output)?;
    log::info!("wrote {frames} frame(s) to {}", args.output.display());
    Ok(())
}
