//! `verdant` - render the demo scene to an image file.

use anyhow::{bail, Context, Result};
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use verdant_renderer::{EnvironmentMap, IntegratorKind, Pipeline, RenderConfig, Scene, SkyLight};

const USAGE: &str = "\
Usage: verdant [OPTIONS]

Options:
  -s, --samples <N>        Samples per pixel
  -o, --output <PATH>      Output image (.ppm, .png, ...)
      --width <N>          Image width in pixels
      --height <N>         Image height in pixels
      --threads <N>        Worker threads (default: all cores)
      --seed <N>           Seed for reproducible renders
      --integrator <KIND>  path | path_trace | direct | kajiya
      --hdr-sky <PATH>     Equirectangular environment map for the sky
      --config <FILE>      JSON render config; flags override its values
      --single <X> <Y>     Render one pixel and print its radiance
  -v, -vv                  Debug / trace logging
  -h, --help               Show this help";

/// Parsed command line. Every setting is optional so that only flags the
/// user passed override the config file.
#[derive(Debug, Default, PartialEq)]
struct Args {
    config: Option<PathBuf>,
    samples: Option<u32>,
    output: Option<PathBuf>,
    width: Option<u32>,
    height: Option<u32>,
    threads: Option<usize>,
    seed: Option<u64>,
    integrator: Option<IntegratorKind>,
    hdr_sky: Option<PathBuf>,
    single: Option<(u32, u32)>,
    verbosity: u8,
    help: bool,
}

impl Args {
    fn parse(args: impl IntoIterator<Item = String>) -> Result<Self> {
        let mut parsed = Args::default();
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            let mut value = |name: &str| {
                args.next()
                    .with_context(|| format!("missing value for {}", name))
            };
            match arg.as_str() {
                "-s" | "--samples" => parsed.samples = Some(parse_num(&arg, value(&arg)?)?),
                "-o" | "--output" => parsed.output = Some(PathBuf::from(value(&arg)?)),
                "--width" => parsed.width = Some(parse_num(&arg, value(&arg)?)?),
                "--height" => parsed.height = Some(parse_num(&arg, value(&arg)?)?),
                "--threads" => parsed.threads = Some(parse_num(&arg, value(&arg)?)?),
                "--seed" => parsed.seed = Some(parse_num(&arg, value(&arg)?)?),
                "--integrator" => parsed.integrator = Some(value(&arg)?.parse()?),
                "--hdr-sky" => parsed.hdr_sky = Some(PathBuf::from(value(&arg)?)),
                "--config" => parsed.config = Some(PathBuf::from(value(&arg)?)),
                "--single" => {
                    let x = parse_num(&arg, value(&arg)?)?;
                    let y = parse_num(&arg, value(&arg)?)?;
                    parsed.single = Some((x, y));
                }
                "-v" | "--verbose" => parsed.verbosity = parsed.verbosity.max(1),
                "-vv" | "--trace" => parsed.verbosity = 2,
                "-h" | "--help" => parsed.help = true,
                other => bail!("unknown argument '{}'\n\n{}", other, USAGE),
            }
        }

        Ok(parsed)
    }

    /// Overlay the flags that were given onto `config`.
    fn apply(&self, config: &mut RenderConfig) {
        if let Some(samples) = self.samples {
            config.samples_per_pixel = samples;
        }
        if let Some(output) = &self.output {
            config.output = output.clone();
        }
        if let Some(width) = self.width {
            config.width = width;
        }
        if let Some(height) = self.height {
            config.height = height;
        }
        if let Some(threads) = self.threads {
            config.worker_count = Some(threads);
        }
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
        if let Some(integrator) = self.integrator {
            config.integrator = integrator;
        }
        if let Some(hdr_sky) = &self.hdr_sky {
            config.hdr_sky = Some(hdr_sky.clone());
        }
    }

    fn log_level(&self) -> log::LevelFilter {
        match self.verbosity {
            0 => log::LevelFilter::Info,
            1 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    }
}

fn parse_num<T>(flag: &str, value: String) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .parse()
        .with_context(|| format!("invalid value '{}' for {}", value, flag))
}

fn main() -> Result<()> {
    let args = Args::parse(env::args().skip(1))?;
    if args.help {
        println!("{}", USAGE);
        return Ok(());
    }

    env_logger::Builder::from_default_env()
        .filter_level(args.log_level())
        .init();

    let mut config = match &args.config {
        Some(path) => RenderConfig::from_json_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => RenderConfig::default(),
    };
    args.apply(&mut config);
    config.validate()?;

    let mut scene = Scene::demo();
    if let Some(path) = &config.hdr_sky {
        let map = EnvironmentMap::load(path)
            .with_context(|| format!("failed to load HDR sky {}", path.display()))?;
        scene.set_sky_light(Some(SkyLight::Environment(Arc::new(map))));
    }

    let pipeline = Pipeline::with_config(config.clone()).with_scene(scene);

    if let Some((x, y)) = args.single {
        if x >= config.width || y >= config.height {
            bail!(
                "pixel ({}, {}) is outside the {}x{} image",
                x,
                y,
                config.width,
                config.height
            );
        }
        let li = pipeline.single_pixel(x, y);
        println!("{} {} {}", li.x, li.y, li.z);
        return Ok(());
    }

    let film = pipeline.render()?;
    film.save(&config.output, config.exposure, config.gamma)
        .with_context(|| format!("failed to write {}", config.output.display()))?;

    Ok(())
}
