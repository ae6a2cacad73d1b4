mod synth;
mod walk;

use anyhow::{Context, Result};
use beaconsonic::audio_data::{AudioDataLoader, SymphoniaLoader};
use beaconsonic::{
    BeaconCatalog, BeaconEngine, BeaconEngineDesc, Mixer, MixerCore, OutputStream,
    PositioningMode, Renderer,
};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use synth::SynthLoader;
use walk::Walk;

#[derive(Parser, Debug)]
#[command(name = "beaconsonic-demo", version, about = "Walk a listener past an audio beacon")]
struct Options {
    /// Synthesize tones instead of reading audio files
    #[arg(long)]
    synth: bool,
    /// Asset root for audio files
    #[arg(long, default_value = "assets")]
    assets: PathBuf,
    /// JSON catalog to use instead of the built-in voices
    #[arg(long)]
    catalog: Option<PathBuf>,
    /// Beacon voice (default: Current, or Proximity with --proximity)
    #[arg(long)]
    voice: Option<String>,
    /// Play near/far loops as the listener approaches
    #[arg(long)]
    proximity: bool,
    /// Number of 250 ms steps to walk
    #[arg(long, default_value_t = 120)]
    ticks: usize,
    /// Render without opening an output device
    #[arg(long)]
    silent: bool,
}

/// Drives the mixer core on a plain thread at roughly real-time pace.
fn spawn_silent_output(
    mut core: MixerCore,
    desc: &BeaconEngineDesc,
    running: Arc<AtomicBool>,
) -> std::thread::JoinHandle<()> {
    let mut buffer = vec![0.0f32; desc.block_size * desc.channels as usize];
    let period = Duration::from_secs_f64(desc.block_size as f64 / desc.sample_rate as f64);
    std::thread::spawn(move || {
        while running.load(Ordering::Relaxed) {
            core.render(&mut buffer);
            std::thread::sleep(period);
        }
    })
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let options = Options::parse();

    let default_voice = if options.proximity { "Proximity" } else { "Current" };
    let voice = options
        .voice
        .clone()
        .unwrap_or_else(|| default_voice.to_string());
    let desc = BeaconEngineDesc::default()
        .asset_root(options.assets.clone())
        .beacon_type(voice.clone());

    let catalog = match &options.catalog {
        Some(path) => BeaconCatalog::from_json_file(path)
            .with_context(|| format!("Failed to load catalog {}", path.display()))?,
        None => BeaconCatalog::builtin(),
    };
    log::info!("Voices: {}", catalog.names().collect::<Vec<_>>().join(", "));

    let loader: Arc<dyn AudioDataLoader> = if options.synth {
        Arc::new(SynthLoader)
    } else {
        Arc::new(SymphoniaLoader)
    };

    let (mixer, core) = Mixer::new(&desc)?;
    let mixer = Arc::new(mixer);

    let running = Arc::new(AtomicBool::new(true));
    let mut output = None;
    let mut silent_thread = None;
    if options.silent {
        silent_thread = Some(spawn_silent_output(core, &desc, running.clone()));
    } else {
        let mut stream = OutputStream::new(desc.clone())?;
        stream
            .start_mixer(core)
            .context("Failed to open the output device (try --silent)")?;
        output = Some(stream);
    }

    let renderer: Arc<dyn Renderer> = mixer.clone();
    let engine = BeaconEngine::new(desc, catalog, loader, renderer)
        .with_context(|| format!("Failed to create engine with voice '{}'", voice))?;

    let walk = Walk {
        beacon: (47.6215, -122.3480),
        start_distance: 60.0,
        approach_bearing: 0.0,
        speed: 4.0,
        tick: Duration::from_millis(250),
        ticks: options.ticks,
    };

    let mut mode = PositioningMode::localized(walk.beacon.0, walk.beacon.1);
    if options.proximity {
        mode = mode.with_proximity();
    }

    // Prime the listener so the first loop already matches the start position
    let (lat, lon, heading) = walk.listener_at(0);
    engine.set_listener(lat, lon, heading);

    let mut beacon = engine.create_beacon(mode, true)?;
    let offset = beacon.heading_offset(heading, lat, lon);
    beacon
        .init(offset, options.proximity, 48000, 2, 1)
        .context("Failed to start the beacon (missing assets? try --synth)")?;
    log::info!("{} playing {} ({:?})", beacon.id(), voice, beacon.state());

    walk.run(&engine, &mixer, &mut beacon)?;

    drop(beacon);
    running.store(false, Ordering::Relaxed);
    if let Some(mut stream) = output.take() {
        log::info!("Delivered {} frames", stream.frames_processed());
        stream.stop();
    }
    if let Some(handle) = silent_thread.take() {
        let _ = handle.join();
    }
    mixer.collect_released();
    log::info!("Done ({} mixer events dropped)", mixer.dropped_events());
    Ok(())
}
