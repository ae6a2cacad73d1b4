use anyhow::Result;
use beaconsonic::geometry;
use beaconsonic::{BeaconEngine, Mixer, MixerEvent, PositionedAudio};
use std::time::Duration;

/// A listener walking a straight line past a beacon while turning their head.
pub struct Walk {
    pub beacon: (f64, f64),
    pub start_distance: f64,
    pub approach_bearing: f64,
    pub speed: f64,
    pub tick: Duration,
    pub ticks: usize,
}

impl Walk {
    /// Listener position and heading at `tick`.
    ///
    /// The walk starts `start_distance` meters from the beacon, heads straight at it,
    /// passes it and keeps going. The head sweeps ±40 degrees around the walking
    /// direction every 16 ticks.
    pub fn listener_at(&self, tick: usize) -> (f64, f64, f64) {
        let travelled = self.speed * self.tick.as_secs_f64() * tick as f64;
        let back = geometry::wrap_degrees(self.approach_bearing + 180.0);
        let (start_lat, start_lon) =
            geometry::destination(self.beacon.0, self.beacon.1, back, self.start_distance);
        let (lat, lon) = geometry::destination(start_lat, start_lon, self.approach_bearing, travelled);

        let sweep = (tick as f64 / 16.0 * std::f64::consts::TAU).sin() * 40.0;
        let heading = geometry::wrap_degrees(self.approach_bearing + sweep);
        (lat, lon, heading)
    }

    /// Runs the walk, refreshing the beacon and printing its geometry every tick.
    pub fn run(&self, engine: &BeaconEngine, mixer: &Mixer, beacon: &mut PositionedAudio) -> Result<()> {
        println!(
            "{:>5} {:>11} {:>12} {:>8} {:>9} {:>8} {:>9}",
            "tick", "latitude", "longitude", "heading", "distance", "offset", "band"
        );

        for tick in 0..self.ticks {
            let (lat, lon, heading) = self.listener_at(tick);
            engine.set_listener(lat, lon, heading);
            beacon.refresh();

            let distance = geometry::distance(lat, lon, self.beacon.0, self.beacon.1);
            println!(
                "{:>5} {:>11.6} {:>12.6} {:>8.1} {:>8.1}m {:>8.1} {:>9}",
                tick,
                lat,
                lon,
                heading,
                distance,
                beacon.degrees_off_axis().unwrap_or(f64::NAN),
                beacon
                    .source_mode()
                    .map_or_else(|| "-".to_string(), |m| format!("{:?}", m)),
            );

            for event in mixer.poll_events() {
                if event.is_error() {
                    log::warn!("Mixer: {:?}", event);
                } else if let MixerEvent::ChannelEnded { channel } = event {
                    log::info!("{} reached end of stream", channel);
                }
            }
            mixer.collect_released();

            std::thread::sleep(self.tick);
        }
        Ok(())
    }
}
