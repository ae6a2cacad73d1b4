//! Reference renderer.
//!
//! [`Mixer`] is the update-thread handle and implements [`Renderer`]; every call
//! becomes a [`MixerCommand`] sent over a crossbeam channel. [`MixerCore`] lives on
//! the render thread, applies the commands at block boundaries and owns the sounds.
//! Released channels travel back to the [`Mixer`] so their buffers are freed off
//! the render thread, and only after the render thread has stopped reading them.
//!
//! All three queues are bounded. At most [`MAX_CHANNELS`] channels are alive
//! between `create_channel` and `collect_released`, so the core's channel table and
//! the release queue never grow. Events beyond [`EVENT_CAPACITY`] unpolled ones are
//! dropped and counted.

mod channel;
mod core;

pub use self::channel::pan_gains;
pub use self::core::MixerCore;

use self::channel::MixChannel;
use crate::config::BeaconEngineDesc;
use crate::error::{BeaconError, Result};
use crate::events::MixerEvent;
use crate::renderer::{BeaconSound, ChannelGroup, ChannelId, DspId, Renderer};
use crate::spatial::SpatialAttributes;
use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Channels alive at once, counting released ones not yet collected.
pub const MAX_CHANNELS: usize = 64;
/// Commands queued for the render thread before senders are refused.
pub const COMMAND_CAPACITY: usize = 1024;
/// Unpolled events kept before new ones are dropped.
pub const EVENT_CAPACITY: usize = 256;

pub(crate) enum MixerCommand {
    Add(Box<MixChannel>),
    SetPaused(ChannelId, bool),
    SetMute(ChannelId, bool),
    AttachDsp(ChannelId, DspId),
    SetAttributes(DspId, SpatialAttributes),
    DetachDsp(ChannelId, DspId),
    Release(ChannelId),
}

/// Update-thread handle of the mixer.
pub struct Mixer {
    commands: Sender<MixerCommand>,
    released: Receiver<Box<MixChannel>>,
    events: Receiver<MixerEvent>,
    dropped_events: Arc<AtomicU64>,
    live_channels: AtomicUsize,
    next_channel: AtomicU64,
    next_dsp: AtomicU64,
    sample_rate: u32,
    block_size: usize,
}

impl Mixer {
    /// Creates the two halves of a mixer for `desc`'s output format.
    pub fn new(desc: &BeaconEngineDesc) -> Result<(Self, MixerCore)> {
        desc.validate()?;
        let (command_tx, command_rx) = bounded(COMMAND_CAPACITY);
        let (released_tx, released_rx) = bounded(MAX_CHANNELS);
        let (event_tx, event_rx) = bounded(EVENT_CAPACITY);
        let dropped_events = Arc::new(AtomicU64::new(0));

        log::info!(
            "Mixer: {} Hz, {} channels, {} frame blocks",
            desc.sample_rate,
            desc.channels,
            desc.block_size
        );

        let core = MixerCore::new(
            command_rx,
            released_tx,
            event_tx,
            dropped_events.clone(),
            desc.block_size,
            desc.channels,
            desc.duck_gain,
        );
        let mixer = Self {
            commands: command_tx,
            released: released_rx,
            events: event_rx,
            dropped_events,
            live_channels: AtomicUsize::new(0),
            next_channel: AtomicU64::new(0),
            next_dsp: AtomicU64::new(0),
            sample_rate: desc.sample_rate,
            block_size: desc.block_size,
        };
        Ok((mixer, core))
    }

    fn send(&self, command: MixerCommand) -> Result<()> {
        self.commands.try_send(command).map_err(|e| match e {
            TrySendError::Full(_) => BeaconError::Renderer(format!(
                "Mixer command queue is full ({} pending)",
                COMMAND_CAPACITY
            )),
            TrySendError::Disconnected(_) => {
                BeaconError::Renderer("Mixer core has shut down".to_string())
            }
        })
    }

    /// Reserves a slot for a new channel, failing at [`MAX_CHANNELS`].
    fn reserve_channel(&self) -> Result<()> {
        self.live_channels
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |live| {
                (live < MAX_CHANNELS).then_some(live + 1)
            })
            .map(|_| ())
            .map_err(|_| {
                BeaconError::Renderer(format!(
                    "Mixer channel limit reached ({} live or uncollected)",
                    MAX_CHANNELS
                ))
            })
    }

    fn free_channel_slot(&self) {
        self.live_channels.fetch_sub(1, Ordering::AcqRel);
    }

    /// Channels created and not yet collected.
    pub fn live_channels(&self) -> usize {
        self.live_channels.load(Ordering::Acquire)
    }

    /// Frees the sounds of released channels. Returns how many were freed.
    pub fn collect_released(&self) -> usize {
        let mut count = 0;
        while let Ok(channel) = self.released.try_recv() {
            let sound = (*channel).into_sound();
            log::debug!("Freed {:?} sound", sound.kind());
            self.free_channel_slot();
            count += 1;
        }
        count
    }

    /// Drains pending mixer events.
    pub fn poll_events(&self) -> Vec<MixerEvent> {
        self.events.try_iter().collect()
    }

    /// Events the render thread dropped because nobody polled them.
    pub fn dropped_events(&self) -> u64 {
        self.dropped_events.load(Ordering::Relaxed)
    }
}

impl Renderer for Mixer {
    fn create_channel(&self, sound: BeaconSound, group: ChannelGroup) -> Result<ChannelId> {
        self.reserve_channel()?;
        let id = ChannelId(self.next_channel.fetch_add(1, Ordering::Relaxed));
        let added = MixChannel::new(id, sound, group, self.sample_rate, self.block_size)
            .and_then(|channel| self.send(MixerCommand::Add(Box::new(channel))));
        if let Err(e) = added {
            self.free_channel_slot();
            return Err(e);
        }
        log::debug!("Mixer: created {} in {:?} group", id, group);
        Ok(id)
    }

    fn set_paused(&self, channel: ChannelId, paused: bool) -> Result<()> {
        self.send(MixerCommand::SetPaused(channel, paused))
    }

    fn set_mute(&self, channel: ChannelId, mute: bool) -> Result<()> {
        self.send(MixerCommand::SetMute(channel, mute))
    }

    fn attach_spatial_dsp(&self, channel: ChannelId) -> Result<DspId> {
        let dsp = DspId(self.next_dsp.fetch_add(1, Ordering::Relaxed));
        self.send(MixerCommand::AttachDsp(channel, dsp))?;
        Ok(dsp)
    }

    fn set_spatial_attributes(&self, dsp: DspId, attributes: &SpatialAttributes) -> Result<()> {
        self.send(MixerCommand::SetAttributes(dsp, *attributes))
    }

    fn detach_spatial_dsp(&self, channel: ChannelId, dsp: DspId) -> Result<()> {
        self.send(MixerCommand::DetachDsp(channel, dsp))
    }

    fn release_channel(&self, channel: ChannelId) -> Result<()> {
        self.send(MixerCommand::Release(channel))
    }
}
