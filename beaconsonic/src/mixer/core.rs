use crate::events::MixerEvent;
use crate::mixer::channel::MixChannel;
use crate::mixer::{MAX_CHANNELS, MixerCommand};
use crate::renderer::{ChannelGroup, ChannelId};
use crate::source::PcmStatus;
use crossbeam_channel::{Receiver, Sender};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Queues `event` unless the bounded queue is full, in which case it is counted.
fn send_event(events: &Sender<MixerEvent>, dropped: &AtomicU64, event: MixerEvent) {
    if events.try_send(event).is_err() {
        dropped.fetch_add(1, Ordering::Relaxed);
    }
}

/// Render-thread half of the mixer.
///
/// Owns every live channel and its sound. Each block it applies pending commands,
/// pulls PCM from every playing channel, pans spatial channels and ducks the beacon
/// group while speech was audible in the previous block.
///
/// Nothing here allocates or frees once constructed: channels arrive boxed, stay
/// boxed in a table sized for [`MAX_CHANNELS`] and leave boxed, and events that do
/// not fit the bounded queue are counted instead of sent.
pub struct MixerCore {
    commands: Receiver<MixerCommand>,
    released: Sender<Box<MixChannel>>,
    events: Sender<MixerEvent>,
    dropped_events: Arc<AtomicU64>,
    channels: Vec<Box<MixChannel>>,
    output_channels: usize,
    duck_gain: f32,
    speech_active: bool,
    block: Vec<f32>,
    block_pos: usize,
}

impl MixerCore {
    pub(crate) fn new(
        commands: Receiver<MixerCommand>,
        released: Sender<Box<MixChannel>>,
        events: Sender<MixerEvent>,
        dropped_events: Arc<AtomicU64>,
        block_size: usize,
        output_channels: u16,
        duck_gain: f32,
    ) -> Self {
        let block = vec![0.0; block_size * output_channels as usize];
        Self {
            commands,
            released,
            events,
            dropped_events,
            channels: Vec::with_capacity(MAX_CHANNELS),
            output_channels: output_channels as usize,
            duck_gain,
            speech_active: false,
            block_pos: block.len(),
            block,
        }
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn is_ducking(&self) -> bool {
        self.speech_active
    }

    fn channel_mut(&mut self, id: ChannelId) -> Option<&mut MixChannel> {
        self.channels
            .iter_mut()
            .find(|c| c.id == id)
            .map(|c| &mut **c)
    }

    fn emit(&self, event: MixerEvent) {
        send_event(&self.events, &self.dropped_events, event);
    }

    fn unknown(&self, command: &'static str) {
        self.emit(MixerEvent::UnknownTarget { command });
    }

    fn apply_commands(&mut self) {
        while let Ok(command) = self.commands.try_recv() {
            match command {
                MixerCommand::Add(channel) => {
                    let id = channel.id;
                    if self.channels.len() < self.channels.capacity() {
                        self.channels.push(channel);
                        self.emit(MixerEvent::ChannelStarted { channel: id });
                    } else {
                        // Only reachable if the handle's limit was bypassed
                        let _ = self.released.try_send(channel);
                        self.emit(MixerEvent::ChannelRejected { channel: id });
                    }
                }
                MixerCommand::SetPaused(id, paused) => match self.channel_mut(id) {
                    Some(channel) => channel.paused = paused,
                    None => self.unknown("set_paused"),
                },
                MixerCommand::SetMute(id, mute) => match self.channel_mut(id) {
                    Some(channel) => channel.muted = mute,
                    None => self.unknown("set_mute"),
                },
                MixerCommand::AttachDsp(id, dsp) => match self.channel_mut(id) {
                    Some(channel) => {
                        channel.dsp = Some(dsp);
                        channel.attributes = None;
                    }
                    None => self.unknown("attach_spatial_dsp"),
                },
                MixerCommand::SetAttributes(dsp, attributes) => {
                    match self.channels.iter_mut().find(|c| c.dsp == Some(dsp)) {
                        Some(channel) => channel.attributes = Some(attributes),
                        None => self.unknown("set_spatial_attributes"),
                    }
                }
                MixerCommand::DetachDsp(id, dsp) => match self.channel_mut(id) {
                    Some(channel) if channel.dsp == Some(dsp) => {
                        channel.dsp = None;
                        channel.attributes = None;
                    }
                    _ => self.unknown("detach_spatial_dsp"),
                },
                MixerCommand::Release(id) => {
                    match self.channels.iter().position(|c| c.id == id) {
                        Some(index) => {
                            let channel = self.channels.swap_remove(index);
                            // Freed on the update thread
                            let _ = self.released.try_send(channel);
                            self.emit(MixerEvent::ChannelReleased { channel: id });
                        }
                        None => self.unknown("release_channel"),
                    }
                }
            }
        }
    }

    /// Renders one block into the internal buffer.
    fn process_block(&mut self) {
        self.apply_commands();
        self.block.fill(0.0);

        let duck = if self.speech_active {
            self.duck_gain
        } else {
            1.0
        };
        let mut speech_now = false;
        let output_channels = self.output_channels;
        let (events, dropped) = (&self.events, &self.dropped_events);

        for channel in self.channels.iter_mut() {
            if channel.paused || channel.ended {
                continue;
            }

            match channel.render() {
                Ok(PcmStatus::Ok) => {}
                Ok(PcmStatus::EndOfStream) => {
                    channel.ended = true;
                    send_event(events, dropped, MixerEvent::ChannelEnded { channel: channel.id });
                }
                Err(()) => {
                    send_event(events, dropped, MixerEvent::ResampleError { channel: channel.id });
                }
            }

            if channel.muted {
                continue;
            }

            let group_gain = match channel.group {
                ChannelGroup::Beacon => duck,
                ChannelGroup::Speech => {
                    speech_now |= channel.has_signal();
                    1.0
                }
            };
            let [left, right] = channel.gains();
            let (left, right) = (left * group_gain, right * group_gain);

            for (frame, &sample) in self
                .block
                .chunks_exact_mut(output_channels)
                .zip(channel.block())
            {
                if output_channels == 1 {
                    frame[0] += sample * (left + right) * 0.5;
                    continue;
                }
                frame[0] += sample * left;
                frame[1] += sample * right;
                for extra in frame.iter_mut().skip(2) {
                    *extra += sample * (left + right) * 0.5;
                }
            }
        }

        self.speech_active = speech_now;
    }

    /// Fills `output` with interleaved samples, rendering blocks as needed.
    ///
    /// Returns the number of frames written.
    pub fn render(&mut self, output: &mut [f32]) -> usize {
        let mut written = 0;
        while written < output.len() {
            if self.block_pos >= self.block.len() {
                self.process_block();
                self.block_pos = 0;
            }
            let count = (self.block.len() - self.block_pos).min(output.len() - written);
            output[written..written + count]
                .copy_from_slice(&self.block[self.block_pos..self.block_pos + count]);
            written += count;
            self.block_pos += count;
        }
        written / self.output_channels
    }
}
