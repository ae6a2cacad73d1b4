//! Notifications from the mixer's render side.

use crate::renderer::ChannelId;

#[derive(Debug, Clone, PartialEq)]
pub enum MixerEvent {
    /// A channel was added by the render thread.
    ChannelStarted { channel: ChannelId },
    /// A channel's source reported end of stream; it stays silent until released.
    ChannelEnded { channel: ChannelId },
    /// A channel was removed and its sound handed back for freeing.
    ChannelReleased { channel: ChannelId },
    /// The channel table was full; the sound was handed straight back.
    ChannelRejected { channel: ChannelId },
    /// A command referred to a channel or DSP node the mixer does not know.
    UnknownTarget { command: &'static str },
    /// Per-channel resampling failed; the channel played silence for one block.
    ResampleError { channel: ChannelId },
}

impl MixerEvent {
    pub fn channel(&self) -> Option<ChannelId> {
        match self {
            Self::ChannelStarted { channel }
            | Self::ChannelEnded { channel }
            | Self::ChannelReleased { channel }
            | Self::ChannelRejected { channel }
            | Self::ResampleError { channel } => Some(*channel),
            Self::UnknownTarget { .. } => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownTarget { .. } | Self::ChannelRejected { .. } | Self::ResampleError { .. }
        )
    }
}
