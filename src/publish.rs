use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::types::{ColorFrame, PointCloudFrame, RawDepthPublishFrame};

/// Named output of a depth pipeline, in emission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Color,
    Depth,
    Cloud,
}

impl Channel {
    pub const ALL: [Channel; 3] = [Channel::Color, Channel::Depth, Channel::Cloud];

    fn slot(self) -> usize {
        match self {
            Channel::Color => 0,
            Channel::Depth => 1,
            Channel::Cloud => 2,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Channel::Color => "color",
            Channel::Depth => "depth",
            Channel::Cloud => "cloud",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Borrowed view of one published buffer.
pub enum Output<'a> {
    Color(&'a ColorFrame),
    Depth(&'a RawDepthPublishFrame),
    Cloud(&'a PointCloudFrame),
}

impl Output<'_> {
    pub fn channel(&self) -> Channel {
        match self {
            Output::Color(_) => Channel::Color,
            Output::Depth(_) => Channel::Depth,
            Output::Cloud(_) => Channel::Cloud,
        }
    }
}

/// Downstream consumer of published frames. The borrow ends when `emit` returns.
pub trait OutputSink {
    fn emit(&mut self, output: Output<'_>);
}

impl<F: FnMut(Output<'_>)> OutputSink for F {
    fn emit(&mut self, output: Output<'_>) {
        self(output)
    }
}

/// Dirty-flag latch deciding which channels a publish trigger emits.
pub struct FramePublisher {
    dirty: [AtomicBool; 3],
    unique: AtomicBool,
}

impl Default for FramePublisher {
    fn default() -> Self {
        Self::new(true)
    }
}

impl FramePublisher {
    pub fn new(unique: bool) -> FramePublisher {
        FramePublisher {
            dirty: [
                AtomicBool::new(false),
                AtomicBool::new(false),
                AtomicBool::new(false),
            ],
            unique: AtomicBool::new(unique),
        }
    }

    pub fn unique(&self) -> bool {
        self.unique.load(Ordering::Acquire)
    }

    pub fn set_unique(&self, unique: bool) {
        self.unique.store(unique, Ordering::Release);
    }

    /// Producer side: a new frame of `channel` is ready.
    pub fn mark(&self, channel: Channel) {
        self.dirty[channel.slot()].store(true, Ordering::Release);
    }

    pub fn is_dirty(&self, channel: Channel) -> bool {
        self.dirty[channel.slot()].load(Ordering::Acquire)
    }

    /// Channels to emit for this trigger. In unique mode each returned
    /// channel's flag is cleared; otherwise all channels are returned and
    /// the flags are left alone.
    pub fn take_pending(&self) -> Vec<Channel> {
        if !self.unique() {
            return Channel::ALL.to_vec();
        }
        Channel::ALL
            .into_iter()
            .filter(|c| self.dirty[c.slot()].swap(false, Ordering::AcqRel))
            .collect()
    }
}
