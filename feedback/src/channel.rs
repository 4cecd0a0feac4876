use async_trait::async_trait;
use std::fmt;

/// The four feedback modalities the rig can show while "thinking".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedbackKind {
    /// Prerecorded verbal filler ("um", "let me think").
    AudioFiller,
    /// Spinning/thought-bubble indicator.
    VisualIcon,
    /// On-screen "Thinking..." caption.
    VisualText,
    /// Avatar thinking gesture (head tilt, hand on chin).
    Gesture,
}

impl FeedbackKind {
    pub const ALL: [FeedbackKind; 4] = [
        FeedbackKind::AudioFiller,
        FeedbackKind::VisualIcon,
        FeedbackKind::VisualText,
        FeedbackKind::Gesture,
    ];
}

impl fmt::Display for FeedbackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FeedbackKind::AudioFiller => "audio-filler",
            FeedbackKind::VisualIcon => "visual-icon",
            FeedbackKind::VisualText => "visual-text",
            FeedbackKind::Gesture => "gesture",
        };
        f.write_str(name)
    }
}

/// Which channels a session has enabled. Channels combine freely; they are
/// not mutually exclusive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelSet {
    bits: u8,
}

impl ChannelSet {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn of(kinds: &[FeedbackKind]) -> Self {
        let mut set = Self::default();
        for &k in kinds {
            set.bits |= Self::bit(k);
        }
        set
    }

    pub fn all() -> Self {
        Self::of(&FeedbackKind::ALL)
    }

    fn bit(kind: FeedbackKind) -> u8 {
        match kind {
            FeedbackKind::AudioFiller => 1 << 0,
            FeedbackKind::VisualIcon => 1 << 1,
            FeedbackKind::VisualText => 1 << 2,
            FeedbackKind::Gesture => 1 << 3,
        }
    }

    pub fn contains(&self, kind: FeedbackKind) -> bool {
        self.bits & Self::bit(kind) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    pub fn kinds(&self) -> Vec<FeedbackKind> {
        FeedbackKind::ALL
            .iter()
            .copied()
            .filter(|&k| self.contains(k))
            .collect()
    }
}

/// Boundary to the actual renderers: audio playback, UI widgets, the
/// animator. Implementations must tolerate a `stop_channel` for a channel
/// that never started.
#[async_trait]
pub trait FeedbackSink: Send + Sync {
    /// Begin showing `kind`. `phrase` is only meaningful for
    /// [`FeedbackKind::AudioFiller`] and [`FeedbackKind::VisualText`].
    async fn start_channel(&self, kind: FeedbackKind, phrase: Option<&str>);
    async fn stop_channel(&self, kind: FeedbackKind);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_set_membership() {
        let set = ChannelSet::of(&[FeedbackKind::AudioFiller, FeedbackKind::Gesture]);
        assert!(set.contains(FeedbackKind::AudioFiller));
        assert!(set.contains(FeedbackKind::Gesture));
        assert!(!set.contains(FeedbackKind::VisualIcon));
        assert_eq!(set.kinds().len(), 2);
        assert!(ChannelSet::none().is_empty());
    }
}
