use serde::{Deserialize, Serialize};

bitflags::bitflags! {
    /// Session category options bitmask.
    ///
    /// Bit values match the platform audio session's option flags so backends
    /// can pass them through unchanged.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct CategoryOptions: u32 {
        const MIX_WITH_OTHERS = 0x1;
        const DUCK_OTHERS = 0x2;
        const ALLOW_BLUETOOTH = 0x4;
        const DEFAULT_TO_SPEAKER = 0x8;
    }
}

/// Configuration applied to the audio session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfiguration {
    /// Allow Bluetooth hands-free devices as capture inputs.
    pub bluetooth_recording: bool,

    /// Route output to the loudspeaker instead of the receiver while recording.
    pub default_to_speaker: bool,

    /// Keep other audio (the host's own output) playing alongside capture.
    pub mix_with_others: bool,
}

impl SessionConfiguration {
    pub fn new(bluetooth_recording: bool, default_to_speaker: bool) -> Self {
        Self {
            bluetooth_recording,
            default_to_speaker,
            ..Self::default()
        }
    }

    pub fn category_options(&self) -> CategoryOptions {
        let mut options = CategoryOptions::empty();
        if self.mix_with_others {
            options |= CategoryOptions::MIX_WITH_OTHERS;
        }
        if self.bluetooth_recording {
            options |= CategoryOptions::ALLOW_BLUETOOTH;
        }
        if self.default_to_speaker {
            options |= CategoryOptions::DEFAULT_TO_SPEAKER;
        }
        options
    }
}

impl Default for SessionConfiguration {
    fn default() -> Self {
        Self {
            bluetooth_recording: false,
            default_to_speaker: false,
            mix_with_others: true,
        }
    }
}
