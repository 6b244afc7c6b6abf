use serde::{Deserialize, Serialize};

use super::error::SessionError;

/// Direction of an audio endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortDirection {
    Input,
    Output,
}

/// Physical kind of an audio endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AudioPortType {
    BuiltInMic,
    BuiltInSpeaker,
    BuiltInReceiver,
    HeadsetMic,
    Headphones,
    BluetoothHfp,
    BluetoothA2dp,
    BluetoothLe,
    Usb,
    LineIn,
    LineOut,
    Hdmi,
    AirPlay,
    CarAudio,
    Virtual,
    Unknown,
}

impl AudioPortType {
    /// Whether this port is something plugged into or paired with the device,
    /// as opposed to one of its own transducers.
    pub fn is_external(&self) -> bool {
        !matches!(
            self,
            Self::BuiltInMic | Self::BuiltInSpeaker | Self::BuiltInReceiver | Self::Unknown
        )
    }
}

/// Snapshot of an input or output endpoint taken at enumeration time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioDevicePort {
    pub id: String,
    pub name: String,
    pub direction: PortDirection,
    pub port_type: AudioPortType,
}

impl AudioDevicePort {
    pub fn input(id: impl Into<String>, name: impl Into<String>, port_type: AudioPortType) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            direction: PortDirection::Input,
            port_type,
        }
    }

    pub fn output(id: impl Into<String>, name: impl Into<String>, port_type: AudioPortType) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            direction: PortDirection::Output,
            port_type,
        }
    }
}

/// Format of the live capture buffer. Only exists while recording.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CaptureFormat {
    pub channels: u16,
    pub sample_rate: f64,
    pub bytes_per_sample: u16,
    /// Samples per channel in one published frame.
    pub frame_length: u32,
}

impl CaptureFormat {
    /// Planar f32 format, the only sample layout the PCM buffer holds.
    pub fn float32(channels: u16, sample_rate: f64, frame_length: u32) -> Self {
        Self {
            channels,
            sample_rate,
            bytes_per_sample: std::mem::size_of::<f32>() as u16,
            frame_length,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.channels > 0 && self.sample_rate > 0.0 && self.frame_length > 0
    }

    /// Duration of one frame in seconds.
    pub fn frame_duration_secs(&self) -> f64 {
        if self.sample_rate <= 0.0 {
            return 0.0;
        }
        self.frame_length as f64 / self.sample_rate
    }
}

/// RMS and peak of the most recently published frame (0.0–1.0).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct AudioLevels {
    pub rms: f32,
    pub peak: f32,
}

impl AudioLevels {
    pub fn rms_level(samples: &[f32]) -> f32 {
        if samples.is_empty() {
            return 0.0;
        }
        let sum_sq: f32 = samples.iter().map(|s| s * s).sum();
        (sum_sq / samples.len() as f32).sqrt()
    }

    pub fn peak_level(samples: &[f32]) -> f32 {
        samples.iter().fold(0.0f32, |peak, s| peak.max(s.abs()))
    }
}

/// Counters for debugging a capture session.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CaptureDiagnostics {
    pub is_recording: bool,
    pub frames_published: u64,
    pub samples_dropped: u64,
    pub format: Option<CaptureFormat>,
}

impl CaptureDiagnostics {
    pub fn to_json(&self) -> Result<String, SessionError> {
        serde_json::to_string(self)
            .map_err(|e| SessionError::Platform(format!("failed to serialize diagnostics: {}", e)))
    }
}
