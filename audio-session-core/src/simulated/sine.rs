use std::f64::consts::TAU;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::models::audio_models::{AudioDevicePort, CaptureFormat};
use crate::models::error::SessionError;
use crate::traits::capture_provider::{AudioBufferCallback, CaptureProvider};

/// Settings for the simulated capture source.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedCaptureConfig {
    /// Number of channels (default: 2).
    pub channels: u16,

    /// Sample rate in Hz (default: 44100).
    pub sample_rate: f64,

    /// Samples per channel per delivered frame (default: 4192).
    pub frame_length: u32,

    /// Test tone frequency in Hz (default: 440).
    pub frequency_hz: f64,

    /// Test tone amplitude (default: 0.5).
    pub volume: f32,
}

impl SimulatedCaptureConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.channels == 0 {
            return Err("channel count must be positive".into());
        }
        if self.sample_rate <= 0.0 {
            return Err("sample rate must be positive".into());
        }
        if self.frame_length == 0 {
            return Err("frame length must be positive".into());
        }
        if self.frequency_hz <= 0.0 || self.frequency_hz >= self.sample_rate / 2.0 {
            return Err(format!("tone frequency {} Hz out of range", self.frequency_hz));
        }
        if !(0.0..=1.0).contains(&self.volume) {
            return Err(format!("volume {} out of range", self.volume));
        }
        Ok(())
    }

    pub fn format(&self) -> CaptureFormat {
        CaptureFormat::float32(self.channels, self.sample_rate, self.frame_length)
    }
}

impl Default for SimulatedCaptureConfig {
    fn default() -> Self {
        Self {
            channels: 2,
            sample_rate: 44100.0,
            frame_length: 4192,
            frequency_hz: 440.0,
            volume: 0.5,
        }
    }
}

/// Phase-continuous sine tone, one phase accumulator per channel.
#[derive(Debug, Clone)]
pub struct SineGenerator {
    phase: Vec<f64>,
    increment: f64,
    volume: f32,
}

impl SineGenerator {
    pub fn new(channels: usize, frequency_hz: f64, sample_rate: f64, volume: f32) -> Self {
        Self {
            phase: vec![0.0; channels],
            increment: TAU * frequency_hz / sample_rate,
            volume,
        }
    }

    /// Fill `out` with interleaved samples. `out.len()` should be a multiple of the channel count.
    pub fn fill_interleaved(&mut self, out: &mut [f32]) {
        let channels = self.phase.len();
        if channels == 0 {
            return;
        }
        for frame in out.chunks_mut(channels) {
            for (sample, phase) in frame.iter_mut().zip(self.phase.iter_mut()) {
                *sample = self.volume * phase.sin() as f32;
                *phase += self.increment;
                if *phase >= TAU {
                    *phase -= TAU;
                }
            }
        }
    }
}

/// Capture provider that plays a test tone in real time on its own thread.
pub struct SineCaptureProvider {
    config: SimulatedCaptureConfig,
    format: Option<CaptureFormat>,
    running: Arc<AtomicBool>,
    capture_handle: Option<thread::JoinHandle<()>>,
}

impl SineCaptureProvider {
    pub fn new(config: SimulatedCaptureConfig) -> Self {
        Self {
            config,
            format: None,
            running: Arc::new(AtomicBool::new(false)),
            capture_handle: None,
        }
    }
}

impl Default for SineCaptureProvider {
    fn default() -> Self {
        Self::new(SimulatedCaptureConfig::default())
    }
}

impl CaptureProvider for SineCaptureProvider {
    fn is_available(&self) -> bool {
        true
    }

    fn prepare(&mut self, preferred_input: Option<&AudioDevicePort>) -> Result<CaptureFormat, SessionError> {
        self.config.validate().map_err(SessionError::ConfigurationFailed)?;
        let format = self.config.format();
        log::debug!(
            "Simulated capture on {}: {} ch @ {} Hz, {} samples/frame",
            preferred_input.map_or("default input", |p| p.name.as_str()),
            format.channels,
            format.sample_rate,
            format.frame_length
        );
        self.format = Some(format);
        Ok(format)
    }

    fn start(&mut self, callback: AudioBufferCallback) -> Result<(), SessionError> {
        let format = self
            .format
            .ok_or_else(|| SessionError::ConfigurationFailed("capture not prepared".into()))?;

        if self.running.load(Ordering::SeqCst) {
            return Err(SessionError::ConfigurationFailed(
                "simulated capture already running".into(),
            ));
        }

        self.running.store(true, Ordering::SeqCst);
        let running = Arc::clone(&self.running);
        let mut generator = SineGenerator::new(
            format.channels as usize,
            self.config.frequency_hz,
            format.sample_rate,
            self.config.volume,
        );
        let period = Duration::from_secs_f64(format.frame_duration_secs());

        let handle = thread::Builder::new()
            .name("simulated-capture".into())
            .spawn(move || {
                let mut frame = vec![0.0f32; format.frame_length as usize * format.channels as usize];
                let mut next = Instant::now();
                while running.load(Ordering::SeqCst) {
                    generator.fill_interleaved(&mut frame);
                    callback(&frame, format.sample_rate, format.channels);

                    next += period;
                    let now = Instant::now();
                    if next > now {
                        thread::sleep(next - now);
                    } else {
                        next = now;
                    }
                }
            })
            .map_err(|e| {
                self.running.store(false, Ordering::SeqCst);
                SessionError::Platform(format!("failed to spawn capture thread: {}", e))
            })?;

        self.capture_handle = Some(handle);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), SessionError> {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.capture_handle.take() {
            let _ = handle.join();
        }
        self.format = None;
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
            && self.capture_handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for SineCaptureProvider {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn default_matches_test_session() {
        let config = SimulatedCaptureConfig::default();
        let format = config.format();

        assert!(config.validate().is_ok());
        assert_eq!(format.channels, 2);
        assert_eq!(format.sample_rate, 44100.0);
        assert_eq!(format.frame_length, 4192);
        assert_eq!(format.bytes_per_sample, 4);
    }

    #[test]
    fn validate_rejects_bad_values() {
        let bad = SimulatedCaptureConfig {
            frequency_hz: 30000.0,
            ..Default::default()
        };
        assert!(bad.validate().is_err());

        let bad = SimulatedCaptureConfig {
            channels: 0,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn sine_starts_at_zero_and_stays_within_volume() {
        let mut generator = SineGenerator::new(2, 440.0, 44100.0, 0.5);
        let mut out = vec![1.0f32; 2 * 1000];
        generator.fill_interleaved(&mut out);

        assert_eq!(out[0], 0.0);
        assert_eq!(out[1], 0.0);
        assert!(out.iter().all(|s| s.abs() <= 0.5));
        // Channels carry the same tone.
        assert!(out.chunks(2).all(|f| f[0] == f[1]));
    }

    #[test]
    fn sine_is_phase_continuous_across_calls() {
        let mut split = SineGenerator::new(1, 1000.0, 48000.0, 1.0);
        let mut whole = split.clone();

        let mut a = vec![0.0f32; 30];
        let mut b = vec![0.0f32; 70];
        split.fill_interleaved(&mut a);
        split.fill_interleaved(&mut b);

        let mut all = vec![0.0f32; 100];
        whole.fill_interleaved(&mut all);

        for (i, s) in a.iter().chain(b.iter()).enumerate() {
            assert_relative_eq!(*s, all[i], epsilon = 1e-6);
        }
    }

    #[test]
    fn quarter_period_hits_peak() {
        // 1 kHz at 4 kHz: sample 1 is a quarter period.
        let mut generator = SineGenerator::new(1, 1000.0, 4000.0, 0.5);
        let mut out = vec![0.0f32; 4];
        generator.fill_interleaved(&mut out);
        assert_relative_eq!(out[1], 0.5, epsilon = 1e-6);
    }

    #[test]
    fn start_requires_prepare() {
        let mut provider = SineCaptureProvider::default();
        let err = provider.start(Arc::new(|_, _, _| {})).unwrap_err();
        assert!(matches!(err, SessionError::ConfigurationFailed(_)));
    }

    #[test]
    fn delivers_frames_until_stopped() {
        let mut provider = SineCaptureProvider::new(SimulatedCaptureConfig {
            channels: 1,
            sample_rate: 8000.0,
            frame_length: 80,
            frequency_hz: 440.0,
            volume: 0.5,
        });
        provider.prepare(None).unwrap();

        let frames = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&frames);
        provider
            .start(Arc::new(move |samples, rate, channels| {
                assert_eq!(samples.len(), 80);
                assert_eq!(rate, 8000.0);
                assert_eq!(channels, 1);
                counter.fetch_add(1, Ordering::SeqCst);
            }))
            .unwrap();
        assert!(provider.is_running());

        let deadline = Instant::now() + Duration::from_secs(5);
        while frames.load(Ordering::SeqCst) < 3 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        provider.stop().unwrap();
        assert!(!provider.is_running());

        let delivered = frames.load(Ordering::SeqCst);
        assert!(delivered >= 3);
        thread::sleep(Duration::from_millis(50));
        assert_eq!(frames.load(Ordering::SeqCst), delivered);
    }
}
