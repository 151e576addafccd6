/// Sound engine: procedural chiptune cues via rodio.
///
/// All sounds are generated as in-memory WAV buffers at init time.
/// Effects are fire-and-forget through detached sinks. The main theme
/// loops on its own sink so it can be restarted on every level load and
/// stopped when the player is caught.
///
/// Compile without the "sound" feature to disable audio entirely
/// (the stub SoundEngine does nothing).

#[cfg(feature = "sound")]
mod inner {
    use std::cell::RefCell;
    use std::f32::consts::TAU;
    use std::io::Cursor;
    use std::sync::Arc;

    use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};

    const SAMPLE_RATE: u32 = 22050;
    const THEME_VOLUME: f32 = 0.6;

    pub struct SoundEngine {
        _stream: OutputStream,
        handle: OutputStreamHandle,
        main: RefCell<Option<Sink>>,
        theme: Arc<Vec<u8>>,
        sfx_pickup: Arc<Vec<u8>>,
        sfx_death: Arc<Vec<u8>>,
        sfx_switch: Arc<Vec<u8>>,
        sfx_complete: Arc<Vec<u8>>,
    }

    impl SoundEngine {
        pub fn new() -> Option<Self> {
            let (stream, handle) = match OutputStream::try_default() {
                Ok(pair) => pair,
                Err(e) => {
                    log::warn!("no audio output, sound disabled: {e}");
                    return None;
                }
            };

            Some(SoundEngine {
                _stream: stream,
                handle,
                main: RefCell::new(None),
                theme: Arc::new(make_wav(&gen_theme())),
                sfx_pickup: Arc::new(make_wav(&gen_pickup())),
                sfx_death: Arc::new(make_wav(&gen_death())),
                sfx_switch: Arc::new(make_wav(&gen_blip(880.0, 0.06, 0.3))),
                sfx_complete: Arc::new(make_wav(&gen_complete())),
            })
        }

        fn play(&self, buf: &Arc<Vec<u8>>) {
            if let Ok(sink) = Sink::try_new(&self.handle) {
                let cursor = Cursor::new(buf.as_ref().clone());
                if let Ok(src) = Decoder::new(cursor) {
                    sink.append(src);
                    sink.detach();
                }
            }
        }

        /// (Re)start the looping theme from the top.
        pub fn play_main(&self) {
            self.stop_main();
            let Ok(sink) = Sink::try_new(&self.handle) else { return };
            let cursor = Cursor::new(self.theme.as_ref().clone());
            if let Ok(src) = Decoder::new(cursor) {
                sink.set_volume(THEME_VOLUME);
                sink.append(src.repeat_infinite());
                *self.main.borrow_mut() = Some(sink);
            }
        }

        pub fn stop_main(&self) {
            if let Some(sink) = self.main.borrow_mut().take() {
                sink.stop();
            }
        }

        pub fn play_pickup(&self) { self.play(&self.sfx_pickup); }
        pub fn play_switch(&self) { self.play(&self.sfx_switch); }
        pub fn play_complete(&self) { self.play(&self.sfx_complete); }

        /// Death sting. Cuts the theme.
        pub fn play_death(&self) {
            self.stop_main();
            self.play(&self.sfx_death);
        }
    }

    // ════════════════════════════════════════════════════════════
    //  Waveform generators: all produce Vec<f32> mono samples
    // ════════════════════════════════════════════════════════════

    fn square(t: f32, freq: f32) -> f32 {
        if (t * freq).fract() < 0.5 { 1.0 } else { -1.0 }
    }

    fn gen_blip(freq: f32, duration: f32, volume: f32) -> Vec<f32> {
        let n = (SAMPLE_RATE as f32 * duration) as usize;
        (0..n)
            .map(|i| {
                let t = i as f32 / SAMPLE_RATE as f32;
                let env = 1.0 - (i as f32 / n as f32);
                (t * freq * TAU).sin() * env * volume
            })
            .collect()
    }

    /// Theme: minor bass walk under a sparse pulse lead. One bar, looped.
    pub(super) fn gen_theme() -> Vec<f32> {
        let bass = [110.0_f32, 110.0, 131.0, 110.0, 98.0, 98.0, 123.0, 104.0];
        let lead = [440.0_f32, 0.0, 523.0, 0.0, 494.0, 0.0, 415.0, 0.0];
        let step = 0.22;
        let n = (SAMPLE_RATE as f32 * step) as usize;
        let mut samples = Vec::with_capacity(n * bass.len());
        for (&b, &l) in bass.iter().zip(lead.iter()) {
            for i in 0..n {
                let t = i as f32 / SAMPLE_RATE as f32;
                let env = 1.0 - (i as f32 / n as f32) * 0.6;
                let mut s = square(t, b) * 0.18;
                if l > 0.0 {
                    s += (t * l * TAU).sin() * 0.12 * (1.0 - i as f32 / n as f32);
                }
                samples.push(s * env);
            }
        }
        samples
    }

    /// Artifact pickup: quick rising chirp
    fn gen_pickup() -> Vec<f32> {
        let duration = 0.09;
        let n = (SAMPLE_RATE as f32 * duration) as usize;
        let mut phase = 0.0_f32;
        (0..n)
            .map(|i| {
                let p = i as f32 / n as f32;
                let freq = 600.0 + p * 900.0;
                phase += freq / SAMPLE_RATE as f32;
                let env = 1.0 - p.powf(0.5);
                (phase * TAU).sin() * env * 0.3
            })
            .collect()
    }

    /// Caught: falling square-wave slide
    fn gen_death() -> Vec<f32> {
        let duration = 0.6;
        let n = (SAMPLE_RATE as f32 * duration) as usize;
        let mut phase = 0.0_f32;
        (0..n)
            .map(|i| {
                let p = i as f32 / n as f32;
                let freq = 420.0 - p * 340.0;
                phase += freq / SAMPLE_RATE as f32;
                let wave = if phase.fract() < 0.5 { 1.0 } else { -1.0 };
                wave * (1.0 - p) * 0.2
            })
            .collect()
    }

    /// All levels cleared: ascending fanfare with a held top note
    fn gen_complete() -> Vec<f32> {
        let notes = [523.0_f32, 659.0, 784.0, 1047.0]; // C5→E5→G5→C6
        let mut samples = Vec::new();
        for (k, &freq) in notes.iter().enumerate() {
            let dur = if k + 1 == notes.len() { 0.4 } else { 0.1 };
            let n = (SAMPLE_RATE as f32 * dur) as usize;
            for i in 0..n {
                let t = i as f32 / SAMPLE_RATE as f32;
                let env = 1.0 - (i as f32 / n as f32) * 0.8;
                let wave = (t * freq * TAU).sin() * 0.7 + (t * freq * 2.0 * TAU).sin() * 0.3;
                samples.push(wave * env * 0.3);
            }
        }
        samples
    }

    // ════════════════════════════════════════════════════════════
    //  WAV encoder: wraps f32 samples into a valid WAV buffer
    // ════════════════════════════════════════════════════════════

    pub(super) fn make_wav(samples: &[f32]) -> Vec<u8> {
        let num_channels: u16 = 1;
        let bits_per_sample: u16 = 16;
        let byte_rate = SAMPLE_RATE * (num_channels as u32) * (bits_per_sample as u32) / 8;
        let block_align = num_channels * bits_per_sample / 8;
        let data_size = samples.len() as u32 * 2;
        let file_size = 36 + data_size;

        let mut buf = Vec::with_capacity(44 + data_size as usize);

        buf.extend_from_slice(b"RIFF");
        buf.extend_from_slice(&file_size.to_le_bytes());
        buf.extend_from_slice(b"WAVE");

        buf.extend_from_slice(b"fmt ");
        buf.extend_from_slice(&16u32.to_le_bytes());
        buf.extend_from_slice(&1u16.to_le_bytes()); // PCM
        buf.extend_from_slice(&num_channels.to_le_bytes());
        buf.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
        buf.extend_from_slice(&byte_rate.to_le_bytes());
        buf.extend_from_slice(&block_align.to_le_bytes());
        buf.extend_from_slice(&bits_per_sample.to_le_bytes());

        buf.extend_from_slice(b"data");
        buf.extend_from_slice(&data_size.to_le_bytes());

        for &s in samples {
            let val = (s.clamp(-1.0, 1.0) * 32767.0) as i16;
            buf.extend_from_slice(&val.to_le_bytes());
        }

        buf
    }
}

// ════════════════════════════════════════════════════════════
//  Public API, compiles to no-ops when sound feature is off
// ════════════════════════════════════════════════════════════

#[cfg(feature = "sound")]
pub use inner::SoundEngine;

#[cfg(not(feature = "sound"))]
pub struct SoundEngine;

#[cfg(not(feature = "sound"))]
impl SoundEngine {
    pub fn new() -> Option<Self> { Some(SoundEngine) }
    pub fn play_main(&self) {}
    pub fn stop_main(&self) {}
    pub fn play_pickup(&self) {}
    pub fn play_switch(&self) {}
    pub fn play_complete(&self) {}
    pub fn play_death(&self) {}
}
