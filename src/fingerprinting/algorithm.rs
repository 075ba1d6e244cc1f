//! Streaming signature generation: overlapped windowed FFT, time-frequency
//! peak spreading, delayed peak recognition, and chunked signature emission.

use std::collections::HashMap;

use chfft::RFft1D;
use log::debug;

use crate::config::Config;
use crate::fingerprinting::hanning::{hanning_window_multipliers, WINDOW_SIZE};
use crate::fingerprinting::ring::{Ring, SpectrumRing};
use crate::fingerprinting::signature_format::{DecodedSignature, FrequencyBand, FrequencyPeak};
use crate::{Result, SignatureError};

/// The DSP path is tuned for 16 kHz mono input; other container sample
/// rates are header-only.
const SAMPLE_RATE_HZ: u32 = 16000;

/// Samples consumed per FFT pass.
const HOP_SIZE: usize = 128;

/// Bins in the one-sided power spectrum of a 2048-point real FFT.
const SPECTRUM_SIZE: usize = 1025;

/// Depth of the FFT-output and spread-output rings.
const SPECTRUM_RING_DEPTH: usize = 256;

/// Passes the peak detector lags behind the newest spectrum, so that both
/// earlier and later spread frames exist around the inspected frame.
const DETECTION_DELAY_PASSES: u64 = 46;

/// Candidate peak bins; the corrected bin therefore lies in
/// [10 * 64, 1015 * 64).
const FIRST_CANDIDATE_BIN: usize = 10;
const LAST_CANDIDATE_BIN: usize = 1014;

/// Power floor applied to every spectrum cell.
const POWER_FLOOR: f32 = 1e-10;

/// Minimum power for a bin to qualify as a peak; also the lower clamp of
/// the log-magnitude mapping.
const MIN_PEAK_POWER: f32 = 1.0 / 64.0;

/// Log-magnitude mapping: mag(v) = ln(max(1/64, v)) * 1477.3 + 6144.
const MAGNITUDE_LN_SCALE: f32 = 1477.3;
const MAGNITUDE_OFFSET: f32 = 6144.0;

/// Each new spread spectrum is folded (newest first) into the frames from
/// 1, 3 and 6 passes ago; the running max absorbs each frame's prior value
/// along the way.
const TIME_SPREAD_OFFSETS: [i32; 3] = [-1, -3, -6];

/// The spread frame 49 passes back is the comparison baseline: a candidate
/// must dominate it at bin - 1 and at these frequency offsets.
const SPREAD_BASELINE_OFFSET: i32 = -49;
const FREQUENCY_NEIGHBOR_OFFSETS: [i32; 6] = [-10, -3, 1, 2, 5, 8];

/// Near-time dominance: spread frames just before and after the baseline,
/// probed at bin - 1.
const NEAR_TIME_DOMINANCE_OFFSETS: [i32; 2] = [-53, -45];

/// Far-time dominance: frames reached by wrapping the 256-deep ring
/// (+165/+201/+214/+250 are the frames 91, 55, 42 and 6 passes back once
/// the ring has cycled; before that they read as zeros), probed at bin - 1.
const FAR_TIME_DOMINANCE_OFFSETS: [i32; 4] = [165, 201, 214, 250];

/// Streaming signature generator.
///
/// Feed raw 16 kHz mono samples with [`feed_input`](Self::feed_input), then
/// drain bounded signature chunks with
/// [`get_next_signature`](Self::get_next_signature). One generator serves
/// one input stream; all DSP state is reset when a chunk is emitted.
#[derive(Debug)]
pub struct SignatureGenerator {
    // Input queue: feed_input appends, processing consumes 128 at a time.
    input_pending_processing: Vec<i16>,
    samples_processed: usize,

    // Used when processing input:
    sample_ring: Ring<i16>,
    /// Scratch for the time-ordered window snapshot.
    window_snapshot: Vec<i16>,
    /// Scratch for the snapshot with the Hanning window applied, as floats
    /// for precision.
    reordered_samples: Vec<f32>,
    hanning_multipliers: Vec<f32>,

    fft_object: RFft1D<f32>,
    /// Raw 1025-bin power spectra, one per 128-sample hop.
    fft_outputs: SpectrumRing,

    /// Scratch row shared by the spectral and spreading stages.
    spectrum_scratch: Vec<f32>,
    /// Max-suppressed spectra, the baseline for peak decisions.
    spread_outputs: SpectrumRing,

    // Chunk emission policy:
    max_time_seconds: f32,
    max_peaks: usize,

    /// Samples already emitted in previous chunks, for absolute offsets.
    emitted_samples: u64,
    num_peaks: usize,
    signature: DecodedSignature,
}

impl SignatureGenerator {
    /// Create a generator with the default chunking policy (3.1 seconds or
    /// 255 peaks per signature).
    pub fn new() -> Self {
        let config = Config::default();

        Self {
            input_pending_processing: Vec::new(),
            samples_processed: 0,

            sample_ring: Ring::new(WINDOW_SIZE),
            window_snapshot: vec![0i16; WINDOW_SIZE],
            reordered_samples: vec![0.0f32; WINDOW_SIZE],
            hanning_multipliers: hanning_window_multipliers(),

            fft_object: RFft1D::<f32>::new(WINDOW_SIZE),
            fft_outputs: SpectrumRing::new(SPECTRUM_RING_DEPTH, SPECTRUM_SIZE),

            spectrum_scratch: vec![0.0f32; SPECTRUM_SIZE],
            spread_outputs: SpectrumRing::new(SPECTRUM_RING_DEPTH, SPECTRUM_SIZE),

            max_time_seconds: config.max_time_seconds,
            max_peaks: config.max_peaks,

            emitted_samples: 0,
            num_peaks: 0,
            signature: Self::empty_signature(),
        }
    }

    /// Create a generator with an explicit chunking policy. The sample rate
    /// must be 16000 Hz; the analysis constants assume it.
    pub fn with_config(config: &Config) -> Result<Self> {
        if config.sample_rate != SAMPLE_RATE_HZ {
            return Err(SignatureError::UnsupportedSampleRate(config.sample_rate));
        }

        let mut this = Self::new();
        this.max_time_seconds = config.max_time_seconds;
        this.max_peaks = config.max_peaks;
        Ok(this)
    }

    /// Generate every signature chunk for a whole buffer at once.
    pub fn make_signatures_from_buffer(s16_mono_16khz_buffer: &[i16]) -> Vec<DecodedSignature> {
        let mut this = Self::new();
        this.feed_input(s16_mono_16khz_buffer);

        let mut signatures = Vec::new();
        while let Some(signature) = this.get_next_signature() {
            signatures.push(signature);
        }
        signatures
    }

    /// Enqueue raw samples. May be called incrementally.
    pub fn feed_input(&mut self, s16_mono_16khz_samples: &[i16]) {
        self.input_pending_processing
            .extend_from_slice(s16_mono_16khz_samples);
    }

    /// Consume pending samples and return the next signature chunk, if one
    /// can be completed.
    ///
    /// Samples are processed 128 at a time until the chunk reaches its
    /// duration or peak-count cap, or until fewer than 128 samples remain.
    /// A chunk cut short by the end of the queue is only emitted once the
    /// detector has started for it (46 passes); before that the primed
    /// state is kept and `None` is returned until more input arrives.
    pub fn get_next_signature(&mut self) -> Option<DecodedSignature> {
        if self.pending() < HOP_SIZE {
            return None;
        }

        while self.pending() >= HOP_SIZE && !self.chunk_is_full() {
            self.process_one_hop();
        }

        if self.chunk_is_full() || self.spread_outputs.total_written() >= DETECTION_DELAY_PASSES {
            Some(self.detach_signature())
        } else {
            None
        }
    }

    /// Like [`get_next_signature`](Self::get_next_signature), but pairs the
    /// chunk with its absolute start offset (in seconds) within the stream.
    pub fn next_signature_with_offset(&mut self) -> Option<(f64, DecodedSignature)> {
        let offset_samples = self.emitted_samples;
        let signature = self.get_next_signature()?;
        Some((
            offset_samples as f64 / signature.sample_rate_hz as f64,
            signature,
        ))
    }

    fn empty_signature() -> DecodedSignature {
        DecodedSignature {
            sample_rate_hz: SAMPLE_RATE_HZ,
            number_samples: 0,
            frequency_band_to_sound_peaks: HashMap::new(),
        }
    }

    fn pending(&self) -> usize {
        self.input_pending_processing.len() - self.samples_processed
    }

    fn chunk_is_full(&self) -> bool {
        self.signature.number_samples as f32 / SAMPLE_RATE_HZ as f32 >= self.max_time_seconds
            || self.num_peaks >= self.max_peaks
    }

    fn process_one_hop(&mut self) {
        let start = self.samples_processed;
        let mut hop = [0i16; HOP_SIZE];
        hop.copy_from_slice(&self.input_pending_processing[start..start + HOP_SIZE]);

        self.samples_processed += HOP_SIZE;
        self.signature.number_samples += HOP_SIZE as u32;

        self.do_fft(&hop);
        self.do_peak_spreading();

        if self.spread_outputs.total_written() >= DETECTION_DELAY_PASSES {
            self.do_peak_recognition();
        }
    }

    fn detach_signature(&mut self) -> DecodedSignature {
        let finished = std::mem::replace(&mut self.signature, Self::empty_signature());

        debug!(
            "emitting signature chunk: {} samples, {} peaks",
            finished.number_samples,
            finished.total_peaks()
        );

        self.sample_ring.reset();
        self.fft_outputs.reset();
        self.spread_outputs.reset();

        self.input_pending_processing.drain(..self.samples_processed);
        self.samples_processed = 0;
        self.num_peaks = 0;
        self.emitted_samples += finished.number_samples as u64;

        finished
    }

    fn do_fft(&mut self, hop: &[i16]) {
        // Roll the hop into the sample window, then reorder the window
        // (latest data at the end) and apply the Hanning multipliers

        self.sample_ring.write_block(hop);
        self.sample_ring.snapshot_into(&mut self.window_snapshot);

        for (index, multiplier) in self.hanning_multipliers.iter().enumerate() {
            self.reordered_samples[index] = self.window_snapshot[index] as f32 * multiplier;
        }

        // Perform Fast Fourier transform

        let complex_fft_results = self.fft_object.forward(&self.reordered_samples);

        assert_eq!(complex_fft_results.len(), SPECTRUM_SIZE);

        // Turn the complex bins into floored powers

        for (index, bin) in complex_fft_results.iter().enumerate() {
            self.spectrum_scratch[index] = (bin.re.powi(2) + bin.im.powi(2)).max(POWER_FLOOR);
        }

        self.fft_outputs.push_row(&self.spectrum_scratch);
    }

    fn do_peak_spreading(&mut self) {
        // Frequency-domain spreading: each bin absorbs the next two, in a
        // single ascending in-place pass

        self.spectrum_scratch.copy_from_slice(self.fft_outputs.row(-1));

        for bin in 0..=SPECTRUM_SIZE - 3 {
            self.spectrum_scratch[bin] = self.spectrum_scratch[bin]
                .max(self.spectrum_scratch[bin + 1])
                .max(self.spectrum_scratch[bin + 2]);
        }

        // Time-domain spreading: fold the new values into the frames from
        // 1, 3 and 6 passes ago. The running max absorbs each frame's prior
        // value before moving to the next, so older frames see the max of
        // everything newer along this path.

        for bin in 0..SPECTRUM_SIZE {
            let mut running_max = self.spectrum_scratch[bin];

            for &offset in &TIME_SPREAD_OFFSETS {
                let cell = &mut self.spread_outputs.row_mut(offset)[bin];
                *cell = cell.max(running_max);
                running_max = *cell;
            }
        }

        self.spread_outputs.push_row(&self.spectrum_scratch);
    }

    fn do_peak_recognition(&mut self) {
        // The inspected frame is the raw spectrum from 46 passes ago; the
        // spread ring provides its spatiotemporal neighborhood.

        let fft_minus_46 = self.fft_outputs.row(-(DETECTION_DELAY_PASSES as i32));
        let spread_baseline = self.spread_outputs.row(SPREAD_BASELINE_OFFSET);

        let fft_pass_number =
            (self.spread_outputs.total_written() - DETECTION_DELAY_PASSES) as u32;

        for bin_position in FIRST_CANDIDATE_BIN..=LAST_CANDIDATE_BIN {
            if self.num_peaks >= self.max_peaks {
                break;
            }

            // Ensure that the bin is loud enough, and not below the
            // baseline at the previous bin

            if fft_minus_46[bin_position] < MIN_PEAK_POWER
                || fft_minus_46[bin_position] < spread_baseline[bin_position - 1]
            {
                continue;
            }

            // Ensure that it dominates its frequency neighborhood in the
            // baseline frame

            let mut max_neighbor_in_baseline: f32 = 0.0;

            for &neighbor_offset in &FREQUENCY_NEIGHBOR_OFFSETS {
                let neighbor = (bin_position as i32 + neighbor_offset) as usize;
                max_neighbor_in_baseline = max_neighbor_in_baseline.max(spread_baseline[neighbor]);
            }

            if fft_minus_46[bin_position] <= max_neighbor_in_baseline {
                continue;
            }

            // Ensure that it also dominates the spread frames at other
            // times, probed one bin down

            let mut max_neighbor_in_other_frames = max_neighbor_in_baseline;

            for &frame_offset in NEAR_TIME_DOMINANCE_OFFSETS
                .iter()
                .chain(FAR_TIME_DOMINANCE_OFFSETS.iter())
            {
                let other_frame = self.spread_outputs.row(frame_offset);
                max_neighbor_in_other_frames =
                    max_neighbor_in_other_frames.max(other_frame[bin_position - 1]);
            }

            if fft_minus_46[bin_position] <= max_neighbor_in_other_frames {
                continue;
            }

            // Sub-bin frequency correction: parabolic interpolation over
            // the log magnitudes of the bin and its direct neighbors,
            // requiring strict concavity

            let magnitude_before = log_magnitude(fft_minus_46[bin_position - 1]);
            let magnitude_here = log_magnitude(fft_minus_46[bin_position]);
            let magnitude_after = log_magnitude(fft_minus_46[bin_position + 1]);

            let peak_variation_1 = magnitude_here * 2.0 - magnitude_before - magnitude_after;
            if peak_variation_1 <= 0.0 {
                continue;
            }

            let peak_variation_2 = (magnitude_after - magnitude_before) * 32.0 / peak_variation_1;

            let corrected_bin = bin_position as f32 * 64.0 + peak_variation_2;

            // Convert the corrected bin back to a frequency (1024 useful
            // bins, 64x sub-bin scaling) and gate to 250 Hz - 5.5 kHz

            let frequency_hz = corrected_bin * (SAMPLE_RATE_HZ as f32 / 2.0 / 1024.0 / 64.0);

            let frequency_band = match FrequencyBand::from_frequency_hz(frequency_hz) {
                Some(band) => band,
                None => continue,
            };

            self.signature
                .frequency_band_to_sound_peaks
                .entry(frequency_band)
                .or_insert_with(Vec::new)
                .push(FrequencyPeak {
                    fft_pass_number,
                    peak_magnitude: magnitude_here as u16,
                    corrected_peak_frequency_bin: corrected_bin as u16,
                    sample_rate_hz: SAMPLE_RATE_HZ,
                });
            self.num_peaks += 1;
        }
    }
}

impl Default for SignatureGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Map a spectrum power onto the logarithmic magnitude scale used for
/// stored peaks and for the sub-bin interpolation.
fn log_magnitude(power: f32) -> f32 {
    power.max(MIN_PEAK_POWER).ln() * MAGNITUDE_LN_SCALE + MAGNITUDE_OFFSET
}
