//! In-memory signature representation and the framed binary container codec.
//!
//! The container is little-endian: a 48-byte header carrying two magic
//! numbers, a CRC-32 over everything past the checksum field, the payload
//! size, the sample-rate enum in the upper 5 bits of one word, and a biased
//! sample count, followed by band-keyed peak records padded to 4-byte
//! boundaries.

use std::collections::HashMap;

use byteorder::{ByteOrder, LittleEndian};
use serde_json::json;

use crate::{Result, SignatureError};

/// First header magic, at offset 0.
const HEADER_MAGIC_1: u32 = 0xcafe2580;
/// Second header magic, at offset 12.
const HEADER_MAGIC_2: u32 = 0x94119c00;
/// Total header length; the size field at offset 8 excludes it.
const HEADER_SIZE: usize = 48;
/// Band records are tagged with this base plus the band id.
const BAND_TAG_BASE: u32 = 0x60030040;
/// On-wire length of one peak: u8 pass number, u16 magnitude, u16 bin.
const PEAK_RECORD_SIZE: usize = 5;

/// Prefix of the data-URI rendering of a binary signature.
pub const DATA_URI_PREFIX: &str = "data:audio/vnd.shazam.sig;base64,";

/// Frequency bands into which sound peaks are classified.
///
/// The 0-250 Hz band exists in the container schema but peaks below 250 Hz
/// are dropped before emission, so it never appears in generated signatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FrequencyBand {
    _0_250 = -1,
    _250_520 = 0,
    _520_1450 = 1,
    _1450_3500 = 2,
    _3500_5500 = 3,
}

impl FrequencyBand {
    pub fn id(self) -> i32 {
        self as i32
    }

    pub fn from_id(id: i32) -> Option<Self> {
        match id {
            -1 => Some(FrequencyBand::_0_250),
            0 => Some(FrequencyBand::_250_520),
            1 => Some(FrequencyBand::_520_1450),
            2 => Some(FrequencyBand::_1450_3500),
            3 => Some(FrequencyBand::_3500_5500),
            _ => None,
        }
    }

    /// Bucket a peak frequency, dropping everything outside 250-5500 Hz.
    pub fn from_frequency_hz(frequency_hz: f32) -> Option<Self> {
        match frequency_hz as i32 {
            250..=519 => Some(FrequencyBand::_250_520),
            520..=1449 => Some(FrequencyBand::_520_1450),
            1450..=3499 => Some(FrequencyBand::_1450_3500),
            3500..=5500 => Some(FrequencyBand::_3500_5500),
            _ => None,
        }
    }

    /// Band name used as the key in the JSON rendering.
    pub fn name(self) -> &'static str {
        match self {
            FrequencyBand::_0_250 => "0_250",
            FrequencyBand::_250_520 => "250_520",
            FrequencyBand::_520_1450 => "520_1450",
            FrequencyBand::_1450_3500 => "1450_3500",
            FrequencyBand::_3500_5500 => "3500_5500",
        }
    }
}

/// Sample rates recognized by the container header, keyed by the id stored
/// in the upper 5 bits of the header word at offset 28.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleRate {
    _8000 = 1,
    _11025 = 2,
    _16000 = 3,
    _32000 = 4,
    _44100 = 5,
    _48000 = 6,
}

impl SampleRate {
    pub fn from_id(id: u32) -> Result<Self> {
        match id {
            1 => Ok(SampleRate::_8000),
            2 => Ok(SampleRate::_11025),
            3 => Ok(SampleRate::_16000),
            4 => Ok(SampleRate::_32000),
            5 => Ok(SampleRate::_44100),
            6 => Ok(SampleRate::_48000),
            _ => Err(SignatureError::UnsupportedSampleRate(id)),
        }
    }

    pub fn from_hz(hz: u32) -> Result<Self> {
        match hz {
            8000 => Ok(SampleRate::_8000),
            11025 => Ok(SampleRate::_11025),
            16000 => Ok(SampleRate::_16000),
            32000 => Ok(SampleRate::_32000),
            44100 => Ok(SampleRate::_44100),
            48000 => Ok(SampleRate::_48000),
            _ => Err(SignatureError::UnsupportedSampleRate(hz)),
        }
    }

    pub fn id(self) -> u32 {
        self as u32
    }

    pub fn hz(self) -> u32 {
        match self {
            SampleRate::_8000 => 8000,
            SampleRate::_11025 => 11025,
            SampleRate::_16000 => 16000,
            SampleRate::_32000 => 32000,
            SampleRate::_44100 => 44100,
            SampleRate::_48000 => 48000,
        }
    }

    /// Opaque bias added to the sample count stored at header offset 44.
    fn header_bias(self) -> u32 {
        (self.hz() as f64 * 0.24) as u32
    }
}

/// One detected spectral peak.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrequencyPeak {
    pub fft_pass_number: u32,
    pub peak_magnitude: u16,
    pub corrected_peak_frequency_bin: u16,
    pub sample_rate_hz: u32,
}

impl FrequencyPeak {
    /// Convert the corrected FFT bin back to a frequency, undoing the 1024
    /// useful bins and the 64x sub-bin scaling applied before storage.
    pub fn frequency_hz(&self) -> f32 {
        self.corrected_peak_frequency_bin as f32 * (self.sample_rate_hz as f32 / 2.0 / 1024.0 / 64.0)
    }

    /// Approximate PCM amplitude recovered from the logarithmic magnitude.
    pub fn amplitude_pcm(&self) -> f32 {
        let power = ((self.peak_magnitude as f32 - 6144.0) / 1477.3).exp();
        (power * (1 << 17) as f32 / 2.0).sqrt() / 1024.0
    }

    /// Position of the peak in the stream, in seconds.
    pub fn seconds(&self) -> f32 {
        self.fft_pass_number as f32 * 128.0 / self.sample_rate_hz as f32
    }
}

/// A decoded (in-memory) signature: the sparse time-frequency peak map for
/// one bounded chunk of input audio.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedSignature {
    pub sample_rate_hz: u32,
    pub number_samples: u32,
    pub frequency_band_to_sound_peaks: HashMap<FrequencyBand, Vec<FrequencyPeak>>,
}

impl DecodedSignature {
    /// Duration of the audio covered by this signature, in seconds.
    pub fn seconds(&self) -> f64 {
        self.number_samples as f64 / self.sample_rate_hz as f64
    }

    /// Total number of peaks across all bands.
    pub fn total_peaks(&self) -> usize {
        self.frequency_band_to_sound_peaks
            .values()
            .map(|peaks| peaks.len())
            .sum()
    }

    /// Serialize to the framed binary container.
    ///
    /// Bands are written in ascending band-id order so that encoding a given
    /// signature always produces identical bytes. Pass numbers saturate to
    /// one byte on the wire.
    pub fn encode_to_binary(&self) -> Result<Vec<u8>> {
        let sample_rate = SampleRate::from_hz(self.sample_rate_hz)?;

        let mut buffer =
            Vec::with_capacity(HEADER_SIZE + self.total_peaks() * (PEAK_RECORD_SIZE + 3) + 64);

        push_u32(&mut buffer, HEADER_MAGIC_1);
        push_u32(&mut buffer, 0); // CRC-32, patched once everything else is written
        push_u32(&mut buffer, 0); // size minus header, patched below
        push_u32(&mut buffer, HEADER_MAGIC_2);
        buffer.resize(buffer.len() + 12, 0); // reserved
        push_u32(&mut buffer, sample_rate.id() << 27);
        buffer.resize(buffer.len() + 12, 0); // reserved
        push_u32(&mut buffer, self.number_samples + sample_rate.header_bias());

        let mut sorted_bands: Vec<(&FrequencyBand, &Vec<FrequencyPeak>)> =
            self.frequency_band_to_sound_peaks.iter().collect();
        sorted_bands.sort_by_key(|(band, _)| band.id());

        for (band, peaks) in sorted_bands {
            push_u32(&mut buffer, BAND_TAG_BASE.wrapping_add(band.id() as u32));
            push_u32(&mut buffer, (peaks.len() * PEAK_RECORD_SIZE) as u32);

            for peak in peaks {
                buffer.push(peak.fft_pass_number.min(u8::MAX as u32) as u8);
                push_u16(&mut buffer, peak.peak_magnitude);
                push_u16(&mut buffer, peak.corrected_peak_frequency_bin);
            }

            while buffer.len() % 4 != 0 {
                buffer.push(0);
            }
        }

        let size_minus_header = (buffer.len() - HEADER_SIZE) as u32;
        LittleEndian::write_u32(&mut buffer[8..12], size_minus_header);

        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&buffer[8..]);
        LittleEndian::write_u32(&mut buffer[4..8], hasher.finalize());

        Ok(buffer)
    }

    /// Parse a framed binary container back into a signature.
    pub fn decode_from_binary(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_SIZE {
            return Err(SignatureError::InvalidContainer {
                offset: 0,
                expected: format!("at least {} header bytes", HEADER_SIZE),
                actual: format!("{} bytes", data.len()),
            });
        }

        let magic_1 = LittleEndian::read_u32(&data[0..4]);
        if magic_1 != HEADER_MAGIC_1 {
            return Err(SignatureError::InvalidContainer {
                offset: 0,
                expected: format!("magic {:#010x}", HEADER_MAGIC_1),
                actual: format!("{:#010x}", magic_1),
            });
        }

        let stored_crc = LittleEndian::read_u32(&data[4..8]);
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&data[8..]);
        let computed_crc = hasher.finalize();
        if stored_crc != computed_crc {
            return Err(SignatureError::InvalidContainer {
                offset: 4,
                expected: format!("CRC-32 {:#010x}", computed_crc),
                actual: format!("{:#010x}", stored_crc),
            });
        }

        let size_minus_header = LittleEndian::read_u32(&data[8..12]);
        if size_minus_header as usize != data.len() - HEADER_SIZE {
            return Err(SignatureError::InvalidContainer {
                offset: 8,
                expected: format!("payload size {}", data.len() - HEADER_SIZE),
                actual: format!("{}", size_minus_header),
            });
        }

        let magic_2 = LittleEndian::read_u32(&data[12..16]);
        if magic_2 != HEADER_MAGIC_2 {
            return Err(SignatureError::InvalidContainer {
                offset: 12,
                expected: format!("magic {:#010x}", HEADER_MAGIC_2),
                actual: format!("{:#010x}", magic_2),
            });
        }

        let sample_rate = SampleRate::from_id(LittleEndian::read_u32(&data[28..32]) >> 27)?;
        let sample_rate_hz = sample_rate.hz();

        let biased_number_samples = LittleEndian::read_u32(&data[44..48]);
        let number_samples = biased_number_samples
            .checked_sub(sample_rate.header_bias())
            .ok_or_else(|| SignatureError::InvalidContainer {
                offset: 44,
                expected: format!("biased sample count >= {}", sample_rate.header_bias()),
                actual: format!("{}", biased_number_samples),
            })?;

        let mut frequency_band_to_sound_peaks: HashMap<FrequencyBand, Vec<FrequencyPeak>> =
            HashMap::new();

        let mut offset = HEADER_SIZE;
        while offset < data.len() {
            let tag = read_u32_at(data, offset, "band tag")?;
            let frequency_band = FrequencyBand::from_id(tag.wrapping_sub(BAND_TAG_BASE) as i32)
                .ok_or_else(|| SignatureError::InvalidContainer {
                    offset,
                    expected: "a band tag in 0x6003003f..=0x60030043".to_string(),
                    actual: format!("{:#010x}", tag),
                })?;

            let payload_len = read_u32_at(data, offset + 4, "band payload length")? as usize;
            if payload_len % PEAK_RECORD_SIZE != 0 {
                return Err(SignatureError::InvalidContainer {
                    offset: offset + 4,
                    expected: format!("payload length multiple of {}", PEAK_RECORD_SIZE),
                    actual: format!("{}", payload_len),
                });
            }

            let padding = (4 - payload_len % 4) % 4;
            let record_end = offset as u64 + 8 + payload_len as u64 + padding as u64;
            if record_end > data.len() as u64 {
                return Err(SignatureError::InvalidContainer {
                    offset,
                    expected: format!("{} band record bytes", 8 + payload_len + padding),
                    actual: format!("{} bytes left", data.len() - offset),
                });
            }

            let peaks = frequency_band_to_sound_peaks
                .entry(frequency_band)
                .or_insert_with(Vec::new);

            let mut peak_offset = offset + 8;
            for _ in 0..payload_len / PEAK_RECORD_SIZE {
                peaks.push(FrequencyPeak {
                    fft_pass_number: data[peak_offset] as u32,
                    peak_magnitude: LittleEndian::read_u16(&data[peak_offset + 1..peak_offset + 3]),
                    corrected_peak_frequency_bin: LittleEndian::read_u16(
                        &data[peak_offset + 3..peak_offset + 5],
                    ),
                    sample_rate_hz,
                });
                peak_offset += PEAK_RECORD_SIZE;
            }

            offset = record_end as usize;
        }

        Ok(DecodedSignature {
            sample_rate_hz,
            number_samples,
            frequency_band_to_sound_peaks,
        })
    }

    /// Render as a `data:audio/vnd.shazam.sig;base64,...` URI.
    pub fn encode_to_uri(&self) -> Result<String> {
        Ok(format!(
            "{}{}",
            DATA_URI_PREFIX,
            base64::encode(&self.encode_to_binary()?)
        ))
    }

    /// Parse a signature data URI. Any other URI scheme or media type is
    /// rejected.
    pub fn decode_from_uri(uri: &str) -> Result<Self> {
        let payload = uri.strip_prefix(DATA_URI_PREFIX).ok_or_else(|| {
            SignatureError::InvalidUri(format!("expected the {:?} prefix", DATA_URI_PREFIX))
        })?;

        let binary = base64::decode(payload)
            .map_err(|error| SignatureError::InvalidUri(format!("bad base64 payload: {}", error)))?;

        Self::decode_from_binary(&binary)
    }

    /// JSON view of the signature, with derived fields prefixed by `_`.
    pub fn to_json(&self) -> serde_json::Value {
        let mut sorted_bands: Vec<(&FrequencyBand, &Vec<FrequencyPeak>)> =
            self.frequency_band_to_sound_peaks.iter().collect();
        sorted_bands.sort_by_key(|(band, _)| band.id());

        let mut bands = serde_json::Map::new();
        for (band, peaks) in sorted_bands {
            let rendered: Vec<serde_json::Value> = peaks
                .iter()
                .map(|peak| {
                    json!({
                        "fft_pass_number": peak.fft_pass_number,
                        "peak_magnitude": peak.peak_magnitude,
                        "corrected_peak_frequency_bin": peak.corrected_peak_frequency_bin,
                        "_frequency_hz": peak.frequency_hz(),
                        "_amplitude_pcm": peak.amplitude_pcm(),
                        "_seconds": peak.seconds(),
                    })
                })
                .collect();
            bands.insert(band.name().to_string(), serde_json::Value::Array(rendered));
        }

        json!({
            "sample_rate_hz": self.sample_rate_hz,
            "number_samples": self.number_samples,
            "_seconds": self.seconds(),
            "frequency_band_to_peaks": bands,
        })
    }
}

fn push_u32(buffer: &mut Vec<u8>, value: u32) {
    let mut bytes = [0u8; 4];
    LittleEndian::write_u32(&mut bytes, value);
    buffer.extend_from_slice(&bytes);
}

fn push_u16(buffer: &mut Vec<u8>, value: u16) {
    let mut bytes = [0u8; 2];
    LittleEndian::write_u16(&mut bytes, value);
    buffer.extend_from_slice(&bytes);
}

fn read_u32_at(data: &[u8], offset: usize, what: &str) -> Result<u32> {
    if data.len() < offset + 4 {
        return Err(SignatureError::InvalidContainer {
            offset,
            expected: format!("4 bytes for {}", what),
            actual: format!("{} bytes left", data.len().saturating_sub(offset)),
        });
    }
    Ok(LittleEndian::read_u32(&data[offset..offset + 4]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_signature() -> DecodedSignature {
        let mut frequency_band_to_sound_peaks = HashMap::new();
        frequency_band_to_sound_peaks.insert(
            FrequencyBand::_250_520,
            vec![FrequencyPeak {
                fft_pass_number: 12,
                peak_magnitude: 41234,
                corrected_peak_frequency_bin: 2400,
                sample_rate_hz: 16000,
            }],
        );
        frequency_band_to_sound_peaks.insert(
            FrequencyBand::_520_1450,
            vec![
                FrequencyPeak {
                    fft_pass_number: 15,
                    peak_magnitude: 52000,
                    corrected_peak_frequency_bin: 8192,
                    sample_rate_hz: 16000,
                },
                FrequencyPeak {
                    fft_pass_number: 100,
                    peak_magnitude: 48000,
                    corrected_peak_frequency_bin: 9000,
                    sample_rate_hz: 16000,
                },
            ],
        );

        DecodedSignature {
            sample_rate_hz: 16000,
            number_samples: 49664,
            frequency_band_to_sound_peaks,
        }
    }

    fn refresh_crc(buffer: &mut [u8]) {
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&buffer[8..]);
        let crc = hasher.finalize();
        LittleEndian::write_u32(&mut buffer[4..8], crc);
    }

    #[test]
    fn test_header_layout() {
        let signature = sample_signature();
        let encoded = signature.encode_to_binary().unwrap();

        assert_eq!(LittleEndian::read_u32(&encoded[0..4]), 0xcafe2580);
        assert_eq!(LittleEndian::read_u32(&encoded[12..16]), 0x94119c00);
        assert_eq!(
            LittleEndian::read_u32(&encoded[8..12]) as usize,
            encoded.len() - 48
        );
        // 16 kHz is id 3, stored in the upper 5 bits
        assert_eq!(LittleEndian::read_u32(&encoded[28..32]), 3 << 27);
        // sample count is biased by 0.24 * 16000 = 3840
        assert_eq!(LittleEndian::read_u32(&encoded[44..48]), 49664 + 3840);
        // reserved regions stay zeroed
        assert!(encoded[16..28].iter().all(|&byte| byte == 0));
        assert!(encoded[32..44].iter().all(|&byte| byte == 0));
    }

    #[test]
    fn test_band_records_are_aligned() {
        let encoded = sample_signature().encode_to_binary().unwrap();

        // one record of 1 peak (8 + 5 -> 16 padded) and one of 2 peaks
        // (8 + 10 -> 20 padded)
        assert_eq!(encoded.len(), 48 + 16 + 20);

        let tag = LittleEndian::read_u32(&encoded[48..52]);
        assert_eq!(tag, 0x60030040); // band 250-520 comes first
        assert_eq!(LittleEndian::read_u32(&encoded[52..56]), 5);

        let tag = LittleEndian::read_u32(&encoded[64..68]);
        assert_eq!(tag, 0x60030041);
        assert_eq!(LittleEndian::read_u32(&encoded[68..72]), 10);
    }

    #[test]
    fn test_binary_round_trip() {
        let signature = sample_signature();
        let decoded =
            DecodedSignature::decode_from_binary(&signature.encode_to_binary().unwrap()).unwrap();
        assert_eq!(decoded, signature);
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let signature = sample_signature();
        assert_eq!(
            signature.encode_to_binary().unwrap(),
            signature.encode_to_binary().unwrap()
        );
    }

    #[test]
    fn test_empty_signature_round_trip() {
        let signature = DecodedSignature {
            sample_rate_hz: 16000,
            number_samples: 160000,
            frequency_band_to_sound_peaks: HashMap::new(),
        };
        let encoded = signature.encode_to_binary().unwrap();
        assert_eq!(encoded.len(), 48);
        assert_eq!(
            DecodedSignature::decode_from_binary(&encoded).unwrap(),
            signature
        );
    }

    #[test]
    fn test_wrong_magic_is_rejected() {
        let mut encoded = sample_signature().encode_to_binary().unwrap();
        LittleEndian::write_u32(&mut encoded[0..4], 0xdeadbeef);

        let error = DecodedSignature::decode_from_binary(&encoded).unwrap_err();
        assert!(matches!(
            error,
            SignatureError::InvalidContainer { offset: 0, .. }
        ));
    }

    #[test]
    fn test_any_payload_byte_flip_fails_the_crc() {
        let encoded = sample_signature().encode_to_binary().unwrap();

        for position in &[8, 13, 30, 47, 50, encoded.len() - 1] {
            let mut tampered = encoded.clone();
            tampered[*position] ^= 0x01;

            let error = DecodedSignature::decode_from_binary(&tampered).unwrap_err();
            assert!(
                matches!(error, SignatureError::InvalidContainer { .. }),
                "flip at {} was not rejected",
                position
            );
        }
    }

    #[test]
    fn test_size_field_mismatch_is_rejected() {
        let mut encoded = sample_signature().encode_to_binary().unwrap();
        LittleEndian::write_u32(&mut encoded[8..12], 9999);
        refresh_crc(&mut encoded);

        let error = DecodedSignature::decode_from_binary(&encoded).unwrap_err();
        assert!(matches!(
            error,
            SignatureError::InvalidContainer { offset: 8, .. }
        ));
    }

    #[test]
    fn test_unknown_sample_rate_id_is_rejected() {
        let mut encoded = sample_signature().encode_to_binary().unwrap();
        LittleEndian::write_u32(&mut encoded[28..32], 7 << 27);
        refresh_crc(&mut encoded);

        let error = DecodedSignature::decode_from_binary(&encoded).unwrap_err();
        assert!(matches!(error, SignatureError::UnsupportedSampleRate(7)));
    }

    #[test]
    fn test_biased_sample_count_underflow_is_rejected() {
        let mut encoded = sample_signature().encode_to_binary().unwrap();
        LittleEndian::write_u32(&mut encoded[44..48], 100); // below the 3840 bias
        refresh_crc(&mut encoded);

        let error = DecodedSignature::decode_from_binary(&encoded).unwrap_err();
        assert!(matches!(
            error,
            SignatureError::InvalidContainer { offset: 44, .. }
        ));
    }

    #[test]
    fn test_unknown_band_tag_is_rejected() {
        let mut encoded = sample_signature().encode_to_binary().unwrap();
        LittleEndian::write_u32(&mut encoded[48..52], 0x70000000);
        refresh_crc(&mut encoded);

        let error = DecodedSignature::decode_from_binary(&encoded).unwrap_err();
        assert!(matches!(
            error,
            SignatureError::InvalidContainer { offset: 48, .. }
        ));
    }

    #[test]
    fn test_truncated_band_record_is_rejected() {
        let mut encoded = sample_signature().encode_to_binary().unwrap();
        encoded.truncate(48 + 10); // cut inside the first peak record
        let new_size = (encoded.len() - 48) as u32;
        LittleEndian::write_u32(&mut encoded[8..12], new_size);
        refresh_crc(&mut encoded);

        let error = DecodedSignature::decode_from_binary(&encoded).unwrap_err();
        assert!(matches!(
            error,
            SignatureError::InvalidContainer { offset: 48, .. }
        ));
    }

    #[test]
    fn test_payload_length_must_be_a_multiple_of_five() {
        let signature = DecodedSignature {
            sample_rate_hz: 16000,
            number_samples: 1000,
            frequency_band_to_sound_peaks: HashMap::new(),
        };
        let mut encoded = signature.encode_to_binary().unwrap();

        // append a band record whose payload length is not 5-aligned
        let mut bytes = [0u8; 4];
        LittleEndian::write_u32(&mut bytes, 0x60030041);
        encoded.extend_from_slice(&bytes);
        LittleEndian::write_u32(&mut bytes, 6);
        encoded.extend_from_slice(&bytes);
        encoded.extend_from_slice(&[0u8; 8]); // 6 payload bytes + 2 padding

        let new_size = (encoded.len() - 48) as u32;
        LittleEndian::write_u32(&mut encoded[8..12], new_size);
        refresh_crc(&mut encoded);

        let error = DecodedSignature::decode_from_binary(&encoded).unwrap_err();
        assert!(matches!(
            error,
            SignatureError::InvalidContainer { offset: 52, .. }
        ));
    }

    #[test]
    fn test_pass_numbers_saturate_to_one_byte_on_the_wire() {
        let mut frequency_band_to_sound_peaks = HashMap::new();
        frequency_band_to_sound_peaks.insert(
            FrequencyBand::_250_520,
            vec![FrequencyPeak {
                fft_pass_number: 300,
                peak_magnitude: 100,
                corrected_peak_frequency_bin: 2400,
                sample_rate_hz: 16000,
            }],
        );
        let signature = DecodedSignature {
            sample_rate_hz: 16000,
            number_samples: 48000,
            frequency_band_to_sound_peaks,
        };

        let decoded =
            DecodedSignature::decode_from_binary(&signature.encode_to_binary().unwrap()).unwrap();
        let peaks = &decoded.frequency_band_to_sound_peaks[&FrequencyBand::_250_520];
        assert_eq!(peaks[0].fft_pass_number, 255);
    }

    #[test]
    fn test_uri_round_trip() {
        let signature = sample_signature();
        let uri = signature.encode_to_uri().unwrap();

        assert!(uri.starts_with("data:audio/vnd.shazam.sig;base64,"));
        assert_eq!(DecodedSignature::decode_from_uri(&uri).unwrap(), signature);
    }

    #[test]
    fn test_uri_prefix_is_enforced() {
        let error = DecodedSignature::decode_from_uri("data:text/plain;base64,AAAA").unwrap_err();
        assert!(matches!(error, SignatureError::InvalidUri(_)));

        let error =
            DecodedSignature::decode_from_uri("data:audio/vnd.shazam.sig;base64,@@@").unwrap_err();
        assert!(matches!(error, SignatureError::InvalidUri(_)));
    }

    #[test]
    fn test_unsupported_sample_rate_on_encode() {
        let signature = DecodedSignature {
            sample_rate_hz: 22050,
            number_samples: 0,
            frequency_band_to_sound_peaks: HashMap::new(),
        };
        let error = signature.encode_to_binary().unwrap_err();
        assert!(matches!(error, SignatureError::UnsupportedSampleRate(22050)));
    }

    #[test]
    fn test_band_gating_edges() {
        assert_eq!(FrequencyBand::from_frequency_hz(249.9), None);
        assert_eq!(
            FrequencyBand::from_frequency_hz(250.0),
            Some(FrequencyBand::_250_520)
        );
        assert_eq!(
            FrequencyBand::from_frequency_hz(520.0),
            Some(FrequencyBand::_520_1450)
        );
        assert_eq!(
            FrequencyBand::from_frequency_hz(1450.0),
            Some(FrequencyBand::_1450_3500)
        );
        assert_eq!(
            FrequencyBand::from_frequency_hz(3500.0),
            Some(FrequencyBand::_3500_5500)
        );
        assert_eq!(
            FrequencyBand::from_frequency_hz(5500.0),
            Some(FrequencyBand::_3500_5500)
        );
        assert_eq!(FrequencyBand::from_frequency_hz(5501.0), None);
    }

    #[test]
    fn test_peak_derived_quantities() {
        let peak = FrequencyPeak {
            fft_pass_number: 125,
            peak_magnitude: 6144,
            corrected_peak_frequency_bin: 8192,
            sample_rate_hz: 16000,
        };

        // 8192 corrected units = bin 128 = exactly 1000 Hz at 16 kHz
        assert!((peak.frequency_hz() - 1000.0).abs() < 1e-3);
        // 125 passes = 16000 samples = 1 second
        assert!((peak.seconds() - 1.0).abs() < 1e-6);
        // magnitude 6144 decodes to power 1.0
        let expected = (1.0f32 * (1 << 17) as f32 / 2.0).sqrt() / 1024.0;
        assert!((peak.amplitude_pcm() - expected).abs() < 1e-6);
    }

    #[test]
    fn test_json_rendering() {
        let rendered = sample_signature().to_json();

        assert_eq!(rendered["sample_rate_hz"], 16000);
        assert_eq!(rendered["number_samples"], 49664);
        assert!((rendered["_seconds"].as_f64().unwrap() - 3.104).abs() < 1e-9);

        let bands = rendered["frequency_band_to_peaks"].as_object().unwrap();
        assert_eq!(bands.len(), 2);
        let peaks = bands["520_1450"].as_array().unwrap();
        assert_eq!(peaks.len(), 2);
        assert_eq!(peaks[0]["fft_pass_number"], 15);
        assert_eq!(peaks[0]["corrected_peak_frequency_bin"], 8192);
        assert!((peaks[0]["_frequency_hz"].as_f64().unwrap() - 1000.0).abs() < 0.01);
        assert!(peaks[0]["_amplitude_pcm"].as_f64().is_some());
        assert!(peaks[0]["_seconds"].as_f64().is_some());
    }

    #[test]
    fn test_sample_rate_enum() {
        assert_eq!(SampleRate::from_id(3).unwrap(), SampleRate::_16000);
        assert_eq!(SampleRate::from_hz(44100).unwrap().id(), 5);
        assert_eq!(SampleRate::_48000.hz(), 48000);
        assert!(SampleRate::from_id(0).is_err());
        assert!(SampleRate::from_id(7).is_err());
    }
}
