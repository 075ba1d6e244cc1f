//! # shazamsig
//!
//! A Rust library for computing Shazam-compatible acoustic signatures from
//! raw PCM audio and for converting signatures to and from their versioned
//! binary container and data-URI forms.
//!
//! The pipeline is a streaming DSP state machine: 16 kHz mono samples are
//! analyzed in overlapped 2048-sample windows every 128 samples, spectral
//! peaks are selected against a time-frequency max-suppressed baseline, and
//! peaks accumulate into bounded signature chunks (at most 3.1 seconds or
//! 255 peaks each).
//!
//! ## Example
//!
//! ```rust,no_run
//! use shazamsig::SignatureGenerator;
//!
//! let samples: Vec<i16> = vec![0; 4 * 16000]; // 16 kHz mono PCM
//!
//! let mut generator = SignatureGenerator::new();
//! generator.feed_input(&samples);
//!
//! while let Some(signature) = generator.get_next_signature() {
//!     let uri = signature.encode_to_uri().unwrap();
//!     println!("{}", uri);
//! }
//! ```

pub mod config;

pub mod fingerprinting {
    pub mod algorithm;
    pub mod hanning;
    pub mod ring;
    pub mod signature_format;
}

pub use config::Config;
pub use fingerprinting::algorithm::SignatureGenerator;
pub use fingerprinting::signature_format::{
    DecodedSignature, FrequencyBand, FrequencyPeak, SampleRate,
};

/// Current version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Error types for the library
#[derive(Debug)]
pub enum SignatureError {
    /// A binary container failed validation: bad magic, size or CRC, a
    /// malformed sample count, or a truncated or unknown band record.
    InvalidContainer {
        offset: usize,
        expected: String,
        actual: String,
    },
    /// A data URI did not carry the signature prefix or valid base64.
    InvalidUri(String),
    /// A sample rate (in Hz or as a header id) outside the recognized enum.
    UnsupportedSampleRate(u32),
}

impl std::fmt::Display for SignatureError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SignatureError::InvalidContainer {
                offset,
                expected,
                actual,
            } => write!(
                f,
                "Invalid container at offset {}: expected {}, got {}",
                offset, expected, actual
            ),
            SignatureError::InvalidUri(msg) => write!(f, "Invalid signature URI: {}", msg),
            SignatureError::UnsupportedSampleRate(value) => {
                write!(f, "Unsupported sample rate: {}", value)
            }
        }
    }
}

impl std::error::Error for SignatureError {}

/// Result type for the library
pub type Result<T> = std::result::Result<T, SignatureError>;
