use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Cursor;
use thiserror::Error;

/// WAV decoding or encoding failure
#[derive(Debug, Error)]
#[error("{0}")]
pub struct CodecError(String);

impl From<hound::Error> for CodecError {
    fn from(err: hound::Error) -> Self {
        Self(err.to_string())
    }
}

/// Sample encoding inside the data chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleEncoding {
    /// Linear PCM integers
    Int,
    /// IEEE float
    Float,
}

/// Format parameters that must match across every chunk of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WavFormat {
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of interleaved channels
    pub channels: u16,
    /// Bits per sample
    pub bits_per_sample: u16,
    pub encoding: SampleEncoding,
}

impl WavFormat {
    pub fn pcm16(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels,
            bits_per_sample: 16,
            encoding: SampleEncoding::Int,
        }
    }

    pub fn duration_seconds(&self, frame_count: u64) -> f64 {
        frame_count as f64 / self.sample_rate as f64
    }
}

impl fmt::Display for WavFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let encoding = match self.encoding {
            SampleEncoding::Int => "int",
            SampleEncoding::Float => "float",
        };
        write!(
            f,
            "{}Hz/{}ch/{}-bit {}",
            self.sample_rate, self.channels, self.bits_per_sample, encoding
        )
    }
}

impl From<WavSpec> for WavFormat {
    fn from(spec: WavSpec) -> Self {
        Self {
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            bits_per_sample: spec.bits_per_sample,
            encoding: match spec.sample_format {
                SampleFormat::Int => SampleEncoding::Int,
                SampleFormat::Float => SampleEncoding::Float,
            },
        }
    }
}

impl From<WavFormat> for WavSpec {
    fn from(format: WavFormat) -> Self {
        Self {
            channels: format.channels,
            sample_rate: format.sample_rate,
            bits_per_sample: format.bits_per_sample,
            sample_format: match format.encoding {
                SampleEncoding::Int => SampleFormat::Int,
                SampleEncoding::Float => SampleFormat::Float,
            },
        }
    }
}

/// Parsed container header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavHeader {
    pub format: WavFormat,
    /// Frames (samples per channel) in the data chunk
    pub frame_count: u32,
}

/// Interleaved sample data with the container framing stripped
#[derive(Debug, Clone, PartialEq)]
pub enum SamplePayload {
    Int(Vec<i32>),
    Float(Vec<f32>),
}

impl SamplePayload {
    /// Number of interleaved samples
    pub fn len(&self) -> usize {
        match self {
            Self::Int(samples) => samples.len(),
            Self::Float(samples) => samples.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append `other` after the samples already held
    pub fn extend(&mut self, other: SamplePayload) -> Result<(), CodecError> {
        match (self, other) {
            (Self::Int(ours), Self::Int(theirs)) => ours.extend(theirs),
            (Self::Float(ours), Self::Float(theirs)) => ours.extend(theirs),
            _ => {
                return Err(CodecError(
                    "cannot join integer and float sample data".to_string(),
                ))
            }
        }
        Ok(())
    }
}

/// Read the format parameters and frame count from a WAV container
pub fn parse_header(bytes: &[u8]) -> Result<WavHeader, CodecError> {
    let reader = WavReader::new(Cursor::new(bytes))?;
    Ok(WavHeader {
        format: reader.spec().into(),
        frame_count: reader.duration(),
    })
}

/// Decode every sample in the data chunk
pub fn extract_frames(bytes: &[u8]) -> Result<SamplePayload, CodecError> {
    let reader = WavReader::new(Cursor::new(bytes))?;
    let payload = match reader.spec().sample_format {
        SampleFormat::Int => SamplePayload::Int(
            reader
                .into_samples::<i32>()
                .collect::<Result<Vec<_>, _>>()?,
        ),
        SampleFormat::Float => SamplePayload::Float(
            reader
                .into_samples::<f32>()
                .collect::<Result<Vec<_>, _>>()?,
        ),
    };
    Ok(payload)
}

/// Encode `payload` into a new container carrying `format`
///
/// The RIFF and data sizes (and so the frame count) are derived from the
/// payload length.
pub fn build_container(format: WavFormat, payload: &SamplePayload) -> Result<Vec<u8>, CodecError> {
    if payload.len() % format.channels.max(1) as usize != 0 {
        return Err(CodecError(format!(
            "{} samples do not divide into {} channels",
            payload.len(),
            format.channels
        )));
    }

    let mut cursor = Cursor::new(Vec::new());
    let mut writer = WavWriter::new(&mut cursor, format.into())?;
    match payload {
        SamplePayload::Int(samples) => {
            for &sample in samples {
                writer.write_sample(sample)?;
            }
        }
        SamplePayload::Float(samples) => {
            for &sample in samples {
                writer.write_sample(sample)?;
            }
        }
    }
    writer.finalize()?;

    Ok(cursor.into_inner())
}
