//! Response records and the ordered response list

use super::ident::ChannelId;
use serde::Serialize;
use std::fmt;

/// One complex spectral value
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ComplexValue {
    real: f64,
    imag: f64,
}

impl ComplexValue {
    #[inline]
    pub const fn new(real: f64, imag: f64) -> Self {
        Self { real, imag }
    }

    #[inline]
    pub const fn real(&self) -> f64 {
        self.real
    }

    #[inline]
    pub const fn imag(&self) -> f64 {
        self.imag
    }

    /// Amplitude (modulus)
    pub fn amplitude(&self) -> f64 {
        self.real.hypot(self.imag)
    }

    /// Phase in degrees
    pub fn phase_degrees(&self) -> f64 {
        self.imag.atan2(self.real).to_degrees()
    }
}

/// Frequency/spectrum arrays that do not describe a valid response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeError {
    Empty,
    LengthMismatch { spectrum: usize, frequencies: usize },
}

impl fmt::Display for ShapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "response has no frequency values"),
            Self::LengthMismatch { spectrum, frequencies } => write!(
                f,
                "spectrum length {} does not match frequency count {}",
                spectrum, frequencies
            ),
        }
    }
}

impl std::error::Error for ShapeError {}

/// One station/channel/network/location match
///
/// `spectrum[i]` is the response at `frequencies[i]`; both always have the
/// same non-zero length.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseRecord {
    id: ChannelId,
    frequencies: Vec<f64>,
    spectrum: Vec<ComplexValue>,
}

impl ResponseRecord {
    pub fn new(
        id: ChannelId,
        frequencies: Vec<f64>,
        spectrum: Vec<ComplexValue>,
    ) -> Result<Self, ShapeError> {
        if frequencies.is_empty() || spectrum.is_empty() {
            return Err(ShapeError::Empty);
        }
        if frequencies.len() != spectrum.len() {
            return Err(ShapeError::LengthMismatch {
                spectrum: spectrum.len(),
                frequencies: frequencies.len(),
            });
        }
        Ok(Self { id, frequencies, spectrum })
    }

    pub fn id(&self) -> &ChannelId {
        &self.id
    }

    pub fn station(&self) -> &str {
        self.id.station()
    }

    pub fn channel(&self) -> &str {
        self.id.channel()
    }

    pub fn network(&self) -> &str {
        self.id.network()
    }

    pub fn location(&self) -> &str {
        self.id.location()
    }

    pub fn frequencies(&self) -> &[f64] {
        &self.frequencies
    }

    pub fn spectrum(&self) -> &[ComplexValue] {
        &self.spectrum
    }

    /// Number of frequency/spectrum pairs
    #[inline]
    pub fn nfreqs(&self) -> usize {
        self.frequencies.len()
    }

    /// Iterate (frequency, value) pairs in order
    pub fn pairs(&self) -> impl Iterator<Item = (f64, ComplexValue)> + '_ {
        self.frequencies.iter().copied().zip(self.spectrum.iter().copied())
    }
}

/// Ordered, owned sequence of response records
///
/// Insertion order is the remote array order. The list owns every record;
/// dropping it releases each record exactly once.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ResponseList {
    records: Vec<ResponseRecord>,
}

impl ResponseList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self { records: Vec::with_capacity(capacity) }
    }

    /// Append at the tail
    pub fn push(&mut self, record: ResponseRecord) {
        self.records.push(record);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn first(&self) -> Option<&ResponseRecord> {
        self.records.first()
    }

    pub fn get(&self, index: usize) -> Option<&ResponseRecord> {
        self.records.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ResponseRecord> {
        self.records.iter()
    }

    pub fn as_slice(&self) -> &[ResponseRecord] {
        &self.records
    }

    pub fn into_vec(self) -> Vec<ResponseRecord> {
        self.records
    }
}

impl From<Vec<ResponseRecord>> for ResponseList {
    fn from(records: Vec<ResponseRecord>) -> Self {
        Self { records }
    }
}

impl FromIterator<ResponseRecord> for ResponseList {
    fn from_iter<I: IntoIterator<Item = ResponseRecord>>(iter: I) -> Self {
        Self { records: iter.into_iter().collect() }
    }
}

impl IntoIterator for ResponseList {
    type Item = ResponseRecord;
    type IntoIter = std::vec::IntoIter<ResponseRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

impl<'a> IntoIterator for &'a ResponseList {
    type Item = &'a ResponseRecord;
    type IntoIter = std::slice::Iter<'a, ResponseRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
