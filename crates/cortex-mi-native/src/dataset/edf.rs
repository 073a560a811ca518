//! EDF+ file reader
//!
//! Reads the European Data Format (with the EDF+ annotation extension) used by
//! the PhysioNet motor movement/imagery recordings.
//!
//! # Layout
//!
//! ```text
//! ┌──────────────────────┬────────────────────────────┬───────────────────────┐
//! │ Fixed header (256 B) │ Signal headers (ns × 256 B)│ Data records          │
//! └──────────────────────┴────────────────────────────┴───────────────────────┘
//! ```
//!
//! Header decoding and calibrated sample reads go through `edf_reader`. The
//! `EDF Annotations` signal carries time-stamped annotation lists instead of
//! samples, so its bytes are sliced out of each data record and decoded here.

use std::fs;
use std::io;
use std::path::Path;

use edf_reader::file_reader::SyncFileReader;
use edf_reader::model::{EDFChannel, EDFHeader};
use edf_reader::sync_reader::SyncEDFReader;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dataset::raw::RawRecording;
use crate::error::{DatasetError, DatasetResult};

/// Label of the EDF+ annotation signal
pub const ANNOTATION_LABEL: &str = "EDF Annotations";

/// Time-stamped event from an EDF+ annotation list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    /// Seconds from recording start
    pub onset: f64,
    /// Seconds; zero when unspecified
    pub duration: f64,
    /// Event text, e.g. `T1`
    pub description: String,
}

/// Whether a channel is the EDF+ annotation signal
#[must_use]
pub fn is_annotation(channel: &EDFChannel) -> bool {
    channel.label.trim() == ANNOTATION_LABEL
}

/// Factor converting a physical dimension to SI volts
#[must_use]
pub fn unit_scale(dimension: &str) -> f64 {
    match dimension.trim() {
        "uV" | "µV" | "\u{3bc}V" => 1e-6,
        "mV" => 1e-3,
        "nV" => 1e-9,
        _ => 1.0,
    }
}

// ============================================================================
// Record Layout
// ============================================================================

/// Byte layout of the data records, computed with overflow checks.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordLayout {
    /// Bytes before the first data record
    pub header_len: usize,
    /// Number of data records
    pub n_records: usize,
    /// Bytes per data record
    pub record_len: usize,
    /// Byte offset of each signal inside a record
    pub signal_offsets: Vec<usize>,
    /// Bytes each signal occupies inside a record
    pub signal_lens: Vec<usize>,
    /// Header plus all records
    pub total_len: usize,
}

impl RecordLayout {
    /// Derive the layout from a decoded header.
    pub fn from_header(header: &EDFHeader) -> Result<Self, String> {
        let overflow = |what: &str| format!("{what} overflows the addressable size");

        let header_len = usize::try_from(header.byte_size_header).map_err(|_| overflow("header length"))?;
        let n_records = usize::try_from(header.number_of_blocks).map_err(|_| overflow("record count"))?;

        let mut signal_offsets = Vec::with_capacity(header.channels.len());
        let mut signal_lens = Vec::with_capacity(header.channels.len());
        let mut record_len = 0usize;
        for channel in &header.channels {
            let len = usize::try_from(channel.number_of_samples_in_data_record)
                .ok()
                .and_then(|samples| samples.checked_mul(2))
                .ok_or_else(|| overflow("signal block"))?;
            signal_offsets.push(record_len);
            signal_lens.push(len);
            record_len = record_len.checked_add(len).ok_or_else(|| overflow("record length"))?;
        }

        let total_len = n_records
            .checked_mul(record_len)
            .and_then(|records| records.checked_add(header_len))
            .ok_or_else(|| overflow("data section"))?;

        Ok(Self {
            header_len,
            n_records,
            record_len,
            signal_offsets,
            signal_lens,
            total_len,
        })
    }

    /// Bytes of one signal in one record; `None` when out of bounds.
    #[must_use]
    pub fn block<'a>(&self, bytes: &'a [u8], record: usize, signal: usize) -> Option<&'a [u8]> {
        let start = record
            .checked_mul(self.record_len)?
            .checked_add(self.header_len)?
            .checked_add(*self.signal_offsets.get(signal)?)?;
        let end = start.checked_add(*self.signal_lens.get(signal)?)?;
        bytes.get(start..end)
    }
}

// ============================================================================
// Reading
// ============================================================================

/// In-memory source for [`SyncEDFReader`].
struct SliceReader<'a> {
    bytes: &'a [u8],
}

impl SyncFileReader for SliceReader<'_> {
    fn read(&self, offset: u64, length: u64) -> io::Result<Vec<u8>> {
        let start = usize::try_from(offset).ok();
        let len = usize::try_from(length).ok();
        start
            .zip(len)
            .and_then(|(start, len)| self.bytes.get(start..start.checked_add(len)?))
            .map(<[u8]>::to_vec)
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "read past the end of the EDF data"))
    }
}

/// Read an EDF+ file into a continuous recording in volts.
///
/// # Errors
///
/// - [`DatasetError::MissingRecording`] when the file does not exist
/// - [`DatasetError::Edf`] for malformed content
pub fn read_edf(path: &Path) -> DatasetResult<RawRecording> {
    let bytes = fs::read(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => DatasetError::MissingRecording { path: path.to_path_buf() },
        _ => DatasetError::Io(e),
    })?;
    parse_edf(&bytes).map_err(|reason| DatasetError::Edf {
        path: path.to_path_buf(),
        reason,
    })
}

/// Parse EDF+ bytes. Errors are human-readable reasons.
pub fn parse_edf(bytes: &[u8]) -> Result<RawRecording, String> {
    let reader = SyncEDFReader::init_with_file_reader(SliceReader { bytes })
        .map_err(|e| format!("invalid header: {e}"))?;
    let header = &reader.edf_header;

    let data_signals: Vec<usize> = header
        .channels
        .iter()
        .enumerate()
        .filter(|(_, c)| !is_annotation(c))
        .map(|(i, _)| i)
        .collect();
    let Some(&first_data) = data_signals.first() else {
        return Err("no data signals".to_string());
    };

    let samples_per_record = header.channels[first_data].number_of_samples_in_data_record;
    if let Some(&odd) = data_signals
        .iter()
        .find(|&&i| header.channels[i].number_of_samples_in_data_record != samples_per_record)
    {
        let channel = &header.channels[odd];
        return Err(format!(
            "mixed sample rates: {} has {} samples per record, expected {}",
            channel.label.trim(),
            channel.number_of_samples_in_data_record,
            samples_per_record
        ));
    }
    if header.block_duration == 0 {
        return Err("record duration is not positive".to_string());
    }

    let layout = RecordLayout::from_header(header)?;
    if bytes.len() < layout.total_len {
        return Err(format!("truncated: {} bytes, expected {}", bytes.len(), layout.total_len));
    }

    let n_samples = usize::try_from(samples_per_record)
        .ok()
        .and_then(|spr| spr.checked_mul(layout.n_records))
        .ok_or_else(|| "sample count overflows the addressable size".to_string())?;

    let signals = if layout.n_records == 0 {
        vec![Vec::new(); header.channels.len()]
    } else {
        let duration_ms = header
            .number_of_blocks
            .checked_mul(header.block_duration)
            .ok_or_else(|| "recording duration overflows".to_string())?;
        reader
            .read_data_window(0, duration_ms)
            .map_err(|e| format!("unreadable data records: {e}"))?
    };

    let mut data = Array2::<f64>::zeros((data_signals.len(), n_samples));
    for (row, &index) in data_signals.iter().enumerate() {
        let channel = &header.channels[index];
        let values = signals
            .get(index)
            .filter(|values| values.len() == n_samples)
            .ok_or_else(|| format!("{} does not hold {n_samples} samples", channel.label.trim()))?;
        let scale = unit_scale(&channel.physical_dimension);
        for (slot, &value) in data.row_mut(row).iter_mut().zip(values) {
            *slot = f64::from(value) * scale;
        }
    }

    let mut annotations = Vec::new();
    for record in 0..layout.n_records {
        for (index, _) in header.channels.iter().enumerate().filter(|(_, c)| is_annotation(c)) {
            let block = layout
                .block(bytes, record, index)
                .ok_or_else(|| format!("annotation block of record {record} is out of bounds"))?;
            annotations.extend(parse_annotations(block)?);
        }
    }

    let channel_names = data_signals
        .iter()
        .map(|&i| standardize_label(&header.channels[i].label))
        .collect();
    let sample_rate = samples_per_record as f64 * 1000.0 / header.block_duration as f64;

    debug!(
        channels = data_signals.len(),
        samples = n_samples,
        sample_rate,
        annotations = annotations.len(),
        "EDF parsed"
    );

    Ok(RawRecording::new(channel_names, sample_rate, data, annotations))
}

/// Parse the time-stamped annotation lists of one annotation block.
///
/// Each list reads `+onset[\x15duration]\x14text\x14[text\x14...]\0`. The
/// first list of a record only keeps time and has no text.
pub fn parse_annotations(block: &[u8]) -> Result<Vec<Annotation>, String> {
    let mut annotations = Vec::new();

    for tal in block.split(|&b| b == 0).filter(|tal| !tal.is_empty()) {
        let mut parts = tal.split(|&b| b == 0x14);
        let Some(timing) = parts.next() else {
            continue;
        };
        let timing = String::from_utf8_lossy(timing);
        let (onset, duration) = match timing.split_once('\u{15}') {
            Some((onset, duration)) => (onset, Some(duration)),
            None => (&*timing, None),
        };
        let onset: f64 = onset
            .trim()
            .parse()
            .map_err(|_| format!("invalid annotation onset {onset:?}"))?;
        let duration: f64 = match duration {
            Some(d) if !d.trim().is_empty() => d
                .trim()
                .parse()
                .map_err(|_| format!("invalid annotation duration {d:?}"))?,
            _ => 0.0,
        };

        for text in parts.filter(|t| !t.is_empty()) {
            annotations.push(Annotation {
                onset,
                duration,
                description: String::from_utf8_lossy(text).trim().to_string(),
            });
        }
    }

    Ok(annotations)
}

/// Normalise a raw channel label: strip dots, upper-case, then restore the
/// conventional lower-case midline `z` and `Fp` prefix (`Fcz.` → `FCz`,
/// `Fp1.` → `Fp1`).
#[must_use]
pub fn standardize_label(raw: &str) -> String {
    let mut label: String = raw.trim().chars().filter(|&c| c != '.').collect::<String>().to_uppercase();

    if label.len() > 1 && label.ends_with('Z') {
        label.pop();
        label.push('z');
    }
    if let Some(rest) = label.strip_prefix("FP") {
        label = format!("Fp{rest}");
    }

    label
}
