//! Continuous multichannel recordings
//!
//! A [`RawRecording`] is a channels × samples matrix in volts plus the
//! annotations that mark task events. Runs of one subject are concatenated
//! end to end before filtering and epoching.

use std::collections::BTreeMap;

use ndarray::{concatenate, Array2, ArrayView2, Axis};
use serde::Serialize;

use crate::dataset::edf::Annotation;
use crate::error::{DatasetError, DatasetResult};
use crate::processing::filters::{filtfilt_rows, notch_rows};

/// Continuous recording in volts.
#[derive(Clone, Debug, PartialEq)]
pub struct RawRecording {
    channel_names: Vec<String>,
    sample_rate: f64,
    data: Array2<f64>,
    annotations: Vec<Annotation>,
}

impl RawRecording {
    /// Assemble a recording; `data` is channels × samples.
    #[must_use]
    pub fn new(channel_names: Vec<String>, sample_rate: f64, data: Array2<f64>, annotations: Vec<Annotation>) -> Self {
        Self {
            channel_names,
            sample_rate,
            data,
            annotations,
        }
    }

    /// Join recordings end to end, shifting each one's annotation onsets by
    /// the duration of everything before it.
    ///
    /// # Errors
    ///
    /// [`DatasetError::Incompatible`] when the list is empty or channel lists
    /// or sample rates differ.
    pub fn concatenate(recordings: Vec<RawRecording>) -> DatasetResult<Self> {
        let mut iter = recordings.into_iter();
        let Some(first) = iter.next() else {
            return Err(DatasetError::Incompatible {
                reason: "no recordings given".to_string(),
            });
        };

        let mut blocks = vec![first.data];
        let mut annotations = first.annotations;
        let mut offset_samples = blocks[0].ncols();

        for next in iter {
            if next.channel_names != first.channel_names {
                return Err(DatasetError::Incompatible {
                    reason: "channel lists differ".to_string(),
                });
            }
            if (next.sample_rate - first.sample_rate).abs() > f64::EPSILON {
                return Err(DatasetError::Incompatible {
                    reason: format!("sample rates {} and {} differ", first.sample_rate, next.sample_rate),
                });
            }

            let shift = offset_samples as f64 / first.sample_rate;
            annotations.extend(next.annotations.into_iter().map(|a| Annotation {
                onset: a.onset + shift,
                ..a
            }));
            offset_samples += next.data.ncols();
            blocks.push(next.data);
        }

        let views: Vec<ArrayView2<'_, f64>> = blocks.iter().map(Array2::view).collect();
        let data = concatenate(Axis(1), &views).map_err(|e| DatasetError::Incompatible { reason: e.to_string() })?;

        Ok(Self {
            channel_names: first.channel_names,
            sample_rate: first.sample_rate,
            data,
            annotations,
        })
    }

    /// Zero-phase band-pass every channel in place.
    pub fn band_pass(&mut self, low_hz: f64, high_hz: f64) -> &mut Self {
        filtfilt_rows(&mut self.data, self.sample_rate, low_hz, high_hz);
        self
    }

    /// Zero-phase notch every channel in place.
    pub fn notch(&mut self, freq_hz: f64) -> &mut Self {
        notch_rows(&mut self.data, self.sample_rate, freq_hz);
        self
    }

    /// Channel labels
    #[must_use]
    pub fn channel_names(&self) -> &[String] {
        &self.channel_names
    }

    /// Samples per second
    #[must_use]
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Channels × samples, volts
    #[must_use]
    pub fn data(&self) -> &Array2<f64> {
        &self.data
    }

    /// Event annotations in onset order of their source runs
    #[must_use]
    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    /// Number of samples per channel
    #[must_use]
    pub fn n_samples(&self) -> usize {
        self.data.ncols()
    }

    /// Length in seconds
    #[must_use]
    pub fn duration(&self) -> f64 {
        self.n_samples() as f64 / self.sample_rate
    }

    /// Summary statistics for display.
    #[must_use]
    pub fn describe(&self) -> RecordingSummary {
        let mut annotation_counts = BTreeMap::new();
        for annotation in &self.annotations {
            *annotation_counts.entry(annotation.description.clone()).or_insert(0) += 1;
        }

        let channels = self
            .channel_names
            .iter()
            .zip(self.data.rows())
            .map(|(name, row)| ChannelSummary {
                name: name.clone(),
                min: row.iter().copied().fold(f64::INFINITY, f64::min),
                max: row.iter().copied().fold(f64::NEG_INFINITY, f64::max),
                mean: row.mean().unwrap_or(0.0),
            })
            .collect();

        RecordingSummary {
            n_channels: self.channel_names.len(),
            n_samples: self.n_samples(),
            sample_rate: self.sample_rate,
            duration_s: self.duration(),
            annotation_counts,
            channels,
        }
    }
}

/// Per-channel statistics in volts.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChannelSummary {
    /// Channel label
    pub name: String,
    /// Smallest sample
    pub min: f64,
    /// Largest sample
    pub max: f64,
    /// Mean sample
    pub mean: f64,
}

/// Overview of a recording.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RecordingSummary {
    /// Number of channels
    pub n_channels: usize,
    /// Samples per channel
    pub n_samples: usize,
    /// Samples per second
    pub sample_rate: f64,
    /// Length in seconds
    pub duration_s: f64,
    /// Annotation description → occurrences
    pub annotation_counts: BTreeMap<String, usize>,
    /// Per-channel statistics
    pub channels: Vec<ChannelSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recording(n_samples: usize, value: f64, events: &[(f64, &str)]) -> RawRecording {
        RawRecording::new(
            vec!["C3".into(), "C4".into()],
            10.0,
            Array2::from_elem((2, n_samples), value),
            events
                .iter()
                .map(|&(onset, text)| Annotation { onset, duration: 0.0, description: text.into() })
                .collect(),
        )
    }

    #[test]
    fn test_concatenate_shifts_onsets() {
        let joined = RawRecording::concatenate(vec![
            recording(50, 1.0, &[(1.0, "T1")]),
            recording(30, 2.0, &[(0.5, "T2")]),
            recording(20, 3.0, &[(0.0, "T0")]),
        ])
        .unwrap();

        assert_eq!(joined.n_samples(), 100);
        assert!((joined.data()[[0, 49]] - 1.0).abs() < f64::EPSILON);
        assert!((joined.data()[[1, 50]] - 2.0).abs() < f64::EPSILON);

        let onsets: Vec<f64> = joined.annotations().iter().map(|a| a.onset).collect();
        assert!((onsets[0] - 1.0).abs() < 1e-12);
        assert!((onsets[1] - 5.5).abs() < 1e-12);
        assert!((onsets[2] - 8.0).abs() < 1e-12);
    }

    #[test]
    fn test_concatenate_rejects_mismatch() {
        let mut other = recording(10, 0.0, &[]);
        other.sample_rate = 20.0;
        assert!(RawRecording::concatenate(vec![recording(10, 0.0, &[]), other]).is_err());

        let mut renamed = recording(10, 0.0, &[]);
        renamed.channel_names[1] = "Cz".into();
        assert!(RawRecording::concatenate(vec![recording(10, 0.0, &[]), renamed]).is_err());

        assert!(RawRecording::concatenate(Vec::new()).is_err());
    }

    #[test]
    fn test_describe() {
        let mut raw = recording(40, 0.0, &[(0.0, "T0"), (1.0, "T1"), (2.0, "T0")]);
        raw.data[[1, 5]] = -2.0;
        raw.data[[1, 6]] = 4.0;

        let summary = raw.describe();
        assert_eq!(summary.n_channels, 2);
        assert!((summary.duration_s - 4.0).abs() < f64::EPSILON);
        assert_eq!(summary.annotation_counts.get("T0"), Some(&2));
        assert!((summary.channels[1].min + 2.0).abs() < f64::EPSILON);
        assert!((summary.channels[1].max - 4.0).abs() < f64::EPSILON);
        assert!((summary.channels[1].mean - 0.05).abs() < 1e-12);
    }

    #[test]
    fn test_band_pass_removes_offset() {
        let mut raw = recording(400, 5.0, &[]);
        raw.band_pass(1.0, 4.0);
        assert!(raw.data().iter().all(|v| v.abs() < 1e-6));
    }
}
