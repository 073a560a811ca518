//! Event-locked epoch extraction
//!
//! Cuts a fixed window around every mapped annotation of a continuous
//! recording. The window runs from `onset + tmin` to `onset + tmax` inclusive,
//! both rounded to the nearest sample.

use ndarray::{s, Array3, Axis};
use tracing::debug;

use cortex_mi_core::{ClassLabel, ValidationError};

use crate::dataset::raw::RawRecording;
use crate::error::{DatasetError, DatasetResult};

/// Labeled epochs cut from one recording.
#[derive(Clone, Debug, PartialEq)]
pub struct Epochs {
    data: Array3<f64>,
    labels: Vec<ClassLabel>,
    sample_rate: f64,
    tmin: f64,
}

impl Epochs {
    /// Epochs × channels × samples
    #[must_use]
    pub fn data(&self) -> &Array3<f64> {
        &self.data
    }

    /// One label per epoch
    #[must_use]
    pub fn labels(&self) -> &[ClassLabel] {
        &self.labels
    }

    /// Number of epochs
    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Whether there are no epochs
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Samples per epoch
    #[must_use]
    pub fn n_times(&self) -> usize {
        self.data.len_of(Axis(2))
    }

    /// Window start relative to the event, seconds
    #[must_use]
    pub fn tmin(&self) -> f64 {
        self.tmin
    }

    /// Samples per second
    #[must_use]
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Split into data and labels
    #[must_use]
    pub fn into_parts(self) -> (Array3<f64>, Vec<ClassLabel>) {
        (self.data, self.labels)
    }
}

/// Cut one epoch per annotation whose description is in `event_map`.
///
/// Windows reaching outside the recording are dropped. With `baseline` set
/// and `tmin < 0`, every channel has the mean of its samples at or before
/// the event subtracted.
///
/// # Errors
///
/// - [`ValidationError`] when `tmin >= tmax`
/// - [`DatasetError::NoEpochs`] when no window fits
pub fn extract_epochs(
    raw: &RawRecording,
    event_map: &[(String, ClassLabel)],
    tmin: f64,
    tmax: f64,
    baseline: bool,
) -> DatasetResult<Epochs> {
    if tmin >= tmax {
        return Err(ValidationError::InvalidParameter {
            parameter: "tmin/tmax",
            reason: format!("need tmin < tmax, got {tmin}..{tmax}"),
        }
        .into());
    }

    let fs = raw.sample_rate();
    let start_offset = (tmin * fs).round() as i64;
    let stop_offset = (tmax * fs).round() as i64;
    let n_times = (stop_offset - start_offset + 1) as usize;
    let n_samples = raw.n_samples() as i64;
    let n_channels = raw.channel_names().len();

    // Samples at or before the event: offsets start_offset..=0
    let baseline_len = if baseline && start_offset < 0 {
        Some((1 - start_offset) as usize)
    } else {
        None
    };

    let mut windows = Vec::new();
    let mut labels = Vec::new();
    let mut dropped = 0usize;

    for annotation in raw.annotations() {
        let Some(&(_, label)) = event_map.iter().find(|(name, _)| *name == annotation.description) else {
            continue;
        };

        let onset = (annotation.onset * fs).round() as i64;
        let start = onset + start_offset;
        let stop = onset + stop_offset;
        if start < 0 || stop >= n_samples {
            dropped += 1;
            continue;
        }

        windows.push(start as usize);
        labels.push(label);
    }

    if labels.is_empty() {
        return Err(DatasetError::NoEpochs {
            events: event_map.iter().map(|(name, _)| name.clone()).collect(),
        });
    }

    let mut data = Array3::<f64>::zeros((labels.len(), n_channels, n_times));
    for (mut epoch, &start) in data.axis_iter_mut(Axis(0)).zip(&windows) {
        epoch.assign(&raw.data().slice(s![.., start..start + n_times]));

        if let Some(len) = baseline_len {
            for mut channel in epoch.axis_iter_mut(Axis(0)) {
                let mean = channel.slice(s![..len]).mean().unwrap_or(0.0);
                channel -= mean;
            }
        }
    }

    debug!(epochs = labels.len(), dropped, samples = n_times, "Epochs extracted");

    Ok(Epochs {
        data,
        labels,
        sample_rate: fs,
        tmin,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::edf::Annotation;
    use ndarray::Array2;

    fn event_map() -> Vec<(String, ClassLabel)> {
        vec![("T1".to_string(), 1), ("T2".to_string(), 2)]
    }

    /// 2 channels at 10 Hz; channel 0 holds the sample index, channel 1 is constant 7.
    fn recording(n_samples: usize, events: &[(f64, &str)]) -> RawRecording {
        let data = Array2::from_shape_fn((2, n_samples), |(c, t)| if c == 0 { t as f64 } else { 7.0 });
        RawRecording::new(
            vec!["C3".into(), "C4".into()],
            10.0,
            data,
            events
                .iter()
                .map(|&(onset, text)| Annotation { onset, duration: 4.1, description: text.into() })
                .collect(),
        )
    }

    #[test]
    fn test_window_and_labels() {
        let raw = recording(200, &[(2.0, "T0"), (3.0, "T1"), (8.0, "T2")]);
        let epochs = extract_epochs(&raw, &event_map(), -1.0, 4.0, false).unwrap();

        assert_eq!(epochs.labels(), &[1, 2]);
        // -1 s .. 4 s inclusive at 10 Hz
        assert_eq!(epochs.data().dim(), (2, 2, 51));
        assert!((epochs.data()[[0, 0, 0]] - 20.0).abs() < f64::EPSILON);
        assert!((epochs.data()[[0, 0, 50]] - 70.0).abs() < f64::EPSILON);
        assert!((epochs.data()[[1, 0, 0]] - 70.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_out_of_bounds_dropped() {
        let raw = recording(100, &[(0.5, "T1"), (3.0, "T2"), (9.0, "T1")]);
        let epochs = extract_epochs(&raw, &event_map(), -1.0, 4.0, false).unwrap();
        assert_eq!(epochs.labels(), &[2]);
    }

    #[test]
    fn test_baseline_correction() {
        let raw = recording(200, &[(3.0, "T1")]);
        let epochs = extract_epochs(&raw, &event_map(), -1.0, 4.0, true).unwrap();

        // Channel 0 baseline covers samples 20..=30, mean 25
        assert!((epochs.data()[[0, 0, 0]] + 5.0).abs() < 1e-12);
        assert!((epochs.data()[[0, 0, 10]] - 5.0).abs() < 1e-12);
        // Constant channel becomes zero
        assert!(epochs.data().slice(s![0, 1, ..]).iter().all(|v| v.abs() < 1e-12));
    }

    #[test]
    fn test_baseline_ignored_without_pre_onset_window() {
        let raw = recording(200, &[(3.0, "T1")]);
        let epochs = extract_epochs(&raw, &event_map(), 0.0, 2.0, true).unwrap();
        assert!((epochs.data()[[0, 1, 0]] - 7.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_no_epochs() {
        let raw = recording(50, &[(1.0, "T0")]);
        let err = extract_epochs(&raw, &event_map(), -1.0, 4.0, true).unwrap_err();
        assert!(matches!(err, DatasetError::NoEpochs { .. }));
    }

    #[test]
    fn test_invalid_window() {
        let raw = recording(50, &[(1.0, "T1")]);
        assert!(extract_epochs(&raw, &event_map(), 1.0, 1.0, false).is_err());
    }
}
