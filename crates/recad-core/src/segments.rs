// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::RecadError;

/// Labels strictly above this value count as anomalous.
pub const ANOMALY_LABEL_CUTOFF: f64 = 0.5;

/// Maximal contiguous run of anomalous labels, as the half-open range
/// `[start, end)`.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Segment {
    pub start: usize,
    pub end: usize,
}

impl Segment {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }

    pub fn contains(&self, index: usize) -> bool {
        (self.start..self.end).contains(&index)
    }
}

/// Returns true when a soft label counts as anomalous.
pub fn is_anomalous(label: f64) -> bool {
    label > ANOMALY_LABEL_CUTOFF
}

/// Number of anomalous entries in a soft label series.
pub fn count_anomalies(labels: &[f64]) -> usize {
    labels.iter().filter(|&&label| is_anomalous(label)).count()
}

/// Splits a soft label series into its ordered anomaly segments.
pub fn segments_from_labels(labels: &[f64]) -> Vec<Segment> {
    segments_where(labels.len(), |idx| is_anomalous(labels[idx]))
}

/// Splits a binary (0/1) label series into its ordered anomaly segments.
pub fn segments_from_binary(labels: &[u8]) -> Vec<Segment> {
    segments_where(labels.len(), |idx| labels[idx] == 1)
}

fn segments_where(n: usize, mut anomalous: impl FnMut(usize) -> bool) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut open: Option<usize> = None;

    for idx in 0..n {
        match (anomalous(idx), open) {
            (true, None) => open = Some(idx),
            (false, Some(start)) => {
                segments.push(Segment { start, end: idx });
                open = None;
            }
            _ => {}
        }
    }
    if let Some(start) = open {
        segments.push(Segment { start, end: n });
    }

    segments
}

/// Thresholds soft labels at [`ANOMALY_LABEL_CUTOFF`] into 0/1 flags.
pub fn binarize_labels(labels: &[f64]) -> Vec<u8> {
    labels
        .iter()
        .map(|&label| u8::from(is_anomalous(label)))
        .collect()
}

/// Rejects any entry that is not exactly 0 or 1.
pub fn validate_binary(values: &[u8], name: &str) -> Result<(), RecadError> {
    if let Some((idx, value)) = values
        .iter()
        .copied()
        .enumerate()
        .find(|(_, value)| *value > 1)
    {
        return Err(RecadError::invalid_input(format!(
            "{name} must contain only 0/1 values: index {idx} has {value}"
        )));
    }
    Ok(())
}

/// Rejects NaN or infinite scores, naming the first offending index.
pub fn validate_finite(values: &[f64], name: &str) -> Result<(), RecadError> {
    if let Some((idx, value)) = values
        .iter()
        .copied()
        .enumerate()
        .find(|(_, value)| !value.is_finite())
    {
        return Err(RecadError::numerical_issue(format!(
            "{name} must be finite; {name}[{idx}]={value}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{
        Segment, binarize_labels, count_anomalies, segments_from_binary, segments_from_labels,
        validate_binary, validate_finite,
    };

    #[test]
    fn segments_cover_interior_and_trailing_runs() {
        let labels = [0.0, 0.0, 1.0, 1.0, 1.0, 0.0, 0.0, 1.0];
        let segments = segments_from_labels(&labels);
        assert_eq!(
            segments,
            vec![Segment { start: 2, end: 5 }, Segment { start: 7, end: 8 }]
        );
        assert_eq!(segments[0].len(), 3);
        assert!(segments[1].contains(7));
        assert!(!segments[1].contains(8));
    }

    #[test]
    fn soft_labels_use_half_as_cutoff() {
        let labels = [0.5, 0.51, 0.9, 0.2];
        assert_eq!(count_anomalies(&labels), 2);
        assert_eq!(segments_from_labels(&labels), vec![Segment { start: 1, end: 3 }]);
        assert_eq!(binarize_labels(&labels), vec![0, 1, 1, 0]);
    }

    #[test]
    fn all_anomalous_series_is_one_segment() {
        let labels = [1u8; 6];
        assert_eq!(segments_from_binary(&labels), vec![Segment { start: 0, end: 6 }]);
    }

    #[test]
    fn empty_series_has_no_segments() {
        assert!(segments_from_labels(&[]).is_empty());
        assert!(segments_from_binary(&[0, 0, 0]).is_empty());
    }

    #[test]
    fn validators_name_first_offending_index() {
        validate_binary(&[0, 1, 1], "pred").expect("binary values should pass");
        let err = validate_binary(&[0, 2, 1], "pred").expect_err("2 is not binary");
        assert!(err.to_string().contains("index 1 has 2"));

        let err = validate_finite(&[0.0, f64::NAN], "score").expect_err("NaN should fail");
        assert!(err.to_string().contains("score[1]=NaN"));
    }
}
