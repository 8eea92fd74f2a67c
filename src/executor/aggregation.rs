//! Packing per-call payloads into one blob

use crate::storage::ByteRange;

/// All payloads of a callset concatenated in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatedPayload {
    pub bytes: Vec<u8>,
    /// Range of payload `i` inside `bytes`
    pub ranges: Vec<ByteRange>,
}

impl AggregatedPayload {
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}

/// Concatenate `payloads`, recording where each one landed
///
/// An empty payload gets an empty range at the current offset.
pub fn agg_data(payloads: &[Vec<u8>]) -> AggregatedPayload {
    let total: usize = payloads.iter().map(Vec::len).sum();
    let mut bytes = Vec::with_capacity(total);
    let mut ranges = Vec::with_capacity(payloads.len());

    for payload in payloads {
        ranges.push(ByteRange::spanning(bytes.len() as u64, payload.len() as u64));
        bytes.extend_from_slice(payload);
    }

    AggregatedPayload { bytes, ranges }
}

/// Whether a callset should upload one aggregated blob
pub fn should_aggregate(data_all_as_one: bool, data_size_bytes: usize, max_agg_data_size: usize) -> bool {
    data_all_as_one && data_size_bytes < max_agg_data_size
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ranges_are_inclusive_and_contiguous() {
        let payloads = vec![b"abc".to_vec(), b"d".to_vec(), b"efgh".to_vec()];
        let agg = agg_data(&payloads);

        assert_eq!(agg.bytes, b"abcdefgh");
        assert_eq!(
            agg.ranges,
            vec![
                ByteRange::inclusive(0, 2),
                ByteRange::inclusive(3, 3),
                ByteRange::inclusive(4, 7),
            ]
        );
        for (payload, range) in payloads.iter().zip(&agg.ranges) {
            assert_eq!(range.slice(&agg.bytes).unwrap(), payload.as_slice());
        }
    }

    #[test]
    fn test_empty_payloads_get_empty_ranges() {
        let payloads = vec![b"ab".to_vec(), Vec::new(), b"c".to_vec(), Vec::new()];
        let agg = agg_data(&payloads);

        assert_eq!(agg.bytes, b"abc");
        assert_eq!(agg.ranges[1], ByteRange::spanning(2, 0));
        assert_eq!(agg.ranges[3], ByteRange::spanning(3, 0));
        for (payload, range) in payloads.iter().zip(&agg.ranges) {
            assert_eq!(range.slice(&agg.bytes).unwrap(), payload.as_slice());
        }

        let leading = agg_data(&[Vec::new(), b"x".to_vec()]);
        assert_eq!(
            serde_json::to_value(leading.ranges[0]).unwrap(),
            serde_json::json!({"start": 0, "end": -1})
        );
    }

    #[test]
    fn test_should_aggregate_threshold() {
        assert!(should_aggregate(true, 10, 4_000_000));
        assert!(!should_aggregate(true, 4_000_000, 4_000_000));
        assert!(!should_aggregate(false, 10, 4_000_000));
    }
}
