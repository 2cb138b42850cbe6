// ── Bucket-average downsampling ──
//
// Rates are averaged like every other field, so short bursts are
// smoothed out of downsampled history. Consumers of the history API
// should not read peaks from a downsampled series.

use crate::model::HistoryPoint;

/// Reduce `points` to at most `max_points` by averaging contiguous buckets.
///
/// Buckets hold `ceil(len / max_points)` points. Each bucket becomes one
/// point whose fields are the arithmetic mean of the bucket and whose
/// timestamp is the bucket's middle sample. The input is returned as-is
/// when it already fits.
pub fn downsample(points: Vec<HistoryPoint>, max_points: usize) -> Vec<HistoryPoint> {
    if points.len() <= max_points {
        return points;
    }
    if max_points == 0 {
        return Vec::new();
    }

    let step = points.len().div_ceil(max_points);
    points.chunks(step).filter_map(average).collect()
}

#[allow(clippy::cast_precision_loss)]
fn average(bucket: &[HistoryPoint]) -> Option<HistoryPoint> {
    let middle = bucket.get(bucket.len() / 2)?;
    if bucket.len() == 1 {
        return Some(*middle);
    }

    let n = bucket.len() as f64;
    let mean = |f: fn(&HistoryPoint) -> f64| bucket.iter().map(f).sum::<f64>() / n;

    Some(HistoryPoint {
        timestamp: middle.timestamp,
        tx_bytes_per_sec: mean(|p| p.tx_bytes_per_sec),
        rx_bytes_per_sec: mean(|p| p.rx_bytes_per_sec),
        tx_packets_per_sec: mean(|p| p.tx_packets_per_sec),
        rx_packets_per_sec: mean(|p| p.rx_packets_per_sec),
        tx_errors: mean(|p| p.tx_errors),
        rx_errors: mean(|p| p.rx_errors),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeDelta, Utc};

    fn base() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap_or_default()
    }

    #[allow(clippy::cast_precision_loss)]
    fn series(n: usize) -> Vec<HistoryPoint> {
        (0..n)
            .map(|i| {
                let v = i as f64;
                HistoryPoint {
                    timestamp: base() + TimeDelta::seconds(i64::try_from(i).unwrap_or(0)),
                    tx_bytes_per_sec: v * 10.0,
                    rx_bytes_per_sec: v * 3.5,
                    tx_packets_per_sec: v,
                    rx_packets_per_sec: (v * 7.0) % 13.0,
                    tx_errors: (v % 4.0),
                    rx_errors: 0.25 * v,
                }
            })
            .collect()
    }

    #[test]
    fn fits_are_returned_unchanged() {
        let input = series(50);
        let out = downsample(input.clone(), 100);
        assert_eq!(out, input);
        assert_eq!(downsample(series(100), 100).len(), 100);
    }

    #[test]
    fn result_never_exceeds_max() {
        for (n, max) in [(1000, 100), (1001, 100), (999, 7), (10, 3), (5, 1), (17, 16)] {
            let out = downsample(series(n), max);
            assert!(out.len() <= max, "{n} -> {max} produced {}", out.len());
            assert!(!out.is_empty());
        }
        assert!(downsample(series(10), 0).is_empty());
    }

    #[test]
    fn buckets_average_every_rate_field() {
        let input = series(1000);
        let out = downsample(input.clone(), 100);
        assert_eq!(out.len(), 100);

        for (i, point) in out.iter().enumerate() {
            let bucket = &input[i * 10..(i + 1) * 10];
            let mean = |f: fn(&HistoryPoint) -> f64| bucket.iter().map(f).sum::<f64>() / 10.0;

            assert!((point.tx_bytes_per_sec - mean(|p| p.tx_bytes_per_sec)).abs() < 0.01);
            assert!((point.rx_bytes_per_sec - mean(|p| p.rx_bytes_per_sec)).abs() < 0.01);
            assert!((point.tx_packets_per_sec - mean(|p| p.tx_packets_per_sec)).abs() < 0.01);
            assert!((point.rx_packets_per_sec - mean(|p| p.rx_packets_per_sec)).abs() < 0.01);
            assert!((point.tx_errors - mean(|p| p.tx_errors)).abs() < 0.01);
            assert!((point.rx_errors - mean(|p| p.rx_errors)).abs() < 0.01);
            assert_eq!(point.timestamp, bucket[5].timestamp);
        }
    }

    #[test]
    fn output_stays_chronological() {
        let out = downsample(series(333), 40);
        assert!(out.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
    }
}
