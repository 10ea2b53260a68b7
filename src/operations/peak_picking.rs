//! Resonance and dip search on averaged spectra.
//!
//! ## Mathematical Foundation
//!
//! ### Local maxima
//!
//! A bin `i` is a candidate when it is strictly higher than its left
//! neighbour and the first differing bin to its right. Flat tops (plateaus)
//! report their midpoint, rounded down. The first and last bins are never
//! candidates.
//!
//! ### Minimum distance
//!
//! Candidates are visited from highest to lowest. Each kept candidate removes
//! every remaining candidate closer than `min_distance_bins`, so of two peaks
//! produced by the same resonance only the taller one survives.
//!
//! ### Topographic prominence
//!
//! From the peak, walk left until a strictly higher bin (or the edge) and
//! record the lowest level passed; do the same to the right. The prominence
//! is the peak level minus the higher of those two minima:
//!
//! ```text
//! prominence = level[peak] - max(min_left, min_right)
//! ```
//!
//! Prominence, not raw level, ranks the results: a broad loud region has a
//! high level but no prominence and is not a resonance.
//!
//! ### Dips
//!
//! Dips run the same search on the negated spectrum; the depth reported for
//! a dip is its prominence in the negated spectrum and its level is the
//! original (un-negated) level.

use serde::{Deserialize, Serialize};

use super::types::PeakSearchConfig;
use crate::{MasteringError, MasteringResult};

/// A spectral peak (resonance) or notch (dip).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResonanceRecord {
    /// Bin centre frequency in Hz.
    pub frequency_hz: f64,
    /// Spectrum level at the bin, in dB.
    pub level_db: f64,
    /// Prominence for resonances, depth for dips, in dB.
    pub prominence_db: f64,
}

/// Indices of local maxima, using plateau midpoints.
pub fn local_maxima(values: &[f64]) -> Vec<usize> {
    let n = values.len();
    let mut peaks = Vec::new();
    if n < 3 {
        return peaks;
    }
    let mut i = 1;
    while i < n - 1 {
        if values[i - 1] < values[i] {
            let mut ahead = i + 1;
            while ahead < n - 1 && values[ahead] == values[i] {
                ahead += 1;
            }
            if values[ahead] < values[i] {
                peaks.push((i + ahead - 1) / 2);
                i = ahead;
            }
        }
        i += 1;
    }
    peaks
}

/// Drops peaks closer than `distance` bins to a higher kept peak.
pub fn select_by_distance(peaks: &[usize], values: &[f64], distance: usize) -> Vec<usize> {
    if distance <= 1 || peaks.len() < 2 {
        return peaks.to_vec();
    }
    let mut priority: Vec<usize> = (0..peaks.len()).collect();
    priority.sort_by(|&a, &b| values[peaks[a]].total_cmp(&values[peaks[b]]));

    let mut keep = vec![true; peaks.len()];
    for &j in priority.iter().rev() {
        if !keep[j] {
            continue;
        }
        for k in (0..j).rev() {
            if peaks[j] - peaks[k] >= distance {
                break;
            }
            keep[k] = false;
        }
        for k in j + 1..peaks.len() {
            if peaks[k] - peaks[j] >= distance {
                break;
            }
            keep[k] = false;
        }
    }
    peaks
        .iter()
        .zip(keep)
        .filter_map(|(&p, kept)| kept.then_some(p))
        .collect()
}

/// Topographic prominence of the bin at `peak`.
pub fn prominence(values: &[f64], peak: usize) -> f64 {
    let height = values[peak];

    let mut left_min = height;
    for &v in values[..=peak].iter().rev() {
        if v > height {
            break;
        }
        left_min = left_min.min(v);
    }

    let mut right_min = height;
    for &v in &values[peak..] {
        if v > height {
            break;
        }
        right_min = right_min.min(v);
    }

    height - left_min.max(right_min)
}

fn check_lengths(frequencies: &[f64], levels_db: &[f64]) -> MasteringResult<()> {
    if frequencies.len() != levels_db.len() {
        return Err(MasteringError::ChannelMismatch {
            expected: format!("{} spectrum levels", frequencies.len()),
            actual: format!("{} spectrum levels", levels_db.len()),
        });
    }
    Ok(())
}

/// Finds resonances: local maxima with enough prominence inside the search
/// band, sorted by descending prominence.
pub fn find_resonances(
    frequencies: &[f64],
    levels_db: &[f64],
    config: &PeakSearchConfig,
) -> MasteringResult<Vec<ResonanceRecord>> {
    config.validate()?;
    check_lengths(frequencies, levels_db)?;

    let candidates = local_maxima(levels_db);
    let spaced = select_by_distance(&candidates, levels_db, config.min_distance_bins);

    let mut records: Vec<ResonanceRecord> = spaced
        .into_iter()
        .map(|bin| ResonanceRecord {
            frequency_hz: frequencies[bin],
            level_db: levels_db[bin],
            prominence_db: prominence(levels_db, bin),
        })
        .filter(|r| r.prominence_db > config.min_prominence_db)
        .filter(|r| {
            r.frequency_hz > config.min_frequency_hz && r.frequency_hz < config.max_frequency_hz
        })
        .collect();

    records.sort_by(|a, b| b.prominence_db.total_cmp(&a.prominence_db));
    Ok(records)
}

/// Finds dips: the resonances of the negated spectrum, reported with their
/// original level and their depth, sorted by descending depth.
pub fn find_dips(
    frequencies: &[f64],
    levels_db: &[f64],
    config: &PeakSearchConfig,
) -> MasteringResult<Vec<ResonanceRecord>> {
    let negated: Vec<f64> = levels_db.iter().map(|l| -l).collect();
    Ok(find_resonances(frequencies, &negated, config)?
        .into_iter()
        .map(|r| ResonanceRecord {
            level_db: -r.level_db,
            ..r
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_config(min_prominence_db: f64, min_distance_bins: usize) -> PeakSearchConfig {
        PeakSearchConfig {
            min_prominence_db,
            min_distance_bins,
            min_frequency_hz: f64::NEG_INFINITY,
            max_frequency_hz: f64::INFINITY,
        }
    }

    #[test]
    fn test_local_maxima_with_plateau() {
        let values = [0.0, 1.0, 0.0, 2.0, 2.0, 2.0, 0.0, 3.0];
        assert_eq!(local_maxima(&values), vec![1, 4]);
        assert!(local_maxima(&[1.0, 2.0]).is_empty());
    }

    #[test]
    fn test_select_by_distance_keeps_highest() {
        let values = [0.0, 5.0, 0.0, 7.0, 0.0, 1.0, 0.0, 0.0, 0.0, 4.0, 0.0];
        let peaks = local_maxima(&values);
        assert_eq!(peaks, vec![1, 3, 5, 9]);
        assert_eq!(select_by_distance(&peaks, &values, 3), vec![3, 9]);
        assert_eq!(select_by_distance(&peaks, &values, 1), peaks);
    }

    #[test]
    fn test_prominence_uses_higher_valley() {
        // Peak at 3 (level 5): left valley 1, right valley 2 before a higher 6
        let values = [0.0, 1.0, 3.0, 5.0, 2.0, 6.0, 0.0];
        assert_eq!(prominence(&values, 3), 3.0);
        // The global maximum falls to the lowest point on both sides
        assert_eq!(prominence(&values, 5), 6.0);
    }

    #[test]
    fn test_resonances_sorted_by_prominence() {
        let frequencies: Vec<f64> = (0..9).map(|i| i as f64 * 100.0).collect();
        let levels = [0.0, 10.0, 0.0, 0.0, 20.0, 15.0, 15.0, 30.0, 0.0];
        let found = find_resonances(&frequencies, &levels, &open_config(1.0, 1)).unwrap();
        let freqs: Vec<f64> = found.iter().map(|r| r.frequency_hz).collect();
        assert_eq!(freqs, vec![700.0, 100.0, 400.0]);
        assert_eq!(found[0].prominence_db, 30.0);
        assert_eq!(found[2].prominence_db, 5.0);
    }

    #[test]
    fn test_band_and_prominence_filters() {
        let frequencies: Vec<f64> = (0..9).map(|i| i as f64 * 10.0).collect();
        let levels = [0.0, 10.0, 0.0, 3.0, 0.0, 0.0, 8.0, 0.0, 0.0];
        let config = PeakSearchConfig {
            min_prominence_db: 6.0,
            min_distance_bins: 1,
            min_frequency_hz: 20.0,
            max_frequency_hz: 20_000.0,
        };
        let found = find_resonances(&frequencies, &levels, &config).unwrap();
        // 10 Hz is outside the band, 30 Hz lacks prominence
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].frequency_hz, 60.0);
    }

    #[test]
    fn test_dips_are_negated_resonances() {
        let frequencies: Vec<f64> = (0..7).map(|i| i as f64 * 50.0).collect();
        let levels = [-10.0, -20.0, -10.0, -12.0, -30.0, -12.0, -10.0];
        let config = open_config(1.0, 1);
        let dips = find_dips(&frequencies, &levels, &config).unwrap();
        assert_eq!(dips.len(), 2);
        assert_eq!(dips[0].frequency_hz, 200.0);
        assert_eq!(dips[0].level_db, -30.0);
        assert_eq!(dips[0].prominence_db, 20.0);
        assert_eq!(dips[1].frequency_hz, 50.0);
    }

    #[test]
    fn test_prominence_must_exceed_threshold() {
        let frequencies = [100.0, 200.0, 300.0];
        let config = PeakSearchConfig::new();
        assert!(find_resonances(&frequencies, &[0.0, 6.0, 0.0], &config).unwrap().is_empty());
        assert!(find_dips(&frequencies, &[0.0, -6.0, 0.0], &config).unwrap().is_empty());

        let found = find_resonances(&frequencies, &[0.0, 6.5, 0.0], &config).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].prominence_db, 6.5);
        let dips = find_dips(&frequencies, &[0.0, -6.5, 0.0], &config).unwrap();
        assert_eq!(dips.len(), 1);
        assert_eq!(dips[0].level_db, -6.5);
    }

    #[test]
    fn test_length_mismatch_rejected() {
        assert!(find_resonances(&[1.0, 2.0], &[0.0], &open_config(1.0, 1)).is_err());
        assert!(find_resonances(&[], &[], &open_config(1.0, 1)).unwrap().is_empty());
    }
}
