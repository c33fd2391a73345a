use crate::error::{Result, WaveformError};

/// Occupied bins for `used_tones` tones in an `fft_len`-point transform.
///
/// Bins are signed offsets from DC in ascending order:
/// `-ceil(U/2)..=-1` followed by `1..=floor(U/2)`. Bin 0 is never used.
pub fn allocate_bins(fft_len: usize, used_tones: usize) -> Result<Vec<i32>> {
    if used_tones == 0 || used_tones + 1 >= fft_len {
        return Err(WaveformError::InvalidConfig(format!(
            "cannot place {} tones around DC in a {}-point transform",
            used_tones, fft_len
        )));
    }

    let below = ((used_tones + 1) / 2) as i32;
    let above = (used_tones / 2) as i32;
    Ok((-below..0).chain(1..=above).collect())
}

/// Position of a signed bin in a DC-first transform buffer.
///
/// Negative bins wrap to the top half, which is the same as placing the bin
/// in a centered spectrum and undoing the shift before the inverse FFT.
pub fn bin_to_fft_index(bin: i32, fft_len: usize) -> usize {
    bin.rem_euclid(fft_len as i32) as usize
}

#[derive(Debug, Clone, PartialEq)]
pub struct Subband {
    /// Contiguous run of bins, ascending.
    pub bins: Vec<i32>,
    /// Rounded mean of `bins`; the filter for this subband is shifted here.
    pub center_bin: i32,
}

/// Equal-width partition of the occupied bins into UFMC subbands.
#[derive(Debug, Clone, PartialEq)]
pub struct SubbandLayout {
    pub tones_per_subband: usize,
    /// Occupied bins after truncation, in allocation order.
    pub bins: Vec<i32>,
    pub subbands: Vec<Subband>,
    /// Highest bins dropped so that every subband has the same width.
    pub dropped: Vec<i32>,
}

impl SubbandLayout {
    /// Partition `used_tones` tones into `num_subbands` equal groups.
    ///
    /// When `used_tones` is not a multiple of `num_subbands` the excess
    /// highest-indexed tones are dropped and a warning is logged.
    pub fn new(fft_len: usize, used_tones: usize, num_subbands: usize) -> Result<Self> {
        if num_subbands == 0 {
            return Err(WaveformError::InvalidConfig(
                "subband count must be at least 1".to_string(),
            ));
        }
        let tones_per_subband = used_tones / num_subbands;
        if tones_per_subband == 0 {
            return Err(WaveformError::InvalidConfig(format!(
                "{} tones cannot fill {} subbands",
                used_tones, num_subbands
            )));
        }

        let mut bins = allocate_bins(fft_len, used_tones)?;
        let dropped = bins.split_off(num_subbands * tones_per_subband);
        if !dropped.is_empty() {
            // TODO: consider trimming half of the excess from each band edge
            // to keep the layout symmetric
            log::warn!(
                "{} tones do not divide into {} subbands, dropping {} highest bins ({:?})",
                used_tones,
                num_subbands,
                dropped.len(),
                dropped
            );
        }

        let subbands = bins
            .chunks_exact(tones_per_subband)
            .map(|group| {
                let mean = group.iter().map(|&b| b as f64).sum::<f64>() / group.len() as f64;
                Subband {
                    bins: group.to_vec(),
                    center_bin: mean.round() as i32,
                }
            })
            .collect();

        Ok(Self {
            tones_per_subband,
            bins,
            subbands,
            dropped,
        })
    }

    pub fn num_subbands(&self) -> usize {
        self.subbands.len()
    }

    /// Tones actually carried after truncation.
    pub fn used_tones(&self) -> usize {
        self.bins.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_even_tones() {
        let bins = allocate_bins(8, 4).unwrap();
        assert_eq!(bins, vec![-2, -1, 1, 2]);
    }

    #[test]
    fn test_allocate_odd_tones_favours_negative_side() {
        let bins = allocate_bins(16, 5).unwrap();
        assert_eq!(bins, vec![-3, -2, -1, 1, 2]);
    }

    #[test]
    fn test_allocate_never_uses_dc() {
        for used in 1..254 {
            let bins = allocate_bins(256, used).unwrap();
            assert_eq!(bins.len(), used);
            assert!(!bins.contains(&0));
            assert!(bins.iter().all(|&b| (-128..128).contains(&b)));
            let negative = bins.iter().filter(|&&b| b < 0).count();
            let positive = bins.len() - negative;
            assert!(negative - positive <= 1);
        }
    }

    #[test]
    fn test_allocate_rejects_oversized() {
        assert!(allocate_bins(8, 7).is_err());
        assert!(allocate_bins(8, 0).is_err());
        assert!(allocate_bins(8, 6).is_ok());
    }

    #[test]
    fn test_bin_to_fft_index() {
        assert_eq!(bin_to_fft_index(1, 8), 1);
        assert_eq!(bin_to_fft_index(3, 8), 3);
        assert_eq!(bin_to_fft_index(-1, 8), 7);
        assert_eq!(bin_to_fft_index(-4, 8), 4);
    }

    #[test]
    fn test_even_partition() {
        let layout = SubbandLayout::new(256, 200, 10).unwrap();
        assert_eq!(layout.tones_per_subband, 20);
        assert_eq!(layout.num_subbands(), 10);
        assert_eq!(layout.used_tones(), 200);
        assert!(layout.dropped.is_empty());

        // first subband is the lowest 20 bins, last is the highest 20
        assert_eq!(layout.subbands[0].bins, (-100..-80).collect::<Vec<_>>());
        assert_eq!(layout.subbands[9].bins, (81..=100).collect::<Vec<_>>());
    }

    #[test]
    fn test_partition_truncates_highest_bins() {
        let layout = SubbandLayout::new(256, 205, 10).unwrap();
        assert_eq!(layout.tones_per_subband, 20);
        assert_eq!(layout.used_tones(), 200);
        // full allocation is -103..=-1, 1..=102; the top five bins go
        assert_eq!(layout.dropped, vec![98, 99, 100, 101, 102]);
        assert_eq!(*layout.bins.first().unwrap(), -103);
        assert_eq!(*layout.bins.last().unwrap(), 97);
    }

    #[test]
    fn test_partition_union_matches_bins() {
        for (used, subbands) in [(200, 10), (199, 7), (60, 4), (33, 33)] {
            let layout = SubbandLayout::new(256, used, subbands).unwrap();
            let union: Vec<i32> =
                layout.subbands.iter().flat_map(|s| s.bins.iter().copied()).collect();

            assert_eq!(union, layout.bins);
            assert_eq!(layout.bins.len(), subbands * (used / subbands));
            assert!(layout
                .subbands
                .iter()
                .all(|s| s.bins.len() == layout.tones_per_subband));

            let mut dedup = union.clone();
            dedup.dedup();
            assert_eq!(dedup.len(), union.len());
        }
    }

    #[test]
    fn test_center_bins() {
        let layout = SubbandLayout::new(64, 8, 2).unwrap();
        // bins -4..-1 and 1..4
        assert_eq!(layout.subbands[0].center_bin, -3); // mean -2.5 rounds away from zero
        assert_eq!(layout.subbands[1].center_bin, 3);

        // a subband straddling DC
        let layout = SubbandLayout::new(64, 6, 1).unwrap();
        assert_eq!(layout.subbands[0].center_bin, 0);
    }

    #[test]
    fn test_partition_rejects_too_many_subbands() {
        assert!(SubbandLayout::new(64, 5, 6).is_err());
        assert!(SubbandLayout::new(64, 5, 0).is_err());
    }
}
