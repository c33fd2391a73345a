use crate::bins::{bin_to_fft_index, SubbandLayout};
use crate::error::{Result, WaveformError};
use crate::filter::{convolve, PrototypeFilter};
use crate::frame::{Frame, FrameMetadata, Scheme, SchemeLayout};
use crate::params::{check_bit_count, Numerology, UfmcParams};
use crate::preamble::generate_preamble;
use crate::qam::QamMapper;
use rand::Rng;
use rustfft::{num_complex::Complex64, FftPlanner};

/// Frame builder for the Universal Filtered Multi-Carrier path
///
/// Each interval is synthesized subband by subband: the subband's symbols
/// are inverse transformed on their own, convolved with the prototype
/// filter shifted to the subband centre, and the S filtered signals are
/// summed into one block of N + L - 1 samples. Blocks are concatenated
/// without a cyclic prefix; the filter tails take its place.
///
/// ```text
/// [preamble: N] [zeros: L-1] [block 0: N+L-1] ... [block K-1: N+L-1]
/// ```
///
/// The preamble is inserted unfiltered. The zero guard is exactly one
/// filter transient long.
pub struct UfmcSynthesizer {
    numerology: Numerology,
    params: UfmcParams,
    mapper: QamMapper,
    layout: SubbandLayout,
    filter: PrototypeFilter,
    /// Prototype shifted to each subband centre, designed once.
    subband_filters: Vec<Vec<Complex64>>,
    fft_planner: FftPlanner<f64>,
}

impl UfmcSynthesizer {
    pub fn new(numerology: Numerology, params: UfmcParams) -> Result<Self> {
        numerology.validate()?;
        params.validate(&numerology)?;

        let layout =
            SubbandLayout::new(numerology.fft_len, numerology.used_tones, params.num_subbands)?;
        let cutoff = layout.tones_per_subband as f64 / numerology.fft_len as f64;
        let filter = PrototypeFilter::design(params.filter_len, params.sidelobe_atten_db, cutoff)?;
        let subband_filters = layout
            .subbands
            .iter()
            .map(|subband| filter.shifted(subband.center_bin, numerology.fft_len))
            .collect();

        Ok(Self {
            numerology,
            params,
            mapper: QamMapper::new(numerology.modulation_order)?,
            layout,
            filter,
            subband_filters,
            fft_planner: FftPlanner::new(),
        })
    }

    pub fn numerology(&self) -> &Numerology {
        &self.numerology
    }

    pub fn params(&self) -> &UfmcParams {
        &self.params
    }

    pub fn layout(&self) -> &SubbandLayout {
        &self.layout
    }

    pub fn filter(&self) -> &PrototypeFilter {
        &self.filter
    }

    /// Bits per interval after subband truncation.
    pub fn bits_per_interval(&self) -> usize {
        self.layout.used_tones() * self.mapper.bits_per_symbol()
    }

    pub fn frame_bits(&self) -> usize {
        self.bits_per_interval() * self.numerology.num_symbols
    }

    pub fn block_len(&self) -> usize {
        self.numerology.fft_len + self.params.tail_len()
    }

    pub fn frame_len(&self) -> usize {
        let intervals = self.numerology.num_symbols * self.block_len();
        self.numerology.fft_len + self.params.tail_len() + intervals
    }

    /// Map `bits` and build a frame. The rng only drives the preamble.
    pub fn synthesize<R: Rng + ?Sized>(&mut self, bits: &[bool], rng: &mut R) -> Result<Frame> {
        check_bit_count(bits.len(), self.bits_per_interval(), self.numerology.num_symbols)?;
        let symbols = self.mapper.map(bits)?;
        self.synthesize_symbols(&symbols, rng)
    }

    /// Build a frame from mapped symbols, ordered interval-major, then by
    /// subband, then by bin within the subband.
    pub fn synthesize_symbols<R: Rng + ?Sized>(
        &mut self,
        symbols: &[Complex64],
        rng: &mut R,
    ) -> Result<Frame> {
        let params = self.numerology;
        let per_interval = self.layout.used_tones();
        let expected = per_interval * params.num_symbols;
        if symbols.len() != expected {
            return Err(WaveformError::InvalidInputSize {
                expected,
                actual: symbols.len(),
            });
        }

        let preamble = generate_preamble(params.preamble, params.fft_len, rng)?;
        let guard_len = self.params.tail_len();
        let block_len = self.block_len();
        let total_len = self.frame_len();

        let mut samples = vec![Complex64::new(0.0, 0.0); total_len];
        samples[..preamble.len()].copy_from_slice(&preamble);

        let data_offset = preamble.len() + guard_len;
        let blocks = samples[data_offset..].chunks_exact_mut(block_len);
        for (block, interval) in blocks.zip(symbols.chunks_exact(per_interval)) {
            self.modulate_interval(interval, block)?;
        }

        log::debug!(
            "UFMC frame: {} intervals of {} samples across {} subbands, {} total",
            params.num_symbols,
            block_len,
            self.layout.num_subbands(),
            total_len
        );

        Ok(Frame {
            samples,
            metadata: FrameMetadata {
                scheme: Scheme::Ufmc,
                bins: self.layout.bins.clone(),
                modulation_order: self.mapper.order(),
                fft_len: params.fft_len,
                num_symbols: params.num_symbols,
                guard_len,
                block_len,
                preamble,
                total_len,
                layout: SchemeLayout::Ufmc {
                    subbands: self.layout.clone(),
                    filter: self.filter.clone(),
                },
            },
        })
    }

    /// Filter and sum every subband of one interval into `output`
    /// (length N + L - 1).
    pub fn modulate_interval(
        &mut self,
        symbols: &[Complex64],
        output: &mut [Complex64],
    ) -> Result<()> {
        if symbols.len() != self.layout.used_tones() {
            return Err(WaveformError::InvalidInputSize {
                expected: self.layout.used_tones(),
                actual: symbols.len(),
            });
        }
        if output.len() != self.block_len() {
            return Err(WaveformError::InvalidInputSize {
                expected: self.block_len(),
                actual: output.len(),
            });
        }

        let n = self.numerology.fft_len;
        let scale = 1.0 / n as f64;
        let ifft = self.fft_planner.plan_fft_inverse(n);

        output.fill(Complex64::new(0.0, 0.0));
        let mut buffer = vec![Complex64::new(0.0, 0.0); n];
        let groups = symbols.chunks_exact(self.layout.tones_per_subband);
        let subbands = self.layout.subbands.iter().zip(&self.subband_filters);
        for ((subband, taps), group) in subbands.zip(groups) {
            buffer.fill(Complex64::new(0.0, 0.0));
            for (&bin, &symbol) in subband.bins.iter().zip(group) {
                buffer[bin_to_fft_index(bin, n)] = symbol;
            }
            ifft.process(&mut buffer);
            for sample in buffer.iter_mut() {
                *sample *= scale;
            }

            for (acc, filtered) in output.iter_mut().zip(convolve(&buffer, taps)) {
                *acc += filtered;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preamble::PreambleKind;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn small_numerology() -> Numerology {
        Numerology {
            sample_rate: 1.0e6,
            fft_len: 32,
            cyclic_prefix_len: 4,
            used_tones: 12,
            modulation_order: 4,
            num_symbols: 2,
            preamble: PreambleKind::SignFlippedQuarters,
        }
    }

    fn small_params() -> UfmcParams {
        UfmcParams {
            num_subbands: 3,
            filter_len: 9,
            sidelobe_atten_db: 40.0,
        }
    }

    #[test]
    fn test_frame_length() {
        let mut synth = UfmcSynthesizer::new(small_numerology(), small_params()).unwrap();
        let bits = vec![true; synth.frame_bits()];
        let frame = synth.synthesize(&bits, &mut StdRng::seed_from_u64(1)).unwrap();

        // 32 preamble + 8 guard + 2 * (32 + 8)
        assert_eq!(frame.len(), 120);
        assert_eq!(synth.frame_len(), 120);
        assert_eq!(frame.metadata.block_len, 40);
        assert_eq!(frame.metadata.guard_len, 8);
        assert!(frame.samples[32..40].iter().all(|s| s.norm() == 0.0));
    }

    #[test]
    fn test_cutoff_matches_subband_width() {
        let synth = UfmcSynthesizer::new(small_numerology(), small_params()).unwrap();
        assert_eq!(synth.layout().tones_per_subband, 4);
        assert!((synth.filter().cutoff - 4.0 / 32.0).abs() < 1e-15);
        assert_eq!(synth.filter().len(), 9);
    }

    #[test]
    fn test_block_is_sum_of_filtered_subbands() {
        let mut synth = UfmcSynthesizer::new(small_numerology(), small_params()).unwrap();
        let symbols: Vec<Complex64> = (0..12)
            .map(|i| Complex64::new(if i % 2 == 0 { 1.0 } else { -1.0 }, (i % 3) as f64 - 1.0))
            .collect();
        let mut block = vec![Complex64::new(0.0, 0.0); synth.block_len()];
        synth.modulate_interval(&symbols, &mut block).unwrap();

        // direct evaluation: sum over subbands of (sum_k X[k] e^{j2pi k n/N} / N) * h_m
        let n = 32usize;
        let mut expected = vec![Complex64::new(0.0, 0.0); block.len()];
        for (m, subband) in synth.layout().subbands.iter().enumerate() {
            let mut time = vec![Complex64::new(0.0, 0.0); n];
            for (t, sample) in time.iter_mut().enumerate() {
                for (i, &bin) in subband.bins.iter().enumerate() {
                    let phase = 2.0 * std::f64::consts::PI * bin as f64 * t as f64 / n as f64;
                    *sample += symbols[m * 4 + i] * Complex64::from_polar(1.0 / n as f64, phase);
                }
            }
            let taps = synth.filter().shifted(subband.center_bin, n);
            for (acc, value) in expected.iter_mut().zip(convolve(&time, &taps)) {
                *acc += value;
            }
        }

        for (a, b) in block.iter().zip(expected.iter()) {
            assert!((a - b).norm() < 1e-12);
        }
    }

    #[test]
    fn test_modulate_interval_rejects_wrong_buffer() {
        let mut synth = UfmcSynthesizer::new(small_numerology(), small_params()).unwrap();
        let symbols = vec![Complex64::new(1.0, 0.0); 12];

        let mut short = vec![Complex64::new(0.0, 0.0); 10];
        let result = synth.modulate_interval(&symbols, &mut short);
        assert!(matches!(
            result,
            Err(WaveformError::InvalidInputSize { expected: 40, actual: 10 })
        ));
        assert!(short.iter().all(|s| s.norm() == 0.0));

        let mut long = vec![Complex64::new(0.0, 0.0); 41];
        assert!(synth.modulate_interval(&symbols, &mut long).is_err());

        let mut exact = vec![Complex64::new(0.0, 0.0); 40];
        let result = synth.modulate_interval(&symbols[..11], &mut exact);
        assert!(matches!(
            result,
            Err(WaveformError::InvalidInputSize { expected: 12, actual: 11 })
        ));
    }

    #[test]
    fn test_truncated_tones_reduce_bit_budget() {
        let numerology = Numerology { used_tones: 14, ..small_numerology() };
        let synth = UfmcSynthesizer::new(numerology, small_params()).unwrap();

        // 14 tones into 3 subbands keeps 12
        assert_eq!(synth.layout().used_tones(), 12);
        assert_eq!(synth.layout().dropped, vec![6, 7]);
        assert_eq!(synth.bits_per_interval(), 24);
        assert_eq!(synth.frame_bits(), 48);
    }

    #[test]
    fn test_rejects_bad_bits() {
        let mut synth = UfmcSynthesizer::new(small_numerology(), small_params()).unwrap();
        let mut rng = StdRng::seed_from_u64(0);

        let result = synth.synthesize(&[false; 25], &mut rng);
        assert!(matches!(result, Err(WaveformError::BitLength { len: 25, chunk: 24 })));

        let result = synth.synthesize(&[false; 24], &mut rng);
        assert!(matches!(result, Err(WaveformError::SymbolCount { expected: 2, actual: 1 })));
    }

    #[test]
    fn test_rejects_even_filter_length() {
        let params = UfmcParams { filter_len: 8, ..small_params() };
        assert!(UfmcSynthesizer::new(small_numerology(), params).is_err());
    }

    #[test]
    fn test_metadata_layout() {
        let mut synth = UfmcSynthesizer::new(small_numerology(), small_params()).unwrap();
        let bits = vec![false; synth.frame_bits()];
        let frame = synth.synthesize(&bits, &mut StdRng::seed_from_u64(5)).unwrap();

        assert_eq!(frame.metadata.scheme, Scheme::Ufmc);
        assert_eq!(frame.metadata.bins, (-6..0).chain(1..=6).collect::<Vec<_>>());
        match &frame.metadata.layout {
            SchemeLayout::Ufmc { subbands, filter } => {
                assert_eq!(subbands.num_subbands(), 3);
                assert_eq!(filter.taps.len(), 9);
            }
            other => panic!("unexpected layout {:?}", other),
        }
    }
}
