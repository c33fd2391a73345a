use crate::bins::{allocate_bins, bin_to_fft_index};
use crate::error::{Result, WaveformError};
use crate::frame::{Frame, FrameMetadata, Scheme, SchemeLayout};
use crate::params::{check_bit_count, Numerology};
use crate::preamble::generate_preamble;
use crate::qam::QamMapper;
use rand::Rng;
use rustfft::{num_complex::Complex64, FftPlanner};

/// OFDM symbol modulator with Cyclic Prefix (CP)
///
/// One interval: symbols onto the occupied bins, inverse FFT, then the last
/// `cp_len` samples copied in front.
///
/// ```text
/// [CP: last Ncp samples] [OFDM symbol: N samples]
/// ```
pub struct OfdmModulator {
    fft_planner: FftPlanner<f64>,
    fft_len: usize,
    cp_len: usize,
    bins: Vec<i32>,
}

impl OfdmModulator {
    pub fn new(fft_len: usize, cp_len: usize, bins: Vec<i32>) -> Self {
        Self {
            fft_planner: FftPlanner::new(),
            fft_len,
            cp_len,
            bins,
        }
    }

    pub fn cp_len(&self) -> usize {
        self.cp_len
    }

    pub fn total_samples_per_symbol(&self) -> usize {
        self.fft_len + self.cp_len
    }

    /// Modulate one interval into `output` (length N + Ncp).
    ///
    /// `symbols[i]` lands on `bins[i]`. The inverse transform is scaled by
    /// 1/N so a forward FFT of the CP-stripped block returns the symbols.
    /// Fails without touching `output` if either slice has the wrong length.
    pub fn modulate_into(
        &mut self,
        symbols: &[Complex64],
        output: &mut [Complex64],
    ) -> Result<()> {
        if symbols.len() != self.bins.len() {
            return Err(WaveformError::InvalidInputSize {
                expected: self.bins.len(),
                actual: symbols.len(),
            });
        }
        if output.len() != self.total_samples_per_symbol() {
            return Err(WaveformError::InvalidInputSize {
                expected: self.total_samples_per_symbol(),
                actual: output.len(),
            });
        }

        let n = self.fft_len;
        let body = &mut output[self.cp_len..];
        body.fill(Complex64::new(0.0, 0.0));
        for (&bin, &symbol) in self.bins.iter().zip(symbols) {
            body[bin_to_fft_index(bin, n)] = symbol;
        }

        let ifft = self.fft_planner.plan_fft_inverse(n);
        ifft.process(body);

        let scale = 1.0 / n as f64;
        for sample in body.iter_mut() {
            *sample *= scale;
        }

        // Prepend Cyclic Prefix (copy last cp_len samples to the beginning)
        output.copy_within(n..n + self.cp_len, 0);
        Ok(())
    }

    pub fn modulate(&mut self, symbols: &[Complex64]) -> Result<Vec<Complex64>> {
        let mut output = vec![Complex64::new(0.0, 0.0); self.total_samples_per_symbol()];
        self.modulate_into(symbols, &mut output)?;
        Ok(output)
    }
}

/// Frame builder for the OFDM path
///
/// Frame structure:
/// ```text
/// [preamble: N] [zeros: Ncp] [CP | symbol 0] ... [CP | symbol K-1]
/// ```
///
/// The zero guard keeps the first symbol's prefix from being read as part
/// of the preamble by a correlating receiver.
pub struct OfdmSynthesizer {
    numerology: Numerology,
    mapper: QamMapper,
    modulator: OfdmModulator,
}

impl OfdmSynthesizer {
    pub fn new(numerology: Numerology) -> Result<Self> {
        numerology.validate()?;
        let bins = allocate_bins(numerology.fft_len, numerology.used_tones)?;
        Ok(Self {
            numerology,
            mapper: QamMapper::new(numerology.modulation_order)?,
            modulator: OfdmModulator::new(numerology.fft_len, numerology.cyclic_prefix_len, bins),
        })
    }

    pub fn numerology(&self) -> &Numerology {
        &self.numerology
    }

    pub fn bins(&self) -> &[i32] {
        &self.modulator.bins
    }

    /// Bits needed for a full frame.
    pub fn frame_bits(&self) -> usize {
        self.numerology.bits_per_interval() * self.numerology.num_symbols
    }

    pub fn frame_len(&self) -> usize {
        self.numerology.ofdm_frame_len()
    }

    /// Map `bits` and build a frame. The rng only drives the preamble.
    pub fn synthesize<R: Rng + ?Sized>(&mut self, bits: &[bool], rng: &mut R) -> Result<Frame> {
        let params = &self.numerology;
        check_bit_count(bits.len(), params.bits_per_interval(), params.num_symbols)?;
        let symbols = self.mapper.map(bits)?;
        self.synthesize_symbols(&symbols, rng)
    }

    /// Build a frame from already mapped symbols, interval-major: symbol
    /// `k * U + i` goes to bin `i` of interval `k`.
    pub fn synthesize_symbols<R: Rng + ?Sized>(
        &mut self,
        symbols: &[Complex64],
        rng: &mut R,
    ) -> Result<Frame> {
        let params = self.numerology;
        let expected = params.used_tones * params.num_symbols;
        if symbols.len() != expected {
            return Err(WaveformError::InvalidInputSize {
                expected,
                actual: symbols.len(),
            });
        }

        let preamble = generate_preamble(params.preamble, params.fft_len, rng)?;
        let block_len = self.modulator.total_samples_per_symbol();
        let guard_len = self.modulator.cp_len();
        let total_len = self.frame_len();

        let mut samples = vec![Complex64::new(0.0, 0.0); total_len];
        samples[..preamble.len()].copy_from_slice(&preamble);

        let data_offset = preamble.len() + guard_len;
        let blocks = samples[data_offset..].chunks_exact_mut(block_len);
        for (block, interval) in blocks.zip(symbols.chunks_exact(params.used_tones)) {
            self.modulator.modulate_into(interval, block)?;
        }

        log::debug!(
            "OFDM frame: {} intervals of {} samples, {} total",
            params.num_symbols,
            block_len,
            total_len
        );

        Ok(Frame {
            samples,
            metadata: FrameMetadata {
                scheme: Scheme::Ofdm,
                bins: self.modulator.bins.clone(),
                modulation_order: self.mapper.order(),
                fft_len: params.fft_len,
                num_symbols: params.num_symbols,
                guard_len,
                block_len,
                preamble,
                total_len,
                layout: SchemeLayout::Ofdm {
                    cyclic_prefix_len: self.modulator.cp_len(),
                },
            },
        })
    }
}
