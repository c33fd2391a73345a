use carrierwave_core::{
    Frame, Numerology, OfdmSynthesizer, PreambleKind, UfmcParams, UfmcSynthesizer,
    DEFAULT_FILTER_LEN, DEFAULT_NUM_SUBBANDS, DEFAULT_SIDELOBE_ATTEN_DB,
};
use clap::{Args, Parser, Subcommand};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::{Path, PathBuf};

mod output;
mod spectrum;

use output::{write_iq_wav, write_metadata, write_psd_csv, FrameReport};
use spectrum::{out_of_band_fraction, papr_db, welch_psd};

/// Welch segment length for the compare report
const PSD_SEGMENT_LEN: usize = 1024;

#[derive(Parser)]
#[command(name = "carrierwave")]
#[command(about = "OFDM and UFMC baseband frame generator")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Clone)]
struct NumerologyArgs {
    /// Sampling rate in Hz
    #[arg(long, default_value_t = 15.36e6)]
    sample_rate: f64,

    /// Inverse FFT size
    #[arg(long, default_value_t = 256)]
    fft_len: usize,

    /// Cyclic prefix length (OFDM only)
    #[arg(long, default_value_t = 32)]
    cp_len: usize,

    /// Occupied tones, DC excluded
    #[arg(long, default_value_t = 200)]
    used_tones: usize,

    /// QAM constellation size
    #[arg(short = 'm', long, default_value_t = 4)]
    order: usize,

    /// Number of data symbol intervals
    #[arg(short = 'n', long, default_value_t = 10)]
    symbols: usize,

    /// Preamble variant: repeated-halves or sign-flipped-quarters
    #[arg(long, default_value = "repeated-halves")]
    preamble: PreambleKind,

    /// Seed for the random bits and the preamble
    #[arg(long, default_value_t = 0)]
    seed: u64,
}

impl NumerologyArgs {
    fn numerology(&self) -> Numerology {
        Numerology {
            sample_rate: self.sample_rate,
            fft_len: self.fft_len,
            cyclic_prefix_len: self.cp_len,
            used_tones: self.used_tones,
            modulation_order: self.order,
            num_symbols: self.symbols,
            preamble: self.preamble,
        }
    }
}

#[derive(Args, Debug, Clone)]
struct UfmcArgs {
    /// Number of UFMC subbands
    #[arg(long, default_value_t = DEFAULT_NUM_SUBBANDS)]
    subbands: usize,

    /// Prototype filter length (odd)
    #[arg(long, default_value_t = DEFAULT_FILTER_LEN)]
    filter_len: usize,

    /// Prototype filter stopband attenuation in dB
    #[arg(long, default_value_t = DEFAULT_SIDELOBE_ATTEN_DB)]
    attenuation: f64,
}

impl UfmcArgs {
    fn params(&self) -> UfmcParams {
        UfmcParams {
            num_subbands: self.subbands,
            filter_len: self.filter_len,
            sidelobe_atten_db: self.attenuation,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Synthesize a CP-OFDM frame to an I/Q WAV file
    Ofdm {
        /// Output WAV file (2 channels: I, Q)
        #[arg(value_name = "OUTPUT.WAV")]
        output: PathBuf,

        #[command(flatten)]
        numerology: NumerologyArgs,

        /// Write frame metadata as JSON
        #[arg(long, value_name = "FILE.JSON")]
        metadata: Option<PathBuf>,
    },

    /// Synthesize a UFMC frame to an I/Q WAV file
    Ufmc {
        /// Output WAV file (2 channels: I, Q)
        #[arg(value_name = "OUTPUT.WAV")]
        output: PathBuf,

        #[command(flatten)]
        numerology: NumerologyArgs,

        #[command(flatten)]
        ufmc: UfmcArgs,

        /// Write frame metadata as JSON
        #[arg(long, value_name = "FILE.JSON")]
        metadata: Option<PathBuf>,
    },

    /// Synthesize both frames from the same bits and compare their spectra
    Compare {
        #[command(flatten)]
        numerology: NumerologyArgs,

        #[command(flatten)]
        ufmc: UfmcArgs,

        /// Bins beyond the occupied band edge where out-of-band power starts
        #[arg(long, default_value_t = 10)]
        oob_margin: usize,

        /// Write both Welch PSD estimates as CSV
        #[arg(long, value_name = "FILE.CSV")]
        psd: Option<PathBuf>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Ofdm { output, numerology, metadata } => {
            ofdm_command(&output, &numerology, metadata.as_deref())?
        }
        Commands::Ufmc { output, numerology, ufmc, metadata } => {
            ufmc_command(&output, &numerology, &ufmc, metadata.as_deref())?
        }
        Commands::Compare { numerology, ufmc, oob_margin, psd } => {
            compare_command(&numerology, &ufmc, oob_margin, psd.as_deref())?
        }
    }

    Ok(())
}

fn random_bits<R: Rng>(rng: &mut R, len: usize) -> Vec<bool> {
    (0..len).map(|_| rng.gen()).collect()
}

fn ofdm_command(
    output_path: &Path,
    args: &NumerologyArgs,
    metadata_path: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let numerology = args.numerology();
    let mut synth = OfdmSynthesizer::new(numerology)?;

    let mut rng = StdRng::seed_from_u64(args.seed);
    let bits = random_bits(&mut rng, synth.frame_bits());
    log::info!("Generated {} random bits (seed {})", bits.len(), args.seed);

    let frame = synth.synthesize(&bits, &mut rng)?;
    println!(
        "OFDM frame: {} samples ({} preamble + {} guard + {} x {})",
        frame.len(),
        frame.metadata.preamble.len(),
        frame.metadata.guard_len,
        frame.metadata.num_symbols,
        frame.metadata.block_len
    );

    finish_frame(&frame, &numerology, output_path, metadata_path)
}

fn ufmc_command(
    output_path: &Path,
    args: &NumerologyArgs,
    ufmc: &UfmcArgs,
    metadata_path: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let numerology = args.numerology();
    let mut synth = UfmcSynthesizer::new(numerology, ufmc.params())?;

    let mut rng = StdRng::seed_from_u64(args.seed);
    let bits = random_bits(&mut rng, synth.frame_bits());
    log::info!("Generated {} random bits (seed {})", bits.len(), args.seed);

    let frame = synth.synthesize(&bits, &mut rng)?;
    println!(
        "UFMC frame: {} samples ({} preamble + {} guard + {} x {}), {} subbands of {} tones",
        frame.len(),
        frame.metadata.preamble.len(),
        frame.metadata.guard_len,
        frame.metadata.num_symbols,
        frame.metadata.block_len,
        synth.layout().num_subbands(),
        synth.layout().tones_per_subband
    );

    finish_frame(&frame, &numerology, output_path, metadata_path)
}

fn finish_frame(
    frame: &Frame,
    numerology: &Numerology,
    output_path: &Path,
    metadata_path: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    write_iq_wav(output_path, &frame.samples, numerology.sample_rate)?;
    println!("Wrote {} I/Q samples to {}", frame.len(), output_path.display());

    if let Some(path) = metadata_path {
        write_metadata(path, &FrameReport::new(frame, numerology.sample_rate))?;
        println!("Wrote metadata to {}", path.display());
    }
    Ok(())
}

fn compare_command(
    args: &NumerologyArgs,
    ufmc: &UfmcArgs,
    oob_margin: usize,
    psd_path: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let numerology = args.numerology();
    let mut ofdm_synth = OfdmSynthesizer::new(numerology)?;
    let mut ufmc_synth = UfmcSynthesizer::new(numerology, ufmc.params())?;

    let mut rng = StdRng::seed_from_u64(args.seed);
    let bits = random_bits(&mut rng, ofdm_synth.frame_bits());
    // identical rng state for both preambles
    let mut ufmc_rng = rng.clone();

    // UFMC may carry fewer tones: keep the leading bits of every interval
    let ufmc_bits: Vec<bool> = bits
        .chunks_exact(numerology.bits_per_interval())
        .flat_map(|interval| interval[..ufmc_synth.bits_per_interval()].iter().copied())
        .collect();

    let ofdm = ofdm_synth.synthesize(&bits, &mut rng)?;
    let ufmc = ufmc_synth.synthesize(&ufmc_bits, &mut ufmc_rng)?;

    let fft_len = numerology.fft_len as f64;
    let ofdm_edge = band_edge(&ofdm, oob_margin, fft_len);
    let ufmc_edge = band_edge(&ufmc, oob_margin, fft_len);

    let segment_len = PSD_SEGMENT_LEN.min(ofdm.data().len()).min(ufmc.data().len());
    let ofdm_psd = welch_psd(ofdm.data(), segment_len);
    let ufmc_psd = welch_psd(ufmc.data(), segment_len);

    println!("{:<6} {:>8} {:>10} {:>12}", "scheme", "samples", "PAPR (dB)", "OOB (dB)");
    for (frame, psd, edge) in [(&ofdm, &ofdm_psd, ofdm_edge), (&ufmc, &ufmc_psd, ufmc_edge)] {
        let oob = out_of_band_fraction(psd, edge);
        println!(
            "{:<6} {:>8} {:>10.2} {:>12.2}",
            frame.metadata.scheme.to_string(),
            frame.len(),
            papr_db(frame.data()),
            10.0 * oob.max(f64::MIN_POSITIVE).log10()
        );
    }

    if let Some(path) = psd_path {
        write_psd_csv(path, &ofdm_psd, &ufmc_psd, numerology.sample_rate)?;
        println!("Wrote PSD estimates to {}", path.display());
    }
    Ok(())
}

/// Normalized frequency where out-of-band measurement starts for `frame`.
fn band_edge(frame: &Frame, margin: usize, fft_len: f64) -> f64 {
    let widest = frame.metadata.bins.iter().map(|b| b.unsigned_abs()).max().unwrap_or(0);
    ((widest as usize + margin) as f64 + 0.5) / fft_len
}
