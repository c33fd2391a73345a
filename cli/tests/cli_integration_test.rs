use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn tmp_path(name: &str) -> PathBuf {
    let tmp_dir = std::env::temp_dir().join("carrierwave-cli-tests");
    fs::create_dir_all(&tmp_dir).ok();
    tmp_dir.join(name)
}

fn run_carrierwave(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_carrierwave"))
        .args(args)
        .output()
        .expect("Failed to execute carrierwave")
}

fn read_json(path: &Path) -> serde_json::Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

#[test]
fn test_ofdm_writes_iq_wav_and_metadata() {
    let wav = tmp_path("ofdm.wav");
    let json = tmp_path("ofdm.json");

    let output = run_carrierwave(&[
        "ofdm",
        wav.to_str().unwrap(),
        "--seed",
        "7",
        "--metadata",
        json.to_str().unwrap(),
    ]);
    assert!(output.status.success(), "ofdm failed: {}", String::from_utf8_lossy(&output.stderr));
    assert!(stdout(&output).contains("OFDM frame: 3168 samples"));

    let reader = hound::WavReader::open(&wav).expect("Output WAV not readable");
    assert_eq!(reader.spec().channels, 2);
    assert_eq!(reader.spec().sample_rate, 15_360_000);
    assert_eq!(reader.spec().sample_format, hound::SampleFormat::Float);
    assert_eq!(reader.len(), 2 * 3168);

    let metadata = read_json(&json);
    assert_eq!(metadata["scheme"], "OFDM");
    assert_eq!(metadata["total_len"], 3168);
    assert_eq!(metadata["cyclic_prefix_len"], 32);
    assert_eq!(metadata["bins"].as_array().unwrap().len(), 200);
}

#[test]
fn test_ufmc_frame_length() {
    let wav = tmp_path("ufmc.wav");
    let json = tmp_path("ufmc.json");

    let output = run_carrierwave(&[
        "ufmc",
        wav.to_str().unwrap(),
        "--preamble",
        "sign-flipped-quarters",
        "--metadata",
        json.to_str().unwrap(),
    ]);
    assert!(output.status.success(), "ufmc failed: {}", String::from_utf8_lossy(&output.stderr));
    assert!(stdout(&output).contains("UFMC frame: 3278 samples"));

    let reader = hound::WavReader::open(&wav).unwrap();
    assert_eq!(reader.len(), 2 * 3278);

    let metadata = read_json(&json);
    assert_eq!(metadata["ufmc"]["filter_taps"].as_array().unwrap().len(), 43);
    assert_eq!(metadata["ufmc"]["subbands"].as_array().unwrap().len(), 10);
}

#[test]
fn test_same_seed_same_file() {
    let first = tmp_path("seed_a.wav");
    let second = tmp_path("seed_b.wav");

    for path in [&first, &second] {
        let output = run_carrierwave(&["ufmc", path.to_str().unwrap(), "--seed", "99", "-n", "2"]);
        assert!(output.status.success());
    }
    assert_eq!(fs::read(&first).unwrap(), fs::read(&second).unwrap());
}

#[test]
fn test_compare_reports_both_schemes() {
    let csv = tmp_path("psd.csv");
    let output =
        run_carrierwave(&["compare", "--used-tones", "205", "--psd", csv.to_str().unwrap()]);
    assert!(output.status.success(), "compare failed: {}", String::from_utf8_lossy(&output.stderr));

    let text = stdout(&output);
    assert!(text.contains("OFDM"));
    assert!(text.contains("UFMC"));

    let content = fs::read_to_string(&csv).unwrap();
    let mut lines = content.lines();
    assert_eq!(lines.next(), Some("freq_hz,ofdm_db,ufmc_db"));
    assert_eq!(lines.count(), 1024);
}

#[test]
fn test_rejects_unknown_preamble() {
    let wav = tmp_path("bad_preamble.wav");
    let output = run_carrierwave(&["ofdm", wav.to_str().unwrap(), "--preamble", "chirp"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Unknown preamble variant"));
}

#[test]
fn test_rejects_invalid_numerology() {
    let wav = tmp_path("bad_tones.wav");
    let output = run_carrierwave(&["ofdm", wav.to_str().unwrap(), "--used-tones", "255"]);
    assert!(!output.status.success());
}
