/// End-to-end tests for the unfoldback CLI.
///
/// Each test writes a synthetic WAV fixture to the temp dir, runs the
/// binary on it, and checks the repaired output (or the diagnostics on
/// stderr for discovery-only runs).
use std::f64::consts::PI;
use std::path::{Path, PathBuf};
use std::process::Command;

fn cargo_bin() -> Command {
    let mut cmd = Command::new(env!("CARGO"));
    cmd.args(["run", "-p", "unfoldback", "--"]);
    cmd
}

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(name)
}

fn sine(n: usize, amplitude: f64, period: f64) -> Vec<f64> {
    (0..n)
        .map(|i| amplitude * (2.0 * PI * i as f64 / period).sin())
        .collect()
}

/// The wraparound model: sign flips, magnitude loses 2 per overflow unit.
fn wrap_sample(v: f64) -> f64 {
    1.0f64.copysign(v) * (v.abs() - 2.0)
}

#[test]
fn test_discovery_only_reports_peak() {
    let input = temp_path("unfoldback_discovery.wav");
    write_wav_f32(&input, &[sine(2000, 0.5, 160.0)]);

    let out = cargo_bin().arg(&input).output().expect("failed to run unfoldback");
    assert!(out.status.success());

    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("Max sample"), "missing peak summary: {stderr}");
    assert!(!stderr.contains("overflow"), "clean input flagged: {stderr}");

    std::fs::remove_file(&input).ok();
}

#[test]
fn test_overflow_notices_on_stderr() {
    // Genuinely over-full-scale but smooth: passes through the filter and
    // must be reported sample by sample.
    let input = temp_path("unfoldback_hot.wav");
    write_wav_f32(&input, &[sine(1000, 1.02, 200.0)]);

    let out = cargo_bin().arg(&input).output().expect("failed to run unfoldback");
    assert!(out.status.success());

    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("overflow"), "no overflow notices: {stderr}");
    assert!(stderr.contains("channel 0"), "notice lacks channel: {stderr}");

    std::fs::remove_file(&input).ok();
}

#[test]
fn test_repairs_injected_wrapped_run() {
    // Two channels, 8000 samples, with a 10-sample wrapped run injected
    // near a crest of channel 0. The repaired file must restore the
    // original smooth values (up to the normalization gain) and never
    // exceed full scale.
    let n = 8000;
    let truth = vec![sine(n, 0.92, 400.0), sine(n, 0.7, 270.0)];

    let mut corrupted = truth.clone();
    for i in 95..105 {
        corrupted[0][i] = wrap_sample(corrupted[0][i]);
    }
    assert!(corrupted[0][95..105].iter().all(|s| s.abs() > 1.0));

    let input = temp_path("unfoldback_wrapped_in.wav");
    let output = temp_path("unfoldback_wrapped_out.wav");
    let _ = std::fs::remove_file(&output);
    write_wav_f32(&input, &corrupted);

    let status = cargo_bin()
        .arg(&input)
        .arg(&output)
        .status()
        .expect("failed to run unfoldback");
    assert!(status.success());

    let repaired = read_wav_f64(&output);
    assert_eq!(repaired.len(), 2);
    assert_eq!(repaired[0].len(), n);
    assert_eq!(repaired[1].len(), n);

    // Peak of the corrected stream is channel 0's crest at 0.92.
    let gain = 1.0 / 0.92;
    for ch in 0..2 {
        for (i, (got, want)) in repaired[ch].iter().zip(&truth[ch]).enumerate() {
            assert!(
                (got - want * gain).abs() < 1e-3,
                "channel {ch} sample {i}: got {got}, want {}",
                want * gain
            );
            assert!(got.abs() <= 1.0 + 1e-6);
        }
    }

    std::fs::remove_file(&input).ok();
    std::fs::remove_file(&output).ok();
}

#[test]
fn test_int16_wrapped_sine_normalizes_to_full_scale() {
    // A 1.05x-amplitude sine that overflowed for real: every sample past
    // full scale was recorded wrapped, so the 16-bit file is in range.
    let n = 4000;
    let truth = sine(n, 1.05, 200.0);
    let corrupted: Vec<f64> = truth
        .iter()
        .map(|&v| if v.abs() > 1.0 { wrap_sample(v) } else { v })
        .collect();

    let input = temp_path("unfoldback_i16_in.wav");
    let output = temp_path("unfoldback_i16_out.wav");
    write_wav_i16(&input, &[corrupted]);

    let status = cargo_bin()
        .arg(&input)
        .arg(&output)
        .status()
        .expect("failed to run unfoldback");
    assert!(status.success());

    // Output spec mirrors the input, and the peak lands exactly on
    // positive full scale.
    let reader = hound::WavReader::open(&output).expect("invalid output WAV");
    assert_eq!(reader.spec().channels, 1);
    assert_eq!(reader.spec().bits_per_sample, 16);
    assert_eq!(reader.spec().sample_format, hound::SampleFormat::Int);

    let repaired = read_wav_f64(&output);
    let max_mag = repaired[0].iter().map(|s| s.abs()).fold(0.0f64, f64::max);
    assert!((max_mag - 32767.0 / 32768.0).abs() < 1e-9, "peak {max_mag}");

    for (i, (got, want)) in repaired[0].iter().zip(&truth).enumerate() {
        assert!(
            (got - want / 1.05).abs() < 1e-3,
            "sample {i}: got {got}, want {}",
            want / 1.05
        );
    }

    std::fs::remove_file(&input).ok();
    std::fs::remove_file(&output).ok();
}

#[test]
fn test_output_is_deterministic() {
    let input = temp_path("unfoldback_det_in.wav");
    let out1 = temp_path("unfoldback_det_out1.wav");
    let out2 = temp_path("unfoldback_det_out2.wav");

    let mut data = sine(3000, 0.95, 170.0);
    for i in 700..715 {
        data[i] = wrap_sample(data[i]);
    }
    write_wav_f32(&input, &[data]);

    for out in [&out1, &out2] {
        let status = cargo_bin()
            .arg(&input)
            .arg(out)
            .status()
            .expect("failed to run unfoldback");
        assert!(status.success());
    }

    let bytes1 = std::fs::read(&out1).unwrap();
    let bytes2 = std::fs::read(&out2).unwrap();
    assert_eq!(bytes1, bytes2, "two runs must produce identical files");

    for path in [&input, &out1, &out2] {
        std::fs::remove_file(path).ok();
    }
}

#[test]
fn test_silent_input_fails_without_writing() {
    let input = temp_path("unfoldback_silent.wav");
    let output = temp_path("unfoldback_silent_out.wav");
    let _ = std::fs::remove_file(&output);
    write_wav_i16(&input, &[vec![0.0; 2048]]);

    let out = cargo_bin()
        .arg(&input)
        .arg(&output)
        .output()
        .expect("failed to run unfoldback");
    assert!(!out.status.success(), "silent input must fail");

    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("no nonzero samples"), "stderr: {stderr}");
    assert!(!output.exists(), "no file may be written on failure");

    std::fs::remove_file(&input).ok();
}

#[test]
fn test_missing_input_fails() {
    let out = cargo_bin()
        .arg(temp_path("unfoldback_does_not_exist.wav"))
        .output()
        .expect("failed to run unfoldback");
    assert!(!out.status.success());
}

// ─── WAV fixture helpers ────────────────────────────────────────────────────

fn write_wav_f32(path: &Path, channels: &[Vec<f64>]) {
    let spec = hound::WavSpec {
        channels: channels.len() as u16,
        sample_rate: 8000,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(path, spec).expect("failed to create fixture");
    let frames = channels[0].len();
    for i in 0..frames {
        for ch in channels {
            writer.write_sample(ch[i] as f32).expect("failed to write sample");
        }
    }
    writer.finalize().expect("failed to finalize fixture");
}

fn write_wav_i16(path: &Path, channels: &[Vec<f64>]) {
    let spec = hound::WavSpec {
        channels: channels.len() as u16,
        sample_rate: 8000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).expect("failed to create fixture");
    let frames = channels[0].len();
    for i in 0..frames {
        for ch in channels {
            let q = (ch[i].clamp(-1.0, 1.0) * 32767.0).round() as i16;
            writer.write_sample(q).expect("failed to write sample");
        }
    }
    writer.finalize().expect("failed to finalize fixture");
}

/// Read a WAV back as planar f64, ints normalized by 2^(bits-1).
fn read_wav_f64(path: &Path) -> Vec<Vec<f64>> {
    let mut reader = hound::WavReader::open(path).expect("failed to open WAV");
    let spec = reader.spec();
    let channels = spec.channels as usize;
    let mut out = vec![Vec::new(); channels];
    match spec.sample_format {
        hound::SampleFormat::Float => {
            for (i, s) in reader.samples::<f32>().enumerate() {
                out[i % channels].push(s.unwrap() as f64);
            }
        }
        hound::SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample - 1)) as f64;
            for (i, s) in reader.samples::<i32>().enumerate() {
                out[i % channels].push(s.unwrap() as f64 / scale);
            }
        }
    }
    out
}
