/// Unfoldback — repair integer-overflow wraparound in WAV files.
///
/// A sample that should have clipped but wrapped instead flips sign and
/// loses 2 units of magnitude per unit of overflow. Runs of up to 100
/// such samples are un-inverted when the corrected reading is smoother
/// than the recorded one, then the whole file is normalized to peak at
/// full scale.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use unfoldback_dsp::passes;

mod wav;
use wav::{WavSink, WavSource};

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    let mut input: Option<PathBuf> = None;
    let mut output: Option<PathBuf> = None;

    for arg in &args[1..] {
        match arg.as_str() {
            "--help" | "-h" => {
                print_usage();
                return ExitCode::SUCCESS;
            }
            other if other.starts_with('-') => {
                eprintln!("Unknown argument: {other}");
                print_usage();
                return ExitCode::FAILURE;
            }
            path => {
                if input.is_none() {
                    input = Some(PathBuf::from(path));
                } else if output.is_none() {
                    output = Some(PathBuf::from(path));
                } else {
                    eprintln!("Too many arguments: {path}");
                    print_usage();
                    return ExitCode::FAILURE;
                }
            }
        }
    }

    let Some(input) = input else {
        print_usage();
        return ExitCode::FAILURE;
    };

    match run(&input, output.as_deref()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("unfoldback: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(input: &Path, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let mut source = WavSource::open(input)?;
    let report = passes::measure_peak(&mut source, |n| {
        eprintln!(
            "channel {} frame {}: overflow {}",
            n.channel, n.frame, n.magnitude
        );
    })?;
    eprintln!("Max sample {}.", report.peak);

    // Without an output path only the discovery pass runs.
    let Some(output) = output else {
        return Ok(());
    };

    let gain = report.gain()?;

    // Pass 2 needs an independent re-read; filter state never carries
    // over between passes.
    let mut source = WavSource::open(input)?;
    let mut sink = WavSink::create(output, source.spec())?;
    passes::normalize(&mut source, &mut sink, gain)?;
    sink.finalize()?;
    Ok(())
}

fn print_usage() {
    eprintln!(
        r#"Unfoldback — repair integer-overflow wraparound in WAV files

USAGE:
    unfoldback <in.wav> [<out.wav>]

With only <in.wav>, runs the discovery pass: per-sample overflow notices
and the peak amplitude go to stderr and no file is written. With
<out.wav>, additionally rewrites the audio with wrapped runs un-inverted
and the signal normalized to peak at full scale.

OPTIONS:
    -h, --help    Print this help"#
    );
}
