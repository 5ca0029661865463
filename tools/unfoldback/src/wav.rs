/// hound-backed Source/Sink collaborators for the repair passes.
///
/// Integer PCM is normalized to f64 on read (full-scale divisor
/// `2^(bits-1)`) and re-quantized with clamping on write; float WAVs pass
/// through. The writer mirrors the reader's spec so the output container
/// matches the input. hound exposes no INFO-chunk access, so title and
/// artist stay at the trait defaults.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use unfoldback_dsp::error::BoxedError;
use unfoldback_dsp::pipeline::{SampleSink, SampleSource};

pub struct WavSource {
    reader: hound::WavReader<BufReader<File>>,
    spec: hound::WavSpec,
    /// Full-scale divisor for integer formats; 1.0 for float.
    scale: f64,
}

impl WavSource {
    pub fn open(path: &Path) -> Result<Self, hound::Error> {
        let reader = hound::WavReader::open(path)?;
        let spec = reader.spec();
        let scale = match spec.sample_format {
            hound::SampleFormat::Int => (1i64 << (spec.bits_per_sample - 1)) as f64,
            hound::SampleFormat::Float => 1.0,
        };
        Ok(Self {
            reader,
            spec,
            scale,
        })
    }

    pub fn spec(&self) -> hound::WavSpec {
        self.spec
    }
}

impl SampleSource for WavSource {
    fn channels(&self) -> usize {
        self.spec.channels as usize
    }

    fn sample_rate(&self) -> u32 {
        self.spec.sample_rate
    }

    fn read_chunk(&mut self, max_frames: usize) -> Result<Vec<Vec<f64>>, BoxedError> {
        let channels = self.spec.channels as usize;
        let scale = self.scale;
        match self.spec.sample_format {
            hound::SampleFormat::Int => collect_frames(
                self.reader.samples::<i32>(),
                channels,
                max_frames,
                |s| s as f64 / scale,
            ),
            hound::SampleFormat::Float => collect_frames(
                self.reader.samples::<f32>(),
                channels,
                max_frames,
                |s| s as f64,
            ),
        }
    }
}

/// De-interleave up to `max_frames` whole frames into planar channels.
/// A trailing partial frame (truncated file) is dropped.
fn collect_frames<T, I, C>(
    mut samples: I,
    channels: usize,
    max_frames: usize,
    convert: C,
) -> Result<Vec<Vec<f64>>, BoxedError>
where
    I: Iterator<Item = hound::Result<T>>,
    C: Fn(T) -> f64,
{
    let mut block = vec![Vec::new(); channels];
    let mut frame = Vec::with_capacity(channels);
    for _ in 0..max_frames {
        frame.clear();
        while frame.len() < channels {
            match samples.next() {
                Some(s) => frame.push(convert(s?)),
                None => break,
            }
        }
        if frame.len() < channels {
            break;
        }
        for (buf, &s) in block.iter_mut().zip(&frame) {
            buf.push(s);
        }
    }
    Ok(block)
}

pub struct WavSink {
    writer: hound::WavWriter<BufWriter<File>>,
    spec: hound::WavSpec,
    /// Full-scale multiplier for integer formats; 1.0 for float.
    scale: f64,
}

impl WavSink {
    /// Create an output WAV with the given (typically the input's) spec.
    pub fn create(path: &Path, spec: hound::WavSpec) -> Result<Self, hound::Error> {
        let writer = hound::WavWriter::create(path, spec)?;
        let scale = match spec.sample_format {
            hound::SampleFormat::Int => ((1i64 << (spec.bits_per_sample - 1)) - 1) as f64,
            hound::SampleFormat::Float => 1.0,
        };
        Ok(Self {
            writer,
            spec,
            scale,
        })
    }

    pub fn finalize(self) -> Result<(), hound::Error> {
        self.writer.finalize()
    }
}

impl SampleSink for WavSink {
    fn write_block(&mut self, block: &[Vec<f64>]) -> Result<(), BoxedError> {
        let frames = block.first().map_or(0, Vec::len);
        match self.spec.sample_format {
            hound::SampleFormat::Int => {
                for i in 0..frames {
                    for ch in block {
                        let q = (ch[i].clamp(-1.0, 1.0) * self.scale).round() as i32;
                        self.writer.write_sample(q)?;
                    }
                }
            }
            hound::SampleFormat::Float => {
                for i in 0..frames {
                    for ch in block {
                        self.writer.write_sample(ch[i] as f32)?;
                    }
                }
            }
        }
        Ok(())
    }
}
