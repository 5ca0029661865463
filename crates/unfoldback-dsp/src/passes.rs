/// Two-pass repair controller.
///
/// Pass 1 (discovery) measures the corrected stream's global peak and
/// reports overflowing samples; pass 2 rescales everything by `1 / peak`
/// and regroups the filter's irregular bursts into time-aligned blocks
/// for the sink. The gain depends on the very data being corrected, so
/// the source must be readable twice; each pass builds fresh filter
/// state.

use crate::error::RepairError;
use crate::pipeline::{ChannelPipeline, SampleSink, SampleSource};

/// Minimum per-channel buffer fill before a block is cut in pass 2.
pub const FLUSH_THRESHOLD: usize = 512;

/// One corrected sample whose magnitude exceeds full scale, observed
/// during discovery. Informational; does not alter control flow.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverflowNotice {
    pub channel: usize,
    /// Index of the sample within its channel's corrected output.
    pub frame: u64,
    pub magnitude: f64,
}

/// Accumulator returned by the discovery pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiscoveryReport {
    /// Largest corrected-sample magnitude across all channels.
    pub peak: f64,
    /// Number of samples that exceeded full scale.
    pub overflows: u64,
}

impl DiscoveryReport {
    /// Normalization gain for pass 2. A silent input has no usable peak.
    pub fn gain(&self) -> Result<f64, RepairError> {
        if self.peak == 0.0 {
            Err(RepairError::SilentInput)
        } else {
            Ok(1.0 / self.peak)
        }
    }
}

/// Pass 1: run the filter over the whole source, tracking the corrected
/// peak. Overflowing samples are streamed to `on_overflow` as they are
/// seen, so a CLI can report them live.
pub fn measure_peak<S, F>(source: &mut S, mut on_overflow: F) -> Result<DiscoveryReport, RepairError>
where
    S: SampleSource,
    F: FnMut(&OverflowNotice),
{
    let mut report = DiscoveryReport {
        peak: 0.0,
        overflows: 0,
    };
    let mut frames = vec![0u64; source.channels()];
    let mut pipeline = ChannelPipeline::new(source.channels());
    pipeline.run(source, |ch, burst| {
        for &s in burst {
            let magnitude = s.abs();
            report.peak = report.peak.max(magnitude);
            if magnitude > 1.0 {
                report.overflows += 1;
                on_overflow(&OverflowNotice {
                    channel: ch,
                    frame: frames[ch],
                    magnitude,
                });
            }
            frames[ch] += 1;
        }
        Ok(())
    })?;
    Ok(report)
}

/// Pass 2: re-run the filter from a fresh read of the source, scale every
/// corrected sample by `gain`, and cut a block once every channel has
/// more than [`FLUSH_THRESHOLD`] samples buffered. A final cut drains the
/// remaining common-length prefix; since the filters conserve per-channel
/// sample counts, that drains everything.
pub fn normalize<S, K>(source: &mut S, sink: &mut K, gain: f64) -> Result<(), RepairError>
where
    S: SampleSource,
    K: SampleSink,
{
    let channels = source.channels();
    let mut bufs: Vec<Vec<f64>> = vec![Vec::new(); channels];
    let mut pipeline = ChannelPipeline::new(channels);
    pipeline.run(source, |ch, burst| {
        bufs[ch].extend(burst.iter().map(|s| s * gain));
        if bufs.iter().map(Vec::len).min().unwrap_or(0) > FLUSH_THRESHOLD {
            cut_block(&mut bufs, sink)?;
        }
        Ok(())
    })?;
    cut_block(&mut bufs, sink)
}

/// Emit the common-length prefix of all channel buffers as one block,
/// keeping the channels time-aligned.
fn cut_block<K: SampleSink>(bufs: &mut [Vec<f64>], sink: &mut K) -> Result<(), RepairError> {
    let complete = bufs.iter().map(Vec::len).min().unwrap_or(0);
    if complete == 0 {
        return Ok(());
    }
    let block: Vec<Vec<f64>> = bufs
        .iter_mut()
        .map(|b| b.drain(..complete).collect())
        .collect();
    sink.write_block(&block).map_err(RepairError::SinkWrite)
}
