/// Channel fan-out: drives a multi-channel source through one
/// minimum-energy inverter per channel and hands the corrected bursts to
/// a consumer, tagged with the channel index.

use crate::error::{BoxedError, RepairError};
use crate::inverter::MinimumEnergyInverter;

/// Frames requested from the source per read.
pub const READ_CHUNK: usize = 512;

/// A restartable supplier of multi-channel audio. Pass 2 re-reads the
/// whole signal, so callers must be able to construct a second source
/// for the same data (e.g. by reopening the file).
pub trait SampleSource {
    fn channels(&self) -> usize;
    fn sample_rate(&self) -> u32;
    /// Optional container metadata.
    fn title(&self) -> Option<&str> {
        None
    }
    fn artist(&self) -> Option<&str> {
        None
    }
    /// Next planar block in playback order, one Vec per channel, up to
    /// `max_frames` frames; all channels carry the same length. An empty
    /// block means end of stream.
    fn read_chunk(&mut self, max_frames: usize) -> Result<Vec<Vec<f64>>, BoxedError>;
}

/// Block-writing consumer of the corrected signal.
pub trait SampleSink {
    /// Write one block of equal-length per-channel runs, in channel-major
    /// sample order.
    fn write_block(&mut self, block: &[Vec<f64>]) -> Result<(), BoxedError>;
}

/// One filter instance per channel, built fresh for each pass.
pub struct ChannelPipeline {
    filters: Vec<MinimumEnergyInverter>,
}

impl ChannelPipeline {
    pub fn new(channels: usize) -> Self {
        Self {
            filters: (0..channels).map(|_| MinimumEnergyInverter::new()).collect(),
        }
    }

    /// Run the source to exhaustion. `consume(channel, burst)` receives
    /// corrected samples in strictly increasing time order within each
    /// channel; nothing is guaranteed about cross-channel interleaving.
    /// After the last chunk every filter is flushed, so no samples stay
    /// buffered in the pipeline.
    pub fn run<S, F>(&mut self, source: &mut S, mut consume: F) -> Result<(), RepairError>
    where
        S: SampleSource,
        F: FnMut(usize, &[f64]) -> Result<(), RepairError>,
    {
        loop {
            let chunk = source
                .read_chunk(READ_CHUNK)
                .map_err(RepairError::SourceRead)?;
            if chunk.iter().all(|ch| ch.is_empty()) {
                break;
            }
            for (ch, (samples, filter)) in chunk.iter().zip(&mut self.filters).enumerate() {
                for &s in samples {
                    let burst = filter.push(s);
                    consume(ch, &burst)?;
                }
            }
        }
        for (ch, filter) in self.filters.iter_mut().enumerate() {
            let burst = filter.flush();
            consume(ch, &burst)?;
        }
        Ok(())
    }
}
