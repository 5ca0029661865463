/// Error taxonomy for the repair passes.

use thiserror::Error;

/// Errors produced by external Source/Sink collaborators cross the trait
/// boundary in this boxed form and get wrapped into [`RepairError`].
pub type BoxedError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum RepairError {
    /// The discovery pass saw no nonzero samples, so the normalization
    /// gain `1 / peak` is undefined.
    #[error("input contains no nonzero samples; cannot derive a normalization gain")]
    SilentInput,

    /// The source failed mid-read. The current pass is aborted; there is
    /// no retry.
    #[error("source read failed: {0}")]
    SourceRead(BoxedError),

    /// The sink rejected a block write. The current pass is aborted.
    #[error("sink write failed: {0}")]
    SinkWrite(BoxedError),
}
