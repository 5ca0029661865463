//! Unfoldback DSP library — repair of integer-overflow wraparound in audio.
//!
//! Pure DSP logic with no container or I/O framework dependencies. The
//! container-facing side (WAV reading/writing, CLI) lives in the
//! `unfoldback` tool crate and talks to this one through the
//! [`pipeline::SampleSource`] and [`pipeline::SampleSink`] traits.

pub mod energy;
pub mod error;
pub mod inverter;
pub mod passes;
pub mod pipeline;
