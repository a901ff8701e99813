//! External tool integration for mediabeam.
//!
//! Everything that touches an OS process lives here: deadline-bounded
//! one-shot runs ([`command::run_tool`]), tool discovery
//! ([`tools::ToolRegistry`]), media probing behind the [`probe::Prober`]
//! trait, and streaming encoder sessions behind the
//! [`encode::EncoderLauncher`] trait.

pub mod command;
pub mod encode;
pub mod probe;
pub mod tools;

pub use command::run_tool;
pub use encode::{
    stream_command, EncodePlan, EncoderLauncher, EncoderStream, FfmpegLauncher, Pipeline,
    TranscodeRequest,
};
pub use probe::{is_copy_eligible, CodecProfile, FfprobeProber, Prober, StreamTrack};
pub use tools::{ToolInfo, ToolRegistry};
