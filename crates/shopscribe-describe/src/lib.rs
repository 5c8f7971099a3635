//! Description pipeline: reads a catalogue CSV, asks the model for one
//! description per row, and appends augmented rows to an output CSV with
//! periodic checkpoints and resume support.

mod error;
pub mod output;
pub mod pipeline;
pub mod prompt;
pub mod throttle;

pub use error::DescribeError;
pub use output::{CheckpointWriter, InputTable, load_completed, load_input, prepare_output};
pub use pipeline::{DescribeJob, JobOptions, RunStats};
pub use prompt::{SYSTEM_PROMPT, build_prompt, build_user_prompt};
pub use throttle::{FixedDelay, Throttle, TokenBucket};
