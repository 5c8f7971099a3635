pub mod handle;
pub mod record;
pub mod result;

pub use handle::{
    DisambiguateDuplicates, HandleBatchRequest, HandleBatchResponse, HandleEntry, HandleValidator,
    TrustGenerator,
};
pub use record::{ProductRecord, fields};
pub use result::{GenerationResult, GenerationStatus};
