//! Handle service: turns product names into URL handles with one batched
//! model call, and moves names and handles in and out of spreadsheets.

mod error;
pub mod parse;
pub mod prompt;
pub mod server;
pub mod service;
pub mod spreadsheet;

pub use error::HandleError;
pub use server::{DEFAULT_MAX_BODY_BYTES, router};
pub use service::HandleService;
pub use spreadsheet::{ImportedNames, SpreadsheetError, read_product_names, write_handles};
