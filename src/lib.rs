pub mod catalog;
pub mod completion;
pub mod config;
pub mod date;
pub mod error;
pub mod ledger;
pub mod locator;
mod progress;
pub mod reconcile;
pub mod stamper;

pub use config::{Config, ExifToolCommand};
pub use date::{parse_catalog_date, BadDate};
pub use error::FinishError;
pub use reconcile::{Finisher, Outcome, Summary};
pub use stamper::{ExifTool, StampSession};
