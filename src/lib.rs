//! # Product Video Ads
//!
//! Validates video ad campaigns configured in spreadsheet tables and exports
//! one render job per ad group to object storage.
//!
//! ## Features
//!
//! - **Workbook import**: load `.xlsx` and `.ods` exports, named ranges included,
//!   into a DuckDB-backed sheet store
//! - **Validation**: every cell is checked against its column's rule and all
//!   violations are reported at once
//! - **Change detection**: a checksum per compiled ad group keeps unchanged
//!   ad groups out of the next batch
//! - **Status ledger**: the Status sheet tracks checksums, folders, videos and
//!   the expected state of every ad group
//! - **Surrounding workflows**: sheet setup, Merchant Center feed import and
//!   YouTube publishing of rendered videos
//!
//! ## Workflow
//!
//! 1. [`setup::initialise_sheets`] creates the sheets
//! 2. Operators fill them, or [`store::import_workbook`] loads a workbook
//! 3. [`pipeline::export_config`] validates, compiles and uploads
//! 4. [`videos::register_videos`] publishes what the renderer produced
pub mod base_config;
pub mod compiler;
pub mod error;
pub mod feed;
mod helpers;
pub mod ledger;
pub mod pipeline;
pub mod restriction;
pub mod schema;
pub mod setup;
pub mod spreadsheet;
pub mod storage;
pub mod store;
pub mod validator;
pub mod videos;

pub use crate::error::PvaError;
