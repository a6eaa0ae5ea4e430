//! # Ad-Group Status Ledger
//!
//! The Status sheet keeps one row per ad group. It is the only state carried
//! from one run to the next: the last checksum, the folder the config went to,
//! the rendered video and the status the ad group is expected to have.
use crate::error::PvaError;
use crate::schema::ColumnName;
use crate::schema::SheetName;
use crate::schema::StatusOption;
use crate::store::Record;
use crate::store::TableStore;
use chrono::DateTime;
use chrono::SecondsFormat;
use chrono::Utc;
use std::collections::BTreeMap;
use std::collections::BTreeSet;
use thiserror::Error;
use tracing::debug;
use tracing::info;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Ad group \"{0}\" is listed more than once in the Status sheet.")]
    DuplicateAdGroup(String),

    #[error("Ad group \"{ad_group}\" not found in alleged row {row}.")]
    AdGroupRowMismatch { ad_group: String, row: usize },
}

/// One row of the Status sheet.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AdGroupRecord {
    pub ad_group: String,
    pub output_video_id: String,
    pub video_creation: String,
    pub ads_creation: String,
    pub expected_status: String,
    pub errors: String,
    pub content_checksum: String,
    pub checksum_creation: String,
    pub gcs_folder: String,
    /// 1-based row of the Status sheet holding this record.
    pub row_number: usize,
}

impl AdGroupRecord {
    fn from_record(record: &Record) -> Self {
        AdGroupRecord {
            ad_group: record.value(ColumnName::AdGroup).to_owned(),
            output_video_id: record.value(ColumnName::OutputVideoId).to_owned(),
            video_creation: record.value(ColumnName::VideoCreation).to_owned(),
            ads_creation: record.value(ColumnName::AdsCreation).to_owned(),
            expected_status: record.value(ColumnName::ExpectedStatus).to_owned(),
            errors: record.value(ColumnName::Errors).to_owned(),
            content_checksum: record.value(ColumnName::ContentChecksum).to_owned(),
            checksum_creation: record.value(ColumnName::ChecksumCreation).to_owned(),
            gcs_folder: record.value(ColumnName::GcsFolder).to_owned(),
            row_number: record.row_number(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.expected_status == StatusOption::Enabled.as_str()
    }
}

/// Ledger rows keyed by ad-group name.
pub type ExistingAdGroups = BTreeMap<String, AdGroupRecord>;

/// Columns to overwrite for one ad group; columns not listed stay untouched.
pub type StatusUpdate = Vec<(ColumnName, String)>;

/// Indexes Status records by ad-group name, refusing duplicate names.
pub fn get_existing(status: &[Record]) -> Result<ExistingAdGroups, PvaError> {
    let mut existing = ExistingAdGroups::new();
    for record in status {
        let ad_group = AdGroupRecord::from_record(record);
        if existing.contains_key(&ad_group.ad_group) {
            return Err(LedgerError::DuplicateAdGroup(ad_group.ad_group).into());
        }
        existing.insert(ad_group.ad_group.clone(), ad_group);
    }
    Ok(existing)
}

/// Reads the Status sheet straight from the store.
pub fn load_existing(store: &dyn TableStore) -> Result<ExistingAdGroups, PvaError> {
    let table = store.read(SheetName::Status.label())?;
    get_existing(&table.records(&SheetName::Status.header()))
}

fn column_number(column: ColumnName) -> usize {
    // Status columns are all part of the fixed layout; anything else lands past it.
    SheetName::Status
        .column_number(column)
        .unwrap_or(SheetName::Status.columns().len() + 1)
}

/// Writes `updates` into the Status sheet.
///
/// Unknown ad groups get a new row holding their name and the given columns,
/// appended atomically. Known ad groups have their row re-checked by name
/// before only the given columns are overwritten.
pub fn update(
    store: &mut dyn TableStore,
    existing: &ExistingAdGroups,
    updates: &BTreeMap<String, StatusUpdate>,
) -> Result<(), PvaError> {
    let sheet = SheetName::Status.label();
    let name_col = column_number(ColumnName::AdGroup);

    for (ad_group, update) in updates {
        match existing.get(ad_group) {
            None => {
                let mut row = vec![String::new(); SheetName::Status.columns().len()];
                row[name_col - 1] = ad_group.clone();
                for (column, value) in update {
                    let col = column_number(*column);
                    if row.len() < col {
                        row.resize(col, String::new());
                    }
                    row[col - 1] = value.clone();
                }
                let row_number = store
                    .insert_unique(sheet, name_col, &row)?
                    .ok_or_else(|| LedgerError::DuplicateAdGroup(ad_group.clone()))?;
                debug!(ad_group = %ad_group, row = row_number, "appended status row");
            }
            Some(record) => {
                let row = record.row_number;
                if store.cell(sheet, row, name_col)? != *ad_group {
                    return Err(LedgerError::AdGroupRowMismatch {
                        ad_group: ad_group.clone(),
                        row,
                    }
                    .into());
                }
                for (column, value) in update {
                    store.set_cell(sheet, row, column_number(*column), value)?;
                }
                debug!(ad_group = %ad_group, row, "updated status row");
            }
        }
    }
    Ok(())
}

fn timestamp(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Records the outcome of a compile run.
///
/// Failed ad groups are disabled with their error, changed ones are enabled
/// with their new checksum and folder, unchanged ones are enabled with the
/// error cleared.
pub fn log_ad_groups(
    store: &mut dyn TableStore,
    existing: &ExistingAdGroups,
    errors: &BTreeMap<String, String>,
    changed: &BTreeMap<String, String>,
    unchanged: &BTreeSet<String>,
    folder: &str,
    now: DateTime<Utc>,
) -> Result<(), PvaError> {
    let mut statuses = BTreeMap::<String, StatusUpdate>::new();
    for (ad_group, error) in errors {
        statuses.insert(
            ad_group.clone(),
            vec![
                (ColumnName::Errors, error.clone()),
                (ColumnName::ExpectedStatus, StatusOption::Disabled.as_str().to_owned()),
            ],
        );
    }
    for (ad_group, checksum) in changed {
        statuses.insert(
            ad_group.clone(),
            vec![
                (ColumnName::Errors, String::new()),
                (ColumnName::ExpectedStatus, StatusOption::Enabled.as_str().to_owned()),
                (ColumnName::ContentChecksum, checksum.clone()),
                (ColumnName::ChecksumCreation, timestamp(now)),
                (ColumnName::GcsFolder, folder.to_owned()),
            ],
        );
    }
    for ad_group in unchanged {
        statuses.insert(
            ad_group.clone(),
            vec![
                (ColumnName::Errors, String::new()),
                (ColumnName::ExpectedStatus, StatusOption::Enabled.as_str().to_owned()),
            ],
        );
    }
    info!(
        errors = errors.len(),
        changed = changed.len(),
        unchanged = unchanged.len(),
        "logging ad groups"
    );
    update(store, existing, &statuses)
}

/// Records the ids of freshly published videos; ads have to be created anew for them.
pub fn log_videos(
    store: &mut dyn TableStore,
    existing: &ExistingAdGroups,
    video_ids: &BTreeMap<String, String>,
    now: DateTime<Utc>,
) -> Result<(), PvaError> {
    let statuses: BTreeMap<String, StatusUpdate> = video_ids
        .iter()
        .map(|(ad_group, video_id)| {
            (
                ad_group.clone(),
                vec![
                    (ColumnName::OutputVideoId, video_id.clone()),
                    (ColumnName::VideoCreation, timestamp(now)),
                    (ColumnName::AdsCreation, String::new()),
                ],
            )
        })
        .collect();
    update(store, existing, &statuses)
}
