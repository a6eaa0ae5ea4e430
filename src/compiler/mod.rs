//! # Config Compiler
//!
//! Turns the validated config tables into one [`AdGroupConfig`] per ad group
//! and sorts every ad group into one of three buckets: failed, changed since
//! the checksum in the ledger, or unchanged.
//!
//! Offers are paired with the timing slots of the template video by position:
//! the n-th Offers to AdGroups row of an ad group fills its n-th Timing row.
mod checksum;
mod placement;

pub use crate::compiler::checksum::checksum;
pub use crate::compiler::placement::AdGroupConfig;
pub use crate::compiler::placement::Element;
pub use crate::compiler::placement::Placement;
pub use crate::compiler::placement::Timing;

use crate::compiler::placement::build_placement;
use crate::compiler::placement::parse_number;
use crate::error::PvaError;
use crate::ledger::ExistingAdGroups;
use crate::schema::ColumnName;
use crate::schema::SheetName;
use crate::store::Record;
use crate::validator::ConfigTables;
use std::collections::BTreeMap;
use std::collections::BTreeSet;
use thiserror::Error;
use tracing::debug;
use tracing::info;

/// Reasons an ad group is left out of a batch. They are recorded in the ledger, never raised.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AdGroupError {
    #[error("Not configured")]
    NotConfigured,

    #[error("Offer mismatch: has {offers}, needs {slots}")]
    OfferMismatch { offers: usize, slots: usize },

    #[error("Redundant offers referenced")]
    RedundantOffers,

    #[error("Offer referenced but absent: \"{0}\"")]
    OfferAbsent(String),

    #[error("Referenced field absent: \"{0}\"")]
    FieldAbsent(String),

    #[error("Unknown element type: \"{0}\"")]
    UnknownElementType(String),

    #[error("Invalid number \"{value}\" as {column}")]
    InvalidNumber { value: String, column: ColumnName },
}

/// Outcome of compiling every ad group.
#[derive(Debug, Default)]
pub struct Compilation {
    /// Configs that are new or changed, in AdGroups order.
    pub batch: Vec<AdGroupConfig>,
    pub errors: BTreeMap<String, AdGroupError>,
    /// New checksum of every ad group in `batch`.
    pub changed: BTreeMap<String, String>,
    pub unchanged: BTreeSet<String>,
}

fn records(tables: &ConfigTables, sheet: SheetName) -> &[Record] {
    tables.get(&sheet).map(Vec::as_slice).unwrap_or(&[])
}

fn has_duplicates(values: &[&str]) -> bool {
    let mut seen = BTreeSet::new();
    !values.iter().all(|value| seen.insert(*value))
}

fn compile_ad_group(
    tables: &ConfigTables,
    offers: &BTreeMap<&str, &Record>,
    ad_group: &Record,
) -> Result<AdGroupConfig, AdGroupError> {
    let name = ad_group.value(ColumnName::AdGroup);
    let template_video = ad_group.value(ColumnName::TemplateVideo);

    let offer_ids: Vec<&str> = records(tables, SheetName::OffersToAdGroups)
        .iter()
        .filter(|record| record.value(ColumnName::AdGroup) == name)
        .map(|record| record.value(ColumnName::OfferId))
        .collect();
    let slots: Vec<&Record> = records(tables, SheetName::Timing)
        .iter()
        .filter(|record| record.value(ColumnName::TemplateVideo) == template_video)
        .collect();
    if offer_ids.len() != slots.len() {
        return Err(AdGroupError::OfferMismatch {
            offers: offer_ids.len(),
            slots: slots.len(),
        });
    }
    if has_duplicates(&offer_ids) {
        return Err(AdGroupError::RedundantOffers);
    }

    let mut content = Vec::with_capacity(slots.len());
    for (slot, offer_id) in slots.iter().zip(&offer_ids) {
        let offer = offers
            .get(offer_id)
            .ok_or_else(|| AdGroupError::OfferAbsent(offer_id.to_string()))?;
        let placement_id = slot.value(ColumnName::PlacementId);
        let placements = records(tables, SheetName::Placement)
            .iter()
            .filter(|record| record.value(ColumnName::PlacementId) == placement_id)
            .map(|record| build_placement(record, offer))
            .collect::<Result<Vec<_>, _>>()?;
        content.push(Timing {
            offset_s: parse_number(slot, ColumnName::OffsetS)?,
            duration_s: parse_number(slot, ColumnName::DurationS)?,
            placements,
        });
    }

    Ok(AdGroupConfig {
        ad_group: name.to_owned(),
        template_video: template_video.to_owned(),
        content,
    })
}

/// Compiles every configured ad group against the ledger.
///
/// Ad groups known to the ledger but missing from AdGroups are reported as
/// [`AdGroupError::NotConfigured`]. A failing ad group never stops the others.
pub fn compile(tables: &ConfigTables, existing: &ExistingAdGroups) -> Result<Compilation, PvaError> {
    let mut compilation = Compilation::default();
    let ad_groups = records(tables, SheetName::AdGroups);

    let configured: BTreeSet<&str> = ad_groups
        .iter()
        .map(|record| record.value(ColumnName::AdGroup))
        .collect();
    for name in existing.keys() {
        if !configured.contains(name.as_str()) {
            compilation.errors.insert(name.clone(), AdGroupError::NotConfigured);
        }
    }

    let offers: BTreeMap<&str, &Record> = records(tables, SheetName::Offers)
        .iter()
        .map(|record| (record.value(ColumnName::OfferId), record))
        .collect();

    for ad_group in ad_groups {
        let name = ad_group.value(ColumnName::AdGroup).to_owned();
        let config = match compile_ad_group(tables, &offers, ad_group) {
            Ok(config) => config,
            Err(error) => {
                debug!(ad_group = %name, %error, "ad group skipped");
                compilation.errors.insert(name, error);
                continue;
            }
        };
        let checksum = checksum(&config)?;
        let known = existing
            .get(&name)
            .map(|record| record.content_checksum == checksum)
            .unwrap_or(false);
        if known {
            compilation.unchanged.insert(name);
        } else {
            compilation.changed.insert(name, checksum);
            compilation.batch.push(config);
        }
    }

    info!(
        changed = compilation.changed.len(),
        unchanged = compilation.unchanged.len(),
        errors = compilation.errors.len(),
        "compiled ad groups"
    );
    Ok(compilation)
}
