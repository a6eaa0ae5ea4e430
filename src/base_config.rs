//! # Base Config
//!
//! Operator settings on the Base Config sheet. Every value sits in column C
//! next to its label and is addressed by a named range `<group>_<field>`,
//! e.g. `googleCloud_storageBucket`.
use crate::error::PvaError;
use crate::schema::SheetName;
use crate::spreadsheet::CellRef;
use crate::store::TableStore;
use std::fmt::Display;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum SettingError {
    #[error("Setting {0} is not defined; initialise the sheets first")]
    MissingSetting(String),

    #[error("Unknown setting {0}")]
    UnknownSetting(String),
}

/// Feed Filtering value restricting imports to offers mapped to ad groups.
pub const ONLY_MAPPED: &str = "only mapped";

/// Column holding the setting values.
const VALUE_COLUMN: usize = 3;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ConfigGroup {
    GoogleCloud,
    MerchantCenter,
    YouTube,
    GoogleAds,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ConfigField {
    AccountId,
    CampaignName,
    ChannelId,
    FilterFeed,
    StorageBucket,
}

impl ConfigGroup {
    pub const ALL: [ConfigGroup; 4] = [
        ConfigGroup::GoogleCloud,
        ConfigGroup::MerchantCenter,
        ConfigGroup::YouTube,
        ConfigGroup::GoogleAds,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ConfigGroup::GoogleCloud => "Google Cloud",
            ConfigGroup::MerchantCenter => "Google Merchant Center",
            ConfigGroup::YouTube => "YouTube",
            ConfigGroup::GoogleAds => "Google Ads",
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            ConfigGroup::GoogleCloud => "googleCloud",
            ConfigGroup::MerchantCenter => "merchantCenter",
            ConfigGroup::YouTube => "youtube",
            ConfigGroup::GoogleAds => "googleAds",
        }
    }

    /// Fields of the group in sheet order.
    pub fn fields(self) -> &'static [ConfigField] {
        match self {
            ConfigGroup::GoogleCloud => &[ConfigField::StorageBucket],
            ConfigGroup::MerchantCenter => &[ConfigField::AccountId, ConfigField::FilterFeed],
            ConfigGroup::YouTube => &[ConfigField::ChannelId],
            ConfigGroup::GoogleAds => &[ConfigField::AccountId, ConfigField::CampaignName],
        }
    }
}

impl ConfigField {
    pub const ALL: [ConfigField; 5] = [
        ConfigField::AccountId,
        ConfigField::CampaignName,
        ConfigField::ChannelId,
        ConfigField::FilterFeed,
        ConfigField::StorageBucket,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ConfigField::AccountId => "Account ID",
            ConfigField::CampaignName => "Campaign Name",
            ConfigField::ChannelId => "Channel ID",
            ConfigField::FilterFeed => "Feed Filtering",
            ConfigField::StorageBucket => "Storage Bucket",
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            ConfigField::AccountId => "accountId",
            ConfigField::CampaignName => "campaignName",
            ConfigField::ChannelId => "channelId",
            ConfigField::FilterFeed => "filterFeed",
            ConfigField::StorageBucket => "storageBucket",
        }
    }
}

impl Display for ConfigGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl Display for ConfigField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Accepts the key (`googleCloud`) or the label (`Google Cloud`), ignoring case.
impl FromStr for ConfigGroup {
    type Err = SettingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ConfigGroup::ALL
            .into_iter()
            .find(|group| group.key().eq_ignore_ascii_case(s) || group.label().eq_ignore_ascii_case(s))
            .ok_or_else(|| SettingError::UnknownSetting(s.to_owned()))
    }
}

impl FromStr for ConfigField {
    type Err = SettingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ConfigField::ALL
            .into_iter()
            .find(|field| field.key().eq_ignore_ascii_case(s) || field.label().eq_ignore_ascii_case(s))
            .ok_or_else(|| SettingError::UnknownSetting(s.to_owned()))
    }
}

pub fn range_name(group: ConfigGroup, field: ConfigField) -> String {
    format!("{}_{}", group.key(), field.key())
}

fn setting_cell(store: &dyn TableStore, group: ConfigGroup, field: ConfigField) -> Result<CellRef, PvaError> {
    let name = range_name(group, field);
    match store.named_range(&name)? {
        Some(cell) => Ok(cell),
        None => Err(SettingError::MissingSetting(name).into()),
    }
}

pub fn config_value(store: &dyn TableStore, group: ConfigGroup, field: ConfigField) -> Result<String, PvaError> {
    let cell = setting_cell(store, group, field)?;
    let value = store.cell(&cell.sheet, cell.row, cell.col)?;
    Ok(value.trim().to_owned())
}

pub fn set_config_value(
    store: &mut dyn TableStore,
    group: ConfigGroup,
    field: ConfigField,
    value: &str,
) -> Result<(), PvaError> {
    let cell = setting_cell(store, group, field)?;
    store.set_cell(&cell.sheet, cell.row, cell.col, value)?;
    debug!(setting = %range_name(group, field), value, "updated setting");
    Ok(())
}

/// Labels of the Base Config sheet as `(row, col, text)` and the named range of each value cell.
pub(crate) fn layout() -> (Vec<(usize, usize, &'static str)>, Vec<(String, usize)>) {
    let mut labels = vec![(1, 1, "Configuration")];
    let mut ranges = Vec::new();
    let mut row = 1;
    for group in ConfigGroup::ALL {
        row += 2;
        labels.push((row, 1, group.label()));
        for field in group.fields() {
            row += 1;
            labels.push((row, 2, field.label()));
            ranges.push((range_name(group, *field), row));
        }
    }
    (labels, ranges)
}

/// Writes the labels and named ranges of the Base Config sheet, keeping values already entered.
pub fn initialise(store: &mut dyn TableStore) -> Result<(), PvaError> {
    let sheet = SheetName::BaseConfig.label();
    store.ensure(sheet, &[])?;
    let (labels, ranges) = layout();
    for (row, col, text) in labels {
        store.set_cell(sheet, row, col, text)?;
    }
    for (name, row) in ranges {
        store.set_named_range(&name, &CellRef::new(sheet, row, VALUE_COLUMN))?;
    }
    Ok(())
}
