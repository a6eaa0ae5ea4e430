//! Per-column value rules of the config tables.
use crate::schema::ColumnName;
use crate::schema::SheetName;
use regex::Regex;
use std::collections::BTreeMap;
use std::collections::HashMap;

/// Accepts `#rgb`, `#rrggbb`, `rgb(r, g, b)`, `hsl(h, s%, l%)` or nothing.
const COLOR_PATTERN: &str =
    r"^(#([A-Fa-f0-9]{6}|[A-Fa-f0-9]{3})|rgb\(\d{1,3},\s*\d{1,3},\s*\d{1,3}\)|hsl\(\d{1,3},\s*\d{1,3}%,\s*\d{1,3}%\))?$";

const HORIZONTAL: &[&str] = &["left", "center", "right", ""];
const VERTICAL: &[&str] = &["top", "center", "bottom", ""];
const YES_NO: &[&str] = &["Yes", "No", ""];

/// Numeric columns with their inclusive bounds.
const RANGES: &[(ColumnName, f64, f64)] = &[
    (ColumnName::OffsetS, 0.0, 3600.0),
    (ColumnName::DurationS, 0.0, 3600.0),
    (ColumnName::PlacementId, 0.0, 1e6),
    (ColumnName::OffsetX, -1e5, 1e5),
    (ColumnName::OffsetY, -1e5, 1e5),
    (ColumnName::ImageWidth, 0.0, 1e5),
    (ColumnName::ImageHeight, 0.0, 1e5),
    (ColumnName::TextSize, 1.0, 1000.0),
    (ColumnName::TextWidth, 1.0, 1e5),
    (ColumnName::RotationAngle, 0.0, 360.0),
];

#[derive(Clone, Debug)]
pub enum ValueRestriction {
    Enum(&'static [&'static str]),
    NumRange { min: f64, max: f64 },
    Regex(Regex),
    /// The value must be a header of the named sheet.
    ColumnNames(SheetName),
}

impl ValueRestriction {
    /// Checks `value` against the rule; `headers` supplies the header rows of referenced sheets.
    ///
    /// Numbers must parse completely; anything unparsable is invalid.
    pub fn is_valid(&self, value: &str, headers: &BTreeMap<SheetName, Vec<String>>) -> bool {
        match self {
            ValueRestriction::Enum(allowed) => allowed.contains(&value),
            ValueRestriction::NumRange { min, max } => value
                .trim()
                .parse::<f64>()
                .map(|number| *min <= number && number <= *max)
                .unwrap_or(false),
            ValueRestriction::Regex(pattern) => pattern.is_match(value),
            ValueRestriction::ColumnNames(sheet) => headers
                .get(sheet)
                .map(|names| names.iter().any(|name| name == value))
                .unwrap_or(false),
        }
    }
}

/// Static rule table, with the numeric ranges expanded at construction.
#[derive(Clone, Debug)]
pub struct ValueRestrictions {
    restrictions: HashMap<ColumnName, ValueRestriction>,
}

impl ValueRestrictions {
    pub fn new() -> Result<Self, regex::Error> {
        let mut restrictions = HashMap::from([
            (ColumnName::ElementType, ValueRestriction::Enum(&["Text", "Image"])),
            (ColumnName::TextAlignment, ValueRestriction::Enum(HORIZONTAL)),
            (ColumnName::ElementHorizontalAnchor, ValueRestriction::Enum(HORIZONTAL)),
            (ColumnName::RelativeHorizontalAnchor, ValueRestriction::Enum(HORIZONTAL)),
            (ColumnName::ElementVerticalAnchor, ValueRestriction::Enum(VERTICAL)),
            (ColumnName::RelativeVerticalAnchor, ValueRestriction::Enum(VERTICAL)),
            (ColumnName::KeepRatio, ValueRestriction::Enum(YES_NO)),
            (ColumnName::RemoveBackground, ValueRestriction::Enum(YES_NO)),
            (ColumnName::DataField, ValueRestriction::ColumnNames(SheetName::Offers)),
            (ColumnName::TextColor, ValueRestriction::Regex(Regex::new(COLOR_PATTERN)?)),
        ]);
        for (column, min, max) in RANGES {
            restrictions.insert(*column, ValueRestriction::NumRange { min: *min, max: *max });
        }
        Ok(ValueRestrictions { restrictions })
    }

    pub fn get(&self, column: ColumnName) -> Option<&ValueRestriction> {
        self.restrictions.get(&column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_headers() -> BTreeMap<SheetName, Vec<String>> {
        BTreeMap::new()
    }

    fn check(column: ColumnName, value: &str) -> bool {
        let restrictions = ValueRestrictions::new().unwrap();
        let headers = BTreeMap::from([(SheetName::Offers, vec!["Offer ID".to_owned(), "Price".to_owned()])]);
        restrictions.get(column).map(|rule| rule.is_valid(value, &headers)).unwrap_or(true)
    }

    #[test]
    fn enums_match_exactly() {
        assert!(check(ColumnName::ElementType, "Text"));
        assert!(check(ColumnName::ElementType, "Image"));
        assert!(!check(ColumnName::ElementType, "text"));
        assert!(!check(ColumnName::ElementType, ""));
        assert!(check(ColumnName::TextAlignment, ""));
        assert!(check(ColumnName::ElementVerticalAnchor, "bottom"));
        assert!(!check(ColumnName::ElementHorizontalAnchor, "bottom"));
        assert!(check(ColumnName::KeepRatio, "Yes"));
        assert!(!check(ColumnName::RemoveBackground, "yes"));
    }

    #[test]
    fn ranges_are_inclusive_and_reject_garbage() {
        assert!(check(ColumnName::OffsetS, "0"));
        assert!(check(ColumnName::OffsetS, "3600"));
        assert!(!check(ColumnName::OffsetS, "3600.5"));
        assert!(check(ColumnName::OffsetX, "-100000"));
        assert!(!check(ColumnName::TextSize, "0"));
        assert!(check(ColumnName::RotationAngle, "12.5"));
        assert!(!check(ColumnName::DurationS, ""));
        assert!(!check(ColumnName::DurationS, "abc"));
        assert!(!check(ColumnName::DurationS, "4s"));
    }

    #[test]
    fn colors_are_css_like_or_empty() {
        assert!(check(ColumnName::TextColor, ""));
        assert!(check(ColumnName::TextColor, "#fff"));
        assert!(check(ColumnName::TextColor, "#A0B1C2"));
        assert!(check(ColumnName::TextColor, "rgb(10, 20,30)"));
        assert!(check(ColumnName::TextColor, "hsl(120, 50%, 25%)"));
        assert!(!check(ColumnName::TextColor, "red"));
        assert!(!check(ColumnName::TextColor, "#ffff"));
    }

    #[test]
    fn data_field_must_name_an_offer_column() {
        assert!(check(ColumnName::DataField, "Price"));
        assert!(!check(ColumnName::DataField, "Colour"));
        let rule = ValueRestriction::ColumnNames(SheetName::Offers);
        assert!(!rule.is_valid("Price", &no_headers()));
    }

    #[test]
    fn unrestricted_columns_have_no_rule() {
        let restrictions = ValueRestrictions::new().unwrap();
        assert!(restrictions.get(ColumnName::Headline).is_none());
        assert!(restrictions.get(ColumnName::OfferId).is_none());
        assert!(restrictions.get(ColumnName::TextColor).is_some());
    }
}
