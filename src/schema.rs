//! Sheet names, column labels and the fixed column layout of every table.
//!
//! Labels are what the sheets show in their header row; keys are the
//! snake_case names used in compiled job documents. Both come from static
//! tables so no label is ever converted at runtime.
use std::fmt::Display;

/// Tabs of a campaign workbook.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SheetName {
    AdGroups,
    BaseConfig,
    Offers,
    OffersFeed,
    OffersToAdGroups,
    Placement,
    Status,
    Timing,
}

impl SheetName {
    pub const ALL: [SheetName; 8] = [
        SheetName::AdGroups,
        SheetName::BaseConfig,
        SheetName::Offers,
        SheetName::OffersFeed,
        SheetName::OffersToAdGroups,
        SheetName::Placement,
        SheetName::Status,
        SheetName::Timing,
    ];

    /// Sheets with a fixed column layout, in the order they are loaded.
    pub const TABULAR: [SheetName; 6] = [
        SheetName::Timing,
        SheetName::Placement,
        SheetName::Offers,
        SheetName::OffersToAdGroups,
        SheetName::AdGroups,
        SheetName::Status,
    ];

    pub fn label(self) -> &'static str {
        match self {
            SheetName::AdGroups => "AdGroups",
            SheetName::BaseConfig => "Base Config",
            SheetName::Offers => "Offers",
            SheetName::OffersFeed => "Offers Feed",
            SheetName::OffersToAdGroups => "Offers to AdGroups",
            SheetName::Placement => "Placement",
            SheetName::Status => "Status",
            SheetName::Timing => "Timing",
        }
    }

    pub fn from_label(label: &str) -> Option<SheetName> {
        SheetName::ALL.into_iter().find(|sheet| sheet.label() == label)
    }

    /// Fixed columns of the sheet; empty for sheets without a tabular layout.
    pub fn columns(self) -> &'static [ColumnName] {
        use ColumnName::*;
        match self {
            SheetName::Timing => &[TemplateVideo, OffsetS, DurationS, PlacementId],
            SheetName::Placement => &[
                PlacementId,
                ElementId,
                ElementType,
                DataField,
                RelativeTo,
                ElementHorizontalAnchor,
                ElementVerticalAnchor,
                RelativeHorizontalAnchor,
                RelativeVerticalAnchor,
                OffsetX,
                OffsetY,
                RotationAngle,
                ImageWidth,
                ImageHeight,
                KeepRatio,
                TextFont,
                TextSize,
                TextWidth,
                TextAlignment,
                TextColor,
                RemoveBackground,
            ],
            SheetName::Offers => &[OfferId],
            SheetName::OffersToAdGroups => &[OfferId, AdGroup],
            SheetName::AdGroups => &[
                AdGroup,
                TemplateVideo,
                AdGroupType,
                TargetLocation,
                AudienceName,
                Url,
                CallToAction,
                Headline,
                LongHeadline,
                Description1,
                Description2,
            ],
            SheetName::Status => &[
                AdGroup,
                OutputVideoId,
                VideoCreation,
                AdsCreation,
                ExpectedStatus,
                Errors,
                ContentChecksum,
                ChecksumCreation,
                GcsFolder,
            ],
            SheetName::BaseConfig | SheetName::OffersFeed => &[],
        }
    }

    /// Whether the sheet may carry columns beyond its fixed layout.
    pub fn has_bespoke_headers(self) -> bool {
        self == SheetName::Offers
    }

    /// Header row written when the sheet is created.
    pub fn header(self) -> Vec<String> {
        self.columns().iter().map(|column| column.label().to_owned()).collect()
    }

    /// 1-based column number of `column` within the fixed layout.
    pub fn column_number(self, column: ColumnName) -> Option<usize> {
        self.columns().iter().position(|it| *it == column).map(|index| index + 1)
    }
}

impl Display for SheetName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

macro_rules! column_names {
    ($($variant:ident => $label:literal;)*) => {
        /// Column headers used across the config tables.
        #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum ColumnName {
            $($variant,)*
        }

        impl ColumnName {
            pub const ALL: &'static [ColumnName] = &[$(ColumnName::$variant,)*];

            /// Header text as shown in the sheet.
            pub fn label(self) -> &'static str {
                match self {
                    $(ColumnName::$variant => $label,)*
                }
            }

            pub fn from_label(label: &str) -> Option<ColumnName> {
                match label {
                    $($label => Some(ColumnName::$variant),)*
                    _ => None,
                }
            }
        }
    };
}

column_names! {
    AdGroup => "Output AdGroup";
    AdGroupType => "AdGroup Type";
    AdsCreation => "Ad Creation";
    AudienceName => "Audience Name";
    CallToAction => "Call to Action";
    ContentChecksum => "Content Checksum";
    ChecksumCreation => "Checksum Creation";
    DataField => "Data Field";
    Description1 => "Description 1";
    Description2 => "Description 2";
    DurationS => "Duration [s]";
    ElementType => "Element Type";
    ElementId => "Element ID";
    Errors => "Error(s)";
    ExpectedStatus => "Expected Status";
    GcsFolder => "Folder Name";
    Headline => "Headline";
    LongHeadline => "Long Headline";
    ImageWidth => "Image Width";
    ImageHeight => "Image Height";
    KeepRatio => "Keep Image Ratio";
    RemoveBackground => "Remove Background";
    OfferId => "Offer ID";
    OffsetS => "Offset [s]";
    OutputVideoId => "Output Video ID";
    PlacementId => "Placement ID";
    OffsetX => "Offset X";
    OffsetY => "Offset Y";
    RelativeTo => "Relative To";
    ElementHorizontalAnchor => "Element Horizontal Anchor";
    ElementVerticalAnchor => "Element Vertical Anchor";
    RelativeHorizontalAnchor => "Relative Horizontal Anchor";
    RelativeVerticalAnchor => "Relative Vertical Anchor";
    TargetLocation => "Target Location";
    TemplateVideo => "Template Video";
    TextAlignment => "Text Alignment";
    RotationAngle => "Rotation Angle";
    TextColor => "Text Color";
    TextFont => "Text Font";
    TextSize => "Text Size";
    TextWidth => "Text Width";
    Url => "URL";
    VideoCreation => "Video Creation";
}

impl Display for ColumnName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Kinds of elements positioned in a video.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ElementType {
    Text,
    Image,
}

impl ElementType {
    pub const ALL: [ElementType; 2] = [ElementType::Text, ElementType::Image];

    pub fn label(self) -> &'static str {
        match self {
            ElementType::Text => "Text",
            ElementType::Image => "Image",
        }
    }

    pub fn from_label(label: &str) -> Option<ElementType> {
        ElementType::ALL.into_iter().find(|kind| kind.label() == label)
    }

    /// Placement columns that may stay empty for this kind of element.
    pub fn omittable_columns(self) -> &'static [ColumnName] {
        match self {
            ElementType::Text => &[ColumnName::ImageWidth, ColumnName::ImageHeight],
            ElementType::Image => &[
                ColumnName::TextFont,
                ColumnName::TextSize,
                ColumnName::TextWidth,
                ColumnName::TextAlignment,
                ColumnName::TextColor,
            ],
        }
    }
}

/// Values of the Expected Status column.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StatusOption {
    Enabled,
    Disabled,
}

impl StatusOption {
    pub fn as_str(self) -> &'static str {
        match self {
            StatusOption::Enabled => "ENABLED",
            StatusOption::Disabled => "DISABLED",
        }
    }
}

/// Columns of `sheet` that the value of another column in `record` makes optional.
///
/// Only Placement has such columns, keyed on its Element Type.
pub fn omittable_columns<'a, F>(sheet: SheetName, value_of: F) -> &'static [ColumnName]
where
    F: Fn(ColumnName) -> Option<&'a str>,
{
    if sheet != SheetName::Placement {
        return &[];
    }
    value_of(ColumnName::ElementType)
        .and_then(ElementType::from_label)
        .map(ElementType::omittable_columns)
        .unwrap_or(&[])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_round_trip() {
        for sheet in SheetName::ALL {
            assert_eq!(SheetName::from_label(sheet.label()), Some(sheet));
        }
        for column in ColumnName::ALL {
            assert_eq!(ColumnName::from_label(column.label()), Some(*column));
        }
        assert_eq!(ColumnName::from_label("Title"), None);
    }

    #[test]
    fn layouts_match_persisted_headers() {
        assert_eq!(SheetName::Timing.header(), vec!["Template Video", "Offset [s]", "Duration [s]", "Placement ID"]);
        assert_eq!(SheetName::Placement.columns().len(), 21);
        assert_eq!(SheetName::Status.column_number(ColumnName::GcsFolder), Some(9));
        assert_eq!(SheetName::Status.column_number(ColumnName::Url), None);
        assert!(SheetName::BaseConfig.columns().is_empty());
        assert!(SheetName::Offers.has_bespoke_headers());
        assert!(!SheetName::Timing.has_bespoke_headers());
    }

    #[test]
    fn element_type_selects_omittable_columns() {
        let text = omittable_columns(SheetName::Placement, |_| Some("Text"));
        assert_eq!(text, &[ColumnName::ImageWidth, ColumnName::ImageHeight]);
        let image = omittable_columns(SheetName::Placement, |_| Some("Image"));
        assert!(image.contains(&ColumnName::TextColor));
        assert!(omittable_columns(SheetName::Placement, |_| Some("Video")).is_empty());
        assert!(omittable_columns(SheetName::Timing, |_| Some("Text")).is_empty());
    }
}
