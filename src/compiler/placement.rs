use crate::compiler::AdGroupError;
use crate::schema::ColumnName;
use crate::schema::ElementType;
use crate::store::Record;
use serde::Serialize;
use serde::Serializer;

/// Render job for one ad group.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct AdGroupConfig {
    pub ad_group: String,
    pub template_video: String,
    pub content: Vec<Timing>,
}

/// One slot of the template video, filled from a single offer.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct Timing {
    #[serde(serialize_with = "number")]
    pub offset_s: f64,
    #[serde(serialize_with = "number")]
    pub duration_s: f64,
    pub placements: Vec<Placement>,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct Placement {
    pub element_id: String,
    pub relative_to: String,
    pub element_horizontal_anchor: String,
    pub element_vertical_anchor: String,
    pub relative_horizontal_anchor: String,
    pub relative_vertical_anchor: String,
    #[serde(serialize_with = "number")]
    pub offset_x: f64,
    #[serde(serialize_with = "number")]
    pub offset_y: f64,
    #[serde(serialize_with = "number")]
    pub rotation_angle: f64,
    #[serde(flatten)]
    pub element: Element,
}

/// Kind-specific part of a placement, tagged as `element_type`.
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(tag = "element_type", rename_all = "lowercase")]
pub enum Element {
    Text {
        text_value: String,
        text_font: String,
        #[serde(serialize_with = "number")]
        text_size: f64,
        #[serde(serialize_with = "number")]
        text_width: f64,
        text_alignment: String,
        text_color: String,
    },
    Image {
        image_url: String,
        #[serde(serialize_with = "number")]
        image_width: f64,
        #[serde(serialize_with = "number")]
        image_height: f64,
        keep_ratio: String,
        remove_background: String,
    },
}

/// Whole numbers are written without a fraction, `11` rather than `11.0`.
fn number<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    const MAX_EXACT: f64 = 9_007_199_254_740_992.0;
    if value.fract() == 0.0 && value.abs() < MAX_EXACT {
        serializer.serialize_i64(*value as i64)
    } else {
        serializer.serialize_f64(*value)
    }
}

pub(crate) fn parse_number(record: &Record, column: ColumnName) -> Result<f64, AdGroupError> {
    let value = record.value(column);
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|number| number.is_finite())
        .ok_or_else(|| AdGroupError::InvalidNumber {
            value: value.to_owned(),
            column,
        })
}

fn text(record: &Record, column: ColumnName) -> String {
    record.value(column).to_owned()
}

/// Builds the placement described by a Placement row, filled from `offer`.
pub(crate) fn build_placement(record: &Record, offer: &Record) -> Result<Placement, AdGroupError> {
    let data_field = record.value(ColumnName::DataField);
    let offer_value = match offer.get(data_field) {
        Some(value) if !value.is_empty() => value.to_owned(),
        _ => return Err(AdGroupError::FieldAbsent(data_field.to_owned())),
    };
    let element_type = record.value(ColumnName::ElementType);
    let element = match ElementType::from_label(element_type) {
        Some(ElementType::Text) => Element::Text {
            text_value: offer_value,
            text_font: text(record, ColumnName::TextFont),
            text_size: parse_number(record, ColumnName::TextSize)?,
            text_width: parse_number(record, ColumnName::TextWidth)?,
            text_alignment: text(record, ColumnName::TextAlignment),
            text_color: text(record, ColumnName::TextColor),
        },
        Some(ElementType::Image) => Element::Image {
            image_url: offer_value,
            image_width: parse_number(record, ColumnName::ImageWidth)?,
            image_height: parse_number(record, ColumnName::ImageHeight)?,
            keep_ratio: text(record, ColumnName::KeepRatio),
            remove_background: text(record, ColumnName::RemoveBackground),
        },
        None => return Err(AdGroupError::UnknownElementType(element_type.to_owned())),
    };

    Ok(Placement {
        element_id: text(record, ColumnName::ElementId),
        relative_to: text(record, ColumnName::RelativeTo),
        element_horizontal_anchor: text(record, ColumnName::ElementHorizontalAnchor),
        element_vertical_anchor: text(record, ColumnName::ElementVerticalAnchor),
        relative_horizontal_anchor: text(record, ColumnName::RelativeHorizontalAnchor),
        relative_vertical_anchor: text(record, ColumnName::RelativeVerticalAnchor),
        offset_x: parse_number(record, ColumnName::OffsetX)?,
        offset_y: parse_number(record, ColumnName::OffsetY)?,
        rotation_angle: parse_number(record, ColumnName::RotationAngle)?,
        element,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn placement_row(element_type: &str, data_field: &str) -> Record {
        Record::from_pairs(
            2,
            [
                ("Placement ID", "1"),
                ("Element ID", "price"),
                ("Element Type", element_type),
                ("Data Field", data_field),
                ("Relative To", ""),
                ("Element Horizontal Anchor", "center"),
                ("Element Vertical Anchor", "center"),
                ("Relative Horizontal Anchor", "left"),
                ("Relative Vertical Anchor", "top"),
                ("Offset X", "100"),
                ("Offset Y", "200.5"),
                ("Rotation Angle", "0"),
                ("Image Width", "300"),
                ("Image Height", "300"),
                ("Keep Image Ratio", "Yes"),
                ("Text Font", "Roboto"),
                ("Text Size", "40"),
                ("Text Width", "300"),
                ("Text Alignment", "center"),
                ("Text Color", "#ffffff"),
                ("Remove Background", "No"),
            ],
        )
    }

    fn offer() -> Record {
        Record::from_pairs(
            2,
            [
                ("Offer ID", "1001"),
                ("Title", "Apples"),
                ("Image", "https://example.com/apples.png"),
                ("Price", "€1.09"),
                ("Colour", ""),
            ],
        )
    }

    #[test]
    fn text_placement_takes_the_offer_value() {
        let placement = build_placement(&placement_row("Text", "Price"), &offer()).unwrap();
        assert_eq!(
            serde_json::to_value(&placement).unwrap(),
            json!({
                "element_id": "price",
                "relative_to": "",
                "element_horizontal_anchor": "center",
                "element_vertical_anchor": "center",
                "relative_horizontal_anchor": "left",
                "relative_vertical_anchor": "top",
                "offset_x": 100,
                "offset_y": 200.5,
                "rotation_angle": 0,
                "element_type": "text",
                "text_value": "€1.09",
                "text_font": "Roboto",
                "text_size": 40,
                "text_width": 300,
                "text_alignment": "center",
                "text_color": "#ffffff",
            })
        );
    }

    #[test]
    fn image_placement_carries_only_image_fields() {
        let placement = build_placement(&placement_row("Image", "Image"), &offer()).unwrap();
        let value = serde_json::to_value(&placement).unwrap();
        assert_eq!(value["element_type"], "image");
        assert_eq!(value["image_url"], "https://example.com/apples.png");
        assert_eq!(value["keep_ratio"], "Yes");
        assert!(value.get("text_font").is_none());
    }

    #[test]
    fn missing_or_empty_field_is_an_error() {
        let error = build_placement(&placement_row("Text", "Colour"), &offer()).unwrap_err();
        assert_eq!(error.to_string(), "Referenced field absent: \"Colour\"");
        let error = build_placement(&placement_row("Text", "Weight"), &offer()).unwrap_err();
        assert_eq!(error, AdGroupError::FieldAbsent("Weight".to_owned()));
    }

    #[test]
    fn unknown_element_type_is_an_error() {
        let error = build_placement(&placement_row("Video", "Price"), &offer()).unwrap_err();
        assert_eq!(error.to_string(), "Unknown element type: \"Video\"");
    }

    #[test]
    fn numbers_must_parse() {
        let mut pairs: Vec<(String, String)> = placement_row("Text", "Price")
            .iter()
            .map(|(key, value)| (key.to_owned(), value.to_owned()))
            .collect();
        pairs.iter_mut().find(|(key, _)| key == "Text Size").unwrap().1 = "big".to_owned();
        let error = build_placement(&Record::from_pairs(2, pairs), &offer()).unwrap_err();
        assert_eq!(error.to_string(), "Invalid number \"big\" as Text Size");
    }
}
