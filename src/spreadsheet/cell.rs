use crate::error::PvaError;
use crate::spreadsheet::reference::index_to_reference;
use crate::spreadsheet::SpreadsheetError;
use chrono::Duration;
use chrono::NaiveDate;
use iso8601_duration::Duration as IsoDuration;

/// How the raw value of a cell is to be rendered.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub(crate) enum CellType {
    #[default]
    Empty,
    Boolean,
    Number,
    /// Number shown as a percentage with the given number of decimals
    NumberPercent(usize),
    /// Serial date/time counted from the 1900 epoch
    NumberDateTime1900,
    NumberDate1900,
    NumberTime1900,
    /// Serial date/time counted from the 1904 epoch
    NumberDateTime1904,
    NumberDate1904,
    NumberTime1904,
    /// ISO 8601 date/time strings as written by ODS
    IsoDateTime,
    /// ISO 8601 durations as written by ODS time cells
    IsoDuration,
    Text,
    Error,
}

impl CellType {
    /// Maps a built-in Excel number format ID to its date/time kind.
    pub(crate) fn parse_builtin_number_format_id(id: &str, is_1904: bool) -> Option<Self> {
        match id {
            "22" => Some(if is_1904 { Self::NumberDateTime1904 } else { Self::NumberDateTime1900 }),
            "14" | "15" | "16" | "17" => Some(if is_1904 { Self::NumberDate1904 } else { Self::NumberDate1900 }),
            "18" | "19" | "20" | "21" | "45" | "46" | "47" => Some(if is_1904 { Self::NumberTime1904 } else { Self::NumberTime1900 }),
            "9" => Some(Self::NumberPercent(0)),
            "10" => Some(Self::NumberPercent(2)),
            _ => None,
        }
    }

    /// Scans a custom format code for date and time tokens outside literals and colour blocks.
    pub(crate) fn parse_custom_number_format(format: &str, is_1904: bool) -> Self {
        let mut is_escaped = false;
        let mut is_literal = false;
        let mut is_bracket = false;
        let mut is_date = false;
        let mut is_time = false;
        let mut is_percent = false;
        let mut is_fraction = false;
        let mut decimals = 0usize;
        // only the first section (positive numbers) decides the kind
        for character in format.chars() {
            match character {
                _ if is_escaped => is_escaped = false,
                '_' | '\\' => is_escaped = true,

                '"' if is_literal => is_literal = false,
                '"' if !is_bracket => is_literal = true,

                ']' if is_bracket => is_bracket = false,
                '[' if !is_literal => is_bracket = true,
                _ if is_literal || is_bracket => (),

                'Y' | 'y' | 'D' | 'd' => is_date = true,
                'H' | 'h' | 'S' | 's' => is_time = true,
                ';' => break,
                '%' => is_percent = true,
                '.' if !is_percent => is_fraction = true,
                '0' | '#' if is_fraction && !is_percent => decimals += 1,
                _ => (),
            }
        }

        match (is_date, is_time, is_1904) {
            (true, true, false) => Self::NumberDateTime1900,
            (true, true, true) => Self::NumberDateTime1904,
            (true, false, false) => Self::NumberDate1900,
            (true, false, true) => Self::NumberDate1904,
            (false, true, false) => Self::NumberTime1900,
            (false, true, true) => Self::NumberTime1904,
            _ if is_percent => Self::NumberPercent(decimals),
            _ => Self::Number,
        }
    }
}

/// A single non-empty cell: 0-based position, kind and raw value.
#[derive(Clone, Debug)]
pub(crate) struct Cell {
    pub(crate) row: usize,
    pub(crate) col: usize,
    pub(crate) kind: CellType,
    pub(crate) value: String,
}

impl Cell {
    pub(crate) fn reference(&self) -> String {
        index_to_reference(self.row, self.col)
    }

    /// Renders the cell as the string a spreadsheet user sees.
    ///
    /// Error cells become empty strings when `error_as_empty` is set.
    pub(crate) fn display_value(&self, sheet: &str, error_as_empty: bool) -> Result<String, PvaError> {
        let rendered = match self.kind {
            CellType::Empty => Ok(String::new()),
            CellType::Boolean => Ok(if self.value == "1" || self.value == "true" { "TRUE" } else { "FALSE" }.to_owned()),
            CellType::Number => to_number_string(&self.value),
            CellType::NumberPercent(decimals) => to_percent_string(&self.value, decimals),
            CellType::Text => Ok(self.value.clone()),
            CellType::NumberDateTime1900 => to_datetime_string(&self.value, false),
            CellType::NumberDate1900 => to_date_string(&self.value, false),
            CellType::NumberDateTime1904 => to_datetime_string(&self.value, true),
            CellType::NumberDate1904 => to_date_string(&self.value, true),
            CellType::NumberTime1900 | CellType::NumberTime1904 => to_time_string(&self.value),
            CellType::IsoDateTime => Ok(self.value.replace('T', " ")),
            CellType::IsoDuration => to_duration_string(&self.value),
            CellType::Error if error_as_empty => Ok(String::new()),
            CellType::Error => Err(PvaError::WithContextError(self.value.clone())),
        };
        rendered.map_err(|_| {
            SpreadsheetError::CellValueError {
                sheet: sheet.to_owned(),
                reference: self.reference(),
                value: self.value.clone(),
            }
            .into()
        })
    }
}

/// Stored numbers carry up to 17 significant digits; render the shortest text that round-trips.
fn to_number_string(value: &str) -> Result<String, PvaError> {
    Ok(value.trim().parse::<f64>()?.to_string())
}

fn to_percent_string(value: &str, decimals: usize) -> Result<String, PvaError> {
    let percent = value.trim().parse::<f64>()? * 100f64;
    Ok(format!("{percent:.decimals$}%"))
}

/// Converts a serial day number to an ISO date, honouring the Lotus 1-2-3 leap year bug.
fn to_date_string(value: &str, is_1904: bool) -> Result<String, PvaError> {
    let days = value.parse::<f64>()?.trunc() as i64;
    let offset = if is_1904 {
        1462
    } else if days < 60 {
        1
    } else {
        0
    };
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)
        .ok_or_else(|| PvaError::WithContextError("invalid spreadsheet epoch".to_owned()))?;
    Ok((epoch + Duration::days(days + offset)).format("%Y-%m-%d").to_string())
}

/// Converts the fractional part of a serial value to `HH:MM:SS`.
fn to_time_string(value: &str) -> Result<String, PvaError> {
    let factor = value.parse::<f64>()?.fract();
    let mut rest = (factor * 86_400_000f64).round() as i64;
    let milliseconds = rest % 1_000; rest /= 1_000;
    let seconds = rest % 60; rest /= 60;
    let minutes = rest % 60; rest /= 60;
    Ok(if milliseconds > 0 {
        format!("{rest:02}:{minutes:02}:{seconds:02}.{milliseconds:03}")
    } else {
        format!("{rest:02}:{minutes:02}:{seconds:02}")
    })
}

fn to_datetime_string(value: &str, is_1904: bool) -> Result<String, PvaError> {
    let date = to_date_string(value, is_1904)?;
    let time = to_time_string(value)?;
    Ok(format!("{date} {time}"))
}

fn to_duration_string(value: &str) -> Result<String, PvaError> {
    let duration = value
        .parse::<IsoDuration>()
        .map_err(|_| PvaError::WithContextError(format!("invalid duration '{value}'")))?;
    Ok(format!(
        "{:02}:{:02}:{:02}",
        duration.hour as u64,
        duration.minute as u64,
        duration.second as u64
    ))
}
