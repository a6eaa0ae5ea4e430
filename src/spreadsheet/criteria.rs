use glob::Pattern;

/// Selects which sheets of a workbook are read and how broken cells are treated.
#[derive(Clone, Debug, Default)]
pub struct Criteria {
    /// Sheet name patterns; `None` accepts every sheet.
    pub sheet_name_patterns: Option<Vec<Pattern>>,

    /// Render error cells (`#DIV/0!`, `#N/A`, ...) as empty strings instead of failing.
    pub error_as_empty: bool,
}

impl Criteria {
    pub fn new(patterns: &[&str], error_as_empty: bool) -> Result<Self, glob::PatternError> {
        let sheet_name_patterns = if patterns.is_empty() {
            None
        } else {
            Some(patterns.iter().map(|pattern| Pattern::new(pattern)).collect::<Result<_, _>>()?)
        };
        Ok(Self {
            sheet_name_patterns,
            error_as_empty,
        })
    }

    /// True when no patterns are configured or the name matches any of them.
    pub(crate) fn accept(&self, sheet_name: &str) -> bool {
        self.sheet_name_patterns
            .as_ref()
            .map(|patterns| patterns.iter().any(|pattern| pattern.matches(sheet_name)))
            .unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_criteria_accepts_everything() {
        let criteria = Criteria::default();
        assert!(criteria.accept("Base Config"));
    }

    #[test]
    fn patterns_filter_sheet_names() {
        let criteria = Criteria::new(&["Offers*", "Timing"], false).unwrap();
        assert!(criteria.accept("Offers"));
        assert!(criteria.accept("Offers to AdGroups"));
        assert!(criteria.accept("Timing"));
        assert!(!criteria.accept("Status"));
    }

    #[test]
    fn invalid_pattern_is_rejected() {
        assert!(Criteria::new(&["[Offers"], false).is_err());
    }
}
