//! Rules workbook (`Regelsæt.xlsx`)
//!
//! Each sheet is read as columns: the first row holds the column headers and
//! every non-empty cell below a header becomes one value of that column.
//! Columns with the same header on several sheets are concatenated.

use calamine::{open_workbook_auto, Data, Reader};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Errors while loading the rules workbook
#[derive(Debug, Error)]
pub enum RulesError {
    #[error("Excel file not found: {0}")]
    NotFound(PathBuf),
    #[error("Failed to read Excel file {path}: {source}")]
    Workbook {
        path: PathBuf,
        #[source]
        source: calamine::Error,
    },
}

/// Column header to values, as read from the workbook
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleSet {
    columns: HashMap<String, Vec<String>>,
}

impl RuleSet {
    /// Load every sheet of the workbook at `path`
    pub fn load(path: &Path) -> Result<Self, RulesError> {
        if !path.is_file() {
            return Err(RulesError::NotFound(path.to_path_buf()));
        }

        let mut workbook = open_workbook_auto(path).map_err(|source| RulesError::Workbook {
            path: path.to_path_buf(),
            source,
        })?;

        let mut rules = RuleSet::default();
        for (sheet, range) in workbook.worksheets() {
            let rows: Vec<&[Data]> = range.rows().collect();
            rules.merge(Self::from_rows(&rows));
            info!(sheet = %sheet, rows = rows.len(), "Read rules sheet");
        }

        info!(
            path = %path.display(),
            columns = rules.columns.len(),
            "Loaded rules workbook"
        );
        Ok(rules)
    }

    /// Build a rule set from sheet rows, header row first
    pub fn from_rows(rows: &[&[Data]]) -> Self {
        let Some((header, body)) = rows.split_first() else {
            return Self::default();
        };

        let headers: Vec<Option<String>> = header.iter().map(cell_text).collect();
        let mut columns: HashMap<String, Vec<String>> = HashMap::new();

        for (index, name) in headers.iter().enumerate() {
            let Some(name) = name else { continue };
            let values = body
                .iter()
                .filter_map(|row| row.get(index).and_then(cell_text));
            columns.entry(name.clone()).or_default().extend(values);
        }

        Self { columns }
    }

    /// Build a rule set directly from columns
    pub fn from_columns<I, K, V>(columns: I) -> Self
    where
        I: IntoIterator<Item = (K, Vec<V>)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            columns: columns
                .into_iter()
                .map(|(k, v)| (k.into(), v.into_iter().map(Into::into).collect()))
                .collect(),
        }
    }

    fn merge(&mut self, other: RuleSet) {
        for (name, values) in other.columns {
            self.columns.entry(name).or_default().extend(values);
        }
    }

    /// Values of a column, empty when the column does not exist
    pub fn get(&self, column: &str) -> &[String] {
        self.columns.get(column).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Supplier names listed in the exclusion column
    pub fn exclusion_list(&self, column: &str) -> ExclusionList {
        ExclusionList::new(self.get(column).iter().cloned())
    }
}

/// Supplier names that population skips entirely
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExclusionList {
    names: HashSet<String>,
}

impl ExclusionList {
    pub fn new(names: impl IntoIterator<Item = String>) -> Self {
        Self {
            names: names.into_iter().collect(),
        }
    }

    /// Exact name match, as names are copied verbatim into the workbook
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

fn cell_text(cell: &Data) -> Option<String> {
    let text = match cell {
        Data::Empty => return None,
        Data::String(s) => s.trim().to_string(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) if f.fract() == 0.0 => format!("{f:.0}"),
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => b.to_string(),
        other => other.to_string(),
    };
    (!text.is_empty()).then_some(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(value: &str) -> Data {
        Data::String(value.to_string())
    }

    #[test]
    fn test_columns_from_rows() {
        let header = vec![s("Irrelevante leverandører"), s("Andet")];
        let row1 = vec![s("Leverandør A"), s("x")];
        let row2 = vec![s("Leverandør B"), Data::Empty];
        let row3 = vec![Data::Empty, s("y")];
        let rows: Vec<&[Data]> = vec![
            header.as_slice(),
            row1.as_slice(),
            row2.as_slice(),
            row3.as_slice(),
        ];

        let rules = RuleSet::from_rows(&rows);

        assert_eq!(
            rules.get("Irrelevante leverandører"),
            &["Leverandør A".to_string(), "Leverandør B".to_string()]
        );
        assert_eq!(rules.get("Andet"), &["x".to_string(), "y".to_string()]);
        assert!(rules.get("Mangler").is_empty());
    }

    #[test]
    fn test_short_rows_and_numeric_cells() {
        let header = vec![s("Koder"), s("Navne")];
        let row1 = vec![Data::Float(461.0)];
        let row2 = vec![Data::Int(751), s(" Navn ")];
        let rows: Vec<&[Data]> = vec![header.as_slice(), row1.as_slice(), row2.as_slice()];

        let rules = RuleSet::from_rows(&rows);

        assert_eq!(rules.get("Koder"), &["461".to_string(), "751".to_string()]);
        assert_eq!(rules.get("Navne"), &["Navn".to_string()]);
    }

    #[test]
    fn test_empty_sheet() {
        let rules = RuleSet::from_rows(&[]);
        assert_eq!(rules, RuleSet::default());
    }

    #[test]
    fn test_headerless_columns_ignored() {
        let header = vec![Data::Empty, s("Navne")];
        let row = vec![s("ignored"), s("kept")];
        let rows: Vec<&[Data]> = vec![header.as_slice(), row.as_slice()];

        let rules = RuleSet::from_rows(&rows);
        assert_eq!(rules.get("Navne"), &["kept".to_string()]);
        assert_eq!(rules.columns.len(), 1);
    }

    #[test]
    fn test_merge_concatenates_columns() {
        let mut rules = RuleSet::from_columns([("Navne", vec!["A"])]);
        rules.merge(RuleSet::from_columns([("Navne", vec!["B"])]));
        assert_eq!(rules.get("Navne"), &["A".to_string(), "B".to_string()]);
    }

    #[test]
    fn test_exclusion_list() {
        let rules = RuleSet::from_columns([(
            "Irrelevante leverandører",
            vec!["Hjemmeplejen Syd", "Test Leverandør"],
        )]);
        let exclusions = rules.exclusion_list("Irrelevante leverandører");

        assert_eq!(exclusions.len(), 2);
        assert!(exclusions.contains("Hjemmeplejen Syd"));
        assert!(!exclusions.contains("hjemmeplejen syd"));
        assert!(rules.exclusion_list("Mangler").is_empty());
    }

    #[test]
    fn test_load_missing_file() {
        let err = RuleSet::load(Path::new("/nonexistent/Regelsæt.xlsx")).unwrap_err();
        assert!(matches!(err, RulesError::NotFound(_)));
        assert!(err.to_string().contains("Excel file not found"));
    }
}
