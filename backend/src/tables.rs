use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;

use crate::config::ConfigError;

/// Name of one classifier output, e.g. `Tomato___Leaf_Mold`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(transparent)]
pub struct ClassLabel(String);

impl ClassLabel {
    /// Sentinel for rejected or out-of-distribution images. Matched case-sensitively.
    pub const UNKNOWN: &'static str = "Unknown";

    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn unknown() -> Self {
        Self(Self::UNKNOWN.to_string())
    }

    pub fn is_unknown(&self) -> bool {
        self.0 == Self::UNKNOWN
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for ClassLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Classifier output index -> label, as written by the training run
/// (`{"0": "Apple___Apple_scab", ...}`).
#[derive(Debug, Clone)]
pub struct LabelTable {
    labels: BTreeMap<usize, ClassLabel>,
}

impl LabelTable {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
        let table = Self::from_json_str(&raw)?;
        log::info!(
            "Loaded {} class labels from {}",
            table.labels.len(),
            path.display()
        );
        Ok(table)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let entries: HashMap<String, String> = serde_json::from_str(raw)?;
        let mut labels = BTreeMap::new();
        for (index, label) in entries {
            let index: usize = index
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidIndex(index.clone()))?;
            labels.insert(index, ClassLabel::new(label));
        }
        Self::from_map(labels)
    }

    pub fn from_map(labels: BTreeMap<usize, ClassLabel>) -> Result<Self, ConfigError> {
        if labels.is_empty() {
            return Err(ConfigError::EmptyLabelTable);
        }
        let table = Self { labels };
        if !table.is_contiguous() {
            log::warn!(
                "Label table has gaps: {} labels cover {} output slots",
                table.labels.len(),
                table.class_count()
            );
        }
        Ok(table)
    }

    /// Number of score slots the model must produce: highest index + 1.
    pub fn class_count(&self) -> usize {
        self.labels.keys().next_back().map_or(0, |max| max + 1)
    }

    pub fn is_contiguous(&self) -> bool {
        self.labels.len() == self.class_count()
    }

    pub fn get(&self, index: usize) -> Option<&ClassLabel> {
        self.labels.get(&index)
    }

    pub fn labels(&self) -> impl Iterator<Item = &ClassLabel> {
        self.labels.values()
    }
}

impl<S: Into<String>> FromIterator<S> for LabelTable {
    /// Builds a contiguous table; index = position. Empty input gives an
    /// empty table, which `class_count` reports as 0.
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            labels: iter
                .into_iter()
                .enumerate()
                .map(|(i, label)| (i, ClassLabel::new(label)))
                .collect(),
        }
    }
}

pub const NO_INFORMATION: &str = "No information available.";
pub const NO_SOLUTION: &str = "No solution available.";
pub const NO_CARE: &str = "No care information available.";
pub const NO_PREVENTION: &str = "No prevention information available.";

/// Persisted form of a record; every field may be absent.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DiseaseEntry {
    pub cause: Option<String>,
    pub problem: Option<String>,
    pub solution: Option<String>,
    pub care: Option<String>,
    pub prevention: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiseaseRecord {
    pub cause: String,
    pub problem: String,
    pub solution: String,
    pub care: String,
    pub prevention: String,
}

fn field_or(value: Option<String>, placeholder: &str) -> String {
    value
        .filter(|text| !text.trim().is_empty())
        .unwrap_or_else(|| placeholder.to_string())
}

impl From<DiseaseEntry> for DiseaseRecord {
    fn from(entry: DiseaseEntry) -> Self {
        Self {
            cause: field_or(entry.cause, NO_INFORMATION),
            problem: field_or(entry.problem, NO_INFORMATION),
            solution: field_or(entry.solution, NO_SOLUTION),
            care: field_or(entry.care, NO_CARE),
            prevention: field_or(entry.prevention, NO_PREVENTION),
        }
    }
}

/// Label -> diagnostic guidance. Read-only once built.
#[derive(Debug, Clone)]
pub struct DiseaseTable {
    records: HashMap<ClassLabel, DiseaseRecord>,
    fallback: DiseaseRecord,
}

impl DiseaseTable {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
        let table = Self::from_json_str(&raw)?;
        log::info!(
            "Loaded {} disease records from {}",
            table.records.len(),
            path.display()
        );
        Ok(table)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let entries: HashMap<ClassLabel, DiseaseEntry> = serde_json::from_str(raw)?;
        Ok(Self::from_entries(entries))
    }

    pub fn from_entries(entries: HashMap<ClassLabel, DiseaseEntry>) -> Self {
        let records: HashMap<ClassLabel, DiseaseRecord> = entries
            .into_iter()
            .map(|(label, entry)| (label, DiseaseRecord::from(entry)))
            .collect();

        let fallback = match records.get(&ClassLabel::unknown()) {
            Some(record) => record.clone(),
            None => {
                if records
                    .keys()
                    .any(|label| label.as_str().eq_ignore_ascii_case(ClassLabel::UNKNOWN))
                {
                    log::warn!(
                        "Disease table has a case variant of '{}' but no exact '{}' record; \
                         it is treated as an ordinary label",
                        ClassLabel::UNKNOWN,
                        ClassLabel::UNKNOWN
                    );
                } else {
                    log::warn!("Disease table has no '{}' record", ClassLabel::UNKNOWN);
                }
                DiseaseRecord::from(DiseaseEntry::default())
            }
        };

        Self { records, fallback }
    }

    pub fn get(&self, label: &ClassLabel) -> Option<&DiseaseRecord> {
        self.records.get(label)
    }

    /// Record for `label`, or the `Unknown` fallback when none is stored.
    pub fn record_for(&self, label: &ClassLabel) -> &DiseaseRecord {
        self.get(label).unwrap_or(self.fallback())
    }

    pub fn fallback(&self) -> &DiseaseRecord {
        &self.fallback
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Labels the classifier can emit that have no stored record.
    pub fn missing_labels<'a>(&self, labels: &'a LabelTable) -> Vec<&'a ClassLabel> {
        labels
            .labels()
            .filter(|label| !self.records.contains_key(*label))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RECORDS: &str = r#"{
        "Apple___healthy": {
            "cause": "No disease detected.",
            "problem": "The apple tree is thriving.",
            "solution": "Continue with regular maintenance.",
            "care": "Ensure adequate watering.",
            "prevention": "Practice good orchard hygiene."
        },
        "Grape___Black_rot": {
            "cause": "Caused by the fungus Guignardia bidwellii.",
            "solution": ""
        },
        "Unknown": {
            "cause": "Disease not recognized.",
            "problem": "The uploaded image does not match any known disease.",
            "solution": "Ensure clear image capture and try again.",
            "care": "Check plant health manually for any visible symptoms.",
            "prevention": "Use proper disease diagnosis tools for accurate identification."
        }
    }"#;

    #[test]
    fn label_table_parses_string_indices() {
        let table =
            LabelTable::from_json_str(r#"{"1": "Apple___Black_rot", "0": "Apple___healthy"}"#)
                .unwrap();
        assert_eq!(table.class_count(), 2);
        assert!(table.is_contiguous());
        assert_eq!(table.get(0).unwrap().as_str(), "Apple___healthy");
        assert_eq!(table.get(1).unwrap().as_str(), "Apple___Black_rot");
        assert!(table.get(2).is_none());
    }

    #[test]
    fn label_table_with_gap_covers_highest_index() {
        let table = LabelTable::from_json_str(r#"{"0": "a", "1": "b", "3": "d"}"#).unwrap();
        assert_eq!(table.class_count(), 4);
        assert!(!table.is_contiguous());
        assert!(table.get(2).is_none());
    }

    #[test]
    fn label_table_rejects_bad_input() {
        assert!(matches!(
            LabelTable::from_json_str(r#"{"zero": "a"}"#),
            Err(ConfigError::InvalidIndex(_))
        ));
        assert!(matches!(
            LabelTable::from_json_str("{}"),
            Err(ConfigError::EmptyLabelTable)
        ));
        assert!(matches!(
            LabelTable::from_json_str("[\"a\"]"),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn shipped_tables_agree() {
        let manifest = Path::new(env!("CARGO_MANIFEST_DIR"));
        let labels = LabelTable::load(&manifest.join("../config/class_indices.json")).unwrap();
        let records = DiseaseTable::load(&manifest.join("../config/disease_info.json")).unwrap();

        assert!(labels.is_contiguous());
        assert!(records.missing_labels(&labels).is_empty());
        assert!(labels.labels().any(ClassLabel::is_unknown));
        assert_eq!(records.fallback().cause, "Disease not recognized.");
    }

    #[test]
    fn missing_fields_get_placeholders() {
        let table = DiseaseTable::from_json_str(RECORDS).unwrap();
        let record = table.get(&ClassLabel::new("Grape___Black_rot")).unwrap();

        assert_eq!(record.cause, "Caused by the fungus Guignardia bidwellii.");
        assert_eq!(record.problem, NO_INFORMATION);
        assert_eq!(record.solution, NO_SOLUTION);
        assert_eq!(record.care, NO_CARE);
        assert_eq!(record.prevention, NO_PREVENTION);
    }

    #[test]
    fn unlisted_label_falls_back_to_unknown_record() {
        let table = DiseaseTable::from_json_str(RECORDS).unwrap();
        let record = table.record_for(&ClassLabel::new("Squash___Powdery_mildew"));
        assert_eq!(record, table.fallback());
        assert_eq!(record.cause, "Disease not recognized.");
    }

    #[test]
    fn lowercase_unknown_is_not_the_sentinel() {
        let table = DiseaseTable::from_json_str(
            r#"{"unknown": {"cause": "Disease not recognized."}}"#,
        )
        .unwrap();

        assert!(!ClassLabel::new("unknown").is_unknown());
        assert_eq!(table.fallback().cause, NO_INFORMATION);
        assert_eq!(table.fallback().prevention, NO_PREVENTION);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn missing_labels_lists_unrecorded_classes() {
        let table = DiseaseTable::from_json_str(RECORDS).unwrap();
        let labels: LabelTable = ["Apple___healthy", "Peach___healthy", "Unknown"]
            .into_iter()
            .collect();

        let missing = table.missing_labels(&labels);
        assert_eq!(missing, vec![&ClassLabel::new("Peach___healthy")]);
    }
}
