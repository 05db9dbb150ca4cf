//! Column → field mapping
//!
//! Every CSV column gets a proposed target field computed by a translator:
//! either the record type's declared allow-list or the configured default
//! transform. The user may then override individual columns, but only with
//! one of the choices offered for that column.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::error::ValidationError;
use super::normalize::CsvRow;
use super::RowData;
use crate::schema::RecordSchema;

/// Literal used for the "leave this column out" choice
pub const UNMAPPED: &str = "none";

/// Default column name → field name transform
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ColumnTransform {
    /// Lowercase and replace spaces with underscores ("First Name" → "first_name")
    #[default]
    LowerSnake,
    /// Lowercase only
    Lowercase,
    /// Use the column name as is
    Identity,
}

impl ColumnTransform {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnTransform::LowerSnake => "lower-snake",
            ColumnTransform::Lowercase => "lowercase",
            ColumnTransform::Identity => "identity",
        }
    }

    pub fn apply(&self, column: &str) -> String {
        match self {
            ColumnTransform::LowerSnake => column.to_lowercase().replace(' ', "_"),
            ColumnTransform::Lowercase => column.to_lowercase(),
            ColumnTransform::Identity => column.to_string(),
        }
    }
}

impl FromStr for ColumnTransform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lower-snake" | "lower_snake" => Ok(ColumnTransform::LowerSnake),
            "lowercase" => Ok(ColumnTransform::Lowercase),
            "identity" => Ok(ColumnTransform::Identity),
            _ => Err(format!(
                "Invalid column transform: '{}'. Use lower-snake, lowercase or identity",
                s
            )),
        }
    }
}

/// Translates a column name into a proposed field name
#[derive(Debug, Clone, Copy)]
pub enum ColumnTranslator<'a> {
    Transform(ColumnTransform),
    /// Type-declared table; columns missing from it are not accepted
    AllowList(&'a BTreeMap<String, String>),
}

impl ColumnTranslator<'_> {
    /// Proposed field for a column; `None` when an allow-list rejects it
    pub fn translate(&self, column: &str) -> Option<String> {
        match self {
            ColumnTranslator::Transform(t) => Some(t.apply(column)),
            ColumnTranslator::AllowList(columns) => columns.get(column).cloned(),
        }
    }

    /// Reject the first column the translator does not accept
    pub fn check_columns(&self, columns: &[String]) -> Result<(), ValidationError> {
        for column in columns {
            if self.translate(column).is_none() {
                return Err(ValidationError::UnknownColumn(column.clone()));
            }
        }
        Ok(())
    }
}

/// Target chosen for one column
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldChoice {
    Unmapped,
    Field(String),
}

impl FieldChoice {
    pub fn field(&self) -> Option<&str> {
        match self {
            FieldChoice::Unmapped => None,
            FieldChoice::Field(name) => Some(name),
        }
    }
}

impl fmt::Display for FieldChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldChoice::Unmapped => write!(f, "{}", UNMAPPED),
            FieldChoice::Field(name) => write!(f, "{}", name),
        }
    }
}

impl From<&str> for FieldChoice {
    /// Empty or "none" means unmapped
    fn from(s: &str) -> Self {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case(UNMAPPED) {
            FieldChoice::Unmapped
        } else {
            FieldChoice::Field(s.to_string())
        }
    }
}

/// Proposed mapping for one column plus the choices offered for it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnProposal {
    pub column: String,
    pub proposed: Option<String>,
    /// Whether the proposed name is a field of the record type
    pub known: bool,
    pub choices: Vec<FieldChoice>,
}

impl ColumnProposal {
    /// Pre-selected choice
    pub fn initial(&self) -> FieldChoice {
        match &self.proposed {
            Some(name) => FieldChoice::Field(name.clone()),
            None => FieldChoice::Unmapped,
        }
    }

    pub fn allows(&self, choice: &FieldChoice) -> bool {
        self.choices.contains(choice)
    }
}

/// Propose a target for every column
///
/// Choices are "none" followed by the schema fields in declaration order. A
/// proposal that is not a schema field is appended as an extra choice so it
/// can still be kept.
pub fn propose(
    schema: &RecordSchema,
    translator: &ColumnTranslator<'_>,
    columns: &[String],
) -> Vec<ColumnProposal> {
    let base: Vec<FieldChoice> = std::iter::once(FieldChoice::Unmapped)
        .chain(schema.field_names().map(|f| FieldChoice::Field(f.to_string())))
        .collect();

    columns
        .iter()
        .map(|column| {
            let proposed = translator.translate(column);
            let known = proposed.as_deref().is_some_and(|p| schema.has_field(p));
            let mut choices = base.clone();
            if let (Some(p), false) = (&proposed, known) {
                choices.push(FieldChoice::Field(p.clone()));
            }
            ColumnProposal {
                column: column.clone(),
                proposed,
                known,
                choices,
            }
        })
        .collect()
}

/// Parse a `COLUMN=FIELD` override
pub fn parse_override(s: &str) -> Result<(String, String), String> {
    match s.rsplit_once('=') {
        Some((column, field)) if !column.is_empty() => {
            Ok((column.to_string(), field.trim().to_string()))
        }
        _ => Err(format!("Invalid mapping '{}'. Expected COLUMN=FIELD", s)),
    }
}

/// Confirmed column → field mapping for one import
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMapping {
    entries: Vec<(String, FieldChoice)>,
}

impl ColumnMapping {
    /// Accept every proposal as is
    pub fn from_proposals(proposals: &[ColumnProposal]) -> Self {
        Self {
            entries: proposals
                .iter()
                .map(|p| (p.column.clone(), p.initial()))
                .collect(),
        }
    }

    /// Apply user overrides on top of the proposals
    pub fn resolve(
        proposals: &[ColumnProposal],
        overrides: &[(String, String)],
    ) -> Result<Self, ValidationError> {
        let mut mapping = Self::from_proposals(proposals);

        for (column, raw_choice) in overrides {
            let idx = proposals
                .iter()
                .position(|p| &p.column == column)
                .ok_or_else(|| ValidationError::UnknownOverride(column.clone()))?;
            let choice = FieldChoice::from(raw_choice.as_str());

            let proposal = &proposals[idx];
            if !proposal.allows(&choice) {
                return Err(ValidationError::InvalidChoice {
                    column: column.clone(),
                    choice: raw_choice.clone(),
                    available: proposal
                        .choices
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join(", "),
                });
            }
            mapping.entries[idx].1 = choice;
        }

        Ok(mapping)
    }

    pub fn get(&self, column: &str) -> Option<&FieldChoice> {
        self.entries
            .iter()
            .find(|(c, _)| c == column)
            .map(|(_, choice)| choice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldChoice)> {
        self.entries.iter().map(|(c, choice)| (c.as_str(), choice))
    }

    /// Build the `field → raw value` data for a row, in column order
    ///
    /// Unmapped columns are skipped; when two columns target the same field
    /// the later column wins.
    pub fn assemble(&self, row: &CsvRow) -> RowData {
        let mut data = RowData::new();
        for (column, choice) in &self.entries {
            if let (Some(field), Some(value)) = (choice.field(), row.get(column)) {
                data.insert(field, Value::String(value.to_string()));
            }
        }
        data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldSpec;
    use serde_json::json;

    fn schema() -> RecordSchema {
        RecordSchema::new("person")
            .with_field(FieldSpec::text("first_name"))
            .with_field(FieldSpec::integer("age"))
    }

    fn columns(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_default_transform() {
        assert_eq!(ColumnTransform::LowerSnake.apply("First Name"), "first_name");
        assert_eq!(ColumnTransform::Lowercase.apply("First Name"), "first name");
        assert_eq!(ColumnTransform::Identity.apply("First Name"), "First Name");
    }

    #[test]
    fn test_known_field_is_preselected() {
        let translator = ColumnTranslator::Transform(ColumnTransform::LowerSnake);
        let proposals = propose(&schema(), &translator, &columns(&["First Name", "Age"]));

        assert_eq!(proposals[0].initial(), FieldChoice::Field("first_name".into()));
        assert!(proposals[0].known);
        assert_eq!(
            proposals[0].choices,
            vec![
                FieldChoice::Unmapped,
                FieldChoice::Field("first_name".into()),
                FieldChoice::Field("age".into()),
            ]
        );
    }

    #[test]
    fn test_unknown_proposal_offered_as_extra_choice() {
        let translator = ColumnTranslator::Transform(ColumnTransform::LowerSnake);
        let proposals = propose(&schema(), &translator, &columns(&["Shoe Size"]));

        let p = &proposals[0];
        assert!(!p.known);
        assert_eq!(p.initial(), FieldChoice::Field("shoe_size".into()));
        assert_eq!(p.choices.last(), Some(&FieldChoice::Field("shoe_size".into())));
        assert_eq!(p.choices.len(), 4);
    }

    #[test]
    fn test_allow_list_rejects_unknown_column_by_name() {
        let mut allowed = BTreeMap::new();
        allowed.insert("First Name".to_string(), "first_name".to_string());
        let translator = ColumnTranslator::AllowList(&allowed);

        let err = translator
            .check_columns(&columns(&["First Name", "Favourite Colour"]))
            .unwrap_err();
        assert!(matches!(err, ValidationError::UnknownColumn(c) if c == "Favourite Colour"));
        assert!(translator.check_columns(&columns(&["First Name"])).is_ok());
    }

    #[test]
    fn test_resolve_applies_overrides() {
        let translator = ColumnTranslator::Transform(ColumnTransform::LowerSnake);
        let proposals = propose(&schema(), &translator, &columns(&["First Name", "Years"]));

        let mapping = ColumnMapping::resolve(
            &proposals,
            &[
                ("Years".to_string(), "age".to_string()),
                ("First Name".to_string(), "none".to_string()),
            ],
        )
        .unwrap();

        assert_eq!(mapping.get("Years"), Some(&FieldChoice::Field("age".into())));
        assert_eq!(mapping.get("First Name"), Some(&FieldChoice::Unmapped));
    }

    #[test]
    fn test_resolve_rejects_invalid_choice() {
        let translator = ColumnTranslator::Transform(ColumnTransform::LowerSnake);
        let proposals = propose(&schema(), &translator, &columns(&["Age"]));

        let err = ColumnMapping::resolve(&proposals, &[("Age".into(), "height".into())])
            .unwrap_err();
        assert!(matches!(err, ValidationError::InvalidChoice { .. }));

        let err = ColumnMapping::resolve(&proposals, &[("Height".into(), "age".into())])
            .unwrap_err();
        assert!(matches!(err, ValidationError::UnknownOverride(c) if c == "Height"));
    }

    #[test]
    fn test_assemble_skips_unmapped_and_last_wins() {
        let translator = ColumnTranslator::Transform(ColumnTransform::LowerSnake);
        let proposals = propose(&schema(), &translator, &columns(&["Age", "Years", "Note"]));
        let mapping = ColumnMapping::resolve(
            &proposals,
            &[
                ("Years".into(), "age".into()),
                ("Note".into(), "none".into()),
            ],
        )
        .unwrap();

        let row = CsvRow {
            line: 1,
            fields: vec![
                ("Age".into(), "30".into()),
                ("Years".into(), "31".into()),
                ("Note".into(), "hello".into()),
            ],
        };
        let data = mapping.assemble(&row);
        assert_eq!(data.len(), 1);
        assert_eq!(data.get("age"), Some(&json!("31")));
    }

    #[test]
    fn test_parse_override() {
        assert_eq!(
            parse_override("First Name=first_name").unwrap(),
            ("First Name".to_string(), "first_name".to_string())
        );
        assert_eq!(
            parse_override("a=b=c").unwrap(),
            ("a=b".to_string(), "c".to_string())
        );
        assert!(parse_override("no_equals").is_err());
        assert!(parse_override("=field").is_err());
    }
}
