//! Static table of importable record types
//!
//! Each registered type carries its schema, an optional column allow-list
//! (the type-declared column → field translation) and the import policy
//! providing its validate/transform hooks.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{FieldSpec, RecordSchema, SchemaError};
use crate::import::mapping::{ColumnTransform, ColumnTranslator};
use crate::import::policy::{DeclaredPolicy, NoopPolicy, RecordImportPolicy};

/// Record type declaration as written in `.csvimp/config.yaml`
///
/// ```yaml
/// record_types:
///   product:
///     table: products
///     fields:
///       - { name: name, kind: text, unique: true }
///       - { name: price, kind: float }
///     columns:
///       Name: name
///       Price: price
///     required: [name]
///     defaults:
///       created_by: $user
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordTypeConfig {
    /// Table name (defaults to the type identifier)
    pub table: Option<String>,

    /// Ordered field list
    pub fields: Vec<FieldSpec>,

    /// Allow-list of accepted CSV columns and the field each maps to
    pub columns: Option<BTreeMap<String, String>>,

    /// Fields that must be non-blank in every row
    pub required: Vec<String>,

    /// Values filled in when a row leaves the field missing or blank
    pub defaults: BTreeMap<String, String>,
}

impl RecordTypeConfig {
    /// Build the schema descriptor for this declaration
    pub fn schema(&self, type_id: &str) -> RecordSchema {
        let mut schema = RecordSchema::new(type_id).with_fields(self.fields.iter().cloned());
        if let Some(table) = &self.table {
            schema = schema.with_table(table.clone());
        }
        schema
    }
}

/// One importable record type
pub struct RegisteredType {
    schema: RecordSchema,
    columns: Option<BTreeMap<String, String>>,
    policy: Box<dyn RecordImportPolicy>,
}

impl RegisteredType {
    pub fn schema(&self) -> &RecordSchema {
        &self.schema
    }

    pub fn policy(&self) -> &dyn RecordImportPolicy {
        self.policy.as_ref()
    }

    pub fn allow_list(&self) -> Option<&BTreeMap<String, String>> {
        self.columns.as_ref()
    }

    /// Column translation: the declared allow-list if any, else `default`
    pub fn translator(&self, default: ColumnTransform) -> ColumnTranslator<'_> {
        match &self.columns {
            Some(columns) => ColumnTranslator::AllowList(columns),
            None => ColumnTranslator::Transform(default),
        }
    }
}

/// Registry of record types keyed by type identifier
#[derive(Default)]
pub struct RecordRegistry {
    types: BTreeMap<String, RegisteredType>,
}

impl RecordRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the registry from configured record type declarations
    pub fn from_config(record_types: &BTreeMap<String, RecordTypeConfig>) -> Result<Self, SchemaError> {
        let mut registry = Self::new();

        for (type_id, decl) in record_types {
            let schema = decl.schema(type_id);

            for field in &decl.required {
                if !schema.has_field(field) {
                    return Err(SchemaError::UnknownField {
                        type_id: type_id.clone(),
                        section: "required",
                        field: field.clone(),
                    });
                }
            }
            for field in decl.defaults.keys() {
                if !schema.has_field(field) {
                    return Err(SchemaError::UnknownField {
                        type_id: type_id.clone(),
                        section: "defaults",
                        field: field.clone(),
                    });
                }
            }

            let policy: Box<dyn RecordImportPolicy> =
                if decl.required.is_empty() && decl.defaults.is_empty() {
                    Box::new(NoopPolicy)
                } else {
                    Box::new(DeclaredPolicy::new(
                        decl.required.clone(),
                        decl.defaults.clone().into_iter().collect(),
                    ))
                };

            registry.register(schema, decl.columns.clone(), policy)?;
        }

        Ok(registry)
    }

    /// Register a record type with its allow-list and policy
    pub fn register(
        &mut self,
        schema: RecordSchema,
        columns: Option<BTreeMap<String, String>>,
        policy: Box<dyn RecordImportPolicy>,
    ) -> Result<&mut Self, SchemaError> {
        schema.validate()?;
        let type_id = schema.type_id().to_string();
        if self.types.contains_key(&type_id) {
            return Err(SchemaError::AlreadyRegistered(type_id));
        }
        log::debug!(
            "registered record type '{}' (table '{}', {} fields)",
            type_id,
            schema.table(),
            schema.fields().len()
        );
        self.types.insert(
            type_id,
            RegisteredType {
                schema,
                columns,
                policy,
            },
        );
        Ok(self)
    }

    pub fn get(&self, type_id: &str) -> Option<&RegisteredType> {
        self.types.get(type_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RegisteredType)> {
        self.types.iter().map(|(id, t)| (id.as_str(), t))
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldKind;

    fn parse(yaml: &str) -> BTreeMap<String, RecordTypeConfig> {
        serde_yml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_from_config_builds_schemas() {
        let types = parse(
            r#"
product:
  table: products
  fields:
    - { name: name, kind: text, unique: true }
    - { name: price, kind: float }
supplier:
  fields:
    - name: title
"#,
        );
        let registry = RecordRegistry::from_config(&types).unwrap();
        assert_eq!(registry.len(), 2);

        let product = registry.get("product").unwrap();
        assert_eq!(product.schema().table(), "products");
        assert_eq!(product.schema().field("price").unwrap().kind, FieldKind::Float);
        assert!(product.schema().field("name").unwrap().unique);
        assert!(product.allow_list().is_none());

        let supplier = registry.get("supplier").unwrap();
        assert_eq!(supplier.schema().table(), "supplier");
    }

    #[test]
    fn test_from_config_rejects_unknown_required_field() {
        let types = parse(
            r#"
product:
  fields:
    - name: name
  required: [sku]
"#,
        );
        let err = RecordRegistry::from_config(&types).err().unwrap();
        assert!(matches!(
            err,
            SchemaError::UnknownField { section: "required", .. }
        ));
    }

    #[test]
    fn test_translator_prefers_allow_list() {
        let types = parse(
            r#"
product:
  fields:
    - name: name
  columns:
    Product Name: name
"#,
        );
        let registry = RecordRegistry::from_config(&types).unwrap();
        let translator = registry
            .get("product")
            .unwrap()
            .translator(ColumnTransform::LowerSnake);
        assert_eq!(translator.translate("Product Name").as_deref(), Some("name"));
        assert_eq!(translator.translate("Price"), None);
    }

    #[test]
    fn test_register_twice_fails() {
        let mut registry = RecordRegistry::new();
        registry
            .register(RecordSchema::new("product"), None, Box::new(NoopPolicy))
            .unwrap();
        let err = registry
            .register(RecordSchema::new("product"), None, Box::new(NoopPolicy))
            .err()
            .unwrap();
        assert!(matches!(err, SchemaError::AlreadyRegistered(_)));
    }
}
