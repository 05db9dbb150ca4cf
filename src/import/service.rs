//! Upload → map → import workflow for one stored CSV

use std::fs;
use std::path::Path;

use super::bulk::{BulkImporter, ImportResult, ResultPolicy};
use super::error::{ImportError, ValidationError};
use super::mapping::{propose, ColumnMapping, ColumnProposal};
use super::normalize::{check_extension, CsvDocument};
use super::notify::NotificationSink;
use super::policy::ImportContext;
use crate::core::config::ImporterSettings;
use crate::core::storage::UploadStorage;
use crate::core::store::{RecordStore, UploadedCsv};
use crate::schema::{RecordRegistry, RegisteredType};

/// Drives uploads and imports against one store
pub struct ImportService<'a> {
    store: &'a RecordStore,
    registry: &'a RecordRegistry,
    storage: &'a UploadStorage,
    settings: &'a ImporterSettings,
}

impl<'a> ImportService<'a> {
    pub fn new(
        store: &'a RecordStore,
        registry: &'a RecordRegistry,
        storage: &'a UploadStorage,
        settings: &'a ImporterSettings,
    ) -> Self {
        Self {
            store,
            registry,
            storage,
            settings,
        }
    }

    /// Look up an importable (registered, not excluded) record type
    pub fn registered(&self, type_id: &str) -> Result<&'a RegisteredType, ValidationError> {
        if self.settings.is_excluded(type_id) {
            return Err(ValidationError::UnknownType(type_id.to_string()));
        }
        self.registry
            .get(type_id)
            .ok_or_else(|| ValidationError::UnknownType(type_id.to_string()))
    }

    /// Validate a CSV file and store it as a new upload
    pub fn upload(&self, type_id: &str, path: &Path) -> Result<UploadedCsv, ImportError> {
        let registered = self.registered(type_id)?;

        if !path.is_file() {
            return Err(ValidationError::MissingFile(path.to_path_buf()).into());
        }
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        check_extension(&file_name)?;

        let bytes = fs::read(path)?;
        let doc = CsvDocument::parse(&bytes)?;
        registered
            .translator(self.settings.column_transform)
            .check_columns(doc.columns())?;

        let stored = self.storage.save(&file_name, &bytes)?;
        let upload = self.store.insert_upload(type_id, &stored)?;
        log::info!(
            "upload {} stored at {} ({} rows)",
            upload.id,
            stored,
            doc.row_count()
        );
        Ok(upload)
    }

    /// Fetch an upload and parse its stored file
    pub fn load(&self, id: i64) -> Result<(UploadedCsv, CsvDocument), ImportError> {
        let upload = self
            .store
            .get_upload(id)?
            .ok_or(ImportError::UploadNotFound(id))?;
        let bytes = self.storage.read(&upload.csv_file)?;
        let doc = CsvDocument::parse(&bytes)?;
        Ok((upload, doc))
    }

    /// Proposed mapping for every column of an upload
    pub fn proposals(
        &self,
        upload: &UploadedCsv,
        doc: &CsvDocument,
    ) -> Result<Vec<ColumnProposal>, ValidationError> {
        let registered = self.registered(&upload.type_id)?;
        let translator = registered.translator(self.settings.column_transform);
        Ok(propose(registered.schema(), &translator, doc.columns()))
    }

    /// Import an upload, applying `COLUMN=FIELD` overrides to the proposals
    pub fn import(
        &self,
        id: i64,
        overrides: &[(String, String)],
        user: &str,
        policy: ResultPolicy,
        sink: &mut dyn NotificationSink,
    ) -> Result<ImportResult, ImportError> {
        let (upload, doc) = self.load(id)?;
        let proposals = self.proposals(&upload, &doc)?;
        let mapping = ColumnMapping::resolve(&proposals, overrides)?;
        self.import_mapped(&upload, &doc, &mapping, user, policy, sink)
    }

    /// Import an upload with an already confirmed mapping
    pub fn import_mapped(
        &self,
        upload: &UploadedCsv,
        doc: &CsvDocument,
        mapping: &ColumnMapping,
        user: &str,
        policy: ResultPolicy,
        sink: &mut dyn NotificationSink,
    ) -> Result<ImportResult, ImportError> {
        let registered = self.registered(&upload.type_id)?;
        self.store.ensure_table(registered.schema())?;

        let ctx = ImportContext::new(user, upload.type_id.as_str());
        let importer = BulkImporter::new(self.store, registered, &ctx);
        importer.validate_rows(doc, mapping)?;
        let run = importer.run(doc, mapping);
        let result = &run.result;

        // Reported even when the run aborted
        if let Some(message) = result.imported_message() {
            sink.info(&message);
        }
        if let Some(message) = result.duplicates_message() {
            sink.warning(&message);
        }

        match policy {
            ResultPolicy::KeepWithResults => {
                self.store
                    .set_result_ids(upload.id, result.id_list().as_deref())?;
            }
            ResultPolicy::DeleteAfterImport => {
                self.store.delete_upload(upload.id)?;
                self.storage.delete(&upload.csv_file)?;
                log::info!("upload {} deleted after import", upload.id);
            }
        }

        run.into_result()
    }
}
