//! `csvimp result` command - Show the records created from an upload

use console::style;
use miette::{IntoDiagnostic, Result};
use tabled::{builder::Builder, settings::Style};

use crate::cli::helpers::{escape_csv, sql_to_json, truncate_str, Session};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::UploadedCsv;
use crate::import::ImportError;

#[derive(clap::Args, Debug)]
pub struct ResultArgs {
    /// Upload id
    pub id: i64,
}

pub fn run(args: ResultArgs, global: &GlobalOpts) -> Result<()> {
    let session = Session::open(global)?;
    let upload = session
        .store
        .get_upload(args.id)?
        .ok_or(ImportError::UploadNotFound(args.id))?;
    print_result(&session, &upload, global)
}

/// Print the records listed on an upload; also the post-import view
pub fn print_result(session: &Session, upload: &UploadedCsv, global: &GlobalOpts) -> Result<()> {
    let registered = session
        .registry
        .get(&upload.type_id)
        .ok_or_else(|| miette::miette!("Record type '{}' is no longer declared", upload.type_id))?;
    let schema = registered.schema();
    let records = session.store.fetch_records(schema, &upload.result_ids())?;
    let fields: Vec<&str> = schema.field_names().collect();

    match global.format {
        OutputFormat::Json => {
            let rows: Vec<serde_json::Value> = records
                .iter()
                .map(|r| {
                    let mut obj = serde_json::Map::new();
                    obj.insert("id".to_string(), serde_json::Value::from(r.id));
                    for (field, value) in &r.values {
                        obj.insert(field.clone(), sql_to_json(value));
                    }
                    serde_json::Value::Object(obj)
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&rows).into_diagnostic()?);
        }
        OutputFormat::Csv => {
            let mut header = vec!["id".to_string()];
            header.extend(fields.iter().map(|f| escape_csv(f)));
            println!("{}", header.join(","));
            for r in &records {
                let mut line = vec![r.id.to_string()];
                line.extend(fields.iter().map(|f| escape_csv(&r.display(f))));
                println!("{}", line.join(","));
            }
        }
        OutputFormat::Auto => {
            if !global.quiet {
                println!(
                    "{} {} → {}",
                    style("Upload").bold(),
                    style(upload.id).cyan(),
                    style(schema.table()).cyan()
                );
            }
            if records.is_empty() {
                println!("No records were created from this upload.");
                return Ok(());
            }

            let mut builder = Builder::default();
            let mut header = vec!["ID".to_string()];
            header.extend(fields.iter().map(|f| f.to_string()));
            builder.push_record(header);
            for r in &records {
                let mut row = vec![r.id.to_string()];
                row.extend(fields.iter().map(|f| truncate_str(&r.display(f), 40)));
                builder.push_record(row);
            }
            println!("{}", builder.build().with(Style::modern()));
            if !global.quiet {
                println!("{} record(s)", style(records.len()).cyan());
            }
        }
    }

    Ok(())
}
