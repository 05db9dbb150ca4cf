//! `csvimp types` command - List importable record types

use console::style;
use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use tabled::{builder::Builder, settings::Style};

use crate::cli::helpers::{escape_csv, Session};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::schema::{FieldSpec, RegisteredType};

#[derive(clap::Args, Debug)]
pub struct TypesArgs {
    /// Show the fields of one record type
    pub type_id: Option<String>,
}

#[derive(Serialize)]
struct TypeInfo<'a> {
    type_id: &'a str,
    table: &'a str,
    fields: &'a [FieldSpec],
    columns: Option<Vec<&'a str>>,
}

fn info<'a>(type_id: &'a str, registered: &'a RegisteredType) -> TypeInfo<'a> {
    TypeInfo {
        type_id,
        table: registered.schema().table(),
        fields: registered.schema().fields(),
        columns: registered
            .allow_list()
            .map(|columns| columns.keys().map(String::as_str).collect()),
    }
}

pub fn run(args: TypesArgs, global: &GlobalOpts) -> Result<()> {
    let session = Session::open(global)?;

    if let Some(type_id) = &args.type_id {
        let registered = session.service().registered(type_id)?;
        return show_fields(type_id, registered, global);
    }

    let types: Vec<TypeInfo> = session
        .registry
        .iter()
        .filter(|(id, _)| !session.settings.is_excluded(id))
        .map(|(id, registered)| info(id, registered))
        .collect();

    match global.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&types).into_diagnostic()?);
        }
        OutputFormat::Csv => {
            println!("type,table,fields");
            for t in &types {
                let fields: Vec<&str> = t.fields.iter().map(|f| f.name.as_str()).collect();
                println!(
                    "{},{},{}",
                    escape_csv(t.type_id),
                    escape_csv(t.table),
                    escape_csv(&fields.join(" "))
                );
            }
        }
        OutputFormat::Auto => {
            if types.is_empty() {
                println!(
                    "No record types declared. Add them under {} in .csvimp/config.yaml",
                    style("record_types").yellow()
                );
                return Ok(());
            }

            let mut builder = Builder::default();
            builder.push_record(["Type", "Table", "Fields", "Columns"]);
            for t in &types {
                let fields: Vec<&str> = t.fields.iter().map(|f| f.name.as_str()).collect();
                let columns = match &t.columns {
                    Some(columns) => columns.join(", "),
                    None => format!("any ({})", session.settings.column_transform.as_str()),
                };
                builder.push_record([
                    t.type_id.to_string(),
                    t.table.to_string(),
                    fields.join(", "),
                    columns,
                ]);
            }
            println!("{}", builder.build().with(Style::modern()));
            if !global.quiet {
                println!("{} record type(s)", style(types.len()).cyan());
            }
        }
    }

    Ok(())
}

fn show_fields(type_id: &str, registered: &RegisteredType, global: &GlobalOpts) -> Result<()> {
    let schema = registered.schema();

    if global.format == OutputFormat::Json {
        println!(
            "{}",
            serde_json::to_string_pretty(&info(type_id, registered)).into_diagnostic()?
        );
        return Ok(());
    }

    println!(
        "{} (table {})",
        style(type_id).bold(),
        style(schema.table()).cyan()
    );
    let mut builder = Builder::default();
    builder.push_record(["Field", "Kind", "Unique", "Nullable"]);
    for field in schema.fields() {
        builder.push_record([
            field.name.clone(),
            field.kind.to_string(),
            if field.unique { "yes" } else { "" }.to_string(),
            if field.nullable { "yes" } else { "no" }.to_string(),
        ]);
    }
    println!("{}", builder.build().with(Style::modern()));

    if let Some(columns) = registered.allow_list() {
        println!();
        println!("Accepted columns:");
        for (column, field) in columns {
            println!("  {} → {}", style(column).cyan(), field);
        }
    }

    Ok(())
}
