//! `csvimp list` command - List uploads, newest first

use console::style;
use miette::{IntoDiagnostic, Result};
use tabled::{builder::Builder, settings::Style};

use crate::cli::helpers::{escape_csv, format_datetime, truncate_str, Session};
use crate::cli::{GlobalOpts, OutputFormat};

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Only show uploads for this record type
    #[arg(long, short = 't')]
    pub r#type: Option<String>,
}

pub fn run(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let session = Session::open(global)?;
    print_uploads(&session, args.r#type.as_deref(), global)
}

/// Print the upload list; also the post-import view
pub fn print_uploads(session: &Session, type_id: Option<&str>, global: &GlobalOpts) -> Result<()> {
    let uploads: Vec<_> = session
        .store
        .list_uploads()?
        .into_iter()
        .filter(|u| type_id.map_or(true, |t| u.type_id == t))
        .collect();
    let upload_to = session.storage.upload_to();

    match global.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&uploads).into_diagnostic()?);
        }
        OutputFormat::Csv => {
            println!("id,type,file,created,imported");
            for u in &uploads {
                println!(
                    "{},{},{},{},{}",
                    u.id,
                    escape_csv(&u.type_id),
                    escape_csv(&u.filename(upload_to)),
                    u.created.to_rfc3339(),
                    u.result_ids().len()
                );
            }
        }
        OutputFormat::Auto => {
            if uploads.is_empty() {
                println!("No uploads found.");
                return Ok(());
            }

            let mut builder = Builder::default();
            builder.push_record(["ID", "Type", "File", "Created", "Imported"]);
            for u in &uploads {
                let imported = match &u.result_id_list {
                    Some(_) => u.result_ids().len().to_string(),
                    None => "-".to_string(),
                };
                builder.push_record([
                    u.id.to_string(),
                    u.type_id.clone(),
                    truncate_str(&u.filename(upload_to), 40),
                    format_datetime(&u.created),
                    imported,
                ]);
            }
            println!("{}", builder.build().with(Style::modern()));
            if !global.quiet {
                println!("{} upload(s) found", style(uploads.len()).cyan());
            }
        }
    }

    Ok(())
}
