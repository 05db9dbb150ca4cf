//! `csvimp map` command - Show the proposed column mapping of an upload

use console::style;
use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use tabled::{builder::Builder, settings::Style};

use crate::cli::helpers::Session;
use crate::cli::{GlobalOpts, OutputFormat};
use crate::import::ColumnProposal;

#[derive(clap::Args, Debug)]
pub struct MapArgs {
    /// Upload id
    pub id: i64,
}

#[derive(Serialize)]
struct ProposalRow<'a> {
    column: &'a str,
    proposed: Option<&'a str>,
    known: bool,
    choices: Vec<String>,
}

impl<'a> From<&'a ColumnProposal> for ProposalRow<'a> {
    fn from(p: &'a ColumnProposal) -> Self {
        Self {
            column: &p.column,
            proposed: p.proposed.as_deref(),
            known: p.known,
            choices: p.choices.iter().map(ToString::to_string).collect(),
        }
    }
}

pub fn run(args: MapArgs, global: &GlobalOpts) -> Result<()> {
    let session = Session::open(global)?;
    let service = session.service();
    let (upload, doc) = service.load(args.id)?;
    let proposals = service.proposals(&upload, &doc)?;

    if global.format == OutputFormat::Json {
        let rows: Vec<ProposalRow> = proposals.iter().map(ProposalRow::from).collect();
        println!("{}", serde_json::to_string_pretty(&rows).into_diagnostic()?);
        return Ok(());
    }

    println!(
        "{} {} ({} rows, type {})",
        style("Upload").bold(),
        style(upload.filename(session.storage.upload_to())).cyan(),
        doc.row_count(),
        style(&upload.type_id).cyan()
    );
    println!("Uploaded CSV. Please associate fields below.");
    println!();

    let mut builder = Builder::default();
    builder.push_record(["Column", "Field", "Choices"]);
    for p in &proposals {
        let field = match (&p.proposed, p.known) {
            (Some(name), true) => name.clone(),
            (Some(name), false) => format!("{} (unknown field)", name),
            (None, _) => "none".to_string(),
        };
        let choices: Vec<String> = p.choices.iter().map(ToString::to_string).collect();
        builder.push_record([p.column.clone(), field, choices.join(", ")]);
    }
    println!("{}", builder.build().with(Style::modern()));

    if !global.quiet {
        println!();
        println!(
            "Change a column with {} or choose each column with {}",
            style(format!("csvimp import {} --map COLUMN=FIELD", upload.id)).yellow(),
            style(format!("csvimp import {} --interactive", upload.id)).yellow()
        );
    }
    Ok(())
}
