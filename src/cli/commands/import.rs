//! `csvimp import` command - Create records from an upload

use console::style;
use dialoguer::{theme::ColorfulTheme, Select};
use miette::{IntoDiagnostic, Result};

use crate::cli::commands::{list, result};
use crate::cli::helpers::{ConsoleSink, Session};
use crate::cli::GlobalOpts;
use crate::core::PostImportView;
use crate::import::mapping::parse_override;
use crate::import::{ColumnMapping, ColumnProposal, ImportResult, ResultPolicy};

#[derive(clap::Args, Debug)]
pub struct ImportArgs {
    /// Upload id
    pub id: i64,

    /// Override the proposed field of a column (use "none" to skip the column)
    #[arg(long = "map", value_name = "COLUMN=FIELD", value_parser = parse_override)]
    pub map: Vec<(String, String)>,

    /// Choose the field of every column interactively
    #[arg(long, short = 'i', conflicts_with = "map")]
    pub interactive: bool,

    /// What happens to the upload afterwards (default: config `after_import`)
    #[arg(long, value_enum)]
    pub after: Option<ResultPolicy>,
}

pub fn run(args: ImportArgs, global: &GlobalOpts) -> Result<()> {
    let session = Session::open(global)?;
    let service = session.service();
    let policy = args.after.unwrap_or(session.settings.result_policy);
    let user = session.config.author();

    let (upload, doc) = service.load(args.id)?;
    let proposals = service.proposals(&upload, &doc)?;
    let overrides = if args.interactive {
        choose_interactively(&proposals)?
    } else {
        args.map.clone()
    };
    let mapping = ColumnMapping::resolve(&proposals, &overrides)?;

    let mut sink = ConsoleSink::new(global.quiet);
    let outcome = service.import_mapped(&upload, &doc, &mapping, &user, policy, &mut sink)?;

    if !global.quiet {
        print_summary(doc.row_count(), &outcome);
    }

    let view = match (session.settings.redirect, policy) {
        // The upload is gone, so there is no result to show
        (PostImportView::Result, ResultPolicy::DeleteAfterImport) => PostImportView::List,
        (view, _) => view,
    };
    match view {
        PostImportView::Result => {
            let upload = session
                .store
                .get_upload(upload.id)?
                .unwrap_or(upload);
            println!();
            result::print_result(&session, &upload, global)
        }
        PostImportView::List => {
            println!();
            list::print_uploads(&session, None, global)
        }
        PostImportView::None => Ok(()),
    }
}

/// Ask for the field of each column, returning the choices as overrides
fn choose_interactively(proposals: &[ColumnProposal]) -> Result<Vec<(String, String)>> {
    let theme = ColorfulTheme::default();
    let mut overrides = Vec::with_capacity(proposals.len());

    for proposal in proposals {
        let items: Vec<String> = proposal.choices.iter().map(ToString::to_string).collect();
        let initial = proposal.initial();
        let default = proposal
            .choices
            .iter()
            .position(|c| *c == initial)
            .unwrap_or(0);

        let idx = Select::with_theme(&theme)
            .with_prompt(format!("Field for column \"{}\"", proposal.column))
            .items(&items)
            .default(default)
            .interact()
            .into_diagnostic()?;
        overrides.push((proposal.column.clone(), items[idx].clone()));
    }

    Ok(overrides)
}

fn print_summary(rows: usize, outcome: &ImportResult) {
    println!();
    println!("{}", style("Import Summary").bold());
    println!("{}", style("─".repeat(50)).dim());
    println!("  Rows processed:     {}", style(rows).cyan());
    println!("  Records created:    {}", style(outcome.imported).green());
    if outcome.duplicates > 0 {
        println!("  Duplicates skipped: {}", style(outcome.duplicates).yellow());
    }
}
