//! `csvimp upload` command - Validate and store a CSV file

use console::style;
use miette::Result;
use std::path::PathBuf;

use crate::cli::helpers::Session;
use crate::cli::GlobalOpts;

#[derive(clap::Args, Debug)]
pub struct UploadArgs {
    /// Record type the rows will be imported into
    pub type_id: String,

    /// CSV file to upload
    pub file: PathBuf,
}

pub fn run(args: UploadArgs, global: &GlobalOpts) -> Result<()> {
    let session = Session::open(global)?;
    let upload = session.service().upload(&args.type_id, &args.file)?;

    if global.quiet {
        println!("{}", upload.id);
        return Ok(());
    }

    println!(
        "{} Uploaded {} as upload {}",
        style("✓").green(),
        style(upload.filename(session.storage.upload_to())).cyan(),
        style(upload.id).cyan()
    );
    println!();
    println!("Next steps:");
    println!(
        "  {} Review the column mapping",
        style(format!("csvimp map {}", upload.id)).yellow()
    );
    println!(
        "  {} Create the records",
        style(format!("csvimp import {}", upload.id)).yellow()
    );
    Ok(())
}
