use clap::Parser;
use log::LevelFilter;
use miette::Result;
use csvimp::cli::{Cli, Commands};

fn main() -> Result<()> {
    // Reset SIGPIPE to default behavior (terminate silently) for proper Unix piping.
    #[cfg(unix)]
    {
        unsafe {
            libc::signal(libc::SIGPIPE, libc::SIG_DFL);
        }
    }
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .tab_width(4)
                .build(),
        )
    }))?;

    let cli = Cli::parse();
    let global = cli.global;

    // RUST_LOG wins over the flags
    let level = if global.verbose {
        LevelFilter::Debug
    } else if global.quiet {
        LevelFilter::Error
    } else {
        LevelFilter::Warn
    };
    env_logger::Builder::new()
        .filter_level(level)
        .format_timestamp(None)
        .parse_default_env()
        .init();

    match cli.command {
        Commands::Init(args) => csvimp::cli::commands::init::run(args),
        Commands::Types(args) => csvimp::cli::commands::types::run(args, &global),
        Commands::Upload(args) => csvimp::cli::commands::upload::run(args, &global),
        Commands::Map(args) => csvimp::cli::commands::map::run(args, &global),
        Commands::Import(args) => csvimp::cli::commands::import::run(args, &global),
        Commands::List(args) => csvimp::cli::commands::list::run(args, &global),
        Commands::Result(args) => csvimp::cli::commands::result::run(args, &global),
        Commands::Completions(args) => csvimp::cli::commands::completions::run(args),
    }
}
