use clap::Parser;

use dsvform::cli::{Cli, Commands};
use dsvform::commands::{
    Workspace, handle_apply, handle_destroy, handle_init, handle_log, handle_lookup, handle_plan,
    handle_refresh, handle_role, handle_show,
};
use dsvform::utils::{format_error, log_filter};

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(log_filter(cli.global.verbose))
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", format_error(e.as_ref()));
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let file = cli.global.file;
    let open = || Workspace::open(file.as_deref());

    match cli.command {
        // Init is the only command that works without a document
        Commands::Init { path, overwrite } => handle_init(path, overwrite),
        Commands::Plan => handle_plan(&open()?),
        Commands::Apply => handle_apply(&open()?),
        Commands::Refresh => handle_refresh(&open()?),
        Commands::Destroy { yes } => handle_destroy(&open()?, yes),
        Commands::Show { address } => handle_show(&open()?, address),
        Commands::Lookup { command } => handle_lookup(&open()?, command),
        Commands::Role { command } => handle_role(&open()?, command),
        Commands::Log { limit } => handle_log(&open()?, limit),
    }
}
