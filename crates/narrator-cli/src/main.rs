//! CLI entry point - the composition root.

use clap::Parser;

use narrator_cli::{Cli, CliError, Commands, bootstrap, handlers};

#[tokio::main]
async fn main() {
    // Load .env before clap reads env-backed arguments
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    bootstrap::init_logging(cli.verbose);

    if let Err(err) = run(cli).await {
        eprintln!("Error: {err:#}");
        let code = err.downcast_ref::<CliError>().map_or(1, CliError::exit_code);
        std::process::exit(code);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let settings = bootstrap::resolve_settings(&cli)?;

    match cli.command {
        Some(Commands::Segment { input, json }) => handlers::segment::execute(&input, json),
        Some(Commands::Schedule {
            text,
            duration,
            lead_time,
        }) => handlers::schedule::execute(&settings, &text, duration, lead_time),
        Some(Commands::Pages { file }) => handlers::pages::execute(&file),
        Some(Commands::Speak {
            input,
            page,
            model_dir,
        }) => handlers::speak::execute(settings, &input, page, model_dir.as_deref()).await,
        None => {
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
            Ok(())
        }
    }
}
