use batchscribe::cli::{Cli, Commands};
use batchscribe::commands;
use batchscribe::config::Config;
use clap::Parser;

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("batchscribe=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Transcribe {
            input,
            output,
            language,
        } => {
            let mut config = config;
            if let Some(code) = language {
                config.recognition.language_code = code;
            }
            commands::run_transcribe(config, input, output)
        }
        Commands::InitConfig { force } => commands::init_config(force),
        Commands::Check => commands::check(&config),
    }
}
