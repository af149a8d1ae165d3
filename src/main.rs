use clap::Parser;
use vouch::cli::{
    handle_check, handle_completions, handle_config_init, handle_resolve, Cli, Commands,
    ConfigCommands,
};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Serve(args) => vouch::cli::serve::run_serve(args).await,
        Commands::Resolve(args) => handle_resolve(&args).map(|output| println!("{}", output)),
        Commands::Check(args) => handle_check(&args).map(|output| println!("{}", output)),
        Commands::Config(config_cmd) => match config_cmd {
            ConfigCommands::Init(args) => {
                handle_config_init(&args).map(|message| println!("{}", message))
            }
        },
        Commands::Completions(args) => {
            handle_completions(&args);
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
