use clap::Parser;
use scratch_harvest::utils::logger;
use scratch_harvest::EnvFile;
use std::path::PathBuf;

/// Writes the `.env` file that docker-compose passes to the harvester container.
#[derive(Parser, Debug)]
#[command(name = "compose-env")]
#[command(about = "Write IDENTIFIER and AMOUNT into a docker-compose env file")]
struct Args {
    /// First project id (or `random`)
    #[arg(long, env = "IDENTIFIER")]
    identifier: String,

    /// Successful downloads to reach
    #[arg(long, env = "AMOUNT")]
    amount: String,

    #[arg(short, long, default_value = ".env")]
    output: PathBuf,

    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let args = Args::parse();

    if let Err(e) = logger::init_cli_logger(args.verbose, false, None) {
        eprintln!("❌ Could not initialise logging: {}", e);
    }

    let result = EnvFile::new(args.identifier, args.amount)
        .and_then(|env| env.write_to(&args.output).map(|_| env));

    match result {
        Ok(env) => {
            tracing::debug!("Env file contents:\n{}", env.render());
            println!(
                "✅ Wrote {} (IDENTIFIER={}, AMOUNT={})",
                args.output.display(),
                env.identifier(),
                env.amount()
            );
        }
        Err(e) => {
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 Suggestion: {}", e.recovery_suggestion());
            std::process::exit(1);
        }
    }
}
