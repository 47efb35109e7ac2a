//! viewengine - command line entry point

use anyhow::Result;
use tracing::{debug, info};

use viewengine::ViewEngine;
use viewengine::cli::{Cli, Commands, load_data};

/// Initialize tracing; RUST_LOG overrides the default `warn` level
fn init_logger() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_logger();

    let cli = Cli::parse_args();
    debug!("CLI arguments parsed: {:?}", cli);

    if let Err(e) = run(cli) {
        eprintln!("✗ {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let options = cli.engine_options()?;

    match cli.command {
        Commands::Render {
            name,
            data,
            json,
            bare,
        } => {
            let data = load_data(data.as_ref(), json.as_deref())?;
            let mut engine = ViewEngine::new(options);
            info!("Rendering {} (layout: {})", name, !bare);
            let output = if bare {
                engine.include(&name, &data)?
            } else {
                engine.render(&name, &data)?
            };
            print!("{}", output);
        }
        Commands::Check { names } => {
            let mut engine = ViewEngine::new(options);
            let mut failures = 0;
            for name in &names {
                match engine.compile(name) {
                    Ok(_) => println!("✓ {}", name),
                    Err(e) => {
                        failures += 1;
                        eprintln!("✗ {}: {}", name, e);
                    }
                }
            }
            if failures > 0 {
                anyhow::bail!("{} of {} template(s) failed to compile", failures, names.len());
            }
        }
        Commands::Settings => {
            println!("{}", serde_json::to_string_pretty(&options.to_settings())?);
        }
    }

    Ok(())
}
