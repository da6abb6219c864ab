mod cli;

use tfdoc::value::Value;
use tfdoc::LoaderOptions;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

fn main() {
    use clap::Parser;
    let cli = cli::Cli::parse();

    let default_level = if cli.debug {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(default_level.into())
                .with_env_var("TFDOC_LOG")
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .init();

    for new_path in cli.directory.iter() {
        match new_path.canonicalize() {
            Err(e) => {
                eprintln!(
                    "Failed to resolve path for -C/--directory {}\n{}",
                    new_path.display(),
                    e
                );
                std::process::exit(1);
            }
            Ok(cwd) => {
                if let Err(err) = std::env::set_current_dir(&cwd) {
                    eprintln!("Failed to set work directory to {}\n{}", cwd.display(), err,);
                    std::process::exit(1);
                }

                tracing::info!(directory=%cwd.display(), "Changed working directory");
            }
        }
    }

    if let Err(e) = run(&cli) {
        for error in e.chain() {
            eprintln!("{error}")
        }
        std::process::exit(1);
    }
}

fn run(cli: &cli::Cli) -> anyhow::Result<()> {
    let options = LoaderOptions::default()
        .with_debug(cli.debug)
        .with_stop_on_hcl_error(cli.input.stop_on_hcl_error)
        .with_allow_downloads(cli.input.allow_downloads)
        .with_var_files(cli.input.var_files.iter().cloned());

    let value = tfdoc::convert_dir(&cli.input.path, &options)?;
    output(&cli.output, &value)
}

fn output(output: &cli::OutputArgs, value: &Value) -> anyhow::Result<()> {
    let stdout = std::io::stdout();
    match output.format {
        cli::OutputFormat::Yaml => serde_yaml::to_writer(stdout, value)?,
        cli::OutputFormat::Json => {
            if output.compact {
                serde_json::to_writer(stdout, value)?
            } else {
                serde_json::to_writer_pretty(stdout, value)?
            }
            // json has no trailing newline
            println!();
        }
    };

    Ok(())
}
