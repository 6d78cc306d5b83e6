use clap::Parser;
use screen_discovery::cli::commands::{cmd_explore, cmd_generate, cmd_inspect, cmd_run};
use screen_discovery::cli::config::{
    Cli, Commands, build_discovery_config, build_explorer_config, build_session_config, load_config,
};
use screen_discovery::report::artifacts::ArtifactWriter;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(cli.config.as_deref());
    let session_config = build_session_config(
        &config,
        cli.server.as_deref(),
        cli.app.as_deref(),
        cli.device.as_deref(),
    );

    match cli.command {
        Commands::Inspect { out } => {
            let writer = ArtifactWriter::new(out.unwrap_or_else(|| config.artifacts.dir.clone()));
            let discovery = build_discovery_config(&config, None, writer.screenshot_dir());
            cmd_inspect(&session_config, &discovery, &writer)?;
        }
        Commands::Explore {
            max_clicks,
            max_per_kind,
            settle_ms,
            out,
        } => {
            let writer = ArtifactWriter::new(out.unwrap_or_else(|| config.artifacts.dir.clone()));
            let discovery = build_discovery_config(&config, max_per_kind, writer.screenshot_dir());
            let explorer = build_explorer_config(&config, max_clicks, settle_ms, discovery);
            if !cmd_explore(&session_config, &explorer, &writer)? {
                std::process::exit(2);
            }
        }
        Commands::Generate {
            output_dir,
            max_clicks,
        } => {
            let writer = ArtifactWriter::new(&config.artifacts.dir);
            let discovery = build_discovery_config(&config, None, writer.screenshot_dir());
            let explorer = build_explorer_config(&config, max_clicks, None, discovery);
            cmd_generate(&session_config, &explorer, &writer, &output_dir)?;
        }
        Commands::Run {
            scenario,
            format,
            output,
        } => {
            let writer = ArtifactWriter::new(&config.artifacts.dir);
            let discovery = build_discovery_config(&config, None, writer.screenshot_dir());
            let format = format.unwrap_or_else(|| config.run.format.clone());
            let output = output.or_else(|| config.run.output.clone());
            let all_passed = cmd_run(
                &session_config,
                &scenario,
                &format,
                output.as_deref(),
                &discovery,
                &writer,
            )?;
            if !all_passed {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

/// `-v` raises the default level one step per flag; `RUST_LOG` wins.
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
