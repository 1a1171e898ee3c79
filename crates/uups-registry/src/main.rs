use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, Command};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use uups_registry::component::ComponentCatalog;
use uups_registry::config::RegistryConfig;
use uups_registry::test_harness::{run_scenario, run_simulator, SimulatorConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Command::new("uups-registry")
        .version(uups_registry::VERSION)
        .about("Owner-gated upgradeable box registry")
        .arg_required_else_help(true)
        .subcommand(
            Command::new("scenario")
                .about("Deploy a box, upgrade it and exercise every call")
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output as JSON"),
                )
                .arg(
                    Arg::new("config")
                        .long("config")
                        .value_parser(value_parser!(PathBuf))
                        .help("Registry configuration (TOML)"),
                ),
        )
        .subcommand(
            Command::new("simulate")
                .about("Run the randomized registry simulator")
                .arg(
                    Arg::new("operations")
                        .long("operations")
                        .default_value("1000")
                        .value_parser(value_parser!(u64))
                        .help("Number of sequential calls to simulate"),
                )
                .arg(
                    Arg::new("seed")
                        .long("seed")
                        .default_value("42")
                        .value_parser(value_parser!(u64))
                        .help("Random seed for reproducibility"),
                )
                .arg(
                    Arg::new("principals")
                        .long("principals")
                        .default_value("4")
                        .value_parser(value_parser!(usize))
                        .help("Number of distinct callers"),
                )
                .arg(
                    Arg::new("tasks")
                        .long("tasks")
                        .default_value("8")
                        .value_parser(value_parser!(usize))
                        .help("Concurrent tasks in the second phase"),
                )
                .arg(
                    Arg::new("stop-on-violation")
                        .long("stop-on-violation")
                        .action(ArgAction::SetTrue)
                        .help("Stop simulation on first violation"),
                ),
        )
        .subcommand(Command::new("catalog").about("List published implementations"));

    let matches = cli.get_matches();

    match matches.subcommand() {
        Some(("scenario", args)) => {
            let config = match args.get_one::<PathBuf>("config") {
                Some(path) => RegistryConfig::load(path)
                    .with_context(|| format!("loading {}", path.display()))?,
                None => RegistryConfig::default(),
            };

            let report = run_scenario(config).context("scenario deployment failed")?;

            if args.get_flag("json") {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", report.generate_text());
            }

            std::process::exit(if report.passed() { 0 } else { 1 });
        }
        Some(("simulate", args)) => {
            let config = SimulatorConfig {
                seed: args.get_one::<u64>("seed").copied().unwrap_or(42),
                total_operations: args.get_one::<u64>("operations").copied().unwrap_or(1000),
                principals: args.get_one::<usize>("principals").copied().unwrap_or(4),
                concurrent_tasks: args.get_one::<usize>("tasks").copied().unwrap_or(8),
                stop_on_first_violation: args.get_flag("stop-on-violation"),
                ..SimulatorConfig::default()
            };

            println!("Running registry simulator...");
            println!("Operations: {}", config.total_operations);
            println!("Seed: {}", config.seed);
            println!("Principals: {}", config.principals);
            println!("Concurrent tasks: {}", config.concurrent_tasks);
            println!();

            let report = run_simulator(config).await;
            println!("{}", report.generate_text());

            std::process::exit(if report.passed() { 0 } else { 1 });
        }
        Some(("catalog", _)) => {
            let catalog = ComponentCatalog::with_defaults();
            println!("uups-registry {}", uups_registry::VERSION);
            for component in catalog.iter() {
                println!(
                    "  {:<10} version {}  setter: {}  layout: {}",
                    component.implementation_id(),
                    component.version_tag(),
                    if component.supports_write() { "yes" } else { "no" },
                    component.storage_layout().fingerprint()
                );
            }
        }
        _ => {}
    }

    Ok(())
}
