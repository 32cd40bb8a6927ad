use anyhow::Context;
use clap::Parser;
use module_di::app::greeter::{self, GREETER};
use module_di::utils::{logger, validation::Validate};
use module_di::{CliConfig, Container, ContainerConfig, ResolvePolicy};

fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    let mut config = match &cli.config {
        Some(path) => ContainerConfig::from_file(path)
            .with_context(|| format!("Failed to load config file '{}'", path))?,
        None => ContainerConfig::default(),
    };

    if cli.strict {
        config.resolver.get_or_insert_with(Default::default).policy = Some(ResolvePolicy::Strict);
    }

    if let Err(e) = config.validate() {
        eprintln!("❌ Configuration validation failed: {}", e);
        eprintln!("💡 Suggestion: {}", e.recovery_suggestion());
        std::process::exit(1);
    }

    logger::init_logger(cli.verbose, config.log_level(), config.log_format());
    Container::info();
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    let container = Container::with_config(&config);
    greeter::register(&container, &cli.lang, &["world", "rustaceans"]);

    let report = match container.bootstrap() {
        Ok(report) => report,
        Err(e) => {
            tracing::error!(
                "❌ Bootstrap failed: {} (Category: {:?})",
                e,
                e.category()
            );
            eprintln!("❌ {}", e);
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(1);
        }
    };

    if let Some(greeter) = container.get(&GREETER) {
        for line in greeter.greeted() {
            println!("{}", line);
        }
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "✅ Bootstrapped {} modules: {} config actions, {} run actions",
            report.modules, report.configs_run, report.runs_run
        );
        for module in &report.skipped_modules {
            println!("⚠️  Skipped module: {}", module);
        }
        for diagnostic in &report.diagnostics {
            println!("⚠️  {}", diagnostic);
        }
    }

    Ok(())
}
