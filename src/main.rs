// docqa/src/main.rs
use colored::Colorize;
use docqa::cli;
use docqa::config::AppConfig;
use docqa::monitoring::{init_tracing, MonitoringConfig};
use docqa::RagPipeline;
use std::path::PathBuf;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    // Keep the guard alive, dropping it stops the file writer
    let monitoring = MonitoringConfig::from_env();
    let _log_guard = match init_tracing(&monitoring) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("{} logging disabled: {}", "warning:".yellow().bold(), e);
            None
        }
    };

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} {}", "configuration error:".red().bold(), e);
            eprintln!("Set GEMINI_API_KEY, or choose EMBEDDING_PROVIDER=hash and LLM_PROVIDER=ollama to run offline.");
            return ExitCode::FAILURE;
        }
    };

    let pipeline = match RagPipeline::from_config(&config).await {
        Ok(pipeline) => pipeline,
        Err(e) => {
            eprintln!("{} {}", "startup failed:".red().bold(), e);
            return ExitCode::FAILURE;
        }
    };

    println!("{}", "📄 docqa: chat with a PDF".bold());
    if monitoring.enabled && monitoring.log_to_file {
        println!("Logs: {}", monitoring.log_dir.display());
    }

    let initial = std::env::args_os().nth(1).map(PathBuf::from);
    cli::run(&pipeline, initial).await;

    println!("Bye!");
    ExitCode::SUCCESS
}
