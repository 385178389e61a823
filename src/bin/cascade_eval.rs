use protoseg::config::{self, OutputFormat};
use protoseg::eval::run_from_config;
use protoseg::image::io::write_json_file;
use protoseg::model::reference::ReferenceModelProvider;
use std::env;
use std::path::Path;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let config_path = env::args().nth(1).ok_or_else(usage)?;
    let cfg = config::load_config(Path::new(&config_path)).map_err(|e| e.to_string())?;

    let report = run_from_config(&cfg, &ReferenceModelProvider).map_err(|e| e.to_string())?;

    match cfg.output.format {
        OutputFormat::Text => println!("{}", report.summary_text()),
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&report).map_err(|e| e.to_string())?
        ),
    }

    if let Some(path) = &cfg.output.json_out {
        write_json_file(path, &report).map_err(|e| e.to_string())?;
        if cfg.output.format == OutputFormat::Text {
            println!("\nJSON report written to {}", path.display());
        }
    }
    Ok(())
}

fn usage() -> String {
    "Usage: cascade_eval <config.json>".to_string()
}
