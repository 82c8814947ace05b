use shader_forge::{MainLoop, NagaCompiler, PipelineConfig, RunError, run_once};
use std::process::ExitCode;
use std::sync::Arc;

const USAGE: &str = "usage: shader-forge <config.json> [--watch|-w]";

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut config_path = None;
    let mut watch = false;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--watch" | "-w" => watch = true,
            "--help" | "-h" => {
                println!("{USAGE}");
                return ExitCode::SUCCESS;
            }
            _ if config_path.is_none() => config_path = Some(arg),
            _ => {
                eprintln!("unexpected argument '{arg}'\n{USAGE}");
                return ExitCode::from(2);
            }
        }
    }

    let Some(config_path) = config_path else {
        eprintln!("Please provide the path to the configuration JSON file.\n{USAGE}");
        return ExitCode::from(2);
    };

    let config = match PipelineConfig::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::from(2);
        }
    };

    println!("Input folder: {}", config.input_dir.display());
    println!("Template folder: {}", config.template_dir.display());
    println!("Output folder: {}", config.output_dir.display());
    println!();

    if watch {
        watch_forever(Arc::new(config))
    } else {
        build_once(&config)
    }
}

fn build_once(config: &PipelineConfig) -> ExitCode {
    match run_once(config, || Ok(NagaCompiler::new())) {
        Ok(report) => {
            for output in report.failed_outputs() {
                if let Err(e) = &output.result {
                    eprintln!("{}: {}", output.template, e);
                }
            }
            println!("Done!");
            ExitCode::SUCCESS
        }
        Err(RunError::Acquire(e)) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
        Err(RunError::Build(e)) => {
            eprintln!("Build failed: {e}");
            ExitCode::FAILURE
        }
    }
}

fn watch_forever(config: Arc<PipelineConfig>) -> ExitCode {
    let main_loop = MainLoop::new(config);
    if let Err(e) = main_loop.watch() {
        eprintln!("{e}");
        return ExitCode::FAILURE;
    }

    let shutdown = main_loop.shutdown_handle();
    if let Err(e) = ctrlc::set_handler(move || {
        println!("Shutting down...");
        shutdown.request();
    }) {
        log::warn!("Cannot install interrupt handler: {}", e);
    }

    println!("Shader hot reloading enabled (Ctrl+C to stop)");
    match main_loop.run(|| Ok(NagaCompiler::new()), |_, _| {}) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}
