use clap::{Parser, Subcommand};
use midi_cleaner::analysis::{analyze_file, detect_dominant_track_type, suggest_thresholds};
use midi_cleaner::presets::{apply_preset, list_presets, suggest_preset};
use midi_cleaner::qa::score_midi;
use midi_cleaner::tuner::{TuningRegistry, TuningState};
use midi_cleaner::{validate_input, Config, MidiCleaner};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// MIDI Cleaner
#[derive(Parser)]
#[command(name = "midi-cleaner")]
#[command(about = "Clean up AI-transcribed MIDI files for notation software")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the cleaning pipeline on a MIDI file
    Clean {
        /// Input MIDI file
        input: PathBuf,

        /// Output MIDI file (defaults to <input>_cleaned.mid)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Custom configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Preset applied on top of the configuration
        #[arg(long)]
        preset: Option<String>,

        /// Write the pipeline report as JSON
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Print the quality score and metrics of a MIDI file
    Score {
        /// Input MIDI file
        input: PathBuf,
    },
    /// Show per-track information and suggestions
    Inspect {
        /// Input MIDI file
        input: PathBuf,
    },
    /// Search for the best cleaning parameters
    Tune {
        /// Input MIDI file
        input: PathBuf,

        /// Maximum number of trials (1-100)
        #[arg(long, default_value_t = 40)]
        max_trials: usize,

        /// Write the file cleaned with the best configuration
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write the best configuration as JSON
        #[arg(long)]
        save_config: Option<PathBuf>,
    },
    /// Validate configuration file
    ValidateConfig {
        /// Configuration file to validate
        config: PathBuf,
    },
    /// Show default configuration
    ShowConfig,
    /// List built-in presets
    Presets,
}

fn init_logging(verbose: bool, quiet: bool) {
    let default_level = if verbose {
        "debug"
    } else if quiet {
        "error"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn default_output(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    input.with_file_name(format!("{}_cleaned.mid", stem))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.verbose && cli.quiet {
        anyhow::bail!("Cannot specify both --verbose and --quiet");
    }
    init_logging(cli.verbose, cli.quiet);
    let quiet = cli.quiet;

    match cli.command {
        Commands::Clean {
            input,
            output,
            config,
            preset,
            report,
        } => {
            let mut config = if let Some(config_path) = config {
                midi_cleaner::config::load_config(config_path)?
            } else {
                Config::default()
            };
            if let Some(preset) = preset {
                config = apply_preset(&config, &preset)?;
            }

            let file = validate_input(&input, &config)?;
            let output = output.unwrap_or_else(|| default_output(&input));

            if !quiet {
                println!("Processing {}...", input.display());
            }

            let result = MidiCleaner::new(config).process(&file)?;
            result.file.save(&output)?;

            if let Some(report_path) = report {
                std::fs::write(&report_path, serde_json::to_string_pretty(&result.report)?)?;
            }

            if !quiet {
                println!(
                    "Notes: {} -> {}, score {:.4} -> {:.4}",
                    result.report.input_metrics.total_notes,
                    result.report.output_metrics.total_notes,
                    result.report.input_metrics.score,
                    result.report.output_metrics.score
                );
                println!("Results saved to {}", output.display());
            }
        }
        Commands::Score { input } => {
            let file = validate_input(&input, &Config::default())?;
            let (score, metrics) = score_midi(&file);
            let json = serde_json::json!({ "score": score, "metrics": metrics });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        Commands::Inspect { input } => {
            let file = validate_input(&input, &Config::default())?;
            let dominant = detect_dominant_track_type(&file);
            let json = serde_json::json!({
                "ticksPerBeat": file.ticks_per_beat,
                "timeSignature": file.time_signature(),
                "tracks": analyze_file(&file),
                "dominantTrackType": dominant,
                "suggestedPreset": suggest_preset(dominant),
                "suggestedThresholds": suggest_thresholds(dominant),
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        Commands::Tune {
            input,
            max_trials,
            output,
            save_config,
        } => {
            let file = validate_input(&input, &Config::default())?;
            let registry = TuningRegistry::new();
            let session = input.display().to_string();
            let started = registry.start(&session, file.clone(), max_trials, None)?;

            if !quiet {
                println!("Tuning {} ({} trials max)...", input.display(), started.max_trials);
            }

            let mut reported = 0;
            while registry.is_running(&session) {
                std::thread::sleep(Duration::from_millis(200));
                let status = registry.status(&session);
                if !quiet && status.current_trial > reported {
                    reported = status.current_trial;
                    println!(
                        "  trial {}/{} best={:.4}",
                        status.current_trial,
                        status.total_trials,
                        status.best_score.unwrap_or(0.0)
                    );
                }
            }

            let status = registry
                .wait(&session)
                .ok_or_else(|| anyhow::anyhow!("tuning session vanished"))?;

            if status.status == TuningState::Error {
                let message = status
                    .error
                    .map(|e| format!("{}: {}", e.kind, e.message))
                    .unwrap_or_else(|| "unknown error".to_string());
                anyhow::bail!("Tuning failed - {}", message);
            }

            let best_config = status.best_config.clone().unwrap_or_default();
            if !quiet {
                println!(
                    "Best score {:.4} ({})",
                    status.best_score.unwrap_or(0.0),
                    status.stop_reason.as_deref().unwrap_or("")
                );
                println!("{}", serde_json::to_string_pretty(&status.best_params)?);
            }

            if let Some(config_path) = save_config {
                midi_cleaner::config::save_config(&best_config, config_path)?;
            }
            if let Some(output) = output {
                let result = MidiCleaner::new(best_config).process(&file)?;
                result.file.save(&output)?;
                if !quiet {
                    println!("Results saved to {}", output.display());
                }
            }
        }
        Commands::ValidateConfig { config } => {
            let config = midi_cleaner::config::load_config(config)?;
            println!("Configuration is valid");
            if let Ok(json) = serde_json::to_string_pretty(&config) {
                println!("{}", json);
            }
        }
        Commands::ShowConfig => {
            let config = Config::default();
            let json = serde_json::to_string_pretty(&config)?;
            println!("{}", json);
        }
        Commands::Presets => {
            let json = serde_json::to_string_pretty(&list_presets())?;
            println!("{}", json);
        }
    }

    Ok(())
}
