//! CLI binary for running and validating askflow question scripts.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};

use askflow_engine::{
    AutoPrompter, ConsolePrompter, Engine, GroupKeyStyle, Manifest, Prompter, ResolverConfig,
    ScriptedPrompter, Severity, DEFAULT_ANSWER_FIELD,
};

#[derive(Parser)]
#[command(name = "askflow", version, about = "Ask branching question scripts from a JSON manifest")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask every question in a script and print the answers as JSON
    Run {
        /// Path to the manifest .json file
        #[arg(short, long)]
        manifest: PathBuf,

        /// Path to the script .json file
        #[arg(short, long)]
        script: PathBuf,

        /// Answer every question with its default instead of prompting
        #[arg(long, conflicts_with = "answers")]
        auto: bool,

        /// Read answers from a JSON object of identifier -> answer
        #[arg(long)]
        answers: Option<PathBuf>,

        /// Key holding a pivot's own answer inside its fork result
        #[arg(long, default_value = DEFAULT_ANSWER_FIELD)]
        answer_field: String,

        /// How group results are keyed
        #[arg(long, value_enum, default_value_t = GroupKeys::Positional)]
        group_keys: GroupKeys,

        /// Print the result on a single line
        #[arg(long)]
        compact: bool,
    },

    /// Lint a script against a manifest
    Validate {
        /// Path to the manifest .json file
        #[arg(short, long)]
        manifest: PathBuf,

        /// Path to the script .json file
        #[arg(short, long)]
        script: PathBuf,

        /// Key holding a pivot's own answer inside its fork result
        #[arg(long, default_value = DEFAULT_ANSWER_FIELD)]
        answer_field: String,
    },

    /// List the questions in a manifest
    Info {
        /// Path to the manifest .json file
        #[arg(short, long)]
        manifest: PathBuf,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum GroupKeys {
    /// `#<index>` of the group among its siblings
    Positional,
    /// `#` plus the group's question identifiers joined with commas
    Joined,
}

impl From<GroupKeys> for GroupKeyStyle {
    fn from(keys: GroupKeys) -> Self {
        match keys {
            GroupKeys::Positional => GroupKeyStyle::Positional,
            GroupKeys::Joined => GroupKeyStyle::Joined,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries the result JSON
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run {
            manifest,
            script,
            auto,
            answers,
            answer_field,
            group_keys,
            compact,
        } => {
            let config = ResolverConfig {
                answer_field,
                group_keys: group_keys.into(),
            };
            cmd_run(&manifest, &script, auto, answers.as_deref(), config, compact).await?;
        }
        Commands::Validate {
            manifest,
            script,
            answer_field,
        } => {
            cmd_validate(&manifest, &script, &answer_field)?;
        }
        Commands::Info { manifest } => {
            cmd_info(&manifest)?;
        }
    }

    Ok(())
}

fn load_json(path: &Path) -> anyhow::Result<serde_json::Value> {
    let source = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&source)?)
}

fn select_prompter(auto: bool, answers: Option<&Path>) -> anyhow::Result<Arc<dyn Prompter>> {
    if let Some(path) = answers {
        let preset = ScriptedPrompter::from_value(load_json(path)?)?;
        tracing::info!(path = %path.display(), "Using scripted answers");
        return Ok(Arc::new(preset));
    }
    if auto {
        tracing::info!("Answering with defaults");
        return Ok(Arc::new(AutoPrompter));
    }
    Ok(Arc::new(ConsolePrompter::stdio()))
}

async fn cmd_run(
    manifest_path: &Path,
    script_path: &Path,
    auto: bool,
    answers: Option<&Path>,
    config: ResolverConfig,
    compact: bool,
) -> anyhow::Result<()> {
    let manifest = Manifest::load(manifest_path)?;
    let script = askflow_engine::load_script(script_path)?;
    let prompter = select_prompter(auto, answers)?;

    let engine = Engine::new(manifest)
        .with_prompter(prompter)
        .with_config(config);
    let tree = engine.ask(&script).await?;

    let rendered = if compact {
        serde_json::to_string(&tree)?
    } else {
        serde_json::to_string_pretty(&tree)?
    };
    println!("{}", rendered);
    Ok(())
}

fn cmd_validate(manifest_path: &Path, script_path: &Path, answer_field: &str) -> anyhow::Result<()> {
    let manifest = Manifest::load(manifest_path)?;
    let script = askflow_engine::load_script(script_path)?;
    let directives = askflow_engine::classify_all(&script)?;
    let diagnostics =
        askflow_engine::validate_with_answer_field(&directives, &manifest, answer_field);

    if diagnostics.is_empty() {
        println!("Script is valid");
        return Ok(());
    }

    let mut has_error = false;
    for diag in &diagnostics {
        let severity = match diag.severity {
            Severity::Error => {
                has_error = true;
                "ERROR"
            }
            Severity::Warning => "WARN",
            Severity::Info => "INFO",
        };
        println!("[{}] {}: {}", severity, diag.rule, diag.message);
        if let Some(ref fix) = diag.fix {
            println!("        fix: {}", fix);
        }
    }

    if has_error {
        std::process::exit(1);
    }
    Ok(())
}

fn cmd_info(manifest_path: &Path) -> anyhow::Result<()> {
    let manifest = Manifest::load(manifest_path)?;

    println!("Manifest: {}", manifest_path.display());
    println!("Questions: {}", manifest.len());

    println!("\nQuestions:");
    for (name, spec) in manifest.questions() {
        let kind = spec.get("type").and_then(|t| t.as_str()).unwrap_or("input");
        let message = spec.get("message").and_then(|m| m.as_str()).unwrap_or("");
        println!("  {} [{}] {}", name, kind, message);
    }
    let malformed = manifest.len() - manifest.questions().count();
    if malformed > 0 {
        println!("\n{} entries are not question objects and cannot be asked", malformed);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_defaults() {
        let cli = Cli::parse_from(["askflow", "run", "-m", "m.json", "-s", "s.json"]);
        match cli.command {
            Commands::Run {
                auto,
                answers,
                answer_field,
                group_keys,
                compact,
                ..
            } => {
                assert!(!auto);
                assert!(answers.is_none());
                assert_eq!(answer_field, "_answer");
                assert_eq!(group_keys, GroupKeys::Positional);
                assert!(!compact);
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn auto_conflicts_with_answers() {
        let result = Cli::try_parse_from([
            "askflow", "run", "-m", "m.json", "-s", "s.json", "--auto", "--answers", "a.json",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn group_keys_map_to_engine_style() {
        assert_eq!(GroupKeyStyle::from(GroupKeys::Joined), GroupKeyStyle::Joined);
        assert_eq!(GroupKeyStyle::from(GroupKeys::Positional), GroupKeyStyle::Positional);
    }
}
