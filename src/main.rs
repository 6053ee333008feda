use std::io::{self, BufRead, Write as _};
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use persona_bench::analytics::{Analytics, ReportOutcome};
use persona_bench::config::{Config, SamplingConfig, SamplingPreset};
use persona_bench::ollama::OllamaClient;
use persona_bench::review::{ReviewSummary, ReviewWorkflow, TerminalReviewSource};
use persona_bench::runner::TestRunner;
use persona_bench::storage::{JsonFileStorage, Storage};

/// Test behavioral predictions of persona-conditioned local LLMs
#[derive(Parser, Debug)]
#[command(name = "persona-bench", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run model predictions for a persona against a question set
    Test {
        /// Path to the persona YAML file
        #[arg(short, long)]
        persona: PathBuf,

        /// Path to the questions YAML file
        #[arg(short, long)]
        questions: PathBuf,

        /// Ollama model name (e.g. llama3:8b)
        #[arg(short, long)]
        model: String,

        /// Sampling preset
        #[arg(short = 'c', long, value_enum, default_value = "balanced")]
        preset: SamplingPreset,

        /// Override temperature (0.0-1.0)
        #[arg(short, long)]
        temperature: Option<f64>,

        /// Override top_p sampling parameter
        #[arg(long)]
        top_p: Option<f64>,

        /// Restrict the run to specific question ids (repeatable)
        #[arg(long = "question")]
        question_ids: Vec<String>,
    },

    /// List persisted sessions with their review progress
    Sessions,

    /// Review test results interactively
    Review {
        /// Session to review; the first unreviewed session when omitted
        session_id: Option<String>,
    },

    /// Show per-question results for a session
    Results {
        session_id: String,
    },

    /// Generate analytics, comparisons, and exports
    Analyze {
        session_id: String,

        /// Additional session ids to compare against (repeatable)
        #[arg(short = 'C', long = "compare")]
        compare: Vec<String>,

        /// Export all results to a CSV file
        #[arg(long)]
        export_csv: Option<PathBuf>,

        /// Export the report to a JSON file
        #[arg(long)]
        export_json: Option<PathBuf>,
    },

    /// List models on the Ollama service, or pull one
    Models {
        /// Pull this model before listing
        #[arg(long)]
        pull: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    info!(version = env!("CARGO_PKG_VERSION"), "persona-bench starting");

    let ollama = OllamaClient::new(&config.ollama, config.request.clone())?;
    let storage: Arc<dyn Storage> = Arc::new(JsonFileStorage::new(&config.storage.results_dir)?);

    let exit_code = match cli.command {
        Commands::Test {
            persona,
            questions,
            model,
            preset,
            temperature,
            top_p,
            question_ids,
        } => {
            cmd_test(
                ollama,
                storage,
                persona,
                questions,
                model,
                preset,
                temperature,
                top_p,
                question_ids,
            )
            .await
        }
        Commands::Sessions => cmd_sessions(storage).await,
        Commands::Review { session_id } => cmd_review(storage, session_id).await,
        Commands::Results { session_id } => cmd_results(storage, &session_id).await,
        Commands::Analyze {
            session_id,
            compare,
            export_csv,
            export_json,
        } => cmd_analyze(storage, &session_id, compare, export_csv, export_json).await,
        Commands::Models { pull } => cmd_models(ollama, pull).await,
    };

    std::process::exit(exit_code);
}

#[allow(clippy::too_many_arguments)]
async fn cmd_test(
    ollama: OllamaClient,
    storage: Arc<dyn Storage>,
    persona: PathBuf,
    questions: PathBuf,
    model: String,
    preset: SamplingPreset,
    temperature: Option<f64>,
    top_p: Option<f64>,
    question_ids: Vec<String>,
) -> i32 {
    println!("{}", format!("Starting test with {}...", model).cyan());

    // No service connection is an unrecoverable setup failure
    if !ollama.check_connection().await {
        eprintln!("{}", "Error: cannot connect to Ollama.".red());
        eprintln!("Make sure it is running: {}", "ollama serve".cyan());
        return 1;
    }

    let available = match ollama.list_models().await {
        Ok(models) => models,
        Err(e) => {
            eprintln!("{}", format!("Error listing models: {}", e).red());
            return 1;
        }
    };

    if !available.contains(&model) {
        println!(
            "{}",
            format!("Model '{}' not found locally.", model).yellow()
        );
        if !available.is_empty() {
            println!("Available models: {}", available.join(", "));
        }
        if !confirm(&format!("Pull {} now?", model)) {
            return 1;
        }
        println!("Pulling {} (this may take a few minutes)...", model);
        if ollama.pull_model(&model).await {
            println!("{}", "Model downloaded.".green());
        } else {
            eprintln!("{}", "Failed to download model.".red());
            return 1;
        }
    }

    let mut sampling = SamplingConfig::preset(preset);
    if let Some(temperature) = temperature {
        sampling = sampling.with_temperature(temperature);
    }
    if let Some(top_p) = top_p {
        sampling = sampling.with_top_p(top_p);
    }
    println!(
        "{}",
        format!(
            "Sampling: temp={} top_p={}",
            sampling.temperature, sampling.top_p
        )
        .dimmed()
    );

    let runner = TestRunner::new(ollama, storage);
    let filter = if question_ids.is_empty() {
        None
    } else {
        Some(question_ids.as_slice())
    };

    match runner
        .run_test(&persona, &questions, &model, sampling, filter)
        .await
    {
        Ok(session) => {
            println!();
            println!("{}", "Test complete.".green());
            println!("Session ID: {}", session.session_id.cyan());
            println!("Questions tested: {}", session.results.len());
            println!(
                "Review results with: {}",
                format!("persona-bench review {}", session.session_id).cyan()
            );
            0
        }
        Err(e) => {
            eprintln!("{}", format!("Error running test: {}", e).red());
            1
        }
    }
}

async fn cmd_sessions(storage: Arc<dyn Storage>) -> i32 {
    let ids = match storage.list_ids().await {
        Ok(ids) => ids,
        Err(e) => {
            eprintln!("{}", format!("Error listing sessions: {}", e).red());
            return 1;
        }
    };

    if ids.is_empty() {
        println!("{}", "No test sessions found.".yellow());
        println!("Run a test first with: {}", "persona-bench test".cyan());
        return 0;
    }

    for id in ids {
        match storage.load(&id).await {
            Ok(Some(session)) => {
                let reviewed = session.reviewed_count();
                let total = session.results.len();
                let status = if total > 0 && reviewed == total {
                    "complete".green().to_string()
                } else if reviewed > 0 {
                    format!("partial ({}/{})", reviewed, total).yellow().to_string()
                } else {
                    format!("unreviewed ({})", total).red().to_string()
                };
                println!("{}  {}", id.cyan(), status);
            }
            Ok(None) => {}
            Err(e) => eprintln!("{}", format!("Skipping {}: {}", id, e).yellow()),
        }
    }
    0
}

async fn cmd_review(storage: Arc<dyn Storage>, session_id: Option<String>) -> i32 {
    let workflow = ReviewWorkflow::new(storage);
    let mut source = TerminalReviewSource::new();

    if session_id.is_none() {
        println!(
            "{}",
            "No session given; picking the first with unreviewed results.".dimmed()
        );
    }

    match workflow
        .review_session(session_id.as_deref(), &mut source)
        .await
    {
        Ok(ReviewSummary::NoSessions) => {
            println!("{}", "No unreviewed sessions found.".yellow());
            0
        }
        Ok(ReviewSummary::NotFound { session_id }) => {
            eprintln!("{}", format!("Session not found: {}", session_id).red());
            1
        }
        Ok(ReviewSummary::Completed {
            session_id,
            newly_reviewed,
            remaining,
            ..
        }) => {
            println!();
            if remaining == 0 {
                println!(
                    "{}",
                    format!("Review complete for {} ({} saved).", session_id, newly_reviewed)
                        .green()
                );
            } else {
                println!(
                    "{}",
                    format!(
                        "Stopped early: {} saved, {} still pending in {}.",
                        newly_reviewed, remaining, session_id
                    )
                    .yellow()
                );
            }
            0
        }
        Err(e) => {
            eprintln!("{}", format!("Error during review: {}", e).red());
            1
        }
    }
}

async fn cmd_results(storage: Arc<dyn Storage>, session_id: &str) -> i32 {
    let session = match storage.load(session_id).await {
        Ok(Some(session)) => session,
        Ok(None) => {
            eprintln!("{}", format!("Session not found: {}", session_id).red());
            return 1;
        }
        Err(e) => {
            eprintln!("{}", format!("Error loading session: {}", e).red());
            return 1;
        }
    };

    println!("Session:   {}", session.session_id.cyan());
    println!("Persona:   {}", session.persona_file);
    println!("Model:     {}", session.model);
    println!("Questions: {}", session.results.len());
    println!();

    for (index, result) in session.results.iter().enumerate() {
        let score = result
            .similarity_score
            .map(|s| s.to_string())
            .unwrap_or_else(|| "-".to_string());
        let status = if result.reviewed {
            "done".green().to_string()
        } else {
            "pending".yellow().to_string()
        };
        println!(
            "{:>3}  {:<24} {:<12} {:>5}  {}",
            index + 1,
            result.question_id,
            result.question_type,
            score,
            status
        );
    }

    let reviewed: Vec<f64> = session
        .results
        .iter()
        .filter(|r| r.has_reviewed_score())
        .filter_map(|r| r.similarity_score.map(f64::from))
        .collect();
    if !reviewed.is_empty() {
        let mean = reviewed.iter().sum::<f64>() / reviewed.len() as f64;
        println!();
        println!("Average similarity score: {:.2}/5.0", mean);
    }
    0
}

async fn cmd_analyze(
    storage: Arc<dyn Storage>,
    session_id: &str,
    compare: Vec<String>,
    export_csv: Option<PathBuf>,
    export_json: Option<PathBuf>,
) -> i32 {
    let analytics = Analytics::new(storage);

    match analytics.generate_report(session_id).await {
        Ok(Some(ReportOutcome::Report(report))) => {
            println!();
            println!("{}", format!("Analytics report: {}", session_id).cyan().bold());
            println!(
                "  Average similarity: {:.2}/5.0",
                report.overall.average_similarity
            );
            println!(
                "  Accuracy:           {:.1}%",
                report.overall.accuracy_percentage
            );
            println!(
                "  Score range:        {}..{}",
                report.overall.min_similarity, report.overall.max_similarity
            );
            println!(
                "  Reviewed:           {}/{}",
                report.reviewed_questions, report.total_questions
            );
            println!(
                "  Avg generation:     {:.2}s",
                report.performance.avg_generation_time_secs
            );
            println!(
                "  Avg tokens:         {:.0}",
                report.performance.avg_tokens_generated
            );

            if !report.by_question_type.is_empty() {
                println!();
                println!("  By question type:");
                for (question_type, mean) in &report.by_question_type {
                    println!(
                        "    {:<16} {:.2}/5.0 ({:.1}%)",
                        question_type,
                        mean,
                        mean / 5.0 * 100.0
                    );
                }
            }
        }
        Ok(Some(ReportOutcome::NoReviews { .. })) => {
            println!("{}", "No reviewed results to analyze.".yellow());
        }
        Ok(None) => {
            eprintln!("{}", format!("Session not found: {}", session_id).red());
            return 1;
        }
        Err(e) => {
            eprintln!("{}", format!("Error generating report: {}", e).red());
            return 1;
        }
    }

    if !compare.is_empty() {
        let mut all_ids = vec![session_id.to_string()];
        all_ids.extend(compare);

        match analytics.compare(&all_ids).await {
            Ok(comparison) if comparison.rows.is_empty() => {
                println!("{}", "No reviewed sessions to compare.".yellow());
            }
            Ok(comparison) => {
                println!();
                println!("{}", "Session comparison:".cyan().bold());
                for row in &comparison.rows {
                    println!(
                        "  {:<40} {:.2}/5.0  {:.1}%  {:.2}s  {}/{}",
                        row.session_id,
                        row.average_similarity,
                        row.accuracy_percentage,
                        row.avg_generation_time_secs,
                        row.reviewed_questions,
                        row.total_questions
                    );
                }
                if let Some(best) = comparison.best_accuracy_row() {
                    println!(
                        "{}",
                        format!(
                            "  Most accurate: {} ({:.1}%)",
                            best.model, best.accuracy_percentage
                        )
                        .green()
                    );
                }
                if let Some(fastest) = comparison.fastest_row() {
                    println!(
                        "{}",
                        format!(
                            "  Fastest: {} ({:.2}s)",
                            fastest.model, fastest.avg_generation_time_secs
                        )
                        .blue()
                    );
                }
            }
            Err(e) => {
                eprintln!("{}", format!("Error comparing sessions: {}", e).red());
                return 1;
            }
        }
    }

    if let Some(path) = export_csv {
        match analytics.export_csv(session_id, &path).await {
            Ok(true) => println!("CSV written to {}", path.display()),
            Ok(false) => {
                eprintln!("{}", format!("Session not found: {}", session_id).red());
                return 1;
            }
            Err(e) => {
                eprintln!("{}", format!("CSV export failed: {}", e).red());
                return 1;
            }
        }
    }

    if let Some(path) = export_json {
        match analytics.export_report_json(session_id, &path).await {
            Ok(true) => println!("Report written to {}", path.display()),
            Ok(false) => {
                eprintln!("{}", format!("Session not found: {}", session_id).red());
                return 1;
            }
            Err(e) => {
                eprintln!("{}", format!("JSON export failed: {}", e).red());
                return 1;
            }
        }
    }

    0
}

async fn cmd_models(ollama: OllamaClient, pull: Option<String>) -> i32 {
    if !ollama.check_connection().await {
        eprintln!("{}", "Error: cannot connect to Ollama.".red());
        return 1;
    }

    if let Some(model) = pull {
        println!("Pulling {} (this may take a few minutes)...", model);
        if ollama.pull_model(&model).await {
            println!("{}", "Model downloaded.".green());
        } else {
            eprintln!("{}", "Failed to download model.".red());
            return 1;
        }
    }

    match ollama.list_models().await {
        Ok(models) if models.is_empty() => {
            println!("{}", "No models installed.".yellow());
            0
        }
        Ok(models) => {
            for model in models {
                println!("{}", model);
            }
            0
        }
        Err(e) => {
            eprintln!("{}", format!("Error listing models: {}", e).red());
            1
        }
    }
}

fn confirm(prompt: &str) -> bool {
    print!("{} [y/N] ", prompt);
    if io::stdout().flush().is_err() {
        return false;
    }
    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line).is_err() {
        return false;
    }
    matches!(line.trim().to_lowercase().as_str(), "y" | "yes")
}

/// Initialize tracing/logging
fn init_logging(config: &Config) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format {
        persona_bench::config::LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        persona_bench::config::LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}
