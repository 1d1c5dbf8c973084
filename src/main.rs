use clap::{Parser, Subcommand, ValueEnum};
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use testpilot::browser::{BrowserLauncher, MockBrowser, MockSite, PlaywrightBridge};
use testpilot::config;
use testpilot::interpreter::{Interpretation, Interpreter};
use testpilot::protocol::{ChatMessageRequest, ExecuteRequest};
use testpilot::runner::{JobStatus, TestResult, TestRunner};
use testpilot::session::{Session, cleanup_old_sessions};
use testpilot::{BrowserKind, TestOptions, TestService, TestType};

/// testpilot - Natural-language UI and API testing
#[derive(Parser, Debug)]
#[command(
    name = "testpilot",
    about = "Turn plain-English test requests into browser and API tests",
    after_help = "ENVIRONMENT VARIABLES:\n\
        TESTPILOT_WORKERS        Background workers for queued tests\n\
        TESTPILOT_NODE           Node.js binary for the Playwright bridge\n\
        TESTPILOT_NODE_PATH      NODE_PATH used to resolve the playwright package\n\
        TESTPILOT_API_BASE       Host for API prompts that only name a path\n\
        TESTPILOT_HTTP_TIMEOUT   API request timeout in seconds\n\
        TESTPILOT_ARTIFACT_DIR   Base directory for runs saved with --save\n\
        TESTPILOT_ARTIFACT_RETENTION_HOURS  Age after which saved runs are pruned\n\
        TESTPILOT_LOG            Log filter (e.g. debug, testpilot=trace)"
)]
struct Args {
    /// Browser backend: a real engine through Playwright, or the in-memory mock
    #[arg(long, global = true, env = "TESTPILOT_BACKEND", value_enum, default_value = "playwright")]
    backend: Backend,

    /// Number of background workers
    #[arg(long, global = true, env = "TESTPILOT_WORKERS")]
    workers: Option<usize>,

    /// Output results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Backend {
    Playwright,
    Mock,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show how a prompt is interpreted without running anything
    Interpret {
        prompt: String,
    },

    /// Send a chat message; test requests are queued in the background
    Chat {
        prompt: String,

        /// Wait for the queued test and print its result
        #[arg(long)]
        wait: bool,
    },

    /// Run a test synchronously and print the result
    Run {
        prompt: String,

        /// Test type: ui, api or mixed (default: ui)
        #[arg(long, value_parser = parse_test_type)]
        test_type: Option<TestType>,

        /// Target URL (default: extracted from the prompt)
        #[arg(long)]
        url: Option<String>,

        /// Browser engine: chromium, firefox or webkit
        #[arg(long, value_parser = parse_browser)]
        browser: Option<BrowserKind>,

        /// Show the browser window
        #[arg(long)]
        headed: bool,

        /// Navigation timeout in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Save screenshots, script and result JSON to this directory
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Save artifacts under the artifact directory, pruning expired runs
        #[arg(long, conflicts_with = "output")]
        save: bool,
    },

    /// Queue one prompt per line, wait for all and print a summary
    Batch {
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    init_tracing();

    let Some(command) = args.command else {
        println!("testpilot - Natural-language UI and API testing");
        println!();
        println!("Usage: testpilot <COMMAND>");
        println!();
        println!("Commands:");
        println!("  interpret  Show how a prompt is interpreted");
        println!("  chat       Send a chat message (tests run in the background)");
        println!("  run        Run a test synchronously");
        println!("  batch      Queue prompts from a file and summarize results");
        println!();
        println!("Run with --help for more information.");
        return Ok(());
    };

    let service = build_service(args.backend, args.workers);

    match command {
        Commands::Interpret { prompt } => {
            let interpretation = service.interpreter().interpret(&prompt);
            if args.json {
                println!("{}", serde_json::to_string_pretty(&interpretation)?);
            } else {
                match interpretation {
                    Interpretation::Conversation(reply) => println!("{}", reply),
                    Interpretation::Test(intent) => {
                        println!("Test type: {}", intent.test_type);
                        if let Some(url) = &intent.target_url {
                            println!("Target:    {}", url);
                        }
                        println!("Actions:");
                        for (index, action) in intent.actions.iter().enumerate() {
                            println!("  {}. {}", index + 1, action.describe());
                        }
                    }
                }
            }
        }

        Commands::Chat { prompt, wait } => {
            let reply = service.handle_chat(&ChatMessageRequest { content: prompt });
            if args.json {
                println!("{}", serde_json::to_string_pretty(&reply)?);
            } else {
                println!("{}", reply.content);
                if let Some(test_id) = reply.test_id() {
                    println!("Test id: {}", test_id);
                }
            }

            if let (true, Some(test_id)) = (wait, reply.test_id()) {
                let result = service.wait_for(test_id).await;
                print_result(&result, args.json)?;
            }
        }

        Commands::Run {
            prompt,
            test_type,
            url,
            browser,
            headed,
            timeout_ms,
            output,
            save,
        } => {
            let mut options = TestOptions::default();
            if let Some(browser) = browser {
                options.browser = browser;
            }
            options.headless = !headed;
            if let Some(timeout_ms) = timeout_ms {
                options.timeout_ms = timeout_ms;
            }

            let result = service
                .execute(ExecuteRequest {
                    prompt,
                    test_type,
                    target_url: url,
                    options: Some(options),
                })
                .await;
            print_result(&result, args.json)?;

            let session = match output {
                Some(dir) => Some(Session::in_dir(dir)),
                None if save => {
                    let pruned =
                        cleanup_old_sessions(config::artifact_dir(), config::artifact_retention())?;
                    if pruned > 0 {
                        tracing::info!(pruned, "removed expired saved runs");
                    }
                    Some(Session::for_test(&result.test_id))
                }
                None => None,
            };
            if let Some(session) = session {
                let written = session.save_result(&result)?;
                if !args.json {
                    println!("\nSaved {} files to {}", written.len(), session.dir.display());
                }
            }
        }

        Commands::Batch { file } => {
            let contents = std::fs::read_to_string(&file)?;
            let prompts: Vec<&str> = contents
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#'))
                .collect();

            let ids: Vec<_> = prompts
                .iter()
                .map(|prompt| service.submit(ExecuteRequest::new(*prompt)))
                .collect();

            let mut results = Vec::with_capacity(ids.len());
            let mut skipped = Vec::new();
            for (prompt, id) in prompts.iter().zip(&ids) {
                match id {
                    Some(id) => results.push((*prompt, service.wait_for(id).await)),
                    None => skipped.push(*prompt),
                }
            }

            if args.json {
                let results: Vec<&TestResult> = results.iter().map(|(_, r)| r).collect();
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else {
                let passed = results.iter().filter(|(_, r)| r.success()).count();
                for (prompt, result) in &results {
                    println!(
                        "  [{}] {} ({:.2}s) {}",
                        result.status,
                        result.test_id,
                        result.execution_time.as_secs_f64(),
                        prompt
                    );
                }
                for prompt in &skipped {
                    println!("  [skipped] not a test request: {}", prompt);
                }
                println!("\n{} of {} tests passed", passed, results.len());
            }
        }
    }

    service.shutdown().await;
    Ok(())
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_new(&config::get().log_filter)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config::DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn build_service(backend: Backend, workers: Option<usize>) -> TestService {
    let launcher: Arc<dyn BrowserLauncher> = match backend {
        Backend::Playwright => Arc::new(PlaywrightBridge::default()),
        Backend::Mock => Arc::new(MockBrowser::new(MockSite::default())),
    };
    let workers = workers.filter(|n| *n > 0).unwrap_or_else(config::workers);
    TestService::start(TestRunner::new(launcher), workers)
}

fn print_result(result: &TestResult, json: bool) -> Result<(), Box<dyn Error>> {
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
        return Ok(());
    }

    println!(
        "Test {} {} in {:.2}s",
        result.test_id,
        result.status,
        result.execution_time.as_secs_f64()
    );
    if let Some(error) = &result.error {
        println!("  Error: {}", error);
    }
    for (index, step) in result.steps.iter().enumerate() {
        let marker = if step.succeeded() { "ok" } else { "FAILED" };
        println!("  {}. {} [{}]", index + 1, step.action, marker);
        for log in &step.logs {
            println!("       {}", log);
        }
    }
    if result.status != JobStatus::NotFound {
        println!("\nGenerated script:\n{}", result.generated_script);
    }
    Ok(())
}

fn parse_test_type(value: &str) -> Result<TestType, String> {
    match value.to_ascii_lowercase().as_str() {
        "ui" => Ok(TestType::Ui),
        "api" => Ok(TestType::Api),
        "mixed" => Ok(TestType::Mixed),
        other => Err(format!("unknown test type '{}'. Use: ui, api or mixed", other)),
    }
}

fn parse_browser(value: &str) -> Result<BrowserKind, String> {
    match value.to_ascii_lowercase().as_str() {
        "chromium" | "chrome" => Ok(BrowserKind::Chromium),
        "firefox" => Ok(BrowserKind::Firefox),
        "webkit" | "safari" => Ok(BrowserKind::Webkit),
        other => Err(format!(
            "unknown browser '{}'. Use: chromium, firefox or webkit",
            other
        )),
    }
}
