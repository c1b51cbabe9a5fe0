use clap::Parser;
use formfill::{provider_for, Engine, EngineOptions, FormSpec, Secrets};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "formfill")]
#[command(about = "Declarative form auto-filler")]
#[command(version)]
struct Cli {
    /// Form spec file (JSON) to run
    spec: PathBuf,

    /// Run Chrome with a visible window
    #[arg(long)]
    browser: bool,

    /// Only source environment variables starting with this prefix
    #[arg(long, value_name = "PREFIX")]
    secret: Option<String>,

    /// Set a secret (can be used multiple times)
    #[arg(short = 'P', long = "param", value_name = "NAME=VALUE")]
    params: Vec<String>,

    /// Verbose output (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode (only errors)
    #[arg(short, long)]
    quiet: bool,

    /// Validate the spec without opening a browser
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> formfill::Result<()> {
    let cli = Cli::parse();

    let level = if cli.quiet {
        Level::ERROR
    } else {
        match cli.verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            _ => Level::DEBUG,
        }
    };

    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    // Spec and provider are resolved before any browser session exists.
    let spec = FormSpec::load(&cli.spec)?;
    let provider = provider_for(&spec)?;

    if cli.check {
        println!("Spec valid: {}", cli.spec.display());
        println!("  Provider: {}", provider.name());
        println!("  URL: {}", spec.url);
        println!("  Login steps: {}", spec.login.len());
        println!("  Pages: {}", spec.pages.len());
        println!("  Scripted answers: {}", spec.question_count());
        return Ok(());
    }

    let secrets = Secrets::new()
        .with_env_filtered(cli.secret.as_deref())
        .with_args(&cli.params)?;

    let opts = EngineOptions {
        headless: !cli.browser,
        ..Default::default()
    };

    let mut engine = Engine::launch(opts).await?;
    // Close the session on every exit path before propagating the outcome.
    let outcome = engine.run(&spec, &secrets).await;
    let closed = engine.close().await;
    let result = outcome?;
    closed?;

    println!();
    println!("✓ Done");
    println!("  Pages: {}", result.pages);
    println!("  Questions answered: {}", result.questions_answered);
    println!("  Duration: {}ms", result.duration_ms);

    Ok(())
}
