use crate::server;
use clap::{Args, Parser, Subcommand};
use loan_intake::error::AppError;
use loan_intake::i18n::TranslationStore;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "Loan Intake Service",
    about = "Run the loan application intake service or inspect its translations",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Resolve a single translation key and print it
    Translate(TranslateArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

#[derive(Args, Debug)]
pub(crate) struct TranslateArgs {
    #[arg(long)]
    pub(crate) locale: String,
    #[arg(long)]
    pub(crate) namespace: String,
    /// Dotted key, e.g. `hero.title`
    #[arg(long)]
    pub(crate) key: String,
    /// Interpolation parameter as `name=value`; may be repeated
    #[arg(long = "param", value_parser = parse_param)]
    pub(crate) params: Vec<(String, String)>,
    #[arg(long, env = "LOCALES_DIR", default_value = "locales")]
    pub(crate) locales_dir: PathBuf,
    #[arg(long, env = "DEFAULT_LOCALE", default_value = "en")]
    pub(crate) default_locale: String,
}

fn parse_param(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(name, value)| (name.trim().to_string(), value.to_string()))
        .filter(|(name, _)| !name.is_empty())
        .ok_or_else(|| format!("expected name=value, got '{raw}'"))
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Translate(args) => {
            println!("{}", translate(&args)?);
            Ok(())
        }
    }
}

pub(crate) fn translate(args: &TranslateArgs) -> Result<String, AppError> {
    let store = TranslationStore::load(&args.locales_dir, args.default_locale.clone())?;
    let params: Vec<(&str, &str)> = args
        .params
        .iter()
        .map(|(name, value)| (name.as_str(), value.as_str()))
        .collect();
    Ok(store.translate(&args.locale, &args.namespace, &args.key, &params))
}
