use std::process::ExitCode;

use anyhow::Context;
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use inquire::{
    CustomType, InquireError, Text,
    validator::{ErrorMessage, Validation},
};
use weather_lookup_core::{
    Config, FormController, LookupError, NewRecord, SubmitOutcome, create_record,
    lookup::service_from_config, render_submission,
};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather-lookup", version, about = "Look up stored weather records")]
pub struct Cli {
    /// Service root URL; overrides the configured one for this run.
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Increase log verbosity (-v info, -vv debug).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Set the service URL and request timeout.
    Configure,

    /// Look up one record and print it.
    Show {
        /// ID returned when the record was created.
        id: String,

        /// Print the record JSON instead of the formatted report.
        #[arg(long)]
        raw: bool,
    },

    /// Interactive lookup form; press Esc to leave.
    Form,

    /// Store weather for a location and print the new record's ID.
    Create {
        /// Location name, e.g. "Paris".
        #[arg(long)]
        location: String,

        /// Date in YYYY-MM-DD form; defaults to today.
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Free-text notes kept with the record.
        #[arg(long, default_value = "")]
        notes: String,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<ExitCode> {
        let config = resolve_config(self.base_url, Config::load)?;

        match self.command {
            Command::Configure => configure(config),
            Command::Show { id, raw } => show(&config, id, raw).await,
            Command::Form => form(&config).await,
            Command::Create { location, date, notes } => {
                let record = NewRecord {
                    date: date.unwrap_or_else(|| Local::now().date_naive()),
                    location,
                    notes,
                };
                create(&config, &record).await
            }
        }
    }
}

/// Config for this run. With `--base-url` the config file is optional, so an
/// unreadable one is skipped instead of failing the command.
fn resolve_config(
    base_url: Option<String>,
    load: impl FnOnce() -> anyhow::Result<Config>,
) -> anyhow::Result<Config> {
    let Some(base_url) = base_url else {
        return load();
    };
    Config::check_base_url(&base_url)?;

    let mut config = load().unwrap_or_else(|err| {
        tracing::warn!(error = %err, "ignoring unreadable config file");
        Config::default()
    });
    config.base_url = base_url;

    Ok(config)
}

fn configure(mut config: Config) -> anyhow::Result<ExitCode> {
    let base_url = Text::new("Service URL:")
        .with_default(&config.base_url)
        .with_validator(|input: &str| {
            Ok(match Config::check_base_url(input) {
                Ok(()) => Validation::Valid,
                Err(err) => Validation::Invalid(ErrorMessage::Custom(err.to_string())),
            })
        })
        .prompt()?;

    let timeout_secs = CustomType::<u64>::new("Request timeout in seconds (0 = none):")
        .with_default(config.timeout_secs.unwrap_or(0))
        .with_error_message("Please enter a whole number of seconds")
        .prompt()?;

    config.base_url = base_url;
    config.timeout_secs = (timeout_secs > 0).then_some(timeout_secs);

    let path = config.save()?;
    println!("Configuration saved to {}", path.display());

    Ok(ExitCode::SUCCESS)
}

async fn show(config: &Config, id: String, raw: bool) -> anyhow::Result<ExitCode> {
    let controller = FormController::new(service_from_config(config)?);
    controller.update_field("ID", id)?;

    match controller.submit().await {
        SubmitOutcome::Completed(result) if raw && result.success => {
            println!("{}", result.raw_body.unwrap_or_default());
            Ok(ExitCode::SUCCESS)
        }
        SubmitOutcome::Completed(result) => {
            print!("{}", render_submission(&result));
            Ok(if result.success { ExitCode::SUCCESS } else { ExitCode::FAILURE })
        }
        SubmitOutcome::MissingId => {
            eprintln!("{}", LookupError::MissingId);
            Ok(ExitCode::FAILURE)
        }
        SubmitOutcome::Ignored => Ok(ExitCode::FAILURE),
    }
}

async fn form(config: &Config) -> anyhow::Result<ExitCode> {
    let controller = FormController::new(service_from_config(config)?);

    println!("Weather Data Lookup");
    println!("Submit an ID to retrieve stored weather data.\n");

    loop {
        // A failed lookup keeps the entered ID, so offer it again.
        let current = controller.state().id_value;
        let answer = Text::new("ID:")
            .with_placeholder("Please input an ID")
            .with_initial_value(&current)
            .with_validator(inquire::required!("Please input an ID"))
            .prompt_skippable();

        let id = match answer {
            Ok(Some(id)) => id,
            Ok(None) | Err(InquireError::OperationInterrupted) => break,
            Err(err) => return Err(err).context("Failed to read the lookup ID"),
        };

        controller.update_field("ID", id)?;
        match controller.submit().await {
            SubmitOutcome::Completed(result) => println!("\n{}", render_submission(&result)),
            SubmitOutcome::MissingId => println!("{}", LookupError::MissingId),
            SubmitOutcome::Ignored => {}
        }
    }

    Ok(ExitCode::SUCCESS)
}

async fn create(config: &Config, record: &NewRecord) -> anyhow::Result<ExitCode> {
    let service = service_from_config(config)?;

    match create_record(&service, record).await {
        Ok(id) => {
            println!("Weather record created: {id}");
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            eprintln!("{err}");
            Ok(ExitCode::FAILURE)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_show_with_global_flags() {
        let cli = Cli::try_parse_from([
            "weather-lookup",
            "show",
            "abc-123",
            "--raw",
            "--base-url",
            "http://127.0.0.1:9000",
            "-vv",
        ])
        .unwrap();

        assert_eq!(cli.base_url.as_deref(), Some("http://127.0.0.1:9000"));
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Command::Show { ref id, raw: true } if id == "abc-123"));
    }

    #[test]
    fn parses_create_date() {
        let cli = Cli::try_parse_from([
            "weather-lookup",
            "create",
            "--location",
            "Paris",
            "--date",
            "2024-01-01",
        ])
        .unwrap();

        match cli.command {
            Command::Create { location, date, notes } => {
                assert_eq!(location, "Paris");
                assert_eq!(date, NaiveDate::from_ymd_opt(2024, 1, 1));
                assert_eq!(notes, "");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn rejects_malformed_date() {
        let err = Cli::try_parse_from([
            "weather-lookup",
            "create",
            "--location",
            "Paris",
            "--date",
            "01/01/2024",
        ])
        .unwrap_err();

        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn base_url_override_survives_broken_config_file() {
        let config = resolve_config(Some("http://127.0.0.1:9000".into()), || {
            Err(anyhow::anyhow!("Failed to parse config file: config.toml"))
        })
        .unwrap();

        assert_eq!(config.base_url, "http://127.0.0.1:9000");
        assert_eq!(config.timeout_secs, None);
    }

    #[test]
    fn base_url_override_keeps_other_settings() {
        let config = resolve_config(Some("https://weather.example.com".into()), || {
            Ok(Config { base_url: "http://old:8000".into(), timeout_secs: Some(4) })
        })
        .unwrap();

        assert_eq!(config.base_url, "https://weather.example.com");
        assert_eq!(config.timeout_secs, Some(4));
    }

    #[test]
    fn broken_config_file_fails_without_override() {
        let err = resolve_config(None, || Err(anyhow::anyhow!("Failed to parse config file")))
            .unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn invalid_override_is_rejected() {
        let result = resolve_config(Some("ftp://example.com".into()), || Ok(Config::default()));
        assert!(result.is_err());
    }

    #[test]
    fn show_requires_an_id() {
        assert!(Cli::try_parse_from(["weather-lookup", "show"]).is_err());
    }
}
