use std::io;

use tokio::runtime::{Builder, Runtime};
use tracing::info;

use crate::cli::forms::{DialoguerInteraction, FormInteraction, FormRunner, RunResult, ScriptedInteraction};
use crate::cli::output::{self, OutputPreferences};
use crate::cli::{CommandError, CommandResult};
use crate::config::{Config, ConfigManager};
use crate::core::FormController;
use crate::sharepoint::http::SpHttpClient;

const SCRIPT_ENV: &str = "CW_FORM_CLI_SCRIPT";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CliMode {
    Interactive,
    Script,
}

impl CliMode {
    fn from_env() -> Self {
        if std::env::var_os(SCRIPT_ENV).is_some() {
            CliMode::Script
        } else {
            CliMode::Interactive
        }
    }
}

/// Entry point of `cw_form_cli`; `args` excludes the program name.
pub fn run_cli(args: Vec<String>) -> CommandResult {
    let mode = CliMode::from_env();
    output::set_preferences(OutputPreferences {
        plain: mode == CliMode::Script,
    });

    let tokens: Vec<&str> = args.iter().map(String::as_str).collect();
    match tokens.as_slice() {
        [] | ["fill"] => run_fill(mode),
        ["config", "show"] => show_config(),
        ["config", "init", site, lookup, form] => init_config(site, lookup, form),
        ["config", ..] => Err(CommandError::InvalidArguments(
            "usage: cw_form_cli config show | config init <site-url> <lookup-list-url> <form-list-url>"
                .into(),
        )),
        ["help"] | ["--help"] | ["-h"] => {
            print_usage();
            Ok(())
        }
        [other, ..] => Err(CommandError::InvalidArguments(format!(
            "unknown command `{other}`; run `cw_form_cli help`"
        ))),
    }
}

fn run_fill(mode: CliMode) -> CommandResult {
    let config = ConfigManager::new()?.load()?.with_env_overrides();
    let api = SpHttpClient::from_config(&config)?;
    let mut controller = FormController::from_config(api, &config);
    let runtime = build_runtime()?;

    let result = match mode {
        CliMode::Interactive => drive(&mut controller, &runtime, &mut DialoguerInteraction::new()),
        CliMode::Script => {
            let stdin = io::stdin();
            let mut scripted = ScriptedInteraction::new(stdin.lock());
            drive(&mut controller, &runtime, &mut scripted)
        }
    };

    match result {
        RunResult::Submitted(record) => {
            info!(student = %record.student_name, "form submitted");
            Ok(())
        }
        RunResult::Cancelled => {
            output::info("Form closed without submitting.");
            Ok(())
        }
        RunResult::LookupUnavailable => Err(CommandError::Message(
            "lookup data could not be loaded; the form is unavailable".into(),
        )),
    }
}

fn drive<I: FormInteraction>(
    controller: &mut FormController<SpHttpClient>,
    runtime: &Runtime,
    interaction: &mut I,
) -> RunResult {
    FormRunner::new(controller, runtime).run(interaction)
}

fn build_runtime() -> Result<Runtime, CommandError> {
    Ok(Builder::new_current_thread().enable_all().build()?)
}

fn show_config() -> CommandResult {
    let manager = ConfigManager::new()?;
    let config = manager.load()?;
    output::section("Configuration");
    for line in describe_config(&config) {
        output::detail(line);
    }
    output::detail(format!("file: {}", manager.path().display()));
    Ok(())
}

fn describe_config(config: &Config) -> Vec<String> {
    let token = match &config.access_token {
        Some(_) => "********",
        None => "(none)",
    };
    vec![
        format!("site_url: {}", config.site_url),
        format!("lookup_list_url: {}", config.lookup_list_url),
        format!("form_list_url: {}", config.form_list_url),
        format!("access_token: {token}"),
        format!("request_timeout_secs: {}", config.request_timeout_secs),
        format!("people_search_min_chars: {}", config.people_search_min_chars),
    ]
}

fn init_config(site: &str, lookup: &str, form: &str) -> CommandResult {
    let manager = ConfigManager::new()?;
    let config = match manager.exists().then(|| manager.load()) {
        Some(Ok(existing)) => with_urls(existing, site, lookup, form),
        Some(Err(err)) => {
            output::warning(format!("Existing configuration ignored: {err}"));
            Config::new(site, lookup, form)
        }
        None => Config::new(site, lookup, form),
    };
    manager.save(&config)?;
    output::success(format!("Configuration saved to {}", manager.path().display()));
    Ok(())
}

/// Replaces the endpoints, keeping token and limits.
fn with_urls(mut config: Config, site: &str, lookup: &str, form: &str) -> Config {
    config.site_url = site.to_string();
    config.lookup_list_url = lookup.to_string();
    config.form_list_url = form.to_string();
    config
}

fn print_usage() {
    output::section("cw_form_cli");
    output::detail("fill                      Fill in and submit a cancel / withdrawal request (default)");
    output::detail("config show               Print the stored configuration");
    output::detail("config init <site> <lookup-list> <form-list>");
    output::detail("                          Store connection settings");
    output::detail("help                      Show this message");
    output::detail("While filling: blank keeps the current value, :back, :help, :cancel");
}
