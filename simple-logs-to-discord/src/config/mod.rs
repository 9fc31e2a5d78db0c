//! Command-line and environment configuration.
//!
//! Every setting can be given as a flag or through its environment variable.
//! Validation collects all problems before failing so they can be reported
//! together.

use std::sync::Arc;

use clap::Parser;

use crate::matcher::Pattern;
use crate::notification::{DEFAULT_USERNAME, DiscordConfig};
use crate::pipeline::PipelineConfig;
use crate::source::{CONTAINER_PREFIX, SourceDescriptor};
use crate::{Error, Result};

/// Every webhook URL must start with this.
pub const WEBHOOK_URL_PREFIX: &str = "https://discord.com/api/webhooks/";

/// Template used when none is configured.
pub const DEFAULT_TEMPLATE: &str = "{line}";

/// CLI arguments. All values are optional at parse time and checked by
/// [`Config::from_args`].
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "simple-logs-to-discord")]
#[command(version)]
#[command(about = "Tail a log file or container and post matching lines to a Discord webhook")]
pub struct Args {
    /// File to follow, or `docker:<container>` to follow a container's logs
    #[arg(long = "log-source", env = "LOG_SOURCE")]
    pub log_source: Option<String>,

    /// JSON array of regular expressions, tried in order
    #[arg(long = "patterns", env = "PATTERNS")]
    pub patterns: Option<String>,

    /// Discord webhook URL
    #[arg(long = "discord-webhook", env = "DISCORD_WEBHOOK", hide_env_values = true)]
    pub discord_webhook: Option<String>,

    /// Message template; supports {line}, {pattern}, {source} and named captures
    #[arg(long = "message-template", env = "MESSAGE_TEMPLATE")]
    pub message_template: Option<String>,

    /// Display name for the webhook messages
    #[arg(long = "bot-username", env = "BOT_USERNAME")]
    pub bot_username: Option<String>,

    /// Log filter directive (e.g. "simple_logs_to_discord=debug")
    #[arg(long = "log-filter", env = "RUST_LOG")]
    pub log_filter: Option<String>,

    /// Enable debug logging
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

/// Validated, immutable configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub source: SourceDescriptor,
    /// The source string as configured, used for `{source}`.
    pub source_label: String,
    pub patterns: Vec<Pattern>,
    pub webhook_url: String,
    pub message_template: String,
    pub bot_username: String,
}

fn trimmed(value: Option<&str>) -> &str {
    value.map(str::trim).unwrap_or("")
}

impl Config {
    /// Validate `args` into a [`Config`].
    ///
    /// Returns [`Error::Configuration`] listing every problem found.
    pub fn from_args(args: &Args) -> Result<Self> {
        let mut errors = Vec::new();

        let source_label = trimmed(args.log_source.as_deref()).to_string();
        if source_label.is_empty() {
            errors.push("LOG_SOURCE is required".to_string());
        }
        let source = SourceDescriptor::parse(&source_label);
        if matches!(&source, SourceDescriptor::Container(name) if name.is_empty()) {
            errors.push(format!(
                "Container name is required for {CONTAINER_PREFIX} source"
            ));
        }

        let patterns = match trimmed(args.patterns.as_deref()) {
            "" => {
                errors.push("PATTERNS is required".to_string());
                Vec::new()
            }
            raw => parse_patterns(raw, &mut errors),
        };

        let webhook_url = trimmed(args.discord_webhook.as_deref()).to_string();
        if webhook_url.is_empty() {
            errors.push("DISCORD_WEBHOOK is required".to_string());
        } else if !webhook_url.starts_with(WEBHOOK_URL_PREFIX) {
            errors.push("Invalid DISCORD_WEBHOOK format".to_string());
        }

        let message_template = match trimmed(args.message_template.as_deref()) {
            "" => DEFAULT_TEMPLATE.to_string(),
            t => t.to_string(),
        };

        let bot_username = match trimmed(args.bot_username.as_deref()) {
            "" => DEFAULT_USERNAME.to_string(),
            u => u.to_string(),
        };

        if !errors.is_empty() {
            return Err(Error::Configuration(errors));
        }

        Ok(Self {
            source,
            source_label,
            patterns,
            webhook_url,
            message_template,
            bot_username,
        })
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            patterns: Arc::from(self.patterns.as_slice()),
            message_template: self.message_template.clone(),
            source_label: self.source_label.clone(),
        }
    }

    pub fn discord_config(&self) -> DiscordConfig {
        DiscordConfig::new(&self.webhook_url, &self.bot_username)
    }
}

/// Parse a JSON array of regexes, recording every problem in `errors`.
fn parse_patterns(raw: &str, errors: &mut Vec<String>) -> Vec<Pattern> {
    let value: serde_json::Value = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(e) => {
            errors.push(format!("PATTERNS is not valid JSON: {e}"));
            return Vec::new();
        }
    };

    let sources: Option<Vec<&str>> = value
        .as_array()
        .filter(|items| !items.is_empty())
        .and_then(|items| items.iter().map(|v| v.as_str()).collect());

    let Some(sources) = sources else {
        errors.push("PATTERNS must be a non-empty JSON array of strings".to_string());
        return Vec::new();
    };

    let mut patterns = Vec::with_capacity(sources.len());
    for source in sources {
        match Pattern::new(source) {
            Ok(pattern) => patterns.push(pattern),
            Err(e) => errors.push(format!("Invalid regex pattern '{source}': {e}")),
        }
    }
    patterns
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::path::PathBuf;

    const WEBHOOK: &str = "https://discord.com/api/webhooks/123/abc";
    const FILE: &str = "/var/log/app.log";
    const NOT_STRING_ARRAY: &str = "PATTERNS must be a non-empty JSON array of strings";

    fn args(source: &str, patterns: &str, webhook: &str) -> Args {
        Args {
            log_source: Some(source.to_string()),
            patterns: Some(patterns.to_string()),
            discord_webhook: Some(webhook.to_string()),
            ..Default::default()
        }
    }

    fn problems(args: &Args) -> Vec<String> {
        Config::from_args(args)
            .unwrap_err()
            .config_problems()
            .unwrap()
            .to_vec()
    }

    #[test]
    fn test_load_valid_file_config() {
        let config =
            Config::from_args(&args("/var/log/app.log", r#"["ERROR", "WARN"]"#, WEBHOOK)).unwrap();

        assert_eq!(config.source, SourceDescriptor::File(PathBuf::from("/var/log/app.log")));
        assert_eq!(config.source_label, "/var/log/app.log");
        assert_eq!(config.patterns.len(), 2);
        assert_eq!(config.patterns[1].as_str(), "WARN");
        assert_eq!(config.webhook_url, WEBHOOK);
        assert_eq!(config.message_template, "{line}");
        assert_eq!(config.bot_username, "simple-logs-to-discord");
    }

    #[test]
    fn test_load_docker_config() {
        let config =
            Config::from_args(&args("docker:mycontainer", r#"["ERROR"]"#, WEBHOOK)).unwrap();

        assert_eq!(config.source, SourceDescriptor::Container("mycontainer".to_string()));
        assert_eq!(config.source_label, "docker:mycontainer");
    }

    #[test]
    fn test_custom_template_and_username() {
        let mut a = args("/var/log/app.log", r#"["ERROR"]"#, WEBHOOK);
        a.message_template = Some("Alert: {line}".to_string());
        a.bot_username = Some("  MyBot  ".to_string());

        let config = Config::from_args(&a).unwrap();

        assert_eq!(config.message_template, "Alert: {line}");
        assert_eq!(config.bot_username, "MyBot");
    }

    #[test]
    fn test_blank_template_and_username_use_defaults() {
        let mut a = args(FILE, r#"["ERROR"]"#, WEBHOOK);
        a.message_template = Some("   ".to_string());
        a.bot_username = Some(String::new());

        let config = Config::from_args(&a).unwrap();

        assert_eq!(config.message_template, DEFAULT_TEMPLATE);
        assert_eq!(config.bot_username, DEFAULT_USERNAME);
    }

    #[test]
    fn test_values_are_trimmed() {
        let config = Config::from_args(&args(
            "  /var/log/app.log \n",
            r#" ["ERROR"] "#,
            "  https://discord.com/api/webhooks/1/x ",
        ))
        .unwrap();
        assert_eq!(config.source_label, "/var/log/app.log");
        assert_eq!(config.webhook_url, "https://discord.com/api/webhooks/1/x");
    }

    #[rstest]
    #[case::missing_source("", r#"["ERROR"]"#, WEBHOOK, "LOG_SOURCE is required")]
    #[case::empty_container(
        "docker:",
        r#"["ERROR"]"#,
        WEBHOOK,
        "Container name is required for docker: source"
    )]
    #[case::missing_patterns(FILE, "", WEBHOOK, "PATTERNS is required")]
    #[case::not_json(FILE, "not json", WEBHOOK, "PATTERNS is not valid JSON")]
    #[case::empty_array(FILE, "[]", WEBHOOK, NOT_STRING_ARRAY)]
    #[case::not_array(FILE, r#"{"a": 1}"#, WEBHOOK, NOT_STRING_ARRAY)]
    #[case::non_string(FILE, r#"["ERROR", 5]"#, WEBHOOK, NOT_STRING_ARRAY)]
    #[case::invalid_regex(FILE, r#"["[invalid"]"#, WEBHOOK, "Invalid regex pattern '[invalid'")]
    #[case::missing_webhook(FILE, r#"["ERROR"]"#, "", "DISCORD_WEBHOOK is required")]
    #[case::foreign_webhook(
        FILE,
        r#"["ERROR"]"#,
        "https://example.com/webhook",
        "Invalid DISCORD_WEBHOOK format"
    )]
    fn test_invalid_config(
        #[case] source: &str,
        #[case] patterns: &str,
        #[case] webhook: &str,
        #[case] expected: &str,
    ) {
        let problems = problems(&args(source, patterns, webhook));
        assert_eq!(problems.len(), 1, "unexpected problems: {problems:?}");
        assert!(
            problems[0].starts_with(expected),
            "{:?} does not start with {expected:?}",
            problems[0]
        );
    }

    #[test]
    fn test_all_problems_reported_together() {
        let problems = problems(&Args::default());
        assert_eq!(
            problems,
            vec![
                "LOG_SOURCE is required",
                "PATTERNS is required",
                "DISCORD_WEBHOOK is required",
            ]
        );
    }

    #[test]
    fn test_every_bad_regex_reported() {
        let problems = problems(&args("/var/log/app.log", r#"["(", "ok", "["]"#, WEBHOOK));
        assert_eq!(problems.len(), 2);
        assert!(problems[0].starts_with("Invalid regex pattern '('"));
        assert!(problems[1].starts_with("Invalid regex pattern '['"));
    }

    #[test]
    fn test_parse_from_flags() {
        let args = Args::try_parse_from([
            "simple-logs-to-discord",
            "--log-source",
            "docker:web",
            "--patterns",
            r#"["(?P<level>ERROR|WARN) (?P<message>.+)"]"#,
            "--discord-webhook",
            WEBHOOK,
            "--message-template",
            "[{level}] {message}",
            "-v",
        ])
        .unwrap();

        assert!(args.verbose);
        let config = Config::from_args(&args).unwrap();
        assert_eq!(config.source, SourceDescriptor::Container("web".to_string()));
        assert_eq!(config.message_template, "[{level}] {message}");

        let pipeline = config.pipeline_config();
        assert_eq!(pipeline.patterns.len(), 1);
        assert_eq!(pipeline.source_label, "docker:web");
        assert_eq!(config.discord_config().webhook_url, WEBHOOK);
    }
}
