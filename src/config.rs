//! Application configuration.
//!
//! Configuration is loaded from a TOML file at:
//! 1. the `--config` command-line argument
//! 2. `$DOCINTAKE_CONFIG` (environment variable)
//! 3. `~/.config/docintake/config.toml` (Linux/macOS)
//!    `%APPDATA%\docintake\config.toml` (Windows)
//! 4. Built-in defaults

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{IntakeError, Result};
use crate::fsops::RetryPolicy;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging settings.
    pub general: GeneralConfig,
    /// Which mailbox folder to harvest and who the forwarder is.
    pub mailbox: MailboxConfig,
    /// Output locations.
    pub paths: PathsConfig,
    /// Attachment acceptance rules.
    pub attachments: AttachmentsConfig,
    /// Deletion retry policy.
    pub retry: RetryConfig,
    /// External tool invocations.
    pub tools: ToolsConfig,
    /// Archive extraction settings.
    pub archives: ArchivesConfig,
    /// Share-to-share copy defaults.
    pub copy: CopyConfig,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub log_level: String,
    /// Log file, truncated at the start of every run.
    pub log_file: Option<PathBuf>,
}

/// Mailbox settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MailboxConfig {
    /// Mailbox identity, used only in log lines.
    pub account: String,
    /// Root of the Maildir tree.
    pub maildir: PathBuf,
    /// Folder to harvest. `INBOX` is the Maildir root; others are `.Name` subfolders.
    pub folder: String,
    /// Address of the account that relays third-party mail. Empty disables resolution.
    pub forwarder: String,
    /// Headers that carry the original "on behalf of" address, tried in order.
    pub on_behalf_headers: Vec<String>,
}

/// Output locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Flat directory receiving harvested documents.
    pub destination: PathBuf,
}

/// Attachment acceptance rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AttachmentsConfig {
    /// Extensions (without dot, case-insensitive) that are saved.
    pub allowed_extensions: Vec<String>,
    /// Extensions converted to PDF before page counting.
    pub image_extensions: Vec<String>,
    /// Skip an attachment whose destination file already exists.
    pub skip_existing: bool,
}

/// Deletion retry policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum delete attempts per file.
    pub attempts: u32,
    /// Fixed delay between attempts, in milliseconds.
    pub delay_ms: u64,
}

/// An external program and its argument template.
///
/// Arguments may contain `{input}`, `{output}`, `{density}`, `{dir}` and
/// `{password}` placeholders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCommand {
    pub program: String,
    pub args: Vec<String>,
}

/// External tool invocations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Image to PDF converter.
    pub converter: ToolCommand,
    /// Resolution passed to the converter as `{density}`.
    pub density: u32,
    /// Page count query. Must print a JSON `pages` array or a bare integer.
    pub page_count: ToolCommand,
    /// Page splitter. `{output}` receives a template with a `%04d` page index.
    pub splitter: ToolCommand,
    /// Archive extractor.
    pub extractor: ToolCommand,
    /// Argument inserted before the `{input}` argument when a password applies.
    pub extractor_password_arg: String,
}

/// One row of the archive password table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PasswordRule {
    /// Archive file name prefix (case-insensitive).
    pub prefix: String,
    pub password: String,
}

/// Archive extraction settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchivesConfig {
    /// Extensions treated as archives.
    pub extensions: Vec<String>,
    /// Prefix-to-password table; the first matching row wins.
    pub passwords: Vec<PasswordRule>,
}

/// Share-to-share copy defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CopyConfig {
    pub source: Option<PathBuf>,
    pub destination: Option<PathBuf>,
    /// Extensions to copy; empty copies everything.
    pub extensions: Vec<String>,
}

// ── Default implementations ─────────────────────────────────────

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_file: None,
        }
    }
}

impl Default for MailboxConfig {
    fn default() -> Self {
        Self {
            account: String::new(),
            maildir: PathBuf::from("Maildir"),
            folder: "INBOX".to_string(),
            forwarder: String::new(),
            on_behalf_headers: vec![
                "X-MS-Exchange-Organization-OriginalSender".to_string(),
                "Sender".to_string(),
            ],
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            destination: PathBuf::from("intake"),
        }
    }
}

impl Default for AttachmentsConfig {
    fn default() -> Self {
        Self {
            allowed_extensions: ["pdf", "jpg", "jpeg", "png", "tif", "tiff"]
                .map(String::from)
                .to_vec(),
            image_extensions: ["jpg", "jpeg", "png", "tif", "tiff"]
                .map(String::from)
                .to_vec(),
            skip_existing: true,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: 5,
            delay_ms: 200,
        }
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        fn args(a: &[&str]) -> Vec<String> {
            a.iter().map(|s| s.to_string()).collect()
        }
        Self {
            converter: ToolCommand {
                program: "magick".to_string(),
                args: args(&["-density", "{density}", "{input}", "{output}"]),
            },
            density: 300,
            page_count: ToolCommand {
                program: "qpdf".to_string(),
                args: args(&["--json", "--json-key=pages", "{input}"]),
            },
            splitter: ToolCommand {
                program: "pdftk".to_string(),
                args: args(&["{input}", "burst", "output", "{output}"]),
            },
            extractor: ToolCommand {
                program: "7z".to_string(),
                args: args(&["x", "-y", "-o{dir}", "{input}"]),
            },
            extractor_password_arg: "-p{password}".to_string(),
        }
    }
}

impl Default for ArchivesConfig {
    fn default() -> Self {
        Self {
            extensions: ["zip", "7z", "rar"].map(String::from).to_vec(),
            passwords: Vec::new(),
        }
    }
}

impl RetryConfig {
    /// The policy handed to [`crate::fsops::remove_with_retry`].
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempts: self.attempts.max(1),
            delay: Duration::from_millis(self.delay_ms),
        }
    }
}

// ── Load ────────────────────────────────────────────────────────

/// Load configuration.
///
/// An explicitly given path must exist and parse. Otherwise the standard
/// locations are searched and the defaults are returned if no file is found
/// or it cannot be parsed.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    if let Some(path) = explicit {
        return read_config(path);
    }

    if let Some(path) = config_file_path() {
        if path.exists() {
            match read_config(&path) {
                Ok(cfg) => return Ok(cfg),
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to load config, using defaults");
                }
            }
        }
    }
    Ok(Config::default())
}

/// Read and parse one TOML file.
pub fn read_config(path: &Path) -> Result<Config> {
    let contents = std::fs::read_to_string(path).map_err(|e| IntakeError::Config {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let cfg = toml::from_str::<Config>(&contents).map_err(|e| IntakeError::Config {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    tracing::info!(path = %path.display(), "Loaded config");
    Ok(cfg)
}

/// Determine the config file path (checking env var first, then standard dirs).
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(env_path) = std::env::var("DOCINTAKE_CONFIG") {
        return Some(PathBuf::from(env_path));
    }
    dirs::config_dir().map(|d| d.join("docintake").join("config.toml"))
}

/// Return the log file path.
pub fn log_file_path(config: &Config) -> PathBuf {
    if let Some(ref path) = config.general.log_file {
        return path.clone();
    }
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("docintake")
        .join("docintake.log")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = Config::default();
        assert_eq!(cfg.mailbox.folder, "INBOX");
        assert_eq!(cfg.retry.attempts, 5);
        assert_eq!(cfg.retry.delay_ms, 200);
        assert!(cfg.attachments.skip_existing);
        assert_eq!(cfg.tools.density, 300);
        assert!(cfg.archives.passwords.is_empty());
    }

    #[test]
    fn test_retry_policy_conversion() {
        let policy = RetryConfig {
            attempts: 0,
            delay_ms: 50,
        }
        .policy();
        assert_eq!(policy.attempts, 1);
        assert_eq!(policy.delay, Duration::from_millis(50));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let partial = r#"
[mailbox]
forwarder = "scan@ured.gov.hr"
folder = "Skener"

[[archives.passwords]]
prefix = "HZZO_"
password = "tajna"
"#;
        let cfg: Config = toml::from_str(partial).expect("parse partial");
        assert_eq!(cfg.mailbox.forwarder, "scan@ured.gov.hr");
        assert_eq!(cfg.mailbox.folder, "Skener");
        assert_eq!(cfg.archives.passwords.len(), 1);
        assert_eq!(cfg.archives.passwords[0].prefix, "HZZO_");
        assert_eq!(cfg.retry.attempts, 5);
        assert_eq!(cfg.mailbox.on_behalf_headers.len(), 2);
    }

    #[test]
    fn test_explicit_missing_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_config(Some(&dir.path().join("missing.toml")));
        assert!(matches!(result, Err(IntakeError::Config { .. })));
    }

    #[test]
    fn test_explicit_config_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("docintake.toml");
        std::fs::write(&path, "[retry]\nattempts = 3\n").unwrap();
        let cfg = load_config(Some(&path)).unwrap();
        assert_eq!(cfg.retry.attempts, 3);
        assert_eq!(cfg.retry.delay_ms, 200);
    }

    #[test]
    fn test_serialize_deserialize_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).expect("serialize");
        let parsed: Config = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.tools.splitter, cfg.tools.splitter);
    }
}
