//! External command-line tools: image converter, page counter, page splitter,
//! archive extractor.
//!
//! The pipeline only talks to the [`DocumentTools`] and [`ArchiveTool`]
//! traits; [`ExternalTools`] and [`ExternalArchiver`] run the configured
//! programs and wait for them to finish.

use std::path::Path;
use std::process::Command;

use crate::config::{ToolCommand, ToolsConfig};
use crate::error::{IntakeError, Result};

/// Exit status of a finished tool run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolStatus {
    pub success: bool,
    pub code: Option<i32>,
    pub stderr: String,
}

impl ToolStatus {
    pub fn ok() -> Self {
        Self {
            success: true,
            code: Some(0),
            stderr: String::new(),
        }
    }

    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            code: Some(code),
            stderr: stderr.into(),
        }
    }
}

/// Document operations the normalizer delegates to external programs.
pub trait DocumentTools {
    /// Convert an image into a page-document at `output`.
    fn convert_image(&self, input: &Path, output: &Path) -> Result<ToolStatus>;

    /// Number of pages in `document`.
    fn page_count(&self, document: &Path) -> Result<usize>;

    /// Split `document` into one file per page. `output_template` contains `%04d`.
    fn split_pages(&self, document: &Path, output_template: &Path) -> Result<ToolStatus>;
}

/// Archive extraction.
pub trait ArchiveTool {
    fn extract(&self, archive: &Path, output_dir: &Path, password: Option<&str>) -> Result<ToolStatus>;
}

/// Values substituted into `{placeholder}` arguments.
#[derive(Debug, Default)]
struct Substitutions<'a> {
    input: Option<&'a Path>,
    output: Option<&'a Path>,
    dir: Option<&'a Path>,
    density: Option<u32>,
    password: Option<&'a str>,
}

fn render_arg(template: &str, subs: &Substitutions<'_>) -> String {
    let mut arg = template.to_string();
    if let Some(p) = subs.input {
        arg = arg.replace("{input}", &p.to_string_lossy());
    }
    if let Some(p) = subs.output {
        arg = arg.replace("{output}", &p.to_string_lossy());
    }
    if let Some(p) = subs.dir {
        arg = arg.replace("{dir}", &p.to_string_lossy());
    }
    if let Some(d) = subs.density {
        arg = arg.replace("{density}", &d.to_string());
    }
    if let Some(pw) = subs.password {
        arg = arg.replace("{password}", pw);
    }
    arg
}

fn render_args(command: &ToolCommand, subs: &Substitutions<'_>) -> Vec<String> {
    command.args.iter().map(|a| render_arg(a, subs)).collect()
}

/// Run a program to completion and capture its status.
fn run(program: &str, args: &[String]) -> Result<(ToolStatus, String)> {
    let output = Command::new(program)
        .args(args)
        .output()
        .map_err(|source| IntakeError::ToolLaunch {
            program: program.to_string(),
            source,
        })?;

    let status = ToolStatus {
        success: output.status.success(),
        code: output.status.code(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    };
    Ok((status, String::from_utf8_lossy(&output.stdout).into_owned()))
}

/// Interpret page-count output: a JSON object with a `pages` array, or a bare integer.
pub fn parse_page_count(stdout: &str) -> Option<usize> {
    let trimmed = stdout.trim();
    if let Ok(n) = trimmed.parse::<usize>() {
        return Some(n);
    }
    let value: serde_json::Value = serde_json::from_str(trimmed).ok()?;
    value.get("pages")?.as_array().map(Vec::len)
}

/// [`DocumentTools`] backed by configured external programs.
#[derive(Debug, Clone)]
pub struct ExternalTools {
    converter: ToolCommand,
    density: u32,
    page_count: ToolCommand,
    splitter: ToolCommand,
}

impl ExternalTools {
    pub fn from_config(config: &ToolsConfig) -> Self {
        Self {
            converter: config.converter.clone(),
            density: config.density,
            page_count: config.page_count.clone(),
            splitter: config.splitter.clone(),
        }
    }
}

impl DocumentTools for ExternalTools {
    fn convert_image(&self, input: &Path, output: &Path) -> Result<ToolStatus> {
        let args = render_args(
            &self.converter,
            &Substitutions {
                input: Some(input),
                output: Some(output),
                density: Some(self.density),
                ..Default::default()
            },
        );
        tracing::debug!(program = %self.converter.program, ?args, "Converting image");
        run(&self.converter.program, &args).map(|(status, _)| status)
    }

    fn page_count(&self, document: &Path) -> Result<usize> {
        let args = render_args(
            &self.page_count,
            &Substitutions {
                input: Some(document),
                ..Default::default()
            },
        );
        let (status, stdout) = run(&self.page_count.program, &args)?;
        if !status.success {
            return Err(IntakeError::ToolOutput {
                program: self.page_count.program.clone(),
                reason: format!("exit code {:?}: {}", status.code, status.stderr),
            });
        }
        parse_page_count(&stdout).ok_or_else(|| IntakeError::ToolOutput {
            program: self.page_count.program.clone(),
            reason: "no page list in output".to_string(),
        })
    }

    fn split_pages(&self, document: &Path, output_template: &Path) -> Result<ToolStatus> {
        let args = render_args(
            &self.splitter,
            &Substitutions {
                input: Some(document),
                output: Some(output_template),
                ..Default::default()
            },
        );
        tracing::debug!(program = %self.splitter.program, ?args, "Splitting document");
        run(&self.splitter.program, &args).map(|(status, _)| status)
    }
}

/// [`ArchiveTool`] backed by an external extractor such as `7z`.
#[derive(Debug, Clone)]
pub struct ExternalArchiver {
    command: ToolCommand,
    password_arg: String,
}

impl ExternalArchiver {
    pub fn from_config(config: &ToolsConfig) -> Self {
        Self {
            command: config.extractor.clone(),
            password_arg: config.extractor_password_arg.clone(),
        }
    }

    /// Rendered argument list. The password argument goes before `{input}`.
    fn args(&self, archive: &Path, output_dir: &Path, password: Option<&str>) -> Vec<String> {
        let subs = Substitutions {
            input: Some(archive),
            dir: Some(output_dir),
            password,
            ..Default::default()
        };
        let mut args = Vec::with_capacity(self.command.args.len() + 1);
        for template in &self.command.args {
            if password.is_some() && template.contains("{input}") && !self.password_arg.is_empty() {
                args.push(render_arg(&self.password_arg, &subs));
            }
            args.push(render_arg(template, &subs));
        }
        args
    }
}

impl ArchiveTool for ExternalArchiver {
    fn extract(&self, archive: &Path, output_dir: &Path, password: Option<&str>) -> Result<ToolStatus> {
        tracing::debug!(
            program = %self.command.program,
            archive = %archive.display(),
            with_password = password.is_some(),
            "Extracting archive"
        );
        let args = self.args(archive, output_dir, password);
        run(&self.command.program, &args).map(|(status, _)| status)
    }
}
