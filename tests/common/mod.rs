//! Fakes shared by the integration tests.

#![allow(dead_code)]

use std::cell::RefCell;
use std::path::Path;
use std::time::Duration;

use docintake::error::{IntakeError, Result};
use docintake::fsops::RetryPolicy;
use docintake::tools::{ArchiveTool, DocumentTools, ToolStatus};

/// Document tools that read the page count from a `pages=N` marker in the file.
#[derive(Default)]
pub struct MarkerTools {
    pub fail_split: bool,
    pub calls: RefCell<Vec<String>>,
}

fn pages_in(path: &Path) -> Option<usize> {
    let content = std::fs::read_to_string(path).ok()?;
    let rest = &content[content.find("pages=")? + "pages=".len()..];
    let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
    digits.parse().ok()
}

impl DocumentTools for MarkerTools {
    fn convert_image(&self, input: &Path, output: &Path) -> Result<ToolStatus> {
        self.calls.borrow_mut().push(format!("convert {}", input.display()));
        std::fs::write(output, "%PDF-1.4 pages=1\n").map_err(|e| IntakeError::io(output, e))?;
        Ok(ToolStatus::ok())
    }

    fn page_count(&self, document: &Path) -> Result<usize> {
        self.calls.borrow_mut().push(format!("count {}", document.display()));
        pages_in(document).ok_or_else(|| IntakeError::ToolOutput {
            program: "marker".to_string(),
            reason: "no marker".to_string(),
        })
    }

    fn split_pages(&self, document: &Path, output_template: &Path) -> Result<ToolStatus> {
        self.calls.borrow_mut().push(format!("split {}", document.display()));
        if self.fail_split {
            return Ok(ToolStatus::failed(1, "cannot open"));
        }
        let template = output_template.to_string_lossy().into_owned();
        for page in 1..=pages_in(document).unwrap_or(1) {
            let out = template.replace("%04d", &format!("{page:04}"));
            std::fs::write(&out, "%PDF-1.4 pages=1\n").map_err(|e| IntakeError::io(Path::new(&out), e))?;
        }
        Ok(ToolStatus::ok())
    }
}

/// Archive tool that writes one file per extraction and records the password used.
#[derive(Default)]
pub struct RecordingArchiver {
    pub fail_on: Option<String>,
    pub calls: RefCell<Vec<(String, Option<String>)>>,
}

impl ArchiveTool for RecordingArchiver {
    fn extract(&self, archive: &Path, output_dir: &Path, password: Option<&str>) -> Result<ToolStatus> {
        let name = archive
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.calls
            .borrow_mut()
            .push((name.clone(), password.map(str::to_string)));
        if self.fail_on.as_deref() == Some(name.as_str()) {
            return Ok(ToolStatus::failed(2, "Wrong password"));
        }
        let out = output_dir.join("content.txt");
        std::fs::write(&out, name).map_err(|e| IntakeError::io(&out, e))?;
        Ok(ToolStatus::ok())
    }
}

pub fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        attempts: 5,
        delay: Duration::from_millis(1),
    }
}
