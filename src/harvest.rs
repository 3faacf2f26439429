//! The attachment-harvesting pipeline.
//!
//! For every unread message with attachments: resolve the original sender,
//! build the filename prefix, save accepted attachments, normalize them into
//! page-documents, and mark the message read once anything was saved.
//! Messages and attachments are processed strictly one at a time.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::Config;
use crate::error::Result;
use crate::filter::{AttachmentFilter, Decision, SkipReason};
use crate::fsops::{self, remove_with_retry, RetryPolicy};
use crate::mailstore::MailStore;
use crate::model::message::Message;
use crate::naming;
use crate::normalize::Normalizer;
use crate::sender::SenderResolver;
use crate::tools::DocumentTools;

/// Counters for one harvest run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct HarvestReport {
    pub messages_scanned: usize,
    pub messages_selected: usize,
    pub messages_marked_read: usize,
    pub messages_failed: usize,
    pub attachments_saved: usize,
    pub attachments_skipped: usize,
    pub attachments_failed: usize,
    pub documents: Vec<PathBuf>,
}

/// Harvests one mailbox folder into one destination directory.
pub struct Harvester<'a, S: MailStore + ?Sized, T: DocumentTools + ?Sized> {
    store: &'a mut S,
    tools: &'a T,
    resolver: SenderResolver,
    filter: AttachmentFilter,
    destination: PathBuf,
    retry: RetryPolicy,
    image_extensions: Vec<String>,
}

impl<'a, S: MailStore + ?Sized, T: DocumentTools + ?Sized> Harvester<'a, S, T> {
    pub fn new(
        store: &'a mut S,
        tools: &'a T,
        resolver: SenderResolver,
        filter: AttachmentFilter,
        destination: impl Into<PathBuf>,
    ) -> Self {
        Self {
            store,
            tools,
            resolver,
            filter,
            destination: destination.into(),
            retry: RetryPolicy::default(),
            image_extensions: Vec::new(),
        }
    }

    /// Build a harvester from the `[mailbox]`, `[attachments]`, `[retry]` and `[paths]` sections.
    pub fn from_config(store: &'a mut S, tools: &'a T, config: &Config) -> Self {
        Self::new(
            store,
            tools,
            SenderResolver::from_config(&config.mailbox),
            AttachmentFilter::from_config(&config.attachments),
            config.paths.destination.clone(),
        )
        .with_retry(config.retry.policy())
        .with_image_extensions(&config.attachments.image_extensions)
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_image_extensions(mut self, extensions: &[String]) -> Self {
        self.image_extensions = extensions.to_vec();
        self
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Run the pipeline over the whole folder.
    ///
    /// Only setup problems (destination, folder listing) are returned as errors;
    /// per-message and per-attachment failures are logged and counted.
    pub fn run(&mut self) -> Result<HarvestReport> {
        self.run_with_progress(&|_, _| {})
    }

    /// [`Harvester::run`], reporting `(current, total)` selected messages.
    pub fn run_with_progress(&mut self, progress: &dyn Fn(usize, usize)) -> Result<HarvestReport> {
        fsops::ensure_dir(&self.destination)?;

        let messages = self.store.messages()?;
        let mut report = HarvestReport {
            messages_scanned: messages.len(),
            ..Default::default()
        };

        let selected: Vec<&Message> = messages.iter().filter(|m| m.is_harvestable()).collect();
        report.messages_selected = selected.len();
        tracing::info!(
            scanned = report.messages_scanned,
            selected = report.messages_selected,
            "Harvesting messages"
        );

        let total = selected.len();
        for (i, message) in selected.into_iter().enumerate() {
            progress(i, total);
            if let Err(e) = self.process_message(message, &mut report) {
                report.messages_failed += 1;
                tracing::error!(
                    message = %message.id,
                    subject = %message.subject,
                    error = %e,
                    "Message processing failed"
                );
            }
        }
        progress(total, total);

        Ok(report)
    }

    fn process_message(&mut self, message: &Message, report: &mut HarvestReport) -> Result<()> {
        let context = self.resolver.resolve(message);
        let prefix = naming::filename_prefix(
            &message.received,
            &context.candidates,
            &message.sender.display_name,
            &message.subject,
        );
        tracing::info!(
            subject = %message.subject,
            sender = %context.primary,
            source = ?context.source,
            candidates = context.candidates.len(),
            prefix = %prefix,
            "Processing message"
        );

        let normalizer = Normalizer::new(self.tools, self.retry, &self.image_extensions);
        let mut saved = 0usize;

        for attachment in &message.attachments {
            let name = match self.filter.classify(attachment) {
                Decision::Accept(name) => name,
                Decision::Skip(reason) => {
                    report.attachments_skipped += 1;
                    tracing::debug!(filename = %attachment.filename, %reason, "Skipping attachment");
                    continue;
                }
            };

            let path = match self.filter.save_path(&self.destination, &name) {
                Ok(Some(path)) => path,
                Ok(None) => {
                    report.attachments_skipped += 1;
                    let reason = SkipReason::Duplicate(self.destination.join(&name));
                    tracing::info!(filename = %attachment.filename, %reason, "Skipping attachment");
                    continue;
                }
                Err(e) => {
                    report.attachments_failed += 1;
                    tracing::error!(filename = %attachment.filename, error = %e, "No free name");
                    continue;
                }
            };

            if let Err(e) = self.store.save_attachment(message, attachment, &path) {
                report.attachments_failed += 1;
                tracing::error!(path = %path.display(), error = %e, "Failed to save attachment");
                remove_with_retry(&path, &self.retry);
                continue;
            }
            saved += 1;
            report.attachments_saved += 1;

            match normalizer.normalize(&path, &prefix) {
                Ok(outputs) => report.documents.extend(outputs),
                Err(e) => {
                    report.attachments_failed += 1;
                    tracing::error!(path = %path.display(), error = %e, "Failed to normalize attachment");
                }
            }
        }

        if saved > 0 {
            self.store.mark_read(message)?;
            report.messages_marked_read += 1;
            tracing::info!(subject = %message.subject, saved, "Marked message read");
        }
        Ok(())
    }
}
