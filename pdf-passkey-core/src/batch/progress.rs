//! Per-entry progress reporting

use super::result::EntryReport;

/// Receives each entry's report as soon as it is known
pub trait BatchReporter {
    fn on_entry(&self, report: &EntryReport);
}

/// Implementation of BatchReporter for closures
impl<F> BatchReporter for F
where
    F: Fn(&EntryReport),
{
    fn on_entry(&self, report: &EntryReport) {
        self(report)
    }
}

/// Reporter that discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentReporter;

impl BatchReporter for SilentReporter {
    fn on_entry(&self, _report: &EntryReport) {}
}
