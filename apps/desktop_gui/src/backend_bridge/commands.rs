//! Backend commands queued from UI to backend worker.

use client_core::{ClassifyTicket, ValidatedForm};

pub enum BackendCommand {
    /// Resolve distances for a validated form and build its payload.
    Submit { form: ValidatedForm },
    Classify { ticket: ClassifyTicket },
    ProbeHealth,
}

impl BackendCommand {
    pub fn name(&self) -> &'static str {
        match self {
            BackendCommand::Submit { .. } => "submit",
            BackendCommand::Classify { .. } => "classify",
            BackendCommand::ProbeHealth => "probe_health",
        }
    }
}
