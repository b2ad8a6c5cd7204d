use std::fs;
use std::path::PathBuf;

use chrono::Utc;
use tracing::{debug, warn};

use crate::envelope::RegistrationRequest;
use crate::utils::constants::TITLE_NUMBER_FIELD;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceKind {
    Request,
    Response,
}

impl TraceKind {
    fn prefix(&self) -> &'static str {
        match self {
            TraceKind::Request => "req",
            TraceKind::Response => "res",
        }
    }
}

/// One XML document exchanged with the registration endpoint.
#[derive(Debug, Clone, Copy)]
pub struct TraceEntry<'a> {
    pub kind: TraceKind,
    /// Identifies the boleto, see [`trace_reference`].
    pub reference: &'a str,
    pub attempt: u32,
    pub xml: &'a str,
}

/// Receives raw request/response XML for debugging. Called inline on the
/// registration path, so implementations must not block for long and must
/// swallow their own failures.
pub trait TraceSink: Send + Sync {
    fn record(&self, entry: &TraceEntry<'_>);
}

/// Writes each document to `<dir>/<req|res>-<reference>-<attempt>.xml`.
#[derive(Debug, Clone)]
pub struct FileTraceSink {
    dir: PathBuf,
}

impl FileTraceSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, entry: &TraceEntry<'_>) -> PathBuf {
        self.dir.join(format!("{}-{}-{}.xml", entry.kind.prefix(), entry.reference, entry.attempt))
    }
}

impl TraceSink for FileTraceSink {
    fn record(&self, entry: &TraceEntry<'_>) {
        let path = self.path_for(entry);
        let written = fs::create_dir_all(&self.dir).and_then(|_| fs::write(&path, entry.xml));
        match written {
            Ok(()) => debug!("trace written to '{}'", path.display()),
            Err(err) => warn!("trace write to '{}' failed: {}", path.display(), err),
        }
    }
}

/// File-name safe reference for a request: the beneficiary title number
/// when present, else a UTC timestamp.
pub fn trace_reference(request: &RegistrationRequest) -> String {
    let sanitized: Option<String> = request.get(TITLE_NUMBER_FIELD).map(|number| {
        number
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
            .collect()
    });
    match sanitized {
        Some(reference) if !reference.is_empty() => reference,
        _ => Utc::now().format("%Y%m%dT%H%M%S%3f").to_string(),
    }
}
