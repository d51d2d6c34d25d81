/// Audit events for amoeba runs
/// Structured JSON lines describing what a run did: input accepted or
/// rejected, sandbox armed or not, loops counted.
///
/// The audit file is opened when the logger is initialized. Once the sandbox
/// is armed no new file can be opened, so initialization must come first;
/// later events only write to the already-open descriptor.
use crate::config::types::{AmoebaError, Result};
use crate::kernel::seccomp::InstallReport;
use crate::tracer::TraceReport;
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};
use std::time::SystemTime;
use uuid::Uuid;

/// Audit event severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditSeverity {
    High,
    Medium,
    Low,
}

/// Types of events a run records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditEventType {
    RunStart,
    InputRejected,
    SandboxArmed,
    SandboxUnavailable,
    TraceCompleted,
}

impl AuditEventType {
    pub fn default_severity(&self) -> AuditSeverity {
        match self {
            AuditEventType::RunStart => AuditSeverity::Low,
            AuditEventType::InputRejected => AuditSeverity::Medium,
            AuditEventType::SandboxArmed => AuditSeverity::Low,
            AuditEventType::SandboxUnavailable => AuditSeverity::High,
            AuditEventType::TraceCompleted => AuditSeverity::Low,
        }
    }
}

/// Run identifier shared by every event of this process
pub fn run_id() -> &'static str {
    static RUN_ID: OnceLock<String> = OnceLock::new();
    RUN_ID.get_or_init(|| Uuid::new_v4().to_string())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub event_type: AuditEventType,
    pub severity: AuditSeverity,
    pub timestamp: SystemTime,
    pub run_id: String,
    pub details: String,
    pub sandbox: Option<InstallReport>,
    pub trace: Option<TraceReport>,
}

impl AuditEvent {
    pub fn new(event_type: AuditEventType, details: String) -> Self {
        Self {
            event_type,
            severity: event_type.default_severity(),
            timestamp: SystemTime::now(),
            run_id: run_id().to_string(),
            details,
            sandbox: None,
            trace: None,
        }
    }

    pub fn with_sandbox(mut self, report: InstallReport) -> Self {
        self.sandbox = Some(report);
        self
    }

    pub fn with_trace(mut self, report: TraceReport) -> Self {
        self.trace = Some(report);
        self
    }

    pub fn with_severity(mut self, severity: AuditSeverity) -> Self {
        self.severity = severity;
        self
    }

    /// One JSON object per event
    pub fn to_json(&self) -> serde_json::Value {
        let mut entry = serde_json::json!({
            "timestamp": self.timestamp
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
            "event_type": self.event_type,
            "severity": self.severity,
            "run_id": self.run_id,
            "details": self.details,
            "process_id": std::process::id(),
        });

        if let Some(sandbox) = &self.sandbox {
            entry["sandbox"] =
                serde_json::to_value(sandbox).unwrap_or_else(|_| serde_json::json!(null));
        }
        if let Some(trace) = &self.trace {
            entry["trace"] = serde_json::to_value(trace).unwrap_or_else(|_| serde_json::json!(null));
        }

        entry
    }
}

/// Appends audit events to a file opened up front
pub struct AuditLogger {
    audit_file: Mutex<File>,
    audit_path: PathBuf,
}

impl AuditLogger {
    pub fn new(audit_path: &Path) -> Result<Self> {
        if let Some(parent) = audit_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                AmoebaError::Io(std::io::Error::new(
                    e.kind(),
                    format!("failed to create audit log directory: {}", e),
                ))
            })?;
        }

        let audit_file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(audit_path)?;

        Ok(Self {
            audit_file: Mutex::new(audit_file),
            audit_path: audit_path.to_path_buf(),
        })
    }

    pub fn log_event(&self, event: &AuditEvent) {
        let entry = event.to_json();

        if let Ok(mut file) = self.audit_file.lock() {
            if let Err(e) = writeln!(file, "{}", entry) {
                error!("Failed to write to audit log: {}", e);
            }
            if let Err(e) = file.flush() {
                error!("Failed to flush audit log: {}", e);
            }
        } else {
            error!("Failed to acquire lock on audit file");
        }
    }

    pub fn audit_path(&self) -> &Path {
        &self.audit_path
    }
}

static AUDIT_LOGGER: OnceLock<AuditLogger> = OnceLock::new();

/// Open the global audit file. Without a path, events only reach the `log`
/// facade.
pub fn init_audit_logger(audit_path: Option<&Path>) -> Result<()> {
    let Some(path) = audit_path else {
        return Ok(());
    };

    let logger = AuditLogger::new(path)?;
    if AUDIT_LOGGER.set(logger).is_err() {
        warn!("Audit logger already initialized");
    } else {
        info!("Audit log: {}", path.display());
    }
    Ok(())
}

/// Mirror an event to the `log` facade and, when initialized, the audit file
pub fn log_event(event: AuditEvent) {
    match event.severity {
        AuditSeverity::High => warn!("AUDIT {:?}: {}", event.event_type, event.details),
        AuditSeverity::Medium | AuditSeverity::Low => {
            info!("AUDIT {:?}: {}", event.event_type, event.details)
        }
    }

    if let Some(logger) = AUDIT_LOGGER.get() {
        logger.log_event(&event);
    }
}

pub fn run_start(input: &str, sandbox: bool) {
    log_event(AuditEvent::new(
        AuditEventType::RunStart,
        format!("Run started: input={}, sandbox={}", input, sandbox),
    ));
}

pub fn input_rejected(input: &str, reason: &str) {
    log_event(AuditEvent::new(
        AuditEventType::InputRejected,
        format!("Input rejected: input={}, reason={}", input, reason),
    ));
}

pub fn sandbox_armed(report: InstallReport) {
    log_event(
        AuditEvent::new(
            AuditEventType::SandboxArmed,
            format!(
                "Syscall filter armed: profile={}, denied={}",
                report.profile_id,
                report.installed.join(",")
            ),
        )
        .with_sandbox(report),
    );
}

pub fn sandbox_unavailable(reason: &str) {
    log_event(AuditEvent::new(
        AuditEventType::SandboxUnavailable,
        format!("Syscall filter not armed: {}", reason),
    ));
}

pub fn trace_completed(report: TraceReport) {
    log_event(
        AuditEvent::new(
            AuditEventType::TraceCompleted,
            format!(
                "Trace completed: loops={}, walks={}, marked={}",
                report.loops, report.walks_started, report.marked_cells
            ),
        )
        .with_trace(report),
    );
}
