// Syscall filtering for hosted programs
// The policy is a plain table: one default action for every syscall, one
// action for the listed syscalls. It is compiled to seccomp-bpf up front and
// installed exactly once.

use crate::config::types::{AmoebaError, Result};
use serde::{Deserialize, Serialize};
use std::marker::PhantomData;

/// Syscalls a hosted program may not make: file creation and opening,
/// directory creation, unlinking, process spawning, signalling and legacy
/// socket multiplexing.
pub const HOSTED_PROGRAM_DENYLIST: [&str; 10] = [
    "open",
    "openat",
    "creat",
    "mkdir",
    "fork",
    "clone",
    "execve",
    "unlink",
    "kill",
    "socketcall",
];

/// What the kernel does when a filter entry matches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterAction {
    #[serde(rename = "allow")]
    Allow,
    /// Terminate the whole process with SIGSYS
    #[serde(rename = "kill_process")]
    KillProcess,
}

impl std::fmt::Display for FilterAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FilterAction::Allow => write!(f, "allow"),
            FilterAction::KillProcess => write!(f, "kill_process"),
        }
    }
}

/// Declarative syscall policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyscallFilterPolicy {
    /// Profile identifier for logs and audit events
    pub profile_id: String,
    /// Applied to every syscall not listed
    pub default_action: FilterAction,
    /// Applied to every listed syscall
    pub listed_action: FilterAction,
    /// Syscall names, resolved per architecture at compile time
    pub syscalls: Vec<String>,
}

impl SyscallFilterPolicy {
    /// Allow everything except [`HOSTED_PROGRAM_DENYLIST`], which kills.
    pub fn hosted_program() -> Self {
        Self {
            profile_id: "hosted-program".to_string(),
            default_action: FilterAction::Allow,
            listed_action: FilterAction::KillProcess,
            syscalls: HOSTED_PROGRAM_DENYLIST.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn is_listed(&self, name: &str) -> bool {
        self.syscalls.iter().any(|s| s == name)
    }

    /// The table with per-syscall numbers for this build
    pub fn describe(&self) -> PolicyDescription {
        PolicyDescription {
            profile_id: self.profile_id.clone(),
            arch: std::env::consts::ARCH.to_string(),
            default_action: self.default_action,
            listed_action: self.listed_action,
            syscalls: self
                .syscalls
                .iter()
                .map(|name| ResolvedSyscall {
                    name: name.clone(),
                    number: resolve_syscall(name),
                })
                .collect(),
            seccomp: get_seccomp_status(),
        }
    }
}

impl Default for SyscallFilterPolicy {
    fn default() -> Self {
        Self::hosted_program()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedSyscall {
    pub name: String,
    /// `None` when the syscall does not exist on this architecture
    pub number: Option<i64>,
}

/// Policy table as printed by `amoeba policy`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyDescription {
    pub profile_id: String,
    pub arch: String,
    pub default_action: FilterAction,
    pub listed_action: FilterAction,
    pub syscalls: Vec<ResolvedSyscall>,
    pub seccomp: String,
}

/// Result of a successful installation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallReport {
    pub profile_id: String,
    pub arch: String,
    /// Listed syscalls that made it into the filter
    pub installed: Vec<String>,
    /// Listed syscalls that do not exist on this architecture
    pub skipped: Vec<String>,
    pub no_new_privs: bool,
}

/// Resolve a denied syscall name to its number on the build architecture
#[cfg(all(target_os = "linux", target_arch = "x86_64"))]
pub fn resolve_syscall(name: &str) -> Option<i64> {
    let nr = match name {
        "open" => libc::SYS_open,
        "openat" => libc::SYS_openat,
        "creat" => libc::SYS_creat,
        "mkdir" => libc::SYS_mkdir,
        "fork" => libc::SYS_fork,
        "clone" => libc::SYS_clone,
        "execve" => libc::SYS_execve,
        "unlink" => libc::SYS_unlink,
        "kill" => libc::SYS_kill,
        _ => return None,
    };
    Some(nr as i64)
}

/// Resolve a syscall name to its number on the build architecture
#[cfg(all(target_os = "linux", target_arch = "aarch64"))]
pub fn resolve_syscall(name: &str) -> Option<i64> {
    // The generic syscall table has no legacy open/creat/mkdir/unlink/fork.
    let nr = match name {
        "openat" => libc::SYS_openat,
        "clone" => libc::SYS_clone,
        "execve" => libc::SYS_execve,
        "kill" => libc::SYS_kill,
        _ => return None,
    };
    Some(nr as i64)
}

/// Resolve a syscall name to its number on the build architecture
#[cfg(not(all(
    target_os = "linux",
    any(target_arch = "x86_64", target_arch = "aarch64")
)))]
pub fn resolve_syscall(_name: &str) -> Option<i64> {
    None
}

/// A policy compiled to a seccomp-bpf program for this architecture
#[derive(Debug)]
pub struct CompiledFilter {
    profile_id: String,
    installed: Vec<String>,
    skipped: Vec<String>,
    #[cfg(target_os = "linux")]
    program: seccompiler::BpfProgram,
}

impl CompiledFilter {
    pub fn profile_id(&self) -> &str {
        &self.profile_id
    }

    pub fn installed(&self) -> &[String] {
        &self.installed
    }

    pub fn skipped(&self) -> &[String] {
        &self.skipped
    }

    /// Number of BPF instructions
    #[cfg(target_os = "linux")]
    pub fn instruction_count(&self) -> usize {
        self.program.len()
    }
}

#[cfg(target_os = "linux")]
fn to_seccomp_action(action: FilterAction) -> seccompiler::SeccompAction {
    match action {
        FilterAction::Allow => seccompiler::SeccompAction::Allow,
        FilterAction::KillProcess => seccompiler::SeccompAction::KillProcess,
    }
}

/// Compile a policy to a BPF program. Nothing is installed.
#[cfg(target_os = "linux")]
pub fn compile_policy(policy: &SyscallFilterPolicy) -> Result<CompiledFilter> {
    use seccompiler::{BpfProgram, SeccompFilter, SeccompRule, TargetArch};
    use std::collections::BTreeMap;

    if policy.default_action == policy.listed_action {
        return Err(AmoebaError::Seccomp(format!(
            "policy {} uses {} for both listed and unlisted syscalls",
            policy.profile_id, policy.default_action
        )));
    }

    let arch: TargetArch = std::env::consts::ARCH
        .try_into()
        .map_err(|e| AmoebaError::Unsupported(format!("seccomp target arch: {}", e)))?;

    let mut rules: BTreeMap<i64, Vec<SeccompRule>> = BTreeMap::new();
    let mut installed = Vec::new();
    let mut skipped = Vec::new();

    for name in &policy.syscalls {
        match resolve_syscall(name) {
            Some(nr) => {
                // An empty rule list matches the syscall unconditionally.
                rules.insert(nr, Vec::new());
                installed.push(name.clone());
            }
            None => {
                log::debug!(
                    "Syscall {} does not exist on {}, skipping",
                    name,
                    std::env::consts::ARCH
                );
                skipped.push(name.clone());
            }
        }
    }

    let filter = SeccompFilter::new(
        rules,
        to_seccomp_action(policy.default_action),
        to_seccomp_action(policy.listed_action),
        arch,
    )
    .map_err(|e| AmoebaError::Seccomp(format!("invalid filter: {}", e)))?;

    let program: BpfProgram = filter
        .try_into()
        .map_err(|e| AmoebaError::Seccomp(format!("BPF compilation failed: {}", e)))?;

    Ok(CompiledFilter {
        profile_id: policy.profile_id.clone(),
        installed,
        skipped,
        program,
    })
}

/// Compile a policy to a BPF program. Nothing is installed.
#[cfg(not(target_os = "linux"))]
pub fn compile_policy(_policy: &SyscallFilterPolicy) -> Result<CompiledFilter> {
    Err(AmoebaError::Unsupported(
        "seccomp-bpf requires Linux".to_string(),
    ))
}

#[cfg(target_os = "linux")]
fn install(filter: &CompiledFilter) -> Result<InstallReport> {
    seccompiler::apply_filter(&filter.program)
        .map_err(|e| AmoebaError::Seccomp(format!("failed to load filter: {}", e)))?;

    let no_new_privs = no_new_privs_or_warn(nix::sys::prctl::get_no_new_privs());

    Ok(InstallReport {
        profile_id: filter.profile_id.clone(),
        arch: std::env::consts::ARCH.to_string(),
        installed: filter.installed.clone(),
        skipped: filter.skipped.clone(),
        no_new_privs,
    })
}

// The filter is already loaded at this point, so a failed read only degrades
// the report.
#[cfg(target_os = "linux")]
fn no_new_privs_or_warn(status: nix::Result<bool>) -> bool {
    match status {
        Ok(flag) => flag,
        Err(e) => {
            log::warn!("Failed to read no_new_privs after loading filter: {}", e);
            false
        }
    }
}

#[cfg(not(target_os = "linux"))]
fn install(_filter: &CompiledFilter) -> Result<InstallReport> {
    Err(AmoebaError::Unsupported(
        "seccomp-bpf requires Linux".to_string(),
    ))
}

/// Sandbox hook states
pub struct Unarmed;
pub struct Armed;

/// One-time syscall filter installation.
///
/// The filter is compiled when the hook is created, so arming only issues
/// the `prctl`/`seccomp` calls. An armed hook cannot be armed again:
///
/// ```compile_fail
/// use amoeba::seccomp::{SandboxHook, SyscallFilterPolicy};
///
/// let hook = SandboxHook::new(SyscallFilterPolicy::hosted_program()).unwrap();
/// let armed = hook.arm().unwrap();
/// armed.arm();
/// ```
///
/// and an unarmed hook is consumed by arming:
///
/// ```compile_fail
/// use amoeba::seccomp::{SandboxHook, SyscallFilterPolicy};
///
/// let hook = SandboxHook::new(SyscallFilterPolicy::hosted_program()).unwrap();
/// let _armed = hook.arm();
/// let _again = hook.arm();
/// ```
pub struct SandboxHook<S> {
    filter: CompiledFilter,
    report: Option<InstallReport>,
    _state: PhantomData<S>,
}

impl SandboxHook<Unarmed> {
    pub fn new(policy: SyscallFilterPolicy) -> Result<Self> {
        let filter = compile_policy(&policy)?;
        log::debug!(
            "Compiled syscall filter {}: {} rules, {} skipped",
            filter.profile_id,
            filter.installed.len(),
            filter.skipped.len()
        );
        Ok(Self {
            filter,
            report: None,
            _state: PhantomData,
        })
    }

    pub fn filter(&self) -> &CompiledFilter {
        &self.filter
    }

    /// Install the filter on the calling thread. Any listed syscall made
    /// afterwards terminates the process.
    pub fn arm(self) -> Result<SandboxHook<Armed>> {
        let report = install(&self.filter)?;
        log::info!(
            "Syscall filter {} armed: {} denied, {} not present on {}",
            report.profile_id,
            report.installed.len(),
            report.skipped.len(),
            report.arch
        );
        Ok(SandboxHook {
            filter: self.filter,
            report: Some(report),
            _state: PhantomData,
        })
    }
}

impl SandboxHook<Armed> {
    pub fn report(&self) -> Option<&InstallReport> {
        self.report.as_ref()
    }

    pub fn filter(&self) -> &CompiledFilter {
        &self.filter
    }
}

/// Check if syscall filtering is supported on this system
pub fn is_seccomp_supported() -> bool {
    #[cfg(target_os = "linux")]
    {
        std::path::Path::new("/proc/sys/kernel/seccomp").exists()
            || std::fs::read_to_string("/proc/self/status")
                .map(|status| status.lines().any(|l| l.starts_with("Seccomp:")))
                .unwrap_or(false)
    }

    #[cfg(not(target_os = "linux"))]
    {
        false
    }
}

/// Get seccomp support status for capability reporting
pub fn get_seccomp_status() -> String {
    if is_seccomp_supported() {
        "available".to_string()
    } else {
        "unavailable".to_string()
    }
}
