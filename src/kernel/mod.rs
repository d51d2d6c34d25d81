//! Thin wrappers around Linux kernel primitives.
//!
//! The only primitive the hosted-run path needs is seccomp-bpf.

pub mod seccomp;
