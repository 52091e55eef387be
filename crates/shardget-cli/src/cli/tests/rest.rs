//! Tests for probe, checksum and completions.

use super::parse;
use crate::cli::{exit_code, CliCommand, EXIT_CANCELLED};
use shardget_core::TransferError;
use clap_complete::Shell;
use std::path::Path;

#[test]
fn cli_parse_probe() {
    match parse(&["shardget", "probe", "https://example.com/f"]) {
        CliCommand::Probe { url } => assert_eq!(url, "https://example.com/f"),
        _ => panic!("expected Probe"),
    }
}

#[test]
fn cli_parse_checksum() {
    match parse(&["shardget", "checksum", "/tmp/file.bin"]) {
        CliCommand::Checksum { path } => assert_eq!(path, Path::new("/tmp/file.bin")),
        _ => panic!("expected Checksum"),
    }
}

#[test]
fn cli_parse_completions() {
    match parse(&["shardget", "completions", "bash"]) {
        CliCommand::Completions { shell } => assert_eq!(shell, Shell::Bash),
        _ => panic!("expected Completions"),
    }
}

#[test]
fn cli_rejects_unknown_shell() {
    assert!(<crate::cli::Cli as clap::Parser>::try_parse_from(["shardget", "completions", "cmd"]).is_err());
}

#[test]
fn cancelled_transfer_exits_130() {
    let cancelled = anyhow::Error::from(TransferError::Cancelled);
    assert_eq!(exit_code(&cancelled), EXIT_CANCELLED);
    let failed = anyhow::Error::from(TransferError::InvalidLength(0));
    assert_eq!(exit_code(&failed), 1);
    assert_eq!(exit_code(&anyhow::anyhow!("SHA-256 mismatch")), 1);
}
