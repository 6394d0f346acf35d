//! Tests for the fetch subcommand.

use super::{parse, parse_err};
use crate::cli::CliCommand;
use std::path::Path;

#[test]
fn cli_parse_fetch_single() {
    match parse(&["netqueue", "fetch", "https://example.com/file.iso"]) {
        CliCommand::Fetch { urls, jobs, out } => {
            assert_eq!(urls, vec!["https://example.com/file.iso"]);
            assert!(jobs.is_none());
            assert!(out.is_none());
        }
        _ => panic!("expected Fetch"),
    }
}

#[test]
fn cli_parse_fetch_many_with_jobs_and_out() {
    match parse(&[
        "netqueue",
        "fetch",
        "https://example.com/a",
        "https://example.com/b",
        "--jobs",
        "3",
        "--out",
        "/tmp/dl",
    ]) {
        CliCommand::Fetch { urls, jobs, out } => {
            assert_eq!(urls.len(), 2);
            assert_eq!(urls[1], "https://example.com/b");
            assert_eq!(jobs, Some(3));
            assert_eq!(out.as_deref(), Some(Path::new("/tmp/dl")));
        }
        _ => panic!("expected Fetch with --jobs and --out"),
    }
}

#[test]
fn cli_parse_fetch_requires_url() {
    let err = parse_err(&["netqueue", "fetch"]);
    assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
}
