//! Tests for match-manifest, match-metadata, pick-files, checksum and global flags.

use super::parse;
use crate::cli::{Cli, CliCommand};
use clap::Parser;
use dval_core::checksum::DigestAlgorithm;
use std::path::PathBuf;

#[test]
fn cli_parse_match_manifest() {
    match parse(&["dval", "match-manifest", "manifest.tsv", "--check-storage"]) {
        CliCommand::MatchManifest {
            manifest,
            check_storage,
        } => {
            assert_eq!(manifest, PathBuf::from("manifest.tsv"));
            assert!(check_storage);
        }
        _ => panic!("expected MatchManifest"),
    }
}

#[test]
fn cli_parse_match_metadata_with_config_file() {
    let cli = Cli::try_parse_from(["dval", "match-metadata", "--config-file", "cfg.toml"]).unwrap();
    assert_eq!(cli.config, Some(PathBuf::from("cfg.toml")));
    assert!(matches!(cli.command, CliCommand::MatchMetadata));
    assert_eq!(cli.command.app_name(), "Match_Metadata_Validator");
}

#[test]
fn cli_parse_pick_files() {
    match parse(&["dval", "pick-files", "-c", "cases.tsv", "in", "out"]) {
        CliCommand::PickFiles {
            case_file,
            source,
            dest,
        } => {
            assert_eq!(case_file, PathBuf::from("cases.tsv"));
            assert_eq!(source, PathBuf::from("in"));
            assert_eq!(dest, PathBuf::from("out"));
        }
        _ => panic!("expected PickFiles"),
    }
}

#[test]
fn cli_parse_checksum() {
    match parse(&["dval", "checksum", "file.bin"]) {
        CliCommand::Checksum { path, algorithm } => {
            assert_eq!(path, PathBuf::from("file.bin"));
            assert_eq!(algorithm, DigestAlgorithm::Sha256);
        }
        _ => panic!("expected Checksum"),
    }
    match parse(&["dval", "checksum", "file.bin", "--algorithm", "md5"]) {
        CliCommand::Checksum { algorithm, .. } => assert_eq!(algorithm, DigestAlgorithm::Md5),
        _ => panic!("expected Checksum"),
    }
}

#[test]
fn cli_rejects_unknown_algorithm() {
    assert!(Cli::try_parse_from(["dval", "checksum", "f", "--algorithm", "crc32"]).is_err());
}

#[test]
fn cli_global_config_before_subcommand() {
    let cli = Cli::try_parse_from(["dval", "--config", "/etc/dval.toml", "pick-files", "-c", "c.tsv", "a", "b"]).unwrap();
    assert_eq!(cli.config, Some(PathBuf::from("/etc/dval.toml")));
    assert_eq!(cli.command.app_name(), "Pick_files");
}
