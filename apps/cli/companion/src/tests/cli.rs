use crate::cli::{Cli, Command, credentials_dir};

use std::path::{Path, PathBuf};

use clap::Parser;

fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
    Cli::try_parse_from(std::iter::once("companion").chain(args.iter().copied()))
}

/// **VALUE**: Verifies every pairing argument reaches the command.
#[test]
fn given_full_pair_arguments_when_parsing_then_all_fields_set() {
    // WHEN
    let cli = parse(&[
        "pair",
        "--service",
        "_sensor._tcp.den",
        "--host",
        "192.168.1.40",
        "--port",
        "8443",
        "--code",
        "482913",
        "--name",
        "Den",
    ])
    .expect("valid arguments");

    // THEN
    match cli.command {
        Command::Pair(args) => {
            assert_eq!(args.service, "_sensor._tcp.den");
            assert_eq!(args.host, "192.168.1.40");
            assert_eq!(args.port, 8443);
            assert_eq!(args.code, "482913");
            assert_eq!(args.name.as_deref(), Some("Den"));
        }
        other => panic!("expected pair, got {other:?}"),
    }
}

/// **VALUE**: Verifies a port outside u16 is rejected by the parser, not at connect time.
#[test]
fn given_out_of_range_port_when_parsing_then_error() {
    let result = parse(&[
        "pair", "--service", "s", "--host", "h", "--port", "70000", "--code", "482913",
    ]);

    assert!(result.is_err());
}

/// **VALUE**: Verifies global flags work after the subcommand.
///
/// **BUG THIS CATCHES**: Would catch `--verbose`/`--config-dir` losing `global = true`,
/// which would make `companion watch --verbose` a parse error.
#[test]
fn given_global_flags_after_subcommand_when_parsing_then_accepted() {
    // WHEN
    let cli = parse(&["watch", "--verbose", "--config-dir", "/tmp/companion-test"])
        .expect("valid arguments");

    // THEN
    assert!(cli.verbose);
    assert!(matches!(cli.command, Command::Watch));
    assert_eq!(
        cli.resolve_config_dir().expect("config dir"),
        PathBuf::from("/tmp/companion-test")
    );
}

#[test]
fn given_status_check_flag_when_parsing_then_check_set() {
    let cli = parse(&["status", "--check"]).expect("valid arguments");

    match cli.command {
        Command::Status(args) => assert!(args.check),
        other => panic!("expected status, got {other:?}"),
    }
}

#[test]
fn given_unknown_subcommand_when_parsing_then_error() {
    assert!(parse(&["frobnicate"]).is_err());
}

#[test]
fn given_config_dir_when_deriving_credentials_dir_then_nested() {
    assert_eq!(
        credentials_dir(Path::new("/etc/companion")),
        PathBuf::from("/etc/companion/credentials")
    );
}
