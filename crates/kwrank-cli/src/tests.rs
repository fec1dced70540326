use std::path::PathBuf;

use clap::Parser;

use super::*;
use crate::combine::{combinator_options, LengthOverrides};
use crate::input::{classify, Source};
use crate::validate::{batch_options, ValidateArgs};

fn defaults() -> kwrank_core::AppConfig {
    kwrank_core::build_app_config(|_| Err(std::env::VarError::NotPresent))
        .expect("defaults are valid")
}

#[test]
fn parses_combine_with_overrides() {
    let cli = Cli::try_parse_from([
        "kwrank",
        "combine",
        "--input",
        "keywords.json",
        "--min-length",
        "2",
    ])
    .expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Commands::Combine {
            min_length: Some(2),
            max_length: None,
            max_results: None,
            ..
        }
    ));
}

#[test]
fn parses_validate_defaults() {
    let cli = Cli::try_parse_from(["kwrank", "validate", "--input", "place.json"])
        .expect("expected valid cli args");
    match cli.command {
        Commands::Validate {
            target,
            input,
            early_stop,
            ..
        } => {
            assert!(target.is_none());
            assert_eq!(input, PathBuf::from("place.json"));
            assert_eq!(early_stop, 0);
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn score_requires_input() {
    assert!(Cli::try_parse_from(["kwrank", "score"]).is_err());
}

#[test]
fn missing_subcommand_is_an_error() {
    assert!(Cli::try_parse_from(["kwrank"]).is_err());
}

#[test]
fn classify_detects_keyword_sets() {
    let source = classify(r#"{"CORE": ["국밥"], "LOCATION": [{"text": "서울역", "source": "address"}]}"#)
        .unwrap();
    let Source::Keywords(set) = source else {
        panic!("expected a keyword set");
    };
    assert_eq!(set.core[0].source, "custom");
    assert_eq!(set.location[0].text, "서울역");
}

#[test]
fn classify_detects_place_documents() {
    let source = classify(
        r#"{"placeId": "1234", "basic": {"name": "서울역 국밥집", "category": "국밥"}}"#,
    )
    .unwrap();
    assert_eq!(source.place_id(), Some("1234"));
    let set = source.keyword_set();
    assert_eq!(set.core[0].text, "국밥");
}

#[test]
fn classify_rejects_non_objects() {
    assert!(classify("[1, 2, 3]").is_err());
    assert!(classify("not json").is_err());
}

#[test]
fn length_overrides_apply_over_config() {
    let options = combinator_options(
        &defaults(),
        &LengthOverrides {
            min_length: Some(2),
            ..LengthOverrides::default()
        },
    )
    .unwrap();
    assert_eq!(options.min_length, 2);
    assert_eq!(options.max_length, 15);
    assert_eq!(options.max_results, 500);
}

#[test]
fn inverted_length_bounds_are_rejected() {
    let result = combinator_options(
        &defaults(),
        &LengthOverrides {
            min_length: Some(20),
            max_length: Some(10),
            ..LengthOverrides::default()
        },
    );
    assert!(result.is_err());
}

#[test]
fn validate_flags_override_batch_defaults() {
    let args = ValidateArgs {
        target: Some("1234".to_string()),
        input: PathBuf::from("k.json"),
        concurrency: Some(3),
        max_rank: None,
        max_pages: Some(1),
        early_stop: 2,
    };
    let options = batch_options(kwrank_validator::BatchOptions::default(), &args);
    assert_eq!(options.concurrency, 3);
    assert_eq!(options.max_rank, 5);
    assert_eq!(options.max_pages, 1);
    assert_eq!(options.early_stop_count, 2);
}
