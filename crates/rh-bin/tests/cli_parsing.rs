use clap::Parser;
use rh_bin::cli::CliArgs;

#[test]
fn defaults_cover_an_unattended_run() {
    let args = CliArgs::parse_from(["rh-fuzz", "--config", "device.json"]);
    assert_eq!(args.runtime_limit_hours, 3);
    assert_eq!(args.probes, 3);
    assert!(!args.sweeping);
    assert_eq!(args.alloc_size_gib, 4);
    assert_eq!(args.cpu, 0);
}

#[test]
fn generate_patterns_and_replay_flags_parse() {
    let args = CliArgs::parse_from([
        "rh-fuzz",
        "--config",
        "device.json",
        "--generate-patterns",
        "10",
        "--load-json",
        "fuzz-summary.json",
        "--replay-patterns",
    ]);
    assert_eq!(args.generate_patterns, Some(10));
    assert_eq!(args.load_json.as_deref(), Some(std::path::Path::new("fuzz-summary.json")));
    assert!(args.replay_patterns);
}
