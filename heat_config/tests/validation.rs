use heat_config::{load_file, load_toml};
use rstest::rstest;
use std::io::Write;

const MINIMAL: &str = r#"
[radiator]
feed_sensor = "28:D9:F8:D5:03:00:00:B0"
indoor_sensor = "28:C3:E0:D5:03:00:00:66"
outdoor_sensor = "28:0A:FB:D5:03:00:00:63"

[boiler]
inlet_sensor = "28:50:05:D6:03:00:00:0E"
outlet_sensor = "28:8D:2E:8E:05:00:00:1D"
"#;

#[test]
fn minimal_config_parses_with_defaults() {
    let cfg = load_toml(MINIMAL).expect("parse");
    cfg.validate().expect("validate");

    assert_eq!(cfg.cycle_ms, 5000);
    assert_eq!(cfg.bus.max_devices, 8);
    assert_eq!(cfg.relay.pump_bit, 3);
    assert_eq!(cfg.radiator.outdoor_div, 2);
    assert_eq!(cfg.radiator.regulator.gain_p, 2);
    // The boiler preset runs a stiffer proportional gain.
    assert_eq!(cfg.boiler.regulator.gain_p, 4);
    assert_eq!(cfg.boiler.inlet_penalty, 1);
    assert_eq!(cfg.pins.bus, 4);
    assert_eq!(cfg.pins.relay_i2c_addr, 0x20);
}

#[test]
fn shipped_sample_config_is_valid() {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("etc")
        .join("heat.toml");
    let cfg = load_file(&path).expect("etc/heat.toml must stay valid");
    assert_eq!(cfg.cycle_ms, 5000);
}

#[test]
fn load_file_reports_missing_files() {
    let err = load_file(std::path::Path::new("/nonexistent/heat.toml")).unwrap_err();
    assert!(err.to_string().contains("read config"));
}

#[test]
fn load_file_runs_validation() {
    let mut f = tempfile::NamedTempFile::new().unwrap();
    write!(f, "{}", MINIMAL.replace("cycle", "x")).unwrap();
    // Valid file passes through load_file.
    load_file(f.path()).expect("minimal config via file");

    let mut bad = tempfile::NamedTempFile::new().unwrap();
    write!(bad, "cycle_ms = 0\n{MINIMAL}").unwrap();
    let err = load_file(bad.path()).unwrap_err();
    assert!(err.to_string().contains("cycle_ms"));
}

#[rstest]
#[case("cycle_ms = 0", "cycle_ms")]
#[case("[bus]\nmax_devices = 0", "max_devices")]
#[case("[bus]\nmax_devices = 65", "max_devices")]
#[case("[bus]\nread_retries = 0", "read_retries")]
#[case("[relay]\npump_bit = 9", "relay bit")]
#[case("[relay]\npump_bit = 4", "assigned twice")]
#[case("[pins]\nrelay_i2c_addr = 0xA0", "relay_i2c_addr")]
fn top_level_mistakes_are_rejected(#[case] snippet: &str, #[case] needle: &str) {
    let text = format!("{snippet}\n{MINIMAL}");
    let cfg = load_toml(&text).expect("parse");
    let err = cfg.validate().unwrap_err();
    assert!(
        err.to_string().contains(needle),
        "expected {needle:?} in {err}"
    );
}

#[rstest]
#[case("outdoor_div = 0", "outdoor_div")]
#[case("target_min_c = 80.0", "target_min_c")]
#[case("fail_threshold = 0", "fail_threshold")]
#[case("fault_signature_c = 5000.0", "out of range")]
fn radiator_mistakes_are_rejected(#[case] line: &str, #[case] needle: &str) {
    let text = MINIMAL.replace(
        "[radiator]",
        &format!("[radiator]\n{line}"),
    );
    let cfg = load_toml(&text).expect("parse");
    let err = cfg.validate().unwrap_err();
    assert!(
        err.to_string().contains(needle),
        "expected {needle:?} in {err}"
    );
}

#[rstest]
#[case("min_delta_c = 0.0", "min_delta_c")]
#[case("max_delta_c = 2.0", "max_delta_c")]
#[case("gap_limit_c = -1.0", "gap_limit_c")]
#[case("inlet_penalty = 0\noutlet_penalty = 0", "penalty")]
fn boiler_mistakes_are_rejected(#[case] line: &str, #[case] needle: &str) {
    let text = MINIMAL.replace("[boiler]", &format!("[boiler]\n{line}"));
    let cfg = load_toml(&text).expect("parse");
    let err = cfg.validate().unwrap_err();
    assert!(
        err.to_string().contains(needle),
        "expected {needle:?} in {err}"
    );
}

#[rstest]
#[case("not-an-address")]
#[case("28:D9:F8:D5:03:00:00")]
#[case("28:D9:F8:D5:03:00:00:B0:FF")]
#[case("2G:D9:F8:D5:03:00:00:B0")]
#[case("28:D9:F8:D5:03:00:00:B")]
fn malformed_addresses_are_rejected(#[case] addr: &str) {
    let text = MINIMAL.replace("28:D9:F8:D5:03:00:00:B0", addr);
    let cfg = load_toml(&text).expect("parse");
    let err = cfg.validate().unwrap_err();
    assert!(err.to_string().contains("feed_sensor"), "got {err}");
}

#[rstest]
#[case("gain_p = -1", "gains")]
#[case("output_max_ms = -1", "straddle")]
#[case("integral_div = 0", "integral_div")]
#[case("derivative_div = 0", "derivative_div")]
#[case("large_error_c = 0.0", "large_error_c")]
fn regulator_mistakes_are_rejected(#[case] line: &str, #[case] needle: &str) {
    let text = format!("{MINIMAL}\n[boiler.regulator]\n{line}\n");
    let cfg = load_toml(&text).expect("parse");
    let err = cfg.validate().unwrap_err();
    assert!(
        err.to_string().contains(needle),
        "expected {needle:?} in {err}"
    );
}
