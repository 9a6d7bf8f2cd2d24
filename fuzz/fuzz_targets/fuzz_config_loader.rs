#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Fuzz TOML parsing of Config: malformed input must come back as an
    // error, never a panic, and validate() must hold the same bar.
    match toml::from_str::<heat_config::Config>(data) {
        Ok(cfg) => {
            let _ = cfg.validate();
        }
        Err(_e) => {
            // parse error is acceptable
        }
    }
});
