#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Config parsing and validation must reject bad input without panicking.
    if let Ok(cfg) = irrigator_config::load_toml(data) {
        let _ = cfg.validate();
    }
    // Same for the standalone tray table.
    let _ = toml::from_str::<irrigator_config::TrayInputs>(data);
});
