#![no_main]
use libfuzzer_sys::fuzz_target;

// Arbitrary TOML must either fail to parse, fail validation, or yield a
// config whose profiles and runner limits convert without panicking.
fuzz_target!(|data: &str| {
    let Ok(cfg) = mpstream_config::load_toml(data) else {
        return;
    };
    if cfg.validate().is_err() {
        return;
    }
    let _ = mpstream_core::StreamCfg::from(&cfg.streaming);
    let _ = mpstream_core::CoordinatorCfg::from(&cfg.coordinator);
    let _ = mpstream_core::RunnerCfg::from(&cfg.runner);
    let _ = mpstream_core::conversions::pidf_from(&cfg.axes.left.gains);
    let _ = mpstream_core::conversions::pidf_from(&cfg.axes.right.gains);
});
