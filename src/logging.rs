use env_logger::{Builder, Env};

/// `GESTURENAV_LOG` takes precedence over `RUST_LOG`; default is `info`.
pub fn init() {
    let env = Env::default()
        .filter_or("GESTURENAV_LOG", std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()))
        .write_style("GESTURENAV_LOG_STYLE");
    let _ = Builder::from_env(env)
        .format_timestamp_millis()
        .format_target(false)
        .try_init();
}
