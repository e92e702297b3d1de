//! Logging setup.

/// Installs `env_logger` as the global logger.
///
/// Honors `RUST_LOG`; defaults to `info` when it is unset. Calling this more
/// than once is harmless.
///
/// # Example
///
/// ```no_run
/// marchlife::init_logging();
/// log::info!("ready");
/// ```
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}
