//! Logging setup: a terminal logger at info level plus a debug-level file
//! logger under `logs/`.

use std::sync::Once;

static INIT: Once = Once::new();

/// Initialize the combined term + file logger. Idempotent: safe to call
/// from multiple tests or from both a binary's `main` and a library caller.
pub fn init() {
    INIT.call_once(|| {
        if let Err(err) = try_init() {
            eprintln!("failed to initialize logging: {err}");
        }
    });
}

fn try_init() -> anyhow::Result<()> {
    std::fs::create_dir_all("logs")?;
    let config = simplelog::ConfigBuilder::new()
        .set_location_level(log::LevelFilter::Off)
        .set_target_level(log::LevelFilter::Off)
        .set_thread_level(log::LevelFilter::Off)
        .build();
    let time = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("time moves forward")
        .as_secs();
    let file = simplelog::WriteLogger::new(
        log::LevelFilter::Debug,
        config.clone(),
        std::fs::File::create(format!("logs/{time}.log"))?,
    );
    let term = simplelog::TermLogger::new(
        log::LevelFilter::Info,
        config,
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    );
    simplelog::CombinedLogger::init(vec![term, file])
        .map_err(|err| anyhow::anyhow!("logger already initialized: {err}"))
}
