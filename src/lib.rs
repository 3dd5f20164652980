pub mod action;
pub mod capabilities;
pub mod control;
pub mod data;
pub mod decision;
pub mod error;
pub mod geometry;
pub mod llm;
pub mod platform;
pub mod replay;
pub mod rules;
pub mod session;
pub mod state;
pub mod vision;

#[cfg(feature = "cli")]
pub mod cli;

/// Initializes logging and installs a ctrl-c handler that exits after
/// letting `SessionLoop` observe the cancellation flag for one more
/// tick. Term logs at `Info`, file logs at `Debug`, matching the
/// combined-logger split used throughout this crate's peers.
#[cfg(feature = "logging")]
pub fn init(cancelled: std::sync::Arc<std::sync::atomic::AtomicBool>) {
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        println!();
        log::warn!("ctrl-c received, stopping after the current tick");
        cancelled.store(true, std::sync::atomic::Ordering::SeqCst);
    });

    std::fs::create_dir_all("logs").expect("create logs directory");
    let config = simplelog::ConfigBuilder::new()
        .set_location_level(log::LevelFilter::Off)
        .set_target_level(log::LevelFilter::Off)
        .set_thread_level(log::LevelFilter::Off)
        .build();
    let time = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("time moves slow")
        .as_secs();
    let file = simplelog::WriteLogger::new(
        log::LevelFilter::Debug,
        config.clone(),
        std::fs::File::create(format!("logs/{}.log", time)).expect("create log file"),
    );
    let term = simplelog::TermLogger::new(
        log::LevelFilter::Info,
        config,
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    );
    simplelog::CombinedLogger::init(vec![term, file]).expect("initialize logger");
}
