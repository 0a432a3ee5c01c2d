use anyhow::Result;
use tracing::Level;
use tracing_subscriber::fmt;

pub fn init(level: Level) -> Result<()> {
    let _ = fmt()
        .with_max_level(level)
        .with_target(false)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .try_init();
    Ok(())
}
