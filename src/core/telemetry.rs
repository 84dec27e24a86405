use tracing::Level;

/// Install a fmt subscriber at the given level.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_tracing(level: Level) {
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .try_init();
}
