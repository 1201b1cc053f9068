// ─────────────────────────────────────────────────────────────────────────────
// logging.rs — env_logger init helper (ambient), same as main.rs's
// `env_logger::init()` call, pulled into its own function so main stays
// a thin orchestration layer.
// ─────────────────────────────────────────────────────────────────────────────
pub fn init() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}
