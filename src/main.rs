//! The usage-sync command-line executable.

fn main() -> anyhow::Result<()> {
    usage_sync::run()
}
