use anyhow::Result;

fn main() -> Result<()> {
    let _log_guard = quickhop::init_logging();
    quickhop::run()
}
