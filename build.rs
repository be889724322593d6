fn main() {
    use vergen::{BuildBuilder, Emitter};

    // Build metadata for --version; a failed emit only degrades the
    // version string.
    let mut emitter = Emitter::default();
    if let Ok(build) = BuildBuilder::all_build() {
        let _ = emitter.add_instructions(&build);
    }
    if let Err(err) = emitter.emit() {
        eprintln!("vergen emit skipped: {err}");
    }
}
