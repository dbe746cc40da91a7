use indicatif::ProgressStyle;

const FRAMES: &[&str] = &["⣾", "⣽", "⣻", "⢿", "⡿", "⣟", "⣯", "⣷"];

fn template(t: &str) -> ProgressStyle {
    ProgressStyle::with_template(t).expect("static template")
}

/// Yellow spinner with a free-form message, for single requests such as
/// listing an organisation.
pub fn spinner_style() -> ProgressStyle {
    template("\x1b[33m{spinner}\x1b[0m {wide_msg}").tick_strings(FRAMES)
}

/// Mirror run: `[done/total]`, elapsed time and the repository in flight.
pub fn batch_style() -> ProgressStyle {
    template("\x1b[33m{spinner}\x1b[0m [{pos}/{len}] {elapsed_precise} {wide_msg}")
        .tick_strings(FRAMES)
}

/// Finished without failures.
pub fn ok_style() -> ProgressStyle {
    template("\x1b[32m✔\x1b[0m {wide_msg}")
}

/// Final state when anything failed; the summary below has the details.
pub fn err_style() -> ProgressStyle {
    template("\x1b[31m✘\x1b[0m {wide_msg}")
}
