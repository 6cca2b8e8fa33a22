use colored::Colorize;

fn main() {
    if let Err(err) = agrotrace::run() {
        eprintln!("{} {}", "error:".bright_red().bold(), err);
        // Registry rule violations exit 2, storage and environment faults exit 1.
        let code = if err.is_domain() { 2 } else { 1 };
        std::process::exit(code);
    }
}
