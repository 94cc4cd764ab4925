fn main() {
    if let Err(err) = newhorizon::cli::main() {
        eprintln!("❌ Error: {err}");
        std::process::exit(1);
    }
}
