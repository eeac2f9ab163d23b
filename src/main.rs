fn main() {
    if let Err(e) = gestantes_lib::run() {
        eprintln!("gestantes: {e}");
        std::process::exit(1);
    }
}
