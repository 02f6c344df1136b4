fn main() {
    if let Err(err) = csv_pgload::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
