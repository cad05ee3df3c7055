fn main() {
    if let Err(err) = bank_csv_loader::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
