fn main() {
    if let Err(err) = hotel_etl::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
