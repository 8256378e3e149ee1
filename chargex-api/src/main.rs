fn main() {
    if let Err(err) = chargex_demo::app::run_api() {
        eprintln!("api startup failed: {err}");
        std::process::exit(1);
    }
}
