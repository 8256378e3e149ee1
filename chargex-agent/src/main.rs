fn main() {
    if let Err(err) = chargex_demo::app::run_agent() {
        eprintln!("agent run failed: {err}");
        std::process::exit(1);
    }
}
