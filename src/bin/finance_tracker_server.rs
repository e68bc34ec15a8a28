use finance_tracker::{init, server::run_server};

#[tokio::main]
async fn main() {
    init();

    if let Err(err) = run_server().await {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}
