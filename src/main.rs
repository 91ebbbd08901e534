#[tokio::main]
async fn main() {
    std::process::exit(psprouter::app::startup::startup().await);
}
