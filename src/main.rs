#[tokio::main]
async fn main() {
    if let Err(e) = passgate::run().await {
        eprintln!("{:?}", e);
        std::process::exit(1);
    }
}
