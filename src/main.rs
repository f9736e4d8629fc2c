#[tokio::main]
async fn main() -> std::io::Result<()> {
    parapet_server::run_with_config().await
}
