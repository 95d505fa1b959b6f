#[tokio::main]
async fn main() -> anyhow::Result<()> {
    carewatch_lib::run().await
}
