use corpus::launch::{self, LaunchMode};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    launch::run(LaunchMode::Launcher).await
}
