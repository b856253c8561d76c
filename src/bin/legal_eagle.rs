use corpus::launch::{self, LaunchMode};
use corpus::themes::ThemeId;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    launch::run(LaunchMode::Single(ThemeId::Legal)).await
}
