mod api;
mod app;
mod art;
mod config;
mod countdown;
mod entities;
mod launch;
mod machine;
mod render;
mod scene;
mod scheduler;
mod weatherfx;

use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    app::run().await
}
