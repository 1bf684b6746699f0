use std::path::Path;
use std::process::Command;

use proctor_worker::WorkerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = WorkerConfig::from_env();

    println!(
        "proctor-selfcheck: starting with uploads_dir={}",
        config.uploads_dir.display()
    );
    if !proctor_media::ffmpeg_available() {
        return Err(anyhow::anyhow!("ffmpeg and ffprobe must both be on PATH"));
    }
    ensure_tool("ffmpeg")?;
    ensure_tool("ffprobe")?;
    ensure_model(&config.object_model)?;
    ensure_uploads_writable(&config.uploads_dir).await?;

    println!("proctor-selfcheck: ok");
    Ok(())
}

fn ensure_tool(name: &str) -> anyhow::Result<()> {
    let output = Command::new(name)
        .arg("-version")
        .output()
        .map_err(|e| anyhow::anyhow!("{} not available: {}", name, e))?;

    if !output.status.success() {
        return Err(anyhow::anyhow!("{} -version failed: {:?}", name, output.status));
    }
    Ok(())
}

fn ensure_model(path: &str) -> anyhow::Result<()> {
    if !proctor_media::object_detector::is_model_available_at(path) {
        return Err(anyhow::anyhow!("object detection model not found at {}", path));
    }
    Ok(())
}

async fn ensure_uploads_writable<P: AsRef<Path>>(path: P) -> anyhow::Result<()> {
    let path = path.as_ref();
    tokio::fs::create_dir_all(path).await?;

    let probe = path.join(".proctor-selfcheck");
    tokio::fs::write(&probe, b"ok")
        .await
        .map_err(|e| anyhow::anyhow!("uploads dir {} not writable: {}", path.display(), e))?;
    tokio::fs::remove_file(&probe).await?;
    Ok(())
}
