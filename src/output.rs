use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::info;

/// Serialize a value as JSON and write it with buffered async I/O
pub async fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T, pretty: bool) -> Result<()> {
    let encoded = if pretty {
        serde_json::to_vec_pretty(value)
    } else {
        serde_json::to_vec(value)
    }
    .with_context(|| format!("Failed to serialize {}", path.display()))?;

    let file = tokio::fs::File::create(path)
        .await
        .with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    writer.write_all(&encoded).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;

    info!("Wrote {} ({} bytes)", path.display(), encoded.len() + 1);
    Ok(())
}
