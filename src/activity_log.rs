use anyhow::{Context, Result};
use std::path::Path;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Журнал активности: append-only файл с префиксом-таймштампом на каждой
/// строке. Передается явно в компоненты, которым он нужен, вместо
/// глобального логгера.
pub struct ActivityLog {
    file: Mutex<File>,
}

impl ActivityLog {
    pub async fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .with_context(|| format!("Failed to open activity log at {}", path.display()))?;

        Ok(Self {
            file: Mutex::new(file),
        })
    }

    /// Записывает одну запись. Мьютекс гарантирует, что записи из
    /// конкурентных запросов не перемешиваются.
    pub async fn log(&self, message: &str) -> Result<()> {
        let line = format!(
            "{} - {}\n",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
            message
        );

        let mut file = self.file.lock().await;
        file.write_all(line.as_bytes())
            .await
            .context("Failed to append to activity log")?;
        file.flush().await.context("Failed to flush activity log")?;

        Ok(())
    }
}
