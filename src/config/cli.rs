use crate::core::Storage;
use crate::utils::error::Result;
use std::path::PathBuf;
use tokio::fs;
use tokio::io::AsyncWriteExt;

#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    async fn prepare(&self, path: &str) -> Result<PathBuf> {
        let full_path = self.base_path.join(path);
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(full_path)
    }
}

impl Storage for LocalStorage {
    async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        let full_path = self.prepare(path).await?;
        let mut partial = full_path.clone().into_os_string();
        partial.push(".part");
        let partial = PathBuf::from(partial);

        fs::write(&partial, data).await?;
        fs::rename(&partial, &full_path).await?;
        Ok(())
    }

    async fn append_file(&self, path: &str, data: &[u8]) -> Result<()> {
        let full_path = self.prepare(path).await?;
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(full_path)
            .await?;
        file.write_all(data).await?;
        file.flush().await?;
        Ok(())
    }
}
