use directories::ProjectDirs;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct AlQuranClientConfig {
    pub api_base: String,
    pub data_dir: PathBuf,
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub retries: u32,
    pub retry_backoff_ms: u64,
    pub retry_backoff_max_ms: u64,
}

impl Default for AlQuranClientConfig {
    fn default() -> Self {
        let data_dir = ProjectDirs::from("dev", "qasas", "qasas-player")
            .map(|p| p.data_local_dir().to_path_buf())
            .unwrap_or_else(|| std::env::temp_dir().join("qasas-player"));
        Self {
            api_base: "https://api.alquran.cloud/v1".to_owned(),
            data_dir,
            timeout_secs: 30,
            connect_timeout_secs: 10,
            retries: 2,
            retry_backoff_ms: 250,
            retry_backoff_max_ms: 2000,
        }
    }
}

impl AlQuranClientConfig {
    /// Directory holding the bundled `{chapter}.json` text files.
    pub fn text_dir(&self) -> PathBuf {
        self.data_dir.join("text")
    }
}
