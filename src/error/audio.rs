//! Audio output errors

/// Errors raised while loading or starting an item on the audio output
#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    /// Downloading the audio file failed
    #[error("download failed ({url}): {message}")]
    Download { url: String, message: String },

    /// Opening the downloaded file failed
    #[error("failed to open audio file: {source}")]
    OpenFile {
        #[source]
        source: std::io::Error,
    },

    /// Decoding failed
    #[error("failed to decode audio ({url}): {source}")]
    Decode {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Output device could not be opened
    #[error("failed to open audio output stream: {0}")]
    OutputStream(String),

    /// Background helper thread could not be spawned
    #[error("failed to spawn audio thread: {source}")]
    Thread {
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_download_error_mentions_url() {
        let err = AudioError::Download {
            url: "https://cdn.example/1.mp3".to_owned(),
            message: "HTTP 404".to_owned(),
        };
        assert!(err.to_string().contains("cdn.example/1.mp3"));
        assert!(err.to_string().contains("HTTP 404"));
    }
}
