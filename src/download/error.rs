use thiserror::Error;

use crate::graph::GraphError;

/// Reasons a single file download fails. Failures are recorded, never retried.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("Could not resolve download URL: {0}")]
    Resolve(#[from] GraphError),

    #[error("HTTP error {status} downloading {path}")]
    HttpStatus { status: u16, path: String },

    #[error("HTTP error downloading {path} (bytes_so_far={bytes_written}): {source}")]
    Http {
        source: reqwest::Error,
        path: String,
        bytes_written: u64,
    },

    #[error("Disk error: {0}")]
    Disk(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let e = DownloadError::HttpStatus {
            status: 404,
            path: "batch_1/a.flac".into(),
        };
        assert_eq!(e.to_string(), "HTTP error 404 downloading batch_1/a.flac");

        let e = DownloadError::from(GraphError::NoDownloadUrl("a.flac".into()));
        assert!(e.to_string().starts_with("Could not resolve download URL"));

        let e = DownloadError::Disk(std::io::Error::other("disk full"));
        assert_eq!(e.to_string(), "Disk error: disk full");
    }
}
