use std::fmt;
use std::path::PathBuf;

use tracing::{info, warn};

use crate::Result;

/// Where the clinic CSV comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    /// A CSV file on disk.
    File(PathBuf),
    /// CSV text held in memory (tests, embedded fixtures).
    Inline(String),
    /// A CSV served over HTTP(S).
    #[cfg(feature = "download_data")]
    Url(String),
}

impl DataSource {
    /// Interpret a user-supplied location: `http(s)://` values become
    /// [`DataSource::Url`] when downloads are enabled, anything else a file path.
    pub fn parse(location: &str) -> Self {
        let is_url = location.starts_with("http://") || location.starts_with("https://");
        #[cfg(feature = "download_data")]
        {
            if is_url {
                return Self::Url(location.to_string());
            }
        }
        if is_url {
            warn!(
                location,
                "download_data feature is disabled, treating URL as a file path"
            );
        }
        Self::File(PathBuf::from(location))
    }

    pub async fn read_bytes(&self) -> Result<Vec<u8>> {
        match self {
            Self::File(path) => {
                info!(path = %path.display(), "Reading clinic CSV from disk");
                Ok(tokio::fs::read(path).await?)
            }
            Self::Inline(text) => Ok(text.as_bytes().to_vec()),
            #[cfg(feature = "download_data")]
            Self::Url(url) => crate::fetch::download_csv(url).await,
        }
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "file:{}", path.display()),
            Self::Inline(text) => write!(f, "inline:{} bytes", text.len()),
            #[cfg(feature = "download_data")]
            Self::Url(url) => write!(f, "{url}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_file_path() {
        assert_eq!(
            DataSource::parse("./clinics.csv"),
            DataSource::File(PathBuf::from("./clinics.csv"))
        );
    }

    #[cfg(feature = "download_data")]
    #[test]
    fn test_parse_url() {
        assert_eq!(
            DataSource::parse("https://example.org/clinics.csv"),
            DataSource::Url("https://example.org/clinics.csv".to_string())
        );
    }

    #[tokio::test]
    async fn test_inline_bytes() {
        let source = DataSource::Inline("NAME,LAT,LONG\n".to_string());

        assert_eq!(source.read_bytes().await.unwrap(), b"NAME,LAT,LONG\n");
        assert_eq!(source.to_string(), "inline:14 bytes");
    }
}
