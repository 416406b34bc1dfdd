use std::path::Path;

use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};

use crate::errors::*;

/// Keys read from a key file, one per line
#[derive(Debug, Default, Clone, PartialEq)]
pub struct KeyFile {
    pub keys: Vec<String>,

    /// Byte length of the longest key
    pub longest: usize,
}

/// Reads at most `limit` lines of `path`. A file shorter than `limit` is read
/// in full.
pub async fn read_keys(path: &Path, limit: usize) -> Result<KeyFile> {
    let file = File::open(path).await?;
    let key_file = read_keys_from(BufReader::new(file), limit).await?;
    if key_file.keys.is_empty() {
        return Err(IndexError::EmptyKeyFile(path.to_path_buf()));
    }
    Ok(key_file)
}

pub async fn read_keys_from<R: AsyncRead + Unpin>(
    reader: BufReader<R>,
    limit: usize,
) -> Result<KeyFile> {
    let mut lines = reader.lines();
    let mut key_file = KeyFile::default();
    while key_file.keys.len() < limit {
        let Some(line) = lines.next_line().await? else {
            break;
        };
        key_file.longest = key_file.longest.max(line.len());
        key_file.keys.push(line);
    }
    Ok(key_file)
}
