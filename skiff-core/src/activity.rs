use std::pin::Pin;

use futures_util::{Stream, StreamExt};
use serde::{Deserialize, Serialize};

use crate::client::ArchiveError;

/// One event from the gateway's network activity feed. Download events carry
/// the block index within the feed, not within any particular file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ActivityEvent {
    Download {
        #[serde(default)]
        block: u64,
        #[serde(default)]
        bytes: u64,
    },
    Upload {
        #[serde(default)]
        block: u64,
        #[serde(default)]
        bytes: u64,
    },
    Sync {
        version: u64,
    },
    NetworkChanged {
        connections: u32,
    },
}

type ChunkStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>, reqwest::Error>> + Send>>;

/// Pull side of the activity subscription: newline-delimited JSON over a
/// long-lived response body. Dropping the stream closes the subscription.
pub struct ActivityStream {
    body: ChunkStream,
    buffer: Vec<u8>,
    done: bool,
}

impl std::fmt::Debug for ActivityStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActivityStream")
            .field("buffer", &self.buffer)
            .field("done", &self.done)
            .finish_non_exhaustive()
    }
}

impl ActivityStream {
    pub(crate) fn from_response(response: reqwest::Response) -> Self {
        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map(|bytes| bytes.to_vec()));
        Self {
            body: Box::pin(body),
            buffer: Vec::new(),
            done: false,
        }
    }

    /// Next event, `Ok(None)` once the gateway ends the feed. Blank lines
    /// are keep-alives and skipped.
    pub async fn recv(&mut self) -> Result<Option<ActivityEvent>, ArchiveError> {
        loop {
            if let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
                let line: Vec<u8> = self.buffer.drain(..=pos).collect();
                let line = line[..pos].trim_ascii();
                if line.is_empty() {
                    continue;
                }
                return Ok(Some(serde_json::from_slice(line)?));
            }

            if self.done {
                // flush a final unterminated line
                let line = std::mem::take(&mut self.buffer);
                let line = line.trim_ascii();
                if line.is_empty() {
                    return Ok(None);
                }
                return Ok(Some(serde_json::from_slice(line)?));
            }

            match self.body.next().await {
                Some(chunk) => self.buffer.extend_from_slice(&chunk?),
                None => self.done = true,
            }
        }
    }
}
