use crate::{wire::ChatReply, InferenceError, Result};

/// Successful outcome of [`InferenceClient::chat`](crate::InferenceClient::chat).
#[derive(Debug)]
pub enum ChatResponse {
    /// Fully read and decoded reply of a non-streaming call.
    Complete(ChatReply),
    /// Incremental NDJSON body of a streaming call.
    Streaming(ChatStream),
}

impl ChatResponse {
    /// Collects the assistant text, draining the stream if there is one.
    pub async fn into_text(self) -> Result<String> {
        match self {
            Self::Complete(reply) => Ok(reply.message.content),
            Self::Streaming(mut stream) => {
                let mut text = String::new();
                while let Some(chunk) = stream.next_chunk().await? {
                    text.push_str(&chunk.message.content);
                }
                Ok(text)
            }
        }
    }
}

/// Reads a streamed chat body one JSON line at a time.
#[derive(Debug)]
pub struct ChatStream {
    response: reqwest::Response,
    buffer: Vec<u8>,
    eof: bool,
    finished: bool,
}

impl ChatStream {
    pub(crate) fn new(response: reqwest::Response) -> Self {
        Self {
            response,
            buffer: Vec::new(),
            eof: false,
            finished: false,
        }
    }

    /// Returns the next decoded chunk.
    ///
    /// Blank and undecodable lines are skipped. Yields `None` at the end of
    /// the body or once a chunk with `done: true` has been returned.
    pub async fn next_chunk(&mut self) -> Result<Option<ChatReply>> {
        while !self.finished {
            let line = match take_line(&mut self.buffer) {
                Some(line) => line,
                None if self.eof => {
                    self.finished = true;
                    std::mem::take(&mut self.buffer)
                }
                None => {
                    match self
                        .response
                        .chunk()
                        .await
                        .map_err(InferenceError::Transport)?
                    {
                        Some(bytes) => self.buffer.extend_from_slice(&bytes),
                        None => self.eof = true,
                    }
                    continue;
                }
            };

            if let Some(chunk) = decode_line(&line) {
                if chunk.done {
                    self.finished = true;
                }
                return Ok(Some(chunk));
            }
        }
        Ok(None)
    }
}

fn take_line(buffer: &mut Vec<u8>) -> Option<Vec<u8>> {
    let newline = buffer.iter().position(|byte| *byte == b'\n')?;
    let mut line: Vec<u8> = buffer.drain(..=newline).collect();
    line.pop();
    Some(line)
}

fn decode_line(line: &[u8]) -> Option<ChatReply> {
    let trimmed = std::str::from_utf8(line).ok()?.trim();
    if trimmed.is_empty() {
        return None;
    }
    match serde_json::from_str(trimmed) {
        Ok(chunk) => Some(chunk),
        Err(err) => {
            tracing::debug!("skipping undecodable stream line: {err}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{decode_line, take_line};

    #[test]
    fn take_line_splits_on_newline_and_keeps_remainder() {
        let mut buffer = b"{\"a\":1}\n{\"b\"".to_vec();
        assert_eq!(take_line(&mut buffer), Some(b"{\"a\":1}".to_vec()));
        assert_eq!(buffer, b"{\"b\"".to_vec());
        assert_eq!(take_line(&mut buffer), None);
    }

    #[test]
    fn decode_line_skips_blank_and_garbage() {
        assert!(decode_line(b"   ").is_none());
        assert!(decode_line(b"not json").is_none());
        let chunk = decode_line(b"{\"message\":{\"role\":\"assistant\",\"content\":\"1\"}}\r")
            .expect("valid chunk must decode");
        assert_eq!(chunk.message.content, "1");
    }
}
