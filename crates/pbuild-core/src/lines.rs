//! Line splitting over the editor's output pipes.
//!
//! The editor mixes line endings: `\n`, `\r\n`, and bare `\r` (progress
//! redraws on some platforms). Each of them ends a line; `\r\n` counts once.

use tokio::io::{AsyncBufRead, AsyncBufReadExt};

/// Reads lines terminated by `\n`, `\r\n` or `\r`.
///
/// All state lives in the reader, so [`next_line`](Self::next_line) is
/// cancel-safe.
#[derive(Debug)]
pub struct LineReader<R> {
    reader: R,
    pending: Vec<u8>,
    skip_lf: bool,
    eof: bool,
}

impl<R: AsyncBufRead + Unpin> LineReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            pending: Vec::new(),
            skip_lf: false,
            eof: false,
        }
    }

    /// Next line without its terminator, or `None` at end of stream.
    ///
    /// A final line with no terminator is still returned.
    pub async fn next_line(&mut self) -> std::io::Result<Option<Vec<u8>>> {
        if self.eof {
            return Ok(None);
        }

        loop {
            let available = self.reader.fill_buf().await?;
            if available.is_empty() {
                self.eof = true;
                if self.pending.is_empty() {
                    return Ok(None);
                }
                return Ok(Some(std::mem::take(&mut self.pending)));
            }

            // `\n` completing a `\r\n` split across reads.
            let mut start = 0;
            if self.skip_lf {
                self.skip_lf = false;
                if available[0] == b'\n' {
                    start = 1;
                }
            }

            let rest = &available[start..];
            match rest.iter().position(|&b| b == b'\n' || b == b'\r') {
                Some(pos) => {
                    self.pending.extend_from_slice(&rest[..pos]);
                    let mut used = start + pos + 1;
                    if rest[pos] == b'\r' {
                        match rest.get(pos + 1) {
                            Some(b'\n') => used += 1,
                            Some(_) => {}
                            None => self.skip_lf = true,
                        }
                    }
                    self.reader.consume(used);
                    return Ok(Some(std::mem::take(&mut self.pending)));
                }
                None => {
                    self.pending.extend_from_slice(rest);
                    let used = available.len();
                    self.reader.consume(used);
                }
            }
        }
    }
}
