use std::io::{self, Read, Seek, SeekFrom};

/// Size of the blocks read from the end of the file
pub const DEFAULT_CHUNK_SIZE: usize = 8192;

/// Iterator over the lines of a seekable reader, starting from the last line
///
/// Blocks of `chunk_size` bytes are read backward from the end and only the
/// bytes of the line being assembled are kept in memory.
/// A single newline at the very end of the input terminates the last line and
/// does not yield an empty line.
#[derive(Debug)]
pub struct ReverseLines<R> {
    reader: R,
    /// Offset of the first byte already loaded into `pending`
    position: u64,
    /// Bytes loaded from the reader that have not been yielded yet
    pending: Vec<u8>,
    chunk_size: usize,
    exhausted: bool,
    /// Whether the input ends with a newline
    terminated: bool,
}

impl<R: Read + Seek> ReverseLines<R> {
    /// Create a new [`ReverseLines`] with the default chunk size
    pub fn new(reader: R) -> io::Result<Self> {
        Self::with_chunk_size(reader, DEFAULT_CHUNK_SIZE)
    }

    /// Create a new [`ReverseLines`] reading blocks of `chunk_size` bytes
    pub fn with_chunk_size(mut reader: R, chunk_size: usize) -> io::Result<Self> {
        let len = reader.seek(SeekFrom::End(0))?;
        let mut position = len;
        let mut terminated = true;

        if len > 0 {
            let mut last = [0u8];
            reader.seek(SeekFrom::Start(len - 1))?;
            reader.read_exact(&mut last)?;
            if last[0] == b'\n' {
                position -= 1;
            } else {
                terminated = false;
            }
        }

        Ok(Self {
            reader,
            position,
            pending: Vec::new(),
            chunk_size: chunk_size.max(1),
            exhausted: len == 0,
            terminated,
        })
    }

    /// Whether the last line of the input is followed by a newline
    ///
    /// An empty input is considered terminated.
    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Load the block preceding the already loaded bytes
    fn fill(&mut self) -> io::Result<()> {
        let len = self.position.min(self.chunk_size as u64);
        self.position -= len;

        let mut chunk = vec![0u8; len as usize];
        self.reader.seek(SeekFrom::Start(self.position))?;
        self.reader.read_exact(&mut chunk)?;

        chunk.extend_from_slice(&self.pending);
        self.pending = chunk;
        Ok(())
    }
}

impl<R: Read + Seek> Iterator for ReverseLines<R> {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.exhausted {
            return None;
        }

        loop {
            if let Some(newline) = self.pending.iter().rposition(|&b| b == b'\n') {
                let line = self.pending.split_off(newline + 1);
                self.pending.truncate(newline);
                return Some(Ok(decode(line)));
            }

            if self.position == 0 {
                // Start of input: whatever remains is the first line
                self.exhausted = true;
                return Some(Ok(decode(std::mem::take(&mut self.pending))));
            }

            if let Err(err) = self.fill() {
                self.exhausted = true;
                return Some(Err(err));
            }
        }
    }
}

fn decode(mut line: Vec<u8>) -> String {
    if line.last() == Some(&b'\r') {
        line.pop();
    }
    match String::from_utf8(line) {
        Ok(line) => line,
        Err(err) => String::from_utf8_lossy(err.as_bytes()).into_owned(),
    }
}
