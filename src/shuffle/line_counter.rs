use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use crate::shuffle::constants::{LINE_COUNT_BUFFER_SIZE, LINE_TERMINATOR};

/// Result of one scan over a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LineTally {
    pub terminators: usize,
    /// Non-empty bytes follow the last terminator
    pub trailing_fragment: bool,
}

impl LineTally {
    /// Lines a reader will yield, counting an unterminated tail as a line
    pub fn lines(&self) -> usize {
        self.terminators + usize::from(self.trailing_fragment)
    }
}

/// Count `\n` bytes in a file. An unterminated final line is not counted.
pub fn count_lines(path: &Path) -> io::Result<usize> {
    Ok(tally_lines(path)?.terminators)
}

pub fn tally_lines(path: &Path) -> io::Result<LineTally> {
    tally_lines_with_buffer(path, LINE_COUNT_BUFFER_SIZE)
}

/// Single forward pass with a fixed-size buffer; the file is never held in memory.
pub fn tally_lines_with_buffer(path: &Path, buffer_size: usize) -> io::Result<LineTally> {
    let mut file = File::open(path)?;
    let mut buffer = vec![0u8; buffer_size.max(1)];
    let mut tally = LineTally::default();
    let mut last_byte = None;

    loop {
        let read = match file.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };

        let chunk = &buffer[..read];
        tally.terminators += chunk.iter().filter(|&&b| b == LINE_TERMINATOR).count();
        last_byte = chunk.last().copied();
    }

    tally.trailing_fragment = matches!(last_byte, Some(b) if b != LINE_TERMINATOR);
    Ok(tally)
}
