use std::collections::BTreeMap;
use std::io;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use crate::shuffle::constants::LINE_TERMINATOR;

/// A line pulled from the input, tagged with its 0-based input position.
/// `bytes` excludes the terminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub position: usize,
    pub bytes: Vec<u8>,
}

struct ReaderState<R> {
    source: R,
    next_position: usize,
    exhausted: bool,
}

/// Forward-only line cursor shared by all workers.
pub struct SynchronizedReader<R> {
    state: Mutex<ReaderState<R>>,
}

impl<R: AsyncBufRead + Unpin> SynchronizedReader<R> {
    pub fn new(source: R) -> Self {
        Self {
            state: Mutex::new(ReaderState {
                source,
                next_position: 0,
                exhausted: false,
            }),
        }
    }

    /// Pull the next line. `Ok(None)` once the input is exhausted.
    pub async fn next_line(&self) -> io::Result<Option<Line>> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;

        if state.exhausted {
            return Ok(None);
        }

        let mut bytes = Vec::new();
        let read = state.source.read_until(LINE_TERMINATOR, &mut bytes).await?;
        if read == 0 {
            state.exhausted = true;
            return Ok(None);
        }

        if bytes.last() == Some(&LINE_TERMINATOR) {
            bytes.pop();
        }

        let position = state.next_position;
        state.next_position += 1;
        Ok(Some(Line { position, bytes }))
    }

    pub async fn lines_read(&self) -> usize {
        self.state.lock().await.next_position
    }
}

/// Where each written line ends up in the output
#[derive(Debug, Clone)]
pub enum Placement {
    /// Arrival order
    Append,
    /// `slots[position]` is the output slot of the line read at `position`
    Slots(Vec<usize>),
}

enum Layout {
    Append,
    Slots {
        slots: Vec<usize>,
        next_slot: usize,
        pending: BTreeMap<usize, Vec<u8>>,
    },
}

struct WriterState<W> {
    sink: W,
    layout: Layout,
    lines_written: usize,
}

/// Output sink shared by all workers.
///
/// With `Placement::Slots`, a line whose slot is ahead of the next unwritten
/// slot is parked until every slot before it has been written.
pub struct SynchronizedWriter<W> {
    state: Mutex<WriterState<W>>,
}

impl<W: AsyncWrite + Unpin> SynchronizedWriter<W> {
    pub fn new(sink: W, placement: Placement) -> Self {
        let layout = match placement {
            Placement::Append => Layout::Append,
            Placement::Slots(slots) => Layout::Slots {
                slots,
                next_slot: 0,
                pending: BTreeMap::new(),
            },
        };

        Self {
            state: Mutex::new(WriterState {
                sink,
                layout,
                lines_written: 0,
            }),
        }
    }

    pub async fn write_line(&self, line: Line) -> io::Result<()> {
        let mut guard = self.state.lock().await;
        let WriterState { sink, layout, lines_written } = &mut *guard;

        match layout {
            Layout::Append => {
                write_terminated(&mut *sink, &line.bytes).await?;
                *lines_written += 1;
            }
            Layout::Slots { slots, next_slot, pending } => {
                let slot = *slots.get(line.position).ok_or_else(|| {
                    io::Error::new(
                        io::ErrorKind::InvalidInput,
                        format!("line position {} has no output slot", line.position),
                    )
                })?;
                pending.insert(slot, line.bytes);

                while let Some(bytes) = pending.remove(&*next_slot) {
                    write_terminated(&mut *sink, &bytes).await?;
                    *next_slot += 1;
                    *lines_written += 1;
                }
            }
        }

        Ok(())
    }

    /// Write out anything still parked (slots whose predecessors never
    /// arrived), flush the sink and return the number of lines written.
    pub async fn finish(&self) -> io::Result<usize> {
        let mut guard = self.state.lock().await;
        let WriterState { sink, layout, lines_written } = &mut *guard;

        if let Layout::Slots { pending, .. } = layout {
            for (_, bytes) in std::mem::take(pending) {
                write_terminated(&mut *sink, &bytes).await?;
                *lines_written += 1;
            }
        }

        sink.flush().await?;
        Ok(*lines_written)
    }

    pub async fn lines_written(&self) -> usize {
        self.state.lock().await.lines_written
    }

    pub async fn pending_lines(&self) -> usize {
        match &self.state.lock().await.layout {
            Layout::Append => 0,
            Layout::Slots { pending, .. } => pending.len(),
        }
    }

    pub fn into_inner(self) -> W {
        self.state.into_inner().sink
    }
}

async fn write_terminated<W: AsyncWrite + Unpin>(sink: &mut W, bytes: &[u8]) -> io::Result<()> {
    sink.write_all(bytes).await?;
    sink.write_all(&[LINE_TERMINATOR]).await
}
