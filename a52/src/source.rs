//! Byte sources the prober and demux loop read from.

use std::io::{self, Read, Seek, SeekFrom};

/// Sequential byte access with non-destructive lookahead.
pub trait ByteSource {
    /// Returns up to `len` bytes from the current position without consuming
    /// them. A short slice means the source ran out of data.
    fn peek(&mut self, len: usize) -> io::Result<&[u8]>;

    /// Consumes and returns up to `len` bytes. An empty vector marks the end of
    /// the source.
    fn read(&mut self, len: usize) -> io::Result<Vec<u8>>;

    /// Consumes up to `len` bytes, returning how many were skipped.
    fn skip(&mut self, len: usize) -> io::Result<usize>;

    /// Number of bytes consumed since the start of the stream.
    fn tell(&self) -> u64;

    /// Total stream length, when known.
    fn size(&self) -> Option<u64>;
}

/// [`ByteSource`] over any reader, buffering what has been peeked.
///
/// Works for pipes as well as files; only files report a size.
#[derive(Debug)]
pub struct StreamSource<R> {
    inner: R,
    lookahead: Vec<u8>,
    position: u64,
    size: Option<u64>,
    eof: bool,
}

impl<R: Read> StreamSource<R> {
    pub fn new(inner: R, size: Option<u64>) -> Self {
        Self {
            inner,
            lookahead: Vec::new(),
            position: 0,
            size,
            eof: false,
        }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    fn fill(&mut self, len: usize) -> io::Result<()> {
        while self.lookahead.len() < len && !self.eof {
            let start = self.lookahead.len();
            self.lookahead.resize(len, 0);

            let read = loop {
                match self.inner.read(&mut self.lookahead[start..]) {
                    Ok(n) => break n,
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => {
                        self.lookahead.truncate(start);
                        return Err(e);
                    }
                }
            };

            self.lookahead.truncate(start + read);
            if read == 0 {
                self.eof = true;
            }
        }

        Ok(())
    }
}

impl<R: Read + Seek> StreamSource<R> {
    /// Creates a source over a seekable reader, taking its length as the
    /// stream size and rewinding it to the start.
    pub fn from_seekable(mut inner: R) -> io::Result<Self> {
        let size = inner.seek(SeekFrom::End(0))?;
        inner.rewind()?;

        Ok(Self::new(inner, Some(size)))
    }
}

impl<R: Read> ByteSource for StreamSource<R> {
    fn peek(&mut self, len: usize) -> io::Result<&[u8]> {
        self.fill(len)?;
        let available = len.min(self.lookahead.len());

        Ok(&self.lookahead[..available])
    }

    fn read(&mut self, len: usize) -> io::Result<Vec<u8>> {
        let buffered = len.min(self.lookahead.len());
        let mut chunk = Vec::with_capacity(len);
        chunk.extend(self.lookahead.drain(..buffered));

        if chunk.len() < len && !self.eof {
            let wanted = (len - chunk.len()) as u64;
            let read = (&mut self.inner).take(wanted).read_to_end(&mut chunk)?;
            if (read as u64) < wanted {
                self.eof = true;
            }
        }

        self.position += chunk.len() as u64;
        Ok(chunk)
    }

    fn skip(&mut self, len: usize) -> io::Result<usize> {
        let buffered = len.min(self.lookahead.len());
        self.lookahead.drain(..buffered);
        let mut skipped = buffered as u64;

        if skipped < len as u64 && !self.eof {
            let wanted = len as u64 - skipped;
            let copied = io::copy(&mut (&mut self.inner).take(wanted), &mut io::sink())?;
            if copied < wanted {
                self.eof = true;
            }
            skipped += copied;
        }

        self.position += skipped;
        Ok(skipped as usize)
    }

    fn tell(&self) -> u64 {
        self.position
    }

    fn size(&self) -> Option<u64> {
        self.size
    }
}
