use std::io::Write;

/// Markers written per line by [`DotProgress`].
pub const DOTS_PER_LINE: usize = 80;

/// Receives one notification per sample processed by the batch aggregator.
pub trait Progress {
    /// `index` counts processed samples from zero.
    fn sample_done(&mut self, index: usize, sample: &str);

    fn finish(&mut self) {}
}

/// Reports nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl Progress for NoProgress {
    fn sample_done(&mut self, _index: usize, _sample: &str) {}
}

/// Writes a `.` per sample and breaks the line after every 80.
#[derive(Debug)]
pub struct DotProgress<W: Write> {
    out: W,
    written: usize,
}

impl<W: Write> DotProgress<W> {
    pub fn new(out: W) -> Self {
        DotProgress { out, written: 0 }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write(&mut self, text: &str) {
        // output is cosmetic, a broken sink must not fail the batch
        if let Err(e) = self.out.write_all(text.as_bytes()).and_then(|_| self.out.flush()) {
            log::debug!("Progress output failed: {}", e);
        }
    }
}

impl DotProgress<std::io::Stderr> {
    pub fn stderr() -> Self {
        DotProgress::new(std::io::stderr())
    }
}

impl<W: Write> Progress for DotProgress<W> {
    fn sample_done(&mut self, _index: usize, _sample: &str) {
        self.written += 1;
        if self.written % DOTS_PER_LINE == 0 {
            self.write(".\n");
        } else {
            self.write(".");
        }
    }

    fn finish(&mut self) {
        if self.written % DOTS_PER_LINE != 0 {
            self.write("\n");
        }
    }
}
