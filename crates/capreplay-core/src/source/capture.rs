use std::ops::ControlFlow;

use tracing::debug;

use super::{Packet, PacketSource, Pass, SourceError, SourceOpener};

/// Open handle to a capture plus what is needed to reopen it.
///
/// The handle is released by [`close`](Self::close), by
/// [`reopen`](Self::reopen) before the new handle is acquired, and by `Drop`.
pub struct CaptureSource<O: SourceOpener> {
    opener: O,
    current: Option<O::Source>,
    opens: u64,
}

impl<O: SourceOpener> CaptureSource<O> {
    /// Open the capture for the first time.
    ///
    /// # Errors
    /// Returns the opener's `SourceError` when the capture is unavailable.
    pub fn open(opener: O) -> Result<Self, SourceError> {
        let source = opener.open()?;
        debug!(capture = %opener.describe(), "capture opened");
        Ok(Self {
            opener,
            current: Some(source),
            opens: 1,
        })
    }

    /// Iterate the currently open capture. A closed capture yields nothing.
    pub fn for_each_packet<F>(&mut self, f: F) -> Result<Pass, SourceError>
    where
        F: FnMut(&Packet<'_>) -> ControlFlow<()>,
    {
        match self.current.as_mut() {
            Some(source) => source.for_each_packet(f),
            None => Ok(Pass::Exhausted { packets: 0 }),
        }
    }

    /// Close the current handle and open the capture again from the start.
    ///
    /// On failure the capture stays closed.
    pub fn reopen(&mut self) -> Result<(), SourceError> {
        self.close();
        let source = self.opener.open()?;
        self.current = Some(source);
        self.opens += 1;
        debug!(capture = %self.opener.describe(), opens = self.opens, "capture reopened");
        Ok(())
    }

    /// Release the current handle. Closing twice is a no-op.
    pub fn close(&mut self) {
        if self.current.take().is_some() {
            debug!(capture = %self.opener.describe(), "capture closed");
        }
    }

    pub fn is_open(&self) -> bool {
        self.current.is_some()
    }

    /// Number of successful opens, the first one included.
    pub fn opens(&self) -> u64 {
        self.opens
    }

    pub fn describe(&self) -> String {
        self.opener.describe()
    }
}
