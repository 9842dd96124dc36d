//! Newline-delimited JSON event output.

use std::io::Write;

use persona_core::{EventSink, PersonaEvent};
use tracing::warn;

/// Writes each event as one JSON object per line.
///
/// Write failures are logged and counted, never returned: sinks must not
/// fail the call that produced the event.
#[derive(Debug)]
pub struct JsonLinesSink<W: Write + Send> {
    writer: W,
    written: u64,
    failures: u64,
}

impl<W: Write + Send> JsonLinesSink<W> {
    /// Sink writing to `writer`.
    pub const fn new(writer: W) -> Self {
        Self {
            writer,
            written: 0,
            failures: 0,
        }
    }

    /// Events written successfully.
    #[must_use]
    pub const fn written(&self) -> u64 {
        self.written
    }

    /// Events that could not be written.
    #[must_use]
    pub const fn failures(&self) -> u64 {
        self.failures
    }

    /// Recover the writer.
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_line(&mut self, event: &PersonaEvent) -> std::io::Result<()> {
        serde_json::to_writer(&mut self.writer, event)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()
    }
}

impl<W: Write + Send> EventSink for JsonLinesSink<W> {
    fn publish(&mut self, event: &PersonaEvent) {
        match self.write_line(event) {
            Ok(()) => self.written += 1,
            Err(e) => {
                self.failures += 1;
                warn!(kind = event.name(), error = %e, "Failed to write event");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use persona_core::{Address, QuestId};

    struct Broken;

    impl Write for Broken {
        fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::other("disk full"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn one_event_per_line() {
        let mut sink = JsonLinesSink::new(Vec::new());
        for n in 0..3 {
            sink.publish(&PersonaEvent::QuestAccepted {
                quest_id: QuestId(n),
                player: Address::from_low_u64(9),
            });
        }
        assert_eq!(sink.written(), 3);

        let out = String::from_utf8(sink.into_inner()).expect("utf8");
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 3);
        let first: serde_json::Value = serde_json::from_str(lines[0]).expect("json");
        assert_eq!(first["event"], "quest_accepted");
    }

    #[test]
    fn write_failures_are_counted_not_raised() {
        let mut sink = JsonLinesSink::new(Broken);
        sink.publish(&PersonaEvent::QuestFailed {
            quest_id: QuestId(1),
            player: Address::ZERO,
        });
        assert_eq!(sink.written(), 0);
        assert_eq!(sink.failures(), 1);
    }
}
