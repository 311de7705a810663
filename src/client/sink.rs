/// Append-only consumer for service output.
///
/// `shell:` output arrives in daemon-chosen chunks; the sink sees each chunk
/// exactly once, in order.
pub trait StreamSink: Send {
    /// Consume one chunk.
    fn push(&mut self, chunk: &[u8]);
}

impl StreamSink for Vec<u8> {
    fn push(&mut self, chunk: &[u8]) {
        self.extend_from_slice(chunk);
    }
}

/// Channel-backed sink for callers that stream output elsewhere. A closed
/// receiver drops further chunks silently.
impl StreamSink for tokio::sync::mpsc::UnboundedSender<Vec<u8>> {
    fn push(&mut self, chunk: &[u8]) {
        let _ = self.send(chunk.to_vec());
    }
}
