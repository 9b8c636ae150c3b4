//! LogSink - logs packet summary via tracing

use std::collections::HashMap;

use contracts::{AcceptedPacket, ContractError, DataSink, MAX_SAMPLE_SIZE};
use tracing::{info, instrument};

/// Sink that logs packet summaries for debugging
pub struct LogSink {
    name: String,
    /// Bytes decoded as the leading word
    word_width: usize,
    /// Log one packet out of `every`
    every: u64,
    seen: u64,
}

impl LogSink {
    /// Create a new LogSink with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            word_width: MAX_SAMPLE_SIZE as usize,
            every: 1,
            seen: 0,
        }
    }

    /// Create from params map (`word_width`, `every`)
    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> Result<Self, ContractError> {
        let mut sink = Self::new(name);

        if let Some(width) = params.get("word_width") {
            sink.word_width = width
                .parse::<usize>()
                .ok()
                .filter(|w| (1..=MAX_SAMPLE_SIZE as usize).contains(w))
                .ok_or_else(|| {
                    ContractError::sink_creation(
                        &sink.name,
                        format!("word_width must be in 1..={MAX_SAMPLE_SIZE}, got {width}"),
                    )
                })?;
        }
        if let Some(every) = params.get("every") {
            sink.every = every.parse::<u64>().ok().filter(|e| *e > 0).ok_or_else(|| {
                ContractError::sink_creation(&sink.name, format!("every must be > 0, got {every}"))
            })?;
        }

        Ok(sink)
    }

    fn log_packet_summary(&self, packet: &AcceptedPacket) {
        info!(
            sink = %self.name,
            packet_id = packet.packet_id,
            stream_offset = packet.stream_offset,
            len = packet.len(),
            leading_word = format_args!("{:#x}", packet.leading_word(self.word_width)),
            "AcceptedPacket received"
        );
    }
}

impl DataSink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_sink_write",
        level = "trace",
        skip(self, packet),
        fields(sink = %self.name, packet_id = packet.packet_id)
    )]
    async fn write(&mut self, packet: &AcceptedPacket) -> Result<(), ContractError> {
        if self.seen % self.every == 0 {
            self.log_packet_summary(packet);
        }
        self.seen += 1;
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), ContractError> {
        Ok(())
    }

    #[instrument(name = "log_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        info!(sink = %self.name, packets = self.seen, "LogSink closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[tokio::test]
    async fn test_log_sink_write() {
        let mut sink = LogSink::new("test_log");
        let packet = AcceptedPacket {
            packet_id: 1,
            stream_offset: 64,
            payload: Bytes::from_static(&[1, 0, 0, 0, 0, 0, 0, 0]),
        };

        assert!(sink.write(&packet).await.is_ok());
        assert!(sink.write(&packet).await.is_ok());
        assert_eq!(sink.seen, 2);
    }

    #[test]
    fn test_log_sink_params() {
        let params = HashMap::from([
            ("word_width".to_string(), "4".to_string()),
            ("every".to_string(), "100".to_string()),
        ]);
        let sink = LogSink::from_params("my_logger", &params).unwrap();
        assert_eq!(sink.name(), "my_logger");
        assert_eq!(sink.word_width, 4);
        assert_eq!(sink.every, 100);

        let params = HashMap::from([("word_width".to_string(), "9".to_string())]);
        assert!(LogSink::from_params("bad", &params).is_err());

        let params = HashMap::from([("every".to_string(), "0".to_string())]);
        assert!(LogSink::from_params("bad", &params).is_err());
    }
}
