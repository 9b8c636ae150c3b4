//! FileSink - appends packet payloads to a raw capture file

use contracts::{AcceptedPacket, ContractError, DataSink};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, error, instrument};

/// Configuration for FileSink
#[derive(Debug, Clone)]
pub struct FileSinkConfig {
    /// Base output directory
    pub base_path: PathBuf,
    /// Also write a JSON-lines index next to the payload file
    pub index: bool,
}

impl FileSinkConfig {
    /// Create config from params map
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, String> {
        let base_path = params
            .get("base_path")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./output"));

        let index = match params.get("index") {
            Some(value) => value
                .parse::<bool>()
                .map_err(|_| format!("index must be \"true\" or \"false\", got \"{value}\""))?,
            None => false,
        };

        Ok(Self { base_path, index })
    }
}

/// One line of the index file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub packet_id: u64,
    pub stream_offset: u64,
    pub len: usize,
}

/// Sink that appends accepted packets to `<base_path>/<name>.bin`
pub struct FileSink {
    name: String,
    data: BufWriter<File>,
    index: Option<BufWriter<File>>,
    bytes_written: u64,
}

impl FileSink {
    /// Create a new FileSink, creating the output directory if needed
    pub fn new(name: impl Into<String>, config: FileSinkConfig) -> std::io::Result<Self> {
        let name = name.into();
        fs::create_dir_all(&config.base_path)?;

        let data = BufWriter::new(Self::open_append(
            &config.base_path.join(format!("{name}.bin")),
        )?);
        let index = if config.index {
            let path = config.base_path.join(format!("{name}.index.jsonl"));
            Some(BufWriter::new(Self::open_append(&path)?))
        } else {
            None
        };

        debug!(
            sink = %name,
            path = %config.base_path.display(),
            index = config.index,
            "FileSink opened"
        );

        Ok(Self {
            name,
            data,
            index,
            bytes_written: 0,
        })
    }

    /// Create from params map (for factory)
    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> Result<Self, ContractError> {
        let name = name.into();
        let config = FileSinkConfig::from_params(params)
            .map_err(|message| ContractError::sink_creation(&name, message))?;
        Self::new(name.clone(), config)
            .map_err(|e| ContractError::sink_creation(&name, e.to_string()))
    }

    /// Payload bytes written so far
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    fn open_append(path: &Path) -> std::io::Result<File> {
        OpenOptions::new().create(true).append(true).open(path)
    }

    fn append_packet(&mut self, packet: &AcceptedPacket) -> std::io::Result<()> {
        self.data.write_all(&packet.payload)?;
        self.bytes_written += packet.len() as u64;

        if let Some(index) = self.index.as_mut() {
            let entry = IndexEntry {
                packet_id: packet.packet_id,
                stream_offset: packet.stream_offset,
                len: packet.len(),
            };
            serde_json::to_writer(&mut *index, &entry)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
            index.write_all(b"\n")?;
        }
        Ok(())
    }

    fn flush_all(&mut self) -> std::io::Result<()> {
        self.data.flush()?;
        if let Some(index) = self.index.as_mut() {
            index.flush()?;
        }
        Ok(())
    }

    fn persist_packet(&mut self, packet: &AcceptedPacket) -> Result<(), ContractError> {
        self.append_packet(packet).map_err(|e| {
            error!(sink = %self.name, packet_id = packet.packet_id, error = %e, "Write failed");
            ContractError::sink_write(&self.name, e.to_string())
        })
    }
}

impl DataSink for FileSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "file_sink_write",
        level = "trace",
        skip(self, packet),
        fields(sink = %self.name, packet_id = packet.packet_id)
    )]
    async fn write(&mut self, packet: &AcceptedPacket) -> Result<(), ContractError> {
        self.persist_packet(packet)
    }

    #[instrument(name = "file_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        self.flush_all()
            .map_err(|e| ContractError::sink_write(&self.name, e.to_string()))
    }

    #[instrument(name = "file_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        self.flush_all()
            .map_err(|e| ContractError::sink_write(&self.name, e.to_string()))?;
        debug!(sink = %self.name, bytes = self.bytes_written, "FileSink closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use tempfile::tempdir;

    fn packet(packet_id: u64, stream_offset: u64, payload: &'static [u8]) -> AcceptedPacket {
        AcceptedPacket {
            packet_id,
            stream_offset,
            payload: Bytes::from_static(payload),
        }
    }

    #[tokio::test]
    async fn test_file_sink_appends_payloads() {
        let dir = tempdir().unwrap();
        let config = FileSinkConfig {
            base_path: dir.path().to_path_buf(),
            index: false,
        };

        let mut sink = FileSink::new("capture", config).unwrap();
        sink.write(&packet(0, 0, &[1, 2, 3, 4])).await.unwrap();
        sink.write(&packet(1, 8, &[5, 6, 7, 8])).await.unwrap();
        sink.close().await.unwrap();

        let data = fs::read(dir.path().join("capture.bin")).unwrap();
        assert_eq!(data, vec![1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(sink.bytes_written(), 8);
        assert!(!dir.path().join("capture.index.jsonl").exists());
    }

    #[tokio::test]
    async fn test_file_sink_writes_index() {
        let dir = tempdir().unwrap();
        let params = HashMap::from([
            (
                "base_path".to_string(),
                dir.path().join("nested").display().to_string(),
            ),
            ("index".to_string(), "true".to_string()),
        ]);

        let mut sink = FileSink::from_params("capture", &params).unwrap();
        sink.write(&packet(0, 24, &[0xAA; 4])).await.unwrap();
        sink.write(&packet(1, 56, &[0xBB; 4])).await.unwrap();
        sink.flush().await.unwrap();

        let index = fs::read_to_string(dir.path().join("nested/capture.index.jsonl")).unwrap();
        let entries: Vec<IndexEntry> = index
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(
            entries,
            vec![
                IndexEntry {
                    packet_id: 0,
                    stream_offset: 24,
                    len: 4
                },
                IndexEntry {
                    packet_id: 1,
                    stream_offset: 56,
                    len: 4
                },
            ]
        );
    }

    #[test]
    fn test_file_sink_rejects_bad_index_param() {
        let dir = tempdir().unwrap();
        let params = HashMap::from([
            ("base_path".to_string(), dir.path().display().to_string()),
            ("index".to_string(), "maybe".to_string()),
        ]);
        let err = FileSink::from_params("capture", &params).err().unwrap();
        assert!(matches!(err, ContractError::SinkCreation { .. }));
    }
}
