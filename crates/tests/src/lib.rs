//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约快照测试
//! - 配置 -> 采集引擎 -> 分发器 的端到端测试

#[cfg(test)]
mod contract_tests {
    use contracts::{SinkType, Verdict};

    #[test]
    fn test_wire_names() {
        assert_eq!(
            serde_json::to_string(&Verdict::Accepted).unwrap(),
            "\"accepted\""
        );
        assert_eq!(serde_json::to_string(&SinkType::File).unwrap(), "\"file\"");
        assert_eq!(
            serde_json::to_string(&contracts::ConfigVersion::V1).unwrap(),
            "\"V1\""
        );
    }

    #[test]
    fn test_resolved_blueprint_reloads() {
        let content = r#"
[checker]
strategy = "marker_bit"
sample_size = 2
marker_mask = 32768
"#;
        let bp = config_loader::ConfigLoader::load_from_str(
            content,
            config_loader::ConfigFormat::Toml,
        )
        .unwrap();
        let resolved = config_loader::ConfigLoader::resolve(&bp);
        let json = config_loader::ConfigLoader::to_json(&resolved).unwrap();
        let reloaded =
            config_loader::ConfigLoader::load_from_str(&json, config_loader::ConfigFormat::Json)
                .unwrap();

        assert_eq!(reloaded.checker, resolved.checker);
        assert_eq!(reloaded.acquisition.packet_size, Some(2));
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{AcceptedPacket, SinkConfig, SinkType, StreamBlueprint};
    use dispatcher::{create_dispatcher, IndexEntry};
    use observability::AcquisitionMetricsAggregator;
    use sync_engine::{AcquisitionEngine, EngineError};
    use tokio::sync::mpsc;

    const PACKET: usize = 16;

    const COUNTER_CONFIG: &str = r#"
version = "V1"

[checker]
strategy = "sequence_counter"
sample_size = 4
frames_for_sync = 2
first_counter = 1

[acquisition]
packet_size = 16
read_chunk = 7
start_locked = false
max_sync_failures = 4
"#;

    fn blueprint(content: &str, sinks: Vec<SinkConfig>) -> StreamBlueprint {
        let mut bp = ConfigLoader::load_from_str(content, ConfigFormat::Toml).unwrap();
        bp.sinks = sinks;
        ConfigLoader::resolve(&bp)
    }

    fn file_sink(name: &str, dir: &std::path::Path) -> SinkConfig {
        SinkConfig {
            name: name.to_string(),
            sink_type: SinkType::File,
            queue_capacity: 256,
            params: HashMap::from([
                (
                    "base_path".to_string(),
                    dir.to_string_lossy().into_owned(),
                ),
                ("index".to_string(), "true".to_string()),
            ]),
        }
    }

    fn log_sink(name: &str) -> SinkConfig {
        SinkConfig {
            name: name.to_string(),
            sink_type: SinkType::Log,
            queue_capacity: 50,
            params: HashMap::new(),
        }
    }

    /// 16 byte packets, 4 byte counter header, payload filled with 0xAA
    fn counter_packet(counter: u32) -> Vec<u8> {
        let mut packet = counter.to_le_bytes().to_vec();
        packet.extend_from_slice(&[0xAA; PACKET - 4]);
        packet
    }

    /// Garbage prefix, counters 1..=12, header of counter 6 corrupted
    fn damaged_capture() -> Vec<u8> {
        let mut capture = vec![0x55; 8];
        for counter in 1..=12u32 {
            if counter == 6 {
                capture.extend_from_slice(&0xFFFF_FFFFu32.to_le_bytes());
                capture.extend_from_slice(&[0xAA; PACKET - 4]);
            } else {
                capture.extend(counter_packet(counter));
            }
        }
        capture
    }

    /// Replay `capture` in `read_chunk` pieces into the channel
    async fn replay(
        engine: &mut AcquisitionEngine,
        capture: &[u8],
        read_chunk: usize,
        tx: &mpsc::Sender<AcceptedPacket>,
        aggregator: &mut AcquisitionMetricsAggregator,
    ) -> Result<u64, EngineError> {
        let mut forwarded = 0;
        let mut out = Vec::new();
        for chunk in capture.chunks(read_chunk) {
            let pushed = engine.push(chunk, &mut out);
            aggregator.update(chunk.len(), out.len(), 0.0, engine.stats());
            for packet in out.drain(..) {
                tx.send(packet).await.unwrap();
                forwarded += 1;
            }
            pushed?;
        }
        Ok(forwarded)
    }

    /// End-to-end test: capture -> AcquisitionEngine -> Dispatcher -> FileSink
    ///
    /// 验证完整的数据流：
    /// 1. 跳过流起始的垃圾字节并定位帧边界
    /// 2. 流中损坏的包头触发重新同步
    /// 3. FileSink 写出的数据与索引与被接受的包一致
    #[tokio::test]
    async fn test_e2e_counter_capture_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let bp = blueprint(COUNTER_CONFIG, vec![file_sink("capture", dir.path())]);
        let mut engine = AcquisitionEngine::from_blueprint(&bp).unwrap();

        let (tx, rx) = mpsc::channel::<AcceptedPacket>(100);
        let dispatcher = create_dispatcher(bp.sinks.clone(), rx).unwrap();
        let dispatcher_handle = dispatcher.spawn();

        let mut aggregator = AcquisitionMetricsAggregator::new();
        let forwarded = replay(
            &mut engine,
            &damaged_capture(),
            bp.acquisition.read_chunk,
            &tx,
            &mut aggregator,
        )
        .await
        .unwrap();
        assert_eq!(engine.finish(), 0);
        drop(tx);

        let summary = tokio::time::timeout(Duration::from_secs(2), dispatcher_handle)
            .await
            .expect("dispatcher timed out")
            .unwrap();

        let expected: Vec<u32> = (1..=12).filter(|c| *c != 6).collect();
        assert_eq!(forwarded, expected.len() as u64);
        assert_eq!(summary.packets, forwarded);
        assert_eq!(summary.total_dropped(), 0);
        assert_eq!(summary.total_failures(), 0);

        let stats = engine.stats();
        assert_eq!(stats.packets_rejected, 1);
        assert_eq!(stats.sync_successes, 2);
        assert_eq!(stats.sync_failures, 1);
        assert_eq!(stats.bytes_discarded, 8 + PACKET as u64);

        let metrics = aggregator.summary();
        assert_eq!(metrics.bytes_in, damaged_capture().len() as u64);
        assert_eq!(metrics.engine, *stats);

        let written = std::fs::read(dir.path().join("capture.bin")).unwrap();
        let expected_bytes: Vec<u8> = expected.iter().flat_map(|c| counter_packet(*c)).collect();
        assert_eq!(written, expected_bytes);

        let index = std::fs::read_to_string(dir.path().join("capture.index.jsonl")).unwrap();
        let entries: Vec<IndexEntry> = index
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(entries.len(), expected.len());
        for (i, (entry, counter)) in entries.iter().zip(&expected).enumerate() {
            assert_eq!(entry.packet_id, i as u64);
            assert_eq!(entry.len, PACKET);
            assert_eq!(
                entry.stream_offset,
                8 + (u64::from(*counter) - 1) * PACKET as u64
            );
        }
    }

    /// Marker stream: lost marker triggers a resync, markers are cleared downstream
    #[tokio::test]
    async fn test_e2e_marker_stream() {
        const MARKER: u16 = 0x8000;
        let content = r#"
[checker]
strategy = "marker_bit"
sample_size = 2
marker_mask = 32768

[acquisition]
packet_size = 8
"#;
        let dir = tempfile::tempdir().unwrap();
        let bp = blueprint(
            content,
            vec![log_sink("log"), file_sink("marked", dir.path())],
        );
        let mut engine = AcquisitionEngine::from_blueprint(&bp).unwrap();

        let mut capture = Vec::new();
        for i in 0..8u16 {
            let header = if i == 3 { i } else { MARKER | i };
            capture.extend_from_slice(&header.to_le_bytes());
            capture.extend_from_slice(&[0u8; 6]);
        }

        let (tx, rx) = mpsc::channel::<AcceptedPacket>(16);
        let dispatcher = create_dispatcher(bp.sinks.clone(), rx).unwrap();
        assert_eq!(dispatcher.sink_count(), 2);
        let handle = dispatcher.spawn();

        let mut aggregator = AcquisitionMetricsAggregator::new();
        let forwarded = replay(&mut engine, &capture, 5, &tx, &mut aggregator)
            .await
            .unwrap();
        drop(tx);

        let summary = tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("dispatcher timed out")
            .unwrap();

        assert_eq!(forwarded, 7);
        assert_eq!(summary.sinks.len(), 2);
        for (_, snapshot) in &summary.sinks {
            assert_eq!(snapshot.write_count, 7);
        }

        let written = std::fs::read(dir.path().join("marked.bin")).unwrap();
        let headers: Vec<u16> = written
            .chunks(8)
            .map(|p| u16::from_le_bytes([p[0], p[1]]))
            .collect();
        assert_eq!(headers, vec![0, 1, 2, 4, 5, 6, 7]);
    }

    /// A capture with no frame structure stops with SyncLost
    #[tokio::test]
    async fn test_e2e_sync_lost() {
        let bp = blueprint(COUNTER_CONFIG, vec![log_sink("log")]);
        let mut engine = AcquisitionEngine::from_blueprint(&bp).unwrap();

        let (tx, rx) = mpsc::channel::<AcceptedPacket>(16);
        let handle = create_dispatcher(bp.sinks.clone(), rx).unwrap().spawn();

        let mut aggregator = AcquisitionMetricsAggregator::new();
        let err = replay(&mut engine, &[0x55; 256], 64, &tx, &mut aggregator)
            .await
            .unwrap_err();
        drop(tx);

        match err {
            EngineError::SyncLost { attempts, .. } => assert_eq!(attempts, 4),
            other => panic!("unexpected error: {other}"),
        }

        let summary = handle.await.unwrap();
        assert_eq!(summary.packets, 0);
    }

    /// Test dispatcher with multiple sink types
    #[tokio::test]
    async fn test_dispatcher_multiple_sinks() {
        let dir = tempfile::tempdir().unwrap();
        let (tx, rx) = mpsc::channel::<AcceptedPacket>(10);

        let sink_configs = vec![
            log_sink("log1"),
            log_sink("log2"),
            file_sink("file", dir.path()),
        ];

        let dispatcher = create_dispatcher(sink_configs, rx).unwrap();

        // Check metrics before running
        let metrics = dispatcher.metrics();
        assert_eq!(metrics.len(), 3);

        let handle = dispatcher.spawn();

        for i in 0..5u32 {
            let packet = AcceptedPacket {
                packet_id: u64::from(i),
                stream_offset: u64::from(i) * PACKET as u64,
                payload: bytes::Bytes::from(counter_packet(i)),
            };
            tx.send(packet).await.unwrap();
        }

        // Close channel
        drop(tx);

        let summary = tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("dispatcher timed out")
            .unwrap();
        assert_eq!(summary.packets, 5);
        for (name, snapshot) in &summary.sinks {
            assert_eq!(snapshot.write_count, 5, "sink {name}");
        }

        let written = std::fs::metadata(dir.path().join("file.bin")).unwrap();
        assert_eq!(written.len(), 5 * PACKET as u64);
    }
}
