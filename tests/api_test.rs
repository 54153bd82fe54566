#![allow(missing_docs)]

use std::any::type_name;
use std::collections::BTreeMap;

use cycleguard::format::{FieldLabels, Header, FORMAT_VERSION, HEADER_SIZE};
use cycleguard::inspector::{FieldLabel, Value};
use cycleguard::{CycleGuard, Error, GraphObject, Inspector};

#[derive(GraphObject)]
struct Sensor {
    id: u32,
    name: String,
    readings: Vec<f64>,
}

#[derive(GraphObject)]
struct Station {
    code: String,
    sensors: Vec<Sensor>,
    calibration: BTreeMap<String, i64>,
    backup: Option<Box<Station>>,
}

fn create_station() -> Station {
    let mut calibration = BTreeMap::new();
    calibration.insert("offset".to_string(), -3);
    calibration.insert("gain".to_string(), 12);

    Station {
        code: "ST-01".into(),
        sensors: vec![
            Sensor {
                id: 1,
                name: "temp".into(),
                readings: vec![20.5, 21.0],
            },
            Sensor {
                id: 2,
                name: "humidity".into(),
                readings: vec![],
            },
        ],
        calibration,
        backup: Some(Box::new(Station {
            code: "ST-01B".into(),
            sensors: vec![],
            calibration: BTreeMap::new(),
            backup: None,
        })),
    }
}

// --- TESTS ---

/// Validate `CycleGuard::to_bytes`, header and field layout
#[test]
fn test_to_bytes_layout() -> cycleguard::Result<()> {
    let station = create_station();
    let bytes = CycleGuard::to_bytes(&station)?;

    let header = Header::from_bytes(&bytes)?;
    assert_eq!(header.version, FORMAT_VERSION);

    let inspected = Inspector::from_bytes(&bytes)?;
    assert_eq!(inspected.byte_len(), bytes.len() as u64);

    let root = inspected.root().as_record().expect("root record");
    assert_eq!(root.type_name, type_name::<Station>());

    let labels: Vec<String> = root.fields.iter().map(|(l, _)| l.to_string()).collect();
    assert_eq!(labels, vec!["code", "sensors", "calibration", "backup"]);

    let code: String = root.field("code").expect("code").decode_leaf()?;
    assert_eq!(code, "ST-01");

    let sensors = root.field("sensors").and_then(Value::as_seq).expect("sensors");
    assert_eq!(sensors.len(), 2);
    let readings = sensors[0]
        .as_record()
        .and_then(|s| s.field("readings"))
        .and_then(Value::as_seq)
        .expect("readings");
    let first: f64 = readings[0].decode_leaf()?;
    assert_eq!(first, 20.5);

    // BTreeMap entries come out in key order.
    match root.field("calibration") {
        Some(Value::Map(entries)) => {
            let key: String = entries[0].0.decode_leaf()?;
            let value: i64 = entries[0].1.decode_leaf()?;
            assert_eq!((key.as_str(), value), ("gain", 12));
        }
        other => panic!("expected a map, got {other:?}"),
    }

    assert_eq!(inspected.root().count_records(type_name::<Station>()), 2);
    Ok(())
}

/// Validate `SerializeOptions::header` and `FieldLabels::Indices`
#[test]
fn test_options_change_layout() -> cycleguard::Result<()> {
    let station = create_station();

    let named = CycleGuard::to_bytes(&station)?;
    let compact = CycleGuard::builder()
        .header(false)
        .labels(FieldLabels::Indices)
        .to_bytes(&station)?;

    assert!(compact.len() < named.len());
    assert!(!compact.starts_with(b"CYG1"));

    let inspected = Inspector::from_bytes(&compact)?;
    assert!(inspected.header().is_none());
    let root = inspected.root().as_record().expect("root record");
    let labels: Vec<&FieldLabel> = root.fields.iter().map(|(l, _)| l).collect();
    assert_eq!(
        labels,
        vec![
            &FieldLabel::Index(0),
            &FieldLabel::Index(1),
            &FieldLabel::Index(2),
            &FieldLabel::Index(3)
        ]
    );
    let code: String = root.field_at(0).expect("code").decode_leaf()?;
    assert_eq!(code, "ST-01");
    Ok(())
}

/// Validate `CycleGuard::write` byte count
#[test]
fn test_write_reports_length() -> cycleguard::Result<()> {
    let station = create_station();
    let mut buffer = vec![0xFF; 3];

    let written = CycleGuard::write(&mut buffer, &station)?;

    assert_eq!(written + 3, buffer.len() as u64);
    assert_eq!(&buffer[3..3 + HEADER_SIZE], &Header::new().to_bytes());
    Ok(())
}

/// Validate `CycleGuard::save` and `Inspector::open`
#[test]
fn test_save_and_inspect_file() -> cycleguard::Result<()> {
    let dir = tempfile::tempdir()?;
    let file_path = dir.path().join("station.cyg");
    let station = create_station();

    CycleGuard::save(&file_path, &station)?;

    let from_file = Inspector::open(&file_path)?;
    let from_memory = Inspector::from_bytes(&CycleGuard::to_bytes(&station)?)?;
    assert_eq!(from_file, from_memory);

    let report = from_file.to_string();
    assert!(report.contains("[RECORDS]"));
    assert!(report.contains("sensors: seq (2)"));
    Ok(())
}

/// Validate `SerializeOptions::to_bytes_batch`
#[test]
fn test_parallel_batch() -> cycleguard::Result<()> {
    let stations: Vec<Station> = (0..32)
        .map(|i| {
            let mut s = create_station();
            s.code = format!("ST-{i:02}");
            s
        })
        .collect();
    let roots: Vec<&Station> = stations.iter().collect();

    let results = CycleGuard::builder().to_bytes_batch(&roots);
    assert_eq!(results.len(), 32);

    for (i, result) in results.into_iter().enumerate() {
        let bytes = result?;
        assert_eq!(bytes, CycleGuard::to_bytes(roots[i])?);
    }
    Ok(())
}

#[test]
fn test_inspector_rejects_malformed_input() -> cycleguard::Result<()> {
    let bytes = CycleGuard::to_bytes(&create_station())?;

    let truncated = &bytes[..bytes.len() - 1];
    assert!(matches!(Inspector::from_bytes(truncated), Err(Error::Format(_))));

    let mut trailing = bytes.clone();
    trailing.push(0);
    assert!(matches!(Inspector::from_bytes(&trailing), Err(Error::Format(_))));

    let mut bad_version = bytes.clone();
    bad_version[4] = 9;
    assert!(matches!(Inspector::from_bytes(&bad_version), Err(Error::Format(_))));

    let dir = tempfile::tempdir()?;
    let empty = dir.path().join("empty.cyg");
    std::fs::write(&empty, b"")?;
    assert!(matches!(Inspector::open(&empty), Err(Error::Format(_))));
    Ok(())
}

#[test]
fn test_failing_sink_is_io_error() {
    struct Full;

    impl std::io::Write for Full {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::Other, "disk full"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    let err = CycleGuard::write(&mut Full, &create_station()).unwrap_err();
    assert!(matches!(err, Error::Io(_)));
}
