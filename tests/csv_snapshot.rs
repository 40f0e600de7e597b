use chrono::NaiveDate;
use insta::assert_snapshot;
use restax::session::csv::{read_rows, write_rows};
use restax::system::snapshot::Snapshot;

fn sample_session() -> Vec<Snapshot> {
    let start = NaiveDate::from_ymd_opt(2026, 3, 1)
        .unwrap()
        .and_hms_micro_opt(14, 5, 9, 500_125)
        .unwrap();
    (0..3)
        .map(|i| Snapshot {
            timestamp: start + chrono::TimeDelta::seconds(2 * i),
            system_cpu_percent: 10.0 + i as f64 * 2.5,
            system_memory_percent: 48.75,
            network_bytes_sent: 1_000_000 + i as u64 * 4_096,
            network_bytes_recv: 5_000_000 + i as u64 * 65_536,
            app_a_cpu_percent: 31.2,
            app_a_memory_percent: 4.125,
            app_b_cpu_percent: if i == 1 { 0.0 } else { 6.5 },
            app_b_memory_percent: 1.0625,
        })
        .collect()
}

#[test]
fn session_csv_layout_is_stable() {
    let mut out = Vec::new();
    write_rows(&mut out, &sample_session()).unwrap();
    let csv = String::from_utf8(out).unwrap();
    assert_snapshot!("session_csv", csv);
}

#[test]
fn persisted_session_reads_back_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("roundtrip.csv");
    let written = sample_session();

    let mut session = restax::session::Session::new(std::time::Duration::from_secs(2));
    for snapshot in written.iter().cloned() {
        session.append(snapshot);
    }
    session.flush(&path).unwrap();

    let file = std::fs::File::open(&path).unwrap();
    let read = read_rows(std::io::BufReader::new(file)).unwrap();
    assert_eq!(read, written);
}
