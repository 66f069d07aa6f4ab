#![allow(dead_code)]

use std::fs;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use zip::write::SimpleFileOptions;

use liftmetrics::client::DatasetClient;
use liftmetrics::deadline::Deadline;
use liftmetrics::download::{self, DownloadInfo};
use liftmetrics::error::LiftError;
use liftmetrics::record::COLUMNS;
use liftmetrics::store::Store;

pub fn header() -> String {
    COLUMNS.join(",")
}

/// One CSV line with every column empty except `fields`.
pub fn row(fields: &[(&str, &str)]) -> String {
    COLUMNS
        .iter()
        .map(|column| {
            fields
                .iter()
                .find(|(name, _)| name == column)
                .map(|(_, value)| value.to_string())
                .unwrap_or_default()
        })
        .collect::<Vec<_>>()
        .join(",")
}

pub fn csv_text(rows: &[String]) -> String {
    let mut text = header();
    text.push('\n');
    for line in rows {
        text.push_str(line);
        text.push('\n');
    }
    text
}

pub fn write_csv(dir: &Path, name: &str, rows: &[String]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, csv_text(rows)).unwrap();
    path
}

pub fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer = zip::ZipWriter::new(&mut cursor);
        for (name, content) in entries {
            writer
                .start_file(*name, SimpleFileOptions::default())
                .unwrap();
            writer.write_all(content).unwrap();
        }
        writer.finish().unwrap();
    }
    cursor.into_inner()
}

pub fn write_zip(path: &Path, entries: &[(&str, &[u8])]) {
    fs::write(path, zip_bytes(entries)).unwrap();
}

/// A small meet: one full-power lifter, one bench-only lifter, one lifter with
/// no age class.
pub fn sample_rows() -> Vec<String> {
    vec![
        row(&[
            ("Name", "Alice Smith"),
            ("Sex", "F"),
            ("Event", "SBD"),
            ("Equipment", "Raw"),
            ("Age", "28"),
            ("AgeClass", "24-34"),
            ("WeightClassKg", "63"),
            ("Squat1Kg", "-100"),
            ("Squat2Kg", "102.5"),
            ("Squat3Kg", "0"),
            ("Best3SquatKg", "102.5"),
            ("Bench1Kg", "55"),
            ("Bench2Kg", "57.5"),
            ("Bench3Kg", "-60"),
            ("Best3BenchKg", "57.5"),
            ("Deadlift1Kg", "120"),
            ("Deadlift2Kg", "127.5"),
            ("Deadlift3Kg", "132.5"),
            ("Best3DeadliftKg", "132.5"),
            ("TotalKg", "292.5"),
            ("Date", "2023-05-14"),
            ("MeetName", "Spring Open"),
        ]),
        row(&[
            ("Name", "Bob Jones"),
            ("Sex", "M"),
            ("Event", "B"),
            ("Equipment", "Raw"),
            ("Age", "41"),
            ("AgeClass", "40-44"),
            ("WeightClassKg", "93"),
            ("Bench1Kg", "140"),
            ("Bench2Kg", "140"),
            ("Bench3Kg", "145"),
            ("Best3BenchKg", "145"),
            ("TotalKg", "145"),
            ("Date", "2024-02-03"),
            ("MeetName", "Bench Bash"),
        ]),
        row(&[
            ("Name", "Carl Young"),
            ("Sex", "M"),
            ("Event", "SBD"),
            ("Equipment", "Wraps"),
            ("WeightClassKg", "93"),
            ("Squat1Kg", "200"),
            ("Squat2Kg", "210"),
            ("Squat3Kg", "-215"),
            ("Best3SquatKg", "210"),
            ("Bench1Kg", "130"),
            ("Bench2Kg", "135"),
            ("Bench3Kg", "137.5"),
            ("Best3BenchKg", "137.5"),
            ("Deadlift1Kg", "240"),
            ("Deadlift2Kg", "250"),
            ("Deadlift3Kg", "0"),
            ("Best3DeadliftKg", "250"),
            ("TotalKg", "597.5"),
            ("Date", "2024-06-20"),
            ("MeetName", "Summer Classic"),
        ]),
    ]
}

/// Every row of `table` rendered as text, in primary-key order.
pub fn dump_table(store: &Store, table: &str) -> Vec<String> {
    let conn = store.connection();
    let mut stmt = conn
        .prepare(&format!("SELECT * FROM {table} ORDER BY 1, 2, 3"))
        .unwrap();
    let columns = stmt.column_count();
    let rows = stmt
        .query_map([], |row| {
            let mut cells = Vec::with_capacity(columns);
            for idx in 0..columns {
                let value: rusqlite::types::Value = row.get(idx)?;
                cells.push(format!("{value:?}"));
            }
            Ok(cells.join("|"))
        })
        .unwrap();
    rows.collect::<Result<Vec<_>, _>>().unwrap()
}

pub struct MockClient {
    pub page: Option<String>,
    pub archive: Vec<u8>,
    pub fetch_calls: Mutex<usize>,
    pub download_calls: Mutex<usize>,
}

impl MockClient {
    pub fn new(page: Option<&str>, archive: Vec<u8>) -> Self {
        Self {
            page: page.map(str::to_string),
            archive,
            fetch_calls: Mutex::new(0),
            download_calls: Mutex::new(0),
        }
    }

    pub fn fetches(&self) -> usize {
        *self.fetch_calls.lock().unwrap()
    }

    pub fn downloads(&self) -> usize {
        *self.download_calls.lock().unwrap()
    }
}

pub fn revision_page(revision: &str) -> String {
    format!(
        "<html><body><h1>Bulk CSV</h1><ul>\n<li>Updated: daily</li>\n<li>Revision: {revision}.</li>\n</ul></body></html>"
    )
}

impl DatasetClient for MockClient {
    fn fetch_page(&self, _url: &str, _deadline: &Deadline) -> Result<String, LiftError> {
        *self.fetch_calls.lock().unwrap() += 1;
        self.page
            .clone()
            .ok_or_else(|| LiftError::Network("connection refused".to_string()))
    }

    fn download(
        &self,
        _url: &str,
        destination: &Path,
        _deadline: &Deadline,
    ) -> Result<DownloadInfo, LiftError> {
        *self.download_calls.lock().unwrap() += 1;
        download::write_buffered(destination, &self.archive)?;
        Ok(DownloadInfo {
            bytes_written: self.archive.len() as u64,
            content_length: Some(self.archive.len() as u64),
            streamed: false,
        })
    }
}

pub struct CannedResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// Serves each response to one connection, in order, on a local port.
pub fn serve(responses: Vec<CannedResponse>) -> (String, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = thread::spawn(move || {
        for response in responses {
            let Ok((mut stream, _)) = listener.accept() else {
                return;
            };
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                match stream.read(&mut buf) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => request.extend_from_slice(&buf[..n]),
                }
            }
            let head = format!(
                "HTTP/1.1 {} Canned\r\nContent-Type: application/octet-stream\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                response.status,
                response.body.len()
            );
            let _ = stream.write_all(head.as_bytes());
            let _ = stream.write_all(&response.body);
            let _ = stream.flush();
        }
    });
    (format!("http://{addr}"), handle)
}

/// Declares `declared_len` bytes, sends `body`, then holds the connection open
/// for `stall` without sending the rest.
pub fn serve_stalled(declared_len: usize, body: Vec<u8>, stall: Duration) -> (String, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = thread::spawn(move || {
        let Ok((mut stream, _)) = listener.accept() else {
            return;
        };
        let mut buf = [0u8; 1024];
        let _ = stream.read(&mut buf);
        let head = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: application/octet-stream\r\nContent-Length: {declared_len}\r\n\r\n"
        );
        let _ = stream.write_all(head.as_bytes());
        let _ = stream.write_all(&body);
        let _ = stream.flush();
        thread::sleep(stall);
    });
    (format!("http://{addr}"), handle)
}
