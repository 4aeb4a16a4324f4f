//! JSONL Event Store - append-only writer
//!
//! Ghi events vào files JSONL theo ngày làm audit trail của sổ cho vay.

use crate::error::{PersistenceError, PersistenceResult};
use chrono::Utc;
use lendbook_core::Event;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Event Store - ghi events vào files JSONL.
///
/// Files được tổ chức theo ngày: `data/events/2026-01-25.jsonl`
pub struct EventStore {
    /// Thư mục chứa event files
    base_path: PathBuf,
    /// Counter cho event ID
    event_counter: AtomicU64,
    /// Current file writer (thread-safe)
    current_writer: Mutex<Option<EventWriter>>,
}

struct EventWriter {
    date: String,
    writer: BufWriter<File>,
}

impl EventStore {
    /// Tạo EventStore mới
    ///
    /// # Arguments
    /// * `base_path` - Đường dẫn thư mục chứa events (e.g., "data/events")
    pub fn new<P: AsRef<Path>>(base_path: P) -> PersistenceResult<Self> {
        let base_path = base_path.as_ref().to_path_buf();

        // Tạo thư mục nếu chưa có
        fs::create_dir_all(&base_path)?;

        // Đọc event counter từ existing files
        let event_counter = Self::load_event_counter(&base_path)?;

        Ok(Self {
            base_path,
            event_counter: AtomicU64::new(event_counter),
            current_writer: Mutex::new(None),
        })
    }

    /// Lấy base path
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Counter tiếp theo = số lớn nhất trong các event đã ghi + 1.
    /// Dòng không parse được thì bỏ qua.
    fn load_event_counter(base_path: &Path) -> PersistenceResult<u64> {
        let mut max_id: u64 = 0;

        for entry in fs::read_dir(base_path)?.flatten() {
            let path = entry.path();
            if path.extension().map_or(true, |ext| ext != "jsonl") {
                continue;
            }
            let content = fs::read_to_string(&path)?;
            max_id = content
                .lines()
                .filter_map(|line| serde_json::from_str::<Event>(line).ok())
                .filter_map(|event| {
                    event
                        .event_id
                        .strip_prefix("EVT_")
                        .and_then(|n| n.parse::<u64>().ok())
                })
                .fold(max_id, u64::max);
        }

        Ok(max_id + 1)
    }

    /// Lấy file path cho ngày hiện tại
    fn get_file_path(&self, date: &str) -> PathBuf {
        self.base_path.join(format!("{}.jsonl", date))
    }

    /// Lấy ngày hiện tại dạng string
    fn current_date() -> String {
        Utc::now().format("%Y-%m-%d").to_string()
    }

    /// Generate event ID mới
    pub fn next_event_id(&self) -> String {
        Event::generate_id(self.event_counter.fetch_add(1, Ordering::SeqCst))
    }

    /// Cấp event ID, dựng event và ghi ngay
    pub fn record<F>(&self, build: F) -> PersistenceResult<Event>
    where
        F: FnOnce(&str) -> Event,
    {
        let event = build(&self.next_event_id());
        self.append(&event)?;
        Ok(event)
    }

    /// Ghi event vào store
    pub fn append(&self, event: &Event) -> PersistenceResult<()> {
        let date = Self::current_date();
        let json = serde_json::to_string(event)?;

        let mut guard = self
            .current_writer
            .lock()
            .map_err(|_| PersistenceError::EventStoreLock)?;

        // Kiểm tra cần tạo file mới không
        let needs_new_file = guard
            .as_ref()
            .map_or(true, |w| w.date != date);

        if needs_new_file {
            let path = self.get_file_path(&date);
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)?;
            let writer = BufWriter::new(file);
            *guard = Some(EventWriter {
                date: date.clone(),
                writer,
            });
        }

        // Ghi event
        if let Some(ref mut w) = *guard {
            writeln!(w.writer, "{}", json)?;
            w.writer.flush()?;
        }

        Ok(())
    }


    /// Lấy tất cả event files
    pub fn list_files(&self) -> PersistenceResult<Vec<PathBuf>> {
        let mut files = Vec::new();

        for entry in fs::read_dir(&self.base_path)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().map_or(false, |ext| ext == "jsonl") {
                files.push(path);
            }
        }

        files.sort();
        Ok(files)
    }

    /// Flush tất cả pending writes
    pub fn flush(&self) -> PersistenceResult<()> {
        let mut guard = self
            .current_writer
            .lock()
            .map_err(|_| PersistenceError::EventStoreLock)?;
        if let Some(ref mut w) = *guard {
            w.writer.flush()?;
        }
        Ok(())
    }
}

impl Drop for EventStore {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}
