//! Event Replay - read events from JSONL files
//!
//! Đọc events từ JSONL files để xem lại audit trail của một khoản vay,
//! một biên nhận hoặc một người thao tác.

use crate::error::PersistenceResult;
use chrono::NaiveDate;
use lendbook_core::{Event, EventType};
use rust_decimal::Decimal;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Event Reader - đọc events từ files JSONL
pub struct EventReader {
    base_path: PathBuf,
}

impl EventReader {
    /// Tạo reader mới
    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    /// Đọc tất cả events từ một file
    pub fn read_file(&self, file_path: &Path) -> PersistenceResult<Vec<Event>> {
        let reader = BufReader::new(File::open(file_path)?);
        let mut events = Vec::new();

        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            events.push(serde_json::from_str(&line)?);
        }

        Ok(events)
    }

    /// Đọc events của một ngày
    pub fn read_date(&self, date: NaiveDate) -> PersistenceResult<Vec<Event>> {
        let file_path = self.base_path.join(format!("{}.jsonl", date.format("%Y-%m-%d")));
        if file_path.exists() {
            self.read_file(&file_path)
        } else {
            Ok(Vec::new())
        }
    }

    /// Đọc events trong khoảng ngày [from, to]
    pub fn read_range(&self, from: NaiveDate, to: NaiveDate) -> PersistenceResult<Vec<Event>> {
        let mut all_events = Vec::new();
        for date in from.iter_days().take_while(|d| *d <= to) {
            all_events.extend(self.read_date(date)?);
        }
        Ok(all_events)
    }

    /// Đọc tất cả events
    pub fn read_all(&self) -> PersistenceResult<Vec<Event>> {
        let mut all_events = Vec::new();

        if !self.base_path.exists() {
            return Ok(all_events);
        }

        let mut files: Vec<PathBuf> = std::fs::read_dir(&self.base_path)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().map_or(false, |ext| ext == "jsonl"))
            .collect();

        files.sort();

        for file_path in files {
            all_events.extend(self.read_file(&file_path)?);
        }

        Ok(all_events)
    }
}

/// Event Filter - lọc events theo điều kiện
#[derive(Debug, Default)]
pub struct EventFilter {
    /// Đối tượng: mã khoản vay, số biên nhận, mã lender, id client
    pub entity_id: Option<String>,
    /// Người thực hiện
    pub actor_id: Option<String>,
    pub event_types: Option<Vec<EventType>>,
    pub min_amount: Option<Decimal>,
    pub max_amount: Option<Decimal>,
}

impl EventFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entity(mut self, entity_id: &str) -> Self {
        self.entity_id = Some(entity_id.to_string());
        self
    }

    pub fn actor(mut self, actor_id: &str) -> Self {
        self.actor_id = Some(actor_id.to_string());
        self
    }

    pub fn event_types(mut self, types: Vec<EventType>) -> Self {
        self.event_types = Some(types);
        self
    }

    pub fn amount_range(mut self, min: Decimal, max: Decimal) -> Self {
        self.min_amount = Some(min);
        self.max_amount = Some(max);
        self
    }

    /// Kiểm tra event có match filter không
    pub fn matches(&self, event: &Event) -> bool {
        if let Some(ref id) = self.entity_id {
            if !event.concerns(id) {
                return false;
            }
        }

        if let Some(ref actor_id) = self.actor_id {
            if event.actor_id != *actor_id {
                return false;
            }
        }

        if let Some(ref types) = self.event_types {
            if !types.contains(&event.event_type) {
                return false;
            }
        }

        // Amount range chỉ áp dụng cho event có số tiền
        if self.min_amount.is_some() || self.max_amount.is_some() {
            let Some(amount) = event.amount else {
                return false;
            };
            if self.min_amount.map_or(false, |min| amount < min)
                || self.max_amount.map_or(false, |max| amount > max)
            {
                return false;
            }
        }

        true
    }

    /// Apply filter to events
    pub fn apply(&self, events: Vec<Event>) -> Vec<Event> {
        events.into_iter().filter(|e| self.matches(e)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventStore;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use tempfile::tempdir;

    fn sample_events() -> Vec<Event> {
        vec![
            Event::loan_created("EVT_000001", "admin", "PR000001", dec!(500000)),
            Event::payment_recorded(
                "EVT_000002",
                "cashier",
                "REC00000001",
                "PR000001",
                dec!(75000),
                dec!(25000),
                dec!(50000),
                dec!(450000),
            ),
            Event::loan_created("EVT_000003", "admin", "PR000002", dec!(80000)),
        ]
    }

    #[test]
    fn test_filter_by_entity_includes_loan_payments() {
        let events = EventFilter::new().entity("PR000001").apply(sample_events());
        assert_eq!(events.len(), 2);

        let events = EventFilter::new().entity("REC00000001").apply(sample_events());
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, EventType::PaymentRecorded);
    }

    #[test]
    fn test_filter_by_actor_and_type() {
        let events = EventFilter::new()
            .actor("admin")
            .event_types(vec![EventType::LoanCreated])
            .apply(sample_events());
        assert_eq!(events.len(), 2);

        let events = EventFilter::new().actor("nobody").apply(sample_events());
        assert!(events.is_empty());
    }

    #[test]
    fn test_filter_by_amount() {
        let events = EventFilter::new()
            .amount_range(dec!(70000), dec!(100000))
            .apply(sample_events());
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn test_reader_reads_store_files() {
        let dir = tempdir().unwrap();
        let store = EventStore::new(dir.path()).unwrap();
        for event in sample_events() {
            store.append(&event).unwrap();
        }
        store.flush().unwrap();

        let reader = EventReader::new(dir.path());
        assert_eq!(reader.read_all().unwrap().len(), 3);

        let today = Utc::now().date_naive();
        assert_eq!(reader.read_date(today).unwrap().len(), 3);
        assert_eq!(reader.read_range(today, today).unwrap().len(), 3);
        assert!(reader
            .read_date(NaiveDate::from_ymd_opt(2000, 1, 1).unwrap())
            .unwrap()
            .is_empty());
    }
}
