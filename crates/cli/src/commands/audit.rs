//! Audit command

use anyhow::{bail, Result};
use chrono::NaiveDate;
use lendbook_core::EventType;
use lendbook_persistence::{EventFilter, EventReader};
use lendbook_reports::AuditTrailReport;
use std::path::Path;

use super::{emit, truncate};
use crate::db;
use crate::ExportArgs;

/// List events from the audit log
pub fn run_audit(
    events_dir: &Path,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    entity: Option<&str>,
    actor: Option<&str>,
    types: Option<&[String]>,
    export: &ExportArgs,
) -> Result<()> {
    let mut filter = EventFilter::new();
    if let Some(entity) = entity {
        filter = filter.entity(entity);
    }
    if let Some(actor) = actor {
        filter = filter.actor(actor);
    }
    if let Some(types) = types {
        let mut parsed = Vec::with_capacity(types.len());
        for name in types {
            match EventType::from_str(name) {
                Some(t) => parsed.push(t),
                None => bail!("Unknown event type: {}", name),
            }
        }
        filter = filter.event_types(parsed);
    }

    // Read events based on date range
    let reader = EventReader::new(events_dir);
    let events = match (from, to) {
        (Some(from), Some(to)) => reader.read_range(from, to)?,
        (Some(from), None) => reader.read_range(from, db::today())?,
        (None, Some(to)) => reader
            .read_all()?
            .into_iter()
            .filter(|e| e.timestamp.date_naive() <= to)
            .collect(),
        (None, None) => reader.read_all()?,
    };
    let events = filter.apply(events);

    let report = AuditTrailReport::new("Audit Trail", events);
    if emit(&report, export)? {
        return Ok(());
    }

    println!("🔍 Audit Trail");
    println!("   Events directory: {:?}", events_dir);
    if let Some(from) = from {
        println!("   From: {}", from);
    }
    if let Some(to) = to {
        println!("   To: {}", to);
    }
    if let Some(entity) = entity {
        println!("   Entity: {}", entity);
    }
    println!();

    if report.events.is_empty() {
        println!("No events found matching criteria.");
        return Ok(());
    }

    println!(
        "{:<11} {:<20} {:<19} {:<10} {:<12} {:>12} {:<20}",
        "EVENT", "TIME", "TYPE", "ACTOR", "ENTITY", "AMOUNT", "DESCRIPTION"
    );
    println!("{}", "-".repeat(110));
    for event in &report.events {
        println!(
            "{:<11} {:<20} {:<19} {:<10} {:<12} {:>12} {:<20}",
            event.event_id,
            event.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            event.event_type.as_str(),
            truncate(&event.actor_id, 10),
            truncate(&event.entity_id, 12),
            event.amount.map(|a| a.to_string()).unwrap_or_default(),
            truncate(event.description.as_deref().unwrap_or_default(), 20)
        );
    }
    println!("\nTotal: {} events", report.events.len());

    Ok(())
}
