//! EventBridgeBus - DispatchEvent を PutEvents で送る

use async_trait::async_trait;
use aws_sdk_eventbridge::Client;
use aws_sdk_eventbridge::error::DisplayErrorContext;
use aws_sdk_eventbridge::types::{PutEventsRequestEntry, PutEventsResultEntry};

use sluice_core::domain::{DispatchEvent, SluiceError};
use sluice_core::ports::{EventBus, PutEntryResult, PutEventsOutcome};

#[derive(Clone)]
pub struct EventBridgeBus {
    client: Client,
}

impl EventBridgeBus {
    pub fn new(config: &aws_config::SdkConfig) -> Self {
        Self::from_client(Client::new(config))
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

pub(crate) fn request_entry(event: &DispatchEvent) -> Result<PutEventsRequestEntry, SluiceError> {
    Ok(PutEventsRequestEntry::builder()
        .source(&event.source)
        .detail_type(&event.detail_type)
        .event_bus_name(&event.event_bus_name)
        .detail(event.detail_json()?)
        .build())
}

/// 失敗件数は entry ごとの error code から数える
pub(crate) fn outcome_from_entries(entries: &[PutEventsResultEntry]) -> PutEventsOutcome {
    let entries: Vec<PutEntryResult> = entries
        .iter()
        .map(|entry| PutEntryResult {
            event_id: entry.event_id().map(str::to_string),
            error_code: entry.error_code().map(str::to_string),
            error_message: entry.error_message().map(str::to_string),
        })
        .collect();
    let failed = entries.iter().filter(|e| e.error_code.is_some()).count();
    PutEventsOutcome {
        failed_entry_count: u32::try_from(failed).unwrap_or(u32::MAX),
        entries,
    }
}

#[async_trait]
impl EventBus for EventBridgeBus {
    async fn put_events(&self, events: &[DispatchEvent]) -> Result<PutEventsOutcome, SluiceError> {
        let entries = events
            .iter()
            .map(request_entry)
            .collect::<Result<Vec<_>, _>>()?;

        let output = self
            .client
            .put_events()
            .set_entries(Some(entries))
            .send()
            .await
            .map_err(|e| SluiceError::EventBus(format!("PutEvents: {}", DisplayErrorContext(&e))))?;

        Ok(outcome_from_entries(output.entries()))
    }
}
