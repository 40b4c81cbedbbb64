//! Test doubles and common utilities for contract tests
//!
//! This module provides an in-memory provider that records every call, a
//! request source fed by the test, and an ack sink that records
//! acknowledgments.

#![allow(dead_code)]

use acme_dns_core::error::{Error, Result};
use acme_dns_core::propagation::TxtLookup;
use acme_dns_core::request::Acknowledgment;
use acme_dns_core::traits::{AckSink, ProviderClient, RequestSource, TxtRecord, Zone};
use std::collections::{HashMap, HashSet};
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::Stream;

/// A provider whose zones and records live in memory
#[derive(Default)]
pub struct InMemoryProvider {
    zones: Vec<Zone>,
    records: Mutex<HashMap<String, Vec<TxtRecord>>>,
    next_id: AtomicUsize,
    /// Zone names probed through find_zone, in order
    probes: Mutex<Vec<String>>,
    list_calls: AtomicUsize,
    /// (name, content, ttl) of every create call
    creates: Mutex<Vec<(String, String, u32)>>,
    /// Record ids of every delete call
    deletes: Mutex<Vec<String>>,
    /// Candidates whose lookup fails at the transport level
    failing_lookups: HashSet<String>,
    fail_create: Option<String>,
    fail_delete: Option<String>,
    fail_list: Option<String>,
    /// Artificial latency for create calls
    create_delay: Option<Duration>,
}

impl InMemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a zone `name` with id `zone-<name>`
    pub fn with_zone(mut self, name: &str) -> Self {
        self.zones.push(Zone::new(format!("zone-{}", name), name));
        self
    }

    /// Seed an existing record in the zone named `zone`
    pub fn with_record(self, zone: &str, id: &str, name: &str, content: &str) -> Self {
        self.records
            .lock()
            .unwrap()
            .entry(format!("zone-{}", zone))
            .or_default()
            .push(TxtRecord {
                id: id.to_string(),
                name: name.to_string(),
                content: content.to_string(),
                ttl: Some(120),
            });
        self
    }

    pub fn with_failing_lookup(mut self, candidate: &str) -> Self {
        self.failing_lookups.insert(candidate.to_string());
        self
    }

    pub fn with_failing_create(mut self, message: &str) -> Self {
        self.fail_create = Some(message.to_string());
        self
    }

    pub fn with_failing_delete(mut self, message: &str) -> Self {
        self.fail_delete = Some(message.to_string());
        self
    }

    pub fn with_failing_list(mut self, message: &str) -> Self {
        self.fail_list = Some(message.to_string());
        self
    }

    pub fn with_create_delay(mut self, delay: Duration) -> Self {
        self.create_delay = Some(delay);
        self
    }

    pub fn probes(&self) -> Vec<String> {
        self.probes.lock().unwrap().clone()
    }

    pub fn list_call_count(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn creates(&self) -> Vec<(String, String, u32)> {
        self.creates.lock().unwrap().clone()
    }

    pub fn create_call_count(&self) -> usize {
        self.creates.lock().unwrap().len()
    }

    pub fn deletes(&self) -> Vec<String> {
        self.deletes.lock().unwrap().clone()
    }

    /// Contents currently stored under `name` in the zone named `zone`
    pub fn contents(&self, zone: &str, name: &str) -> Vec<String> {
        self.records
            .lock()
            .unwrap()
            .get(&format!("zone-{}", zone))
            .map(|records| {
                records
                    .iter()
                    .filter(|r| r.name == name)
                    .map(|r| r.content.clone())
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl ProviderClient for InMemoryProvider {
    async fn find_zone(&self, candidate: &str) -> Result<Option<Zone>> {
        self.probes.lock().unwrap().push(candidate.to_string());

        if self.failing_lookups.contains(candidate) {
            return Err(Error::transport("memory", "connection reset"));
        }

        Ok(self.zones.iter().find(|z| z.name == candidate).cloned())
    }

    async fn list_txt_records(&self, zone_id: &str, name: &str) -> Result<Vec<TxtRecord>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(message) = &self.fail_list {
            return Err(Error::transport("memory", message.clone()));
        }

        Ok(self
            .records
            .lock()
            .unwrap()
            .get(zone_id)
            .map(|records| records.iter().filter(|r| r.name == name).cloned().collect())
            .unwrap_or_default())
    }

    async fn create_txt_record(
        &self,
        zone_id: &str,
        name: &str,
        content: &str,
        ttl: u32,
    ) -> Result<TxtRecord> {
        self.creates
            .lock()
            .unwrap()
            .push((name.to_string(), content.to_string(), ttl));

        if let Some(delay) = self.create_delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(message) = &self.fail_create {
            return Err(Error::add_failed(name, message.clone()));
        }

        let record = TxtRecord {
            id: format!("rec-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1),
            name: name.to_string(),
            content: content.to_string(),
            ttl: Some(ttl),
        };
        self.records
            .lock()
            .unwrap()
            .entry(zone_id.to_string())
            .or_default()
            .push(record.clone());

        Ok(record)
    }

    async fn delete_txt_record(&self, zone_id: &str, record_id: &str) -> Result<()> {
        self.deletes.lock().unwrap().push(record_id.to_string());

        if let Some(message) = &self.fail_delete {
            return Err(Error::remove_failed(record_id, message.clone()));
        }

        if let Some(records) = self.records.lock().unwrap().get_mut(zone_id) {
            records.retain(|r| r.id != record_id);
        }
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "memory"
    }
}

/// A request source fed by the test through a channel
pub struct ControlledRequestSource {
    rx: Mutex<Option<mpsc::UnboundedReceiver<Vec<u8>>>>,
}

impl ControlledRequestSource {
    pub fn new() -> (Self, mpsc::UnboundedSender<Vec<u8>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                rx: Mutex::new(Some(rx)),
            },
            tx,
        )
    }
}

impl RequestSource for ControlledRequestSource {
    fn requests(&self) -> Pin<Box<dyn Stream<Item = Vec<u8>> + Send + 'static>> {
        let rx = self
            .rx
            .lock()
            .unwrap()
            .take()
            .expect("requests() can only be called once");

        Box::pin(tokio_stream::wrappers::UnboundedReceiverStream::new(rx))
    }
}

/// An ack sink that records everything published
#[derive(Clone, Default)]
pub struct RecordingSink {
    acks: Arc<Mutex<Vec<Acknowledgment>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acks(&self) -> Vec<Acknowledgment> {
        self.acks.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl AckSink for RecordingSink {
    async fn publish(&self, ack: &Acknowledgment) -> Result<()> {
        self.acks.lock().unwrap().push(ack.clone());
        Ok(())
    }
}

/// A resolver that answers every TXT lookup the same way and counts calls
pub struct FixedTxtLookup {
    answer: std::result::Result<Vec<String>, String>,
    calls: AtomicUsize,
}

impl FixedTxtLookup {
    pub fn values(values: &[&str]) -> Self {
        Self {
            answer: Ok(values.iter().map(|v| v.to_string()).collect()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            answer: Err(message.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl TxtLookup for FixedTxtLookup {
    async fn lookup_txt(&self, _name: &str) -> Result<Vec<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.answer
            .clone()
            .map_err(|message| Error::transport("dns", message))
    }
}

/// Serialize a JSON value into a request payload
pub fn payload(value: serde_json::Value) -> Vec<u8> {
    serde_json::to_vec(&value).expect("payload serializes")
}
