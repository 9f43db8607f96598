//! Testing utilities for the discovery workspace
//!
//! Shared fixtures and an in-memory fetcher that records every request.

#![allow(missing_docs)]

use async_trait::async_trait;
use discovery_collection::{
    Entity, FetchError, FetchParams, FetchResponse, Identifier, ObjectFetcher, Record,
};
use parking_lot::Mutex;
use std::collections::VecDeque;
use tokio::sync::{watch, Semaphore};

enum Source<T> {
    /// Pages are sliced out of an ordered result set
    Dataset(Vec<T>),
    /// The same response for every request
    Fixed(FetchResponse<T>),
}

/// In-memory fetcher with scripted responses
///
/// - Records the parameters of every call
/// - Optionally holds responses until [`ScriptedFetcher::release`] is called
/// - Fails the next calls with queued errors
pub struct ScriptedFetcher<T> {
    source: Mutex<Source<T>>,
    calls: Mutex<Vec<FetchParams>>,
    call_count: watch::Sender<usize>,
    failures: Mutex<VecDeque<FetchError>>,
    gate: Option<Semaphore>,
}

impl<T: Entity> ScriptedFetcher<T> {
    /// Serve pages of `dataset`; ids are returned when requested
    pub fn new(dataset: Vec<T>) -> Self {
        Self::with_source(Source::Dataset(dataset), None)
    }

    /// Like [`ScriptedFetcher::new`], but every response waits for a permit
    pub fn gated(dataset: Vec<T>) -> Self {
        Self::with_source(Source::Dataset(dataset), Some(Semaphore::new(0)))
    }

    /// Answer every request with `response`, whatever it asks for
    pub fn fixed(response: FetchResponse<T>) -> Self {
        Self::with_source(Source::Fixed(response), None)
    }

    fn with_source(source: Source<T>, gate: Option<Semaphore>) -> Self {
        let (call_count, _) = watch::channel(0);
        Self {
            source: Mutex::new(source),
            calls: Mutex::new(Vec::new()),
            call_count,
            failures: Mutex::new(VecDeque::new()),
            gate,
        }
    }

    /// Replace the served result set
    pub fn set_dataset(&self, dataset: Vec<T>) {
        *self.source.lock() = Source::Dataset(dataset);
    }

    /// Fail the next call with `error`
    pub fn fail_next(&self, error: FetchError) {
        self.failures.lock().push_back(error);
    }

    /// Let `n` held responses through
    pub fn release(&self, n: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(n);
        }
    }

    /// Parameters of every call so far
    pub fn calls(&self) -> Vec<FetchParams> {
        self.calls.lock().clone()
    }

    /// Number of calls so far
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Wait until at least `n` calls have started
    pub async fn wait_for_calls(&self, n: usize) {
        let mut rx = self.call_count.subscribe();
        let _ = rx.wait_for(|&count| count >= n).await;
    }

    fn respond(&self, params: &FetchParams) -> FetchResponse<T> {
        match &*self.source.lock() {
            Source::Fixed(response) => response.clone(),
            Source::Dataset(dataset) => {
                let start = params.offset.min(dataset.len());
                let end = params.offset.saturating_add(params.limit).min(dataset.len());
                let response = FetchResponse::new(dataset[start..end].to_vec());
                if params.list_all_ids {
                    response.with_ids(dataset.iter().map(|item| item.id()).collect())
                } else {
                    response
                }
            }
        }
    }
}

#[async_trait]
impl<T: Entity> ObjectFetcher<T> for ScriptedFetcher<T> {
    async fn fetch(&self, params: FetchParams) -> Result<FetchResponse<T>, FetchError> {
        let count = {
            let mut calls = self.calls.lock();
            calls.push(params.clone());
            calls.len()
        };
        self.call_count.send_replace(count);

        if let Some(gate) = &self.gate {
            gate.acquire()
                .await
                .map_err(|_| FetchError::other("gate closed"))?
                .forget();
        }

        if let Some(error) = self.failures.lock().pop_front() {
            return Err(error);
        }

        Ok(self.respond(&params))
    }
}

/// Sample-like record with a name
pub fn sample(id: i64, name: &str) -> Record {
    Record::new(id).with_field("name", name)
}

/// Records `s{id}` for every id
pub fn samples(ids: impl IntoIterator<Item = i64>) -> Vec<Record> {
    ids.into_iter()
        .map(|id| sample(id, &format!("s{id}")))
        .collect()
}

/// Integer identifiers
pub fn int_ids(ids: &[i64]) -> Vec<Identifier> {
    ids.iter().copied().map(Identifier::Int).collect()
}

/// String identifiers
pub fn str_ids(ids: &[&str]) -> Vec<Identifier> {
    ids.iter().copied().map(Identifier::from).collect()
}
