//! In-memory object store used by the unit tests

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use md5::{Digest, Md5};

use crate::error::{Error, Result};
use crate::options::ProvenanceTag;
use crate::traits::{ListOptions, ListResult, ObjectInfo, ObjectStore, PutRequest};

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub body: Vec<u8>,
    pub etag: String,
    pub content_type: Option<String>,
    pub acl: Option<String>,
    pub cache_control: Option<String>,
    pub metadata: HashMap<String, String>,
}

pub fn md5_hex(body: &[u8]) -> String {
    hex::encode(Md5::digest(body))
}

/// Bucket-agnostic fake with S3-like pagination
#[derive(Debug)]
pub struct MemoryStore {
    objects: Mutex<BTreeMap<String, StoredObject>>,
    page_size: usize,
    head_delay: Option<Duration>,
    failing_heads: Mutex<HashSet<String>>,
    failing_list_page: Option<usize>,
    pub heads: AtomicUsize,
    pub puts: AtomicUsize,
    pub lists: AtomicUsize,
    pub deletes: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self {
            objects: Mutex::new(BTreeMap::new()),
            page_size: 1000,
            head_delay: None,
            failing_heads: Mutex::new(HashSet::new()),
            failing_list_page: None,
            heads: AtomicUsize::new(0),
            puts: AtomicUsize::new(0),
            lists: AtomicUsize::new(0),
            deletes: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page_size(mut self, size: usize) -> Self {
        self.page_size = size;
        self
    }

    pub fn with_head_delay(mut self, delay: Duration) -> Self {
        self.head_delay = Some(delay);
        self
    }

    /// Make the n-th list call (zero based) fail
    pub fn with_failing_list_page(mut self, page: usize) -> Self {
        self.failing_list_page = Some(page);
        self
    }

    pub fn fail_head(&self, key: &str) {
        self.failing_heads.lock().unwrap().insert(key.to_string());
    }

    pub fn insert(&self, key: &str, body: &[u8], metadata: HashMap<String, String>) {
        let object = StoredObject {
            body: body.to_vec(),
            etag: md5_hex(body),
            content_type: None,
            acl: None,
            cache_control: None,
            metadata,
        };
        self.objects.lock().unwrap().insert(key.to_string(), object);
    }

    /// Insert an object carrying the default provenance tag
    pub fn insert_tagged(&self, key: &str, body: &[u8]) {
        self.insert(key, body, ProvenanceTag::default().to_metadata());
    }

    /// Insert an object as if uploaded by hand
    pub fn insert_foreign(&self, key: &str, body: &[u8]) {
        self.insert(key, body, HashMap::new());
    }

    pub fn get(&self, key: &str) -> Option<StoredObject> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }

    pub fn deleted(&self) -> Vec<String> {
        let mut keys = self.deletes.lock().unwrap().clone();
        keys.sort();
        keys
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn head_object(&self, _bucket: &str, key: &str) -> Result<ObjectInfo> {
        self.heads.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.head_delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing_heads.lock().unwrap().contains(key) {
            return Err(Error::Network(format!("injected failure for {key}")));
        }

        let objects = self.objects.lock().unwrap();
        let object = objects
            .get(key)
            .ok_or_else(|| Error::NotFound(key.to_string()))?;
        Ok(ObjectInfo::new(key)
            .with_etag(&format!("\"{}\"", object.etag))
            .with_metadata(object.metadata.clone()))
    }

    async fn put_object(&self, request: PutRequest) -> Result<ObjectInfo> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        let etag = md5_hex(&request.body);
        let object = StoredObject {
            body: request.body,
            etag: etag.clone(),
            content_type: Some(request.content_type),
            acl: request.acl,
            cache_control: request.cache_control,
            metadata: request.metadata,
        };
        self.objects
            .lock()
            .unwrap()
            .insert(request.key.clone(), object);
        Ok(ObjectInfo::new(request.key).with_etag(&etag))
    }

    async fn list_objects(&self, _bucket: &str, options: ListOptions) -> Result<ListResult> {
        let call = self.lists.fetch_add(1, Ordering::SeqCst);
        if self.failing_list_page == Some(call) {
            return Err(Error::Network(format!("injected failure on page {call}")));
        }

        let objects = self.objects.lock().unwrap();
        let start_after = options.continuation_token.unwrap_or_default();
        let mut remaining = objects
            .iter()
            .filter(|(key, _)| key.as_str() > start_after.as_str());

        let items: Vec<ObjectInfo> = remaining
            .by_ref()
            .take(self.page_size)
            .map(|(key, object)| ObjectInfo::new(key.as_str()).with_etag(&object.etag))
            .collect();
        let truncated = remaining.next().is_some();

        Ok(ListResult {
            continuation_token: truncated
                .then(|| items.last().map(|item| item.key.clone()))
                .flatten(),
            items,
            truncated,
        })
    }

    async fn delete_object(&self, _bucket: &str, key: &str) -> Result<()> {
        self.deletes.lock().unwrap().push(key.to_string());
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }
}
