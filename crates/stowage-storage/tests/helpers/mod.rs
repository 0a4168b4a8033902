//! In-memory ObjectClient for S3 backend tests.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use stowage_storage::{ClientError, ObjectClient, PutObject};
use tokio::sync::Barrier;

pub struct MockClient {
    buckets: Mutex<HashSet<String>>,
    objects: Mutex<HashMap<(String, String), PutObject>>,
    exists_barrier: Option<Barrier>,
    create_failure: Option<String>,
    calls: AtomicUsize,
    create_calls: AtomicUsize,
    buckets_created: AtomicUsize,
}

impl MockClient {
    pub fn new() -> Self {
        Self {
            buckets: Mutex::new(HashSet::new()),
            objects: Mutex::new(HashMap::new()),
            exists_barrier: None,
            create_failure: None,
            calls: AtomicUsize::new(0),
            create_calls: AtomicUsize::new(0),
            buckets_created: AtomicUsize::new(0),
        }
    }

    /// Start with `bucket` already present.
    pub fn with_bucket(self, bucket: &str) -> Self {
        self.buckets.lock().unwrap().insert(bucket.to_string());
        self
    }

    /// Hold every `bucket_exists` answer until `parties` callers have asked,
    /// so they all observe the same (missing) state.
    pub fn with_exists_barrier(mut self, parties: usize) -> Self {
        self.exists_barrier = Some(Barrier::new(parties));
        self
    }

    /// Make `create_bucket` fail with a service error.
    pub fn with_create_failure(mut self, message: &str) -> Self {
        self.create_failure = Some(message.to_string());
        self
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<PutObject> {
        self.objects
            .lock()
            .unwrap()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    pub fn object_count(&self) -> usize {
        self.objects.lock().unwrap().len()
    }

    pub fn has_bucket(&self, bucket: &str) -> bool {
        self.buckets.lock().unwrap().contains(bucket)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn buckets_created(&self) -> usize {
        self.buckets_created.load(Ordering::SeqCst)
    }
}

impl Default for MockClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ObjectClient for MockClient {
    async fn bucket_exists(&self, bucket: &str) -> Result<bool, ClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let exists = self.buckets.lock().unwrap().contains(bucket);
        if let Some(barrier) = &self.exists_barrier {
            barrier.wait().await;
        }
        Ok(exists)
    }

    async fn create_bucket(&self, bucket: &str) -> Result<(), ClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.create_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(message) = &self.create_failure {
            return Err(ClientError::Service {
                operation: "create_bucket",
                message: message.clone(),
            });
        }

        if !self.buckets.lock().unwrap().insert(bucket.to_string()) {
            return Err(ClientError::BucketAlreadyExists {
                bucket: bucket.to_string(),
            });
        }
        self.buckets_created.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn put_object(&self, object: PutObject) -> Result<(), ClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.buckets.lock().unwrap().contains(&object.bucket) {
            return Err(ClientError::Service {
                operation: "put_object",
                message: format!("NoSuchBucket: {}", object.bucket),
            });
        }
        self.objects
            .lock()
            .unwrap()
            .insert((object.bucket.clone(), object.key.clone()), object);
        Ok(())
    }

    async fn remove_object(&self, bucket: &str, key: &str) -> Result<(), ClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self
            .objects
            .lock()
            .unwrap()
            .remove(&(bucket.to_string(), key.to_string()))
        {
            Some(_) => Ok(()),
            None => Err(ClientError::NotFound {
                key: key.to_string(),
            }),
        }
    }
}
