//! Dispatcher Module
//!
//! Routes parsed requests to the key registry and allocators.
//!
//! ## Responsibilities
//! - Validate argument count and types per command
//! - Resolve (or adopt) the allocator for a key
//! - Turn every business error into exactly one `-ERROR` reply

use std::sync::Arc;

use crate::error::{AtlasError, Result};
use crate::protocol::{Reply, Request};
use crate::sequence::{KeyRegistry, SequenceKey};

/// Maps requests to registry/allocator operations
pub struct Dispatcher {
    registry: Arc<KeyRegistry>,
}

impl Dispatcher {
    /// Wrap a registry whose catalog already exists (see [`KeyRegistry::new`])
    pub fn new(registry: Arc<KeyRegistry>) -> Self {
        Self { registry }
    }

    /// Handle one request
    ///
    /// Request-fatal errors (bad arguments, unknown command, store failures)
    /// come back as `Ok(Reply::Error)`. An `Err` is an internal fault the
    /// connection must answer and then close on.
    pub fn dispatch(&self, request: &Request) -> Result<Reply> {
        match self.execute(request) {
            Ok(reply) => Ok(reply),
            Err(e) if e.is_request_fatal() => {
                tracing::debug!("{} failed: {}", request.command, e);
                Ok(Reply::error(e.to_string()))
            }
            Err(e) => Err(e),
        }
    }

    /// Handle one request, surfacing every failure as an error
    pub fn execute(&self, request: &Request) -> Result<Reply> {
        match request.command.as_str() {
            "GET" => self.handle_get(request),
            "SET" => self.handle_set(request),
            "EXISTS" => self.handle_exists(request),
            "DEL" => self.handle_del(request),
            "SELECT" => self.handle_select(request),
            _ => Err(AtlasError::MethodNotSupported),
        }
    }

    /// GET key: next id, adopting a counter table that exists in the store
    /// but not in this process. Nil if the key is unknown everywhere.
    fn handle_get(&self, request: &Request) -> Result<Reply> {
        let key = Self::key_argument(request)?;

        let allocator = match self.registry.lookup(&key) {
            Some(allocator) => allocator,
            None => {
                if !self.registry.counter_exists(&key)? {
                    return Ok(Reply::nil());
                }
                tracing::debug!("Adopting existing counter table for {}", key);
                self.registry
                    .get_or_create(&key, self.registry.default_batch())?
            }
        };

        let id = allocator.next()?;
        Ok(Reply::bulk(id.to_string()))
    }

    /// SET key value: create the sequence at `value`, or rejoin it if the
    /// store already has a counter for `key`
    fn handle_set(&self, request: &Request) -> Result<Reply> {
        let key = Self::key_argument(request)?;
        let value = request.get_int(1)?;

        let (allocator, created) = self
            .registry
            .register(&key, self.registry.default_batch())?;
        let result = self
            .registry
            .catalog_add(&key)
            .and_then(|()| allocator.reset(value, false));

        if let Err(e) = result {
            // A half-created key must not stay resident
            if created && self.registry.forget_if_current(&allocator) {
                tracing::debug!("Unregistered {} after failed SET", key);
            }
            return Err(e);
        }
        Ok(Reply::ok())
    }

    /// EXISTS key: resident in this process only; the store is not probed
    fn handle_exists(&self, request: &Request) -> Result<Reply> {
        let key = Self::key_argument(request)?;
        let exists = self.registry.lookup(&key).is_some();
        Ok(Reply::integer(exists as i64))
    }

    /// DEL key: forget, drop the counter table, then uncatalog
    fn handle_del(&self, request: &Request) -> Result<Reply> {
        let key = Self::key_argument(request)?;

        let Some(allocator) = self.registry.forget(&key) else {
            return Ok(Reply::integer(0));
        };
        allocator.drop_table()?;
        self.registry.catalog_remove(&key)?;

        tracing::info!("Deleted sequence {}", key);
        Ok(Reply::integer(1))
    }

    /// SELECT index: accepted for client compatibility, has no effect
    fn handle_select(&self, request: &Request) -> Result<Reply> {
        if request.argument(0)?.is_empty() {
            return Err(AtlasError::NotEnoughArguments);
        }
        Ok(Reply::ok())
    }

    fn key_argument(request: &Request) -> Result<SequenceKey> {
        SequenceKey::parse(request.argument(0)?)
    }

    pub fn registry(&self) -> &Arc<KeyRegistry> {
        &self.registry
    }
}
