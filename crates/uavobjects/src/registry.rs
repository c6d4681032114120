// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Keyed store of schemas and instances, with update subscriptions.
//!
//! ```text
//! transport ──(object id, instance id, bytes)──> unpack_object()
//!                                                   │
//!        instances: DashMap<ObjectKey, Arc<ObjectInstance>>
//!                                                   │  unpack (instance lock)
//!                                                   v
//!        subscribers: Mutex<HashMap<ObjectKey, Vec<Sender>>>  ──> ObjectEvent
//! ```
//!
//! The registry owns every instance. Callers get `Arc` handles for the
//! duration of an operation or keep the [`ObjectKey`] and look up again;
//! an evicted instance simply stops being found. Events are dispatched
//! after the instance lock has been released.

use crate::error::{Error, Result};
use crate::instance::{ObjectInstance, ObjectKey};
use crate::metadata::{data_object_id, is_metadata_id, Metadata};
use crate::schema::ObjectSchema;
use crossbeam::channel::{self, Receiver, Sender, TrySendError};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Registry tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Capacity of each subscriber channel; 0 means unbounded.
    pub event_capacity: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self { event_capacity: 64 }
    }
}

/// What happened to an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// First reference created the instance.
    Created,
    /// Inbound payload applied.
    Unpacked,
    /// Local writes committed (reported through [`ObjectRegistry::notify_updated`]).
    Updated,
    /// Inbound metadata applied.
    MetadataUnpacked,
    /// Local metadata change.
    MetadataUpdated,
    /// Instance removed from the registry.
    Evicted,
}

/// Notification delivered to subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectEvent {
    pub key: ObjectKey,
    pub kind: EventKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Receiving side of a subscription.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriptionId,
    key: ObjectKey,
    receiver: Receiver<ObjectEvent>,
}

impl Subscription {
    /// Id to pass to [`ObjectRegistry::unsubscribe`].
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Instance this subscription watches.
    pub fn key(&self) -> ObjectKey {
        self.key
    }

    /// Underlying channel, for `select!` or blocking receives.
    pub fn receiver(&self) -> &Receiver<ObjectEvent> {
        &self.receiver
    }

    /// Next pending event, if any.
    pub fn try_recv(&self) -> Option<ObjectEvent> {
        self.receiver.try_recv().ok()
    }

    /// Drain everything pending.
    pub fn drain(&self) -> Vec<ObjectEvent> {
        self.receiver.try_iter().collect()
    }
}

#[derive(Debug)]
struct Subscriber {
    id: SubscriptionId,
    sender: Sender<ObjectEvent>,
}

/// Store of schemas and live instances.
#[derive(Debug)]
pub struct ObjectRegistry {
    config: RegistryConfig,
    schemas: DashMap<u32, Arc<ObjectSchema>>,
    names: DashMap<String, u32>,
    instances: DashMap<ObjectKey, Arc<ObjectInstance>>,
    subscribers: Mutex<HashMap<ObjectKey, Vec<Subscriber>>>,
    next_subscription: AtomicU64,
}

impl Default for ObjectRegistry {
    fn default() -> Self {
        Self::new(RegistryConfig::default())
    }
}

impl ObjectRegistry {
    /// Empty registry.
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            config,
            schemas: DashMap::new(),
            names: DashMap::new(),
            instances: DashMap::new(),
            subscribers: Mutex::new(HashMap::new()),
            next_subscription: AtomicU64::new(1),
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Register a schema and create its instance 0.
    pub fn register(&self, schema: ObjectSchema) -> Result<Arc<ObjectSchema>> {
        let schema = Arc::new(schema);
        match self.schemas.entry(schema.id()) {
            Entry::Occupied(_) => {
                return Err(Error::DuplicateSchema(format!(
                    "{} (0x{:08X})",
                    schema.name(),
                    schema.id()
                )))
            }
            Entry::Vacant(slot) => {
                match self.names.entry(schema.name().to_string()) {
                    Entry::Occupied(_) => {
                        return Err(Error::DuplicateSchema(schema.name().to_string()))
                    }
                    Entry::Vacant(name_slot) => {
                        name_slot.insert(schema.id());
                    }
                }
                slot.insert(Arc::clone(&schema));
            }
        }

        // A concurrent create_instance(id, 0) may already have built it.
        self.instances
            .entry(ObjectKey::new(schema.id(), 0))
            .or_insert_with(|| Arc::new(ObjectInstance::new(&schema, 0)));
        log::debug!(
            "[registry] registered {} (0x{:08X}, {} bytes, {})",
            schema.name(),
            schema.id(),
            schema.total_bytes(),
            if schema.is_single_instance() {
                "single"
            } else {
                "multi"
            }
        );
        Ok(schema)
    }

    /// Schema by object id.
    pub fn schema(&self, schema_id: u32) -> Option<Arc<ObjectSchema>> {
        self.schemas.get(&schema_id).map(|s| Arc::clone(s.value()))
    }

    /// Schema by object name.
    pub fn schema_by_name(&self, name: &str) -> Option<Arc<ObjectSchema>> {
        let id = *self.names.get(name)?;
        self.schema(id)
    }

    /// All registered schemas, ordered by id.
    pub fn schemas(&self) -> Vec<Arc<ObjectSchema>> {
        let mut out: Vec<_> = self.schemas.iter().map(|s| Arc::clone(s.value())).collect();
        out.sort_by_key(|s| s.id());
        out
    }

    fn require_schema(&self, schema_id: u32) -> Result<Arc<ObjectSchema>> {
        self.schema(schema_id)
            .ok_or_else(|| Error::UnknownSchema(format!("0x{:08X}", schema_id)))
    }

    /// Get an instance by key, if it exists.
    pub fn get_instance(&self, schema_id: u32, instance_id: u32) -> Option<Arc<ObjectInstance>> {
        self.instances
            .get(&ObjectKey::new(schema_id, instance_id))
            .map(|i| Arc::clone(i.value()))
    }

    /// Like [`get_instance`](Self::get_instance), distinguishing unknown schema from unknown instance.
    pub fn instance(&self, schema_id: u32, instance_id: u32) -> Result<Arc<ObjectInstance>> {
        if let Some(inst) = self.get_instance(schema_id, instance_id) {
            return Ok(inst);
        }
        self.require_schema(schema_id)?;
        Err(Error::UnknownInstance {
            schema_id,
            instance_id,
        })
    }

    /// Instance 0 of the object called `name`.
    pub fn get_singleton(&self, name: &str) -> Option<Arc<ObjectInstance>> {
        let id = *self.names.get(name)?;
        self.get_instance(id, 0)
    }

    /// All live instances of a schema, ordered by instance id.
    pub fn instances(&self, schema_id: u32) -> Vec<Arc<ObjectInstance>> {
        let mut out: Vec<_> = self
            .instances
            .iter()
            .filter(|e| e.key().schema_id == schema_id)
            .map(|e| Arc::clone(e.value()))
            .collect();
        out.sort_by_key(|i| i.instance_id());
        out
    }

    /// Return the instance, creating it with declared defaults and default
    /// metadata on first reference.
    ///
    /// Single-instance schemas only ever have instance 0; any other id fails
    /// with `UnknownInstance`.
    pub fn create_instance(&self, schema_id: u32, instance_id: u32) -> Result<Arc<ObjectInstance>> {
        if let Some(inst) = self.get_instance(schema_id, instance_id) {
            return Ok(inst);
        }
        let schema = self.require_schema(schema_id)?;
        if schema.is_single_instance() && instance_id != 0 {
            return Err(Error::UnknownInstance {
                schema_id,
                instance_id,
            });
        }
        let key = ObjectKey::new(schema_id, instance_id);
        let mut created = false;
        let inst = Arc::clone(
            self.instances
                .entry(key)
                .or_insert_with(|| {
                    created = true;
                    Arc::new(ObjectInstance::new(&schema, instance_id))
                })
                .value(),
        );
        if created {
            log::debug!("[registry] created {} inst {}", schema.name(), instance_id);
            self.dispatch(key, EventKind::Created);
        }
        Ok(inst)
    }

    /// Insert a copy of `source_instance` under `new_instance_id`.
    pub fn clone_instance(
        &self,
        schema_id: u32,
        source_instance: u32,
        new_instance_id: u32,
    ) -> Result<Arc<ObjectInstance>> {
        let source = self.instance(schema_id, source_instance)?;
        if source.schema().is_single_instance() {
            return Err(Error::UnknownInstance {
                schema_id,
                instance_id: new_instance_id,
            });
        }
        let key = ObjectKey::new(schema_id, new_instance_id);
        let inst = match self.instances.entry(key) {
            Entry::Occupied(_) => {
                return Err(Error::DuplicateInstance {
                    schema_id,
                    instance_id: new_instance_id,
                })
            }
            Entry::Vacant(slot) => {
                let inst = Arc::new(source.clone_as(new_instance_id));
                slot.insert(Arc::clone(&inst));
                inst
            }
        };
        self.dispatch(key, EventKind::Created);
        Ok(inst)
    }

    /// Drop an instance. Outstanding `Arc` handles stay valid but detached.
    pub fn evict(&self, schema_id: u32, instance_id: u32) -> Option<Arc<ObjectInstance>> {
        let key = ObjectKey::new(schema_id, instance_id);
        let (_, inst) = self.instances.remove(&key)?;
        log::debug!("[registry] evicted {}", key);
        self.dispatch(key, EventKind::Evicted);
        Some(inst)
    }

    /// Apply an inbound payload addressed by raw object id.
    ///
    /// Metadata ids update the instance's metadata; data ids unpack into the
    /// instance, creating multi-instance objects on first reference.
    /// Subscribers are notified only after a successful unpack.
    pub fn unpack_object(&self, object_id: u32, instance_id: u32, bytes: &[u8]) -> Result<ObjectKey> {
        if is_metadata_id(object_id) {
            let schema_id = data_object_id(object_id);
            let inst = self.instance(schema_id, instance_id)?;
            inst.unpack_metadata(bytes)?;
            let key = inst.key();
            self.dispatch(key, EventKind::MetadataUnpacked);
            return Ok(key);
        }

        let inst = self.create_instance(object_id, instance_id)?;
        if let Err(e) = inst.unpack(bytes) {
            log::warn!("[registry] rejected payload for {}: {}", inst.key(), e);
            return Err(e);
        }
        let key = inst.key();
        self.dispatch(key, EventKind::Unpacked);
        Ok(key)
    }

    /// Outbound payload for a raw object id (data or metadata).
    pub fn pack_object(&self, object_id: u32, instance_id: u32) -> Result<Vec<u8>> {
        if is_metadata_id(object_id) {
            let inst = self.instance(data_object_id(object_id), instance_id)?;
            return Ok(inst.pack_metadata().to_vec());
        }
        Ok(self.instance(object_id, instance_id)?.pack())
    }

    /// Replace an instance's metadata and notify subscribers.
    pub fn set_metadata(&self, schema_id: u32, instance_id: u32, metadata: Metadata) -> Result<()> {
        let inst = self.instance(schema_id, instance_id)?;
        inst.set_metadata(metadata);
        self.dispatch(inst.key(), EventKind::MetadataUpdated);
        Ok(())
    }

    /// Tell subscribers that local writes to an instance were committed.
    pub fn notify_updated(&self, schema_id: u32, instance_id: u32) -> Result<()> {
        let inst = self.instance(schema_id, instance_id)?;
        self.dispatch(inst.key(), EventKind::Updated);
        Ok(())
    }

    /// Subscribe to events for one instance key.
    ///
    /// The instance need not exist yet; a `Created` event follows its first
    /// reference.
    pub fn subscribe(&self, schema_id: u32, instance_id: u32) -> Result<Subscription> {
        self.require_schema(schema_id)?;
        let key = ObjectKey::new(schema_id, instance_id);
        let (sender, receiver) = if self.config.event_capacity == 0 {
            channel::unbounded()
        } else {
            channel::bounded(self.config.event_capacity)
        };
        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::Relaxed));
        self.subscribers
            .lock()
            .entry(key)
            .or_default()
            .push(Subscriber { id, sender });
        Ok(Subscription { id, key, receiver })
    }

    /// Remove a subscription. Returns false if it was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.lock();
        let mut removed = false;
        subscribers.retain(|_, list| {
            let before = list.len();
            list.retain(|s| s.id != id);
            removed |= list.len() != before;
            !list.is_empty()
        });
        removed
    }

    fn dispatch(&self, key: ObjectKey, kind: EventKind) {
        let event = ObjectEvent { key, kind };
        let mut subscribers = self.subscribers.lock();
        let Some(list) = subscribers.get_mut(&key) else {
            return;
        };
        list.retain(|s| match s.sender.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                log::warn!(
                    "[registry] subscriber {:?} queue full, dropping {:?} for {}",
                    s.id,
                    kind,
                    key
                );
                true
            }
            Err(TrySendError::Disconnected(_)) => false,
        });
        if list.is_empty() {
            subscribers.remove(&key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldType;
    use crate::value::FieldValue;

    fn stats(id: u32, name: &str) -> ObjectSchema {
        ObjectSchema::builder(id, name)
            .scalar("TxFailures", FieldType::UInt32)
            .enumeration("Status", ["Disconnected", "Connected"])
            .build()
            .unwrap()
    }

    fn multi(id: u32) -> ObjectSchema {
        ObjectSchema::builder(id, "AccessoryDesired")
            .single_instance(false)
            .scalar("AccessoryVal", FieldType::Float32)
            .build()
            .unwrap()
    }

    #[test]
    fn test_register_and_lookup() {
        let reg = ObjectRegistry::default();
        reg.register(stats(0x100, "Stats")).unwrap();
        assert!(reg.schema(0x100).is_some());
        assert_eq!(reg.schema_by_name("Stats").unwrap().id(), 0x100);
        assert_eq!(reg.get_singleton("Stats").unwrap().instance_id(), 0);
        assert!(reg.get_singleton("Nope").is_none());
        assert!(reg.get_instance(0x100, 1).is_none());
        assert!(matches!(
            reg.register(stats(0x100, "Other")),
            Err(Error::DuplicateSchema(_))
        ));
        assert!(matches!(
            reg.register(stats(0x200, "Stats")),
            Err(Error::DuplicateSchema(_))
        ));
        assert!(reg.schema(0x200).is_none());
    }

    #[test]
    fn test_unknown_schema_and_instance() {
        let reg = ObjectRegistry::default();
        reg.register(stats(0x100, "Stats")).unwrap();
        assert!(matches!(
            reg.instance(0x300, 0),
            Err(Error::UnknownSchema(_))
        ));
        assert!(matches!(
            reg.instance(0x100, 4),
            Err(Error::UnknownInstance {
                schema_id: 0x100,
                instance_id: 4
            })
        ));
        assert!(matches!(
            reg.create_instance(0x100, 1),
            Err(Error::UnknownInstance { .. })
        ));
        assert!(reg.unpack_object(0x300, 0, &[]).is_err());
    }

    #[test]
    fn test_single_instance_is_unique() {
        let reg = ObjectRegistry::default();
        reg.register(stats(0x100, "Stats")).unwrap();
        let a = reg.create_instance(0x100, 0).unwrap();
        let b = reg.get_singleton("Stats").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(reg.clone_instance(0x100, 0, 1).is_err());
        assert_eq!(reg.instances(0x100).len(), 1);
    }

    #[test]
    fn test_multi_instance_created_on_unpack() {
        let reg = ObjectRegistry::default();
        reg.register(multi(0x400)).unwrap();
        let sub = reg.subscribe(0x400, 3).unwrap();

        let payload = 0.75f32.to_le_bytes();
        let key = reg.unpack_object(0x400, 3, &payload).unwrap();
        assert_eq!(key, ObjectKey::new(0x400, 3));
        assert_eq!(
            reg.get_instance(0x400, 3)
                .unwrap()
                .get::<f32>("AccessoryVal", 0)
                .unwrap(),
            0.75
        );
        let kinds: Vec<_> = sub.drain().into_iter().map(|e| e.kind).collect();
        assert_eq!(kinds, [EventKind::Created, EventKind::Unpacked]);

        let ids: Vec<_> = reg.instances(0x400).iter().map(|i| i.instance_id()).collect();
        assert_eq!(ids, [0, 3]);
    }

    #[test]
    fn test_create_instance_uses_declared_defaults() {
        let reg = ObjectRegistry::default();
        let schema = ObjectSchema::builder(0x400, "AccessoryDesired")
            .single_instance(false)
            .scalar("V", FieldType::UInt8)
            .with_default(7u8)
            .default_metadata(Metadata {
                gcs_update_period_ms: 500,
                ..Metadata::default()
            })
            .build()
            .unwrap();
        reg.register(schema).unwrap();
        let zero = reg.get_instance(0x400, 0).unwrap();
        zero.set_field("V", 0, 99u8).unwrap();
        zero.set_metadata(Metadata::default());

        let two = reg.create_instance(0x400, 2).unwrap();
        assert_eq!(two.instance_id(), 2);
        assert_eq!(two.get::<u8>("V", 0).unwrap(), 7);
        assert_eq!(two.metadata().gcs_update_period_ms, 500);
        assert!(Arc::ptr_eq(&two, &reg.create_instance(0x400, 2).unwrap()));

        // Inbound creation path behaves the same.
        reg.unpack_object(0x400, 3, &[42]).unwrap();
        let three = reg.get_instance(0x400, 3).unwrap();
        assert_eq!(three.get::<u8>("V", 0).unwrap(), 42);
        assert_eq!(three.metadata().gcs_update_period_ms, 500);

        two.set_field("V", 0, 1u8).unwrap();
        assert_eq!(zero.get::<u8>("V", 0).unwrap(), 99);
    }

    #[test]
    fn test_failed_unpack_does_not_notify() {
        let reg = ObjectRegistry::default();
        reg.register(stats(0x100, "Stats")).unwrap();
        let sub = reg.subscribe(0x100, 0).unwrap();
        assert!(matches!(
            reg.unpack_object(0x100, 0, &[0u8; 2]),
            Err(Error::SizeMismatch { .. })
        ));
        assert!(sub.try_recv().is_none());
        reg.unpack_object(0x100, 0, &[1, 0, 0, 0, 1]).unwrap();
        assert_eq!(
            sub.try_recv(),
            Some(ObjectEvent {
                key: ObjectKey::new(0x100, 0),
                kind: EventKind::Unpacked
            })
        );
    }

    #[test]
    fn test_metadata_routing() {
        let reg = ObjectRegistry::default();
        let schema = reg.register(stats(0x100, "Stats")).unwrap();
        let sub = reg.subscribe(0x100, 0).unwrap();
        let m = Metadata {
            flight_telemetry_acked: true,
            flight_update_period_ms: 1000,
            ..Metadata::default()
        };
        reg.unpack_object(schema.metadata_id(), 0, &m.pack()).unwrap();
        assert_eq!(reg.get_singleton("Stats").unwrap().metadata(), m);
        assert_eq!(sub.try_recv().map(|e| e.kind), Some(EventKind::MetadataUnpacked));
        assert_eq!(
            reg.pack_object(schema.metadata_id(), 0).unwrap(),
            m.pack().to_vec()
        );
        assert_eq!(reg.pack_object(0x100, 0).unwrap().len(), 5);
    }

    #[test]
    fn test_unsubscribe_and_disconnect() {
        let reg = ObjectRegistry::default();
        reg.register(stats(0x100, "Stats")).unwrap();
        let a = reg.subscribe(0x100, 0).unwrap();
        let b = reg.subscribe(0x100, 0).unwrap();
        assert!(reg.unsubscribe(a.id()));
        assert!(!reg.unsubscribe(a.id()));

        reg.notify_updated(0x100, 0).unwrap();
        assert!(a.try_recv().is_none());
        assert_eq!(b.try_recv().map(|e| e.kind), Some(EventKind::Updated));

        drop(b);
        reg.notify_updated(0x100, 0).unwrap();
        assert!(reg.subscribers.lock().is_empty());
    }

    #[test]
    fn test_bounded_queue_drops_overflow() {
        let reg = ObjectRegistry::new(RegistryConfig { event_capacity: 2 });
        reg.register(stats(0x100, "Stats")).unwrap();
        let sub = reg.subscribe(0x100, 0).unwrap();
        for _ in 0..5 {
            reg.notify_updated(0x100, 0).unwrap();
        }
        assert_eq!(sub.drain().len(), 2);
    }

    #[test]
    fn test_clone_and_evict() {
        let reg = ObjectRegistry::default();
        reg.register(multi(0x400)).unwrap();
        reg.instance(0x400, 0)
            .unwrap()
            .set_field("AccessoryVal", 0, FieldValue::Float32(0.5))
            .unwrap();
        let c = reg.clone_instance(0x400, 0, 7).unwrap();
        assert_eq!(c.get::<f32>("AccessoryVal", 0).unwrap(), 0.5);
        assert!(matches!(
            reg.clone_instance(0x400, 0, 7),
            Err(Error::DuplicateInstance { instance_id: 7, .. })
        ));

        let sub = reg.subscribe(0x400, 7).unwrap();
        let held = reg.evict(0x400, 7).unwrap();
        assert!(reg.get_instance(0x400, 7).is_none());
        assert_eq!(sub.try_recv().map(|e| e.kind), Some(EventKind::Evicted));
        // Detached handle still works on its own buffer.
        assert_eq!(held.get::<f32>("AccessoryVal", 0).unwrap(), 0.5);
        assert!(reg.evict(0x400, 7).is_none());
    }

    #[test]
    fn test_set_metadata_notifies() {
        let reg = ObjectRegistry::default();
        reg.register(stats(0x100, "Stats")).unwrap();
        let sub = reg.subscribe(0x100, 0).unwrap();
        let m = Metadata {
            gcs_update_period_ms: 42,
            ..Metadata::default()
        };
        reg.set_metadata(0x100, 0, m).unwrap();
        assert_eq!(reg.get_singleton("Stats").unwrap().metadata(), m);
        assert_eq!(sub.try_recv().map(|e| e.kind), Some(EventKind::MetadataUpdated));
        assert!(reg.subscribe(0x999, 0).is_err());
    }
}
