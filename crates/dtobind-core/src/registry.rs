//! Caller-owned registry of merger and utility instances
//!
//! Mergers are stateless singletons registered under stable string ids. Utility
//! objects are cached once per type, and named instances hold things like parsed
//! expressions. Mergers that implement [`PropertyAccessorAware`] receive the
//! binder's accessor by setter injection.
//!
//! Copyright (c) 2025 Dtobind Team
//! Licensed under the Apache-2.0 license

use crate::accessor::PropertyAccessor;
use crate::merger::basic::{
    CloneMerger, EnumNameMerger, FirstObjectMerger, IdentityMerger, ToStringMerger,
};
use crate::merger::calculation::{
    AgeMerger, SumExpressionMerger, SumMerger, SumProductMerger, TimeBetweenDatesMerger,
};
use crate::merger::format::{DateFormatMerger, DecimalFormatMerger, StringFormatMerger};
use crate::merger::reflective::{MethodCallMerger, PropertyCollectionMerger};
use crate::merger::{
    ids, MultiPropertyValueMerger, PropertyAccessorAware, SinglePropertyValueMerger,
};
use crate::{Error, Result};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::any::{Any, TypeId};
use std::fmt;
use std::sync::{Arc, OnceLock};

type Shared = Arc<dyn Any + Send + Sync>;

/// Registry of merger singletons, per-type utility instances and named instances
pub struct InstanceRegistry {
    singles: DashMap<String, Arc<dyn SinglePropertyValueMerger>>,
    multis: DashMap<String, Arc<dyn MultiPropertyValueMerger>>,
    singletons: DashMap<TypeId, Shared>,
    named: DashMap<String, Shared>,
    accessor: OnceLock<Arc<PropertyAccessor>>,
    awaiting_accessor: Mutex<Vec<Arc<dyn PropertyAccessorAware>>>,
}

impl InstanceRegistry {
    /// A registry with every built-in merger registered
    pub fn new() -> Arc<Self> {
        Arc::new_cyclic(|weak| {
            let registry = Self::bare();
            registry.install_builtins(SumExpressionMerger::new(weak.clone()));
            registry
        })
    }

    /// A registry without any mergers
    pub fn empty() -> Arc<Self> {
        Arc::new(Self::bare())
    }

    fn bare() -> Self {
        Self {
            singles: DashMap::new(),
            multis: DashMap::new(),
            singletons: DashMap::new(),
            named: DashMap::new(),
            accessor: OnceLock::new(),
            awaiting_accessor: Mutex::new(Vec::new()),
        }
    }

    fn install_builtins(&self, sum_expression: SumExpressionMerger) {
        self.insert_single(ids::IDENTITY, self.get_or_create::<IdentityMerger>());
        self.insert_single(ids::TO_STRING, self.get_or_create::<ToStringMerger>());
        self.insert_single(ids::ENUM_NAME, self.get_or_create::<EnumNameMerger>());
        self.insert_single(ids::DATE_FORMAT, self.get_or_create::<DateFormatMerger>());
        self.insert_single(ids::DECIMAL_FORMAT, self.get_or_create::<DecimalFormatMerger>());
        self.insert_single(ids::AGE, self.get_or_create::<AgeMerger>());

        let string_format = self.get_or_create::<StringFormatMerger>();
        self.insert_single(ids::STRING_FORMAT, string_format.clone());
        self.insert_multi(ids::STRING_FORMAT, string_format);
        self.insert_multi(ids::FIRST_OBJECT, self.get_or_create::<FirstObjectMerger>());
        self.insert_multi(ids::TIME_BETWEEN_DATES, self.get_or_create::<TimeBetweenDatesMerger>());

        self.insert_aware_single(ids::CLONE, self.get_or_create::<CloneMerger>());
        self.insert_aware_single(ids::METHOD_CALL, self.get_or_create::<MethodCallMerger>());
        self.insert_aware_single(ids::SUM, self.get_or_create::<SumMerger>());
        self.insert_aware_single(ids::SUM_PRODUCT, self.get_or_create::<SumProductMerger>());
        self.insert_aware_single(ids::SUM_EXPRESSION, Arc::new(sum_expression));
        self.insert_aware_single(
            ids::PROPERTY_COLLECTION,
            self.get_or_create::<PropertyCollectionMerger>(),
        );
    }

    /// The singleton instance of `T`, created on first request
    pub fn get_or_create<T>(&self) -> Arc<T>
    where
        T: Default + Send + Sync + 'static,
    {
        let shared = self
            .singletons
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Arc::new(T::default()) as Shared)
            .clone();
        match shared.downcast::<T>() {
            Ok(instance) => instance,
            // Entries are keyed by their own TypeId, so the downcast cannot miss.
            Err(_) => Arc::new(T::default()),
        }
    }

    pub fn get_named<T>(&self, name: &str) -> Option<Arc<T>>
    where
        T: Send + Sync + 'static,
    {
        self.named
            .get(name)
            .and_then(|entry| entry.value().clone().downcast::<T>().ok())
    }

    pub fn put_named<T>(&self, name: impl Into<String>, instance: Arc<T>)
    where
        T: Send + Sync + 'static,
    {
        self.named.insert(name.into(), instance as Shared);
    }

    pub fn register_single<M>(&self, id: impl Into<String>, merger: M)
    where
        M: SinglePropertyValueMerger + 'static,
    {
        self.insert_single(id, Arc::new(merger));
    }

    pub fn register_multi<M>(&self, id: impl Into<String>, merger: M)
    where
        M: MultiPropertyValueMerger + 'static,
    {
        self.insert_multi(id, Arc::new(merger));
    }

    /// Register a single-value merger that needs the property accessor injected
    pub fn register_single_accessor_aware<M>(&self, id: impl Into<String>, merger: M)
    where
        M: SinglePropertyValueMerger + PropertyAccessorAware + 'static,
    {
        self.insert_aware_single(id, Arc::new(merger));
    }

    /// Register a multi-value merger that needs the property accessor injected
    pub fn register_multi_accessor_aware<M>(&self, id: impl Into<String>, merger: M)
    where
        M: MultiPropertyValueMerger + PropertyAccessorAware + 'static,
    {
        let merger = Arc::new(merger);
        self.inject_or_defer(merger.clone());
        self.insert_multi(id, merger);
    }

    pub fn single(&self, id: &str) -> Result<Arc<dyn SinglePropertyValueMerger>> {
        self.singles
            .get(id)
            .map(|m| m.value().clone())
            .ok_or_else(|| Error::UnknownMerger { id: id.to_string() })
    }

    pub fn multi(&self, id: &str) -> Result<Arc<dyn MultiPropertyValueMerger>> {
        self.multis
            .get(id)
            .map(|m| m.value().clone())
            .ok_or_else(|| Error::UnknownMerger { id: id.to_string() })
    }

    pub fn has_single(&self, id: &str) -> bool {
        self.singles.contains_key(id)
    }

    pub fn has_multi(&self, id: &str) -> bool {
        self.multis.contains_key(id)
    }

    /// Inject `accessor` into every accessor-aware merger registered so far or later
    pub fn attach_accessor(&self, accessor: Arc<PropertyAccessor>) {
        if let Err(rejected) = self.accessor.set(accessor) {
            if let Some(current) = self.accessor.get() {
                if !Arc::ptr_eq(current, &rejected) {
                    tracing::warn!("instance registry already serves another binder's accessor; keeping the first");
                }
            }
            return;
        }
        let Some(accessor) = self.accessor.get() else {
            return;
        };
        let waiting = std::mem::take(&mut *self.awaiting_accessor.lock());
        for merger in waiting {
            merger.set_property_accessor(accessor.clone());
        }
    }

    fn insert_single<M>(&self, id: impl Into<String>, merger: Arc<M>)
    where
        M: SinglePropertyValueMerger + 'static,
    {
        self.singles.insert(id.into(), merger);
    }

    fn insert_multi<M>(&self, id: impl Into<String>, merger: Arc<M>)
    where
        M: MultiPropertyValueMerger + 'static,
    {
        self.multis.insert(id.into(), merger);
    }

    fn insert_aware_single<M>(&self, id: impl Into<String>, merger: Arc<M>)
    where
        M: SinglePropertyValueMerger + PropertyAccessorAware + 'static,
    {
        self.inject_or_defer(merger.clone());
        self.insert_single(id, merger);
    }

    fn inject_or_defer(&self, merger: Arc<dyn PropertyAccessorAware>) {
        let mut waiting = self.awaiting_accessor.lock();
        match self.accessor.get() {
            Some(accessor) => merger.set_property_accessor(accessor.clone()),
            None => waiting.push(merger),
        }
    }
}

impl fmt::Debug for InstanceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut singles: Vec<_> = self.singles.iter().map(|e| e.key().clone()).collect();
        let mut multis: Vec<_> = self.multis.iter().map(|e| e.key().clone()).collect();
        singles.sort();
        multis.sort();
        f.debug_struct("InstanceRegistry")
            .field("singles", &singles)
            .field("multis", &multis)
            .field("named", &self.named.len())
            .field("accessor_attached", &self.accessor.get().is_some())
            .finish()
    }
}
