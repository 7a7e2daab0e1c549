//! Forward binding: sources to DTO

use super::{Binder, BindingContext, CacheKey};
use crate::conversion::coerce;
use crate::metadata::{BeanLayout, BeanMetadata, CascadeMetadata, FieldMetadata, SourceBinding};
use crate::types::{CascadeType, ConstructorDescriptor, PropertyType};
use crate::value::{CollectionKind, ObjectRef, Value};
use crate::{Error, Result};
use std::collections::HashSet;

impl Binder {
    pub(crate) fn bind_in(
        &self,
        context: &mut BindingContext,
        dto_type: &str,
        sources: &[Value],
    ) -> Result<Value> {
        if sources.iter().all(Value::is_null) {
            return Ok(Value::Null);
        }
        let metadata = self.metadata(dto_type)?;
        let key = CacheKey::new(dto_type, sources);
        if let Some(target) = context.cached(&key) {
            tracing::trace!(dto_type, "source already bound in this call, reusing target");
            return Ok(target);
        }

        match &metadata.layout {
            BeanLayout::Mutable { fields } => {
                let target = Value::Object(self.instantiate_dto(&metadata)?);
                // Registered before population so cycles resolve to this instance.
                context.register(key, target.clone());
                for field in fields.iter().filter(|f| !f.field_transient) {
                    let value = self.field_value(context, &metadata, field, sources)?;
                    let value = coerce(value, &field.target_type, &self.types, false);
                    self.accessor.write(&field.name, value, &target);
                }
                Ok(target)
            }
            BeanLayout::Immutable {
                constructor_args,
                constructor,
            } => {
                if !context.begin_construction(&key) {
                    return Err(Error::Binding {
                        message: format!(
                            "cyclic reference through immutable type {} cannot be resolved",
                            dto_type
                        ),
                    });
                }
                let outcome =
                    self.construct(context, &metadata, constructor_args, constructor, sources);
                context.end_construction(&key);
                let target = Value::Object(outcome?);
                context.register(key, target.clone());
                Ok(target)
            }
        }
    }

    /// Bind parallel lists; `kind` overrides the result kind taken from the first list
    pub(crate) fn bind_parallel(
        &self,
        context: &mut BindingContext,
        dto_type: &str,
        lists: &[Value],
        kind: Option<CollectionKind>,
    ) -> Result<Value> {
        let Some(first) = lists.iter().find(|l| !l.is_null()) else {
            return Ok(Value::Null);
        };
        let size = items_of(first)?.len();
        let columns = lists
            .iter()
            .map(|list| {
                if list.is_null() {
                    return Ok(None);
                }
                let items = items_of(list)?;
                if items.len() != size {
                    return Err(Error::Binding {
                        message: format!(
                            "parallel source lists differ in length ({} and {})",
                            size,
                            items.len()
                        ),
                    });
                }
                Ok(Some(items))
            })
            .collect::<Result<Vec<_>>>()?;

        let kind = match kind {
            Some(kind) => kind,
            None => {
                let original = first.collection_kind().unwrap_or(CollectionKind::List);
                if !original.is_instantiable() {
                    tracing::debug!(kind = ?original, "source collection kind is read-only, using its generic kind");
                }
                original.instantiable_or_generic()
            }
        };

        let mut bound = Vec::with_capacity(size);
        for i in 0..size {
            let row: Vec<Value> = columns
                .iter()
                .map(|column| column.map(|items| items[i].clone()).unwrap_or_default())
                .collect();
            bound.push(self.bind_in(context, dto_type, &row)?);
        }
        Ok(collect(kind, bound))
    }

    fn instantiate_dto(&self, metadata: &BeanMetadata) -> Result<ObjectRef> {
        if self.types.contains(&metadata.type_name) {
            return self.types.instantiate(&metadata.type_name);
        }
        // Types known only from an XML mapping start with their fields at initial values.
        let instance = ObjectRef::new(metadata.type_name.clone());
        for field in metadata.fields() {
            instance.set(field.name.clone(), field.target_type.initial_value());
        }
        Ok(instance)
    }

    fn construct(
        &self,
        context: &mut BindingContext,
        metadata: &BeanMetadata,
        args: &[FieldMetadata],
        constructor: &ConstructorDescriptor,
        sources: &[Value],
    ) -> Result<ObjectRef> {
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            let value = if arg.field_transient {
                Value::Null
            } else {
                self.field_value(context, metadata, arg, sources)?
            };
            values.push(coerce(value, &arg.target_type, &self.types, true));
        }
        self.types.construct(&metadata.type_name, constructor, values)
    }

    fn field_value(
        &self,
        context: &mut BindingContext,
        metadata: &BeanMetadata,
        field: &FieldMetadata,
        sources: &[Value],
    ) -> Result<Value> {
        let values = field
            .sources
            .iter()
            .map(|source| self.source_value(metadata, field, source, sources))
            .collect::<Result<Vec<_>>>()?;

        match &field.cascade {
            Some(cascade) => self.cascade(context, field, cascade, &values),
            None => {
                let merger = self.registry.multi(&field.property_value_merger)?;
                merger
                    .merge(&values, &field.merger_params)
                    .map_err(|source| merger_error(&field.property_value_merger, field, source))
            }
        }
    }

    /// Read one source path from its bean and apply the source's merger
    fn source_value(
        &self,
        metadata: &BeanMetadata,
        field: &FieldMetadata,
        source: &SourceBinding,
        sources: &[Value],
    ) -> Result<Value> {
        let position = match &source.bean {
            Some(bean) => metadata.bean_position(bean).ok_or_else(|| {
                Error::configuration_for(
                    metadata.type_name.as_str(),
                    format!("field '{}' reads from unknown source bean '{}'", field.name, bean),
                )
            })?,
            None => 0,
        };
        let bean = sources.get(position).cloned().unwrap_or_default();
        let raw = if source.is_root() {
            bean
        } else {
            self.accessor.read(&source.path, &bean)
        };

        let merger = self.registry.single(&source.merger)?;
        merger
            .merge(&raw, &source.merger_params)
            .map_err(|err| merger_error(&source.merger, field, err))
    }

    fn cascade(
        &self,
        context: &mut BindingContext,
        field: &FieldMetadata,
        cascade: &CascadeMetadata,
        values: &[Value],
    ) -> Result<Value> {
        let target_type = cascade.target_type.as_deref().ok_or_else(|| {
            Error::configuration(format!(
                "cascaded field '{}' has no resolvable target type",
                field.name
            ))
        })?;
        match cascade.cascade_type {
            CascadeType::Single => self.bind_in(context, target_type, values),
            CascadeType::Array => {
                self.bind_parallel(context, target_type, values, Some(CollectionKind::Array))
            }
            CascadeType::Collection => {
                let kind = match &field.target_type {
                    PropertyType::Collection(kind, _) => kind.instantiable_or_generic(),
                    _ => CollectionKind::List,
                };
                self.bind_parallel(context, target_type, values, Some(kind))
            }
        }
    }
}

fn items_of(value: &Value) -> Result<&[Value]> {
    value
        .items()
        .ok_or_else(|| Error::type_mismatch("collection", value.type_label()))
}

/// Assemble bound elements into a collection; sets drop repeated targets
fn collect(kind: CollectionKind, items: Vec<Value>) -> Value {
    if kind.is_set() {
        let mut seen = HashSet::new();
        let items = items
            .into_iter()
            .filter(|item| seen.insert(item.identity_key()))
            .collect();
        return Value::Collection(kind, items);
    }
    Value::Collection(kind, items)
}

pub(super) fn merger_error(merger: &str, field: &FieldMetadata, source: Error) -> Error {
    Error::MergerExecution {
        merger: merger.to_string(),
        field: field.name.clone(),
        source: Box::new(source),
    }
}
