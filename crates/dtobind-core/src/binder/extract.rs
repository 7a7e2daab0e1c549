//! Reverse binding: DTO back to a business object
//!
//! Only plain single-source fields are written back. Compound, cascaded,
//! transient and root-object fields are skipped, as are fields whose merger
//! cannot reverse its transform.

use super::delegate::merger_error;
use super::Binder;
use crate::conversion::coerce;
use crate::merger::ids;
use crate::metadata::{FieldMetadata, SourceBinding};
use crate::value::{ObjectRef, Value};
use crate::{Error, Result};

impl Binder {
    /// Build a `business_type` instance from a bound DTO; a null DTO gives null
    pub fn extract(&self, business_type: &str, dto: &Value) -> Result<Value> {
        let object = match dto {
            Value::Null => return Ok(Value::Null),
            Value::Object(object) => object,
            other => return Err(Error::type_mismatch("DTO object", other.type_label())),
        };
        let metadata = self.metadata(object.type_name())?;
        let business = Value::Object(self.instantiate_business(business_type)?);

        for field in metadata.fields().iter().filter(|f| f.is_extractable()) {
            let source = &field.sources[0];
            // Only the first source bean is rebuilt.
            if let Some(bean) = &source.bean {
                if metadata.bean_position(bean) != Some(0) {
                    tracing::trace!(field = %field.name, bean = %bean, "field reads a secondary bean, skipped");
                    continue;
                }
            }
            let value = self.accessor.read(&field.name, dto);
            let Some(value) = self.restore(field, source, value)? else {
                continue;
            };
            let value = match self.types.find_property(business_type, &source.path) {
                Some((_, property)) => coerce(value, property.property_type(), &self.types, false),
                None => value,
            };
            self.accessor.write(&source.path, value, &business);
        }
        Ok(business)
    }

    fn restore(
        &self,
        field: &FieldMetadata,
        source: &SourceBinding,
        value: Value,
    ) -> Result<Option<Value>> {
        if source.merger == ids::IDENTITY {
            return Ok(Some(value));
        }
        let merger = self.registry.single(&source.merger)?;
        if !merger.is_restore_supported(&source.merger_params) {
            tracing::trace!(field = %field.name, merger = %source.merger, "merger is not reversible, field skipped");
            return Ok(None);
        }
        merger
            .restore(&value, &source.merger_params)
            .map(Some)
            .map_err(|err| merger_error(&source.merger, field, err))
    }

    fn instantiate_business(&self, business_type: &str) -> Result<ObjectRef> {
        if self.types.contains(business_type) {
            self.types.instantiate(business_type)
        } else {
            Ok(ObjectRef::new(business_type))
        }
    }
}
