//! Field mapping descriptors.
//!
//! A descriptor lists, for one record type, which field is stored under which
//! map key and as which CRDT kind. Descriptors are built from the record's
//! static [`FieldSpec`] table and never change afterwards.
//!
//! # Field tags
//!
//! A field may carry a tag of the form `"key,kind"`:
//!
//! | Tag | Meaning |
//! |-----|---------|
//! | `"email,"` | store under `email`, kind derived from the field type |
//! | `"visits,register"` | store under `visits` as a decimal register |
//!
//! Tags must have exactly two comma-separated components and a non-empty key.

use crate::core::codec::CrdtValue;
use crate::core::error::{MapperError, Result};
use crate::core::mapping::Shape;
use convkv_wire::CrdtKind;
use std::collections::HashMap;

/// Static declaration of one record field.
#[derive(Clone, Debug)]
pub struct FieldSpec {
    pub name: &'static str,
    pub tag: Option<&'static str>,
    pub shape: Shape,
    pub type_name: &'static str,
    /// Validates nested record types reachable through this field.
    pub check: fn() -> Result<()>,
}

impl FieldSpec {
    /// Declare a field of type `T`.
    #[must_use]
    pub fn new<T: CrdtValue>(name: &'static str, tag: Option<&'static str>) -> Self {
        FieldSpec {
            name,
            tag,
            shape: T::shape(),
            type_name: std::any::type_name::<T>(),
            check: T::check,
        }
    }
}

/// One resolved field entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldMapping {
    pub field: &'static str,
    pub storage_key: String,
    pub kind: CrdtKind,
    /// Record type stored under this key, for map-kind record fields.
    pub nested: Option<&'static str>,
    pub optional: bool,
}

/// Immutable per-type mapping table.
#[derive(Clone, Debug)]
pub struct FieldMappingDescriptor {
    type_name: &'static str,
    fields: Vec<FieldMapping>,
    context_field: Option<&'static str>,
    by_key: HashMap<String, usize>,
    nested_checks: Vec<(&'static str, fn() -> Result<()>)>,
}

impl FieldMappingDescriptor {
    /// Resolve the static field table of a record type.
    ///
    /// Fields keep their declaration order. Fails on the first field whose
    /// type cannot be stored or whose tag is malformed. Record types nested
    /// in the fields are not resolved here; see [`check_nested`](Self::check_nested).
    pub fn build(type_name: &'static str, specs: Vec<FieldSpec>) -> Result<Self> {
        let mut fields = Vec::with_capacity(specs.len());
        let mut by_key = HashMap::with_capacity(specs.len());
        let mut context_field = None;
        let mut nested_checks = Vec::with_capacity(specs.len());

        for spec in specs {
            if spec.shape == Shape::Context {
                if let Some(existing) = context_field {
                    return Err(MapperError::malformed(
                        spec.tag.unwrap_or_default(),
                        format!("second context field, {} already holds the context", existing),
                    )
                    .at(spec.name));
                }
                context_field = Some(spec.name);
                continue;
            }

            let mapping = resolve_field(&spec).map_err(|e| e.at(spec.name))?;
            if by_key.contains_key(&mapping.storage_key) {
                return Err(MapperError::malformed(
                    spec.tag.unwrap_or_default(),
                    format!("storage key {:?} is used by another field", mapping.storage_key),
                )
                .at(spec.name));
            }
            by_key.insert(mapping.storage_key.clone(), fields.len());
            fields.push(mapping);
            nested_checks.push((spec.name, spec.check));
        }

        Ok(FieldMappingDescriptor {
            type_name,
            fields,
            context_field,
            by_key,
            nested_checks,
        })
    }

    /// Validate the mappings of record types reachable through the fields.
    ///
    /// Errors carry the path from this record, e.g. `"address.city"`.
    pub fn check_nested(&self) -> Result<()> {
        for (name, check) in &self.nested_checks {
            check().map_err(|e| e.at(name))?;
        }
        Ok(())
    }

    #[inline]
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    #[inline]
    #[must_use]
    pub fn fields(&self) -> &[FieldMapping] {
        &self.fields
    }

    /// Field holding the record's causal context, if it declares one.
    #[inline]
    #[must_use]
    pub fn context_field(&self) -> Option<&'static str> {
        self.context_field
    }

    #[must_use]
    pub fn by_storage_key(&self, key: &str) -> Option<&FieldMapping> {
        self.by_key.get(key).map(|&i| &self.fields[i])
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

fn resolve_field(spec: &FieldSpec) -> Result<FieldMapping> {
    let natural = spec
        .shape
        .natural_kind()
        .ok_or_else(|| MapperError::unsupported(spec.type_name))?;

    let (storage_key, kind) = match spec.tag {
        None => (spec.name.to_string(), natural),
        Some(tag) => parse_tag(tag, &spec.shape, natural)?,
    };

    Ok(FieldMapping {
        field: spec.name,
        storage_key,
        kind,
        nested: spec.shape.nested_record(),
        optional: spec.shape.is_optional(),
    })
}

fn parse_tag(tag: &str, shape: &Shape, natural: CrdtKind) -> Result<(String, CrdtKind)> {
    let parts: Vec<&str> = tag.split(',').collect();
    if parts.len() != 2 {
        return Err(MapperError::malformed(tag, "expected exactly two components"));
    }

    let key = parts[0].trim();
    if key.is_empty() {
        return Err(MapperError::malformed(tag, "empty storage key"));
    }
    if key.contains('.') || key.chars().any(char::is_whitespace) {
        return Err(MapperError::malformed(tag, "storage key must be a single identifier"));
    }

    let kind = match parts[1].trim() {
        "" => natural,
        name => {
            let kind = name
                .parse::<CrdtKind>()
                .map_err(|reason| MapperError::malformed(tag, reason))?;
            if !shape.admits(kind) {
                return Err(MapperError::malformed(
                    tag,
                    format!("kind {} is incompatible with the field type", kind),
                ));
            }
            kind
        }
    };

    Ok((key.to_string(), kind))
}
