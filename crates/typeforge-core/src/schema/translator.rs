//! Schema translation: columns (and capability properties) to member pairs.

use rustc_hash::FxHashSet;

use crate::capability::CapabilityRegistry;
use crate::error::Result;
use crate::model::{FieldDefinition, PropertyDefinition, TypeRef, backing_field_name};

use super::SchemaColumn;
use super::naming::validate_identifier;

/// Where a translated member came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberOrigin {
    /// Declared by the named capability interface.
    Capability(String),
    /// Declared by a schema column.
    Schema,
}

/// A backing field plus the property exposing it.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslatedMember {
    pub origin: MemberOrigin,
    pub field: FieldDefinition,
    pub property: PropertyDefinition,
}

impl TranslatedMember {
    fn new(name: &str, ty: TypeRef, origin: MemberOrigin) -> Self {
        Self {
            field: FieldDefinition::new(backing_field_name(name), ty.clone()),
            property: PropertyDefinition::read_write(name, ty),
            origin,
        }
    }

    pub fn name(&self) -> &str {
        &self.property.name
    }

    pub fn is_capability(&self) -> bool {
        matches!(self.origin, MemberOrigin::Capability(_))
    }
}

/// Ordered output of [`SchemaTranslator::translate`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TranslatedSchema {
    pub members: Vec<TranslatedMember>,
}

impl TranslatedSchema {
    pub fn property_names(&self) -> Vec<String> {
        self.members.iter().map(|m| m.name().to_string()).collect()
    }

    pub fn capability_members(&self) -> impl Iterator<Item = &TranslatedMember> {
        self.members.iter().filter(|m| m.is_capability())
    }

    pub fn schema_members(&self) -> impl Iterator<Item = &TranslatedMember> {
        self.members.iter().filter(|m| !m.is_capability())
    }

    /// The same schema without capability-contributed members.
    pub fn without_capabilities(&self) -> Self {
        Self {
            members: self.schema_members().cloned().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }
}

/// Maps columns and capability interfaces to canonical member pairs.
pub struct SchemaTranslator<'a> {
    registry: &'a CapabilityRegistry,
}

impl<'a> SchemaTranslator<'a> {
    pub fn new(registry: &'a CapabilityRegistry) -> Self {
        Self { registry }
    }

    /// Translate `columns`, merged after the properties of `capabilities`.
    ///
    /// Capability properties come first, in interface order. A name already
    /// supplied earlier is skipped, so the first occurrence wins.
    pub fn translate<S: AsRef<str>>(
        &self,
        columns: &[SchemaColumn],
        capabilities: &[S],
    ) -> Result<TranslatedSchema> {
        for column in columns {
            validate_identifier(&column.name)?;
        }

        let mut seen = FxHashSet::default();
        let mut members = Vec::with_capacity(columns.len());

        for capability in capabilities {
            let capability = capability.as_ref();
            for (name, ty) in self.registry.properties_of(capability)? {
                if seen.insert(name.clone()) {
                    members.push(TranslatedMember::new(
                        &name,
                        ty,
                        MemberOrigin::Capability(capability.to_string()),
                    ));
                }
            }
        }

        for column in columns {
            if !seen.insert(column.name.clone()) {
                tracing::debug!("Skipping duplicate member `{}`", column.name);
                continue;
            }
            members.push(TranslatedMember::new(
                &column.name,
                TypeRef::Primitive(column.kind),
                MemberOrigin::Schema,
            ));
        }

        tracing::debug!("Translated schema into {} member(s)", members.len());
        Ok(TranslatedSchema { members })
    }
}
