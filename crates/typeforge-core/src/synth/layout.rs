//! Model and view-model layouts.
//!
//! Both layouts go through the metadata emitter for their data members, so
//! there is exactly one place that decides field, property and accessor
//! shape. The view-model adds the capability contract on top.

use crate::capability::{
    ContractMember, EXTENDED_PROPERTIES, PROPERTY_CHANGED_EVENT, VIEW_MODEL_INTERFACE,
};
use crate::error::{Error, Result};
use crate::model::{
    ConstructorDefinition, ConstructorKind, EventDefinition, ParameterDefinition, PrimitiveKind,
    TypeDefinition, TypeRef, ViewModelInfo, backing_field_name,
};
use crate::schema::{CONTEXT_FIELD, MemberOrigin, TranslatedSchema, list_field_name};

use super::metadata::{FieldDescriptor, MetadataEmitter, TypeDescriptor};

/// Handler type of view-model events, exported by the core runtime module.
pub const EVENT_HANDLER_TYPE: &str = "EventHandler";

pub struct TypeLayout;

impl TypeLayout {
    /// A plain data holder over the schema columns. Capability members are
    /// left out.
    pub fn model(
        name: &str,
        namespace: Option<&str>,
        schema: &TranslatedSchema,
    ) -> Result<TypeDefinition> {
        let desc = TypeDescriptor::data_holder(name, &schema.without_capabilities())
            .namespace(namespace.map(str::to_string));
        MetadataEmitter::new().emit(&desc)
    }

    /// The view-model `name` over `model`.
    ///
    /// `schema` must carry the [`EXTENDED_PROPERTIES`] members.
    pub fn view_model(
        name: &str,
        model: &str,
        namespace: Option<&str>,
        schema: &TranslatedSchema,
    ) -> Result<TypeDefinition> {
        let mut interfaces: Vec<String> = Vec::new();
        for member in schema.capability_members() {
            if let MemberOrigin::Capability(interface) = &member.origin
                && !interfaces.contains(interface)
            {
                interfaces.push(interface.clone());
            }
        }
        if !interfaces.iter().any(|i| i == EXTENDED_PROPERTIES) {
            return Err(Error::schema(
                name,
                format!("view-model schema must include `{EXTENDED_PROPERTIES}`"),
            ));
        }
        interfaces.push(VIEW_MODEL_INTERFACE.to_string());

        let list_field = list_field_name(model);
        let own = TypeRef::named(name);
        let mut desc = TypeDescriptor::data_holder(name, schema)
            .namespace(namespace.map(str::to_string));
        for internal in [CONTEXT_FIELD, list_field.as_str()] {
            if let Some(member) = schema
                .members
                .iter()
                .find(|m| backing_field_name(m.name()) == internal)
            {
                return Err(Error::schema(
                    member.name(),
                    format!("backing field `{internal}` is reserved by view-model `{name}`"),
                ));
            }
        }
        desc.fields.splice(
            0..0,
            [
                FieldDescriptor::new(CONTEXT_FIELD, TypeRef::Primitive(PrimitiveKind::Object)),
                FieldDescriptor::new(list_field.clone(), TypeRef::list_of(own.clone())),
            ],
        );
        desc.constructors = view_model_constructors(name, model);

        let mut def = MetadataEmitter::new().emit(&desc)?;
        def.interfaces = interfaces;
        def.methods
            .extend(ContractMember::ALL.into_iter().map(|m| m.method(name, model)));
        def.events.push(EventDefinition {
            name: PROPERTY_CHANGED_EVENT.to_string(),
            handler: TypeRef::named(EVENT_HANDLER_TYPE),
        });
        def.view_model = Some(ViewModelInfo {
            model_type: model.to_string(),
            list_field,
            context_field: CONTEXT_FIELD.to_string(),
            capability_properties: schema
                .capability_members()
                .map(|m| m.name().to_string())
                .collect(),
            schema_properties: schema.schema_members().map(|m| m.name().to_string()).collect(),
        });

        tracing::debug!("Laid out view-model {} over {}", def.full_name(), model);
        Ok(def)
    }
}

/// The four view-model constructor shapes, in declaration order.
pub fn view_model_constructors(own: &str, model: &str) -> Vec<ConstructorDefinition> {
    let context = || ParameterDefinition::new("context", TypeRef::Primitive(PrimitiveKind::Object));
    vec![
        ConstructorDefinition {
            kind: ConstructorKind::Default,
            parameters: Vec::new(),
        },
        ConstructorDefinition {
            kind: ConstructorKind::Context,
            parameters: vec![context()],
        },
        ConstructorDefinition {
            kind: ConstructorKind::ContextAndSource,
            parameters: vec![context(), ParameterDefinition::new("source", TypeRef::named(model))],
        },
        ConstructorDefinition {
            kind: ConstructorKind::Copy,
            parameters: vec![ParameterDefinition::new("other", TypeRef::named(own))],
        },
    ]
}
