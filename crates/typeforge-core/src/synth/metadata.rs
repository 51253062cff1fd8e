//! Metadata-level emission: descriptors straight to a [`TypeDefinition`].
//!
//! No text is produced. Accessor and method bodies are statement text that
//! [`StatementLowering`](super::lowering::StatementLowering) turns into
//! instructions. A single unsupported statement fails the whole type.

use crate::error::Result;
use crate::model::{
    ConstructorDefinition, ConstructorKind, FieldDefinition, Literal, MethodBody,
    MethodDefinition, ParameterDefinition, PropertyDefinition, SETTER_PARAMETER, TypeAttributes,
    TypeDefinition, TypeRef, backing_field_name, getter_name, setter_name,
};
use crate::schema::TranslatedSchema;

use super::lowering::lower_statements;

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub name: String,
    pub ty: TypeRef,
    /// Initializer; the canonical default of `ty` when absent.
    pub default: Option<Literal>,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            ty,
            default: None,
        }
    }

    pub fn with_default(mut self, default: Literal) -> Self {
        self.default = Some(default);
        self
    }
}

/// A property with optional getter and setter statement bodies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyDescriptor {
    pub name: String,
    pub ty: TypeRef,
    pub getter: Option<String>,
    pub setter: Option<String>,
}

impl PropertyDescriptor {
    /// `return _Name;` / `_Name = value;` over the conventional backing field.
    pub fn backed(name: impl Into<String>, ty: TypeRef) -> Self {
        let name = name.into();
        let field = backing_field_name(&name);
        Self {
            getter: Some(format!("return {field};")),
            setter: Some(format!("{field} = {SETTER_PARAMETER};")),
            name,
            ty,
        }
    }

    pub fn read_only(name: impl Into<String>, ty: TypeRef, getter: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty,
            getter: Some(getter.into()),
            setter: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDescriptor {
    pub name: String,
    pub parameters: Vec<ParameterDefinition>,
    pub return_type: TypeRef,
    pub body: String,
}

impl MethodDescriptor {
    pub fn new(name: impl Into<String>, return_type: TypeRef, body: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: Vec::new(),
            return_type,
            body: body.into(),
        }
    }

    pub fn param(mut self, name: impl Into<String>, ty: TypeRef) -> Self {
        self.parameters.push(ParameterDefinition::new(name, ty));
        self
    }
}

/// Everything the emitter needs to build one type.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDescriptor {
    pub name: String,
    pub namespace: Option<String>,
    pub base_type: Option<String>,
    pub attributes: TypeAttributes,
    pub fields: Vec<FieldDescriptor>,
    pub properties: Vec<PropertyDescriptor>,
    pub methods: Vec<MethodDescriptor>,
    pub constructors: Vec<ConstructorDefinition>,
}

impl TypeDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: None,
            base_type: None,
            attributes: TypeAttributes::PUBLIC | TypeAttributes::CLASS,
            fields: Vec::new(),
            properties: Vec::new(),
            methods: Vec::new(),
            constructors: Vec::new(),
        }
    }

    /// One field and one backed property per translated member, plus a
    /// zero-argument constructor.
    pub fn data_holder(name: impl Into<String>, schema: &TranslatedSchema) -> Self {
        let mut desc = Self::new(name);
        for member in &schema.members {
            desc.fields.push(
                FieldDescriptor::new(member.field.name.clone(), member.field.ty.clone())
                    .with_default(member.field.default.clone()),
            );
            desc.properties
                .push(PropertyDescriptor::backed(member.name(), member.property.ty.clone()));
        }
        desc.constructors.push(ConstructorDefinition {
            kind: ConstructorKind::Default,
            parameters: Vec::new(),
        });
        desc
    }

    pub fn namespace(mut self, namespace: Option<String>) -> Self {
        self.namespace = namespace;
        self
    }

    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    pub fn property(mut self, property: PropertyDescriptor) -> Self {
        self.properties.push(property);
        self
    }

    pub fn method(mut self, method: MethodDescriptor) -> Self {
        self.methods.push(method);
        self
    }
}

/// Builds [`TypeDefinition`]s from [`TypeDescriptor`]s.
#[derive(Debug, Default, Clone, Copy)]
pub struct MetadataEmitter;

impl MetadataEmitter {
    pub fn new() -> Self {
        Self
    }

    /// Emit a type. Accessors come first in property order, getter before
    /// setter, followed by the declared methods.
    pub fn emit(&self, desc: &TypeDescriptor) -> Result<TypeDefinition> {
        let mut def = TypeDefinition::class(desc.name.clone());
        def.namespace = desc.namespace.clone();
        def.base_type = desc.base_type.clone();
        def.attributes = desc.attributes;
        def.constructors = desc.constructors.clone();

        def.fields = desc
            .fields
            .iter()
            .map(|f| FieldDefinition {
                name: f.name.clone(),
                ty: f.ty.clone(),
                default: f.default.clone().unwrap_or_else(|| f.ty.default_literal()),
            })
            .collect();

        for prop in &desc.properties {
            let (getter, setter) = self.emit_accessors(prop)?;
            def.properties.push(PropertyDefinition {
                name: prop.name.clone(),
                ty: prop.ty.clone(),
                getter: getter.as_ref().map(|m| m.name.clone()),
                setter: setter.as_ref().map(|m| m.name.clone()),
            });
            def.methods.extend(getter);
            def.methods.extend(setter);
        }

        for method in &desc.methods {
            let body = lower_statements(&method.name, &method.parameters, &method.body)?;
            def.methods.push(MethodDefinition {
                name: method.name.clone(),
                parameters: method.parameters.clone(),
                return_type: method.return_type.clone(),
                is_async: false,
                body: MethodBody::Instructions(body),
            });
        }

        tracing::debug!(
            "Emitted type {} ({} field(s), {} method(s))",
            def.full_name(),
            def.fields.len(),
            def.methods.len()
        );
        Ok(def)
    }

    fn emit_accessors(
        &self,
        prop: &PropertyDescriptor,
    ) -> Result<(Option<MethodDefinition>, Option<MethodDefinition>)> {
        let getter = match &prop.getter {
            Some(body) => {
                let name = getter_name(&prop.name);
                let body = lower_statements(&name, &[], body)?;
                Some(MethodDefinition {
                    name,
                    parameters: Vec::new(),
                    return_type: prop.ty.clone(),
                    is_async: false,
                    body: MethodBody::Instructions(body),
                })
            }
            None => None,
        };

        let setter = match &prop.setter {
            Some(body) => {
                let name = setter_name(&prop.name);
                let parameters = vec![ParameterDefinition::new(SETTER_PARAMETER, prop.ty.clone())];
                let body = lower_statements(&name, &parameters, body)?;
                Some(MethodDefinition {
                    name,
                    parameters,
                    return_type: TypeRef::Void,
                    is_async: false,
                    body: MethodBody::Instructions(body),
                })
            }
            None => None,
        };

        Ok((getter, setter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::CapabilityRegistry;
    use crate::error::Error;
    use crate::model::{Instruction, PrimitiveKind};
    use crate::schema::{SchemaColumn, SchemaTranslator};

    fn int() -> TypeRef {
        TypeRef::Primitive(PrimitiveKind::Int32)
    }

    #[test]
    fn test_data_holder_accessors() {
        let registry = CapabilityRegistry::standard();
        let schema = SchemaTranslator::new(&registry)
            .translate::<&str>(
                &[
                    SchemaColumn::new("Id", PrimitiveKind::Int32),
                    SchemaColumn::new("Name", PrimitiveKind::String),
                ],
                &[],
            )
            .unwrap();

        let def = MetadataEmitter::new()
            .emit(&TypeDescriptor::data_holder("Employee", &schema))
            .unwrap();

        assert_eq!(def.property_names(), vec!["Id", "Name"]);
        assert_eq!(
            def.method_names(),
            vec!["get_Id", "set_Id", "get_Name", "set_Name"]
        );
        assert_eq!(
            def.method("get_Id").unwrap().instructions().unwrap(),
            &[Instruction::LoadField("_Id".into()), Instruction::Return]
        );
        let setter = def.method("set_Name").unwrap();
        assert_eq!(setter.parameters[0].name, "value");
        assert_eq!(setter.return_type, TypeRef::Void);
        assert!(def.constructor(ConstructorKind::Default).is_some());
    }

    #[test]
    fn test_custom_method_and_field_default() {
        let desc = TypeDescriptor::new("Counter")
            .field(FieldDescriptor::new("_Count", int()).with_default(Literal::Int32(10)))
            .property(PropertyDescriptor::read_only("Count", int(), "return _Count;"))
            .method(
                MethodDescriptor::new("Reset", TypeRef::Void, "_Count = start;")
                    .param("start", int()),
            );

        let def = MetadataEmitter::new().emit(&desc).unwrap();
        assert_eq!(def.fields[0].default, Literal::Int32(10));
        assert_eq!(def.properties[0].setter, None);
        assert_eq!(def.method_names(), vec!["get_Count", "Reset"]);
        assert_eq!(
            def.method("Reset").unwrap().instructions().unwrap()[0],
            Instruction::LoadArg(0)
        );
    }

    #[test]
    fn test_unsupported_statement_aborts_emission() {
        let desc = TypeDescriptor::new("Broken")
            .field(FieldDescriptor::new("_A", int()))
            .property(PropertyDescriptor::backed("A", int()))
            .method(MethodDescriptor::new("Spin", TypeRef::Void, "while (true) { }"));

        let err = MetadataEmitter::new().emit(&desc).unwrap_err();
        assert!(matches!(err, Error::UnsupportedStatement { member, .. } if member == "Spin"));
    }
}
