//! Structural verification shared by both compilation paths.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::model::{
    Instruction, MethodBody, MethodDefinition, PropertyDefinition, TypeDefinition, TypeRef,
    getter_name, setter_name,
};

use super::diagnostics::{Diagnostic, codes};
use super::references::{ModuleExports, ReferenceSet, RuntimeModule};

/// Checks a set of types against each other and their references.
pub struct Verifier<'a> {
    types: &'a [TypeDefinition],
    local: FxHashMap<&'a str, &'a TypeDefinition>,
    external: FxHashMap<&'a str, &'a TypeDefinition>,
    references: &'a ReferenceSet,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Verifier<'a> {
    pub fn new(
        types: &'a [TypeDefinition],
        exports: &'a [ModuleExports],
        references: &'a ReferenceSet,
    ) -> Self {
        let mut external = FxHashMap::default();
        for module in exports {
            for def in &module.types {
                external.entry(def.name.as_str()).or_insert(def);
            }
        }
        Self {
            types,
            local: FxHashMap::default(),
            external,
            references,
            diagnostics: Vec::new(),
        }
    }

    /// Run every check and return the diagnostics in discovery order.
    pub fn verify(mut self) -> Vec<Diagnostic> {
        if self.types.is_empty() {
            self.diagnostics
                .push(Diagnostic::error(codes::EMPTY_MODULE, "module declares no types"));
            return self.diagnostics;
        }

        for def in self.types {
            if self.local.insert(def.name.as_str(), def).is_some() {
                self.diagnostics.push(
                    Diagnostic::error(
                        codes::DUPLICATE_TYPE,
                        format!("type `{}` is declared more than once", def.name),
                    )
                    .on_type(&def.name),
                );
            }
        }

        for def in self.types {
            self.verify_type(def);
        }
        self.diagnostics
    }

    fn lookup(&self, name: &str) -> Option<&'a TypeDefinition> {
        self.local
            .get(name)
            .or_else(|| self.external.get(name))
            .copied()
    }

    fn report(&mut self, def: &TypeDefinition, id: &str, message: String) {
        self.diagnostics
            .push(Diagnostic::error(id, message).on_type(&def.name));
    }

    fn verify_type(&mut self, def: &TypeDefinition) {
        self.check_duplicates(def);

        if let Some(base) = &def.base_type
            && self.lookup(base).is_none()
        {
            self.report(def, codes::UNKNOWN_TYPE, format!("base type `{base}` cannot be resolved"));
        }

        for field in &def.fields {
            self.check_type_ref(def, &field.ty, &format!("field `{}`", field.name));
        }
        for event in &def.events {
            self.check_type_ref(def, &event.handler, &format!("event `{}`", event.name));
        }
        for method in &def.methods {
            self.check_type_ref(def, &method.return_type, &format!("method `{}`", method.name));
            for param in &method.parameters {
                self.check_type_ref(
                    def,
                    &param.ty,
                    &format!("parameter `{}` of `{}`", param.name, method.name),
                );
            }
            if method.is_async && !self.references.has_runtime(RuntimeModule::Tasks) {
                self.report(
                    def,
                    codes::UNKNOWN_TYPE,
                    format!(
                        "async method `{}` requires a reference to {}",
                        method.name,
                        RuntimeModule::Tasks.name()
                    ),
                );
            }
        }

        if def.is_interface() {
            return;
        }

        if def.properties.is_empty() {
            self.diagnostics.push(
                Diagnostic::warning(
                    codes::NO_PROPERTIES,
                    format!("type `{}` declares no properties", def.name),
                )
                .on_type(&def.name),
            );
        }

        for prop in &def.properties {
            self.check_type_ref(def, &prop.ty, &format!("property `{}`", prop.name));
            self.check_property(def, prop);
        }
        for method in &def.methods {
            self.check_method(def, method);
        }
        self.check_interfaces(def);
        self.check_view_model(def);
    }

    fn check_duplicates(&mut self, def: &TypeDefinition) {
        let groups: [(&str, Vec<&str>); 3] = [
            ("field", def.fields.iter().map(|f| f.name.as_str()).collect()),
            ("property", def.properties.iter().map(|p| p.name.as_str()).collect()),
            ("method", def.methods.iter().map(|m| m.name.as_str()).collect()),
        ];
        for (kind, names) in groups {
            let mut seen = FxHashSet::default();
            for name in names {
                if !seen.insert(name) {
                    self.report(
                        def,
                        codes::DUPLICATE_MEMBER,
                        format!("{kind} `{name}` is declared more than once"),
                    );
                }
            }
        }

        let mut kinds = FxHashSet::default();
        for ctor in &def.constructors {
            if !kinds.insert(ctor.kind) {
                self.report(
                    def,
                    codes::DUPLICATE_MEMBER,
                    format!("constructor `{}` is declared more than once", ctor.kind.rust_name()),
                );
            }
        }
    }

    fn check_type_ref(&mut self, def: &TypeDefinition, ty: &TypeRef, what: &str) {
        if matches!(ty, TypeRef::List(_)) && !self.references.has_runtime(RuntimeModule::Collections)
        {
            self.report(
                def,
                codes::UNKNOWN_TYPE,
                format!(
                    "{what} uses a list type but {} is not referenced",
                    RuntimeModule::Collections.name()
                ),
            );
        }
        for name in ty.named_types() {
            if name != def.name && self.lookup(name).is_none() {
                self.report(
                    def,
                    codes::UNKNOWN_TYPE,
                    format!("{what} refers to unknown type `{name}`"),
                );
            }
        }
    }

    fn check_property(&mut self, def: &TypeDefinition, prop: &PropertyDefinition) {
        if prop.setter.is_some() && prop.getter.is_none() {
            self.report(
                def,
                codes::SETTER_WITHOUT_GETTER,
                format!("property `{}` has a setter but no getter", prop.name),
            );
        }

        if let Some(getter) = &prop.getter {
            if *getter != getter_name(&prop.name) {
                self.report(
                    def,
                    codes::ACCESSOR_NAMING,
                    format!("getter of `{}` must be named `{}`", prop.name, getter_name(&prop.name)),
                );
            }
            match def.method(getter) {
                None => self.report(
                    def,
                    codes::MISSING_ACCESSOR,
                    format!("getter `{getter}` of `{}` is not declared", prop.name),
                ),
                Some(m) if !m.parameters.is_empty() || m.return_type != prop.ty => self.report(
                    def,
                    codes::ACCESSOR_TYPE_MISMATCH,
                    format!("getter `{getter}` must take no arguments and return {}", prop.ty),
                ),
                Some(_) => {}
            }
        }

        if let Some(setter) = &prop.setter {
            if *setter != setter_name(&prop.name) {
                self.report(
                    def,
                    codes::ACCESSOR_NAMING,
                    format!("setter of `{}` must be named `{}`", prop.name, setter_name(&prop.name)),
                );
            }
            match def.method(setter) {
                None => self.report(
                    def,
                    codes::MISSING_ACCESSOR,
                    format!("setter `{setter}` of `{}` is not declared", prop.name),
                ),
                Some(m)
                    if m.parameters.len() != 1
                        || m.parameters[0].ty != prop.ty
                        || m.return_type != TypeRef::Void =>
                {
                    self.report(
                        def,
                        codes::ACCESSOR_TYPE_MISMATCH,
                        format!("setter `{setter}` must take one {} and return void", prop.ty),
                    )
                }
                Some(_) => {}
            }
        }
    }

    fn check_method(&mut self, def: &TypeDefinition, method: &MethodDefinition) {
        match &method.body {
            MethodBody::Instructions(body) => {
                for instr in body {
                    match instr {
                        Instruction::LoadField(field) | Instruction::StoreField(field)
                            if def.field(field).is_none() =>
                        {
                            self.report(
                                def,
                                codes::UNKNOWN_FIELD,
                                format!("`{}` accesses unknown field `{field}`", method.name),
                            );
                        }
                        Instruction::LoadArg(index)
                            if *index as usize >= method.parameters.len() =>
                        {
                            self.report(
                                def,
                                codes::ARG_OUT_OF_RANGE,
                                format!(
                                    "`{}` loads argument {index} but declares {}",
                                    method.name,
                                    method.parameters.len()
                                ),
                            );
                        }
                        Instruction::NewObject { type_name, .. }
                            if *type_name != def.name && self.lookup(type_name).is_none() =>
                        {
                            self.report(
                                def,
                                codes::UNKNOWN_TYPE,
                                format!("`{}` creates unknown type `{type_name}`", method.name),
                            );
                        }
                        _ => {}
                    }
                }
            }
            MethodBody::Intrinsic(member) if def.view_model.is_none() => self.report(
                def,
                codes::MISSING_CAPABILITY_MEMBER,
                format!("contract member `{}` requires view-model metadata", member.name()),
            ),
            MethodBody::Intrinsic(_) => {}
            MethodBody::Abstract => self.report(
                def,
                codes::MISSING_CAPABILITY_MEMBER,
                format!("method `{}` of a class has no body", method.name),
            ),
        }
    }

    fn check_interfaces(&mut self, def: &TypeDefinition) {
        for name in &def.interfaces {
            let Some(interface) = self.lookup(name).filter(|i| i.is_interface()) else {
                self.report(
                    def,
                    codes::UNKNOWN_INTERFACE,
                    format!("interface `{name}` cannot be resolved"),
                );
                continue;
            };

            for required in &interface.properties {
                match def.property(&required.name) {
                    Some(prop) if prop.ty == required.ty => {}
                    _ => self.report(
                        def,
                        codes::MISSING_CAPABILITY_MEMBER,
                        format!(
                            "`{name}` requires property `{}: {}`",
                            required.name, required.ty
                        ),
                    ),
                }
            }
            for required in &interface.methods {
                match def.method(&required.name) {
                    Some(m) if m.parameters.len() == required.parameters.len() => {}
                    _ => self.report(
                        def,
                        codes::MISSING_CAPABILITY_MEMBER,
                        format!(
                            "`{name}` requires method `{}` with {} parameter(s)",
                            required.name,
                            required.parameters.len()
                        ),
                    ),
                }
            }
        }
    }

    fn check_view_model(&mut self, def: &TypeDefinition) {
        let Some(info) = &def.view_model else {
            return;
        };

        for field in [&info.list_field, &info.context_field] {
            if def.field(field).is_none() {
                self.report(
                    def,
                    codes::VIEW_MODEL_FIELD_MISSING,
                    format!("view-model field `{field}` is not declared"),
                );
            }
        }
        for prop in info.capability_properties.iter().chain(&info.schema_properties) {
            if def.property(prop).is_none() {
                self.report(
                    def,
                    codes::VIEW_MODEL_FIELD_MISSING,
                    format!("view-model property `{prop}` is not declared"),
                );
            }
        }
        if self.lookup(&info.model_type).is_none() {
            self.report(
                def,
                codes::UNKNOWN_TYPE,
                format!("model type `{}` cannot be resolved", info.model_type),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{CapabilityRegistry, EXTENDED_PROPERTIES, VIEW_MODEL_INTERFACE};
    use crate::compile::references::ModuleReference;
    use crate::model::{FieldDefinition, PrimitiveKind};
    use crate::schema::{SchemaColumn, SchemaTranslator};
    use crate::synth::TypeLayout;

    fn resolve(references: &ReferenceSet) -> Vec<ModuleExports> {
        references.iter().map(|r| r.resolve().unwrap()).collect()
    }

    fn ids(diagnostics: &[Diagnostic]) -> Vec<&str> {
        diagnostics.iter().map(|d| d.id.as_str()).collect()
    }

    fn employee_types() -> Vec<TypeDefinition> {
        let registry = CapabilityRegistry::standard();
        let schema = SchemaTranslator::new(&registry)
            .translate(
                &[
                    SchemaColumn::new("Id", PrimitiveKind::Int32),
                    SchemaColumn::new("Name", PrimitiveKind::String),
                ],
                &[EXTENDED_PROPERTIES],
            )
            .unwrap();
        vec![
            TypeLayout::model("Employee", None, &schema).unwrap(),
            TypeLayout::view_model("EmployeeVM", "Employee", None, &schema).unwrap(),
        ]
    }

    #[test]
    fn test_layout_output_verifies_clean() {
        let refs = ReferenceSet::baseline().with_capabilities();
        let exports = resolve(&refs);
        let types = employee_types();
        let diagnostics = Verifier::new(&types, &exports, &refs).verify();
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
    }

    #[test]
    fn test_missing_capability_module() {
        let refs = ReferenceSet::baseline();
        let exports = resolve(&refs);
        let types = employee_types();
        let diagnostics = Verifier::new(&types, &exports, &refs).verify();
        assert!(ids(&diagnostics).contains(&codes::UNKNOWN_INTERFACE));
    }

    #[test]
    fn test_missing_contract_member() {
        let refs = ReferenceSet::baseline().with_capabilities();
        let exports = resolve(&refs);
        let mut types = employee_types();
        types[1].methods.retain(|m| m.name != "UpdateList");

        let diagnostics = Verifier::new(&types, &exports, &refs).verify();
        let missing: Vec<_> = diagnostics
            .iter()
            .filter(|d| d.id == codes::MISSING_CAPABILITY_MEMBER)
            .collect();
        assert_eq!(missing.len(), 1);
        assert!(missing[0].message.contains(VIEW_MODEL_INTERFACE));
        assert!(missing[0].message.contains("UpdateList"));
    }

    #[test]
    fn test_property_invariants() {
        let refs = ReferenceSet::baseline();
        let exports = resolve(&refs);
        let mut types = employee_types();
        types.truncate(1);
        let model = &mut types[0];
        model.properties[0].getter = None;
        model.properties[1].ty = TypeRef::Primitive(PrimitiveKind::Int64);

        let diagnostics = Verifier::new(&types, &exports, &refs).verify();
        let ids = ids(&diagnostics);
        assert!(ids.contains(&codes::SETTER_WITHOUT_GETTER));
        assert!(ids.contains(&codes::ACCESSOR_TYPE_MISMATCH));
    }

    #[test]
    fn test_unknown_field_and_duplicate_type() {
        let refs = ReferenceSet::baseline();
        let exports = resolve(&refs);
        let mut types = employee_types();
        types.truncate(1);
        types[0].fields.retain(|f| f.name != "_Name");
        types.push(TypeDefinition::class("Employee"));

        let diagnostics = Verifier::new(&types, &exports, &refs).verify();
        let ids = ids(&diagnostics);
        assert!(ids.contains(&codes::UNKNOWN_FIELD));
        assert!(ids.contains(&codes::DUPLICATE_TYPE));
        assert!(ids.contains(&codes::NO_PROPERTIES));
    }

    #[test]
    fn test_list_requires_collections() {
        let mut refs = ReferenceSet::new();
        refs.add(ModuleReference::Runtime(RuntimeModule::Core));
        let exports = resolve(&refs);
        let mut def = TypeDefinition::class("Bag");
        def.fields.push(FieldDefinition::new(
            "_items",
            TypeRef::list_of(TypeRef::Primitive(PrimitiveKind::Int32)),
        ));
        let types = vec![def];

        let diagnostics = Verifier::new(&types, &exports, &refs).verify();
        assert!(diagnostics.iter().any(|d| d.message.contains("Typeforge.Collections")));
    }

    #[test]
    fn test_empty_module() {
        let refs = ReferenceSet::baseline();
        let diagnostics = Verifier::new(&[], &[], &refs).verify();
        assert_eq!(ids(&diagnostics), vec![codes::EMPTY_MODULE]);
    }
}
