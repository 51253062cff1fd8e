//! Source-level synthesis: type definitions rendered as Rust source.
//!
//! The generated text targets the typeforge runtime prelude and is read back
//! by the driver's source parser, so every construct written here has a
//! parse rule there. Field types, literals and accessor bodies use a small
//! fixed vocabulary:
//!
//! | IR                      | Rust text                        |
//! |-------------------------|----------------------------------|
//! | `LoadField(_X)`         | `self._X.clone()`                |
//! | `StoreField(_X)`        | `self._X = <expr>;`              |
//! | `LoadArg(i)`            | parameter name                   |
//! | `NewObject{T, n}`       | `T::new(a1, .., an)`             |
//! | `Pop`                   | `let _ = <expr>;`                |
//! | `Branch{kind}`          | `branch!(kind);`                 |
//! | `Return`                | tail expression or `return ..;`  |

use chrono::{Datelike, Timelike};

use crate::capability::{ContractMember, IS_EDIT_MODE, IS_NEW, ROW_ID, VIEW_MODEL_INTERFACE};
use crate::error::Result;
use crate::model::{
    ConstructorDefinition, ConstructorKind, Instruction, Literal, MethodBody, MethodDefinition,
    PrimitiveKind, TypeDefinition, TypeRef, ViewModelInfo, min_date,
};
use crate::schema::{TranslatedSchema, view_model_name};

use super::layout::TypeLayout;

/// Attribute carrying type metadata the Rust type system has no slot for.
pub const TYPE_ATTRIBUTE: &str = "typeforge";

/// Macro standing in for a placeholder branch.
pub const BRANCH_MACRO: &str = "branch";

/// Renders [`TypeDefinition`]s as source text.
#[derive(Debug, Clone)]
pub struct SourceSynthesizer {
    /// Emit `///` doc lines on generated items.
    pub doc_comments: bool,
}

impl Default for SourceSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceSynthesizer {
    pub fn new() -> Self {
        Self { doc_comments: true }
    }

    /// Source of a module holding the model type over `schema`.
    pub fn model_source(
        &self,
        module_name: &str,
        base: &str,
        namespace: Option<&str>,
        schema: &TranslatedSchema,
    ) -> Result<String> {
        let model = TypeLayout::model(base, namespace, schema)?;
        Ok(self.render_module(module_name, &[model]))
    }

    /// Source of a module holding the model type and its view-model.
    ///
    /// `schema` must include the extended capability members.
    pub fn view_model_source(
        &self,
        module_name: &str,
        base: &str,
        namespace: Option<&str>,
        schema: &TranslatedSchema,
    ) -> Result<String> {
        let model = TypeLayout::model(base, namespace, schema)?;
        let vm = TypeLayout::view_model(&view_model_name(base), base, namespace, schema)?;
        Ok(self.render_module(module_name, &[model, vm]))
    }

    pub fn render_module(&self, module_name: &str, types: &[TypeDefinition]) -> String {
        let mut code = String::new();
        code.push_str(&format!("//! Module `{module_name}`. Generated by typeforge.\n"));
        code.push_str("#![allow(non_snake_case, dead_code, unused_mut, unused_variables)]\n\n");
        code.push_str("use typeforge_runtime::prelude::*;\n");

        for def in types {
            code.push('\n');
            code.push_str(&self.render_type(def));
        }
        code
    }

    pub fn render_type(&self, def: &TypeDefinition) -> String {
        if def.is_interface() {
            return self.render_interface(def);
        }

        let mut code = String::new();
        code.push_str(&self.render_struct(def));
        code.push('\n');
        code.push_str(&render_default_impl(def));
        code.push('\n');
        code.push_str(&self.render_inherent_impl(def));

        for interface in &def.interfaces {
            code.push('\n');
            if interface == VIEW_MODEL_INTERFACE
                && let Some(info) = &def.view_model
            {
                code.push_str(&render_contract_impl(def, info));
            } else {
                code.push_str(&format!("impl {interface} for {} {{}}\n", def.name));
            }
        }
        code
    }

    fn render_struct(&self, def: &TypeDefinition) -> String {
        let mut code = String::new();
        if self.doc_comments {
            match &def.view_model {
                Some(info) => code.push_str(&format!(
                    "/// View-model over `{}`.\n",
                    info.model_type
                )),
                None => code.push_str(&format!("/// `{}` data holder.\n", def.name)),
            }
        }

        let mut attrs = Vec::new();
        if let Some(ns) = &def.namespace {
            attrs.push(format!("namespace = {ns:?}"));
        }
        if let Some(base) = &def.base_type {
            attrs.push(format!("base = {base:?}"));
        }
        if let Some(info) = &def.view_model {
            attrs.push(format!("model = {:?}", info.model_type));
            attrs.push(format!("list_field = {:?}", info.list_field));
            attrs.push(format!("context_field = {:?}", info.context_field));
        }
        for event in &def.events {
            attrs.push(format!("event = {:?}", event.name));
        }
        if !attrs.is_empty() {
            code.push_str(&format!("#[{TYPE_ATTRIBUTE}({})]\n", attrs.join(", ")));
        }

        code.push_str(&format!("pub struct {} {{\n", def.name));
        for field in &def.fields {
            code.push_str(&format!("    {}: {},\n", field.name, field_type(&field.ty)));
        }
        code.push_str("}\n");
        code
    }

    fn render_inherent_impl(&self, def: &TypeDefinition) -> String {
        let mut code = String::new();
        code.push_str(&format!("impl {} {{\n", def.name));

        let mut first = true;
        let mut separate = |code: &mut String| {
            if !first {
                code.push('\n');
            }
            first = false;
        };

        for ctor in &def.constructors {
            separate(&mut code);
            code.push_str(&render_constructor(def, ctor));
        }
        for method in &def.methods {
            if let MethodBody::Instructions(body) = &method.body {
                separate(&mut code);
                if self.doc_comments && is_accessor(def, method) {
                    let prop = &method.name[4..];
                    let verb = if method.name.starts_with("get_") { "Gets" } else { "Sets" };
                    code.push_str(&format!("    /// {verb} `{prop}`.\n"));
                }
                code.push_str(&render_method(method, body));
            }
        }

        code.push_str("}\n");
        code
    }

    fn render_interface(&self, def: &TypeDefinition) -> String {
        let mut code = String::new();
        if let Some(ns) = &def.namespace {
            code.push_str(&format!("#[{TYPE_ATTRIBUTE}(namespace = {ns:?})]\n"));
        }
        code.push_str(&format!("pub trait {} {{\n", def.name));
        for prop in &def.properties {
            if prop.getter.is_some() {
                code.push_str(&format!(
                    "    fn get_{}(&self) -> {};\n",
                    prop.name,
                    return_type(&prop.ty)
                ));
            }
            if prop.setter.is_some() {
                code.push_str(&format!(
                    "    fn set_{}(&mut self, value: {});\n",
                    prop.name,
                    param_type(&prop.ty)
                ));
            }
        }
        for method in &def.methods {
            code.push_str(&format!("    {};\n", signature(method, "&self")));
        }
        code.push_str("}\n");
        code
    }
}

/// Rust type of a struct field.
pub fn field_type(ty: &TypeRef) -> String {
    match ty {
        TypeRef::Named(name) => format!("Option<{name}>"),
        TypeRef::List(inner) => format!("Option<Vec<{}>>", element_type(inner)),
        other => other.rust_type(),
    }
}

/// Rust type of a parameter. Named types are borrowed.
pub fn param_type(ty: &TypeRef) -> String {
    match ty {
        TypeRef::Named(name) => format!("&{name}"),
        TypeRef::List(inner) => format!("Vec<{}>", element_type(inner)),
        other => other.rust_type(),
    }
}

/// Rust type of a return slot.
pub fn return_type(ty: &TypeRef) -> String {
    match ty {
        TypeRef::List(inner) => format!("Vec<{}>", element_type(inner)),
        other => other.rust_type(),
    }
}

fn element_type(ty: &TypeRef) -> String {
    match ty {
        TypeRef::List(inner) => format!("Vec<{}>", element_type(inner)),
        other => other.rust_type(),
    }
}

/// Rust expression for a literal stored in a slot of type `ty`.
pub fn render_literal(literal: &Literal, ty: &TypeRef) -> String {
    match literal {
        Literal::Null => match ty {
            TypeRef::Primitive(PrimitiveKind::Object) => "Value::Null".to_string(),
            _ => "None".to_string(),
        },
        Literal::Int32(v) => v.to_string(),
        Literal::Int64(v) => format!("{v}i64"),
        Literal::Float64(v) if v.is_nan() => "f64::NAN".to_string(),
        Literal::Float64(v) if v.is_infinite() && *v > 0.0 => "f64::INFINITY".to_string(),
        Literal::Float64(v) if v.is_infinite() => "f64::NEG_INFINITY".to_string(),
        Literal::Float64(v) => format!("{v:?}f64"),
        Literal::Bool(v) => v.to_string(),
        Literal::String(s) if s.is_empty() => "String::new()".to_string(),
        Literal::String(s) => format!("String::from({s:?})"),
        Literal::Date(d) if *d == min_date() => "date_min()".to_string(),
        Literal::Date(d) => format!(
            "date({}, {}, {}, {}, {}, {})",
            d.year(),
            d.month(),
            d.day(),
            d.hour(),
            d.minute(),
            d.second()
        ),
        Literal::Decimal(d) if d.is_zero() => "Decimal::ZERO".to_string(),
        Literal::Decimal(d) => format!("dec({:?})", d.to_string()),
    }
}

fn is_accessor(def: &TypeDefinition, method: &MethodDefinition) -> bool {
    def.properties.iter().any(|p| {
        p.getter.as_deref() == Some(method.name.as_str())
            || p.setter.as_deref() == Some(method.name.as_str())
    })
}

fn signature(method: &MethodDefinition, receiver: &str) -> String {
    let mut params = vec![receiver.to_string()];
    params.extend(
        method
            .parameters
            .iter()
            .map(|p| format!("{}: {}", p.name, param_type(&p.ty))),
    );
    let asyncness = if method.is_async { "async " } else { "" };
    let ret = match &method.return_type {
        TypeRef::Void => String::new(),
        ty => format!(" -> {}", return_type(ty)),
    };
    format!("{asyncness}fn {}({}){ret}", method.name, params.join(", "))
}

fn render_default_impl(def: &TypeDefinition) -> String {
    let mut code = String::new();
    code.push_str(&format!("impl Default for {} {{\n", def.name));
    code.push_str("    fn default() -> Self {\n");
    code.push_str("        Self {\n");
    for field in &def.fields {
        code.push_str(&format!(
            "            {}: {},\n",
            field.name,
            render_literal(&field.default, &field.ty)
        ));
    }
    code.push_str("        }\n");
    code.push_str("    }\n");
    code.push_str("}\n");
    code
}

fn render_constructor(def: &TypeDefinition, ctor: &ConstructorDefinition) -> String {
    let params: Vec<String> = ctor
        .parameters
        .iter()
        .map(|p| format!("{}: {}", p.name, param_type(&p.ty)))
        .collect();
    let mut code = format!(
        "    pub fn {}({}) -> Self {{\n",
        ctor.kind.rust_name(),
        params.join(", ")
    );

    let info = def.view_model.as_ref();
    let context_field = info.map(|i| i.context_field.as_str());
    match (ctor.kind, info) {
        (ConstructorKind::Default, None) => code.push_str("        Self::default()\n"),
        (ConstructorKind::Default, Some(info)) => {
            code.push_str("        let mut this = Self::default();\n");
            code.push_str(&format!("        this.{} = Some(Vec::new());\n", info.list_field));
            code.push_str(&format!("        this.{} = Value::Null;\n", info.context_field));
            code.push_str("        this\n");
        }
        (ConstructorKind::Context, _) => {
            code.push_str("        let mut this = Self::default();\n");
            if let Some(field) = context_field {
                code.push_str(&format!("        this.{field} = context;\n"));
            }
            code.push_str("        this\n");
        }
        (ConstructorKind::ContextAndSource, _) => {
            code.push_str("        let mut this = Self::with_context(context);\n");
            let names = info.map(|i| i.schema_properties.clone()).unwrap_or_default();
            code.push_str(&copy_properties("this", "source", &names, 8));
            code.push_str("        this\n");
        }
        (ConstructorKind::Copy, _) => {
            match context_field {
                Some(field) => code.push_str(&format!(
                    "        let mut this = Self::with_context(other.{field}.clone());\n"
                )),
                None => code.push_str("        let mut this = Self::default();\n"),
            }
            code.push_str(&copy_properties("this", "other", &def.property_names(), 8));
            code.push_str("        this\n");
        }
    }

    code.push_str("    }\n");
    code
}

fn render_method(method: &MethodDefinition, body: &[Instruction]) -> String {
    let writes = body.iter().any(|i| matches!(i, Instruction::StoreField(_)));
    let receiver = if writes { "&mut self" } else { "&self" };

    let mut code = format!("    pub {} {{\n", signature(method, receiver));
    for line in render_body(method, body) {
        code.push_str("        ");
        code.push_str(&line);
        code.push('\n');
    }
    code.push_str("    }\n");
    code
}

/// Render an instruction stream as statements.
fn render_body(method: &MethodDefinition, body: &[Instruction]) -> Vec<String> {
    let mut lines = Vec::new();
    let mut stack: Vec<String> = Vec::new();
    let last = body.len().saturating_sub(1);

    for (index, instr) in body.iter().enumerate() {
        match instr {
            Instruction::LoadArg(i) => stack.push(
                method
                    .parameters
                    .get(*i as usize)
                    .map(|p| p.name.clone())
                    .unwrap_or_else(|| format!("arg{i}")),
            ),
            Instruction::LoadField(field) => stack.push(format!("self.{field}.clone()")),
            Instruction::LoadConst(literal) => stack.push(render_literal(
                literal,
                &TypeRef::Primitive(PrimitiveKind::Object),
            )),
            Instruction::NewObject {
                type_name,
                arg_count,
            } => {
                let split = stack.len().saturating_sub(*arg_count as usize);
                let args = stack.split_off(split);
                stack.push(format!("{type_name}::new({})", args.join(", ")));
            }
            Instruction::StoreField(field) => {
                let value = stack.pop().unwrap_or_else(|| "Default::default()".to_string());
                lines.push(format!("self.{field} = {value};"));
            }
            Instruction::Pop => {
                if let Some(value) = stack.pop() {
                    lines.push(format!("let _ = {value};"));
                }
            }
            Instruction::Branch { kind, .. } => {
                lines.push(format!("{BRANCH_MACRO}!({});", kind.keyword()));
            }
            Instruction::Return => match (stack.pop(), index == last) {
                (Some(value), true) => lines.push(value),
                (Some(value), false) => lines.push(format!("return {value};")),
                (None, true) => {}
                (None, false) => lines.push("return;".to_string()),
            },
        }
    }
    lines
}

fn copy_properties(target: &str, source: &str, names: &[String], indent: usize) -> String {
    let pad = " ".repeat(indent);
    names
        .iter()
        .map(|name| format!("{pad}{target}.set_{name}({source}.get_{name}());\n"))
        .collect()
}

/// `impl IViewModel for T`, one method per intrinsic member declared on `def`.
fn render_contract_impl(def: &TypeDefinition, info: &ViewModelInfo) -> String {
    let own = &def.name;
    let model = &info.model_type;
    let list = &info.list_field;
    let all = def.property_names();
    let schema = &info.schema_properties;

    let mut code = format!("impl {VIEW_MODEL_INTERFACE} for {own} {{\n");
    code.push_str(&format!("    type Model = {model};\n"));

    for method in &def.methods {
        let MethodBody::Intrinsic(member) = method.body else {
            continue;
        };
        code.push('\n');
        let body = match member {
            ContractMember::Clone => format!(
                "    fn clone_vm(&self) -> Self {{\n\
                 \x20       let mut copy = Self::with_context(self.{ctx}.clone());\n\
                 {copies}\
                 \x20       copy\n\
                 \x20   }}\n",
                ctx = info.context_field,
                copies = copy_properties("copy", "self", &all, 8),
            ),
            ContractMember::SetList => format!(
                "    fn set_list(&mut self, list: Vec<{own}>) {{\n\
                 \x20       self.{list} = Some(list);\n\
                 \x20   }}\n"
            ),
            ContractMember::Validate => format!(
                "    fn validate(&self, context: &Value) -> Vec<String> {{\n\
                 \x20       let Some(list) = self.{list}.as_ref() else {{\n\
                 \x20           return Vec::new();\n\
                 \x20       }};\n\
                 \x20       let _ = (context, list);\n\
                 \x20       if self.already_exists() {{\n\
                 \x20           return vec![String::from(\"{own} already exists\")];\n\
                 \x20       }}\n\
                 \x20       Vec::new()\n\
                 \x20   }}\n"
            ),
            ContractMember::AlreadyExists => {
                let mut cond = String::from("!std::ptr::eq(item, self)");
                for name in schema {
                    cond.push_str(&format!(
                        "\n                && item.get_{name}() == self.get_{name}()"
                    ));
                }
                format!(
                    "    fn already_exists(&self) -> bool {{\n\
                     \x20       let Some(list) = self.{list}.as_ref() else {{\n\
                     \x20           return false;\n\
                     \x20       }};\n\
                     \x20       list.iter().any(|item| {{\n\
                     \x20           {cond}\n\
                     \x20       }})\n\
                     \x20   }}\n"
                )
            }
            ContractMember::FromModel => format!(
                "    async fn from_model(&mut self, model: &{model}) -> &mut Self {{\n\
                 {copies}\
                 \x20       std::future::ready(()).await;\n\
                 \x20       self\n\
                 \x20   }}\n",
                copies = copy_properties("self", "model", schema, 8),
            ),
            ContractMember::ToNewModel => format!(
                "    fn to_new_model(&self) -> {model} {{\n\
                 \x20       let mut model = {model}::new();\n\
                 {copies}\
                 \x20       model\n\
                 \x20   }}\n",
                copies = copy_properties("model", "self", schema, 8),
            ),
            ContractMember::ToNewIModel => format!(
                "    fn to_new_imodel(&self) -> Self {{\n\
                 \x20       let mut vm = Self::new();\n\
                 {copies}\
                 \x20       vm\n\
                 \x20   }}\n",
                copies = copy_properties("vm", "self", schema, 8),
            ),
            ContractMember::SetEditMode => format!(
                "    async fn set_edit_mode(&mut self, flag: bool) {{\n\
                 \x20       self.set_{IS_EDIT_MODE}(flag);\n\
                 \x20       std::future::ready(()).await;\n\
                 \x20   }}\n"
            ),
            ContractMember::SaveModelVM => format!(
                "    async fn save_model_vm(&mut self) {{\n\
                 \x20       self.set_{IS_EDIT_MODE}(false);\n\
                 \x20       self.set_{IS_NEW}(false);\n\
                 \x20       std::future::ready(()).await;\n\
                 \x20   }}\n"
            ),
            ContractMember::SaveModelVMToNewModelVM => format!(
                "    fn save_model_vm_to_new_model_vm(&mut self) -> Self {{\n\
                 \x20       self.set_{IS_EDIT_MODE}(false);\n\
                 \x20       self.set_{IS_NEW}(false);\n\
                 \x20       self.to_new_imodel()\n\
                 \x20   }}\n"
            ),
            ContractMember::AddItemToList => format!(
                "    fn add_item_to_list(&mut self, list: Vec<{own}>) -> Vec<{own}> {{\n\
                 \x20       let mut items: Vec<{own}> = list.into_iter().collect();\n\
                 \x20       self.set_{ROW_ID}(items.len() as i32 + 1);\n\
                 \x20       items.push(self.clone_vm());\n\
                 \x20       items\n\
                 \x20   }}\n"
            ),
            ContractMember::UpdateList => format!(
                "    fn update_list(&self, list: Vec<{own}>, is_adding: bool) -> Vec<{own}> {{\n\
                 \x20       let mut items: Vec<{own}> = list.into_iter().collect();\n\
                 \x20       if is_adding {{\n\
                 \x20           items.retain(|item| !std::ptr::eq(item, self));\n\
                 \x20       }} else if let Some(item) = items\n\
                 \x20           .iter_mut()\n\
                 \x20           .find(|item| item.get_{ROW_ID}() == self.get_{ROW_ID}())\n\
                 \x20       {{\n\
                 {copies}\
                 \x20       }}\n\
                 \x20       items\n\
                 \x20   }}\n",
                copies = copy_properties("item", "self", &all, 12),
            ),
            ContractMember::DeleteItemFromList => format!(
                "    fn delete_item_from_list(&self, list: Vec<{own}>) -> Vec<{own}> {{\n\
                 \x20       let mut items: Vec<{own}> = list.into_iter().collect();\n\
                 \x20       items.retain(|item| !std::ptr::eq(item, self));\n\
                 \x20       items\n\
                 \x20   }}\n"
            ),
        };
        code.push_str(&body);
    }

    code.push_str("}\n");
    code
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{CapabilityRegistry, EXTENDED_PROPERTIES};
    use crate::schema::{SchemaColumn, SchemaTranslator};

    fn schema(capabilities: &[&str]) -> TranslatedSchema {
        let registry = CapabilityRegistry::standard();
        SchemaTranslator::new(&registry)
            .translate(
                &[
                    SchemaColumn::new("Id", PrimitiveKind::Int32),
                    SchemaColumn::new("Name", PrimitiveKind::String),
                    SchemaColumn::new("Hired", PrimitiveKind::Date),
                ],
                capabilities,
            )
            .unwrap()
    }

    #[test]
    fn test_model_source_shape() {
        let source = SourceSynthesizer::new()
            .model_source("Hr", "Employee", Some("Hr"), &schema(&[]))
            .unwrap();

        assert!(source.contains("#[typeforge(namespace = \"Hr\")]"));
        assert!(source.contains("pub struct Employee {\n    _Id: i32,\n    _Name: String,\n    _Hired: NaiveDateTime,\n}"));
        assert!(source.contains("_Hired: date_min(),"));
        assert!(source.contains("pub fn get_Id(&self) -> i32 {\n        self._Id.clone()\n    }"));
        assert!(source.contains("pub fn set_Name(&mut self, value: String) {\n        self._Name = value;\n    }"));
        assert!(!source.contains("IViewModel"));
    }

    #[test]
    fn test_view_model_source_has_contract() {
        let source = SourceSynthesizer::new()
            .view_model_source("Hr", "Employee", None, &schema(&[EXTENDED_PROPERTIES]))
            .unwrap();

        assert!(source.contains("pub struct EmployeeVM {"));
        assert!(source.contains("_employees: Option<Vec<EmployeeVM>>,"));
        assert!(source.contains("list_field = \"_employees\""));
        assert!(source.contains("impl IExtendedProperties for EmployeeVM {}"));
        for member in ContractMember::ALL {
            assert!(
                source.contains(&format!("fn {}(", member.rust_name())),
                "missing {}",
                member.name()
            );
        }
        assert!(source.contains("pub fn from_source(context: Value, source: &Employee) -> Self"));
        assert!(source.contains("async fn set_edit_mode(&mut self, flag: bool)"));
    }

    #[test]
    fn test_render_literals() {
        let object = TypeRef::Primitive(PrimitiveKind::Object);
        assert_eq!(render_literal(&Literal::Null, &object), "Value::Null");
        assert_eq!(render_literal(&Literal::Null, &TypeRef::named("X")), "None");
        assert_eq!(render_literal(&Literal::Int64(7), &object), "7i64");
        assert_eq!(render_literal(&Literal::Float64(0.0), &object), "0.0f64");
        assert_eq!(render_literal(&Literal::Float64(f64::NAN), &object), "f64::NAN");
        assert_eq!(render_literal(&Literal::Float64(f64::INFINITY), &object), "f64::INFINITY");
        assert_eq!(
            render_literal(&Literal::Float64(f64::NEG_INFINITY), &object),
            "f64::NEG_INFINITY"
        );
        assert_eq!(
            render_literal(&Literal::String("a\"b".into()), &object),
            "String::from(\"a\\\"b\")"
        );
        assert_eq!(
            render_literal(&Literal::Decimal("1.25".parse().unwrap()), &object),
            "dec(\"1.25\")"
        );
    }

    #[test]
    fn test_render_body_with_creation_and_branch() {
        let method = MethodDefinition {
            name: "Make".into(),
            parameters: vec![crate::model::ParameterDefinition::new(
                "seed",
                TypeRef::Primitive(PrimitiveKind::Int32),
            )],
            return_type: TypeRef::Void,
            is_async: false,
            body: MethodBody::Abstract,
        };
        let body = vec![
            Instruction::Branch {
                kind: crate::model::BranchKind::If,
                target: 1,
            },
            Instruction::LoadArg(0),
            Instruction::NewObject {
                type_name: "Child".into(),
                arg_count: 1,
            },
            Instruction::StoreField("_Child".into()),
            Instruction::Return,
        ];
        assert_eq!(
            render_body(&method, &body),
            vec!["branch!(if);", "self._Child = Child::new(seed);"]
        );
    }

    #[test]
    fn test_type_spellings() {
        let list = TypeRef::list_of(TypeRef::named("EmployeeVM"));
        assert_eq!(field_type(&list), "Option<Vec<EmployeeVM>>");
        assert_eq!(param_type(&list), "Vec<EmployeeVM>");
        assert_eq!(return_type(&list), "Vec<EmployeeVM>");
        assert_eq!(field_type(&TypeRef::named("Employee")), "Option<Employee>");
        assert_eq!(param_type(&TypeRef::named("Employee")), "&Employee");
    }
}
