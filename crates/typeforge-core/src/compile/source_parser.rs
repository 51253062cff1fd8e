//! Parsing generated source text back into type definitions.
//!
//! Accepts the vocabulary written by the source synthesizer: structs with a
//! `#[typeforge(..)]` attribute, `impl Default`, inherent impls holding
//! constructors and accessors, and trait impls naming capability interfaces.
//! Anything else is reported as a diagnostic with its line and column.

use proc_macro2::Span;
use quote::ToTokens;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use syn::spanned::Spanned;
use syn::{
    Attribute, Block, Expr, ExprCall, ExprLit, FnArg, ImplItem, ImplItemFn, Item, ItemImpl,
    ItemStruct, ItemTrait, Lit, Pat, ReturnType, Signature, Stmt, TraitItem, Type, UnOp,
};

use crate::capability::{ContractMember, VIEW_MODEL_INTERFACE};
use crate::model::{
    BranchKind, ConstructorDefinition, ConstructorKind, EventDefinition, FieldDefinition,
    Instruction, Literal, MethodBody, MethodDefinition, ParameterDefinition, PrimitiveKind,
    PropertyDefinition, TypeDefinition, TypeRef, ViewModelInfo, min_date, seal,
};
use crate::synth::{BRANCH_MACRO, EVENT_HANDLER_TYPE, TYPE_ATTRIBUTE};

use super::diagnostics::{Diagnostic, codes};
use super::references::ModuleExports;

/// Source location of a parsed member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolEntry {
    #[serde(rename = "type")]
    pub type_name: String,
    pub member: String,
    pub line: usize,
    pub column: usize,
}

/// Output of [`SourceParser::parse`].
#[derive(Debug, Default)]
pub struct ParsedSource {
    pub types: Vec<TypeDefinition>,
    pub symbols: Vec<SymbolEntry>,
    pub diagnostics: Vec<Diagnostic>,
}

type Lowered<T> = std::result::Result<T, Diagnostic>;

/// Metadata read from a `#[typeforge(..)]` attribute.
#[derive(Debug, Default)]
struct TypeAttrs {
    namespace: Option<String>,
    base: Option<String>,
    model: Option<String>,
    list_field: Option<String>,
    context_field: Option<String>,
    events: Vec<String>,
}

/// Per-type state accumulated while walking items.
struct PendingType {
    def: TypeDefinition,
    attrs: TypeAttrs,
    defaults: FxHashMap<String, Literal>,
    field_types: Vec<(String, TypeRef)>,
}

pub struct SourceParser<'a> {
    default_namespace: Option<&'a str>,
    exports: &'a [ModuleExports],
    pending: Vec<PendingType>,
    interfaces: Vec<TypeDefinition>,
    symbols: Vec<SymbolEntry>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> SourceParser<'a> {
    pub fn new(default_namespace: Option<&'a str>, exports: &'a [ModuleExports]) -> Self {
        Self {
            default_namespace,
            exports,
            pending: Vec::new(),
            interfaces: Vec::new(),
            symbols: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    pub fn parse(mut self, text: &str) -> ParsedSource {
        let file = match syn::parse_file(text) {
            Ok(file) => file,
            Err(e) => {
                let (line, column) = location(e.span());
                return ParsedSource {
                    diagnostics: vec![Diagnostic::error(codes::SYNTAX, e.to_string()).at(line, column)],
                    ..Default::default()
                };
            }
        };

        let mut impls = Vec::new();
        for item in &file.items {
            match item {
                Item::Use(_) => {}
                Item::Struct(item) => self.parse_struct(item),
                Item::Trait(item) => self.parse_trait(item),
                Item::Impl(item) => impls.push(item),
                other => self.unsupported(other.span(), "only structs, traits and impls are supported"),
            }
        }
        for item in impls {
            self.parse_impl(item);
        }

        let pending = std::mem::take(&mut self.pending);
        let classes: Vec<TypeDefinition> = pending.into_iter().map(|p| self.finish(p)).collect();
        let mut types = std::mem::take(&mut self.interfaces);
        types.extend(classes);

        ParsedSource {
            types,
            symbols: self.symbols,
            diagnostics: self.diagnostics,
        }
    }

    fn unsupported(&mut self, span: Span, message: &str) {
        let (line, column) = location(span);
        self.diagnostics
            .push(Diagnostic::error(codes::UNSUPPORTED_ITEM, message).at(line, column));
    }

    fn symbol(&mut self, type_name: &str, member: &str, span: Span) {
        let (line, column) = location(span);
        self.symbols.push(SymbolEntry {
            type_name: type_name.to_string(),
            member: member.to_string(),
            line,
            column,
        });
    }

    fn parse_struct(&mut self, item: &ItemStruct) {
        let name = item.ident.to_string();
        let attrs = match parse_attrs(&item.attrs) {
            Ok(attrs) => attrs,
            Err(diag) => {
                self.diagnostics.push(diag.on_type(&name));
                TypeAttrs::default()
            }
        };

        let mut def = TypeDefinition::class(&name);
        def.namespace = attrs
            .namespace
            .clone()
            .or_else(|| self.default_namespace.map(str::to_string));
        def.base_type = attrs.base.clone();
        self.symbol(&name, &name, item.ident.span());

        let syn::Fields::Named(fields) = &item.fields else {
            self.unsupported(item.span(), "structs must have named fields");
            return;
        };

        let mut field_types = Vec::new();
        for field in &fields.named {
            let Some(ident) = &field.ident else { continue };
            match parse_type(&field.ty, &name) {
                Some(ty) => {
                    self.symbol(&name, &ident.to_string(), ident.span());
                    field_types.push((ident.to_string(), ty));
                }
                None => self.unsupported(field.ty.span(), "unsupported field type"),
            }
        }

        self.pending.push(PendingType {
            def,
            attrs,
            defaults: FxHashMap::default(),
            field_types,
        });
    }

    fn parse_trait(&mut self, item: &ItemTrait) {
        let name = item.ident.to_string();
        let mut def = TypeDefinition::interface(&name);
        match parse_attrs(&item.attrs) {
            Ok(attrs) => def.namespace = attrs.namespace,
            Err(diag) => self.diagnostics.push(diag.on_type(&name)),
        }

        for trait_item in &item.items {
            let TraitItem::Fn(f) = trait_item else {
                self.unsupported(trait_item.span(), "only method signatures are supported in traits");
                continue;
            };
            match parse_signature(&f.sig, "Self") {
                Ok(method) => {
                    self.symbol(&name, &method.name, f.sig.ident.span());
                    if !record_accessor(&mut def.properties, &method) {
                        def.methods.push(MethodDefinition {
                            body: MethodBody::Abstract,
                            ..method
                        });
                    }
                }
                Err(diag) => self.diagnostics.push(diag.on_type(&name)),
            }
        }
        self.interfaces.push(def);
    }

    fn parse_impl(&mut self, item: &ItemImpl) {
        let Some(self_name) = type_name(&item.self_ty) else {
            self.unsupported(item.self_ty.span(), "unsupported impl target");
            return;
        };
        let Some(index) = self.pending.iter().position(|p| p.def.name == self_name) else {
            let (line, column) = location(item.self_ty.span());
            self.diagnostics.push(
                Diagnostic::error(
                    codes::UNKNOWN_TYPE,
                    format!("impl for undeclared type `{self_name}`"),
                )
                .at(line, column),
            );
            return;
        };

        let trait_name = item
            .trait_
            .as_ref()
            .and_then(|(_, path, _)| path.segments.last())
            .map(|segment| segment.ident.to_string());

        match trait_name.as_deref() {
            None => self.parse_inherent(index, item),
            Some("Default") => self.parse_default(index, item),
            Some(VIEW_MODEL_INTERFACE) => {
                self.pending[index].def.interfaces.push(VIEW_MODEL_INTERFACE.to_string());
                self.parse_contract(index, item);
            }
            Some(other) => {
                self.pending[index].def.interfaces.push(other.to_string());
                self.parse_inherent(index, item);
            }
        }
    }

    fn parse_inherent(&mut self, index: usize, item: &ItemImpl) {
        let own = self.pending[index].def.name.clone();
        for impl_item in &item.items {
            let ImplItem::Fn(f) = impl_item else {
                self.unsupported(impl_item.span(), "only methods are supported in impls");
                continue;
            };
            self.symbol(&own, &f.sig.ident.to_string(), f.sig.ident.span());

            let result = match constructor_kind(f, &own) {
                Some(kind) => parse_params(&f.sig, &own).map(|parameters| {
                    self.pending[index]
                        .def
                        .constructors
                        .push(ConstructorDefinition { kind, parameters });
                }),
                None => lower_method(f, &own).map(|method| {
                    let def = &mut self.pending[index].def;
                    record_accessor(&mut def.properties, &method);
                    def.methods.push(method);
                }),
            };
            if let Err(diag) = result {
                self.diagnostics.push(diag.on_type(&own));
            }
        }
    }

    fn parse_default(&mut self, index: usize, item: &ItemImpl) {
        let own = self.pending[index].def.name.clone();
        let body = item.items.iter().find_map(|i| match i {
            ImplItem::Fn(f) if f.sig.ident == "default" => Some(&f.block),
            _ => None,
        });
        let Some(Stmt::Expr(Expr::Struct(init), None)) = body.and_then(|b| b.stmts.last()) else {
            self.unsupported(item.span(), "`Default` must return a struct literal");
            return;
        };

        for field in &init.fields {
            let syn::Member::Named(ident) = &field.member else { continue };
            match literal(&field.expr) {
                Some(value) => {
                    self.pending[index].defaults.insert(ident.to_string(), value);
                }
                None => {
                    let (line, column) = location(field.expr.span());
                    self.diagnostics.push(
                        Diagnostic::error(
                            codes::UNSUPPORTED_EXPRESSION,
                            format!("default of `{ident}` is not a literal"),
                        )
                        .at(line, column)
                        .on_type(&own),
                    );
                }
            }
        }
    }

    fn parse_contract(&mut self, index: usize, item: &ItemImpl) {
        let own = self.pending[index].def.name.clone();
        let Some(model) = self.pending[index].attrs.model.clone() else {
            let (line, column) = location(item.span());
            self.diagnostics.push(
                Diagnostic::error(
                    codes::MISSING_CAPABILITY_MEMBER,
                    format!("`{VIEW_MODEL_INTERFACE}` requires a `model` attribute"),
                )
                .at(line, column)
                .on_type(&own),
            );
            return;
        };

        for impl_item in &item.items {
            match impl_item {
                ImplItem::Type(_) => {}
                ImplItem::Fn(f) => {
                    let name = f.sig.ident.to_string();
                    match ContractMember::from_rust_name(&name) {
                        Some(member) => {
                            self.symbol(&own, member.name(), f.sig.ident.span());
                            self.pending[index].def.methods.push(member.method(&own, &model));
                        }
                        None => self.unsupported(
                            f.sig.ident.span(),
                            &format!("`{name}` is not a member of `{VIEW_MODEL_INTERFACE}`"),
                        ),
                    }
                }
                other => self.unsupported(other.span(), "unsupported item in contract impl"),
            }
        }
    }

    /// Resolve fields, defaults and view-model metadata.
    fn finish(&self, pending: PendingType) -> TypeDefinition {
        let PendingType {
            mut def,
            attrs,
            mut defaults,
            field_types,
        } = pending;

        def.fields = field_types
            .into_iter()
            .map(|(name, ty)| {
                let default = defaults.remove(&name).unwrap_or_else(|| ty.default_literal());
                FieldDefinition { name, ty, default }
            })
            .collect();

        def.events = attrs
            .events
            .iter()
            .map(|name| EventDefinition {
                name: name.clone(),
                handler: TypeRef::named(EVENT_HANDLER_TYPE),
            })
            .collect();

        if let (Some(model), Some(list_field), Some(context_field)) =
            (attrs.model, attrs.list_field, attrs.context_field)
        {
            let declared: Vec<&str> = def
                .interfaces
                .iter()
                .filter_map(|name| self.find_interface(name))
                .flat_map(|i| i.properties.iter().map(|p| p.name.as_str()))
                .collect();
            let (capability, schema): (Vec<String>, Vec<String>) = def
                .property_names()
                .into_iter()
                .partition(|name| declared.contains(&name.as_str()));
            def.view_model = Some(ViewModelInfo {
                model_type: model,
                list_field,
                context_field,
                capability_properties: capability,
                schema_properties: schema,
            });
        }
        def
    }

    fn find_interface(&self, name: &str) -> Option<&TypeDefinition> {
        self.interfaces
            .iter()
            .find(|i| i.name == name)
            .or_else(|| {
                self.exports
                    .iter()
                    .find_map(|m| m.find_type(name))
                    .filter(|t| t.is_interface())
            })
    }
}

/// 1-based line and column of a span.
fn location(span: Span) -> (usize, usize) {
    let start = span.start();
    (start.line, start.column + 1)
}

fn expression_error(span: Span, message: impl Into<String>) -> Diagnostic {
    let (line, column) = location(span);
    Diagnostic::error(codes::UNSUPPORTED_EXPRESSION, message).at(line, column)
}

fn parse_attrs(attrs: &[Attribute]) -> Lowered<TypeAttrs> {
    let mut out = TypeAttrs::default();
    for attr in attrs.iter().filter(|a| a.path().is_ident(TYPE_ATTRIBUTE)) {
        attr.parse_nested_meta(|meta| {
            let value: syn::LitStr = meta.value()?.parse()?;
            let value = value.value();
            let key = meta
                .path
                .get_ident()
                .map(|i| i.to_string())
                .unwrap_or_default();
            match key.as_str() {
                "namespace" => out.namespace = Some(value),
                "base" => out.base = Some(value),
                "model" => out.model = Some(value),
                "list_field" => out.list_field = Some(value),
                "context_field" => out.context_field = Some(value),
                "event" => out.events.push(value),
                _ => return Err(meta.error(format!("unknown `{TYPE_ATTRIBUTE}` key `{key}`"))),
            }
            Ok(())
        })
        .map_err(|e| {
            let (line, column) = location(e.span());
            Diagnostic::error(codes::UNSUPPORTED_ITEM, e.to_string()).at(line, column)
        })?;
    }
    Ok(out)
}

fn type_name(ty: &Type) -> Option<String> {
    match ty {
        Type::Path(path) => path.path.segments.last().map(|s| s.ident.to_string()),
        _ => None,
    }
}

/// Map a Rust type back to a [`TypeRef`]. `Self` resolves to `own`.
fn parse_type(ty: &Type, own: &str) -> Option<TypeRef> {
    match ty {
        Type::Reference(reference) => parse_type(&reference.elem, own),
        Type::Paren(inner) => parse_type(&inner.elem, own),
        Type::Tuple(tuple) if tuple.elems.is_empty() => Some(TypeRef::Void),
        Type::Path(path) => {
            let segment = path.path.segments.last()?;
            let ident = segment.ident.to_string();
            let generic = || match &segment.arguments {
                syn::PathArguments::AngleBracketed(args) if args.args.len() == 1 => {
                    match args.args.first()? {
                        syn::GenericArgument::Type(inner) => parse_type(inner, own),
                        _ => None,
                    }
                }
                _ => None,
            };
            match ident.as_str() {
                "Option" => generic(),
                "Vec" => generic().map(TypeRef::list_of),
                "Self" => Some(TypeRef::named(own)),
                name => Some(
                    PrimitiveKind::from_rust_type(name)
                        .map(TypeRef::Primitive)
                        .unwrap_or_else(|| TypeRef::named(name)),
                ),
            }
        }
        _ => None,
    }
}

fn parse_params(sig: &Signature, own: &str) -> Lowered<Vec<ParameterDefinition>> {
    let mut params = Vec::new();
    for input in &sig.inputs {
        let FnArg::Typed(typed) = input else { continue };
        let Pat::Ident(pat) = typed.pat.as_ref() else {
            return Err(expression_error(typed.pat.span(), "parameters must be plain identifiers"));
        };
        let ty = parse_type(&typed.ty, own)
            .ok_or_else(|| expression_error(typed.ty.span(), "unsupported parameter type"))?;
        params.push(ParameterDefinition::new(pat.ident.to_string(), ty));
    }
    Ok(params)
}

fn parse_signature(sig: &Signature, own: &str) -> Lowered<MethodDefinition> {
    let return_type = match &sig.output {
        ReturnType::Default => TypeRef::Void,
        ReturnType::Type(_, ty) => parse_type(ty, own)
            .ok_or_else(|| expression_error(ty.span(), "unsupported return type"))?,
    };
    Ok(MethodDefinition {
        name: sig.ident.to_string(),
        parameters: parse_params(sig, own)?,
        return_type,
        is_async: sig.asyncness.is_some(),
        body: MethodBody::Instructions(Vec::new()),
    })
}

fn constructor_kind(f: &ImplItemFn, own: &str) -> Option<ConstructorKind> {
    let kind = ConstructorKind::from_rust_name(&f.sig.ident.to_string())?;
    let has_receiver = f.sig.inputs.iter().any(|i| matches!(i, FnArg::Receiver(_)));
    let returns_self = match &f.sig.output {
        ReturnType::Type(_, ty) => type_name(ty).is_some_and(|n| n == "Self" || n == own),
        ReturnType::Default => false,
    };
    (returns_self && !has_receiver).then_some(kind)
}

/// Add or extend the property a `get_`/`set_` method belongs to.
/// Returns `false` for other methods.
fn record_accessor(properties: &mut Vec<PropertyDefinition>, method: &MethodDefinition) -> bool {
    let (name, ty, is_getter) = if let Some(name) = method.name.strip_prefix("get_") {
        (name, method.return_type.clone(), true)
    } else if let Some(name) = method.name.strip_prefix("set_") {
        let Some(param) = method.parameters.first() else {
            return false;
        };
        (name, param.ty.clone(), false)
    } else {
        return false;
    };

    let index = match properties.iter().position(|p| p.name == name) {
        Some(index) => index,
        None => {
            properties.push(PropertyDefinition {
                name: name.to_string(),
                ty,
                getter: None,
                setter: None,
            });
            properties.len() - 1
        }
    };
    let prop = &mut properties[index];
    if is_getter {
        prop.getter = Some(method.name.clone());
    } else {
        prop.setter = Some(method.name.clone());
    }
    true
}

fn lower_method(f: &ImplItemFn, own: &str) -> Lowered<MethodDefinition> {
    let mut method = parse_signature(&f.sig, own)?;
    let body = BodyLowering {
        parameters: &method.parameters,
    }
    .lower_block(&f.block)?;
    method.body = MethodBody::Instructions(body);
    Ok(method)
}

struct BodyLowering<'a> {
    parameters: &'a [ParameterDefinition],
}

impl BodyLowering<'_> {
    fn lower_block(&self, block: &Block) -> Lowered<Vec<Instruction>> {
        let mut out = Vec::new();
        for stmt in &block.stmts {
            match stmt {
                Stmt::Local(local) => {
                    let init = local
                        .init
                        .as_ref()
                        .filter(|_| matches!(local.pat, Pat::Wild(_)))
                        .ok_or_else(|| {
                            expression_error(local.span(), "only `let _ = ..;` bindings are supported")
                        })?;
                    self.lower_expr(&init.expr, &mut out)?;
                    out.push(Instruction::Pop);
                }
                Stmt::Macro(mac) if mac.mac.path.is_ident(BRANCH_MACRO) => {
                    let kind = match mac.mac.tokens.to_string().trim() {
                        "if" => BranchKind::If,
                        "for" => BranchKind::For,
                        "foreach" => BranchKind::Foreach,
                        other => {
                            return Err(expression_error(
                                mac.span(),
                                format!("unknown branch kind `{other}`"),
                            ));
                        }
                    };
                    let target = (out.len() + 1) as u32;
                    out.push(Instruction::Branch { kind, target });
                }
                Stmt::Expr(Expr::Assign(assign), _) => {
                    let field = self_field(&assign.left).ok_or_else(|| {
                        expression_error(assign.left.span(), "assignment target must be `self.<field>`")
                    })?;
                    self.lower_expr(&assign.right, &mut out)?;
                    out.push(Instruction::StoreField(field));
                }
                Stmt::Expr(Expr::Return(ret), _) => {
                    if let Some(expr) = &ret.expr {
                        self.lower_expr(expr, &mut out)?;
                    }
                    out.push(Instruction::Return);
                }
                Stmt::Expr(expr, None) => {
                    self.lower_expr(expr, &mut out)?;
                    out.push(Instruction::Return);
                }
                Stmt::Expr(expr, Some(_)) => {
                    self.lower_expr(expr, &mut out)?;
                    out.push(Instruction::Pop);
                }
                other => {
                    return Err(expression_error(
                        other.span(),
                        format!("unsupported statement `{}`", other.to_token_stream()),
                    ));
                }
            }
        }
        Ok(seal(out))
    }

    fn lower_expr(&self, expr: &Expr, out: &mut Vec<Instruction>) -> Lowered<()> {
        if let Some(value) = literal(expr) {
            out.push(Instruction::LoadConst(value));
            return Ok(());
        }

        match expr {
            Expr::Paren(inner) => self.lower_expr(&inner.expr, out),
            Expr::MethodCall(call) if call.method == "clone" && call.args.is_empty() => {
                self.lower_expr(&call.receiver, out)
            }
            Expr::Field(_) => {
                let field = self_field(expr)
                    .ok_or_else(|| expression_error(expr.span(), "only `self` fields can be read"))?;
                out.push(Instruction::LoadField(field));
                Ok(())
            }
            Expr::Path(path) => {
                let name = path
                    .path
                    .get_ident()
                    .map(|i| i.to_string())
                    .ok_or_else(|| expression_error(expr.span(), "unsupported path"))?;
                let index = self
                    .parameters
                    .iter()
                    .position(|p| p.name == name)
                    .ok_or_else(|| expression_error(expr.span(), format!("unknown name `{name}`")))?;
                out.push(Instruction::LoadArg(index as u16));
                Ok(())
            }
            Expr::Call(call) => {
                let type_name = constructor_call(call)
                    .ok_or_else(|| expression_error(expr.span(), "unsupported call"))?;
                for arg in &call.args {
                    self.lower_expr(arg, out)?;
                }
                out.push(Instruction::NewObject {
                    type_name,
                    arg_count: call.args.len() as u16,
                });
                Ok(())
            }
            _ => Err(expression_error(
                expr.span(),
                format!("unsupported expression `{}`", expr.to_token_stream()),
            )),
        }
    }
}

/// `self.<field>` (optionally `.clone()`d) to the field name.
fn self_field(expr: &Expr) -> Option<String> {
    let Expr::Field(field) = expr else {
        return None;
    };
    let Expr::Path(base) = field.base.as_ref() else {
        return None;
    };
    if !base.path.is_ident("self") {
        return None;
    }
    match &field.member {
        syn::Member::Named(ident) => Some(ident.to_string()),
        syn::Member::Unnamed(_) => None,
    }
}

/// `T::new(..)` to `T`.
fn constructor_call(call: &ExprCall) -> Option<String> {
    let Expr::Path(path) = call.func.as_ref() else {
        return None;
    };
    let segments: Vec<String> = path.path.segments.iter().map(|s| s.ident.to_string()).collect();
    match segments.as_slice() {
        [ty, new] if new == "new" => Some(ty.clone()),
        _ => None,
    }
}

fn path_string(expr: &Expr) -> Option<String> {
    let Expr::Path(path) = expr else {
        return None;
    };
    Some(
        path.path
            .segments
            .iter()
            .map(|s| s.ident.to_string())
            .collect::<Vec<_>>()
            .join("::"),
    )
}

fn int_arg(expr: &Expr) -> Option<i64> {
    match expr {
        Expr::Lit(ExprLit {
            lit: Lit::Int(int), ..
        }) => int.base10_parse().ok(),
        _ => None,
    }
}

/// Evaluate a literal expression written by the source synthesizer.
fn literal(expr: &Expr) -> Option<Literal> {
    match expr {
        Expr::Lit(ExprLit { lit, .. }) => match lit {
            Lit::Bool(b) => Some(Literal::Bool(b.value)),
            Lit::Str(s) => Some(Literal::String(s.value())),
            Lit::Float(f) => f.base10_parse::<f64>().ok().map(Literal::Float64),
            Lit::Int(int) => match int.suffix() {
                "i64" => int.base10_parse().ok().map(Literal::Int64),
                "f64" => int.base10_parse().ok().map(Literal::Float64),
                "" | "i32" => match int.base10_parse::<i32>() {
                    Ok(v) => Some(Literal::Int32(v)),
                    Err(_) if int.suffix().is_empty() => {
                        int.base10_parse().ok().map(Literal::Int64)
                    }
                    Err(_) => None,
                },
                _ => None,
            },
            _ => None,
        },
        Expr::Unary(unary) if matches!(unary.op, UnOp::Neg(_)) => {
            match literal(&unary.expr)? {
                Literal::Int32(v) => Some(Literal::Int32(-v)),
                Literal::Int64(v) => Some(Literal::Int64(-v)),
                Literal::Float64(v) => Some(Literal::Float64(-v)),
                _ => None,
            }
        }
        Expr::Paren(inner) => literal(&inner.expr),
        Expr::Path(_) => match path_string(expr)?.as_str() {
            "None" | "Value::Null" => Some(Literal::Null),
            "Decimal::ZERO" => Some(Literal::Decimal(rust_decimal::Decimal::ZERO)),
            "f64::NAN" => Some(Literal::Float64(f64::NAN)),
            "f64::INFINITY" => Some(Literal::Float64(f64::INFINITY)),
            "f64::NEG_INFINITY" => Some(Literal::Float64(f64::NEG_INFINITY)),
            _ => None,
        },
        Expr::Call(call) => {
            let func = path_string(&call.func)?;
            let args: Vec<&Expr> = call.args.iter().collect();
            match (func.as_str(), args.as_slice()) {
                ("String::new", []) => Some(Literal::String(String::new())),
                ("String::from", [arg]) => match literal(arg)? {
                    Literal::String(s) => Some(Literal::String(s)),
                    _ => None,
                },
                ("date_min", []) => Some(Literal::Date(min_date())),
                ("date", [y, mo, d, h, mi, s]) => {
                    let date = chrono::NaiveDate::from_ymd_opt(
                        int_arg(y)? as i32,
                        int_arg(mo)? as u32,
                        int_arg(d)? as u32,
                    )?;
                    date.and_hms_opt(int_arg(h)? as u32, int_arg(mi)? as u32, int_arg(s)? as u32)
                        .map(Literal::Date)
                }
                ("dec", [arg]) => match literal(arg)? {
                    Literal::String(s) => s.parse().ok().map(Literal::Decimal),
                    _ => None,
                },
                _ => None,
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::references::{ModuleReference, ReferenceSet};

    fn exports() -> Vec<ModuleExports> {
        ReferenceSet::baseline()
            .with_capabilities()
            .iter()
            .map(ModuleReference::resolve)
            .collect::<crate::error::Result<_>>()
            .unwrap()
    }

    fn parse(text: &str) -> ParsedSource {
        let exports = exports();
        SourceParser::new(None, &exports).parse(text)
    }

    #[test]
    fn test_non_finite_float_literals_parse_back() {
        let float = TypeRef::Primitive(PrimitiveKind::Float64);
        for value in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY, -2.5] {
            let text = crate::synth::render_literal(&Literal::Float64(value), &float);
            let expr: Expr = syn::parse_str(&text).unwrap();
            match literal(&expr) {
                Some(Literal::Float64(parsed)) if value.is_nan() => assert!(parsed.is_nan()),
                Some(Literal::Float64(parsed)) => assert_eq!(parsed, value, "{text}"),
                other => panic!("`{text}` parsed as {other:?}"),
            }
        }
    }

    #[test]
    fn test_parse_data_holder() {
        let parsed = parse(
            r#"
#[typeforge(namespace = "Hr")]
pub struct Employee {
    _Id: i32,
    _Name: String,
}

impl Default for Employee {
    fn default() -> Self {
        Self { _Id: 7, _Name: String::from("x") }
    }
}

impl Employee {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_Id(&self) -> i32 {
        self._Id.clone()
    }

    pub fn set_Id(&mut self, value: i32) {
        self._Id = value;
    }

    pub fn get_Name(&self) -> String {
        self._Name.clone()
    }
}
"#,
        );
        assert!(parsed.diagnostics.is_empty(), "{:?}", parsed.diagnostics);

        let def = &parsed.types[0];
        assert_eq!(def.full_name(), "Hr.Employee");
        assert_eq!(def.fields[0].default, Literal::Int32(7));
        assert_eq!(def.fields[1].default, Literal::String("x".into()));
        assert_eq!(def.property_names(), vec!["Id", "Name"]);
        assert_eq!(def.properties[1].setter, None);
        assert_eq!(def.constructors[0].kind, ConstructorKind::Default);
        assert_eq!(
            def.method("set_Id").unwrap().instructions().unwrap(),
            &[
                Instruction::LoadArg(0),
                Instruction::StoreField("_Id".into()),
                Instruction::Return
            ]
        );
        assert!(parsed.symbols.iter().any(|s| s.member == "get_Name"));
    }

    #[test]
    fn test_syntax_error_has_location() {
        let parsed = parse("pub struct Broken {\n    _Id: i32\n    _Name: String,\n}\n");
        assert_eq!(parsed.diagnostics.len(), 1);
        let diag = &parsed.diagnostics[0];
        assert_eq!(diag.id, codes::SYNTAX);
        assert_eq!(diag.location.map(|(line, _)| line), Some(3));
    }

    #[test]
    fn test_unsupported_expression() {
        let parsed = parse(
            "pub struct A { _X: i32 }\nimpl A {\n    pub fn get_X(&self) -> i32 {\n        self._X + 1\n    }\n}\n",
        );
        assert_eq!(parsed.diagnostics[0].id, codes::UNSUPPORTED_EXPRESSION);
        assert_eq!(parsed.diagnostics[0].location.map(|(l, _)| l), Some(4));
    }

    #[test]
    fn test_unsupported_item() {
        let parsed = parse("pub fn free() {}\n");
        assert_eq!(parsed.diagnostics[0].id, codes::UNSUPPORTED_ITEM);
    }

    #[test]
    fn test_contract_impl_maps_to_intrinsics() {
        let parsed = parse(
            r#"
#[typeforge(model = "Employee", list_field = "_employees", context_field = "_context")]
pub struct EmployeeVM {
    _context: Value,
    _employees: Option<Vec<EmployeeVM>>,
    _RowId: i32,
}

impl EmployeeVM {
    pub fn get_RowId(&self) -> i32 {
        self._RowId.clone()
    }

    pub fn set_RowId(&mut self, value: i32) {
        self._RowId = value;
    }
}

impl IExtendedProperties for EmployeeVM {}

impl IViewModel for EmployeeVM {
    type Model = Employee;

    fn clone_vm(&self) -> Self {
        Self::with_context(self._context.clone())
    }

    fn frobnicate(&self) {}
}
"#,
        );

        let def = &parsed.types[0];
        assert_eq!(def.interfaces, vec!["IExtendedProperties", "IViewModel"]);
        assert_eq!(
            def.method("Clone").unwrap().body,
            MethodBody::Intrinsic(ContractMember::Clone)
        );
        assert_eq!(
            def.fields[1].ty,
            TypeRef::list_of(TypeRef::named("EmployeeVM"))
        );
        let info = def.view_model.as_ref().unwrap();
        assert_eq!(info.capability_properties, vec!["RowId"]);
        assert!(info.schema_properties.is_empty());

        assert_eq!(parsed.diagnostics.len(), 1);
        assert!(parsed.diagnostics[0].message.contains("frobnicate"));
    }

    #[test]
    fn test_literals() {
        let lit = |s: &str| literal(&syn::parse_str::<Expr>(s).unwrap());
        assert_eq!(lit("None"), Some(Literal::Null));
        assert_eq!(lit("-3"), Some(Literal::Int32(-3)));
        assert_eq!(lit("5i64"), Some(Literal::Int64(5)));
        assert_eq!(lit("0.0f64"), Some(Literal::Float64(0.0)));
        assert_eq!(lit("date_min()"), Some(Literal::Date(min_date())));
        assert_eq!(
            lit("dec(\"2.5\")"),
            Some(Literal::Decimal("2.5".parse().unwrap()))
        );
        assert_eq!(lit("foo()"), None);
    }

    #[test]
    fn test_parse_type() {
        let ty = |s: &str| parse_type(&syn::parse_str::<Type>(s).unwrap(), "Own");
        assert_eq!(ty("&Employee"), Some(TypeRef::named("Employee")));
        assert_eq!(ty("Option<Employee>"), Some(TypeRef::named("Employee")));
        assert_eq!(ty("Vec<Self>"), Some(TypeRef::list_of(TypeRef::named("Own"))));
        assert_eq!(ty("NaiveDateTime"), Some(TypeRef::Primitive(PrimitiveKind::Date)));
        assert_eq!(ty("()"), Some(TypeRef::Void));
    }
}
