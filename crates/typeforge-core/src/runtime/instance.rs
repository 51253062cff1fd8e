//! Instances of loaded types and the instruction interpreter.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use crate::capability::PROPERTY_CHANGED_EVENT;
use crate::error::{Error, Result};
use crate::model::{
    ConstructorKind, Instruction, MethodBody, ParameterDefinition, PrimitiveKind,
    PropertyDefinition, TypeDefinition, TypeRef,
};

use super::contract;
use super::loaded::LoadContext;
use super::value::Value;

/// Upper bound on executed instructions per call.
const MAX_STEPS: usize = 10_000;

/// Callback for property change notifications.
pub type PropertyChangedHandler = Arc<dyn Fn(&Instance, &str) + Send + Sync>;

/// An instance of a loaded type.
///
/// Cloning shares the instance. Every operation checks that the owning
/// module is still loaded.
#[derive(Clone)]
pub struct Instance {
    inner: Arc<InstanceInner>,
}

struct InstanceInner {
    def: Arc<TypeDefinition>,
    module: String,
    context: Weak<LoadContext>,
    state: Mutex<InstanceState>,
}

struct InstanceState {
    fields: Vec<Value>,
    handlers: Vec<PropertyChangedHandler>,
}

impl Instance {
    /// Allocate with field initializers run.
    fn allocate(context: &Arc<LoadContext>, def: Arc<TypeDefinition>) -> Result<Self> {
        if def.is_interface() {
            return Err(Error::InvalidOperation(format!(
                "cannot instantiate interface `{}`",
                def.name
            )));
        }
        let fields = def.fields.iter().map(|f| Value::from(&f.default)).collect();
        Ok(Self {
            inner: Arc::new(InstanceInner {
                module: context.module().to_string(),
                context: Arc::downgrade(context),
                def,
                state: Mutex::new(InstanceState {
                    fields,
                    handlers: Vec::new(),
                }),
            }),
        })
    }

    /// Run the constructor of the given kind.
    pub(crate) fn construct(
        context: &Arc<LoadContext>,
        def: Arc<TypeDefinition>,
        kind: ConstructorKind,
        args: Vec<Value>,
    ) -> Result<Self> {
        let Some(ctor) = def.constructor(kind) else {
            if kind == ConstructorKind::Default && def.constructors.is_empty() && args.is_empty() {
                return Self::allocate(context, def);
            }
            return Err(Error::MemberNotFound {
                type_name: def.name.clone(),
                member: kind.rust_name().to_string(),
            });
        };
        check_args(&def.name, kind.rust_name(), &ctor.parameters, &args)?;

        let this = Self::allocate(context, def.clone())?;
        let info = def.view_model.as_ref();
        let mut args = args.into_iter();

        match kind {
            ConstructorKind::Default => {
                if let Some(info) = info {
                    this.store_field(&info.list_field, Value::List(Vec::new()))?;
                    this.store_field(&info.context_field, Value::Null)?;
                }
            }
            ConstructorKind::Context => {
                if let Some(info) = info {
                    this.store_field(&info.context_field, args.next().unwrap_or_default())?;
                }
            }
            ConstructorKind::ContextAndSource => {
                if let Some(info) = info {
                    this.store_field(&info.context_field, args.next().unwrap_or_default())?;
                }
                let source = required_instance(args.next(), &def.name, kind)?;
                let shared: Vec<String> = def
                    .properties
                    .iter()
                    .filter(|p| source.inner.def.property(&p.name).is_some())
                    .map(|p| p.name.clone())
                    .collect();
                source.copy_to(&this, &shared)?;
            }
            ConstructorKind::Copy => {
                let other = required_instance(args.next(), &def.name, kind)?;
                if let Some(info) = info {
                    this.store_field(&info.context_field, other.field(&info.context_field)?)?;
                }
                other.copy_to(&this, &def.property_names())?;
            }
        }
        Ok(this)
    }

    /// Run the most specific constructor accepting `args`.
    pub(crate) fn construct_matching(
        context: &Arc<LoadContext>,
        def: Arc<TypeDefinition>,
        args: Vec<Value>,
    ) -> Result<Self> {
        let mut best: Option<(usize, ConstructorKind)> = None;
        for ctor in &def.constructors {
            let accepts = ctor.parameters.len() == args.len()
                && ctor.parameters.iter().zip(&args).all(|(p, a)| a.fits(&p.ty));
            if !accepts {
                continue;
            }
            let specific = ctor
                .parameters
                .iter()
                .filter(|p| p.ty != TypeRef::Primitive(PrimitiveKind::Object))
                .count();
            if best.is_none_or(|(score, _)| specific > score) {
                best = Some((specific, ctor.kind));
            }
        }

        match best {
            Some((_, kind)) => Self::construct(context, def, kind, args),
            None if args.is_empty() && def.constructors.is_empty() => Self::allocate(context, def),
            None => Err(Error::Execution(format!(
                "no constructor of `{}` accepts {} argument(s)",
                def.name,
                args.len()
            ))),
        }
    }

    fn state(&self) -> MutexGuard<'_, InstanceState> {
        self.inner.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn context(&self) -> Result<Arc<LoadContext>> {
        self.inner.context.upgrade().ok_or_else(|| Error::ModuleUnloaded {
            module: self.inner.module.clone(),
        })
    }

    pub(crate) fn def(&self) -> &Arc<TypeDefinition> {
        &self.inner.def
    }

    pub fn type_name(&self) -> &str {
        &self.inner.def.name
    }

    /// Whether the owning module is still loaded.
    pub fn is_alive(&self) -> bool {
        self.inner.context.strong_count() > 0
    }

    /// Identity comparison.
    pub fn ptr_eq(&self, other: &Instance) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn property_names(&self) -> Result<Vec<String>> {
        self.context()?;
        Ok(self.inner.def.property_names())
    }

    fn property(&self, name: &str) -> Result<&PropertyDefinition> {
        self.inner.def.property(name).ok_or_else(|| Error::MemberNotFound {
            type_name: self.inner.def.name.clone(),
            member: name.to_string(),
        })
    }

    /// Read a property through its getter.
    pub fn get(&self, property: &str) -> Result<Value> {
        let context = self.context()?;
        let getter = self
            .property(property)?
            .getter
            .clone()
            .ok_or_else(|| Error::MemberNotFound {
                type_name: self.inner.def.name.clone(),
                member: format!("get_{property}"),
            })?;
        self.call(&context, &getter, Vec::new())
    }

    /// Write a property through its setter, raising `PropertyChanged` when
    /// the type declares it.
    pub fn set(&self, property: &str, value: impl Into<Value>) -> Result<()> {
        let context = self.context()?;
        let setter = self
            .property(property)?
            .setter
            .clone()
            .ok_or_else(|| Error::MemberNotFound {
                type_name: self.inner.def.name.clone(),
                member: format!("set_{property}"),
            })?;
        self.call(&context, &setter, vec![value.into()])?;

        if self
            .inner
            .def
            .events
            .iter()
            .any(|e| e.name == PROPERTY_CHANGED_EVENT)
        {
            self.raise_property_changed(property);
        }
        Ok(())
    }

    /// Invoke a method by its declared name.
    pub fn invoke(&self, method: &str, args: Vec<Value>) -> Result<Value> {
        let context = self.context()?;
        self.call(&context, method, args)
    }

    /// Subscribe to `PropertyChanged`.
    pub fn on_property_changed(&self, handler: impl Fn(&Instance, &str) + Send + Sync + 'static) {
        self.state().handlers.push(Arc::new(handler));
    }

    fn raise_property_changed(&self, property: &str) {
        let handlers = self.state().handlers.clone();
        for handler in handlers {
            handler(self, property);
        }
    }

    /// Raw field value.
    pub fn field(&self, name: &str) -> Result<Value> {
        self.context()?;
        let index = self.field_index(name)?;
        Ok(self.state().fields[index].clone())
    }

    pub(crate) fn store_field(&self, name: &str, value: Value) -> Result<()> {
        let index = self.field_index(name)?;
        let ty = &self.inner.def.fields[index].ty;
        if !value.fits(ty) {
            return Err(Error::Execution(format!(
                "cannot store {value:?} in `{}.{name}` of type {ty}",
                self.inner.def.name
            )));
        }
        self.state().fields[index] = value;
        Ok(())
    }

    fn field_index(&self, name: &str) -> Result<usize> {
        self.inner.def.field_index(name).ok_or_else(|| Error::MemberNotFound {
            type_name: self.inner.def.name.clone(),
            member: name.to_string(),
        })
    }

    /// Copy properties by name through the accessors.
    pub(crate) fn copy_to(&self, target: &Instance, names: &[String]) -> Result<()> {
        for name in names {
            target.set(name, self.get(name)?)?;
        }
        Ok(())
    }

    fn call(&self, context: &Arc<LoadContext>, name: &str, args: Vec<Value>) -> Result<Value> {
        let def = self.inner.def.clone();
        let method = def.method(name).ok_or_else(|| Error::MemberNotFound {
            type_name: def.name.clone(),
            member: name.to_string(),
        })?;
        check_args(&def.name, name, &method.parameters, &args)?;

        match &method.body {
            MethodBody::Instructions(body) => self.execute(context, name, body, &args),
            MethodBody::Intrinsic(member) => contract::call(self, context, *member, args),
            MethodBody::Abstract => Err(Error::Execution(format!(
                "`{}::{name}` has no body",
                def.name
            ))),
        }
    }

    fn execute(
        &self,
        context: &Arc<LoadContext>,
        method: &str,
        body: &[Instruction],
        args: &[Value],
    ) -> Result<Value> {
        let underflow = || Error::Execution(format!("stack underflow in `{method}`"));
        let mut stack: Vec<Value> = Vec::new();
        let mut pc = 0;
        let mut steps = 0;

        while let Some(instr) = body.get(pc) {
            steps += 1;
            if steps > MAX_STEPS {
                return Err(Error::Execution(format!(
                    "`{method}` exceeded {MAX_STEPS} steps"
                )));
            }
            pc += 1;

            match instr {
                Instruction::LoadArg(index) => {
                    let arg = args.get(*index as usize).cloned().ok_or_else(|| {
                        Error::Execution(format!("`{method}` has no argument {index}"))
                    })?;
                    stack.push(arg);
                }
                Instruction::LoadField(name) => stack.push(self.field(name)?),
                Instruction::StoreField(name) => {
                    let value = stack.pop().ok_or_else(underflow)?;
                    self.store_field(name, value)?;
                }
                Instruction::LoadConst(literal) => stack.push(Value::from(literal)),
                Instruction::NewObject {
                    type_name,
                    arg_count,
                } => {
                    let count = *arg_count as usize;
                    if stack.len() < count {
                        return Err(underflow());
                    }
                    let ctor_args = stack.split_off(stack.len() - count);
                    stack.push(Value::Object(context.create(type_name, ctor_args)?));
                }
                Instruction::Pop => {
                    stack.pop().ok_or_else(underflow)?;
                }
                Instruction::Branch { target, .. } => pc = *target as usize,
                Instruction::Return => return Ok(stack.pop().unwrap_or_default()),
            }
        }
        Ok(Value::Null)
    }
}

fn check_args(
    type_name: &str,
    member: &str,
    parameters: &[ParameterDefinition],
    args: &[Value],
) -> Result<()> {
    if parameters.len() != args.len() {
        return Err(Error::Execution(format!(
            "`{type_name}::{member}` expects {} argument(s), got {}",
            parameters.len(),
            args.len()
        )));
    }
    for (param, arg) in parameters.iter().zip(args) {
        if !arg.fits(&param.ty) {
            return Err(Error::Execution(format!(
                "argument `{}` of `{type_name}::{member}` expects {}, got {arg:?}",
                param.name, param.ty
            )));
        }
    }
    Ok(())
}

fn required_instance(arg: Option<Value>, type_name: &str, kind: ConstructorKind) -> Result<Instance> {
    match arg {
        Some(Value::Object(instance)) => Ok(instance),
        _ => Err(Error::Execution(format!(
            "`{type_name}::{}` requires an instance argument",
            kind.rust_name()
        ))),
    }
}

impl PartialEq for Instance {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{:p}", self.inner.def.name, Arc::as_ptr(&self.inner))
    }
}
