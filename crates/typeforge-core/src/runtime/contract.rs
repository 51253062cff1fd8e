//! Runtime semantics of the view-model capability contract.

use std::sync::Arc;

use crate::capability::{ContractMember, IS_EDIT_MODE, IS_NEW, ROW_ID};
use crate::error::{Error, Result};
use crate::model::{ConstructorKind, ViewModelInfo};

use super::instance::Instance;
use super::loaded::LoadContext;
use super::value::Value;

/// Execute a contract member on `this`.
pub(crate) fn call(
    this: &Instance,
    context: &Arc<LoadContext>,
    member: ContractMember,
    args: Vec<Value>,
) -> Result<Value> {
    let def = this.def().clone();
    let info = def.view_model.as_ref().ok_or_else(|| {
        Error::Execution(format!("`{}` is not a view-model", this.type_name()))
    })?;
    let mut args = args.into_iter();
    let mut next = move || args.next().unwrap_or_default();

    tracing::debug!("{}::{}", this.type_name(), member.name());
    match member {
        ContractMember::Clone => clone_vm(this, context, info).map(Value::Object),
        ContractMember::SetList => {
            this.store_field(&info.list_field, next())?;
            Ok(Value::Null)
        }
        ContractMember::Validate => {
            if this.field(&info.list_field)?.is_null() {
                return Ok(Value::List(Vec::new()));
            }
            let mut violations = Vec::new();
            if already_exists(this, info)? {
                violations.push(Value::from(format!("{} already exists", this.type_name())));
            }
            Ok(Value::List(violations))
        }
        ContractMember::AlreadyExists => already_exists(this, info).map(Value::Bool),
        ContractMember::FromModel => {
            from_model(this, info, &next());
            Ok(Value::Object(this.clone()))
        }
        ContractMember::ToNewModel => {
            let model = context.create(&info.model_type, Vec::new())?;
            this.copy_to(&model, &info.schema_properties)?;
            Ok(Value::Object(model))
        }
        ContractMember::ToNewIModel => to_new_imodel(this, context, info).map(Value::Object),
        ContractMember::SetEditMode => {
            this.set(IS_EDIT_MODE, next())?;
            Ok(Value::Null)
        }
        ContractMember::SaveModelVM => {
            save(this)?;
            Ok(Value::Null)
        }
        ContractMember::SaveModelVMToNewModelVM => {
            save(this)?;
            to_new_imodel(this, context, info).map(Value::Object)
        }
        ContractMember::AddItemToList => {
            let mut items = next().into_list().unwrap_or_default();
            this.set(ROW_ID, items.len() as i32 + 1)?;
            items.push(Value::Object(this.clone()));
            Ok(Value::List(items))
        }
        ContractMember::UpdateList => {
            let mut items = next().into_list().unwrap_or_default();
            let is_adding = next().as_bool().unwrap_or(false);
            if is_adding {
                items.retain(|item| !is_this(item, this));
            } else {
                let row = this.get(ROW_ID)?;
                for item in &items {
                    let Some(other) = item.as_instance() else { continue };
                    if !other.ptr_eq(this) && other.get(ROW_ID)? == row {
                        this.copy_to(other, &def.property_names())?;
                        break;
                    }
                }
            }
            Ok(Value::List(items))
        }
        ContractMember::DeleteItemFromList => {
            let mut items = next().into_list().unwrap_or_default();
            items.retain(|item| !is_this(item, this));
            Ok(Value::List(items))
        }
    }
}

fn is_this(item: &Value, this: &Instance) -> bool {
    item.as_instance().is_some_and(|i| i.ptr_eq(this))
}

fn clone_vm(this: &Instance, context: &Arc<LoadContext>, info: &ViewModelInfo) -> Result<Instance> {
    let copy = Instance::construct(
        context,
        this.def().clone(),
        ConstructorKind::Context,
        vec![this.field(&info.context_field)?],
    )?;
    this.copy_to(&copy, &this.def().property_names())?;
    Ok(copy)
}

fn to_new_imodel(this: &Instance, context: &Arc<LoadContext>, info: &ViewModelInfo) -> Result<Instance> {
    let vm = Instance::construct(context, this.def().clone(), ConstructorKind::Default, Vec::new())?;
    this.copy_to(&vm, &info.schema_properties)?;
    Ok(vm)
}

/// Another list member with equal schema values.
fn already_exists(this: &Instance, info: &ViewModelInfo) -> Result<bool> {
    let list = this.field(&info.list_field)?;
    let Some(items) = list.as_list() else {
        return Ok(false);
    };
    for item in items {
        let Some(other) = item.as_instance() else { continue };
        if other.ptr_eq(this) {
            continue;
        }
        let mut equal = true;
        for name in &info.schema_properties {
            if other.get(name)? != this.get(name)? {
                equal = false;
                break;
            }
        }
        if equal {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Copy schema values from a model. Failures are logged, not returned.
fn from_model(this: &Instance, info: &ViewModelInfo, model: &Value) {
    let Some(model) = model.as_instance() else {
        tracing::warn!("{}::FromModel called without a model", this.type_name());
        return;
    };
    for name in &info.schema_properties {
        if let Err(e) = model.get(name).and_then(|value| this.set(name, value)) {
            tracing::warn!("{}::FromModel failed to copy {}: {}", this.type_name(), name, e);
        }
    }
}

fn save(this: &Instance) -> Result<()> {
    this.set(IS_EDIT_MODE, false)?;
    this.set(IS_NEW, false)
}

/// Typed access to the contract members of a view-model instance.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewModel {
    instance: Instance,
}

impl ViewModel {
    /// Wrap an instance of a view-model type.
    pub fn new(instance: Instance) -> Result<Self> {
        if instance.def().view_model.is_none() {
            return Err(Error::InvalidOperation(format!(
                "`{}` is not a view-model",
                instance.type_name()
            )));
        }
        Ok(Self { instance })
    }

    pub fn instance(&self) -> &Instance {
        &self.instance
    }

    pub fn into_instance(self) -> Instance {
        self.instance
    }

    pub fn get(&self, property: &str) -> Result<Value> {
        self.instance.get(property)
    }

    pub fn set(&self, property: &str, value: impl Into<Value>) -> Result<()> {
        self.instance.set(property, value)
    }

    fn call(&self, member: ContractMember, args: Vec<Value>) -> Result<Value> {
        self.instance.invoke(member.name(), args)
    }

    fn call_vm(&self, member: ContractMember, args: Vec<Value>) -> Result<ViewModel> {
        match self.call(member, args)? {
            Value::Object(instance) => Self::new(instance),
            other => Err(unexpected(member, &other)),
        }
    }

    fn call_list(&self, member: ContractMember, args: Vec<Value>) -> Result<Vec<ViewModel>> {
        let value = self.call(member, args)?;
        let Value::List(items) = value else {
            return Err(unexpected(member, &value));
        };
        items
            .into_iter()
            .map(|item| match item {
                Value::Object(instance) => Self::new(instance),
                other => Err(unexpected(member, &other)),
            })
            .collect()
    }

    pub fn clone_vm(&self) -> Result<ViewModel> {
        self.call_vm(ContractMember::Clone, Vec::new())
    }

    pub fn set_list(&self, list: &[ViewModel]) -> Result<()> {
        self.call(ContractMember::SetList, vec![to_list(list)])?;
        Ok(())
    }

    /// Violation messages; empty when no list is set.
    pub fn validate(&self, context: &Value) -> Result<Vec<String>> {
        let value = self.call(ContractMember::Validate, vec![context.clone()])?;
        let items = value.as_list().unwrap_or_default();
        Ok(items.iter().map(|v| v.to_string()).collect())
    }

    pub fn already_exists(&self) -> Result<bool> {
        let value = self.call(ContractMember::AlreadyExists, Vec::new())?;
        value
            .as_bool()
            .ok_or_else(|| unexpected(ContractMember::AlreadyExists, &value))
    }

    pub async fn from_model(&self, model: &Instance) -> Result<ViewModel> {
        std::future::ready(()).await;
        self.call_vm(ContractMember::FromModel, vec![Value::Object(model.clone())])
    }

    pub fn to_new_model(&self) -> Result<Instance> {
        match self.call(ContractMember::ToNewModel, Vec::new())? {
            Value::Object(instance) => Ok(instance),
            other => Err(unexpected(ContractMember::ToNewModel, &other)),
        }
    }

    pub fn to_new_imodel(&self) -> Result<ViewModel> {
        self.call_vm(ContractMember::ToNewIModel, Vec::new())
    }

    pub async fn set_edit_mode(&self, flag: bool) -> Result<()> {
        std::future::ready(()).await;
        self.call(ContractMember::SetEditMode, vec![Value::Bool(flag)])?;
        Ok(())
    }

    pub async fn save_model_vm(&self) -> Result<()> {
        std::future::ready(()).await;
        self.call(ContractMember::SaveModelVM, Vec::new())?;
        Ok(())
    }

    pub fn save_model_vm_to_new_model_vm(&self) -> Result<ViewModel> {
        self.call_vm(ContractMember::SaveModelVMToNewModelVM, Vec::new())
    }

    pub fn add_item_to_list(&self, list: &[ViewModel]) -> Result<Vec<ViewModel>> {
        self.call_list(ContractMember::AddItemToList, vec![to_list(list)])
    }

    pub fn update_list(&self, list: &[ViewModel], is_adding: bool) -> Result<Vec<ViewModel>> {
        self.call_list(
            ContractMember::UpdateList,
            vec![to_list(list), Value::Bool(is_adding)],
        )
    }

    pub fn delete_item_from_list(&self, list: &[ViewModel]) -> Result<Vec<ViewModel>> {
        self.call_list(ContractMember::DeleteItemFromList, vec![to_list(list)])
    }
}

fn to_list(list: &[ViewModel]) -> Value {
    Value::List(
        list.iter()
            .map(|vm| Value::Object(vm.instance.clone()))
            .collect(),
    )
}

fn unexpected(member: ContractMember, value: &Value) -> Error {
    Error::Execution(format!("{} returned unexpected {value:?}", member.name()))
}
