//! The capability contract every generated view-model satisfies.
//!
//! The contract is a fixed member table. The layout builder, the source
//! renderer and parser, the verifier and the runtime all read it from here.
//!
//! Capability interfaces are exported by a synthetic module,
//! [`CAPABILITY_MODULE`], which compilations reference like any other module.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{
    MethodBody, MethodDefinition, ParameterDefinition, PrimitiveKind, PropertyDefinition,
    TypeDefinition, TypeRef,
};

/// Name of the synthetic module exporting capability interfaces.
pub const CAPABILITY_MODULE: &str = "Typeforge.Capabilities";

/// Interface contributing the extended row properties.
pub const EXTENDED_PROPERTIES: &str = "IExtendedProperties";

/// Interface carrying the contract methods.
pub const VIEW_MODEL_INTERFACE: &str = "IViewModel";

/// 1-based row identifier assigned by `AddItemToList`.
pub const ROW_ID: &str = "RowId";
/// Marks a staging row that has not been committed to the list yet.
pub const IS_NEW: &str = "IsNew";
/// Toggled by `SetEditMode` and cleared by `SaveModelVM`.
pub const IS_EDIT_MODE: &str = "IsEditMode";
pub const IS_SELECTED: &str = "IsSelected";

/// Properties of [`EXTENDED_PROPERTIES`], in declaration order.
pub const EXTENDED_PROPERTY_SET: [(&str, PrimitiveKind); 4] = [
    (ROW_ID, PrimitiveKind::Int32),
    (IS_NEW, PrimitiveKind::Bool),
    (IS_EDIT_MODE, PrimitiveKind::Bool),
    (IS_SELECTED, PrimitiveKind::Bool),
];

/// Event raised by view-model setters.
pub const PROPERTY_CHANGED_EVENT: &str = "PropertyChanged";

/// One member of the view-model capability contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContractMember {
    Clone,
    SetList,
    Validate,
    AlreadyExists,
    FromModel,
    ToNewModel,
    ToNewIModel,
    SetEditMode,
    SaveModelVM,
    SaveModelVMToNewModelVM,
    AddItemToList,
    UpdateList,
    DeleteItemFromList,
}

/// Shape of a contract parameter or return slot, resolved per view-model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Void,
    Bool,
    Object,
    /// The view-model itself.
    Own,
    /// The view-model's source model.
    Model,
    /// A list of the view-model.
    OwnList,
    /// A list of violation messages.
    Messages,
}

impl Slot {
    fn resolve(self, own: &str, model: &str) -> TypeRef {
        match self {
            Self::Void => TypeRef::Void,
            Self::Bool => TypeRef::Primitive(PrimitiveKind::Bool),
            Self::Object => TypeRef::Primitive(PrimitiveKind::Object),
            Self::Own => TypeRef::named(own),
            Self::Model => TypeRef::named(model),
            Self::OwnList => TypeRef::list_of(TypeRef::named(own)),
            Self::Messages => TypeRef::list_of(TypeRef::Primitive(PrimitiveKind::String)),
        }
    }
}

impl ContractMember {
    /// Every member, in contract order.
    pub const ALL: [ContractMember; 13] = [
        Self::Clone,
        Self::SetList,
        Self::Validate,
        Self::AlreadyExists,
        Self::FromModel,
        Self::ToNewModel,
        Self::ToNewIModel,
        Self::SetEditMode,
        Self::SaveModelVM,
        Self::SaveModelVMToNewModelVM,
        Self::AddItemToList,
        Self::UpdateList,
        Self::DeleteItemFromList,
    ];

    /// Contract (reflected) method name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Clone => "Clone",
            Self::SetList => "SetList",
            Self::Validate => "Validate",
            Self::AlreadyExists => "AlreadyExists",
            Self::FromModel => "FromModel",
            Self::ToNewModel => "ToNewModel",
            Self::ToNewIModel => "ToNewIModel",
            Self::SetEditMode => "SetEditMode",
            Self::SaveModelVM => "SaveModelVM",
            Self::SaveModelVMToNewModelVM => "SaveModelVMToNewModelVM",
            Self::AddItemToList => "AddItemToList",
            Self::UpdateList => "UpdateList",
            Self::DeleteItemFromList => "DeleteItemFromList",
        }
    }

    /// Method name in generated Rust source.
    pub fn rust_name(self) -> &'static str {
        match self {
            Self::Clone => "clone_vm",
            Self::SetList => "set_list",
            Self::Validate => "validate",
            Self::AlreadyExists => "already_exists",
            Self::FromModel => "from_model",
            Self::ToNewModel => "to_new_model",
            Self::ToNewIModel => "to_new_imodel",
            Self::SetEditMode => "set_edit_mode",
            Self::SaveModelVM => "save_model_vm",
            Self::SaveModelVMToNewModelVM => "save_model_vm_to_new_model_vm",
            Self::AddItemToList => "add_item_to_list",
            Self::UpdateList => "update_list",
            Self::DeleteItemFromList => "delete_item_from_list",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.name() == name)
    }

    pub fn from_rust_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.rust_name() == name)
    }

    /// Members that complete an already-finished future.
    pub fn is_async(self) -> bool {
        matches!(self, Self::FromModel | Self::SetEditMode | Self::SaveModelVM)
    }

    /// Whether the member mutates its receiver.
    pub fn takes_mut_self(self) -> bool {
        matches!(
            self,
            Self::SetList
                | Self::FromModel
                | Self::SetEditMode
                | Self::SaveModelVM
                | Self::SaveModelVMToNewModelVM
                | Self::AddItemToList
        )
    }

    fn parameter_slots(self) -> &'static [(&'static str, Slot)] {
        match self {
            Self::Clone
            | Self::AlreadyExists
            | Self::ToNewModel
            | Self::ToNewIModel
            | Self::SaveModelVM
            | Self::SaveModelVMToNewModelVM => &[],
            Self::SetList | Self::AddItemToList | Self::DeleteItemFromList => {
                &[("list", Slot::OwnList)]
            }
            Self::Validate => &[("context", Slot::Object)],
            Self::FromModel => &[("model", Slot::Model)],
            Self::SetEditMode => &[("flag", Slot::Bool)],
            Self::UpdateList => &[("list", Slot::OwnList), ("is_adding", Slot::Bool)],
        }
    }

    fn return_slot(self) -> Slot {
        match self {
            Self::Clone | Self::FromModel | Self::ToNewIModel | Self::SaveModelVMToNewModelVM => {
                Slot::Own
            }
            Self::SetList | Self::SetEditMode | Self::SaveModelVM => Slot::Void,
            Self::Validate => Slot::Messages,
            Self::AlreadyExists => Slot::Bool,
            Self::ToNewModel => Slot::Model,
            Self::AddItemToList | Self::UpdateList | Self::DeleteItemFromList => Slot::OwnList,
        }
    }

    /// Number of declared parameters.
    pub fn arity(self) -> usize {
        self.parameter_slots().len()
    }

    /// Parameters of this member for a view-model `own` over `model`.
    pub fn parameters(self, own: &str, model: &str) -> Vec<ParameterDefinition> {
        self.parameter_slots()
            .iter()
            .map(|(name, slot)| ParameterDefinition::new(*name, slot.resolve(own, model)))
            .collect()
    }

    pub fn return_type(self, own: &str, model: &str) -> TypeRef {
        self.return_slot().resolve(own, model)
    }

    /// The method definition a view-model declares for this member.
    pub fn method(self, own: &str, model: &str) -> MethodDefinition {
        MethodDefinition {
            name: self.name().to_string(),
            parameters: self.parameters(own, model),
            return_type: self.return_type(own, model),
            is_async: self.is_async(),
            body: MethodBody::Intrinsic(self),
        }
    }
}

/// The interfaces exported by [`CAPABILITY_MODULE`].
pub fn capability_interfaces() -> Vec<TypeDefinition> {
    let mut extended = TypeDefinition::interface(EXTENDED_PROPERTIES);
    extended.namespace = Some(CAPABILITY_MODULE.to_string());
    extended.properties = EXTENDED_PROPERTY_SET
        .iter()
        .map(|(name, kind)| PropertyDefinition::read_write(*name, TypeRef::Primitive(*kind)))
        .collect();

    let mut view_model = TypeDefinition::interface(VIEW_MODEL_INTERFACE);
    view_model.namespace = Some(CAPABILITY_MODULE.to_string());
    view_model.methods = ContractMember::ALL
        .into_iter()
        .map(|member| MethodDefinition {
            body: MethodBody::Abstract,
            ..member.method("Self", "Model")
        })
        .collect();

    vec![extended, view_model]
}

/// Resolves capability interfaces by name.
#[derive(Debug, Clone)]
pub struct CapabilityRegistry {
    interfaces: FxHashMap<String, TypeDefinition>,
}

impl CapabilityRegistry {
    /// An empty registry.
    pub fn empty() -> Self {
        Self {
            interfaces: FxHashMap::default(),
        }
    }

    /// A registry holding the interfaces of [`CAPABILITY_MODULE`].
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        for def in capability_interfaces() {
            registry.register(def);
        }
        registry
    }

    /// Register an additional interface. Replaces one of the same name.
    pub fn register(&mut self, def: TypeDefinition) {
        self.interfaces.insert(def.name.clone(), def);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.interfaces.contains_key(name)
    }

    /// Reflect an interface by name.
    pub fn resolve(&self, name: &str) -> Result<&TypeDefinition> {
        self.interfaces.get(name).ok_or_else(|| {
            Error::schema(name, "capability interface cannot be reflected")
        })
    }

    /// Properties declared by an interface, in declaration order.
    pub fn properties_of(&self, name: &str) -> Result<Vec<(String, TypeRef)>> {
        let def = self.resolve(name)?;
        Ok(def
            .properties
            .iter()
            .map(|p| (p.name.clone(), p.ty.clone()))
            .collect())
    }
}

impl Default for CapabilityRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contract_names_roundtrip() {
        for member in ContractMember::ALL {
            assert_eq!(ContractMember::from_name(member.name()), Some(member));
            assert_eq!(ContractMember::from_rust_name(member.rust_name()), Some(member));
        }
        assert_eq!(ContractMember::from_name("Frobnicate"), None);
    }

    #[test]
    fn test_async_members() {
        let async_members: Vec<_> = ContractMember::ALL
            .into_iter()
            .filter(|m| m.is_async())
            .map(|m| m.name())
            .collect();
        assert_eq!(async_members, vec!["FromModel", "SetEditMode", "SaveModelVM"]);
    }

    #[test]
    fn test_signatures_resolve_against_view_model() {
        let update = ContractMember::UpdateList.method("EmployeeVM", "Employee");
        assert_eq!(update.parameters.len(), 2);
        assert_eq!(
            update.parameters[0].ty,
            TypeRef::list_of(TypeRef::named("EmployeeVM"))
        );
        assert_eq!(update.parameters[1].ty, TypeRef::Primitive(PrimitiveKind::Bool));
        assert_eq!(update.body, MethodBody::Intrinsic(ContractMember::UpdateList));

        assert_eq!(
            ContractMember::ToNewModel.return_type("EmployeeVM", "Employee"),
            TypeRef::named("Employee")
        );
        assert_eq!(ContractMember::Validate.arity(), 1);
    }

    #[test]
    fn test_standard_registry() {
        let registry = CapabilityRegistry::standard();
        let props = registry.properties_of(EXTENDED_PROPERTIES).unwrap();
        let names: Vec<_> = props.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["RowId", "IsNew", "IsEditMode", "IsSelected"]);

        let view_model = registry.resolve(VIEW_MODEL_INTERFACE).unwrap();
        assert_eq!(view_model.methods.len(), ContractMember::ALL.len());
        assert!(view_model.is_interface());
    }

    #[test]
    fn test_unknown_interface_is_schema_error() {
        let registry = CapabilityRegistry::standard();
        let err = registry.resolve("IMissing").unwrap_err();
        assert!(matches!(err, Error::SchemaValidation { .. }));
    }
}
