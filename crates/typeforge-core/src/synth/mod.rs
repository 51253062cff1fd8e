//! Type synthesis backends.
//!
//! Two mutually exclusive paths lead from a translated schema to something
//! the driver can compile:
//!
//! - [`SourceSynthesizer`] renders type definitions as source text, which the
//!   driver parses back.
//! - [`MetadataEmitter`] builds type definitions directly from descriptors,
//!   lowering statement text with [`StatementLowering`].
//!
//! Both share [`TypeLayout`], so the capability contract is described once.

mod layout;
mod lowering;
mod metadata;
mod source;

pub use layout::{EVENT_HANDLER_TYPE, TypeLayout, view_model_constructors};
pub use lowering::{StatementLowering, lower_statements};
pub use metadata::{
    FieldDescriptor, MetadataEmitter, MethodDescriptor, PropertyDescriptor, TypeDescriptor,
};
pub use source::{
    BRANCH_MACRO, SourceSynthesizer, TYPE_ATTRIBUTE, field_type, param_type, render_literal,
    return_type,
};
