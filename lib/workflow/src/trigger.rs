//! Workflow triggers and the forms they and user tasks present.

use crate::binding::Binding;
use amber_lantern_mapping::{BeanType, TypeMappingBuilder, json_bean, polymorphic};
use serde_json::Value;

/// A form shown to a person.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Form {
    pub description: Option<String>,
    pub fields: Vec<FormField>,
}

/// One input on a form, bound to a process value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormField {
    pub id: Option<String>,
    pub name: Option<String>,
    pub binding: Option<Binding<Value>>,
    pub readonly: Option<bool>,
    pub required: Option<bool>,
}

impl Form {
    #[must_use]
    pub fn with_field(mut self, field: FormField) -> Self {
        self.fields.push(field);
        self
    }
}

impl BeanType for Form {
    fn describe(fields: &mut TypeMappingBuilder<Self>) {
        fields
            .field("description", |f| &f.description, |f| &mut f.description)
            .field("fields", |f| &f.fields, |f| &mut f.fields);
    }
}

impl BeanType for FormField {
    fn describe(fields: &mut TypeMappingBuilder<Self>) {
        fields
            .field("id", |f| &f.id, |f| &mut f.id)
            .field("name", |f| &f.name, |f| &mut f.name)
            .field("binding", |f| &f.binding, |f| &mut f.binding)
            .field("readonly", |f| &f.readonly, |f| &mut f.readonly)
            .field("required", |f| &f.required, |f| &mut f.required);
    }
}

/// Starts a workflow when a form is submitted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormTrigger {
    pub form: Option<Form>,
}

/// Starts a workflow when a named message arrives.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageTrigger {
    pub message: Option<String>,
}

impl BeanType for FormTrigger {
    fn describe(fields: &mut TypeMappingBuilder<Self>) {
        fields.field("form", |t| &t.form, |t| &mut t.form);
    }
}

impl BeanType for MessageTrigger {
    fn describe(fields: &mut TypeMappingBuilder<Self>) {
        fields.field("message", |t| &t.message, |t| &mut t.message);
    }
}

json_bean!(Form, FormField, FormTrigger, MessageTrigger);

polymorphic! {
    /// How a workflow is started.
    #[derive(Debug, Clone, PartialEq)]
    pub enum Trigger {
        Form(FormTrigger) = "form",
        Message(MessageTrigger) = "message",
    }
}
