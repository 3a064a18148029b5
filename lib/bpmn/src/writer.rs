//! Writes workflows as BPMN element trees.
//!
//! The writer keeps a stack of open elements. A finished element is
//! inserted as the *first* child of its parent, ahead of any residue the
//! parent was started from, so content is written back to front: the last
//! child is written first.

use crate::config::BpmnConfig;
use crate::diagram;
use crate::error::BpmnError;
use crate::json::{to_json, to_json_text};
use crate::model::{BpmnMapped, write_trigger};
use crate::rules::{BPMN_NS, EFFEKTIF_NS, default_namespaces};
use amber_lantern_core::Result;
use amber_lantern_mapping::{BpmnGuard, JsonMapped, Polymorphic, TypeRegistry};
use amber_lantern_workflow::{Activity, Binding, DataType, Scope, Timer, Workflow};
use amber_lantern_xml::{XmlElement, XmlName, XmlText};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::mem;
use tracing::debug;

/// Builds one BPMN element tree.
pub struct BpmnWriter<'a> {
    registry: &'a TypeRegistry,
    current: XmlElement,
    parents: Vec<XmlElement>,
    /// Boundary event id to its timers, per open scope.
    timers: Vec<BTreeMap<String, Vec<Timer>>>,
}

impl<'a> BpmnWriter<'a> {
    #[must_use]
    pub fn new(registry: &'a TypeRegistry, root: XmlElement) -> Self {
        Self {
            registry,
            current: root,
            parents: Vec::new(),
            timers: Vec::new(),
        }
    }

    #[must_use]
    pub fn registry(&self) -> &'a TypeRegistry {
        self.registry
    }

    /// Opens a child element, starting from `residue` when there is one.
    pub fn start_element(&mut self, namespace: &str, local: &str, residue: Option<&XmlElement>) {
        let name = XmlName::new(namespace, local);
        let element = match residue {
            Some(residue) => XmlElement {
                name,
                ..residue.clone()
            },
            None => XmlElement::new(name),
        };
        self.parents.push(mem::replace(&mut self.current, element));
    }

    /// Opens a child that the current element may already hold, from a
    /// residue or an earlier write, and continues it.
    pub fn start_merged(&mut self, namespace: &str, local: &str) {
        let element = self
            .current
            .take_child(Some(namespace), local)
            .unwrap_or_else(|| XmlElement::new(XmlName::new(namespace, local)));
        self.parents.push(mem::replace(&mut self.current, element));
    }

    /// Closes the current element, inserting it first in its parent.
    pub fn end_element(&mut self) {
        if let Some(child) = self.pop() {
            self.current.insert_child_first(child);
        }
    }

    /// Closes the current element, appending it to its parent.
    pub fn end_element_last(&mut self) {
        if let Some(child) = self.pop() {
            self.current.push_child(child);
        }
    }

    /// Closes an element opened with [`BpmnWriter::start_merged`], dropping
    /// it if nothing was written into it.
    pub fn end_merged(&mut self) {
        if let Some(child) = self.pop() {
            if !child.is_empty() {
                self.current.insert_child_first(child);
            }
        }
    }

    fn pop(&mut self) -> Option<XmlElement> {
        let parent = self.parents.pop()?;
        Some(mem::replace(&mut self.current, parent))
    }

    /// Closes any open elements and returns the root.
    #[must_use]
    pub fn finish(mut self) -> XmlElement {
        while !self.parents.is_empty() {
            self.end_element();
        }
        self.current
    }

    pub fn attribute(&mut self, local: &str, value: Option<&str>) {
        if let Some(value) = value {
            self.current.set_attribute(XmlName::unqualified(local), value);
        }
    }

    /// Sets an attribute the current element does not have yet, such as one
    /// its residue already carries.
    pub fn default_attribute(&mut self, local: &str, value: Option<&str>) {
        if self.current.attribute(None, local).is_none() {
            self.attribute(local, value);
        }
    }

    pub fn attribute_in(&mut self, namespace: &str, local: &str, value: &str) {
        self.current.set_attribute(XmlName::new(namespace, local), value);
    }

    pub fn bool_attribute(&mut self, local: &str, value: Option<bool>) {
        if let Some(value) = value {
            self.attribute(local, Some(if value { "true" } else { "false" }));
        }
    }

    pub fn number_attribute(&mut self, local: &str, value: f64) {
        self.attribute(local, Some(&value.to_string()));
    }

    pub fn text(&mut self, value: &str) {
        self.current.set_text(XmlText::plain(value));
    }

    /// Writes `<namespace:local>value</namespace:local>` if there is a value.
    pub fn text_element(&mut self, namespace: &str, local: &str, value: Option<&str>) {
        if let Some(value) = value {
            self.start_element(namespace, local, None);
            self.text(value);
            self.end_element();
        }
    }

    pub fn documentation(&mut self, value: Option<&str>) {
        self.text_element(BPMN_NS, "documentation", value);
    }

    /// Runs `write` inside the current element's `extensionElements`.
    ///
    /// # Errors
    ///
    /// Returns the error of `write`.
    pub fn extensions(
        &mut self,
        write: impl FnOnce(&mut Self) -> Result<(), BpmnError>,
    ) -> Result<(), BpmnError> {
        self.start_merged(BPMN_NS, "extensionElements");
        let result = write(self);
        self.end_merged();
        result
    }

    pub fn extension_text(&mut self, local: &str, value: Option<&str>) {
        self.text_element(EFFEKTIF_NS, local, value);
    }

    /// # Errors
    ///
    /// Returns an error if the value or data type cannot be converted.
    pub fn binding<T: JsonMapped>(&mut self, local: &str, binding: &Binding<T>) -> Result<(), BpmnError> {
        self.keyed_binding(local, None, binding)
    }

    /// Writes a binding element with an extra `key` attribute.
    ///
    /// # Errors
    ///
    /// Returns an error if the value or data type cannot be converted.
    pub fn keyed_binding<T: JsonMapped>(
        &mut self,
        local: &str,
        key: Option<&str>,
        binding: &Binding<T>,
    ) -> Result<(), BpmnError> {
        self.start_element(EFFEKTIF_NS, local, None);
        self.attribute("key", key);
        if let Some(value) = &binding.value {
            let text = to_json_text(self.registry, value)?;
            self.attribute("value", Some(&text));
        }
        self.attribute("expression", binding.expression.as_deref());
        if let Some(data_type) = &binding.data_type {
            let text = self.data_type_text(data_type)?;
            self.attribute("type", Some(&text));
        }
        self.end_element();
        Ok(())
    }

    /// Writes bindings so they appear in list order.
    ///
    /// # Errors
    ///
    /// Returns the first binding error.
    pub fn bindings<T: JsonMapped>(&mut self, local: &str, bindings: &[Binding<T>]) -> Result<(), BpmnError> {
        for binding in bindings.iter().rev() {
            self.binding(local, binding)?;
        }
        Ok(())
    }

    /// A data type without parameters is written as its name, any other as
    /// JSON.
    fn data_type_text(&self, data_type: &DataType) -> Result<String, BpmnError> {
        let json = to_json(self.registry, data_type)?;
        Ok(match &json {
            Value::Object(fields) if fields.len() == 1 => data_type.type_name().to_string(),
            _ => json.to_string(),
        })
    }

    /// Writes `e:property` elements in map order.
    pub fn properties(&mut self, properties: &Map<String, Value>) {
        for (key, value) in properties.iter().rev() {
            self.start_element(EFFEKTIF_NS, "property", None);
            self.attribute("key", Some(key));
            self.attribute("value", Some(&value.to_string()));
            self.end_element();
        }
    }

    /// Writes an activity as the element its type is registered with.
    ///
    /// # Errors
    ///
    /// Returns [`BpmnError::UnregisteredType`] if the activity type has no
    /// BPMN element, or the first error of its content.
    pub fn write_activity(&mut self, activity: &Activity) -> Result<(), BpmnError> {
        let registry = self.registry;
        let rule = registry
            .bpmn_type_mapping::<Activity>(activity.type_name())
            .map_err(|e| {
                e.context(BpmnError::UnregisteredType {
                    type_name: format!("Activity::{}", activity.type_name()),
                })
            })?;
        let element = rule.element();
        self.start_element(&element.namespace, &element.local, activity.base().bpmn.as_ref());
        if let Some(BpmnGuard::Attribute {
            namespace,
            local,
            value,
        }) = rule.guard()
        {
            self.attribute_in(namespace, local, value);
        }
        activity.write_bpmn(self)?;
        self.end_element();
        Ok(())
    }

    /// Writes a timer as a `timerEventDefinition`.
    ///
    /// # Errors
    ///
    /// Returns [`BpmnError::UnregisteredType`] if the timer type has no BPMN
    /// element.
    pub fn write_timer(&mut self, timer: &Timer) -> Result<(), BpmnError> {
        let registry = self.registry;
        let rule = registry
            .bpmn_type_mapping::<Timer>(timer.type_name())
            .map_err(|e| {
                e.context(BpmnError::UnregisteredType {
                    type_name: format!("Timer::{}", timer.type_name()),
                })
            })?;
        let element = rule.element();
        self.start_element(&element.namespace, &element.local, None);
        timer.write_bpmn(self)?;
        self.end_element();
        Ok(())
    }

    /// Takes the timers of boundary event `event_id` in the open scope.
    pub fn take_boundary_timers(&mut self, event_id: &str) -> Vec<Timer> {
        self.timers
            .last_mut()
            .and_then(|frame| frame.remove(event_id))
            .unwrap_or_default()
    }

    /// Writes the flow elements and variables of `scope` into the current
    /// element.
    ///
    /// Timers go into the boundary event they came from; timers whose
    /// boundary event is not in the scope get a new one.
    ///
    /// # Errors
    ///
    /// Returns the first error of any contained element.
    pub fn write_scope(&mut self, scope: &Scope) -> Result<(), BpmnError> {
        self.timers.push(scope_timers(scope));
        let result = self.write_scope_content(scope);
        let orphans = self.timers.pop().unwrap_or_default();
        result?;
        for (event_id, timers) in orphans.iter().rev() {
            self.start_element(BPMN_NS, "boundaryEvent", None);
            self.attribute("id", Some(event_id));
            let attached = timers.iter().find_map(|t| t.base().attached_activity_id.as_deref());
            self.attribute("attachedToRef", attached);
            for timer in timers.iter().rev() {
                self.write_timer(timer)?;
            }
            self.end_element();
        }
        if !scope.variables.is_empty() {
            self.extensions(|writer| {
                for variable in scope.variables.iter().rev() {
                    variable.write_bpmn(writer)?;
                }
                Ok(())
            })?;
        }
        Ok(())
    }

    fn write_scope_content(&mut self, scope: &Scope) -> Result<(), BpmnError> {
        for transition in scope.transitions.iter().rev() {
            transition.write_bpmn(self)?;
        }
        for activity in scope.activities.iter().rev() {
            self.write_activity(activity)?;
        }
        Ok(())
    }
}

/// Timers of a scope and of its activities, by boundary event id.
fn scope_timers(scope: &Scope) -> BTreeMap<String, Vec<Timer>> {
    let mut by_event: BTreeMap<String, Vec<Timer>> = BTreeMap::new();
    let activity_timers = scope.activities.iter().flat_map(|a| a.base().timers.iter());
    for timer in activity_timers.chain(scope.timers.iter()) {
        let base = timer.base();
        let event_id = base
            .boundary_event_id
            .clone()
            .or_else(|| base.id.as_ref().map(|id| format!("{id}Event")));
        match event_id {
            Some(event_id) => by_event.entry(event_id).or_default().push(timer.clone()),
            None => debug!(attached = ?base.attached_activity_id, "timer without id not written"),
        }
    }
    by_event
}

/// Writes `workflow` as a BPMN `definitions` element.
///
/// Starts from the definitions residue when the workflow was read from BPMN.
/// The default namespaces are declared for any URI the residue does not
/// bind, unless the prefix is taken.
///
/// # Errors
///
/// Returns the first error of any element.
pub fn write_workflow(
    registry: &TypeRegistry,
    config: &BpmnConfig,
    workflow: &Workflow,
) -> Result<XmlElement, BpmnError> {
    let name = XmlName::new(BPMN_NS, "definitions");
    let mut definitions = match &workflow.bpmn_definitions {
        Some(residue) => XmlElement {
            name,
            ..residue.clone()
        },
        None => {
            let mut definitions = XmlElement::new(name);
            definitions.set_attribute(XmlName::unqualified("targetNamespace"), EFFEKTIF_NS);
            definitions
        }
    };
    for namespace in default_namespaces() {
        let bound = definitions
            .namespaces
            .iter()
            .any(|d| d.uri == namespace.uri || d.prefix == namespace.prefix);
        if !bound {
            definitions.declare_namespace(namespace);
        }
    }

    let process_id = workflow
        .source_workflow_id
        .clone()
        .or_else(|| workflow.id.as_ref().map(ToString::to_string));

    let mut writer = BpmnWriter::new(registry, definitions);
    if config.write_diagram {
        if let Some(diagram) = &workflow.diagram {
            diagram::write_diagram(&mut writer, diagram, process_id.as_deref());
        }
    }

    writer.start_element(BPMN_NS, "process", workflow.scope.bpmn.as_ref());
    writer.attribute("id", process_id.as_deref());
    writer.attribute("name", workflow.name.as_deref());
    writer.write_scope(&workflow.scope)?;
    writer.extensions(|writer| {
        writer.properties(&workflow.properties);
        if let Some(trigger) = &workflow.trigger {
            write_trigger(writer, trigger)?;
        }
        Ok(())
    })?;
    writer.documentation(workflow.description.as_deref());
    writer.end_element();
    Ok(writer.finish())
}
