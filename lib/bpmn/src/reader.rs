//! Reads BPMN documents into workflows.
//!
//! A [`BpmnReader`] walks a parsed [`XmlDocument`] with a cursor on the
//! element being read. Everything it understands is recorded in a
//! [`Consumption`]; whatever is left of an activity, transition, process or
//! of the definitions is stored on the model as residue so the writer can
//! put it back.

use crate::config::{BpmnConfig, UnmatchedElementPolicy};
use crate::diagram;
use crate::error::BpmnError;
use crate::json::{from_json_text, instantiate};
use crate::model::{BpmnMapped, read_trigger};
use crate::rules::{BPMN_NS, BPMNDI_NS, EFFEKTIF_NS};
use amber_lantern_core::Result;
use amber_lantern_mapping::{BpmnGuard, BpmnTypeMapping, JsonMapped, Polymorphic, TypeRegistry};
use amber_lantern_workflow::{Activity, Binding, DataType, Scope, Timer, Transition, Variable, Workflow};
use amber_lantern_xml::{Consumption, XmlDocument, XmlElement, XmlNodeId};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::mem;
use tracing::{debug, warn};

/// Cursor over one document. Create a new reader per document.
pub struct BpmnReader<'a> {
    registry: &'a TypeRegistry,
    config: &'a BpmnConfig,
    document: &'a XmlDocument,
    consumption: Consumption,
    current: XmlNodeId,
    /// Timers found on boundary events, per open scope.
    timers: Vec<Vec<Timer>>,
}

impl<'a> BpmnReader<'a> {
    #[must_use]
    pub fn new(registry: &'a TypeRegistry, config: &'a BpmnConfig, document: &'a XmlDocument) -> Self {
        Self {
            registry,
            config,
            document,
            consumption: Consumption::default(),
            current: document.root(),
            timers: Vec::new(),
        }
    }

    #[must_use]
    pub fn registry(&self) -> &'a TypeRegistry {
        self.registry
    }

    #[must_use]
    pub fn document(&self) -> &'a XmlDocument {
        self.document
    }

    /// The element being read.
    #[must_use]
    pub fn current(&self) -> XmlNodeId {
        self.current
    }

    /// Makes `element` current while `read` runs. The element is entered,
    /// so parts `read` leaves alone survive as residue.
    pub fn with_element<T>(
        &mut self,
        element: XmlNodeId,
        read: impl FnOnce(&mut Self) -> Result<T, BpmnError>,
    ) -> Result<T, BpmnError> {
        self.consumption.enter(element);
        let previous = mem::replace(&mut self.current, element);
        let result = read(self);
        self.current = previous;
        result
    }

    /// Marks `element` and everything below it as read.
    pub fn claim(&mut self, element: XmlNodeId) {
        self.consumption.claim(element);
    }

    /// The unconsumed part of `element`, if anything is left.
    #[must_use]
    pub fn residue(&self, element: XmlNodeId) -> Option<XmlElement> {
        let rest = self.document.remainder(element, &self.consumption);
        (!rest.is_empty()).then_some(rest)
    }

    /// Local name and id of the current element, for error messages.
    #[must_use]
    pub fn describe_current(&self) -> String {
        let name = &self.document.name(self.current).local;
        match self.document.attribute(self.current, None, "id") {
            Some((_, id)) => format!("{name} '{id}'"),
            None => name.clone(),
        }
    }

    /// Consumes an unqualified attribute of the current element.
    pub fn attribute(&mut self, local: &str) -> Option<String> {
        self.attribute_in(None, local)
    }

    /// Consumes an `e:` attribute of the current element.
    pub fn extension_attribute(&mut self, local: &str) -> Option<String> {
        self.attribute_in(Some(EFFEKTIF_NS), local)
    }

    fn attribute_in(&mut self, namespace: Option<&str>, local: &str) -> Option<String> {
        let document = self.document;
        let (index, value) = document.attribute(self.current, namespace, local)?;
        self.consumption.consume_attribute(self.current, index);
        Some(value.to_string())
    }

    /// # Errors
    ///
    /// Returns [`BpmnError::InvalidValue`] unless the value is `true` or
    /// `false`.
    pub fn bool_attribute(&mut self, local: &str) -> Result<Option<bool>, BpmnError> {
        match self.attribute(local) {
            None => Ok(None),
            Some(value) => match value.as_str() {
                "true" => Ok(Some(true)),
                "false" => Ok(Some(false)),
                _ => Err(self.invalid("true or false", value)),
            },
        }
    }

    /// An error for a value of the current element that does not parse.
    #[must_use]
    pub fn invalid(&self, expected: &str, value: impl Into<String>) -> rootcause::Report<BpmnError> {
        BpmnError::InvalidValue {
            element: self.describe_current(),
            expected: expected.to_string(),
            value: value.into(),
        }
        .into()
    }

    /// Consumes the text of the current element.
    pub fn text(&mut self) -> Option<String> {
        let text = self.document.text(self.current)?;
        self.consumption.consume_text(self.current);
        Some(text.value.clone())
    }

    /// First child of the current element with the given name.
    #[must_use]
    pub fn child(&self, namespace: &str, local: &str) -> Option<XmlNodeId> {
        self.document.child(self.current, namespace, local)
    }

    #[must_use]
    pub fn children(&self, namespace: &str, local: &str) -> Vec<XmlNodeId> {
        self.document
            .children_named(self.current, namespace, local)
            .collect()
    }

    /// Claims the first matching child and returns its text, empty if the
    /// child has none.
    pub fn child_text(&mut self, namespace: &str, local: &str) -> Option<String> {
        let child = self.child(namespace, local)?;
        self.claim(child);
        Some(text_of(self.document, child))
    }

    pub fn documentation(&mut self) -> Option<String> {
        self.child_text(BPMN_NS, "documentation")
    }

    /// Children of the current element's `extensionElements`, which is
    /// entered.
    pub fn extension_children(&mut self) -> Vec<XmlNodeId> {
        let Some(extensions) = self.child(BPMN_NS, "extensionElements") else {
            return Vec::new();
        };
        self.consumption.enter(extensions);
        self.document.children(extensions).to_vec()
    }

    /// `e:local` elements in the current element's `extensionElements`.
    pub fn extensions(&mut self, local: &str) -> Vec<XmlNodeId> {
        let document = self.document;
        self.extension_children()
            .into_iter()
            .filter(|id| document.is(*id, EFFEKTIF_NS, local))
            .collect()
    }

    /// Claims the first `e:local` extension and returns its text.
    pub fn extension_text(&mut self, local: &str) -> Option<String> {
        let id = self.extensions(local).into_iter().next()?;
        self.claim(id);
        Some(text_of(self.document, id))
    }

    /// Claims every `e:local` extension and returns their texts.
    pub fn extension_texts(&mut self, local: &str) -> Vec<String> {
        self.extensions(local)
            .into_iter()
            .map(|id| {
                self.claim(id);
                text_of(self.document, id)
            })
            .collect()
    }

    /// # Errors
    ///
    /// Returns an error if the binding value or type does not parse.
    pub fn extension_binding<T: JsonMapped>(
        &mut self,
        local: &str,
    ) -> Result<Option<Binding<T>>, BpmnError> {
        match self.extensions(local).into_iter().next() {
            Some(id) => self.read_binding(id).map(Some),
            None => Ok(None),
        }
    }

    /// # Errors
    ///
    /// Returns an error if a binding value or type does not parse.
    pub fn extension_bindings<T: JsonMapped>(
        &mut self,
        local: &str,
    ) -> Result<Vec<Binding<T>>, BpmnError> {
        self.extensions(local)
            .into_iter()
            .map(|id| self.read_binding(id))
            .collect()
    }

    /// Claims `element` and reads it as a binding: a JSON `value`, an
    /// `expression` and a data `type`.
    ///
    /// # Errors
    ///
    /// Returns an error if the value does not fit `T` or the type is unknown.
    pub fn read_binding<T: JsonMapped>(&mut self, element: XmlNodeId) -> Result<Binding<T>, BpmnError> {
        self.claim(element);
        self.with_element(element, |reader| {
            let registry = reader.registry;
            let mut binding = Binding::default();
            if let Some(value) = reader.attribute("value") {
                binding.value = Some(from_json_text(registry, &value)?);
            }
            binding.expression = reader.attribute("expression");
            if let Some(data_type) = reader.attribute("type") {
                binding.data_type = Some(if data_type.trim_start().starts_with('{') {
                    from_json_text::<DataType>(registry, &data_type)?
                } else {
                    instantiate::<DataType>(registry, &data_type)?
                });
            }
            Ok(binding)
        })
    }

    /// `e:property` extensions with a `key`, as a JSON map.
    ///
    /// # Errors
    ///
    /// Returns an error if a property value cannot be read.
    pub fn extension_properties(&mut self) -> Result<Map<String, Value>, BpmnError> {
        let mut properties = Map::new();
        for id in self.extensions("property") {
            let (key, value) =
                self.with_element(id, |reader| Ok((reader.attribute("key"), reader.attribute("value"))))?;
            let Some(key) = key else {
                continue;
            };
            self.claim(id);
            let value = match value {
                Some(text) => from_json_text::<Value>(self.registry, &text)?,
                None => Value::Null,
            };
            properties.insert(key, value);
        }
        Ok(properties)
    }

    /// Picks the rule for `element` among the variants of `B`.
    ///
    /// A single candidate always wins. Among several, the first one whose
    /// guard matches wins, then the first unguarded one; failing both, the
    /// configured policy either rejects the element or leaves it unparsed.
    ///
    /// # Errors
    ///
    /// Returns [`BpmnError::AmbiguousElement`] under the reject policy.
    pub fn select<B: Polymorphic>(
        &self,
        element: XmlNodeId,
    ) -> Result<Option<&'a BpmnTypeMapping>, BpmnError> {
        let registry = self.registry;
        let name = self.document.name(element);
        let namespace = name.namespace.as_deref().unwrap_or_default();
        let candidates = registry.bpmn_candidates::<B>(namespace, &name.local);
        match candidates {
            [] => Ok(None),
            [only] => Ok(Some(only)),
            many => {
                let chosen = many
                    .iter()
                    .find(|rule| rule.guard().is_some_and(|guard| self.guard_matches(element, guard)))
                    .or_else(|| many.iter().find(|rule| rule.guard().is_none()));
                if chosen.is_some() {
                    return Ok(chosen);
                }
                let id = self
                    .document
                    .attribute(element, None, "id")
                    .map(|(_, id)| id.to_string());
                match self.config.unmatched_elements {
                    UnmatchedElementPolicy::Reject => Err(BpmnError::AmbiguousElement {
                        element: name.local.clone(),
                        id,
                        candidates: many.iter().map(|rule| rule.discriminator().to_string()).collect(),
                    }
                    .into()),
                    UnmatchedElementPolicy::LeaveUnparsed => {
                        warn!(element = %name, id = ?id, "no guard matched, leaving element unparsed");
                        Ok(None)
                    }
                }
            }
        }
    }

    fn guard_matches(&self, element: XmlNodeId, guard: &BpmnGuard) -> bool {
        match guard {
            BpmnGuard::Attribute {
                namespace,
                local,
                value,
            } => self
                .document
                .attribute(element, Some(namespace), local)
                .is_some_and(|(_, actual)| actual == value),
            BpmnGuard::Child { namespace, local } => {
                self.document.child(element, namespace, local).is_some()
            }
        }
    }

    /// The guard attribute is part of the type, not residue.
    fn consume_guard(&mut self, element: XmlNodeId, rule: &BpmnTypeMapping) {
        if let Some(BpmnGuard::Attribute {
            namespace,
            local,
            value,
        }) = rule.guard()
        {
            if let Some((index, actual)) = self.document.attribute(element, Some(namespace), local) {
                if actual == value {
                    self.consumption.consume_attribute(element, index);
                }
            }
        }
    }

    /// Reads `element` as the activity type `rule` names.
    ///
    /// # Errors
    ///
    /// Returns an error if the element content does not parse.
    pub fn read_activity(
        &mut self,
        element: XmlNodeId,
        rule: &BpmnTypeMapping,
    ) -> Result<Activity, BpmnError> {
        let mut activity = instantiate::<Activity>(self.registry, rule.discriminator())?;
        self.claim(element);
        self.consume_guard(element, rule);
        self.with_element(element, |reader| activity.read_bpmn(reader))?;
        activity.base_mut().bpmn = self.residue(element);
        Ok(activity)
    }

    /// Reads `element` as the timer type `rule` names.
    ///
    /// # Errors
    ///
    /// Returns an error if the element content does not parse.
    pub fn read_timer(&mut self, element: XmlNodeId, rule: &BpmnTypeMapping) -> Result<Timer, BpmnError> {
        let mut timer = instantiate::<Timer>(self.registry, rule.discriminator())?;
        self.claim(element);
        self.consume_guard(element, rule);
        self.with_element(element, |reader| timer.read_bpmn(reader))?;
        Ok(timer)
    }

    /// Hands a boundary event timer to the scope being read.
    pub fn push_timer(&mut self, timer: Timer) {
        match self.timers.last_mut() {
            Some(frame) => frame.push(timer),
            None => warn!(timer = ?timer.base().id, "timer outside any scope dropped"),
        }
    }

    /// Reads the flow elements and variables of the current element.
    ///
    /// # Errors
    ///
    /// Returns the first error of any contained element.
    pub fn read_scope(&mut self, scope: &mut Scope) -> Result<(), BpmnError> {
        self.timers.push(Vec::new());
        let result = self.read_scope_content(scope);
        scope.timers.extend(self.timers.pop().unwrap_or_default());
        result
    }

    fn read_scope_content(&mut self, scope: &mut Scope) -> Result<(), BpmnError> {
        let document = self.document;
        for &child in document.children(self.current) {
            if document.is(child, BPMN_NS, "sequenceFlow") {
                let mut transition = Transition::default();
                self.claim(child);
                self.with_element(child, |reader| transition.read_bpmn(reader))?;
                transition.bpmn = self.residue(child);
                scope.transitions.push(transition);
            } else if let Some(rule) = self.select::<Activity>(child)? {
                let activity = self.read_activity(child, rule)?;
                scope.activities.push(activity);
            }
        }
        for id in self.extensions("variable") {
            let mut variable = Variable::default();
            self.claim(id);
            self.with_element(id, |reader| variable.read_bpmn(reader))?;
            scope.variables.push(variable);
        }
        Ok(())
    }

    /// Reads the whole document: the first process, the first diagram and
    /// the residue of the definitions.
    ///
    /// # Errors
    ///
    /// Returns [`BpmnError::MissingProcess`] if the document element is not
    /// BPMN definitions with a process, or the first error of any element.
    pub fn read_workflow(mut self) -> Result<Workflow, BpmnError> {
        let document = self.document;
        let root = document.root();
        let process = document
            .is(root, BPMN_NS, "definitions")
            .then(|| document.child(root, BPMN_NS, "process"))
            .flatten()
            .ok_or(BpmnError::MissingProcess)?;

        let mut workflow = Workflow::default();
        self.consumption.enter(root);
        self.claim(process);
        self.with_element(process, |reader| reader.read_process(&mut workflow))?;
        workflow.scope.bpmn = self.residue(process);

        attach_timers(&mut workflow.scope);
        let dropped = drop_dangling_transitions(&mut workflow.scope);

        if let Some(element) = document.child(root, BPMNDI_NS, "BPMNDiagram") {
            workflow.diagram = Some(diagram::read_diagram(
                document,
                &mut self.consumption,
                element,
                &workflow,
                &dropped,
            )?);
        }
        workflow.bpmn_definitions = Some(document.remainder(root, &self.consumption));
        Ok(workflow)
    }

    fn read_process(&mut self, workflow: &mut Workflow) -> Result<(), BpmnError> {
        workflow.source_workflow_id = self.attribute("id");
        workflow.name = self.attribute("name");
        workflow.description = self.documentation();
        if let Some(id) = self.extensions("trigger").into_iter().next() {
            workflow.trigger = self.with_element(id, read_trigger)?;
            if workflow.trigger.is_some() {
                self.claim(id);
            }
        }
        workflow.properties = self.extension_properties()?;
        self.read_scope(&mut workflow.scope)
    }
}

fn text_of(document: &XmlDocument, element: XmlNodeId) -> String {
    document
        .text(element)
        .map(|text| text.value.clone())
        .unwrap_or_default()
}

/// Moves each scope timer onto the activity it is attached to, when that
/// activity is in the same scope.
fn attach_timers(scope: &mut Scope) {
    scope.visit_scopes_mut(&mut |scope| {
        for timer in mem::take(&mut scope.timers) {
            let target = timer.base().attached_activity_id.clone();
            match target.as_deref().and_then(|id| scope.activity_mut(id)) {
                Some(activity) => activity.base_mut().timers.push(timer),
                None => scope.timers.push(timer),
            }
        }
    });
}

/// Removes transitions whose source or target is not an activity of the
/// workflow, returning the ids of the removed ones.
fn drop_dangling_transitions(scope: &mut Scope) -> HashSet<String> {
    let known = scope.all_activity_ids();
    let mut dropped = HashSet::new();
    scope.visit_scopes_mut(&mut |scope| {
        scope.transitions.retain(|transition| {
            let resolves = |end: &Option<String>| end.as_ref().is_some_and(|id| known.contains(id));
            let keep = resolves(&transition.from_id) && resolves(&transition.to_id);
            if !keep {
                debug!(
                    transition = ?transition.id,
                    from = ?transition.from_id,
                    to = ?transition.to_id,
                    "dropping transition with unknown endpoint"
                );
                if let Some(id) = &transition.id {
                    dropped.insert(id.clone());
                }
            }
            keep
        });
    });
    dropped
}
