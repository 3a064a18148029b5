//! BPMN encoding of each model type.
//!
//! Standard BPMN covers ids, names, documentation, flows, scripts, called
//! processes, boundary events and timers. Everything else lives in
//! `extensionElements` as elements of the `e:` namespace:
//!
//! ```xml
//! <bpmn:userTask id="approve" name="Approve">
//!   <bpmn:extensionElements>
//!     <e:taskName>Approve {{amount}}</e:taskName>
//!     <e:assignee expression="requester.manager"/>
//!   </bpmn:extensionElements>
//! </bpmn:userTask>
//! ```
//!
//! Writers run back to front (see [`crate::writer`]), so each
//! `write_bpmn` emits its last child first.

use crate::error::BpmnError;
use crate::json::{from_json_text, instantiate, is_variant, to_json_text};
use crate::reader::BpmnReader;
use crate::rules::{BPMN_NS, EFFEKTIF_NS};
use crate::writer::BpmnWriter;
use amber_lantern_core::{Result, WorkflowId};
use amber_lantern_mapping::{JsonEnum, Polymorphic};
use amber_lantern_workflow::activity::{
    Activity, ActivityBase, BoundaryEvent, Call, EmailTask, EmbeddedSubprocess, EndEvent,
    ExclusiveGateway, HttpMethod, HttpServiceTask, InclusiveGateway, JavaServiceTask,
    MultiInstance, NoneEvent, NoneTask, ParallelGateway, ReceiveTask, Script, ScriptTask,
    StartEvent, UserTask,
};
use amber_lantern_workflow::condition::Condition;
use amber_lantern_workflow::data_type::{ChoiceOption, DataType};
use amber_lantern_workflow::timer::{CycleTimer, DateTimer, DurationTimer, Timer, TimerBase};
use amber_lantern_workflow::trigger::{Form, FormField, FormTrigger, MessageTrigger, Trigger};
use amber_lantern_workflow::{Binding, Transition, Variable};
use amber_lantern_xml::XmlNodeId;
use serde_json::Value;

/// A model type with a BPMN encoding.
///
/// `read_bpmn` runs with the type's element current in the reader;
/// `write_bpmn` with it open in the writer.
pub trait BpmnMapped {
    /// # Errors
    ///
    /// Returns an error if the element content does not parse.
    fn read_bpmn(&mut self, reader: &mut BpmnReader<'_>) -> Result<(), BpmnError>;

    /// # Errors
    ///
    /// Returns an error if a value cannot be converted.
    fn write_bpmn(&self, writer: &mut BpmnWriter<'_>) -> Result<(), BpmnError>;
}

fn read_base(base: &mut ActivityBase, reader: &mut BpmnReader<'_>) -> Result<(), BpmnError> {
    base.id = reader.attribute("id");
    base.name = reader.attribute("name");
    base.default_transition_id = reader.attribute("default");
    base.description = reader.documentation();
    if let Some(element) = reader.child(BPMN_NS, "multiInstanceLoopCharacteristics") {
        let mut multi_instance = MultiInstance::default();
        reader.with_element(element, |reader| multi_instance.read_bpmn(reader))?;
        base.multi_instance = Some(multi_instance);
    }
    base.properties = reader.extension_properties()?;
    Ok(())
}

fn write_base(base: &ActivityBase, writer: &mut BpmnWriter<'_>) -> Result<(), BpmnError> {
    writer.attribute("id", base.id.as_deref());
    writer.attribute("name", base.name.as_deref());
    writer.attribute("default", base.default_transition_id.as_deref());
    if let Some(multi_instance) = &base.multi_instance {
        writer.start_merged(BPMN_NS, "multiInstanceLoopCharacteristics");
        let result = multi_instance.write_bpmn(writer);
        writer.end_element();
        result?;
    }
    writer.extensions(|writer| {
        writer.properties(&base.properties);
        Ok(())
    })?;
    writer.documentation(base.description.as_deref());
    Ok(())
}

impl BpmnMapped for MultiInstance {
    fn read_bpmn(&mut self, reader: &mut BpmnReader<'_>) -> Result<(), BpmnError> {
        self.sequential = reader.bool_attribute("isSequential")?;
        for id in reader.extensions("variable") {
            let mut variable = Variable::default();
            reader.claim(id);
            reader.with_element(id, |reader| variable.read_bpmn(reader))?;
            self.variables.push(variable);
        }
        self.values = reader.extension_bindings("value")?;
        Ok(())
    }

    fn write_bpmn(&self, writer: &mut BpmnWriter<'_>) -> Result<(), BpmnError> {
        writer.bool_attribute("isSequential", self.sequential);
        writer.extensions(|writer| {
            writer.bindings("value", &self.values)?;
            for variable in self.variables.iter().rev() {
                variable.write_bpmn(writer)?;
            }
            Ok(())
        })
    }
}

macro_rules! base_only {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl BpmnMapped for $ty {
                fn read_bpmn(&mut self, reader: &mut BpmnReader<'_>) -> Result<(), BpmnError> {
                    read_base(&mut self.base, reader)
                }

                fn write_bpmn(&self, writer: &mut BpmnWriter<'_>) -> Result<(), BpmnError> {
                    write_base(&self.base, writer)
                }
            }
        )+
    };
}

base_only!(
    StartEvent,
    EndEvent,
    NoneEvent,
    NoneTask,
    ExclusiveGateway,
    InclusiveGateway,
    ParallelGateway,
);

impl BpmnMapped for UserTask {
    fn read_bpmn(&mut self, reader: &mut BpmnReader<'_>) -> Result<(), BpmnError> {
        read_base(&mut self.base, reader)?;
        self.task_name = reader.extension_text("taskName");
        self.assignee = reader.extension_binding("assignee")?;
        self.candidates = reader.extension_bindings("candidate")?;
        if let Some(id) = reader.extensions("form").into_iter().next() {
            let mut form = Form::default();
            reader.claim(id);
            reader.with_element(id, |reader| form.read_bpmn(reader))?;
            self.form = Some(form);
        }
        Ok(())
    }

    fn write_bpmn(&self, writer: &mut BpmnWriter<'_>) -> Result<(), BpmnError> {
        writer.extensions(|writer| {
            if let Some(form) = &self.form {
                form.write_bpmn(writer)?;
            }
            writer.bindings("candidate", &self.candidates)?;
            if let Some(assignee) = &self.assignee {
                writer.binding("assignee", assignee)?;
            }
            writer.extension_text("taskName", self.task_name.as_deref());
            Ok(())
        })?;
        write_base(&self.base, writer)
    }
}

impl BpmnMapped for Form {
    fn read_bpmn(&mut self, reader: &mut BpmnReader<'_>) -> Result<(), BpmnError> {
        self.description = reader.child_text(EFFEKTIF_NS, "description");
        for id in reader.children(EFFEKTIF_NS, "field") {
            reader.claim(id);
            let field = reader.with_element(id, |reader| {
                let mut field = FormField {
                    id: reader.attribute("id"),
                    name: reader.attribute("name"),
                    readonly: reader.bool_attribute("readonly")?,
                    required: reader.bool_attribute("required")?,
                    binding: None,
                };
                if let Some(binding) = reader.child(EFFEKTIF_NS, "binding") {
                    field.binding = Some(reader.read_binding(binding)?);
                }
                Ok(field)
            })?;
            self.fields.push(field);
        }
        Ok(())
    }

    fn write_bpmn(&self, writer: &mut BpmnWriter<'_>) -> Result<(), BpmnError> {
        writer.start_element(EFFEKTIF_NS, "form", None);
        for field in self.fields.iter().rev() {
            writer.start_element(EFFEKTIF_NS, "field", None);
            writer.attribute("id", field.id.as_deref());
            writer.attribute("name", field.name.as_deref());
            writer.bool_attribute("readonly", field.readonly);
            writer.bool_attribute("required", field.required);
            if let Some(binding) = &field.binding {
                writer.binding("binding", binding)?;
            }
            writer.end_element();
        }
        writer.text_element(EFFEKTIF_NS, "description", self.description.as_deref());
        writer.end_element();
        Ok(())
    }
}

impl BpmnMapped for ScriptTask {
    fn read_bpmn(&mut self, reader: &mut BpmnReader<'_>) -> Result<(), BpmnError> {
        read_base(&mut self.base, reader)?;
        let mut script = Script {
            language: reader.attribute("scriptFormat"),
            script: reader.child_text(BPMN_NS, "script"),
            ..Script::default()
        };
        for id in reader.extensions("scriptVariable") {
            let (name, variable) = reader.with_element(id, |reader| {
                Ok((reader.attribute("name"), reader.attribute("variable")))
            })?;
            if let (Some(name), Some(variable)) = (name, variable) {
                reader.claim(id);
                script.mappings.insert(name, variable);
            }
        }
        if script != Script::default() {
            self.script = Some(script);
        }
        Ok(())
    }

    fn write_bpmn(&self, writer: &mut BpmnWriter<'_>) -> Result<(), BpmnError> {
        if let Some(script) = &self.script {
            writer.attribute("scriptFormat", script.language.as_deref());
            writer.text_element(BPMN_NS, "script", script.script.as_deref());
            writer.extensions(|writer| {
                for (name, variable) in script.mappings.iter().rev() {
                    writer.start_element(EFFEKTIF_NS, "scriptVariable", None);
                    writer.attribute("name", Some(name));
                    writer.attribute("variable", Some(variable));
                    writer.end_element();
                }
                Ok(())
            })?;
        }
        write_base(&self.base, writer)
    }
}

impl BpmnMapped for JavaServiceTask {
    fn read_bpmn(&mut self, reader: &mut BpmnReader<'_>) -> Result<(), BpmnError> {
        read_base(&mut self.base, reader)?;
        self.java_class = reader.extension_text("javaClass");
        self.method_name = reader.extension_text("methodName");
        self.arg_bindings = reader.extension_bindings("argument")?;
        Ok(())
    }

    fn write_bpmn(&self, writer: &mut BpmnWriter<'_>) -> Result<(), BpmnError> {
        writer.extensions(|writer| {
            writer.bindings("argument", &self.arg_bindings)?;
            writer.extension_text("methodName", self.method_name.as_deref());
            writer.extension_text("javaClass", self.java_class.as_deref());
            Ok(())
        })?;
        write_base(&self.base, writer)
    }
}

impl BpmnMapped for HttpServiceTask {
    fn read_bpmn(&mut self, reader: &mut BpmnReader<'_>) -> Result<(), BpmnError> {
        read_base(&mut self.base, reader)?;
        self.url = reader.extension_text("url");
        if let Some(method) = reader.extension_text("method") {
            let parsed = HttpMethod::from_json_str(&method)
                .ok_or_else(|| reader.invalid("an HTTP method", method.as_str()))?;
            self.method = Some(parsed);
        }
        for id in reader.extensions("header") {
            let (name, value) = reader.with_element(id, |reader| {
                Ok((reader.attribute("name"), reader.attribute("value")))
            })?;
            if let (Some(name), Some(value)) = (name, value) {
                reader.claim(id);
                self.headers.insert(name, value);
            }
        }
        self.body = reader.extension_binding("body")?;
        Ok(())
    }

    fn write_bpmn(&self, writer: &mut BpmnWriter<'_>) -> Result<(), BpmnError> {
        writer.extensions(|writer| {
            if let Some(body) = &self.body {
                writer.binding("body", body)?;
            }
            for (name, value) in self.headers.iter().rev() {
                writer.start_element(EFFEKTIF_NS, "header", None);
                writer.attribute("name", Some(name));
                writer.attribute("value", Some(value));
                writer.end_element();
            }
            writer.extension_text("method", self.method.map(HttpMethod::as_str));
            writer.extension_text("url", self.url.as_deref());
            Ok(())
        })?;
        write_base(&self.base, writer)
    }
}

impl BpmnMapped for EmailTask {
    fn read_bpmn(&mut self, reader: &mut BpmnReader<'_>) -> Result<(), BpmnError> {
        read_base(&mut self.base, reader)?;
        self.from = reader.extension_binding("from")?;
        self.to = reader.extension_bindings("to")?;
        self.subject = reader.extension_binding("subject")?;
        self.body_text = reader.extension_binding("bodyText")?;
        Ok(())
    }

    fn write_bpmn(&self, writer: &mut BpmnWriter<'_>) -> Result<(), BpmnError> {
        writer.extensions(|writer| {
            if let Some(body_text) = &self.body_text {
                writer.binding("bodyText", body_text)?;
            }
            if let Some(subject) = &self.subject {
                writer.binding("subject", subject)?;
            }
            writer.bindings("to", &self.to)?;
            if let Some(from) = &self.from {
                writer.binding("from", from)?;
            }
            Ok(())
        })?;
        write_base(&self.base, writer)
    }
}

impl BpmnMapped for ReceiveTask {
    fn read_bpmn(&mut self, reader: &mut BpmnReader<'_>) -> Result<(), BpmnError> {
        read_base(&mut self.base, reader)?;
        self.message = reader.extension_text("message");
        Ok(())
    }

    fn write_bpmn(&self, writer: &mut BpmnWriter<'_>) -> Result<(), BpmnError> {
        writer.extensions(|writer| {
            writer.extension_text("message", self.message.as_deref());
            Ok(())
        })?;
        write_base(&self.base, writer)
    }
}

impl BpmnMapped for EmbeddedSubprocess {
    fn read_bpmn(&mut self, reader: &mut BpmnReader<'_>) -> Result<(), BpmnError> {
        read_base(&mut self.base, reader)?;
        reader.read_scope(&mut self.scope)
    }

    fn write_bpmn(&self, writer: &mut BpmnWriter<'_>) -> Result<(), BpmnError> {
        writer.write_scope(&self.scope)?;
        write_base(&self.base, writer)
    }
}

impl BpmnMapped for Call {
    fn read_bpmn(&mut self, reader: &mut BpmnReader<'_>) -> Result<(), BpmnError> {
        read_base(&mut self.base, reader)?;
        self.sub_workflow_source = reader.attribute("calledElement");
        if let Some(id) = reader.extension_text("subWorkflowId") {
            let parsed = id
                .parse::<WorkflowId>()
                .map_err(|_| reader.invalid("a workflow id", id.as_str()))?;
            self.sub_workflow_id = Some(parsed);
        }
        for id in reader.extensions("inputBinding") {
            let key = reader.with_element(id, |reader| Ok(reader.attribute("key")))?;
            if let Some(key) = key {
                let binding = reader.read_binding(id)?;
                self.input_bindings.insert(key, binding);
            }
        }
        Ok(())
    }

    fn write_bpmn(&self, writer: &mut BpmnWriter<'_>) -> Result<(), BpmnError> {
        writer.attribute("calledElement", self.sub_workflow_source.as_deref());
        writer.extensions(|writer| {
            for (key, binding) in self.input_bindings.iter().rev() {
                writer.keyed_binding("inputBinding", Some(key), binding)?;
            }
            let id = self.sub_workflow_id.as_ref().map(ToString::to_string);
            writer.extension_text("subWorkflowId", id.as_deref());
            Ok(())
        })?;
        write_base(&self.base, writer)
    }
}

impl BpmnMapped for BoundaryEvent {
    fn read_bpmn(&mut self, reader: &mut BpmnReader<'_>) -> Result<(), BpmnError> {
        read_base(&mut self.base, reader)?;
        self.attached_to_activity_id = reader.attribute("attachedToRef");
        self.cancel_activity = reader.bool_attribute("cancelActivity")?;
        self.to_transition_ids = reader.extension_texts("toTransitionId");
        for id in reader.children(BPMN_NS, "timerEventDefinition") {
            let Some(rule) = reader.select::<Timer>(id)? else {
                continue;
            };
            let mut timer = reader.read_timer(id, rule)?;
            let base = timer.base_mut();
            base.boundary_event_id = self.base.id.clone();
            base.attached_activity_id = self.attached_to_activity_id.clone();
            reader.push_timer(timer);
        }
        Ok(())
    }

    fn write_bpmn(&self, writer: &mut BpmnWriter<'_>) -> Result<(), BpmnError> {
        writer.attribute("attachedToRef", self.attached_to_activity_id.as_deref());
        writer.bool_attribute("cancelActivity", self.cancel_activity);
        let timers = match &self.base.id {
            Some(id) => writer.take_boundary_timers(id),
            None => Vec::new(),
        };
        for timer in timers.iter().rev() {
            writer.write_timer(timer)?;
        }
        writer.extensions(|writer| {
            for id in self.to_transition_ids.iter().rev() {
                writer.extension_text("toTransitionId", Some(id));
            }
            Ok(())
        })?;
        write_base(&self.base, writer)
    }
}

macro_rules! each_variant {
    ($value:expr, $activity:ident => $body:expr) => {
        match $value {
            Activity::StartEvent($activity) => $body,
            Activity::EndEvent($activity) => $body,
            Activity::NoneEvent($activity) => $body,
            Activity::NoneTask($activity) => $body,
            Activity::UserTask($activity) => $body,
            Activity::ScriptTask($activity) => $body,
            Activity::JavaServiceTask($activity) => $body,
            Activity::HttpServiceTask($activity) => $body,
            Activity::EmailTask($activity) => $body,
            Activity::ReceiveTask($activity) => $body,
            Activity::ExclusiveGateway($activity) => $body,
            Activity::InclusiveGateway($activity) => $body,
            Activity::ParallelGateway($activity) => $body,
            Activity::EmbeddedSubprocess($activity) => $body,
            Activity::Call($activity) => $body,
            Activity::BoundaryEvent($activity) => $body,
        }
    };
}

impl BpmnMapped for Activity {
    fn read_bpmn(&mut self, reader: &mut BpmnReader<'_>) -> Result<(), BpmnError> {
        each_variant!(self, activity => activity.read_bpmn(reader))
    }

    fn write_bpmn(&self, writer: &mut BpmnWriter<'_>) -> Result<(), BpmnError> {
        each_variant!(self, activity => activity.write_bpmn(writer))
    }
}

fn read_time(
    base: &mut TimerBase,
    local: &str,
    reader: &mut BpmnReader<'_>,
) -> Result<Option<String>, BpmnError> {
    base.id = reader.attribute("id");
    Ok(reader.child_text(BPMN_NS, local))
}

fn write_time(base: &TimerBase, local: &str, value: Option<&str>, writer: &mut BpmnWriter<'_>) {
    writer.attribute("id", base.id.as_deref());
    writer.text_element(BPMN_NS, local, value);
}

impl BpmnMapped for DurationTimer {
    fn read_bpmn(&mut self, reader: &mut BpmnReader<'_>) -> Result<(), BpmnError> {
        self.duration = read_time(&mut self.base, "timeDuration", reader)?;
        Ok(())
    }

    fn write_bpmn(&self, writer: &mut BpmnWriter<'_>) -> Result<(), BpmnError> {
        write_time(&self.base, "timeDuration", self.duration.as_deref(), writer);
        Ok(())
    }
}

impl BpmnMapped for DateTimer {
    fn read_bpmn(&mut self, reader: &mut BpmnReader<'_>) -> Result<(), BpmnError> {
        self.date = read_time(&mut self.base, "timeDate", reader)?;
        Ok(())
    }

    fn write_bpmn(&self, writer: &mut BpmnWriter<'_>) -> Result<(), BpmnError> {
        write_time(&self.base, "timeDate", self.date.as_deref(), writer);
        Ok(())
    }
}

impl BpmnMapped for CycleTimer {
    fn read_bpmn(&mut self, reader: &mut BpmnReader<'_>) -> Result<(), BpmnError> {
        self.cycle = read_time(&mut self.base, "timeCycle", reader)?;
        Ok(())
    }

    fn write_bpmn(&self, writer: &mut BpmnWriter<'_>) -> Result<(), BpmnError> {
        write_time(&self.base, "timeCycle", self.cycle.as_deref(), writer);
        Ok(())
    }
}

impl BpmnMapped for Timer {
    fn read_bpmn(&mut self, reader: &mut BpmnReader<'_>) -> Result<(), BpmnError> {
        match self {
            Self::Duration(timer) => timer.read_bpmn(reader),
            Self::Date(timer) => timer.read_bpmn(reader),
            Self::Cycle(timer) => timer.read_bpmn(reader),
        }
    }

    fn write_bpmn(&self, writer: &mut BpmnWriter<'_>) -> Result<(), BpmnError> {
        match self {
            Self::Duration(timer) => timer.write_bpmn(writer),
            Self::Date(timer) => timer.write_bpmn(writer),
            Self::Cycle(timer) => timer.write_bpmn(writer),
        }
    }
}

impl BpmnMapped for Transition {
    fn read_bpmn(&mut self, reader: &mut BpmnReader<'_>) -> Result<(), BpmnError> {
        self.id = reader.attribute("id");
        self.from_id = reader.attribute("sourceRef");
        self.to_id = reader.attribute("targetRef");
        self.description = reader.documentation();
        let registry = reader.registry();
        let document = reader.document();
        let condition = reader.extension_children().into_iter().find(|id| {
            let name = document.name(*id);
            name.namespace.as_deref() == Some(EFFEKTIF_NS)
                && is_variant::<Condition>(registry, &name.local)
        });
        if let Some(id) = condition {
            self.condition = Some(read_condition(reader, id)?);
        }
        Ok(())
    }

    fn write_bpmn(&self, writer: &mut BpmnWriter<'_>) -> Result<(), BpmnError> {
        writer.start_element(BPMN_NS, "sequenceFlow", self.bpmn.as_ref());
        writer.attribute("id", self.id.as_deref());
        writer.attribute("sourceRef", self.from_id.as_deref());
        writer.attribute("targetRef", self.to_id.as_deref());
        if let Some(condition) = &self.condition {
            writer.extensions(|writer| write_condition(writer, condition))?;
        }
        writer.documentation(self.description.as_deref());
        writer.end_element();
        Ok(())
    }
}

/// Claims `element` and reads it as the condition its local name names.
///
/// `and`, `or` and `not` hold nested condition elements; leaves hold `e:left`
/// and `e:right` bindings.
fn read_condition(reader: &mut BpmnReader<'_>, element: XmlNodeId) -> Result<Condition, BpmnError> {
    let local = reader.document().name(element).local.clone();
    let mut condition = instantiate::<Condition>(reader.registry(), &local)?;
    reader.claim(element);
    reader.with_element(element, |reader| {
        match &mut condition {
            Condition::And(and) => and.conditions = read_nested_conditions(reader)?,
            Condition::Or(or) => or.conditions = read_nested_conditions(reader)?,
            Condition::Not(not) => {
                not.condition = read_nested_conditions(reader)?.into_iter().next().map(Box::new);
            }
            leaf => {
                let (left, right) = leaf.operands_mut();
                if let Some(slot) = left {
                    *slot = read_operand(reader, "left")?;
                }
                if let Some(slot) = right {
                    *slot = read_operand(reader, "right")?;
                }
            }
        }
        Ok(())
    })?;
    Ok(condition)
}

fn read_nested_conditions(reader: &mut BpmnReader<'_>) -> Result<Vec<Condition>, BpmnError> {
    let registry = reader.registry();
    let document = reader.document();
    let nested: Vec<XmlNodeId> = document
        .children(reader.current())
        .iter()
        .copied()
        .filter(|id| {
            let name = document.name(*id);
            name.namespace.as_deref() == Some(EFFEKTIF_NS)
                && is_variant::<Condition>(registry, &name.local)
        })
        .collect();
    nested
        .into_iter()
        .map(|id| read_condition(reader, id))
        .collect()
}

fn read_operand(
    reader: &mut BpmnReader<'_>,
    local: &str,
) -> Result<Option<Binding<Value>>, BpmnError> {
    match reader.child(EFFEKTIF_NS, local) {
        Some(id) => reader.read_binding(id).map(Some),
        None => Ok(None),
    }
}

fn write_condition(writer: &mut BpmnWriter<'_>, condition: &Condition) -> Result<(), BpmnError> {
    writer.start_element(EFFEKTIF_NS, condition.type_name(), None);
    for nested in condition.children().into_iter().rev() {
        write_condition(writer, nested)?;
    }
    let (left, right) = condition.operands();
    if let Some(right) = right {
        writer.binding("right", right)?;
    }
    if let Some(left) = left {
        writer.binding("left", left)?;
    }
    writer.end_element();
    Ok(())
}

impl BpmnMapped for Variable {
    fn read_bpmn(&mut self, reader: &mut BpmnReader<'_>) -> Result<(), BpmnError> {
        self.id = reader.attribute("id");
        self.name = reader.attribute("name");
        self.description = reader.child_text(EFFEKTIF_NS, "description");
        if let Some(text) = reader.child_text(EFFEKTIF_NS, "defaultValue") {
            self.default_value = Some(from_json_text(reader.registry(), &text)?);
        }
        self.data_type = read_data_type(reader)?;
        Ok(())
    }

    fn write_bpmn(&self, writer: &mut BpmnWriter<'_>) -> Result<(), BpmnError> {
        writer.start_element(EFFEKTIF_NS, "variable", None);
        writer.attribute("id", self.id.as_deref());
        writer.attribute("name", self.name.as_deref());
        if let Some(data_type) = &self.data_type {
            write_data_type(writer, data_type);
        }
        if let Some(value) = &self.default_value {
            let text = to_json_text(writer.registry(), value)?;
            writer.text_element(EFFEKTIF_NS, "defaultValue", Some(&text));
        }
        writer.text_element(EFFEKTIF_NS, "description", self.description.as_deref());
        writer.end_element();
        Ok(())
    }
}

/// Reads the data type named by the current element's `type` attribute,
/// with its parameters.
fn read_data_type(reader: &mut BpmnReader<'_>) -> Result<Option<DataType>, BpmnError> {
    let Some(name) = reader.attribute("type") else {
        return Ok(None);
    };
    let mut data_type = instantiate::<DataType>(reader.registry(), &name)?;
    match &mut data_type {
        DataType::Text(text) => text.multi_line = reader.bool_attribute("multiLine")?,
        DataType::Date(date) => date.kind = reader.attribute("kind"),
        DataType::List(list) => {
            if let Some(id) = reader.child(EFFEKTIF_NS, "elementType") {
                reader.claim(id);
                list.element_type = reader.with_element(id, read_data_type)?.map(Box::new);
            }
        }
        DataType::Choice(choice) => {
            for id in reader.children(EFFEKTIF_NS, "option") {
                reader.claim(id);
                let option = reader.with_element(id, |reader| {
                    Ok(ChoiceOption {
                        id: reader.attribute("id"),
                        label: reader.attribute("label"),
                    })
                })?;
                choice.options.push(option);
            }
        }
        DataType::Number(_) | DataType::Boolean(_) | DataType::EmailAddress(_) | DataType::Link(_) => {}
    }
    Ok(Some(data_type))
}

fn write_data_type(writer: &mut BpmnWriter<'_>, data_type: &DataType) {
    writer.attribute("type", Some(data_type.type_name()));
    match data_type {
        DataType::Text(text) => writer.bool_attribute("multiLine", text.multi_line),
        DataType::Date(date) => writer.attribute("kind", date.kind.as_deref()),
        DataType::List(list) => {
            if let Some(element_type) = &list.element_type {
                writer.start_element(EFFEKTIF_NS, "elementType", None);
                write_data_type(writer, element_type);
                writer.end_element();
            }
        }
        DataType::Choice(choice) => {
            for option in choice.options.iter().rev() {
                writer.start_element(EFFEKTIF_NS, "option", None);
                writer.attribute("id", option.id.as_deref());
                writer.attribute("label", option.label.as_deref());
                writer.end_element();
            }
        }
        DataType::Number(_) | DataType::Boolean(_) | DataType::EmailAddress(_) | DataType::Link(_) => {}
    }
}

/// Reads an `e:trigger` element. A trigger without a `type` attribute is
/// left as residue; an unregistered `type` is an error.
pub(crate) fn read_trigger(reader: &mut BpmnReader<'_>) -> Result<Option<Trigger>, BpmnError> {
    let Some(name) = reader.attribute("type") else {
        return Ok(None);
    };
    let mut trigger = instantiate::<Trigger>(reader.registry(), &name)?;
    match &mut trigger {
        Trigger::Form(FormTrigger { form }) => {
            if let Some(id) = reader.child(EFFEKTIF_NS, "form") {
                let mut read = Form::default();
                reader.claim(id);
                reader.with_element(id, |reader| read.read_bpmn(reader))?;
                *form = Some(read);
            }
        }
        Trigger::Message(MessageTrigger { message }) => {
            *message = reader.child_text(EFFEKTIF_NS, "message");
        }
    }
    Ok(Some(trigger))
}

pub(crate) fn write_trigger(writer: &mut BpmnWriter<'_>, trigger: &Trigger) -> Result<(), BpmnError> {
    writer.start_element(EFFEKTIF_NS, "trigger", None);
    writer.attribute("type", Some(trigger.type_name()));
    match trigger {
        Trigger::Form(FormTrigger { form }) => {
            if let Some(form) = form {
                form.write_bpmn(writer)?;
            }
        }
        Trigger::Message(MessageTrigger { message }) => {
            writer.text_element(EFFEKTIF_NS, "message", message.as_deref());
        }
    }
    writer.end_element();
    Ok(())
}
