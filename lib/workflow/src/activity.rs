//! Activities: the nodes of a workflow.
//!
//! Every activity type embeds an [`ActivityBase`] whose fields are written
//! ahead of the type's own. [`Activity`] is the closed union of all of
//! them, discriminated by `type`.

use crate::binding::Binding;
use crate::scope::Scope;
use crate::timer::Timer;
use crate::trigger::Form;
use crate::variable::Variable;
use amber_lantern_core::{UserId, WorkflowId};
use amber_lantern_mapping::{BeanType, TypeMappingBuilder, json_bean, json_enum, polymorphic};
use amber_lantern_xml::XmlElement;
use indexmap::IndexMap;
use serde_json::{Map, Value};

/// Fields shared by all activities.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActivityBase {
    pub id: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    /// Taken when no condition of the outgoing transitions holds.
    pub default_transition_id: Option<String>,
    pub multi_instance: Option<MultiInstance>,
    /// Timers on the activity's boundary.
    pub timers: Vec<Timer>,
    /// Keys no field claims; merged into the activity's JSON object.
    pub properties: Map<String, Value>,
    /// BPMN content of the activity element that was not understood.
    pub bpmn: Option<XmlElement>,
}

impl BeanType for ActivityBase {
    fn describe(fields: &mut TypeMappingBuilder<Self>) {
        fields
            .field("id", |a| &a.id, |a| &mut a.id)
            .field("name", |a| &a.name, |a| &mut a.name)
            .field("description", |a| &a.description, |a| &mut a.description)
            .field_as(
                "default_transition_id",
                "defaultTransitionId",
                |a| &a.default_transition_id,
                |a| &mut a.default_transition_id,
            )
            .field_as(
                "multi_instance",
                "multiInstance",
                |a| &a.multi_instance,
                |a| &mut a.multi_instance,
            )
            .field("timers", |a| &a.timers, |a| &mut a.timers)
            .inline("properties", |a| &a.properties, |a| &mut a.properties);
    }
}

/// Runs an activity once per element of a collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MultiInstance {
    /// Variables local to each instance.
    pub variables: Vec<Variable>,
    /// The collection iterated over.
    pub values: Vec<Binding<Value>>,
    pub sequential: Option<bool>,
}

impl BeanType for MultiInstance {
    fn describe(fields: &mut TypeMappingBuilder<Self>) {
        fields
            .field("variables", |m| &m.variables, |m| &mut m.variables)
            .field("values", |m| &m.values, |m| &mut m.values)
            .field("sequential", |m| &m.sequential, |m| &mut m.sequential);
    }
}

macro_rules! plain_activity {
    ($($(#[$meta:meta])* $name:ident),+ $(,)?) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, Default, PartialEq)]
            pub struct $name {
                pub base: ActivityBase,
            }

            impl BeanType for $name {
                fn describe(fields: &mut TypeMappingBuilder<Self>) {
                    fields.flatten(|a| &a.base, |a| &mut a.base);
                }
            }
        )+
        json_bean!($($name),+);
    };
}

plain_activity!(
    /// Where a workflow starts.
    StartEvent,
    /// Where a path through a workflow ends.
    EndEvent,
    /// An intermediate event with no trigger; a named milestone.
    NoneEvent,
    /// A task that does nothing.
    NoneTask,
    /// Follows the first outgoing transition whose condition holds.
    ExclusiveGateway,
    /// Follows every outgoing transition whose condition holds.
    InclusiveGateway,
    /// Forks to, or joins from, all transitions.
    ParallelGateway,
);

/// Work assigned to a person.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserTask {
    pub base: ActivityBase,
    /// Title of the task shown to the assignee.
    pub task_name: Option<String>,
    pub assignee: Option<Binding<UserId>>,
    pub candidates: Vec<Binding<UserId>>,
    pub form: Option<Form>,
}

impl BeanType for UserTask {
    fn describe(fields: &mut TypeMappingBuilder<Self>) {
        fields
            .flatten(|a| &a.base, |a| &mut a.base)
            .field_as("task_name", "taskName", |a| &a.task_name, |a| &mut a.task_name)
            .field_as("assignee", "assigneeId", |a| &a.assignee, |a| &mut a.assignee)
            .field_as(
                "candidates",
                "candidateIds",
                |a| &a.candidates,
                |a| &mut a.candidates,
            )
            .field("form", |a| &a.form, |a| &mut a.form);
    }
}

/// Source text of a script and the variables it reads.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Script {
    pub language: Option<String>,
    pub script: Option<String>,
    /// Script variable name to process variable id.
    pub mappings: IndexMap<String, String>,
}

impl BeanType for Script {
    fn describe(fields: &mut TypeMappingBuilder<Self>) {
        fields
            .field("language", |s| &s.language, |s| &mut s.language)
            .field("script", |s| &s.script, |s| &mut s.script)
            .field("mappings", |s| &s.mappings, |s| &mut s.mappings);
    }
}

/// Runs a script.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScriptTask {
    pub base: ActivityBase,
    pub script: Option<Script>,
}

impl BeanType for ScriptTask {
    fn describe(fields: &mut TypeMappingBuilder<Self>) {
        fields
            .flatten(|a| &a.base, |a| &mut a.base)
            .field("script", |a| &a.script, |a| &mut a.script);
    }
}

/// Invokes a method of a JVM class.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JavaServiceTask {
    pub base: ActivityBase,
    pub java_class: Option<String>,
    pub method_name: Option<String>,
    pub arg_bindings: Vec<Binding<Value>>,
}

impl BeanType for JavaServiceTask {
    fn describe(fields: &mut TypeMappingBuilder<Self>) {
        fields
            .flatten(|a| &a.base, |a| &mut a.base)
            .field_as("java_class", "javaClass", |a| &a.java_class, |a| &mut a.java_class)
            .field_as(
                "method_name",
                "methodName",
                |a| &a.method_name,
                |a| &mut a.method_name,
            )
            .field_as(
                "arg_bindings",
                "argBindings",
                |a| &a.arg_bindings,
                |a| &mut a.arg_bindings,
            );
    }
}

json_enum! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub enum HttpMethod {
        #[default]
        Get = "GET",
        Post = "POST",
        Put = "PUT",
        Delete = "DELETE",
    }
}

/// Sends an HTTP request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HttpServiceTask {
    pub base: ActivityBase,
    pub url: Option<String>,
    pub method: Option<HttpMethod>,
    pub headers: IndexMap<String, String>,
    pub body: Option<Binding<Value>>,
}

impl BeanType for HttpServiceTask {
    fn describe(fields: &mut TypeMappingBuilder<Self>) {
        fields
            .flatten(|a| &a.base, |a| &mut a.base)
            .field("url", |a| &a.url, |a| &mut a.url)
            .field("method", |a| &a.method, |a| &mut a.method)
            .field("headers", |a| &a.headers, |a| &mut a.headers)
            .field("body", |a| &a.body, |a| &mut a.body);
    }
}

/// Sends an email.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmailTask {
    pub base: ActivityBase,
    pub from: Option<Binding<String>>,
    pub to: Vec<Binding<String>>,
    pub subject: Option<Binding<String>>,
    pub body_text: Option<Binding<String>>,
}

impl BeanType for EmailTask {
    fn describe(fields: &mut TypeMappingBuilder<Self>) {
        fields
            .flatten(|a| &a.base, |a| &mut a.base)
            .field_as("from", "fromEmailAddress", |a| &a.from, |a| &mut a.from)
            .field_as("to", "toEmailAddresses", |a| &a.to, |a| &mut a.to)
            .field("subject", |a| &a.subject, |a| &mut a.subject)
            .field_as("body_text", "bodyText", |a| &a.body_text, |a| &mut a.body_text);
    }
}

/// Waits for a message.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReceiveTask {
    pub base: ActivityBase,
    pub message: Option<String>,
}

impl BeanType for ReceiveTask {
    fn describe(fields: &mut TypeMappingBuilder<Self>) {
        fields
            .flatten(|a| &a.base, |a| &mut a.base)
            .field("message", |a| &a.message, |a| &mut a.message);
    }
}

/// A nested scope of activities. Its scope fields sit directly in the
/// activity's JSON object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmbeddedSubprocess {
    pub base: ActivityBase,
    pub scope: Scope,
}

impl BeanType for EmbeddedSubprocess {
    fn describe(fields: &mut TypeMappingBuilder<Self>) {
        fields
            .flatten(|a| &a.base, |a| &mut a.base)
            .inline("scope", |a| &a.scope, |a| &mut a.scope);
    }
}

/// Starts another workflow and waits for it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Call {
    pub base: ActivityBase,
    pub sub_workflow_id: Option<WorkflowId>,
    /// BPMN process id of the called workflow.
    pub sub_workflow_source: Option<String>,
    /// Called workflow variable id to the value passed in.
    pub input_bindings: IndexMap<String, Binding<Value>>,
}

impl BeanType for Call {
    fn describe(fields: &mut TypeMappingBuilder<Self>) {
        fields
            .flatten(|a| &a.base, |a| &mut a.base)
            .field_as(
                "sub_workflow_id",
                "subWorkflowId",
                |a| &a.sub_workflow_id,
                |a| &mut a.sub_workflow_id,
            )
            .field_as(
                "sub_workflow_source",
                "subWorkflowSource",
                |a| &a.sub_workflow_source,
                |a| &mut a.sub_workflow_source,
            )
            .field_as(
                "input_bindings",
                "inputBindings",
                |a| &a.input_bindings,
                |a| &mut a.input_bindings,
            );
    }
}

/// An event on the boundary of another activity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundaryEvent {
    pub base: ActivityBase,
    pub attached_to_activity_id: Option<String>,
    pub cancel_activity: Option<bool>,
    pub to_transition_ids: Vec<String>,
}

impl BeanType for BoundaryEvent {
    fn describe(fields: &mut TypeMappingBuilder<Self>) {
        fields
            .flatten(|a| &a.base, |a| &mut a.base)
            .field_as(
                "attached_to_activity_id",
                "attachedToActivityId",
                |a| &a.attached_to_activity_id,
                |a| &mut a.attached_to_activity_id,
            )
            .field_as(
                "cancel_activity",
                "cancelActivity",
                |a| &a.cancel_activity,
                |a| &mut a.cancel_activity,
            )
            .field_as(
                "to_transition_ids",
                "toTransitionIds",
                |a| &a.to_transition_ids,
                |a| &mut a.to_transition_ids,
            );
    }
}

json_bean!(
    MultiInstance,
    UserTask,
    Script,
    ScriptTask,
    JavaServiceTask,
    HttpServiceTask,
    EmailTask,
    ReceiveTask,
    EmbeddedSubprocess,
    Call,
    BoundaryEvent,
);

polymorphic! {
    /// Any activity of a workflow.
    #[derive(Debug, Clone, PartialEq)]
    pub enum Activity {
        StartEvent(StartEvent) = "startEvent",
        EndEvent(EndEvent) = "endEvent",
        NoneEvent(NoneEvent) = "noneEvent",
        NoneTask(NoneTask) = "noneTask",
        UserTask(UserTask) = "userTask",
        ScriptTask(ScriptTask) = "scriptTask",
        JavaServiceTask(JavaServiceTask) = "javaServiceTask",
        HttpServiceTask(HttpServiceTask) = "httpServiceTask",
        EmailTask(EmailTask) = "emailTask",
        ReceiveTask(ReceiveTask) = "receiveTask",
        ExclusiveGateway(ExclusiveGateway) = "exclusiveGateway",
        InclusiveGateway(InclusiveGateway) = "inclusiveGateway",
        ParallelGateway(ParallelGateway) = "parallelGateway",
        EmbeddedSubprocess(EmbeddedSubprocess) = "embeddedSubprocess",
        Call(Call) = "call",
        BoundaryEvent(BoundaryEvent) = "boundaryEvent",
    }
}

macro_rules! each_activity {
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

impl Activity {
    #[must_use]
    pub fn base(&self) -> &ActivityBase {
        each_activity!(self, a => &a.base)
    }

    pub fn base_mut(&mut self) -> &mut ActivityBase {
        each_activity!(self, a => &mut a.base)
    }

    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.base().id.as_deref()
    }

    /// The nested scope of an embedded subprocess.
    #[must_use]
    pub fn scope(&self) -> Option<&Scope> {
        match self {
            Self::EmbeddedSubprocess(a) => Some(&a.scope),
            _ => None,
        }
    }

    pub fn scope_mut(&mut self) -> Option<&mut Scope> {
        match self {
            Self::EmbeddedSubprocess(a) => Some(&mut a.scope),
            _ => None,
        }
    }
}
