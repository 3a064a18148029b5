//! The workflow: the root of the process model.

use crate::diagram::Diagram;
use crate::scope::Scope;
use crate::trigger::Trigger;
use amber_lantern_core::{UserId, WorkflowId};
use amber_lantern_mapping::{BeanType, TypeMappingBuilder, json_bean};
use amber_lantern_xml::XmlElement;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

/// A complete workflow definition.
///
/// In JSON the fields of [`Workflow::scope`] and any unclaimed
/// [`Workflow::properties`] sit directly in the workflow object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Workflow {
    pub id: Option<WorkflowId>,
    /// Id of the BPMN process this workflow was read from.
    pub source_workflow_id: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub creator_id: Option<UserId>,
    pub create_time: Option<DateTime<Utc>>,
    pub trigger: Option<Trigger>,
    pub diagram: Option<Diagram>,
    pub scope: Scope,
    pub properties: Map<String, Value>,
    /// BPMN content of the `definitions` element that was not understood.
    pub bpmn_definitions: Option<XmlElement>,
}

impl Workflow {
    /// Creates an empty workflow with the given name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: WorkflowId) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn with_source_workflow_id(mut self, id: impl Into<String>) -> Self {
        self.source_workflow_id = Some(id.into());
        self
    }

    #[must_use]
    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    #[must_use]
    pub fn with_trigger(mut self, trigger: impl Into<Trigger>) -> Self {
        self.trigger = Some(trigger.into());
        self
    }

    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: Value) -> Self {
        self.properties.insert(key.into(), value);
        self
    }
}

impl BeanType for Workflow {
    fn describe(fields: &mut TypeMappingBuilder<Self>) {
        fields
            .field("id", |w| &w.id, |w| &mut w.id)
            .field_as(
                "source_workflow_id",
                "sourceWorkflowId",
                |w| &w.source_workflow_id,
                |w| &mut w.source_workflow_id,
            )
            .field("name", |w| &w.name, |w| &mut w.name)
            .field("description", |w| &w.description, |w| &mut w.description)
            .field_as("creator_id", "creatorId", |w| &w.creator_id, |w| &mut w.creator_id)
            .field_as(
                "create_time",
                "createTime",
                |w| &w.create_time,
                |w| &mut w.create_time,
            )
            .field("trigger", |w| &w.trigger, |w| &mut w.trigger)
            .inline("scope", |w| &w.scope, |w| &mut w.scope)
            .field("diagram", |w| &w.diagram, |w| &mut w.diagram)
            .inline("properties", |w| &w.properties, |w| &mut w.properties);
    }
}

json_bean!(Workflow);
