//! Sequence flows between activities.

use crate::condition::Condition;
use amber_lantern_mapping::{BeanType, TypeMappingBuilder, json_bean};
use amber_lantern_xml::XmlElement;

/// A directed connection from one activity to another.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transition {
    pub id: Option<String>,
    /// Id of the source activity.
    pub from_id: Option<String>,
    /// Id of the target activity.
    pub to_id: Option<String>,
    /// The transition is only taken when this holds.
    pub condition: Option<Condition>,
    pub description: Option<String>,
    /// BPMN content of the `sequenceFlow` that was not understood.
    pub bpmn: Option<XmlElement>,
}

impl Transition {
    /// A transition between two activities.
    #[must_use]
    pub fn new(from_id: impl Into<String>, to_id: impl Into<String>) -> Self {
        Self {
            from_id: Some(from_id.into()),
            to_id: Some(to_id.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }
}

impl BeanType for Transition {
    fn describe(fields: &mut TypeMappingBuilder<Self>) {
        fields
            .field("id", |t| &t.id, |t| &mut t.id)
            .field_as("from_id", "from", |t| &t.from_id, |t| &mut t.from_id)
            .field_as("to_id", "to", |t| &t.to_id, |t| &mut t.to_id)
            .field("condition", |t| &t.condition, |t| &mut t.condition)
            .field("description", |t| &t.description, |t| &mut t.description);
    }
}

json_bean!(Transition);
