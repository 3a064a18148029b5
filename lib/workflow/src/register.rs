//! Registry assembly for the process model.

use crate::activity::{
    Activity, BoundaryEvent, Call, EmailTask, EmbeddedSubprocess, EndEvent, ExclusiveGateway,
    HttpServiceTask, InclusiveGateway, JavaServiceTask, NoneEvent, NoneTask, ParallelGateway,
    ReceiveTask, ScriptTask, StartEvent, UserTask,
};
use crate::condition::{
    And, Condition, Contains, Equals, GreaterThan, HasNoValue, HasValue, IsFalse, IsTrue,
    LessThan, Not, NotEquals, Or,
};
use crate::data_type::{
    BooleanType, ChoiceType, DataType, DateType, EmailAddressType, LinkType, ListType, NumberType,
    TextType,
};
use crate::timer::{CycleTimer, DateTimer, DurationTimer, Timer};
use crate::trigger::{FormTrigger, MessageTrigger, Trigger};
use amber_lantern_mapping::{JsonConfig, TypeRegistry, TypeRegistryBuilder};

/// Registers every union of the process model with its variants.
pub fn register_types(builder: &mut TypeRegistryBuilder) -> &mut TypeRegistryBuilder {
    builder
        .register_subtype::<Activity, StartEvent>()
        .register_subtype::<Activity, EndEvent>()
        .register_subtype::<Activity, NoneEvent>()
        .register_subtype::<Activity, NoneTask>()
        .register_subtype::<Activity, UserTask>()
        .register_subtype::<Activity, ScriptTask>()
        .register_subtype::<Activity, JavaServiceTask>()
        .register_subtype::<Activity, HttpServiceTask>()
        .register_subtype::<Activity, EmailTask>()
        .register_subtype::<Activity, ReceiveTask>()
        .register_subtype::<Activity, ExclusiveGateway>()
        .register_subtype::<Activity, InclusiveGateway>()
        .register_subtype::<Activity, ParallelGateway>()
        .register_subtype::<Activity, EmbeddedSubprocess>()
        .register_subtype::<Activity, Call>()
        .register_subtype::<Activity, BoundaryEvent>();

    builder
        .register_subtype::<DataType, TextType>()
        .register_subtype::<DataType, NumberType>()
        .register_subtype::<DataType, BooleanType>()
        .register_subtype::<DataType, DateType>()
        .register_subtype::<DataType, ListType>()
        .register_subtype::<DataType, ChoiceType>()
        .register_subtype::<DataType, EmailAddressType>()
        .register_subtype::<DataType, LinkType>();

    builder
        .register_subtype::<Condition, Equals>()
        .register_subtype::<Condition, NotEquals>()
        .register_subtype::<Condition, GreaterThan>()
        .register_subtype::<Condition, LessThan>()
        .register_subtype::<Condition, Contains>()
        .register_subtype::<Condition, IsTrue>()
        .register_subtype::<Condition, IsFalse>()
        .register_subtype::<Condition, HasValue>()
        .register_subtype::<Condition, HasNoValue>()
        .register_subtype::<Condition, And>()
        .register_subtype::<Condition, Or>()
        .register_subtype::<Condition, Not>();

    builder
        .register_subtype::<Timer, DurationTimer>()
        .register_subtype::<Timer, DateTimer>()
        .register_subtype::<Timer, CycleTimer>();

    builder
        .register_subtype::<Trigger, FormTrigger>()
        .register_subtype::<Trigger, MessageTrigger>()
}

/// A builder with the process model registered under `config`'s default
/// discriminator field.
#[must_use]
pub fn registry_builder(config: &JsonConfig) -> TypeRegistryBuilder {
    let mut builder = TypeRegistry::builder();
    builder.with_default_discriminator(config.default_discriminator_field.clone());
    register_types(&mut builder);
    builder
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::{ActivityBase, Script};
    use crate::binding::Binding;
    use crate::diagram::{Bounds, Diagram, Node};
    use crate::scope::Scope;
    use crate::transition::Transition;
    use crate::variable::Variable;
    use crate::workflow::Workflow;
    use amber_lantern_core::WorkflowId;
    use amber_lantern_mapping::{JsonStreamMapper, JsonTreeMapper, MappingError};
    use chrono::{TimeZone, Utc};
    use serde_json::{Value, json};
    use std::sync::Arc;

    fn registry() -> Arc<TypeRegistry> {
        Arc::new(registry_builder(&JsonConfig::default()).build())
    }

    fn keys(value: &Value) -> Vec<String> {
        value.as_object().expect("object").keys().cloned().collect()
    }

    fn task(id: &str) -> ActivityBase {
        ActivityBase {
            id: Some(id.to_string()),
            ..ActivityBase::default()
        }
    }

    fn sample() -> Workflow {
        let check = Condition::from(GreaterThan::new(
            Binding::from_expression("amount"),
            Binding::from_value(json!(100)),
        ));
        let nested = Scope::default()
            .with_activity(NoneTask { base: task("inner") })
            .with_variable(Variable::new("counter", DataType::Number(NumberType {})));
        Workflow::new("expense approval")
            .with_id(WorkflowId::new())
            .with_source_workflow_id("Process_1")
            .with_trigger(MessageTrigger {
                message: Some("expense-filed".to_string()),
            })
            .with_property("department", json!("finance"))
            .with_scope(
                Scope::default()
                    .with_activity(StartEvent { base: task("start") })
                    .with_activity(ScriptTask {
                        base: task("score"),
                        script: Some(Script {
                            language: Some("javascript".to_string()),
                            script: Some("score = amount / 10".to_string()),
                            ..Script::default()
                        }),
                    })
                    .with_activity(EmbeddedSubprocess {
                        base: task("review"),
                        scope: nested,
                    })
                    .with_transition(
                        Transition::new("start", "score")
                            .with_id("t1")
                            .with_condition(check),
                    )
                    .with_variable(
                        Variable::new("tags", DataType::list_of(DataType::Text(TextType::default())))
                            .with_name("Tags"),
                    ),
            )
    }

    #[test]
    fn workflow_round_trips_through_a_tree() {
        let mapper = JsonTreeMapper::new(registry());
        let mut workflow = sample();
        workflow.create_time = Some(Utc.with_ymd_and_hms(2024, 5, 1, 8, 30, 0).single().expect("time"));
        workflow.diagram = Some(Diagram {
            id: Some("d1".to_string()),
            nodes: vec![Node {
                id: Some("n1".to_string()),
                element_id: Some("start".to_string()),
                bounds: Some(Bounds::new(10.0, 20.0, 36.0, 36.0)),
                ..Node::default()
            }],
            ..Diagram::default()
        });

        let json = mapper.write(&workflow).expect("write");
        let read: Workflow = mapper.read(&json).expect("read");
        assert_eq!(read, workflow);
    }

    #[test]
    fn workflow_object_merges_scope_and_properties() {
        let json = JsonTreeMapper::new(registry()).write(&sample()).expect("write");
        let keys = keys(&json);
        assert_eq!(
            keys[1..],
            ["sourceWorkflowId", "name", "trigger", "activities", "transitions", "variables", "department"]
        );
        assert_eq!(json["trigger"], json!({"type": "message", "message": "expense-filed"}));
        assert_eq!(json["activities"][2]["type"], json!("embeddedSubprocess"));
        assert_eq!(json["activities"][2]["activities"][0]["id"], json!("inner"));
        assert_eq!(
            json["transitions"][0],
            json!({
                "id": "t1",
                "from": "start",
                "to": "score",
                "condition": {
                    "type": "greaterThan",
                    "left": {"expression": "amount"},
                    "right": {"value": 100}
                }
            })
        );
        assert_eq!(
            json["variables"][0]["type"],
            json!({"type": "list", "elementType": {"type": "text"}})
        );
    }

    #[test]
    fn unknown_activity_keys_are_kept_as_properties() {
        let mapper = JsonTreeMapper::new(registry());
        let json = json!({
            "activities": [
                {"type": "userTask", "id": "approve", "taskName": "Approve", "priority": 3}
            ]
        });
        let workflow: Workflow = mapper.read(&json).expect("read");
        let Some(Activity::UserTask(user_task)) = workflow.scope.activity("approve") else {
            panic!("expected a user task");
        };
        assert_eq!(user_task.task_name.as_deref(), Some("Approve"));
        let property_keys: Vec<_> = user_task.base.properties.keys().cloned().collect();
        assert_eq!(property_keys, ["priority"]);
        assert!(workflow.properties.is_empty());
        assert_eq!(mapper.write(&workflow).expect("write"), json);
    }

    #[test]
    fn stream_and_tree_agree_on_the_model() {
        let registry = registry();
        let text = JsonStreamMapper::new(registry.clone())
            .write_to_string(&sample())
            .expect("stream");
        let tree = JsonTreeMapper::new(registry).write(&sample()).expect("tree");
        assert_eq!(serde_json::from_str::<Value>(&text).expect("parse"), tree);
    }

    #[test]
    fn integer_default_values_widen_into_float_bounds() {
        let node: Node = JsonTreeMapper::new(registry())
            .read(&json!({"bounds": {"x": 1, "y": 2, "width": 3.5, "height": 4}}))
            .expect("read");
        assert_eq!(node.bounds, Some(Bounds::new(1.0, 2.0, 3.5, 4.0)));
    }

    #[test]
    fn unknown_activity_type_is_rejected() {
        let err = JsonTreeMapper::new(registry())
            .read::<Workflow>(&json!({"activities": [{"type": "teleport"}]}))
            .expect_err("unknown");
        assert!(matches!(
            err.current_context(),
            MappingError::UnknownSubtype { base, discriminator }
                if base == "Activity" && discriminator == "teleport"
        ));
    }

    #[test]
    fn configured_discriminator_field_is_used() {
        let config = JsonConfig {
            default_discriminator_field: "kind".to_string(),
            ..JsonConfig::default()
        };
        let mapper = JsonTreeMapper::new(Arc::new(registry_builder(&config).build()));
        let json = mapper
            .write(&Activity::from(EndEvent { base: task("end") }))
            .expect("write");
        assert_eq!(json, json!({"kind": "endEvent", "id": "end"}));
    }

    #[test]
    fn all_activity_ids_include_nested_scopes() {
        let ids = sample().scope.all_activity_ids();
        for id in ["start", "score", "review", "inner"] {
            assert!(ids.contains(id), "missing {id}");
        }
        assert_eq!(ids.len(), 4);
    }
}
