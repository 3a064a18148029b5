//! Entry points: BPMN text to [`Workflow`] and back.

use crate::config::BpmnConfig;
use crate::error::BpmnError;
use crate::reader::BpmnReader;
use crate::rules::register_bpmn_rules;
use crate::validate::{XmlSchemaValidator, validate_definitions};
use crate::writer::write_workflow;
use amber_lantern_core::Result;
use amber_lantern_mapping::{JsonConfig, TypeRegistry};
use amber_lantern_workflow::{Workflow, registry_builder};
use amber_lantern_xml::{WriteOptions, parse_document, write_document};
use std::sync::Arc;
use tracing::{info, instrument};

/// A registry with every workflow type and its BPMN element.
#[must_use]
pub fn default_registry() -> TypeRegistry {
    let mut builder = registry_builder(&JsonConfig::default());
    register_bpmn_rules(&mut builder);
    builder.build()
}

/// Reads and writes BPMN definitions.
///
/// # Examples
///
/// ```
/// use amber_lantern_bpmn::{BpmnMapper, default_registry};
/// use std::sync::Arc;
///
/// let mapper = BpmnMapper::new(Arc::new(default_registry()));
/// let workflow = mapper
///     .read_definitions(
///         r#"<definitions xmlns="http://www.omg.org/spec/BPMN/20100524/MODEL">
///              <process id="p1" name="Onboarding"><startEvent id="start"/></process>
///            </definitions>"#,
///     )
///     .unwrap();
/// assert_eq!(workflow.name.as_deref(), Some("Onboarding"));
/// ```
#[derive(Clone)]
pub struct BpmnMapper {
    registry: Arc<TypeRegistry>,
    config: BpmnConfig,
    validator: Option<Arc<dyn XmlSchemaValidator>>,
}

impl BpmnMapper {
    #[must_use]
    pub fn new(registry: Arc<TypeRegistry>) -> Self {
        Self::with_config(registry, BpmnConfig::default())
    }

    #[must_use]
    pub fn with_config(registry: Arc<TypeRegistry>, config: BpmnConfig) -> Self {
        Self {
            registry,
            config,
            validator: None,
        }
    }

    /// Validates every document before reading it.
    #[must_use]
    pub fn with_validator(mut self, validator: Arc<dyn XmlSchemaValidator>) -> Self {
        self.validator = Some(validator);
        self
    }

    #[must_use]
    pub fn config(&self) -> &BpmnConfig {
        &self.config
    }

    /// Reads the first process of a BPMN document.
    ///
    /// # Errors
    ///
    /// Returns [`BpmnError::SchemaValidation`] if a validator rejects the
    /// document, [`BpmnError::Xml`] if it is not well-formed, and any error
    /// of the reader.
    #[instrument(skip_all, fields(bytes = xml.len()))]
    pub fn read_definitions(&self, xml: &str) -> Result<Workflow, BpmnError> {
        if let Some(validator) = &self.validator {
            validate_definitions(validator.as_ref(), xml)?;
        }
        let document = parse_document(xml).map_err(|e| e.context(BpmnError::Xml))?;
        let workflow = BpmnReader::new(&self.registry, &self.config, &document).read_workflow()?;
        info!(
            process = ?workflow.source_workflow_id,
            activities = workflow.scope.activities.len(),
            "read BPMN process"
        );
        Ok(workflow)
    }

    /// Writes `workflow` as a BPMN document.
    ///
    /// # Errors
    ///
    /// Returns [`BpmnError::UnregisteredType`] for activity or timer types
    /// without a BPMN element, and [`BpmnError::Xml`] if serialization fails.
    #[instrument(skip_all, fields(process = ?workflow.source_workflow_id))]
    pub fn write_definitions(&self, workflow: &Workflow) -> Result<String, BpmnError> {
        let definitions = write_workflow(&self.registry, &self.config, workflow)?;
        let options = WriteOptions {
            indent: self.config.indent,
            declaration: true,
        };
        write_document(&definitions, &options).map_err(|e| e.context(BpmnError::Xml))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UnmatchedElementPolicy;
    use crate::error::BpmnError;
    use crate::rules::{BPMN_NS, BPMNDI_NS, DC_NS, DI_NS, EFFEKTIF_NS};
    use crate::validate::XmlSchemaValidator;
    use amber_lantern_core::WorkflowId;
    use amber_lantern_mapping::Polymorphic;
    use amber_lantern_workflow::activity::{
        ActivityBase, Call, EmailTask, EmbeddedSubprocess, EndEvent,
        ExclusiveGateway, HttpMethod, MultiInstance, NoneTask, Script, ScriptTask, StartEvent,
    };
    use amber_lantern_workflow::condition::{And, Equals, IsTrue, Not};
    use amber_lantern_workflow::data_type::{ChoiceOption, ChoiceType, EmailAddressType, TextType};
    use amber_lantern_workflow::timer::{CycleTimer, DurationTimer, TimerBase};
    use amber_lantern_workflow::{
        Activity, Binding, Bounds, Condition, DataType, Diagram, Node, Point, Scope, Timer,
        Transition, Trigger,
        Variable,
    };
    use indexmap::IndexMap;
    use serde_json::json;
    use std::error::Error;

    const ACME_NS: &str = "http://acme.example/bpmn";
    const BIOC_NS: &str = "http://bpmn.io/schema/bpmn/biocolor/1.0";

    const FIXTURE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<bpmn:definitions xmlns:bpmn="http://www.omg.org/spec/BPMN/20100524/MODEL"
    xmlns:e="http://effektif.com/bpmn20"
    xmlns:bpmndi="http://www.omg.org/spec/BPMN/20100524/DI"
    xmlns:dc="http://www.omg.org/spec/DD/20100524/DC"
    xmlns:di="http://www.omg.org/spec/DD/20100524/DI"
    xmlns:acme="http://acme.example/bpmn"
    id="defs" targetNamespace="http://acme.example" acme:exporter="Modeler 4">
  <bpmn:process id="onboarding" name="Onboarding" isExecutable="true">
    <bpmn:documentation>Welcome new hires</bpmn:documentation>
    <bpmn:extensionElements>
      <e:trigger type="form">
        <e:form>
          <e:description>Who is starting?</e:description>
          <e:field id="hire" name="New hire" required="true">
            <e:binding expression="hireName" type="text"/>
          </e:field>
        </e:form>
      </e:trigger>
      <e:variable id="hireName" name="Name" type="text"/>
      <e:variable id="tags" type="list">
        <e:elementType type="choice">
          <e:option id="a" label="A"/>
        </e:elementType>
      </e:variable>
      <e:property key="department" value="&quot;sales&quot;"/>
      <acme:audit level="high"/>
    </bpmn:extensionElements>
    <bpmn:startEvent id="start" name="Start"/>
    <bpmn:userTask id="welcome" name="Welcome" acme:color="blue">
      <bpmn:extensionElements>
        <e:taskName>Welcome the hire</e:taskName>
        <e:assignee expression="manager"/>
      </bpmn:extensionElements>
    </bpmn:userTask>
    <bpmn:serviceTask id="notify" e:type="http">
      <bpmn:extensionElements>
        <e:url>https://hooks.example/hire</e:url>
        <e:method>POST</e:method>
      </bpmn:extensionElements>
    </bpmn:serviceTask>
    <bpmn:boundaryEvent id="reminder" attachedToRef="welcome" cancelActivity="false">
      <bpmn:timerEventDefinition id="reminderTimer">
        <bpmn:timeDuration>P1D</bpmn:timeDuration>
      </bpmn:timerEventDefinition>
    </bpmn:boundaryEvent>
    <bpmn:endEvent id="end"/>
    <bpmn:sequenceFlow id="f1" sourceRef="start" targetRef="welcome"/>
    <bpmn:sequenceFlow id="f2" sourceRef="welcome" targetRef="notify">
      <bpmn:extensionElements>
        <e:equals>
          <e:left expression="hireName"/>
          <e:right value="&quot;Ada&quot;"/>
        </e:equals>
      </bpmn:extensionElements>
    </bpmn:sequenceFlow>
    <bpmn:sequenceFlow id="f3" sourceRef="notify" targetRef="end"/>
    <bpmn:sequenceFlow id="f9" sourceRef="notify" targetRef="ghost"/>
  </bpmn:process>
  <bpmndi:BPMNDiagram id="diagram">
    <bpmndi:BPMNPlane id="plane" bpmnElement="onboarding">
      <bpmndi:BPMNShape id="startShape" bpmnElement="start">
        <dc:Bounds x="10" y="20" width="36" height="36"/>
      </bpmndi:BPMNShape>
      <bpmndi:BPMNShape id="welcomeShape" bpmnElement="welcome">
        <dc:Bounds x="100" y="10" width="100" height="80"/>
      </bpmndi:BPMNShape>
      <bpmndi:BPMNShape id="ghostShape" bpmnElement="ghost">
        <dc:Bounds x="0" y="0" width="1" height="1"/>
      </bpmndi:BPMNShape>
      <bpmndi:BPMNEdge id="f1Edge" bpmnElement="f1">
        <di:waypoint x="46" y="38"/>
        <di:waypoint x="100" y="50"/>
      </bpmndi:BPMNEdge>
      <bpmndi:BPMNEdge id="f2Edge" bpmnElement="f2">
        <di:waypoint x="200" y="50"/>
        <di:waypoint x="300" y="50"/>
      </bpmndi:BPMNEdge>
      <bpmndi:BPMNEdge id="f9Edge" bpmnElement="f9"/>
    </bpmndi:BPMNPlane>
  </bpmndi:BPMNDiagram>
</bpmn:definitions>
"#;

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    fn mapper() -> BpmnMapper {
        init_tracing();
        BpmnMapper::new(Arc::new(default_registry()))
    }

    fn wrap(body: &str) -> String {
        format!(
            r#"<definitions xmlns="{BPMN_NS}" xmlns:e="{EFFEKTIF_NS}"><process id="p">{body}</process></definitions>"#
        )
    }

    fn base(id: &str) -> ActivityBase {
        ActivityBase {
            id: Some(id.to_string()),
            ..ActivityBase::default()
        }
    }

    fn read_fixture() -> Workflow {
        mapper().read_definitions(FIXTURE).expect("fixture reads")
    }

    #[test]
    fn reads_process_metadata_and_extensions() {
        let workflow = read_fixture();
        assert_eq!(workflow.source_workflow_id.as_deref(), Some("onboarding"));
        assert_eq!(workflow.name.as_deref(), Some("Onboarding"));
        assert_eq!(workflow.description.as_deref(), Some("Welcome new hires"));
        assert_eq!(workflow.properties.get("department"), Some(&json!("sales")));

        let Some(Trigger::Form(trigger)) = &workflow.trigger else {
            panic!("expected a form trigger, got {:?}", workflow.trigger);
        };
        let form = trigger.form.as_ref().expect("form");
        assert_eq!(form.description.as_deref(), Some("Who is starting?"));
        assert_eq!(form.fields.len(), 1);
        assert_eq!(form.fields[0].required, Some(true));
        assert_eq!(
            form.fields[0].binding,
            Some(Binding::from_expression("hireName").with_data_type(DataType::Text(TextType::default())))
        );

        let variables = &workflow.scope.variables;
        assert_eq!(variables.len(), 2);
        assert_eq!(variables[0].name.as_deref(), Some("Name"));
        assert_eq!(
            variables[1].data_type,
            Some(DataType::list_of(DataType::Choice(ChoiceType {
                options: vec![ChoiceOption {
                    id: Some("a".to_string()),
                    label: Some("A".to_string()),
                }],
            })))
        );
    }

    #[test]
    fn reads_activities_by_element_and_guard() {
        let workflow = read_fixture();
        let kinds: Vec<&str> = workflow.scope.activities.iter().map(Polymorphic::type_name).collect();
        assert_eq!(
            kinds,
            ["startEvent", "userTask", "httpServiceTask", "boundaryEvent", "endEvent"]
        );

        let Some(Activity::UserTask(welcome)) = workflow.scope.activity("welcome") else {
            panic!("welcome is not a user task");
        };
        assert_eq!(welcome.task_name.as_deref(), Some("Welcome the hire"));
        assert_eq!(welcome.assignee, Some(Binding::from_expression("manager")));

        let Some(Activity::HttpServiceTask(notify)) = workflow.scope.activity("notify") else {
            panic!("notify is not an http service task");
        };
        assert_eq!(notify.url.as_deref(), Some("https://hooks.example/hire"));
        assert_eq!(notify.method, Some(HttpMethod::Post));
        assert_eq!(notify.base.bpmn, None, "guard attribute is not residue");
    }

    #[test]
    fn java_guard_selects_java_service_task() {
        let xml = wrap(
            r#"<serviceTask id="mail" e:type="java">
                 <extensionElements>
                   <e:javaClass>com.acme.Mailer</e:javaClass>
                   <e:methodName>send</e:methodName>
                   <e:argument expression="hireName"/>
                 </extensionElements>
               </serviceTask>"#,
        );
        let workflow = mapper().read_definitions(&xml).expect("read");
        let Some(Activity::JavaServiceTask(task)) = workflow.scope.activity("mail") else {
            panic!("expected java service task");
        };
        assert_eq!(task.java_class.as_deref(), Some("com.acme.Mailer"));
        assert_eq!(task.method_name.as_deref(), Some("send"));
        assert_eq!(task.arg_bindings, vec![Binding::from_expression("hireName")]);
    }

    #[test]
    fn boundary_timers_attach_to_their_activity() {
        let workflow = read_fixture();
        assert!(workflow.scope.timers.is_empty());
        let welcome = workflow.scope.activity("welcome").expect("welcome");
        assert_eq!(
            welcome.base().timers,
            vec![Timer::Duration(DurationTimer {
                base: TimerBase {
                    id: Some("reminderTimer".to_string()),
                    boundary_event_id: Some("reminder".to_string()),
                    attached_activity_id: Some("welcome".to_string()),
                },
                duration: Some("P1D".to_string()),
            })]
        );
        let Some(Activity::BoundaryEvent(reminder)) = workflow.scope.activity("reminder") else {
            panic!("reminder is not a boundary event");
        };
        assert_eq!(reminder.attached_to_activity_id.as_deref(), Some("welcome"));
        assert_eq!(reminder.cancel_activity, Some(false));
    }

    #[test]
    fn transitions_with_unknown_endpoints_are_dropped() {
        let workflow = read_fixture();
        let ids: Vec<&str> = workflow
            .scope
            .transitions
            .iter()
            .filter_map(|t| t.id.as_deref())
            .collect();
        assert_eq!(ids, ["f1", "f2", "f3"]);

        let condition = workflow.scope.transition("f2").and_then(|t| t.condition.as_ref());
        assert_eq!(
            condition,
            Some(&Condition::Equals(Equals::new(
                Binding::from_expression("hireName"),
                Binding::from_value(json!("Ada")),
            )))
        );
    }

    #[test]
    fn diagram_keeps_only_correlated_shapes_and_edges() {
        let workflow = read_fixture();
        let diagram = workflow.diagram.expect("diagram");
        assert_eq!(diagram.id.as_deref(), Some("diagram"));

        let nodes: Vec<&str> = diagram.nodes.iter().filter_map(|n| n.id.as_deref()).collect();
        assert_eq!(nodes, ["startShape", "welcomeShape"]);
        assert_eq!(
            diagram.node_for("welcome").and_then(|n| n.bounds.clone()),
            Some(Bounds::new(100.0, 10.0, 100.0, 80.0))
        );

        assert_eq!(diagram.edges.len(), 1, "f2 ends at an undrawn task, f9 was dropped");
        let edge = diagram.edge_for("f1").expect("f1 edge");
        assert_eq!(edge.from_id.as_deref(), Some("startShape"));
        assert_eq!(edge.to_id.as_deref(), Some("welcomeShape"));
        assert_eq!(edge.waypoints, vec![Point::new(46.0, 38.0), Point::new(100.0, 50.0)]);
    }

    #[test]
    fn edge_to_unknown_element_is_an_error() {
        let xml = format!(
            r#"<definitions xmlns="{BPMN_NS}" xmlns:di="{BPMNDI_NS}">
                 <process id="p"><startEvent id="s"/></process>
                 <di:BPMNDiagram id="d">
                   <di:BPMNPlane id="pl" bpmnElement="p">
                     <di:BPMNEdge id="e1" bpmnElement="nowhere"/>
                   </di:BPMNPlane>
                 </di:BPMNDiagram>
               </definitions>"#
        );
        let err = mapper().read_definitions(&xml).expect_err("dangling edge");
        assert_eq!(
            err.current_context(),
            &BpmnError::MissingReference {
                element: "BPMNEdge 'e1'".to_string(),
                reference: "nowhere".to_string(),
            }
        );
    }

    #[test]
    fn unrecognized_content_is_kept_as_residue() {
        let workflow = read_fixture();

        let welcome = workflow.scope.activity("welcome").expect("welcome");
        let residue = welcome.base().bpmn.as_ref().expect("activity residue");
        assert_eq!(residue.attribute(Some(ACME_NS), "color"), Some("blue"));
        assert_eq!(residue.attribute(None, "id"), None);
        assert!(residue.children.is_empty());

        let process = workflow.scope.bpmn.as_ref().expect("process residue");
        assert_eq!(process.attribute(None, "isExecutable"), Some("true"));
        let extensions = process
            .child(Some(BPMN_NS), "extensionElements")
            .expect("extension residue");
        assert_eq!(extensions.children.len(), 1);
        assert_eq!(
            extensions.children[0].attribute(None, "level"),
            Some("high")
        );

        let definitions = workflow.bpmn_definitions.as_ref().expect("definitions residue");
        assert_eq!(definitions.attribute(Some(ACME_NS), "exporter"), Some("Modeler 4"));
        assert!(definitions.children.is_empty());
    }

    #[test]
    fn round_trip_preserves_the_model() {
        let mapper = mapper();
        let workflow = read_fixture();
        let xml = mapper.write_definitions(&workflow).expect("write");
        let reread = mapper.read_definitions(&xml).expect("reread");
        assert_eq!(reread, workflow);
    }

    #[test]
    fn written_xml_keeps_foreign_content() {
        let mapper = mapper();
        let xml = mapper.write_definitions(&read_fixture()).expect("write");
        assert!(xml.contains(r#"acme:color="blue""#), "{xml}");
        assert!(xml.contains(r#"acme:exporter="Modeler 4""#), "{xml}");
        assert!(xml.contains(r#"<acme:audit level="high"/>"#), "{xml}");
        assert!(xml.contains(r#"e:type="http""#), "{xml}");
        assert!(!xml.contains("ghost"), "{xml}");
    }

    #[test]
    fn every_activity_type_round_trips() {
        let mapper = mapper();
        let condition = Condition::And(And {
            conditions: vec![
                Condition::Equals(Equals::new(
                    Binding::from_expression("total"),
                    Binding::from_value(json!(10)),
                )),
                Condition::Not(Not {
                    condition: Some(Box::new(Condition::IsTrue(IsTrue::new(
                        Binding::from_expression("flagged"),
                    )))),
                }),
            ],
        });
        let scope = Scope::default()
            .with_activity(StartEvent { base: base("start") })
            .with_activity(ScriptTask {
                base: base("compute"),
                script: Some(Script {
                    language: Some("javascript".to_string()),
                    script: Some("total = a + b".to_string()),
                    mappings: IndexMap::from([("a".to_string(), "amount".to_string())]),
                }),
            })
            .with_activity(ExclusiveGateway {
                base: ActivityBase {
                    default_transition_id: Some("toEnd".to_string()),
                    ..base("decide")
                },
            })
            .with_activity(Call {
                base: base("approve"),
                sub_workflow_id: Some(WorkflowId::new()),
                sub_workflow_source: Some("approval".to_string()),
                input_bindings: IndexMap::from([(
                    "amount".to_string(),
                    Binding::from_expression("amount"),
                )]),
            })
            .with_activity(EmailTask {
                base: ActivityBase {
                    multi_instance: Some(MultiInstance {
                        variables: vec![Variable::new(
                            "recipient",
                            DataType::EmailAddress(EmailAddressType::default()),
                        )],
                        values: vec![Binding::from_expression("recipients")],
                        sequential: Some(true),
                    }),
                    ..base("mail")
                },
                from: Some(Binding::from_value("noreply@example.com".to_string())),
                to: vec![Binding::from_expression("recipient")],
                subject: Some(Binding::from_value("Done".to_string())),
                body_text: None,
            })
            .with_activity(EmbeddedSubprocess {
                base: base("review"),
                scope: Scope::default()
                    .with_activity(NoneTask { base: base("check") })
                    .with_variable(Variable::new(
                        "note",
                        DataType::Text(TextType {
                            multi_line: Some(true),
                        }),
                    )),
            })
            .with_activity(EndEvent { base: base("end") })
            .with_transition(Transition::new("start", "compute").with_id("t0"))
            .with_transition(Transition::new("compute", "decide").with_id("t1"))
            .with_transition(
                Transition::new("decide", "approve")
                    .with_id("t2")
                    .with_condition(condition),
            )
            .with_transition(Transition::new("decide", "end").with_id("toEnd"))
            .with_transition(Transition::new("approve", "mail").with_id("t3"))
            .with_transition(Transition::new("mail", "review").with_id("t4"))
            .with_transition(Transition::new("review", "end").with_id("t5"))
            .with_variable(Variable::new("amount", DataType::Number(Default::default())));
        let workflow = Workflow::new("Expense")
            .with_source_workflow_id("expense")
            .with_scope(scope);

        let xml = mapper.write_definitions(&workflow).expect("write");
        let reread = mapper.read_definitions(&xml).expect("reread");
        assert_eq!(reread.scope, workflow.scope, "{xml}");
        assert_eq!(reread.name, workflow.name);
    }

    #[test]
    fn orphan_timers_get_a_boundary_event() {
        let mapper = mapper();
        let mut scope = Scope::default().with_activity(NoneTask { base: base("wait") });
        scope.timers.push(Timer::Cycle(CycleTimer {
            base: TimerBase {
                id: Some("tick".to_string()),
                boundary_event_id: None,
                attached_activity_id: Some("wait".to_string()),
            },
            cycle: Some("R3/PT1H".to_string()),
        }));
        let workflow = Workflow::new("Poll")
            .with_source_workflow_id("poll")
            .with_scope(scope);

        let xml = mapper.write_definitions(&workflow).expect("write");
        let reread = mapper.read_definitions(&xml).expect("reread");

        let Some(Activity::BoundaryEvent(event)) = reread.scope.activity("tickEvent") else {
            panic!("expected a boundary event in {xml}");
        };
        assert_eq!(event.attached_to_activity_id.as_deref(), Some("wait"));
        let timers = &reread.scope.activity("wait").expect("wait").base().timers;
        assert_eq!(timers.len(), 1);
        assert_eq!(timers[0].base().boundary_event_id.as_deref(), Some("tickEvent"));
        assert!(reread.scope.timers.is_empty());
    }

    #[test]
    fn writes_new_workflow_with_default_namespaces() {
        let workflow = Workflow::new("Expense")
            .with_source_workflow_id("expense")
            .with_scope(
                Scope::default()
                    .with_activity(StartEvent { base: base("start") })
                    .with_activity(EndEvent { base: base("end") })
                    .with_transition(Transition::new("start", "end").with_id("flow")),
            );
        let xml = mapper().write_definitions(&workflow).expect("write");
        assert!(xml.starts_with("<?xml"), "{xml}");
        assert!(xml.contains(r#"xmlns:bpmn="http://www.omg.org/spec/BPMN/20100524/MODEL""#));
        assert!(xml.contains(r#"xmlns:e="http://effektif.com/bpmn20""#));
        assert!(xml.contains(r#"<bpmn:process id="expense" name="Expense">"#), "{xml}");
        assert!(xml.contains(r#"<bpmn:startEvent id="start"/>"#), "{xml}");
        assert!(
            xml.contains(r#"<bpmn:sequenceFlow id="flow" sourceRef="start" targetRef="end"/>"#),
            "{xml}"
        );
        assert!(!xml.contains("BPMNDiagram"));
    }

    #[test]
    fn ambiguous_service_task_is_rejected_by_default() {
        let err = mapper()
            .read_definitions(&wrap(r#"<serviceTask id="s1"/>"#))
            .expect_err("ambiguous");
        assert_eq!(
            err.current_context(),
            &BpmnError::AmbiguousElement {
                element: "serviceTask".to_string(),
                id: Some("s1".to_string()),
                candidates: vec!["javaServiceTask".to_string(), "httpServiceTask".to_string()],
            }
        );
    }

    #[test]
    fn ambiguous_service_task_can_be_left_unparsed() {
        let config = BpmnConfig {
            unmatched_elements: UnmatchedElementPolicy::LeaveUnparsed,
            ..BpmnConfig::default()
        };
        let mapper = BpmnMapper::with_config(Arc::new(default_registry()), config);
        let workflow = mapper
            .read_definitions(&wrap(r#"<serviceTask id="s1"/><endEvent id="end"/>"#))
            .expect("read");
        assert_eq!(workflow.scope.activities.len(), 1);
        let process = workflow.scope.bpmn.as_ref().expect("process residue");
        let task = process.child(Some(BPMN_NS), "serviceTask").expect("kept");
        assert_eq!(task.attribute(None, "id"), Some("s1"));

        let xml = mapper.write_definitions(&workflow).expect("write");
        assert!(xml.contains(r#"<serviceTask id="s1"/>"#), "{xml}");
    }

    #[test]
    fn invalid_boolean_attribute_is_reported() {
        let err = mapper()
            .read_definitions(&wrap(r#"<boundaryEvent id="b" cancelActivity="maybe"/>"#))
            .expect_err("invalid");
        assert_eq!(
            err.current_context(),
            &BpmnError::InvalidValue {
                element: "boundaryEvent 'b'".to_string(),
                expected: "true or false".to_string(),
                value: "maybe".to_string(),
            }
        );
    }

    #[test]
    fn document_without_process_is_rejected() {
        let xml = format!(r#"<definitions xmlns="{BPMN_NS}"/>"#);
        let err = mapper().read_definitions(&xml).expect_err("no process");
        assert_eq!(err.current_context(), &BpmnError::MissingProcess);
    }

    #[test]
    fn malformed_xml_is_an_xml_error() {
        let err = mapper()
            .read_definitions("<definitions><process></definitions>")
            .expect_err("malformed");
        assert_eq!(err.current_context(), &BpmnError::Xml);
    }

    #[test]
    fn diagram_labels_and_foreign_attributes_survive() {
        let mapper = mapper();
        let xml = format!(
            r#"<definitions xmlns="{BPMN_NS}" xmlns:e="{EFFEKTIF_NS}" xmlns:bpmndi="{BPMNDI_NS}"
                   xmlns:dc="{DC_NS}" xmlns:di="{DI_NS}" xmlns:bioc="{BIOC_NS}">
                 <process id="p">
                   <startEvent id="s"/>
                   <endEvent id="e"/>
                   <sequenceFlow id="f" sourceRef="s" targetRef="e"/>
                 </process>
                 <bpmndi:BPMNDiagram id="d">
                   <bpmndi:BPMNPlane id="myPlane" bpmnElement="p">
                     <bpmndi:BPMNShape id="sShape" bpmnElement="s" bioc:stroke="red">
                       <dc:Bounds x="0" y="0" width="36" height="36"/>
                       <bpmndi:BPMNLabel>
                         <dc:Bounds x="0" y="40" width="30" height="14"/>
                       </bpmndi:BPMNLabel>
                     </bpmndi:BPMNShape>
                     <bpmndi:BPMNShape id="eShape" bpmnElement="e">
                       <dc:Bounds x="100" y="0" width="36" height="36"/>
                     </bpmndi:BPMNShape>
                     <bpmndi:BPMNEdge id="fEdge" bpmnElement="f" bioc:stroke="blue">
                       <di:waypoint x="36" y="18"/>
                       <di:waypoint x="100" y="18"/>
                     </bpmndi:BPMNEdge>
                   </bpmndi:BPMNPlane>
                 </bpmndi:BPMNDiagram>
               </definitions>"#
        );
        let workflow = mapper.read_definitions(&xml).expect("read");
        let diagram = workflow.diagram.as_ref().expect("diagram");

        let start = diagram.node_for("s").expect("start shape");
        let residue = start.bpmn.as_ref().expect("shape residue");
        assert_eq!(residue.attribute(Some(BIOC_NS), "stroke"), Some("red"));
        assert_eq!(residue.attribute(None, "id"), None);
        let label = residue.child(Some(BPMNDI_NS), "BPMNLabel").expect("label");
        assert!(label.child(Some(DC_NS), "Bounds").is_some());
        assert!(residue.child(Some(DC_NS), "Bounds").is_none());
        assert_eq!(diagram.node_for("e").and_then(|n| n.bpmn.as_ref()), None);

        let edge = diagram.edge_for("f").expect("edge");
        assert_eq!(edge.waypoints.len(), 2);
        let residue = edge.bpmn.as_ref().expect("edge residue");
        assert_eq!(residue.attribute(Some(BIOC_NS), "stroke"), Some("blue"));
        assert!(residue.children.is_empty());

        let plane = diagram
            .bpmn
            .as_ref()
            .and_then(|d| d.child(Some(BPMNDI_NS), "BPMNPlane"))
            .expect("plane residue");
        assert_eq!(plane.attribute(None, "id"), Some("myPlane"));
        assert!(plane.children.is_empty());

        let written = mapper.write_definitions(&workflow).expect("write");
        assert!(written.contains(r#"bioc:stroke="red""#), "{written}");
        assert!(written.contains(r#"bioc:stroke="blue""#), "{written}");
        assert!(written.contains(r#"id="myPlane""#), "{written}");
        assert!(!written.contains("dPlane"), "{written}");
        assert_eq!(written.matches("<bpmndi:BPMNLabel>").count(), 1, "{written}");

        let reread = mapper.read_definitions(&written).expect("reread");
        assert_eq!(reread, workflow);
    }

    #[test]
    fn plane_id_is_derived_for_new_diagrams() {
        let mut workflow = Workflow::new("Drawn")
            .with_source_workflow_id("drawn")
            .with_scope(Scope::default().with_activity(StartEvent { base: base("start") }));
        workflow.diagram = Some(Diagram {
            id: Some("d".to_string()),
            nodes: vec![Node {
                id: Some("startShape".to_string()),
                element_id: Some("start".to_string()),
                bounds: Some(Bounds::new(0.0, 0.0, 36.0, 36.0)),
                ..Node::default()
            }],
            ..Diagram::default()
        });
        let xml = mapper().write_definitions(&workflow).expect("write");
        assert!(
            xml.contains(r#"<bpmndi:BPMNPlane id="dPlane" bpmnElement="drawn">"#),
            "{xml}"
        );
    }

    #[test]
    fn untyped_trigger_is_left_as_residue() {
        let xml = wrap(
            r#"<extensionElements><e:trigger><e:form/></e:trigger></extensionElements>
               <startEvent id="start"/>"#,
        );
        let workflow = mapper().read_definitions(&xml).expect("read");
        assert_eq!(workflow.trigger, None);
        let extensions = workflow
            .scope
            .bpmn
            .as_ref()
            .and_then(|p| p.child(Some(BPMN_NS), "extensionElements"))
            .expect("extension residue");
        let trigger = extensions.child(Some(EFFEKTIF_NS), "trigger").expect("trigger kept");
        assert!(trigger.child(Some(EFFEKTIF_NS), "form").is_some());
    }

    #[test]
    fn unknown_trigger_type_is_an_error() {
        let xml = wrap(r#"<extensionElements><e:trigger type="webhook"/></extensionElements>"#);
        let err = mapper().read_definitions(&xml).expect_err("unknown trigger");
        assert_eq!(
            err.current_context(),
            &BpmnError::UnknownSubtype {
                base: "Trigger".to_string(),
                discriminator: "webhook".to_string(),
            }
        );
    }

    fn header_names(workflow: &Workflow) -> Vec<String> {
        match workflow.scope.activity("call") {
            Some(Activity::HttpServiceTask(task)) => task.headers.keys().cloned().collect(),
            other => panic!("expected an http service task, got {other:?}"),
        }
    }

    #[test]
    fn headers_keep_document_order() {
        let mapper = mapper();
        let xml = wrap(
            r#"<serviceTask id="call" e:type="http">
                 <extensionElements>
                   <e:url>https://hooks.example/call</e:url>
                   <e:header name="X-Zeta" value="1"/>
                   <e:header name="Accept" value="application/json"/>
                   <e:header name="X-Mid" value="2"/>
                 </extensionElements>
               </serviceTask>"#,
        );
        let workflow = mapper.read_definitions(&xml).expect("read");
        assert_eq!(header_names(&workflow), ["X-Zeta", "Accept", "X-Mid"]);

        let written = mapper.write_definitions(&workflow).expect("write");
        let reread = mapper.read_definitions(&written).expect("reread");
        assert_eq!(header_names(&reread), ["X-Zeta", "Accept", "X-Mid"]);
    }

    struct RejectEverything;

    impl XmlSchemaValidator for RejectEverything {
        fn validate(&self, _xml: &str) -> std::result::Result<(), Box<dyn Error + Send + Sync>> {
            Err("cvc-elt.1: cannot find the declaration of element 'definitions'".into())
        }
    }

    #[test]
    fn validator_runs_before_reading() {
        let mapper = mapper().with_validator(Arc::new(RejectEverything));
        let err = mapper.read_definitions(FIXTURE).expect_err("rejected");
        assert_eq!(
            err.current_context(),
            &BpmnError::SchemaValidation {
                message: "cvc-elt.1: cannot find the declaration of element 'definitions'"
                    .to_string(),
            }
        );
    }
}
