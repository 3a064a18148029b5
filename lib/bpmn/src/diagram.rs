//! BPMN-DI: shapes and edges of the first diagram.
//!
//! A shape is kept when its `bpmnElement` is an activity, a variable, a
//! participant or a lane. An edge is kept when it draws a transition whose
//! both ends have shapes. Edges of transitions dropped while reading, and of
//! other elements of the document, are removed quietly; an edge pointing at
//! an id the document does not contain is an error.
//!
//! Labels and foreign attributes of the diagram, its plane, and kept shapes
//! and edges are stored as residue and written back.

use crate::error::BpmnError;
use crate::rules::{BPMN_NS, BPMNDI_NS, DC_NS, DI_NS};
use crate::writer::BpmnWriter;
use amber_lantern_core::Result;
use amber_lantern_workflow::{Bounds, Diagram, Edge, Node, Point, Workflow};
use amber_lantern_xml::{Consumption, XmlDocument, XmlElement, XmlNodeId};
use std::collections::{HashMap, HashSet};
use tracing::debug;

fn attribute<'d>(document: &'d XmlDocument, element: XmlNodeId, local: &str) -> Option<&'d str> {
    document.attribute(element, None, local).map(|(_, value)| value)
}

/// Like [`attribute`], marking the attribute as read.
fn take<'d>(
    document: &'d XmlDocument,
    consumption: &mut Consumption,
    element: XmlNodeId,
    local: &str,
) -> Option<&'d str> {
    let (index, value) = document.attribute(element, None, local)?;
    consumption.consume_attribute(element, index);
    Some(value)
}

/// Claims `element`, returning what was left unread of it.
fn residue(document: &XmlDocument, consumption: &mut Consumption, element: XmlNodeId) -> Option<XmlElement> {
    let rest = document.remainder(element, consumption);
    consumption.claim(element);
    (!rest.is_empty()).then_some(rest)
}

fn describe(document: &XmlDocument, element: XmlNodeId) -> String {
    let name = &document.name(element).local;
    match attribute(document, element, "id") {
        Some(id) => format!("{name} '{id}'"),
        None => name.clone(),
    }
}

fn number(document: &XmlDocument, element: XmlNodeId, local: &str) -> Result<f64, BpmnError> {
    let value = attribute(document, element, local).unwrap_or("0");
    value.parse().map_err(|_| {
        BpmnError::InvalidValue {
            element: describe(document, element),
            expected: format!("a number for {local}"),
            value: value.to_string(),
        }
        .into()
    })
}

fn flag(
    document: &XmlDocument,
    consumption: &mut Consumption,
    element: XmlNodeId,
    local: &str,
) -> Result<Option<bool>, BpmnError> {
    match take(document, consumption, element, local) {
        None => Ok(None),
        Some("true") => Ok(Some(true)),
        Some("false") => Ok(Some(false)),
        Some(other) => Err(BpmnError::InvalidValue {
            element: describe(document, element),
            expected: "true or false".to_string(),
            value: other.to_string(),
        }
        .into()),
    }
}

/// Ids a shape may refer to.
fn shape_targets(document: &XmlDocument, workflow: &Workflow) -> HashSet<String> {
    let mut targets = workflow.scope.all_activity_ids();
    workflow.scope.visit_scopes(&mut |scope| {
        targets.extend(scope.variables.iter().filter_map(|v| v.id.clone()));
    });
    for id in document.descendants(document.root()) {
        if document.is(id, BPMN_NS, "participant") || document.is(id, BPMN_NS, "lane") {
            if let Some(value) = attribute(document, id, "id") {
                targets.insert(value.to_string());
            }
        }
    }
    targets
}

/// Reads a `BPMNDiagram` element against the workflow read from the same
/// document. The element is claimed; its unread content becomes the
/// diagram's residue.
///
/// # Errors
///
/// Returns [`BpmnError::MissingReference`] for an edge whose element does
/// not exist, or [`BpmnError::InvalidValue`] for unparseable coordinates.
pub(crate) fn read_diagram(
    document: &XmlDocument,
    consumption: &mut Consumption,
    element: XmlNodeId,
    workflow: &Workflow,
    dropped: &HashSet<String>,
) -> Result<Diagram, BpmnError> {
    let targets = shape_targets(document, workflow);
    let mut transitions: HashMap<String, (Option<String>, Option<String>)> = HashMap::new();
    workflow.scope.visit_scopes(&mut |scope| {
        for transition in &scope.transitions {
            if let Some(id) = &transition.id {
                transitions.insert(id.clone(), (transition.from_id.clone(), transition.to_id.clone()));
            }
        }
    });
    let document_ids: HashSet<&str> = document
        .descendants(document.root())
        .into_iter()
        .filter_map(|id| attribute(document, id, "id"))
        .collect();

    consumption.enter(element);
    let mut diagram = Diagram {
        id: take(document, consumption, element, "id").map(str::to_string),
        ..Diagram::default()
    };
    let mut node_by_element: HashMap<String, String> = HashMap::new();

    for plane in document.children_named(element, BPMNDI_NS, "BPMNPlane") {
        consumption.enter(plane);
        take(document, consumption, plane, "bpmnElement");

        for shape in document.children_named(plane, BPMNDI_NS, "BPMNShape") {
            let Some(element_id) = attribute(document, shape, "bpmnElement") else {
                continue;
            };
            if !targets.contains(element_id) {
                debug!(shape = %describe(document, shape), element_id, "dropping shape of unknown element");
                consumption.claim(shape);
                continue;
            }
            consumption.enter(shape);
            take(document, consumption, shape, "bpmnElement");
            let bounds = match document.child(shape, DC_NS, "Bounds") {
                Some(b) => {
                    consumption.claim(b);
                    Some(Bounds::new(
                        number(document, b, "x")?,
                        number(document, b, "y")?,
                        number(document, b, "width")?,
                        number(document, b, "height")?,
                    ))
                }
                None => None,
            };
            let mut node = Node {
                id: take(document, consumption, shape, "id").map(str::to_string),
                element_id: Some(element_id.to_string()),
                bounds,
                horizontal: flag(document, consumption, shape, "isHorizontal")?,
                expanded: flag(document, consumption, shape, "isExpanded")?,
                bpmn: None,
            };
            node.bpmn = residue(document, consumption, shape);
            if let Some(node_id) = &node.id {
                node_by_element.insert(element_id.to_string(), node_id.clone());
            }
            diagram.nodes.push(node);
        }

        for edge in document.children_named(plane, BPMNDI_NS, "BPMNEdge") {
            let Some(element_id) = attribute(document, edge, "bpmnElement") else {
                continue;
            };
            let Some((from, to)) = transitions.get(element_id) else {
                if dropped.contains(element_id) || document_ids.contains(element_id) {
                    debug!(edge = %describe(document, edge), element_id, "dropping edge of non-transition");
                    consumption.claim(edge);
                    continue;
                }
                return Err(BpmnError::MissingReference {
                    element: describe(document, edge),
                    reference: element_id.to_string(),
                }
                .into());
            };
            let node_of = |end: &Option<String>| end.as_ref().and_then(|id| node_by_element.get(id)).cloned();
            let (Some(from_id), Some(to_id)) = (node_of(from), node_of(to)) else {
                debug!(edge = %describe(document, edge), "dropping edge with an end not drawn");
                consumption.claim(edge);
                continue;
            };
            consumption.enter(edge);
            take(document, consumption, edge, "bpmnElement");
            let mut waypoints = Vec::new();
            for point in document.children_named(edge, DI_NS, "waypoint") {
                consumption.claim(point);
                waypoints.push(Point::new(number(document, point, "x")?, number(document, point, "y")?));
            }
            let id = take(document, consumption, edge, "id").map(str::to_string);
            diagram.edges.push(Edge {
                id,
                transition_id: Some(element_id.to_string()),
                from_id: Some(from_id),
                to_id: Some(to_id),
                waypoints,
                bpmn: residue(document, consumption, edge),
            });
        }
    }
    diagram.bpmn = residue(document, consumption, element);
    Ok(diagram)
}

/// Appends the diagram to the current element as a `BPMNDiagram` with one
/// plane for `process_id`. A plane id read with the diagram is kept.
pub(crate) fn write_diagram(writer: &mut BpmnWriter<'_>, diagram: &Diagram, process_id: Option<&str>) {
    writer.start_element(BPMNDI_NS, "BPMNDiagram", diagram.bpmn.as_ref());
    writer.attribute("id", diagram.id.as_deref());
    writer.start_merged(BPMNDI_NS, "BPMNPlane");
    let plane_id = diagram.id.as_ref().map(|id| format!("{id}Plane"));
    writer.default_attribute("id", plane_id.as_deref());
    writer.attribute("bpmnElement", process_id);

    for edge in diagram.edges.iter().rev() {
        writer.start_element(BPMNDI_NS, "BPMNEdge", edge.bpmn.as_ref());
        writer.attribute("id", edge.id.as_deref());
        writer.attribute("bpmnElement", edge.transition_id.as_deref());
        for point in edge.waypoints.iter().rev() {
            writer.start_element(DI_NS, "waypoint", None);
            writer.number_attribute("x", point.x);
            writer.number_attribute("y", point.y);
            writer.end_element();
        }
        writer.end_element();
    }
    for node in diagram.nodes.iter().rev() {
        writer.start_element(BPMNDI_NS, "BPMNShape", node.bpmn.as_ref());
        writer.attribute("id", node.id.as_deref());
        writer.attribute("bpmnElement", node.element_id.as_deref());
        writer.bool_attribute("isHorizontal", node.horizontal);
        writer.bool_attribute("isExpanded", node.expanded);
        if let Some(bounds) = &node.bounds {
            writer.start_element(DC_NS, "Bounds", None);
            writer.number_attribute("x", bounds.x);
            writer.number_attribute("y", bounds.y);
            writer.number_attribute("width", bounds.width);
            writer.number_attribute("height", bounds.height);
            writer.end_element();
        }
        writer.end_element();
    }

    writer.end_element();
    writer.end_element_last();
}
