//! Diagram layout: shapes for activities and edges for transitions.
//!
//! Nodes and edges refer to model elements by id. Those references are
//! correlated when a BPMN document is read, so a diagram never points at
//! an element the model does not have.

use amber_lantern_mapping::{BeanType, TypeMappingBuilder, json_bean};
use amber_lantern_xml::XmlElement;

/// The layout of one workflow.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diagram {
    pub id: Option<String>,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    /// BPMN-DI content of the diagram and its plane that was not understood.
    pub bpmn: Option<XmlElement>,
}

/// A shape drawn for a model element.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Node {
    pub id: Option<String>,
    /// Id of the activity, variable, lane or participant drawn.
    pub element_id: Option<String>,
    pub bounds: Option<Bounds>,
    pub horizontal: Option<bool>,
    pub expanded: Option<bool>,
    /// Labels and foreign attributes of the shape.
    pub bpmn: Option<XmlElement>,
}

/// A line drawn for a transition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Edge {
    pub id: Option<String>,
    pub transition_id: Option<String>,
    /// Node the line starts at.
    pub from_id: Option<String>,
    /// Node the line ends at.
    pub to_id: Option<String>,
    pub waypoints: Vec<Point>,
    pub bpmn: Option<XmlElement>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Diagram {
    /// The node drawn for `element_id`.
    #[must_use]
    pub fn node_for(&self, element_id: &str) -> Option<&Node> {
        self.nodes
            .iter()
            .find(|n| n.element_id.as_deref() == Some(element_id))
    }

    /// The edge drawn for `transition_id`.
    #[must_use]
    pub fn edge_for(&self, transition_id: &str) -> Option<&Edge> {
        self.edges
            .iter()
            .find(|e| e.transition_id.as_deref() == Some(transition_id))
    }
}

impl Bounds {
    #[must_use]
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl BeanType for Diagram {
    fn describe(fields: &mut TypeMappingBuilder<Self>) {
        fields
            .field("id", |d| &d.id, |d| &mut d.id)
            .field("nodes", |d| &d.nodes, |d| &mut d.nodes)
            .field("edges", |d| &d.edges, |d| &mut d.edges);
    }
}

impl BeanType for Node {
    fn describe(fields: &mut TypeMappingBuilder<Self>) {
        fields
            .field("id", |n| &n.id, |n| &mut n.id)
            .field_as("element_id", "elementId", |n| &n.element_id, |n| &mut n.element_id)
            .field("bounds", |n| &n.bounds, |n| &mut n.bounds)
            .field("horizontal", |n| &n.horizontal, |n| &mut n.horizontal)
            .field("expanded", |n| &n.expanded, |n| &mut n.expanded);
    }
}

impl BeanType for Edge {
    fn describe(fields: &mut TypeMappingBuilder<Self>) {
        fields
            .field("id", |e| &e.id, |e| &mut e.id)
            .field_as(
                "transition_id",
                "transitionId",
                |e| &e.transition_id,
                |e| &mut e.transition_id,
            )
            .field_as("from_id", "fromId", |e| &e.from_id, |e| &mut e.from_id)
            .field_as("to_id", "toId", |e| &e.to_id, |e| &mut e.to_id)
            .field("waypoints", |e| &e.waypoints, |e| &mut e.waypoints);
    }
}

impl BeanType for Bounds {
    fn describe(fields: &mut TypeMappingBuilder<Self>) {
        fields
            .field("x", |b| &b.x, |b| &mut b.x)
            .field("y", |b| &b.y, |b| &mut b.y)
            .field("width", |b| &b.width, |b| &mut b.width)
            .field("height", |b| &b.height, |b| &mut b.height);
    }
}

impl BeanType for Point {
    fn describe(fields: &mut TypeMappingBuilder<Self>) {
        fields
            .field("x", |p| &p.x, |p| &mut p.x)
            .field("y", |p| &p.y, |p| &mut p.y);
    }
}

json_bean!(Diagram, Node, Edge, Bounds, Point);
