//! Conditions guarding transitions.
//!
//! Conditions are trees: comparisons and checks at the leaves, `and`, `or`
//! and `not` above them. Operands are [`Binding`]s, so either side may be a
//! fixed value or an expression.

use crate::binding::Binding;
use amber_lantern_mapping::{BeanType, TypeMappingBuilder, json_bean, polymorphic};
use serde_json::Value;

macro_rules! comparison {
    ($($(#[$meta:meta])* $name:ident),+ $(,)?) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, Default, PartialEq)]
            pub struct $name {
                pub left: Option<Binding<Value>>,
                pub right: Option<Binding<Value>>,
            }

            impl $name {
                #[must_use]
                pub fn new(left: Binding<Value>, right: Binding<Value>) -> Self {
                    Self {
                        left: Some(left),
                        right: Some(right),
                    }
                }
            }

            impl BeanType for $name {
                fn describe(fields: &mut TypeMappingBuilder<Self>) {
                    fields
                        .field("left", |c| &c.left, |c| &mut c.left)
                        .field("right", |c| &c.right, |c| &mut c.right);
                }
            }
        )+
        json_bean!($($name),+);
    };
}

macro_rules! single_operand {
    ($($(#[$meta:meta])* $name:ident),+ $(,)?) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, Default, PartialEq)]
            pub struct $name {
                pub left: Option<Binding<Value>>,
            }

            impl $name {
                #[must_use]
                pub fn new(left: Binding<Value>) -> Self {
                    Self { left: Some(left) }
                }
            }

            impl BeanType for $name {
                fn describe(fields: &mut TypeMappingBuilder<Self>) {
                    fields.field("left", |c| &c.left, |c| &mut c.left);
                }
            }
        )+
        json_bean!($($name),+);
    };
}

comparison!(
    /// Both operands are equal.
    Equals,
    NotEquals,
    GreaterThan,
    LessThan,
    /// The left operand, a text or list, contains the right one.
    Contains,
);

single_operand!(IsTrue, IsFalse, HasValue, HasNoValue);

/// All nested conditions hold.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct And {
    pub conditions: Vec<Condition>,
}

/// At least one nested condition holds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Or {
    pub conditions: Vec<Condition>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Not {
    pub condition: Option<Box<Condition>>,
}

impl BeanType for And {
    fn describe(fields: &mut TypeMappingBuilder<Self>) {
        fields.field("conditions", |c| &c.conditions, |c| &mut c.conditions);
    }
}

impl BeanType for Or {
    fn describe(fields: &mut TypeMappingBuilder<Self>) {
        fields.field("conditions", |c| &c.conditions, |c| &mut c.conditions);
    }
}

impl BeanType for Not {
    fn describe(fields: &mut TypeMappingBuilder<Self>) {
        fields.field("condition", |c| &c.condition, |c| &mut c.condition);
    }
}

json_bean!(And, Or, Not);

polymorphic! {
    /// A boolean condition over bindings.
    #[derive(Debug, Clone, PartialEq)]
    pub enum Condition {
        Equals(Equals) = "equals",
        NotEquals(NotEquals) = "notEquals",
        GreaterThan(GreaterThan) = "greaterThan",
        LessThan(LessThan) = "lessThan",
        Contains(Contains) = "contains",
        IsTrue(IsTrue) = "isTrue",
        IsFalse(IsFalse) = "isFalse",
        HasValue(HasValue) = "hasValue",
        HasNoValue(HasNoValue) = "hasNoValue",
        And(And) = "and",
        Or(Or) = "or",
        Not(Not) = "not",
    }
}

impl Condition {
    /// Nested conditions of `and`, `or` and `not`.
    #[must_use]
    pub fn children(&self) -> Vec<&Condition> {
        match self {
            Self::And(c) => c.conditions.iter().collect(),
            Self::Or(c) => c.conditions.iter().collect(),
            Self::Not(c) => c.condition.iter().map(AsRef::as_ref).collect(),
            _ => Vec::new(),
        }
    }

    /// The comparison operands, left then right, if this is a leaf.
    #[must_use]
    pub fn operands(&self) -> (Option<&Binding<Value>>, Option<&Binding<Value>>) {
        match self {
            Self::Equals(c) => (c.left.as_ref(), c.right.as_ref()),
            Self::NotEquals(c) => (c.left.as_ref(), c.right.as_ref()),
            Self::GreaterThan(c) => (c.left.as_ref(), c.right.as_ref()),
            Self::LessThan(c) => (c.left.as_ref(), c.right.as_ref()),
            Self::Contains(c) => (c.left.as_ref(), c.right.as_ref()),
            Self::IsTrue(c) => (c.left.as_ref(), None),
            Self::IsFalse(c) => (c.left.as_ref(), None),
            Self::HasValue(c) => (c.left.as_ref(), None),
            Self::HasNoValue(c) => (c.left.as_ref(), None),
            Self::And(_) | Self::Or(_) | Self::Not(_) => (None, None),
        }
    }

    /// Mutable slots for the operands this condition has.
    pub fn operands_mut(
        &mut self,
    ) -> (
        Option<&mut Option<Binding<Value>>>,
        Option<&mut Option<Binding<Value>>>,
    ) {
        match self {
            Self::Equals(c) => (Some(&mut c.left), Some(&mut c.right)),
            Self::NotEquals(c) => (Some(&mut c.left), Some(&mut c.right)),
            Self::GreaterThan(c) => (Some(&mut c.left), Some(&mut c.right)),
            Self::LessThan(c) => (Some(&mut c.left), Some(&mut c.right)),
            Self::Contains(c) => (Some(&mut c.left), Some(&mut c.right)),
            Self::IsTrue(c) => (Some(&mut c.left), None),
            Self::IsFalse(c) => (Some(&mut c.left), None),
            Self::HasValue(c) => (Some(&mut c.left), None),
            Self::HasNoValue(c) => (Some(&mut c.left), None),
            Self::And(_) | Self::Or(_) | Self::Not(_) => (None, None),
        }
    }
}
