//! Data types of variables and bindings.

use amber_lantern_mapping::{BeanType, TypeMappingBuilder, json_bean, polymorphic};

/// Free text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextType {
    /// Whether the text spans several lines.
    pub multi_line: Option<bool>,
}

/// Any JSON number.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NumberType {}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BooleanType {}

/// A point in time, optionally restricted to its date or time part.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DateType {
    /// `date`, `time` or `datetime`.
    pub kind: Option<String>,
}

/// A list of values of one element type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListType {
    pub element_type: Option<Box<DataType>>,
}

/// One of a fixed set of options.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChoiceType {
    pub options: Vec<ChoiceOption>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChoiceOption {
    pub id: Option<String>,
    pub label: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmailAddressType {}

/// A URL.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinkType {}

polymorphic! {
    /// The type of a variable or binding value.
    #[derive(Debug, Clone, PartialEq)]
    pub enum DataType {
        Text(TextType) = "text",
        Number(NumberType) = "number",
        Boolean(BooleanType) = "boolean",
        Date(DateType) = "date",
        List(ListType) = "list",
        Choice(ChoiceType) = "choice",
        EmailAddress(EmailAddressType) = "email",
        Link(LinkType) = "link",
    }
}

impl DataType {
    /// A list of `element_type` values.
    #[must_use]
    pub fn list_of(element_type: DataType) -> Self {
        Self::List(ListType {
            element_type: Some(Box::new(element_type)),
        })
    }
}

impl BeanType for TextType {
    fn describe(fields: &mut TypeMappingBuilder<Self>) {
        fields.field_as("multi_line", "multiLine", |t| &t.multi_line, |t| &mut t.multi_line);
    }
}

impl BeanType for NumberType {
    fn describe(_fields: &mut TypeMappingBuilder<Self>) {}
}

impl BeanType for BooleanType {
    fn describe(_fields: &mut TypeMappingBuilder<Self>) {}
}

impl BeanType for DateType {
    fn describe(fields: &mut TypeMappingBuilder<Self>) {
        fields.field("kind", |t| &t.kind, |t| &mut t.kind);
    }
}

impl BeanType for ListType {
    fn describe(fields: &mut TypeMappingBuilder<Self>) {
        fields.field_as(
            "element_type",
            "elementType",
            |t| &t.element_type,
            |t| &mut t.element_type,
        );
    }
}

impl BeanType for ChoiceType {
    fn describe(fields: &mut TypeMappingBuilder<Self>) {
        fields.field("options", |t| &t.options, |t| &mut t.options);
    }
}

impl BeanType for ChoiceOption {
    fn describe(fields: &mut TypeMappingBuilder<Self>) {
        fields
            .field("id", |o| &o.id, |o| &mut o.id)
            .field("label", |o| &o.label, |o| &mut o.label);
    }
}

impl BeanType for EmailAddressType {
    fn describe(_fields: &mut TypeMappingBuilder<Self>) {}
}

impl BeanType for LinkType {
    fn describe(_fields: &mut TypeMappingBuilder<Self>) {}
}

json_bean!(
    TextType,
    NumberType,
    BooleanType,
    DateType,
    ListType,
    ChoiceType,
    ChoiceOption,
    EmailAddressType,
    LinkType,
);
