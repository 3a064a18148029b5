//! JSON writer abstraction and its two backends.
//!
//! Mappers emit values through the [`JsonWriter`] token interface and never
//! see which backend they are writing to:
//!
//! - [`StreamingJsonWriter`] writes text to any `io::Write` in one forward
//!   pass.
//! - [`TreeJsonWriter`] builds an ordered `serde_json::Value`.
//!
//! # Inlining
//!
//! `inline_start` announces that the next object value should not open an
//! object of its own; its fields are merged into the enclosing object
//! instead. A key that the enclosing object already holds is skipped along
//! with its whole value, so fields written earlier win. Bean mappers write
//! named fields before inline ones, which makes named fields win over
//! inlined maps.

use crate::error::MappingError;
use amber_lantern_core::Result;
use serde_json::{Map, Number, Value};
use std::collections::HashSet;
use std::io;

/// Token-level JSON output.
pub trait JsonWriter {
    fn object_start(&mut self) -> Result<(), MappingError>;
    fn object_end(&mut self) -> Result<(), MappingError>;
    fn array_start(&mut self) -> Result<(), MappingError>;
    fn array_end(&mut self) -> Result<(), MappingError>;
    fn write_field_name(&mut self, name: &str) -> Result<(), MappingError>;
    fn write_string(&mut self, value: &str) -> Result<(), MappingError>;
    fn write_boolean(&mut self, value: bool) -> Result<(), MappingError>;
    fn write_number(&mut self, value: &Number) -> Result<(), MappingError>;
    fn write_null(&mut self) -> Result<(), MappingError>;
    /// Merges the next object value into the enclosing object.
    fn inline_start(&mut self) -> Result<(), MappingError>;
    /// Ends an inline section opened by [`JsonWriter::inline_start`].
    fn inline_end(&mut self) -> Result<(), MappingError>;
}

/// Writes a raw JSON value through a [`JsonWriter`].
///
/// # Errors
///
/// Propagates writer errors.
pub fn write_json_value(writer: &mut dyn JsonWriter, value: &Value) -> Result<(), MappingError> {
    match value {
        Value::Null => writer.write_null(),
        Value::Bool(b) => writer.write_boolean(*b),
        Value::Number(n) => writer.write_number(n),
        Value::String(s) => writer.write_string(s),
        Value::Array(items) => {
            writer.array_start()?;
            for item in items {
                write_json_value(writer, item)?;
            }
            writer.array_end()
        }
        Value::Object(map) => {
            writer.object_start()?;
            for (key, item) in map {
                writer.write_field_name(key)?;
                write_json_value(writer, item)?;
            }
            writer.object_end()
        }
    }
}

/// Tracks a value being discarded because its key was a duplicate.
#[derive(Debug, Default)]
struct Discard {
    /// `Some(depth)` while discarding; depth counts open containers.
    depth: Option<usize>,
}

impl Discard {
    fn begin(&mut self) {
        self.depth = Some(0);
    }

    fn active(&self) -> bool {
        self.depth.is_some()
    }

    /// A scalar arrived. Returns true if it was swallowed.
    fn scalar(&mut self) -> bool {
        match self.depth {
            Some(0) => {
                self.depth = None;
                true
            }
            Some(_) => true,
            None => false,
        }
    }

    fn open(&mut self) -> bool {
        match &mut self.depth {
            Some(depth) => {
                *depth += 1;
                true
            }
            None => false,
        }
    }

    fn close(&mut self) -> bool {
        match self.depth {
            Some(1) => {
                self.depth = None;
                true
            }
            Some(depth) => {
                self.depth = Some(depth.saturating_sub(1));
                true
            }
            None => false,
        }
    }
}

#[derive(Debug)]
enum StreamFrame {
    Object { keys: HashSet<String>, count: usize },
    Array { count: usize },
    Inline,
}

/// Writes JSON text to a sink in a single forward pass.
pub struct StreamingJsonWriter<W: io::Write> {
    out: W,
    pretty: bool,
    frames: Vec<StreamFrame>,
    pending_inline: usize,
    discard: Discard,
}

impl<W: io::Write> StreamingJsonWriter<W> {
    #[must_use]
    pub fn new(out: W) -> Self {
        Self {
            out,
            pretty: false,
            frames: Vec::new(),
            pending_inline: 0,
            discard: Discard::default(),
        }
    }

    /// Indents nested values by two spaces.
    #[must_use]
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// Returns the sink.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn raw(&mut self, bytes: &[u8]) -> Result<(), MappingError> {
        self.out.write_all(bytes).map_err(|e| {
            MappingError::Io {
                details: e.to_string(),
            }
            .into()
        })
    }

    fn depth(&self) -> usize {
        self.frames
            .iter()
            .filter(|f| !matches!(f, StreamFrame::Inline))
            .count()
    }

    fn newline(&mut self, depth: usize) -> Result<(), MappingError> {
        if self.pretty {
            let mut line = String::with_capacity(depth * 2 + 1);
            line.push('\n');
            line.extend(std::iter::repeat_n(' ', depth * 2));
            self.raw(line.as_bytes())?;
        }
        Ok(())
    }

    /// Writes the separator before an array element. Object values need
    /// none: their key already did that.
    fn before_value(&mut self) -> Result<(), MappingError> {
        let depth = self.depth();
        if let Some(StreamFrame::Array { count }) = self.frames.last_mut() {
            let first = *count == 0;
            *count += 1;
            if !first {
                self.raw(b",")?;
            }
            self.newline(depth)?;
        }
        Ok(())
    }

    fn nearest_object(&mut self) -> Option<(&mut HashSet<String>, &mut usize)> {
        match self
            .frames
            .iter_mut()
            .rev()
            .find(|f| !matches!(f, StreamFrame::Inline))
        {
            Some(StreamFrame::Object { keys, count }) => Some((keys, count)),
            _ => None,
        }
    }

    /// A non-object value cannot be inlined; it is dropped.
    fn swallow_inlined_scalar(&mut self) -> bool {
        if self.pending_inline > 0 {
            self.pending_inline -= 1;
            true
        } else {
            false
        }
    }

    fn scalar(&mut self, text: &[u8]) -> Result<(), MappingError> {
        if self.discard.scalar() || self.swallow_inlined_scalar() {
            return Ok(());
        }
        self.before_value()?;
        self.raw(text)
    }

    fn close(&mut self, closing: u8) -> Result<(), MappingError> {
        if self.discard.close() {
            return Ok(());
        }
        match self.frames.pop() {
            Some(StreamFrame::Inline) => Ok(()),
            Some(StreamFrame::Object { count, .. } | StreamFrame::Array { count }) => {
                if count > 0 {
                    let depth = self.depth();
                    self.newline(depth)?;
                }
                self.raw(&[closing])
            }
            None => Err(MappingError::Io {
                details: "unbalanced JSON container end".to_string(),
            }
            .into()),
        }
    }
}

impl<W: io::Write> JsonWriter for StreamingJsonWriter<W> {
    fn object_start(&mut self) -> Result<(), MappingError> {
        if self.discard.open() {
            return Ok(());
        }
        if self.pending_inline > 0 {
            self.pending_inline -= 1;
            self.frames.push(StreamFrame::Inline);
            return Ok(());
        }
        self.before_value()?;
        self.raw(b"{")?;
        self.frames.push(StreamFrame::Object {
            keys: HashSet::new(),
            count: 0,
        });
        Ok(())
    }

    fn object_end(&mut self) -> Result<(), MappingError> {
        self.close(b'}')
    }

    fn array_start(&mut self) -> Result<(), MappingError> {
        if self.discard.open() {
            return Ok(());
        }
        if self.pending_inline > 0 {
            self.pending_inline -= 1;
            self.discard.begin();
            self.discard.open();
            return Ok(());
        }
        self.before_value()?;
        self.raw(b"[")?;
        self.frames.push(StreamFrame::Array { count: 0 });
        Ok(())
    }

    fn array_end(&mut self) -> Result<(), MappingError> {
        self.close(b']')
    }

    fn write_field_name(&mut self, name: &str) -> Result<(), MappingError> {
        if self.discard.active() {
            return Ok(());
        }
        let depth = self.depth();
        let Some((keys, count)) = self.nearest_object() else {
            return Err(MappingError::Io {
                details: format!("field '{name}' written outside an object"),
            }
            .into());
        };
        if !keys.insert(name.to_string()) {
            self.discard.begin();
            return Ok(());
        }
        let first = *count == 0;
        *count += 1;
        if !first {
            self.raw(b",")?;
        }
        self.newline(depth)?;
        let key = serde_json::to_string(name).map_err(|e| MappingError::from_json_error(&e))?;
        self.raw(key.as_bytes())?;
        self.raw(if self.pretty { b": " } else { b":" })
    }

    fn write_string(&mut self, value: &str) -> Result<(), MappingError> {
        let text = serde_json::to_string(value).map_err(|e| MappingError::from_json_error(&e))?;
        self.scalar(text.as_bytes())
    }

    fn write_boolean(&mut self, value: bool) -> Result<(), MappingError> {
        self.scalar(if value { b"true" } else { b"false" })
    }

    fn write_number(&mut self, value: &Number) -> Result<(), MappingError> {
        self.scalar(value.to_string().as_bytes())
    }

    fn write_null(&mut self) -> Result<(), MappingError> {
        self.scalar(b"null")
    }

    fn inline_start(&mut self) -> Result<(), MappingError> {
        if !self.discard.active() {
            self.pending_inline += 1;
        }
        Ok(())
    }

    fn inline_end(&mut self) -> Result<(), MappingError> {
        Ok(())
    }
}

#[derive(Debug)]
enum Pending {
    Key(String),
    Skip,
}

#[derive(Debug)]
enum TreeFrame {
    Object {
        map: Map<String, Value>,
        pending: Option<Pending>,
    },
    Array(Vec<Value>),
    Inline,
}

/// Builds an ordered `serde_json::Value`.
#[derive(Debug, Default)]
pub struct TreeJsonWriter {
    frames: Vec<TreeFrame>,
    root: Option<Value>,
    pending_inline: usize,
    discard: Discard,
}

impl TreeJsonWriter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the finished tree, or `Value::Null` if nothing was written.
    ///
    /// # Errors
    ///
    /// Returns an error if containers are still open.
    pub fn finish(self) -> Result<Value, MappingError> {
        if !self.frames.is_empty() {
            return Err(MappingError::Io {
                details: format!("{} JSON container(s) left open", self.frames.len()),
            }
            .into());
        }
        Ok(self.root.unwrap_or(Value::Null))
    }

    fn nearest_object(&mut self) -> Option<(&mut Map<String, Value>, &mut Option<Pending>)> {
        match self
            .frames
            .iter_mut()
            .rev()
            .find(|f| !matches!(f, TreeFrame::Inline))
        {
            Some(TreeFrame::Object { map, pending }) => Some((map, pending)),
            _ => None,
        }
    }

    fn place(&mut self, value: Value) -> Result<(), MappingError> {
        if self.frames.is_empty() {
            self.root = Some(value);
            return Ok(());
        }
        if let Some(TreeFrame::Array(items)) = self.frames.last_mut() {
            items.push(value);
            return Ok(());
        }
        let Some((map, pending)) = self.nearest_object() else {
            return Err(MappingError::Io {
                details: "value written outside a container".to_string(),
            }
            .into());
        };
        match pending.take() {
            Some(Pending::Key(key)) => {
                map.insert(key, value);
                Ok(())
            }
            Some(Pending::Skip) => Ok(()),
            None => Err(MappingError::Io {
                details: "object value written without a field name".to_string(),
            }
            .into()),
        }
    }

    fn scalar(&mut self, value: Value) -> Result<(), MappingError> {
        if self.discard.scalar() {
            return Ok(());
        }
        if self.pending_inline > 0 {
            self.pending_inline -= 1;
            return Ok(());
        }
        self.place(value)
    }

    fn close(&mut self) -> Result<(), MappingError> {
        if self.discard.close() {
            return Ok(());
        }
        match self.frames.pop() {
            Some(TreeFrame::Inline) => Ok(()),
            Some(TreeFrame::Object { map, .. }) => self.place(Value::Object(map)),
            Some(TreeFrame::Array(items)) => self.place(Value::Array(items)),
            None => Err(MappingError::Io {
                details: "unbalanced JSON container end".to_string(),
            }
            .into()),
        }
    }
}

impl JsonWriter for TreeJsonWriter {
    fn object_start(&mut self) -> Result<(), MappingError> {
        if self.discard.open() {
            return Ok(());
        }
        if self.pending_inline > 0 {
            self.pending_inline -= 1;
            self.frames.push(TreeFrame::Inline);
        } else {
            self.frames.push(TreeFrame::Object {
                map: Map::new(),
                pending: None,
            });
        }
        Ok(())
    }

    fn object_end(&mut self) -> Result<(), MappingError> {
        self.close()
    }

    fn array_start(&mut self) -> Result<(), MappingError> {
        if self.discard.open() {
            return Ok(());
        }
        if self.pending_inline > 0 {
            self.pending_inline -= 1;
            self.discard.begin();
            self.discard.open();
            return Ok(());
        }
        self.frames.push(TreeFrame::Array(Vec::new()));
        Ok(())
    }

    fn array_end(&mut self) -> Result<(), MappingError> {
        self.close()
    }

    fn write_field_name(&mut self, name: &str) -> Result<(), MappingError> {
        if self.discard.active() {
            return Ok(());
        }
        let Some((map, pending)) = self.nearest_object() else {
            return Err(MappingError::Io {
                details: format!("field '{name}' written outside an object"),
            }
            .into());
        };
        if map.contains_key(name) {
            *pending = Some(Pending::Skip);
            self.discard.begin();
        } else {
            *pending = Some(Pending::Key(name.to_string()));
        }
        Ok(())
    }

    fn write_string(&mut self, value: &str) -> Result<(), MappingError> {
        self.scalar(Value::String(value.to_string()))
    }

    fn write_boolean(&mut self, value: bool) -> Result<(), MappingError> {
        self.scalar(Value::Bool(value))
    }

    fn write_number(&mut self, value: &Number) -> Result<(), MappingError> {
        self.scalar(Value::Number(value.clone()))
    }

    fn write_null(&mut self) -> Result<(), MappingError> {
        self.scalar(Value::Null)
    }

    fn inline_start(&mut self) -> Result<(), MappingError> {
        if !self.discard.active() {
            self.pending_inline += 1;
        }
        Ok(())
    }

    fn inline_end(&mut self) -> Result<(), MappingError> {
        Ok(())
    }
}
