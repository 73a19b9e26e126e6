//! Output writers for mapped entities.
//!
//! Entities are written either as NDJSON (one object per line, suitable for
//! streaming) or as a single JSON array. Each entity becomes
//!
//! ```json
//! {"key": "director", "schema": "Person", "properties": {"name": ["Jane Doe"]}, "meta": {...}}
//! ```
//!
//! where `meta` is left out when the entity has none or the writer drops it.

use std::io::Write;

use serde::Serialize;
use thiserror::Error;

use crate::entity::{Entity, Properties};

/// Error type for serialization operations
#[derive(Debug, Error)]
pub enum SerializationError {
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Destination for mapped entities
pub trait EntityWriter {
    /// Write one entity
    fn write_entity(&mut self, entity: &Entity) -> Result<(), SerializationError>;

    /// Write all entities of one record, in order
    fn write_entities(&mut self, entities: &[Entity]) -> Result<(), SerializationError> {
        for entity in entities {
            self.write_entity(entity)?;
        }
        Ok(())
    }

    /// Number of entities written so far
    fn written(&self) -> usize;

    /// Close the output and flush the underlying writer
    fn finish(self: Box<Self>) -> Result<(), SerializationError>;
}

#[derive(Serialize)]
struct EntityRecord<'a> {
    key: &'a str,
    schema: &'a str,
    properties: &'a Properties,
    #[serde(skip_serializing_if = "Option::is_none")]
    meta: Option<&'a Properties>,
}

impl<'a> EntityRecord<'a> {
    fn new(entity: &'a Entity, include_meta: bool) -> Self {
        Self {
            key: &entity.key,
            schema: &entity.schema,
            properties: &entity.properties,
            meta: (include_meta && !entity.meta.is_empty()).then_some(&entity.meta),
        }
    }
}

/// NDJSON (Newline Delimited JSON) writer
///
/// Writes entities as NDJSON, one JSON object per line.
pub struct NdjsonWriter<W: Write> {
    writer: W,
    include_meta: bool,
    written: usize,
}

impl<W: Write> NdjsonWriter<W> {
    /// Create a new NDJSON writer that includes entity metadata
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            include_meta: true,
            written: 0,
        }
    }

    /// Whether to write the `meta` section of each entity
    pub fn with_meta(mut self, include: bool) -> Self {
        self.include_meta = include;
        self
    }
}

impl<W: Write> EntityWriter for NdjsonWriter<W> {
    fn write_entity(&mut self, entity: &Entity) -> Result<(), SerializationError> {
        serde_json::to_writer(&mut self.writer, &EntityRecord::new(entity, self.include_meta))?;
        self.writer.write_all(b"\n")?;
        self.written += 1;
        Ok(())
    }

    fn written(&self) -> usize {
        self.written
    }

    fn finish(mut self: Box<Self>) -> Result<(), SerializationError> {
        self.writer.flush()?;
        Ok(())
    }
}

/// JSON array writer
///
/// Writes entities as a JSON array. The array is only closed by
/// [`EntityWriter::finish`].
pub struct JsonArrayWriter<W: Write> {
    writer: W,
    include_meta: bool,
    written: usize,
}

impl<W: Write> JsonArrayWriter<W> {
    /// Create a new JSON array writer and write the opening bracket
    pub fn new(mut writer: W) -> Result<Self, SerializationError> {
        writer.write_all(b"[")?;
        Ok(Self {
            writer,
            include_meta: true,
            written: 0,
        })
    }

    /// Whether to write the `meta` section of each entity
    pub fn with_meta(mut self, include: bool) -> Self {
        self.include_meta = include;
        self
    }
}

impl<W: Write> EntityWriter for JsonArrayWriter<W> {
    fn write_entity(&mut self, entity: &Entity) -> Result<(), SerializationError> {
        if self.written > 0 {
            self.writer.write_all(b",")?;
        }
        serde_json::to_writer(&mut self.writer, &EntityRecord::new(entity, self.include_meta))?;
        self.written += 1;
        Ok(())
    }

    fn written(&self) -> usize {
        self.written
    }

    fn finish(mut self: Box<Self>) -> Result<(), SerializationError> {
        self.writer.write_all(b"]")?;
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn sample_entities() -> Vec<Entity> {
        let mut meta = Properties::new();
        meta.insert("dataset".to_string(), vec!["registry".to_string()]);

        let mut company = Entity::new("company", "Company");
        company.add("name", vec!["Acme Ltd".to_string()]);
        company.meta = meta;

        let mut person = Entity::new("director", "Person");
        person.add("name", vec!["Jane Doe".to_string(), "J. Doe".to_string()]);

        vec![company, person]
    }

    #[test]
    fn test_ndjson_writer() {
        let mut buf = Vec::new();
        let mut writer = Box::new(NdjsonWriter::new(&mut buf));

        writer.write_entities(&sample_entities()).unwrap();
        assert_eq!(writer.written(), 2);
        writer.finish().unwrap();

        let output = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = output.lines().collect();

        assert_eq!(lines.len(), 2);
        let first: Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["schema"], "Company");
        assert_eq!(first["properties"]["name"][0], "Acme Ltd");
        assert_eq!(first["meta"]["dataset"][0], "registry");

        let second: Value = serde_json::from_str(lines[1]).unwrap();
        assert!(second.get("meta").is_none());
        assert_eq!(second["properties"]["name"][1], "J. Doe");
    }

    #[test]
    fn test_ndjson_writer_without_meta() {
        let mut buf = Vec::new();
        let mut writer = Box::new(NdjsonWriter::new(&mut buf).with_meta(false));

        writer.write_entity(&sample_entities()[0]).unwrap();
        writer.finish().unwrap();

        let line: Value = serde_json::from_slice(&buf).unwrap();
        assert!(line.get("meta").is_none());
        assert_eq!(line["key"], "company");
    }

    #[test]
    fn test_json_array_writer() {
        let mut buf = Vec::new();
        let mut writer: Box<dyn EntityWriter + '_> =
            Box::new(JsonArrayWriter::new(&mut buf).unwrap());

        for entity in sample_entities() {
            writer.write_entity(&entity).unwrap();
        }
        writer.finish().unwrap();

        let output: Value = serde_json::from_slice(&buf).unwrap();
        let items = output.as_array().unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["meta"]["dataset"][0], "registry");
        assert_eq!(items[1]["key"], "director");
    }

    #[test]
    fn test_empty_json_array() {
        let mut buf = Vec::new();
        Box::new(JsonArrayWriter::new(&mut buf).unwrap()).finish().unwrap();

        assert_eq!(String::from_utf8(buf).unwrap(), "[]");
    }
}
