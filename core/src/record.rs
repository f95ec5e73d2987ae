use hashbrown::HashMap;

use crate::value::Value;

/// A hydrated entity: field values plus the to-one associations that were
/// loaded for it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    entity: String,
    values: HashMap<String, Value>,
    /// `None` marks an association whose foreign key is null.
    relations: HashMap<String, Option<Record>>,
}

impl Record {
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            ..Self::default()
        }
    }

    pub fn entity(&self) -> &str {
        &self.entity
    }

    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(field, value);
        self
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(field.into(), value.into());
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn set_relation(&mut self, name: impl Into<String>, record: Option<Record>) {
        self.relations.insert(name.into(), record);
    }

    pub fn has_relation(&self, name: &str) -> bool {
        self.relations.contains_key(name)
    }

    pub fn relation(&self, name: &str) -> Option<&Record> {
        self.relations.get(name).and_then(Option::as_ref)
    }

    pub fn relation_mut(&mut self, name: &str) -> Option<&mut Record> {
        self.relations.get_mut(name).and_then(Option::as_mut)
    }

    /// Reads a dotted property path. Returns `None` when any step is
    /// missing or crosses a null association.
    pub fn read(&self, path: &str) -> Option<&Value> {
        if let Some(value) = self.values.get(path) {
            return Some(value);
        }
        let (head, rest) = path.split_once('.')?;
        self.relation(head)?.read(rest)
    }
}
