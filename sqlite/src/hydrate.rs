//! Loading records and their to-one associations by key.

use datatable_core::{
    DataTableError, EntityMeta, MetadataProvider, Record, Result, Sql, Token, Value,
};

use crate::backend::SqliteBackend;

impl SqliteBackend {
    /// Loads the first row of `meta` whose `field` equals `key`.
    ///
    /// Mapped fields are stored under their field name, any other column
    /// (foreign keys) under its column name.
    pub(crate) fn load(&self, meta: &EntityMeta, field: &str, key: &Value) -> Result<Option<Record>> {
        let sql = Sql::token(Token::SELECT)
            .push(Token::STAR)
            .push(Token::FROM)
            .append(Sql::ident(meta.table.clone()))
            .push(Token::WHERE)
            .append(Sql::ident(EntityMeta::column_for(field)))
            .push(Token::EQ)
            .append(Sql::param(key.clone()));

        let rows = self.rows(&sql, Some(1))?;
        let Some(row) = rows.values.into_iter().next() else {
            return Ok(None);
        };

        let mut record = Record::new(meta.name.clone());
        for (label, value) in rows.labels.into_iter().zip(row) {
            let name = meta
                .fields
                .iter()
                .find(|f| EntityMeta::column_for(f) == label)
                .cloned()
                .unwrap_or(label);
            record.set(name, value);
        }
        Ok(Some(record))
    }

    /// Loads the association chain `path` onto `record`, reusing relations
    /// already present. A null foreign key leaves the relation empty.
    pub(crate) fn attach(&self, record: &mut Record, meta: &EntityMeta, path: &str) -> Result<()> {
        let (head, rest) = match path.split_once('.') {
            Some((head, rest)) => (head, Some(rest)),
            None => (path, None),
        };

        let association = meta
            .find_association(head)
            .ok_or_else(|| DataTableError::UnknownAssociation {
                entity: meta.name.clone(),
                association: head.to_string(),
            })?;
        let target = self.schema().metadata_for(&association.target)?;

        if !record.has_relation(head) {
            let related = match record.get(&association.join_column) {
                Some(key) if !key.is_null() => {
                    let key = key.clone();
                    self.load(target, &association.referenced_column, &key)?
                }
                _ => None,
            };
            record.set_relation(head, related);
        }

        if let (Some(rest), Some(child)) = (rest, record.relation_mut(head)) {
            self.attach(child, target, rest)?;
        }
        Ok(())
    }
}
