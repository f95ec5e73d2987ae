//! Join and select-path resolution for dotted field paths.
//!
//! All state of one assembly pass lives in an [`AssemblyContext`]: the join
//! list, the `join path -> alias` memo, the selected columns per alias and
//! the per-request overlay of resolved column fields. Nothing here is
//! written back onto column definitions.

use hashbrown::{HashMap, HashSet};

use crate::{
    backend::JoinType,
    column::ColumnSpec,
    error::{DataTableError, Result},
    schema::{EntityMeta, MetadataProvider},
};

/// One join registered during a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasEntry {
    /// Dotted path from the root alias, e.g. `customer.address`
    pub join_path: String,
    pub parent_alias: String,
    /// Association name on the parent entity
    pub association: String,
    /// Target entity name
    pub target: String,
    /// Target table
    pub table: String,
    /// Foreign key column on the parent
    pub join_column: String,
    /// Column on the target the foreign key points at
    pub referenced_column: String,
    pub alias: String,
    pub join_type: JoinType,
}

/// Alias -> ordered, deduplicated field names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectColumnSet {
    entries: Vec<(String, Vec<String>)>,
}

impl SelectColumnSet {
    /// Adds `field` under `alias`. Returns false if it was already present.
    pub fn add(&mut self, alias: &str, field: &str) -> bool {
        match self.entries.iter_mut().find(|(a, _)| a == alias) {
            Some((_, fields)) => {
                if fields.iter().any(|f| f == field) {
                    return false;
                }
                fields.push(field.to_string());
            }
            None => self
                .entries
                .push((alias.to_string(), vec![field.to_string()])),
        }
        true
    }

    pub fn fields(&self, alias: &str) -> &[String] {
        self.entries
            .iter()
            .find(|(a, _)| a == alias)
            .map(|(_, fields)| fields.as_slice())
            .unwrap_or(&[])
    }

    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(a, _)| a.as_str())
    }

    /// `alias.column` for every selected field, in registration order.
    pub fn expressions(&self) -> impl Iterator<Item = String> + '_ {
        self.entries.iter().flat_map(|(alias, fields)| {
            fields
                .iter()
                .map(move |f| format!("{alias}.{}", EntityMeta::column_for(f)))
        })
    }
}

/// Resolution result: a column of one alias, plus the property path of the
/// same value on the hydrated root record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedField {
    pub alias: String,
    pub column: String,
    pub property: String,
}

impl ResolvedField {
    /// Alias-qualified expression, e.g. `customer_address.city`.
    pub fn expr(&self) -> String {
        format!("{}.{}", self.alias, self.column)
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Per-pass resolver state.
pub struct AssemblyContext<'p> {
    provider: &'p dyn MetadataProvider,
    root: &'p EntityMeta,
    root_alias: String,
    default_join: JoinType,
    joins: Vec<AliasEntry>,
    memo: HashMap<String, usize>,
    taken: HashSet<String>,
    selects: SelectColumnSet,
    overlay: HashMap<String, ResolvedField>,
}

impl<'p> AssemblyContext<'p> {
    /// Starts a pass rooted at `entity`, aliased `root_alias`.
    pub fn new(
        provider: &'p dyn MetadataProvider,
        entity: &str,
        root_alias: impl Into<String>,
    ) -> Result<Self> {
        let root_alias = root_alias.into();
        if !is_identifier(&root_alias) {
            return Err(DataTableError::InvalidPath(root_alias));
        }
        let root = provider.metadata_for(entity)?;
        let mut taken = HashSet::new();
        taken.insert(root_alias.clone());
        Ok(Self {
            provider,
            root,
            root_alias,
            default_join: JoinType::Left,
            joins: Vec::new(),
            memo: HashMap::new(),
            taken,
            selects: SelectColumnSet::default(),
            overlay: HashMap::new(),
        })
    }

    /// Join type used by [`AssemblyContext::field_for`].
    pub fn with_default_join(mut self, join_type: JoinType) -> Self {
        self.default_join = join_type;
        self
    }

    pub fn root(&self) -> &'p EntityMeta {
        self.root
    }

    pub fn root_alias(&self) -> &str {
        &self.root_alias
    }

    pub fn provider(&self) -> &'p dyn MetadataProvider {
        self.provider
    }

    pub fn joins(&self) -> &[AliasEntry] {
        &self.joins
    }

    pub fn selects(&self) -> &SelectColumnSet {
        &self.selects
    }

    pub fn overlay(&self) -> &HashMap<String, ResolvedField> {
        &self.overlay
    }

    pub fn overlay_for(&self, column: &str) -> Option<&ResolvedField> {
        self.overlay.get(column)
    }

    pub fn set_overlay(&mut self, column: impl Into<String>, field: ResolvedField) {
        self.overlay.insert(column.into(), field);
    }

    /// `<root>.<identifier>`, registering the identifier as selected.
    pub fn identifier_expr(&mut self) -> Result<String> {
        let id = self.root.single_identifier()?;
        self.selects.add(&self.root_alias, id);
        Ok(format!("{}.{}", self.root_alias, EntityMeta::column_for(id)))
    }

    /// Resolves a dotted field path into an alias-qualified column,
    /// registering the joins it needs with `join_type`.
    pub fn resolve(&mut self, path: &str, join_type: JoinType) -> Result<ResolvedField> {
        let mut parts: Vec<&str> = path.split('.').collect();
        if parts.iter().any(|p| p.trim().is_empty()) {
            return Err(DataTableError::InvalidPath(path.to_string()));
        }
        if parts.len() > 1 && parts[0] == self.root_alias {
            parts.remove(0);
        }

        let mut meta = self.root;
        let mut alias = self.root_alias.clone();
        let mut join_path = self.root_alias.clone();
        let mut property: Vec<&str> = Vec::with_capacity(parts.len());

        loop {
            let remaining = parts.join(".");
            if meta.has_field(&remaining) {
                if alias != self.root_alias {
                    self.selects.add(&alias, meta.single_identifier()?);
                }
                self.selects.add(&alias, &remaining);
                property.extend(parts.iter().copied());
                return Ok(ResolvedField {
                    column: EntityMeta::column_for(&remaining),
                    alias,
                    property: property.join("."),
                });
            }

            let segment = parts[0];
            if parts.len() == 1 {
                return Err(DataTableError::UnknownField {
                    entity: meta.name.clone(),
                    field: segment.to_string(),
                });
            }

            let association = meta.find_association(segment).ok_or_else(|| {
                DataTableError::UnknownAssociation {
                    entity: meta.name.clone(),
                    association: segment.to_string(),
                }
            })?;

            // `address.id` reads the local foreign key, no join needed
            if parts.len() == 2 && parts[1] == association.referenced_column {
                self.selects.add(&alias, &association.join_column);
                property.extend(parts.iter().copied());
                return Ok(ResolvedField {
                    alias,
                    column: association.join_column.clone(),
                    property: property.join("."),
                });
            }

            if !is_identifier(segment) {
                return Err(DataTableError::InvalidPath(path.to_string()));
            }

            let target = self.provider.metadata_for(&association.target)?;
            join_path = format!("{join_path}.{segment}");
            let existing = self.memo.get(&join_path).copied();
            let next_alias = match existing {
                Some(index) => {
                    let entry = &mut self.joins[index];
                    entry.join_type = entry.join_type.merge(join_type);
                    entry.alias.clone()
                }
                None => {
                    let next_alias = self.fresh_alias(format!("{alias}_{segment}"));
                    self.memo.insert(join_path.clone(), self.joins.len());
                    self.joins.push(AliasEntry {
                        join_path: join_path.clone(),
                        parent_alias: alias.clone(),
                        association: segment.to_string(),
                        target: target.name.clone(),
                        table: target.table.clone(),
                        join_column: association.join_column.clone(),
                        referenced_column: association.referenced_column.clone(),
                        alias: next_alias.clone(),
                        join_type,
                    });
                    next_alias
                }
            };

            self.selects.add(&next_alias, target.single_identifier()?);
            property.push(segment);
            parts.remove(0);
            meta = target;
            alias = next_alias;
        }
    }

    /// Resolves the field of `column` with the default join type and records
    /// it in the overlay. Columns without a field fall back to a root field
    /// of the same name; `None` when neither applies.
    pub fn field_for(&mut self, column: &ColumnSpec) -> Result<Option<ResolvedField>> {
        if let Some(resolved) = self.overlay.get(column.name()) {
            return Ok(Some(resolved.clone()));
        }
        let path = match column.field_path() {
            Some(path) => path.to_string(),
            None if self.root.has_field(column.name()) => column.name().to_string(),
            None => return Ok(None),
        };
        let resolved = self.resolve(&path, self.default_join)?;
        self.overlay.insert(column.name().to_string(), resolved.clone());
        Ok(Some(resolved))
    }

    /// Association paths that have been joined, e.g. `address.country`.
    pub fn relation_paths(&self) -> Vec<String> {
        self.joins
            .iter()
            .filter_map(|j| {
                j.join_path
                    .strip_prefix(&self.root_alias)
                    .and_then(|p| p.strip_prefix('.'))
                    .map(str::to_string)
            })
            .collect()
    }

    fn fresh_alias(&mut self, base: String) -> String {
        if self.taken.insert(base.clone()) {
            return base;
        }
        let mut n = 2;
        loop {
            let candidate = format!("{base}_{n}");
            if self.taken.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }

    /// Consumes the pass, returning its joins, selects and overlay.
    pub fn into_parts(self) -> (Vec<AliasEntry>, SelectColumnSet, HashMap<String, ResolvedField>) {
        (self.joins, self.selects, self.overlay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Association, Schema};

    fn schema() -> Schema {
        Schema::new()
            .with(
                EntityMeta::new("Customer", "customer")
                    .identifier("id")
                    .field("name")
                    .field("price.amount")
                    .association(Association::new("address", "Address", "address_id"))
                    .association(Association::new("address_country", "Country", "alt_country_id")),
            )
            .with(
                EntityMeta::new("Address", "address")
                    .identifier("id")
                    .field("city")
                    .association(Association::new("country", "Country", "country_id")),
            )
            .with(EntityMeta::new("Country", "country").identifier("id").field("code"))
            .with(EntityMeta::new("Tag", "tag").field("label"))
    }

    #[test]
    fn root_field_needs_no_join() {
        let schema = schema();
        let mut ctx = AssemblyContext::new(&schema, "Customer", "customer").unwrap();
        let field = ctx.resolve("customer.name", JoinType::Left).unwrap();
        assert_eq!(field.expr(), "customer.name");
        assert_eq!(field.property, "name");
        assert!(ctx.joins().is_empty());
    }

    #[test]
    fn embedded_field_stays_on_root() {
        let schema = schema();
        let mut ctx = AssemblyContext::new(&schema, "Customer", "customer").unwrap();
        let field = ctx.resolve("price.amount", JoinType::Left).unwrap();
        assert_eq!(field.expr(), "customer.price_amount");
        assert!(ctx.joins().is_empty());
    }

    #[test]
    fn nested_path_joins_each_step() {
        let schema = schema();
        let mut ctx = AssemblyContext::new(&schema, "Customer", "customer").unwrap();
        let field = ctx.resolve("address.country.code", JoinType::Inner).unwrap();
        assert_eq!(field.expr(), "customer_address_country.code");
        assert_eq!(field.property, "address.country.code");

        let aliases: Vec<_> = ctx.joins().iter().map(|j| j.alias.as_str()).collect();
        assert_eq!(aliases, ["customer_address", "customer_address_country"]);
        assert_eq!(ctx.selects().fields("customer_address"), ["id".to_string()]);
        assert_eq!(
            ctx.selects().fields("customer_address_country"),
            ["id".to_string(), "code".to_string()]
        );
        assert_eq!(ctx.relation_paths(), ["address", "address.country"]);
    }

    #[test]
    fn repeated_paths_are_memoized() {
        let schema = schema();
        let mut ctx = AssemblyContext::new(&schema, "Customer", "c").unwrap();
        let a = ctx.resolve("address.city", JoinType::Inner).unwrap();
        let b = ctx.resolve("c.address.city", JoinType::Inner).unwrap();
        assert_eq!(a, b);
        assert_eq!(ctx.joins().len(), 1);
        assert_eq!(ctx.joins()[0].join_type, JoinType::Inner);

        ctx.resolve("address.city", JoinType::Left).unwrap();
        assert_eq!(ctx.joins().len(), 1);
        assert_eq!(ctx.joins()[0].join_type, JoinType::Left);

        ctx.resolve("address.city", JoinType::Inner).unwrap();
        assert_eq!(ctx.joins()[0].join_type, JoinType::Left);
    }

    #[test]
    fn colliding_aliases_get_suffixed() {
        let schema = schema();
        let mut ctx = AssemblyContext::new(&schema, "Customer", "c").unwrap();
        ctx.resolve("address.country.code", JoinType::Left).unwrap();
        let other = ctx.resolve("address_country.code", JoinType::Left).unwrap();
        assert_eq!(other.alias, "c_address_country_2");
    }

    #[test]
    fn foreign_key_shortcut() {
        let schema = schema();
        let mut ctx = AssemblyContext::new(&schema, "Customer", "c").unwrap();
        let field = ctx.resolve("address.id", JoinType::Left).unwrap();
        assert_eq!(field.expr(), "c.address_id");
        assert!(ctx.joins().is_empty());
    }

    #[test]
    fn configuration_errors() {
        let schema = schema();
        let mut ctx = AssemblyContext::new(&schema, "Customer", "c").unwrap();
        assert!(matches!(
            ctx.resolve("nickname", JoinType::Left),
            Err(DataTableError::UnknownField { .. })
        ));
        assert!(matches!(
            ctx.resolve("manager.name", JoinType::Left),
            Err(DataTableError::UnknownAssociation { .. })
        ));
        assert!(matches!(
            ctx.resolve("address..city", JoinType::Left),
            Err(DataTableError::InvalidPath(_))
        ));
        assert!(matches!(
            AssemblyContext::new(&schema, "Customer", "bad alias"),
            Err(DataTableError::InvalidPath(_))
        ));

        let mut tags = AssemblyContext::new(&schema, "Tag", "t").unwrap();
        assert!(matches!(
            tags.identifier_expr(),
            Err(DataTableError::NoIdentifier(_))
        ));
    }
}
