//! Configuration for datatable
//!
//! Handles loading `datatable.toml`: entity metadata plus table definitions.
//!
//! ```toml
//! [[entity]]
//! name = "Customer"
//! table = "customer"
//! identifier = ["id"]
//! fields = ["id", "name"]
//!
//! [[entity.association]]
//! name = "address"
//! target = "Address"
//! joinColumn = "address_id"
//!
//! [[table]]
//! name = "customers"
//! entity = "Customer"
//! options = { pageLength = 25 }
//!
//! [[table.column]]
//! name = "city"
//! field = "address.city"
//! ```

use std::path::{Path, PathBuf};
use std::str::FromStr;

use datatable_core::{
    AssemblyContext, ColumnKind, ColumnSpec, DataTable, DataTableError, EntityMeta, JoinType, MetadataProvider,
    Schema, TableOptions,
};
use serde::Deserialize;

pub const CONFIG_FILE: &str = "datatable.toml";

// ============================================================================
// Columns
// ============================================================================

const fn yes() -> bool {
    true
}

/// One `[[table.column]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnConfig {
    pub name: String,
    /// Dotted field path on the root entity
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default)]
    pub property_path: Option<String>,
    /// Raw expression used for ordering instead of the resolved field
    #[serde(default)]
    pub order_field: Option<String>,
    #[serde(default)]
    pub kind: ColumnKind,
    #[serde(default = "yes")]
    pub visible: bool,
    #[serde(default = "yes")]
    pub orderable: bool,
    #[serde(default = "yes")]
    pub searchable: bool,
    #[serde(default = "yes")]
    pub exportable: bool,
}

impl ColumnConfig {
    pub fn to_spec(&self) -> ColumnSpec {
        let mut spec = ColumnSpec::new(self.name.clone())
            .kind(self.kind)
            .visible(self.visible)
            .orderable(self.orderable)
            .searchable(self.searchable)
            .exportable(self.exportable);
        if let Some(field) = &self.field {
            spec = spec.field(field.clone());
        }
        if let Some(path) = &self.property_path {
            spec = spec.property_path(path.clone());
        }
        if let Some(expr) = &self.order_field {
            spec = spec.order_field(expr.clone());
        }
        spec
    }
}

// ============================================================================
// Tables
// ============================================================================

/// One `[[table]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableConfig {
    pub name: String,
    pub entity: String,
    #[serde(default)]
    pub options: TableOptions,
    #[serde(default, rename = "column")]
    pub columns: Vec<ColumnConfig>,
}

// ============================================================================
// Config
// ============================================================================

/// Parsed `datatable.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default, rename = "entity")]
    pub entities: Vec<EntityMeta>,
    #[serde(default, rename = "table")]
    pub tables: Vec<TableConfig>,
}

impl Config {
    /// Load from `datatable.toml` in the working directory
    pub fn load() -> Result<Self, Error> {
        Self::load_from(Path::new(CONFIG_FILE))
    }

    /// Load from specific path
    pub fn load_from(path: &Path) -> Result<Self, Error> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::NotFound(path.into())
            } else {
                Error::Io(path.into(), e)
            }
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| Error::Parse(path.into(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Entity metadata as a [`Schema`].
    pub fn schema(&self) -> Schema {
        self.entities.iter().cloned().collect()
    }

    pub fn table(&self, name: &str) -> Option<&TableConfig> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Builds the table `name` with its columns registered in order.
    pub fn build_table(&self, name: &str) -> Result<DataTable, Error> {
        let config = self.table(name).ok_or_else(|| Error::UnknownTable(name.to_string()))?;
        let mut table = DataTable::with_options(config.name.clone(), config.entity.clone(), config.options.clone());
        for column in &config.columns {
            table.add(column.to_spec()).map_err(|source| Error::Table {
                table: config.name.clone(),
                source,
            })?;
        }
        Ok(table)
    }

    /// Checks table names, entity references and every column field path.
    fn validate(&self) -> Result<(), Error> {
        let schema = self.schema();
        for (index, table) in self.tables.iter().enumerate() {
            if self.tables[..index].iter().any(|t| t.name == table.name) {
                return Err(Error::DuplicateTable(table.name.clone()));
            }

            let invalid = |source: DataTableError| Error::Table {
                table: table.name.clone(),
                source,
            };
            let meta = schema.metadata_for(&table.entity).map_err(invalid)?;
            let alias = table.options.root_alias.clone().unwrap_or_else(|| meta.short_name());
            let mut ctx = AssemblyContext::new(&schema, &table.entity, alias).map_err(invalid)?;

            self.build_table(&table.name)?;
            for column in &table.columns {
                if let Some(path) = &column.field {
                    ctx.resolve(path, JoinType::Left).map_err(invalid)?;
                }
            }
        }
        Ok(())
    }
}

impl FromStr for Config {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read {}: {}", .0.display(), .1)]
    Io(PathBuf, #[source] std::io::Error),

    #[error("failed to parse {}: {}", .0.display(), .1)]
    Parse(PathBuf, #[source] toml::de::Error),

    #[error("failed to parse config: {0}")]
    Syntax(#[from] toml::de::Error),

    #[error("table '{0}' is defined twice")]
    DuplicateTable(String),

    #[error("table '{0}' is not defined")]
    UnknownTable(String),

    #[error("invalid table '{table}': {source}")]
    Table {
        table: String,
        #[source]
        source: DataTableError,
    },
}

pub type ConfigError = Error;

// ============================================================================
// Tests
// ============================================================================
