use std::{fs, path::Path, sync::Arc};

use indexmap::IndexMap;
use serde::Deserialize;
use tracing::debug;

use crate::{
    analyzer::AnalyzerError,
    cast::{Conversion, FindConversionOptions},
    catalog::{
        Catalog, Column, Function, Table, TableValuedFunction, builtin_functions, closest_name, conversion_not_found,
    },
    types::{EnumType, Type},
};

/// In-memory catalog keyed by lowercased names. Starts with the builtin
/// operators and functions.
#[derive(Debug, Clone)]
pub struct SimpleCatalog {
    name: String,
    tables: IndexMap<String, Arc<Table>>,
    functions: IndexMap<String, Arc<Function>>,
    table_valued_functions: IndexMap<String, Arc<TableValuedFunction>>,
    types: IndexMap<String, Type>,
    conversions: Vec<Conversion>,
}

#[derive(Debug, Deserialize)]
struct CatalogSpec {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    enums: Vec<EnumSpec>,
    #[serde(default)]
    tables: Vec<TableSpec>,
}

#[derive(Debug, Deserialize)]
struct EnumSpec {
    name: String,
    values: Vec<EnumValueSpec>,
}

#[derive(Debug, Deserialize)]
struct EnumValueSpec {
    name: String,
    number: i32,
}

#[derive(Debug, Deserialize)]
struct TableSpec {
    name: String,
    columns: Vec<ColumnSpec>,
}

#[derive(Debug, Deserialize)]
struct ColumnSpec {
    name: String,
    #[serde(rename = "type")]
    ty: String,
    #[serde(default = "default_writable")]
    writable: bool,
}

fn default_writable() -> bool {
    true
}

fn table_key(path: &[String]) -> String {
    path.iter().map(|p| p.to_lowercase()).collect::<Vec<_>>().join(".")
}

impl SimpleCatalog {
    pub fn new(name: impl Into<String>) -> Self {
        let mut catalog = Self {
            name: name.into(),
            tables: IndexMap::new(),
            functions: IndexMap::new(),
            table_valued_functions: IndexMap::new(),
            types: IndexMap::new(),
            conversions: Vec::new(),
        };
        for f in builtin_functions() {
            catalog.add_function(f);
        }
        catalog
    }

    pub fn add_table(&mut self, table: Table) -> &mut Self {
        let key = table.name.to_lowercase();
        self.tables.insert(key, Arc::new(table));
        self
    }

    pub fn add_function(&mut self, function: Function) -> &mut Self {
        self.functions.insert(function.name.to_lowercase(), Arc::new(function));
        self
    }

    pub fn add_table_valued_function(&mut self, function: TableValuedFunction) -> &mut Self {
        self.table_valued_functions.insert(function.name.to_lowercase(), Arc::new(function));
        self
    }

    /// Registers a named enum, proto or extended type.
    pub fn add_type(&mut self, name: &str, ty: Type) -> &mut Self {
        self.types.insert(name.to_lowercase(), ty);
        self
    }

    pub fn add_conversion(&mut self, conversion: Conversion) -> &mut Self {
        self.conversions.push(conversion);
        self
    }

    pub fn tables(&self) -> impl Iterator<Item = &Arc<Table>> {
        self.tables.values()
    }

    /// Builds a catalog from a JSON description:
    ///
    /// ```json
    /// { "tables": [{ "name": "People", "columns": [{ "name": "id", "type": "INT64" }] }] }
    /// ```
    ///
    /// Column types use SQL type syntax and may name enums declared under
    /// `enums`.
    pub fn from_json(text: &str) -> Result<Self, AnalyzerError> {
        let spec: CatalogSpec = serde_json::from_str(text)
            .map_err(|e| AnalyzerError::InvalidArgument(format!("Invalid catalog description: {e}")))?;
        let mut catalog = SimpleCatalog::new(spec.name.unwrap_or_else(|| "catalog".to_string()));
        for e in spec.enums {
            let values = e.values.into_iter().map(|v| (v.name, v.number)).collect();
            let ty = Type::enum_of(EnumType { name: e.name.clone(), values });
            catalog.add_type(&e.name, ty);
        }
        for t in spec.tables {
            let mut columns = Vec::with_capacity(t.columns.len());
            for c in t.columns {
                let ty = Type::parse(&c.ty, &|name| catalog.find_type(name))?;
                columns.push(Column { name: c.name, ty, writable: c.writable });
            }
            catalog.add_table(Table::new(t.name, columns));
        }
        debug!(catalog = %catalog.name, tables = catalog.tables.len(), "catalog loaded");
        Ok(catalog)
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, AnalyzerError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            AnalyzerError::InvalidArgument(format!("Could not read catalog file {}: {e}", path.display()))
        })?;
        Self::from_json(&text)
    }
}

impl Catalog for SimpleCatalog {
    fn name(&self) -> &str {
        &self.name
    }

    fn find_table(&self, path: &[String]) -> Option<Arc<Table>> {
        self.tables.get(&table_key(path)).cloned()
    }

    fn find_function(&self, name: &str) -> Option<Arc<Function>> {
        self.functions.get(&name.to_lowercase()).cloned()
    }

    fn find_table_valued_function(&self, name: &str) -> Option<Arc<TableValuedFunction>> {
        self.table_valued_functions.get(&name.to_lowercase()).cloned()
    }

    fn find_type(&self, name: &str) -> Option<Type> {
        self.types.get(&name.to_lowercase()).cloned()
    }

    fn find_conversion(
        &self,
        from: &Type,
        to: &Type,
        _options: &FindConversionOptions,
    ) -> Result<Conversion, AnalyzerError> {
        self.conversions
            .iter()
            .find(|c| c.evaluator.from_type() == from && c.evaluator.to_type() == to)
            .cloned()
            .ok_or_else(|| conversion_not_found(from, to))
    }

    fn suggest_table(&self, path: &[String]) -> Option<String> {
        let wanted = table_key(path);
        closest_name(&wanted, self.tables.values().map(|t| t.name.as_str()))
    }

    fn suggest_function(&self, name: &str) -> Option<String> {
        closest_name(name, self.functions.values().filter(|f| !f.is_operator()).map(|f| f.name.as_str()))
    }
}
