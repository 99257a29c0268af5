//! Canonical schema model: tables, fields and name-based foreign keys.
//!
//! Every mutation returns a new `Table` (or a new table list); nothing is
//! edited in place, so equality checks and fingerprinting stay cheap.

use crate::core::validation::{ValidationError, validate_identifier};
use serde::{Deserialize, Serialize};

/// Stable table identifier, also used as the canvas node id
pub type TableId = String;

/// Table-scoped field identifier
pub type FieldId = String;

/// Errors raised by model-level operations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchemaError {
    #[error("Table '{0}' not found")]
    TableNotFound(TableId),

    #[error("Table name '{0}' is already in use")]
    DuplicateTableName(String),

    #[error("Field index {index} out of range for table '{table}' ({len} fields)")]
    FieldIndexOutOfRange {
        table: String,
        index: usize,
        len: usize,
    },

    #[error("Field data type cannot be empty")]
    EmptyDataType,

    #[error(transparent)]
    InvalidName(#[from] ValidationError),
}

/// Canvas coordinates of a table's top-left corner
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Default)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Position) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// Explicit user-set node dimensions
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// True when both sides are within `tolerance` of `other`
    pub fn approx_eq(&self, other: &Size, tolerance: f64) -> bool {
        (self.width - other.width).abs() <= tolerance
            && (self.height - other.height).abs() <= tolerance
    }
}

/// Preset node width chosen from the table context menu
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SizePreference {
    Small,
    Medium,
    Large,
    #[serde(rename = "xlarge")]
    XLarge,
    Huge,
}

impl SizePreference {
    pub fn width(&self) -> f64 {
        match self {
            SizePreference::Small => 200.0,
            SizePreference::Medium => 280.0,
            SizePreference::Large => 360.0,
            SizePreference::XLarge => 440.0,
            SizePreference::Huge => 520.0,
        }
    }
}

/// `ON DELETE` / `ON UPDATE` behaviour of a foreign key
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReferentialAction {
    Cascade,
    Restrict,
    SetNull,
    SetDefault,
    NoAction,
}

/// Name-based reference to `table.field`
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ForeignKey {
    pub table: String,
    pub field: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_delete: Option<ReferentialAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_update: Option<ReferentialAction>,
}

impl ForeignKey {
    pub fn new(table: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            field: field.into(),
            on_delete: None,
            on_update: None,
        }
    }
}

/// Table column
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    pub id: FieldId,
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
    #[serde(default = "default_nullable")]
    pub nullable: bool,
    #[serde(default)]
    pub primary_key: bool,
    #[serde(default)]
    pub unique: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreign_key: Option<ForeignKey>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
}

fn default_nullable() -> bool {
    true
}

impl Field {
    /// New nullable field with a generated id
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self::with_id(uuid::Uuid::new_v4().to_string(), name, data_type)
    }

    pub fn with_id(
        id: impl Into<String>,
        name: impl Into<String>,
        data_type: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            data_type: data_type.into(),
            nullable: true,
            primary_key: false,
            unique: false,
            foreign_key: None,
            default_value: None,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn with_default(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn references(mut self, table: impl Into<String>, field: impl Into<String>) -> Self {
        self.foreign_key = Some(ForeignKey::new(table, field));
        self
    }

    pub fn on_delete(mut self, action: ReferentialAction) -> Self {
        if let Some(fk) = self.foreign_key.as_mut() {
            fk.on_delete = Some(action);
        }
        self
    }

    pub fn on_update(mut self, action: ReferentialAction) -> Self {
        if let Some(fk) = self.foreign_key.as_mut() {
            fk.on_update = Some(action);
        }
        self
    }
}

/// Database table as placed on the canvas
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    pub id: TableId,
    pub name: String,
    #[serde(default)]
    pub fields: Vec<Field>,
    #[serde(default)]
    pub position: Position,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<Size>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_preference: Option<SizePreference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl Table {
    /// New empty table with a generated id
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_id(uuid::Uuid::new_v4().to_string(), name)
    }

    pub fn with_id(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            fields: Vec::new(),
            position: Position::default(),
            size: None,
            size_preference: None,
            comment: None,
        }
    }

    pub fn with_position(mut self, x: f64, y: f64) -> Self {
        self.position = Position::new(x, y);
        self
    }

    pub fn with_size(mut self, width: f64, height: f64) -> Self {
        self.size = Some(Size::new(width, height));
        self
    }

    pub fn with_size_preference(mut self, preference: SizePreference) -> Self {
        self.size_preference = Some(preference);
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn add_field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    pub fn field(&self, index: usize) -> Option<&Field> {
        self.fields.get(index)
    }

    /// Find a field by name, returning its index as well
    pub fn find_field(&self, name: &str) -> Option<(usize, &Field)> {
        self.fields.iter().enumerate().find(|(_, f)| f.name == name)
    }

    pub fn field_by_id(&self, id: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.id == id)
    }

    pub fn primary_keys(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(|f| f.primary_key)
    }

    pub fn foreign_keys(&self) -> impl Iterator<Item = (&Field, &ForeignKey)> {
        self.fields
            .iter()
            .filter_map(|f| f.foreign_key.as_ref().map(|fk| (f, fk)))
    }

    fn check_index(&self, index: usize) -> Result<(), SchemaError> {
        if index >= self.fields.len() {
            return Err(SchemaError::FieldIndexOutOfRange {
                table: self.name.clone(),
                index,
                len: self.fields.len(),
            });
        }
        Ok(())
    }

    /// Copy of this table with `field` appended
    pub fn with_field_added(&self, field: Field) -> Result<Table, SchemaError> {
        validate_field(&field)?;
        let mut table = self.clone();
        table.fields.push(field);
        Ok(table)
    }

    /// Copy of this table with the field at `index` replaced
    pub fn with_field_updated(&self, index: usize, field: Field) -> Result<Table, SchemaError> {
        self.check_index(index)?;
        validate_field(&field)?;
        let mut table = self.clone();
        table.fields[index] = field;
        Ok(table)
    }

    /// Copy of this table without the field at `index`, plus the removed field
    pub fn with_field_removed(&self, index: usize) -> Result<(Table, Field), SchemaError> {
        self.check_index(index)?;
        let mut table = self.clone();
        let removed = table.fields.remove(index);
        Ok((table, removed))
    }

    /// Copy of this table with a field moved from `from` to `to`
    pub fn with_field_moved(&self, from: usize, to: usize) -> Result<Table, SchemaError> {
        self.check_index(from)?;
        self.check_index(to)?;
        let mut table = self.clone();
        let field = table.fields.remove(from);
        table.fields.insert(to, field);
        Ok(table)
    }

    pub fn moved_to(&self, position: Position) -> Table {
        Table {
            position,
            ..self.clone()
        }
    }

    pub fn resized(&self, size: Size) -> Table {
        Table {
            size: Some(size),
            ..self.clone()
        }
    }
}

fn validate_field(field: &Field) -> Result<(), SchemaError> {
    validate_identifier(&field.name)?;
    if field.data_type.trim().is_empty() {
        return Err(SchemaError::EmptyDataType);
    }
    Ok(())
}

/// Whole-array operations on the table list.
///
/// Each returns a fresh `Vec<Table>` meant to replace the current one in a
/// single step.
pub trait TableOps {
    fn table_by_id(&self, id: &str) -> Option<&Table>;
    fn table_by_name(&self, name: &str) -> Option<&Table>;

    /// Replace the table whose id matches `table.id`
    fn with_replaced(&self, table: Table) -> Result<Vec<Table>, SchemaError>;

    /// Append a table, rejecting invalid or already used names
    fn with_added(&self, table: Table) -> Result<Vec<Table>, SchemaError>;

    /// Drop a table. Foreign keys pointing at it are left untouched.
    fn with_removed(&self, id: &str) -> Result<(Vec<Table>, Table), SchemaError>;

    /// Rename a table and rewrite every `foreign_key.table` that used the old name
    fn with_renamed(&self, id: &str, new_name: &str) -> Result<Vec<Table>, SchemaError>;
}

impl TableOps for [Table] {
    fn table_by_id(&self, id: &str) -> Option<&Table> {
        self.iter().find(|t| t.id == id)
    }

    fn table_by_name(&self, name: &str) -> Option<&Table> {
        self.iter().find(|t| t.name == name)
    }

    fn with_replaced(&self, table: Table) -> Result<Vec<Table>, SchemaError> {
        if self.table_by_id(&table.id).is_none() {
            return Err(SchemaError::TableNotFound(table.id));
        }
        Ok(self
            .iter()
            .map(|t| if t.id == table.id { table.clone() } else { t.clone() })
            .collect())
    }

    fn with_added(&self, table: Table) -> Result<Vec<Table>, SchemaError> {
        validate_identifier(&table.name)?;
        if self.table_by_name(&table.name).is_some() {
            return Err(SchemaError::DuplicateTableName(table.name));
        }
        let mut tables = self.to_vec();
        tables.push(table);
        Ok(tables)
    }

    fn with_removed(&self, id: &str) -> Result<(Vec<Table>, Table), SchemaError> {
        let index = self
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| SchemaError::TableNotFound(id.to_string()))?;
        let mut tables = self.to_vec();
        let removed = tables.remove(index);
        Ok((tables, removed))
    }

    fn with_renamed(&self, id: &str, new_name: &str) -> Result<Vec<Table>, SchemaError> {
        validate_identifier(new_name)?;
        let old_name = self
            .table_by_id(id)
            .map(|t| t.name.clone())
            .ok_or_else(|| SchemaError::TableNotFound(id.to_string()))?;
        if old_name == new_name {
            return Ok(self.to_vec());
        }
        if self.table_by_name(new_name).is_some() {
            return Err(SchemaError::DuplicateTableName(new_name.to_string()));
        }

        Ok(self
            .iter()
            .map(|t| {
                let mut table = t.clone();
                if table.id == id {
                    table.name = new_name.to_string();
                }
                for field in &mut table.fields {
                    if let Some(fk) = field.foreign_key.as_mut()
                        && fk.table == old_name
                    {
                        fk.table = new_name.to_string();
                    }
                }
                table
            })
            .collect())
    }
}

/// Demo schema used by the binary and tests
pub fn create_demo_schema() -> Vec<Table> {
    vec![
        Table::with_id("users", "users")
            .with_position(100.0, 100.0)
            .add_field(Field::with_id("users_id", "id", "INTEGER").primary_key())
            .add_field(Field::with_id("users_email", "email", "VARCHAR(255)").not_null().unique())
            .add_field(Field::with_id("users_created", "created_at", "TIMESTAMP").not_null()),
        Table::with_id("posts", "posts")
            .with_position(450.0, 100.0)
            .add_field(Field::with_id("posts_id", "id", "INTEGER").primary_key())
            .add_field(
                Field::with_id("posts_user", "user_id", "INTEGER")
                    .not_null()
                    .references("users", "id")
                    .on_delete(ReferentialAction::Cascade),
            )
            .add_field(Field::with_id("posts_title", "title", "VARCHAR(255)").not_null())
            .add_field(Field::with_id("posts_body", "body", "TEXT")),
        Table::with_id("comments", "comments")
            .with_position(450.0, 420.0)
            .add_field(Field::with_id("comments_id", "id", "INTEGER").primary_key())
            .add_field(
                Field::with_id("comments_post", "post_id", "INTEGER")
                    .not_null()
                    .references("posts", "id"),
            )
            .add_field(
                Field::with_id("comments_user", "user_id", "INTEGER")
                    .not_null()
                    .references("users", "id"),
            )
            .add_field(Field::with_id("comments_body", "body", "TEXT").not_null()),
    ]
}
