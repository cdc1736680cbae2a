/// Kind of operation carried by a [`ChangeEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A new row was added to the table.
    Insert,
    /// An existing row was modified.
    Update,
    /// An existing row was removed.
    Delete,
    /// A schema object was created on the source.
    Create,
    /// A raw SQL statement to run on the target.
    Sql,
}

impl EventKind {
    /// Returns whether this kind can be expressed as an appended row on a
    /// streaming bulk-load channel.
    pub fn is_streamable(&self) -> bool {
        matches!(self, EventKind::Insert)
    }
}

/// A single captured row-level change, scoped to the current table and batch.
///
/// Field values arrive as text in table column order; binary column values
/// are hex- or base64-encoded according to the owning batch's declared
/// encoding. A missing value represents SQL NULL.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    /// The operation this event describes.
    pub kind: EventKind,
    /// Row field values in table column order. For [`EventKind::Insert`] the
    /// length equals the table's column count. For [`EventKind::Sql`] the
    /// first value carries the statement text.
    pub row_data: Vec<Option<String>>,
    /// Primary-key field values in key ordinal order, when the capture layer
    /// provides them (updates and deletes). Empty otherwise.
    pub pk_data: Vec<Option<String>>,
}

impl ChangeEvent {
    /// Creates an insert event from row values in table column order.
    pub fn insert(row_data: Vec<Option<String>>) -> ChangeEvent {
        Self {
            kind: EventKind::Insert,
            row_data,
            pk_data: Vec::new(),
        }
    }

    /// Creates an update event from new row values and the old key values.
    pub fn update(row_data: Vec<Option<String>>, pk_data: Vec<Option<String>>) -> ChangeEvent {
        Self {
            kind: EventKind::Update,
            row_data,
            pk_data,
        }
    }

    /// Creates a delete event from the key values of the row to remove.
    pub fn delete(pk_data: Vec<Option<String>>) -> ChangeEvent {
        Self {
            kind: EventKind::Delete,
            row_data: Vec::new(),
            pk_data,
        }
    }

    /// Creates a raw SQL event.
    pub fn sql(statement: String) -> ChangeEvent {
        Self {
            kind: EventKind::Sql,
            row_data: vec![Some(statement)],
            pk_data: Vec::new(),
        }
    }
}
