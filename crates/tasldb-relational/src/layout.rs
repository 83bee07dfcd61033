//! Type-to-table compilation.
//!
//! Each class type is flattened into an ordered column list by pre-order
//! traversal; that order is also the canonical row order used everywhere a
//! row crosses a boundary (DML parameters, wire encoding, reassembly). The
//! layout carries the DDL and the per-class statement SQL so statement text
//! is computed once per handle.

use tasldb_types::{Datatype, Schema, Type};

use crate::naming::{column_name, table_name, ID_COLUMN};

/// SQL storage type of one column.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SqlType {
    Integer,
    Real,
    Text,
    Blob,
}

impl SqlType {
    const fn keyword(self) -> &'static str {
        match self {
            Self::Integer => "INTEGER",
            Self::Real => "REAL",
            Self::Text => "TEXT",
            Self::Blob => "BLOB",
        }
    }
}

/// What a column encodes, driving shredding and reassembly.
#[derive(Clone, Debug, PartialEq)]
pub enum ColumnKind {
    /// An IRI string.
    Uri,
    /// A literal of the given datatype.
    Literal(Datatype),
    /// The selected option index of a coproduct node.
    CoproductTag,
    /// A foreign key into the class at `class_index`.
    Reference { class_index: usize },
}

/// One column of a class table.
#[derive(Clone, Debug, PartialEq)]
pub struct Column {
    pub name: String,
    pub path: Vec<usize>,
    pub sql_type: SqlType,
    pub nullable: bool,
    pub kind: ColumnKind,
}

/// The compiled relational layout of one class.
#[derive(Clone, Debug)]
pub struct TableLayout {
    pub class_index: usize,
    pub class_key: String,
    pub table: String,
    /// Columns in pre-order traversal order, excluding `id`.
    pub columns: Vec<Column>,
    pub select_sql: String,
    pub has_sql: String,
    pub count_sql: String,
    pub insert_sql: String,
    pub upsert_sql: String,
    pub scan_sql: String,
    pub keys_sql: String,
}

/// Number of columns a type occupies in its table.
pub fn column_width(ty: &Type) -> usize {
    match ty {
        Type::Uri | Type::Literal(_) | Type::Reference(_) => 1,
        Type::Product(components) => components.iter().map(|(_, t)| column_width(t)).sum(),
        Type::Coproduct(options) => {
            1 + options.iter().map(|(_, t)| column_width(t)).sum::<usize>()
        }
    }
}

/// Compile every class of a schema into its table layout, in class order.
pub fn compile_schema(schema: &Schema) -> Vec<TableLayout> {
    schema
        .classes()
        .enumerate()
        .map(|(index, (key, ty))| compile_class(schema, index, key, ty))
        .collect()
}

fn compile_class(schema: &Schema, class_index: usize, key: &str, ty: &Type) -> TableLayout {
    let mut columns = Vec::with_capacity(column_width(ty));
    collect_columns(schema, ty, &mut Vec::new(), false, &mut columns);
    let table = table_name(class_index);
    let layout = Statements::new(&table, &columns);
    TableLayout {
        class_index,
        class_key: key.to_owned(),
        table,
        columns,
        select_sql: layout.select,
        has_sql: layout.has,
        count_sql: layout.count,
        insert_sql: layout.insert,
        upsert_sql: layout.upsert,
        scan_sql: layout.scan,
        keys_sql: layout.keys,
    }
}

fn collect_columns(
    schema: &Schema,
    ty: &Type,
    path: &mut Vec<usize>,
    nullable: bool,
    out: &mut Vec<Column>,
) {
    match ty {
        Type::Uri => out.push(Column {
            name: column_name(path),
            path: path.clone(),
            sql_type: SqlType::Text,
            nullable,
            kind: ColumnKind::Uri,
        }),
        Type::Literal(dt) => out.push(Column {
            name: column_name(path),
            path: path.clone(),
            sql_type: literal_sql_type(dt),
            nullable,
            kind: ColumnKind::Literal(dt.clone()),
        }),
        Type::Product(components) => {
            for (i, (_, child)) in components.iter().enumerate() {
                path.push(i);
                collect_columns(schema, child, path, nullable, out);
                path.pop();
            }
        }
        Type::Coproduct(options) => {
            out.push(Column {
                name: column_name(path),
                path: path.clone(),
                sql_type: SqlType::Integer,
                nullable,
                kind: ColumnKind::CoproductTag,
            });
            // Arm columns are null whenever a sibling arm is selected.
            for (i, (_, child)) in options.iter().enumerate() {
                path.push(i);
                collect_columns(schema, child, path, true, out);
                path.pop();
            }
        }
        Type::Reference(target) => {
            // Schema validation guarantees the target class exists.
            let class_index = schema.index_of(target).unwrap_or_default();
            out.push(Column {
                name: column_name(path),
                path: path.clone(),
                sql_type: SqlType::Integer,
                nullable,
                kind: ColumnKind::Reference { class_index },
            });
        }
    }
}

fn literal_sql_type(dt: &Datatype) -> SqlType {
    match dt {
        Datatype::Boolean
        | Datatype::Byte
        | Datatype::UnsignedByte
        | Datatype::Short
        | Datatype::UnsignedShort
        | Datatype::Int
        | Datatype::UnsignedInt
        | Datatype::Long
        | Datatype::UnsignedLong => SqlType::Integer,
        Datatype::Float | Datatype::Double => SqlType::Real,
        Datatype::HexBinary => SqlType::Blob,
        Datatype::String | Datatype::Json | Datatype::Other(_) => SqlType::Text,
    }
}

impl TableLayout {
    /// Deterministic DDL for this class table.
    pub fn create_table_sql(&self) -> String {
        let mut sql = format!(
            "CREATE TABLE \"{}\" (\"{}\" INTEGER PRIMARY KEY AUTOINCREMENT",
            self.table, ID_COLUMN
        );
        for column in &self.columns {
            sql.push_str(&format!(
                ", \"{}\" {}{}",
                column.name,
                column.sql_type.keyword(),
                if column.nullable { "" } else { " NOT NULL" }
            ));
            if let ColumnKind::Reference { class_index } = &column.kind {
                sql.push_str(&format!(
                    " REFERENCES \"{}\"(\"{}\")",
                    table_name(*class_index),
                    ID_COLUMN
                ));
            }
        }
        sql.push(')');
        sql
    }
}

struct Statements {
    select: String,
    has: String,
    count: String,
    insert: String,
    upsert: String,
    scan: String,
    keys: String,
}

impl Statements {
    fn new(table: &str, columns: &[Column]) -> Self {
        let column_list = columns
            .iter()
            .map(|c| format!("\"{}\"", c.name))
            .collect::<Vec<_>>()
            .join(", ");

        let select = if columns.is_empty() {
            format!("SELECT \"{ID_COLUMN}\" FROM \"{table}\" WHERE \"{ID_COLUMN}\" = ?1")
        } else {
            format!("SELECT {column_list} FROM \"{table}\" WHERE \"{ID_COLUMN}\" = ?1")
        };
        let has = format!("SELECT 1 FROM \"{table}\" WHERE \"{ID_COLUMN}\" = ?1");
        let count = format!("SELECT COUNT(*) FROM \"{table}\"");
        let keys = format!("SELECT \"{ID_COLUMN}\" FROM \"{table}\" ORDER BY \"{ID_COLUMN}\" ASC");
        let scan = if columns.is_empty() {
            keys.clone()
        } else {
            format!(
                "SELECT \"{ID_COLUMN}\", {column_list} FROM \"{table}\" ORDER BY \"{ID_COLUMN}\" ASC"
            )
        };

        let insert = if columns.is_empty() {
            format!("INSERT INTO \"{table}\" DEFAULT VALUES RETURNING \"{ID_COLUMN}\"")
        } else {
            let params = (1..=columns.len())
                .map(|i| format!("?{i}"))
                .collect::<Vec<_>>()
                .join(", ");
            format!(
                "INSERT INTO \"{table}\" ({column_list}) VALUES ({params}) RETURNING \"{ID_COLUMN}\""
            )
        };

        let upsert = if columns.is_empty() {
            format!(
                "INSERT INTO \"{table}\" (\"{ID_COLUMN}\") VALUES (?1) \
                 ON CONFLICT(\"{ID_COLUMN}\") DO NOTHING"
            )
        } else {
            let params = (2..=columns.len() + 1)
                .map(|i| format!("?{i}"))
                .collect::<Vec<_>>()
                .join(", ");
            let updates = columns
                .iter()
                .map(|c| format!("\"{0}\" = excluded.\"{0}\"", c.name))
                .collect::<Vec<_>>()
                .join(", ");
            format!(
                "INSERT INTO \"{table}\" (\"{ID_COLUMN}\", {column_list}) VALUES (?1, {params}) \
                 ON CONFLICT(\"{ID_COLUMN}\") DO UPDATE SET {updates}"
            )
        };

        Self {
            select,
            has,
            count,
            insert,
            upsert,
            scan,
            keys,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tasldb_types::Schema;

    fn micro_schema() -> Schema {
        Schema::new([
            (
                "http://example.com/a",
                Type::product([
                    ("num", Type::Literal(Datatype::UnsignedByte)),
                    ("flag", Type::Literal(Datatype::Boolean)),
                ]),
            ),
            (
                "http://example.com/b",
                Type::coproduct([
                    ("bytes", Type::Literal(Datatype::HexBinary)),
                    ("unit", Type::unit()),
                    ("link", Type::Uri),
                ]),
            ),
        ])
        .unwrap()
    }

    #[test]
    fn product_columns_in_preorder() {
        let layouts = compile_schema(&micro_schema());
        let a = &layouts[0];
        assert_eq!(a.table, "c0");
        let names: Vec<&str> = a.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["e_0", "e_1"]);
        assert!(a.columns.iter().all(|c| !c.nullable));
        assert_eq!(a.columns[0].sql_type, SqlType::Integer);
    }

    #[test]
    fn coproduct_tag_and_nullable_arms() {
        let layouts = compile_schema(&micro_schema());
        let b = &layouts[1];
        let names: Vec<&str> = b.columns.iter().map(|c| c.name.as_str()).collect();
        // Tag at the node's own path, then arm columns; unit contributes none.
        assert_eq!(names, vec!["e", "e_0", "e_2"]);
        assert_eq!(b.columns[0].kind, ColumnKind::CoproductTag);
        assert!(!b.columns[0].nullable);
        assert!(b.columns[1].nullable);
        assert!(b.columns[2].nullable);
        assert_eq!(b.columns[1].sql_type, SqlType::Blob);
        assert_eq!(b.columns[2].sql_type, SqlType::Text);
    }

    #[test]
    fn reference_column_carries_foreign_key() {
        let schema = Schema::new([
            ("http://example.com/Person", Type::Uri),
            (
                "http://example.com/Book",
                Type::product([("author", Type::reference("http://example.com/Person"))]),
            ),
        ])
        .unwrap();
        let layouts = compile_schema(&schema);
        let book = &layouts[1];
        assert_eq!(
            book.columns[0].kind,
            ColumnKind::Reference { class_index: 0 }
        );
        assert_eq!(
            book.create_table_sql(),
            "CREATE TABLE \"c1\" (\"id\" INTEGER PRIMARY KEY AUTOINCREMENT, \
             \"e_0\" INTEGER NOT NULL REFERENCES \"c0\"(\"id\"))"
        );
    }

    #[test]
    fn ddl_is_deterministic() {
        let layouts_a = compile_schema(&micro_schema());
        let layouts_b = compile_schema(&micro_schema());
        for (a, b) in layouts_a.iter().zip(&layouts_b) {
            assert_eq!(a.create_table_sql(), b.create_table_sql());
            assert_eq!(a.upsert_sql, b.upsert_sql);
        }
    }

    #[test]
    fn unit_class_has_only_id() {
        let schema = Schema::new([("http://example.com/unit", Type::unit())]).unwrap();
        let layouts = compile_schema(&schema);
        assert!(layouts[0].columns.is_empty());
        assert_eq!(
            layouts[0].create_table_sql(),
            "CREATE TABLE \"c0\" (\"id\" INTEGER PRIMARY KEY AUTOINCREMENT)"
        );
        assert_eq!(
            layouts[0].insert_sql,
            "INSERT INTO \"c0\" DEFAULT VALUES RETURNING \"id\""
        );
    }

    #[test]
    fn column_widths() {
        assert_eq!(column_width(&Type::Uri), 1);
        assert_eq!(column_width(&Type::unit()), 0);
        let schema = micro_schema();
        assert_eq!(column_width(schema.get("http://example.com/a").unwrap()), 2);
        assert_eq!(column_width(schema.get("http://example.com/b").unwrap()), 3);
    }
}
