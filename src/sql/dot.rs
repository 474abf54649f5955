//! Parse-tree diagnostics
//!
//! Renders a statement as a Graphviz DOT digraph and writes it under a
//! caller-chosen run directory: `<output_dir>/run_<run_id>/parse_tree_<crc>.dot`.

use super::ast::*;
use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Fresh run identifier: UTC timestamp plus a random suffix
pub fn generate_run_id() -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!(
        "{}_{}",
        chrono::Utc::now().format("%Y%m%d_%H%M%S"),
        &suffix[..8]
    )
}

/// Writes parse trees for one run into its own subdirectory
#[derive(Debug, Clone)]
pub struct ParseTreeWriter {
    output_dir: PathBuf,
    run_id: String,
}

impl ParseTreeWriter {
    pub fn new(output_dir: impl Into<PathBuf>, run_id: impl Into<String>) -> Self {
        Self {
            output_dir: output_dir.into(),
            run_id: run_id.into(),
        }
    }

    pub fn run_dir(&self) -> PathBuf {
        self.output_dir.join(format!("run_{}", self.run_id))
    }

    /// Write the tree for `stmt`; the file name is derived from the SQL text
    pub fn write(&self, sql: &str, stmt: &Statement) -> io::Result<PathBuf> {
        let dir = self.run_dir();
        fs::create_dir_all(&dir)?;

        let path = dir.join(file_name_for(sql));
        fs::write(&path, to_dot(stmt))?;
        log::debug!("Wrote parse tree to {}", path.display());
        Ok(path)
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

fn file_name_for(sql: &str) -> String {
    format!("parse_tree_{:08x}.dot", crc32fast::hash(sql.as_bytes()))
}

/// DOT source for `stmt`
pub fn to_dot(stmt: &Statement) -> String {
    let mut builder = DotBuilder::default();
    builder.statement(stmt);
    builder.finish()
}

#[derive(Default)]
struct DotBuilder {
    body: String,
    next_id: usize,
}

impl DotBuilder {
    fn node(&mut self, label: &str) -> usize {
        let id = self.next_id;
        self.next_id += 1;
        let escaped = label.replace('\\', "\\\\").replace('"', "\\\"");
        let _ = writeln!(self.body, "  n{} [label=\"{}\"];", id, escaped);
        id
    }

    fn edge(&mut self, from: usize, to: usize) {
        let _ = writeln!(self.body, "  n{} -> n{};", from, to);
    }

    fn child(&mut self, parent: usize, label: &str) -> usize {
        let id = self.node(label);
        self.edge(parent, id);
        id
    }

    fn finish(self) -> String {
        format!("digraph parse_tree {{\n  node [shape=box];\n{}}}\n", self.body)
    }

    fn statement(&mut self, stmt: &Statement) -> usize {
        let root = self.node(stmt.kind());
        match stmt {
            Statement::Select(s) => {
                if s.distinct {
                    self.child(root, "DISTINCT");
                }
                let columns = self.child(root, "columns");
                for expr in &s.columns {
                    self.expr_under(columns, expr);
                }
                if let Some(from) = &s.from {
                    let label = match &from.alias {
                        Some(alias) => format!("FROM {} AS {}", from.name, alias),
                        None => format!("FROM {}", from.name),
                    };
                    self.child(root, &label);
                }
                if let Some(expr) = &s.where_clause {
                    let node = self.child(root, "WHERE");
                    self.expr_under(node, expr);
                }
                if let Some(group_by) = &s.group_by {
                    let node = self.child(root, "GROUP BY");
                    for column in group_by {
                        self.child(node, &column.to_string());
                    }
                }
                if let Some(expr) = &s.having {
                    let node = self.child(root, "HAVING");
                    self.expr_under(node, expr);
                }
                if let Some(order_by) = &s.order_by {
                    let node = self.child(root, "ORDER BY");
                    for item in order_by {
                        let label = match item.direction {
                            Some(SortDirection::Asc) => format!("{} ASC", item.column),
                            Some(SortDirection::Desc) => format!("{} DESC", item.column),
                            None => item.column.to_string(),
                        };
                        self.child(node, &label);
                    }
                }
                if let Some(limit) = &s.limit {
                    let label = match limit.offset {
                        Some(offset) => format!("LIMIT {} OFFSET {}", limit.count, offset),
                        None => format!("LIMIT {}", limit.count),
                    };
                    self.child(root, &label);
                }
            }
            Statement::Insert(s) => {
                self.child(root, &format!("table {}", s.table));
                if let Some(columns) = &s.columns {
                    self.child(root, &format!("columns ({})", columns.join(", ")));
                }
                for (i, row) in s.values.iter().enumerate() {
                    let node = self.child(root, &format!("row {}", i));
                    for expr in row {
                        self.expr_under(node, expr);
                    }
                }
            }
            Statement::Update(s) => {
                self.child(root, &format!("table {}", s.table));
                for (column, expr) in &s.assignments {
                    let node = self.child(root, &format!("SET {}", column));
                    self.expr_under(node, expr);
                }
                if let Some(expr) = &s.where_clause {
                    let node = self.child(root, "WHERE");
                    self.expr_under(node, expr);
                }
            }
            Statement::Delete(s) => {
                self.child(root, &format!("table {}", s.table));
                if let Some(expr) = &s.where_clause {
                    let node = self.child(root, "WHERE");
                    self.expr_under(node, expr);
                }
            }
            Statement::CreateTable(s) => {
                self.child(root, &format!("table {}", s.table));
                for def in &s.columns {
                    let mut label = format!("{} {}", def.name, def.data_type);
                    if def.primary_key {
                        label.push_str(" PRIMARY KEY");
                    }
                    if !def.nullable {
                        label.push_str(" NOT NULL");
                    }
                    let node = self.child(root, &label);
                    if let Some(default) = &def.default_value {
                        let default_node = self.child(node, "DEFAULT");
                        self.expr_under(default_node, default);
                    }
                }
            }
            Statement::CreateDatabase(s) => {
                self.child(root, &s.name);
            }
            Statement::DropTable(s) => {
                self.child(root, &s.name);
            }
            Statement::DropDatabase(s) => {
                self.child(root, &s.name);
            }
        }
        root
    }

    fn expr_under(&mut self, parent: usize, expr: &Expr) {
        let id = self.expr(expr);
        self.edge(parent, id);
    }

    fn expr(&mut self, expr: &Expr) -> usize {
        match expr {
            Expr::Column(column) => self.node(&format!("column {}", column)),
            Expr::Literal(literal) => self.node(&format!("{} ({})", literal, literal.kind())),
            Expr::BinaryOp { left, op, right } => {
                let id = self.node(op.as_str());
                self.expr_under(id, left);
                if !matches!(op, BinaryOperator::IsNull | BinaryOperator::IsNotNull) {
                    self.expr_under(id, right);
                }
                id
            }
            Expr::UnaryOp { op, operand } => {
                let id = self.node(&op.to_string());
                self.expr_under(id, operand);
                id
            }
            Expr::Function(call) => {
                let id = self.node(&format!("{}()", call.name));
                for arg in &call.args {
                    self.expr_under(id, arg);
                }
                id
            }
            Expr::List(items) => {
                let id = self.node("list");
                for item in items {
                    self.expr_under(id, item);
                }
                id
            }
        }
    }
}
