//! AST traversal
//!
//! Structural `visit_*` methods default to walking their children through
//! the `walk_*` functions; leaf methods default to doing nothing. Override
//! only the nodes you care about and call the matching `walk_*` to keep
//! descending.

use super::ast::*;

pub trait Visitor {
    fn visit_statement(&mut self, stmt: &Statement) {
        walk_statement(self, stmt);
    }

    fn visit_select(&mut self, stmt: &SelectStmt) {
        walk_select(self, stmt);
    }

    fn visit_insert(&mut self, stmt: &InsertStmt) {
        walk_insert(self, stmt);
    }

    fn visit_update(&mut self, stmt: &UpdateStmt) {
        walk_update(self, stmt);
    }

    fn visit_delete(&mut self, stmt: &DeleteStmt) {
        walk_delete(self, stmt);
    }

    fn visit_create_table(&mut self, stmt: &CreateTableStmt) {
        walk_create_table(self, stmt);
    }

    fn visit_create_database(&mut self, _stmt: &CreateDatabaseStmt) {}

    fn visit_drop_table(&mut self, _stmt: &DropTableStmt) {}

    fn visit_drop_database(&mut self, _stmt: &DropDatabaseStmt) {}

    fn visit_table_ref(&mut self, _table: &TableRef) {}

    fn visit_column_def(&mut self, def: &ColumnDef) {
        if let Some(default) = &def.default_value {
            self.visit_expr(default);
        }
    }

    fn visit_expr(&mut self, expr: &Expr) {
        walk_expr(self, expr);
    }

    fn visit_column_ref(&mut self, _column: &ColumnRef) {}

    fn visit_literal(&mut self, _literal: &Literal) {}

    fn visit_function_call(&mut self, call: &FunctionCall) {
        for arg in &call.args {
            self.visit_expr(arg);
        }
    }
}

pub fn walk_statement<V: Visitor + ?Sized>(visitor: &mut V, stmt: &Statement) {
    match stmt {
        Statement::Select(s) => visitor.visit_select(s),
        Statement::Insert(s) => visitor.visit_insert(s),
        Statement::Update(s) => visitor.visit_update(s),
        Statement::Delete(s) => visitor.visit_delete(s),
        Statement::CreateTable(s) => visitor.visit_create_table(s),
        Statement::CreateDatabase(s) => visitor.visit_create_database(s),
        Statement::DropTable(s) => visitor.visit_drop_table(s),
        Statement::DropDatabase(s) => visitor.visit_drop_database(s),
    }
}

pub fn walk_select<V: Visitor + ?Sized>(visitor: &mut V, stmt: &SelectStmt) {
    for column in &stmt.columns {
        visitor.visit_expr(column);
    }
    if let Some(from) = &stmt.from {
        visitor.visit_table_ref(from);
    }
    if let Some(expr) = &stmt.where_clause {
        visitor.visit_expr(expr);
    }
    for column in stmt.group_by.iter().flatten() {
        visitor.visit_column_ref(column);
    }
    if let Some(expr) = &stmt.having {
        visitor.visit_expr(expr);
    }
    for item in stmt.order_by.iter().flatten() {
        visitor.visit_column_ref(&item.column);
    }
}

pub fn walk_insert<V: Visitor + ?Sized>(visitor: &mut V, stmt: &InsertStmt) {
    for row in &stmt.values {
        for expr in row {
            visitor.visit_expr(expr);
        }
    }
}

pub fn walk_update<V: Visitor + ?Sized>(visitor: &mut V, stmt: &UpdateStmt) {
    for (_, expr) in &stmt.assignments {
        visitor.visit_expr(expr);
    }
    if let Some(expr) = &stmt.where_clause {
        visitor.visit_expr(expr);
    }
}

pub fn walk_delete<V: Visitor + ?Sized>(visitor: &mut V, stmt: &DeleteStmt) {
    if let Some(expr) = &stmt.where_clause {
        visitor.visit_expr(expr);
    }
}

pub fn walk_create_table<V: Visitor + ?Sized>(visitor: &mut V, stmt: &CreateTableStmt) {
    for def in &stmt.columns {
        visitor.visit_column_def(def);
    }
}

pub fn walk_expr<V: Visitor + ?Sized>(visitor: &mut V, expr: &Expr) {
    match expr {
        Expr::Column(column) => visitor.visit_column_ref(column),
        Expr::Literal(literal) => visitor.visit_literal(literal),
        Expr::BinaryOp { left, right, .. } => {
            visitor.visit_expr(left);
            visitor.visit_expr(right);
        }
        Expr::UnaryOp { operand, .. } => visitor.visit_expr(operand),
        Expr::Function(call) => visitor.visit_function_call(call),
        Expr::List(items) => {
            for item in items {
                visitor.visit_expr(item);
            }
        }
    }
}

#[derive(Default)]
struct ColumnCollector {
    columns: Vec<ColumnRef>,
}

impl Visitor for ColumnCollector {
    fn visit_column_ref(&mut self, column: &ColumnRef) {
        if !self.columns.contains(column) {
            self.columns.push(column.clone());
        }
    }
}

/// Distinct column references in `expr`, in first-seen order
pub fn referenced_columns(expr: &Expr) -> Vec<ColumnRef> {
    let mut collector = ColumnCollector::default();
    collector.visit_expr(expr);
    collector.columns
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::parse;

    #[derive(Default)]
    struct Counter {
        literals: usize,
        functions: Vec<String>,
        tables: Vec<String>,
    }

    impl Visitor for Counter {
        fn visit_literal(&mut self, _literal: &Literal) {
            self.literals += 1;
        }

        fn visit_function_call(&mut self, call: &FunctionCall) {
            self.functions.push(call.name.clone());
            for arg in &call.args {
                self.visit_expr(arg);
            }
        }

        fn visit_table_ref(&mut self, table: &TableRef) {
            self.tables.push(table.name.clone());
        }
    }

    #[test]
    fn test_visitor_reaches_nested_nodes() {
        let stmt = parse(
            "SELECT upper(name), COUNT(*) FROM users WHERE age IN (1, 2) AND NOT (score > 3.5) \
             GROUP BY name HAVING COUNT(*) > 1",
        )
        .unwrap();
        let mut counter = Counter::default();
        counter.visit_statement(&stmt);

        assert_eq!(counter.literals, 4);
        assert_eq!(counter.functions, vec!["upper", "count", "count"]);
        assert_eq!(counter.tables, vec!["users"]);
    }

    #[test]
    fn test_visitor_sees_defaults_and_insert_values() {
        let mut counter = Counter::default();
        counter.visit_statement(&parse("CREATE TABLE t (a INTEGER DEFAULT 1, b TEXT)").unwrap());
        assert_eq!(counter.literals, 1);

        let mut counter = Counter::default();
        counter.visit_statement(&parse("INSERT INTO t VALUES (1, 'a'), (2, NULL)").unwrap());
        assert_eq!(counter.literals, 4);
    }

    #[test]
    fn test_referenced_columns() {
        let stmt = parse("SELECT * FROM t WHERE a > 1 AND (b = a OR t.c IS NULL)").unwrap();
        let where_clause = match stmt {
            Statement::Select(s) => s.where_clause.unwrap(),
            _ => unreachable!(),
        };
        assert_eq!(
            referenced_columns(&where_clause),
            vec![ColumnRef::new("a"), ColumnRef::new("b"), ColumnRef::qualified("t", "c")]
        );
    }
}
