//! 结果打印器
//!
//! 提供表格、垂直和 JSON 格式的结果输出

use crate::catalog::TypeDefinition;
use crate::query::{QueryResult, ResultValue};
use prettytable::{format, row, Cell, Row, Table};

/// 打印模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrintMode {
    /// 表格模式
    Table,
    /// 垂直模式 (\G)
    Vertical,
    /// JSON 模式
    Json,
}

/// 结果打印器
pub struct Printer {
    mode: PrintMode,
}

impl Default for Printer {
    fn default() -> Self {
        Self::new(PrintMode::Table)
    }
}

impl Printer {
    pub fn new(mode: PrintMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> PrintMode {
        self.mode
    }

    /// 设置打印模式
    pub fn set_mode(&mut self, mode: PrintMode) {
        self.mode = mode;
    }

    /// 打印查询结果
    pub fn print_result(&self, result: &QueryResult) -> String {
        if self.mode == PrintMode::Json {
            return match serde_json::to_string_pretty(result) {
                Ok(json) => format!("{}\n", json),
                Err(e) => format!("JSON 序列化失败: {}\n", e),
            };
        }

        let elapsed = result.stats.execution_time_ms;
        if result.columns.is_empty() || result.rows.is_empty() {
            return format!("Empty set ({} ms)\n", elapsed);
        }

        let rows: Vec<Vec<String>> = result
            .rows
            .iter()
            .map(|row| row.iter().map(ResultValue::to_string).collect())
            .collect();

        let output = match self.mode {
            PrintMode::Vertical => self.format_vertical(&result.columns, &rows),
            _ => self.format_table(&result.columns, &rows),
        };

        let more = if result.has_more_items {
            format!(", {} total, more available", result.num_items)
        } else {
            String::new()
        };
        format!(
            "{}\n{} row(s) in set{} ({} ms)\n",
            output,
            rows.len(),
            more,
            elapsed
        )
    }

    /// 表格格式
    fn format_table(&self, columns: &[String], rows: &[Vec<String>]) -> String {
        let mut table = Table::new();
        table.set_format(*format::consts::FORMAT_BOX_CHARS);

        let header: Vec<Cell> = columns.iter().map(|c| Cell::new(c)).collect();
        table.set_titles(Row::new(header));

        for row_data in rows {
            let cells: Vec<Cell> = row_data.iter().map(|v| Cell::new(v)).collect();
            table.add_row(Row::new(cells));
        }

        table.to_string()
    }

    /// 垂直格式
    fn format_vertical(&self, columns: &[String], rows: &[Vec<String>]) -> String {
        let max_col_width = columns.iter().map(|c| c.len()).max().unwrap_or(0);
        let mut output = String::new();

        for (i, row_data) in rows.iter().enumerate() {
            output.push_str(&format!(
                "*************************** {}. row ***************************\n",
                i + 1
            ));

            for (j, col) in columns.iter().enumerate() {
                let value = row_data.get(j).map(|s| s.as_str()).unwrap_or("");
                output.push_str(&format!("{:>width$}: {}\n", col, value, width = max_col_width));
            }
        }

        output
    }

    /// 打印类型定义
    pub fn print_type(&self, definition: &TypeDefinition) -> String {
        let mut table = Table::new();
        table.set_format(*format::consts::FORMAT_BOX_CHARS);
        table.set_titles(row!["Property", "Type", "Cardinality", "Queryable", "Orderable"]);
        for property in &definition.properties {
            table.add_row(row![
                property.query_name,
                property.property_type.to_string(),
                format!("{:?}", property.cardinality),
                property.queryable.to_string(),
                property.orderable.to_string()
            ]);
        }

        format!(
            "{} (parent: {}, queryable: {}, fulltext: {})\n{}",
            definition.id,
            definition.parent_id.as_deref().unwrap_or("-"),
            definition.queryable,
            definition.fulltext_indexed,
            table
        )
    }

    /// 打印帮助信息
    pub fn print_help() -> String {
        r#"
═══════════════════════════════════════════════════════════════
                   cmis-query 命令帮助
═══════════════════════════════════════════════════════════════

基础命令:
  help, h, ?           显示帮助
  quit, exit, q        退出程序
  types                列出所有类型
  describe <类型>      查看类型的属性定义
                       示例: describe cmis:document
  mode <table|vertical|json>
                       切换输出格式

  其余输入按 CMIS-QL 语句执行

───────────────────────────────────────────────────────────────
CMIS-QL 语句
───────────────────────────────────────────────────────────────

  SELECT * FROM cmis:document
  SELECT cmis:name AS name FROM cmis:document WHERE cmis:name LIKE 'rep%'
  SELECT d.cmis:name, SCORE() s FROM cmis:document d
         WHERE CONTAINS(d, 'budget -draft') ORDER BY s DESC
  SELECT * FROM cmis:folder WHERE IN_TREE('root')
  SELECT * FROM cmis:document WHERE 'red' = ANY Tags
  SELECT a.cmis:name, b.cmis:name FROM A a LEFT OUTER JOIN B b
         ON a.Ref = b.cmis:objectId

提示: 在语句末尾加 \G 可垂直显示结果

═══════════════════════════════════════════════════════════════
"#
        .to_string()
    }
}

/// 检查查询是否以 \G 结尾（垂直显示）
pub fn check_vertical_display(query: &str) -> (String, bool) {
    let trimmed = query.trim();
    if trimmed.ends_with("\\G") || trimmed.ends_with("\\g") {
        let clean_query = trimmed[..trimmed.len() - 2].trim().to_string();
        (clean_query, true)
    } else {
        (trimmed.to_string(), false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::QueryStats;
    use crate::types::PropertyValue;

    fn result(rows: usize) -> QueryResult {
        QueryResult {
            columns: vec!["cmis:name".to_string(), "Pages".to_string()],
            rows: (0..rows)
                .map(|i| {
                    vec![
                        ResultValue::Scalar(PropertyValue::from(format!("doc{}", i))),
                        ResultValue::Null,
                    ]
                })
                .collect(),
            stats: QueryStats::default(),
            has_more_items: false,
            num_items: rows,
        }
    }

    #[test]
    fn test_empty_set() {
        let printer = Printer::default();
        assert_eq!(printer.print_result(&result(0)), "Empty set (0 ms)\n");
    }

    #[test]
    fn test_table_and_vertical() {
        let table = Printer::default().print_result(&result(2));
        assert!(table.contains("doc1"));
        assert!(table.contains("2 row(s) in set"));

        let vertical = Printer::new(PrintMode::Vertical).print_result(&result(1));
        assert!(vertical.contains("1. row"));
        assert!(vertical.contains("    Pages: NULL"));
    }

    #[test]
    fn test_json_mode() {
        let json = Printer::new(PrintMode::Json).print_result(&result(1));
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["num_items"], 1);
    }

    #[test]
    fn test_check_vertical_display() {
        assert_eq!(
            check_vertical_display("SELECT * FROM cmis:document \\G"),
            ("SELECT * FROM cmis:document".to_string(), true)
        );
        assert_eq!(check_vertical_display(" x "), ("x".to_string(), false));
    }
}
