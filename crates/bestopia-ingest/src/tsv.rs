//! Naive tab-separated-value parsing for LLM-produced blocks.
//!
//! There is no quoting or escaping: a literal tab or newline inside a field
//! corrupts alignment. The prompts promise tab/newline-clean values and this
//! parser deliberately stays that simple.

use std::collections::{BTreeMap, HashMap};

use bestopia_store::ComparisonCell;

/// Marker line separating blocks in a multi-block response.
pub const BLOCK_SEPARATOR: &str = "----------";

/// One parsed block: the header row plus one field map per data line.
///
/// `headers` preserves column order for display; records carry only the
/// columns a line actually had values for (short lines drop trailing keys).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TsvBlock {
    pub headers: Vec<String>,
    pub records: Vec<HashMap<String, String>>,
}

/// Parse a single block: first line is the header row, the rest are data.
/// Blank interior lines are kept (they become a record mapping the first
/// header to an empty string); callers are expected to pre-trim.
pub fn parse_block(text: &str) -> TsvBlock {
    let mut lines = text.trim().lines();
    let headers: Vec<String> = match lines.next() {
        Some(line) => line.split('\t').map(|h| h.trim().to_string()).collect(),
        None => Vec::new(),
    };
    let records = lines.map(|line| zip_record(&headers, line)).collect();
    TsvBlock { headers, records }
}

fn zip_record(headers: &[String], line: &str) -> HashMap<String, String> {
    let values: Vec<&str> = line.split('\t').map(str::trim).collect();
    let mut record = HashMap::with_capacity(headers.len());
    for (idx, header) in headers.iter().enumerate() {
        if let Some(value) = values.get(idx) {
            record.insert(header.clone(), (*value).to_string());
        }
    }
    record
}

/// Parse a multi-block response: code-fence lines are stripped, blocks are
/// split on [`BLOCK_SEPARATOR`] lines and keyed `task1`, `task2`, ... Blank
/// lines inside a block are skipped in this variant.
pub fn parse_tasks(text: &str) -> BTreeMap<String, TsvBlock> {
    let mut blocks: Vec<Vec<&str>> = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("```") {
            continue;
        }
        if trimmed == BLOCK_SEPARATOR {
            blocks.push(std::mem::take(&mut current));
            continue;
        }
        if !trimmed.is_empty() {
            current.push(line);
        }
    }
    blocks.push(current);

    let mut tasks = BTreeMap::new();
    for lines in blocks.into_iter().filter(|lines| !lines.is_empty()) {
        let key = format!("task{}", tasks.len() + 1);
        tasks.insert(key, parse_block(&lines.join("\n")));
    }
    tasks
}

/// Comparison-table variant: the first header column names the aspect and
/// every later column position stands for one of `product_ids`, in order.
/// Each data row fans out into one cell per product column; short rows yield
/// empty comparison points.
pub fn parse_comparisons(product_ids: &[i64], text: &str) -> Vec<ComparisonCell> {
    let mut cells = Vec::new();
    let mut lines = text.trim().lines();
    if lines.next().is_none() {
        return cells;
    }
    for line in lines {
        let values: Vec<&str> = line.split('\t').map(str::trim).collect();
        let aspect = values.first().copied().unwrap_or_default();
        if aspect.is_empty() {
            continue;
        }
        for (position, product_id) in product_ids.iter().enumerate() {
            cells.push(ComparisonCell {
                product_id: *product_id,
                aspect: aspect.to_string(),
                comparison_point: values.get(position + 1).copied().unwrap_or("").to_string(),
            });
        }
    }
    cells
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_parses_headers_and_records() {
        let block = parse_block("name\tdescription\nMouse A\tGreat mouse\nMouse B\tBudget pick");
        assert_eq!(block.headers, vec!["name", "description"]);
        assert_eq!(block.records.len(), 2);
        assert_eq!(block.records[0]["name"], "Mouse A");
        assert_eq!(block.records[1]["description"], "Budget pick");
    }

    #[test]
    fn block_trims_headers_and_values() {
        let block = parse_block(" name \t description \n  Mouse A  \t  Great  ");
        assert_eq!(block.headers, vec!["name", "description"]);
        assert_eq!(block.records[0]["name"], "Mouse A");
        assert_eq!(block.records[0]["description"], "Great");
    }

    #[test]
    fn short_lines_drop_trailing_fields() {
        let block = parse_block("name\tdescription\timage_url\nMouse A\tGreat");
        let record = &block.records[0];
        assert_eq!(record["name"], "Mouse A");
        assert_eq!(record["description"], "Great");
        assert!(!record.contains_key("image_url"));
    }

    #[test]
    fn extra_values_beyond_headers_are_ignored() {
        let block = parse_block("name\nMouse A\tstray\tvalues");
        assert_eq!(block.records[0].len(), 1);
        assert_eq!(block.records[0]["name"], "Mouse A");
    }

    #[test]
    fn every_data_row_becomes_a_record() {
        let block = parse_block("name\na\nb\nc");
        assert_eq!(block.records.len(), 3);
        for record in &block.records {
            assert!(record.contains_key("name"));
        }
    }

    #[test]
    fn blank_interior_line_is_not_skipped() {
        let block = parse_block("name\tdescription\nMouse A\tGreat\n\nMouse B\tAlso fine");
        assert_eq!(block.records.len(), 3);
        assert_eq!(block.records[1]["name"], "");
        assert!(!block.records[1].contains_key("description"));
    }

    #[test]
    fn tasks_split_on_ten_dash_lines() {
        let text = "title\tsubtitle\nBest Mice\tOur picks\n----------\nname\tdescription\nMouse A\tGreat\nMouse B\tFine";
        let tasks = parse_tasks(text);
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks["task1"].records[0]["title"], "Best Mice");
        assert_eq!(tasks["task2"].records.len(), 2);
    }

    #[test]
    fn tasks_strip_code_fences_and_blank_lines() {
        let text = "```tsv\nname\n\nMouse A\n\n----------\n\nreview_text\nSolid choice.\n```";
        let tasks = parse_tasks(text);
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks["task1"].records.len(), 1);
        assert_eq!(tasks["task2"].records[0]["review_text"], "Solid choice.");
    }

    #[test]
    fn eleven_dashes_is_not_a_separator() {
        let tasks = parse_tasks("name\nMouse A\n-----------\nMouse B");
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks["task1"].records.len(), 3);
    }

    #[test]
    fn comparisons_fan_out_per_product_column() {
        let ids = [26, 444, 578];
        let text = "aspect\tproduct1\tproduct2\tproduct3\n\
                    Display\t6.8\" AMOLED\t6.7\" OLED\t6.9\" LTPO\n\
                    Processor\tSnapdragon\tA18 Pro\tTensor G4";
        let cells = parse_comparisons(&ids, text);
        assert_eq!(cells.len(), 6);
        assert_eq!(cells[0].product_id, 26);
        assert_eq!(cells[0].aspect, "Display");
        assert_eq!(cells[0].comparison_point, "6.8\" AMOLED");
        assert_eq!(cells[4].product_id, 444);
        assert_eq!(cells[4].comparison_point, "A18 Pro");
    }

    #[test]
    fn comparison_short_rows_yield_empty_points() {
        let cells = parse_comparisons(&[1, 2], "aspect\tp1\tp2\nWeight\t200g");
        assert_eq!(cells.len(), 2);
        assert_eq!(cells[1].comparison_point, "");
    }
}
