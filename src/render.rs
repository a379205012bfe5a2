use crate::table::Table;

/// Renders reconstructed tables as plain column-aligned text for stdout.
pub struct TableFormatter {
    padding: usize,
    alignment: ColumnAlignment,
    header_separator: bool,
}

#[derive(Clone, Copy)]
pub enum ColumnAlignment {
    Left,
    Center,
    Right,
}

impl TableFormatter {
    pub fn new() -> Self {
        Self {
            padding: 1,
            alignment: ColumnAlignment::Left,
            header_separator: true,
        }
    }

    /// Half the blank width between adjacent columns (gap is `padding * 2`).
    pub fn padding(mut self, padding: usize) -> Self {
        self.padding = padding;
        self
    }

    pub fn alignment(mut self, alignment: ColumnAlignment) -> Self {
        self.alignment = alignment;
        self
    }

    /// Toggle the dashed rule between header and body.
    pub fn separator(mut self, enabled: bool) -> Self {
        self.header_separator = enabled;
        self
    }

    pub fn format_table(&self, table: &Table) -> String {
        if table.is_empty() {
            return String::new();
        }

        let widths = self.calculate_column_widths(table);
        let mut lines = Vec::with_capacity(table.rows.len() + 2);

        lines.push(self.format_row(&table.header, &widths));

        // No rule under a header-only table.
        if self.header_separator && !table.rows.is_empty() {
            lines.push(self.create_separator(&widths));
        }

        for row in &table.rows {
            lines.push(self.format_row(row, &widths));
        }

        lines.join("\n")
    }

    fn calculate_column_widths(&self, table: &Table) -> Vec<usize> {
        // Width by chars, not bytes; cell text is OCR output and often
        // carries accented characters.
        let mut widths: Vec<usize> = table.header.iter().map(|h| h.chars().count()).collect();

        for row in &table.rows {
            for (i, cell) in row.iter().enumerate() {
                if let Some(width) = widths.get_mut(i) {
                    *width = (*width).max(cell.chars().count());
                }
            }
        }

        widths
    }

    fn format_row(&self, row: &[String], widths: &[usize]) -> String {
        let gap = " ".repeat(self.padding * 2);
        let mut formatted_cells = Vec::with_capacity(widths.len());

        for (i, width) in widths.iter().enumerate() {
            let content = row.get(i).map(String::as_str).unwrap_or("");
            formatted_cells.push(self.pad_content(content, *width));
        }

        formatted_cells.join(&gap).trim_end().to_string()
    }

    fn pad_content(&self, content: &str, width: usize) -> String {
        match self.alignment {
            ColumnAlignment::Left => format!("{:<width$}", content, width = width),
            ColumnAlignment::Right => format!("{:>width$}", content, width = width),
            ColumnAlignment::Center => format!("{:^width$}", content, width = width),
        }
    }

    fn create_separator(&self, widths: &[usize]) -> String {
        let gap = " ".repeat(self.padding * 2);
        let separators: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
        separators.join(&gap)
    }
}
