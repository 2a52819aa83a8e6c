//! Plain-text tables which stay parseable by `awk` and `cut`.

use std::fmt::{self, Write};

pub(crate) struct Row {
    cells: Vec<String>,
}

impl Row {
    fn has_whitespace(&self) -> bool {
        self.cells
            .iter()
            .any(|cell| cell.contains(char::is_whitespace))
    }

    fn columns(&self) -> usize {
        self.cells.len()
    }
}

pub(crate) trait IntoRow: Into<Row> + Sized {
    fn into_row(self) -> Row {
        self.into()
    }
}

impl<T> IntoRow for T where T: Into<Row> + Sized {}

impl From<Vec<String>> for Row {
    fn from(value: Vec<String>) -> Self {
        Row { cells: value }
    }
}

impl From<Vec<&str>> for Row {
    fn from(value: Vec<&str>) -> Self {
        let value: Vec<String> = value.into_iter().map(str::to_owned).collect();

        value.into()
    }
}

/// A table whose columns are separated by two spaces. Every row must have
/// as many cells as the first row added, and header cells may not contain
/// whitespace.
pub(crate) struct Table {
    body: Vec<Row>,
    header: Option<Row>,
    num_columns: Option<usize>,
    print_header: bool,
}

impl Table {
    pub(crate) fn new() -> Table {
        Table {
            body: Vec::new(),
            header: None,
            num_columns: None,
            print_header: true,
        }
    }

    fn expect_num_columns(&mut self, num_columns: usize) {
        match self.num_columns {
            Some(expected) => assert_eq!(
                expected, num_columns,
                "table has {} columns but a row with {} columns was inserted",
                expected, num_columns
            ),
            None => self.num_columns = Some(num_columns),
        }
    }

    pub(crate) fn print_header(&mut self, print_header: bool) {
        self.print_header = print_header;
    }

    pub(crate) fn add_row<S: IntoRow>(&mut self, row: S) {
        let row = row.into_row();

        self.expect_num_columns(row.columns());

        self.body.push(row);
    }

    pub(crate) fn set_header<S: IntoRow>(&mut self, header: S) {
        let header = header.into_row();

        self.expect_num_columns(header.columns());

        assert!(
            !header.has_whitespace(),
            "table header contains whitespace"
        );

        self.header.replace(header);
    }

    fn visible_rows(&self) -> impl Iterator<Item = &Row> {
        let header = match self.print_header {
            true => self.header.as_ref(),
            false => None,
        };

        header.into_iter().chain(self.body.iter())
    }

    /// Widths are counted in characters so that names outside ASCII still
    /// line up.
    fn column_widths(&self) -> Vec<usize> {
        let mut widths = vec![0usize; self.num_columns.unwrap_or(0)];

        for row in self.visible_rows() {
            for (width, cell) in widths.iter_mut().zip(&row.cells) {
                *width = (*width).max(cell.chars().count());
            }
        }

        widths
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let widths = self.column_widths();

        for row in self.visible_rows() {
            let last = row.cells.len().saturating_sub(1);

            for (i, cell) in row.cells.iter().enumerate() {
                if i == last {
                    f.write_str(cell)?;
                } else {
                    write!(f, "{:<width$}  ", cell, width = widths[i])?;
                }
            }

            f.write_char('\n')?;
        }

        Ok(())
    }
}

pub(crate) trait IntoTable: Into<Table> + Sized {
    fn into_table(self) -> Table {
        self.into()
    }
}

impl<T> IntoTable for T where T: Into<Table> + Sized {}
