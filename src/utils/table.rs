/// Shown in place of SQL `NULL`.
pub const MISSING_VALUE: &str = "null";

/// Renders rows as a plain-text grid:
///
/// ```text
/// +----+-------+
/// | id | name  |
/// +====+=======+
/// | 1  | Ayaka |
/// +----+-------+
/// ```
pub fn render_grid(headers: &[String], rows: &[Vec<Option<String>>]) -> String {
    if headers.is_empty() {
        return String::new();
    }

    let cell = |row: &[Option<String>], i: usize| -> String {
        row.get(i)
            .and_then(|v| v.clone())
            .unwrap_or_else(|| MISSING_VALUE.to_string())
    };

    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(i, header)| {
            rows.iter()
                .map(|row| cell(row, i).chars().count())
                .chain(std::iter::once(header.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let border = |fill: char| -> String {
        let mut line = String::from("+");
        for width in &widths {
            line.extend(std::iter::repeat(fill).take(width + 2));
            line.push('+');
        }
        line
    };

    let render_row = |values: Vec<String>| -> String {
        let mut line = String::from("|");
        for (value, width) in values.iter().zip(&widths) {
            let pad = width - value.chars().count();
            line.push(' ');
            line.push_str(value);
            line.extend(std::iter::repeat(' ').take(pad + 1));
            line.push('|');
        }
        line
    };

    let mut lines = vec![border('-'), render_row(headers.to_vec()), border('=')];
    for row in rows {
        let values = (0..headers.len()).map(|i| cell(row, i)).collect();
        lines.push(render_row(values));
        lines.push(border('-'));
    }
    if rows.is_empty() {
        lines.pop();
        lines.push(border('-'));
    }

    lines.join("\n")
}
