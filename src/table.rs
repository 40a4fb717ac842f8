use std::fmt::Write as _;

/// Renders rows as a plain-text table. Columns whose cells are all numeric
/// are right-aligned.
pub fn render_table<H: AsRef<str>>(headers: &[H], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.as_ref().chars().count()).collect();
    let mut numeric = vec![true; headers.len()];
    for row in rows {
        for (idx, cell) in row.iter().enumerate().take(headers.len()) {
            let cell = flatten(cell);
            widths[idx] = widths[idx].max(cell.chars().count());
            if !cell.is_empty() && cell.parse::<f64>().is_err() {
                numeric[idx] = false;
            }
        }
    }

    let mut output = String::new();
    let header_cells: Vec<String> = headers.iter().map(|h| h.as_ref().to_string()).collect();
    push_line(&mut output, &header_cells, &widths, &vec![false; headers.len()]);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat((*w).max(1))).collect();
    push_line(&mut output, &rule, &widths, &numeric);
    for row in rows {
        let cells: Vec<String> = row.iter().map(|cell| flatten(cell)).collect();
        push_line(&mut output, &cells, &widths, &numeric);
    }
    output
}

pub fn print_table<H: AsRef<str>>(headers: &[H], rows: &[Vec<String>]) {
    print!("{}", render_table(headers, rows));
}

fn flatten(cell: &str) -> String {
    cell.replace(['\n', '\r', '\t'], " ")
}

fn push_line(output: &mut String, cells: &[String], widths: &[usize], right_align: &[bool]) {
    let mut line = String::new();
    for (idx, &width) in widths.iter().enumerate() {
        if idx > 0 {
            line.push_str("  ");
        }
        let cell = cells.get(idx).map(String::as_str).unwrap_or("");
        if right_align[idx] {
            let _ = write!(line, "{cell:>width$}");
        } else {
            let _ = write!(line, "{cell:<width$}");
        }
    }
    let _ = writeln!(output, "{}", line.trim_end());
}
