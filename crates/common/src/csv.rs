//! Permissive CSV parsing for subject rows.
//!
//! Both the pipeline's compute stage and the lookup service consume the same
//! row shape: comma-separated lines with a header naming at least the `id`,
//! `name` and `image_id` columns. Columns are matched by header position,
//! fields are trimmed, and rows without a positive numeric id are dropped.

use crate::types::Subject;

/// Parses subject rows out of raw CSV text.
///
/// Returns an empty vector for input with no data rows. Rows whose `id`
/// column is missing, unparseable or non-positive are skipped.
pub fn parse_subject_rows(content: &str) -> Vec<Subject> {
    let mut lines = content.trim().lines();
    let Some(header) = lines.next() else {
        return Vec::new();
    };

    let headers: Vec<&str> = header.split(',').map(str::trim).collect();
    let id_col = headers.iter().position(|h| *h == "id");
    let name_col = headers.iter().position(|h| *h == "name");
    let image_col = headers.iter().position(|h| *h == "image_id");

    lines
        .filter_map(|line| {
            let values: Vec<&str> = line.split(',').map(str::trim).collect();
            let field = |col: Option<usize>| {
                col.and_then(|c| values.get(c)).copied().unwrap_or_default()
            };

            let id: u32 = field(id_col).parse().unwrap_or(0);
            (id > 0).then(|| Subject::new(id, field(name_col), field(image_col)))
        })
        .collect()
}
