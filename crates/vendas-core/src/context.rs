use crate::sheet::Sheet;

/// How many data rows of each sheet go into the model context.
///
/// `Exhaustive` is the default: aggregate questions (totals, "best selling
/// product") can only be answered correctly when the model sees every row.
/// `Sample` bounds the payload instead; the dump is labeled as a sample so
/// the model knows it cannot compute exact aggregates from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextPolicy {
    Exhaustive,
    Sample(usize),
}

/// Emitted instead of sheet dumps when nothing is loaded, so the model can
/// tell the user to upload data instead of inventing numbers.
pub const NO_DATA_MARKER: &str = "No spreadsheet data is currently available.";

/// Serialize the sheet set into one bounded text block.
///
/// Every sheet gets a marker, its modification date, headers, and record
/// count, in insertion order - even when the size guard has already run out
/// of budget. The guard only trims data rows, and a trimmed context says so
/// explicitly rather than dropping rows silently.
pub fn build_context(sheets: &[Sheet], policy: ContextPolicy, max_bytes: usize) -> String {
    if sheets.is_empty() {
        return format!(
            "{NO_DATA_MARKER} Tell the user to upload or sync their sales \
             spreadsheets before asking data questions."
        );
    }

    let mut out = String::from("Available sales spreadsheet data:\n\n");
    let mut rows_omitted = 0usize;

    for sheet in sheets {
        out.push_str(&format!("=== {} ===\n", sheet.name));
        out.push_str(&format!("Last modified: {}\n", sheet.last_modified.format("%d/%m/%Y")));
        if !sheet.headers.is_empty() {
            out.push_str(&format!("Headers: {}\n", sheet.headers.join(", ")));
        }
        out.push_str(&format!("Total records: {}\n", sheet.row_count()));
        if sheet.parse_warnings > 0 {
            out.push_str(&format!("Unreadable rows skipped: {}\n", sheet.parse_warnings));
        }

        let shown = match policy {
            ContextPolicy::Exhaustive => sheet.rows.len(),
            ContextPolicy::Sample(n) => n.min(sheet.rows.len()),
        };

        if shown > 0 {
            match policy {
                ContextPolicy::Exhaustive => out.push_str("Rows:\n"),
                ContextPolicy::Sample(_) => out.push_str(&format!(
                    "Sample rows (first {shown} of {}):\n",
                    sheet.row_count()
                )),
            }
        }

        for row in &sheet.rows[..shown] {
            let line = row.join(", ");
            if out.len() + line.len() + 1 > max_bytes {
                rows_omitted += 1;
                continue;
            }
            out.push_str(&line);
            out.push('\n');
        }

        out.push('\n');
    }

    if rows_omitted > 0 {
        out.push_str(&format!(
            "[Context truncated: {rows_omitted} data rows omitted to fit the size limit. \
             Aggregate answers may be incomplete.]\n"
        ));
    }

    out
}

/// Combine the context block and the user's question into the full prompt.
///
/// Pure and deterministic; the context and the question appear verbatim, in
/// that order, around a fixed instruction suffix telling the model to
/// compute exact answers from the supplied rows.
pub fn compose(context: &str, prompt: &str) -> String {
    format!(
        "You are a sales data analyst assistant.\n\n\
         {context}\n\n\
         User question: {prompt}\n\n\
         Answer the question using the spreadsheet data above. Compute exact \
         figures from the rows provided instead of estimating, and show the \
         relevant numbers. If the data cannot answer the question, say so and \
         explain what is missing."
    )
}
