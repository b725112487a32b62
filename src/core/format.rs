//! Chat text helpers shared by the command handlers.

use std::fmt::Write;

/// Longest message Discord accepts.
pub const MAX_MESSAGE_LENGTH: usize = 2000;

const ZERO_WIDTH_JOINER: char = '\u{200D}';

/// `"1 sip"`, `"2 sips"`.
#[must_use]
pub fn plural(count: u32, name: &str) -> String {
    if count == 1 {
        format!("{count} {name}")
    } else {
        format!("{count} {name}s")
    }
}

/// Discord mention for a user id.
#[must_use]
pub fn mention(chat_user_id: &str) -> String {
    format!("<@{chat_user_id}>")
}

/// Escapes Discord markdown so user supplied names render literally.
#[must_use]
pub fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '*' | '_' | '~' | '`' | '|' | '>') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Wraps `text` in inline code. Backticks are dropped since they would end the span.
#[must_use]
pub fn inline_code(text: &str) -> String {
    format!("`{}`", text.replace('`', ""))
}

/// Breaks up every run of three backticks so `text` cannot close a code block.
#[must_use]
pub fn code_block_escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    let mut run = 0;
    for c in text.chars() {
        if c == '`' {
            run += 1;
            if run == 3 {
                escaped.push(ZERO_WIDTH_JOINER);
                run = 1;
            }
        } else {
            run = 0;
        }
        escaped.push(c);
    }
    escaped
}

/// Wraps `text` in a code block, truncating it to fit into one message.
#[must_use]
pub fn code_block(language: &str, text: &str) -> String {
    let escaped = code_block_escape(text);
    let message = format!("```{language}\n{escaped}\n```");
    if message.chars().count() <= MAX_MESSAGE_LENGTH {
        return message;
    }

    let suffix = "\n```";
    let prefix_template = "Truncated result to length 0000:\n";
    let keep = MAX_MESSAGE_LENGTH - prefix_template.len() - suffix.len();
    let prefix = prefix_template.replace("0000", &keep.to_string());

    // Escaping guarantees no cut can leave an open triple backtick behind.
    let body: String = message
        .trim_end_matches('`')
        .trim()
        .chars()
        .take(keep)
        .collect();
    format!("{prefix}{body}{suffix}")
}

/// Plain text table with a header separated by a rule, for monospace output.
#[derive(Debug, Default)]
pub struct TextTable {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl TextTable {
    /// Creates a table; header cells may span several lines.
    #[must_use]
    pub fn new(header: Vec<String>) -> Self {
        Self {
            header,
            rows: Vec::new(),
        }
    }

    /// Appends a row; missing cells render empty.
    pub fn add_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    /// Renders the table.
    pub fn draw(&self) -> Result<String, std::fmt::Error> {
        let columns = self
            .rows
            .iter()
            .map(Vec::len)
            .chain(std::iter::once(self.header.len()))
            .max()
            .unwrap_or(0);

        let header_lines: Vec<Vec<&str>> = (0..columns)
            .map(|c| self.header.get(c).map_or_else(Vec::new, |h| h.lines().collect()))
            .collect();
        let header_height = header_lines.iter().map(Vec::len).max().unwrap_or(0);

        let widths: Vec<usize> = (0..columns)
            .map(|c| {
                let header_width = header_lines[c]
                    .iter()
                    .map(|l| l.chars().count())
                    .max()
                    .unwrap_or(0);
                self.rows
                    .iter()
                    .filter_map(|row| row.get(c))
                    .map(|cell| cell.chars().count())
                    .chain(std::iter::once(header_width))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let mut out = String::new();
        for line in 0..header_height {
            // Header cells are bottom aligned so single line titles sit on the rule.
            let cells: Vec<String> = (0..columns)
                .map(|c| {
                    let lines = &header_lines[c];
                    let offset = header_height - lines.len();
                    let text = line
                        .checked_sub(offset)
                        .and_then(|i| lines.get(i))
                        .copied()
                        .unwrap_or("");
                    center(text, widths[c])
                })
                .collect();
            writeln!(out, "{}", cells.join(" ").trim_end())?;
        }

        let rule_width = widths.iter().sum::<usize>() + columns.saturating_sub(1);
        writeln!(out, "{}", "=".repeat(rule_width))?;

        for row in &self.rows {
            let cells: Vec<String> = (0..columns)
                .map(|c| {
                    let text = row.get(c).map_or("", String::as_str);
                    format!("{text:<width$}", width = widths[c])
                })
                .collect();
            writeln!(out, "{}", cells.join(" ").trim_end())?;
        }

        Ok(out.trim_end().to_string())
    }
}

fn center(text: &str, width: usize) -> String {
    let len = text.chars().count();
    if len >= width {
        return text.to_string();
    }
    let left = (width - len) / 2;
    let right = width - len - left;
    format!("{}{text}{}", " ".repeat(left), " ".repeat(right))
}
