use std::io::{self, IsTerminal, Write};

use anyhow::anyhow;
use unicode_width::UnicodeWidthStr;

use crate::config::Config;
use crate::task::{Priority, Recurrence, Task};
use crate::theme::Theme;
use crate::view::{Projection, Stats};

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
    theme: Theme,
}

impl Renderer {
    pub fn new(cfg: &Config, theme: Theme) -> anyhow::Result<Self> {
        let color_cfg = cfg.get("color").unwrap_or_else(|| "on".to_string());
        let color = match color_cfg.to_ascii_lowercase().as_str() {
            "on" | "yes" | "true" | "1" => true,
            "off" | "no" | "false" | "0" => false,
            other => return Err(anyhow!("invalid color setting: {other}")),
        };

        Ok(Self { color, theme })
    }

    pub fn set_theme(&mut self, theme: Theme) {
        self.theme = theme;
    }

    #[tracing::instrument(skip(self, projection))]
    pub fn print_projection(&mut self, projection: &Projection) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        let headers = vec![
            "ID".to_string(),
            "Done".to_string(),
            "Title".to_string(),
            "Pri".to_string(),
            "Due".to_string(),
            "Repeat".to_string(),
            "Description".to_string(),
        ];

        let mut rows = Vec::with_capacity(projection.rows.len());

        for row in &projection.rows {
            let done = if row.completed { "[x]" } else { "[ ]" };
            let title = if row.completed {
                self.paint(&row.title, "9;2")
            } else {
                row.title.clone()
            };
            let priority = self.paint(&row.priority.to_string(), self.priority_code(row.priority));

            rows.push(vec![
                self.paint(&row.id.to_string(), self.id_code()),
                done.to_string(),
                title,
                priority,
                row.due.clone().unwrap_or_default(),
                row.recurring.clone().unwrap_or_default(),
                row.description.clone().unwrap_or_default(),
            ]);
        }

        write_table(&mut out, headers, rows)?;
        writeln!(out)?;
        write_stats(&mut out, &projection.stats)?;
        Ok(())
    }

    #[tracing::instrument(skip(self, stats))]
    pub fn print_stats(&mut self, stats: &Stats) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        write_stats(&mut out, stats)
    }

    #[tracing::instrument(skip(self, task))]
    pub fn print_task_info(&mut self, task: &Task) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        writeln!(out, "id        {}", task.id)?;
        writeln!(out, "title     {}", task.title)?;
        writeln!(
            out,
            "status    {}",
            if task.completed { "completed" } else { "pending" }
        )?;
        writeln!(out, "priority  {}", task.priority)?;

        if !task.description.is_empty() {
            writeln!(out, "desc      {}", task.description)?;
        }
        if let Some(due) = task.due {
            writeln!(out, "due       {}", due.format("%Y-%m-%d"))?;
        }
        if task.recurring != Recurrence::None {
            writeln!(out, "repeats   {}", task.recurring)?;
        }

        Ok(())
    }

    fn priority_code(&self, priority: Priority) -> &'static str {
        match (self.theme, priority) {
            (Theme::Light, Priority::High) => "31",
            (Theme::Light, Priority::Medium) => "33",
            (Theme::Light, Priority::Low) => "32",
            (Theme::Dark, Priority::High) => "91",
            (Theme::Dark, Priority::Medium) => "93",
            (Theme::Dark, Priority::Low) => "92",
        }
    }

    fn id_code(&self) -> &'static str {
        match self.theme {
            Theme::Light => "36",
            Theme::Dark => "96",
        }
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color || !io::stdout().is_terminal() {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn write_stats<W: Write>(mut writer: W, stats: &Stats) -> anyhow::Result<()> {
    writeln!(
        writer,
        "Total: {} | Completed: {} | Due Today: {}",
        stats.total, stats.completed, stats.due_today
    )?;
    Ok(())
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for idx in 0..column_count {
        write!(writer, "{:width$} ", headers[idx], width = widths[idx])?;
    }
    writeln!(writer)?;

    for idx in 0..column_count {
        write!(writer, "{:-<width$} ", "", width = widths[idx])?;
    }
    writeln!(writer)?;

    for row in rows {
        for idx in 0..column_count {
            let cell = &row[idx];
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::{strip_ansi, write_table};

    #[test]
    fn table_alignment_ignores_ansi_escapes() {
        let headers = vec!["A".to_string(), "B".to_string()];
        let rows = vec![vec!["\x1b[31mred\x1b[0m".to_string(), "x".to_string()]];

        let mut buffer = Vec::new();
        write_table(&mut buffer, headers, rows).expect("write table");
        let text = String::from_utf8(buffer).expect("utf8");

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(strip_ansi(lines[2]), "red x ");
    }
}
