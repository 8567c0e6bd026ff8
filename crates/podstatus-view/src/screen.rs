use std::io::{self, Write};

use crossterm::cursor::MoveUp;
use crossterm::queue;
use crossterm::terminal::{Clear, ClearType};
use unicode_width::UnicodeWidthStr;

/// Minimum width of a padded column
const MIN_WIDTH: usize = 6;

/// Spaces between the widest cell of a column and the next column
const PADDING: usize = 3;

/// Align rows into columns, one string per output line.
///
/// Every column but the last is padded to its widest cell plus [`PADDING`]
/// (at least [`MIN_WIDTH`]); the last column is left as is.
pub fn format_table<S: AsRef<str>>(header: Option<&[S]>, rows: &[Vec<String>]) -> Vec<String> {
    let header: Option<Vec<&str>> = header.map(|h| h.iter().map(AsRef::as_ref).collect());
    let lines: Vec<Vec<&str>> = header
        .into_iter()
        .chain(rows.iter().map(|row| row.iter().map(String::as_str).collect()))
        .collect();

    let columns = lines.iter().map(Vec::len).max().unwrap_or(0);
    let mut widths = vec![0; columns];
    for line in &lines {
        for (i, cell) in line.iter().enumerate() {
            widths[i] = widths[i].max(cell.width());
        }
    }
    for width in &mut widths {
        *width = (*width + PADDING).max(MIN_WIDTH);
    }

    lines
        .iter()
        .map(|line| {
            let mut out = String::new();
            for (i, cell) in line.iter().enumerate() {
                out.push_str(cell);
                if i + 1 < line.len() {
                    let fill = widths[i].saturating_sub(cell.width());
                    out.extend(std::iter::repeat_n(' ', fill));
                }
            }
            out
        })
        .collect()
}

/// A table that redraws itself in place.
///
/// The buffer remembers how many lines it printed last time, so each
/// [`render`](ScreenBuffer::render) first walks the cursor back over them
/// and clears them before printing the new table.
pub struct ScreenBuffer<W: Write> {
    out: W,
    header: Option<Vec<String>>,
    rendered_lines: usize,
}

impl<W: Write> ScreenBuffer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            header: None,
            rendered_lines: 0,
        }
    }

    /// Set the header row printed above every render, or none
    pub fn set_header<S: Into<String>>(&mut self, header: Option<impl IntoIterator<Item = S>>) {
        self.header = header.map(|h| h.into_iter().map(Into::into).collect());
    }

    /// Replace what was rendered last with `rows`
    pub fn render(&mut self, rows: &[Vec<String>]) -> io::Result<()> {
        for _ in 0..self.rendered_lines {
            queue!(self.out, MoveUp(1), Clear(ClearType::CurrentLine))?;
        }

        let lines = format_table(self.header.as_deref(), rows);
        for line in &lines {
            writeln!(self.out, "{}", line)?;
        }
        self.out.flush()?;

        self.rendered_lines = lines.len();
        Ok(())
    }

    /// Number of lines printed by the last render, header included
    pub fn rendered_lines(&self) -> usize {
        self.rendered_lines
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const UP_AND_CLEAR: &str = "\x1b[1A\x1b[2K";

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    fn output(screen: &ScreenBuffer<Vec<u8>>) -> String {
        String::from_utf8(screen.get_ref().clone()).unwrap()
    }

    #[test]
    fn test_columns_are_aligned() {
        let lines = format_table(
            Some(&["NAME", "READY", "AGE"][..]),
            &[row(&["web-1", "1/1", "5m"]), row(&["database-0", "0/1", "2d"])],
        );

        assert_eq!(lines[0], "NAME         READY   AGE");
        assert_eq!(lines[1], "web-1        1/1     5m");
        assert_eq!(lines[2], "database-0   0/1     2d");
    }

    #[test]
    fn test_short_columns_use_min_width() {
        let lines = format_table(None::<&[&str]>, &[row(&["a", "b"])]);
        assert_eq!(lines, vec!["a     b".to_string()]);
    }

    #[test]
    fn test_wide_characters_are_measured_by_display_width() {
        let lines = format_table(None::<&[&str]>, &[row(&["日本語", "x"]), row(&["a", "y"])]);
        assert_eq!(lines[0], "日本語   x");
        assert_eq!(lines[1], "a        y");
    }

    #[test]
    fn test_first_render_does_not_move_cursor() {
        let mut screen = ScreenBuffer::new(Vec::new());
        screen.set_header(Some(["NAME", "STATUS"]));
        screen.render(&[row(&["web-1", "Running"])]).unwrap();

        let out = output(&screen);
        assert!(!out.contains('\x1b'));
        assert_eq!(out, "NAME    STATUS\nweb-1   Running\n");
        assert_eq!(screen.rendered_lines(), 2);
    }

    #[test]
    fn test_redraw_clears_previous_lines() {
        let mut screen = ScreenBuffer::new(Vec::new());
        screen.set_header(Some(["NAME"]));
        screen.render(&[row(&["a"]), row(&["b"])]).unwrap();
        let first = output(&screen);

        screen.render(&[row(&["b"])]).unwrap();
        let out = output(&screen);
        let redraw = &out[first.len()..];

        // header plus two rows were on screen
        assert!(redraw.starts_with(&UP_AND_CLEAR.repeat(3)));
        assert!(redraw.ends_with("NAME\nb\n"));
        assert_eq!(screen.rendered_lines(), 2);
    }

    #[test]
    fn test_no_header() {
        let mut screen = ScreenBuffer::new(Vec::new());
        screen.set_header(None::<[&str; 0]>);
        screen.render(&[]).unwrap();
        assert_eq!(screen.rendered_lines(), 0);
        assert!(output(&screen).is_empty());
    }
}
