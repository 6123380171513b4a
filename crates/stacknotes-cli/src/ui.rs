use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};
use stacknotes_engine::{
    DisplayLine, Document, EditorState, FileStore, ListType, NoteEditor, Point, RegionId,
    ToolbarState, Workspace,
};
use std::path::Path;
use std::rc::Rc;

pub fn draw(f: &mut Frame, workspace: &Workspace<FileStore>, data_path: &Path) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(f.area());

    f.render_widget(toolbar(workspace.toolbar().state()), chunks[0]);
    draw_regions(f, workspace, chunks[1]);

    let status = if workspace.has_pending_saves() {
        "unsaved changes"
    } else {
        "saved"
    };
    let help = Line::from(vec![
        Span::raw("Esc: Quit | Tab/Shift-Tab: Region | ^K: Checklist | ^B: Bullets | ^N: Numbers | "),
        Span::styled(
            format!("{} ({})", status, data_path.display()),
            Style::default().fg(Color::DarkGray),
        ),
    ]);
    f.render_widget(Paragraph::new(help), chunks[2]);
}

fn toolbar(state: ToolbarState) -> Paragraph<'static> {
    let button = |label: &'static str, list_type: ListType| {
        let style = if !state.enabled {
            Style::default().fg(Color::DarkGray)
        } else if state.list_type == Some(list_type) {
            Style::default().bg(Color::Yellow).fg(Color::Black)
        } else {
            Style::default()
        };
        Span::styled(format!(" {label} "), style)
    };

    let line = Line::from(vec![
        button("[ ] Checklist ^K", ListType::Check),
        Span::raw(" "),
        button("• Bullets ^B", ListType::Bullet),
        Span::raw(" "),
        button("1. Numbers ^N", ListType::Number),
    ]);
    Paragraph::new(line).block(Block::default().borders(Borders::ALL).title("Toolbar"))
}

fn draw_regions(f: &mut Frame, workspace: &Workspace<FileStore>, area: Rect) {
    let editors = workspace.editors();
    let active = workspace.active_region();

    // Each region is a bordered box, two rows taller than its content
    let heights: Vec<u16> = editors
        .iter()
        .map(|(_, editor)| to_cells(editor.state().display_lines().len()).saturating_add(2))
        .collect();
    let active_index = editors.iter().position(|(id, _)| Some(*id) == active);
    let first = first_visible(&heights, active_index, area.height);

    let mut y = area.y;
    for (index, (id, editor)) in editors.iter().enumerate().skip(first) {
        let remaining = area.bottom().saturating_sub(y);
        if remaining < 3 {
            break;
        }
        let height = heights[index].min(remaining);
        let rect = Rect::new(area.x, y, area.width, height);
        draw_region(f, *id, editor, Some(*id) == active, rect);
        y = y.saturating_add(height);
    }
}

/// Index of the first region to draw so the active one stays on screen
fn first_visible(heights: &[u16], active: Option<usize>, available: u16) -> usize {
    let Some(active) = active else {
        return 0;
    };
    let mut first = 0;
    while first < active
        && heights[first..=active]
            .iter()
            .fold(0u16, |total, height| total.saturating_add(*height))
            > available
    {
        first += 1;
    }
    first
}

/// Clamp a count to the terminal's `u16` coordinate space
fn to_cells(count: usize) -> u16 {
    u16::try_from(count).unwrap_or(u16::MAX)
}

fn draw_region(f: &mut Frame, id: RegionId, editor: &Rc<NoteEditor>, is_active: bool, rect: Rect) {
    let document = editor.state();
    let lines = document.display_lines();
    let selection = if is_active {
        document.selection().copied()
    } else {
        None
    };

    let text: Vec<Line> = lines
        .iter()
        .map(|line| {
            let highlighted = selection
                .filter(|s| !s.is_collapsed())
                .and_then(|s| selected_span(line, &document, s.start(), s.end()));
            render_line(line, highlighted)
        })
        .collect();

    let border_style = if is_active {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style)
        .title(format!("Region {id}"));
    f.render_widget(Paragraph::new(text).block(block), rect);

    if let Some(selection) = selection
        && let Some(row) = lines
            .iter()
            .position(|l| l.block == selection.focus.block && l.line == selection.focus.line)
    {
        let line = &lines[row];
        let column = line.marker.chars().count().saturating_add(selection.focus.offset);
        let x = rect.x.saturating_add(1).saturating_add(to_cells(column));
        let y = rect.y.saturating_add(1).saturating_add(to_cells(row));
        if y < rect.bottom().saturating_sub(1) {
            f.set_cursor_position((x.min(rect.right().saturating_sub(2)), y));
        }
    }
}

/// Char range of `line` covered by the selection `[start, end)`
fn selected_span(
    line: &DisplayLine,
    document: &Document,
    start: Point,
    end: Point,
) -> Option<(usize, usize)> {
    let len = document
        .line_text(line.block, line.line)
        .map(|text| text.chars().count())
        .unwrap_or(0);
    let line_start = Point::new(line.block, line.line, 0);
    let line_end = Point::new(line.block, line.line, len);
    if end < line_start || start > line_end {
        return None;
    }
    let from = if start > line_start { start.offset } else { 0 };
    let to = if end < line_end { end.offset } else { len };
    (from < to).then_some((from, to))
}

fn render_line(line: &DisplayLine, highlighted: Option<(usize, usize)>) -> Line<'static> {
    let marker = Span::styled(line.marker.clone(), Style::default().fg(Color::Cyan));
    let Some((from, to)) = highlighted else {
        return Line::from(vec![marker, Span::raw(line.text.clone())]);
    };

    let chars: Vec<char> = line.text.chars().collect();
    let before: String = chars[..from].iter().collect();
    let selected: String = chars[from..to].iter().collect();
    let after: String = chars[to..].iter().collect();
    Line::from(vec![
        marker,
        Span::raw(before),
        Span::styled(selected, Style::default().add_modifier(Modifier::REVERSED)),
        Span::raw(after),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_visible_keeps_active_region_on_screen() {
        let heights = [5, 5, 5, 5];

        assert_eq!(first_visible(&heights, None, 10), 0);
        assert_eq!(first_visible(&heights, Some(1), 10), 0);
        assert_eq!(first_visible(&heights, Some(3), 10), 2);
    }

    #[test]
    fn test_huge_regions_do_not_overflow() {
        let heights = [u16::MAX, u16::MAX, 3];

        assert_eq!(first_visible(&heights, Some(2), 10), 2);
        assert_eq!(to_cells(70_000), u16::MAX);
        assert_eq!(to_cells(12), 12);
    }

    #[test]
    fn test_selected_span_within_line() {
        let document = Document::from_blocks(vec![stacknotes_engine::Block::paragraph("hello")]);
        let line = &document.display_lines()[0];

        let span = selected_span(line, &document, Point::new(0, 0, 1), Point::new(0, 0, 3));

        assert_eq!(span, Some((1, 3)));
    }

    #[test]
    fn test_selected_span_across_lines() {
        let document = Document::from_blocks(vec![
            stacknotes_engine::Block::paragraph("one"),
            stacknotes_engine::Block::paragraph("two"),
            stacknotes_engine::Block::paragraph("three"),
        ]);
        let lines = document.display_lines();
        let (start, end) = (Point::new(0, 0, 2), Point::new(1, 0, 1));

        let spans: Vec<_> = lines
            .iter()
            .map(|line| selected_span(line, &document, start, end))
            .collect();

        assert_eq!(spans, vec![Some((2, 3)), Some((0, 1)), None]);
    }
}
