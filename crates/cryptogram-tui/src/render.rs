use crate::app::{App, CellHitbox, MenuState, ScreenState};
use crossterm::{
    cursor::{Hide, MoveTo, Show},
    execute,
    style::{Color, Print, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};
use cryptogram_core::{CellKind, CellView, Engine, GroupKind, Layout, Tone};
use std::io;

/// Columns per cell: the character plus a gap
const CELL_WIDTH: u16 = 2;
/// Rows per puzzle line: guess, ciphertext, blank
const LINE_HEIGHT: u16 = 3;
/// First row of the puzzle area
const PUZZLE_TOP: u16 = 4;

pub fn render(stdout: &mut io::Stdout, app: &mut App) -> io::Result<()> {
    let (term_width, term_height) = terminal::size()?;

    execute!(
        stdout,
        Hide,
        SetBackgroundColor(app.theme.bg),
        Clear(ClearType::All)
    )?;

    match app.screen_state.clone() {
        ScreenState::Loading => {
            app.hitboxes.clear();
            let text = format!("Fetching a puzzle from the {} service...", app.backend_name);
            render_centered(stdout, app, &text, app.theme.info, term_width, term_height / 2)?;
        }
        ScreenState::Failed(reason) => {
            app.hitboxes.clear();
            render_failed_screen(stdout, app, &reason, term_width, term_height)?;
        }
        ScreenState::Playing => render_game_screen(stdout, app, term_width, term_height)?,
    }

    if let Some(ref msg) = app.message {
        render_message(stdout, app, msg, term_width)?;
    }

    match app.menu {
        MenuState::None => {}
        MenuState::ConfirmReveal => render_confirm(stdout, app, term_width, term_height)?,
        MenuState::Help => render_help(stdout, app, term_width, term_height)?,
    }

    execute!(stdout, Show)?;
    Ok(())
}

fn render_game_screen(
    stdout: &mut io::Stdout,
    app: &mut App,
    term_width: u16,
    term_height: u16,
) -> io::Result<()> {
    let Some(engine) = app.engine.as_ref() else {
        return Ok(());
    };

    let start_x: u16 = 2;
    let puzzle_width = term_width.saturating_sub(start_x * 2).max(CELL_WIDTH);
    let placed = place_cells(engine.layout(), puzzle_width);

    render_info_panel(stdout, app, engine, start_x, 1)?;

    // Keep the focused line on screen when the quote is taller than the terminal
    let controls_height: u16 = 3;
    let visible_lines =
        (term_height.saturating_sub(PUZZLE_TOP + controls_height + 1) / LINE_HEIGHT).max(1);
    let focused_line = engine
        .cursor()
        .position()
        .and_then(|p| placed.iter().find(|placed| placed.position == p))
        .map(|placed| placed.line)
        .unwrap_or(0);
    let first_line = focused_line.saturating_sub(visible_lines - 1);

    let views: Vec<CellView<'_>> = engine.cells().collect();
    let mut hitboxes = Vec::with_capacity(placed.len());
    let mut last_line = 0;
    for cell in &placed {
        if cell.line < first_line || cell.line >= first_line + visible_lines {
            continue;
        }
        let Some(view) = views.get(cell.position) else {
            continue;
        };
        let x = start_x + cell.column;
        let y = PUZZLE_TOP + (cell.line - first_line) * LINE_HEIGHT;
        render_cell(stdout, app, view, x, y)?;
        hitboxes.push(CellHitbox {
            x,
            y,
            width: CELL_WIDTH,
            height: 2,
            position: cell.position,
        });
        last_line = last_line.max(cell.line - first_line);
    }

    let below = PUZZLE_TOP + (last_line + 1) * LINE_HEIGHT;
    if let Some(solution) = engine.revealed_solution() {
        render_solution(stdout, app, solution, start_x, below, puzzle_width)?;
    }

    render_controls(stdout, app, start_x, term_height.saturating_sub(controls_height))?;

    app.hitboxes = hitboxes;
    Ok(())
}

fn render_info_panel(
    stdout: &mut io::Stdout,
    app: &App,
    engine: &Engine,
    x: u16,
    y: u16,
) -> io::Result<()> {
    let theme = &app.theme;
    let map = engine.map();

    execute!(
        stdout,
        MoveTo(x, y),
        SetForegroundColor(theme.key),
        Print("═══ CRYPTOGRAM ═══"),
        SetForegroundColor(theme.info),
        Print(format!("  Author: {}", engine.author()))
    )?;

    execute!(
        stdout,
        MoveTo(x, y + 1),
        SetForegroundColor(theme.info),
        Print(format!(
            "Letters: {}/{}",
            map.filled_count(),
            map.letter_count()
        ))
    )?;

    if engine.outstanding() > 0 {
        execute!(
            stdout,
            SetForegroundColor(theme.pending),
            Print(format!("   Pending: {}", engine.outstanding()))
        )?;
    }

    if engine.is_finished() {
        execute!(
            stdout,
            SetForegroundColor(theme.info),
            Print("   Solution revealed")
        )?;
    } else if app.solved {
        execute!(stdout, SetForegroundColor(theme.success), Print("   Solved!"))?;
    }

    execute!(
        stdout,
        SetForegroundColor(theme.border),
        Print(format!("   [{} / {}]", app.backend_name, theme.name))
    )?;

    Ok(())
}

fn render_cell(
    stdout: &mut io::Stdout,
    app: &App,
    view: &CellView<'_>,
    x: u16,
    y: u16,
) -> io::Result<()> {
    let theme = &app.theme;
    let position = view.cell.position;

    let bg = if view.focused {
        theme.selected_bg
    } else if app.is_highlighted(position) {
        theme.highlight_bg
    } else {
        theme.bg
    };

    let (top, top_color, bottom) = match &view.cell.kind {
        CellKind::Letter(letter) => {
            let color = if view.guess.is_none() {
                theme.blank
            } else if view.conflicting {
                theme.error
            } else if view.pending {
                theme.pending
            } else if app.is_flashing(position) {
                theme.success
            } else {
                theme.guess
            };
            let guess = view.guess.map(|g| g.as_char()).unwrap_or('_');
            (guess, color, letter.as_char())
        }
        CellKind::Symbol(c) => (*c, theme.fixed, *c),
        CellKind::Separator(_) => return Ok(()),
    };

    execute!(
        stdout,
        MoveTo(x, y),
        SetBackgroundColor(bg),
        SetForegroundColor(top_color),
        Print(top),
        MoveTo(x, y + 1),
        SetForegroundColor(theme.cipher),
        Print(bottom),
        SetBackgroundColor(theme.bg)
    )?;

    Ok(())
}

fn render_solution(
    stdout: &mut io::Stdout,
    app: &App,
    solution: &str,
    x: u16,
    y: u16,
    width: u16,
) -> io::Result<()> {
    let theme = &app.theme;
    execute!(
        stdout,
        MoveTo(x, y),
        SetForegroundColor(theme.key),
        Print("Solution:")
    )?;
    for (i, line) in wrap_text(solution, width as usize).iter().enumerate() {
        execute!(
            stdout,
            MoveTo(x, y + 1 + i as u16),
            SetForegroundColor(theme.success),
            Print(line)
        )?;
    }
    Ok(())
}

fn render_controls(stdout: &mut io::Stdout, app: &App, x: u16, y: u16) -> io::Result<()> {
    let theme = &app.theme;

    let controls = [
        ("A-Z", "Guess"),
        ("Bksp", "Clear"),
        ("Tab", "Next empty"),
        ("←/→", "Move"),
        ("Enter", "Check"),
        ("Esc", "Reveal"),
        ("^N", "New puzzle"),
        ("^T", "Theme"),
        ("F1/?", "Help"),
        ("^Q", "Quit"),
    ];

    // Display in 5 columns (2 items each)
    for (i, (key, desc)) in controls.iter().enumerate() {
        let col = i / 2;
        let row = i % 2;
        let cx = x + (col as u16) * 18;
        let cy = y + row as u16;

        execute!(
            stdout,
            MoveTo(cx, cy),
            SetForegroundColor(theme.key),
            Print(format!("{:>6}", key)),
            SetForegroundColor(theme.info),
            Print(format!(" {}", desc))
        )?;
    }

    Ok(())
}

fn render_message(
    stdout: &mut io::Stdout,
    app: &App,
    msg: &str,
    term_width: u16,
) -> io::Result<()> {
    let theme = &app.theme;
    let padded = format!("  {}  ", msg);
    let x = term_width.saturating_sub(padded.chars().count() as u16) / 2;
    let fg = match app.message_tone {
        Tone::Success => theme.success,
        Tone::Error => theme.error,
        Tone::Info => theme.fg,
    };

    execute!(
        stdout,
        MoveTo(x, 0),
        SetForegroundColor(fg),
        SetBackgroundColor(theme.highlight_bg),
        Print(&padded),
        SetBackgroundColor(theme.bg)
    )?;

    Ok(())
}

fn render_failed_screen(
    stdout: &mut io::Stdout,
    app: &App,
    reason: &str,
    term_width: u16,
    term_height: u16,
) -> io::Result<()> {
    let theme = &app.theme;
    let lines = wrap_text(reason, 60);
    let top = term_height.saturating_sub(lines.len() as u16 + 4) / 2;

    render_centered(stdout, app, "Could not load a puzzle", theme.error, term_width, top)?;
    for (i, line) in lines.iter().enumerate() {
        render_centered(stdout, app, line, theme.info, term_width, top + 2 + i as u16)?;
    }
    render_centered(
        stdout,
        app,
        "Enter: retry   Esc: quit",
        theme.key,
        term_width,
        top + 3 + lines.len() as u16,
    )
}

fn render_centered(
    stdout: &mut io::Stdout,
    app: &App,
    text: &str,
    color: Color,
    term_width: u16,
    y: u16,
) -> io::Result<()> {
    let x = term_width.saturating_sub(text.chars().count() as u16) / 2;
    execute!(
        stdout,
        MoveTo(x, y),
        SetBackgroundColor(app.theme.bg),
        SetForegroundColor(color),
        Print(text)
    )
}

fn render_popup(
    stdout: &mut io::Stdout,
    app: &App,
    title: &str,
    lines: &[String],
    term_width: u16,
    term_height: u16,
) -> io::Result<()> {
    let theme = &app.theme;
    let inner = lines
        .iter()
        .map(|l| l.chars().count())
        .chain(std::iter::once(title.chars().count()))
        .max()
        .unwrap_or(0) as u16;
    let width = inner + 6;
    let height = lines.len() as u16 + 5;
    let x = term_width.saturating_sub(width) / 2;
    let y = term_height.saturating_sub(height) / 2;
    let bg = theme.highlight_bg;

    for row in 0..height {
        execute!(
            stdout,
            MoveTo(x, y + row),
            SetBackgroundColor(bg),
            Print(" ".repeat(width as usize))
        )?;
    }

    execute!(
        stdout,
        SetForegroundColor(theme.border),
        MoveTo(x, y),
        Print("┌"),
        Print("─".repeat(width as usize - 2)),
        Print("┐")
    )?;
    for row in 1..height - 1 {
        execute!(stdout, MoveTo(x, y + row), Print("│"))?;
        execute!(stdout, MoveTo(x + width - 1, y + row), Print("│"))?;
    }
    execute!(
        stdout,
        MoveTo(x, y + height - 1),
        Print("└"),
        Print("─".repeat(width as usize - 2)),
        Print("┘")
    )?;

    execute!(
        stdout,
        MoveTo(x + 3, y + 1),
        SetForegroundColor(theme.key),
        Print(title)
    )?;
    for (i, line) in lines.iter().enumerate() {
        execute!(
            stdout,
            MoveTo(x + 3, y + 3 + i as u16),
            SetForegroundColor(theme.fg),
            Print(line)
        )?;
    }
    execute!(stdout, SetBackgroundColor(theme.bg))?;

    Ok(())
}

fn render_confirm(
    stdout: &mut io::Stdout,
    app: &App,
    term_width: u16,
    term_height: u16,
) -> io::Result<()> {
    let lines = [
        "This ends the game and shows the answer.".to_string(),
        String::new(),
        "Enter/y: reveal    Esc/n: keep playing".to_string(),
    ];
    render_popup(stdout, app, "Reveal the solution?", &lines, term_width, term_height)
}

fn render_help(
    stdout: &mut io::Stdout,
    app: &App,
    term_width: u16,
    term_height: u16,
) -> io::Result<()> {
    let lines = [
        "Each cipher letter stands for one real letter.",
        "Typing a guess fills every cell with that cipher",
        "letter and jumps to the next empty cell.",
        "",
        "Red guesses are used by more than one letter.",
        "Yellow guesses are still waiting for the server.",
        "",
        "Home/End    first/last letter",
        "Click       focus a cell",
        "",
        "Press any key to close",
    ]
    .map(String::from);
    render_popup(stdout, app, "How to play", &lines, term_width, term_height)
}

/// A cell's place in the puzzle area, in columns and puzzle lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placed {
    pub position: usize,
    pub column: u16,
    pub line: u16,
}

/// Lay cells out in lines of at most `width` columns.
///
/// Words are never split unless a single word is wider than a line.
/// Newlines in the source start a new line; other whitespace becomes a gap,
/// except at the start of a line.
pub fn place_cells(layout: &Layout, width: u16) -> Vec<Placed> {
    let width = width.max(CELL_WIDTH);
    let mut placed = Vec::with_capacity(layout.len());
    let mut column: u16 = 0;
    let mut line: u16 = 0;

    for group in layout.groups() {
        match group.kind {
            GroupKind::Space => {
                for position in group.cells.clone() {
                    let Some(CellKind::Separator(run)) = layout.cell(position).map(|c| &c.kind)
                    else {
                        continue;
                    };
                    for ch in run.chars() {
                        if ch == '\n' {
                            line = line.saturating_add(1);
                            column = 0;
                        } else if column > 0 {
                            column = column.saturating_add(CELL_WIDTH);
                        }
                    }
                }
            }
            GroupKind::Word => {
                let span = (group.cells.len() as u16).saturating_mul(CELL_WIDTH);
                if column > 0 && column.saturating_add(span) > width {
                    line = line.saturating_add(1);
                    column = 0;
                }
                for position in group.cells.clone() {
                    if column > 0 && column + CELL_WIDTH > width {
                        line = line.saturating_add(1);
                        column = 0;
                    }
                    placed.push(Placed {
                        position,
                        column,
                        line,
                    });
                    column += CELL_WIDTH;
                }
            }
        }
    }
    placed
}

fn wrap_text(text: &str, max_width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if current.len() + word.len() + 1 > max_width && !current.is_empty() {
            lines.push(current);
            current = String::new();
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines_of(text: &str, width: u16) -> Vec<Vec<usize>> {
        let layout = Layout::build(text).unwrap();
        let mut lines: Vec<Vec<usize>> = Vec::new();
        for placed in place_cells(&layout, width) {
            let line = placed.line as usize;
            if lines.len() <= line {
                lines.resize(line + 1, Vec::new());
            }
            lines[line].push(placed.position);
        }
        lines
    }

    #[test]
    fn test_words_stay_on_one_line() {
        // "AB CD EF": cells 0,1 | 2 | 3,4 | 5 | 6,7
        assert_eq!(lines_of("AB CD EF", 80), vec![vec![0, 1, 3, 4, 6, 7]]);
        // AB + gap + CD needs 10 columns
        assert_eq!(
            lines_of("AB CD EF", 10),
            vec![vec![0, 1, 3, 4], vec![6, 7]]
        );
    }

    #[test]
    fn test_newline_breaks_line() {
        assert_eq!(lines_of("AB\nCD", 80), vec![vec![0, 1], vec![3, 4]]);
    }

    #[test]
    fn test_long_word_is_split() {
        assert_eq!(lines_of("ABCDE", 6), vec![vec![0, 1, 2], vec![3, 4]]);
    }

    #[test]
    fn test_gap_between_words() {
        let layout = Layout::build("A, B").unwrap();
        let placed = place_cells(&layout, 80);
        let columns: Vec<u16> = placed.iter().map(|p| p.column).collect();
        // A and the comma touch; one space leaves an empty cell before B
        assert_eq!(columns, vec![0, 2, 6]);
    }

    #[test]
    fn test_wrap_text() {
        assert_eq!(
            wrap_text("the quick brown fox", 10),
            vec!["the quick", "brown fox"]
        );
    }
}
