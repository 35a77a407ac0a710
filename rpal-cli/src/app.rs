use std::fmt::Display;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::utils;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use ratatui::{
    prelude::*,
    symbols::border,
    widgets::{block::*, *},
};
use rpal::execution_trace::Frame as TraceFrame;

#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub enum Focus {
    #[default]
    Control,
    Stack,
    Env,
}

impl Display for Focus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let str = match self {
            Self::Control => "Control",
            Self::Stack => "Stack",
            Self::Env => "Env",
        };
        f.write_str(str)
    }
}

#[derive(Default)]
pub struct App {
    pub file_name: PathBuf,
    /// The standardized tree, as text.
    pub tree: String,
    pub cursor: usize,
    pub frames: Vec<TraceFrame>,
    pub answer: Option<String>,
    pub error: Option<String>,
    pub truncated: bool,
    pub view_tree: bool,
    pub exit: bool,
    pub focus: Focus,
    pub control_scroll: u16,
    pub stack_scroll: u16,
    pub env_scroll: u16,
    /// One-line notice shown in the footer; cleared on the next step.
    pub status: Option<String>,
}

impl App {
    /// runs the application's main loop until the user quits
    pub fn run(&mut self, terminal: &mut utils::Tui) -> io::Result<()> {
        while !self.exit {
            terminal.draw(|frame| self.render_frame(frame))?;
            self.handle_events()?;
        }
        Ok(())
    }

    fn render_frame(&mut self, frame: &mut Frame) {
        frame.render_widget(self, frame.area());
    }

    fn last(&self) -> usize {
        self.frames.len().saturating_sub(1)
    }

    fn handle_events(&mut self) -> io::Result<()> {
        match event::read()? {
            // crossterm also emits key release and repeat events on Windows
            Event::Key(key_event) if key_event.kind == KeyEventKind::Press => {
                self.status = None;
                let stride = if key_event.modifiers.contains(KeyModifiers::SHIFT) {
                    50
                } else {
                    1
                };
                match key_event.code {
                    KeyCode::Char('q') => {
                        self.exit = true;
                    }
                    KeyCode::Char('E') => {
                        self.cursor = self.last();
                    }
                    KeyCode::Char('N') | KeyCode::Char('n') | KeyCode::Right => {
                        self.cursor = (self.cursor + stride).min(self.last());
                    }
                    KeyCode::Char('P') | KeyCode::Char('p') | KeyCode::Left => {
                        self.cursor = self.cursor.saturating_sub(stride);
                    }
                    KeyCode::Char('C') | KeyCode::Char('c') => {
                        let text = self.focused_text();
                        self.record_copy(terminal_clipboard::set_string(text));
                    }
                    KeyCode::Char('v') => {
                        self.view_tree = !self.view_tree;
                    }
                    KeyCode::Tab => {
                        self.focus = match self.focus {
                            Focus::Control => Focus::Stack,
                            Focus::Stack => Focus::Env,
                            Focus::Env => Focus::Control,
                        }
                    }
                    KeyCode::Up => {
                        let scroll = self.focused_scroll();
                        *scroll = scroll.saturating_sub(1);
                    }
                    KeyCode::Down => {
                        let scroll = self.focused_scroll();
                        *scroll = scroll.saturating_add(1);
                    }
                    _ => {}
                }
            }
            _ => {}
        };
        Ok(())
    }

    // stderr is not visible while the alternate screen is up
    fn record_copy<E: Display>(&mut self, result: Result<(), E>) {
        self.status = Some(match result {
            Ok(()) => format!("copied {}", self.focus),
            Err(e) => {
                tracing::debug!("could not copy to clipboard: {e}");
                format!("could not copy {}: {e}", self.focus)
            }
        });
    }

    fn focused_scroll(&mut self) -> &mut u16 {
        match self.focus {
            Focus::Control => &mut self.control_scroll,
            Focus::Stack => &mut self.stack_scroll,
            Focus::Env => &mut self.env_scroll,
        }
    }

    fn focused_text(&self) -> String {
        let curr_frame = &self.frames[self.cursor];
        match self.focus {
            Focus::Control if self.view_tree => self.tree.clone(),
            Focus::Control => utils::control_to_string(curr_frame),
            Focus::Stack => utils::stack_to_string(curr_frame),
            Focus::Env => utils::env_to_string(curr_frame),
        }
    }
}

impl Widget for &mut App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if self.frames.is_empty() {
            return;
        }
        let curr_frame = &self.frames[self.cursor];

        let layout = render_block_region(
            &self.file_name,
            self.focus,
            self.status.as_deref(),
            area,
            buf,
        );
        let gauge_region = layout[0];
        let command_region = layout[1];
        let main_region = layout[2];

        render_gauge_region(self.cursor, self.frames.len(), gauge_region, buf);
        let next = self
            .frames
            .get(self.cursor + 1)
            .map(|f| f.label.as_str())
            .unwrap_or("None");
        render_command_region(curr_frame, next, command_region, buf);

        let layout = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(vec![Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(main_region);
        let control_region = layout[0];
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints(vec![Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(layout[1]);
        let stack_region = layout[0];
        let env_region = layout[1];

        let (control_title, control_text) = if self.view_tree {
            (" Standardized Tree ", self.tree.clone())
        } else {
            (" Control ", utils::control_to_string(curr_frame))
        };
        let left_border = Block::default()
            .borders(Borders::TOP | Borders::LEFT | Borders::BOTTOM)
            .border_set(border::PLAIN);
        render_text_region(
            control_title,
            self.focus == Focus::Control,
            left_border,
            control_text,
            self.control_scroll,
            control_region,
            buf,
        );

        let top_right_border_set = symbols::border::Set {
            top_left: symbols::line::NORMAL.horizontal_down,
            ..symbols::border::PLAIN
        };
        let stack_block = Block::default()
            .borders(Borders::TOP | Borders::LEFT | Borders::RIGHT)
            .border_set(top_right_border_set);
        render_text_region(
            " Stack ",
            self.focus == Focus::Stack,
            stack_block,
            utils::stack_to_string(curr_frame),
            self.stack_scroll,
            stack_region,
            buf,
        );

        let collapsed_top_and_left_border_set = symbols::border::Set {
            top_left: symbols::line::NORMAL.vertical_right,
            top_right: symbols::line::NORMAL.vertical_left,
            bottom_left: symbols::line::NORMAL.horizontal_up,
            ..symbols::border::PLAIN
        };
        let env_block = Block::default()
            .borders(Borders::ALL)
            .border_set(collapsed_top_and_left_border_set);
        render_text_region(
            " Env ",
            self.focus == Focus::Env,
            env_block,
            utils::env_to_string(curr_frame),
            self.env_scroll,
            env_region,
            buf,
        );

        if self.cursor == self.last() {
            render_result_popup(
                area,
                self.answer.as_deref(),
                self.error.as_deref(),
                self.truncated,
                &curr_frame.output,
                buf,
            );
        }
    }
}

fn render_block_region(
    file_name: &Path,
    focus: Focus,
    status: Option<&str>,
    area: Rect,
    buf: &mut Buffer,
) -> Rc<[Rect]> {
    let title = Line::from(vec![
        " RPAL Debugger (".bold(),
        file_name.display().to_string().bold(),
        ")".bold(),
    ]);
    let instructions = Line::from(vec![
        " Tree ".into(),
        "<V>".blue().bold(),
        format!(" Copy {focus} ").into(),
        "<C>".blue().bold(),
        " Next ".into(),
        "<N>".blue().bold(),
        " Previous ".into(),
        "<P>".blue().bold(),
        " End ".into(),
        "<E>".blue().bold(),
        " Quit ".into(),
        "<Q> ".blue().bold(),
    ]);

    let mut block = Block::default()
        .title(title.centered())
        .title_bottom(instructions.centered())
        .borders(Borders::ALL)
        .border_set(border::THICK);
    if let Some(status) = status {
        block = block.title_bottom(Line::from(format!(" {status} ").yellow()).left_aligned());
    }

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints(vec![
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Percentage(100),
        ])
        .split(block.inner(area));

    block.render(area, buf);
    layout
}

fn render_gauge_region(cursor: usize, frame_count: usize, gauge_region: Rect, buf: &mut Buffer) {
    let last = frame_count.saturating_sub(1).max(1);
    Gauge::default()
        .gauge_style(Style::default().fg(Color::Green))
        .label(format!("Step {}/{}", cursor, frame_count.saturating_sub(1)))
        .ratio((cursor as f64 / last as f64).min(1.0))
        .render(gauge_region, buf);
}

fn render_command_region(frame: &TraceFrame, next: &str, command_region: Rect, buf: &mut Buffer) {
    Line::from(vec![
        "Current: ".into(),
        frame.label.as_str().fg(Color::Blue).add_modifier(Modifier::BOLD),
    ])
    .left_aligned()
    .render(command_region, buf);
    Line::from(vec![
        "Env: ".into(),
        format!("e_{} ", frame.current_env)
            .fg(Color::Blue)
            .add_modifier(Modifier::BOLD),
        format!("({} on stack)", frame.stack.len()).fg(Color::Green),
    ])
    .centered()
    .render(command_region, buf);
    Line::from(vec![
        "Next: ".into(),
        next.fg(Color::Blue).add_modifier(Modifier::ITALIC),
    ])
    .right_aligned()
    .render(command_region, buf);
}

fn render_text_region<'a>(
    title: &'a str,
    focused: bool,
    block: Block<'a>,
    text: String,
    scroll: u16,
    region: Rect,
    buf: &mut Buffer,
) {
    let block = block.title(title.fg(if focused { Color::Blue } else { Color::Reset }));
    let max_scroll = text.lines().count().saturating_sub(1) as u16;
    Paragraph::new(text)
        .block(block)
        .scroll((scroll.min(max_scroll), 0))
        .render(region, buf);
}

fn render_result_popup(
    area: Rect,
    answer: Option<&str>,
    error: Option<&str>,
    truncated: bool,
    output: &str,
    buf: &mut Buffer,
) {
    let (title, body) = match (answer, error) {
        (_, Some(error)) => (" Error ", error.to_string().red()),
        (Some(answer), None) => (" Answer ", answer.to_string().into()),
        (None, None) if truncated => (" Trace Truncated ", "frame limit reached".yellow()),
        (None, None) => return,
    };
    let ret_block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_set(border::PLAIN);

    let popup_area = Rect {
        x: area.width / 4,
        y: area.height / 3,
        width: area.width / 2,
        height: area.height / 3,
    };
    let mut lines = vec![Line::from(body)];
    if !output.is_empty() {
        lines.push(Line::from(""));
        lines.push(Line::from("Printed:".italic()));
        lines.extend(output.lines().map(Line::from));
    }
    Clear.render(popup_area, buf);
    Paragraph::new(lines)
        .block(ret_block)
        .render(popup_area, buf);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copy_results_land_in_the_status_line() {
        let mut app = App {
            focus: Focus::Stack,
            ..Default::default()
        };
        app.record_copy(Err("no display"));
        assert_eq!(app.status.as_deref(), Some("could not copy Stack: no display"));

        app.record_copy(Ok::<(), &str>(()));
        assert_eq!(app.status.as_deref(), Some("copied Stack"));
    }

    #[test]
    fn status_renders_in_the_footer() {
        let mut app = App {
            file_name: "fact.rpal".into(),
            frames: vec![TraceFrame {
                step: 0,
                label: "delta_0".into(),
                control: vec!["e_0".into(), "delta_0".into()],
                stack: vec!["e_0".into()],
                environments: vec![],
                current_env: 0,
                output: String::new(),
            }],
            status: Some("copied Env".into()),
            ..Default::default()
        };
        let area = Rect::new(0, 0, 120, 20);
        let mut buf = Buffer::empty(area);
        (&mut app).render(area, &mut buf);
        let footer: String = (0..area.width)
            .map(|x| buf[(x, area.height - 1)].symbol().to_string())
            .collect();
        assert!(footer.contains("copied Env"), "{footer}");
    }
}
