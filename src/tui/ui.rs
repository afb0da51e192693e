//! UI rendering for the debugger.

use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Paragraph, List, ListItem},
    style::{Color, Style, Modifier},
};
use crate::bits::BitVector;
use crate::cpu::{ConditionCode, MEMORY_SIZE};
use super::app::DebuggerApp;

/// Main draw function.
pub fn draw(frame: &mut Frame, app: &DebuggerApp) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(55),
            Constraint::Percentage(45),
        ])
        .split(frame.area());

    // Left side: code, registers, output and status
    let left_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(8),
            Constraint::Length(8),
            Constraint::Length(3),
            Constraint::Length(3),
        ])
        .split(chunks[0]);

    draw_disassembly(frame, left_chunks[0], app);
    draw_registers(frame, left_chunks[1], app);
    draw_output(frame, left_chunks[2], app);
    draw_status(frame, left_chunks[3], app);

    // Right side: memory and help
    let right_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(10),
            Constraint::Length(4),
        ])
        .split(chunks[1]);

    draw_memory(frame, right_chunks[0], app);
    draw_help(frame, right_chunks[1]);
}

fn draw_disassembly(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let disasm = app.get_disassembly((area.height as usize).saturating_sub(2));

    let items: Vec<ListItem> = disasm
        .iter()
        .map(|(addr, instr, is_current)| {
            let prefix = if *is_current { "▶ " } else { "  " };
            let bp = if app.breakpoints.contains(addr) { "●" } else { " " };
            let text = format!("{}{:02}: {}", prefix, addr, instr);

            let style = if *is_current {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else if app.breakpoints.contains(addr) {
                Style::default().fg(Color::Red)
            } else {
                Style::default()
            };

            ListItem::new(format!("{} {}", bp, text)).style(style)
        })
        .collect();

    let list = List::new(items)
        .block(Block::default()
            .title(" Disassembly ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)));

    frame.render_widget(list, area);
}

/// Registers two per line, then PC, IR, CC and run state.
fn draw_registers(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let computer = &app.computer;
    let regs = computer.registers();

    let mut content: Vec<Line> = regs
        .chunks(2)
        .enumerate()
        .map(|(row, pair)| {
            let spans: Vec<Span> = pair
                .iter()
                .enumerate()
                .flat_map(|(col, value)| register_spans(row * 2 + col, value))
                .collect();
            Line::from(spans)
        })
        .collect();

    let cc = computer.cc();
    content.push(Line::from(vec![
        Span::raw("PC "),
        Span::styled(format!("{:>2}", computer.pc().unsigned_value()), Style::default().fg(Color::Yellow)),
        Span::raw("   IR "),
        Span::raw(computer.ir().to_string()),
        Span::raw("   CC "),
        Span::styled(cc.to_string(), cc_style(ConditionCode::from_register(&cc))),
        Span::raw("   "),
        Span::styled(
            format!("{:?} ({} cycles)", computer.run_state(), computer.cycles()),
            if computer.is_running() {
                Style::default().fg(Color::Green)
            } else {
                Style::default().fg(Color::Red)
            },
        ),
    ]));

    let paragraph = Paragraph::new(content)
        .block(Block::default()
            .title(" Registers ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Green)));

    frame.render_widget(paragraph, area);
}

fn register_spans(index: usize, value: &BitVector) -> Vec<Span<'static>> {
    vec![
        Span::raw(format!("R{} ", index)),
        Span::styled(value.to_string(), Style::default().fg(Color::White)),
        Span::raw(format!(" {:>6}   ", value.twos_complement_value())),
    ]
}

fn draw_memory(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let visible_rows = (area.height as usize).saturating_sub(2);
    let start = app.mem_scroll.min(MEMORY_SIZE);
    let end = (start + visible_rows).min(MEMORY_SIZE);
    let memory = app.computer.memory();
    let pc = app.pc() as usize;

    let items: Vec<ListItem> = (start..end)
        .map(|addr| {
            let value = &memory[addr];
            let text = format!("{:02}: {} = {}", addr, value, value.twos_complement_value());

            let style = if addr == pc {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else if !value.is_zero() {
                Style::default().fg(Color::White)
            } else {
                Style::default().fg(Color::DarkGray)
            };

            ListItem::new(text).style(style)
        })
        .collect();

    let list = List::new(items)
        .block(Block::default()
            .title(" Memory ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Magenta)));

    frame.render_widget(list, area);
}

fn draw_output(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let output = Paragraph::new(app.output())
        .style(Style::default().fg(Color::White))
        .block(Block::default()
            .title(" Output ")
            .borders(Borders::ALL));

    frame.render_widget(output, area);
}

fn draw_status(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let status = Paragraph::new(app.status.clone())
        .style(Style::default().fg(Color::White))
        .block(Block::default()
            .title(" Status ")
            .borders(Borders::ALL));

    frame.render_widget(status, area);
}

fn draw_help(frame: &mut Frame, area: Rect) {
    let help = Paragraph::new(vec![
        Line::from("s: Step  r: Run  p: Pause  b: Breakpoint"),
        Line::from("x: Reset  ↑↓: Scroll memory  q: Quit"),
    ])
    .style(Style::default().fg(Color::DarkGray))
    .block(Block::default()
        .title(" Help ")
        .borders(Borders::ALL));

    frame.render_widget(help, area);
}

/// N red, Z gray, P green.
fn cc_style(cc: Option<ConditionCode>) -> Style {
    match cc {
        Some(ConditionCode::Negative) => Style::default().fg(Color::Red),
        Some(ConditionCode::Zero) => Style::default().fg(Color::Gray),
        Some(ConditionCode::Positive) => Style::default().fg(Color::Green),
        None => Style::default().fg(Color::DarkGray),
    }
}
