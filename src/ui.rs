pub mod map;
pub mod screen;

use std::time::Instant;

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Widget, Wrap},
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use driftbottle::{
    choreography::{self, BottlePhase, PickPhase, SlotPhase, SlotTimeline},
    motion::MotionDiagnostic,
    reveal::Stage,
    selector::preview,
};

use crate::App;

const HORIZONTAL_MARGIN: u16 = 2;
const VERTICAL_MARGIN: u16 = 1;
const SWAY_COLUMNS: f64 = 3.0;

/// Bottle art with `inside` stars in the body and `neck` stars on their way out
pub fn bottle_lines(inside: usize, neck: usize) -> Vec<String> {
    let stars = |n: usize, width: usize| {
        let s: String = "✦".repeat(n.min(width));
        format!("{s:^width$}")
    };
    let body_rows = 3;
    let per_row = inside.div_ceil(body_rows).max(1);

    let mut lines = vec![
        "  ┌─┐  ".to_string(),
        format!("  │{}│  ", stars(neck, 1)),
        " ╭┘ └╮ ".to_string(),
        "╭╯   ╰╮".to_string(),
    ];
    let mut left = inside;
    for _ in 0..body_rows {
        let here = left.min(per_row);
        left -= here;
        lines.push(format!("│{}│", stars(here, 5)));
    }
    lines.push("╰─────╯".to_string());
    lines
}

/// Cuts `text` to at most `width` terminal columns
pub fn fit_width(text: &str, width: usize) -> String {
    if text.width() <= width {
        return text.to_string();
    }
    let mut used = 0;
    let mut out = String::new();
    for c in text.chars() {
        let w = c.width().unwrap_or(0);
        if used + w + 1 > width {
            break;
        }
        used += w;
        out.push(c);
    }
    out.push('…');
    out
}

fn describe_diagnostic(d: &MotionDiagnostic) -> String {
    match d {
        MotionDiagnostic::Status { listening: true } => "sensor on".to_string(),
        MotionDiagnostic::Status { listening: false } => "sensor off".to_string(),
        MotionDiagnostic::Motion { dx, dy, dz, total } => {
            format!("Δ {total:.1} ({dx:.1} {dy:.1} {dz:.1})")
        }
        MotionDiagnostic::Shake => "shake!".to_string(),
    }
}

impl App {
    pub fn render_bottle(&self, area: Rect, buf: &mut Buffer, now: Instant) {
        let bold_style = Style::default().add_modifier(Modifier::BOLD);
        let dim_style = Style::default().add_modifier(Modifier::DIM);
        let italic_style = Style::default().add_modifier(Modifier::ITALIC);

        let area = if self.show_debug {
            let columns = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Min(40), Constraint::Length(34)])
                .split(area);
            self.render_debug_panel(columns[1], buf);
            columns[0]
        } else {
            area
        };

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .horizontal_margin(HORIZONTAL_MARGIN)
            .vertical_margin(VERTICAL_MARGIN)
            .constraints([
                Constraint::Length(1), // title
                Constraint::Length(1), // prompt
                Constraint::Length(1), // notice
                Constraint::Min(9),    // bottle
                Constraint::Length(3), // slots
                Constraint::Length(1), // hint
                Constraint::Length(1), // legend
            ])
            .split(area);

        Paragraph::new(Span::styled("driftbottle", bold_style.fg(Color::Cyan)))
            .alignment(Alignment::Center)
            .render(chunks[0], buf);

        Paragraph::new(Span::styled(self.session.prompt(), italic_style))
            .alignment(Alignment::Center)
            .render(chunks[1], buf);

        if let Some((notice, _)) = self.notice {
            Paragraph::new(Span::styled(notice, Style::default().fg(Color::Yellow)))
                .alignment(Alignment::Center)
                .render(chunks[2], buf);
        }

        let since = self.session.since_activation();
        let slots = self.session.slots();
        let phases: Vec<SlotPhase> = slots
            .iter()
            .map(|slot| match since {
                Some(t) => SlotTimeline::new(slot.start_delay()).phase(t),
                None => SlotPhase::InBottle,
            })
            .collect();

        let inside = phases.iter().filter(|p| **p == SlotPhase::InBottle).count();
        let neck = phases
            .iter()
            .filter(|p| matches!(p, SlotPhase::Rising { .. }))
            .count();
        let sway = match choreography::bottle_phase(since) {
            BottlePhase::Shaking { .. } => since.map(choreography::shake_offset).unwrap_or(0.0),
            _ => 0.0,
        };
        let shift = (sway * SWAY_COLUMNS).round() as i32;
        let bottle: Vec<Line> = bottle_lines(inside, neck)
            .into_iter()
            .map(|l| {
                let padded = if shift >= 0 {
                    format!("{}{}", " ".repeat(shift as usize * 2), l)
                } else {
                    format!("{}{}", l, " ".repeat(shift.unsigned_abs() as usize * 2))
                };
                Line::from(Span::styled(padded, Style::default().fg(Color::LightBlue)))
            })
            .collect();
        let bottle_height = bottle.len() as u16;
        let bottle_area = Rect {
            y: chunks[3].y + chunks[3].height.saturating_sub(bottle_height) / 2,
            height: bottle_height.min(chunks[3].height),
            ..chunks[3]
        };
        Paragraph::new(bottle)
            .alignment(Alignment::Center)
            .render(bottle_area, buf);

        self.render_slots(chunks[4], buf, &phases, now);

        let unrevealed = self.session.machine().revealed_slot().is_none();
        if since.is_some_and(choreography::hint_visible) && unrevealed {
            let hint = format!("press 1-{} to reveal your story", slots.len());
            Paragraph::new(Span::styled(hint, dim_style))
                .alignment(Alignment::Center)
                .render(chunks[5], buf);
        }

        let legend = if self.session.policy().awaiting_permission() {
            "(y) allow / (n) deny / (esc)ape"
        } else {
            "(s)hake / (t)ap / (1-9) pick / (r)eset / (f)ootprints / (d)ebug / (esc)ape"
        };
        Paragraph::new(Span::styled(legend, italic_style)).render(chunks[6], buf);

        if let Some(PickPhase::Fill { progress }) = self.pick.map(|p| p.phase(now)) {
            let height = (area.height as f64 * progress).round() as u16;
            let fill = Rect {
                y: area.y + area.height - height,
                height,
                ..area
            };
            Clear.render(fill, buf);
            Block::default()
                .style(Style::default().bg(Color::Blue))
                .render(fill, buf);
        }

        if self.session.policy().awaiting_permission() {
            render_permission_prompt(area, buf);
        }
    }

    fn render_slots(&self, area: Rect, buf: &mut Buffer, phases: &[SlotPhase], now: Instant) {
        if phases.is_empty() {
            return;
        }
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(vec![Constraint::Ratio(1, phases.len() as u32); phases.len()])
            .split(area);

        let glowing = self.pick.and_then(|p| match p.phase(now) {
            PickPhase::Glow { .. } => Some(p.slot),
            _ => None,
        });

        let since = self.session.since_activation();
        let cards = self.session.slots().iter().zip(phases.iter().zip(columns.iter()));
        for (slot, (phase, column)) in cards {
            if !phase.is_visible() && slot.stage() != Stage::Revealed {
                continue;
            }
            let id = slot.slot_id();
            let mut style = Style::default();
            if glowing == Some(id) {
                style = style.fg(Color::Yellow).add_modifier(Modifier::BOLD);
            } else if slot.stage() == Stage::Revealed {
                style = style.fg(Color::Yellow);
            } else if self.session.machine().revealed_slot().is_some() {
                style = style.add_modifier(Modifier::DIM);
            }

            let inner_width = column.width.saturating_sub(2) as usize;
            let label_opacity = since
                .map(|t| SlotTimeline::new(slot.start_delay()).label_opacity(t))
                .unwrap_or(0.0);
            let text = match self.session.selected_for_slot(id) {
                Some(story) if label_opacity > 0.0 => {
                    let label = format!("{} {}", story.emotion, story.preview);
                    let label = fit_width(&label, inner_width);
                    if label_opacity < 1.0 {
                        Span::styled(label, style.add_modifier(Modifier::DIM))
                    } else {
                        Span::styled(label, style)
                    }
                }
                _ => Span::styled("✦", style),
            };

            Paragraph::new(text)
                .alignment(Alignment::Center)
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .border_style(style)
                        .title((id + 1).to_string()),
                )
                .render(*column, buf);
        }
    }

    fn render_debug_panel(&self, area: Rect, buf: &mut Buffer) {
        let status = self.session.detector().status();
        let haptics = self.session.machine().haptics().snapshot();
        let mut lines = vec![
            Line::from(format!("input: {}", self.session.modality())),
            Line::from(format!(
                "sensor: {} / threshold {:.1}",
                if status.listening { "listening" } else { "off" },
                status.threshold
            )),
            Line::from(format!("shakes: {}", self.session.detector().shakes_detected())),
            Line::from(format!(
                "haptics: {} ({})",
                if haptics.supported { "on" } else { "off" },
                haptics.platform
            )),
            Line::from(format!("cooldown: {}ms", haptics.remaining_cooldown.as_millis())),
            Line::from(Span::styled(haptics.note, Style::default().add_modifier(Modifier::ITALIC))),
            Line::from(""),
        ];
        lines.extend(
            self.diagnostics
                .iter()
                .rev()
                .map(|d| Line::from(describe_diagnostic(d))),
        );

        Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title("debug"))
            .wrap(Wrap { trim: true })
            .render(area, buf);
    }

    pub fn render_story(&self, story_index: usize, area: Rect, buf: &mut Buffer) {
        let Some(note) = self.session.story(story_index) else {
            Paragraph::new("No stories in this bottle")
                .alignment(Alignment::Center)
                .render(area, buf);
            return;
        };
        let bold_style = Style::default().add_modifier(Modifier::BOLD);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .horizontal_margin(HORIZONTAL_MARGIN)
            .vertical_margin(VERTICAL_MARGIN)
            .constraints([
                Constraint::Length(2),  // header
                Constraint::Min(3),     // content
                Constraint::Length(12), // map
                Constraint::Length(1),  // legend
            ])
            .split(area);

        Paragraph::new(vec![
            Line::from(Span::styled(
                format!("{} {} · {}", note.date, note.weekday, note.location),
                bold_style,
            )),
            Line::from(vec![
                Span::raw(format!("{} · #{} · ", note.author, note.label)),
                Span::styled(note.emotion.clone(), Style::default().fg(Color::Magenta)),
            ]),
        ])
        .render(chunks[0], buf);

        Paragraph::new(note.content.as_str())
            .block(Block::default().borders(Borders::TOP))
            .wrap(Wrap { trim: true })
            .render(chunks[1], buf);

        map::story_map(&self.session.map_feed(), Some(note.point()), "where it washed ashore")
            .render(chunks[2], buf);

        Paragraph::new(Span::styled(
            "(b)ack / (f)ootprints / (r)eset / (esc)ape",
            Style::default().add_modifier(Modifier::ITALIC),
        ))
        .render(chunks[3], buf);
    }

    pub fn render_footprints(&self, area: Rect, buf: &mut Buffer) {
        let footprints = self.session.footprints();
        let corpus = self.session.corpus();
        let now = chrono::Local::now();

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .horizontal_margin(HORIZONTAL_MARGIN)
            .vertical_margin(VERTICAL_MARGIN)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(4),
                Constraint::Length(1),
            ])
            .split(area);

        Paragraph::new(Span::styled(
            footprints.summary(),
            Style::default().add_modifier(Modifier::BOLD),
        ))
        .alignment(Alignment::Center)
        .render(chunks[0], buf);

        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(chunks[1]);

        let entries: Vec<Line> = footprints
            .notes(corpus)
            .enumerate()
            .map(|(i, (print, note))| {
                let style = if i == self.footprint_cursor {
                    Style::default().add_modifier(Modifier::REVERSED)
                } else {
                    Style::default()
                };
                Line::from(vec![
                    Span::styled(format!("{} ", note.emotion), style.fg(Color::Magenta)),
                    Span::styled(preview(&note.content, 14), style),
                    Span::styled(
                        format!("  {}", print.unlocked_ago(now)),
                        style.add_modifier(Modifier::DIM),
                    ),
                ])
            })
            .collect();

        let mut tally: Vec<Line> = vec![Line::from("")];
        tally.extend(
            footprints
                .emotion_tally(corpus)
                .into_iter()
                .map(|(emotion, n)| Line::from(format!("{emotion} × {n}"))),
        );

        Paragraph::new([entries, tally].concat())
            .block(Block::default().borders(Borders::ALL).title("footprints"))
            .render(body[0], buf);

        let latest = footprints
            .latest()
            .and_then(|f| corpus.get(f.story_index))
            .map(|note| note.point());
        map::story_map(&self.session.footprint_feed(), latest, "map")
            .render(body[1], buf);

        Paragraph::new(Span::styled(
            "(↑/↓) select / (enter) open / (b)ack / (esc)ape",
            Style::default().add_modifier(Modifier::ITALIC),
        ))
        .render(chunks[2], buf);
    }
}

fn render_permission_prompt(area: Rect, buf: &mut Buffer) {
    let width = 44.min(area.width);
    let height = 5.min(area.height);
    let popup = Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    };
    Clear.render(popup, buf);
    Paragraph::new(vec![
        Line::from("This bottle wants to feel you shake it."),
        Line::from(Span::styled(
            "Allow motion access? (y/n)",
            Style::default().add_modifier(Modifier::BOLD),
        )),
    ])
    .alignment(Alignment::Center)
    .wrap(Wrap { trim: true })
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title("motion access"),
    )
    .render(popup, buf);
}
