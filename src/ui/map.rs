use ratatui::{
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::Span,
    widgets::{
        canvas::{Canvas, Context, Points},
        Block, Borders,
    },
};

use driftbottle::map_feed::{Bounds, GeoPoint, MapFeed};

// Never let a lone point collapse the view to zero width
const MIN_SPAN_DEG: f64 = 0.02;

/// Axis bounds for the canvas, with a margin around the outermost points
pub fn padded_bounds((sw, ne): Bounds) -> ([f64; 2], [f64; 2]) {
    let pad = |lo: f64, hi: f64| {
        let margin = ((hi - lo) * 0.05).max(MIN_SPAN_DEG / 2.0);
        [lo - margin, hi + margin]
    };
    (pad(sw.lng, ne.lng), pad(sw.lat, ne.lat))
}

/// Dots for every feed point, the reader's location, and optionally one
/// highlighted story
pub fn story_map(
    feed: &MapFeed,
    highlight: Option<GeoPoint>,
    title: &str,
) -> Canvas<'static, impl Fn(&mut Context)> {
    let (x_bounds, y_bounds) = padded_bounds(feed.bounds());
    let coords: Vec<(f64, f64)> = feed.points.iter().map(|&p| p.into()).collect();
    let current = feed.current;

    Canvas::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title.to_string()),
        )
        .marker(Marker::Braille)
        .x_bounds(x_bounds)
        .y_bounds(y_bounds)
        .paint(move |ctx| {
            ctx.draw(&Points {
                coords: &coords,
                color: Color::Cyan,
            });
            ctx.layer();
            ctx.print(
                current.lng,
                current.lat,
                Span::styled("◉ you", Style::default().fg(Color::Green)),
            );
            if let Some(p) = highlight {
                ctx.print(
                    p.lng,
                    p.lat,
                    Span::styled(
                        "✦",
                        Style::default()
                            .fg(Color::Yellow)
                            .add_modifier(Modifier::BOLD),
                    ),
                );
            }
        })
}
