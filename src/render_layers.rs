//! The seven scene layers, back to front. Geometry is computed by pure
//! functions so it can be checked without a GPU; `draw_*` functions push the
//! result onto a [`Canvas`].

use crate::{
    ALGORITHM_NAMES,
    analysis_state::AnalysisState,
    canvas::Canvas,
    particles::{Particle, PulseRing},
};
use eframe::egui::{Align2, Color32, FontId, Pos2, Rect, Stroke, Vec2, pos2, vec2};
use std::f32::consts::PI;

pub mod palette {
    use eframe::egui::Color32;

    pub const VIOLET: Color32 = Color32::from_rgb(139, 92, 246);
    pub const CYAN: Color32 = Color32::from_rgb(34, 211, 238);
    pub const PINK: Color32 = Color32::from_rgb(244, 114, 182);
    pub const LAVENDER: Color32 = Color32::from_rgb(167, 139, 250);
    pub const AMBER: Color32 = Color32::from_rgb(251, 191, 36);
    pub const GREEN: Color32 = Color32::from_rgb(34, 197, 94);
    pub const PANEL: Color32 = Color32::from_rgb(10, 0, 30);

    pub const PARTICLE_COLORS: [Color32; 4] = [VIOLET, CYAN, PINK, LAVENDER];
}

pub fn with_alpha(color: Color32, alpha: f32) -> Color32 {
    let a = (alpha.clamp(0.0, 1.0) * 255.0).round() as u8;
    Color32::from_rgba_unmultiplied(color.r(), color.g(), color.b(), a)
}

pub fn group_thousands(n: usize) -> String {
    let digits = n.to_string();
    let mut ret = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            ret.push(',');
        }
        ret.push(c);
    }
    ret
}

pub fn algorithm_display_name(algorithm: Option<&str>) -> String {
    match algorithm {
        None => "---".to_string(),
        Some(algo) => ALGORITHM_NAMES
            .get(algo)
            .map(|s| s.to_string())
            .unwrap_or_else(|| algo.to_uppercase()),
    }
}

/// Focus of the helix and the pulse rings.
pub fn helix_center(size: Vec2) -> Pos2 {
    pos2(size.x * 0.72, size.y * 0.5)
}

// 1. Perspective grid

const GRID_HORIZON: f32 = 0.4;
const GRID_SPACING: f32 = 40.0;

pub fn draw_grid(canvas: &mut dyn Canvas, size: Vec2) {
    let horizon = size.y * GRID_HORIZON;

    for i in 0..15 {
        let y = horizon + (i * i * 3) as f32;
        if y > size.y {
            break;
        }
        let alpha = (0.1 - i as f32 * 0.006).max(0.02);
        canvas.line_segment(
            pos2(0.0, y),
            pos2(size.x, y),
            Stroke::new(1.0, with_alpha(palette::VIOLET, alpha)),
        );
    }

    let vanish_x = size.x / 2.0;
    for i in -10i32..=10 {
        let base_x = vanish_x + i as f32 * GRID_SPACING * 3.0;
        let alpha = (0.1 - i.abs() as f32 * 0.008).max(0.02);
        canvas.line_segment(
            pos2(vanish_x, horizon),
            pos2(base_x, size.y),
            Stroke::new(1.0, with_alpha(palette::VIOLET, alpha)),
        );
    }
}

// 2. Double helix

pub const HELIX_SEGMENTS: usize = 40;
const HELIX_HALF_WIDTH: f32 = 70.0;
const HELIX_TURNS: f32 = 5.0;
const HELIX_SPIN: f32 = 1.5;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HelixSample {
    pub pos: Pos2,
    /// `sin(angle)`, in `-1..=1`; positive is towards the viewer.
    pub depth: f32,
    pub scale: f32,
}

pub fn helix_strand(strand: usize, time: f32, size: Vec2) -> Vec<HelixSample> {
    let center = helix_center(size);
    let height = size.y * 0.75;
    let offset = strand as f32 * PI;

    (0..=HELIX_SEGMENTS)
        .map(|i| {
            let t = i as f32 / HELIX_SEGMENTS as f32;
            let angle = t * PI * HELIX_TURNS + time * HELIX_SPIN + offset;
            let x = center.x + angle.cos() * HELIX_HALF_WIDTH;
            let y = center.y - height / 2.0 + t * height;
            let depth = angle.sin();
            let scale = 0.6 + depth * 0.4;
            HelixSample {
                pos: pos2(center.x + (x - center.x) * scale, y),
                depth,
                scale,
            }
        })
        .collect()
}

pub fn draw_helix(canvas: &mut dyn Canvas, time: f32, size: Vec2) {
    let strands = [
        (helix_strand(0, time, size), palette::VIOLET),
        (helix_strand(1, time, size), palette::CYAN),
    ];

    for (samples, color) in &strands {
        let points: Vec<Pos2> = samples.iter().map(|s| s.pos).collect();
        canvas.polyline(points.clone(), Stroke::new(9.0, with_alpha(*color, 0.12)));
        canvas.polyline(points, Stroke::new(3.0, *color));

        for sample in samples.iter().step_by(2) {
            let r = 5.0 * sample.scale;
            canvas.circle_filled(sample.pos, r * 3.0, with_alpha(*color, 0.18));
            canvas.circle_filled(sample.pos, r, Color32::WHITE);
        }
    }

    let (left, right) = (&strands[0].0, &strands[1].0);
    for (a, b) in left.iter().zip(right.iter()).step_by(2) {
        let mid = a.pos.lerp(b.pos, 0.5);
        canvas.line_segment(a.pos, mid, Stroke::new(1.0, with_alpha(palette::VIOLET, 0.5)));
        canvas.line_segment(mid, b.pos, Stroke::new(1.0, with_alpha(palette::CYAN, 0.5)));
    }
}

// 3. Density graph

pub fn graph_rect(size: Vec2) -> Rect {
    let bottom = size.y * 0.85;
    let height = size.y * 0.35;
    Rect::from_min_max(pos2(30.0, bottom - height), pos2(30.0 + size.x * 0.42, bottom))
}

pub fn density_layer_active(state: &AnalysisState) -> bool {
    !state.matches.is_empty() && !state.data_points.is_empty()
}

/// Eases every point one frame towards its target; no-op while the layer is hidden.
pub fn ease_density(state: &mut AnalysisState) {
    if !density_layer_active(state) {
        return;
    }
    for point in &mut state.data_points {
        point.ease();
    }
}

pub fn density_graph_points(state: &AnalysisState, size: Vec2) -> Vec<Pos2> {
    if !density_layer_active(state) {
        return vec![];
    }
    let rect = graph_rect(size);
    state
        .data_points
        .iter()
        .map(|p| {
            pos2(
                rect.left() + p.x * rect.width(),
                rect.bottom() - p.value * rect.height(),
            )
        })
        .collect()
}

pub fn draw_density_graph(canvas: &mut dyn Canvas, state: &AnalysisState, size: Vec2) -> usize {
    let points = density_graph_points(state, size);
    if points.is_empty() {
        return 0;
    }
    let rect = graph_rect(size);
    let frame = Rect::from_min_max(
        pos2(rect.left() - 5.0, rect.top() - 25.0),
        pos2(rect.right() + 5.0, rect.bottom() + 5.0),
    );
    canvas.rect_filled(frame, with_alpha(Color32::BLACK, 0.35));
    canvas.rect_stroke(frame, Stroke::new(1.0, with_alpha(palette::VIOLET, 0.4)));

    for i in 0..=4 {
        let y = rect.bottom() - (i as f32 / 4.0) * rect.height();
        canvas.line_segment(
            pos2(rect.left(), y),
            pos2(rect.right(), y),
            Stroke::new(1.0, with_alpha(palette::VIOLET, 0.15)),
        );
    }

    // Area under the curve, one trapezoid per segment so each piece stays convex.
    for pair in points.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        canvas.convex_polygon(
            vec![pos2(a.x, rect.bottom()), a, b, pos2(b.x, rect.bottom())],
            with_alpha(palette::VIOLET, 0.25),
        );
    }

    canvas.polyline(points.clone(), Stroke::new(7.0, with_alpha(palette::CYAN, 0.15)));
    canvas.polyline(points.clone(), Stroke::new(2.5, palette::CYAN));

    for (i, (point, data)) in points.iter().zip(&state.data_points).enumerate() {
        if i % 5 == 0 && data.value > 0.4 {
            canvas.circle_filled(*point, 3.0, Color32::WHITE);
        }
    }

    canvas.text(
        pos2(rect.left(), rect.top() - 12.0),
        Align2::LEFT_CENTER,
        "MATCH DISTRIBUTION",
        FontId::monospace(11.0),
        with_alpha(Color32::WHITE, 0.8),
    );
    points.len()
}

// 4. Particles

pub fn draw_particles(canvas: &mut dyn Canvas, particles: &[Particle]) {
    for p in particles {
        let size = p.display_size();
        canvas.circle_filled(p.pos, size * 4.0, with_alpha(p.color, p.alpha() * 80.0 / 255.0));
        canvas.circle_filled(p.pos, size, p.color);
    }
}

// 5. Pulse rings

pub fn draw_pulse_rings(canvas: &mut dyn Canvas, rings: &[PulseRing], size: Vec2) {
    let center = helix_center(size);
    for ring in rings {
        canvas.circle_stroke(
            center,
            ring.radius,
            Stroke::new(2.0, with_alpha(palette::VIOLET, ring.opacity())),
        );
    }
}

// 6. HUD

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HudStatus {
    Searching,
    Complete,
    Ready,
    Waiting,
}

impl HudStatus {
    pub fn from_state(state: &AnalysisState) -> Self {
        if state.is_searching {
            Self::Searching
        } else if !state.matches.is_empty() {
            Self::Complete
        } else if state.sequence_length > 0 {
            Self::Ready
        } else {
            Self::Waiting
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Searching => "ANALYZING...",
            Self::Complete => "ANALYSIS COMPLETE",
            Self::Ready => "READY TO SEARCH",
            Self::Waiting => "WAITING FOR SEQUENCE",
        }
    }

    pub fn color(self) -> Color32 {
        match self {
            Self::Searching => palette::AMBER,
            Self::Complete => palette::GREEN,
            Self::Ready | Self::Waiting => palette::VIOLET,
        }
    }
}

pub fn blink_visible(time: f32, searching: bool) -> bool {
    searching || (time * 6.0).sin() > 0.0
}

#[derive(Clone, Debug, PartialEq)]
pub struct HudItem {
    pub label: &'static str,
    pub value: String,
    pub highlight: bool,
}

impl HudItem {
    fn new(label: &'static str, value: String) -> Self {
        Self {
            label,
            value,
            highlight: false,
        }
    }
}

pub fn sequence_panel_items(state: &AnalysisState) -> Vec<HudItem> {
    vec![
        HudItem::new(
            "SEQUENCE",
            if state.sequence_length > 0 {
                format!("{} bp", group_thousands(state.sequence_length))
            } else {
                "---".to_string()
            },
        ),
        HudItem::new(
            "GC CONTENT",
            if state.gc_content > 0.0 {
                format!("{:.1}%", state.gc_content)
            } else {
                "---".to_string()
            },
        ),
    ]
}

pub fn search_panel_items(state: &AnalysisState) -> Vec<HudItem> {
    let has_matches = !state.matches.is_empty();
    vec![
        HudItem {
            label: "MATCHES",
            value: if has_matches {
                group_thousands(state.matches.len())
            } else {
                "---".to_string()
            },
            highlight: has_matches,
        },
        HudItem::new("ALGORITHM", algorithm_display_name(state.algorithm.as_deref())),
        HudItem::new(
            "TIME",
            match state.search_time_ms {
                Some(ms) if ms > 0.0 => format!("{ms:.2} ms"),
                _ => "---".to_string(),
            },
        ),
    ]
}

const HUD_PADDING: f32 = 15.0;
const HUD_PANEL_WIDTH: f32 = 180.0;

pub fn draw_hud(canvas: &mut dyn Canvas, state: &AnalysisState, time: f32, size: Vec2) {
    draw_hud_panel(
        canvas,
        Rect::from_min_size(pos2(HUD_PADDING, HUD_PADDING), vec2(HUD_PANEL_WIDTH, 85.0)),
        "SEQ",
        &sequence_panel_items(state),
    );
    draw_hud_panel(
        canvas,
        Rect::from_min_size(
            pos2(size.x - HUD_PANEL_WIDTH - HUD_PADDING, HUD_PADDING),
            vec2(HUD_PANEL_WIDTH, 115.0),
        ),
        "SRC",
        &search_panel_items(state),
    );

    let status = HudStatus::from_state(state);
    let color = status.color();
    let center = pos2(size.x / 2.0, HUD_PADDING + 20.0);
    let banner = Rect::from_center_size(center, vec2(200.0, 25.0));
    canvas.rect_filled(banner, with_alpha(Color32::BLACK, 0.5));
    canvas.rect_stroke(banner, Stroke::new(1.0, with_alpha(color, 0.38)));
    canvas.text(
        center,
        Align2::CENTER_CENTER,
        status.label(),
        FontId::monospace(11.0),
        color,
    );

    if blink_visible(time, state.is_searching) {
        canvas.circle_filled(pos2(center.x - 85.0, center.y), 4.0, color);
    }
}

fn draw_hud_panel(canvas: &mut dyn Canvas, rect: Rect, tag: &str, items: &[HudItem]) {
    canvas.rect_filled(rect, with_alpha(palette::PANEL, 0.85));
    canvas.rect_stroke(rect, Stroke::new(1.0, with_alpha(palette::VIOLET, 0.5)));

    let corner = 10.0;
    let corner_stroke = Stroke::new(2.0, palette::VIOLET);
    for (c, dx, dy) in [
        (rect.left_top(), 1.0, 1.0),
        (rect.right_top(), -1.0, 1.0),
        (rect.left_bottom(), 1.0, -1.0),
        (rect.right_bottom(), -1.0, -1.0),
    ] {
        canvas.polyline(
            vec![pos2(c.x, c.y + corner * dy), c, pos2(c.x + corner * dx, c.y)],
            corner_stroke,
        );
    }

    canvas.text(
        pos2(rect.left() + 10.0, rect.top() + 14.0),
        Align2::LEFT_CENTER,
        &format!("[{tag}]"),
        FontId::monospace(10.0),
        with_alpha(palette::VIOLET, 0.8),
    );

    let mut y = rect.top() + 30.0;
    for item in items {
        canvas.text(
            pos2(rect.left() + 12.0, y),
            Align2::LEFT_CENTER,
            item.label,
            FontId::monospace(9.0),
            with_alpha(Color32::WHITE, 0.5),
        );
        canvas.text(
            pos2(rect.left() + 12.0, y + 13.0),
            Align2::LEFT_CENTER,
            &item.value,
            FontId::monospace(13.0),
            if item.highlight {
                palette::CYAN
            } else {
                Color32::WHITE
            },
        );
        y += 28.0;
    }
}

// 7. Scan band

pub const SCAN_SPEED: f32 = 40.0;
pub const SCAN_BAND_HEIGHT: f32 = 80.0;
const SCAN_SLICES: usize = 16;

pub fn scan_band_center(time: f32, height: f32) -> f32 {
    if height <= 0.0 {
        return 0.0;
    }
    (time * SCAN_SPEED) % height
}

pub fn draw_scan_band(canvas: &mut dyn Canvas, time: f32, size: Vec2) {
    let center = scan_band_center(time, size.y);
    let half = SCAN_BAND_HEIGHT / 2.0;
    let slice = SCAN_BAND_HEIGHT / SCAN_SLICES as f32;
    for i in 0..SCAN_SLICES {
        let top = center - half + i as f32 * slice;
        let mid = top + slice / 2.0;
        let alpha = 0.08 * (1.0 - ((mid - center).abs() / half)).max(0.0);
        canvas.rect_filled(
            Rect::from_min_size(pos2(0.0, top), vec2(size.x, slice)),
            with_alpha(palette::CYAN, alpha),
        );
    }
}
