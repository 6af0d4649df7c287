//! Drawing surface abstraction. Scene layers draw in surface-local points;
//! [`PainterCanvas`] forwards to egui, [`RecordingCanvas`] keeps the commands
//! for headless inspection.

use eframe::egui::{self, Align2, Color32, FontId, Pos2, Rect, Shape, Stroke, Vec2};

pub trait Canvas {
    fn polyline(&mut self, points: Vec<Pos2>, stroke: Stroke);
    fn circle_filled(&mut self, center: Pos2, radius: f32, fill: Color32);
    fn circle_stroke(&mut self, center: Pos2, radius: f32, stroke: Stroke);
    fn rect_filled(&mut self, rect: Rect, fill: Color32);
    /// Points must describe a convex polygon.
    fn convex_polygon(&mut self, points: Vec<Pos2>, fill: Color32);
    fn text(&mut self, pos: Pos2, anchor: Align2, text: &str, font: FontId, color: Color32);

    fn line_segment(&mut self, from: Pos2, to: Pos2, stroke: Stroke) {
        self.polyline(vec![from, to], stroke);
    }

    fn rect_stroke(&mut self, rect: Rect, stroke: Stroke) {
        self.polyline(
            vec![
                rect.left_top(),
                rect.right_top(),
                rect.right_bottom(),
                rect.left_bottom(),
                rect.left_top(),
            ],
            stroke,
        );
    }
}

pub struct PainterCanvas<'a> {
    painter: &'a egui::Painter,
    offset: Vec2,
}

impl<'a> PainterCanvas<'a> {
    /// `origin` is the screen position of the surface's top-left corner.
    pub fn new(painter: &'a egui::Painter, origin: Pos2) -> Self {
        Self {
            painter,
            offset: origin.to_vec2(),
        }
    }

    fn map(&self, p: Pos2) -> Pos2 {
        p + self.offset
    }
}

impl Canvas for PainterCanvas<'_> {
    fn polyline(&mut self, points: Vec<Pos2>, stroke: Stroke) {
        if points.len() < 2 {
            return;
        }
        let points = points.into_iter().map(|p| self.map(p)).collect();
        self.painter.add(Shape::line(points, stroke));
    }

    fn circle_filled(&mut self, center: Pos2, radius: f32, fill: Color32) {
        self.painter.circle_filled(self.map(center), radius, fill);
    }

    fn circle_stroke(&mut self, center: Pos2, radius: f32, stroke: Stroke) {
        self.painter.circle_stroke(self.map(center), radius, stroke);
    }

    fn rect_filled(&mut self, rect: Rect, fill: Color32) {
        self.painter.rect_filled(rect.translate(self.offset), 0.0, fill);
    }

    fn convex_polygon(&mut self, points: Vec<Pos2>, fill: Color32) {
        let points = points.into_iter().map(|p| self.map(p)).collect();
        self.painter
            .add(Shape::convex_polygon(points, fill, Stroke::NONE));
    }

    fn text(&mut self, pos: Pos2, anchor: Align2, text: &str, font: FontId, color: Color32) {
        self.painter.text(self.map(pos), anchor, text, font, color);
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum DrawCommand {
    Polyline { points: Vec<Pos2>, stroke: Stroke },
    CircleFilled { center: Pos2, radius: f32, fill: Color32 },
    CircleStroke { center: Pos2, radius: f32, stroke: Stroke },
    RectFilled { rect: Rect, fill: Color32 },
    ConvexPolygon { points: Vec<Pos2>, fill: Color32 },
    Text { pos: Pos2, text: String, color: Color32 },
}

#[derive(Clone, Debug, Default)]
pub struct RecordingCanvas {
    pub commands: Vec<DrawCommand>,
}

impl RecordingCanvas {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn texts(&self) -> Vec<&str> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn contains_text(&self, needle: &str) -> bool {
        self.texts().iter().any(|t| t.contains(needle))
    }

    pub fn circle_strokes(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::CircleStroke { .. }))
            .count()
    }
}

impl Canvas for RecordingCanvas {
    fn polyline(&mut self, points: Vec<Pos2>, stroke: Stroke) {
        self.commands.push(DrawCommand::Polyline { points, stroke });
    }

    fn circle_filled(&mut self, center: Pos2, radius: f32, fill: Color32) {
        self.commands.push(DrawCommand::CircleFilled {
            center,
            radius,
            fill,
        });
    }

    fn circle_stroke(&mut self, center: Pos2, radius: f32, stroke: Stroke) {
        self.commands.push(DrawCommand::CircleStroke {
            center,
            radius,
            stroke,
        });
    }

    fn rect_filled(&mut self, rect: Rect, fill: Color32) {
        self.commands.push(DrawCommand::RectFilled { rect, fill });
    }

    fn convex_polygon(&mut self, points: Vec<Pos2>, fill: Color32) {
        self.commands.push(DrawCommand::ConvexPolygon { points, fill });
    }

    fn text(&mut self, pos: Pos2, _anchor: Align2, text: &str, _font: FontId, color: Color32) {
        self.commands.push(DrawCommand::Text {
            pos,
            text: text.to_string(),
            color,
        });
    }
}
