//! Per-frame scene driver. The engine owns the surface geometry, the scene
//! clock and the particle RNG; everything it animates lives in
//! [`AnalysisState`] so workflows and the renderer share one record.

use crate::{
    analysis_state::AnalysisState,
    canvas::Canvas,
    particles::{self, PulseRing},
    render_layers,
    view_state::{Transition, TransitionObserver},
};
use eframe::egui::{Pos2, Vec2, pos2, vec2};
use rand::{SeedableRng, rngs::StdRng};
use std::{cell::Cell, rc::Rc};
use tracing::debug;

pub const FRAME_TIME_STEP: f32 = 0.016;
pub const MIN_SURFACE_SIZE: f32 = 50.0;
pub const DEFAULT_FOCAL_POINT: Pos2 = pos2(200.0, 150.0);

/// Logical size of the scene container. egui allocates the physical backing
/// store from `pixels_per_point`; the engine only tracks it to notice density
/// changes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Surface {
    pub width: f32,
    pub height: f32,
    pub pixels_per_point: f32,
}

impl Surface {
    pub fn size(&self) -> Vec2 {
        vec2(self.width, self.height)
    }

    pub fn center(&self) -> Pos2 {
        pos2(self.width / 2.0, self.height / 2.0)
    }
}

pub struct VisualizationEngine {
    surface: Option<Surface>,
    time: f32,
    rng: StdRng,
    layout_requested: Rc<Cell<bool>>,
}

impl Default for VisualizationEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl VisualizationEngine {
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_entropy())
    }

    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    fn from_rng(rng: StdRng) -> Self {
        Self {
            surface: None,
            time: 0.0,
            rng,
            layout_requested: Rc::new(Cell::new(false)),
        }
    }

    pub fn surface(&self) -> Option<Surface> {
        self.surface
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    /// Attaches or resizes the surface and reseeds the ambient field.
    /// Requests below the minimum size change nothing.
    pub fn resize(
        &mut self,
        state: &mut AnalysisState,
        width: f32,
        height: f32,
        pixels_per_point: f32,
    ) -> bool {
        if !(width >= MIN_SURFACE_SIZE && height >= MIN_SURFACE_SIZE) {
            debug!("Ignoring resize to {width}x{height}");
            return false;
        }
        let pixels_per_point = if pixels_per_point > 0.0 {
            pixels_per_point
        } else {
            1.0
        };
        let surface = Surface {
            width,
            height,
            pixels_per_point,
        };
        debug!("Scene surface {width}x{height} at {pixels_per_point} px/pt");
        self.surface = Some(surface);
        state.particles = particles::ambient_field(&mut self.rng, surface.size());
        true
    }

    /// Called with the current container size whenever the scene is drawn.
    /// Resizes only when the size or pixel density differs from the attached
    /// surface; a pending layout request is consumed either way.
    pub fn sync_container(
        &mut self,
        state: &mut AnalysisState,
        size: Vec2,
        pixels_per_point: f32,
    ) -> bool {
        let requested = self.layout_requested.replace(false);
        let changed = match self.surface {
            Some(s) => s.size() != size || s.pixels_per_point != pixels_per_point,
            None => true,
        };
        if !changed {
            if requested {
                debug!("Scene shown at unchanged size {}x{}", size.x, size.y);
            }
            return false;
        }
        self.resize(state, size.x, size.y, pixels_per_point)
    }

    /// Observer for the view state machine: entering a scene view asks for the
    /// container to be measured again.
    pub fn transition_observer(&self) -> TransitionObserver {
        let flag = self.layout_requested.clone();
        Box::new(move |t: &Transition| {
            if t.to.shows_scene() {
                flag.set(true);
            }
        })
    }

    pub fn layout_requested(&self) -> bool {
        self.layout_requested.get()
    }

    /// Restarts the sequence-bound layers after a new upload.
    pub fn reset_sequence_layers(&mut self, state: &mut AnalysisState) {
        state.pulse_rings = PulseRing::default_set();
        state.data_points.clear();
    }

    pub fn focal_point(&self) -> Pos2 {
        self.surface
            .map(|s| s.center())
            .unwrap_or(DEFAULT_FOCAL_POINT)
    }

    pub fn spawn_burst(&mut self, state: &mut AnalysisState) -> usize {
        let origin = self.focal_point();
        let burst = particles::burst(&mut self.rng, origin);
        let count = burst.len();
        state.particles.extend(burst);
        count
    }

    /// Advances the scene by one frame and draws it when a canvas is given.
    /// Without a surface this does nothing and returns `false`.
    pub fn frame(&mut self, state: &mut AnalysisState, canvas: Option<&mut dyn Canvas>) -> bool {
        let Some(surface) = self.surface else {
            return false;
        };
        let size = surface.size();
        self.time += FRAME_TIME_STEP;

        particles::step_particles(&mut state.particles, size);
        for ring in &mut state.pulse_rings {
            ring.step();
        }
        render_layers::ease_density(state);

        if let Some(canvas) = canvas {
            render_layers::draw_grid(canvas, size);
            render_layers::draw_helix(canvas, self.time, size);
            render_layers::draw_density_graph(canvas, state, size);
            render_layers::draw_particles(canvas, &state.particles);
            render_layers::draw_pulse_rings(canvas, &state.pulse_rings, size);
            render_layers::draw_hud(canvas, state, self.time, size);
            render_layers::draw_scan_band(canvas, self.time, size);
        }
        true
    }
}

/// Shared stop flag for a [`RenderLoop`]. Once stopped it stays stopped.
#[derive(Clone, Debug, Default)]
pub struct StopToken(Rc<Cell<bool>>);

impl StopToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.set(true);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.get()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopControl {
    Continue,
    Stopped,
}

/// Cooperative frame scheduler: the host calls [`RenderLoop::tick`] once per
/// display refresh and keeps doing so while it returns `Continue`.
#[derive(Debug, Default)]
pub struct RenderLoop {
    token: StopToken,
    frames: u64,
}

impl RenderLoop {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop_token(&self) -> StopToken {
        self.token.clone()
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn tick(
        &mut self,
        engine: &mut VisualizationEngine,
        state: &mut AnalysisState,
        canvas: Option<&mut dyn Canvas>,
    ) -> LoopControl {
        if self.token.is_stopped() {
            return LoopControl::Stopped;
        }
        engine.frame(state, canvas);
        self.frames += 1;
        LoopControl::Continue
    }

    /// Headless driver: ticks without drawing until stopped or `max_frames` ran.
    pub fn run(
        &mut self,
        engine: &mut VisualizationEngine,
        state: &mut AnalysisState,
        max_frames: u64,
    ) -> u64 {
        let start = self.frames;
        while self.frames - start < max_frames {
            if self.tick(engine, state, None) == LoopControl::Stopped {
                break;
            }
        }
        self.frames - start
    }
}
