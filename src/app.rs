use crate::{
    api::SequenceFile,
    canvas::PainterCanvas,
    history::{HistoryStatus, format_time_ago},
    render_layers::{algorithm_display_name, group_thousands, palette},
    toast::ToastKind,
    view_state::ViewState,
    visualization::{LoopControl, RenderLoop, StopToken},
    workflows::Session,
};
use anyhow::{Result, anyhow};
use chrono::Utc;
use eframe::egui::{self, Align2, Color32, RichText, Sense, Ui, vec2};
use egui_extras::{Column, TableBuilder};
use std::{path::Path, sync::Arc, time::Instant};
use tracing::debug;

pub const QUICK_PATTERNS: [&str; 5] = ["ATG", "TATAAA", "GAATTC", "GGATCC", "CCGG"];
pub const SEQUENCE_EXTENSIONS: [&str; 6] = ["fa", "fasta", "fna", "fas", "csv", "txt"];
pub const RESULT_TABLE_ROWS: usize = 50;
const GENOME_TRACK_MAX_PERCENT: f32 = 98.0;
const SCENE_BACKGROUND: Color32 = Color32::from_rgb(5, 0, 16);

/// Horizontal mark positions (percent) for the genome track.
pub fn genome_track_marks(positions: &[usize], sequence_length: usize) -> Vec<f32> {
    if sequence_length == 0 {
        return vec![];
    }
    positions
        .iter()
        .map(|&p| (p as f32 / sequence_length as f32 * 100.0).min(GENOME_TRACK_MAX_PERCENT))
        .collect()
}

pub fn format_elapsed(ms: Option<f64>) -> (String, String) {
    match ms {
        Some(ms) if ms > 0.0 => (format!("{ms:.2} ms"), format!("{:.3} s", ms / 1000.0)),
        _ => ("---".to_string(), "---".to_string()),
    }
}

fn sequence_file_for(path: &Path, display_name: &str) -> SequenceFile {
    let mut file = SequenceFile::from_path(path);
    let display_name = display_name.trim();
    if !display_name.is_empty() {
        file.name = display_name.to_string();
    }
    file
}

pub struct DnaAnalyzerApp {
    session: Session,
    render_loop: RenderLoop,
    pattern_input: String,
    upload_name: String,
    confirm_clear: bool,
    scene_drawn: bool,
}

impl DnaAnalyzerApp {
    pub fn new(cc: &eframe::CreationContext<'_>, mut session: Session) -> Self {
        cc.egui_ctx.set_visuals(egui::Visuals::dark());
        let ctx = cc.egui_ctx.clone();
        session.set_waker(Arc::new(move || ctx.request_repaint()));
        Self {
            session,
            render_loop: RenderLoop::new(),
            pattern_input: String::new(),
            upload_name: String::new(),
            confirm_clear: false,
            scene_drawn: false,
        }
    }

    pub fn stop_token(&self) -> StopToken {
        self.render_loop.stop_token()
    }

    fn start_upload(&mut self, path: &Path) {
        let file = sequence_file_for(path, &self.upload_name);
        self.session.upload(file);
    }

    fn pick_file(&mut self) {
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("Sequences", &SEQUENCE_EXTENSIONS)
            .pick_file()
        {
            self.start_upload(&path);
        }
    }

    fn handle_dropped_files(&mut self, ctx: &egui::Context) {
        let dropped = ctx.input(|i| i.raw.dropped_files.clone());
        let Some(file) = dropped.into_iter().next() else {
            return;
        };
        match Self::dropped_path(&file) {
            Ok(path) => self.start_upload(&path),
            Err(e) => self.session.notifier_mut().error(e.to_string()),
        }
    }

    fn dropped_path(file: &egui::DroppedFile) -> Result<std::path::PathBuf> {
        file.path
            .clone()
            .ok_or_else(|| anyhow!("Dropped file {} has no path on disk", file.name))
    }

    fn run_search(&mut self) {
        let pattern = self.pattern_input.clone();
        if let Err(e) = self.session.search(&pattern) {
            debug!("Search not started: {e}");
        }
    }

    fn render_nav(&mut self, ui: &mut Ui) {
        ui.horizontal(|ui| {
            ui.heading(RichText::new("DNA ANALYZER").color(palette::LAVENDER));
            ui.separator();
            let current = self.session.current_view();
            for view in ViewState::ALL {
                let text = if self.session.views().is_reachable(view) {
                    RichText::new(view.title())
                } else {
                    RichText::new(format!("{} (locked)", view.title())).weak()
                };
                if ui
                    .add(egui::Button::new(text).selected(current == view))
                    .clicked()
                {
                    self.session.navigate(view);
                }
            }
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                let (text, color) = if self.session.views().uploaded() {
                    ("SYSTEM ACTIVE", palette::GREEN)
                } else {
                    ("WAITING FOR SEQUENCE", palette::AMBER)
                };
                ui.label(RichText::new(text).monospace().color(color));
            });
        });
    }

    fn render_scene(&mut self, ui: &mut Ui, height: f32) {
        let size = vec2(ui.available_width(), height.max(0.0));
        let (rect, _response) = ui.allocate_exact_size(size, Sense::hover());
        let painter = ui.painter_at(rect);
        painter.rect_filled(rect, 0.0, SCENE_BACKGROUND);

        let pixels_per_point = ui.ctx().pixels_per_point();
        let (engine, state) = self.session.scene_mut();
        engine.sync_container(state, rect.size(), pixels_per_point);
        let mut canvas = PainterCanvas::new(&painter, rect.min);
        self.render_loop.tick(engine, state, Some(&mut canvas));
        self.scene_drawn = true;
    }

    fn render_upload(&mut self, ui: &mut Ui) {
        ui.heading("Import sequence");
        ui.add_space(8.0);

        let hovering = ui.ctx().input(|i| !i.raw.hovered_files.is_empty());
        let uploading = self.session.is_uploading();
        let size = vec2(ui.available_width(), 180.0);
        let (rect, response) = ui.allocate_exact_size(size, Sense::click());
        let highlight = hovering || response.hovered();
        let painter = ui.painter_at(rect);
        painter.rect_filled(
            rect,
            8.0,
            if highlight {
                Color32::from_rgb(30, 16, 60)
            } else {
                Color32::from_rgb(16, 8, 34)
            },
        );
        let text = if uploading {
            "Uploading...".to_string()
        } else {
            format!(
                "Drop a sequence file here or click to browse ({})",
                SEQUENCE_EXTENSIONS.join(", ")
            )
        };
        painter.text(
            rect.center(),
            Align2::CENTER_CENTER,
            text,
            egui::FontId::proportional(16.0),
            palette::LAVENDER,
        );
        if response.clicked() && !uploading {
            self.pick_file();
        }

        ui.add_space(8.0);
        ui.horizontal(|ui| {
            ui.label("Display name:");
            ui.add(
                egui::TextEdit::singleline(&mut self.upload_name)
                    .hint_text("defaults to the file name"),
            );
        });

        if let Some(sequence) = self.session.sequence() {
            ui.add_space(12.0);
            ui.label(format!(
                "Loaded: {} ({} bp)",
                sequence.display_name().to_uppercase(),
                group_thousands(sequence.length)
            ));
        }
    }

    fn render_dashboard(&mut self, ui: &mut Ui) {
        if let Some(sequence) = self.session.sequence() {
            let gc = sequence
                .gc_content
                .map(|gc| format!("{gc:.2}%"))
                .unwrap_or_else(|| "---".to_string());
            ui.horizontal(|ui| {
                ui.strong(sequence.display_name().to_uppercase());
                ui.separator();
                ui.label(format!("{} bp", group_thousands(sequence.length)));
                ui.separator();
                ui.label(format!("GC {gc}"));
            });
        }

        ui.horizontal(|ui| {
            let response = ui.add(
                egui::TextEdit::singleline(&mut self.pattern_input)
                    .hint_text("Pattern, e.g. GATTACA")
                    .desired_width(260.0),
            );
            let submitted =
                response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
            if ui.button("Search").clicked() || submitted {
                self.run_search();
            }
        });
        ui.horizontal(|ui| {
            ui.label("Quick patterns:");
            for pattern in QUICK_PATTERNS {
                if ui.small_button(pattern).clicked() {
                    self.pattern_input = pattern.to_string();
                }
            }
        });

        ui.add_space(6.0);
        let height = ui.available_height();
        self.render_scene(ui, height);
    }

    fn render_results(&mut self, ui: &mut Ui) {
        let state = self.session.state();
        let searching = state.is_searching;
        let pattern = state
            .pattern
            .clone()
            .unwrap_or_else(|| "---".to_string())
            .to_uppercase();
        let algorithm = algorithm_display_name(state.algorithm.as_deref());
        let (ms, secs) = format_elapsed(state.search_time_ms);
        let matches = state.matches.clone();
        let sequence_length = state.sequence_length;

        ui.horizontal(|ui| {
            ui.label("Pattern:");
            ui.strong(&pattern);
            ui.separator();
            ui.label("Matches:");
            if searching {
                ui.spinner();
            } else {
                ui.strong(group_thousands(matches.len()));
            }
            ui.separator();
            ui.label(format!("Algorithm: {algorithm}"));
            ui.separator();
            ui.label(format!("Time: {ms} / {secs}"));
        });

        ui.add_space(6.0);
        let height = (ui.available_height() * 0.5).max(200.0);
        self.render_scene(ui, height);

        ui.add_space(6.0);
        let positions: Vec<usize> = matches.iter().map(|m| m.position).collect();
        let (rect, _) = ui.allocate_exact_size(vec2(ui.available_width(), 24.0), Sense::hover());
        let painter = ui.painter_at(rect);
        painter.rect_filled(rect, 4.0, Color32::from_rgb(16, 8, 34));
        for pct in genome_track_marks(&positions, sequence_length) {
            let x = rect.left() + rect.width() * pct / 100.0;
            painter.rect_filled(
                egui::Rect::from_min_max(egui::pos2(x, rect.top()), egui::pos2(x + 2.0, rect.bottom())),
                0.0,
                palette::CYAN,
            );
        }

        ui.add_space(6.0);
        TableBuilder::new(ui)
            .striped(true)
            .column(Column::auto())
            .column(Column::auto())
            .column(Column::remainder())
            .column(Column::auto())
            .header(20.0, |mut header| {
                for title in ["#", "Position", "Context", "Algorithm"] {
                    header.col(|ui| {
                        ui.strong(title);
                    });
                }
            })
            .body(|mut body| {
                for (idx, m) in matches.iter().take(RESULT_TABLE_ROWS).enumerate() {
                    body.row(18.0, |mut row| {
                        row.col(|ui| {
                            ui.label(format!("#{}", idx + 1));
                        });
                        row.col(|ui| {
                            ui.label(RichText::new(m.position.to_string()).color(palette::CYAN));
                        });
                        row.col(|ui| {
                            ui.horizontal(|ui| {
                                ui.spacing_mut().item_spacing.x = 0.0;
                                ui.label(
                                    RichText::new(format!("...{}", m.context_before))
                                        .monospace()
                                        .weak(),
                                );
                                ui.label(RichText::new(&pattern).monospace().strong());
                                ui.label(
                                    RichText::new(format!("{}...", m.context_after))
                                        .monospace()
                                        .weak(),
                                );
                            });
                        });
                        row.col(|ui| {
                            ui.label(&algorithm);
                        });
                    });
                }
            });
    }

    fn render_history(&mut self, ui: &mut Ui) {
        ui.horizontal(|ui| {
            ui.heading("History");
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                let has_entries = !self.session.history_entries().is_empty();
                if ui
                    .add_enabled(has_entries, egui::Button::new("Clear history"))
                    .clicked()
                {
                    self.confirm_clear = true;
                }
            });
        });
        ui.separator();

        let entries = self.session.history_entries();
        if entries.is_empty() {
            ui.label(RichText::new("No searches yet.").weak());
            return;
        }
        let now = Utc::now();
        egui::ScrollArea::vertical().show(ui, |ui| {
            for entry in entries {
                ui.horizontal(|ui| {
                    let color = match entry.status {
                        HistoryStatus::Success => palette::GREEN,
                        HistoryStatus::Error => Color32::from_rgb(239, 68, 68),
                    };
                    ui.label(RichText::new(entry.status.badge()).monospace().color(color));
                    ui.strong(entry.title());
                    ui.label(RichText::new(format_time_ago(entry.timestamp, now)).weak());
                });
                ui.horizontal(|ui| {
                    ui.label(entry.outcome());
                    if let Some(algorithm) = &entry.algorithm {
                        ui.label(
                            RichText::new(algorithm_display_name(Some(algorithm))).small(),
                        );
                    }
                    if let Some(ms) = entry.search_time_ms {
                        ui.label(RichText::new(format!("{ms:.2} ms")).small());
                    }
                });
                ui.separator();
            }
        });
    }

    fn render_clear_confirmation(&mut self, ctx: &egui::Context) {
        if !self.confirm_clear {
            return;
        }
        egui::Window::new("Clear history")
            .collapsible(false)
            .resizable(false)
            .anchor(Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.label("Delete every history entry? This cannot be undone.");
                ui.horizontal(|ui| {
                    if ui.button("Clear").clicked() {
                        let confirmed = self.session.request_clear_history();
                        self.session.clear_history(confirmed);
                        self.confirm_clear = false;
                    }
                    if ui.button("Cancel").clicked() {
                        self.confirm_clear = false;
                    }
                });
            });
    }

    fn render_toasts(&mut self, ctx: &egui::Context) {
        let toasts = self.session.notifier_mut().active(Instant::now()).to_vec();
        if toasts.is_empty() {
            return;
        }
        egui::Area::new(egui::Id::new("toasts"))
            .anchor(Align2::RIGHT_BOTTOM, [-12.0, -12.0])
            .show(ctx, |ui| {
                for toast in &toasts {
                    let color = match toast.kind {
                        ToastKind::Success => palette::GREEN,
                        ToastKind::Error => Color32::from_rgb(239, 68, 68),
                    };
                    egui::Frame::popup(ui.style()).show(ui, |ui| {
                        ui.label(RichText::new(&toast.message).color(color));
                    });
                }
            });
    }
}

impl eframe::App for DnaAnalyzerApp {
    fn logic(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.session.poll();
        self.handle_dropped_files(ctx);
        if ctx.input(|i| i.viewport().close_requested()) {
            self.render_loop.stop_token().stop();
        }
    }

    fn ui(&mut self, ui: &mut Ui, _frame: &mut eframe::Frame) {
        let ctx = ui.ctx().clone();
        self.scene_drawn = false;

        egui::Panel::top("nav").show_inside(ui, |ui| {
            self.render_nav(ui);
        });

        egui::CentralPanel::default().show_inside(ui, |ui| match self.session.current_view() {
            ViewState::Upload => self.render_upload(ui),
            ViewState::Dashboard => self.render_dashboard(ui),
            ViewState::Results => self.render_results(ui),
            ViewState::History => self.render_history(ui),
        });

        self.render_clear_confirmation(&ctx);
        self.render_toasts(&ctx);

        // The scene keeps animating while its view is hidden.
        let control = if self.scene_drawn {
            if self.render_loop.stop_token().is_stopped() {
                LoopControl::Stopped
            } else {
                LoopControl::Continue
            }
        } else {
            let (engine, state) = self.session.scene_mut();
            self.render_loop.tick(engine, state, None)
        };
        if control == LoopControl::Continue {
            ctx.request_repaint();
        }
    }
}
