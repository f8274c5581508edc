use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use eframe::egui::{self, Context};
use explore_graph::{EngineConfig, GraphEngine, GraphSnapshot, RenderFlags, RenderFrame};

mod canvas;
mod controls;
mod render_utils;
mod source;

type LoadResult = Result<GraphSnapshot, String>;

pub struct ExplorerApp {
    config: EngineConfig,
    input: Option<PathBuf>,
    state: AppState,
    reload_rx: Option<Receiver<LoadResult>>,
}

enum AppState {
    Loading { rx: Receiver<LoadResult> },
    Ready(Box<ViewModel>),
    Error(String),
}

struct ViewModel {
    engine: GraphEngine,
    /// Built once per paint; the top bar reads the previous paint's stats.
    frame: RenderFrame,
    show_links: bool,
    /// Set by the engine's click callback; stands in for navigation.
    clicked: Rc<RefCell<Option<String>>>,
    intake_error: Option<String>,
    needs_fit: bool,
    fps_samples: VecDeque<f32>,
}

impl ExplorerApp {
    pub fn new(
        _cc: &eframe::CreationContext<'_>,
        config: EngineConfig,
        input: Option<PathBuf>,
    ) -> Self {
        let state = AppState::Loading {
            rx: Self::spawn_load(input.clone()),
        };
        Self {
            config,
            input,
            state,
            reload_rx: None,
        }
    }

    fn spawn_load(input: Option<PathBuf>) -> Receiver<LoadResult> {
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let result =
                source::load_snapshot(input.as_deref()).map_err(|error| format!("{error:#}"));
            let _ = tx.send(result);
        });

        rx
    }

    fn ready_state(&self, snapshot: GraphSnapshot) -> AppState {
        let mut model = ViewModel::new(self.config.clone());
        model.apply_snapshot(snapshot, false);
        AppState::Ready(Box::new(model))
    }
}

impl ViewModel {
    fn new(config: EngineConfig) -> Self {
        let clicked = Rc::new(RefCell::new(None));
        let sink = Rc::clone(&clicked);
        let mut engine = GraphEngine::new(config);
        engine.set_on_node_click(move |node_id| {
            tracing::info!(node_id, "node clicked");
            *sink.borrow_mut() = Some(node_id.to_owned());
        });

        Self {
            engine,
            frame: RenderFrame::default(),
            show_links: true,
            clicked,
            intake_error: None,
            needs_fit: true,
            fps_samples: VecDeque::new(),
        }
    }

    fn flags(&self, is_loading: bool) -> RenderFlags {
        RenderFlags {
            show_links: self.show_links,
            is_loading,
        }
    }

    fn apply_snapshot(&mut self, snapshot: GraphSnapshot, is_loading: bool) {
        match self.engine.ingest(snapshot, self.flags(is_loading)) {
            Ok(outcome) => {
                tracing::debug!(?outcome, "snapshot applied");
                self.intake_error = None;
                self.needs_fit = true;
            }
            Err(error) => {
                self.intake_error = Some(error.to_string());
            }
        }
    }

    fn show(&mut self, ctx: &Context, reload_requested: &mut bool, is_loading: bool) {
        self.update_fps(ctx);
        self.engine.set_flags(self.flags(is_loading));

        egui::TopBottomPanel::top("top_bar")
            .resizable(false)
            .show(ctx, |ui| self.draw_controls(ui, reload_requested, is_loading));

        egui::CentralPanel::default().show(ctx, |ui| {
            if let Some(error) = &self.intake_error {
                ui.vertical_centered(|ui| {
                    ui.add_space(120.0);
                    ui.heading("Graph could not be laid out");
                    ui.add_space(6.0);
                    ui.label(error.as_str());
                });
            } else {
                self.draw_graph(ui);
            }
        });
    }

    fn update_fps(&mut self, ctx: &Context) {
        const FPS_SAMPLE_WINDOW: usize = 120;

        let dt = ctx.input(|input| input.stable_dt);
        if dt <= f32::EPSILON {
            return;
        }
        self.fps_samples.push_back((1.0 / dt).clamp(0.0, 1000.0));
        while self.fps_samples.len() > FPS_SAMPLE_WINDOW {
            self.fps_samples.pop_front();
        }
    }

    fn average_fps(&self) -> Option<f32> {
        (!self.fps_samples.is_empty())
            .then(|| self.fps_samples.iter().sum::<f32>() / self.fps_samples.len() as f32)
    }
}

impl eframe::App for ExplorerApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        let mut transition = None;
        let mut retry = false;

        match &mut self.state {
            AppState::Loading { rx } => {
                match rx.try_recv() {
                    Ok(Ok(snapshot)) => transition = Some(Ok(snapshot)),
                    Ok(Err(error)) => transition = Some(Err(error)),
                    Err(TryRecvError::Empty) => ctx.request_repaint(),
                    Err(TryRecvError::Disconnected) => {
                        transition = Some(Err("Background load worker disconnected".to_owned()));
                    }
                }

                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.add_space(120.0);
                        ui.heading("Loading graph...");
                        ui.add_space(8.0);
                        ui.spinner();
                    });
                });
            }
            AppState::Error(error) => {
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.heading("Failed to load graph snapshot");
                    ui.add_space(6.0);
                    ui.label(error.as_str());
                    ui.add_space(10.0);
                    retry = ui.button("Retry").clicked();
                });
            }
            AppState::Ready(model) => {
                let mut reload_requested = false;
                let is_reloading = self.reload_rx.is_some();
                model.show(ctx, &mut reload_requested, is_reloading);

                if reload_requested && self.reload_rx.is_none() {
                    self.reload_rx = Some(Self::spawn_load(self.input.clone()));
                }

                if let Some(rx) = self.reload_rx.take() {
                    match rx.try_recv() {
                        Ok(Ok(snapshot)) => model.apply_snapshot(snapshot, false),
                        Ok(Err(error)) => {
                            tracing::warn!(%error, "reload failed; keeping current graph");
                        }
                        Err(TryRecvError::Empty) => {
                            self.reload_rx = Some(rx);
                            ctx.request_repaint();
                        }
                        Err(TryRecvError::Disconnected) => {
                            tracing::warn!("reload worker disconnected");
                        }
                    }
                }
            }
        }

        if retry {
            self.state = AppState::Loading {
                rx: Self::spawn_load(self.input.clone()),
            };
        }

        if let Some(result) = transition {
            self.reload_rx = None;
            self.state = match result {
                Ok(snapshot) => self.ready_state(snapshot),
                Err(error) => {
                    tracing::error!(%error, "failed to load graph snapshot");
                    AppState::Error(error)
                }
            };
        }
    }
}
