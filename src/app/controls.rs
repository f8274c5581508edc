use eframe::egui::{self, Align, Layout, Ui};

use super::ViewModel;

impl ViewModel {
    pub(super) fn draw_controls(
        &mut self,
        ui: &mut Ui,
        reload_requested: &mut bool,
        is_loading: bool,
    ) {
        let stats = self.frame.stats;

        ui.horizontal(|ui| {
            ui.heading("explore-graph");
            ui.separator();

            if ui.button("Zoom in").clicked() {
                self.engine.zoom_in();
            }
            if ui.button("Zoom out").clicked() {
                self.engine.zoom_out();
            }
            if ui.button("Fit").clicked() {
                self.engine.zoom_fit(true);
            }
            ui.separator();

            if ui.checkbox(&mut self.show_links, "Show links").changed() {
                let flags = self.flags(is_loading);
                self.engine.set_flags(flags);
            }
            let reload_button = ui.add_enabled(!is_loading, egui::Button::new("Reload"));
            if reload_button.clicked() {
                *reload_requested = true;
            }
            if is_loading {
                ui.spinner();
            }

            if let Some(node_id) = self.clicked.borrow().as_deref() {
                ui.separator();
                ui.label(format!("last clicked: {node_id}"));
            }

            ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                if let Some(fps) = self.average_fps() {
                    ui.label(format!("FPS {fps:.0}"));
                }
                ui.label(format!(
                    "nodes: {} | edges: {} | dropped: {} | alpha {:.3}{}",
                    stats.nodes,
                    stats.edges,
                    stats.dropped_edges,
                    stats.alpha,
                    if stats.settled { " (settled)" } else { "" },
                ));
                ui.label(format!("zoom {:.2}x", self.engine.zoom().transform().scale));
            });
        });
    }
}
