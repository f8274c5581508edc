use eframe::egui::{self, Align2, Color32, FontId, PointerButton, Sense, Stroke, Ui};

use super::ViewModel;
use super::render_utils::{
    circle_visible, draw_background, edge_shape, edge_stroke, edge_visible, label_offset,
    node_color, screen_radius,
};

const LABEL_MIN_SCALE: f32 = 0.6;

impl ViewModel {
    fn handle_zoom(&mut self, ui: &Ui, response: &egui::Response) {
        if !response.hovered() {
            return;
        }

        let scroll = ui.input(|input| input.raw_scroll_delta.y);
        if scroll.abs() <= f32::EPSILON {
            return;
        }

        let pointer = ui
            .input(|input| input.pointer.hover_pos())
            .unwrap_or_else(|| response.rect.center());
        let factor = (1.0 + (scroll * 0.0018)).clamp(0.85, 1.15);
        self.engine.zoom_at(pointer, factor);
    }

    fn handle_pan(&mut self, response: &egui::Response) {
        if response.dragged_by(PointerButton::Secondary)
            || response.dragged_by(PointerButton::Middle)
        {
            self.engine.pan_by(response.drag_delta());
        }
    }

    fn handle_node_drag(&mut self, response: &egui::Response) {
        let Some(pointer) = response.interact_pointer_pos() else {
            if response.drag_stopped() {
                self.engine.end_drag();
            }
            return;
        };
        let world = self.engine.zoom().screen_to_world(pointer);

        if response.drag_started_by(PointerButton::Primary) {
            if let Some(node_id) = self.engine.node_at(world) {
                self.engine.begin_drag(&node_id, world);
            }
        } else if response.dragged_by(PointerButton::Primary) {
            self.engine.drag_to(world);
        }

        if response.drag_stopped() {
            self.engine.end_drag();
        }
    }

    fn handle_click(&mut self, response: &egui::Response) {
        if !response.clicked_by(PointerButton::Primary) {
            return;
        }
        if let Some(node_id) = response
            .interact_pointer_pos()
            .and_then(|pointer| self.engine.node_at_screen(pointer))
        {
            self.engine.click_node(&node_id);
        }
    }

    pub(super) fn draw_graph(&mut self, ui: &mut Ui) {
        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        self.engine.set_viewport(rect);
        if self.needs_fit {
            self.engine.zoom_fit(false);
            self.needs_fit = false;
        }

        self.handle_zoom(ui, &response);
        self.handle_pan(&response);
        self.handle_node_drag(&response);
        self.handle_click(&response);

        let dt = ui.input(|input| input.stable_dt);
        if self.engine.tick(dt) {
            ui.ctx().request_repaint();
        }

        self.frame = self.engine.frame();
        let frame = &self.frame;
        let zoom = self.engine.zoom();
        let scale = frame.transform.scale;
        let orientation = self.engine.config().tree.orientation;
        let painter = ui.painter_at(rect);

        draw_background(&painter, rect, zoom.world_to_screen(egui::Vec2::ZERO), scale);

        for edge in &frame.edges {
            let from = zoom.world_to_screen(edge.from);
            let to = zoom.world_to_screen(edge.to);
            if !edge_visible(rect, from, to, 24.0) {
                continue;
            }
            let stroke = edge_stroke(edge.kind, edge.weight, scale);
            painter.add(edge_shape(from, to, edge.shape, orientation, stroke));
        }

        let hovered = response
            .hover_pos()
            .and_then(|pointer| frame.node_at(zoom.screen_to_world(pointer)))
            .map(|node| node.id.as_str());

        // Hierarchy first so free nodes stay on top.
        let draw_order = frame
            .nodes
            .iter()
            .filter(|node| node.in_hierarchy)
            .chain(frame.nodes.iter().filter(|node| !node.in_hierarchy));
        for node in draw_order {
            let center = zoom.world_to_screen(node.position);
            let radius = screen_radius(node.radius, scale);
            if !circle_visible(rect, center, radius) {
                continue;
            }

            painter.circle_filled(center, radius, node_color(node));
            if hovered == Some(node.id.as_str()) {
                painter.circle_stroke(center, radius + 2.0, Stroke::new(1.5, Color32::WHITE));
            }

            if scale >= LABEL_MIN_SCALE || hovered == Some(node.id.as_str()) {
                painter.text(
                    center + label_offset(radius),
                    Align2::LEFT_CENTER,
                    &node.label,
                    FontId::proportional(12.0),
                    Color32::from_rgb(210, 218, 228),
                );
            }
        }
    }
}
