use eframe::egui::epaint::{CubicBezierShape, QuadraticBezierShape};
use eframe::egui::{Color32, Painter, Pos2, Rect, Shape, Stroke, Vec2, vec2};
use explore_graph::{Authority, EdgeKind, LinkShape, NodePlacement, TreeOrientation};

pub(super) fn blend_color(base: Color32, overlay: Color32, amount: f32) -> Color32 {
    let amount = amount.clamp(0.0, 1.0);
    let inverse = 1.0 - amount;

    Color32::from_rgba_unmultiplied(
        ((base.r() as f32 * inverse) + (overlay.r() as f32 * amount)) as u8,
        ((base.g() as f32 * inverse) + (overlay.g() as f32 * amount)) as u8,
        ((base.b() as f32 * inverse) + (overlay.b() as f32 * amount)) as u8,
        ((base.a() as f32 * inverse) + (overlay.a() as f32 * amount)) as u8,
    )
}

/// Grid anchored at the world origin so it moves with pan and zoom.
pub(super) fn draw_background(painter: &Painter, rect: Rect, origin: Pos2, scale: f32) {
    painter.rect_filled(rect, 0.0, Color32::from_rgb(19, 23, 29));

    let step = (56.0 * scale.clamp(0.6, 1.8)).max(20.0);
    let stroke = Stroke::new(1.0, Color32::from_rgba_unmultiplied(60, 70, 80, 70));

    let mut x = rect.left() + (origin.x - rect.left()).rem_euclid(step);
    while x < rect.right() {
        painter.line_segment([Pos2::new(x, rect.top()), Pos2::new(x, rect.bottom())], stroke);
        x += step;
    }

    let mut y = rect.top() + (origin.y - rect.top()).rem_euclid(step);
    while y < rect.bottom() {
        painter.line_segment([Pos2::new(rect.left(), y), Pos2::new(rect.right(), y)], stroke);
        y += step;
    }
}

pub(super) fn circle_visible(rect: Rect, position: Pos2, radius: f32) -> bool {
    rect.expand(radius).contains(position)
}

/// Cheap reject for edges whose bounding box misses the viewport.
pub(super) fn edge_visible(rect: Rect, start: Pos2, end: Pos2, padding: f32) -> bool {
    Rect::from_two_pos(start, end)
        .expand(padding)
        .intersects(rect)
}

pub(super) fn node_color(node: &NodePlacement) -> Color32 {
    let base = if node.in_hierarchy {
        Color32::from_rgb(88, 166, 255)
    } else {
        Color32::from_rgb(240, 173, 78)
    };
    match node.authority {
        Authority::Dragged => blend_color(base, Color32::WHITE, 0.45),
        Authority::Fallback => blend_color(base, Color32::GRAY, 0.6),
        Authority::Tree | Authority::Simulation => base,
    }
}

pub(super) fn edge_stroke(kind: EdgeKind, weight: Option<f32>, scale: f32) -> Stroke {
    let width = (weight.unwrap_or(1.0).clamp(0.5, 4.0) * scale.sqrt()).clamp(0.6, 4.5);
    let color = match kind {
        EdgeKind::TreeLink => Color32::from_rgba_unmultiplied(140, 150, 165, 160),
        EdgeKind::WithinHierarchy => Color32::from_rgba_unmultiplied(120, 200, 170, 170),
        EdgeKind::Outside => Color32::from_rgba_unmultiplied(240, 173, 78, 150),
    };
    Stroke::new(width, color)
}

/// Arc bulging to the side of the chord, or a cubic leaving both ends along the depth axis.
pub(super) fn edge_shape(
    from: Pos2,
    to: Pos2,
    shape: LinkShape,
    orientation: TreeOrientation,
    stroke: Stroke,
) -> Shape {
    match shape {
        LinkShape::Arc => {
            let chord = to - from;
            let normal = vec2(-chord.y, chord.x) * 0.25;
            let control = from + chord * 0.5 + normal;
            QuadraticBezierShape::from_points_stroke(
                [from, control, to],
                false,
                Color32::TRANSPARENT,
                stroke,
            )
            .into()
        }
        LinkShape::Curve => {
            let (c1, c2) = match orientation {
                TreeOrientation::Horizontal => {
                    let mid = (from.x + to.x) / 2.0;
                    (Pos2::new(mid, from.y), Pos2::new(mid, to.y))
                }
                TreeOrientation::Vertical => {
                    let mid = (from.y + to.y) / 2.0;
                    (Pos2::new(from.x, mid), Pos2::new(to.x, mid))
                }
            };
            CubicBezierShape::from_points_stroke(
                [from, c1, c2, to],
                false,
                Color32::TRANSPARENT,
                stroke,
            )
            .into()
        }
    }
}

pub(super) fn screen_radius(radius: f32, scale: f32) -> f32 {
    (radius * scale).clamp(2.5, 46.0)
}

pub(super) fn label_offset(radius: f32) -> Vec2 {
    vec2(radius + 4.0, 0.0)
}
