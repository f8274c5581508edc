//! View transform ownership: zoom steps, wheel zoom about a pointer, free pan and
//! fit-to-content, optionally animated.

use eframe::egui::{Pos2, Rect, Vec2, pos2, vec2};

use crate::config::ZoomConfig;

/// Maps world coordinates into viewport-local screen coordinates:
/// `screen = translate + world * scale`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewTransform {
    pub translate: Vec2,
    pub scale: f32,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl ViewTransform {
    pub const IDENTITY: Self = Self {
        translate: Vec2::ZERO,
        scale: 1.0,
    };

    pub fn world_to_screen(&self, world: Vec2) -> Pos2 {
        (self.translate + world * self.scale).to_pos2()
    }

    pub fn screen_to_world(&self, screen: Pos2) -> Vec2 {
        (screen.to_vec2() - self.translate) / self.scale
    }

    pub fn lerp(&self, other: &Self, t: f32) -> Self {
        Self {
            translate: self.translate + (other.translate - self.translate) * t,
            scale: self.scale + (other.scale - self.scale) * t,
        }
    }
}

/// Unlike `f32::clamp` this tolerates an inverted or NaN range: `max_scale` wins.
fn clamp_to_range(scale: f32, config: &ZoomConfig) -> f32 {
    let scale = scale.max(config.min_scale).min(config.max_scale);
    if scale.is_finite() && scale > 0.0 {
        scale
    } else {
        1.0
    }
}

fn ease_cubic_in_out(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0) * 2.0;
    if t <= 1.0 {
        t * t * t / 2.0
    } else {
        let t = t - 2.0;
        (t * t * t + 2.0) / 2.0
    }
}

#[derive(Clone, Copy, Debug)]
struct ZoomAnimation {
    from: ViewTransform,
    to: ViewTransform,
    elapsed: f32,
    duration: f32,
}

type TransformObserver = Box<dyn FnMut(&ViewTransform)>;

pub struct ZoomController {
    config: ZoomConfig,
    viewport: Rect,
    transform: ViewTransform,
    animation: Option<ZoomAnimation>,
    observers: Vec<TransformObserver>,
}

impl std::fmt::Debug for ZoomController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZoomController")
            .field("viewport", &self.viewport)
            .field("transform", &self.transform)
            .field("animating", &self.animation.is_some())
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl ZoomController {
    pub fn new(config: ZoomConfig) -> Self {
        let viewport = Rect::from_min_size(
            Pos2::ZERO,
            vec2(config.viewport_width, config.viewport_height),
        );
        let transform = ViewTransform {
            translate: viewport.size() / 2.0,
            scale: clamp_to_range(1.0, &config),
        };
        Self {
            config,
            viewport,
            transform,
            animation: None,
            observers: Vec::new(),
        }
    }

    pub fn transform(&self) -> ViewTransform {
        self.transform
    }

    pub fn viewport(&self) -> Rect {
        self.viewport
    }

    pub fn is_animating(&self) -> bool {
        self.animation.is_some()
    }

    /// Registers a callback run after every transform change.
    pub fn subscribe(&mut self, observer: impl FnMut(&ViewTransform) + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// The viewport's top-left corner stays where it was in world space.
    pub fn set_viewport(&mut self, viewport: Rect) {
        self.viewport = viewport;
    }

    pub fn world_to_screen(&self, world: Vec2) -> Pos2 {
        self.transform.world_to_screen(world) + self.viewport.min.to_vec2()
    }

    pub fn screen_to_world(&self, screen: Pos2) -> Vec2 {
        self.transform
            .screen_to_world(screen - self.viewport.min.to_vec2())
    }

    pub fn zoom_in(&mut self) {
        self.zoom_at(self.viewport.center(), self.config.step_factor);
    }

    pub fn zoom_out(&mut self) {
        self.zoom_at(self.viewport.center(), 1.0 / self.config.step_factor);
    }

    /// Scales by `factor` keeping the world point under `screen` fixed.
    pub fn zoom_at(&mut self, screen: Pos2, factor: f32) {
        if !factor.is_finite() || factor <= 0.0 {
            return;
        }
        self.animation = None;

        let anchor = screen - self.viewport.min.to_vec2();
        let world = self.transform.screen_to_world(anchor);
        let scale = self.clamp_scale(self.transform.scale * factor);
        self.apply(ViewTransform {
            translate: anchor.to_vec2() - world * scale,
            scale,
        });
    }

    pub fn pan_by(&mut self, delta: Vec2) {
        if !delta.x.is_finite() || !delta.y.is_finite() {
            return;
        }
        self.animation = None;
        self.apply(ViewTransform {
            translate: self.transform.translate + delta,
            scale: self.transform.scale,
        });
    }

    /// Target transform that centers `bounds` with the configured margin.
    pub fn fit_transform(&self, bounds: Rect) -> ViewTransform {
        let size = self.viewport.size();
        let margin = self.config.fit_margin;
        let available = vec2(
            (size.x - 2.0 * margin).max(1.0),
            (size.y - 2.0 * margin).max(1.0),
        );
        let extent = bounds.size();
        let scale_x = if extent.x > f32::EPSILON {
            available.x / extent.x
        } else {
            f32::INFINITY
        };
        let scale_y = if extent.y > f32::EPSILON {
            available.y / extent.y
        } else {
            f32::INFINITY
        };
        let scale = self.clamp_scale(scale_x.min(scale_y));

        ViewTransform {
            translate: size / 2.0 - bounds.center().to_vec2() * scale,
            scale,
        }
    }

    /// Fits `bounds` (world units) into the viewport. `None` bounds leave the view alone.
    pub fn zoom_fit(&mut self, bounds: Option<Rect>, animate: bool) {
        let Some(bounds) = bounds.filter(|bounds| {
            bounds.min.x.is_finite()
                && bounds.min.y.is_finite()
                && bounds.max.x.is_finite()
                && bounds.max.y.is_finite()
        }) else {
            return;
        };
        let target = self.fit_transform(bounds);

        if animate && self.config.animation_seconds > 0.0 {
            self.animation = Some(ZoomAnimation {
                from: self.transform,
                to: target,
                elapsed: 0.0,
                duration: self.config.animation_seconds,
            });
        } else {
            self.animation = None;
            self.apply(target);
        }
    }

    /// Advances a running fit animation by `dt` seconds. Returns whether one is still running.
    pub fn tick(&mut self, dt: f32) -> bool {
        let Some(mut animation) = self.animation.take() else {
            return false;
        };

        animation.elapsed += dt.max(0.0);
        let t = animation.elapsed / animation.duration;
        if t >= 1.0 {
            self.apply(animation.to);
            return false;
        }

        let eased = animation.from.lerp(&animation.to, ease_cubic_in_out(t));
        self.apply(ViewTransform {
            scale: self.clamp_scale(eased.scale),
            ..eased
        });
        self.animation = Some(animation);
        true
    }

    fn clamp_scale(&self, scale: f32) -> f32 {
        if scale.is_nan() {
            return self.transform.scale;
        }
        clamp_to_range(scale, &self.config)
    }

    fn apply(&mut self, transform: ViewTransform) {
        if transform == self.transform {
            return;
        }
        self.transform = transform;
        for observer in &mut self.observers {
            observer(&self.transform);
        }
    }
}

/// Smallest rectangle holding every point, or `None` for no points.
pub fn bounds_of(points: impl IntoIterator<Item = Vec2>) -> Option<Rect> {
    let mut points = points.into_iter().filter(|p| p.x.is_finite() && p.y.is_finite());
    let first = points.next()?;
    let mut rect = Rect::from_min_max(first.to_pos2(), first.to_pos2());
    for point in points {
        rect.extend_with(pos2(point.x, point.y));
    }
    Some(rect)
}
