//! Backend state badge

use egui::{Response, Rounding, Ui, Vec2};

use crate::core::BackendState;
use crate::ui::theme::Theme;

pub struct StatusBadge;

impl StatusBadge {
    /// Pill with a colored dot and the state name
    pub fn show(ui: &mut Ui, state: BackendState) -> Response {
        let color = Theme::state_color(state);
        let (rect, response) = ui.allocate_exact_size(Vec2::new(110.0, 26.0), egui::Sense::hover());

        if ui.is_rect_visible(rect) {
            let painter = ui.painter();
            painter.rect_filled(rect, Rounding::same(13.0), color.linear_multiply(0.15));
            painter.rect_stroke(
                rect,
                Rounding::same(13.0),
                egui::Stroke::new(1.0, color.linear_multiply(0.3)),
            );

            let dot_center = rect.left_center() + Vec2::new(14.0, 0.0);
            if state.allows_ui() {
                painter.circle_filled(dot_center, 6.0, color.linear_multiply(0.3));
            }
            painter.circle_filled(dot_center, 4.0, color);

            painter.text(
                rect.center() + Vec2::new(8.0, 0.0),
                egui::Align2::CENTER_CENTER,
                state.label(),
                egui::FontId::proportional(12.0),
                color,
            );
        }

        response
    }

    /// Small liveness dot with hover text
    pub fn dot(ui: &mut Ui, alive: bool) -> Response {
        let color = if alive { Theme::SUCCESS } else { Theme::ERROR };
        let (rect, response) = ui.allocate_exact_size(Vec2::new(14.0, 14.0), egui::Sense::hover());
        if ui.is_rect_visible(rect) {
            ui.painter().circle_filled(rect.center(), 5.0, color);
        }
        response.on_hover_text(if alive { "Process running" } else { "Process exited" })
    }
}
