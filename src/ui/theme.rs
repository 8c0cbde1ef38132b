//! Theme and styling for the shell window

use egui::{Color32, FontFamily, FontId, Rounding, Stroke, TextStyle, Visuals};

use crate::core::{BackendState, ShellTheme};

/// Shell color palette
pub struct Theme;

impl Theme {
    // Accent - HomeStock teal
    pub const PRIMARY: Color32 = Color32::from_rgb(13, 148, 136); // Teal-600
    pub const PRIMARY_LIGHT: Color32 = Color32::from_rgb(94, 234, 212); // Teal-300
    pub const PRIMARY_DARK: Color32 = Color32::from_rgb(15, 118, 110); // Teal-700

    pub const SUCCESS: Color32 = Color32::from_rgb(16, 185, 129);
    pub const WARNING: Color32 = Color32::from_rgb(245, 158, 11);
    pub const ERROR: Color32 = Color32::from_rgb(244, 63, 94);

    // Dark surfaces
    pub const BG_PRIMARY: Color32 = Color32::from_rgb(17, 17, 27);
    pub const BG_SECONDARY: Color32 = Color32::from_rgb(24, 24, 37);
    pub const BG_TERTIARY: Color32 = Color32::from_rgb(35, 35, 52);
    pub const BG_ELEVATED: Color32 = Color32::from_rgb(30, 30, 45);

    pub const TEXT_MUTED: Color32 = Color32::from_rgb(113, 113, 132);
    pub const BORDER: Color32 = Color32::from_rgb(50, 50, 70);

    pub fn apply(ctx: &egui::Context, theme: ShellTheme) {
        match theme {
            ShellTheme::Dark => Self::apply_dark(ctx),
            ShellTheme::Light => Self::apply_light(ctx),
        }
    }

    pub fn apply_dark(ctx: &egui::Context) {
        let mut visuals = Visuals::dark();
        visuals.panel_fill = Self::BG_PRIMARY;
        visuals.window_fill = Self::BG_ELEVATED;
        visuals.extreme_bg_color = Self::BG_PRIMARY;
        visuals.faint_bg_color = Self::BG_TERTIARY;
        visuals.widgets.noninteractive.bg_fill = Self::BG_SECONDARY;
        visuals.widgets.inactive.bg_fill = Self::BG_TERTIARY;
        visuals.widgets.inactive.bg_stroke = Stroke::new(0.5, Self::BORDER);
        visuals.window_stroke = Stroke::new(0.5, Self::BORDER);
        Self::finish(ctx, visuals);
    }

    pub fn apply_light(ctx: &egui::Context) {
        let mut visuals = Visuals::light();
        visuals.panel_fill = Color32::from_rgb(249, 250, 251);
        visuals.window_fill = Color32::WHITE;
        visuals.extreme_bg_color = Color32::WHITE;
        visuals.faint_bg_color = Color32::from_rgb(243, 244, 246);
        visuals.widgets.inactive.bg_fill = Color32::from_rgb(229, 231, 235);
        visuals.window_stroke = Stroke::new(0.5, Color32::from_rgb(209, 213, 219));
        Self::finish(ctx, visuals);
    }

    /// Settings shared by both themes
    fn finish(ctx: &egui::Context, mut visuals: Visuals) {
        for widget in [
            &mut visuals.widgets.noninteractive,
            &mut visuals.widgets.inactive,
            &mut visuals.widgets.hovered,
            &mut visuals.widgets.active,
            &mut visuals.widgets.open,
        ] {
            widget.rounding = Rounding::same(6.0);
        }
        visuals.widgets.hovered.bg_stroke = Stroke::new(1.0, Self::PRIMARY.linear_multiply(0.6));
        visuals.widgets.active.bg_fill = Self::PRIMARY;
        visuals.widgets.active.fg_stroke = Stroke::new(1.0, Color32::WHITE);
        visuals.widgets.active.bg_stroke = Stroke::new(1.0, Self::PRIMARY_DARK);
        visuals.selection.bg_fill = Self::PRIMARY.linear_multiply(0.25);
        visuals.selection.stroke = Stroke::new(1.0, Self::PRIMARY);
        visuals.window_rounding = Rounding::same(10.0);

        let mut style = (*ctx.style()).clone();
        style.visuals = visuals;
        style.text_styles = [
            (TextStyle::Small, FontId::new(12.0, FontFamily::Proportional)),
            (TextStyle::Body, FontId::new(14.0, FontFamily::Proportional)),
            (TextStyle::Button, FontId::new(14.0, FontFamily::Proportional)),
            (TextStyle::Heading, FontId::new(20.0, FontFamily::Proportional)),
            (TextStyle::Monospace, FontId::new(13.0, FontFamily::Monospace)),
        ]
        .into();
        style.spacing.item_spacing = egui::vec2(8.0, 8.0);
        style.spacing.button_padding = egui::vec2(14.0, 8.0);
        ctx.set_style(style);
    }

    /// Color for a backend lifecycle state
    pub fn state_color(state: BackendState) -> Color32 {
        match state {
            BackendState::Ready => Self::SUCCESS,
            BackendState::Starting => Self::WARNING,
            BackendState::Failed => Self::ERROR,
            BackendState::NotStarted | BackendState::Terminated => Self::TEXT_MUTED,
        }
    }
}

/// Icon characters (using Unicode symbols)
pub struct Icons;

impl Icons {
    pub const REFRESH: &'static str = "↻";
    pub const FOLDER: &'static str = "📁";
    pub const CPU: &'static str = "⚡";
    pub const MEMORY: &'static str = "💾";
    pub const NETWORK: &'static str = "🌐";
    pub const CLOCK: &'static str = "◷";
    pub const CLOSE: &'static str = "✕";
}
