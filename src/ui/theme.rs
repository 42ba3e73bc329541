use egui::epaint::text::{FontInsert, FontPriority, InsertFontFamily};
use egui::style::{Selection, Visuals, WidgetVisuals, Widgets};
use egui::{Color32, FontData, FontFamily, FontId, Rounding, Stroke, Style, TextStyle, ThemePreference};

use crate::profile::Theme;

/// Fonts tried in order for Hangul glyphs, which egui's bundled fonts lack.
const KOREAN_FONT_PATHS: &[&str] = &[
    "/usr/share/fonts/truetype/nanum/NanumGothic.ttf",
    "/usr/share/fonts/nanum/NanumGothic.ttf",
    "/usr/share/fonts/opentype/noto/NotoSansCJK-Regular.ttc",
    "/usr/share/fonts/noto-cjk/NotoSansCJK-Regular.ttc",
    "C:\\Windows\\Fonts\\malgun.ttf",
    "/System/Library/Fonts/AppleSDGothicNeo.ttc",
    "/Library/Fonts/AppleGothic.ttf",
];

pub fn install_korean_font(ctx: &egui::Context) {
    let found = KOREAN_FONT_PATHS
        .iter()
        .find_map(|path| std::fs::read(path).ok().map(|bytes| (*path, bytes)));
    let Some((path, bytes)) = found else {
        log::warn!("no Korean font found; Hangul will render as boxes");
        return;
    };
    log::info!("using {path} for Hangul");
    ctx.add_font(FontInsert::new(
        "korean",
        FontData::from_owned(bytes),
        vec![
            InsertFontFamily {
                family: FontFamily::Proportional,
                priority: FontPriority::Lowest,
            },
            InsertFontFamily {
                family: FontFamily::Monospace,
                priority: FontPriority::Lowest,
            },
        ],
    ));
}

/// Install both styles and pick one. `System` follows the OS setting.
pub fn apply(ctx: &egui::Context, theme: Theme) {
    ctx.set_style_of(egui::Theme::Dark, dark_style(ctx));
    ctx.set_style_of(egui::Theme::Light, light_style(ctx));
    ctx.set_theme(match theme {
        Theme::Light => ThemePreference::Light,
        Theme::Dark => ThemePreference::Dark,
        Theme::System => ThemePreference::System,
    });
}

fn text_styles(style: &mut Style) {
    style.text_styles = [
        (TextStyle::Heading, FontId::new(22.0, FontFamily::Proportional)),
        (TextStyle::Body, FontId::new(15.0, FontFamily::Proportional)),
        (TextStyle::Monospace, FontId::new(14.0, FontFamily::Monospace)),
        (TextStyle::Button, FontId::new(15.0, FontFamily::Proportional)),
        (TextStyle::Small, FontId::new(12.0, FontFamily::Proportional)),
    ]
    .into();
}

pub fn dark_style(ctx: &egui::Context) -> Style {
    let mut style = (*ctx.style_of(egui::Theme::Dark)).clone();
    text_styles(&mut style);

    let primary_bg_color = Color32::from_rgb(32, 33, 36);

    style.visuals = Visuals::dark();
    style.visuals.override_text_color = Some(Color32::LIGHT_GRAY);
    style.visuals.widgets = Widgets {
        noninteractive: WidgetVisuals {
            bg_fill: primary_bg_color,
            bg_stroke: Stroke::new(1.0, Color32::from_gray(60)),
            fg_stroke: Stroke::new(1.0, Color32::LIGHT_GRAY),
            rounding: Rounding::same(4.0),
            weak_bg_fill: Color32::from_gray(32),
            expansion: 0.0,
        },
        inactive: WidgetVisuals {
            bg_fill: primary_bg_color,
            bg_stroke: Stroke::new(1.0, Color32::from_gray(75)),
            fg_stroke: Stroke::new(1.0, Color32::LIGHT_GRAY),
            rounding: Rounding::same(4.0),
            weak_bg_fill: Color32::from_gray(45),
            expansion: 0.0,
        },
        hovered: WidgetVisuals {
            bg_fill: Color32::from_rgb(50, 50, 50),
            bg_stroke: Stroke::new(1.0, Color32::WHITE),
            fg_stroke: Stroke::new(1.0, Color32::WHITE),
            rounding: Rounding::same(4.0),
            weak_bg_fill: Color32::from_gray(55),
            expansion: 0.5,
        },
        active: WidgetVisuals {
            bg_fill: Color32::from_rgb(60, 60, 60),
            bg_stroke: Stroke::new(1.0, Color32::WHITE),
            fg_stroke: Stroke::new(1.0, Color32::WHITE),
            rounding: Rounding::same(4.0),
            weak_bg_fill: Color32::from_gray(65),
            expansion: 2.0,
        },
        open: WidgetVisuals {
            bg_fill: Color32::from_rgb(40, 40, 40),
            bg_stroke: Stroke::new(1.0, Color32::WHITE),
            fg_stroke: Stroke::new(1.0, Color32::WHITE),
            rounding: Rounding::same(4.0),
            weak_bg_fill: Color32::from_gray(40),
            expansion: 0.0,
        },
    };

    style.visuals.selection = Selection {
        bg_fill: Color32::from_rgb(37, 99, 235),
        stroke: Stroke::new(1.0, Color32::WHITE),
    };

    style.visuals.window_rounding = Rounding::same(6.0);
    style.visuals.window_shadow = egui::Shadow {
        offset: egui::vec2(0.0, 1.0),
        blur: 3.0,
        spread: 0.0,
        color: Color32::from_black_alpha(128),
    };
    style.visuals.window_fill = primary_bg_color;
    style.visuals.window_stroke = Stroke::new(1.0, Color32::from_gray(60));
    style.visuals.panel_fill = primary_bg_color;

    style.spacing.window_margin = egui::Margin::same(8.0);
    style.spacing.button_padding = egui::vec2(6.0, 3.0);

    style
}

pub fn light_style(ctx: &egui::Context) -> Style {
    let mut style = (*ctx.style_of(egui::Theme::Light)).clone();
    text_styles(&mut style);

    style.visuals = Visuals::light();
    style.visuals.selection = Selection {
        bg_fill: Color32::from_rgb(191, 219, 254),
        stroke: Stroke::new(1.0, Color32::from_rgb(29, 78, 216)),
    };
    style.visuals.window_rounding = Rounding::same(6.0);
    style.visuals.window_shadow = egui::Shadow {
        offset: egui::vec2(0.0, 1.0),
        blur: 6.0,
        spread: 0.0,
        color: Color32::from_black_alpha(40),
    };
    style.visuals.window_stroke = Stroke::new(1.0, Color32::from_gray(210));

    style.spacing.window_margin = egui::Margin::same(8.0);
    style.spacing.button_padding = egui::vec2(6.0, 3.0);

    style
}
