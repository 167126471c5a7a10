use crate::ops::overlay::{ClickRouter, LabelGeometry, SegmentOverlay};
use eframe::egui;

const LABEL_TEXT_COLOR: egui::Color32 = egui::Color32::from_rgb(0x1e, 0x1b, 0x4b);
const LABEL_FONT_SIZE: f32 = 11.0;
/// Narrowest hover target, so zero-width labels still show their text.
const MIN_HOVER_WIDTH: f32 = 6.0;

/// Screen rect of a label whose layer origin sits at `band.left() - scroll_offset`.
pub fn label_rect(band: egui::Rect, label: &LabelGeometry, scroll_offset: f32) -> egui::Rect {
    let left = band.left() - scroll_offset + label.left_px as f32;
    egui::Rect::from_min_size(
        egui::pos2(left, band.top()),
        egui::vec2(label.width_px as f32, band.height()),
    )
}

/// Hover target for a label: its own rect, widened around its left edge when
/// it is narrower than [`MIN_HOVER_WIDTH`].
pub fn hover_rect(rect: egui::Rect) -> egui::Rect {
    if rect.width() >= MIN_HOVER_WIDTH {
        return rect;
    }
    egui::Rect::from_min_max(
        egui::pos2(rect.left() - MIN_HOVER_WIDTH / 2.0, rect.top()),
        egui::pos2(rect.left() + MIN_HOVER_WIDTH / 2.0, rect.bottom()),
    )
}

/// Paint the label layer over `band` and route label clicks.
///
/// The layer is not part of the waveform's scroll content; it is shifted by
/// the synchronised scroll offset instead.
pub fn paint_labels(
    ui: &mut egui::Ui,
    band: egui::Rect,
    labels: &[LabelGeometry],
    scroll_offset: f32,
    overlay: &SegmentOverlay,
    router: &mut ClickRouter,
) {
    let painter = ui.painter_at(band);
    let border = egui::Stroke::new(2.0, egui::Color32::from_white_alpha(230));
    let chip_fill = egui::Color32::from_white_alpha(178);

    for label in labels {
        let rect = label_rect(band, label, scroll_offset);
        if rect.right() < band.left() || rect.left() > band.right() {
            continue;
        }
        painter.line_segment([rect.left_top(), rect.left_bottom()], border);

        let galley = painter.layout_no_wrap(
            label.text.clone(),
            egui::FontId::proportional(LABEL_FONT_SIZE),
            LABEL_TEXT_COLOR,
        );
        let text_pos = rect.left_top() + egui::vec2(4.0, 2.0);
        let chip = egui::Rect::from_min_size(text_pos, galley.size()).expand2(egui::vec2(3.0, 1.0));
        painter.rect_filled(chip, 2.0, chip_fill);
        painter.galley(text_pos, galley, LABEL_TEXT_COLOR);

        let Some(region) = overlay.region(label.index) else {
            continue;
        };
        let hit = hover_rect(rect).intersect(band);
        if !hit.is_positive() {
            continue;
        }
        // Degenerate labels only get the hover text.
        let sense = if label.clickable {
            egui::Sense::click()
        } else {
            egui::Sense::hover()
        };
        let response = ui
            .interact(hit, ui.id().with(region.id.as_str()), sense)
            .on_hover_text(label.text.as_str());
        if label.clickable && response.clicked() {
            router.segment_clicked(region);
        }
    }
}
