use crate::types::timeline::TimelineInput;
use crate::ui::timeline_view::TimelineView;
use eframe::egui;

pub struct AppState {
    pub input: TimelineInput,
    /// Where the segments came from, for the header line.
    pub transcript_name: Option<String>,
    pub timeline: TimelineView,
}

pub struct AlignViewApp {
    pub state: AppState,
}

impl AlignViewApp {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

/// "Audio: … • Transcript: …" header text.
pub fn source_summary(input: &TimelineInput, transcript_name: Option<&str>) -> String {
    let audio = input.audio_url.as_deref().unwrap_or("none");
    let transcript = match transcript_name {
        Some(name) => format!("{} ({} segments)", name, input.segments.len()),
        None => "none".to_string(),
    };
    format!("Audio: {} • Transcript: {}", audio, transcript)
}

impl eframe::App for AlignViewApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::CentralPanel::default().show(ctx, |ui| {
            if self.state.input.audio_url.is_none() {
                ui.centered_and_justified(|ui| {
                    ui.label("Please load an audio source to begin");
                });
                return;
            }

            ui.label(source_summary(
                &self.state.input,
                self.state.transcript_name.as_deref(),
            ));
            ui.separator();
            self.state.timeline.show(ui, &self.state.input);
        });
    }
}
