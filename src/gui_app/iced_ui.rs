use std::path::PathBuf;
use std::sync::Arc;

use bytesize::ByteSize;
use iced::widget::canvas::{self, Canvas};
use iced::widget::{Column, button, column, container, row, scrollable, stack, text, text_input};
use iced::{Color, ContentFit, Element, Length, Size, Task, Theme, window};
use tracing::{debug, info, warn};

use crate::analysis::{AnalysisOutcome, ResultSlot, ResultView, run_analysis};
use crate::browser::FileBrowser;
use crate::config::Settings;
use crate::imaging::{LoadedStudy, RoiCrops, extract_roi_crops, load_study};
use crate::inference::{CommandClassifier, KneeClassifier};
use crate::roi::{DragUpdate, RoiSession};
use crate::scratch::ScratchDir;

use super::overlay::{PointerEvent, RoiOverlay};

type ImageHandle = iced::widget::image::Handle;

pub fn run_iced_app(settings: Settings) -> iced::Result {
    let size = Size::new(settings.window_width, settings.window_height);
    iced::application("Knee X-ray Review", ReviewApp::update, ReviewApp::view)
        .theme(ReviewApp::theme)
        .window(window::Settings {
            size,
            ..Default::default()
        })
        .run_with(move || ReviewApp::new(settings))
}

struct ReviewApp {
    settings: Settings,
    browser: FileBrowser,
    study: Option<LoadedStudy>,
    study_handle: Option<ImageHandle>,
    session: RoiSession,
    roi_visible: bool,
    overlay_cache: canvas::Cache,
    scratch: Option<ScratchDir>,
    classifier: Option<Arc<dyn KneeClassifier>>,
    results: Option<ResultView<ImageHandle>>,
    status_text: String,
    is_loading: bool,
    is_processing: bool,
    /// Bumped whenever a different study starts loading; analyses carry the
    /// value they started with.
    study_generation: u64,
}

#[derive(Debug, Clone)]
enum Message {
    OpenFolderPressed,
    FolderPicked(Option<PathBuf>),
    FilterChanged(String),
    FileSelected(usize),
    NextFile,
    PreviousFile,
    StudyLoaded(Result<LoadedStudy, String>),
    ShowRoiPressed,
    ResetRoiPressed,
    ProcessPressed,
    AnalysisFinished(u64, Result<AnalysisDisplay, String>),
    Pointer(PointerEvent),
}

#[derive(Debug, Clone)]
struct AnalysisDisplay {
    outcome: AnalysisOutcome,
    view: ResultView<ImageHandle>,
}

impl ReviewApp {
    fn new(settings: Settings) -> (Self, Task<Message>) {
        let mut status_text = "Open a folder of DICOM studies to begin".to_string();

        let scratch = match ScratchDir::open(&settings.scratch_dir) {
            Ok(scratch) => Some(scratch),
            Err(err) => {
                warn!(error = %err, "scratch directory unavailable; processing disabled");
                status_text = format!("Scratch directory unavailable: {err}");
                None
            }
        };

        let classifier = settings.classifier.clone().map(|command| {
            Arc::new(CommandClassifier::new(command, &settings.scratch_dir)) as Arc<dyn KneeClassifier>
        });
        if classifier.is_none() {
            info!("no classifier configured; Process will be unavailable");
        }

        (
            ReviewApp {
                session: RoiSession::new(settings.roi_box_size()),
                settings,
                browser: FileBrowser::default(),
                study: None,
                study_handle: None,
                roi_visible: false,
                overlay_cache: canvas::Cache::default(),
                scratch,
                classifier,
                results: None,
                status_text,
                is_loading: false,
                is_processing: false,
                study_generation: 0,
            },
            Task::none(),
        )
    }

    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::OpenFolderPressed => {
                let dialog = rfd::AsyncFileDialog::new()
                    .set_title("Select directory")
                    .set_directory(&self.settings.browse_start)
                    .pick_folder();

                Task::perform(dialog, |result| {
                    Message::FolderPicked(result.map(|folder| folder.path().to_path_buf()))
                })
            }
            Message::FolderPicked(Some(dir)) => {
                match self.browser.open(&dir) {
                    Ok(0) => self.status_text = format!("No DICOM files in {}", dir.display()),
                    Ok(count) => self.status_text = format!("{count} studies in {}", dir.display()),
                    Err(err) => {
                        warn!(error = %err, "directory listing failed");
                        self.status_text = err.to_string();
                    }
                }
                Task::none()
            }
            Message::FolderPicked(None) => Task::none(),
            Message::FilterChanged(query) => {
                self.browser.set_filter(&query);
                Task::none()
            }
            Message::FileSelected(index) => {
                if !self.can_switch_study() {
                    return Task::none();
                }
                let path = self.browser.select(index).map(|entry| entry.path.clone());
                self.display_study(path)
            }
            Message::NextFile => {
                if !self.can_switch_study() {
                    return Task::none();
                }
                let path = self.browser.next().map(|entry| entry.path.clone());
                self.display_study(path)
            }
            Message::PreviousFile => {
                if !self.can_switch_study() {
                    return Task::none();
                }
                let path = self.browser.previous().map(|entry| entry.path.clone());
                self.display_study(path)
            }
            Message::StudyLoaded(Ok(study)) => {
                self.session.load_image(study.geometry());
                self.study_handle = Some(ImageHandle::from_rgba(
                    study.image.width(),
                    study.image.height(),
                    study.display_rgba(),
                ));
                self.status_text = format!(
                    "Loaded {} ({}x{})",
                    study.file_name(),
                    study.image.width(),
                    study.image.height()
                );
                self.study = Some(study);
                self.roi_visible = false;
                self.is_loading = false;
                self.overlay_cache.clear();
                Task::none()
            }
            Message::StudyLoaded(Err(error)) => {
                warn!(%error, "study failed to load");
                self.status_text = format!("Failed to load study: {error}");
                self.is_loading = false;
                Task::none()
            }
            Message::ShowRoiPressed => {
                match self.session.boxes() {
                    Ok(_) => {
                        self.roi_visible = true;
                        self.status_text = "Drag the L/M squares onto the joint, then Process".to_string();
                    }
                    Err(err) => {
                        debug!(error = %err, "ROI requested without an image");
                        self.status_text = "Load a study before selecting the ROI".to_string();
                    }
                }
                self.overlay_cache.clear();
                Task::none()
            }
            Message::ResetRoiPressed => {
                self.session.invalidate();
                if self.roi_visible && let Err(err) = self.session.boxes() {
                    debug!(error = %err, "ROI reset without an image");
                }
                self.overlay_cache.clear();
                Task::none()
            }
            Message::ProcessPressed => self.process(),
            Message::AnalysisFinished(generation, _) if generation != self.study_generation => {
                debug!(generation, current = self.study_generation, "dropping stale analysis");
                self.is_processing = false;
                Task::none()
            }
            Message::AnalysisFinished(_, Ok(display)) => {
                self.is_processing = false;
                self.status_text = describe_outcome(&display.outcome);
                self.results = Some(display.view);
                Task::none()
            }
            Message::AnalysisFinished(_, Err(error)) => {
                self.is_processing = false;
                warn!(%error, "analysis failed");
                self.status_text = format!("Analysis failed: {error}");
                Task::none()
            }
            Message::Pointer(event) => {
                self.handle_pointer(event);
                Task::none()
            }
        }
    }

    /// A load or an analysis in flight pins the current study, including the
    /// browser highlight.
    fn can_switch_study(&mut self) -> bool {
        if self.is_processing {
            self.status_text = "Wait for the analysis to finish before switching studies".to_string();
            return false;
        }
        if self.is_loading {
            self.status_text = "Still loading the previous study".to_string();
            return false;
        }
        true
    }

    /// Starts loading `path`; stale artifacts and results go first.
    fn display_study(&mut self, path: Option<PathBuf>) -> Task<Message> {
        let Some(path) = path else {
            return Task::none();
        };

        self.study_generation += 1;
        self.clear_artifacts();
        self.session.invalidate();
        self.overlay_cache.clear();
        self.is_loading = true;
        self.status_text = format!("Loading {}...", path.display());
        Task::perform(load_study_task(path), Message::StudyLoaded)
    }

    fn clear_artifacts(&mut self) {
        self.results = None;
        if let Some(scratch) = &self.scratch {
            scratch.clear_or_log();
        }
    }

    fn process(&mut self) -> Task<Message> {
        if self.is_processing || self.is_loading {
            return Task::none();
        }
        let Some(study) = &self.study else {
            self.status_text = "Load a study before processing".to_string();
            return Task::none();
        };
        let (Some(scratch), Some(classifier)) = (self.scratch.clone(), self.classifier.clone()) else {
            self.status_text = "No classifier configured; set [classifier] in the config file".to_string();
            return Task::none();
        };

        let pair = match self.session.boxes() {
            Ok(pair) => pair,
            Err(err) => {
                debug!(error = %err, "process without ROI");
                return Task::none();
            }
        };
        let crops = extract_roi_crops(&study.image, &pair);
        let source_name = study.file_name();

        self.clear_artifacts();
        self.roi_visible = true;
        self.overlay_cache.clear();
        self.is_processing = true;
        self.status_text = format!("Analyzing {source_name}...");

        let generation = self.study_generation;
        Task::perform(
            analysis_task(source_name, crops, scratch, classifier),
            move |result| Message::AnalysisFinished(generation, result),
        )
    }

    fn handle_pointer(&mut self, event: PointerEvent) {
        let update = match event {
            PointerEvent::Pressed { position, bounds } => self.session.pointer_down(
                PointerEvent::display_point(position),
                PointerEvent::widget_size(bounds),
            ),
            PointerEvent::Moved { position, bounds } => self.session.pointer_move(
                PointerEvent::display_point(position),
                PointerEvent::widget_size(bounds),
            ),
            PointerEvent::Released => {
                self.session.pointer_up();
                Ok(DragUpdate::Unchanged)
            }
        };

        match update {
            Ok(DragUpdate::Started(_) | DragUpdate::Moved(..)) => self.overlay_cache.clear(),
            Ok(DragUpdate::Unchanged) => {}
            Err(err) => debug!(error = %err, "pointer event ignored"),
        }
    }

    fn view(&self) -> Element<'_, Message> {
        let layout = row![self.files_section(), self.viewer_section(), self.results_section()]
            .spacing(0)
            .height(Length::Fill);

        column![layout, self.controls_section()].into()
    }

    fn files_section(&self) -> Element<'_, Message> {
        let open_button = button(text("Open Folder")).on_press(Message::OpenFolderPressed).width(Length::Fill);

        let search = text_input("Search", self.browser.filter())
            .on_input(Message::FilterChanged)
            .size(14);

        let navigation = row![
            button(text("<")).on_press(Message::PreviousFile).width(Length::Fill),
            button(text(">")).on_press(Message::NextFile).width(Length::Fill),
        ]
        .spacing(8);

        let entries = self.browser.entries();
        let selected = self.browser.selected_index();
        let files = Column::with_children(self.browser.visible().into_iter().map(|index| {
            let entry = &entries[index];
            let label = format!("{}  ({})", entry.name, ByteSize::b(entry.size_bytes));
            let style = if selected == Some(index) {
                button::primary
            } else {
                button::secondary
            };
            button(text(label).size(13))
                .on_press(Message::FileSelected(index))
                .width(Length::Fill)
                .style(style)
                .into()
        }))
        .spacing(2);

        container(
            column![open_button, search, navigation, scrollable(files).height(Length::Fill)]
                .spacing(12)
                .width(Length::Fill),
        )
        .width(Length::Fixed(260.0))
        .height(Length::Fill)
        .padding(12)
        .style(|_| container::Style {
            background: Some(Color::from_rgb8(32, 32, 32).into()),
            ..Default::default()
        })
        .into()
    }

    fn viewer_section(&self) -> Element<'_, Message> {
        let content: Element<'_, Message> = match &self.study_handle {
            Some(handle) => {
                let picture = iced::widget::image(handle.clone())
                    .content_fit(ContentFit::Fill)
                    .width(Length::Fill)
                    .height(Length::Fill);

                let overlay = Canvas::new(RoiOverlay {
                    session: &self.session,
                    visible: self.roi_visible,
                    cache: &self.overlay_cache,
                    on_pointer: Message::Pointer,
                })
                .width(Length::Fill)
                .height(Length::Fill);

                stack![picture, overlay].into()
            }
            None => container(text("No image loaded").size(14))
                .center(Length::Fill)
                .into(),
        };

        container(content)
            .width(Length::Fill)
            .height(Length::Fill)
            .clip(true)
            .style(|_| container::Style {
                background: Some(Color::from_rgb8(18, 18, 18).into()),
                ..Default::default()
            })
            .into()
    }

    fn results_section(&self) -> Element<'_, Message> {
        let body: Element<'_, Message> = match &self.results {
            None => text("Results appear here after processing").size(12).into(),
            Some(ResultView::Single(slot)) => result_column("Result", slot),
            Some(ResultView::Bilateral { right, left }) => {
                row![result_column("Right", right), result_column("Left", left)]
                    .spacing(8)
                    .into()
            }
        };

        container(scrollable(body))
            .width(Length::Fixed(380.0))
            .height(Length::Fill)
            .padding(12)
            .style(|_| container::Style {
                background: Some(Color::from_rgb8(32, 32, 32).into()),
                ..Default::default()
            })
            .into()
    }

    fn controls_section(&self) -> Element<'_, Message> {
        let roi_button = button(text("Select ROI")).on_press(Message::ShowRoiPressed);
        let reset_button = button(text("Reset ROI")).on_press(Message::ResetRoiPressed);
        let process_button = if self.is_processing {
            button(text("Processing..."))
        } else {
            button(text("Process")).on_press(Message::ProcessPressed)
        };

        container(
            row![
                roi_button,
                reset_button,
                process_button,
                text(&self.status_text).size(12).width(Length::Fill),
            ]
            .spacing(12)
            .align_y(iced::Alignment::Center),
        )
        .width(Length::Fill)
        .padding(10)
        .style(|_| container::Style {
            background: Some(Color::from_rgb8(24, 24, 24).into()),
            ..Default::default()
        })
        .into()
    }

    fn theme(&self) -> Theme {
        Theme::Dark
    }
}

fn result_column<'a>(title: &str, slot: &'a ResultSlot<ImageHandle>) -> Element<'a, Message> {
    let grade = slot
        .grade
        .map(|grade| format!("KL grade {grade}"))
        .unwrap_or_else(|| "no grade".to_string());

    column![
        text(format!("{title}: {} - {grade}", slot.id)).size(14),
        iced::widget::image(slot.heatmap.clone()).content_fit(ContentFit::Contain),
        iced::widget::image(slot.bar_chart.clone()).content_fit(ContentFit::Contain),
    ]
    .spacing(8)
    .width(Length::Fill)
    .into()
}

fn describe_outcome(outcome: &AnalysisOutcome) -> String {
    let grades: Vec<String> = outcome
        .prediction
        .assessments
        .iter()
        .map(|a| match a.grade() {
            Some(grade) => format!("{}: KL {grade}", a.id),
            None => format!("{}: -", a.id),
        })
        .collect();
    format!("{} analyzed ({})", outcome.source_name, grades.join(", "))
}

async fn load_study_task(path: PathBuf) -> Result<LoadedStudy, String> {
    tokio::task::spawn_blocking(move || load_study(&path).map_err(|err| err.to_string()))
        .await
        .map_err(|err| err.to_string())?
}

async fn analysis_task(
    source_name: String,
    crops: RoiCrops,
    scratch: ScratchDir,
    classifier: Arc<dyn KneeClassifier>,
) -> Result<AnalysisDisplay, String> {
    tokio::task::spawn_blocking(move || -> Result<AnalysisDisplay, String> {
        let outcome = run_analysis(&source_name, &crops, &scratch, classifier.as_ref())
            .map_err(|err| err.to_string())?;
        let view = outcome
            .view
            .clone()
            .try_map(|path| std::fs::read(path).map(ImageHandle::from_bytes))
            .map_err(|err| err.to_string())?;
        Ok(AnalysisDisplay { outcome, view })
    })
    .await
    .map_err(|err| err.to_string())?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::Prediction;
    use crate::scratch::CropPaths;

    fn app_with_studies(root: &std::path::Path) -> ReviewApp {
        let studies = root.join("studies");
        std::fs::create_dir_all(&studies).unwrap();
        for name in ["a.dcm", "b.dcm", "c.dcm"] {
            std::fs::write(studies.join(name), b"dicm").unwrap();
        }
        let settings = Settings {
            scratch_dir: root.join("analyzed"),
            ..Settings::default()
        };
        let (mut app, _) = ReviewApp::new(settings);
        let _ = app.update(Message::FolderPicked(Some(studies)));
        assert_eq!(app.browser.entries().len(), 3);
        app
    }

    fn finished_display() -> AnalysisDisplay {
        let slot = ResultSlot {
            id: "knee".to_string(),
            grade: Some(1),
            heatmap: ImageHandle::from_bytes(Vec::new()),
            bar_chart: ImageHandle::from_bytes(Vec::new()),
        };
        AnalysisDisplay {
            outcome: AnalysisOutcome {
                source_name: "a.dcm".to_string(),
                crops: CropPaths {
                    lateral: PathBuf::from("a_lateral.png"),
                    medial: PathBuf::from("a_medial.png"),
                },
                prediction: Prediction { assessments: Vec::new() },
                view: ResultView::Single(ResultSlot {
                    id: "knee".to_string(),
                    grade: Some(1),
                    heatmap: PathBuf::from("single_heatmap.png"),
                    bar_chart: PathBuf::from("single_bar.png"),
                }),
            },
            view: ResultView::Single(slot),
        }
    }

    #[test]
    fn switching_studies_waits_for_running_analysis() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with_studies(dir.path());
        let artifact = dir.path().join("analyzed").join("single_bar.png");
        std::fs::write(&artifact, b"png").unwrap();

        app.is_processing = true;
        let _ = app.update(Message::FileSelected(1));
        let _ = app.update(Message::NextFile);

        assert_eq!(app.browser.selected_index(), None);
        assert!(artifact.exists());
        assert!(!app.is_loading);
        assert_eq!(app.study_generation, 0);
    }

    #[test]
    fn selection_stays_put_while_loading() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with_studies(dir.path());

        app.is_loading = true;
        let _ = app.update(Message::FileSelected(2));
        let _ = app.update(Message::PreviousFile);
        assert_eq!(app.browser.selected_index(), None);
    }

    #[test]
    fn analysis_for_previous_study_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with_studies(dir.path());

        app.study_generation = 4;
        app.is_processing = true;
        let _ = app.update(Message::AnalysisFinished(3, Ok(finished_display())));
        assert!(app.results.is_none());
        assert!(!app.is_processing);

        app.is_processing = true;
        let _ = app.update(Message::AnalysisFinished(4, Ok(finished_display())));
        assert!(matches!(app.results, Some(ResultView::Single(_))));
        assert!(!app.is_processing);
    }
}
