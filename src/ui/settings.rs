use iced::widget::{button, column, container, row, scrollable, slider, text, toggler, Row};
use iced::{Alignment, Element, Length};

use raw_culler::settings::{PreviewBackend, Settings, Theme, MAX_GRID_SIZE, MIN_GRID_SIZE};

use crate::Message;

const AUTOSAVE_CHOICES: [(u64, &str); 4] = [(0, "Manual"), (200, "200 ms"), (400, "400 ms"), (1000, "1 s")];

fn choice<'a, T: PartialEq + Copy>(
    options: &[(T, &'a str)],
    current: T,
    on_pick: fn(T) -> Message,
) -> Element<'a, Message> {
    Row::with_children(options.iter().map(|&(value, label)| {
        button(text(label).size(13))
            .on_press(on_pick(value))
            .style(if value == current { button::primary } else { button::secondary })
            .into()
    }))
    .spacing(6)
    .into()
}

fn field<'a>(label: &'a str, control: Element<'a, Message>) -> Element<'a, Message> {
    row![text(label).size(14).width(Length::Fixed(220.0)), control]
        .spacing(12)
        .align_y(Alignment::Center)
        .into()
}

pub fn view(settings: &Settings) -> Element<'_, Message> {
    let content = column![
        text("Settings").size(24),
        field(
            "Theme",
            choice(&[(Theme::Dark, "Dark"), (Theme::Light, "Light")], settings.theme, Message::ThemeChanged),
        ),
        field(
            "Thumbnail size",
            row![
                slider(MIN_GRID_SIZE..=MAX_GRID_SIZE, settings.grid_size, Message::GridSizeChanged)
                    .step(10u16)
                    .width(Length::Fixed(240.0)),
                text(format!("{} px", settings.grid_size)).size(13),
            ]
            .spacing(10)
            .into(),
        ),
        field(
            "Autosave",
            choice(&AUTOSAVE_CHOICES, settings.autosave_interval_ms, Message::AutosaveChanged),
        ),
        field(
            "Parallel thumbnails",
            row![
                slider(1..=16u8, settings.max_thumbnail_tasks.clamp(1, 16) as u8, |tasks| {
                    Message::MaxTasksChanged(usize::from(tasks))
                })
                .width(Length::Fixed(240.0)),
                text(settings.max_thumbnail_tasks.to_string()).size(13),
            ]
            .spacing(10)
            .into(),
        ),
        field(
            "RAW previews",
            choice(
                &[
                    (PreviewBackend::Auto, "Auto"),
                    (PreviewBackend::ExifTool, "exiftool"),
                    (PreviewBackend::Embedded, "Built-in"),
                ],
                settings.preview_backend,
                Message::PreviewBackendChanged,
            ),
        ),
        field(
            "Keep scanned images in memory",
            toggler(settings.retain_scan_buffers)
                .on_toggle(Message::RetainBuffersToggled)
                .into(),
        ),
        text("Thumbnail, autosave and preview settings apply to the next opened folder.").size(12),
        button(text("Save settings")).on_press(Message::SaveSettings),
    ]
    .spacing(16)
    .padding(20)
    .max_width(760);

    scrollable(container(content).center_x(Length::Fill)).into()
}
