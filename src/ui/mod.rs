//! View builders for the desktop shell
//!
//! - grid.rs: virtualised thumbnail grid and its layout math
//! - viewer.rs: single-image viewer
//! - home.rs: recent folders and projects
//! - settings.rs: settings form
//! - keys.rs: keyboard shortcuts

pub mod grid;
pub mod home;
pub mod keys;
pub mod settings;
pub mod viewer;

use std::path::Path;

use iced::widget::{button, column, container, horizontal_space, row, text, Column};
use iced::{Alignment, Background, Border, Color, Element, Length, Theme};

use raw_culler::{Score, Session};

use crate::{Message, Notice, Screen};

/// Compact score marker for cells and the viewer header
pub fn score_badge(score: Score) -> String {
    match score.value() {
        -1 => String::new(),
        0 => "✕".to_string(),
        n => "★".repeat(n as usize),
    }
}

/// Buttons for every score, in display order
pub fn score_bar<'a>() -> Element<'a, Message> {
    let mut bar = row![
        button(text("Reject").size(13))
            .on_press(Message::Rate(Score::REJECTED))
            .style(button::danger),
        button(text("Clear").size(13))
            .on_press(Message::Rate(Score::UNSCORED))
            .style(button::secondary),
    ]
    .spacing(6)
    .align_y(Alignment::Center);

    for stars in 1..=Score::MAX_STARS as u8 {
        bar = bar.push(
            button(text(stars.to_string()).size(13))
                .on_press(Message::Rate(Score::stars(stars)))
                .style(button::primary),
        );
    }
    bar.into()
}

fn toolbar<'a>(screen: Screen, session: Option<&'a Session>, opening: Option<&'a Path>) -> Element<'a, Message> {
    let tab = |label: &'a str, target: Screen, enabled: bool| {
        let style = if screen == target {
            button::primary
        } else {
            button::text
        };
        button(text(label).size(14))
            .on_press_maybe(enabled.then_some(Message::ShowScreen(target)))
            .style(style)
    };
    let has_session = session.is_some();

    let mut bar = row![
        button(text("Open Folder").size(14)).on_press_maybe(opening.is_none().then_some(Message::OpenFolder)),
        tab("Projects", Screen::Home, true),
        tab("Gallery", Screen::Gallery, has_session),
        tab("Viewer", Screen::Viewer, has_session),
        tab("Settings", Screen::Settings, true),
        horizontal_space(),
    ]
    .spacing(8)
    .padding(8)
    .align_y(Alignment::Center);

    if let Some(folder) = opening {
        bar = bar.push(text(format!("Opening {}…", folder.display())).size(13));
    }
    if let Some(session) = session {
        bar = bar.push(
            button(text("Save").size(14))
                .on_press(Message::SaveNow)
                .style(if session.is_dirty() { button::primary } else { button::secondary }),
        );
    }
    bar.into()
}

fn status_line<'a>(session: Option<&'a Session>) -> Element<'a, Message> {
    let status = match session {
        None => "No folder open. Ctrl+O to open one.".to_string(),
        Some(session) => {
            let records = session.records();
            let ready = records.iter().filter(|r| r.thumbnail_data().is_some()).count();
            let stats = session.stats();
            let mut status = format!(
                "{} images · {} skipped · {} selected · thumbnails {}/{} · {} running, {} queued",
                records.len(),
                session.skipped(),
                session.selection().selected().len(),
                ready,
                records.len(),
                stats.active,
                stats.queued,
            );
            if session.is_dirty() {
                status.push_str(if session.autosave_enabled() {
                    " · saving…"
                } else {
                    " · unsaved changes"
                });
            }
            status
        }
    };
    container(text(status).size(12)).padding([4, 10]).into()
}

fn notice_list<'a>(notices: &'a [Notice]) -> Element<'a, Message> {
    let items = notices.iter().map(|notice| {
        let is_error = notice.is_error;
        container(
            row![
                text(&notice.message).size(13),
                horizontal_space(),
                button(text("✕").size(12))
                    .on_press(Message::DismissNotice(notice.id))
                    .style(button::text),
            ]
            .align_y(Alignment::Center),
        )
        .padding([4, 10])
        .width(Length::Fill)
        .style(move |theme: &Theme| notice_style(theme, is_error))
        .into()
    });
    Column::with_children(items).spacing(4).padding([0, 8]).into()
}

fn notice_style(theme: &Theme, is_error: bool) -> container::Style {
    let palette = theme.extended_palette();
    let pair = if is_error {
        palette.danger.weak
    } else {
        palette.background.strong
    };
    container::Style {
        background: Some(Background::Color(pair.color)),
        text_color: Some(pair.text),
        border: Border {
            radius: 4.0.into(),
            ..Border::default()
        },
        ..container::Style::default()
    }
}

/// Wrap a screen with the toolbar, notices and status line
pub fn frame<'a>(
    screen: Screen,
    session: Option<&'a Session>,
    opening: Option<&'a Path>,
    notices: &'a [Notice],
    content: Element<'a, Message>,
) -> Element<'a, Message> {
    column![
        toolbar(screen, session, opening),
        container(content).width(Length::Fill).height(Length::Fill),
        notice_list(notices),
        status_line(session),
    ]
    .into()
}

/// Keyboard help drawn over the current screen
pub fn help_overlay<'a>() -> Element<'a, Message> {
    let rows = keys::SHORTCUTS.iter().map(|(key, action)| {
        row![
            text(*key).size(13).width(Length::Fixed(140.0)),
            text(*action).size(13),
        ]
        .into()
    });
    let card = column![
        row![
            text("Keyboard shortcuts").size(18),
            horizontal_space(),
            button(text("✕").size(12))
                .on_press(Message::Key(keys::Command::ToggleHelp))
                .style(button::text),
        ]
        .align_y(Alignment::Center),
        Column::with_children(rows).spacing(4),
    ]
    .spacing(12)
    .width(Length::Fixed(460.0));

    container(container(card).padding(16).style(container::bordered_box))
        .center(Length::Fill)
        .style(|_theme: &Theme| container::Style {
            background: Some(Background::Color(Color { a: 0.5, ..Color::BLACK })),
            ..container::Style::default()
        })
        .into()
}
