use iced::widget::{button, column, container, horizontal_space, image, mouse_area, row, scrollable, text};
use iced::{Alignment, ContentFit, Element, Length};

use raw_culler::zoom::Zoom;
use raw_culler::Session;

use super::keys::Command;
use super::{score_badge, score_bar};
use crate::{Message, Screen};

/// Picture shown for the focused record, with its pixel size when known
pub struct Picture<'a> {
    pub handle: &'a image::Handle,
    pub size: Option<(u32, u32)>,
}

pub fn scroll_id() -> scrollable::Id {
    scrollable::Id::new("viewer-image")
}

/// Single-image view of the focused record. Falls back to the thumbnail
/// while the full image is still loading.
pub fn view<'a>(
    session: &'a Session,
    picture: Option<Picture<'a>>,
    zoom: Zoom,
    viewport_width: f32,
) -> Element<'a, Message> {
    let Some(index) = session.current() else {
        return container(text("Nothing to show")).center(Length::Fill).into();
    };
    let Some(record) = session.record(index) else {
        return container(text("Nothing to show")).center(Length::Fill).into();
    };

    let picture: Element<'a, Message> = match picture {
        Some(picture) => zoomed(picture, zoom, viewport_width),
        None => container(text("Loading…").size(16)).center(Length::Fill).into(),
    };

    let header = row![
        button(text("◀").size(14)).on_press(Message::Prev).style(button::secondary),
        text(format!("{} / {}", index + 1, session.records().len())).size(14),
        button(text("▶").size(14)).on_press(Message::Next).style(button::secondary),
        text(&record.name).size(16),
        text(score_badge(record.score)).size(16),
        text(record.score.label()).size(13),
        horizontal_space(),
        button(text("Reveal").size(13))
            .on_press(Message::Reveal(record.absolute_path.clone()))
            .style(button::secondary),
        button(text("Back to grid").size(13))
            .on_press(Message::ShowScreen(Screen::Gallery))
            .style(button::secondary),
    ]
    .spacing(10)
    .padding([0, 8])
    .align_y(Alignment::Center);

    let zoom_controls = row![
        button(text("−").size(13))
            .on_press(Message::Key(Command::ZoomOut))
            .style(button::secondary),
        text(zoom.label()).size(13).width(Length::Fixed(44.0)),
        button(text("+").size(13))
            .on_press(Message::Key(Command::ZoomIn))
            .style(button::secondary),
        button(text("Fit").size(13))
            .on_press_maybe((zoom != Zoom::Fit).then_some(Message::ZoomFit))
            .style(button::secondary),
    ]
    .spacing(4)
    .align_y(Alignment::Center);

    let footer = row![
        score_bar(),
        button(text("Quick accept").size(13))
            .on_press(Message::ToggleAccept)
            .style(button::success),
        horizontal_space(),
        zoom_controls,
    ]
    .spacing(10)
    .padding([0, 8])
    .align_y(Alignment::Center);

    let area = mouse_area(container(picture).width(Length::Fill).height(Length::Fill).padding(8))
        .on_press(Message::ViewerPressed)
        .on_release(Message::ViewerReleased)
        .on_exit(Message::ViewerReleased)
        .on_move(Message::ViewerCursorMoved);

    column![header, area, footer].spacing(6).into()
}

/// The image at `zoom`. Above 100% it sits in a scrollable that the
/// mouse area drags around.
fn zoomed<'a>(picture: Picture<'a>, zoom: Zoom, viewport_width: f32) -> Element<'a, Message> {
    let Some(width) = zoom.image_width(viewport_width) else {
        return image(picture.handle.clone())
            .width(Length::Fill)
            .height(Length::Fill)
            .content_fit(ContentFit::Contain)
            .into();
    };
    let height = match picture.size {
        Some((w, h)) if w > 0 => Length::Fixed(width * h as f32 / w as f32),
        _ => Length::Shrink,
    };
    let img = image(picture.handle.clone())
        .width(Length::Fixed(width))
        .height(height)
        .content_fit(ContentFit::Contain);

    if zoom.is_pannable() {
        scrollable(img)
            .id(scroll_id())
            .direction(scrollable::Direction::Both {
                vertical: scrollable::Scrollbar::default(),
                horizontal: scrollable::Scrollbar::default(),
            })
            .on_scroll(Message::ViewerScrolled)
            .width(Length::Fill)
            .height(Length::Fill)
            .into()
    } else {
        container(img).center(Length::Fill).into()
    }
}
