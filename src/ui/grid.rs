use std::collections::HashMap;
use std::ops::Range;

use iced::widget::{button, column, container, horizontal_space, image, row, scrollable, text, Column, Space};
use iced::{Alignment, Background, Border, Color, ContentFit, Element, Length, Theme};

use raw_culler::data::ThumbnailSlot;
use raw_culler::{ImageRecord, Session};

use super::{score_badge, score_bar};
use crate::Message;

pub const SPACING: f32 = 8.0;
pub const PADDING: f32 = 12.0;

/// Height of the name/score line under each thumbnail
pub const LABEL_HEIGHT: f32 = 28.0;

/// Extra distance above and below the viewport whose cells are requested
/// and rendered ahead of time
pub const PRELOAD_MARGIN: f32 = 200.0;

pub fn scroll_id() -> scrollable::Id {
    scrollable::Id::new("gallery-grid")
}

/// Row/column geometry of the grid for a given width and cell size
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridLayout {
    pub columns: usize,
    pub cell: f32,
    pub row_height: f32,
}

impl GridLayout {
    pub fn new(width: f32, cell: f32) -> Self {
        let available = (width - 2.0 * PADDING).max(cell);
        let columns = ((available + SPACING) / (cell + SPACING)).floor().max(1.0) as usize;
        Self {
            columns,
            cell,
            row_height: cell + LABEL_HEIGHT + SPACING,
        }
    }

    pub fn rows(&self, len: usize) -> usize {
        len.div_ceil(self.columns)
    }

    /// Rows intersecting the viewport grown by [`PRELOAD_MARGIN`]
    pub fn visible_rows(&self, offset_y: f32, viewport_height: f32, len: usize) -> Range<usize> {
        let top = (offset_y - PADDING - PRELOAD_MARGIN).max(0.0);
        let bottom = (offset_y + viewport_height + PRELOAD_MARGIN - PADDING).max(0.0);
        let rows = self.rows(len);
        let first = ((top / self.row_height).floor() as usize).min(rows);
        let last = ((bottom / self.row_height).ceil() as usize).clamp(first, rows);
        first..last
    }

    /// Record indices whose cells are in or near the viewport
    pub fn visible_range(&self, offset_y: f32, viewport_height: f32, len: usize) -> Range<usize> {
        let rows = self.visible_rows(offset_y, viewport_height, len);
        (rows.start * self.columns).min(len)..(rows.end * self.columns).min(len)
    }

    /// Scroll offset that brings `index` fully into view, or `None` if it
    /// already is
    pub fn scroll_target(&self, index: usize, offset_y: f32, viewport_height: f32) -> Option<f32> {
        let top = PADDING + (index / self.columns) as f32 * self.row_height;
        let bottom = top + self.row_height;
        if top < offset_y {
            Some((top - PADDING).max(0.0))
        } else if bottom > offset_y + viewport_height {
            Some((bottom - viewport_height).max(0.0))
        } else {
            None
        }
    }
}

/// The gallery: score toolbar plus a virtualised thumbnail grid. Only rows
/// near the viewport are built; the rest is replaced by spacers.
pub fn view<'a>(
    session: &'a Session,
    thumbs: &'a HashMap<usize, image::Handle>,
    layout: GridLayout,
    offset_y: f32,
    viewport_height: f32,
) -> Element<'a, Message> {
    let records = session.records();
    if records.is_empty() {
        return container(text("No supported images in this folder"))
            .center(Length::Fill)
            .into();
    }

    let total_rows = layout.rows(records.len());
    let visible = layout.visible_rows(offset_y, viewport_height, records.len());
    let selection = session.selection();
    let current = selection.current();

    let mut rows: Vec<Element<'a, Message>> = Vec::new();
    if visible.start > 0 {
        rows.push(Space::with_height(visible.start as f32 * layout.row_height - SPACING).into());
    }
    for r in visible.clone() {
        let start = r * layout.columns;
        let end = (start + layout.columns).min(records.len());
        let cells = (start..end).map(|index| {
            cell(
                &records[index],
                index,
                thumbs.get(&index),
                layout.cell,
                current == Some(index),
                selection.is_selected(index),
            )
        });
        rows.push(row(cells).spacing(SPACING).into());
    }
    if visible.end < total_rows {
        rows.push(Space::with_height((total_rows - visible.end) as f32 * layout.row_height).into());
    }

    let grid = scrollable(Column::with_children(rows).spacing(SPACING).padding(PADDING))
        .id(scroll_id())
        .on_scroll(Message::GridScrolled)
        .width(Length::Fill)
        .height(Length::Fill);

    let actions = row![
        score_bar(),
        horizontal_space(),
        button(text("Clear thumbnail cache").size(13))
            .on_press(Message::ClearCache)
            .style(button::secondary),
        button(text("Reveal folder").size(13))
            .on_press(Message::Reveal(session.folder().to_path_buf()))
            .style(button::secondary),
    ]
    .spacing(8)
    .padding([0, 8])
    .align_y(Alignment::Center);

    column![actions, grid].spacing(6).into()
}

fn cell<'a>(
    record: &'a ImageRecord,
    index: usize,
    handle: Option<&image::Handle>,
    size: f32,
    focused: bool,
    selected: bool,
) -> Element<'a, Message> {
    let preview: Element<'a, Message> = match (handle, &record.thumbnail) {
        (Some(handle), _) => image(handle.clone())
            .width(size)
            .height(size)
            .content_fit(ContentFit::Contain)
            .into(),
        (None, ThumbnailSlot::Failed(_)) => column![
            text("⚠ No preview").size(13),
            button(text("Retry").size(12))
                .on_press(Message::RetryThumbnail(index))
                .style(button::secondary),
        ]
        .spacing(6)
        .align_x(Alignment::Center)
        .into(),
        (None, _) => text("…").size(18).into(),
    };

    let label = row![
        text(&record.name).size(12).width(Length::Fill),
        text(score_badge(record.score)).size(12),
    ]
    .width(size)
    .height(LABEL_HEIGHT)
    .align_y(Alignment::Center);

    let content = column![container(preview).center(Length::Fixed(size)), label];

    button(content)
        .on_press(Message::CardClicked(index))
        .padding(0)
        .style(move |theme: &Theme, _status| cell_style(theme, focused, selected))
        .into()
}

fn cell_style(theme: &Theme, focused: bool, selected: bool) -> button::Style {
    let palette = theme.extended_palette();
    let background = if selected {
        Some(Background::Color(palette.primary.weak.color))
    } else {
        None
    };
    let border = if focused {
        Border {
            color: palette.primary.strong.color,
            width: 2.0,
            radius: 4.0.into(),
        }
    } else {
        Border {
            color: Color::TRANSPARENT,
            width: 2.0,
            radius: 4.0.into(),
        }
    };
    button::Style {
        background,
        text_color: palette.background.base.text,
        border,
        ..button::Style::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_columns_fit_width() {
        // 2*12 padding, (200 + 8) per cell
        assert_eq!(GridLayout::new(24.0 + 200.0 * 4.0 + 8.0 * 3.0, 200.0).columns, 4);
        assert_eq!(GridLayout::new(24.0 + 200.0 * 4.0 + 8.0 * 3.0 - 1.0, 200.0).columns, 3);
        // Never fewer than one column
        assert_eq!(GridLayout::new(50.0, 200.0).columns, 1);
    }

    #[test]
    fn test_visible_range_includes_margin() {
        let layout = GridLayout {
            columns: 4,
            cell: 200.0,
            row_height: 236.0,
        };
        // Top of the grid: 600px viewport + 200px margin covers rows 0..4
        assert_eq!(layout.visible_range(0.0, 600.0, 100), 0..16);
        // Scrolled down: the margin reaches back one row
        let range = layout.visible_range(1000.0, 600.0, 100);
        assert_eq!(range.start, 12);
        assert_eq!(range.end % 4, 0);
        assert!(range.end > 24);
    }

    #[test]
    fn test_visible_range_clamped_to_len() {
        let layout = GridLayout::new(1000.0, 200.0);
        assert_eq!(layout.visible_range(0.0, 5000.0, 7), 0..7);
        assert_eq!(layout.visible_range(99_999.0, 600.0, 7), 7..7);
        assert_eq!(layout.visible_range(0.0, 600.0, 0), 0..0);
    }

    #[test]
    fn test_scroll_target() {
        let layout = GridLayout {
            columns: 2,
            cell: 100.0,
            row_height: 136.0,
        };
        assert_eq!(layout.scroll_target(0, 0.0, 500.0), None);
        // Row 5 spans 692..828
        assert_eq!(layout.scroll_target(10, 0.0, 500.0), Some(328.0));
        assert_eq!(layout.scroll_target(0, 300.0, 500.0), Some(0.0));
    }
}
