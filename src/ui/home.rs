use std::path::Path;

use iced::widget::{button, column, container, horizontal_space, row, scrollable, text, text_input, Column};
use iced::{Alignment, Element, Length};

use raw_culler::library::{Project, RecentFolder};

use crate::Message;

/// Home screen: recently opened folders and projects
pub fn view<'a>(
    recent: &'a [RecentFolder],
    projects: &'a [Project],
    project_name: &'a str,
    open_folder: Option<&'a Path>,
) -> Element<'a, Message> {
    let recent_list: Element<'a, Message> = if recent.is_empty() {
        text("No folders opened yet").size(13).into()
    } else {
        Column::with_children(recent.iter().map(|folder| {
            row![
                button(text(folder.path.display().to_string()).size(13))
                    .on_press(Message::OpenPath(folder.path.clone()))
                    .style(button::text),
                horizontal_space(),
                text(folder.last_opened.format("%Y-%m-%d %H:%M").to_string()).size(12),
                button(text("✕").size(12))
                    .on_press(Message::ForgetFolder(folder.path.clone()))
                    .style(button::text),
            ]
            .spacing(8)
            .align_y(Alignment::Center)
            .into()
        }))
        .spacing(2)
        .into()
    };

    let new_project = row![
        text_input("Project name", project_name)
            .on_input(Message::ProjectNameChanged)
            .on_submit(Message::CreateProject)
            .width(Length::Fixed(280.0)),
        button(text("Create project").size(13)).on_press(Message::CreateProject),
    ]
    .spacing(8)
    .align_y(Alignment::Center);

    let project_list = Column::with_children(
        projects
            .iter()
            .map(|project| project_card(project, project_name, open_folder)),
    )
    .spacing(12);

    let content = column![
        text("Recent folders").size(20),
        recent_list,
        text("Projects").size(20),
        new_project,
        project_list,
    ]
    .spacing(14)
    .padding(20)
    .max_width(900);

    scrollable(container(content).center_x(Length::Fill)).into()
}

fn project_card<'a>(project: &'a Project, project_name: &'a str, open_folder: Option<&'a Path>) -> Element<'a, Message> {
    let rename = (!project_name.trim().is_empty()).then_some(Message::RenameProject(project.id));
    let add_current = open_folder
        .filter(|folder| !project.folders.iter().any(|f| f.as_path() == *folder))
        .map(|_| Message::AddFolderToProject(project.id));

    let header = row![
        text(&project.name).size(16),
        horizontal_space(),
        button(text("Add open folder").size(12)).on_press_maybe(add_current),
        button(text("Rename to field").size(12))
            .on_press_maybe(rename)
            .style(button::secondary),
        button(text("Delete").size(12))
            .on_press(Message::DeleteProject(project.id))
            .style(button::danger),
    ]
    .spacing(8)
    .align_y(Alignment::Center);

    let folders: Element<'a, Message> = if project.folders.is_empty() {
        text("No folders yet").size(12).into()
    } else {
        Column::with_children(project.folders.iter().map(|folder| {
            button(text(folder.display().to_string()).size(13))
                .on_press(Message::OpenPath(folder.clone()))
                .style(button::text)
                .into()
        }))
        .into()
    };

    container(column![header, folders].spacing(6))
        .padding(10)
        .width(Length::Fill)
        .style(container::bordered_box)
        .into()
}
