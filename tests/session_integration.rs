use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use image::{ImageFormat, RgbImage};
use tempfile::tempdir;
use tokio::runtime::Handle;

use raw_culler::preview::EmbeddedJpeg;
use raw_culler::ratings::{self, RatingRow};
use raw_culler::selection::{ClickMode, ViewMode};
use raw_culler::session::{open_folder, Services, Session};
use raw_culler::settings::Settings;
use raw_culler::{ImageLoader, Score};

fn write_image(path: &Path, format: ImageFormat) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    RgbImage::from_fn(64, 48, |x, y| image::Rgb([x as u8 * 3, y as u8 * 5, 128]))
        .save_with_format(path, format)
        .unwrap();
}

fn services(settings: Settings) -> Services {
    Services {
        runtime: Handle::current(),
        loader: ImageLoader::new(Arc::new(EmbeddedJpeg)),
        settings,
    }
}

async fn start(dir: &Path, settings: Settings) -> Session {
    let services = services(settings);
    let opened = open_folder(dir, services.loader.clone(), services.settings.retain_scan_buffers)
        .await
        .unwrap();
    Session::start(opened, &services)
}

async fn all_thumbnails(session: &mut Session) {
    for index in 0..session.records().len() {
        session.ensure_thumbnail(index);
    }
    for _ in 0..500 {
        session.poll_events();
        if session.records().iter().all(|r| r.thumbnail_data().is_some()) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("thumbnails never arrived");
}

/// A small shoot: two rasters at the top, one in a subfolder and a RAW
/// file without any embedded preview.
fn shoot(dir: &Path) {
    write_image(&dir.join("a.jpg"), ImageFormat::Jpeg);
    write_image(&dir.join("b.png"), ImageFormat::Png);
    write_image(&dir.join("sub").join("photo.jpg"), ImageFormat::Jpeg);
    fs::write(dir.join("c.nef"), b"sensor data without previews").unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn opening_a_folder_skips_unloadable_files_and_merges_ratings() {
    let dir = tempdir().unwrap();
    shoot(dir.path());
    fs::write(
        ratings::sidecar_path(dir.path()),
        "filename,path,score\nphoto.jpg,sub/photo.jpg,3\n",
    )
    .unwrap();

    let session = start(dir.path(), Settings::default()).await;
    let names: Vec<_> = session
        .records()
        .iter()
        .filter_map(|r| r.relative_path.as_deref())
        .collect();
    assert_eq!(names, vec!["a.jpg", "b.png", "sub/photo.jpg"]);
    assert_eq!(session.skipped(), 1);

    let photo = &session.records()[2];
    assert_eq!(photo.score.value(), 3);
    assert!(session.records()[0].score.is_unscored());
    assert!(session.records()[1].score.is_unscored());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn thumbnails_are_reused_until_the_cache_is_cleared() {
    let dir = tempdir().unwrap();
    shoot(dir.path());

    let mut first = start(dir.path(), Settings::default()).await;
    all_thumbnails(&mut first).await;
    assert_eq!(first.stats().generated, 3);
    assert_eq!(first.stats().cache_hits, 0);
    first.close().unwrap();

    let mut second = start(dir.path(), Settings::default()).await;
    all_thumbnails(&mut second).await;
    assert_eq!(second.stats().cache_hits, 3);
    assert_eq!(second.stats().generated, 0);

    let removed = second.clear_thumbnail_cache().await.unwrap();
    assert_eq!(removed, 3);
    second.close().unwrap();

    let mut third = start(dir.path(), Settings::default()).await;
    all_thumbnails(&mut third).await;
    assert_eq!(third.stats().generated, 3);
    assert_eq!(third.stats().cache_hits, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn generation_respects_the_configured_ceiling() {
    let dir = tempdir().unwrap();
    for i in 0..10 {
        write_image(&dir.path().join(format!("img_{:02}.png", i)), ImageFormat::Png);
    }
    let settings = Settings {
        max_thumbnail_tasks: 2,
        retain_scan_buffers: false,
        ..Settings::default()
    };

    let mut session = start(dir.path(), settings).await;
    all_thumbnails(&mut session).await;

    let stats = session.stats();
    assert_eq!(stats.requests, 10);
    assert_eq!(stats.generated, 10);
    assert!(stats.peak_active >= 1);
    assert!(stats.peak_active <= 2, "peak was {}", stats.peak_active);
    // Buffers loaded for generation are not kept when retention is off
    assert!(session.records().iter().all(|r| r.full_image.is_none()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn repeated_requests_do_not_duplicate_work() {
    let dir = tempdir().unwrap();
    shoot(dir.path());
    let mut session = start(dir.path(), Settings::default()).await;

    for _ in 0..5 {
        for index in 0..session.records().len() {
            session.ensure_thumbnail(index);
        }
    }
    all_thumbnails(&mut session).await;
    assert_eq!(session.stats().requests, 3);
    assert_eq!(session.stats().generated, 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn ratings_survive_a_reopen() {
    let dir = tempdir().unwrap();
    for score in Score::all() {
        write_image(&dir.path().join(format!("s{}.png", score.value() + 1)), ImageFormat::Png);
    }

    let settings = Settings {
        autosave_interval_ms: 0,
        ..Settings::default()
    };
    let mut session = start(dir.path(), settings.clone()).await;
    for (index, score) in Score::all().enumerate() {
        session.apply_score_to(score, &[index]);
    }
    session.close().unwrap();

    let reopened = start(dir.path(), settings).await;
    let scores: Vec<_> = reopened.records().iter().map(|r| r.score).collect();
    assert_eq!(scores, Score::all().collect::<Vec<_>>());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn grid_selection_rates_every_selected_record() {
    let dir = tempdir().unwrap();
    shoot(dir.path());
    let mut session = start(dir.path(), Settings::default()).await;

    session.click(0, ClickMode::Toggle);
    session.click(2, ClickMode::Toggle);
    assert_eq!(session.apply_score(Score::REJECTED, ViewMode::Grid), vec![0, 2]);
    // The viewer only rates the focused record
    assert_eq!(session.apply_score(Score::stars(5), ViewMode::Viewer), vec![2]);

    session.save_now();
    for _ in 0..500 {
        session.poll_events();
        if !session.is_dirty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(!session.is_dirty());

    let rows: Vec<RatingRow> = ratings::rows_for(session.folder(), session.records());
    assert_eq!(rows[2].path, "sub/photo.jpg");
    let table = ratings::load_scores(dir.path());
    assert_eq!(table.get("a.jpg"), Some(Score::REJECTED));
    assert_eq!(table.get("b.png"), Some(Score::UNSCORED));
    assert_eq!(table.get("sub/photo.jpg").map(Score::value), Some(5));
}
