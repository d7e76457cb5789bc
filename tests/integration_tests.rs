use chrono::{TimeZone, Utc};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use vwp_fetcher::archive::WorkingDirectory;
use vwp_fetcher::catalog::{CatalogScanner, RetrievalManager};
use vwp_fetcher::config::Settings;
use vwp_fetcher::decoder::ZlibFrameDecoder;
use vwp_fetcher::models::{
    CanonicalFile, PipelineWarning, StationRegistry, StormMotion, TimeWindow,
};
use vwp_fetcher::pipeline::{PipelineOrchestrator, RunMode, RunOutcome, RunRequest};
use vwp_fetcher::render::{RenderRequest, Renderer};
use vwp_fetcher::Result;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const HEADER: &[u8] = b"SDUS34 KOUN 010015\r\r\nNVWTLX\r\r\n";
const CATALOG_PATH: &str = "/nexrad/level3/NVW/TLX/20200601/catalog.html";

/// Writes placeholder images where a plotting program would.
struct StubRenderer;

impl Renderer for StubRenderer {
    fn render_hodograph(&self, request: &RenderRequest, _frame: &CanonicalFile) -> Result<PathBuf> {
        let image = request.hodograph_path();
        fs::write(&image, b"\x89PNG")?;
        Ok(image)
    }

    fn render_time_height(&self, request: &RenderRequest) -> Result<PathBuf> {
        let image = request.time_height_path();
        fs::write(&image, b"\x89PNG")?;
        Ok(image)
    }
}

fn catalog_page(names: &[&str]) -> String {
    let rows: String = names
        .iter()
        .map(|n| {
            format!(
                "<tr><td><a href=\"catalog.html?dataset=NVW/TLX/{n}.nids\"><tt>{n}.nids</tt></a></td></tr>\n"
            )
        })
        .collect();
    format!("<html><body><table>\n{}</table></body></html>", rows)
}

fn product(payload: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(payload).unwrap();
    let mut raw = HEADER.to_vec();
    raw.extend(encoder.finish().unwrap());
    raw
}

fn file_path(name: &str) -> String {
    format!("/fileServer/nexrad/level3/NVW/TLX/20200601/{}.nids", name)
}

async fn mount_catalog(server: &MockServer, names: &[&str]) {
    Mock::given(method("GET"))
        .and(path(CATALOG_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(catalog_page(names)))
        .mount(server)
        .await;
}

async fn mount_file(server: &MockServer, name: &str, body: Vec<u8>, expected_calls: u64) {
    Mock::given(method("GET"))
        .and(path(file_path(name)))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
        .expect(expected_calls)
        .mount(server)
        .await;
}

fn settings(server: &MockServer, home: &Path) -> Settings {
    Settings::default()
        .with_base_url(&server.uri())
        .with_home_dir(home.to_path_buf())
}

fn live_request(window: TimeWindow) -> Result<RunRequest> {
    Ok(RunRequest {
        station: StationRegistry::builtin().resolve("KTLX")?,
        mode: RunMode::Live { window },
        storm_motion: StormMotion::default(),
        surface_wind: None,
    })
}

fn sorted_names(dir: &Path) -> Result<Vec<String>> {
    let mut names: Vec<String> = fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    Ok(names)
}

#[tokio::test]
async fn test_live_run_stages_window() -> Result<()> {
    let server = MockServer::start().await;
    mount_catalog(
        &server,
        &[
            "Level3_TLX_NVW_20200601_0015",
            "Level3_TLX_NVW_20200601_0215",
            "Level3_TLX_NVW_20200601_0515",
        ],
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/nexrad/level3/NVW/TLX/20200602/catalog.html"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    mount_file(&server, "Level3_TLX_NVW_20200601_0015", product(b"first"), 1).await;
    mount_file(&server, "Level3_TLX_NVW_20200601_0215", product(b"second"), 1).await;
    mount_file(&server, "Level3_TLX_NVW_20200601_0515", product(b"late"), 0).await;

    let home = TempDir::new()?;
    let orchestrator = PipelineOrchestrator::new(
        &settings(&server, home.path()),
        ZlibFrameDecoder::new(),
        StubRenderer,
    )?;
    let request = live_request(TimeWindow::parse("20200601/00", "20200601/03")?)?;

    let outcome = orchestrator
        .run(&request, &CancellationToken::new(), None)
        .await?;

    let RunOutcome::Completed(summary) = outcome else {
        panic!("expected a completed run");
    };
    assert_eq!(summary.downloaded, 2);
    assert_eq!(summary.inflated, 2);
    assert_eq!(summary.frames, 2);

    // Only the missing trailing day is reported
    assert_eq!(summary.warnings.len(), 1);
    assert!(matches!(
        &summary.warnings[0],
        PipelineWarning::CatalogUnavailable { day, .. }
            if *day == chrono::NaiveDate::from_ymd_opt(2020, 6, 2).unwrap()
    ));

    let workdir = &summary.working_dir;
    assert!(workdir
        .file_name()
        .and_then(|n| n.to_str())
        .map_or(false, |n| n.starts_with("data_")));
    assert_eq!(
        sorted_names(workdir)?,
        vec![
            "KOUN_SDUS34_NVWTLX_202006010015",
            "KOUN_SDUS34_NVWTLX_202006010215",
            "plots",
        ]
    );

    let mut expected = HEADER.to_vec();
    expected.extend_from_slice(b"first");
    assert_eq!(
        fs::read(workdir.join("KOUN_SDUS34_NVWTLX_202006010015"))?,
        expected
    );

    assert_eq!(
        sorted_names(&workdir.join("plots"))?,
        vec![
            "KTLX_202006010015_vad.png",
            "KTLX_202006010215_vad.png",
            "KTLX_vwp.png",
        ]
    );

    let mut zip_name = workdir.clone().into_os_string();
    zip_name.push(".zip");
    assert_eq!(summary.archive_path, PathBuf::from(zip_name));

    let archive = zip::ZipArchive::new(File::open(&summary.archive_path)?)?;
    let mut entries: Vec<&str> = archive.file_names().collect();
    entries.sort();
    assert_eq!(
        entries,
        vec![
            "KOUN_SDUS34_NVWTLX_202006010015",
            "KOUN_SDUS34_NVWTLX_202006010215",
            "plots/",
            "plots/KTLX_202006010015_vad.png",
            "plots/KTLX_202006010215_vad.png",
            "plots/KTLX_vwp.png",
        ]
    );

    Ok(())
}

#[tokio::test]
async fn test_refetch_transfers_nothing() -> Result<()> {
    let server = MockServer::start().await;
    mount_file(&server, "Level3_TLX_NVW_20200601_0015", product(b"first"), 1).await;
    mount_file(&server, "Level3_TLX_NVW_20200601_0215", product(b"second"), 1).await;

    let home = TempDir::new()?;
    let settings = settings(&server, home.path());
    let manager = RetrievalManager::new(settings.http_client()?, &settings);
    let station = StationRegistry::builtin().resolve("KTLX")?;
    let window = TimeWindow::parse("20200601/00", "20200601/03")?;
    let entries = vec![
        vwp_fetcher::models::CatalogEntry::parse("Level3_TLX_NVW_20200601_0015")?,
        vwp_fetcher::models::CatalogEntry::parse("Level3_TLX_NVW_20200601_0215")?,
    ];
    let workdir = manager.create_working_dir()?;
    let cancel = CancellationToken::new();

    let first = manager
        .fetch_into(&workdir, &station, &entries, &window, &cancel, None)
        .await?;
    assert_eq!(first.downloaded(), 2);

    let second = manager
        .fetch_into(&workdir, &station, &entries, &window, &cancel, None)
        .await?;
    assert_eq!(second.downloaded(), 0);
    assert_eq!(second.already_present(), 2);

    // Every file in the directory lies inside the window
    for name in sorted_names(workdir.path())? {
        let entry = vwp_fetcher::models::CatalogEntry::parse(&name)?;
        assert!(window.contains(&entry.valid_time()));
    }

    // `expect(1)` on each file mock is verified when the server drops
    Ok(())
}

#[tokio::test]
async fn test_truncated_transfer_is_reported() -> Result<()> {
    let server = MockServer::start().await;
    mount_file(&server, "Level3_TLX_NVW_20200601_0015", Vec::new(), 1).await;

    let home = TempDir::new()?;
    let settings = settings(&server, home.path());
    let manager = RetrievalManager::new(settings.http_client()?, &settings);
    let station = StationRegistry::builtin().resolve("KTLX")?;
    let window = TimeWindow::parse("20200601/00", "20200601/03")?;
    let entries = vec![vwp_fetcher::models::CatalogEntry::parse(
        "Level3_TLX_NVW_20200601_0015",
    )?];
    let workdir = WorkingDirectory::open(home.path())?;

    let report = manager
        .fetch_into(&workdir, &station, &entries, &window, &CancellationToken::new(), None)
        .await?;

    assert_eq!(report.downloaded(), 0);
    assert!(matches!(
        report.warnings.as_slice(),
        [PipelineWarning::TransferIncomplete { received: 0, .. }]
    ));
    assert!(sorted_names(home.path())?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_empty_window_finds_no_data() -> Result<()> {
    let server = MockServer::start().await;
    mount_catalog(&server, &["Level3_TLX_NVW_20200601_0515"]).await;
    mount_file(&server, "Level3_TLX_NVW_20200601_0515", product(b"late"), 0).await;

    let home = TempDir::new()?;
    let orchestrator = PipelineOrchestrator::new(
        &settings(&server, home.path()),
        ZlibFrameDecoder::new(),
        StubRenderer,
    )?;
    let request = live_request(TimeWindow::parse("20200601/00", "20200601/03")?)?;

    let outcome = orchestrator
        .run(&request, &CancellationToken::new(), None)
        .await?;

    assert!(matches!(outcome, RunOutcome::NoDataFound { .. }));
    assert!(sorted_names(home.path())?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_availability_reads_both_ends() -> Result<()> {
    let server = MockServer::start().await;
    mount_catalog(
        &server,
        &["Level3_TLX_NVW_20200601_0015", "Level3_TLX_NVW_20200601_0215"],
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/nexrad/level3/NVW/TLX/20200701/catalog.html"))
        .respond_with(ResponseTemplate::new(200).set_body_string(catalog_page(&[
            "Level3_TLX_NVW_20200701_0000",
            "Level3_TLX_NVW_20200701_1145",
        ])))
        .mount(&server)
        .await;

    let home = TempDir::new()?;
    let settings = settings(&server, home.path());
    let scanner = CatalogScanner::new(settings.http_client()?, &settings)?;
    let station = StationRegistry::builtin().resolve("KTLX")?;
    let now = Utc.with_ymd_and_hms(2020, 7, 1, 12, 0, 0).unwrap();

    let availability = scanner
        .availability(&station, now, &CancellationToken::new())
        .await?;

    assert_eq!(
        availability.earliest,
        Some(Utc.with_ymd_and_hms(2020, 6, 1, 0, 15, 0).unwrap())
    );
    assert_eq!(
        availability.latest,
        Some(Utc.with_ymd_and_hms(2020, 7, 1, 11, 45, 0).unwrap())
    );
    Ok(())
}

#[tokio::test]
async fn test_scan_spans_trailing_day() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/nexrad/level3/NVW/TLX/20200630/catalog.html"))
        .respond_with(ResponseTemplate::new(200).set_body_string(catalog_page(&[
            "Level3_TLX_NVW_20200630_2330",
            "Level3_TLX_NVW_20200630_2300",
        ])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/nexrad/level3/NVW/TLX/20200701/catalog.html"))
        .respond_with(ResponseTemplate::new(200).set_body_string(catalog_page(&[
            "Level3_TLX_NVW_20200701_0010",
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let home = TempDir::new()?;
    let settings = settings(&server, home.path());
    let scanner = CatalogScanner::new(settings.http_client()?, &settings)?;
    let station = StationRegistry::builtin().resolve("KTLX")?;
    let window = TimeWindow::parse("20200630/22", "20200630/23")?;

    let report = scanner
        .discover(&station, &window, &CancellationToken::new())
        .await?;

    let names: Vec<&str> = report.entries.iter().map(|e| e.name()).collect();
    assert_eq!(
        names,
        vec![
            "Level3_TLX_NVW_20200630_2300",
            "Level3_TLX_NVW_20200630_2330",
            "Level3_TLX_NVW_20200701_0010",
        ]
    );
    assert!(report.warnings.is_empty());
    Ok(())
}
