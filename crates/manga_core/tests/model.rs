use manga_core::{
    parse_url_list, DownloadResult, ErrorKind, Page, PageId, RejectedLine, RunStatus, Source,
    Summary, UnitKind, WorkUnit,
};
use pretty_assertions::assert_eq;

fn id(unit: usize, page: usize) -> PageId {
    PageId {
        source: 0,
        unit,
        page,
    }
}

#[test]
fn url_list_trims_and_reports_bad_lines() {
    let raw = "https://manganelo.com/manga/a,\n\n  # comment\nftp://x.org/y\nhttps://imgbox.com/g/abc  \nnonsense\n";
    let list = parse_url_list(raw);

    assert_eq!(
        list.urls,
        vec![
            "https://manganelo.com/manga/a".to_string(),
            "https://imgbox.com/g/abc".to_string()
        ]
    );
    assert_eq!(
        list.rejected,
        vec![
            RejectedLine {
                line: 4,
                text: "ftp://x.org/y".to_string()
            },
            RejectedLine {
                line: 6,
                text: "nonsense".to_string()
            }
        ]
    );
}

#[test]
fn flat_source_is_one_implicit_unit() {
    let pages = vec![
        Page::unresolved(1, "https://imgbox.com/a"),
        Page::unresolved(2, "https://imgbox.com/b"),
    ];
    let source = Source::flat("https://imgbox.com/g/x", "Gallery", pages);

    assert_eq!(source.units.len(), 1);
    assert_eq!(source.units[0].kind, UnitKind::Flat);
    assert_eq!(source.page_count(), 2);
    let order: Vec<_> = source.pages().map(|(_, _, _, p)| p.index).collect();
    assert_eq!(order, vec![1, 2]);
}

#[test]
fn retained_units_from_earlier_run_are_appended() {
    let mut earlier_unit = WorkUnit::chapter(1, "Chapter 1", "https://s/1");
    earlier_unit
        .pages
        .push(Page::resolved(1, "https://s/1", "https://img/1.jpg"));
    let earlier = Source::new(
        "https://s",
        "S",
        vec![earlier_unit, WorkUnit::chapter(2, "Chapter 2", "https://s/2")],
    );

    let mut fresh = Source::new(
        "https://s",
        "S",
        vec![WorkUnit::chapter(1, "Chapter 2", "https://s/2")],
    );
    fresh.retain_missing_units(&earlier);

    let urls: Vec<_> = fresh.units.iter().map(|u| u.url.as_str()).collect();
    assert_eq!(urls, vec!["https://s/2", "https://s/1"]);
    assert_eq!(fresh.units[1].index, 2);
    assert!(fresh.units[1].has_pages());
}

#[test]
fn source_tree_round_trips_through_json() {
    let mut unit = WorkUnit::chapter(1, "Vol 1", "https://s/1");
    unit.pages.push(Page::unresolved(1, "https://s/1/1"));
    let source = Source::new("https://s", "S", vec![unit]);

    let text = serde_json::to_string(&source).unwrap();
    let back: Source = serde_json::from_str(&text).unwrap();
    assert_eq!(back, source);
}

#[test]
fn summary_aggregates_outcomes() {
    let mut summary = Summary::default();
    summary.record(&DownloadResult::downloaded(id(0, 0), 100));
    summary.record(&DownloadResult::downloaded(id(0, 1), 50));
    summary.record(&DownloadResult::skipped(id(0, 2)));
    summary.record(&DownloadResult::failed(id(1, 0), ErrorKind::NotFound, 1));
    summary.record(&DownloadResult::failed(id(1, 1), ErrorKind::Interrupted, 0));

    assert_eq!(summary.pages_downloaded, 2);
    assert_eq!(summary.bytes_written, 150);
    assert_eq!(summary.pages_skipped, 1);
    assert_eq!(summary.pages_failed, 1);
    assert_eq!(summary.pages_not_scheduled, 1);
    assert_eq!(summary.status, RunStatus::Completed);

    summary.status = RunStatus::Stopped;
    summary.sources_not_started = 2;
    let text = summary.to_string();
    assert!(text.contains("pages failed: 1"));
    assert!(text.contains("2 sources not started, 1 pages not scheduled"));
}
