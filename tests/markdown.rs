use chrono::{NaiveDate, NaiveDateTime};

use arxiv_harvester::domain::Paper;
use arxiv_harvester::markdown;
use arxiv_harvester::merge::merge;

fn at(month: u32, day: u32, hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2023, month, day)
        .unwrap()
        .and_hms_opt(hour, 15, 30)
        .unwrap()
}

fn paper(id: &str, updated: NaiveDateTime) -> Paper {
    Paper {
        id: id.parse().unwrap(),
        title: format!("Title for {id}"),
        authors: vec!["Ada Lovelace".to_string(), "Alan Turing".to_string()],
        updated,
        summary: format!("Summary for {id}, all on one line."),
        pdf_url: format!("http://arxiv.org/pdf/{id}"),
    }
}

#[test]
fn round_trip_is_exact() {
    let papers = vec![
        paper("2301.00001v1", at(1, 2, 10)),
        paper("2301.00002v2", at(1, 20, 8)),
        paper("2303.01234v1", at(3, 5, 23)),
        // Tie on the timestamp with the entry above.
        paper("2303.04321v1", at(3, 5, 23)),
        paper("cs/0112017v1", at(12, 31, 0)),
    ];

    let document = markdown::render(2023, &papers);
    assert_eq!(markdown::parse(&document), papers);
}

#[test]
fn render_is_deterministic() {
    let papers = vec![
        paper("2301.00001v1", at(1, 2, 10)),
        paper("2302.00002v1", at(2, 3, 11)),
    ];
    assert_eq!(markdown::render(2023, &papers), markdown::render(2023, &papers));
}

#[test]
fn toc_lists_months_ascending_with_sections_in_order() {
    // Existing document holds January and March; a February paper arrives.
    let existing = vec![
        paper("2301.00001v1", at(1, 2, 10)),
        paper("2303.00002v1", at(3, 4, 12)),
    ];
    let existing = markdown::parse(&markdown::render(2023, &existing));
    let merged = merge(existing, vec![paper("2302.00003v1", at(2, 10, 9))]);
    let document = markdown::render(2023, &merged);

    let toc_start = document.find("## TOC").unwrap();
    let toc_end = document.find("## 2023-01").unwrap();
    assert_eq!(
        &document[toc_start..toc_end],
        "## TOC\n\n- [2023-01](#2023-01)\n- [2023-02](#2023-02)\n- [2023-03](#2023-03)\n\n"
    );

    let jan = document.find("## 2023-01").unwrap();
    let feb = document.find("## 2023-02").unwrap();
    let mar = document.find("## 2023-03").unwrap();
    assert!(jan < feb && feb < mar);
}

#[test]
fn grouping_loses_no_entries() {
    let papers: Vec<Paper> = (1..=9)
        .map(|month| paper(&format!("23{month:02}.00001v1"), at(month, 1, 0)))
        .collect();
    let document = markdown::render(2023, &papers);
    assert_eq!(markdown::parse(&document).len(), papers.len());
}

#[test]
fn foreign_content_degrades_to_skipped_blocks() {
    let papers = vec![paper("2301.00001v1", at(1, 2, 10))];
    let mut document = markdown::render(2023, &papers);
    document.push_str("\n## Notes\n\nHand-written commentary, no entry shape.\n");
    document.push_str("<details>\n\n<summary>truncated block</summary>\n\n</details>\n\n");

    assert_eq!(markdown::parse(&document), papers);
}
