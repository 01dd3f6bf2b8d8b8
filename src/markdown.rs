use std::sync::LazyLock;

use chrono::NaiveDateTime;
use regex::Regex;

use crate::domain::{Paper, PaperId, TIMESTAMP_FORMAT};

/// One rendered entry. Field positions are fixed: [`parse`] recovers the
/// record from exactly this shape.
static ENTRY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"<summary>(\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}) - (.*)</summary>\n\n- \*(.+)\*\n\n- `(.+)`.* \[pdf\]\((.+)\)\n\n> (.+)\n\n</details>",
    )
    .expect("entry pattern compiles")
});

/// Renders one (subject, year) partition document: year heading, TOC of
/// month keys, one section per month with its entry blocks. Output is a
/// pure function of the input order, byte-stable across invocations.
pub fn render(year: i32, papers: &[Paper]) -> String {
    let mut sections: Vec<String> = Vec::new();
    sections.push(format!("# {year}\n"));

    let mut toc: Vec<String> = Vec::new();
    // Month groups in first-occurrence order; for merge-sorted input that
    // is already ascending.
    let mut groups: Vec<(String, String)> = Vec::new();
    for paper in papers {
        let month = paper.month_key();
        if !toc.contains(&month) {
            toc.push(month.clone());
        }
        let block = render_entry(paper);
        match groups.iter_mut().find(|(key, _)| *key == month) {
            Some((_, body)) => body.push_str(&block),
            None => groups.push((month, block)),
        }
    }

    sections.push("## TOC\n".to_string());
    toc.sort();
    let links = toc
        .iter()
        .map(|month| format!("- [{month}](#{month})"))
        .collect::<Vec<_>>()
        .join("\n");
    sections.push(format!("{links}\n"));

    for (month, body) in groups {
        sections.push(format!("## {month}\n"));
        sections.push(body);
    }

    sections.join("\n")
}

fn render_entry(paper: &Paper) -> String {
    format!(
        "<details>\n\n<summary>{updated} - {title}</summary>\n\n\
         - *{authors}*\n\n\
         - `{id}` - [abs](http://arxiv.org/abs/{id}) - [pdf]({pdf})\n\n\
         > {summary}\n\n\
         </details>\n\n",
        updated = paper.updated_display(),
        title = paper.title,
        authors = paper.authors.join(", "),
        id = paper.id,
        pdf = paper.pdf_url,
        summary = paper.summary,
    )
}

/// Reconstructs the records a rendered document contains. Blocks that do
/// not match the entry shape contribute nothing; a document of unrecognized
/// content parses to the empty collection.
pub fn parse(document: &str) -> Vec<Paper> {
    ENTRY_RE
        .captures_iter(document)
        .filter_map(|captures| {
            let updated =
                NaiveDateTime::parse_from_str(&captures[1], TIMESTAMP_FORMAT).ok()?;
            let id: PaperId = captures[4].parse().ok()?;
            Some(Paper {
                id,
                title: captures[2].to_string(),
                authors: captures[3].split(", ").map(str::to_string).collect(),
                updated,
                summary: captures[6].to_string(),
                pdf_url: captures[5].to_string(),
            })
        })
        .collect()
}
