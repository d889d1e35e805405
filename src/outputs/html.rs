//! HTML rendering of the briefing.
//!
//! The page layout is fixed: a header with the report title and generation
//! time, a table of contents, one `<section>` per topic in the order given,
//! and a footer. Rendering is a pure function of its inputs, so the same
//! report always produces the same bytes.

use crate::models::{EnrichedArticle, Report, Section, SUMMARY_SENTINEL};
use crate::utils::slugify_title;
use chrono::NaiveDateTime;
use html_escape::{encode_double_quoted_attribute, encode_text};
use std::error::Error;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

/// Notice rendered instead of sections when there is nothing to report.
pub const EMPTY_REPORT_NOTICE: &str = "최근 수집된 뉴스가 없습니다.";

/// Notice rendered inside a topic that ended up with no articles.
pub const EMPTY_SECTION_NOTICE: &str = "선별된 기사가 없습니다.";

const STYLE: &str = "\
body{margin:0;background:#f5f6f8;color:#1f2328;font-family:'Pretendard','Apple SD Gothic Neo','Malgun Gothic',sans-serif;line-height:1.6}
header{background:#1b2a4a;color:#fff;padding:28px 24px}
header h1{margin:0;font-size:1.6rem}
header .generated{margin:6px 0 0;opacity:.8;font-size:.9rem}
main{max-width:880px;margin:0 auto;padding:24px}
nav.toc{margin-bottom:24px}
nav.toc a{display:inline-block;margin:0 12px 6px 0;color:#1b2a4a;font-weight:600;text-decoration:none}
section.topic{background:#fff;border-radius:10px;padding:8px 24px 16px;margin-bottom:24px;box-shadow:0 1px 3px rgba(0,0,0,.08)}
section.topic h2{border-bottom:2px solid #1b2a4a;padding-bottom:6px}
section.topic h2 .count{font-size:.9rem;font-weight:400;color:#57606a}
article.item{padding:12px 0;border-bottom:1px solid #eaeef2}
article.item:last-child{border-bottom:none}
article.item h3{margin:0 0 4px;font-size:1.1rem}
article.item h3 a{color:#0b57d0;text-decoration:none}
article.item .source{margin:0;color:#57606a;font-size:.8rem}
article.item .summary{margin:6px 0 0}
article.item .summary.failed{color:#9a6700}
p.notice{background:#fff;border-radius:10px;padding:32px;text-align:center;color:#57606a}
footer{text-align:center;color:#8c959f;font-size:.8rem;padding:24px}
";

fn section_anchor(section: &Section) -> String {
    format!("topic-{}", slugify_title(section.topic.label()))
}

fn render_article(out: &mut String, article: &EnrichedArticle) {
    let summary_class = if article.summary == SUMMARY_SENTINEL {
        "summary failed"
    } else {
        "summary"
    };
    out.push_str("<article class=\"item\">\n");
    out.push_str(&format!(
        "<h3><a href=\"{}\" target=\"_blank\" rel=\"noopener\">{}</a></h3>\n",
        encode_double_quoted_attribute(&article.link),
        encode_text(&article.title)
    ));
    if let Some(host) = article.source_host() {
        out.push_str(&format!("<p class=\"source\">{}</p>\n", encode_text(&host)));
    }
    out.push_str(&format!(
        "<p class=\"{summary_class}\">{}</p>\n",
        encode_text(&article.summary)
    ));
    out.push_str("</article>\n");
}

fn render_section(out: &mut String, section: &Section) {
    out.push_str(&format!(
        "<section class=\"topic\" id=\"{}\">\n<h2>{} <span class=\"count\">{}건</span></h2>\n",
        encode_double_quoted_attribute(&section_anchor(section)),
        encode_text(section.topic.label()),
        section.articles.len()
    ));
    if section.articles.is_empty() {
        out.push_str(&format!("<p class=\"notice\">{EMPTY_SECTION_NOTICE}</p>\n"));
    }
    for article in &section.articles {
        render_article(out, article);
    }
    out.push_str("</section>\n");
}

/// Render sections into a complete HTML document.
///
/// Sections are emitted in the order given. With no sections the page holds
/// only [`EMPTY_REPORT_NOTICE`].
pub fn assemble(sections: &[Section], generated_at: NaiveDateTime, title: &str) -> String {
    let title = encode_text(title);
    let mut out = String::new();

    out.push_str("<!DOCTYPE html>\n<html lang=\"ko\">\n<head>\n<meta charset=\"utf-8\">\n");
    out.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    out.push_str(&format!("<title>{title}</title>\n<style>\n{STYLE}</style>\n</head>\n<body>\n"));
    out.push_str(&format!(
        "<header>\n<h1>{title}</h1>\n<p class=\"generated\">생성 시각: {}</p>\n</header>\n<main>\n",
        generated_at.format("%Y-%m-%d %H:%M")
    ));

    if sections.is_empty() {
        out.push_str(&format!("<p class=\"notice\">{EMPTY_REPORT_NOTICE}</p>\n"));
    } else {
        out.push_str("<nav class=\"toc\">\n");
        for section in sections {
            out.push_str(&format!(
                "<a href=\"#{}\">{}</a>\n",
                encode_double_quoted_attribute(&section_anchor(section)),
                encode_text(section.topic.label())
            ));
        }
        out.push_str("</nav>\n");
        for section in sections {
            render_section(&mut out, section);
        }
    }

    out.push_str("</main>\n<footer>네이버 뉴스 검색 결과를 Gemini로 분류하고 요약했습니다.</footer>\n</body>\n</html>\n");
    out
}

/// Render a [`Report`].
pub fn render(report: &Report) -> String {
    assemble(&report.sections, report.generated_at, &report.title)
}

/// Render `report` and overwrite `path` with it.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn write_html(report: &Report, path: &Path) -> Result<(), Box<dyn Error>> {
    let html = render(report);
    fs::write(path, html.as_bytes()).await?;
    info!(bytes = html.len(), articles = report.article_count(), "Wrote HTML report");
    Ok(())
}
