//! Article page fetching, text extraction and usability checks.
//!
//! Extraction prefers known article containers (Naver's `#dic_area`, an
//! `<article>` element, legacy `#articleBodyContents`), then all `<p>`
//! elements, then the visible text of `<body>`. Whatever comes out is then
//! judged by [`assess`]: too little text, or text dominated by navigation and
//! footer lines, is not worth summarizing.

use crate::error::EnrichError;
use crate::utils::collapse_whitespace;
use once_cell::sync::Lazy;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;
use tracing::{debug, instrument};

/// Something that can turn a link into article text.
pub trait ContentFetcher {
    async fn fetch(&self, url: &str) -> Result<String, EnrichError>;
}

/// Fetches pages over HTTP and extracts their article text.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    http: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, EnrichError> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent("Mozilla/5.0 (compatible; news_briefing)")
            .build()?;
        Ok(Self { http })
    }
}

impl ContentFetcher for HttpFetcher {
    #[instrument(level = "info", skip(self))]
    async fn fetch(&self, url: &str) -> Result<String, EnrichError> {
        let resp = self.http.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(EnrichError::FetchStatus(status));
        }
        let body = resp.text().await?;
        let text = extract_article_text(&body);
        debug!(bytes = body.len(), chars = text.chars().count(), "Extracted article text");
        Ok(text)
    }
}

static CONTAINER_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    ["#dic_area", "article", "#articleBodyContents"]
        .iter()
        .filter_map(|s| Selector::parse(s).ok())
        .collect()
});
static PARAGRAPH: Lazy<Selector> = Lazy::new(|| Selector::parse("p").expect("static selector"));
static BODY: Lazy<Selector> = Lazy::new(|| Selector::parse("body").expect("static selector"));

/// Extract readable article text from an HTML page, one paragraph per line.
pub fn extract_article_text(html: &str) -> String {
    let document = Html::parse_document(html);

    for selector in CONTAINER_SELECTORS.iter() {
        if let Some(container) = document.select(selector).next() {
            let paragraphs = paragraphs_in(container);
            let lines = if paragraphs.is_empty() {
                visible_lines(container)
            } else {
                paragraphs
            };
            if !lines.is_empty() {
                return lines.join("\n");
            }
        }
    }

    let paragraphs: Vec<String> = document
        .select(&PARAGRAPH)
        .map(|p| collapse_whitespace(&p.text().collect::<String>()))
        .filter(|l| !l.is_empty())
        .collect();
    if !paragraphs.is_empty() {
        return paragraphs.join("\n");
    }

    document
        .select(&BODY)
        .next()
        .map(|body| visible_lines(body).join("\n"))
        .unwrap_or_default()
}

fn paragraphs_in(container: ElementRef<'_>) -> Vec<String> {
    container
        .select(&PARAGRAPH)
        .map(|p| collapse_whitespace(&p.text().collect::<String>()))
        .filter(|l| !l.is_empty())
        .collect()
}

/// Text nodes under `element`, skipping script and style content.
fn visible_lines(element: ElementRef<'_>) -> Vec<String> {
    element
        .descendants()
        .filter_map(|node| {
            let text = node.value().as_text()?;
            let parent = node.parent().and_then(ElementRef::wrap)?;
            if matches!(parent.value().name(), "script" | "style" | "noscript") {
                return None;
            }
            let line = collapse_whitespace(text);
            (!line.is_empty()).then_some(line)
        })
        .collect()
}

/// Verdict on fetched or generated text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Usability {
    Usable,
    TooShort { chars: usize },
    Boilerplate { share: f64 },
}

impl Usability {
    pub fn is_usable(self) -> bool {
        matches!(self, Usability::Usable)
    }
}

const NAV_MARKERS: &[&str] = &[
    "로그인",
    "회원가입",
    "구독",
    "메뉴",
    "바로가기",
    "전체보기",
    "무단 전재",
    "무단전재",
    "재배포 금지",
    "저작권자",
    "이용약관",
    "개인정보처리방침",
    "기사제보",
    "광고문의",
    "Copyright",
    "All rights reserved",
    "JavaScript",
];

/// Lines this short are treated as menu items or link labels.
const SHORT_LINE_CHARS: usize = 15;

fn non_ws_chars(s: &str) -> usize {
    s.chars().filter(|c| !c.is_whitespace()).count()
}

fn is_boilerplate_line(line: &str) -> bool {
    let line = line.trim();
    line.chars().count() <= SHORT_LINE_CHARS || NAV_MARKERS.iter().any(|m| line.contains(m))
}

/// Judge whether `text` is worth summarizing.
///
/// Text with fewer than `min_chars` non-whitespace characters is too short;
/// text where boilerplate lines hold more than half of the characters is
/// boilerplate.
pub fn assess(text: &str, min_chars: usize) -> Usability {
    let total = non_ws_chars(text);
    if total < min_chars {
        return Usability::TooShort { chars: total };
    }
    let boilerplate: usize = text
        .lines()
        .filter(|l| is_boilerplate_line(l))
        .map(non_ws_chars)
        .sum();
    let share = boilerplate as f64 / total as f64;
    if share > 0.5 {
        return Usability::Boilerplate { share };
    }
    Usability::Usable
}

#[cfg(test)]
mod tests {
    use super::*;

    const SENTENCE: &str = "정부는 인공지능 산업 육성을 위해 내년 예산을 크게 늘리기로 했다고 밝혔다.";

    #[test]
    fn test_extracts_naver_article_body() {
        let html = format!(
            r#"<html><body>
                <nav><a>로그인</a><a>메뉴</a></nav>
                <article id="dic_area">{SENTENCE}<br><br>두 번째 문단입니다.<script>var x = 1;</script></article>
                <footer>Copyright</footer>
            </body></html>"#
        );
        let text = extract_article_text(&html);
        assert_eq!(text, format!("{SENTENCE}\n두 번째 문단입니다."));
    }

    #[test]
    fn test_extracts_paragraphs_inside_article() {
        let html = r#"<html><body><article><h1>제목</h1><p>첫 <b>문단</b>.</p><p> </p><p>둘째 문단.</p></article></body></html>"#;
        assert_eq!(extract_article_text(html), "첫 문단.\n둘째 문단.");
    }

    #[test]
    fn test_falls_back_to_paragraphs_then_body() {
        let with_p = r#"<html><body><div><p>본문 하나</p></div><div><p>본문 둘</p></div></body></html>"#;
        assert_eq!(extract_article_text(with_p), "본문 하나\n본문 둘");

        let bare = r#"<html><head><style>p{}</style></head><body><div>홈</div><div>뉴스</div><script>track()</script></body></html>"#;
        assert_eq!(extract_article_text(bare), "홈\n뉴스");
    }

    #[test]
    fn test_short_text_is_unusable() {
        assert_eq!(assess("짧은 글", 200), Usability::TooShort { chars: 3 });
        assert!(!assess("", 1).is_usable());
    }

    #[test]
    fn test_navigation_text_is_unusable() {
        let nav = "홈\n뉴스\n로그인\n회원가입\n전체보기\n".repeat(10);
        assert!(non_ws_chars(&nav) >= 100);
        assert!(matches!(assess(&nav, 100), Usability::Boilerplate { .. }));
    }

    /// Serve one response with the given content type and raw body bytes.
    async fn serve_once(content_type: &'static str, body: Vec<u8>) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            let head = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            );
            socket.write_all(head.as_bytes()).await.unwrap();
            socket.write_all(&body).await.unwrap();
            socket.shutdown().await.unwrap();
        });
        format!("http://{addr}/article")
    }

    #[tokio::test]
    async fn test_fetch_decodes_declared_charset() {
        // "한국 인공지능" in EUC-KR
        let euc_kr: [u8; 13] = [
            0xc7, 0xd1, 0xb1, 0xb9, 0x20, 0xc0, 0xce, 0xb0, 0xf8, 0xc1, 0xf6, 0xb4, 0xc9,
        ];
        let mut body = b"<html><body><p>".to_vec();
        body.extend_from_slice(&euc_kr);
        body.extend_from_slice(b"</p></body></html>");
        let url = serve_once("text/html; charset=euc-kr", body).await;

        let fetcher = HttpFetcher::new(Duration::from_secs(5)).unwrap();
        let text = fetcher.fetch(&url).await.unwrap();

        assert_eq!(text, "한국 인공지능");
    }

    #[test]
    fn test_article_text_is_usable() {
        let article = format!("{SENTENCE}\n{SENTENCE}\n{SENTENCE}\n{SENTENCE}\n{SENTENCE}\n무단 전재 및 재배포 금지");
        assert_eq!(assess(&article, 100), Usability::Usable);
    }
}
